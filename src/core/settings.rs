//! Per-account settings stored as key-value pairs.

use crate::{
    core::caller::Caller,
    entities::{Setting, setting},
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::{QueryOrder, Set, SqlErr, prelude::*};
use std::collections::BTreeMap;

fn validate_key(key: &str) -> Result<&str> {
    let key = key.trim();
    if key.is_empty() {
        return Err(Error::validation("setting key cannot be empty"));
    }
    Ok(key)
}

async fn find_setting<C>(db: &C, caller: &Caller, key: &str) -> Result<Option<setting::Model>>
where
    C: ConnectionTrait,
{
    Setting::find()
        .filter(setting::Column::UserId.eq(caller.user_id()))
        .filter(setting::Column::Key.eq(key))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Reads one setting.
pub async fn get_setting<C>(db: &C, caller: &Caller, key: &str) -> Result<Option<String>>
where
    C: ConnectionTrait,
{
    let key = validate_key(key)?;
    Ok(find_setting(db, caller, key).await?.map(|s| s.value))
}

async fn update_value<C>(
    db: &C,
    existing: setting::Model,
    value: &str,
    now: chrono::NaiveDateTime,
) -> Result<()>
where
    C: ConnectionTrait,
{
    let mut active_model: setting::ActiveModel = existing.into();
    active_model.value = Set(value.to_string());
    active_model.updated_at = Set(now);
    active_model.update(db).await?;
    Ok(())
}

/// Writes one setting, replacing any previous value.
pub async fn set_setting<C>(db: &C, caller: &Caller, key: &str, value: &str) -> Result<()>
where
    C: ConnectionTrait,
{
    let key = validate_key(key)?;
    let now = Utc::now().naive_utc();

    // Check if the key exists
    if let Some(existing) = find_setting(db, caller, key).await? {
        update_value(db, existing, value, now).await?;
    } else {
        // Insert new record
        let new_setting = setting::ActiveModel {
            user_id: Set(caller.user_id().to_string()),
            key: Set(key.to_string()),
            value: Set(value.to_string()),
            updated_at: Set(now),
            ..Default::default()
        };
        match new_setting.insert(db).await {
            Ok(_) => {}
            Err(err) if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                // A concurrent writer inserted the key first
                let existing = find_setting(db, caller, key)
                    .await?
                    .ok_or(Error::Database(err))?;
                update_value(db, existing, value, now).await?;
            }
            Err(err) => return Err(err.into()),
        }
    }

    tracing::debug!("Setting '{key}' updated for {}", caller.user_id());
    Ok(())
}

/// Reads every setting of the caller.
pub async fn list_settings(
    db: &DatabaseConnection,
    caller: &Caller,
) -> Result<BTreeMap<String, String>> {
    Ok(Setting::find()
        .filter(setting::Column::UserId.eq(caller.user_id()))
        .order_by_asc(setting::Column::Key)
        .all(db)
        .await?
        .into_iter()
        .map(|s| (s.key, s.value))
        .collect())
}
