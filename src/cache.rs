//! Category rule cache.
//!
//! Rules are read on every transaction created without a category, so they are
//! kept in memory per account. Writers call [`CategoryRuleCache::invalidate`]
//! after committing; it bumps a version stamp, and a lookup only trusts a cached
//! entry whose stamp matches the current one. Once `invalidate` has returned, the
//! next lookup reloads from the store.

use crate::core::caller::Caller;
use crate::entities::{CategoryRule, category_rule};
use crate::errors::Result;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;
use tracing::{debug, trace};

#[derive(Debug, Clone)]
struct CachedRule {
    keyword: String,
    category_id: i64,
}

#[derive(Debug)]
struct CachedRules {
    version: u64,
    rules: Vec<CachedRule>,
}

/// Per-account cache of keyword → category rules.
#[derive(Debug, Default)]
pub struct CategoryRuleCache {
    version: AtomicU64,
    entries: RwLock<HashMap<String, CachedRules>>,
}

impl CategoryRuleCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current version stamp.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.version.load(Ordering::Acquire)
    }

    /// Marks every cached entry stale.
    pub fn invalidate(&self) {
        let version = self.version.fetch_add(1, Ordering::AcqRel) + 1;
        debug!("Category rule cache invalidated (version {version})");
    }

    /// Finds the category whose rule keyword occurs in `description`.
    ///
    /// Matching ignores case. When several keywords match, the longest one wins;
    /// ties go to the oldest rule.
    pub async fn lookup<C>(&self, db: &C, caller: &Caller, description: &str) -> Result<Option<i64>>
    where
        C: ConnectionTrait,
    {
        let haystack = description.to_lowercase();
        let version = self.version();

        {
            let entries = self.entries.read().await;
            if let Some(cached) = entries.get(caller.user_id()) {
                if cached.version == version {
                    trace!("Category rule cache hit for {}", caller.user_id());
                    return Ok(best_match(&cached.rules, &haystack));
                }
            }
        }

        let rules = load_rules(db, caller).await?;
        let found = best_match(&rules, &haystack);

        // Tagged with the stamp read before loading: an invalidate that raced the
        // load leaves this entry stale and the next lookup reloads.
        self.entries
            .write()
            .await
            .insert(caller.user_id().to_string(), CachedRules { version, rules });

        Ok(found)
    }
}

async fn load_rules<C>(db: &C, caller: &Caller) -> Result<Vec<CachedRule>>
where
    C: ConnectionTrait,
{
    let rules = CategoryRule::find()
        .filter(category_rule::Column::UserId.eq(caller.user_id()))
        .order_by_asc(category_rule::Column::Id)
        .all(db)
        .await?;
    debug!("Loaded {} category rules for {}", rules.len(), caller.user_id());

    Ok(rules
        .into_iter()
        .map(|rule| CachedRule {
            keyword: rule.keyword.to_lowercase(),
            category_id: rule.category_id,
        })
        .collect())
}

fn best_match(rules: &[CachedRule], haystack: &str) -> Option<i64> {
    rules
        .iter()
        .filter(|rule| !rule.keyword.is_empty() && haystack.contains(&rule.keyword))
        .fold(None::<&CachedRule>, |best, rule| match best {
            Some(current) if current.keyword.len() >= rule.keyword.len() => Some(current),
            _ => Some(rule),
        })
        .map(|rule| rule.category_id)
}
