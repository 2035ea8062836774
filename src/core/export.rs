//! CSV export of an account's transactions.
//!
//! The file is semicolon-delimited with a `\n` terminator. Dates are written as
//! `DD/MM/YYYY`, amounts keep their sign and use a comma as decimal separator,
//! and the description is always quoted with inner quotes doubled. Category
//! and origin are quoted the same way only when they contain a delimiter, a
//! quote or a line break.

use crate::{
    core::{caller::Caller, category, period::Period},
    entities::{Transaction, TransactionType, transaction},
    errors::Result,
};
use csv::{QuoteStyle, Terminator, WriterBuilder};
use sea_orm::{QueryOrder, prelude::*};
use std::{borrow::Cow, collections::HashMap};
use tracing::info;

/// Header row of the export.
pub const CSV_HEADER: [&str; 8] = [
    "Data",
    "Descricao",
    "Valor",
    "Tipo",
    "Categoria",
    "Origem",
    "Fixa",
    "Parcelada",
];

fn format_amount(amount: f64) -> String {
    format!("{amount:.2}").replace('.', ",")
}

fn quote_description(description: &str) -> String {
    format!("\"{}\"", description.replace('"', "\"\""))
}

/// Quotes a free-text column only when it would otherwise split the row.
fn quote_if_needed(value: &str) -> Cow<'_, str> {
    if value.contains([';', '"', '\n', '\r']) {
        Cow::Owned(quote_description(value))
    } else {
        Cow::Borrowed(value)
    }
}

const fn yes_no(value: bool) -> &'static str {
    if value { "Sim" } else { "Não" }
}

const fn type_label(transaction_type: TransactionType) -> &'static str {
    match transaction_type {
        TransactionType::Income => "Receita",
        TransactionType::Expense => "Despesa",
    }
}

/// Exports the caller's transactions, optionally restricted to one month,
/// ordered by date then id.
pub async fn export_csv(
    db: &DatabaseConnection,
    caller: &Caller,
    period: Option<Period>,
) -> Result<String> {
    let mut query = Transaction::find().filter(transaction::Column::UserId.eq(caller.user_id()));
    if let Some(period) = period {
        query = query.filter(
            transaction::Column::Date.between(period.first_day(), period.last_day()),
        );
    }
    let transactions = query
        .order_by_asc(transaction::Column::Date)
        .order_by_asc(transaction::Column::Id)
        .all(db)
        .await?;

    let names: HashMap<i64, String> = category::list_categories(db, caller)
        .await?
        .into_iter()
        .map(|c| (c.id, c.name))
        .collect();

    // Quoting is applied by hand
    let mut writer = WriterBuilder::new()
        .delimiter(b';')
        .quote_style(QuoteStyle::Never)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    writer.write_record(CSV_HEADER)?;
    for t in &transactions {
        let category_name = t
            .category_id
            .and_then(|id| names.get(&id))
            .map_or("", String::as_str);
        writer.write_record([
            t.date.format("%d/%m/%Y").to_string().as_str(),
            quote_description(&t.description).as_str(),
            format_amount(t.amount).as_str(),
            type_label(t.transaction_type),
            quote_if_needed(category_name).as_ref(),
            quote_if_needed(&t.origin).as_ref(),
            yes_no(t.is_fixed()),
            yes_no(t.is_installment),
        ])?;
    }

    let bytes = writer.into_inner().map_err(csv::IntoInnerError::into_error)?;
    let output = String::from_utf8(bytes).map_err(std::io::Error::other)?;

    info!(
        "Exported {} transactions for {}",
        transactions.len(),
        caller.user_id()
    );
    Ok(output)
}
