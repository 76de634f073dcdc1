use std::fs::File;
use std::io::{Read, Write};

use anyhow::Context;
use tracing::{debug, info, warn};

use crate::config::WarehouseConfig;
use crate::error::RowRejection;
use crate::models::{CleanedRow, InvalidRow, Rejection, RunSummary, WarehouseRow};
use crate::validate::{coerce_purchase_count, dates_in_order, is_valid_email, parse_date};

const UNKNOWN_NAME: &str = "Unknown";
const MISSING_LOGIN: &str = "N/A";

fn filled_or(value: Option<String>, fallback: &str) -> String {
    match value {
        Some(value) if !value.is_empty() => value.trim().to_string(),
        _ => fallback.to_string(),
    }
}

/// Validates one export row. Only a bad email rejects the row; every other
/// column is repaired or defaulted.
pub fn clean_row(row: WarehouseRow) -> Result<CleanedRow, Rejection<WarehouseRow>> {
    let email_ok = row
        .email
        .as_deref()
        .is_some_and(|email| !email.is_empty() && is_valid_email(email));
    if !email_ok {
        return Err(Rejection::new(row, RowRejection::InvalidEmail));
    }

    let WarehouseRow {
        user_id,
        name,
        email,
        signup_date,
        last_login,
        total_purchases,
    } = row;

    let name = filled_or(name, UNKNOWN_NAME);
    let last_login = filled_or(last_login, MISSING_LOGIN);
    let total_purchases = coerce_purchase_count(total_purchases.as_deref());

    let in_order = dates_in_order(
        parse_date(signup_date.as_deref()),
        parse_date(Some(last_login.as_str())),
    );

    Ok(CleanedRow {
        user_id: user_id.unwrap_or_default(),
        name,
        email: email.unwrap_or_default(),
        signup_date: signup_date.unwrap_or_default(),
        last_login,
        total_purchases,
        is_date_valid: if in_order { "True" } else { "False" }.to_string(),
    })
}

fn csv_writer<W: Write>(sink: W) -> csv::Writer<W> {
    csv::WriterBuilder::new()
        .has_headers(false)
        .terminator(csv::Terminator::CRLF)
        .from_writer(sink)
}

/// Both sinks always receive a header row. `invalid` counts every row missing
/// from the cleaned output.
pub fn clean_records<R, C, I>(input: R, cleaned: C, invalid: I) -> anyhow::Result<RunSummary>
where
    R: Read,
    C: Write,
    I: Write,
{
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(input);
    let mut cleaned_writer = csv_writer(cleaned);
    let mut invalid_writer = csv_writer(invalid);

    cleaned_writer.write_record(CleanedRow::HEADERS)?;
    invalid_writer.write_record(InvalidRow::HEADERS)?;

    let mut summary = RunSummary::default();

    for (index, result) in reader.deserialize::<WarehouseRow>().enumerate() {
        let row = match result {
            Ok(row) => row,
            Err(err) if err.is_io_error() => {
                return Err(err).context("failed to read warehouse export");
            }
            Err(err) => {
                warn!(row = index + 1, "skipping undecodable row: {err}");
                summary.record_invalid();
                continue;
            }
        };

        match clean_row(row) {
            Ok(cleaned_row) => {
                cleaned_writer.serialize(&cleaned_row)?;
                summary.record_valid();
            }
            Err(rejection) => {
                debug!(row = index + 1, reason = %rejection.reason, "rejecting row");
                invalid_writer.serialize(InvalidRow::from(rejection.record))?;
                summary.record_invalid();
            }
        }
    }

    cleaned_writer.flush()?;
    invalid_writer.flush()?;
    Ok(summary)
}

pub fn clean_warehouse(config: &WarehouseConfig) -> anyhow::Result<RunSummary> {
    let input = File::open(&config.input).with_context(|| {
        format!("warehouse export not found: {}", config.input.display())
    })?;
    let cleaned = File::create(&config.cleaned)
        .with_context(|| format!("failed to create {}", config.cleaned.display()))?;
    let invalid = File::create(&config.invalid)
        .with_context(|| format!("failed to create {}", config.invalid.display()))?;

    info!(input = %config.input.display(), "cleaning warehouse export");
    let summary = clean_records(input, cleaned, invalid)?;
    info!(
        valid = summary.valid,
        skipped = summary.invalid,
        "warehouse cleaning finished"
    );
    Ok(summary)
}
