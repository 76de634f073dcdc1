use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};

use anyhow::Context;
use serde::Serialize;
use serde_json::ser::Formatter;
use serde_json::{json, Map, Value};
use tracing::{debug, info};

use crate::config::EventsConfig;
use crate::error::EventRejection;
use crate::models::{EventType, NormalizedEvent, Rejection, RunSummary};
use crate::validate::{coerce_amount, coerce_user_id, event_type_text, is_iso8601, round2};

pub type RawEvent = Map<String, Value>;

#[derive(Debug, Clone, PartialEq)]
pub enum SourceEvent {
    Decoded(RawEvent),
    Undecodable { raw: String, line: usize },
}

impl SourceEvent {
    pub fn decode(raw: &str, line: usize) -> Self {
        match serde_json::from_str::<Value>(raw) {
            Ok(Value::Object(event)) => Self::Decoded(event),
            _ => Self::Undecodable {
                raw: raw.to_string(),
                line,
            },
        }
    }
}

fn undecodable_record(raw: String, line: usize) -> Value {
    json!({
        "_raw": raw,
        "error_reason": format!("invalid_json_at_line_{line}")
    })
}

fn check_event(event: &RawEvent) -> Result<NormalizedEvent, EventRejection> {
    let user_id = event.get("user_id").ok_or(EventRejection::MissingUserId)?;
    let user_id = coerce_user_id(user_id).ok_or(EventRejection::UserIdNotInt)?;

    let type_text = event_type_text(event.get("event_type"));
    let event_type =
        EventType::parse(&type_text).ok_or_else(|| EventRejection::InvalidEventType(type_text))?;

    let timestamp = match event.get("timestamp") {
        Some(Value::String(ts)) if !ts.is_empty() && is_iso8601(ts) => ts.clone(),
        _ => return Err(EventRejection::InvalidTimestamp),
    };

    let amount = if event_type == EventType::Purchase {
        coerce_amount(event.get("amount")).ok_or(EventRejection::InvalidAmount)?
    } else {
        0.0
    };

    let device = match event.get("device") {
        Some(Value::String(device)) if !device.is_empty() => Some(device.clone()),
        _ => None,
    };

    Ok(NormalizedEvent {
        user_id,
        event_type,
        timestamp,
        amount: round2(amount),
        device,
    })
}

/// Validates `event`, stopping at the first failing field. On rejection the
/// event is handed back unchanged together with that field's reason.
pub fn normalize_event(event: RawEvent) -> Result<NormalizedEvent, Rejection<RawEvent>> {
    match check_event(&event) {
        Ok(normalized) => Ok(normalized),
        Err(reason) => Err(Rejection::new(event, reason)),
    }
}

pub fn rejected_event_record(rejection: Rejection<RawEvent>) -> Value {
    let Rejection { mut record, reason } = rejection;
    record.insert("error_reason".to_string(), Value::String(reason));
    Value::Object(record)
}

/// Single-line JSON with a space after every `,` and `:`.
struct SpacedFormatter;

impl Formatter for SpacedFormatter {
    fn begin_array_value<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_key<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_value<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + Write,
    {
        writer.write_all(b": ")
    }
}

fn write_json_line<W: Write, T: Serialize>(sink: &mut W, value: &T) -> anyhow::Result<()> {
    let mut serializer = serde_json::Serializer::with_formatter(&mut *sink, SpacedFormatter);
    value.serialize(&mut serializer)?;
    sink.write_all(b"\n")?;
    Ok(())
}

/// Blank lines are not events and are not counted.
pub fn validate_stream<R, C, I>(
    input: R,
    mut cleaned: C,
    mut invalid: I,
) -> anyhow::Result<RunSummary>
where
    R: BufRead,
    C: Write,
    I: Write,
{
    let mut summary = RunSummary::default();

    for (index, chunk) in input.split(b'\n').enumerate() {
        let bytes = chunk.context("failed to read event stream")?;
        let text = String::from_utf8_lossy(&bytes);
        let line = text.trim();
        if line.is_empty() {
            continue;
        }
        let line_number = index + 1;

        let event = match SourceEvent::decode(line, line_number) {
            SourceEvent::Decoded(event) => event,
            SourceEvent::Undecodable { raw, line } => {
                debug!(line, "undecodable event line");
                write_json_line(&mut invalid, &undecodable_record(raw, line))?;
                summary.record_invalid();
                continue;
            }
        };

        match normalize_event(event) {
            Ok(normalized) => {
                write_json_line(&mut cleaned, &normalized)?;
                summary.record_valid();
            }
            Err(rejection) => {
                debug!(line = line_number, reason = %rejection.reason, "rejecting event");
                write_json_line(&mut invalid, &rejected_event_record(rejection))?;
                summary.record_invalid();
            }
        }
    }

    cleaned.flush()?;
    invalid.flush()?;
    Ok(summary)
}

pub fn validate_events(config: &EventsConfig) -> anyhow::Result<RunSummary> {
    let input = File::open(&config.input)
        .with_context(|| format!("event stream not found: {}", config.input.display()))?;
    let cleaned = File::create(&config.cleaned)
        .with_context(|| format!("failed to create {}", config.cleaned.display()))?;
    let invalid = File::create(&config.invalid)
        .with_context(|| format!("failed to create {}", config.invalid.display()))?;

    info!(input = %config.input.display(), "validating events");
    let summary = validate_stream(
        BufReader::new(input),
        BufWriter::new(cleaned),
        BufWriter::new(invalid),
    )?;
    info!(
        total = summary.total,
        valid = summary.valid,
        invalid = summary.invalid,
        "event validation finished"
    );
    Ok(summary)
}
