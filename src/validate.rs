use std::sync::OnceLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use regex::Regex;
use serde_json::Value;

const DATE_FORMAT: &str = "%Y-%m-%d";
const ABSENT_DATE: &str = "N/A";

const ISO_SHAPE: &str = concat!(
    r"^(?P<date>[0-9]{4}-[0-9]{2}-[0-9]{2})",
    r"(?:(?P<sep>[T ])(?P<hour>[0-9]{2})",
    r"(?P<rest>(?::[0-9]{2}(?::[0-9]{2}(?:\.[0-9]+)?)?)?)",
    r"(?P<offset>[+-][0-9]{2}:[0-9]{2})?)?$",
);

const OFFSET_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%dT%H:%M%:z",
    "%Y-%m-%d %H:%M%:z",
];

const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

fn email_re() -> &'static Regex {
    static EMAIL_RE: OnceLock<Regex> = OnceLock::new();
    EMAIL_RE.get_or_init(|| Regex::new(r"^[\w.-]+@[\w.-]+\.\w+$").expect("valid email regex"))
}

fn iso_shape_re() -> &'static Regex {
    static ISO_SHAPE_RE: OnceLock<Regex> = OnceLock::new();
    ISO_SHAPE_RE.get_or_init(|| Regex::new(ISO_SHAPE).expect("valid timestamp shape regex"))
}

pub fn is_valid_email(email: &str) -> bool {
    email_re().is_match(email)
}

// chrono alone accepts single-digit fields, signs and padding
fn has_date_shape(raw: &str) -> bool {
    let bytes = raw.as_bytes();
    bytes.len() == 10
        && bytes.iter().enumerate().all(|(i, b)| match i {
            4 | 7 => *b == b'-',
            _ => b.is_ascii_digit(),
        })
}

/// Empty input and the `N/A` placeholder are absent rather than malformed,
/// but both come back as `None`.
pub fn parse_date(raw: Option<&str>) -> Option<NaiveDate> {
    match raw {
        None | Some("") | Some(ABSENT_DATE) => None,
        Some(value) if has_date_shape(value) => NaiveDate::parse_from_str(value, DATE_FORMAT).ok(),
        Some(_) => None,
    }
}

pub fn dates_in_order(signup: Option<NaiveDate>, last_login: Option<NaiveDate>) -> bool {
    matches!((signup, last_login), (Some(signup), Some(last)) if signup <= last)
}

// surrounding whitespace, a sign and `_` separators are accepted
pub fn parse_integer(raw: &str) -> Option<i64> {
    let trimmed = raw.trim();
    let (negative, digits) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };

    if digits.is_empty()
        || digits.starts_with('_')
        || digits.ends_with('_')
        || digits.contains("__")
    {
        return None;
    }
    if !digits.chars().all(|c| c.is_ascii_digit() || c == '_') {
        return None;
    }

    let magnitude: i64 = digits.replace('_', "").parse().ok()?;
    Some(if negative { -magnitude } else { magnitude })
}

pub fn coerce_purchase_count(raw: Option<&str>) -> String {
    match raw.and_then(parse_integer) {
        Some(count) if count >= 0 => count.to_string(),
        _ => "0".to_string(),
    }
}

/// Accepts ISO-8601 dates and date-times, with or without an offset. A
/// trailing `Z` is read as `+00:00` and an hour-only time as `HH:00`.
pub fn is_iso8601(raw: &str) -> bool {
    let ts = match raw.strip_suffix('Z') {
        Some(head) => format!("{head}+00:00"),
        None => raw.to_string(),
    };

    let Some(caps) = iso_shape_re().captures(&ts) else {
        return false;
    };
    let ts = match (caps.name("sep"), caps.name("hour"), caps.name("rest")) {
        (Some(sep), Some(hour), Some(rest)) if rest.as_str().is_empty() => format!(
            "{}{}{}:00{}",
            &caps["date"],
            sep.as_str(),
            hour.as_str(),
            caps.name("offset").map_or("", |offset| offset.as_str())
        ),
        _ => ts.clone(),
    };

    if DateTime::parse_from_rfc3339(&ts).is_ok() {
        return true;
    }
    if OFFSET_FORMATS
        .iter()
        .any(|format| DateTime::parse_from_str(&ts, format).is_ok())
    {
        return true;
    }
    if NAIVE_FORMATS
        .iter()
        .any(|format| NaiveDateTime::parse_from_str(&ts, format).is_ok())
    {
        return true;
    }
    NaiveDate::parse_from_str(&ts, DATE_FORMAT).is_ok()
}

/// Floats truncate toward zero and booleans count as 1/0. Numbers outside
/// the `i64` range fail instead of saturating.
pub fn coerce_user_id(value: &Value) -> Option<i64> {
    // i64::MAX as f64 rounds up to 2^63, so the upper bound is exclusive
    const LOWER: f64 = i64::MIN as f64;
    const UPPER: f64 = i64::MAX as f64;

    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .map(f64::trunc)
                .filter(|f| (LOWER..UPPER).contains(f))
                .map(|f| f as i64)
        }),
        Value::Bool(b) => Some(i64::from(*b)),
        Value::String(s) => parse_integer(s),
        _ => None,
    }
}

/// Lowercased text of an `event_type`, used for matching and for the reason.
pub fn event_type_text(value: Option<&Value>) -> String {
    match value {
        None => String::new(),
        Some(Value::Null) => "none".to_string(),
        Some(Value::String(s)) => s.to_lowercase(),
        Some(other) => other.to_string().to_lowercase(),
    }
}

pub fn coerce_amount(value: Option<&Value>) -> Option<f64> {
    let amount = match value {
        None => 0.0,
        Some(Value::Number(n)) => n.as_f64()?,
        Some(Value::Bool(b)) => f64::from(u8::from(*b)),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok()?,
        Some(_) => return None,
    };

    if amount.is_finite() && amount >= 0.0 {
        Some(amount)
    } else {
        None
    }
}

/// Rounds to cents from the exact binary value, so a stored 2.675 (really
/// 2.67499...) goes down and exact ties go to even.
pub fn round2(value: f64) -> f64 {
    let rounded = format!("{value:.2}").parse::<f64>().unwrap_or(value);
    // keeps -0.0 from leaking into output as "-0.0"
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn email_shape() {
        assert!(is_valid_email("jane.doe@example.com"));
        assert!(is_valid_email("a_b-c@mail.example.co"));
        assert!(!is_valid_email("jane.doe@example"));
        assert!(!is_valid_email("jane doe@example.com"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("jane@example.com "));
        assert!(!is_valid_email(""));
    }

    #[test]
    fn dates_treat_placeholders_as_absent() {
        assert_eq!(parse_date(None), None);
        assert_eq!(parse_date(Some("")), None);
        assert_eq!(parse_date(Some("N/A")), None);
        assert_eq!(parse_date(Some("2023-13-01")), None);
        assert_eq!(parse_date(Some("01/02/2023")), None);
        assert_eq!(parse_date(Some(" 2023-01-01")), None);
        assert_eq!(parse_date(Some("2023-01-01 ")), None);
        assert_eq!(parse_date(Some("2023-1-5")), None);
        assert_eq!(parse_date(Some("+2023-01-01")), None);
        assert_eq!(
            parse_date(Some("2023-02-01")),
            NaiveDate::from_ymd_opt(2023, 2, 1)
        );
    }

    #[test]
    fn date_order_requires_both_dates() {
        let early = NaiveDate::from_ymd_opt(2023, 1, 1);
        let late = NaiveDate::from_ymd_opt(2023, 6, 1);
        assert!(dates_in_order(early, late));
        assert!(dates_in_order(early, early));
        assert!(!dates_in_order(late, early));
        assert!(!dates_in_order(None, late));
        assert!(!dates_in_order(early, None));
    }

    #[test]
    fn purchase_counts_default_to_zero() {
        assert_eq!(coerce_purchase_count(Some("12")), "12");
        assert_eq!(coerce_purchase_count(Some(" 7 ")), "7");
        assert_eq!(coerce_purchase_count(Some("+3")), "3");
        assert_eq!(coerce_purchase_count(Some("1_000")), "1000");
        assert_eq!(coerce_purchase_count(Some("007")), "7");
        assert_eq!(coerce_purchase_count(Some("-4")), "0");
        assert_eq!(coerce_purchase_count(Some("4.5")), "0");
        assert_eq!(coerce_purchase_count(Some("abc")), "0");
        assert_eq!(coerce_purchase_count(Some("1__0")), "0");
        assert_eq!(coerce_purchase_count(None), "0");
    }

    #[test]
    fn iso8601_variants() {
        assert!(is_iso8601("2024-03-01T12:30:00Z"));
        assert!(is_iso8601("2024-03-01T12:30:00.123456+02:00"));
        assert!(is_iso8601("2024-03-01T12:30:00"));
        assert!(is_iso8601("2024-03-01 12:30:00"));
        assert!(is_iso8601("2024-03-01T12:30"));
        assert!(is_iso8601("2024-03-01"));
        assert!(is_iso8601("2024-03-01T12"));
        assert!(is_iso8601("2024-03-01T12Z"));
        assert!(is_iso8601("2024-03-01 07+05:30"));
        assert!(!is_iso8601("2024-03-01T25:00:00"));
        assert!(!is_iso8601("2024-03-01T24"));
        assert!(!is_iso8601("yesterday"));
        assert!(!is_iso8601("03/01/2024"));
        assert!(!is_iso8601(""));
    }

    #[test]
    fn iso8601_requires_padded_unsigned_fields() {
        assert!(!is_iso8601("2024-3-1"));
        assert!(!is_iso8601("2024-03-1T10:00:00"));
        assert!(!is_iso8601(" 2024-03-01"));
        assert!(!is_iso8601("2024-03-01 "));
        assert!(!is_iso8601("+2024-03-01"));
        assert!(!is_iso8601("2024-03-01T1:00"));
        assert!(!is_iso8601("2024-03-01+00:00"));
    }

    #[test]
    fn user_id_coercion() {
        assert_eq!(coerce_user_id(&json!(42)), Some(42));
        assert_eq!(coerce_user_id(&json!("17")), Some(17));
        assert_eq!(coerce_user_id(&json!(" -5 ")), Some(-5));
        assert_eq!(coerce_user_id(&json!(3.9)), Some(3));
        assert_eq!(coerce_user_id(&json!(true)), Some(1));
        assert_eq!(coerce_user_id(&json!("abc")), None);
        assert_eq!(coerce_user_id(&json!("3.5")), None);
        assert_eq!(coerce_user_id(&json!(null)), None);
        assert_eq!(coerce_user_id(&json!([1])), None);
    }

    #[test]
    fn user_id_out_of_range_is_rejected() {
        let literal: Value = serde_json::from_str("99999999999999999999").unwrap();
        assert_eq!(coerce_user_id(&literal), None);
        assert_eq!(coerce_user_id(&json!(1e30)), None);
        assert_eq!(coerce_user_id(&json!(-1e30)), None);
        assert_eq!(coerce_user_id(&json!(u64::MAX)), None);
        assert_eq!(coerce_user_id(&json!(9_223_372_036_854_775_807_i64)), Some(i64::MAX));
        assert_eq!(coerce_user_id(&json!(-9.2e18)), Some(-9_200_000_000_000_000_000));
    }

    #[test]
    fn event_type_text_is_lowercased() {
        assert_eq!(event_type_text(Some(&json!("LOGIN"))), "login");
        assert_eq!(event_type_text(Some(&json!(null))), "none");
        assert_eq!(event_type_text(Some(&json!(5))), "5");
        assert_eq!(event_type_text(None), "");
    }

    #[test]
    fn amount_coercion() {
        assert_eq!(coerce_amount(None), Some(0.0));
        assert_eq!(coerce_amount(Some(&json!(19.999))), Some(19.999));
        assert_eq!(coerce_amount(Some(&json!("12.50"))), Some(12.5));
        assert_eq!(coerce_amount(Some(&json!("ten"))), None);
        assert_eq!(coerce_amount(Some(&json!(null))), None);
        assert_eq!(coerce_amount(Some(&json!(-1.0))), None);
        assert_eq!(coerce_amount(Some(&json!("inf"))), None);
    }

    #[test]
    fn rounds_to_cents() {
        assert_eq!(round2(19.999), 20.0);
        assert_eq!(round2(12.344), 12.34);
        assert_eq!(round2(-0.001), 0.0);
        assert_eq!(round2(2.675), 2.67);
        assert_eq!(round2(0.125), 0.12);
        assert_eq!(round2(0.625), 0.62);
        assert_eq!(round2(0.375), 0.38);
        assert!(round2(-0.001).is_sign_positive());
    }
}
