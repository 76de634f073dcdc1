use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorStatus {
    Ok,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusLine<'a> {
    pub sensor_id: &'a str,
    pub status: SensorStatus,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SensorCounts {
    pub ok: u64,
    pub error: u64,
}

impl SensorCounts {
    pub fn total(&self) -> u64 {
        self.ok + self.error
    }

    /// Share of error lines in percent, 0 when the sensor has no lines.
    pub fn error_percentage(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            0.0
        } else {
            self.error as f64 / total as f64 * 100.0
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SensorErrorRank {
    pub sensor_id: String,
    pub ok: u64,
    pub error: u64,
    pub error_pct: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Reading<'a> {
    pub timestamp: &'a str,
    pub sensor_id: &'a str,
    pub value: f64,
}

/// A rolling average emitted when a sensor's window is full.
#[derive(Debug, Clone, PartialEq)]
pub struct Emission {
    pub timestamp: String,
    pub sensor_id: String,
    pub average: f64,
}

impl std::fmt::Display for Emission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} {:.2}", self.timestamp, self.sensor_id, self.average)
    }
}

/// A raw warehouse export row. Every column is optional: absent columns,
/// short rows and empty cells all read as `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct WarehouseRow {
    pub user_id: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub signup_date: Option<String>,
    pub last_login: Option<String>,
    pub total_purchases: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CleanedRow {
    pub user_id: String,
    pub name: String,
    pub email: String,
    pub signup_date: String,
    pub last_login: String,
    pub total_purchases: String,
    pub is_date_valid: String,
}

impl CleanedRow {
    pub const HEADERS: [&'static str; 7] = [
        "user_id",
        "name",
        "email",
        "signup_date",
        "last_login",
        "total_purchases",
        "is_date_valid",
    ];
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvalidRow {
    pub user_id: String,
    pub name: String,
    pub email: String,
    pub signup_date: String,
    pub last_login: String,
    pub total_purchases: String,
}

impl InvalidRow {
    pub const HEADERS: [&'static str; 6] = [
        "user_id",
        "name",
        "email",
        "signup_date",
        "last_login",
        "total_purchases",
    ];
}

impl From<WarehouseRow> for InvalidRow {
    fn from(row: WarehouseRow) -> Self {
        Self {
            user_id: row.user_id.unwrap_or_default(),
            name: row.name.unwrap_or_default(),
            email: row.email.unwrap_or_default(),
            signup_date: row.signup_date.unwrap_or_default(),
            last_login: row.last_login.unwrap_or_default(),
            total_purchases: row.total_purchases.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventType {
    Login,
    Logout,
    Purchase,
}

impl EventType {
    pub fn parse(normalized: &str) -> Option<Self> {
        match normalized {
            "login" => Some(Self::Login),
            "logout" => Some(Self::Logout),
            "purchase" => Some(Self::Purchase),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Login => "login",
            Self::Logout => "logout",
            Self::Purchase => "purchase",
        }
    }
}

impl Serialize for EventType {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedEvent {
    pub user_id: i64,
    pub event_type: EventType,
    pub timestamp: String,
    pub amount: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device: Option<String>,
}

/// A record that failed validation, handed back untouched with the reason.
#[derive(Debug, Clone, PartialEq)]
pub struct Rejection<R> {
    pub record: R,
    pub reason: String,
}

impl<R> Rejection<R> {
    pub fn new(record: R, reason: impl ToString) -> Self {
        Self {
            record,
            reason: reason.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub total: usize,
    pub valid: usize,
    pub invalid: usize,
}

impl RunSummary {
    pub fn record_valid(&mut self) {
        self.total += 1;
        self.valid += 1;
    }

    pub fn record_invalid(&mut self) {
        self.total += 1;
        self.invalid += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_percentage_handles_empty_sensor() {
        assert_eq!(SensorCounts::default().error_percentage(), 0.0);
        let counts = SensorCounts { ok: 1, error: 3 };
        assert!((counts.error_percentage() - 75.0).abs() < 1e-9);
    }

    #[test]
    fn run_summary_keeps_total_in_step() {
        let mut summary = RunSummary::default();
        summary.record_valid();
        summary.record_invalid();
        summary.record_invalid();
        assert_eq!(summary.total, 3);
        assert_eq!(summary.total, summary.valid + summary.invalid);
    }

    #[test]
    fn emission_formats_two_decimals() {
        let emission = Emission {
            timestamp: "T3".to_string(),
            sensor_id: "A".to_string(),
            average: 20.0,
        };
        assert_eq!(emission.to_string(), "T3 A 20.00");
    }

    #[test]
    fn invalid_row_blanks_absent_columns() {
        let row = WarehouseRow {
            email: Some("bad".to_string()),
            ..Default::default()
        };
        let invalid = InvalidRow::from(row);
        assert_eq!(invalid.email, "bad");
        assert_eq!(invalid.user_id, "");
    }
}
