use std::path::PathBuf;

use crate::window::DEFAULT_WINDOW;

pub const DEFAULT_LOG_PATH: &str = "../data/sensor_data.log";
pub const DEFAULT_TOP_N: usize = 5;

pub const DEFAULT_WAREHOUSE_INPUT: &str = "../data/dirty_warehouse_data.csv";
pub const DEFAULT_WAREHOUSE_CLEANED: &str = "../data/cleaned_warehouse_data.csv";
pub const DEFAULT_WAREHOUSE_INVALID: &str = "../data/invalid_warehouse_data.csv";

pub const DEFAULT_EVENTS_INPUT: &str = "../data/events.jsonl";
pub const DEFAULT_EVENTS_CLEANED: &str = "../data/cleaned_events.jsonl";
pub const DEFAULT_EVENTS_INVALID: &str = "../data/invalid_events.jsonl";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogAnalysisConfig {
    pub log_path: PathBuf,
    pub top_n: usize,
}

impl Default for LogAnalysisConfig {
    fn default() -> Self {
        Self {
            log_path: PathBuf::from(DEFAULT_LOG_PATH),
            top_n: DEFAULT_TOP_N,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamConfig {
    pub window: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            window: DEFAULT_WINDOW,
        }
    }
}

impl StreamConfig {
    pub fn new(window: usize) -> anyhow::Result<Self> {
        anyhow::ensure!(window >= 1, "window size must be at least 1, got {window}");
        Ok(Self { window })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WarehouseConfig {
    pub input: PathBuf,
    pub cleaned: PathBuf,
    pub invalid: PathBuf,
}

impl Default for WarehouseConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::from(DEFAULT_WAREHOUSE_INPUT),
            cleaned: PathBuf::from(DEFAULT_WAREHOUSE_CLEANED),
            invalid: PathBuf::from(DEFAULT_WAREHOUSE_INVALID),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventsConfig {
    pub input: PathBuf,
    pub cleaned: PathBuf,
    pub invalid: PathBuf,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::from(DEFAULT_EVENTS_INPUT),
            cleaned: PathBuf::from(DEFAULT_EVENTS_CLEANED),
            invalid: PathBuf::from(DEFAULT_EVENTS_INVALID),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_must_be_positive() {
        assert!(StreamConfig::new(0).is_err());
        assert_eq!(StreamConfig::new(3).unwrap(), StreamConfig::default());
    }

    #[test]
    fn defaults_point_at_data_directory() {
        assert_eq!(LogAnalysisConfig::default().top_n, 5);
        assert!(WarehouseConfig::default().cleaned.starts_with("../data"));
        assert!(EventsConfig::default()
            .invalid
            .ends_with("invalid_events.jsonl"));
    }
}
