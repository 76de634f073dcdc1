use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::Context;
use tracing::{debug, info, warn};

use crate::error::MalformedLine;
use crate::models::{SensorCounts, SensorStatus, StatusLine};

/// Per-sensor OK/ERROR counters built over one pass of the log.
#[derive(Debug, Default, Clone)]
pub struct SensorTally {
    counts: HashMap<String, SensorCounts>,
}

impl SensorTally {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entry(&mut self, sensor_id: &str) -> &mut SensorCounts {
        self.counts.entry(sensor_id.to_string()).or_default()
    }

    pub fn record(&mut self, line: &StatusLine<'_>) {
        let counts = self.entry(line.sensor_id);
        match line.status {
            SensorStatus::Ok => counts.ok += 1,
            SensorStatus::Error => counts.error += 1,
        }
    }

    pub fn get(&self, sensor_id: &str) -> Option<&SensorCounts> {
        self.counts.get(sensor_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SensorCounts)> {
        self.counts.iter().map(|(id, counts)| (id.as_str(), counts))
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}

/// Splits `<timestamp> <sensor_id> <STATUS>`; status is case-insensitive.
pub fn parse_status_line(line: &str) -> Result<StatusLine<'_>, MalformedLine> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    let &[_timestamp, sensor_id, status] = parts.as_slice() else {
        return Err(MalformedLine::TokenCount(parts.len()));
    };

    let status = match status.to_uppercase().as_str() {
        "OK" => SensorStatus::Ok,
        "ERROR" => SensorStatus::Error,
        _ => return Err(MalformedLine::UnknownStatus(status.to_string())),
    };

    Ok(StatusLine { sensor_id, status })
}

/// Tallies every well-formed line of `reader`. Malformed lines are skipped.
pub fn tally_lines<R: BufRead>(reader: R) -> anyhow::Result<SensorTally> {
    let mut tally = SensorTally::new();
    let mut skipped = 0usize;

    for (index, chunk) in reader.split(b'\n').enumerate() {
        let bytes = chunk.context("failed to read sensor log")?;
        let line = String::from_utf8_lossy(&bytes);
        match parse_status_line(&line) {
            Ok(status_line) => tally.record(&status_line),
            Err(err) => {
                skipped += 1;
                debug!(line = index + 1, "skipping log line: {err}");
            }
        }
    }

    if tally.is_empty() {
        warn!("no well-formed status lines found");
    }
    info!(
        sensors = tally.len(),
        skipped, "sensor log analysis finished"
    );
    Ok(tally)
}

pub fn analyze_log(path: &Path) -> anyhow::Result<SensorTally> {
    let file =
        File::open(path).with_context(|| format!("log file not found: {}", path.display()))?;
    tally_lines(BufReader::new(file))
}
