use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::io::{self, Write};

use anyhow::Context;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, info};

use crate::error::MalformedLine;
use crate::models::{Emission, Reading};

pub const DEFAULT_WINDOW: usize = 3;

const FAREWELL: &str = "\nStopping stream. Goodbye!";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamEnd {
    Exhausted { emitted: usize },
    Interrupted,
}

#[derive(Debug, Clone)]
pub struct RollingWindow {
    values: VecDeque<f64>,
    capacity: usize,
}

impl RollingWindow {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            values: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, value: f64) {
        if self.values.len() == self.capacity {
            self.values.pop_front();
        }
        self.values.push_back(value);
    }

    pub fn is_full(&self) -> bool {
        self.values.len() == self.capacity
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Mean of the held readings, only once the window is full.
    pub fn average(&self) -> Option<f64> {
        if !self.is_full() {
            return None;
        }
        Some(self.values.iter().sum::<f64>() / self.len() as f64)
    }
}

#[derive(Debug, Clone)]
pub struct RollingAverager {
    windows: HashMap<String, RollingWindow>,
    capacity: usize,
}

impl Default for RollingAverager {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW)
    }
}

impl RollingAverager {
    pub fn new(capacity: usize) -> Self {
        Self {
            windows: HashMap::new(),
            capacity: capacity.max(1),
        }
    }

    pub fn window_mut(&mut self, sensor_id: &str) -> &mut RollingWindow {
        let capacity = self.capacity;
        self.windows
            .entry(sensor_id.to_string())
            .or_insert_with(|| RollingWindow::new(capacity))
    }

    pub fn observe(&mut self, reading: &Reading<'_>) -> Option<Emission> {
        let window = self.window_mut(reading.sensor_id);
        window.push(reading.value);
        window.average().map(|average| Emission {
            timestamp: reading.timestamp.to_string(),
            sensor_id: reading.sensor_id.to_string(),
            average,
        })
    }
}

/// Splits `<timestamp> <sensor_id> <temperature>`.
pub fn parse_reading(line: &str) -> Result<Reading<'_>, MalformedLine> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    let &[timestamp, sensor_id, raw] = parts.as_slice() else {
        return Err(MalformedLine::TokenCount(parts.len()));
    };

    let value = raw
        .parse::<f64>()
        .map_err(|_| MalformedLine::BadReading(raw.to_string()))?;

    Ok(Reading {
        timestamp,
        sensor_id,
        value,
    })
}

/// Reads lines until the source is exhausted, writing one line per emission.
/// Malformed lines are skipped and never reach `out`.
pub async fn stream_rolling_averages<R, W>(
    reader: R,
    averager: &mut RollingAverager,
    out: &mut W,
) -> anyhow::Result<usize>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut segments = reader.split(b'\n');
    let mut line_number = 0usize;
    let mut emitted = 0usize;

    while let Some(bytes) = segments
        .next_segment()
        .await
        .context("failed to read sensor stream")?
    {
        line_number += 1;
        let line = String::from_utf8_lossy(&bytes);
        let reading = match parse_reading(&line) {
            Ok(reading) => reading,
            Err(err) => {
                debug!(line = line_number, "skipping reading: {err}");
                continue;
            }
        };

        if let Some(emission) = averager.observe(&reading) {
            writeln!(out, "{emission}").context("failed to write rolling average")?;
            out.flush().context("failed to flush rolling average")?;
            emitted += 1;
        }
    }

    info!(lines = line_number, emitted, "sensor stream exhausted");
    Ok(emitted)
}

/// Runs the stream until it is exhausted or `shutdown` resolves. An
/// interrupted run ends with the farewell line on `out`.
pub async fn stream_until_shutdown<R, W, S>(
    reader: R,
    averager: &mut RollingAverager,
    out: &mut W,
    shutdown: S,
) -> anyhow::Result<StreamEnd>
where
    R: AsyncBufRead + Unpin,
    W: Write,
    S: Future<Output = io::Result<()>>,
{
    let end = tokio::select! {
        result = stream_rolling_averages(reader, averager, out) => {
            StreamEnd::Exhausted { emitted: result? }
        }
        signal = shutdown => {
            signal.context("signal handler failed")?;
            StreamEnd::Interrupted
        }
    };

    if end == StreamEnd::Interrupted {
        info!("interrupt received; stopping sensor stream");
        writeln!(out, "{FAREWELL}").context("failed to write farewell")?;
        out.flush().context("failed to flush farewell")?;
    }
    Ok(end)
}
