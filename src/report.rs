use std::fmt::Write;

use crate::models::SensorErrorRank;

const RULE_WIDTH: usize = 55;

/// Renders the ranked error table printed after a log analysis run.
pub fn render_top_errors(limit: usize, ranks: &[SensorErrorRank]) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "Top {limit} sensors with highest errors:");
    let _ = writeln!(output);
    let _ = writeln!(output, "Sensor ID | OK Count | Error Count | Error Percentage");
    let _ = writeln!(output, "{}", "-".repeat(RULE_WIDTH));

    for rank in ranks {
        let _ = writeln!(
            output,
            "{:<9} | {:<8} | {:<11} | {:>6.2}%",
            rank.sensor_id, rank.ok, rank.error, rank.error_pct
        );
    }

    output
}
