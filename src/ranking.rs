use std::cmp::Reverse;
use std::collections::BinaryHeap;

use crate::log_analysis::SensorTally;
use crate::models::SensorErrorRank;

/// Picks the `limit` sensors with the most errors without sorting the whole
/// tally. Equal error counts are ordered by sensor id, ascending.
pub fn top_sensors_by_errors(tally: &SensorTally, limit: usize) -> Vec<SensorErrorRank> {
    if limit == 0 {
        return Vec::new();
    }

    // min-heap of the best `limit` keys seen so far
    let mut heap: BinaryHeap<Reverse<(u64, Reverse<&str>)>> = BinaryHeap::with_capacity(limit + 1);
    for (sensor_id, counts) in tally.iter() {
        heap.push(Reverse((counts.error, Reverse(sensor_id))));
        if heap.len() > limit {
            heap.pop();
        }
    }

    heap.into_sorted_vec()
        .into_iter()
        .map(|Reverse((_, Reverse(sensor_id)))| {
            let counts = tally.get(sensor_id).copied().unwrap_or_default();
            SensorErrorRank {
                sensor_id: sensor_id.to_string(),
                ok: counts.ok,
                error: counts.error,
                error_pct: counts.error_percentage(),
            }
        })
        .collect()
}
