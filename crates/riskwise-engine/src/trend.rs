//! Trend analysis over the calculation history.

use crate::types::{CalculationHistoryRecord, RiskTrend};

/// Number of history records the analyzer looks at.
pub const TREND_WINDOW: usize = 10;

/// Records in each of the compared groups.
const GROUP_SIZE: usize = 3;

/// Mean movement (in score points) needed to leave `Stable`.
const TREND_THRESHOLD: f64 = 5.0;

/// Compare the mean of the three newest scores against the three before them.
///
/// `records` must be ordered newest first; only the first [`TREND_WINDOW`]
/// are considered. Fewer than three records, or nothing older than the
/// newest three, yields [`RiskTrend::Stable`].
#[must_use]
pub fn analyze_trend(records: &[CalculationHistoryRecord]) -> RiskTrend {
    let window = &records[..records.len().min(TREND_WINDOW)];
    if window.len() < GROUP_SIZE {
        return RiskTrend::Stable;
    }

    let (recent, rest) = window.split_at(GROUP_SIZE);
    let older = &rest[..rest.len().min(GROUP_SIZE)];
    if older.is_empty() {
        return RiskTrend::Stable;
    }

    let difference = mean_score(recent) - mean_score(older);
    if difference > TREND_THRESHOLD {
        RiskTrend::Increasing
    } else if difference < -TREND_THRESHOLD {
        RiskTrend::Decreasing
    } else {
        RiskTrend::Stable
    }
}

fn mean_score(records: &[CalculationHistoryRecord]) -> f64 {
    records.iter().map(|r| r.new_score).sum::<f64>() / records.len() as f64
}
