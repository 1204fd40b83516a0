//! Calculation history storage trait and in-memory implementation.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::Result;
use crate::ids::RiskId;
use crate::types::CalculationHistoryRecord;

/// Append-only audit trail of recalculations. Records are never removed.
#[async_trait]
pub trait CalculationHistoryStore: Send + Sync {
    /// Append a record.
    async fn append(&self, record: CalculationHistoryRecord) -> Result<()>;

    /// Most recent records for a risk, newest first, at most `limit`.
    async fn recent(&self, risk_id: RiskId, limit: usize) -> Result<Vec<CalculationHistoryRecord>>;
}

/// In-memory implementation of `CalculationHistoryStore`.
#[derive(Debug, Default)]
pub struct InMemoryCalculationHistoryStore {
    // Key: risk_id, Value: records in append order
    history: RwLock<HashMap<RiskId, Vec<CalculationHistoryRecord>>>,
}

impl InMemoryCalculationHistoryStore {
    /// Create a new in-memory history store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            history: RwLock::new(HashMap::new()),
        }
    }

    /// Get all records (for testing).
    pub fn get_all(&self) -> Vec<CalculationHistoryRecord> {
        self.history
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .flatten()
            .cloned()
            .collect()
    }

    /// Get count of all records (for testing).
    pub fn count(&self) -> usize {
        self.history
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .map(Vec::len)
            .sum()
    }
}

#[async_trait]
impl CalculationHistoryStore for InMemoryCalculationHistoryStore {
    async fn append(&self, record: CalculationHistoryRecord) -> Result<()> {
        self.history
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .entry(record.risk_id)
            .or_default()
            .push(record);
        Ok(())
    }

    async fn recent(&self, risk_id: RiskId, limit: usize) -> Result<Vec<CalculationHistoryRecord>> {
        let history = self.history.read().unwrap_or_else(|e| e.into_inner());

        let mut records: Vec<CalculationHistoryRecord> =
            history.get(&risk_id).cloned().unwrap_or_default();

        // Append order breaks ties between identical timestamps.
        records.reverse();
        records.sort_by(|a, b| b.calculated_at.cmp(&a.calculated_at));
        records.truncate(limit);

        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::HistoryRecordId;
    use crate::types::{RiskLevel, TriggerReason};
    use chrono::{Duration, Utc};

    fn record(risk_id: RiskId, score: f64, age_minutes: i64) -> CalculationHistoryRecord {
        CalculationHistoryRecord {
            id: HistoryRecordId::new(),
            risk_id,
            previous_score: 0.0,
            new_score: score,
            delta: score,
            level: RiskLevel::Medium,
            confidence: 0.6,
            trigger: TriggerReason::Manual,
            components: serde_json::Value::Null,
            calculated_at: Utc::now() - Duration::minutes(age_minutes),
        }
    }

    #[tokio::test]
    async fn test_recent_is_newest_first_and_limited() {
        let store = InMemoryCalculationHistoryStore::new();
        let risk_id = RiskId::new();

        store.append(record(risk_id, 10.0, 30)).await.unwrap();
        store.append(record(risk_id, 30.0, 10)).await.unwrap();
        store.append(record(risk_id, 20.0, 20)).await.unwrap();

        let recent = store.recent(risk_id, 2).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].new_score, 30.0);
        assert_eq!(recent[1].new_score, 20.0);
        assert_eq!(store.count(), 3);
    }

    #[tokio::test]
    async fn test_same_timestamp_latest_append_first() {
        let store = InMemoryCalculationHistoryStore::new();
        let risk_id = RiskId::new();
        let first = record(risk_id, 1.0, 0);
        let mut second = record(risk_id, 2.0, 0);
        second.calculated_at = first.calculated_at;

        store.append(first).await.unwrap();
        store.append(second).await.unwrap();

        let recent = store.recent(risk_id, 10).await.unwrap();
        assert_eq!(recent[0].new_score, 2.0);
    }

    #[tokio::test]
    async fn test_risk_isolation() {
        let store = InMemoryCalculationHistoryStore::new();
        let a = RiskId::new();
        let b = RiskId::new();

        store.append(record(a, 10.0, 1)).await.unwrap();
        store.append(record(b, 90.0, 1)).await.unwrap();

        let for_a = store.recent(a, 10).await.unwrap();
        assert_eq!(for_a.len(), 1);
        assert_eq!(for_a[0].new_score, 10.0);
        assert!(store.recent(RiskId::new(), 10).await.unwrap().is_empty());
        assert_eq!(store.count(), 2);
    }
}
