//! Event store access — read-only queries over the append-only interaction
//! event log.
//!
//! The pipeline treats the store as an external collaborator: it never writes,
//! never locks, and a store failure is the one error that aborts report
//! generation outright.

use async_trait::async_trait;
use dashmap::DashMap;
use insight_core::types::{is_conversion_event, RawEvent, TimeRange};
use insight_core::{InsightError, InsightResult};
use std::sync::atomic::{AtomicU64, Ordering};

/// Read-only query surface over the raw event log.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// All events received within `range`, in ingestion order.
    async fn events_in_range(&self, range: &TimeRange) -> InsightResult<Vec<RawEvent>>;

    /// Events received within `range` for one visitor.
    async fn events_for_visitor(
        &self,
        range: &TimeRange,
        visitor_id: &str,
    ) -> InsightResult<Vec<RawEvent>> {
        let events = self.events_in_range(range).await?;
        Ok(events
            .into_iter()
            .filter(|e| e.visitor_id.as_deref() == Some(visitor_id))
            .collect())
    }

    /// Events within `range` whose name is one of the recognized conversion
    /// events.
    async fn conversion_events_in_range(&self, range: &TimeRange) -> InsightResult<Vec<RawEvent>> {
        let events = self.events_in_range(range).await?;
        Ok(events
            .into_iter()
            .filter(|e| {
                e.event_name
                    .as_deref()
                    .map(is_conversion_event)
                    .unwrap_or(false)
            })
            .collect())
    }
}

/// In-memory, append-only event store.
///
/// Backs the test suite and the CLI (which loads a JSON event export into it).
/// Insertion order is preserved so that equal-timestamp events keep a stable
/// tiebreak during session reconstruction.
pub struct MemoryEventStore {
    events: DashMap<u64, RawEvent>,
    next_seq: AtomicU64,
}

impl MemoryEventStore {
    pub fn new() -> Self {
        Self {
            events: DashMap::new(),
            next_seq: AtomicU64::new(0),
        }
    }

    /// Append one event. Events are immutable once written.
    pub fn append(&self, event: RawEvent) {
        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst);
        self.events.insert(seq, event);
    }

    pub fn append_all(&self, events: impl IntoIterator<Item = RawEvent>) {
        for event in events {
            self.append(event);
        }
    }

    /// Load events from a JSON array export (the CLI ingestion path).
    pub fn from_json(json: &str) -> InsightResult<Self> {
        let events: Vec<RawEvent> = serde_json::from_str(json)
            .map_err(|e| InsightError::Store(format!("invalid event export: {e}")))?;
        let store = Self::new();
        let count = events.len();
        store.append_all(events);
        tracing::info!(events = count, "Loaded event export into memory store");
        Ok(store)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl Default for MemoryEventStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventStore for MemoryEventStore {
    async fn events_in_range(&self, range: &TimeRange) -> InsightResult<Vec<RawEvent>> {
        let mut matching: Vec<(u64, RawEvent)> = self
            .events
            .iter()
            .filter(|entry| range.contains(entry.value().received_at))
            .map(|entry| (*entry.key(), entry.value().clone()))
            .collect();
        matching.sort_by_key(|(seq, _)| *seq);
        Ok(matching.into_iter().map(|(_, event)| event).collect())
    }
}
