// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! A process-local zone.
//!
//! Used by `--dry-run` to show what the controller would write without touching
//! the real zone, and by tests to observe every call the reconciler makes.

use super::ZoneClient;
use crate::dns_errors::ZoneError;
use crate::record_codec::{describe_record, DnsRecordSet, RecordKind};
use std::collections::{BTreeMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::info;

/// A call observed by [`InMemoryZone`], in the order it was made.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ZoneCall {
    Upsert(DnsRecordSet),
    DeleteRecordSet { name: String, kind: RecordKind },
}

#[derive(Default)]
struct State {
    records: BTreeMap<(String, RecordKind), DnsRecordSet>,
    calls: Vec<ZoneCall>,
    upsert_failures: VecDeque<ZoneError>,
    delete_failures: VecDeque<ZoneError>,
}

/// In-memory [`ZoneClient`] with call recording and failure injection.
#[derive(Default)]
pub struct InMemoryZone {
    state: Mutex<State>,
}

impl InMemoryZone {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make the next upsert fail with `error` (queued, one failure per call).
    pub fn fail_next_upsert(&self, error: ZoneError) {
        self.lock().upsert_failures.push_back(error);
    }

    /// Make the next record-set delete fail with `error` (queued, one failure per call).
    pub fn fail_next_delete(&self, error: ZoneError) {
        self.lock().delete_failures.push_back(error);
    }

    /// Snapshot of the zone contents, ordered by `(name, kind)`.
    #[must_use]
    pub fn records(&self) -> Vec<DnsRecordSet> {
        self.lock().records.values().cloned().collect()
    }

    /// The record set stored for `(name, kind)`, if any.
    #[must_use]
    pub fn get(&self, name: &str, kind: RecordKind) -> Option<DnsRecordSet> {
        self.lock().records.get(&(name.to_string(), kind)).cloned()
    }

    /// Every call made so far, including failed ones.
    #[must_use]
    pub fn calls(&self) -> Vec<ZoneCall> {
        self.lock().calls.clone()
    }

    /// Forget recorded calls, keeping the zone contents.
    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }
}

#[async_trait::async_trait]
impl ZoneClient for InMemoryZone {
    async fn upsert(&self, record_set: &DnsRecordSet) -> Result<(), ZoneError> {
        let mut state = self.lock();
        state.calls.push(ZoneCall::Upsert(record_set.clone()));
        if let Some(error) = state.upsert_failures.pop_front() {
            return Err(error);
        }

        info!(
            record = %record_set.describe(),
            values = ?record_set.values(),
            ttl = record_set.ttl,
            "Upserted record set in in-memory zone"
        );
        state.records.insert(
            (record_set.name.clone(), record_set.kind()),
            record_set.clone(),
        );
        Ok(())
    }

    async fn delete_record_set(&self, name: &str, kind: RecordKind) -> Result<(), ZoneError> {
        let mut state = self.lock();
        state.calls.push(ZoneCall::DeleteRecordSet {
            name: name.to_string(),
            kind,
        });
        if let Some(error) = state.delete_failures.pop_front() {
            return Err(error);
        }

        if state.records.remove(&(name.to_string(), kind)).is_some() {
            info!(
                record = %describe_record(name, kind),
                "Deleted record set from in-memory zone"
            );
        }
        Ok(())
    }
}
