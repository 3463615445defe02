//! Run tokens and the interruption table
//!
//! Every run gets a fresh [`RunToken`]; the table records per token whether the
//! run was interrupted. Lookups are by token rather than "latest run" so that a
//! stale run settling after a newer one started is recognised and discarded.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use tokio::time::Instant;

/// Identifier of one run, strictly increasing for the life of the process
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunToken(i64);

impl RunToken {
    pub fn as_millis(self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for RunToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "run-{}", self.0)
    }
}

/// Mints wall-clock millisecond tokens, bumped when two runs share a millisecond
#[derive(Debug, Default)]
pub struct TokenMint {
    last: i64,
}

impl TokenMint {
    pub fn mint(&mut self) -> RunToken {
        let now = chrono::Utc::now().timestamp_millis();
        let next = now.max(self.last.saturating_add(1));
        self.last = next;
        RunToken(next)
    }
}

#[derive(Debug, Clone, Copy)]
struct Entry {
    interrupted: bool,
    settled: bool,
    created_at: Instant,
}

impl Entry {
    /// Nothing will consult the flag of a settled run, and an interrupted run
    /// reads the same whether its entry is present or not.
    fn evictable(&self) -> bool {
        self.settled || self.interrupted
    }
}

/// Token to interrupted-flag map with size and age limits
///
/// Only entries of settled or interrupted runs are evicted, and never the
/// newest one. A run still in flight keeps its entry past both limits, so the
/// capacity is a bound on finished bookkeeping, not on concurrent runs. A token
/// that is not in the table reads as interrupted.
#[derive(Debug)]
pub struct InterruptionTable {
    entries: BTreeMap<RunToken, Entry>,
    capacity: usize,
    ttl: Duration,
}

impl InterruptionTable {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            entries: BTreeMap::new(),
            capacity: capacity.max(1),
            ttl,
        }
    }

    /// Register a new run as not interrupted
    pub fn begin(&mut self, token: RunToken) {
        self.entries.insert(
            token,
            Entry {
                interrupted: false,
                settled: false,
                created_at: Instant::now(),
            },
        );
        self.evict();
    }

    /// Flag `token` interrupted; returns `false` if the token is unknown
    pub fn interrupt(&mut self, token: RunToken) -> bool {
        match self.entries.get_mut(&token) {
            Some(entry) => {
                entry.interrupted = true;
                true
            }
            None => false,
        }
    }

    /// Mark the run of `token` finished; its entry becomes evictable
    pub fn settle(&mut self, token: RunToken) {
        if let Some(entry) = self.entries.get_mut(&token) {
            entry.settled = true;
        }
    }

    pub fn is_interrupted(&self, token: RunToken) -> bool {
        self.entries.get(&token).is_none_or(|entry| entry.interrupted)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn evict(&mut self) {
        let Some(newest) = self.entries.keys().next_back().copied() else {
            return;
        };

        let before = self.entries.len();
        let ttl = self.ttl;
        self.entries.retain(|token, entry| {
            *token == newest || !entry.evictable() || entry.created_at.elapsed() <= ttl
        });

        let mut excess = self.entries.len().saturating_sub(self.capacity);
        if excess > 0 {
            self.entries.retain(|token, entry| {
                if excess > 0 && *token != newest && entry.evictable() {
                    excess -= 1;
                    false
                } else {
                    true
                }
            });
        }

        let evicted = before - self.entries.len();
        if evicted > 0 {
            log::debug!(
                "Evicted {} interruption entries ({} retained)",
                evicted,
                self.entries.len()
            );
        }
    }
}
