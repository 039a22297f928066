#![forbid(unsafe_code)]

use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

/// How much of an instance a validator recomputes from its seed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValidationMode {
    /// Every field is recomputed and compared.
    #[default]
    Full,
    /// Key fields and the fields a scenario declares load-bearing.
    Minimal,
}

impl ValidationMode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Minimal => "minimal",
        }
    }

    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "full" | "strict" => Some(Self::Full),
            "minimal" | "smoke" => Some(Self::Minimal),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleAction {
    Alloc,
    Release,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifecycleEvent {
    pub ts_millis: u128,
    pub type_name: &'static str,
    pub action: LifecycleAction,
    /// Heap buffers (sequences, strings, present optionals) freed by a
    /// release; always 0 for allocations.
    pub owned_buffers: usize,
}

/// Per-worker record of instance allocations and releases.
#[derive(Debug, Default, Clone)]
pub struct LifecycleLedger {
    events: Vec<LifecycleEvent>,
}

impl LifecycleLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_alloc(&mut self, type_name: &'static str) {
        self.record(type_name, LifecycleAction::Alloc, 0);
    }

    pub fn record_release(&mut self, type_name: &'static str, owned_buffers: usize) {
        self.record(type_name, LifecycleAction::Release, owned_buffers);
    }

    fn record(&mut self, type_name: &'static str, action: LifecycleAction, owned_buffers: usize) {
        let ts_millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| d.as_millis());
        self.events.push(LifecycleEvent {
            ts_millis,
            type_name,
            action,
            owned_buffers,
        });
    }

    #[must_use]
    pub fn events(&self) -> &[LifecycleEvent] {
        &self.events
    }

    #[must_use]
    pub fn last(&self) -> Option<&LifecycleEvent> {
        self.events.last()
    }

    #[must_use]
    pub fn released_buffers(&self) -> usize {
        self.events
            .iter()
            .filter(|event| event.action == LifecycleAction::Release)
            .map(|event| event.owned_buffers)
            .sum()
    }

    /// Net live instances per type: allocations minus releases. Types whose
    /// count returned to zero are omitted.
    #[must_use]
    pub fn live_counts(&self) -> BTreeMap<&'static str, i64> {
        let mut live: BTreeMap<&'static str, i64> = BTreeMap::new();
        for event in &self.events {
            let slot = live.entry(event.type_name).or_insert(0);
            match event.action {
                LifecycleAction::Alloc => *slot += 1,
                LifecycleAction::Release => *slot -= 1,
            }
        }
        live.retain(|_, count| *count != 0);
        live
    }

    /// Allocations not yet matched by a release, per type.
    #[must_use]
    pub fn outstanding(&self) -> BTreeMap<&'static str, usize> {
        self.live_counts()
            .into_iter()
            .filter_map(|(name, count)| usize::try_from(count).ok().map(|count| (name, count)))
            .collect()
    }

    /// Releases with no matching allocation, per type: double releases or
    /// instances that never went through `record_alloc`.
    #[must_use]
    pub fn over_released(&self) -> BTreeMap<&'static str, usize> {
        self.live_counts()
            .into_iter()
            .filter(|&(_, count)| count < 0)
            .filter_map(|(name, count)| {
                usize::try_from(count.unsigned_abs())
                    .ok()
                    .map(|count| (name, count))
            })
            .collect()
    }

    /// Every type's alloc and release counts agree exactly.
    #[must_use]
    pub fn is_balanced(&self) -> bool {
        self.live_counts().is_empty()
    }
}
