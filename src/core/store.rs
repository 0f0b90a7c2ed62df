use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Mutex, MutexGuard,
    },
    time::{Duration, Instant},
};

use tracing::debug;

use crate::types::{Language, Project};

/// Identifies one resolution request for a language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    lang: Language,
    serial: u64,
}

#[derive(Debug, Default)]
struct Slot {
    latest: u64,
    cached: Option<(Instant, Vec<Project>)>,
}

/// Resolved project lists per language.
///
/// Every load takes a [`Ticket`] first; a result is only kept if no newer
/// ticket was issued for the same language in the meantime, so a slow stale
/// load can never overwrite a fresher one.
#[derive(Debug)]
pub struct ProjectStore {
    ttl: Duration,
    serial: AtomicU64,
    slots: Mutex<HashMap<Language, Slot>>,
}

impl ProjectStore {
    pub fn new(ttl: Duration) -> Self {
        ProjectStore {
            ttl,
            serial: AtomicU64::new(0),
            slots: Mutex::new(HashMap::new()),
        }
    }

    fn slots(&self) -> MutexGuard<'_, HashMap<Language, Slot>> {
        self.slots.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn next_serial(&self) -> u64 {
        self.serial.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn begin(&self, lang: Language) -> Ticket {
        let serial = self.next_serial();
        self.slots().entry(lang).or_default().latest = serial;
        Ticket { lang, serial }
    }

    /// Stores `projects` unless the ticket was superseded. Returns whether it was kept.
    pub fn commit(&self, ticket: Ticket, projects: Vec<Project>) -> bool {
        let mut slots = self.slots();
        let slot = slots.entry(ticket.lang).or_default();
        if slot.latest != ticket.serial {
            debug!(
                "Discarding superseded {} result (ticket {}, latest {})",
                ticket.lang, ticket.serial, slot.latest
            );
            return false;
        }
        slot.cached = Some((Instant::now(), projects));
        true
    }

    pub fn fresh(&self, lang: Language) -> Option<Vec<Project>> {
        let slots = self.slots();
        let (stored_at, projects) = slots.get(&lang)?.cached.as_ref()?;
        (stored_at.elapsed() < self.ttl).then(|| projects.clone())
    }

    /// Drops every cached list and supersedes loads still in flight.
    pub fn invalidate(&self) {
        let mut slots = self.slots();
        for slot in slots.values_mut() {
            slot.latest = self.next_serial();
            slot.cached = None;
        }
    }
}
