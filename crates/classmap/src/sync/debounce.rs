//! Edit coalescing for the sync service

use std::time::Duration;

use tokio::time::Instant;

/// Tracks pending edits and decides when the next run is due
///
/// A run is due once input has been quiet for the quiescence window, or once
/// the first pending edit is `max_batch` old, whichever comes first. A forced
/// run is due immediately.
#[derive(Debug, Clone)]
pub(crate) struct DebounceState {
    quiescence: Duration,
    max_batch: Duration,
    dirty: bool,
    pending: usize,
    first_event: Option<Instant>,
    last_event: Option<Instant>,
    force_immediate: bool,
}

impl DebounceState {
    pub const fn new(quiescence: Duration, max_batch: Duration) -> Self {
        Self {
            quiescence,
            max_batch,
            dirty: false,
            pending: 0,
            first_event: None,
            last_event: None,
            force_immediate: false,
        }
    }

    pub fn record_event(&mut self) {
        let now = Instant::now();
        self.pending += 1;
        self.last_event = Some(now);
        self.first_event.get_or_insert(now);
        self.dirty = true;
    }

    pub fn force_run(&mut self) {
        self.force_immediate = true;
        self.dirty = true;
    }

    pub const fn pending(&self) -> usize {
        self.pending
    }

    pub const fn should_run(&self) -> bool {
        self.dirty
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        if !self.dirty {
            return None;
        }
        if self.force_immediate {
            return Some(Instant::now());
        }

        let quiet = self.last_event.map(|last| last + self.quiescence);
        let forced = self.first_event.map(|first| first + self.max_batch);
        match (quiet, forced) {
            (Some(quiet), Some(forced)) => Some(quiet.min(forced)),
            (quiet, forced) => quiet.or(forced),
        }
    }

    pub fn reset(&mut self) {
        self.dirty = false;
        self.pending = 0;
        self.first_event = None;
        self.last_event = None;
        self.force_immediate = false;
    }

    #[cfg(test)]
    const fn force_flag(&self) -> bool {
        self.force_immediate
    }
}
