//! Sliding-window burst and flood detection.
//!
//! A [`RateWindow`] is a per-key trailing-interval counter: every insertion
//! prunes entries strictly older than `now - window`, so the window never
//! retains stale timestamps after an insertion. [`RateTracker`] owns the two
//! window families the console uses: per-channel join windows and
//! per-(channel, nick) message windows, created lazily on first observation
//! and never removed (churn-bounded, acceptable for an operator tool).
//!
//! Instances are thread-confined to the connection's receive task; no
//! internal locking.

use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

use crate::config::RatePolicy;

/// A trailing-time-interval event counter.
#[derive(Debug)]
pub struct RateWindow {
    window: Duration,
    hits: VecDeque<Instant>,
    /// Latch: set when an alert fired, cleared once the count decays
    /// below threshold so the alert can re-arm.
    alerted: bool,
}

impl RateWindow {
    /// Create a window of the given trailing length.
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            hits: VecDeque::new(),
            alerted: false,
        }
    }

    /// Record an event at `now`, then discard entries strictly older than
    /// `now - window`.
    pub fn add(&mut self, now: Instant) {
        self.hits.push_back(now);
        if let Some(cut) = now.checked_sub(self.window) {
            while self.hits.front().is_some_and(|&t| t < cut) {
                self.hits.pop_front();
            }
        }
    }

    /// Number of retained entries.
    pub fn count(&self) -> usize {
        self.hits.len()
    }

    /// One-shot threshold check: returns the count when it first crosses
    /// `threshold`, then stays quiet until the count decays below
    /// `threshold` again.
    fn trip(&mut self, threshold: u32) -> Option<usize> {
        let count = self.count();
        if count >= threshold as usize {
            if !self.alerted {
                self.alerted = true;
                return Some(count);
            }
        } else {
            self.alerted = false;
        }
        None
    }
}

/// Lazily-keyed window families for join bursts and message floods.
#[derive(Debug)]
pub struct RateTracker {
    policy: RatePolicy,
    joins: HashMap<String, RateWindow>,
    messages: HashMap<(String, String), RateWindow>,
}

impl RateTracker {
    /// Create a tracker with the given policy.
    pub fn new(policy: RatePolicy) -> Self {
        Self {
            policy,
            joins: HashMap::new(),
            messages: HashMap::new(),
        }
    }

    /// The active policy.
    pub fn policy(&self) -> &RatePolicy {
        &self.policy
    }

    /// Record a join in `channel`; returns the window count when the burst
    /// alert fires.
    pub fn note_join(&mut self, channel: &str, now: Instant) -> Option<usize> {
        let window = self.policy.window();
        let threshold = self.policy.threshold;
        let rw = self
            .joins
            .entry(channel.to_owned())
            .or_insert_with(|| RateWindow::new(window));
        rw.add(now);
        rw.trip(threshold)
    }

    /// Record a message from `nick` in `channel`; returns the window count
    /// when the flood alert fires.
    pub fn note_message(&mut self, channel: &str, nick: &str, now: Instant) -> Option<usize> {
        let window = self.policy.window();
        let threshold = self.policy.threshold;
        let rw = self
            .messages
            .entry((channel.to_owned(), nick.to_owned()))
            .or_insert_with(|| RateWindow::new(window));
        rw.add(now);
        rw.trip(threshold)
    }
}
