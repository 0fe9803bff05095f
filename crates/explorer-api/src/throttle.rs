// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Per-host throttling of unauthenticated explorer requests
//!
//! Explorers without an API key enforce strict rate limits, so requests to the
//! same host are spaced at least [`BLOCK_EXPLORER_RATE_LIMIT`] apart. The table
//! of last-queried instants is shared by every clone of a [`HostThrottle`], which
//! makes one handle the process-wide critical section for all callers that
//! target the same explorer.
//!
//! Time comes from [`tokio::time::Instant`], so tests drive the throttle with a
//! paused runtime clock instead of real sleeps.

use std::{sync::Arc, time::Duration};

use dashmap::{DashMap, mapref::entry::Entry};
use tokio::time::{Instant, sleep_until};
use tracing::{debug, trace};

/// Minimum spacing between unauthenticated requests to one host (once every 5.1 seconds)
pub const BLOCK_EXPLORER_RATE_LIMIT: Duration = Duration::from_millis(5100);

/// Shared table of per-host request instants
#[derive(Debug, Clone)]
pub struct HostThrottle {
    spacing: Duration,
    last_queried: Arc<DashMap<String, Instant>>,
}

impl Default for HostThrottle {
    fn default() -> Self {
        Self::new()
    }
}

impl HostThrottle {
    /// Create a throttle using the default explorer rate limit
    pub fn new() -> Self {
        Self::with_spacing(BLOCK_EXPLORER_RATE_LIMIT)
    }

    /// Create a throttle with a custom minimum spacing
    pub fn with_spacing(spacing: Duration) -> Self {
        Self {
            spacing,
            last_queried: Arc::new(DashMap::new()),
        }
    }

    /// Minimum spacing between requests to the same host
    pub fn spacing(&self) -> Duration {
        self.spacing
    }

    /// Wait until the next request to `host` may be issued
    ///
    /// The request slot is reserved before waiting, so concurrent callers queue
    /// up behind each other instead of all observing an idle host. The returned
    /// permit records the host as queried when it is dropped; hold it for the
    /// duration of the request so the record happens on success and failure
    /// alike.
    ///
    /// A caller dropped while still waiting hands its slot back, so a cancelled
    /// request does not delay the callers behind it.
    pub async fn wait_if_needed(&self, host: &str) -> ThrottlePermit {
        let now = Instant::now();
        let (slot, previous) = self.reserve(host, now);
        let mut pending = PendingSlot {
            throttle: self,
            host,
            slot,
            previous,
            released: false,
        };
        let wait = slot.saturating_duration_since(now);

        if !wait.is_zero() {
            debug!(
                host,
                wait_ms = wait.as_millis(),
                "waiting for explorer rate limit"
            );
            sleep_until(slot).await;
        }
        pending.released = true;

        ThrottlePermit {
            throttle: self.clone(),
            host: host.to_owned(),
        }
    }

    /// Record that a request to `host` settled at `at`
    ///
    /// The recorded instant never moves backwards, so an older completion does
    /// not shorten a reservation made by another caller.
    pub fn record_queried(&self, host: &str, at: Instant) {
        self.last_queried
            .entry(host.to_owned())
            .and_modify(|last| {
                if at > *last {
                    *last = at;
                }
            })
            .or_insert(at);
        trace!(host, "recorded explorer query");
    }

    /// Last recorded or reserved request instant for `host`
    pub fn last_queried(&self, host: &str) -> Option<Instant> {
        self.last_queried.get(host).map(|entry| *entry.value())
    }

    /// How long a request to `host` issued now would have to wait
    pub fn time_until_available(&self, host: &str) -> Duration {
        self.last_queried(host).map_or(Duration::ZERO, |last| {
            (last + self.spacing).saturating_duration_since(Instant::now())
        })
    }

    /// Number of distinct hosts seen so far
    pub fn tracked_hosts(&self) -> usize {
        self.last_queried.len()
    }

    /// Claim the next free slot for `host` in one map-entry critical section
    ///
    /// Returns the slot and the instant it replaced.
    fn reserve(&self, host: &str, now: Instant) -> (Instant, Option<Instant>) {
        match self.last_queried.entry(host.to_owned()) {
            Entry::Occupied(mut entry) => {
                let slot = (*entry.get() + self.spacing).max(now);
                let previous = entry.insert(slot);
                (slot, Some(previous))
            }
            Entry::Vacant(entry) => {
                entry.insert(now);
                (now, None)
            }
        }
    }

    /// Undo an unused reservation, unless a later caller has reserved since
    fn release(&self, host: &str, slot: Instant, previous: Option<Instant>) {
        if let Entry::Occupied(mut entry) = self.last_queried.entry(host.to_owned())
            && *entry.get() == slot
        {
            match previous {
                Some(previous) => {
                    entry.insert(previous);
                }
                None => {
                    entry.remove();
                }
            }
            debug!(host, "released unused explorer slot");
        }
    }
}

/// Reservation held while a caller waits for its slot
struct PendingSlot<'a> {
    throttle: &'a HostThrottle,
    host: &'a str,
    slot: Instant,
    previous: Option<Instant>,
    released: bool,
}

impl Drop for PendingSlot<'_> {
    fn drop(&mut self) {
        if !self.released {
            self.throttle.release(self.host, self.slot, self.previous);
        }
    }
}

/// Proof that a request to a host may proceed
///
/// Dropping the permit records the host as queried at the drop instant.
#[derive(Debug)]
#[must_use = "dropping the permit immediately records the query before it is sent"]
pub struct ThrottlePermit {
    throttle: HostThrottle,
    host: String,
}

impl ThrottlePermit {
    /// Host this permit was issued for
    pub fn host(&self) -> &str {
        &self.host
    }
}

impl Drop for ThrottlePermit {
    fn drop(&mut self) {
        self.throttle.record_queried(&self.host, Instant::now());
    }
}
