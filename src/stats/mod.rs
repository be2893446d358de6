//! Delivery statistics for the relay node.
//!
//! One [`Statistics`] aggregate owns every mutable counter: the per-peer
//! table, the link totals, the ARC estimator, and the reset clock. It is
//! shared behind a single mutex ([`SharedStats`]) because transport
//! callbacks may interleave with the scheduler poll loop, and a reset must
//! not race an increment into a half-cleared state.

pub mod arc;
pub mod clock;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use self::arc::{ArcAggregate, ArcEstimator};
use self::clock::{Clock, ReportClock};

/// Identifies a mesh participant within this node's view.
pub type PeerId = u16;

/// Number of peer ids the counter table can hold. Ids at or beyond this are
/// dropped rather than grown into; bounded memory wins over completeness on
/// a fire-and-forget telemetry path.
pub const PEER_TABLE_CAPACITY: usize = 256;

/// Counters for one peer. `retries` only ever advances together with `sent`;
/// retries are a property of a send attempt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PeerEntry {
    pub received: u32,
    pub sent: u32,
    pub retries: u32,
}

impl PeerEntry {
    pub fn is_idle(&self) -> bool {
        self.received == 0 && self.sent == 0
    }

    /// Percentage of send attempts to this peer that succeeded without
    /// exhausting retries. `None` until at least one send was observed.
    pub fn success_rate(&self) -> Option<u32> {
        if self.sent > 0 {
            Some((100u64 * self.sent as u64 / (self.sent as u64 + self.retries as u64)) as u32)
        } else {
            None
        }
    }
}

/// Fixed-capacity sparse table of per-peer counters, indexed by peer id.
///
/// Entries spring into existence at zero on first observation and are only
/// ever removed by clearing the whole table.
pub struct PeerCounters {
    entries: [PeerEntry; PEER_TABLE_CAPACITY],
}

impl PeerCounters {
    pub fn new() -> Self {
        Self { entries: [PeerEntry::default(); PEER_TABLE_CAPACITY] }
    }

    /// Count one message received from `peer`. Returns false when the id is
    /// beyond capacity and the event was dropped.
    pub fn record_received(&mut self, peer: PeerId) -> bool {
        match self.entries.get_mut(peer as usize) {
            Some(entry) => {
                entry.received = entry.received.saturating_add(1);
                true
            }
            None => false,
        }
    }

    /// Count one send to `peer` that used `retries` retries. Returns false
    /// when the id is beyond capacity and the event was dropped.
    pub fn record_sent(&mut self, peer: PeerId, retries: u32) -> bool {
        match self.entries.get_mut(peer as usize) {
            Some(entry) => {
                entry.sent = entry.sent.saturating_add(1);
                entry.retries = entry.retries.saturating_add(retries);
                true
            }
            None => false,
        }
    }

    pub fn get(&self, peer: PeerId) -> PeerEntry {
        self.entries.get(peer as usize).copied().unwrap_or_default()
    }

    pub fn clear(&mut self) {
        self.entries = [PeerEntry::default(); PEER_TABLE_CAPACITY];
    }

    /// Peers with any traffic since the last clear.
    pub fn iter_active(&self) -> impl Iterator<Item = (PeerId, &PeerEntry)> {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, e)| !e.is_idle())
            .map(|(id, e)| (id as PeerId, e))
    }
}

impl Default for PeerCounters {
    fn default() -> Self {
        Self::new()
    }
}

/// Aggregate link counters. Monotonically non-decreasing between resets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinkStats {
    pub received: u32,
    pub sent: u32,
    pub forwarded_received: u32,
    pub forwarded_sent: u32,
    pub errors: u32,
}

/// Direction of traffic relayed on behalf of the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForwardDirection {
    Received,
    Sent,
}

/// Point-in-time copy of everything the report composer renders.
#[derive(Clone)]
pub struct StatsSnapshot {
    pub link: LinkStats,
    pub arc: ArcAggregate,
    pub peers: [PeerEntry; PEER_TABLE_CAPACITY],
    pub elapsed_secs: u64,
    pub last_reset_epoch: i64,
    pub now_epoch: i64,
}

impl StatsSnapshot {
    pub fn peer(&self, peer: PeerId) -> PeerEntry {
        self.peers.get(peer as usize).copied().unwrap_or_default()
    }
}

/// The statistics engine: every counter the node maintains, in one place
/// with one lifetime. Constructed once at startup and shared by the
/// transport observer, the scheduler-driven reporter, and the web surface.
pub struct Statistics {
    peers: PeerCounters,
    link: LinkStats,
    arc: ArcEstimator,
    clock: ReportClock,
}

impl Statistics {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            peers: PeerCounters::new(),
            link: LinkStats::default(),
            arc: ArcEstimator::new(),
            clock: ReportClock::new(clock),
        }
    }

    /// One message received from `peer`. Dropped entirely when the id is
    /// beyond the table capacity, so per-peer and aggregate sums stay
    /// consistent.
    pub fn on_received(&mut self, peer: PeerId) {
        if self.peers.record_received(peer) {
            self.link.received = self.link.received.saturating_add(1);
        }
    }

    /// One completed send towards `peer`, with the signal quality the radio
    /// reported for it. Estimates the retries once and feeds the per-peer
    /// table, the link totals, and the ARC aggregate from that single
    /// observation. Returns the estimated retries.
    ///
    /// Must be called exactly once per completed send attempt; see
    /// [`ArcEstimator::observe_send`].
    pub fn on_sent(&mut self, peer: PeerId, signal: i32) -> u32 {
        let retries = self.arc.observe_send(signal);
        if self.peers.record_sent(peer, retries) {
            self.link.sent = self.link.sent.saturating_add(1);
        }
        retries
    }

    pub fn on_forward_traffic(&mut self, direction: ForwardDirection) {
        match direction {
            ForwardDirection::Received => {
                self.link.forwarded_received = self.link.forwarded_received.saturating_add(1)
            }
            ForwardDirection::Sent => {
                self.link.forwarded_sent = self.link.forwarded_sent.saturating_add(1)
            }
        }
    }

    pub fn on_error(&mut self) {
        self.link.errors = self.link.errors.saturating_add(1);
    }

    /// Zero every counter and restart the elapsed clock. Callers hold the
    /// surrounding mutex for the whole call, so no concurrent increment can
    /// observe a half-cleared state.
    pub fn reset(&mut self) {
        self.peers.clear();
        self.link = LinkStats::default();
        self.arc.reset();
        self.clock.reset();
    }

    pub fn link(&self) -> LinkStats {
        self.link
    }

    pub fn arc_aggregate(&self) -> ArcAggregate {
        self.arc.aggregate()
    }

    pub fn peer(&self, peer: PeerId) -> PeerEntry {
        self.peers.get(peer)
    }

    pub fn success_rate_for(&self, peer: PeerId) -> Option<u32> {
        self.peers.get(peer).success_rate()
    }

    pub fn elapsed_secs(&self) -> u64 {
        self.clock.elapsed_secs()
    }

    pub fn active_peers(&self) -> Vec<(PeerId, PeerEntry)> {
        self.peers.iter_active().map(|(id, e)| (id, *e)).collect()
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            link: self.link,
            arc: self.arc.aggregate(),
            peers: self.peers.entries,
            elapsed_secs: self.clock.elapsed_secs(),
            last_reset_epoch: self.clock.last_reset_epoch(),
            now_epoch: self.clock.now_epoch(),
        }
    }
}

/// Shared handle to the statistics engine.
pub type SharedStats = Arc<Mutex<Statistics>>;

/// Build a fresh shared statistics engine on the given clock.
pub fn shared(clock: Arc<dyn Clock>) -> SharedStats {
    Arc::new(Mutex::new(Statistics::new(clock)))
}

/// Lock the shared statistics. A poisoned lock still yields the data; the
/// counters stay usable after a panicked holder.
pub fn lock(stats: &SharedStats) -> MutexGuard<'_, Statistics> {
    stats.lock().unwrap_or_else(PoisonError::into_inner)
}
