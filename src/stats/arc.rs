//! Automatic Retry Count (ARC) estimation and aggregation.
//!
//! The radio reports a signal-strength-like value for the most recent send;
//! a fixed linear mapping turns that into the number of link-layer retries
//! the send needed, which feeds a running packet/retry/success aggregate.

use std::fmt;

/// Signal value corresponding to a zero-retry send. Calibrated to the radio
/// hardware; configuration constant, not a tunable.
const SIGNAL_OFFSET: i32 = 29;
/// Signal units per additional retry.
const SIGNAL_SCALE: i32 = 8;

/// Estimate the retries used by the most recent send from its reported
/// signal quality. Lower (more attenuated) signal means more retries.
pub fn estimate_retries(signal: i32) -> u32 {
    let arc = (-(signal + SIGNAL_OFFSET)) / SIGNAL_SCALE;
    if arc < 0 {
        0
    } else {
        arc as u32
    }
}

/// Running packet/retry aggregate with a derived success rate.
///
/// The success rate is recomputed on every update and is never read stale:
/// `100 * packets / (packets + retries)`, or 100 while no packet was sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArcAggregate {
    pub packets: u32,
    pub retries: u32,
    pub success_rate: u32,
}

impl Default for ArcAggregate {
    fn default() -> Self {
        Self { packets: 0, retries: 0, success_rate: 100 }
    }
}

impl ArcAggregate {
    /// Fold one completed send with `retries` estimated retries.
    pub fn record(&mut self, retries: u32) {
        self.packets = self.packets.saturating_add(1);
        self.retries = self.retries.saturating_add(retries);
        self.success_rate = Self::rate(self.packets, self.retries);
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    fn rate(packets: u32, retries: u32) -> u32 {
        if packets > 0 {
            (100u64 * packets as u64 / (packets as u64 + retries as u64)) as u32
        } else {
            100
        }
    }
}

/// Converts per-send signal reports into the running [`ArcAggregate`].
///
/// `observe_send` must be called exactly once per completed send attempt,
/// immediately after the transport reports the signal value. Calling it zero
/// times under-counts and calling it twice double-counts; the estimator
/// cannot detect either, so this is a precondition on the caller.
#[derive(Debug, Default)]
pub struct ArcEstimator {
    aggregate: ArcAggregate,
}

impl ArcEstimator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold the signal reported for one completed send. Returns the
    /// estimated retries so the caller can feed the per-peer counters from
    /// the same observation.
    pub fn observe_send(&mut self, signal: i32) -> u32 {
        let retries = estimate_retries(signal);
        self.aggregate.record(retries);
        retries
    }

    pub fn aggregate(&self) -> ArcAggregate {
        self.aggregate
    }

    pub fn reset(&mut self) {
        self.aggregate.reset();
    }
}

/// Largest digest payload the wire format allows: `{P:99999,R:99999,S:100}`.
pub const MAX_DIGEST_LEN: usize = 25;

/// Compact textual ARC summary, emitted periodically out-of-band.
///
/// Wire form is `{P:<packets>,R:<retries>,S:<successRate>}` with unsigned
/// decimal fields. Packets and retries are clamped to five digits so the
/// payload never exceeds [`MAX_DIGEST_LEN`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Digest {
    pub packets: u32,
    pub retries: u32,
    pub success_rate: u32,
}

impl From<ArcAggregate> for Digest {
    fn from(agg: ArcAggregate) -> Self {
        Self { packets: agg.packets, retries: agg.retries, success_rate: agg.success_rate }
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const FIELD_MAX: u32 = 99_999;
        write!(
            f,
            "{{P:{},R:{},S:{}}}",
            self.packets.min(FIELD_MAX),
            self.retries.min(FIELD_MAX),
            self.success_rate.min(100)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn estimate_anchor_points() {
        assert_eq!(estimate_retries(-29), 0);
        assert_eq!(estimate_retries(-37), 1);
        assert_eq!(estimate_retries(-45), 2);
    }

    #[test]
    fn estimate_never_negative() {
        assert_eq!(estimate_retries(0), 0);
        assert_eq!(estimate_retries(-10), 0);
    }

    #[test]
    fn estimate_monotone_in_attenuation() {
        let mut last = 0;
        for signal in (-120..=-29).rev() {
            let arc = estimate_retries(signal);
            assert!(arc >= last, "arc must not decrease as signal degrades");
            last = arc;
        }
    }

    #[test]
    fn aggregate_success_rate_recomputed() {
        let mut agg = ArcAggregate::default();
        assert_eq!(agg.success_rate, 100);
        agg.record(0);
        assert_eq!(agg.success_rate, 100);
        agg.record(2);
        assert_eq!((agg.packets, agg.retries), (2, 2));
        assert_eq!(agg.success_rate, 50);
    }

    #[test]
    fn digest_stays_within_bound() {
        let digest = Digest { packets: u32::MAX, retries: u32::MAX, success_rate: 100 };
        assert!(digest.to_string().len() <= MAX_DIGEST_LEN);
    }
}
