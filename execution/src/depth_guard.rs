use breakout_markets::{L2Depth, OrderSide};

/// Fraction of the 0.3%-band depth that approximates what's resting
/// within 5bps of the touch: `depth_at_5_bps ≈ depth_0_3pct * (5/30)`.
const FIVE_BPS_OF_THIRTY: f64 = 5.0 / 30.0;

/// Outcome of running a requested notional through the depth guard.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DepthGuardOutcome {
    /// The book could absorb the full request.
    Passed { notional: f64 },
    /// The book couldn't absorb the full request, but could absorb
    /// enough (`allowed >= 30%` of what was asked) that scaling down is
    /// worth doing rather than walking away.
    Scaled { notional: f64 },
    /// The book is too thin even to be worth scaling into — fill here
    /// would be mostly someone else's liquidity's price impact.
    Rejected,
}

/// A depth snapshot paired with the participation cap it's being checked
/// against: no single child order may consume more than
/// `max_participation` of the depth resting within 5bps of the touch on
/// the side it would hit.
#[derive(Debug, Clone, Copy)]
pub struct DepthEnvelope {
    pub depth: L2Depth,
    pub max_participation: f64,
}

impl DepthEnvelope {
    pub fn new(depth: L2Depth, max_participation: f64) -> Self {
        Self { depth, max_participation }
    }

    /// Notional resting within 5bps of the touch on `side`.
    pub fn depth_at_5_bps(&self, side: OrderSide) -> f64 {
        self.depth.depth_0_3pct_for_side(side) * FIVE_BPS_OF_THIRTY
    }

    /// The largest notional one child order may take without exceeding
    /// the participation cap.
    pub fn max_child_notional(&self, side: OrderSide) -> f64 {
        self.depth_at_5_bps(side) * self.max_participation
    }

    /// Runs `requested_notional` through the guard: passes it through
    /// unchanged if the book can absorb it, scales it down to `allowed`
    /// if that's still at least 30% of what was asked, or rejects it
    /// outright if even that would be too large a bite of the available
    /// depth.
    pub fn check(&self, requested_notional: f64, side: OrderSide) -> DepthGuardOutcome {
        let allowed = self.max_child_notional(side);
        if allowed <= 0.0 {
            return DepthGuardOutcome::Rejected;
        }
        if requested_notional <= allowed {
            return DepthGuardOutcome::Passed { notional: requested_notional };
        }
        if allowed < 0.3 * requested_notional {
            DepthGuardOutcome::Rejected
        } else {
            DepthGuardOutcome::Scaled { notional: allowed }
        }
    }

    /// Clip `requested_notional` down to the depth guard, reporting
    /// whether clipping occurred. A convenience wrapper over
    /// [`Self::check`] for callers that already decided a reject isn't
    /// reachable in their context (e.g. re-clipping within a slice that
    /// already passed the guard once).
    pub fn guard(&self, requested_notional: f64, side: OrderSide) -> (f64, bool) {
        match self.check(requested_notional, side) {
            DepthGuardOutcome::Passed { notional } => (notional, false),
            DepthGuardOutcome::Scaled { notional } => (notional, true),
            DepthGuardOutcome::Rejected => (0.0, true),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clips_notional_exceeding_participation_cap() {
        let depth = L2Depth::new(99.0, 101.0, 1_000.0, 2_000.0, 1_000.0, 2_000.0, 10.0, 0.0).unwrap();
        let envelope = DepthEnvelope::new(depth, 0.5);
        // depth_at_5_bps = 1_000 * 5/30 = 166.67; allowed = 83.33
        let (clipped, did_clip) = envelope.guard(150.0, OrderSide::Buy);
        assert!(did_clip);
        assert!((clipped - 83.333_333).abs() < 1e-3);
    }

    #[test]
    fn passes_through_when_within_cap() {
        let depth = L2Depth::new(99.0, 101.0, 1_000.0, 2_000.0, 1_000.0, 2_000.0, 10.0, 0.0).unwrap();
        let envelope = DepthEnvelope::new(depth, 0.5);
        let (clipped, did_clip) = envelope.guard(50.0, OrderSide::Buy);
        assert!(!did_clip);
        assert_eq!(clipped, 50.0);
    }

    #[test]
    fn rejects_when_allowed_is_too_thin_to_scale_into() {
        let depth = L2Depth::new(99.0, 101.0, 100.0, 200.0, 100.0, 200.0, 10.0, 0.0).unwrap();
        let envelope = DepthEnvelope::new(depth, 0.1);
        // depth_at_5_bps = 100 * 5/30 = 16.67; allowed = 1.67, asked for 1_000
        let outcome = envelope.check(1_000.0, OrderSide::Buy);
        assert_eq!(outcome, DepthGuardOutcome::Rejected);
    }

    #[test]
    fn scales_when_allowed_clears_the_thirty_percent_floor() {
        let depth = L2Depth::new(99.0, 101.0, 1_000.0, 2_000.0, 1_000.0, 2_000.0, 10.0, 0.0).unwrap();
        let envelope = DepthEnvelope::new(depth, 1.0);
        // depth_at_5_bps = 1_000 * 5/30 = 166.67, allowed == that (max_participation 1.0)
        // requested 200 > allowed 166.67, but 166.67 >= 0.3*200 = 60 -> scale
        let outcome = envelope.check(200.0, OrderSide::Buy);
        assert!(matches!(outcome, DepthGuardOutcome::Scaled { .. }));
    }
}
