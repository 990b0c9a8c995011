/// TWAP slicing and iceberg clipping policy: large orders are split
/// across time (TWAP) and, within each time slice, revealed in small
/// clips (iceberg) so no single child order signals the full size to the
/// book.
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TwapPlan {
    pub slice_count: usize,
    pub interval: Duration,
}

/// Split `total_qty` into `plan.slice_count` roughly-equal slices; any
/// remainder from integer-style splitting is folded into the last slice so
/// the sum always equals `total_qty` exactly.
pub fn twap_slices(total_qty: f64, plan: &TwapPlan) -> Vec<f64> {
    if plan.slice_count <= 1 || total_qty <= 0.0 {
        return vec![total_qty];
    }
    let base = total_qty / plan.slice_count as f64;
    let mut slices = vec![base; plan.slice_count - 1];
    let allocated: f64 = slices.iter().sum();
    slices.push(total_qty - allocated);
    slices
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IcebergPolicy {
    /// Fraction of the slice's remaining quantity revealed per clip.
    pub display_fraction: f64,
    pub min_clip_qty: f64,
}

/// Break one TWAP slice into iceberg clips: reveal `display_fraction` of
/// what's left each time, floored at `min_clip_qty`, until the slice is
/// fully accounted for.
pub fn iceberg_clips(slice_qty: f64, policy: &IcebergPolicy) -> Vec<f64> {
    let mut remaining = slice_qty;
    let mut clips = Vec::new();
    while remaining > 1e-12 {
        let clip = (remaining * policy.display_fraction)
            .max(policy.min_clip_qty)
            .min(remaining);
        clips.push(clip);
        remaining -= clip;
    }
    clips
}

/// Whether `notional_usd` is large enough that it should be worked via
/// TWAP + iceberg rather than sent as a single child order.
pub fn should_slice(notional_usd: f64, iceberg_notional_threshold_usd: f64) -> bool {
    notional_usd > iceberg_notional_threshold_usd
}

/// How many TWAP slices a depth-aware execution needs:
/// `ceil(notional / (depth_at_5_bps * max_depth_fraction))`, clamped to
/// `[min_slices, max_slices]`. With no usable depth-per-slice figure,
/// falls back to `min_slices`.
pub fn desired_slices(notional_usd: f64, per_slice_capacity_usd: f64, min_slices: usize, max_slices: usize) -> usize {
    if per_slice_capacity_usd <= 0.0 {
        return min_slices.max(1);
    }
    let raw = (notional_usd / per_slice_capacity_usd).ceil() as usize;
    raw.clamp(min_slices.max(1), max_slices.max(min_slices.max(1)))
}

/// Whether a child order this tight to the spread can be posted
/// maker-only instead of crossing the spread as a taker.
pub fn should_post_only(spread_bps: f64, post_only_max_spread_bps: f64) -> bool {
    spread_bps <= post_only_max_spread_bps
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn twap_slices_sum_to_total() {
        let plan = TwapPlan { slice_count: 3, interval: Duration::from_secs(1) };
        let slices = twap_slices(10.0, &plan);
        assert_eq!(slices.len(), 3);
        assert!((slices.iter().sum::<f64>() - 10.0).abs() < 1e-9);
    }

    #[test]
    fn single_slice_plan_returns_whole_quantity() {
        let plan = TwapPlan { slice_count: 1, interval: Duration::from_secs(1) };
        assert_eq!(twap_slices(10.0, &plan), vec![10.0]);
    }

    #[test]
    fn desired_slices_clamps_to_the_configured_range() {
        assert_eq!(desired_slices(10_000.0, 1_000.0, 1, 8), 8);
        assert_eq!(desired_slices(500.0, 1_000.0, 2, 8), 2);
        assert_eq!(desired_slices(3_000.0, 1_000.0, 1, 8), 3);
    }

    #[test]
    fn iceberg_clips_sum_to_slice_and_shrink() {
        let policy = IcebergPolicy { display_fraction: 0.5, min_clip_qty: 0.1 };
        let clips = iceberg_clips(1.0, &policy);
        assert!((clips.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        assert!(clips.windows(2).all(|w| w[0] >= w[1] - 1e-9));
    }
}
