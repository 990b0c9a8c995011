use crate::depth_guard::{DepthEnvelope, DepthGuardOutcome};
use crate::error::ExecutionError;
use crate::order::Order;
use crate::slicing::{desired_slices, iceberg_clips, should_post_only, should_slice, twap_slices, IcebergPolicy, TwapPlan};
use breakout_data::{CreateOrderRequest, ExchangeClient};
use breakout_markets::{L2Depth, OrderSide, OrderType, Symbol, TimestampMs};
use std::time::Duration;

/// Tuning knobs for [`ExecutionManager::execute`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExecutionConfig {
    pub max_depth_participation: f64,
    /// Whether slice count is derived from the depth envelope
    /// (`desired_slices`) rather than fixed. Disabled, every order is a
    /// single slice (still possibly iceberg-clipped).
    pub enable_twap: bool,
    pub twap_min_slices: usize,
    pub twap_max_slices: usize,
    pub twap_interval: Duration,
    pub iceberg_notional_threshold_usd: f64,
    pub iceberg_display_fraction: f64,
    pub iceberg_min_clip_qty: f64,
    pub post_only_max_spread_bps: f64,
    /// Whether a slice tight enough to the spread is worked as a
    /// postOnly limit order instead of crossing as a market order.
    pub enable_iceberg: bool,
    /// Order type is limit postOnly when `spread_bps <= spread_widen_bps`
    /// and `enable_iceberg`; market otherwise.
    pub spread_widen_bps: f64,
    /// Offset from best bid/ask, in bps, used to build the iceberg limit
    /// price: `best_bid * (1 - offset)` for buys, `best_ask * (1 + offset)`
    /// for sells.
    pub limit_offset_bps: f64,
    /// How long to wait for one child order's fill before cancelling it.
    pub deadman_timeout: Duration,
    pub taker_fee_bps: f64,
    pub maker_fee_bps: f64,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            max_depth_participation: 0.15,
            enable_twap: true,
            twap_min_slices: 1,
            twap_max_slices: 8,
            twap_interval: Duration::from_secs(15),
            iceberg_notional_threshold_usd: 20_000.0,
            iceberg_display_fraction: 0.25,
            iceberg_min_clip_qty: 1e-4,
            post_only_max_spread_bps: 5.0,
            enable_iceberg: true,
            spread_widen_bps: 8.0,
            limit_offset_bps: 1.0,
            deadman_timeout: Duration::from_secs(10),
            taker_fee_bps: 5.0,
            maker_fee_bps: 1.0,
        }
    }
}

/// One execution request: a side and quantity to fill at or around
/// `reference_price`, optionally depth-guarded and spread-aware.
#[derive(Debug, Clone)]
pub struct ExecutionRequest {
    pub symbol: Symbol,
    pub side: OrderSide,
    pub quantity: f64,
    pub reference_price: f64,
    pub depth: Option<L2Depth>,
    pub reduce_only: bool,
}

/// Turns a sized trade idea into one or more exchange orders: depth-guards
/// and slices the quantity, picks maker vs taker per child order, and
/// aggregates the results into one [`Order`].
pub struct ExecutionManager<C> {
    client: C,
    config: ExecutionConfig,
}

impl<C: ExchangeClient> ExecutionManager<C> {
    pub fn new(client: C, config: ExecutionConfig) -> Self {
        Self { client, config }
    }

    pub fn config(&self) -> &ExecutionConfig {
        &self.config
    }

    /// Slices and submits `request`. On a mid-loop slice failure, the
    /// error carries whatever [`Order`] state had already accumulated so
    /// the caller can still apply the fills that did happen.
    pub async fn execute(&self, request: ExecutionRequest, now_ms: TimestampMs) -> Result<Order, (ExecutionError, Order)> {
        let placeholder_order_type = OrderType::Market;
        if request.quantity <= 0.0 {
            return Err((
                ExecutionError::NonPositiveQuantity { quantity: request.quantity },
                Order::new(request.symbol.clone(), request.side, placeholder_order_type, request.quantity, now_ms),
            ));
        }

        let notional = request.quantity * request.reference_price;
        let envelope = request.depth.map(|d| DepthEnvelope::new(d, self.config.max_depth_participation));

        if let Some(envelope) = envelope {
            if matches!(envelope.check(notional, request.side), DepthGuardOutcome::Rejected) {
                return Err((
                    ExecutionError::DepthTooThin {
                        notional_usd: notional,
                        allowed_usd: envelope.max_child_notional(request.side),
                    },
                    Order::new(request.symbol.clone(), request.side, placeholder_order_type, request.quantity, now_ms),
                ));
            }
        }

        let spread_bps = request.depth.map(|d| d.spread_bps).unwrap_or(0.0);
        let tight_enough_for_iceberg = request.depth.is_some() && spread_bps <= self.config.spread_widen_bps;
        let order_type = if self.config.enable_iceberg && tight_enough_for_iceberg {
            OrderType::Limit
        } else {
            OrderType::Market
        };
        let limit_price = if matches!(order_type, OrderType::Limit) {
            request.depth.map(|d| {
                let offset = self.config.limit_offset_bps / 10_000.0;
                match request.side {
                    OrderSide::Buy => d.best_bid * (1.0 - offset),
                    OrderSide::Sell => d.best_ask * (1.0 + offset),
                }
            })
        } else {
            None
        };
        let mut order = Order::new(request.symbol.clone(), request.side, order_type, request.quantity, now_ms);

        let qty_slices = if let (true, Some(envelope)) = (self.config.enable_twap, envelope) {
            let per_slice_capacity = envelope.max_child_notional(request.side);
            let slice_count = desired_slices(notional, per_slice_capacity, self.config.twap_min_slices, self.config.twap_max_slices);
            let twap_plan = TwapPlan { slice_count, interval: self.config.twap_interval };
            twap_slices(request.quantity, &twap_plan)
        } else if should_slice(notional, self.config.iceberg_notional_threshold_usd) {
            let twap_plan = TwapPlan { slice_count: self.config.twap_min_slices.max(2), interval: self.config.twap_interval };
            twap_slices(request.quantity, &twap_plan)
        } else {
            vec![request.quantity]
        };

        let post_only = should_post_only(spread_bps, self.config.post_only_max_spread_bps);

        for (slice_index, slice_qty) in qty_slices.iter().enumerate() {
            let clips = if let Some(envelope) = envelope {
                let slice_notional = slice_qty * request.reference_price;
                let (clipped_notional, _) = envelope.guard(slice_notional, request.side);
                let clipped_qty = (clipped_notional / request.reference_price).min(*slice_qty);
                let policy = IcebergPolicy {
                    display_fraction: self.config.iceberg_display_fraction,
                    min_clip_qty: self.config.iceberg_min_clip_qty,
                };
                if clipped_qty < *slice_qty {
                    // depth guard bit: work the slice down in iceberg-sized clips
                    // instead of sending the full (too-large-for-the-book) slice.
                    iceberg_clips(*slice_qty, &policy)
                } else {
                    vec![*slice_qty]
                }
            } else {
                vec![*slice_qty]
            };

            for clip_qty in clips {
                if let Err(err) = self.submit_clip(&mut order, &request, clip_qty, order_type, limit_price, post_only, now_ms).await {
                    return Err((err, order));
                }
            }

            if slice_index + 1 < qty_slices.len() {
                tokio::time::sleep(self.config.twap_interval).await;
            }
        }

        Ok(order)
    }

    #[allow(clippy::too_many_arguments)]
    async fn submit_clip(
        &self,
        order: &mut Order,
        request: &ExecutionRequest,
        clip_qty: f64,
        order_type: OrderType,
        limit_price: Option<f64>,
        post_only: bool,
        now_ms: TimestampMs,
    ) -> Result<(), ExecutionError> {
        let req = CreateOrderRequest {
            symbol: request.symbol.clone(),
            order_type,
            side: request.side,
            amount: clip_qty,
            price: limit_price,
            reduce_only: request.reduce_only,
            post_only,
            time_in_force: None,
            reference_price: request.reference_price,
        };

        match tokio::time::timeout(self.config.deadman_timeout, self.client.create_order(req)).await {
            Ok(Ok(fill)) => {
                order.record_fill(clip_qty, &fill, post_only, now_ms);
                Ok(())
            }
            Ok(Err(err)) => Err(ExecutionError::Exchange(err)),
            Err(_) => {
                order.record_timeout(clip_qty, now_ms);
                Err(ExecutionError::Deadman {
                    timeout_ms: self.config.deadman_timeout.as_millis() as u64,
                })
            }
        }
    }

    /// Fee rate (in bps of notional) a fill was charged at, given whether
    /// it posted maker-only.
    pub fn fee_bps_for(&self, post_only: bool) -> f64 {
        if post_only {
            self.config.maker_fee_bps
        } else {
            self.config.taker_fee_bps
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use breakout_data::PaperExchangeClient;

    #[tokio::test]
    async fn executes_small_order_as_single_market_clip() {
        let client = PaperExchangeClient::new(1_000_000.0, 1.0, 1.0);
        let manager = ExecutionManager::new(client, ExecutionConfig::default());
        let request = ExecutionRequest {
            symbol: Symbol::new("AAAUSDT").unwrap(),
            side: OrderSide::Buy,
            quantity: 1.0,
            reference_price: 100.0,
            depth: None,
            reduce_only: false,
        };
        let order = manager.execute(request, 0).await.unwrap();
        assert!(order.is_fully_filled());
        assert_eq!(order.slices.len(), 1);
    }

    #[tokio::test]
    async fn rejects_non_positive_quantity() {
        let client = PaperExchangeClient::new(1_000_000.0, 0.0, 0.0);
        let manager = ExecutionManager::new(client, ExecutionConfig::default());
        let request = ExecutionRequest {
            symbol: Symbol::new("AAAUSDT").unwrap(),
            side: OrderSide::Buy,
            quantity: 0.0,
            reference_price: 100.0,
            depth: None,
            reduce_only: false,
        };
        let result = manager.execute(request, 0).await;
        assert!(matches!(result, Err((ExecutionError::NonPositiveQuantity { .. }, _))));
    }

    /// A slice failure partway through a multi-slice execution still
    /// returns whatever fills already happened, per [`Order`] error
    /// propagation contract.
    #[tokio::test]
    async fn slice_failure_reports_partial_fills() {
        let client = PaperExchangeClient::new(600.0, 1.0, 1.0);
        let mut config = ExecutionConfig::default();
        config.enable_twap = false;
        config.iceberg_notional_threshold_usd = 1.0;
        config.twap_min_slices = 4;
        let manager = ExecutionManager::new(client, config);
        let request = ExecutionRequest {
            symbol: Symbol::new("AAAUSDT").unwrap(),
            side: OrderSide::Buy,
            quantity: 10.0,
            reference_price: 100.0,
            depth: None,
            reduce_only: false,
        };
        let result = manager.execute(request, 0).await;
        let (err, order) = result.expect_err("paper exchange runs out of balance partway through");
        assert!(matches!(err, ExecutionError::Exchange(_)));
        assert!(order.filled_qty > 0.0);
        assert!(order.filled_qty < 10.0);
    }

    /// Tight spread with iceberg enabled builds a postOnly limit order at
    /// the offset best-bid/best-ask price instead of crossing as a market
    /// order at the reference price.
    #[tokio::test]
    async fn tight_spread_uses_iceberg_limit_at_offset_price() {
        let client = PaperExchangeClient::new(1_000_000.0, 1.0, 1.0);
        let manager = ExecutionManager::new(client, ExecutionConfig::default());
        let depth = L2Depth::new(99.95, 100.05, 10_000.0, 15_000.0, 10_000.0, 15_000.0, 5.0, 0.0).unwrap();
        let request = ExecutionRequest {
            symbol: Symbol::new("AAAUSDT").unwrap(),
            side: OrderSide::Buy,
            quantity: 1.0,
            reference_price: 100.0,
            depth: Some(depth),
            reduce_only: false,
        };
        let order = manager.execute(request, 0).await.unwrap();
        assert_eq!(order.order_type, OrderType::Limit);
    }

    /// A wide spread falls back to a market order even with iceberg
    /// enabled, since no slice would clear `spread_widen_bps`.
    #[tokio::test]
    async fn wide_spread_falls_back_to_market() {
        let client = PaperExchangeClient::new(1_000_000.0, 1.0, 1.0);
        let manager = ExecutionManager::new(client, ExecutionConfig::default());
        let depth = L2Depth::new(95.0, 105.0, 10_000.0, 15_000.0, 10_000.0, 15_000.0, 500.0, 0.0).unwrap();
        let request = ExecutionRequest {
            symbol: Symbol::new("AAAUSDT").unwrap(),
            side: OrderSide::Buy,
            quantity: 1.0,
            reference_price: 100.0,
            depth: Some(depth),
            reduce_only: false,
        };
        let order = manager.execute(request, 0).await.unwrap();
        assert_eq!(order.order_type, OrderType::Market);
    }
}
