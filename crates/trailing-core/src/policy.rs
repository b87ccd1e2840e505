//! Reorder decision.
//!
//! Pure function of the order snapshot, the tick and the configuration; no
//! I/O and no clock.

use model::{OrderState, PriceTick};
use rust_decimal::{Decimal, RoundingStrategy};
use thiserror::Error;

use crate::config::TrailingConfig;

/// What a processor should do with a tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Price is above the stop but not far enough to move it.
    NoOp,
    /// Price is at or below the stop; the order may have triggered.
    CheckOrder,
    /// Replace the order with one at `new_stop_price`.
    Reorder { new_stop_price: Decimal },
}

#[derive(Debug, Clone, Error)]
pub enum PolicyError {
    /// The configured margin produced a stop that cannot be placed.
    #[error("computed stop {new_stop_price} for {symbol} at price {price} is invalid")]
    InvalidStopPrice {
        symbol: String,
        price: Decimal,
        new_stop_price: Decimal,
    },
}

pub fn evaluate(
    state: &OrderState,
    tick: &PriceTick,
    config: &TrailingConfig,
) -> Result<Decision, PolicyError> {
    let price = tick.price;
    let stop = state.stop_price;

    if price <= stop {
        return Ok(Decision::CheckOrder);
    }

    let static_fired =
        config.static_threshold > Decimal::ZERO && price > stop + config.static_threshold;
    let percentage_fired = config.percentage_threshold > Decimal::ZERO
        && price > stop * (Decimal::ONE + config.percentage_threshold / Decimal::ONE_HUNDRED);

    if !static_fired && !percentage_fired {
        return Ok(Decision::NoOp);
    }

    let mut new_stop_price =
        price * (Decimal::ONE - config.move_up_margin_pct / Decimal::ONE_HUNDRED);
    if let Some(decimals) = config.price_precision {
        new_stop_price = new_stop_price.round_dp_with_strategy(decimals, RoundingStrategy::ToZero);
    }

    if new_stop_price <= Decimal::ZERO || new_stop_price >= price {
        return Err(PolicyError::InvalidStopPrice {
            symbol: state.symbol.clone(),
            price,
            new_stop_price,
        });
    }

    Ok(Decision::Reorder { new_stop_price })
}

/// Round `new_stop_price` down onto the symbol's price grid and check it is
/// still a placeable stop below `price`.
pub fn fit_to_tick(
    symbol: &str,
    price: Decimal,
    new_stop_price: Decimal,
    tick_size: Option<Decimal>,
) -> Result<Decimal, PolicyError> {
    let fitted = match tick_size {
        Some(tick) if tick > Decimal::ZERO => (new_stop_price / tick).floor() * tick,
        _ => new_stop_price,
    };

    if fitted <= Decimal::ZERO || fitted >= price {
        return Err(PolicyError::InvalidStopPrice {
            symbol: symbol.to_string(),
            price,
            new_stop_price: fitted,
        });
    }

    Ok(fitted.normalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::{OrderSide, OrderStatus, OrderType};
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn order(stop: Decimal) -> OrderState {
        OrderState {
            order_id: 1,
            client_order_id: "c1".into(),
            symbol: "BTCUSDT".into(),
            order_type: OrderType::StopLoss,
            side: OrderSide::Sell,
            price: Decimal::ZERO,
            stop_price: stop,
            orig_qty: dec!(1),
            executed_qty: Decimal::ZERO,
            status: OrderStatus::New,
            updated_at_ms: 0,
        }
    }

    fn tick(price: Decimal) -> PriceTick {
        PriceTick::new("BTCUSDT", price, 0)
    }

    fn static_config() -> TrailingConfig {
        TrailingConfig::default()
            .with_static_threshold(dec!(2))
            .with_percentage_threshold(Decimal::ZERO)
            .with_move_up_margin_pct(dec!(1))
    }

    #[test]
    fn test_static_threshold_reorders() {
        let decision = evaluate(&order(dec!(100)), &tick(dec!(103)), &static_config()).unwrap();
        assert_eq!(
            decision,
            Decision::Reorder {
                new_stop_price: dec!(101.97)
            }
        );
    }

    #[test]
    fn test_below_static_threshold_is_noop() {
        let decision = evaluate(&order(dec!(100)), &tick(dec!(101)), &static_config()).unwrap();
        assert_eq!(decision, Decision::NoOp);
    }

    #[test]
    fn test_exactly_at_threshold_is_noop() {
        let decision = evaluate(&order(dec!(100)), &tick(dec!(102)), &static_config()).unwrap();
        assert_eq!(decision, Decision::NoOp);
    }

    #[test]
    fn test_at_or_below_stop_checks_order() {
        let config = static_config();
        assert_eq!(
            evaluate(&order(dec!(100)), &tick(dec!(99)), &config).unwrap(),
            Decision::CheckOrder
        );
        assert_eq!(
            evaluate(&order(dec!(100)), &tick(dec!(100)), &config).unwrap(),
            Decision::CheckOrder
        );
    }

    #[test]
    fn test_percentage_threshold() {
        let config = TrailingConfig::default()
            .with_static_threshold(Decimal::ZERO)
            .with_percentage_threshold(dec!(2))
            .with_move_up_margin_pct(dec!(1));
        assert_eq!(
            evaluate(&order(dec!(100)), &tick(dec!(102)), &config).unwrap(),
            Decision::NoOp
        );
        assert_eq!(
            evaluate(&order(dec!(100)), &tick(dec!(102.5)), &config).unwrap(),
            Decision::Reorder {
                new_stop_price: dec!(101.475)
            }
        );
    }

    #[test]
    fn test_either_threshold_is_enough() {
        let config = TrailingConfig::default()
            .with_static_threshold(dec!(50))
            .with_percentage_threshold(dec!(2));
        let decision = evaluate(&order(dec!(100)), &tick(dec!(103)), &config).unwrap();
        assert!(matches!(decision, Decision::Reorder { .. }));
    }

    #[test]
    fn test_price_precision_truncates() {
        let config = static_config().with_price_precision(1);
        let decision = evaluate(&order(dec!(100)), &tick(dec!(103)), &config).unwrap();
        assert_eq!(
            decision,
            Decision::Reorder {
                new_stop_price: dec!(101.9)
            }
        );
    }

    #[test]
    fn test_non_positive_stop_is_error() {
        let config = static_config().with_move_up_margin_pct(dec!(100));
        let result = evaluate(&order(dec!(100)), &tick(dec!(103)), &config);
        assert!(matches!(result, Err(PolicyError::InvalidStopPrice { .. })));
    }

    #[test]
    fn test_truncation_to_zero_is_error() {
        let config = TrailingConfig::default()
            .with_static_threshold(Decimal::ZERO)
            .with_percentage_threshold(dec!(2))
            .with_price_precision(0);
        let result = evaluate(&order(dec!(0.1)), &tick(dec!(0.5)), &config);
        assert!(matches!(result, Err(PolicyError::InvalidStopPrice { .. })));
    }

    #[test]
    fn test_default_config_stop_lands_on_tick_grid() {
        let decision =
            evaluate(&order(dec!(100)), &tick(dec!(103.33)), &TrailingConfig::default()).unwrap();
        let Decision::Reorder { new_stop_price } = decision else {
            panic!("expected reorder, got {decision:?}");
        };
        assert_eq!(new_stop_price, dec!(102.2967));

        let fitted = fit_to_tick("BTCUSDT", dec!(103.33), new_stop_price, Some(dec!(0.01))).unwrap();
        assert_eq!(fitted, dec!(102.29));
        assert!((fitted / dec!(0.01)).fract().is_zero());
    }

    #[test]
    fn test_fit_to_coarse_tick() {
        let fitted = fit_to_tick("BTCUSDT", dec!(103.33), dec!(102.2967), Some(dec!(0.5))).unwrap();
        assert_eq!(fitted, dec!(102));
    }

    #[test]
    fn test_fit_without_tick_keeps_price() {
        let fitted = fit_to_tick("BTCUSDT", dec!(103.33), dec!(102.2967), None).unwrap();
        assert_eq!(fitted, dec!(102.2967));
    }

    #[test]
    fn test_fit_to_zero_is_error() {
        let result = fit_to_tick("SHIBUSDT", dec!(0.9), dec!(0.891), Some(dec!(1)));
        assert!(matches!(
            result,
            Err(PolicyError::InvalidStopPrice { new_stop_price, .. }) if new_stop_price.is_zero()
        ));
    }

    fn price() -> impl Strategy<Value = Decimal> {
        (1i64..10_000_000).prop_map(|cents| Decimal::new(cents, 2))
    }

    fn margin() -> impl Strategy<Value = Decimal> {
        (1i64..9_999).prop_map(|bp| Decimal::new(bp, 2))
    }

    proptest! {
        /// A price at or below the stop never moves the order.
        #[test]
        fn at_or_below_stop_never_reorders(
            stop in price(),
            below in 0i64..1_000_000,
            static_threshold in price(),
            pct in margin(),
        ) {
            let price = (stop - Decimal::new(below, 2)).max(Decimal::new(1, 2));
            prop_assume!(price <= stop);
            let config = TrailingConfig::default()
                .with_static_threshold(static_threshold)
                .with_percentage_threshold(pct);
            prop_assert_eq!(evaluate(&order(stop), &tick(price), &config).unwrap(), Decision::CheckOrder);
        }

        /// With both thresholds disabled nothing above the stop reorders.
        #[test]
        fn disabled_thresholds_are_noop(stop in price(), above in 1i64..1_000_000, m in margin()) {
            let price = stop + Decimal::new(above, 2);
            let config = TrailingConfig::default()
                .with_static_threshold(Decimal::ZERO)
                .with_percentage_threshold(Decimal::ZERO)
                .with_move_up_margin_pct(m);
            prop_assert_eq!(evaluate(&order(stop), &tick(price), &config).unwrap(), Decision::NoOp);
        }

        /// Crossing the absolute threshold reorders below the price.
        #[test]
        fn static_threshold_reorders_below_price(
            stop in price(),
            static_threshold in price(),
            over in 1i64..1_000_000,
            m in margin(),
        ) {
            let price = stop + static_threshold + Decimal::new(over, 2);
            let config = TrailingConfig::default()
                .with_static_threshold(static_threshold)
                .with_percentage_threshold(Decimal::ZERO)
                .with_move_up_margin_pct(m);
            let expected = price * (Decimal::ONE - m / Decimal::ONE_HUNDRED);
            match evaluate(&order(stop), &tick(price), &config).unwrap() {
                Decision::Reorder { new_stop_price } => {
                    prop_assert_eq!(new_stop_price, expected);
                    prop_assert!(new_stop_price < price);
                    prop_assert!(new_stop_price > Decimal::ZERO);
                }
                other => prop_assert!(false, "expected reorder, got {:?}", other),
            }
        }

        /// A fitted stop is a whole number of ticks and never above the raw stop.
        #[test]
        fn fitted_stop_is_on_grid(
            price in price(),
            m in margin(),
            tick_exp in 0u32..4,
        ) {
            let tick_size = Decimal::new(1, tick_exp);
            let raw = price * (Decimal::ONE - m / Decimal::ONE_HUNDRED);
            if let Ok(fitted) = fit_to_tick("BTCUSDT", price, raw, Some(tick_size)) {
                prop_assert!((fitted / tick_size).fract().is_zero());
                prop_assert!(fitted <= raw);
                prop_assert!(fitted > Decimal::ZERO && fitted < price);
            }
        }
    }
}
