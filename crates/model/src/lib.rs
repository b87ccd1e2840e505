//! Domain types shared by the exchange client, the feed and the monitor.

mod order;
mod tick;

pub use order::{NewStopOrder, OrderSide, OrderState, OrderStatus, OrderType, StatusClass, TimeInForce};
pub use tick::PriceTick;
