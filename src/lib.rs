pub mod config;
pub mod error;
pub mod portfolio;
pub mod price;
pub mod rebalance;
pub mod report;
pub mod target;

pub type Dollar = rust_decimal::Decimal;
pub type Percent = rust_decimal::Decimal;

pub use portfolio::{Holding, Portfolio};
pub use price::{PriceSource, PriceTable};
pub use rebalance::{Action, ActionKind, Rebalance, Rebalancer, Side};
