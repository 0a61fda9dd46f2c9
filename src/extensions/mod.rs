pub mod trade_overlay;

pub use trade_overlay::{TradeContext, TradeProgress, TradeSide, TradeStatus};
