//! Market-wide regime detection

pub mod bear;

pub use bear::{
    BearMarketDetector, BearMarketRules, BearMarketSignal, BearMarketState, MacroIndicators,
    MarketStatus, BEAR_RULES, BEAR_STATE_KEY,
};
