/*
[INPUT]:  StrategyConfig from the caller, live Tick per cycle
[OUTPUT]: Optional entry Signal and protective SL/TP levels
[POS]:    Strategy layer - signal policies for the auto-trading loop
[UPDATE]: When adding policies or changing pip/level arithmetic
[UPDATE]: 2026-10-16 Seedable scalping policy for deterministic tests
*/

use std::str::FromStr;

use mt5_bridge_adapter::{Direction, Tick};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{BridgeError, Result};

/// Magic number tagged on orders placed by the auto-trading loop.
pub const BOT_MAGIC: u64 = 99999;

const SCALPING_TRIGGER: f64 = 0.95;

/// Parameters of one auto-trading activation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyConfig {
    #[serde(default = "default_symbol")]
    pub symbol: String,
    #[serde(default = "default_lot_size", with = "rust_decimal::serde::float")]
    pub lot_size: Decimal,
    #[serde(default = "default_stop_loss_pips")]
    pub stop_loss_pips: u32,
    #[serde(default = "default_take_profit_pips")]
    pub take_profit_pips: u32,
    #[serde(default = "default_max_trades")]
    pub max_trades: u32,
    #[serde(default = "default_strategy", rename = "trading_strategy")]
    pub strategy: String,
}

fn default_symbol() -> String {
    "EURUSD".to_string()
}

fn default_lot_size() -> Decimal {
    Decimal::new(1, 2)
}

fn default_stop_loss_pips() -> u32 {
    50
}

fn default_take_profit_pips() -> u32 {
    100
}

fn default_max_trades() -> u32 {
    5
}

fn default_strategy() -> String {
    StrategyKind::Scalping.as_str().to_string()
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            symbol: default_symbol(),
            lot_size: default_lot_size(),
            stop_loss_pips: default_stop_loss_pips(),
            take_profit_pips: default_take_profit_pips(),
            max_trades: default_max_trades(),
            strategy: default_strategy(),
        }
    }
}

impl StrategyConfig {
    /// Reject configurations the loop cannot run, and resolve the policy kind.
    pub fn validate(&self) -> Result<StrategyKind> {
        if self.symbol.trim().is_empty() {
            return Err(BridgeError::InvalidRequest("symbol must not be empty".to_string()));
        }
        if self.lot_size <= Decimal::ZERO {
            return Err(BridgeError::InvalidRequest(format!(
                "lot_size must be positive, got {}",
                self.lot_size
            )));
        }
        if self.stop_loss_pips == 0 || self.take_profit_pips == 0 {
            return Err(BridgeError::InvalidRequest(
                "stop_loss_pips and take_profit_pips must be positive".to_string(),
            ));
        }
        if self.max_trades == 0 {
            return Err(BridgeError::InvalidRequest("max_trades must be positive".to_string()));
        }
        self.strategy.parse()
    }

    /// Comment attached to every order of this run.
    pub fn order_comment(&self) -> String {
        format!("Auto Bot - {}", self.strategy)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyKind {
    Scalping,
}

impl StrategyKind {
    pub fn as_str(self) -> &'static str {
        match self {
            StrategyKind::Scalping => "scalping",
        }
    }

    /// Fresh policy instance for one run.
    pub fn policy(self) -> Box<dyn StrategyPolicy> {
        match self {
            StrategyKind::Scalping => Box::new(Scalping::from_entropy()),
        }
    }
}

impl FromStr for StrategyKind {
    type Err = BridgeError;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "scalping" => Ok(Self::Scalping),
            _ => Err(BridgeError::UnknownStrategy(value.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Signal {
    pub direction: Direction,
}

/// Decides, once per cycle, whether to open a position.
pub trait StrategyPolicy: Send {
    fn evaluate(&mut self, config: &StrategyConfig, tick: &Tick) -> Option<Signal>;
}

/// Random-entry scalper: fires on roughly 5% of cycles in a random direction.
#[derive(Debug)]
pub struct Scalping {
    rng: StdRng,
    trigger: f64,
}

impl Scalping {
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
            trigger: SCALPING_TRIGGER,
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            trigger: SCALPING_TRIGGER,
        }
    }

    /// Only draws strictly above `trigger` signal.
    pub fn with_trigger(mut self, trigger: f64) -> Self {
        self.trigger = trigger;
        self
    }
}

impl StrategyPolicy for Scalping {
    fn evaluate(&mut self, _config: &StrategyConfig, _tick: &Tick) -> Option<Signal> {
        let draw: f64 = self.rng.gen_range(0.0..1.0);
        if draw <= self.trigger {
            return None;
        }
        let direction = if self.rng.gen_bool(0.5) {
            Direction::Buy
        } else {
            Direction::Sell
        };
        Some(Signal { direction })
    }
}

pub fn pip_size(symbol: &str) -> Decimal {
    if symbol.contains("JPY") {
        Decimal::new(1, 2)
    } else {
        Decimal::new(1, 4)
    }
}

/// Stop-loss and take-profit around `entry`, returned as `(sl, tp)`.
pub fn protective_levels(config: &StrategyConfig, direction: Direction, entry: Decimal) -> (Decimal, Decimal) {
    let pip = pip_size(&config.symbol);
    let sl_distance = Decimal::from(config.stop_loss_pips) * pip;
    let tp_distance = Decimal::from(config.take_profit_pips) * pip;
    match direction {
        Direction::Buy => (entry - sl_distance, entry + tp_distance),
        Direction::Sell => (entry + sl_distance, entry - tp_distance),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn dec(value: &str) -> Decimal {
        Decimal::from_str(value).expect("valid decimal")
    }

    #[rstest]
    #[case("USDJPY", "0.01")]
    #[case("EURJPY", "0.01")]
    #[case("EURUSD", "0.0001")]
    #[case("GBPUSD", "0.0001")]
    fn test_pip_size(#[case] symbol: &str, #[case] expected: &str) {
        assert_eq!(pip_size(symbol), dec(expected));
    }

    #[test]
    fn test_buy_levels_bracket_entry() {
        let config = StrategyConfig::default();
        let (sl, tp) = protective_levels(&config, Direction::Buy, dec("1.0952"));
        assert_eq!(sl, dec("1.0902"));
        assert_eq!(tp, dec("1.1052"));
        assert!(sl < dec("1.0952") && dec("1.0952") < tp);
    }

    #[test]
    fn test_sell_levels_bracket_entry_jpy() {
        let config = StrategyConfig {
            symbol: "USDJPY".to_string(),
            ..StrategyConfig::default()
        };
        let (sl, tp) = protective_levels(&config, Direction::Sell, dec("151.20"));
        assert_eq!(sl, dec("151.70"));
        assert_eq!(tp, dec("150.20"));
    }

    #[test]
    fn test_validate_rejects_bad_config() {
        let zero_lot = StrategyConfig {
            lot_size: Decimal::ZERO,
            ..StrategyConfig::default()
        };
        assert!(matches!(zero_lot.validate(), Err(BridgeError::InvalidRequest(_))));

        let unknown = StrategyConfig {
            strategy: "grid".to_string(),
            ..StrategyConfig::default()
        };
        assert!(matches!(unknown.validate(), Err(BridgeError::UnknownStrategy(name)) if name == "grid"));

        assert_eq!(StrategyConfig::default().validate().unwrap(), StrategyKind::Scalping);
    }

    #[test]
    fn test_scalping_signal_rate_is_low() {
        let mut policy = Scalping::seeded(7);
        let config = StrategyConfig::default();
        let tick = Tick::new(dec("1.0950"), dec("1.0952"));

        let signals = (0..10_000)
            .filter(|_| policy.evaluate(&config, &tick).is_some())
            .count();
        assert!((300..700).contains(&signals), "signals={signals}");
    }

    #[test]
    fn test_zero_trigger_always_signals() {
        let mut policy = Scalping::seeded(1).with_trigger(0.0);
        let config = StrategyConfig::default();
        let tick = Tick::new(dec("1.0950"), dec("1.0952"));
        assert!((0..50).all(|_| policy.evaluate(&config, &tick).is_some()));
    }

    #[test]
    fn test_draw_equal_to_trigger_does_not_signal() {
        let first_draw: f64 = StdRng::seed_from_u64(11).gen_range(0.0..1.0);
        let mut policy = Scalping::seeded(11).with_trigger(first_draw);
        let config = StrategyConfig::default();
        let tick = Tick::new(dec("1.0950"), dec("1.0952"));
        assert!(policy.evaluate(&config, &tick).is_none());
    }

    #[test]
    fn test_config_wire_names() {
        let config: StrategyConfig = serde_json::from_str(
            r#"{"symbol":"GBPUSD","lot_size":0.02,"stop_loss_pips":30,"take_profit_pips":60,"max_trades":2,"trading_strategy":"scalping"}"#,
        )
        .unwrap();
        assert_eq!(config.max_trades, 2);
        assert_eq!(config.order_comment(), "Auto Bot - scalping");
    }
}
