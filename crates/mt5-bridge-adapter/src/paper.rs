/*
[INPUT]:  Simulated quotes, login outcomes and trade instructions
[OUTPUT]: In-memory BrokerClient that fills every deal at the requested price
[POS]:    Broker layer - paper terminal for tests and dry runs
[UPDATE]: When the terminal contract changes or new simulation knobs are needed
*/

//! Paper terminal.
//!
//! Fills are all-or-nothing at the instruction price, profit is marked to
//! the latest quote with a 100k contract size, and no currency conversion is
//! applied. Every call is journaled so tests can assert on what reached the
//! terminal.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;
use tracing::debug;

use crate::broker::BrokerClient;
use crate::http::Result;
use crate::types::{
    AccountInfo, Direction, LastError, Position, PositionFilter, TRADE_RETCODE_DONE,
    TRADE_RETCODE_POSITION_CLOSED, TRADE_RETCODE_REJECT, Tick, TradeInstruction, TradeResult,
};

const CONTRACT_SIZE: i64 = 100_000;
const FIRST_TICKET: u64 = 100_001;

/// Terminal calls recorded by the paper terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PaperCall {
    Initialize,
    Login,
    LastError,
    AccountInfo,
    Tick,
    Positions,
    SendOrder,
    Shutdown,
}

/// Configuration for the paper terminal.
#[derive(Debug, Clone)]
pub struct PaperConfig {
    pub initial_balance: Decimal,
    pub currency: String,
    pub leverage: u32,
    pub company: String,
    /// Simulated latency applied to every call.
    pub latency: Duration,
}

impl Default for PaperConfig {
    fn default() -> Self {
        Self {
            initial_balance: Decimal::new(10_000, 0),
            currency: "USD".to_string(),
            leverage: 100,
            company: "Paper Trading Ltd".to_string(),
            latency: Duration::ZERO,
        }
    }
}

#[derive(Debug)]
struct PaperState {
    terminal_available: bool,
    accept_login: bool,
    logged_in: Option<(u64, String)>,
    last_error: LastError,
    balance: Decimal,
    ticks: HashMap<String, Tick>,
    positions: BTreeMap<u64, Position>,
    next_ticket: u64,
    forced_rejection: Option<(u32, String)>,
    sent_orders: Vec<TradeInstruction>,
    calls: HashMap<PaperCall, usize>,
}

/// In-memory broker terminal.
#[derive(Debug)]
pub struct PaperBroker {
    config: PaperConfig,
    state: Mutex<PaperState>,
}

impl PaperBroker {
    pub fn new() -> Self {
        Self::with_config(PaperConfig::default())
    }

    pub fn with_config(config: PaperConfig) -> Self {
        let state = PaperState {
            terminal_available: true,
            accept_login: true,
            logged_in: None,
            last_error: LastError::new(1, "Success"),
            balance: config.initial_balance,
            ticks: HashMap::new(),
            positions: BTreeMap::new(),
            next_ticket: FIRST_TICKET,
            forced_rejection: None,
            sent_orders: Vec::new(),
            calls: HashMap::new(),
        };
        Self {
            config,
            state: Mutex::new(state),
        }
    }

    fn lock(&self) -> MutexGuard<'_, PaperState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    async fn enter(&self, call: PaperCall) {
        if !self.config.latency.is_zero() {
            tokio::time::sleep(self.config.latency).await;
        }
        *self.lock().calls.entry(call).or_insert(0) += 1;
    }

    /// Publish a quote and mark open positions on the symbol to it.
    pub fn set_tick(&self, symbol: &str, bid: Decimal, ask: Decimal) {
        let mut state = self.lock();
        let tick = Tick::new(bid, ask);
        for position in state.positions.values_mut() {
            if position.symbol == symbol {
                position.profit = mark_profit(position, &tick);
            }
        }
        state.ticks.insert(symbol.to_string(), tick);
    }

    pub fn remove_tick(&self, symbol: &str) {
        self.lock().ticks.remove(symbol);
    }

    pub fn set_terminal_available(&self, available: bool) {
        self.lock().terminal_available = available;
    }

    pub fn set_accept_login(&self, accept: bool) {
        self.lock().accept_login = accept;
    }

    /// Make every subsequent deal fail with `retcode` until cleared.
    pub fn reject_orders(&self, rejection: Option<(u32, &str)>) {
        self.lock().forced_rejection = rejection.map(|(code, comment)| (code, comment.to_string()));
    }

    /// Seed an open position directly, bypassing `send_order`.
    pub fn open_position(
        &self,
        symbol: &str,
        direction: Direction,
        volume: Decimal,
        price_open: Decimal,
        profit: Decimal,
    ) -> u64 {
        let mut state = self.lock();
        let ticket = state.next_ticket;
        state.next_ticket += 1;
        state.positions.insert(
            ticket,
            Position {
                ticket,
                symbol: symbol.to_string(),
                direction,
                volume,
                price_open,
                profit,
                swap: Decimal::ZERO,
                comment: String::new(),
                magic: 0,
            },
        );
        ticket
    }

    pub fn open_positions(&self) -> Vec<Position> {
        self.lock().positions.values().cloned().collect()
    }

    /// Every instruction that reached `send_order`, accepted or not.
    pub fn sent_orders(&self) -> Vec<TradeInstruction> {
        self.lock().sent_orders.clone()
    }

    pub fn call_count(&self, call: PaperCall) -> usize {
        self.lock().calls.get(&call).copied().unwrap_or(0)
    }

    pub fn balance(&self) -> Decimal {
        self.lock().balance
    }

    fn execute(&self, state: &mut PaperState, instruction: &TradeInstruction) -> TradeResult {
        if let Some((retcode, comment)) = state.forced_rejection.clone() {
            return TradeResult {
                retcode,
                order: 0,
                price: Decimal::ZERO,
                comment,
            };
        }
        if state.logged_in.is_none() {
            return TradeResult {
                retcode: TRADE_RETCODE_REJECT,
                order: 0,
                price: Decimal::ZERO,
                comment: "Not logged in".to_string(),
            };
        }

        if let Some(ticket) = instruction.position {
            let Some(position) = state.positions.remove(&ticket) else {
                return TradeResult {
                    retcode: TRADE_RETCODE_POSITION_CLOSED,
                    order: 0,
                    price: Decimal::ZERO,
                    comment: "Position doesn't exist".to_string(),
                };
            };
            let exit = Tick::new(instruction.price, instruction.price);
            let realized = mark_profit(&position, &exit);
            state.balance += realized + position.swap;
            debug!(ticket, realized = %realized, "paper position closed");
            return TradeResult {
                retcode: TRADE_RETCODE_DONE,
                order: ticket,
                price: instruction.price,
                comment: "Request executed".to_string(),
            };
        }

        let ticket = state.next_ticket;
        state.next_ticket += 1;
        state.positions.insert(
            ticket,
            Position {
                ticket,
                symbol: instruction.symbol.clone(),
                direction: instruction.direction,
                volume: instruction.volume,
                price_open: instruction.price,
                profit: Decimal::ZERO,
                swap: Decimal::ZERO,
                comment: instruction.comment.clone(),
                magic: instruction.magic,
            },
        );
        debug!(ticket, symbol = %instruction.symbol, "paper position opened");
        TradeResult {
            retcode: TRADE_RETCODE_DONE,
            order: ticket,
            price: instruction.price,
            comment: "Request executed".to_string(),
        }
    }

    fn account_snapshot(&self, state: &PaperState, login: u64, server: &str) -> AccountInfo {
        let leverage = Decimal::from(self.config.leverage.max(1));
        let floating: Decimal = state.positions.values().map(|p| p.profit + p.swap).sum();
        let margin: Decimal = state
            .positions
            .values()
            .map(|p| p.volume * Decimal::from(CONTRACT_SIZE) * p.price_open / leverage)
            .sum();
        let equity = state.balance + floating;
        let margin_level = (equity * Decimal::from(100))
            .checked_div(margin)
            .unwrap_or(Decimal::ZERO);

        AccountInfo {
            login,
            name: format!("Paper Account {login}"),
            server: server.to_string(),
            company: self.config.company.clone(),
            currency: self.config.currency.clone(),
            balance: state.balance,
            equity,
            margin,
            free_margin: equity - margin,
            margin_level: margin_level.round_dp(2),
            leverage: self.config.leverage,
        }
    }
}

impl Default for PaperBroker {
    fn default() -> Self {
        Self::new()
    }
}

fn mark_profit(position: &Position, tick: &Tick) -> Decimal {
    let exit = tick.exit_price(position.direction);
    let move_per_unit = match position.direction {
        Direction::Buy => exit - position.price_open,
        Direction::Sell => position.price_open - exit,
    };
    (move_per_unit * position.volume * Decimal::from(CONTRACT_SIZE)).round_dp(2)
}

#[async_trait]
impl BrokerClient for PaperBroker {
    async fn initialize(&self) -> Result<bool> {
        self.enter(PaperCall::Initialize).await;
        let mut state = self.lock();
        if !state.terminal_available {
            state.last_error = LastError::new(-10003, "IPC initialize failed, MetaTrader 5 x64 not found");
            return Ok(false);
        }
        Ok(true)
    }

    async fn login(&self, account: u64, _password: &str, server: &str) -> Result<bool> {
        self.enter(PaperCall::Login).await;
        let mut state = self.lock();
        if !state.terminal_available {
            state.last_error = LastError::new(-10004, "No IPC connection");
            return Ok(false);
        }
        if !state.accept_login {
            state.last_error = LastError::new(-6, "Terminal: Authorization failed");
            return Ok(false);
        }
        state.logged_in = Some((account, server.to_string()));
        state.last_error = LastError::new(1, "Success");
        Ok(true)
    }

    async fn last_error(&self) -> Result<LastError> {
        self.enter(PaperCall::LastError).await;
        Ok(self.lock().last_error.clone())
    }

    async fn account_info(&self) -> Result<Option<AccountInfo>> {
        self.enter(PaperCall::AccountInfo).await;
        let state = self.lock();
        let Some((login, server)) = state.logged_in.clone() else {
            return Ok(None);
        };
        Ok(Some(self.account_snapshot(&state, login, &server)))
    }

    async fn tick(&self, symbol: &str) -> Result<Option<Tick>> {
        self.enter(PaperCall::Tick).await;
        Ok(self.lock().ticks.get(symbol).copied())
    }

    async fn positions(&self, filter: PositionFilter) -> Result<Vec<Position>> {
        self.enter(PaperCall::Positions).await;
        Ok(self
            .lock()
            .positions
            .values()
            .filter(|position| filter.matches(position.ticket, &position.symbol))
            .cloned()
            .collect())
    }

    async fn send_order(&self, instruction: &TradeInstruction) -> Result<TradeResult> {
        self.enter(PaperCall::SendOrder).await;
        let mut state = self.lock();
        state.sent_orders.push(instruction.clone());
        Ok(self.execute(&mut state, instruction))
    }

    async fn shutdown(&self) -> Result<()> {
        self.enter(PaperCall::Shutdown).await;
        self.lock().logged_in = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(value: &str) -> Decimal {
        Decimal::from_str(value).expect("valid decimal")
    }

    #[tokio::test]
    async fn test_paper_open_and_close_round_trip_updates_balance() {
        let broker = PaperBroker::new();
        assert!(broker.login(5001, "pw", "Paper-Demo").await.unwrap());
        broker.set_tick("EURUSD", dec("1.1000"), dec("1.1002"));

        let open = TradeInstruction::market_deal("EURUSD", Direction::Buy, dec("0.10"), dec("1.1002"));
        let opened = broker.send_order(&open).await.unwrap();
        assert!(opened.is_done());

        broker.set_tick("EURUSD", dec("1.1012"), dec("1.1014"));
        let position = broker.open_positions().remove(0);
        assert_eq!(position.profit, dec("10.00"));

        let close = TradeInstruction::market_deal("EURUSD", Direction::Sell, dec("0.10"), dec("1.1012"))
            .closing(opened.order);
        assert!(broker.send_order(&close).await.unwrap().is_done());
        assert!(broker.open_positions().is_empty());
        assert_eq!(broker.balance(), dec("10010.00"));
    }

    #[tokio::test]
    async fn test_paper_rejects_orders_before_login() {
        let broker = PaperBroker::new();
        let open = TradeInstruction::market_deal("EURUSD", Direction::Sell, dec("0.01"), dec("1.1"));
        let result = broker.send_order(&open).await.unwrap();
        assert_eq!(result.retcode, TRADE_RETCODE_REJECT);
        assert_eq!(broker.call_count(PaperCall::SendOrder), 1);
    }

    #[tokio::test]
    async fn test_paper_refused_login_sets_last_error() {
        let broker = PaperBroker::new();
        broker.set_accept_login(false);
        assert!(!broker.login(5001, "bad", "Paper-Demo").await.unwrap());
        let err = broker.last_error().await.unwrap();
        assert_eq!(err.code, -6);
        assert!(broker.account_info().await.unwrap().is_none());
    }
}
