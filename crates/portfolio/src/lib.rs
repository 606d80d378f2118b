use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use common::{ClosedTrade, ExitReason, Order, OrderSide, Position, Signal, StateError};
use risk::Sizing;

/// Cash, open positions and the order log of a simulated account.
///
/// This is the only place positions and orders are created, changed or
/// removed. Fills are applied the moment `execute`/`close` is called; there
/// is no pending state and no acknowledgement step.
#[derive(Debug, Clone)]
pub struct PortfolioState {
    cash: f64,
    initial_capital: f64,
    /// Keyed by symbol; ordered so iteration is deterministic.
    positions: BTreeMap<String, Position>,
    /// Latest observed close per held symbol.
    marks: HashMap<String, f64>,
    orders: Vec<Order>,
    closed_trades: Vec<ClosedTrade>,
}

impl PortfolioState {
    pub fn new(initial_capital: f64) -> Self {
        info!(capital = initial_capital, "Portfolio initialized");
        Self {
            cash: initial_capital,
            initial_capital,
            positions: BTreeMap::new(),
            marks: HashMap::new(),
            orders: Vec::new(),
            closed_trades: Vec::new(),
        }
    }

    pub fn cash(&self) -> f64 {
        self.cash
    }

    pub fn initial_capital(&self) -> f64 {
        self.initial_capital
    }

    /// Cash plus every open position valued at its latest mark (entry price
    /// until a newer close has been seen).
    pub fn equity(&self) -> f64 {
        let position_value: f64 = self
            .positions
            .values()
            .map(|p| p.market_value(self.mark_of(p)))
            .sum();
        self.cash + position_value
    }

    pub fn realized_pnl(&self) -> f64 {
        self.closed_trades.iter().map(|t| t.pnl).sum()
    }

    pub fn has_position(&self, symbol: &str) -> bool {
        self.positions.contains_key(symbol)
    }

    pub fn position(&self, symbol: &str) -> Option<&Position> {
        self.positions.get(symbol)
    }

    pub fn positions(&self) -> impl Iterator<Item = &Position> {
        self.positions.values()
    }

    pub fn open_symbols(&self) -> Vec<String> {
        self.positions.keys().cloned().collect()
    }

    pub fn orders(&self) -> &[Order] {
        &self.orders
    }

    pub fn closed_trades(&self) -> &[ClosedTrade] {
        &self.closed_trades
    }

    /// Open a long position at the signal's trigger price.
    ///
    /// Rejects a zero quantity or a price that is not a positive finite
    /// number before touching any state.
    pub fn execute(&mut self, signal: &Signal, sizing: &Sizing) -> Result<Order, StateError> {
        if self.has_position(&signal.symbol) {
            return Err(StateError::PositionAlreadyOpen {
                symbol: signal.symbol.clone(),
            });
        }
        if sizing.quantity == 0 || !valid_price(signal.trigger_price) {
            return Err(StateError::InvalidFill {
                symbol: signal.symbol.clone(),
                quantity: sizing.quantity,
                price: signal.trigger_price,
            });
        }

        let order = Order::filled(
            &signal.symbol,
            OrderSide::Buy,
            sizing.quantity,
            signal.trigger_price,
            signal.timestamp,
        );
        self.cash -= order.notional();

        self.positions.insert(
            signal.symbol.clone(),
            Position {
                symbol: signal.symbol.clone(),
                quantity: sizing.quantity,
                entry_price: signal.trigger_price,
                entry_timestamp: signal.timestamp,
                stop_price: sizing.stop_price,
                high_water_mark: signal.trigger_price,
            },
        );
        self.marks.insert(signal.symbol.clone(), signal.trigger_price);
        self.orders.push(order.clone());

        info!(
            symbol = %order.symbol,
            qty = order.quantity,
            price = order.price,
            stop = sizing.stop_price,
            cash = self.cash,
            "Position opened"
        );
        Ok(order)
    }

    /// Close the whole position at `exit_price`.
    pub fn close(
        &mut self,
        symbol: &str,
        exit_price: f64,
        timestamp: DateTime<Utc>,
        reason: ExitReason,
    ) -> Result<(Order, ClosedTrade), StateError> {
        let quantity = self
            .positions
            .get(symbol)
            .map(|p| p.quantity)
            .ok_or_else(|| StateError::NoOpenPosition {
                symbol: symbol.to_string(),
            })?;
        if !valid_price(exit_price) {
            return Err(StateError::InvalidFill {
                symbol: symbol.to_string(),
                quantity,
                price: exit_price,
            });
        }
        let position = self
            .positions
            .remove(symbol)
            .ok_or_else(|| StateError::NoOpenPosition {
                symbol: symbol.to_string(),
            })?;
        self.marks.remove(symbol);

        let order = Order::filled(
            symbol,
            OrderSide::Sell,
            position.quantity,
            exit_price,
            timestamp,
        );
        self.cash += order.notional();

        let pnl = (exit_price - position.entry_price) * position.quantity as f64;
        let trade = ClosedTrade {
            symbol: symbol.to_string(),
            quantity: position.quantity,
            entry_price: position.entry_price,
            exit_price,
            entry_timestamp: position.entry_timestamp,
            exit_timestamp: timestamp,
            pnl,
            pnl_pct: (exit_price - position.entry_price) / position.entry_price * 100.0,
            reason,
        };
        self.orders.push(order.clone());
        self.closed_trades.push(trade.clone());

        info!(
            symbol = %symbol,
            qty = position.quantity,
            entry = position.entry_price,
            exit = exit_price,
            pnl = pnl,
            reason = %reason,
            "Position closed"
        );
        Ok((order, trade))
    }

    /// Raise the stop to `candidate` if that is higher. Returns the stop in force.
    pub fn ratchet_stop(&mut self, symbol: &str, candidate: f64) -> Result<f64, StateError> {
        let position = self
            .positions
            .get_mut(symbol)
            .ok_or_else(|| StateError::NoOpenPosition {
                symbol: symbol.to_string(),
            })?;
        if candidate > position.stop_price {
            debug!(
                symbol = %symbol,
                from = position.stop_price,
                to = candidate,
                "Stop raised"
            );
            position.stop_price = candidate;
        }
        Ok(position.stop_price)
    }

    /// Record the latest close for a held symbol. No-op when flat.
    pub fn mark(&mut self, symbol: &str, price: f64) {
        if let Some(position) = self.positions.get_mut(symbol) {
            position.high_water_mark = position.high_water_mark.max(price);
            self.marks.insert(symbol.to_string(), price);
        }
    }

    fn mark_of(&self, position: &Position) -> f64 {
        self.marks
            .get(&position.symbol)
            .copied()
            .unwrap_or(position.entry_price)
    }
}

fn valid_price(price: f64) -> bool {
    price.is_finite() && price > 0.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, day, 0, 0, 0).unwrap()
    }

    fn signal(symbol: &str, price: f64) -> Signal {
        Signal {
            symbol: symbol.into(),
            trigger_price: price,
            timestamp: ts(1),
            range_high: price - 1.0,
        }
    }

    fn sizing(quantity: u64, stop_price: f64) -> Sizing {
        Sizing {
            quantity,
            stop_distance: 4.0,
            stop_price,
            atr: 2.0,
            risk_amount: 2000.0,
        }
    }

    #[test]
    fn execute_debits_cash_and_records_order() {
        let mut p = PortfolioState::new(100_000.0);
        let order = p.execute(&signal("AAPL", 50.0), &sizing(500, 46.0)).unwrap();

        assert_eq!(order.side, OrderSide::Buy);
        assert_eq!(p.cash(), 75_000.0);
        assert_eq!(p.orders().len(), 1);
        let pos = p.position("AAPL").unwrap();
        assert_eq!(pos.quantity, 500);
        assert_eq!(pos.stop_price, 46.0);
        assert_eq!(pos.high_water_mark, 50.0);
    }

    #[test]
    fn second_execute_is_a_state_error() {
        let mut p = PortfolioState::new(100_000.0);
        p.execute(&signal("AAPL", 50.0), &sizing(10, 46.0)).unwrap();
        let err = p.execute(&signal("AAPL", 51.0), &sizing(10, 47.0)).unwrap_err();
        assert_eq!(err, StateError::PositionAlreadyOpen { symbol: "AAPL".into() });
        assert_eq!(p.orders().len(), 1);
        assert_eq!(p.position("AAPL").unwrap().entry_price, 50.0);
    }

    #[test]
    fn zero_quantity_fill_is_rejected() {
        let mut p = PortfolioState::new(100_000.0);
        let err = p.execute(&signal("AAPL", 50.0), &sizing(0, 46.0)).unwrap_err();
        assert!(matches!(err, StateError::InvalidFill { quantity: 0, .. }));
        assert!(!p.has_position("AAPL"));
        assert!(p.orders().is_empty());
        assert_eq!(p.cash(), 100_000.0);
    }

    #[test]
    fn unusable_entry_price_is_rejected() {
        let mut p = PortfolioState::new(100_000.0);
        for price in [f64::NAN, f64::INFINITY, 0.0, -5.0] {
            let err = p.execute(&signal("AAPL", price), &sizing(10, 46.0)).unwrap_err();
            assert!(matches!(err, StateError::InvalidFill { .. }), "{price}");
        }
        assert!(!p.has_position("AAPL"));
        assert!(p.orders().is_empty());
        assert_eq!(p.cash(), 100_000.0);
    }

    #[test]
    fn unusable_exit_price_keeps_the_position() {
        let mut p = PortfolioState::new(100_000.0);
        p.execute(&signal("AAPL", 50.0), &sizing(10, 46.0)).unwrap();
        let err = p
            .close("AAPL", f64::NAN, ts(2), ExitReason::TrailingStop)
            .unwrap_err();
        assert!(matches!(err, StateError::InvalidFill { quantity: 10, .. }));
        assert!(p.has_position("AAPL"));
        assert_eq!(p.orders().len(), 1);
        assert_eq!(p.cash(), 99_500.0);
    }

    #[test]
    fn close_without_position_is_a_state_error() {
        let mut p = PortfolioState::new(100_000.0);
        let err = p
            .close("AAPL", 50.0, ts(2), ExitReason::TrailingStop)
            .unwrap_err();
        assert_eq!(err, StateError::NoOpenPosition { symbol: "AAPL".into() });
        assert!(p.orders().is_empty());
    }

    #[test]
    fn close_realizes_pnl_and_credits_cash() {
        let mut p = PortfolioState::new(100_000.0);
        p.execute(&signal("AAPL", 50.0), &sizing(100, 46.0)).unwrap();
        let (order, trade) = p.close("AAPL", 55.0, ts(9), ExitReason::TrailingStop).unwrap();

        assert_eq!(order.side, OrderSide::Sell);
        assert_eq!(trade.pnl, 500.0);
        assert!((trade.pnl_pct - 10.0).abs() < 1e-9);
        assert_eq!(p.cash(), 100_500.0);
        assert!(!p.has_position("AAPL"));
        assert_eq!(p.orders().len(), 2);
        assert_eq!(p.realized_pnl(), 500.0);
    }

    #[test]
    fn equity_marks_to_market() {
        let mut p = PortfolioState::new(10_000.0);
        p.execute(&signal("AAPL", 50.0), &sizing(100, 46.0)).unwrap();
        assert_eq!(p.equity(), 10_000.0);

        p.mark("AAPL", 60.0);
        assert_eq!(p.cash(), 5_000.0);
        assert_eq!(p.equity(), 11_000.0);
        assert_eq!(p.position("AAPL").unwrap().high_water_mark, 60.0);

        p.mark("AAPL", 55.0);
        assert_eq!(p.equity(), 10_500.0);
        assert_eq!(p.position("AAPL").unwrap().high_water_mark, 60.0);
    }

    #[test]
    fn mark_on_flat_symbol_is_ignored() {
        let mut p = PortfolioState::new(10_000.0);
        p.mark("MSFT", 300.0);
        assert_eq!(p.equity(), 10_000.0);
    }

    #[test]
    fn ratchet_only_raises() {
        let mut p = PortfolioState::new(100_000.0);
        p.execute(&signal("AAPL", 50.0), &sizing(10, 46.0)).unwrap();
        assert_eq!(p.ratchet_stop("AAPL", 48.0).unwrap(), 48.0);
        assert_eq!(p.ratchet_stop("AAPL", 47.0).unwrap(), 48.0);
        assert_eq!(p.position("AAPL").unwrap().stop_price, 48.0);
        assert!(p.ratchet_stop("MSFT", 1.0).is_err());
    }
}
