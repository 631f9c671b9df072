//! Simulated position book: averaged-in lots, realized P&L and forced exits.

use chrono::NaiveDate;
use std::fmt;

use crate::domain::error::FuseError;
use crate::domain::ohlcv::PriceBar;
use crate::domain::recommendation::OrderType;
use crate::domain::signal::percent_change;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookState {
    Open,
    Holding,
}

/// Per-bar action label written to the audit trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    StrongBuy,
    StrongSell,
    Indeterminant,
    StopLoss,
    TakeProfit,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::StrongBuy => write!(f, "STRONGBUY"),
            Action::StrongSell => write!(f, "STRONGSELL"),
            Action::Indeterminant => write!(f, "INDETERMINANT"),
            Action::StopLoss => write!(f, "STOPLOSS"),
            Action::TakeProfit => write!(f, "TAKEPROFIT"),
        }
    }
}

/// Forced-exit bounds on the return from average cost. `None` disables a side.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ExitThresholds {
    pub loss: Option<f64>,
    pub profit: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClosedTrade {
    pub exit_date: NaiveDate,
    pub lots: usize,
    pub average_cost: f64,
    pub exit_price: f64,
    pub pnl: f64,
    /// P&L over the capital the lots tied up.
    pub trade_return: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BarOutcome {
    pub action: Action,
    /// Set only when the bar moved the book between Open and Holding.
    pub signal: Option<OrderType>,
    pub state: BookState,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderBook {
    pub open_lots: Vec<f64>,
    pub net: f64,
    pub total_invested: f64,
    pub trade_count: usize,
    pub profitable_trades: usize,
    /// Worst realized per-trade return; `None` until a trade closes.
    pub max_drawdown: Option<f64>,
    pub closed_trades: Vec<ClosedTrade>,
}

impl OrderBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> BookState {
        if self.open_lots.is_empty() {
            BookState::Open
        } else {
            BookState::Holding
        }
    }

    pub fn average_cost(&self) -> Option<f64> {
        if self.open_lots.is_empty() {
            return None;
        }
        Some(self.open_lots.iter().sum::<f64>() / self.open_lots.len() as f64)
    }

    pub fn buy(&mut self, price: f64) {
        self.open_lots.push(price);
    }

    /// Close every open lot at `bar.close`. Does nothing when flat.
    pub fn close_all(&mut self, bar: &PriceBar) -> Result<Option<ClosedTrade>, FuseError> {
        let Some(average_cost) = self.average_cost() else {
            return Ok(None);
        };
        let trade_return = return_since(average_cost, bar.close)?;
        let lots = self.open_lots.len();
        let pnl = (bar.close - average_cost) * lots as f64;

        self.net += pnl;
        self.total_invested += average_cost * lots as f64;
        self.trade_count += 1;
        if pnl > 0.0 {
            self.profitable_trades += 1;
        }
        self.max_drawdown = Some(
            self.max_drawdown
                .map_or(trade_return, |worst| worst.min(trade_return)),
        );
        self.open_lots.clear();

        let trade = ClosedTrade {
            exit_date: bar.date,
            lots,
            average_cost,
            exit_price: bar.close,
            pnl,
            trade_return,
        };
        self.closed_trades.push(trade.clone());
        Ok(Some(trade))
    }

    /// Stop-loss or take-profit label if the position has moved past a threshold.
    pub fn forced_exit(
        &self,
        close: f64,
        thresholds: &ExitThresholds,
    ) -> Result<Option<Action>, FuseError> {
        let Some(average_cost) = self.average_cost() else {
            return Ok(None);
        };
        if thresholds.loss.is_none() && thresholds.profit.is_none() {
            return Ok(None);
        }
        let change = return_since(average_cost, close)?;
        if thresholds.loss.is_some_and(|loss| change < loss) {
            Ok(Some(Action::StopLoss))
        } else if thresholds.profit.is_some_and(|profit| change > profit) {
            Ok(Some(Action::TakeProfit))
        } else {
            Ok(None)
        }
    }

    /// Apply one bar. Forced exits take precedence over `decision`.
    pub fn step(
        &mut self,
        bar: &PriceBar,
        decision: OrderType,
        thresholds: &ExitThresholds,
    ) -> Result<BarOutcome, FuseError> {
        let before = self.state();

        let (action, fill) = match self.forced_exit(bar.close, thresholds)? {
            Some(forced) => (forced, OrderType::Sell),
            None => match decision {
                OrderType::Buy => (Action::StrongBuy, OrderType::Buy),
                OrderType::Sell => (Action::StrongSell, OrderType::Sell),
                OrderType::None => (Action::Indeterminant, OrderType::None),
            },
        };

        match fill {
            OrderType::Buy => self.buy(bar.close),
            OrderType::Sell => {
                self.close_all(bar)?;
            }
            OrderType::None => {}
        }

        let state = self.state();
        let signal = match (before, state) {
            (BookState::Open, BookState::Holding) => Some(OrderType::Buy),
            (BookState::Holding, BookState::Open) => Some(OrderType::Sell),
            _ => None,
        };
        Ok(BarOutcome {
            action,
            signal,
            state,
        })
    }
}

fn return_since(average_cost: f64, close: f64) -> Result<f64, FuseError> {
    percent_change(average_cost, close).ok_or_else(|| FuseError::Computation {
        reason: format!("average cost {} gives undefined return", average_cost),
    })
}
