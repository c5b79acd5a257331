//! The fixed asset universe for the rotation strategy.
//!
//! Growth candidates compete for allocation, the hedge ticker is a
//! signal-only trend gauge, and the safe ticker absorbs the whole
//! portfolio when the hedge signal turns negative.

/// Asset roles, with a stable slot order: growth tickers first, then
/// the hedge, then the safe asset.
///
/// Weight vectors cover growth tickers plus the safe asset, in that
/// order. The hedge ticker is never held. At least two growth
/// candidates are required.
#[derive(Debug, Clone, PartialEq)]
pub struct Universe {
    pub growth: Vec<String>,
    pub hedge: String,
    pub safe: String,
}

impl Universe {
    pub fn new(growth: Vec<String>, hedge: String, safe: String) -> Self {
        Self {
            growth,
            hedge,
            safe,
        }
    }

    /// SPY/QQQ/GLD rotation hedged by TIP, parked in BIL.
    pub fn default_etf() -> Self {
        Self::new(
            vec!["SPY".to_string(), "QQQ".to_string(), "GLD".to_string()],
            "TIP".to_string(),
            "BIL".to_string(),
        )
    }

    /// All tickers in slot order.
    pub fn tickers(&self) -> Vec<String> {
        let mut tickers = self.growth.clone();
        tickers.push(self.hedge.clone());
        tickers.push(self.safe.clone());
        tickers
    }

    /// Tickers eligible for a portfolio weight, in weight order.
    pub fn weighted_tickers(&self) -> Vec<String> {
        let mut tickers = self.growth.clone();
        tickers.push(self.safe.clone());
        tickers
    }

    /// Number of slots, growth plus hedge plus safe.
    pub fn count(&self) -> usize {
        self.growth.len() + 2
    }

    pub fn growth_slots(&self) -> std::ops::Range<usize> {
        0..self.growth.len()
    }

    pub fn hedge_slot(&self) -> usize {
        self.growth.len()
    }

    pub fn safe_slot(&self) -> usize {
        self.growth.len() + 1
    }

    /// Slot of `ticker`, or `None` if it is not in the universe.
    pub fn slot_of(&self, ticker: &str) -> Option<usize> {
        if let Some(i) = self.growth.iter().position(|t| t == ticker) {
            Some(i)
        } else if self.hedge == ticker {
            Some(self.hedge_slot())
        } else if self.safe == ticker {
            Some(self.safe_slot())
        } else {
            None
        }
    }
}
