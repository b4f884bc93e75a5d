//! Flow sentiment classification.

use serde::{Deserialize, Serialize};

use crate::data::round2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sentiment {
    NoSignal,
    Equal,
    BuyRetracementExpected,
    SellRetracementExpected,
    StrongBuy,
    StrongSell,
    NormalBuy,
    NormalSell,
}

impl Sentiment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::NoSignal => "NO SIGNAL",
            Sentiment::Equal => "BOTH ARE EQUAL",
            Sentiment::BuyRetracementExpected => "BUY RETRACEMENT EXPECTED",
            Sentiment::SellRetracementExpected => "SELL RETRACEMENT EXPECTED",
            Sentiment::StrongBuy => "STRONG BUY",
            Sentiment::StrongSell => "STRONG SELL",
            Sentiment::NormalBuy => "NORMAL BUY",
            Sentiment::NormalSell => "NORMAL SELL",
        }
    }

    /// Short badge text shown next to the verdict.
    pub fn badge(&self) -> &'static str {
        match self {
            Sentiment::NoSignal => "NO SIGNAL",
            Sentiment::Equal => "NEUTRAL",
            Sentiment::BuyRetracementExpected => "BUY RETRACEMENT",
            Sentiment::SellRetracementExpected => "SELL RETRACEMENT",
            Sentiment::StrongBuy => "STRONG BUY",
            Sentiment::StrongSell => "STRONG SELL",
            Sentiment::NormalBuy => "NORMAL BUY",
            Sentiment::NormalSell => "NORMAL SELL",
        }
    }
}

impl std::fmt::Display for Sentiment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Full verdict for one pair of accumulated totals.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FlowAnalysis {
    pub buy_count: f64,
    pub sell_count: f64,
    pub difference: f64,
    /// Difference as a percentage of the combined total, 2-decimal rounded.
    pub percentage: f64,
    pub sentiment: Sentiment,
}

/// Classify accumulated buy/sell pressure. Total function: every pair of
/// finite nonnegative totals maps to exactly one sentiment.
pub fn classify(buy_count: f64, sell_count: f64) -> FlowAnalysis {
    let total = buy_count + sell_count;
    let difference = (buy_count - sell_count).abs();
    let percentage = if total > 0.0 {
        round2(difference / total * 100.0)
    } else {
        0.0
    };
    let buy_side = buy_count > sell_count;

    let sentiment = if buy_count == 0.0 && sell_count == 0.0 {
        Sentiment::NoSignal
    } else if buy_count == sell_count {
        Sentiment::Equal
    } else if percentage <= 25.0 {
        if buy_side {
            Sentiment::BuyRetracementExpected
        } else {
            Sentiment::SellRetracementExpected
        }
    } else if percentage > 66.0 {
        if buy_side {
            Sentiment::StrongBuy
        } else {
            Sentiment::StrongSell
        }
    } else if buy_side {
        Sentiment::NormalBuy
    } else {
        Sentiment::NormalSell
    };

    FlowAnalysis {
        buy_count,
        sell_count,
        difference,
        percentage,
        sentiment,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normal_buy_at_forty_percent() {
        let analysis = classify(70.0, 30.0);
        assert_eq!(analysis.percentage, 40.0);
        assert_eq!(analysis.sentiment, Sentiment::NormalBuy);
    }

    #[test]
    fn strong_buy_at_eighty_percent() {
        let analysis = classify(90.0, 10.0);
        assert_eq!(analysis.percentage, 80.0);
        assert_eq!(analysis.sentiment, Sentiment::StrongBuy);
    }

    #[test]
    fn no_signal_only_when_both_zero() {
        assert_eq!(classify(0.0, 0.0).sentiment, Sentiment::NoSignal);
        assert_eq!(classify(5.0, 5.0).sentiment, Sentiment::Equal);
    }

    #[test]
    fn buy_retracement_at_ten_percent() {
        let analysis = classify(55.0, 45.0);
        assert_eq!(analysis.percentage, 10.0);
        assert_eq!(analysis.sentiment, Sentiment::BuyRetracementExpected);
    }

    #[test]
    fn sell_side_mirrors_buy_side() {
        assert_eq!(classify(30.0, 70.0).sentiment, Sentiment::NormalSell);
        assert_eq!(classify(10.0, 90.0).sentiment, Sentiment::StrongSell);
        assert_eq!(
            classify(45.0, 55.0).sentiment,
            Sentiment::SellRetracementExpected
        );
    }

    #[test]
    fn boundary_percentages() {
        // 25% exactly stays retracement, just above 66% turns strong.
        assert_eq!(
            classify(62.5, 37.5).sentiment,
            Sentiment::BuyRetracementExpected
        );
        assert_eq!(classify(83.0, 17.0).sentiment, Sentiment::NormalBuy); // 66%
        assert_eq!(classify(84.0, 16.0).sentiment, Sentiment::StrongBuy); // 68%
    }
}
