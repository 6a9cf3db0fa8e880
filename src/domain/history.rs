use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

/// Account holder profile kept by the history store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientProfile {
    pub client_id: String,
    pub name: String,
    pub account_opened: NaiveDate,
    pub typical_payees: Vec<String>,
}

impl ClientProfile {
    pub fn knows_payee(&self, payee: &str) -> bool {
        self.typical_payees
            .iter()
            .any(|known| known.eq_ignore_ascii_case(payee.trim()))
    }

    pub fn account_age_days(&self, on: NaiveDate) -> i64 {
        (on - self.account_opened).num_days()
    }
}

/// A past check transaction for a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalTransaction {
    pub client_id: String,
    pub date: NaiveDate,
    pub amount: Decimal,
    pub payee: String,
}

/// Summary statistics over a client's history.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct HistoryStats {
    pub count: usize,
    pub mean: f64,
    pub std_dev: f64,
    pub max: f64,
}

impl HistoryStats {
    pub fn from_transactions(transactions: &[HistoricalTransaction]) -> Self {
        let amounts: Vec<f64> = transactions
            .iter()
            .filter_map(|tx| tx.amount.to_f64())
            .collect();
        if amounts.is_empty() {
            return Self::default();
        }

        let count = amounts.len();
        let mean = amounts.iter().sum::<f64>() / count as f64;
        let std_dev = if count < 2 {
            0.0
        } else {
            let variance =
                amounts.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / count as f64;
            variance.sqrt()
        };
        let max = amounts.iter().copied().fold(f64::MIN, f64::max);

        Self {
            count,
            mean,
            std_dev,
            max,
        }
    }

    /// Standard score of `amount` against the history. A flat history scores
    /// 0 for the usual amount and 5 for anything else.
    pub fn z_score(&self, amount: f64) -> f64 {
        if self.std_dev > 0.0 {
            (amount - self.mean) / self.std_dev
        } else if (amount - self.mean).abs() < f64::EPSILON {
            0.0
        } else {
            5.0
        }
    }
}

/// Counts transactions dated on `on` or the day before it.
pub fn deposits_within_day(transactions: &[HistoricalTransaction], on: NaiveDate) -> usize {
    transactions
        .iter()
        .filter(|tx| (0..=1).contains(&(on - tx.date).num_days()))
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn tx(amount: Decimal) -> HistoricalTransaction {
        HistoricalTransaction {
            client_id: "C1".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            amount,
            payee: "Grocer".to_string(),
        }
    }

    #[test]
    fn test_stats_over_history() {
        let stats =
            HistoryStats::from_transactions(&[tx(dec!(100)), tx(dec!(200)), tx(dec!(300))]);
        assert_eq!(stats.count, 3);
        assert!((stats.mean - 200.0).abs() < 1e-9);
        assert!((stats.max - 300.0).abs() < 1e-9);
        assert!(stats.std_dev > 81.0 && stats.std_dev < 82.0);
        assert!(stats.z_score(1000.0) > 9.0);
    }

    #[test]
    fn test_flat_history_z_score() {
        let stats = HistoryStats::from_transactions(&[tx(dec!(50))]);
        assert_eq!(stats.z_score(50.0), 0.0);
        assert_eq!(stats.z_score(51.0), 5.0);
    }

    #[test]
    fn test_known_payee_is_case_insensitive() {
        let profile = ClientProfile {
            client_id: "C1".to_string(),
            name: "John Smith".to_string(),
            account_opened: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
            typical_payees: vec!["Electric Company".to_string()],
        };
        assert!(profile.knows_payee("electric company "));
        assert!(!profile.knows_payee("Cash"));
        assert_eq!(
            profile.account_age_days(NaiveDate::from_ymd_opt(2020, 1, 31).unwrap()),
            30
        );
    }

    #[test]
    fn test_deposits_within_day_ignores_older_and_future() {
        let on = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();
        let at = |day| HistoricalTransaction {
            date: NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            ..tx(dec!(10))
        };
        let history = [at(10), at(9), at(9), at(8), at(11)];
        assert_eq!(deposits_within_day(&history, on), 3);
    }
}
