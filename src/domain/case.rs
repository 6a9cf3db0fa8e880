use crate::error::{CheckGuardError, Result};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Policy set applied when a case does not name one.
pub const DEFAULT_POLICY_SET: &str = "default";

/// One fraud-review request for a bank check.
///
/// A `Case` is immutable once it enters a workflow run: the orchestrator wraps
/// it in an `Arc` and every agent receives a read-only reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Case {
    /// Unique identifier of the review request.
    pub case_id: String,
    /// Account holder the check is drawn against.
    pub client_id: String,
    pub check_number: String,
    /// Issue date printed on the check.
    pub date: NaiveDate,
    pub amount: Decimal,
    /// Amount as written in words, when captured.
    #[serde(default)]
    pub amount_written: Option<String>,
    pub payee: String,
    #[serde(default)]
    pub bank_name: Option<String>,
    pub account_number: String,
    pub routing_number: String,
    #[serde(default)]
    pub micr_line: Option<String>,
    /// Reference to the scanned check image.
    #[serde(default)]
    pub image_ref: Option<String>,
    /// Reference into the transaction history store; defaults to the client id.
    #[serde(default)]
    pub history_ref: Option<String>,
    /// Policy set to evaluate; defaults to [`DEFAULT_POLICY_SET`].
    #[serde(default)]
    pub policy_ref: Option<String>,
    #[serde(default = "default_true")]
    pub has_watermark: bool,
    #[serde(default = "default_true")]
    pub signature_present: bool,
    /// Capture device reported by a mobile deposit.
    #[serde(default)]
    pub device: Option<String>,
    /// Image quality score in `[0, 1]` reported by the capture channel.
    #[serde(default)]
    pub image_quality: Option<f64>,
}

fn default_true() -> bool {
    true
}

impl Case {
    /// Checks the fields every check case must carry.
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("case_id", &self.case_id),
            ("client_id", &self.client_id),
            ("check_number", &self.check_number),
            ("payee", &self.payee),
            ("account_number", &self.account_number),
            ("routing_number", &self.routing_number),
        ];
        if let Some((field, _)) = required.iter().find(|(_, value)| value.trim().is_empty()) {
            return Err(CheckGuardError::InvalidCase(format!(
                "{} must not be empty",
                field
            )));
        }

        if self.amount <= Decimal::ZERO {
            return Err(CheckGuardError::InvalidCase(format!(
                "amount must be positive, got {}",
                self.amount
            )));
        }

        if let Some(quality) = self.image_quality
            && !(0.0..=1.0).contains(&quality)
        {
            return Err(CheckGuardError::InvalidCase(format!(
                "image_quality must be within [0, 1], got {}",
                quality
            )));
        }

        Ok(())
    }

    pub fn history_key(&self) -> &str {
        self.history_ref.as_deref().unwrap_or(&self.client_id)
    }

    pub fn policy_set(&self) -> &str {
        self.policy_ref.as_deref().unwrap_or(DEFAULT_POLICY_SET)
    }
}
