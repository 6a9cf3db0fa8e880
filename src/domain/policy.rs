use super::case::Case;
use super::history::{ClientProfile, HistoryStats};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyAction {
    Reject,
    FlagSuspicious,
    FlagForReview,
}

/// The check property a rule tests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum Condition {
    AmountExceedsAveragePercent { percent: f64 },
    MissingWatermark,
    MissingSignature,
    PayeeIn { payees: Vec<String> },
    NewAccountLargeAmount { max_age_days: i64, min_amount: Decimal },
    UnknownPayee,
    SelfPayee,
    RapidDeposits { max_count: usize },
    RoundAmount { min_amount: Decimal, multiple: Decimal },
    ImageQualityBelow { threshold: f64 },
    DeviceMatches { markers: Vec<String> },
    AmountWordsMismatch,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyRule {
    pub policy_id: String,
    pub name: String,
    pub category: String,
    pub severity: Severity,
    pub action: PolicyAction,
    pub condition: Condition,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

/// Everything a rule may look at besides the case itself.
pub struct PolicyContext<'a> {
    pub case: &'a Case,
    pub client: Option<&'a ClientProfile>,
    pub stats: &'a HistoryStats,
    /// Deposits by the same client within 24 hours of the check date.
    pub recent_deposits: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    pub policy_id: String,
    pub name: String,
    pub category: String,
    pub severity: Severity,
    pub action: PolicyAction,
    pub details: String,
}

impl PolicyRule {
    /// Returns the violation details when the rule fires.
    pub fn evaluate(&self, ctx: &PolicyContext<'_>) -> Option<Violation> {
        if !self.active {
            return None;
        }
        let case = ctx.case;
        let amount = case.amount.to_f64().unwrap_or(0.0);

        let details = match &self.condition {
            Condition::AmountExceedsAveragePercent { percent } => {
                if ctx.stats.count == 0 || ctx.stats.mean <= 0.0 {
                    return None;
                }
                let ratio = amount / ctx.stats.mean * 100.0;
                (ratio > *percent).then(|| {
                    format!(
                        "amount {} is {:.0}% of the historical average {:.2}",
                        case.amount, ratio, ctx.stats.mean
                    )
                })
            }
            Condition::MissingWatermark => {
                (!case.has_watermark).then(|| "bank watermark not present".to_string())
            }
            Condition::MissingSignature => {
                (!case.signature_present).then(|| "check is unsigned".to_string())
            }
            Condition::PayeeIn { payees } => payees
                .iter()
                .any(|p| p.eq_ignore_ascii_case(case.payee.trim()))
                .then(|| format!("payee '{}' is a bearer payee", case.payee)),
            Condition::NewAccountLargeAmount {
                max_age_days,
                min_amount,
            } => {
                let client = ctx.client?;
                let age = client.account_age_days(case.date);
                (age < *max_age_days && case.amount > *min_amount).then(|| {
                    format!("amount {} on an account opened {} days ago", case.amount, age)
                })
            }
            Condition::UnknownPayee => {
                let client = ctx.client?;
                (!client.knows_payee(&case.payee))
                    .then(|| format!("payee '{}' not among typical payees", case.payee))
            }
            Condition::SelfPayee => {
                let client = ctx.client?;
                client
                    .name
                    .eq_ignore_ascii_case(case.payee.trim())
                    .then(|| "payee matches the account holder".to_string())
            }
            Condition::RapidDeposits { max_count } => (ctx.recent_deposits > *max_count)
                .then(|| format!("{} deposits within 24 hours", ctx.recent_deposits)),
            Condition::RoundAmount {
                min_amount,
                multiple,
            } => {
                let round = !multiple.is_zero() && (case.amount % *multiple).is_zero();
                (case.amount > *min_amount && round)
                    .then(|| format!("round amount {}", case.amount))
            }
            Condition::ImageQualityBelow { threshold } => {
                let quality = case.image_quality?;
                (quality < *threshold)
                    .then(|| format!("image quality {:.2} below {:.2}", quality, threshold))
            }
            Condition::DeviceMatches { markers } => {
                let device = case.device.as_deref()?.to_lowercase();
                markers
                    .iter()
                    .find(|marker| device.contains(&marker.to_lowercase()))
                    .map(|marker| format!("capture device flagged as {}", marker))
            }
            Condition::AmountWordsMismatch => {
                let written = case.amount_written.as_deref()?;
                let parsed = parse_written_amount(written)?;
                (parsed != case.amount.round_dp(2)).then(|| {
                    format!(
                        "written amount {} does not match numeric amount {}",
                        parsed, case.amount
                    )
                })
            }
        }?;

        Some(Violation {
            policy_id: self.policy_id.clone(),
            name: self.name.clone(),
            category: self.category.clone(),
            severity: self.severity,
            action: self.action,
            details,
        })
    }
}

pub fn evaluate_all(rules: &[PolicyRule], ctx: &PolicyContext<'_>) -> Vec<Violation> {
    rules.iter().filter_map(|rule| rule.evaluate(ctx)).collect()
}

/// Parses amounts such as "Two hundred fifty and 25/100". Returns `None`
/// when the text contains words it does not understand.
pub fn parse_written_amount(text: &str) -> Option<Decimal> {
    let lowered = text.to_lowercase().replace('-', " ");
    let (words, cents) = match lowered.split_once(" and ") {
        Some((words, rest)) => (words.to_string(), parse_cents(rest)?),
        None => (lowered.clone(), Decimal::ZERO),
    };

    // Overflowing text is as unreadable as unknown words.
    let mut total: u64 = 0;
    let mut current: u64 = 0;
    let mut seen = false;
    for word in words.split_whitespace() {
        let word = word.trim_matches(|c: char| !c.is_alphanumeric());
        match word {
            "" | "dollars" | "dollar" | "only" => continue,
            "hundred" => current = current.max(1).checked_mul(100)?,
            "thousand" => {
                total = total.checked_add(current.max(1).checked_mul(1_000)?)?;
                current = 0;
            }
            "million" => {
                total = total.checked_add(current.max(1).checked_mul(1_000_000)?)?;
                current = 0;
            }
            other => current = current.checked_add(small_number(other)?)?,
        }
        seen = true;
    }

    let whole = total.checked_add(current)?;
    seen.then(|| Decimal::from(whole) + cents)
}

fn parse_cents(rest: &str) -> Option<Decimal> {
    let fraction = rest.split_whitespace().next()?;
    let (num, _) = fraction.split_once('/')?;
    let cents: u32 = num.parse().ok()?;
    (cents < 100).then(|| Decimal::from(cents) / dec!(100))
}

fn small_number(word: &str) -> Option<u64> {
    let value = match word {
        "zero" => 0,
        "one" => 1,
        "two" => 2,
        "three" => 3,
        "four" => 4,
        "five" => 5,
        "six" => 6,
        "seven" => 7,
        "eight" => 8,
        "nine" => 9,
        "ten" => 10,
        "eleven" => 11,
        "twelve" => 12,
        "thirteen" => 13,
        "fourteen" => 14,
        "fifteen" => 15,
        "sixteen" => 16,
        "seventeen" => 17,
        "eighteen" => 18,
        "nineteen" => 19,
        "twenty" => 20,
        "thirty" => 30,
        "forty" => 40,
        "fifty" => 50,
        "sixty" => 60,
        "seventy" => 70,
        "eighty" => 80,
        "ninety" => 90,
        _ => return None,
    };
    Some(value)
}

fn rule(
    id: &str,
    name: &str,
    category: &str,
    severity: Severity,
    action: PolicyAction,
    condition: Condition,
) -> PolicyRule {
    PolicyRule {
        policy_id: id.to_string(),
        name: name.to_string(),
        category: category.to_string(),
        severity,
        action,
        condition,
        active: true,
    }
}

/// The bank's standard policy set.
#[rustfmt::skip]
pub fn default_policies() -> Vec<PolicyRule> {
    use Condition::*;
    use PolicyAction::*;
    use Severity::*;

    vec![
        rule("POL001", "High Amount Threshold", "amount_analysis", High, FlagForReview,
            AmountExceedsAveragePercent { percent: 500.0 }),
        rule("POL002", "Missing Watermark Detection", "physical_verification", Critical, FlagSuspicious,
            MissingWatermark),
        rule("POL003", "Missing Signature", "physical_verification", Critical, Reject,
            MissingSignature),
        rule("POL004", "Cash Payee Alert", "payee_analysis", High, FlagForReview,
            PayeeIn { payees: vec!["cash".to_string(), "bearer".to_string()] }),
        rule("POL005", "New Account Large Transaction", "account_analysis", High, FlagForReview,
            NewAccountLargeAmount { max_age_days: 90, min_amount: dec!(5000) }),
        rule("POL006", "Unusual Payee Detection", "payee_analysis", Medium, FlagForReview,
            UnknownPayee),
        rule("POL007", "Self-Payee Check", "payee_analysis", Medium, FlagForReview,
            SelfPayee),
        rule("POL008", "Rapid Succession Deposits", "velocity_analysis", Medium, FlagForReview,
            RapidDeposits { max_count: 3 }),
        rule("POL009", "Round Amount Suspicion", "amount_analysis", Low, FlagForReview,
            RoundAmount { min_amount: dec!(1000), multiple: dec!(100) }),
        rule("POL010", "Mobile Deposit Image Quality", "image_analysis", Medium, FlagForReview,
            ImageQualityBelow { threshold: 0.6 }),
        rule("POL011", "Emulator Detection", "device_analysis", Critical, Reject,
            DeviceMatches { markers: vec!["emulator".to_string(), "rooted".to_string(), "jailbroken".to_string()] }),
        rule("POL012", "Amount Mismatch Detection", "amount_analysis", High, FlagForReview,
            AmountWordsMismatch),
    ]
}
