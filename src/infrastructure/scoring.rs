//! Deterministic scoring collaborators.
//!
//! Each scorer turns one slice of evidence into a fraud risk in `[0, 1]`
//! plus the findings behind it. The check-image and holistic scorers stand
//! in for model-backed services and refuse to run in [`Mode::Real`]; the
//! history and policy scorers only read the stores and behave the same in
//! both modes.

use crate::application::agents::AgentRoster;
use crate::application::voting::{FLAG_KEY, RECOMMENDATION_KEY};
use crate::domain::case::Case;
use crate::domain::history::{HistoryStats, deposits_within_day};
use crate::domain::policy::{PolicyAction, PolicyContext, Severity, evaluate_all, parse_written_amount};
use crate::domain::ports::{HistoryStoreRef, Mode, PolicyStoreRef, Score, ScoreRequest, Scorer};
use crate::domain::run::AgentError;
use crate::domain::verdict::{Finding, Verdict};
use async_trait::async_trait;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use std::sync::Arc;

const BEARER_PAYEES: [&str; 2] = ["cash", "bearer"];
const SUSPICIOUS_DEVICES: [&str; 3] = ["emulator", "rooted", "jailbroken"];
const NEW_ACCOUNT_DAYS: i64 = 90;
const RAPID_DEPOSIT_LIMIT: usize = 3;
const LOW_IMAGE_QUALITY: f64 = 0.6;

/// Wires the simulation scorers into a full roster.
pub fn simulated_roster(history: HistoryStoreRef, policies: PolicyStoreRef) -> AgentRoster {
    AgentRoster::new(
        Arc::new(CheckImageScorer),
        Arc::new(HistoryScorer::new(Arc::clone(&history))),
        Arc::new(PolicyScorer::new(policies, history)),
        Arc::new(HolisticScorer),
    )
}

fn store_failure(e: crate::error::CheckGuardError) -> AgentError {
    AgentError::Execution(format!("store lookup failed: {}", e))
}

fn recommendation(text: impl Into<String>) -> Finding {
    Finding::new(RECOMMENDATION_KEY, text)
}

fn flag(name: &str) -> Finding {
    Finding::new(FLAG_KEY, name)
}

fn is_bearer(payee: &str) -> bool {
    BEARER_PAYEES
        .iter()
        .any(|bearer| bearer.eq_ignore_ascii_case(payee.trim()))
}

/// ABA routing number checksum: weights 3, 7, 1 repeated over nine digits.
pub fn routing_checksum_ok(routing: &str) -> bool {
    let digits: Vec<u32> = routing.chars().filter_map(|c| c.to_digit(10)).collect();
    if digits.len() != 9 || routing.chars().count() != 9 {
        return false;
    }
    let sum: u32 = digits
        .iter()
        .zip([3, 7, 1].iter().cycle())
        .map(|(digit, weight)| digit * weight)
        .sum();
    sum % 10 == 0
}

/// Physical inspection of the check: security features, MICR line and image.
pub struct CheckImageScorer;

#[async_trait]
impl Scorer for CheckImageScorer {
    async fn score(&self, request: &ScoreRequest<'_>) -> Result<Score, AgentError> {
        if request.mode == Mode::Real {
            return Err(AgentError::Execution(
                "live image analysis backend not configured".to_string(),
            ));
        }
        Ok(inspect_check(request.case))
    }
}

fn inspect_check(case: &Case) -> Score {
    let mut risk: f64 = 0.05;
    let mut findings = Vec::new();

    if !case.has_watermark {
        risk = risk.max(0.85);
        findings.push(Finding::new("watermark", "missing"));
        findings.push(flag("missing_watermark"));
        findings.push(recommendation("VERIFY check stock with the issuing bank"));
    }

    if !case.signature_present {
        risk = risk.max(0.9);
        findings.push(Finding::new("signature", "missing"));
        findings.push(flag("missing_signature"));
        findings.push(recommendation("REJECT unsigned check"));
    }

    if !routing_checksum_ok(&case.routing_number) {
        risk = risk.max(0.95);
        findings.push(Finding::new(
            "routing_number",
            format!("{} fails the ABA checksum", case.routing_number),
        ));
        findings.push(flag("invalid_routing_number"));
        findings.push(recommendation("REJECT check with invalid routing number"));
    }

    if let Some(micr) = case.micr_line.as_deref() {
        let digits: String = micr.chars().filter(|c| c.is_ascii_digit()).collect();
        if !digits.contains(&case.routing_number) || !digits.contains(&case.account_number) {
            risk = risk.max(0.9);
            findings.push(Finding::new(
                "micr",
                "MICR line does not match routing and account numbers",
            ));
            findings.push(flag("micr_mismatch"));
            findings.push(recommendation("ESCALATE possible altered MICR line"));
        }
    }

    if let Some(quality) = case.image_quality {
        if quality < 0.4 {
            risk = risk.max(0.7);
        } else if quality < LOW_IMAGE_QUALITY {
            risk = risk.max(0.5);
        }
        if quality < LOW_IMAGE_QUALITY {
            findings.push(Finding::new("image_quality", format!("{:.2}", quality)));
            findings.push(flag("low_image_quality"));
            findings.push(recommendation("REQUEST a rescan of the check image"));
        }
    }

    if let Some(written) = case.amount_written.as_deref()
        && let Some(parsed) = parse_written_amount(written)
        && parsed != case.amount.round_dp(2)
    {
        risk = risk.max(0.8);
        findings.push(Finding::new(
            "amount_mismatch",
            format!("written {} vs numeric {}", parsed, case.amount),
        ));
        findings.push(flag("amount_mismatch"));
        findings.push(recommendation("VERIFY amount with the drawer"));
    }

    Score {
        findings,
        raw_score: risk,
    }
}

/// Compares the check against the client's profile and past transactions.
pub struct HistoryScorer {
    history: HistoryStoreRef,
}

impl HistoryScorer {
    pub fn new(history: HistoryStoreRef) -> Self {
        Self { history }
    }
}

#[async_trait]
impl Scorer for HistoryScorer {
    async fn score(&self, request: &ScoreRequest<'_>) -> Result<Score, AgentError> {
        let case = request.case;
        let key = case.history_key();
        let client = self.history.client(key).await.map_err(store_failure)?;
        let Some(client) = client else {
            return Ok(Score {
                findings: vec![
                    Finding::new("client", format!("{} has no history on file", key)),
                    flag("unknown_client"),
                    recommendation("VERIFY client identity before processing"),
                ],
                raw_score: 0.5,
            });
        };
        let transactions = self.history.transactions(key).await.map_err(store_failure)?;
        let stats = HistoryStats::from_transactions(&transactions);

        let mut risk: f64 = 0.0;
        let mut findings = Vec::new();
        let amount = case.amount.to_f64().unwrap_or(0.0);

        if stats.count > 0 {
            let z = stats.z_score(amount);
            let percent_of_avg = if stats.mean > 0.0 {
                amount / stats.mean * 100.0
            } else {
                0.0
            };
            let bump = if z > 4.0 || percent_of_avg > 1000.0 {
                0.5
            } else if z > 3.0 || percent_of_avg > 500.0 {
                0.3
            } else if z > 2.0 {
                0.15
            } else {
                0.0
            };
            if bump > 0.0 {
                risk += bump;
                findings.push(Finding::new(
                    "amount_anomaly",
                    format!(
                        "{} is {:.0}% of average {:.2} (z-score {:.1})",
                        case.amount, percent_of_avg, stats.mean, z
                    ),
                ));
                findings.push(flag("unusual_amount"));
            }
        }

        let seen_before = transactions
            .iter()
            .any(|tx| tx.payee.eq_ignore_ascii_case(case.payee.trim()));
        if is_bearer(&case.payee) {
            risk += 0.25;
            findings.push(Finding::new("payee", format!("bearer payee '{}'", case.payee)));
            findings.push(flag("bearer_payee"));
        } else if !client.knows_payee(&case.payee) && !seen_before {
            risk += 0.1;
            findings.push(Finding::new("payee", format!("first check to '{}'", case.payee)));
            findings.push(flag("new_payee"));
        }

        if client.name.eq_ignore_ascii_case(case.payee.trim()) {
            risk += 0.15;
            findings.push(Finding::new("self_payee", "payee matches the account holder"));
            findings.push(flag("self_payee"));
        }

        let recent = deposits_within_day(&transactions, case.date);
        if recent > RAPID_DEPOSIT_LIMIT {
            risk += 0.2;
            findings.push(Finding::new("velocity", format!("{} deposits within 24 hours", recent)));
            findings.push(flag("high_velocity"));
        }

        let age = client.account_age_days(case.date);
        if age < NEW_ACCOUNT_DAYS {
            risk += 0.1;
            if case.amount > Decimal::from(5_000) {
                risk += 0.2;
            }
            findings.push(Finding::new("account_age", format!("{} days", age)));
            findings.push(flag("new_account"));
        }

        let risk = risk.min(1.0);
        if risk >= 0.5 {
            findings.push(recommendation("ESCALATE: activity inconsistent with client history"));
        } else if risk >= 0.3 {
            findings.push(recommendation("REVIEW recent account activity"));
        }

        Ok(Score {
            findings,
            raw_score: risk,
        })
    }
}

/// Evaluates the case's policy set against the case and the client's history.
pub struct PolicyScorer {
    policies: PolicyStoreRef,
    history: HistoryStoreRef,
}

impl PolicyScorer {
    pub fn new(policies: PolicyStoreRef, history: HistoryStoreRef) -> Self {
        Self { policies, history }
    }
}

#[async_trait]
impl Scorer for PolicyScorer {
    async fn score(&self, request: &ScoreRequest<'_>) -> Result<Score, AgentError> {
        let case = request.case;
        let rules = self
            .policies
            .policies(case.policy_set())
            .await
            .map_err(store_failure)?;
        let key = case.history_key();
        let client = self.history.client(key).await.map_err(store_failure)?;
        let transactions = self.history.transactions(key).await.map_err(store_failure)?;
        let stats = HistoryStats::from_transactions(&transactions);

        let ctx = PolicyContext {
            case,
            client: client.as_ref(),
            stats: &stats,
            recent_deposits: deposits_within_day(&transactions, case.date),
        };
        let violations = evaluate_all(&rules, &ctx);

        if violations.is_empty() {
            return Ok(Score {
                findings: vec![recommendation("APPROVE: compliant with all policies")],
                raw_score: 0.05,
            });
        }

        let count = |severity: Severity| violations.iter().filter(|v| v.severity == severity).count() as f64;
        let critical = count(Severity::Critical);
        let high = count(Severity::High);
        let medium = count(Severity::Medium);
        let rejected = violations.iter().any(|v| v.action == PolicyAction::Reject);

        let risk: f64 = if rejected || critical > 0.0 {
            0.9 + 0.02 * critical
        } else if high >= 2.0 || (high >= 1.0 && medium >= 2.0) {
            0.85 + 0.03 * high
        } else if high >= 1.0 {
            0.7
        } else if medium >= 2.0 {
            0.6
        } else {
            0.45
        };

        let mut findings: Vec<Finding> = violations
            .iter()
            .map(|v| {
                Finding::new(
                    v.policy_id.clone(),
                    format!("[{:?}] {}: {}", v.severity, v.name, v.details),
                )
            })
            .collect();
        for v in &violations {
            findings.push(flag(&format!("policy_{}", v.policy_id.to_lowercase())));
            let line = match v.action {
                PolicyAction::Reject => format!("REJECT per {} ({})", v.policy_id, v.name),
                PolicyAction::FlagSuspicious => format!("ESCALATE per {} ({})", v.policy_id, v.name),
                PolicyAction::FlagForReview => format!("REVIEW per {} ({})", v.policy_id, v.name),
            };
            findings.push(recommendation(line));
        }

        Ok(Score {
            findings,
            raw_score: risk.min(0.98),
        })
    }
}

/// Holistic pass over the three independent verdicts plus the case's own
/// red flags.
pub struct HolisticScorer;

#[async_trait]
impl Scorer for HolisticScorer {
    async fn score(&self, request: &ScoreRequest<'_>) -> Result<Score, AgentError> {
        if request.mode == Mode::Real {
            return Err(AgentError::Execution(
                "live LLM backend not configured".to_string(),
            ));
        }

        let risks: Vec<f64> = request
            .prior
            .iter()
            .filter_map(|prior| match prior.verdict {
                Verdict::Fraud => Some(prior.confidence),
                Verdict::NotFraud => Some(1.0 - prior.confidence),
                Verdict::Review => Some(0.5),
                Verdict::Abstain => None,
            })
            .collect();
        let base = if risks.is_empty() {
            0.5
        } else {
            risks.iter().sum::<f64>() / risks.len() as f64
        };

        let case = request.case;
        let device = case.device.as_deref().unwrap_or_default().to_lowercase();
        let red_flags: Vec<&str> = [
            (!case.has_watermark, "missing watermark"),
            (!case.signature_present, "missing signature"),
            (is_bearer(&case.payee), "bearer payee"),
            (
                SUSPICIOUS_DEVICES.iter().any(|marker| device.contains(marker)),
                "compromised capture device",
            ),
            (
                case.image_quality.is_some_and(|q| q < LOW_IMAGE_QUALITY),
                "poor image quality",
            ),
        ]
        .into_iter()
        .filter_map(|(raised, flag)| raised.then_some(flag))
        .collect();

        let risk = (base + 0.1 * red_flags.len() as f64).min(1.0);
        let abstained = request.prior.iter().filter(|p| p.is_abstain()).count();

        let mut findings = vec![Finding::new(
            "prior_risk",
            format!("{:.2} over {} agents", base, risks.len()),
        )];
        if abstained > 0 {
            findings.push(Finding::new("abstained", abstained.to_string()));
        }
        if !red_flags.is_empty() {
            findings.push(Finding::new("red_flags", red_flags.join(", ")));
        }
        findings.push(recommendation(if risk >= 0.7 {
            "ESCALATE to fraud investigations"
        } else if risk >= 0.35 {
            "REQUEST additional verification from the client"
        } else {
            "APPROVE for standard processing"
        }));

        Ok(Score {
            findings,
            raw_score: risk,
        })
    }
}
