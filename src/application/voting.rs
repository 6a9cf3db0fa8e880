//! Weighted-vote consensus over agent verdicts.

use super::config::VotingConfig;
use crate::domain::decision::{Decision, FinalDecision, VoteRecord};
use crate::domain::verdict::{AgentName, AgentVerdict, RiskLevel, Verdict};
use crate::error::{CheckGuardError, Result};
use std::collections::{BTreeMap, BTreeSet};
use uuid::Uuid;

/// Finding key agents use to attach a recommended action.
pub const RECOMMENDATION_KEY: &str = "recommendation";

/// Finding key agents use to raise a named red flag.
pub const FLAG_KEY: &str = "flag";

const MAX_RECOMMENDATIONS: usize = 10;

/// Running sums over the active (non-abstaining) agents.
#[derive(Default)]
struct Totals {
    weighted_sum: f64,
    active_weight: f64,
    confidence_sum: f64,
    decisive_weight: f64,
    decisive_confidence_sum: f64,
    risk_weight: f64,
    risk_rank_sum: f64,
    max_risk: Option<RiskLevel>,
}

impl Totals {
    /// Weighted mean of the risk ranks, with weight × confidence per agent.
    /// A single `Critical` forces `Critical`; no weight at all reads as
    /// `Medium`.
    fn risk_level(&self) -> RiskLevel {
        if self.max_risk == Some(RiskLevel::Critical) {
            return RiskLevel::Critical;
        }
        if self.risk_weight <= 0.0 {
            return RiskLevel::Medium;
        }
        RiskLevel::from_rank(self.risk_rank_sum / self.risk_weight)
    }
}

/// Combines verdicts into one decision.
///
/// Deterministic and free of I/O: the same verdicts and configuration always
/// produce the same decision. Agents that abstained are listed in the vote
/// breakdown with weight 0 and otherwise ignored.
pub fn aggregate(
    case_id: &str,
    run_id: Uuid,
    verdicts: &BTreeMap<AgentName, AgentVerdict>,
    config: &VotingConfig,
) -> Result<FinalDecision> {
    let mut votes = Vec::with_capacity(verdicts.len());
    let mut totals = Totals::default();

    for (agent, verdict) in verdicts {
        if verdict.agent != *agent {
            return Err(CheckGuardError::Aggregation(format!(
                "verdict from {} filed under {}",
                verdict.agent, agent
            )));
        }
        if !verdict.confidence.is_finite() {
            return Err(CheckGuardError::Aggregation(format!(
                "{} reported a non-finite confidence",
                agent
            )));
        }

        let weight = if verdict.is_abstain() {
            0.0
        } else {
            config.weights.weight(*agent)
        };
        votes.push(VoteRecord {
            agent: *agent,
            verdict: verdict.verdict,
            weight,
            confidence: verdict.confidence,
            risk_level: verdict.risk_level,
        });

        if verdict.is_abstain() {
            continue;
        }
        totals.weighted_sum += weight * verdict.verdict.score() * verdict.confidence;
        totals.active_weight += weight;
        totals.confidence_sum += weight * verdict.confidence;
        if verdict.verdict.is_decisive() {
            totals.decisive_weight += weight;
            totals.decisive_confidence_sum += weight * verdict.confidence;
        }
        totals.risk_weight += weight * verdict.confidence;
        totals.risk_rank_sum += weight * verdict.confidence * verdict.risk_level.rank();
        totals.max_risk = totals.max_risk.max(Some(verdict.risk_level));
    }

    let risk_level = totals.risk_level();
    let flags = consolidate_flags(verdicts.values());

    if totals.active_weight <= 0.0 {
        return Ok(FinalDecision {
            case_id: case_id.to_string(),
            run_id,
            decision: Decision::Review,
            risk_level,
            confidence: 0.0,
            normalized_score: 0.0,
            disagreement: 0.0,
            consensus: false,
            rationale: "No agent contributed a weighted vote; manual review required".to_string(),
            flags,
            recommendations: vec![
                "REVIEW: Manual review required - no automated analysis available".to_string(),
            ],
            votes,
        });
    }

    let normalized = totals.weighted_sum / totals.active_weight;
    if !normalized.is_finite() {
        return Err(CheckGuardError::Aggregation(
            "normalized vote is not a finite number".to_string(),
        ));
    }

    let tau = config.fraud_threshold;
    let decision = if normalized > tau {
        Decision::Fraud
    } else if normalized < -tau {
        Decision::NotFraud
    } else {
        Decision::Review
    };

    let disagreement = disagreement(&votes, normalized, totals.active_weight);
    let average_confidence = if totals.decisive_weight > 0.0 {
        totals.decisive_confidence_sum / totals.decisive_weight
    } else {
        totals.confidence_sum / totals.active_weight
    };
    let confidence = (average_confidence * (1.0 - disagreement)).clamp(0.0, 1.0);

    let active: Vec<&VoteRecord> = votes
        .iter()
        .filter(|vote| vote.verdict != Verdict::Abstain)
        .collect();
    let agreeing = active
        .iter()
        .filter(|vote| decision.matches(vote.verdict))
        .count();
    let consensus =
        !active.is_empty() && agreeing as f64 / active.len() as f64 >= config.consensus_ratio;

    Ok(FinalDecision {
        case_id: case_id.to_string(),
        run_id,
        decision,
        risk_level,
        confidence,
        normalized_score: normalized,
        rationale: summarize(decision, risk_level, normalized, confidence, disagreement, &votes),
        flags,
        recommendations: consolidate_recommendations(verdicts.values(), decision),
        disagreement,
        consensus,
        votes,
    })
}

/// Weighted variance of the confidence-scaled votes around their mean `N`.
/// Votes live in `[-1, 1]`, so the variance never exceeds 1.
fn disagreement(votes: &[VoteRecord], mean: f64, active_weight: f64) -> f64 {
    let spread: f64 = votes
        .iter()
        .filter(|vote| vote.verdict != Verdict::Abstain)
        .map(|vote| {
            let value = vote.verdict.score() * vote.confidence;
            vote.weight * (value - mean).powi(2)
        })
        .sum();
    (spread / active_weight).clamp(0.0, 1.0)
}

fn summarize(
    decision: Decision,
    risk_level: RiskLevel,
    normalized: f64,
    confidence: f64,
    disagreement: f64,
    votes: &[VoteRecord],
) -> String {
    let count = |verdict: Verdict| votes.iter().filter(|v| v.verdict == verdict).count();
    let mut summary = format!(
        "{} at {} risk (score {:.2}, confidence {:.2}, disagreement {:.2}): {} fraud, {} not fraud, {} review",
        decision.as_str().to_uppercase(),
        risk_level,
        normalized,
        confidence,
        disagreement,
        count(Verdict::Fraud),
        count(Verdict::NotFraud),
        count(Verdict::Review),
    );

    let abstained: Vec<&str> = votes
        .iter()
        .filter(|v| v.verdict == Verdict::Abstain)
        .map(|v| v.agent.as_str())
        .collect();
    if !abstained.is_empty() {
        summary.push_str(&format!("; abstained: {}", abstained.join(", ")));
    }
    summary
}

fn consolidate_flags<'a>(verdicts: impl Iterator<Item = &'a AgentVerdict>) -> Vec<String> {
    verdicts
        .flat_map(|verdict| verdict.evidence.iter())
        .filter(|finding| finding.key == FLAG_KEY)
        .map(|finding| finding.value.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

fn priority(recommendation: &str) -> u8 {
    const KEYWORDS: [&str; 7] = [
        "REJECT", "ESCALATE", "VERIFY", "REVIEW", "FLAG", "REQUEST", "APPROVE",
    ];
    let upper = recommendation.to_uppercase();
    KEYWORDS
        .iter()
        .position(|keyword| upper.contains(keyword))
        .map(|index| index as u8 + 1)
        .unwrap_or(10)
}

fn consolidate_recommendations<'a>(
    verdicts: impl Iterator<Item = &'a AgentVerdict>,
    decision: Decision,
) -> Vec<String> {
    let mut recommendations: Vec<String> = Vec::new();
    for finding in verdicts.flat_map(|verdict| verdict.evidence.iter()) {
        if finding.key == RECOMMENDATION_KEY && !recommendations.contains(&finding.value) {
            recommendations.push(finding.value.clone());
        }
    }
    recommendations.sort_by_key(|rec| priority(rec));

    let fallback = match decision {
        Decision::Fraud if !mentions(&recommendations, &["REJECT"]) => {
            Some("REJECT: Multiple fraud indicators detected")
        }
        Decision::Review if !mentions(&recommendations, &["REVIEW", "ESCALATE"]) => {
            Some("REVIEW: Manual verification required before processing")
        }
        _ => None,
    };
    if let Some(fallback) = fallback {
        recommendations.insert(0, fallback.to_string());
    }

    recommendations.truncate(MAX_RECOMMENDATIONS);
    recommendations
}

fn mentions(recommendations: &[String], keywords: &[&str]) -> bool {
    recommendations
        .iter()
        .any(|rec| keywords.iter().any(|k| rec.to_uppercase().contains(k)))
}
