use checkguard::application::config::{AgentWeights, VotingConfig};
use checkguard::application::voting::aggregate;
use checkguard::domain::decision::Decision;
use checkguard::domain::verdict::{AgentName, AgentVerdict, Verdict};
use rand::Rng;
use std::collections::BTreeMap;
use uuid::Uuid;

fn verdicts(entries: [(AgentName, Verdict, f64); 4]) -> BTreeMap<AgentName, AgentVerdict> {
    entries
        .into_iter()
        .map(|(agent, verdict, confidence)| {
            let verdict = if verdict == Verdict::Abstain {
                AgentVerdict::abstain(agent, "timed out")
            } else {
                AgentVerdict::new(agent, verdict, confidence, "", vec![])
            };
            (agent, verdict)
        })
        .collect()
}

#[test]
fn test_normalized_vote_equal_to_threshold_is_review() {
    // Two full-confidence FRAUD votes and two REVIEW votes: N = 2 / 4 = τ
    let config = VotingConfig {
        weights: AgentWeights {
            generic_fraud: 1.0,
            ..Default::default()
        },
        ..Default::default()
    };
    let decision = aggregate(
        "CASE001",
        Uuid::new_v4(),
        &verdicts([
            (AgentName::CheckAnalysis, Verdict::Fraud, 1.0),
            (AgentName::TransactionHistory, Verdict::Fraud, 1.0),
            (AgentName::PolicyAnalysis, Verdict::Review, 0.6),
            (AgentName::GenericFraud, Verdict::Review, 0.6),
        ]),
        &config,
    )
    .unwrap();

    assert_eq!(decision.normalized_score, 0.5);
    assert_eq!(decision.decision, Decision::Review);
}

#[test]
fn test_single_active_agent_decides_alone() {
    let decision = aggregate(
        "CASE001",
        Uuid::new_v4(),
        &verdicts([
            (AgentName::CheckAnalysis, Verdict::Abstain, 0.0),
            (AgentName::TransactionHistory, Verdict::Abstain, 0.0),
            (AgentName::PolicyAnalysis, Verdict::NotFraud, 0.8),
            (AgentName::GenericFraud, Verdict::Abstain, 0.0),
        ]),
        &VotingConfig::default(),
    )
    .unwrap();

    assert_eq!(decision.decision, Decision::NotFraud);
    assert_eq!(decision.disagreement, 0.0);
    assert!((decision.confidence - 0.8).abs() < 1e-12);
    assert!(decision.consensus);
    assert_eq!(decision.abstained().len(), 3);
}

#[test]
fn test_all_weights_zero_is_review() {
    let config = VotingConfig {
        weights: AgentWeights {
            check_analysis: 0.0,
            transaction_history: 0.0,
            policy_analysis: 0.0,
            generic_fraud: 0.0,
        },
        ..Default::default()
    };
    let decision = aggregate(
        "CASE001",
        Uuid::new_v4(),
        &verdicts([
            (AgentName::CheckAnalysis, Verdict::Fraud, 0.99),
            (AgentName::TransactionHistory, Verdict::Fraud, 0.99),
            (AgentName::PolicyAnalysis, Verdict::Fraud, 0.99),
            (AgentName::GenericFraud, Verdict::Fraud, 0.99),
        ]),
        &config,
    )
    .unwrap();

    assert_eq!(decision.decision, Decision::Review);
    assert_eq!(decision.confidence, 0.0);
}

#[test]
fn test_maximal_split_disagreement_is_bounded() {
    let decision = aggregate(
        "CASE001",
        Uuid::new_v4(),
        &verdicts([
            (AgentName::CheckAnalysis, Verdict::Fraud, 1.0),
            (AgentName::TransactionHistory, Verdict::NotFraud, 1.0),
            (AgentName::PolicyAnalysis, Verdict::Fraud, 1.0),
            (AgentName::GenericFraud, Verdict::NotFraud, 1.0),
        ]),
        &VotingConfig {
            weights: AgentWeights {
                generic_fraud: 1.0,
                ..Default::default()
            },
            ..Default::default()
        },
    )
    .unwrap();

    assert_eq!(decision.normalized_score, 0.0);
    assert_eq!(decision.disagreement, 1.0);
    assert_eq!(decision.confidence, 0.0);
    assert_eq!(decision.decision, Decision::Review);
    assert!(!decision.consensus);
}

#[test]
fn test_aggregate_is_deterministic_for_random_weights() {
    let mut rng = rand::thread_rng();
    let kinds = [
        Verdict::Fraud,
        Verdict::NotFraud,
        Verdict::Review,
        Verdict::Abstain,
    ];

    for _ in 0..500 {
        let config = VotingConfig {
            weights: AgentWeights {
                check_analysis: rng.gen_range(0.0..3.0),
                transaction_history: rng.gen_range(0.0..3.0),
                policy_analysis: rng.gen_range(0.0..3.0),
                generic_fraud: rng.gen_range(0.0..3.0),
            },
            fraud_threshold: rng.gen_range(0.05..0.95),
            consensus_ratio: rng.gen_range(0.1..=1.0),
        };
        let ballot = verdicts(
            AgentName::ALL.map(|agent| (agent, kinds[rng.gen_range(0..4)], rng.gen_range(0.0..=1.0))),
        );
        let run_id = Uuid::new_v4();

        let first = aggregate("CASE001", run_id, &ballot, &config).unwrap();
        let second = aggregate("CASE001", run_id, &ballot.clone(), &config).unwrap();

        assert_eq!(first, second);
        assert!((0.0..=1.0).contains(&first.confidence));
        assert!((0.0..=1.0).contains(&first.disagreement));
        assert!((-1.0..=1.0).contains(&first.normalized_score));
    }
}
