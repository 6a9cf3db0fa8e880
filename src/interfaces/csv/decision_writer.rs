use crate::domain::decision::FinalDecision;
use crate::error::Result;
use std::io::Write;

/// How the decision report is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Csv,
    /// One `FinalDecision` JSON document per line.
    Json,
}

/// Writes final decisions to any `Write` sink.
pub struct DecisionWriter<W: Write> {
    sink: Sink<W>,
}

enum Sink<W: Write> {
    Csv(csv::Writer<W>),
    Json(W),
}

impl<W: Write> DecisionWriter<W> {
    pub fn new(sink: W, format: OutputFormat) -> Self {
        let sink = match format {
            OutputFormat::Csv => Sink::Csv(csv::Writer::from_writer(sink)),
            OutputFormat::Json => Sink::Json(sink),
        };
        Self { sink }
    }

    pub fn write_decisions<'a, I>(&mut self, decisions: I) -> Result<()>
    where
        I: IntoIterator<Item = &'a FinalDecision>,
    {
        match &mut self.sink {
            Sink::Csv(writer) => {
                writer.write_record([
                    "case_id",
                    "decision",
                    "risk_level",
                    "confidence",
                    "score",
                    "disagreement",
                    "consensus",
                    "abstained",
                ])?;
                for decision in decisions {
                    let abstained: Vec<&str> =
                        decision.abstained().iter().map(|agent| agent.as_str()).collect();
                    writer.write_record([
                        decision.case_id.clone(),
                        decision.decision.to_string(),
                        decision.risk_level.to_string(),
                        format!("{:.4}", decision.confidence),
                        format!("{:.4}", decision.normalized_score),
                        format!("{:.4}", decision.disagreement),
                        decision.consensus.to_string(),
                        abstained.join(";"),
                    ])?;
                }
                writer.flush()?;
            }
            Sink::Json(writer) => {
                for decision in decisions {
                    serde_json::to_writer(&mut *writer, decision)?;
                    writeln!(writer)?;
                }
                writer.flush()?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::decision::{Decision, VoteRecord};
    use crate::domain::verdict::{AgentName, RiskLevel, Verdict};
    use uuid::Uuid;

    fn decision() -> FinalDecision {
        FinalDecision {
            case_id: "CASE007".to_string(),
            run_id: Uuid::nil(),
            decision: Decision::Fraud,
            risk_level: RiskLevel::Critical,
            confidence: 0.76712,
            normalized_score: 0.69444,
            votes: vec![
                VoteRecord {
                    agent: AgentName::CheckAnalysis,
                    verdict: Verdict::Fraud,
                    weight: 1.0,
                    confidence: 0.9,
                    risk_level: RiskLevel::Critical,
                },
                VoteRecord {
                    agent: AgentName::TransactionHistory,
                    verdict: Verdict::Abstain,
                    weight: 0.0,
                    confidence: 0.0,
                    risk_level: RiskLevel::Medium,
                },
            ],
            disagreement: 0.1,
            consensus: true,
            rationale: "fraud".to_string(),
            flags: vec!["missing_watermark".to_string()],
            recommendations: vec![],
        }
    }

    #[test]
    fn test_csv_report() {
        let mut out = Vec::new();
        DecisionWriter::new(&mut out, OutputFormat::Csv)
            .write_decisions([&decision()])
            .unwrap();
        let text = String::from_utf8(out).unwrap();

        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("case_id,decision,risk_level,confidence,score,disagreement,consensus,abstained")
        );
        assert_eq!(
            lines.next(),
            Some("CASE007,fraud,critical,0.7671,0.6944,0.1000,true,transaction_history")
        );
    }

    #[test]
    fn test_json_lines_report() {
        let mut out = Vec::new();
        let first = decision();
        DecisionWriter::new(&mut out, OutputFormat::Json)
            .write_decisions([&first, &first])
            .unwrap();
        let text = String::from_utf8(out).unwrap();

        let parsed: Vec<FinalDecision> = text
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(parsed, vec![first.clone(), first]);
    }
}
