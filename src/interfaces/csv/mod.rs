//! CSV adapters for cases, client history and the decision report.

pub mod case_reader;
pub mod decision_writer;
pub mod history_reader;
