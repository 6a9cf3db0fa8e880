//! Domain model: cases, verdicts, decisions, workflow runs and the ports the
//! application layer talks to.

pub mod case;
pub mod decision;
pub mod history;
pub mod policy;
pub mod ports;
pub mod run;
pub mod verdict;
