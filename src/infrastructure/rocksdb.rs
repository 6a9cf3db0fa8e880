use crate::domain::decision::FinalDecision;
use crate::domain::ports::RunArchive;
use crate::error::{CheckGuardError, Result};
use async_trait::async_trait;
use rocksdb::{ColumnFamilyDescriptor, DB, Options};
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;

/// Column Family holding archived decisions, keyed by run id.
pub const CF_DECISIONS: &str = "decisions";

/// A persistent decision archive backed by RocksDB.
///
/// Decisions are stored as JSON under the 16 raw bytes of their run id.
/// `Clone` shares the underlying `Arc<DB>`.
#[derive(Clone)]
pub struct RocksDbRunArchive {
    db: Arc<DB>,
}

impl RocksDbRunArchive {
    /// Opens or creates a RocksDB instance at the specified path.
    ///
    /// # Arguments
    ///
    /// * `path` - The filesystem path where the database will be stored.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_decisions = ColumnFamilyDescriptor::new(CF_DECISIONS, Options::default());
        let db = DB::open_cf_descriptors(&opts, path, vec![cf_decisions])?;

        Ok(Self { db: Arc::new(db) })
    }

    fn decisions_cf(&self) -> Result<&rocksdb::ColumnFamily> {
        self.db.cf_handle(CF_DECISIONS).ok_or_else(|| {
            CheckGuardError::InternalError(Box::new(std::io::Error::other(
                "Decisions column family not found",
            )))
        })
    }
}

#[async_trait]
impl RunArchive for RocksDbRunArchive {
    async fn archive(&self, decision: &FinalDecision) -> Result<()> {
        let cf = self.decisions_cf()?;
        let key = decision.run_id.as_bytes();
        if self.db.get_cf(cf, key)?.is_some() {
            return Err(CheckGuardError::InvariantViolation(format!(
                "run {} already archived",
                decision.run_id
            )));
        }

        let value = serde_json::to_vec(decision)?;
        self.db.put_cf(cf, key, value)?;
        Ok(())
    }

    async fn get(&self, run_id: Uuid) -> Result<Option<FinalDecision>> {
        let cf = self.decisions_cf()?;
        match self.db.get_cf(cf, run_id.as_bytes())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn for_case(&self, case_id: &str) -> Result<Vec<FinalDecision>> {
        let cf = self.decisions_cf()?;
        let mut decisions = Vec::new();

        for item in self.db.iterator_cf(cf, rocksdb::IteratorMode::Start) {
            let (_key, value) = item?;
            let decision: FinalDecision = serde_json::from_slice(&value)?;
            if decision.case_id == case_id {
                decisions.push(decision);
            }
        }

        Ok(decisions)
    }
}
