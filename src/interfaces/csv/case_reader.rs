use crate::domain::case::Case;
use crate::error::{CheckGuardError, Result};
use std::io::Read;

/// Reads check cases from a CSV source.
///
/// Wraps `csv::Reader` and yields one `Result<Case>` per row, trimming
/// whitespace and tolerating short rows. Empty optional columns read as
/// `None`.
pub struct CaseReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> CaseReader<R> {
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Lazily deserializes cases so large files stream without being loaded
    /// into memory.
    pub fn cases(self) -> impl Iterator<Item = Result<Case>> {
        self.reader
            .into_deserialize()
            .map(|result| result.map_err(CheckGuardError::from))
    }
}
