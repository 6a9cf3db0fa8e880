use crate::domain::history::{ClientProfile, HistoricalTransaction};
use crate::error::{CheckGuardError, Result};
use chrono::NaiveDate;
use serde::Deserialize;
use std::io::Read;

fn reader<R: Read>(source: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(source)
}

#[derive(Deserialize)]
struct ClientRow {
    client_id: String,
    name: String,
    account_opened: NaiveDate,
    #[serde(default)]
    typical_payees: Option<String>,
}

impl From<ClientRow> for ClientProfile {
    fn from(row: ClientRow) -> Self {
        let typical_payees = row
            .typical_payees
            .unwrap_or_default()
            .split(';')
            .map(str::trim)
            .filter(|payee| !payee.is_empty())
            .map(str::to_string)
            .collect();
        ClientProfile {
            client_id: row.client_id,
            name: row.name,
            account_opened: row.account_opened,
            typical_payees,
        }
    }
}

/// Reads client profiles: `client_id,name,account_opened,typical_payees`,
/// with payees separated by `;`.
pub struct ClientReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> ClientReader<R> {
    pub fn new(source: R) -> Self {
        Self {
            reader: reader(source),
        }
    }

    pub fn clients(self) -> impl Iterator<Item = Result<ClientProfile>> {
        self.reader
            .into_deserialize::<ClientRow>()
            .map(|result| result.map(ClientProfile::from).map_err(CheckGuardError::from))
    }
}

/// Reads past transactions: `client_id,date,amount,payee`.
pub struct TransactionHistoryReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> TransactionHistoryReader<R> {
    pub fn new(source: R) -> Self {
        Self {
            reader: reader(source),
        }
    }

    pub fn transactions(self) -> impl Iterator<Item = Result<HistoricalTransaction>> {
        self.reader
            .into_deserialize()
            .map(|result| result.map_err(CheckGuardError::from))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_client_payees_split() {
        let data = "client_id,name,account_opened,typical_payees\nCLIENT001, John Smith, 2018-03-15, Electric Company; Water Utility ;\nCLIENT002, Jane Doe, 2024-01-02,";
        let clients: Vec<ClientProfile> = ClientReader::new(data.as_bytes())
            .clients()
            .collect::<Result<_>>()
            .unwrap();

        assert_eq!(clients.len(), 2);
        assert_eq!(
            clients[0].typical_payees,
            vec!["Electric Company".to_string(), "Water Utility".to_string()]
        );
        assert!(clients[1].typical_payees.is_empty());
    }

    #[test]
    fn test_transactions_read() {
        let data = "client_id,date,amount,payee\nCLIENT001, 2024-01-15, 245.50, Electric Company\nCLIENT001, bad, 1.0, Grocer";
        let results: Vec<Result<HistoricalTransaction>> =
            TransactionHistoryReader::new(data.as_bytes())
                .transactions()
                .collect();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].as_ref().unwrap().amount, dec!(245.50));
        assert!(results[1].is_err());
    }
}
