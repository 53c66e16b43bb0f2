use crate::roster::Roster;
use crate::store::Store;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CommitError {
    #[error("write to {table} failed: {message}")]
    Backend { table: String, message: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitReceipt {
    pub table: String,
    pub rows: usize,
    pub columns: usize,
    pub fingerprint: String,
}

/// Writes the whole roster back to the table it was loaded from, in a
/// single store call.
///
/// Last writer wins: whatever changed in the stored table since the roster
/// was loaded is replaced. On error the stored table is left as it was and
/// the caller still owns `roster` for a retry.
pub fn commit(store: &mut dyn Store, roster: &Roster) -> Result<CommitReceipt, CommitError> {
    let table = roster.table.as_str();
    let payload = roster.to_table();
    match store.write_table(table, &payload) {
        Ok(()) => {
            let receipt = CommitReceipt {
                table: table.to_string(),
                rows: payload.rows.len(),
                columns: payload.header.len(),
                fingerprint: payload.fingerprint(),
            };
            log::info!(
                "committed {}: {} rows, {} columns",
                table,
                receipt.rows,
                receipt.columns
            );
            Ok(receipt)
        }
        Err(e) => {
            log::error!("commit to {} failed: {:#}", table, e);
            Err(CommitError::Backend {
                table: table.to_string(),
                message: format!("{:#}", e),
            })
        }
    }
}
