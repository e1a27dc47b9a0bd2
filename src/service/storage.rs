//! # Transaction Storage
//!
//! Persistence seam for processed transactions. The server takes any
//! [`TransactionStore`]; the in-memory implementation backs tests and the
//! simulator binaries.

use std::sync::Mutex;

use tracing::debug;

use crate::error::{ProtocolError, Result};
use crate::protocol::transaction::Transaction;

/// Sink for finalized transactions. Implementations must be safe to share
/// across worker tasks.
pub trait TransactionStore: Send + Sync {
    /// Persist one transaction. Called exactly once per successfully
    /// processed packet, after its status is final.
    fn save(&self, transaction: &Transaction) -> Result<()>;
}

/// Keeps every saved transaction in a `Vec` behind a mutex.
#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<Vec<Transaction>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records
            .lock()
            .map(|records| records.len())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Clones the current contents. Test and reporting helper.
    pub fn snapshot(&self) -> Vec<Transaction> {
        self.records
            .lock()
            .map(|records| records.clone())
            .unwrap_or_default()
    }
}

impl TransactionStore for MemoryStore {
    fn save(&self, transaction: &Transaction) -> Result<()> {
        let mut records = self
            .records
            .lock()
            .map_err(|_| ProtocolError::StorageError("store mutex poisoned".into()))?;
        records.push(transaction.clone());
        debug!(
            transaction = %transaction.transaction_id,
            total = records.len(),
            "transaction persisted"
        );
        Ok(())
    }
}
