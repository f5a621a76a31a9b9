use std::future::Future;

use futures_util::stream::BoxStream;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use crate::Error;

/// In-memory store.
pub mod memory;

/// Firebase Realtime Database REST store.
#[cfg(http_store)]
pub mod http;

pub use self::memory::MemoryStore;

#[cfg(http_store)]
pub use self::http::HttpStore;

/// Maximum attempts of [`DocumentStoreExt::transaction`].
pub const MAX_TRANSACTION_ATTEMPTS: usize = 25;

/// Opaque revision of a document. Absent documents have a revision too.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Revision(String);

impl Revision {
    /// Create from the store's representation.
    pub fn new(revision: impl ToString) -> Self {
        Self(revision.to_string())
    }

    /// Returns the store's representation.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A document read.
#[derive(Debug, Clone)]
pub struct Snapshot {
    /// Revision of the document when read.
    pub revision: Revision,
    /// Document value, `None` if absent.
    pub value: Option<Value>,
}

/// Result of a conditional write.
#[derive(Debug, Clone)]
pub enum Commit {
    /// Written, with the new revision.
    Committed(Revision),
    /// The document changed since the expected revision.
    Conflict(Snapshot),
}

/// Stream of change notifications.
pub type ChangeStream = BoxStream<'static, crate::Result<()>>;

/// A shared store of JSON documents addressed by `/`-separated paths.
pub trait DocumentStore: Send + Sync {
    /// Read a document.
    fn get(&self, path: &str) -> impl Future<Output = crate::Result<Snapshot>> + Send;

    /// Write (or delete with `None`) a document if it is still at `expected`.
    fn put_if(
        &self,
        path: &str,
        expected: &Revision,
        value: Option<Value>,
    ) -> impl Future<Output = crate::Result<Commit>> + Send;

    /// Write (or delete with `None`) a document unconditionally.
    fn set(
        &self,
        path: &str,
        value: Option<Value>,
    ) -> impl Future<Output = crate::Result<()>> + Send;

    /// Append a document under `path` with a fresh, time-ordered key.
    fn push(
        &self,
        path: &str,
        value: Value,
    ) -> impl Future<Output = crate::Result<String>> + Send;

    /// List the direct children of `path`.
    fn list(
        &self,
        path: &str,
    ) -> impl Future<Output = crate::Result<Vec<(String, Value)>>> + Send;

    /// Subscribe to changes at or below `path`.
    ///
    /// Changes committed after this returns are never missed.
    fn watch(&self, path: &str) -> impl Future<Output = crate::Result<ChangeStream>> + Send;
}

/// Outcome of a transaction step.
#[derive(Debug, Clone)]
pub enum Decision<T, R> {
    /// Write the new value and return `R` once committed.
    Write(T, R),
    /// Leave the document untouched and return `R`.
    Abort(R),
}

/// Extension trait for [`DocumentStore`].
pub trait DocumentStoreExt: DocumentStore {
    /// Read and decode a document.
    fn get_as<T>(&self, path: &str) -> impl Future<Output = crate::Result<Option<T>>> + Send
    where
        T: DeserializeOwned,
    {
        async move {
            let snapshot = self.get(path).await?;
            Ok(snapshot.value.map(serde_json::from_value).transpose()?)
        }
    }

    /// Encode and write a document.
    fn set_as<T>(&self, path: &str, value: &T) -> impl Future<Output = crate::Result<()>> + Send
    where
        T: Serialize + Sync,
    {
        async move {
            let value = serde_json::to_value(value)?;
            self.set(path, Some(value)).await
        }
    }

    /// Encode and push a document.
    fn push_as<T>(
        &self,
        path: &str,
        value: &T,
    ) -> impl Future<Output = crate::Result<String>> + Send
    where
        T: Serialize + Sync,
    {
        async move {
            let value = serde_json::to_value(value)?;
            self.push(path, value).await
        }
    }

    /// List and decode the children of `path`. Malformed children are skipped.
    fn list_as<T>(
        &self,
        path: &str,
    ) -> impl Future<Output = crate::Result<Vec<(String, T)>>> + Send
    where
        T: DeserializeOwned + Send,
    {
        async move {
            let children = self.list(path).await?;
            let decoded = children
                .into_iter()
                .filter_map(|(key, value)| match serde_json::from_value(value) {
                    Ok(decoded) => Some((key, decoded)),
                    Err(err) => {
                        tracing::warn!(%path, %key, %err, "skipping malformed document");
                        None
                    }
                })
                .collect();
            Ok(decoded)
        }
    }

    /// Read-modify-write `path` with conditional writes.
    ///
    /// `f` is called with the current value and may be called again with a
    /// newer value if another writer got in first. Fails with
    /// [`Error::Contention`] after [`MAX_TRANSACTION_ATTEMPTS`] conflicts.
    fn transaction<T, R, F>(
        &self,
        path: &str,
        mut f: F,
    ) -> impl Future<Output = crate::Result<R>> + Send
    where
        T: Serialize + DeserializeOwned + Send,
        R: Send,
        F: FnMut(Option<T>) -> crate::Result<Decision<T, R>> + Send,
    {
        async move {
            let mut snapshot = self.get(path).await?;
            for attempt in 1..=MAX_TRANSACTION_ATTEMPTS {
                let current = snapshot
                    .value
                    .take()
                    .map(serde_json::from_value::<T>)
                    .transpose()?;
                let (value, output) = match f(current)? {
                    Decision::Abort(output) => return Ok(output),
                    Decision::Write(value, output) => (serde_json::to_value(&value)?, output),
                };
                match self.put_if(path, &snapshot.revision, Some(value)).await? {
                    Commit::Committed(_) => return Ok(output),
                    Commit::Conflict(latest) => {
                        tracing::debug!(%path, attempt, "write conflict, retrying");
                        snapshot = latest;
                    }
                }
            }
            Err(Error::Contention(path.to_string()))
        }
    }
}

impl<S: DocumentStore> DocumentStoreExt for S {}

/// Document paths.
pub mod paths {
    /// Player collection.
    pub const USERS: &str = "users";

    /// The current cycle.
    pub const CURRENT_CYCLE: &str = "currentCycle";

    /// Archived cycles.
    pub const CYCLE_HISTORY: &str = "cycleHistory";

    /// Winner alerts.
    pub const WINNERS: &str = "winners";

    /// Ledger submission windows.
    pub const RATE_LIMIT: &str = "rateLimit";

    /// Point deduction audit log.
    pub const POINT_DEDUCTIONS: &str = "pointDeductions";

    /// Path of a player.
    pub fn user(wallet_address: &str) -> String {
        format!("{USERS}/{wallet_address}")
    }

    /// Path of an archived cycle.
    pub fn cycle_history(cycle_number: u64) -> String {
        format!(
            "{CYCLE_HISTORY}/{}",
            luckyfive_model::cycle::cycle_key(cycle_number)
        )
    }

    /// Path of the submission window of a player.
    pub fn rate_limit(wallet_address: &str) -> String {
        format!("{RATE_LIMIT}/{wallet_address}")
    }
}
