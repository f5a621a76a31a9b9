use std::{collections::BTreeMap, path::PathBuf};

#[cfg(feature = "http-store")]
use luckyfive_sdk::store::HttpStore;
use luckyfive_sdk::store::{ChangeStream, Commit, DocumentStore, MemoryStore, Revision, Snapshot};
use serde_json::Value;

use crate::config::{expand_path, StoreConfig};

/// The store selected by the config.
#[derive(Debug, Clone)]
pub(crate) enum AnyStore {
    Memory(MemoryStore),
    #[cfg(feature = "http-store")]
    Http(HttpStore),
}

macro_rules! delegate {
    ($self:ident, $store:ident => $call:expr) => {
        match $self {
            AnyStore::Memory($store) => $call,
            #[cfg(feature = "http-store")]
            AnyStore::Http($store) => $call,
        }
    };
}

impl DocumentStore for AnyStore {
    async fn get(&self, path: &str) -> luckyfive_sdk::Result<Snapshot> {
        delegate!(self, store => store.get(path).await)
    }

    async fn put_if(
        &self,
        path: &str,
        expected: &Revision,
        value: Option<Value>,
    ) -> luckyfive_sdk::Result<Commit> {
        delegate!(self, store => store.put_if(path, expected, value).await)
    }

    async fn set(&self, path: &str, value: Option<Value>) -> luckyfive_sdk::Result<()> {
        delegate!(self, store => store.set(path, value).await)
    }

    async fn push(&self, path: &str, value: Value) -> luckyfive_sdk::Result<String> {
        delegate!(self, store => store.push(path, value).await)
    }

    async fn list(&self, path: &str) -> luckyfive_sdk::Result<Vec<(String, Value)>> {
        delegate!(self, store => store.list(path).await)
    }

    async fn watch(&self, path: &str) -> luckyfive_sdk::Result<ChangeStream> {
        delegate!(self, store => store.watch(path).await)
    }
}

/// An opened store, with the file it is saved to if any.
#[derive(Debug)]
pub(crate) struct OpenedStore {
    store: AnyStore,
    file: Option<PathBuf>,
}

impl OpenedStore {
    pub(crate) async fn open(config: &StoreConfig) -> eyre::Result<Self> {
        let opened = match config {
            StoreConfig::Memory => Self {
                store: AnyStore::Memory(MemoryStore::new()),
                file: None,
            },
            StoreConfig::File { path } => {
                let path = expand_path(path)?;
                let documents = match tokio::fs::read(&path).await {
                    Ok(content) => serde_json::from_slice::<BTreeMap<String, Value>>(&content)?,
                    Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                        tracing::debug!(path = %path.display(), "store file not found, starting empty");
                        BTreeMap::default()
                    }
                    Err(err) => return Err(err.into()),
                };
                tracing::debug!(path = %path.display(), documents = documents.len(), "loaded store file");
                Self {
                    store: AnyStore::Memory(MemoryStore::from_documents(documents)),
                    file: Some(path),
                }
            }
            #[cfg(feature = "http-store")]
            StoreConfig::Http { url, auth } => {
                let mut store = HttpStore::new(url)?;
                if let Some(auth) = auth {
                    store = store.with_auth(auth);
                }
                Self {
                    store: AnyStore::Http(store),
                    file: None,
                }
            }
            #[cfg(not(feature = "http-store"))]
            StoreConfig::Http { .. } => {
                eyre::bail!("the `http-store` feature is required to use an http store")
            }
        };
        Ok(opened)
    }

    pub(crate) fn store(&self) -> AnyStore {
        self.store.clone()
    }

    /// Save the documents back to the store file, if any.
    pub(crate) async fn persist(&self) -> eyre::Result<()> {
        let (Some(path), AnyStore::Memory(store)) = (&self.file, &self.store) else {
            return Ok(());
        };
        let documents = store.documents().await;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, serde_json::to_vec_pretty(&documents)?).await?;
        tracing::debug!(path = %path.display(), documents = documents.len(), "saved store file");
        Ok(())
    }
}
