use std::{
    collections::BTreeMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use futures_util::StreamExt;
use serde_json::Value;
use tokio::sync::{broadcast, RwLock};
use tokio_stream::wrappers::{errors::BroadcastStreamRecvError, BroadcastStream};

use super::{ChangeStream, Commit, DocumentStore, Revision, Snapshot};

const CHANGE_CHANNEL_CAPACITY: usize = 1024;

const ABSENT: u64 = 0;

#[derive(Debug)]
struct Entry {
    revision: u64,
    value: Value,
}

#[derive(Debug)]
struct Inner {
    documents: RwLock<BTreeMap<String, Entry>>,
    revision: AtomicU64,
    push_seq: AtomicU64,
    changes: broadcast::Sender<String>,
}

/// A [`DocumentStore`] held in process memory.
///
/// Clones share the same documents.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::from_documents(BTreeMap::new())
    }
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding `documents`, keyed by path.
    pub fn from_documents(documents: BTreeMap<String, Value>) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        let mut revision = ABSENT;
        let documents = documents
            .into_iter()
            .filter(|(_, value)| !value.is_null())
            .map(|(path, value)| {
                revision += 1;
                (path, Entry { revision, value })
            })
            .collect();
        Self {
            inner: Arc::new(Inner {
                documents: RwLock::new(documents),
                revision: AtomicU64::new(revision),
                push_seq: AtomicU64::new(0),
                changes,
            }),
        }
    }

    /// Copy out every document, keyed by path.
    pub async fn documents(&self) -> BTreeMap<String, Value> {
        self.inner
            .documents
            .read()
            .await
            .iter()
            .map(|(path, entry)| (path.clone(), entry.value.clone()))
            .collect()
    }

    fn next_revision(&self) -> u64 {
        self.inner.revision.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn write(
        &self,
        documents: &mut BTreeMap<String, Entry>,
        path: &str,
        value: Option<Value>,
    ) -> u64 {
        let revision = match value.filter(|value| !value.is_null()) {
            Some(value) => {
                let revision = self.next_revision();
                documents.insert(path.to_string(), Entry { revision, value });
                revision
            }
            None => {
                documents.remove(path);
                ABSENT
            }
        };
        // No receivers is fine.
        _ = self.inner.changes.send(path.to_string());
        revision
    }
}

fn normalize(path: &str) -> &str {
    path.trim_matches('/')
}

fn is_related(watched: &str, changed: &str) -> bool {
    watched.is_empty()
        || changed == watched
        || changed
            .strip_prefix(watched)
            .is_some_and(|rest| rest.starts_with('/'))
        || watched
            .strip_prefix(changed)
            .is_some_and(|rest| rest.starts_with('/'))
}

impl DocumentStore for MemoryStore {
    async fn get(&self, path: &str) -> crate::Result<Snapshot> {
        let path = normalize(path);
        let documents = self.inner.documents.read().await;
        let snapshot = match documents.get(path) {
            Some(entry) => Snapshot {
                revision: Revision::new(entry.revision),
                value: Some(entry.value.clone()),
            },
            None => Snapshot {
                revision: Revision::new(ABSENT),
                value: None,
            },
        };
        Ok(snapshot)
    }

    async fn put_if(
        &self,
        path: &str,
        expected: &Revision,
        value: Option<Value>,
    ) -> crate::Result<Commit> {
        let path = normalize(path);
        let mut documents = self.inner.documents.write().await;
        let current = documents.get(path).map_or(ABSENT, |entry| entry.revision);
        if Revision::new(current) != *expected {
            tracing::debug!(%path, %current, expected = expected.as_str(), "revision mismatch");
            return Ok(Commit::Conflict(Snapshot {
                revision: Revision::new(current),
                value: documents.get(path).map(|entry| entry.value.clone()),
            }));
        }
        let revision = self.write(&mut documents, path, value);
        Ok(Commit::Committed(Revision::new(revision)))
    }

    async fn set(&self, path: &str, value: Option<Value>) -> crate::Result<()> {
        let path = normalize(path);
        let mut documents = self.inner.documents.write().await;
        self.write(&mut documents, path, value);
        Ok(())
    }

    async fn push(&self, path: &str, value: Value) -> crate::Result<String> {
        let seq = self.inner.push_seq.fetch_add(1, Ordering::SeqCst);
        let key = format!("m{seq:012}");
        let child = format!("{}/{key}", normalize(path));
        let mut documents = self.inner.documents.write().await;
        self.write(&mut documents, &child, Some(value));
        Ok(key)
    }

    async fn list(&self, path: &str) -> crate::Result<Vec<(String, Value)>> {
        let prefix = format!("{}/", normalize(path));
        let documents = self.inner.documents.read().await;
        let children = documents
            .range(prefix.clone()..)
            .take_while(|(key, _)| key.starts_with(&prefix))
            .filter_map(|(key, entry)| {
                let child = &key[prefix.len()..];
                (!child.contains('/')).then(|| (child.to_string(), entry.value.clone()))
            })
            .collect();
        Ok(children)
    }

    async fn watch(&self, path: &str) -> crate::Result<ChangeStream> {
        let watched = normalize(path).to_string();
        let receiver = self.inner.changes.subscribe();
        let stream = BroadcastStream::new(receiver).filter_map(move |change| {
            let notify = match change {
                Ok(changed) => is_related(&watched, &changed),
                // Missed some changes, one notification covers them all.
                Err(BroadcastStreamRecvError::Lagged(_)) => true,
            };
            futures_util::future::ready(notify.then_some(Ok(())))
        });
        Ok(stream.boxed())
    }
}
