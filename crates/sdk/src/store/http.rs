//! Firebase Realtime Database REST store.

use std::{sync::Arc, time::Duration};

use backon::{DefaultSleeper, Sleeper};
use eventsource_stream::Eventsource;
use futures_util::StreamExt;
use reqwest::{header, RequestBuilder, Response, StatusCode};
use serde_json::Value;
use url::Url;

use super::{ChangeStream, Commit, DocumentStore, Revision, Snapshot};

const ETAG_REQUEST_HEADER: &str = "X-Firebase-ETag";

const NULL_ETAG: &str = "null_etag";

/// A [`DocumentStore`] backed by the Firebase Realtime Database REST API.
#[derive(Debug, Clone)]
pub struct HttpStore {
    client: Arc<reqwest::Client>,
    base: Url,
    auth: Option<String>,
    // Use backon::DefaultSleeper for cross-platform sleep.
    sleeper: DefaultSleeper,
}

impl HttpStore {
    /// Create a store for the database at `url` with the default reqwest client.
    pub fn new(url: &str) -> crate::Result<Self> {
        Self::new_with_client(url, Default::default())
    }

    /// Create a store for the database at `url`.
    pub fn new_with_client(url: &str, client: reqwest::Client) -> crate::Result<Self> {
        let mut base = Url::parse(url)?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Ok(Self {
            client: Arc::new(client),
            base,
            auth: None,
            sleeper: DefaultSleeper::default(),
        })
    }

    /// Authenticate requests with a database secret or ID token.
    pub fn with_auth(mut self, auth: impl ToString) -> Self {
        self.auth = Some(auth.to_string());
        self
    }

    fn url(&self, path: &str) -> crate::Result<Url> {
        let path = path.trim_matches('/');
        let mut url = self.base.join(&format!("{path}.json"))?;
        if let Some(auth) = &self.auth {
            url.query_pairs_mut().append_pair("auth", auth);
        }
        Ok(url)
    }

    async fn execute(&self, build: impl Fn() -> RequestBuilder) -> crate::Result<Response> {
        let mut too_many_requests_retries = 5;
        loop {
            let response = build().send().await?;
            if response.status() == StatusCode::TOO_MANY_REQUESTS
                && too_many_requests_retries > 0
            {
                let mut duration = Duration::from_millis(500);
                if let Some(retry_after) = response.headers().get(header::RETRY_AFTER) {
                    if let Ok(retry_after) = retry_after.to_str() {
                        if let Ok(retry_after) = retry_after.parse::<u64>() {
                            if retry_after < 120 {
                                duration = Duration::from_secs(retry_after);
                            }
                        }
                    }
                }

                too_many_requests_retries -= 1;
                tracing::debug!(
                    "Too many requests: server responded with {:?}, {} retries left, pausing for {:?}",
                    response.status(),
                    too_many_requests_retries,
                    duration
                );

                self.sleeper.sleep(duration).await;
                continue;
            }
            return Ok(response);
        }
    }

    fn revision_of(response: &Response) -> Revision {
        let etag = response
            .headers()
            .get(header::ETAG)
            .and_then(|etag| etag.to_str().ok())
            .unwrap_or(NULL_ETAG);
        Revision::new(etag)
    }

    async fn snapshot_of(response: Response) -> crate::Result<Snapshot> {
        let revision = Self::revision_of(&response);
        let value = response.json::<Value>().await?;
        Ok(Snapshot {
            revision,
            value: (!value.is_null()).then_some(value),
        })
    }
}

impl DocumentStore for HttpStore {
    async fn get(&self, path: &str) -> crate::Result<Snapshot> {
        let url = self.url(path)?;
        tracing::debug!(%path, "get");
        let response = self
            .execute(|| {
                self.client
                    .get(url.clone())
                    .header(ETAG_REQUEST_HEADER, "true")
            })
            .await?
            .error_for_status()?;
        Self::snapshot_of(response).await
    }

    async fn put_if(
        &self,
        path: &str,
        expected: &Revision,
        value: Option<Value>,
    ) -> crate::Result<Commit> {
        let url = self.url(path)?;
        tracing::debug!(%path, expected = expected.as_str(), "conditional write");
        let response = self
            .execute(|| {
                let request = match &value {
                    Some(value) => self.client.put(url.clone()).json(value),
                    None => self.client.delete(url.clone()),
                };
                request
                    .header(ETAG_REQUEST_HEADER, "true")
                    .header(header::IF_MATCH, expected.as_str())
            })
            .await?;
        if response.status() == StatusCode::PRECONDITION_FAILED {
            return Ok(Commit::Conflict(Self::snapshot_of(response).await?));
        }
        let response = response.error_for_status()?;
        Ok(Commit::Committed(Self::revision_of(&response)))
    }

    async fn set(&self, path: &str, value: Option<Value>) -> crate::Result<()> {
        let url = self.url(path)?;
        tracing::debug!(%path, "write");
        self.execute(|| match &value {
            Some(value) => self.client.put(url.clone()).json(value),
            None => self.client.delete(url.clone()),
        })
        .await?
        .error_for_status()?;
        Ok(())
    }

    async fn push(&self, path: &str, value: Value) -> crate::Result<String> {
        #[derive(serde::Deserialize)]
        struct Pushed {
            name: String,
        }

        let url = self.url(path)?;
        tracing::debug!(%path, "push");
        let pushed = self
            .execute(|| self.client.post(url.clone()).json(&value))
            .await?
            .error_for_status()?
            .json::<Pushed>()
            .await?;
        Ok(pushed.name)
    }

    async fn list(&self, path: &str) -> crate::Result<Vec<(String, Value)>> {
        let snapshot = self.get(path).await?;
        let children = match snapshot.value {
            None => Vec::new(),
            Some(Value::Object(map)) => map.into_iter().collect(),
            // Integer-like keys come back as arrays.
            Some(Value::Array(items)) => items
                .into_iter()
                .enumerate()
                .filter(|(_, value)| !value.is_null())
                .map(|(idx, value)| (idx.to_string(), value))
                .collect(),
            Some(other) => {
                return Err(crate::Error::store(format!(
                    "`{path}` is not a collection: {other}"
                )))
            }
        };
        Ok(children)
    }

    async fn watch(&self, path: &str) -> crate::Result<ChangeStream> {
        let url = self.url(path)?;
        let path = path.to_string();
        let response = self
            .execute(|| {
                self.client
                    .get(url.clone())
                    .header(header::ACCEPT, "text/event-stream")
            })
            .await?
            .error_for_status()?;
        tracing::debug!(%path, "listening");
        let mut events = response.bytes_stream().eventsource();
        let stream = async_stream::try_stream! {
            while let Some(event) = events.next().await {
                let event = event.map_err(crate::Error::store)?;
                match event.event.as_str() {
                    // The first `put` carries the current value.
                    "put" | "patch" => yield (),
                    "keep-alive" => {}
                    "cancel" => {
                        Err::<(), _>(crate::Error::store(format!(
                            "`{path}` listener cancelled: {}",
                            event.data
                        )))?;
                    }
                    "auth_revoked" => {
                        Err::<(), _>(crate::Error::store(format!(
                            "`{path}` listener auth revoked"
                        )))?;
                    }
                    other => {
                        tracing::debug!(%path, event = %other, "ignored event");
                    }
                }
            }
        };
        Ok(stream.boxed())
    }
}
