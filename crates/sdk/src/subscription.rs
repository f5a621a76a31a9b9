use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};

use futures_util::{
    stream::{self, BoxStream},
    Stream, StreamExt,
};

use crate::{store::DocumentStore, Client};

/// A push feed.
///
/// Yields the current value first and a fresh value after every committed
/// change of the documents it depends on. Dropping it or calling
/// [`Subscription::unsubscribe`] cancels it.
pub struct Subscription<T> {
    inner: BoxStream<'static, crate::Result<T>>,
}

impl<T> Subscription<T> {
    pub(crate) fn new(stream: impl Stream<Item = crate::Result<T>> + Send + 'static) -> Self {
        Self {
            inner: stream.boxed(),
        }
    }

    /// Wait for the next value.
    pub async fn next(&mut self) -> Option<crate::Result<T>> {
        self.inner.next().await
    }

    /// Cancel the subscription.
    pub fn unsubscribe(self) {}
}

impl<T> std::fmt::Debug for Subscription<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").finish_non_exhaustive()
    }
}

impl<T> Stream for Subscription<T> {
    type Item = crate::Result<T>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.poll_next_unpin(cx)
    }
}

/// A feed recomputed with `compute` whenever a document under `paths` changes.
pub(crate) fn projected<S, T, F, Fut>(
    client: Client<S>,
    paths: Vec<String>,
    compute: F,
) -> Subscription<T>
where
    S: DocumentStore + 'static,
    T: Send + 'static,
    F: Fn(Client<S>) -> Fut + Send + 'static,
    Fut: Future<Output = crate::Result<T>> + Send,
{
    let stream = async_stream::try_stream! {
        let mut watches = Vec::with_capacity(paths.len());
        for path in &paths {
            watches.push(client.store().watch(path).await?);
        }
        let mut changes = stream::select_all(watches);
        yield compute(client.clone()).await?;
        while let Some(change) = changes.next().await {
            change?;
            yield compute(client.clone()).await?;
        }
    };
    Subscription::new(stream)
}
