use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use luckyfive_sdk::{
    clock::ManualClock,
    model::Player,
    ops::PlayerOps,
    store::{ChangeStream, Commit, DocumentStore, MemoryStore, Revision, Snapshot},
    wallet::WalletProvider,
    Client, ClientOptions, Subscription,
};
use serde_json::Value;
use time::{macros::datetime, OffsetDateTime};

/// Start of every test.
pub(crate) const T0: OffsetDateTime = datetime!(2024-05-10 12:00 UTC);

/// Default cycle duration plus one second.
pub(crate) const PAST_CYCLE_END: Duration = Duration::from_secs(4 * 60 * 60 + 1);

const FEED_TIMEOUT: Duration = Duration::from_secs(5);

fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub(crate) struct Harness<S = MemoryStore> {
    pub(crate) clock: ManualClock,
    pub(crate) store: S,
    pub(crate) client: Client<S>,
    seq: AtomicU64,
}

impl Harness {
    pub(crate) fn new() -> Self {
        Self::with_options(ClientOptions::default())
    }

    pub(crate) fn with_options(options: ClientOptions) -> Self {
        Self::with_store(MemoryStore::new(), options)
    }
}

impl Harness<FaultyStore> {
    /// A harness whose store can be told to fail writes.
    pub(crate) fn faulty() -> Self {
        Self::with_store(FaultyStore::default(), ClientOptions::default())
    }
}

impl<S: DocumentStore + Clone> Harness<S> {
    fn with_store(store: S, options: ClientOptions) -> Self {
        init_tracing();
        let clock = ManualClock::new(T0);
        let client = Client::new_with_options(store.clone(), options).with_clock(clock.clone());
        Self {
            clock,
            store,
            client,
            seq: AtomicU64::new(1),
        }
    }

    fn next_seq(&self) -> u64 {
        self.seq.fetch_add(1, Ordering::Relaxed)
    }

    /// A fresh valid game wallet address.
    pub(crate) fn wallet(&self) -> String {
        let digits = format!("{:021}", self.next_seq()).replace('0', "z");
        format!("rTest{digits}")
    }

    /// A fresh valid payment address.
    pub(crate) fn eth(&self) -> String {
        format!("0x{:040x}", self.next_seq())
    }

    /// Register a player with a fresh wallet.
    pub(crate) async fn player(&self, username: &str) -> eyre::Result<Player> {
        let wallet = self.wallet();
        Ok(self.client.register_player(username, &wallet).await?)
    }

    pub(crate) fn advance(&self, duration: Duration) {
        self.clock.advance(duration);
    }
}

/// A [`MemoryStore`] failing the next writes below chosen paths.
#[derive(Debug, Clone, Default)]
pub(crate) struct FaultyStore {
    inner: MemoryStore,
    faults: Arc<Mutex<Vec<(String, usize)>>>,
}

impl FaultyStore {
    /// Fail the next `times` writes to documents below `prefix`.
    pub(crate) fn fail_writes(&self, prefix: &str, times: usize) {
        self.faults
            .lock()
            .unwrap()
            .push((prefix.to_string(), times));
    }

    fn check_write(&self, path: &str) -> luckyfive_sdk::Result<()> {
        let mut faults = self.faults.lock().unwrap();
        let fault = faults
            .iter_mut()
            .find(|(prefix, times)| *times > 0 && path.starts_with(prefix.as_str()));
        match fault {
            Some((_, times)) => {
                *times -= 1;
                Err(luckyfive_sdk::Error::store("network error"))
            }
            None => Ok(()),
        }
    }
}

impl DocumentStore for FaultyStore {
    async fn get(&self, path: &str) -> luckyfive_sdk::Result<Snapshot> {
        self.inner.get(path).await
    }

    async fn put_if(
        &self,
        path: &str,
        expected: &Revision,
        value: Option<Value>,
    ) -> luckyfive_sdk::Result<Commit> {
        self.check_write(path)?;
        self.inner.put_if(path, expected, value).await
    }

    async fn set(&self, path: &str, value: Option<Value>) -> luckyfive_sdk::Result<()> {
        self.check_write(path)?;
        self.inner.set(path, value).await
    }

    async fn push(&self, path: &str, value: Value) -> luckyfive_sdk::Result<String> {
        self.check_write(path)?;
        self.inner.push(path, value).await
    }

    async fn list(&self, path: &str) -> luckyfive_sdk::Result<Vec<(String, Value)>> {
        self.inner.list(path).await
    }

    async fn watch(&self, path: &str) -> luckyfive_sdk::Result<ChangeStream> {
        self.inner.watch(path).await
    }
}

/// Wait for a feed value matching `pred`.
pub(crate) async fn next_matching<T>(
    subscription: &mut Subscription<T>,
    mut pred: impl FnMut(&T) -> bool,
) -> eyre::Result<T> {
    let found = tokio::time::timeout(FEED_TIMEOUT, async {
        while let Some(value) = subscription.next().await {
            let value = value?;
            if pred(&value) {
                return Ok(value);
            }
        }
        eyre::bail!("feed ended")
    })
    .await??;
    Ok(found)
}

/// A wallet that always pays, or always refuses.
#[derive(Debug, Default)]
pub(crate) struct TestWallet {
    pub(crate) refuse: bool,
    payments: AtomicU64,
}

impl TestWallet {
    pub(crate) fn refusing() -> Self {
        Self {
            refuse: true,
            ..Default::default()
        }
    }

    pub(crate) fn payments(&self) -> u64 {
        self.payments.load(Ordering::Relaxed)
    }
}

impl WalletProvider for TestWallet {
    async fn pay(&self, amount: &str, receiver: &str) -> luckyfive_sdk::Result<String> {
        if self.refuse {
            return Err(luckyfive_sdk::Error::custom("user rejected the request"));
        }
        assert_eq!(amount, "0.003");
        assert!(receiver.starts_with("0x"));
        let n = self.payments.fetch_add(1, Ordering::Relaxed) + 1;
        Ok(format!("0x{n:064x}"))
    }
}
