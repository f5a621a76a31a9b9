use std::sync::Arc;

use time::OffsetDateTime;

use crate::{
    clock::{Clock, SystemClock},
    game::GameSession,
    guard::{Guard, GuardStorage},
    options::ClientOptions,
    store::DocumentStore,
};

/// LuckyFive client.
pub struct Client<S> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
    options: Arc<ClientOptions>,
}

impl<S> Clone for Client<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            clock: self.clock.clone(),
            options: self.options.clone(),
        }
    }
}

impl<S> std::fmt::Debug for Client<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl<S: DocumentStore> Client<S> {
    /// Create a client with default options.
    pub fn new(store: S) -> Self {
        Self::new_with_options(store, ClientOptions::default())
    }

    /// Create a client with options.
    pub fn new_with_options(store: S, options: ClientOptions) -> Self {
        Self {
            store: Arc::new(store),
            clock: Arc::new(SystemClock),
            options: Arc::new(options),
        }
    }

    /// Replace the clock.
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Get the store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Get the options.
    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    /// Get the clock.
    pub fn clock(&self) -> Arc<dyn Clock> {
        self.clock.clone()
    }

    /// Current time.
    pub fn now(&self) -> OffsetDateTime {
        self.clock.now()
    }

    /// Create a guard sharing this client's clock and options.
    pub fn guard<G: GuardStorage>(&self, storage: G) -> Guard<G> {
        Guard::new(self.clock.clone(), storage, self.options.guard.clone())
    }

    /// Start a game session for `wallet_address`, paying from `chain_address`.
    pub fn game_session<G: GuardStorage>(
        &self,
        wallet_address: &str,
        chain_address: &str,
        storage: G,
    ) -> crate::Result<GameSession<S, G>> {
        GameSession::new(self.clone(), wallet_address, chain_address, self.guard(storage))
    }
}
