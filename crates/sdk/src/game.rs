use std::time::Duration;

use luckyfive_model::{
    scoring::{MAX_NUMBER, MIN_NUMBER, NUMBERS_PER_GAME},
    validation::{normalize_payment_address, parse_number, validate_wallet_address},
    ActionClass, PaymentRecord, Selection,
};

use crate::{
    guard::{Guard, GuardStorage},
    ops::{Award, CycleOps, LedgerOps, PaymentOps, PlayerOps},
    store::DocumentStore,
    wallet::WalletProvider,
    Client, Error,
};

/// State of a [`GameSession`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// No valid payment known for the current cycle.
    Unpaid,
    /// Paid, no game running.
    Ready {
        /// The paid cycle.
        cycle_number: u64,
    },
    /// A game is running.
    Playing {
        /// Cycle the game started in.
        cycle_number: u64,
        /// Numbers selected so far.
        selected: Vec<u8>,
    },
}

/// Result of a submitted game.
#[derive(Debug, Clone)]
pub struct GameOutcome {
    /// Numbers chosen by the player.
    pub user_numbers: Vec<u8>,
    /// Numbers drawn by the system.
    pub system_numbers: Vec<u8>,
    /// Matched numbers.
    pub matches: usize,
    /// Points earned.
    pub points: u64,
    /// The ledger award.
    pub award: Award,
}

#[derive(Debug)]
struct ActiveGame {
    cycle_number: u64,
    system_numbers: Vec<u8>,
    selection: Selection,
}

/// The game flow of one player.
#[derive(Debug)]
pub struct GameSession<S, G> {
    client: Client<S>,
    guard: Guard<G>,
    wallet_address: String,
    chain_address: String,
    paid_cycle: Option<u64>,
    game: Option<ActiveGame>,
}

fn draw_system_numbers() -> Vec<u8> {
    let mut rng = rand::thread_rng();
    rand::seq::index::sample(&mut rng, usize::from(MAX_NUMBER), NUMBERS_PER_GAME)
        .into_iter()
        .map(|idx| idx as u8 + MIN_NUMBER)
        .collect()
}

impl<S: DocumentStore, G: GuardStorage> GameSession<S, G> {
    pub(crate) fn new(
        client: Client<S>,
        wallet_address: &str,
        chain_address: &str,
        guard: Guard<G>,
    ) -> crate::Result<Self> {
        let wallet_address = validate_wallet_address(wallet_address)?.to_string();
        let chain_address = normalize_payment_address(chain_address)?;
        Ok(Self {
            client,
            guard,
            wallet_address,
            chain_address,
            paid_cycle: None,
            game: None,
        })
    }

    /// Game wallet address.
    pub fn wallet_address(&self) -> &str {
        &self.wallet_address
    }

    /// Normalized payment address.
    pub fn chain_address(&self) -> &str {
        &self.chain_address
    }

    /// Get the guard.
    pub fn guard(&self) -> &Guard<G> {
        &self.guard
    }

    /// Current state.
    pub fn state(&self) -> SessionState {
        match (&self.game, self.paid_cycle) {
            (Some(game), _) => SessionState::Playing {
                cycle_number: game.cycle_number,
                selected: game.selection.numbers().to_vec(),
            },
            (None, Some(cycle_number)) => SessionState::Ready { cycle_number },
            (None, None) => SessionState::Unpaid,
        }
    }

    /// Remaining cooldown of `class`.
    pub fn remaining_cooldown(&self, class: ActionClass) -> Option<Duration> {
        self.guard.remaining_cooldown(class)
    }

    /// Look up a payment for the current cycle.
    pub async fn refresh_payment(&mut self) -> crate::Result<bool> {
        let cycle = self.client.current_cycle().await?;
        let paid = self
            .client
            .has_valid_payment(&self.chain_address, cycle.cycle_number)
            .await?;
        self.paid_cycle = paid.then_some(cycle.cycle_number);
        Ok(paid)
    }

    /// Pay the entry through `wallet`.
    pub async fn pay<W: WalletProvider>(&mut self, wallet: W) -> crate::Result<PaymentRecord> {
        self.paid_cycle = None;
        let record = self
            .client
            .pay_and_verify(&self.wallet_address, &self.chain_address, wallet)
            .await?;
        self.paid_cycle = Some(record.cycle_number);
        Ok(record)
    }

    /// Start a game with freshly drawn system numbers.
    pub async fn start(&mut self) -> crate::Result<()> {
        let numbers = draw_system_numbers();
        self.start_with(numbers).await
    }

    /// Start a game with the given system numbers.
    pub async fn start_with(&mut self, system_numbers: Vec<u8>) -> crate::Result<()> {
        let system = Selection::from_numbers(system_numbers.iter().copied())?;
        system.complete()?;
        let cycle = self.client.current_cycle().await?;
        if self.paid_cycle != Some(cycle.cycle_number) && !self.refresh_payment().await? {
            return Err(Error::PaymentVerificationFailed(format!(
                "no valid payment for cycle {}",
                cycle.cycle_number
            )));
        }
        self.client
            .set_game_in_progress(&self.wallet_address, true)
            .await?;
        tracing::debug!(wallet_address = %self.wallet_address, cycle = cycle.cycle_number, "game started");
        self.game = Some(ActiveGame {
            cycle_number: cycle.cycle_number,
            system_numbers,
            selection: Selection::default(),
        });
        Ok(())
    }

    /// Report a raw input change.
    pub fn input_changed(&self) -> crate::Result<()> {
        Ok(self.guard.check_input_change()?)
    }

    /// Confirm a number from raw input.
    pub fn add_number(&mut self, input: &str) -> crate::Result<u8> {
        let game = self.game.as_mut().ok_or(Error::GameNotStarted)?;
        let number = parse_number(input)?;
        game.selection.check(number)?;
        self.guard.check_add_number(number)?;
        game.selection.push(number)?;
        Ok(number)
    }

    /// Score the game and award the points.
    pub async fn submit(&mut self) -> crate::Result<GameOutcome> {
        self.check_cycle().await?;
        let game = self.game.as_ref().ok_or(Error::GameNotStarted)?;
        let user_numbers = game.selection.complete()?.to_vec();
        self.guard.ensure_submit_allowed()?;
        let (matches, points) = game.selection.score(&game.system_numbers)?;
        let system_numbers = game.system_numbers.clone();
        let award = self
            .client
            .award_points(&self.wallet_address, points)
            .await?;
        // Rejected submissions do not start the cooldown.
        self.guard.record_submit_game();
        self.game = None;
        tracing::info!(
            wallet_address = %self.wallet_address,
            matches,
            points,
            total = award.player.points,
            "game submitted"
        );
        Ok(GameOutcome {
            user_numbers,
            system_numbers,
            matches,
            points,
            award,
        })
    }

    /// Stop the running game if its cycle is no longer current.
    ///
    /// The payment of the ended cycle is forgotten as well.
    pub async fn check_cycle(&mut self) -> crate::Result<()> {
        let Some(started_in) = self.game.as_ref().map(|game| game.cycle_number) else {
            return Ok(());
        };
        let cycle = self.client.current_cycle().await?;
        if cycle.cycle_number == started_in {
            return Ok(());
        }
        self.game = None;
        self.paid_cycle = None;
        tracing::warn!(
            wallet_address = %self.wallet_address,
            started_in,
            current = cycle.cycle_number,
            "cycle expired during the game"
        );
        self.client
            .set_game_in_progress(&self.wallet_address, false)
            .await?;
        Err(Error::CycleExpiredMidGame(started_in))
    }

    /// Abandon the running game.
    pub async fn cancel(&mut self) -> crate::Result<()> {
        if self.game.take().is_some() {
            self.client
                .set_game_in_progress(&self.wallet_address, false)
                .await?;
        }
        Ok(())
    }
}
