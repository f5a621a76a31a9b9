use crate::{validation::parse_number, ValidationError};

/// Numbers chosen per game, by the player and by the system alike.
pub const NUMBERS_PER_GAME: usize = 5;

/// Smallest selectable number.
pub const MIN_NUMBER: u8 = 1;

/// Largest selectable number.
pub const MAX_NUMBER: u8 = 100;

/// Points per matched number.
pub const POINTS_PER_MATCH: u64 = 10;

/// Points for matching every number.
pub const FULL_MATCH_POINTS: u64 = 50;

/// Count the user numbers that appear in the system set.
pub fn count_matches(user: &[u8], system: &[u8]) -> usize {
    user.iter().filter(|n| system.contains(n)).count()
}

/// Points earned for `matches` matched numbers.
///
/// A full match is fixed at [`FULL_MATCH_POINTS`], which coincides with
/// `5 * POINTS_PER_MATCH`.
pub fn points_for_matches(matches: usize) -> u64 {
    if matches == NUMBERS_PER_GAME {
        FULL_MATCH_POINTS
    } else {
        matches as u64 * POINTS_PER_MATCH
    }
}

/// The numbers picked by a player for one game.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Selection {
    numbers: Vec<u8>,
}

impl Selection {
    /// Create from numbers, validating each of them.
    pub fn from_numbers(numbers: impl IntoIterator<Item = u8>) -> Result<Self, ValidationError> {
        let mut selection = Self::default();
        for number in numbers {
            selection.push(number)?;
        }
        Ok(selection)
    }

    /// Check whether `number` could be added.
    pub fn check(&self, number: u8) -> Result<(), ValidationError> {
        if !(MIN_NUMBER..=MAX_NUMBER).contains(&number) {
            return Err(ValidationError::InvalidNumber(number.to_string()));
        }
        if self.numbers.len() >= NUMBERS_PER_GAME {
            return Err(ValidationError::SelectionFull(NUMBERS_PER_GAME));
        }
        if self.numbers.contains(&number) {
            return Err(ValidationError::DuplicateNumber(number));
        }
        Ok(())
    }

    /// Add a number.
    pub fn push(&mut self, number: u8) -> Result<(), ValidationError> {
        self.check(number)?;
        self.numbers.push(number);
        Ok(())
    }

    /// Parse raw input and add it.
    pub fn push_input(&mut self, input: &str) -> Result<u8, ValidationError> {
        let number = parse_number(input)?;
        self.push(number)?;
        Ok(number)
    }

    /// Selected numbers, in selection order.
    pub fn numbers(&self) -> &[u8] {
        &self.numbers
    }

    /// Returns whether all numbers are selected.
    pub fn is_complete(&self) -> bool {
        self.numbers.len() == NUMBERS_PER_GAME
    }

    /// Returns the selection if complete.
    pub fn complete(&self) -> Result<&[u8], ValidationError> {
        if self.is_complete() {
            Ok(&self.numbers)
        } else {
            Err(ValidationError::IncompleteSelection {
                expected: NUMBERS_PER_GAME,
                got: self.numbers.len(),
            })
        }
    }

    /// Score against the system numbers. Returns `(matches, points)`.
    pub fn score(&self, system: &[u8]) -> Result<(usize, u64), ValidationError> {
        let matches = count_matches(self.complete()?, system);
        Ok((matches, points_for_matches(matches)))
    }
}
