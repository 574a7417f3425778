// SPDX-License-Identifier: MIT OR Apache-2.0

//! Rejections produced by match operations

use crate::ai::AiError;
use goroom_core::GameError;
use thiserror::Error;

/// Coarse classification of a rejection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Illegal move; state unchanged
    Validation,
    /// Operation not allowed in the current match state
    State,
    /// AI service failure; match left in its last valid state
    ExternalService,
}

/// Errors returned by the match controller and registry.
///
/// The display text is what the acting user is shown.
#[derive(Debug, Error)]
pub enum MatchError {
    #[error("{0}")]
    Validation(#[from] GameError),

    #[error("Unable to find a game with that ID")]
    NotFound,

    #[error("You are not signed in")]
    UnknownUser,

    #[error("The game has ended")]
    GameOver,

    #[error("You need an opponent first")]
    NoOpponent,

    #[error("It is not your turn")]
    NotYourTurn,

    #[error("You are not playing in this game")]
    NotInMatch,

    #[error("This game already has two players")]
    AlreadyFull,

    #[error("You cannot join your own game")]
    OwnMatch,

    #[error("Only network games can be joined")]
    NotJoinable,

    #[error("No replay has been requested")]
    NoActiveReplay,

    #[error("Board size {0} is not supported")]
    UnsupportedBoardSize(u8),

    #[error("AI service is currently unavailable")]
    Ai(#[from] AiError),
}

impl MatchError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            MatchError::Validation(_) => ErrorKind::Validation,
            MatchError::Ai(_) => ErrorKind::ExternalService,
            _ => ErrorKind::State,
        }
    }
}
