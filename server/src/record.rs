// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persisted shape of a match and its players

use chrono::{DateTime, Utc};
use goroom_core::{Board, Color, History};
use serde::{Deserialize, Serialize};

use crate::{MatchId, UserId};

/// Identity of the synthetic AI opponent
pub const AI_PLAYER_ID: &str = "AI";
/// Identity of the second seat in a shared-device match
pub const HOTSEAT_PLAYER_ID: &str = "Hotseat";

/// How the second seat of a match is filled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionType {
    /// Two humans on separate connections
    Network,
    /// Human against the external AI service
    #[serde(rename = "AI")]
    Ai,
    /// One human playing both colors on a shared device
    Hotseat,
}

/// Who sits in a seat
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayerKind {
    Human,
    Ai,
    Hotseat,
}

/// A seat in a match
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub id: UserId,
    pub display_name: String,
    pub color: Color,
    pub kind: PlayerKind,
}

impl Player {
    pub fn is_human(&self) -> bool {
        self.kind == PlayerKind::Human
    }

    /// Synthetic second seat for AI and Hotseat matches
    pub fn synthetic(session_type: SessionType, color: Color) -> Option<Self> {
        let (id, kind) = match session_type {
            SessionType::Network => return None,
            SessionType::Ai => (AI_PLAYER_ID, PlayerKind::Ai),
            SessionType::Hotseat => (HOTSEAT_PLAYER_ID, PlayerKind::Hotseat),
        };
        Some(Self {
            id: id.to_string(),
            display_name: id.to_string(),
            color,
            kind,
        })
    }
}

/// Everything needed to rebuild a match.
///
/// The board is never stored; it is replayed from `history`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub id: MatchId,
    pub board_size: u8,
    pub session_type: SessionType,
    pub player_one: Player,
    pub player_two: Option<Player>,
    pub history: History,
    pub game_over: bool,
    pub created_at: DateTime<Utc>,
}

impl MatchRecord {
    /// Short id shown to players for replay lookups
    pub fn replay_id(&self) -> &str {
        self.id.get(..8).unwrap_or(&self.id)
    }

    pub fn board(&self) -> Board {
        Board::from_history(&self.history, self.board_size)
    }

    /// Seat held by `user_id`, if any
    pub fn seat(&self, user_id: &str) -> Option<&Player> {
        std::iter::once(&self.player_one)
            .chain(self.player_two.as_ref())
            .find(|p| p.id == user_id)
    }

    /// The other seat relative to `user_id`
    pub fn opponent_of(&self, user_id: &str) -> Option<&Player> {
        if self.player_one.id == user_id {
            self.player_two.as_ref()
        } else if self.player_two.as_ref().is_some_and(|p| p.id == user_id) {
            Some(&self.player_one)
        } else {
            None
        }
    }

    /// Human participants, in seat order
    pub fn humans(&self) -> impl Iterator<Item = &Player> {
        std::iter::once(&self.player_one)
            .chain(self.player_two.as_ref())
            .filter(|p| p.is_human())
    }
}
