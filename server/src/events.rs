// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message types exchanged with the transport

use goroom_core::{Color, Stone};
use serde::{Deserialize, Serialize};

use crate::record::{MatchRecord, Player, SessionType};
use crate::UserId;

/// Commands delivered by the transport on behalf of an authenticated user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "camelCase")]
pub enum ClientCommand {
    #[serde(rename_all = "camelCase")]
    CreateMatch {
        session_type: SessionType,
        board_size: u8,
        color: Color,
    },
    #[serde(rename_all = "camelCase")]
    JoinMatch { match_id: String },
    PlayMove { x: i32, y: i32, pass: bool },
    #[serde(rename_all = "camelCase")]
    RequestReplay { match_id: String },
    ReplayMove { index: i64 },
    LeaveMatch,
}

/// Events sent back to a user's connection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum ServerEvent {
    MatchCreated {
        data: MatchRecord,
    },
    /// Sent to a joining or reconnecting player
    MatchJoined {
        data: MatchRecord,
        you: Player,
        opponent: Option<Player>,
    },
    PlayerJoined {
        opponent: Player,
    },
    /// Board indexed `board[x][y]`, plus the color and pass flag of the ply
    /// that produced it
    BoardUpdated {
        board: Vec<Vec<Stone>>,
        color: Color,
        pass: bool,
        captured: usize,
    },
    MatchOver {
        message: String,
    },
    JoinFailed {
        reason: String,
    },
    ReplayFailed {
        reason: String,
    },
    ReplayData {
        data: MatchRecord,
    },
    #[serde(rename_all = "camelCase")]
    ReplayState {
        board: Vec<Vec<Stone>>,
        index: usize,
        is_over: bool,
        black_score: f32,
        white_score: f32,
    },
    ErrorNotice {
        text: String,
    },
}

impl ServerEvent {
    pub fn notice(text: impl Into<String>) -> Self {
        ServerEvent::ErrorNotice { text: text.into() }
    }
}

/// An event addressed to one user
#[derive(Debug, Clone, PartialEq)]
pub struct Outbound {
    pub to: UserId,
    pub event: ServerEvent,
}

impl Outbound {
    pub fn new(to: impl Into<UserId>, event: ServerEvent) -> Self {
        Self {
            to: to.into(),
            event,
        }
    }
}
