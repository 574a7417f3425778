// SPDX-License-Identifier: MIT OR Apache-2.0

//! goroom server - match orchestration for Go
//!
//! Owns match lifecycle, turn enforcement, the AI opponent exchange, replay
//! browsing and session tracking. Transports hand in [`ClientCommand`]s for
//! an authenticated user and drain [`ServerEvent`]s from that user's
//! [`Connection`].

#![deny(unsafe_code)]

pub mod ai;
pub mod config;
pub mod error;
pub mod events;
pub mod match_controller;
pub mod persistence;
pub mod record;
pub mod registry;
pub mod session;

/// Full UUID string of a match
pub type MatchId = String;
/// Stable identifier from the identity provider
pub type UserId = String;

pub use ai::{AiClient, AiError, AiRequest, AiResponse, HttpAiClient};
pub use config::{AiConfig, ServerConfig};
pub use error::{ErrorKind, MatchError};
pub use events::{ClientCommand, Outbound, ServerEvent};
pub use match_controller::{MatchController, MatchState, Outcome};
pub use persistence::{JsonFileStore, MemoryStore, Persistence, UserRecord};
pub use record::{MatchRecord, Player, PlayerKind, SessionType};
pub use registry::MatchRegistry;
pub use session::{Connection, Identity, SessionRegistry};
