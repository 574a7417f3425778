// SPDX-License-Identifier: MIT OR Apache-2.0

//! AI opponent contract and HTTP client

use async_trait::async_trait;
use goroom_core::{Board, Color, Coord, Move, Stone};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::config::AiConfig;

/// Failures talking to the AI service
#[derive(Debug, Error)]
pub enum AiError {
    /// Service unreachable or returned a non-success status
    #[error("AI transport failure: {0}")]
    Transport(String),

    /// Response body could not be understood
    #[error("Malformed AI response: {0}")]
    Malformed(String),

    /// Placement outside the board
    #[error("AI chose ({x}, {y}) on a {size}x{size} board")]
    OutOfBounds { x: i64, y: i64, size: u8 },

    /// Every attempt targeted an occupied point
    #[error("AI kept choosing occupied points after {0} attempts")]
    RetriesExhausted(u32),
}

/// The previous ply as the AI service sees it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastMove {
    pub x: u8,
    pub y: u8,
    /// 1 = Black, 2 = White
    pub c: u8,
    pub pass: bool,
}

impl LastMove {
    /// Description of the most recent ply; an empty history reads as a
    /// black non-pass at the origin
    pub fn from_history(history: &[Move]) -> Self {
        match history.last() {
            Some(mv) => Self {
                x: mv.x,
                y: mv.y,
                c: mv.color.code(),
                pass: mv.pass,
            },
            None => Self {
                x: 0,
                y: 0,
                c: Color::Black.code(),
                pass: false,
            },
        }
    }
}

/// Request body sent to the AI service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiRequest {
    pub size: u8,
    /// Indexed `board[x][y]`
    pub board: Vec<Vec<Stone>>,
    pub last: LastMove,
}

impl AiRequest {
    pub fn new(board: &Board, history: &[Move]) -> Self {
        Self {
            size: board.size(),
            board: board.convert_to_integer(),
            last: LastMove::from_history(history),
        }
    }
}

/// Move chosen by the AI service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AiResponse {
    #[serde(default)]
    pub pass: bool,
    #[serde(default)]
    pub x: i64,
    #[serde(default)]
    pub y: i64,
    /// 1 = Black, 2 = White
    pub c: u8,
}

impl AiResponse {
    pub fn pass(color: Color) -> Self {
        Self {
            pass: true,
            x: 0,
            y: 0,
            c: color.code(),
        }
    }

    pub fn place(color: Color, x: i64, y: i64) -> Self {
        Self {
            pass: false,
            x,
            y,
            c: color.code(),
        }
    }

    /// Target of a placement, checked against the board size
    pub fn coord(&self, size: u8) -> Result<Coord, AiError> {
        let out_of_bounds = || AiError::OutOfBounds {
            x: self.x,
            y: self.y,
            size,
        };
        let x = u8::try_from(self.x).map_err(|_| out_of_bounds())?;
        let y = u8::try_from(self.y).map_err(|_| out_of_bounds())?;
        let coord = Coord::new(x, y);
        if coord.is_valid(size) {
            Ok(coord)
        } else {
            Err(out_of_bounds())
        }
    }
}

/// Source of AI moves
#[async_trait]
pub trait AiClient: Send + Sync {
    /// Ask for the next move in the given position
    async fn next_move(&self, request: &AiRequest) -> Result<AiResponse, AiError>;
}

/// AI service reached over HTTP with a JSON POST
pub struct HttpAiClient {
    endpoint: String,
    http_client: reqwest::Client,
}

impl HttpAiClient {
    pub fn new(config: &AiConfig) -> Result<Self, AiError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| AiError::Transport(e.to_string()))?;
        Ok(Self {
            endpoint: config.endpoint.clone(),
            http_client,
        })
    }
}

#[async_trait]
impl AiClient for HttpAiClient {
    #[tracing::instrument(level = "debug", skip(self, request), fields(endpoint = %self.endpoint))]
    async fn next_move(&self, request: &AiRequest) -> Result<AiResponse, AiError> {
        let response = self
            .http_client
            .post(&self.endpoint)
            .json(request)
            .send()
            .await
            .map_err(|e| AiError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AiError::Transport(format!("status {}", response.status())));
        }

        let body = response
            .text()
            .await
            .map_err(|e| AiError::Transport(e.to_string()))?;
        serde_json::from_str(&body).map_err(|e| AiError::Malformed(e.to_string()))
    }
}
