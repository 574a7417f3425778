// SPDX-License-Identifier: MIT OR Apache-2.0

//! Match state machine
//!
//! Operations are synchronous apart from the AI turn and return the events
//! to deliver; the registry owns delivery and serialization per match.

use chrono::Utc;
use goroom_core::{
    ends_with_two_passes, next_color, Board, Color, Coord, Move, ReplayFrame, RuleValidator, Score,
};
use uuid::Uuid;

use crate::ai::{AiClient, AiError, AiRequest, AiResponse};
use crate::error::MatchError;
use crate::events::{Outbound, ServerEvent};
use crate::record::{MatchRecord, Player, PlayerKind, SessionType};
use crate::session::Identity;

/// Lifecycle of a match
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchState {
    /// Network match without a second player
    WaitingForOpponent,
    InProgress,
    GameOver,
}

/// Events to deliver plus follow-up work for the caller
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Outcome {
    pub outbound: Vec<Outbound>,
    /// The AI should move next
    pub ai_turn: bool,
    /// The match entered GameOver during this operation
    pub finished: bool,
}

/// Owns one match record and is the only thing that mutates it
#[derive(Debug, Clone)]
pub struct MatchController {
    record: MatchRecord,
    komi: f32,
}

impl MatchController {
    /// Create a new match for `player_one`.
    ///
    /// Hotseat matches always start with player one on Black. An AI match
    /// where the human chose White asks for the AI's opening move.
    pub fn create(
        player_one: &Identity,
        session_type: SessionType,
        board_size: u8,
        desired_color: Color,
        komi: f32,
    ) -> (Self, Outcome) {
        let color = match session_type {
            SessionType::Hotseat => Color::Black,
            _ => desired_color,
        };

        let record = MatchRecord {
            id: Uuid::new_v4().to_string(),
            board_size,
            session_type,
            player_one: Player {
                id: player_one.id.clone(),
                display_name: player_one.display_name.clone(),
                color,
                kind: PlayerKind::Human,
            },
            player_two: Player::synthetic(session_type, color.opposite()),
            history: Vec::new(),
            game_over: false,
            created_at: Utc::now(),
        };

        tracing::info!(
            match_id = %record.id,
            session_type = ?session_type,
            board_size,
            color = %color,
            "Match created"
        );

        let outcome = Outcome {
            outbound: vec![Outbound::new(
                player_one.id.clone(),
                ServerEvent::MatchCreated {
                    data: record.clone(),
                },
            )],
            ai_turn: session_type == SessionType::Ai && color == Color::White,
            finished: false,
        };

        (Self { record, komi }, outcome)
    }

    /// Rebuild a controller around a stored record
    pub fn restore(record: MatchRecord, komi: f32) -> Self {
        Self { record, komi }
    }

    pub fn id(&self) -> &str {
        &self.record.id
    }

    pub fn record(&self) -> &MatchRecord {
        &self.record
    }

    pub fn state(&self) -> MatchState {
        if self.record.game_over {
            MatchState::GameOver
        } else if self.record.player_two.is_none() {
            MatchState::WaitingForOpponent
        } else {
            MatchState::InProgress
        }
    }

    /// Current board, replayed from history
    pub fn board(&self) -> Board {
        self.record.board()
    }

    /// Seat a second human in a Network match
    #[tracing::instrument(level = "debug", skip(self, player_two), fields(match_id = %self.record.id, user_id = %player_two.id))]
    pub fn add_player(&mut self, player_two: &Identity) -> Result<Outcome, MatchError> {
        if self.record.game_over {
            return Err(MatchError::GameOver);
        }
        if self.record.session_type != SessionType::Network {
            return Err(MatchError::NotJoinable);
        }
        if self.record.player_one.id == player_two.id {
            return Err(MatchError::OwnMatch);
        }
        if self.record.player_two.is_some() {
            return Err(MatchError::AlreadyFull);
        }

        let player_one = self.record.player_one.clone();
        let joined = Player {
            id: player_two.id.clone(),
            display_name: player_two.display_name.clone(),
            color: player_one.color.opposite(),
            kind: PlayerKind::Human,
        };
        self.record.player_two = Some(joined.clone());

        tracing::info!(match_id = %self.record.id, color = %joined.color, "Opponent joined");

        Ok(Outcome {
            outbound: vec![
                Outbound::new(
                    player_one.id.clone(),
                    ServerEvent::PlayerJoined {
                        opponent: joined.clone(),
                    },
                ),
                Outbound::new(
                    joined.id.clone(),
                    ServerEvent::MatchJoined {
                        data: self.record.clone(),
                        you: joined,
                        opponent: Some(player_one),
                    },
                ),
            ],
            ..Outcome::default()
        })
    }

    /// Apply a placement or pass from `user_id`
    #[tracing::instrument(level = "debug", skip(self), fields(match_id = %self.record.id))]
    pub fn play_move(
        &mut self,
        user_id: &str,
        x: i32,
        y: i32,
        pass: bool,
    ) -> Result<Outcome, MatchError> {
        if self.record.game_over {
            return Err(MatchError::GameOver);
        }
        let seat = self
            .record
            .seat(user_id)
            .filter(|p| p.is_human())
            .cloned()
            .ok_or(MatchError::NotInMatch)?;
        if self.record.player_two.is_none() {
            return Err(MatchError::NoOpponent);
        }

        let to_move = next_color(&self.record.history);
        let color = match self.record.session_type {
            // One player drives both colors; the history decides which
            SessionType::Hotseat => to_move,
            _ if seat.color != to_move => return Err(MatchError::NotYourTurn),
            _ => seat.color,
        };

        let (board, captured) = if pass {
            self.record.history.push(Move {
                color,
                x: u8::try_from(x).unwrap_or(0),
                y: u8::try_from(y).unwrap_or(0),
                pass: true,
            });
            (self.board(), 0)
        } else {
            let coord = match (u8::try_from(x), u8::try_from(y)) {
                (Ok(x), Ok(y)) => Coord::new(x, y),
                _ => return Err(goroom_core::GameError::OutOfBounds.into()),
            };
            let accepted = RuleValidator::new(&self.record.history, self.record.board_size)
                .check_move(Move::place(color, coord))?;
            self.record.history = accepted.history;
            (accepted.board, accepted.captured)
        };

        tracing::debug!(ply = self.record.history.len(), %color, pass, captured, "Move accepted");

        let mut outcome = Outcome {
            outbound: self.broadcast(ServerEvent::BoardUpdated {
                board: board.convert_to_integer(),
                color,
                pass,
                captured,
            }),
            ..Outcome::default()
        };

        if ends_with_two_passes(&self.record.history) {
            outcome.outbound.extend(self.finish());
            outcome.finished = true;
        } else if self.record.session_type == SessionType::Ai {
            outcome.ai_turn = true;
        }

        Ok(outcome)
    }

    /// Color of the AI seat, for AI matches
    fn ai_color(&self) -> Option<Color> {
        self.record
            .player_two
            .as_ref()
            .filter(|p| p.kind == PlayerKind::Ai)
            .map(|p| p.color)
    }

    /// True when an unfinished AI match is waiting on the AI seat, as after a
    /// failed AI call or a restart
    pub fn awaiting_ai(&self) -> bool {
        !self.record.game_over
            && self
                .ai_color()
                .is_some_and(|color| next_color(&self.record.history) == color)
    }

    /// Ask the AI service for its move and apply it.
    ///
    /// The match stays borrowed for the whole exchange, so no human move can
    /// interleave. A placement is only checked for targeting an empty point;
    /// occupied targets are re-requested, up to `max_retries` when set.
    pub async fn ai_turn(
        &mut self,
        ai: &dyn AiClient,
        max_retries: Option<u32>,
    ) -> Result<Outcome, MatchError> {
        let Some(ai_color) = self.ai_color() else {
            return Ok(Outcome::default());
        };
        if self.record.game_over || next_color(&self.record.history) != ai_color {
            tracing::debug!(match_id = %self.record.id, "Not the AI's turn");
            return Ok(Outcome::default());
        }

        let mut board = self.board();
        let request = AiRequest::new(&board, &self.record.history);
        let response = request_placement(ai, &request, &board, max_retries)
            .await
            .inspect_err(|e| tracing::error!(match_id = %self.record.id, error = %e, "AI turn failed"))?;

        if response.c != ai_color.code() {
            tracing::warn!(
                match_id = %self.record.id,
                reported = response.c,
                expected = ai_color.code(),
                "AI reported a different color; recording its seat color"
            );
        }

        let human = self.record.player_one.id.clone();
        let mut outcome = Outcome::default();

        if response.pass {
            self.record.history.push(Move::pass(ai_color));
            outcome
                .outbound
                .push(Outbound::new(human, ServerEvent::notice("AI passed")));
            outcome.outbound.extend(self.broadcast(ServerEvent::BoardUpdated {
                board: board.convert_to_integer(),
                color: ai_color,
                pass: true,
                captured: 0,
            }));
            if ends_with_two_passes(&self.record.history) {
                outcome.outbound.extend(self.finish());
                outcome.finished = true;
            }
        } else {
            let coord = response.coord(self.record.board_size)?;
            let captured = board.play_move(coord, ai_color);
            self.record.history.push(Move::place(ai_color, coord));
            tracing::debug!(match_id = %self.record.id, x = coord.x, y = coord.y, captured, "AI moved");
            outcome.outbound.extend(self.broadcast(ServerEvent::BoardUpdated {
                board: board.convert_to_integer(),
                color: ai_color,
                pass: false,
                captured,
            }));
        }

        Ok(outcome)
    }

    /// Explicit leave. Ends a Network match; other sessions stay as they are.
    pub fn leave(&mut self, user_id: &str) -> Result<Outcome, MatchError> {
        if self.record.seat(user_id).filter(|p| p.is_human()).is_none() {
            return Err(MatchError::NotInMatch);
        }

        let mut outcome = Outcome::default();
        if self.record.session_type == SessionType::Network && !self.record.game_over {
            if let Some(opponent) = self.record.opponent_of(user_id).filter(|p| p.is_human()) {
                outcome.outbound.push(Outbound::new(
                    opponent.id.clone(),
                    ServerEvent::notice("Your opponent has left the game"),
                ));
            }
            outcome.outbound.extend(self.finish());
            outcome.finished = true;
        }
        outcome
            .outbound
            .push(Outbound::new(user_id, ServerEvent::notice("You've left the game")));

        tracing::info!(match_id = %self.record.id, user_id, "Player left");
        Ok(outcome)
    }

    /// Connection loss only informs the opponent; the seat stays reserved
    pub fn disconnected(&self, user_id: &str) -> Outcome {
        let mut outcome = Outcome::default();
        if self.record.session_type == SessionType::Network && !self.record.game_over {
            if let Some(opponent) = self.record.opponent_of(user_id).filter(|p| p.is_human()) {
                outcome.outbound.push(Outbound::new(
                    opponent.id.clone(),
                    ServerEvent::notice("Your opponent has disconnected"),
                ));
            }
        }
        outcome
    }

    /// Re-send the match and current board to a returning participant
    pub fn reconnect(&self, user_id: &str) -> Result<Outcome, MatchError> {
        if self.record.game_over {
            return Err(MatchError::GameOver);
        }
        let you = self
            .record
            .seat(user_id)
            .filter(|p| p.is_human())
            .cloned()
            .ok_or(MatchError::NotInMatch)?;
        let opponent = self.record.opponent_of(user_id).cloned();

        let last = self.record.history.last();
        let color = last.map(|mv| mv.color).unwrap_or(Color::Black);
        let pass = last.is_some_and(|mv| mv.pass);

        tracing::info!(match_id = %self.record.id, user_id, "Player reconnected");

        Ok(Outcome {
            outbound: vec![
                Outbound::new(
                    user_id,
                    ServerEvent::MatchJoined {
                        data: self.record.clone(),
                        you,
                        opponent,
                    },
                ),
                Outbound::new(
                    user_id,
                    ServerEvent::BoardUpdated {
                        board: self.board().convert_to_integer(),
                        color,
                        pass,
                        captured: 0,
                    },
                ),
            ],
            ..Outcome::default()
        })
    }

    /// Position after the first `index` plies, clamped to the playable range
    pub fn replay_frame(&self, index: i64) -> ReplayFrame {
        ReplayFrame::resolve(
            &self.record.history,
            self.record.board_size,
            self.record.game_over,
            index,
            self.komi,
        )
    }

    /// Enter GameOver and announce the result. Re-entry is a no-op.
    fn finish(&mut self) -> Vec<Outbound> {
        if self.record.game_over {
            return Vec::new();
        }
        self.record.game_over = true;

        let score = Score::of(&self.board(), self.komi);
        let message = self.result_message(&score);
        tracing::info!(
            match_id = %self.record.id,
            black = score.black,
            white = score.white,
            plies = self.record.history.len(),
            "Match over"
        );

        self.broadcast(ServerEvent::MatchOver { message })
    }

    fn result_message(&self, score: &Score) -> String {
        let replay_id = self.record.replay_id();
        let one = &self.record.player_one;
        match (self.record.session_type, self.record.player_two.as_ref()) {
            (SessionType::Hotseat, _) => format!(
                "Both passed  Black score: {}  White score: {}  Replay ID: {}",
                score.black, score.white, replay_id
            ),
            (SessionType::Ai, _) => format!(
                "Game over! Your score: {}  AI score: {}  Replay ID: {}",
                score.for_color(one.color),
                score.for_color(one.color.opposite()),
                replay_id
            ),
            (SessionType::Network, two) => {
                let (two_name, two_color) = match two {
                    Some(p) => (p.display_name.as_str(), p.color),
                    None => ("(nobody)", one.color.opposite()),
                };
                format!(
                    "Game over!  {} ({}) scored: {}  {} ({}) scored: {}  Replay ID: {}",
                    one.display_name,
                    one.color,
                    score.for_color(one.color),
                    two_name,
                    two_color,
                    score.for_color(two_color),
                    replay_id
                )
            }
        }
    }

    /// Address an event to every human participant
    fn broadcast(&self, event: ServerEvent) -> Vec<Outbound> {
        self.record
            .humans()
            .map(|p| Outbound::new(p.id.clone(), event.clone()))
            .collect()
    }
}

/// Request AI moves until one targets an empty point
async fn request_placement(
    ai: &dyn AiClient,
    request: &AiRequest,
    board: &Board,
    max_retries: Option<u32>,
) -> Result<AiResponse, AiError> {
    let mut attempts = 0u32;
    loop {
        attempts += 1;
        let response = ai.next_move(request).await?;
        if response.pass {
            return Ok(response);
        }
        let coord = response.coord(board.size())?;
        if board.get(coord).is_empty() {
            return Ok(response);
        }
        tracing::warn!(x = coord.x, y = coord.y, attempts, "AI chose an occupied point, asking again");
        if max_retries.is_some_and(|max| attempts > max) {
            return Err(AiError::RetriesExhausted(attempts));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use goroom_core::{GameError, KOMI};

    fn alice() -> Identity {
        Identity::new("alice", "Alice")
    }

    fn bob() -> Identity {
        Identity::new("bob", "Bob")
    }

    fn network_match() -> MatchController {
        let (mut ctl, _) = MatchController::create(&alice(), SessionType::Network, 9, Color::Black, KOMI);
        ctl.add_player(&bob()).unwrap();
        ctl
    }

    fn events_for<'a>(outcome: &'a Outcome, user: &str) -> Vec<&'a ServerEvent> {
        outcome
            .outbound
            .iter()
            .filter(|o| o.to == user)
            .map(|o| &o.event)
            .collect()
    }

    #[test]
    fn network_match_waits_for_opponent() {
        let (mut ctl, outcome) =
            MatchController::create(&alice(), SessionType::Network, 9, Color::White, KOMI);
        assert_eq!(ctl.state(), MatchState::WaitingForOpponent);
        assert!(matches!(
            outcome.outbound[0].event,
            ServerEvent::MatchCreated { .. }
        ));
        assert!(matches!(
            ctl.play_move("alice", 0, 0, false),
            Err(MatchError::NoOpponent)
        ));

        let outcome = ctl.add_player(&bob()).unwrap();
        assert_eq!(ctl.state(), MatchState::InProgress);
        let bob_seat = ctl.record().player_two.clone().unwrap();
        assert_eq!(bob_seat.color, Color::Black);
        assert_eq!(events_for(&outcome, "alice").len(), 1);
        assert!(matches!(
            events_for(&outcome, "bob")[0],
            ServerEvent::MatchJoined { .. }
        ));
    }

    #[test]
    fn join_rules() {
        let (mut ctl, _) = MatchController::create(&alice(), SessionType::Network, 9, Color::Black, KOMI);
        assert!(matches!(ctl.add_player(&alice()), Err(MatchError::OwnMatch)));
        ctl.add_player(&bob()).unwrap();
        assert!(matches!(
            ctl.add_player(&Identity::new("carol", "Carol")),
            Err(MatchError::AlreadyFull)
        ));

        let (mut hotseat, _) = MatchController::create(&alice(), SessionType::Hotseat, 9, Color::White, KOMI);
        assert!(matches!(hotseat.add_player(&bob()), Err(MatchError::NotJoinable)));
    }

    #[test]
    fn awaiting_ai_tracks_the_ai_seat() {
        let (ctl, outcome) = MatchController::create(&alice(), SessionType::Ai, 9, Color::White, KOMI);
        assert!(outcome.ai_turn);
        assert!(ctl.awaiting_ai());

        let (mut ctl, _) = MatchController::create(&alice(), SessionType::Ai, 9, Color::Black, KOMI);
        assert!(!ctl.awaiting_ai());
        ctl.play_move("alice", 4, 4, false).unwrap();
        assert!(ctl.awaiting_ai());

        let (hotseat, _) = MatchController::create(&alice(), SessionType::Hotseat, 9, Color::Black, KOMI);
        assert!(!hotseat.awaiting_ai());
    }

    #[test]
    fn hotseat_forces_black_and_alternates() {
        let (mut ctl, outcome) =
            MatchController::create(&alice(), SessionType::Hotseat, 9, Color::White, KOMI);
        assert_eq!(ctl.state(), MatchState::InProgress);
        assert!(!outcome.ai_turn);
        assert_eq!(ctl.record().player_one.color, Color::Black);

        ctl.play_move("alice", 2, 2, false).unwrap();
        ctl.play_move("alice", 3, 3, false).unwrap();
        let colors: Vec<_> = ctl.record().history.iter().map(|m| m.color).collect();
        assert_eq!(colors, vec![Color::Black, Color::White]);
    }

    #[test]
    fn turn_order_enforced_for_network() {
        let mut ctl = network_match();
        assert!(matches!(
            ctl.play_move("bob", 0, 0, false),
            Err(MatchError::NotYourTurn)
        ));
        ctl.play_move("alice", 0, 0, false).unwrap();
        assert!(matches!(
            ctl.play_move("alice", 1, 1, false),
            Err(MatchError::NotYourTurn)
        ));
        assert!(matches!(
            ctl.play_move("mallory", 1, 1, false),
            Err(MatchError::NotInMatch)
        ));
    }

    #[test]
    fn rejected_move_leaves_history_untouched() {
        let mut ctl = network_match();
        ctl.play_move("alice", 4, 4, false).unwrap();
        let err = ctl.play_move("bob", 4, 4, false).unwrap_err();
        assert!(matches!(err, MatchError::Validation(GameError::Occupied)));
        let err = ctl.play_move("bob", -1, 4, false).unwrap_err();
        assert!(matches!(err, MatchError::Validation(GameError::OutOfBounds)));
        assert_eq!(ctl.record().history.len(), 1);
    }

    #[test]
    fn two_passes_end_the_match_once() {
        let mut ctl = network_match();
        ctl.play_move("alice", 4, 4, false).unwrap();
        let first = ctl.play_move("bob", 0, 0, true).unwrap();
        assert!(!first.finished);
        let second = ctl.play_move("alice", 0, 0, true).unwrap();
        assert!(second.finished);
        assert_eq!(ctl.state(), MatchState::GameOver);

        let over: Vec<_> = second
            .outbound
            .iter()
            .filter(|o| matches!(o.event, ServerEvent::MatchOver { .. }))
            .collect();
        assert_eq!(over.len(), 2);
        if let ServerEvent::MatchOver { message } = &over[0].event {
            assert!(message.starts_with("Game over!  Alice (Black) scored: 81  Bob (White) scored: 5.5"));
        }

        assert!(ctl.finish().is_empty());
        assert!(matches!(
            ctl.play_move("bob", 1, 1, false),
            Err(MatchError::GameOver)
        ));
    }

    #[test]
    fn pass_records_mover_color() {
        let mut ctl = network_match();
        let outcome = ctl.play_move("alice", 3, 5, true).unwrap();
        let mv = ctl.record().history[0];
        assert!(mv.pass);
        assert_eq!(mv.color, Color::Black);
        assert!(matches!(
            events_for(&outcome, "bob")[0],
            ServerEvent::BoardUpdated { pass: true, color: Color::Black, .. }
        ));
    }

    #[test]
    fn leave_ends_network_match() {
        let mut ctl = network_match();
        let outcome = ctl.leave("bob").unwrap();
        assert!(outcome.finished);
        assert_eq!(ctl.state(), MatchState::GameOver);
        assert_eq!(
            events_for(&outcome, "alice")[0],
            &ServerEvent::notice("Your opponent has left the game")
        );
        assert_eq!(
            events_for(&outcome, "bob").last().copied(),
            Some(&ServerEvent::notice("You've left the game"))
        );
    }

    #[test]
    fn leave_keeps_hotseat_match_alive() {
        let (mut ctl, _) = MatchController::create(&alice(), SessionType::Hotseat, 9, Color::Black, KOMI);
        let outcome = ctl.leave("alice").unwrap();
        assert!(!outcome.finished);
        assert_eq!(ctl.state(), MatchState::InProgress);
    }

    #[test]
    fn disconnect_only_notifies() {
        let ctl = network_match();
        let outcome = ctl.disconnected("alice");
        assert_eq!(
            outcome.outbound,
            vec![Outbound::new("bob", ServerEvent::notice("Your opponent has disconnected"))]
        );
        assert_eq!(ctl.state(), MatchState::InProgress);
    }

    #[test]
    fn reconnect_resends_board_and_last_move() {
        let mut ctl = network_match();
        ctl.play_move("alice", 4, 4, false).unwrap();
        ctl.play_move("bob", 0, 0, true).unwrap();

        let outcome = ctl.reconnect("alice").unwrap();
        let events = events_for(&outcome, "alice");
        assert!(matches!(events[0], ServerEvent::MatchJoined { you, .. } if you.id == "alice"));
        assert!(matches!(
            events[1],
            ServerEvent::BoardUpdated { color: Color::White, pass: true, .. }
        ));

        ctl.leave("bob").unwrap();
        assert!(matches!(ctl.reconnect("alice"), Err(MatchError::GameOver)));
    }
}
