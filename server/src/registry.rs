// SPDX-License-Identifier: MIT OR Apache-2.0

//! All live matches, keyed by id, and command routing for connected users
//!
//! Each match sits behind its own async mutex, so commands for one match run
//! in submission order while other matches proceed in parallel. The map lock
//! is only held long enough to clone a match handle.

use chrono::{DateTime, Utc};
use goroom_core::Color;
use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::ai::AiClient;
use crate::config::ServerConfig;
use crate::error::MatchError;
use crate::events::{ClientCommand, ServerEvent};
use crate::match_controller::{MatchController, Outcome};
use crate::persistence::Persistence;
use crate::record::{MatchRecord, SessionType};
use crate::session::{Connection, Identity, SessionRegistry};
use crate::MatchId;

type SharedMatch = Arc<Mutex<MatchController>>;

struct MatchSlot {
    created_at: DateTime<Utc>,
    controller: SharedMatch,
}

/// Process-wide match registry
#[derive(Clone)]
pub struct MatchRegistry {
    matches: Arc<RwLock<BTreeMap<MatchId, MatchSlot>>>,
    sessions: SessionRegistry,
    ai: Arc<dyn AiClient>,
    store: Arc<dyn Persistence>,
    config: Arc<ServerConfig>,
}

impl MatchRegistry {
    pub fn new(config: ServerConfig, ai: Arc<dyn AiClient>, store: Arc<dyn Persistence>) -> Self {
        Self {
            matches: Arc::new(RwLock::new(BTreeMap::new())),
            sessions: SessionRegistry::new(),
            ai,
            store,
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    /// Attach a live connection for `identity` and resume its active match
    pub async fn connect(&self, identity: Identity, connection: Connection) {
        let user_id = identity.id.clone();
        tracing::info!(user_id = %user_id, connection = %connection.id(), "User connected");

        let Some(match_id) = self.sessions.attach(identity, connection).await else {
            return;
        };
        let Some(controller) = self.get(&match_id).await else {
            self.sessions.clear_active_match(&user_id, &match_id).await;
            return;
        };

        let mut ctl = controller.lock().await;
        match ctl.reconnect(&user_id) {
            Ok(outcome) => {
                self.sessions.dispatch(outcome.outbound).await;
                self.resume_ai(&mut ctl).await;
            }
            Err(e) => {
                tracing::debug!(user_id = %user_id, match_id = %match_id, error = %e, "Not resuming match");
                self.sessions.clear_active_match(&user_id, &match_id).await;
            }
        }
    }

    /// Connection `connection_id` of `user_id` went away
    pub async fn disconnect(&self, user_id: &str, connection_id: Uuid) {
        tracing::info!(user_id, connection = %connection_id, "User disconnected");
        let Some(match_id) = self.sessions.detach(user_id, connection_id).await else {
            return;
        };
        if let Some(controller) = self.get(&match_id).await {
            let ctl = controller.lock().await;
            self.sessions
                .dispatch(ctl.disconnected(user_id).outbound)
                .await;
        }
    }

    /// Route one command. Rejections are reported to the user before being
    /// returned.
    pub async fn handle(&self, user_id: &str, command: ClientCommand) -> Result<(), MatchError> {
        match command {
            ClientCommand::CreateMatch {
                session_type,
                board_size,
                color,
            } => self
                .create_match(user_id, session_type, board_size, color)
                .await
                .map(|_| ()),
            ClientCommand::JoinMatch { match_id } => self.join_match(user_id, &match_id).await,
            ClientCommand::PlayMove { x, y, pass } => self.play_move(user_id, x, y, pass).await,
            ClientCommand::RequestReplay { match_id } => {
                self.request_replay(user_id, &match_id).await
            }
            ClientCommand::ReplayMove { index } => self.replay_move(user_id, index).await,
            ClientCommand::LeaveMatch => self.leave_match(user_id).await,
        }
    }

    pub async fn create_match(
        &self,
        user_id: &str,
        session_type: SessionType,
        board_size: u8,
        color: Color,
    ) -> Result<MatchId, MatchError> {
        let result = self
            .try_create_match(user_id, session_type, board_size, color)
            .await;
        self.report(user_id, result, |text| ServerEvent::ErrorNotice { text }).await
    }

    async fn try_create_match(
        &self,
        user_id: &str,
        session_type: SessionType,
        board_size: u8,
        color: Color,
    ) -> Result<MatchId, MatchError> {
        let identity = self.identity(user_id).await?;
        let size = self
            .config
            .board_size(board_size)
            .ok_or(MatchError::UnsupportedBoardSize(board_size))?;

        let (controller, outcome) =
            MatchController::create(&identity, session_type, size, color, self.config.komi);
        let match_id = controller.id().to_string();
        let created_at = controller.record().created_at;
        let controller = Arc::new(Mutex::new(controller));

        // Lock before publishing so nothing reaches the match ahead of the
        // AI's opening move
        let mut ctl = controller.clone().lock_owned().await;
        self.matches.write().await.insert(
            match_id.clone(),
            MatchSlot {
                created_at,
                controller,
            },
        );
        self.sessions
            .set_active_match(user_id, Some(match_id.clone()))
            .await;

        self.deliver(&mut ctl, outcome).await;
        Ok(match_id)
    }

    pub async fn join_match(&self, user_id: &str, id_or_prefix: &str) -> Result<(), MatchError> {
        let result = self.try_join_match(user_id, id_or_prefix).await;
        self.report(user_id, result, |reason| ServerEvent::JoinFailed { reason })
            .await
    }

    async fn try_join_match(&self, user_id: &str, id_or_prefix: &str) -> Result<(), MatchError> {
        let identity = self.identity(user_id).await?;
        let (match_id, controller) = self
            .lookup(id_or_prefix)
            .await
            .ok_or(MatchError::NotFound)?;

        let mut ctl = controller.lock().await;
        let outcome = ctl.add_player(&identity)?;
        self.sessions
            .set_active_match(user_id, Some(match_id))
            .await;
        self.deliver(&mut ctl, outcome).await;
        Ok(())
    }

    pub async fn play_move(&self, user_id: &str, x: i32, y: i32, pass: bool) -> Result<(), MatchError> {
        let result = self.try_play_move(user_id, x, y, pass).await;
        self.report(user_id, result, |text| ServerEvent::ErrorNotice { text }).await
    }

    async fn try_play_move(&self, user_id: &str, x: i32, y: i32, pass: bool) -> Result<(), MatchError> {
        let controller = self.active_controller(user_id).await?;
        let mut ctl = controller.lock().await;
        self.resume_ai(&mut ctl).await;
        let outcome = ctl.play_move(user_id, x, y, pass)?;
        self.deliver(&mut ctl, outcome).await;
        Ok(())
    }

    pub async fn request_replay(&self, user_id: &str, id_or_prefix: &str) -> Result<(), MatchError> {
        let result = self.try_request_replay(user_id, id_or_prefix).await;
        self.report(user_id, result, |reason| ServerEvent::ReplayFailed { reason })
            .await
    }

    async fn try_request_replay(&self, user_id: &str, id_or_prefix: &str) -> Result<(), MatchError> {
        let (match_id, controller) = self
            .lookup(id_or_prefix)
            .await
            .ok_or(MatchError::NotFound)?;
        let data = controller.lock().await.record().clone();

        self.sessions.set_active_replay(user_id, match_id).await;
        self.sessions
            .send(user_id, ServerEvent::ReplayData { data })
            .await;
        Ok(())
    }

    pub async fn replay_move(&self, user_id: &str, index: i64) -> Result<(), MatchError> {
        let result = self.try_replay_move(user_id, index).await;
        self.report(user_id, result, |text| ServerEvent::ErrorNotice { text }).await
    }

    async fn try_replay_move(&self, user_id: &str, index: i64) -> Result<(), MatchError> {
        let match_id = self
            .sessions
            .active_replay(user_id)
            .await
            .ok_or(MatchError::NoActiveReplay)?;
        let controller = self.get(&match_id).await.ok_or(MatchError::NotFound)?;
        let frame = controller.lock().await.replay_frame(index);

        let (black_score, white_score) = frame
            .score
            .map(|s| (s.black, s.white))
            .unwrap_or((0.0, 0.0));
        self.sessions
            .send(
                user_id,
                ServerEvent::ReplayState {
                    board: frame.board.convert_to_integer(),
                    index: frame.index,
                    is_over: frame.is_final,
                    black_score,
                    white_score,
                },
            )
            .await;
        Ok(())
    }

    pub async fn leave_match(&self, user_id: &str) -> Result<(), MatchError> {
        let result = self.try_leave_match(user_id).await;
        self.report(user_id, result, |text| ServerEvent::ErrorNotice { text }).await
    }

    async fn try_leave_match(&self, user_id: &str) -> Result<(), MatchError> {
        let controller = self.active_controller(user_id).await?;
        let mut ctl = controller.lock().await;
        let outcome = ctl.leave(user_id)?;
        self.sessions.clear_active_match(user_id, ctl.id()).await;
        self.deliver(&mut ctl, outcome).await;
        Ok(())
    }

    /// Snapshot of a match by full id or unique prefix
    pub async fn find(&self, id_or_prefix: &str) -> Option<MatchRecord> {
        let (_, controller) = self.lookup(id_or_prefix).await?;
        let record = controller.lock().await.record().clone();
        Some(record)
    }

    /// Rebuild matches loaded from storage. Humans in unfinished matches get
    /// them back as their active match on next connect.
    pub async fn restore(&self, records: Vec<MatchRecord>) -> usize {
        let count = records.len();
        let mut resumable = Vec::new();
        {
            let mut matches = self.matches.write().await;
            for record in records {
                if !record.game_over {
                    resumable.extend(record.humans().map(|p| {
                        (
                            Identity::new(p.id.clone(), p.display_name.clone()),
                            record.id.clone(),
                        )
                    }));
                }
                matches.insert(
                    record.id.clone(),
                    MatchSlot {
                        created_at: record.created_at,
                        controller: Arc::new(Mutex::new(MatchController::restore(
                            record,
                            self.config.komi,
                        ))),
                    },
                );
            }
        }

        for (identity, match_id) in resumable {
            self.sessions.remember(identity, match_id).await;
        }
        tracing::info!(count, "Restored matches");
        count
    }

    /// Hand every match to storage
    pub async fn shutdown(&self) -> anyhow::Result<()> {
        let controllers: Vec<SharedMatch> = {
            let matches = self.matches.read().await;
            matches.values().map(|slot| slot.controller.clone()).collect()
        };

        let mut records = Vec::with_capacity(controllers.len());
        for controller in controllers {
            records.push(controller.lock().await.record().clone());
        }

        tracing::info!(count = records.len(), "Storing all matches");
        self.store.store_all_matches(&records).await
    }

    async fn identity(&self, user_id: &str) -> Result<Identity, MatchError> {
        self.sessions
            .identity(user_id)
            .await
            .ok_or(MatchError::UnknownUser)
    }

    async fn get(&self, match_id: &str) -> Option<SharedMatch> {
        let matches = self.matches.read().await;
        matches.get(match_id).map(|slot| slot.controller.clone())
    }

    async fn active_controller(&self, user_id: &str) -> Result<SharedMatch, MatchError> {
        let match_id = self
            .sessions
            .active_match(user_id)
            .await
            .ok_or(MatchError::NotFound)?;
        self.get(&match_id).await.ok_or(MatchError::NotFound)
    }

    /// Resolve a full id or prefix. When several ids share the prefix the
    /// oldest match wins.
    async fn lookup(&self, id_or_prefix: &str) -> Option<(MatchId, SharedMatch)> {
        if id_or_prefix.is_empty() {
            return None;
        }
        let matches = self.matches.read().await;
        matches
            .range::<str, _>((Bound::Included(id_or_prefix), Bound::Unbounded))
            .take_while(|(id, _)| id.starts_with(id_or_prefix))
            .min_by_key(|(_, slot)| slot.created_at)
            .map(|(id, slot)| (id.clone(), slot.controller.clone()))
    }

    /// Send an outcome while the match is still locked, then run the AI
    /// turn and game-over bookkeeping it asks for
    async fn deliver(&self, ctl: &mut MatchController, outcome: Outcome) {
        let Outcome {
            outbound,
            ai_turn,
            finished,
        } = outcome;
        self.sessions.dispatch(outbound).await;
        if finished {
            self.on_finished(ctl).await;
        }
        if !ai_turn {
            return;
        }

        match ctl.ai_turn(self.ai.as_ref(), self.config.ai.max_retries).await {
            Ok(outcome) => {
                let finished = outcome.finished;
                self.sessions.dispatch(outcome.outbound).await;
                if finished {
                    self.on_finished(ctl).await;
                }
            }
            Err(e) => {
                let human = ctl.record().player_one.id.clone();
                self.sessions
                    .send(&human, ServerEvent::notice(e.to_string()))
                    .await;
            }
        }
    }

    /// Re-attempt an AI turn that is still owed
    async fn resume_ai(&self, ctl: &mut MatchController) {
        if ctl.awaiting_ai() {
            tracing::info!(match_id = %ctl.id(), "Retrying pending AI turn");
            let outcome = Outcome {
                ai_turn: true,
                ..Outcome::default()
            };
            self.deliver(ctl, outcome).await;
        }
    }

    async fn on_finished(&self, ctl: &MatchController) {
        for player in ctl.record().humans() {
            self.sessions.clear_active_match(&player.id, ctl.id()).await;
        }
        if let Err(e) = self.store.store_match(ctl.record()).await {
            tracing::error!(match_id = %ctl.id(), error = %e, "Failed to store finished match");
        }
    }

    async fn report<T>(
        &self,
        user_id: &str,
        result: Result<T, MatchError>,
        reply: fn(String) -> ServerEvent,
    ) -> Result<T, MatchError> {
        if let Err(e) = &result {
            tracing::debug!(user_id, error = %e, kind = ?e.kind(), "Command rejected");
            self.sessions.send(user_id, reply(e.to_string())).await;
        }
        result
    }
}
