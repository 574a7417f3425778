// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared helpers for goroom-server integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use goroom_server::{
    AiClient, AiError, AiRequest, AiResponse, Connection, Identity, MatchRegistry, MemoryStore,
    Persistence, ServerConfig, ServerEvent,
};
use once_cell::sync::Lazy;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;
use uuid::Uuid;

static INIT_LOGGING: Lazy<()> = Lazy::new(|| {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
});

pub fn init_logging() {
    Lazy::force(&INIT_LOGGING);
}

/// AI double that answers from a fixed script and records every request
#[derive(Default)]
pub struct ScriptedAi {
    script: Mutex<VecDeque<Result<AiResponse, AiError>>>,
    requests: Mutex<Vec<AiRequest>>,
    delay: Option<Duration>,
}

impl ScriptedAi {
    pub fn new(script: Vec<Result<AiResponse, AiError>>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            ..Self::default()
        })
    }

    /// Like `new`, but every answer takes `delay`
    pub fn slow(script: Vec<Result<AiResponse, AiError>>, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            requests: Mutex::default(),
            delay: Some(delay),
        })
    }

    pub fn requests(&self) -> Vec<AiRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl AiClient for ScriptedAi {
    async fn next_move(&self, request: &AiRequest) -> Result<AiResponse, AiError> {
        self.requests.lock().unwrap().push(request.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let next = self.script.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Err(AiError::Transport("script exhausted".into())))
    }
}

/// Registry over an in-memory store, returning the store for inspection
pub fn registry_with(ai: Arc<ScriptedAi>, config: ServerConfig) -> (MatchRegistry, Arc<MemoryStore>) {
    init_logging();
    let store = Arc::new(MemoryStore::new());
    let registry = MatchRegistry::new(config, ai, store.clone() as Arc<dyn Persistence>);
    (registry, store)
}

pub fn registry(ai: Arc<ScriptedAi>) -> (MatchRegistry, Arc<MemoryStore>) {
    registry_with(ai, ServerConfig::default())
}

/// A connected test user
pub struct Client {
    pub id: String,
    pub connection_id: Uuid,
    rx: UnboundedReceiver<ServerEvent>,
}

impl Client {
    pub async fn connect(registry: &MatchRegistry, id: &str, name: &str) -> Self {
        let (connection, rx) = Connection::open();
        let connection_id = connection.id();
        registry.connect(Identity::new(id, name), connection).await;
        Self {
            id: id.to_string(),
            connection_id,
            rx,
        }
    }

    /// Next event, failing the test after two seconds
    pub async fn next(&mut self) -> ServerEvent {
        tokio::time::timeout(Duration::from_secs(2), self.rx.recv())
            .await
            .expect("timed out waiting for event")
            .expect("connection closed")
    }

    /// Everything queued so far
    pub fn drain(&mut self) -> Vec<ServerEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.rx.try_recv() {
            events.push(event);
        }
        events
    }
}

pub fn notice(text: &str) -> ServerEvent {
    ServerEvent::notice(text)
}

pub fn match_over(events: &[ServerEvent]) -> Option<&str> {
    events.iter().find_map(|e| match e {
        ServerEvent::MatchOver { message } => Some(message.as_str()),
        _ => None,
    })
}
