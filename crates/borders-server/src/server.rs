//! WebSocket server and connection handling.

use crate::config::ServerConfig;
use crate::protocol::{ClientMessage, ServerMessage};
use crate::session::{AuthoringSession, SessionError};
use borders_core::{border_path_for_labels, BorderFormat, ExtractOptions, ProcessStep, WorldRecord};
use dashmap::DashMap;
use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, Semaphore};
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Server state shared across all connections.
pub struct ServerState {
    /// All active sessions
    pub sessions: DashMap<Uuid, AuthoringSession>,
    /// Mapping from client ID to their session ID
    pub client_sessions: DashMap<Uuid, Uuid>,
    /// Mapping from client ID to their message sender
    pub client_senders: DashMap<Uuid, mpsc::UnboundedSender<ServerMessage>>,
    /// Permits for the blocking render workers
    pub render_permits: Arc<Semaphore>,
    pub config: ServerConfig,
    rules: Arc<borders_core::AllegianceRules>,
}

impl ServerState {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            sessions: DashMap::new(),
            client_sessions: DashMap::new(),
            client_senders: DashMap::new(),
            render_permits: Arc::new(Semaphore::new(config.render_workers)),
            rules: Arc::new(config.rules.clone()),
            config,
        }
    }

    /// Send a message to a specific client.
    pub fn send_to_client(&self, client_id: Uuid, msg: ServerMessage) {
        if let Some(sender) = self.client_senders.get(&client_id) {
            let _ = sender.send(msg);
        }
    }

    /// Broadcast a message to all clients in a session.
    pub fn broadcast_to_session(&self, session_id: Uuid, msg: ServerMessage) {
        let clients: Vec<Uuid> = match self.sessions.get(&session_id) {
            Some(session) => session.clients.iter().copied().collect(),
            None => return,
        };
        for client_id in clients {
            self.send_to_client(client_id, msg.clone());
        }
    }

    fn session_of(&self, client_id: Uuid) -> Result<Uuid, SessionError> {
        self.client_sessions
            .get(&client_id)
            .map(|s| *s)
            .ok_or(SessionError::NotInSession)
    }

    /// Run `f` against the client's session under the map guard
    fn with_session<T, F>(&self, client_id: Uuid, f: F) -> Result<(Uuid, T), SessionError>
    where
        F: FnOnce(&mut AuthoringSession) -> Result<T, SessionError>,
    {
        let session_id = self.session_of(client_id)?;
        let mut session = self
            .sessions
            .get_mut(&session_id)
            .ok_or(SessionError::SessionNotFound)?;
        Ok((session_id, f(&mut *session)?))
    }

    fn send_error(&self, client_id: Uuid, err: SessionError) {
        let msg = if err.is_retryable() {
            ServerMessage::retryable(err)
        } else {
            ServerMessage::error(err)
        };
        self.send_to_client(client_id, msg);
    }

    fn extract_options(&self) -> ExtractOptions {
        ExtractOptions {
            filter_holes: self.config.filter_holes,
        }
    }
}

/// Run the WebSocket server.
pub async fn run_server(state: Arc<ServerState>) -> anyhow::Result<()> {
    let addr = state.config.addr;
    let listener = TcpListener::bind(addr).await?;
    info!("Border server listening on {}", addr);

    while let Ok((stream, peer_addr)) = listener.accept().await {
        let state = Arc::clone(&state);
        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, peer_addr, state).await {
                error!("Connection error from {}: {}", peer_addr, e);
            }
        });
    }

    Ok(())
}

/// Handle a single WebSocket connection.
async fn handle_connection(stream: TcpStream, addr: SocketAddr, state: Arc<ServerState>) -> anyhow::Result<()> {
    let ws_stream = accept_async(stream).await?;
    info!("New WebSocket connection from {}", addr);

    let (mut ws_sender, mut ws_receiver) = ws_stream.split();

    let client_id = Uuid::new_v4();

    // Create channel for outgoing messages
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();
    state.client_senders.insert(client_id, tx);

    let welcome = ServerMessage::Welcome { client_id };
    let msg_text = serde_json::to_string(&welcome)?;
    ws_sender.send(Message::Text(msg_text)).await?;

    // Spawn task to forward messages from channel to WebSocket
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if let Ok(text) = serde_json::to_string(&msg) {
                if ws_sender.send(Message::Text(text)).await.is_err() {
                    break;
                }
            }
        }
    });

    while let Some(msg) = ws_receiver.next().await {
        match msg {
            Ok(Message::Text(text)) => match serde_json::from_str::<ClientMessage>(&text) {
                Ok(client_msg) => handle_message(client_id, client_msg, &state),
                Err(e) => {
                    warn!("Invalid message from {}: {}", client_id, e);
                    state.send_to_client(client_id, ServerMessage::error(format!("Invalid message: {}", e)));
                }
            },
            Ok(Message::Close(_)) => {
                info!("Client {} closing connection", client_id);
                break;
            }
            Err(e) => {
                error!("WebSocket error from {}: {}", client_id, e);
                break;
            }
            _ => {}
        }
    }

    handle_disconnect(client_id, &state);
    state.client_senders.remove(&client_id);
    send_task.abort();

    info!("Connection closed for {}", client_id);
    Ok(())
}

/// Handle a client message.
fn handle_message(client_id: Uuid, msg: ClientMessage, state: &Arc<ServerState>) {
    match msg {
        ClientMessage::CreateSession => create_session(client_id, state),

        ClientMessage::JoinSession { session_id } => join_session(client_id, session_id, state),

        ClientMessage::LoadWorlds { worlds } => load_worlds(client_id, &worlds, state),

        ClientMessage::ToggleHex { hex } => {
            let result = state.with_session(client_id, |s| s.toggle_hex(&hex));
            send_grid_update(client_id, result, state);
        }

        ClientMessage::ClaimEdges => {
            let result = state.with_session(client_id, |s| s.claim_edges());
            send_grid_update(client_id, result, state);
        }

        ClientMessage::Process => {
            match state.with_session(client_id, |s| s.begin_processing()) {
                Ok((session_id, ())) => {
                    tokio::spawn(run_processing(session_id, Arc::clone(state)));
                }
                Err(e) => state.send_error(client_id, e),
            }
        }

        ClientMessage::GetBorders { format } => send_borders(client_id, format, state),

        ClientMessage::RenderBorder { hexes, line_width } => {
            tokio::spawn(render_border(client_id, hexes, line_width, Arc::clone(state)));
        }

        ClientMessage::Ping => state.send_to_client(client_id, ServerMessage::Pong),
    }
}

fn create_session(client_id: Uuid, state: &Arc<ServerState>) {
    leave_session(client_id, state);

    let session_id = Uuid::new_v4();
    let session = AuthoringSession::new(session_id, client_id, Arc::clone(&state.rules), state.extract_options());
    state.sessions.insert(session_id, session);
    state.client_sessions.insert(client_id, session_id);

    info!("Client {} created session {}", client_id, session_id);
    state.send_to_client(client_id, ServerMessage::SessionCreated { session_id });
}

fn join_session(client_id: Uuid, session_id: Uuid, state: &Arc<ServerState>) {
    if state.session_of(client_id).ok() == Some(session_id) {
        let worlds = state.sessions.get(&session_id).map(|s| s.world_count()).unwrap_or(0);
        state.send_to_client(client_id, ServerMessage::JoinedSession { session_id, worlds });
        return;
    }
    leave_session(client_id, state);

    let worlds = match state.sessions.get_mut(&session_id) {
        Some(mut session) => {
            session.add_client(client_id);
            session.world_count()
        }
        None => {
            state.send_error(client_id, SessionError::SessionNotFound);
            return;
        }
    };

    state.client_sessions.insert(client_id, session_id);
    state.send_to_client(client_id, ServerMessage::JoinedSession { session_id, worlds });
}

fn load_worlds(client_id: Uuid, worlds: &[WorldRecord], state: &Arc<ServerState>) {
    match state.with_session(client_id, |s| s.load_worlds(worlds)) {
        Ok((session_id, ())) => {
            debug!("Session {} loaded {} worlds", session_id, worlds.len());
            state.broadcast_to_session(session_id, ServerMessage::GridUpdated { changed: true });
        }
        Err(e) => state.send_error(client_id, e),
    }
}

fn send_grid_update(client_id: Uuid, result: Result<(Uuid, bool), SessionError>, state: &Arc<ServerState>) {
    match result {
        Ok((session_id, changed)) => {
            state.broadcast_to_session(session_id, ServerMessage::GridUpdated { changed });
        }
        Err(e) => state.send_error(client_id, e),
    }
}

fn send_borders(client_id: Uuid, format: BorderFormat, state: &Arc<ServerState>) {
    let body = state
        .session_of(client_id)
        .and_then(|session_id| {
            state
                .sessions
                .get(&session_id)
                .ok_or(SessionError::SessionNotFound)
                .and_then(|session| session.render_borders(format))
        });

    match body {
        Ok(body) => state.send_to_client(client_id, ServerMessage::Borders { format, body }),
        Err(e) => state.send_error(client_id, e),
    }
}

/// Process a session one allegiance at a time, releasing the session and
/// yielding to other tasks between allegiances.
async fn run_processing(session_id: Uuid, state: Arc<ServerState>) {
    loop {
        let result = match state.sessions.get_mut(&session_id) {
            Some(mut session) => session.step_processing(),
            None => return,
        };

        match result {
            Ok(Some((step, remaining))) => {
                let count = match &step {
                    ProcessStep::Processed { count, .. } | ProcessStep::Skipped { count, .. } => *count,
                };
                state.broadcast_to_session(
                    session_id,
                    ServerMessage::Progress {
                        allegiance: step.allegiance().to_string(),
                        count,
                        remaining,
                    },
                );
            }
            Ok(None) => {
                let changed = state
                    .sessions
                    .get(&session_id)
                    .map(|s| s.process_changed())
                    .unwrap_or(false);
                info!("Session {} processing complete", session_id);
                state.broadcast_to_session(session_id, ServerMessage::ProcessComplete { changed });
                return;
            }
            Err(e) => {
                error!("Processing failed for session {}: {}", session_id, e);
                state.broadcast_to_session(session_id, ServerMessage::error(e));
                return;
            }
        }

        tokio::task::yield_now().await;
    }
}

/// Render a border on the blocking worker pool.
async fn render_border(client_id: Uuid, hexes: Vec<String>, line_width: f64, state: Arc<ServerState>) {
    let permit = match Arc::clone(&state.render_permits).acquire_owned().await {
        Ok(permit) => permit,
        Err(_) => {
            state.send_to_client(client_id, ServerMessage::retryable("Render pool is shut down"));
            return;
        }
    };

    let result = tokio::task::spawn_blocking(move || {
        let _permit = permit;
        border_path_for_labels(&hexes, line_width)
    })
    .await;

    let msg = match result {
        Ok(Ok(path)) => ServerMessage::RenderedPath { paths: path.segments },
        Ok(Err(e)) => ServerMessage::error(e),
        Err(e) => {
            warn!("Render worker failed for {}: {}", client_id, e);
            ServerMessage::retryable("Render worker failed")
        }
    };
    state.send_to_client(client_id, msg);
}

fn leave_session(client_id: Uuid, state: &Arc<ServerState>) {
    let Some((_, session_id)) = state.client_sessions.remove(&client_id) else {
        return;
    };

    let is_empty = state
        .sessions
        .get_mut(&session_id)
        .map(|mut session| session.remove_client(client_id))
        .unwrap_or(false);

    if is_empty {
        state.sessions.remove(&session_id);
        info!("Session {} closed", session_id);
    }
}

/// Handle client disconnect.
fn handle_disconnect(client_id: Uuid, state: &Arc<ServerState>) {
    leave_session(client_id, state);
}
