//! WebSocket protocol messages for the border authoring server.

use borders_core::{BorderFormat, Point, WorldRecord};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Messages sent from client to server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum ClientMessage {
    /// Create a new authoring session
    CreateSession,

    /// Join an existing session
    JoinSession { session_id: Uuid },

    /// Replace the session's worlds
    LoadWorlds { worlds: Vec<WorldRecord> },

    /// Claim or release one hex by label
    ToggleHex { hex: String },

    /// Claim the margin hexes around the sector
    ClaimEdges,

    /// Process every allegiance of the session's map
    Process,

    /// Extract the current borders
    GetBorders { format: BorderFormat },

    /// Render a border given as hex labels
    RenderBorder { hexes: Vec<String>, line_width: f64 },

    /// Ping for keepalive
    Ping,
}

/// Messages sent from server to client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum ServerMessage {
    /// Welcome message with assigned client ID
    Welcome { client_id: Uuid },

    /// Session created successfully
    SessionCreated { session_id: Uuid },

    /// Joined session successfully
    JoinedSession { session_id: Uuid, worlds: usize },

    /// The session's grid was edited
    GridUpdated { changed: bool },

    /// One allegiance was processed
    Progress {
        allegiance: String,
        count: usize,
        remaining: usize,
    },

    /// Map processing finished
    ProcessComplete { changed: bool },

    /// Extracted borders in the requested format
    Borders { format: BorderFormat, body: String },

    /// Rendered border outline, one point list per sub-path
    RenderedPath { paths: Vec<Vec<Point>> },

    /// Error occurred; `retryable` errors may succeed if sent again
    Error { message: String, retryable: bool },

    /// Pong response
    Pong,
}

impl ServerMessage {
    pub fn error(message: impl ToString) -> Self {
        ServerMessage::Error {
            message: message.to_string(),
            retryable: false,
        }
    }

    pub fn retryable(message: impl ToString) -> Self {
        ServerMessage::Error {
            message: message.to_string(),
            retryable: true,
        }
    }
}
