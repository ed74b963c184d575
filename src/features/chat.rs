//! Chat feature: per-room message history with a bounded backlog.

use std::collections::VecDeque;
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::ChatConfig;
use crate::features::{unix_now, Feature, FeatureContext, FeatureError};
use crate::http::response::ApiError;

const MAX_ROOM_LEN: usize = 64;

pub struct ChatFeature;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: Uuid,
    pub room: String,
    pub author: String,
    pub body: String,
    pub sent_at: u64,
}

#[derive(Debug, Deserialize)]
pub struct PostMessage {
    pub author: String,
    pub body: String,
}

/// Room name → most recent messages, oldest first.
pub struct ChatRooms {
    rooms: DashMap<String, VecDeque<ChatMessage>>,
    max_history: usize,
    max_message_len: usize,
    max_rooms: usize,
}

impl ChatRooms {
    pub fn new(config: &ChatConfig) -> Self {
        Self {
            rooms: DashMap::new(),
            max_history: config.max_history,
            max_message_len: config.max_message_len,
            max_rooms: config.max_rooms,
        }
    }

    pub fn post(&self, room: &str, author: &str, body: &str) -> Result<ChatMessage, ApiError> {
        validate_room(room)?;
        let author = author.trim();
        let body = body.trim();
        if author.is_empty() {
            return Err(ApiError::BadRequest("author must not be empty".into()));
        }
        if body.is_empty() || body.chars().count() > self.max_message_len {
            return Err(ApiError::BadRequest(format!(
                "message must be 1 to {} characters",
                self.max_message_len
            )));
        }

        let message = ChatMessage {
            id: Uuid::new_v4(),
            room: room.to_string(),
            author: author.to_string(),
            body: body.to_string(),
            sent_at: unix_now(),
        };

        // Checked before taking the entry lock; `len` reads every shard.
        if !self.rooms.contains_key(room) && self.rooms.len() >= self.max_rooms {
            return Err(ApiError::Conflict(format!(
                "room limit of {} reached",
                self.max_rooms
            )));
        }

        let mut history = self.rooms.entry(room.to_string()).or_default();
        history.push_back(message.clone());
        while history.len() > self.max_history {
            history.pop_front();
        }
        Ok(message)
    }

    /// Messages in `room`; an unknown room is empty, not an error.
    pub fn history(&self, room: &str) -> Result<Vec<ChatMessage>, ApiError> {
        validate_room(room)?;
        Ok(self
            .rooms
            .get(room)
            .map(|h| h.iter().cloned().collect())
            .unwrap_or_default())
    }
}

fn validate_room(room: &str) -> Result<(), ApiError> {
    let valid = !room.is_empty()
        && room.len() <= MAX_ROOM_LEN
        && room
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(ApiError::BadRequest(format!(
            "room must be 1 to {MAX_ROOM_LEN} characters of [A-Za-z0-9_-]"
        )))
    }
}

impl Feature for ChatFeature {
    fn name(&self) -> &'static str {
        "chat"
    }

    fn routes(&self, ctx: &FeatureContext) -> Result<Router, FeatureError> {
        let config = &ctx.config.chat;
        if config.max_history == 0 {
            return Err(FeatureError::Misconfigured {
                field: "chat.max_history",
                reason: "must be greater than zero".into(),
            });
        }
        if config.max_message_len == 0 {
            return Err(FeatureError::Misconfigured {
                field: "chat.max_message_len",
                reason: "must be greater than zero".into(),
            });
        }
        if config.max_rooms == 0 {
            return Err(FeatureError::Misconfigured {
                field: "chat.max_rooms",
                reason: "must be greater than zero".into(),
            });
        }

        Ok(Router::new()
            .route("/chat/rooms/{room}/messages", get(list_messages).post(post_message))
            .with_state(Arc::new(ChatRooms::new(config))))
    }
}

async fn list_messages(
    State(rooms): State<Arc<ChatRooms>>,
    Path(room): Path<String>,
) -> Result<Json<Vec<ChatMessage>>, ApiError> {
    rooms.history(&room).map(Json)
}

async fn post_message(
    State(rooms): State<Arc<ChatRooms>>,
    Path(room): Path<String>,
    Json(req): Json<PostMessage>,
) -> Result<(StatusCode, Json<ChatMessage>), ApiError> {
    let message = rooms.post(&room, &req.author, &req.body)?;
    tracing::debug!(room = %room, message_id = %message.id, "Chat message posted");
    Ok((StatusCode::CREATED, Json(message)))
}
