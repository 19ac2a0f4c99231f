use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{ContentType, QuestionStatus, Role};

/// Events pushed over the gateway to every connection in a session group.
///
/// Wire shape is `{"type": "NewQuestion", "data": {"questionId": 7, ...}}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all_fields = "camelCase")]
pub enum SessionEvent {
    /// Sent to a single connection right after upgrade
    Ready { session_id: i64, role: Role },

    SessionStarted {
        session_id: i64,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    SessionEnded {
        session_id: i64,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Host shared an asset; either `test_content` or `selector` is set
    AssetShared {
        share_id: Uuid,
        asset_type: String,
        selector: Option<String>,
        test_content: Option<String>,
        metadata: Option<serde_json::Value>,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    AssetDeleted { share_id: Uuid },

    /// Host pushed HTML/text content to the canvas
    ContentBroadcast {
        broadcast_id: i64,
        content_type: ContentType,
        content: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    NewQuestion {
        question_id: i64,
        question_text: String,
        user_id: Uuid,
        user_name: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    QuestionStatusChanged {
        question_id: i64,
        status: QuestionStatus,
    },

    QuestionAnswered {
        question_id: i64,
        answer_id: i64,
        answer_text: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    QuestionVoted { question_id: i64, vote_count: i64 },

    ParticipantJoined { user_id: Uuid, user_name: String },

    AnnotationAdded {
        annotation_id: i64,
        data: serde_json::Value,
    },

    AnnotationDeleted { annotation_id: i64 },

    /// Live connection counts for the group
    PresenceUpdate {
        participant_count: usize,
        host_connected: bool,
    },
}

impl SessionEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Ready { .. } => "Ready",
            Self::SessionStarted { .. } => "SessionStarted",
            Self::SessionEnded { .. } => "SessionEnded",
            Self::AssetShared { .. } => "AssetShared",
            Self::AssetDeleted { .. } => "AssetDeleted",
            Self::ContentBroadcast { .. } => "ContentBroadcast",
            Self::NewQuestion { .. } => "NewQuestion",
            Self::QuestionStatusChanged { .. } => "QuestionStatusChanged",
            Self::QuestionAnswered { .. } => "QuestionAnswered",
            Self::QuestionVoted { .. } => "QuestionVoted",
            Self::ParticipantJoined { .. } => "ParticipantJoined",
            Self::AnnotationAdded { .. } => "AnnotationAdded",
            Self::AnnotationDeleted { .. } => "AnnotationDeleted",
            Self::PresenceUpdate { .. } => "PresenceUpdate",
        }
    }
}
