use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{ContentType, QuestionStatus, Role};

// -- Errors --

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

// -- Tokens & sessions --

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct GenerateTokenRequest {
    /// Legacy session id; a second request with the same id reuses the session.
    pub external_id: Option<i64>,
    pub group_id: Option<i64>,
    pub title: String,
    pub description: Option<String>,
    pub ttl_hours: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateTokenResponse {
    pub session_id: i64,
    pub host_token: String,
    pub user_token: String,
    pub expires_at: DateTime<Utc>,
}

/// Body for endpoints that only need a participant (or any session) token.
#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TokenRequest {
    pub token: String,
}

/// Body for host endpoints that only need the host token.
#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct HostTokenRequest {
    pub host_token: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionStatus {
    Created,
    Active,
    Ended,
    Expired,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    pub session_id: i64,
    pub external_id: Option<i64>,
    pub group_id: Option<i64>,
    pub title: String,
    pub description: Option<String>,
    pub role: Role,
    pub status: SessionStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub expires_at: DateTime<Utc>,
    pub participant_count: usize,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevokeTokensResponse {
    pub revoked: usize,
}

// -- Shared assets --

/// Accepts both asset shapes seen from host panels: inline `testContent`,
/// or a `selector` with optional `metadata`.
#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ShareAssetRequest {
    pub host_token: String,
    pub asset_type: String,
    pub test_content: Option<String>,
    pub selector: Option<String>,
    pub metadata: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DeleteAssetRequest {
    pub host_token: String,
    pub share_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SharedAssetResponse {
    pub share_id: Uuid,
    pub session_id: i64,
    pub asset_type: String,
    pub selector: Option<String>,
    pub test_content: Option<String>,
    pub metadata: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

// -- Content broadcasts --

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct BroadcastRequest {
    pub host_token: String,
    pub content: String,
    pub content_type: ContentType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentBroadcastResponse {
    pub id: i64,
    pub session_id: i64,
    pub content_type: ContentType,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

// -- Participants --

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RegisterRequest {
    pub token: String,
    pub name: String,
    pub email: Option<String>,
    pub country: Option<String>,
    pub city: Option<String>,
    /// Present when a returning participant rejoins.
    pub user_id: Option<Uuid>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
    pub user_id: Uuid,
    pub session_id: i64,
    pub display_name: String,
    pub rejoined: bool,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantResponse {
    pub user_id: Uuid,
    pub display_name: String,
    pub country: Option<String>,
    pub city: Option<String>,
    pub joined_at: DateTime<Utc>,
}

// -- Questions --

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SubmitQuestionRequest {
    pub token: String,
    pub user_id: Uuid,
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerResponse {
    pub id: i64,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionResponse {
    pub question_id: i64,
    pub session_id: i64,
    pub user_id: Uuid,
    pub user_name: String,
    pub text: String,
    pub status: QuestionStatus,
    pub vote_count: i64,
    pub created_at: DateTime<Utc>,
    pub answers: Vec<AnswerResponse>,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct VoteRequest {
    pub token: String,
    pub user_id: Uuid,
    pub question_id: i64,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteResponse {
    pub question_id: i64,
    pub vote_count: i64,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct QuestionStatusRequest {
    pub host_token: String,
    pub question_id: i64,
    pub status: QuestionStatus,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AnswerQuestionRequest {
    pub host_token: String,
    pub question_id: i64,
    pub text: String,
}

// -- Annotations --

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AnnotationRequest {
    pub host_token: String,
    pub data: serde_json::Value,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DeleteAnnotationRequest {
    pub host_token: String,
    pub annotation_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotationResponse {
    pub id: i64,
    pub session_id: i64,
    pub created_by: String,
    pub data: serde_json::Value,
    pub created_at: DateTime<Utc>,
}
