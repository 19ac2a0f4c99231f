/// Database row types. These map directly to SQLite rows.
/// Distinct from noor-types API models to keep the DB layer independent.

#[derive(Debug, Clone)]
pub struct SessionRow {
    pub id: i64,
    pub external_id: Option<i64>,
    pub group_id: Option<i64>,
    pub title: String,
    pub description: Option<String>,
    pub created_at: String,
    pub started_at: Option<String>,
    pub ended_at: Option<String>,
    pub expires_at: String,
    /// Computed in SQL: not ended and not past `expires_at`.
    pub is_active: bool,
}

#[derive(Debug, Clone)]
pub struct TokenRow {
    pub token: String,
    pub session_id: i64,
    pub role: String,
    pub created_at: String,
    pub expires_at: String,
    pub is_active: bool,
    pub access_count: i64,
    pub last_accessed_at: Option<String>,
}

#[derive(Debug, Clone)]
pub struct UserRow {
    pub user_id: String,
    pub name: String,
    pub email: Option<String>,
    pub country: Option<String>,
    pub city: Option<String>,
    pub created_at: String,
    pub modified_at: String,
}

#[derive(Debug, Clone)]
pub struct ParticipantRow {
    pub user_id: String,
    pub name: Option<String>,
    pub country: Option<String>,
    pub city: Option<String>,
    pub joined_at: String,
}

#[derive(Debug, Clone)]
pub struct QuestionRow {
    pub id: i64,
    pub session_id: i64,
    pub user_id: String,
    /// From a LEFT JOIN on users; `None` when the author row is missing.
    pub user_name: Option<String>,
    pub text: String,
    pub status: String,
    pub vote_count: i64,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone)]
pub struct AnswerRow {
    pub id: i64,
    pub question_id: i64,
    pub text: String,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct SharedAssetRow {
    pub id: i64,
    pub share_id: String,
    pub session_id: i64,
    pub asset_type: String,
    pub selector: Option<String>,
    pub content: Option<String>,
    pub metadata: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct AnnotationRow {
    pub id: i64,
    pub session_id: i64,
    pub created_by: String,
    pub data: String,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BroadcastRow {
    pub id: i64,
    pub session_id: i64,
    pub content_type: String,
    pub content: String,
    pub created_at: String,
}
