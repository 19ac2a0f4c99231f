//! Row -> response conversions. Corrupt stored values are logged and replaced
//! with defaults rather than failing the whole listing.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tracing::warn;
use uuid::Uuid;

use noor_db::models::{
    AnnotationRow, AnswerRow, BroadcastRow, ParticipantRow, QuestionRow, SessionRow, SharedAssetRow,
};
use noor_types::api::{
    AnnotationResponse, AnswerResponse, ContentBroadcastResponse, ParticipantResponse, QuestionResponse,
    SessionInfo, SessionStatus, SharedAssetResponse,
};
use noor_types::models::{ContentType, QuestionStatus, Role, resolve_display_name};

pub(crate) fn timestamp(raw: &str, what: &str) -> DateTime<Utc> {
    noor_db::parse_timestamp(raw).unwrap_or_else(|| {
        warn!("Corrupt {} '{}'", what, raw);
        DateTime::default()
    })
}

fn uuid(raw: &str, what: &str) -> Uuid {
    raw.parse().unwrap_or_else(|e| {
        warn!("Corrupt {} '{}': {}", what, raw, e);
        Uuid::default()
    })
}

fn json_value(raw: &str, what: &str) -> serde_json::Value {
    serde_json::from_str(raw).unwrap_or_else(|e| {
        warn!("Corrupt {} JSON: {}", what, e);
        serde_json::Value::Null
    })
}

pub(crate) fn session_status(row: &SessionRow) -> SessionStatus {
    match &row.ended_at {
        // The expiry sweep stamps ended_at = expires_at
        Some(ended) if *ended == row.expires_at => SessionStatus::Expired,
        Some(_) => SessionStatus::Ended,
        None if !row.is_active => SessionStatus::Expired,
        None if row.started_at.is_some() => SessionStatus::Active,
        None => SessionStatus::Created,
    }
}

pub(crate) fn session_info(row: &SessionRow, role: Role, participant_count: usize) -> SessionInfo {
    SessionInfo {
        session_id: row.id,
        external_id: row.external_id,
        group_id: row.group_id,
        title: row.title.clone(),
        description: row.description.clone(),
        role,
        status: session_status(row),
        started_at: row.started_at.as_deref().map(|t| timestamp(t, "session started_at")),
        ended_at: row.ended_at.as_deref().map(|t| timestamp(t, "session ended_at")),
        expires_at: timestamp(&row.expires_at, "session expires_at"),
        participant_count,
    }
}

pub(crate) fn participant(row: ParticipantRow) -> ParticipantResponse {
    ParticipantResponse {
        user_id: uuid(&row.user_id, "registration user_id"),
        display_name: resolve_display_name(row.name.as_deref()),
        joined_at: timestamp(&row.joined_at, "registration joined_at"),
        country: row.country,
        city: row.city,
    }
}

pub(crate) fn answer(row: AnswerRow) -> AnswerResponse {
    AnswerResponse {
        id: row.id,
        created_at: timestamp(&row.created_at, "answer created_at"),
        text: row.text,
    }
}

/// Attach answers (grouped by question id) to their questions.
pub(crate) fn questions(rows: Vec<QuestionRow>, answers: Vec<AnswerRow>) -> Vec<QuestionResponse> {
    let mut by_question: HashMap<i64, Vec<AnswerResponse>> = HashMap::new();
    for a in answers {
        by_question.entry(a.question_id).or_default().push(answer(a));
    }

    rows.into_iter()
        .map(|row| {
            let answers = by_question.remove(&row.id).unwrap_or_default();
            question(row, answers)
        })
        .collect()
}

pub(crate) fn question(row: QuestionRow, answers: Vec<AnswerResponse>) -> QuestionResponse {
    let status = row.status.parse::<QuestionStatus>().unwrap_or_else(|e| {
        warn!("Corrupt status on question {}: {}", row.id, e);
        QuestionStatus::Queued
    });

    QuestionResponse {
        question_id: row.id,
        session_id: row.session_id,
        user_id: uuid(&row.user_id, "question user_id"),
        user_name: resolve_display_name(row.user_name.as_deref()),
        status,
        vote_count: row.vote_count,
        created_at: timestamp(&row.created_at, "question created_at"),
        text: row.text,
        answers,
    }
}

pub(crate) fn shared_asset(row: SharedAssetRow) -> SharedAssetResponse {
    SharedAssetResponse {
        share_id: uuid(&row.share_id, "share_id"),
        session_id: row.session_id,
        metadata: row.metadata.as_deref().map(|m| json_value(m, "asset metadata")),
        created_at: timestamp(&row.created_at, "asset created_at"),
        asset_type: row.asset_type,
        selector: row.selector,
        test_content: row.content,
    }
}

pub(crate) fn annotation(row: AnnotationRow) -> AnnotationResponse {
    AnnotationResponse {
        id: row.id,
        session_id: row.session_id,
        data: json_value(&row.data, "annotation"),
        created_at: timestamp(&row.created_at, "annotation created_at"),
        created_by: row.created_by,
    }
}

pub(crate) fn broadcast(row: BroadcastRow) -> ContentBroadcastResponse {
    let content_type = row.content_type.parse::<ContentType>().unwrap_or_else(|e| {
        warn!("Corrupt content_type on broadcast {}: {}", row.id, e);
        ContentType::Text
    });

    ContentBroadcastResponse {
        id: row.id,
        session_id: row.session_id,
        content_type,
        created_at: timestamp(&row.created_at, "broadcast created_at"),
        content: row.content,
    }
}
