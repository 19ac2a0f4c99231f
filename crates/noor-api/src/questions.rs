use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use tracing::{debug, info};

use noor_db::VoteOutcome;
use noor_db::models::QuestionRow;
use noor_types::api::{
    AnswerQuestionRequest, QuestionResponse, QuestionStatusRequest, SubmitQuestionRequest, VoteRequest,
    VoteResponse,
};
use noor_types::events::SessionEvent;
use noor_types::models::{MAX_QUESTION_CHARS, QuestionStatus, Role};

use crate::error::ApiError;
use crate::extract::{ApiJson, ApiPath};
use crate::state::{AppState, run_db};
use crate::tokens::{authorize, authorize_mutation};
use crate::views;

const MAX_ANSWER_CHARS: usize = 2000;

/// Trim and length-check question text. Exactly [`MAX_QUESTION_CHARS`] is accepted.
pub fn validate_question_text(raw: &str) -> Result<String, ApiError> {
    let text = raw.trim();
    if text.is_empty() {
        return Err(ApiError::bad_request("question text is empty"));
    }
    let len = text.chars().count();
    if len > MAX_QUESTION_CHARS {
        return Err(ApiError::bad_request(format!(
            "question is {} characters, the limit is {}",
            len, MAX_QUESTION_CHARS
        )));
    }
    Ok(text.to_string())
}

/// Load a question and check it belongs to the caller's session.
async fn question_in_session(state: &AppState, question_id: i64, session_id: i64) -> Result<QuestionRow, ApiError> {
    run_db(state, move |db| db.get_question(question_id))
        .await?
        .filter(|q| q.session_id == session_id)
        .ok_or(ApiError::NotFound("question"))
}

async fn list(state: &AppState, session_id: i64, include_hidden: bool) -> Result<Vec<QuestionResponse>, ApiError> {
    let (rows, answers) = run_db(state, move |db| {
        let rows = db.list_questions(session_id, include_hidden)?;
        let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
        let answers = db.get_answers_for_questions(&ids)?;
        Ok((rows, answers))
    })
    .await?;

    Ok(views::questions(rows, answers))
}

/// POST /api/participant/questions
pub async fn submit_question(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<SubmitQuestionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let auth = authorize_mutation(&state, &req.token, Role::Participant).await?;
    let sid = auth.session.id;
    let text = validate_question_text(&req.text)?;
    let uid = req.user_id.to_string();

    let row = run_db(&state, move |db| {
        if !db.is_registered(sid, &uid)? {
            return Ok(None);
        }
        let id = db.insert_question(sid, &uid, &text)?;
        db.get_question(id)
    })
    .await?
    .ok_or_else(|| ApiError::bad_request("participant is not registered in this session"))?;

    let question = views::question(row, vec![]);
    info!("Question {} submitted in session {}", question.question_id, sid);

    state.dispatcher.publish(
        sid,
        &SessionEvent::NewQuestion {
            question_id: question.question_id,
            question_text: question.text.clone(),
            user_id: question.user_id,
            user_name: question.user_name.clone(),
            timestamp: question.created_at,
        },
    );

    Ok((StatusCode::CREATED, Json(question)))
}

/// GET /api/participant/questions/{token}: everything except hidden questions.
pub async fn list_for_participant(
    State(state): State<AppState>,
    ApiPath(token): ApiPath<String>,
) -> Result<impl IntoResponse, ApiError> {
    let auth = authorize(&state, &token, Some(Role::Participant)).await?;
    Ok(Json(list(&state, auth.session.id, false).await?))
}

/// GET /api/host/questions/{hostToken}: the full moderation queue.
pub async fn list_for_host(
    State(state): State<AppState>,
    ApiPath(token): ApiPath<String>,
) -> Result<impl IntoResponse, ApiError> {
    let auth = authorize(&state, &token, Some(Role::Host)).await?;
    Ok(Json(list(&state, auth.session.id, true).await?))
}

/// POST /api/participant/vote: one vote per participant per question.
pub async fn vote(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<VoteRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let auth = authorize_mutation(&state, &req.token, Role::Participant).await?;
    let sid = auth.session.id;

    let question = question_in_session(&state, req.question_id, sid).await?;
    let status: QuestionStatus = question.status.parse().unwrap_or(QuestionStatus::Hidden);
    if !status.accepts_votes() {
        return Err(ApiError::bad_request("question is closed for voting"));
    }

    let uid = req.user_id.to_string();
    let qid = question.id;
    let outcome = run_db(&state, move |db| {
        if !db.is_registered(sid, &uid)? {
            return Ok(None);
        }
        db.add_vote(qid, &uid).map(Some)
    })
    .await?
    .ok_or_else(|| ApiError::bad_request("participant is not registered in this session"))?;

    let vote_count = match outcome {
        VoteOutcome::Counted(n) => n,
        VoteOutcome::Duplicate => {
            debug!("Duplicate vote on question {} by {}", qid, req.user_id);
            return Err(ApiError::Conflict("already voted on this question".into()));
        }
    };

    state.dispatcher.publish(
        sid,
        &SessionEvent::QuestionVoted {
            question_id: qid,
            vote_count,
        },
    );

    Ok(Json(VoteResponse {
        question_id: qid,
        vote_count,
    }))
}

/// POST /api/host/question-status
pub async fn set_status(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<QuestionStatusRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let auth = authorize_mutation(&state, &req.host_token, Role::Host).await?;
    let sid = auth.session.id;
    let question = question_in_session(&state, req.question_id, sid).await?;

    let qid = question.id;
    let status = req.status;
    let row = run_db(&state, move |db| {
        db.set_question_status(qid, status)?;
        db.get_question(qid)
    })
    .await?
    .ok_or(ApiError::NotFound("question"))?;

    state.dispatcher.publish(
        sid,
        &SessionEvent::QuestionStatusChanged {
            question_id: qid,
            status,
        },
    );

    Ok(Json(views::question(row, vec![])))
}

/// POST /api/host/answer: append an answer; the question becomes Answered.
pub async fn answer(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<AnswerQuestionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let auth = authorize_mutation(&state, &req.host_token, Role::Host).await?;
    let sid = auth.session.id;

    let text = req.text.trim().to_string();
    if text.is_empty() || text.chars().count() > MAX_ANSWER_CHARS {
        return Err(ApiError::bad_request("answer must be 1-2000 characters"));
    }

    let question = question_in_session(&state, req.question_id, sid).await?;
    let qid = question.id;
    let answer = run_db(&state, move |db| db.add_answer(qid, &text)).await?;
    let answer = views::answer(answer);

    state.dispatcher.publish(
        sid,
        &SessionEvent::QuestionAnswered {
            question_id: qid,
            answer_id: answer.id,
            answer_text: answer.text.clone(),
            timestamp: answer.created_at,
        },
    );

    Ok((StatusCode::CREATED, Json(answer)))
}
