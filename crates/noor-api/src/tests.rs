use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;
use uuid::Uuid;

use noor_db::{Database, UserProfile};
use noor_gateway::Dispatcher;
use noor_types::models::{ANONYMOUS_NAME, Role};

use crate::{AppState, AppStateInner, Settings, router};

const ADMIN_KEY: &str = "test-admin-key";

struct Harness {
    app: Router,
    state: AppState,
}

struct TestSession {
    id: i64,
    host: String,
    user: String,
}

impl Harness {
    fn new() -> Self {
        let state = AppStateInner::new(
            Database::open_in_memory().unwrap(),
            Dispatcher::new(),
            Settings {
                admin_key: ADMIN_KEY.into(),
                token_ttl_hours: 24,
            },
        );
        Self {
            app: router(state.clone()),
            state,
        }
    }

    async fn call(&self, method: &str, uri: &str, body: Option<Value>, auth: Option<&str>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(key) = auth {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", key));
        }
        let request = match body {
            Some(b) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(b.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.call("POST", uri, Some(body), None).await
    }

    async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.call("GET", uri, None, None).await
    }

    async fn session(&self, title: &str) -> TestSession {
        let (status, body) = self
            .call(
                "POST",
                "/api/host/generate-token",
                Some(json!({ "title": title })),
                Some(ADMIN_KEY),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        TestSession {
            id: body["sessionId"].as_i64().unwrap(),
            host: body["hostToken"].as_str().unwrap().to_string(),
            user: body["userToken"].as_str().unwrap().to_string(),
        }
    }

    async fn register(&self, token: &str, name: &str) -> Uuid {
        let (status, body) = self
            .post("/api/participant/register", json!({ "token": token, "name": name }))
            .await;
        assert_eq!(status, StatusCode::OK, "{}", body);
        body["userId"].as_str().unwrap().parse().unwrap()
    }

    async fn ask(&self, token: &str, user_id: Uuid, text: &str) -> (StatusCode, Value) {
        self.post(
            "/api/participant/questions",
            json!({ "token": token, "userId": user_id, "text": text }),
        )
        .await
    }
}

#[tokio::test]
async fn token_generation_requires_admin_key() {
    let h = Harness::new();
    let body = json!({ "title": "Tafsir" });

    let (status, _) = h.call("POST", "/api/host/generate-token", Some(body.clone()), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = h
        .call("POST", "/api/host/generate-token", Some(body), Some("wrong"))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let s = h.session("Tafsir").await;
    assert_eq!(s.host.len(), 8);
    assert_eq!(s.user.len(), 8);
    assert_ne!(s.host, s.user);
    assert!(s.host.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
}

#[tokio::test]
async fn generate_token_reuses_session_for_external_id() {
    let h = Harness::new();
    let body = json!({ "title": "Tafsir", "externalId": 212, "groupId": 18 });

    let (first_status, first) = h
        .call("POST", "/api/host/generate-token", Some(body.clone()), Some(ADMIN_KEY))
        .await;
    let (second_status, second) = h
        .call("POST", "/api/host/generate-token", Some(body), Some(ADMIN_KEY))
        .await;

    assert_eq!(first_status, StatusCode::CREATED);
    assert_eq!(second_status, StatusCode::OK);
    assert_eq!(first["sessionId"], second["sessionId"]);
    assert_eq!(first["hostToken"], second["hostToken"]);
    assert_eq!(first["userToken"], second["userToken"]);
}

#[tokio::test]
async fn unknown_and_expired_tokens_are_rejected_everywhere() {
    let h = Harness::new();
    let s = h.session("Tafsir").await;
    h.state.db.insert_token("EXPRD234", s.id, Role::Participant, -1).unwrap();
    h.state.db.insert_token("EXPRDH34", s.id, Role::Host, -1).unwrap();

    let user = Uuid::new_v4();
    for (participant_token, host_token) in [("ZZZZZZZZ", "YYYYYYYY"), ("EXPRD234", "EXPRDH34"), ("bad", "bad")] {
        let t = participant_token;
        let checks = vec![
            h.post("/api/participant/validate-session", json!({ "token": t })).await,
            h.post("/api/participant/register", json!({ "token": t, "name": "Amina" })).await,
            h.get(&format!("/api/participant/participants/{}", t)).await,
            h.ask(t, user, "Why?").await,
            h.get(&format!("/api/participant/questions/{}", t)).await,
            h.post("/api/participant/vote", json!({ "token": t, "userId": user, "questionId": 1 })).await,
            h.get(&format!("/api/participant/assets/{}", t)).await,
            h.get(&format!("/api/annotations/{}", t)).await,
        ];
        let ht = host_token;
        let host_checks = vec![
            h.post("/api/host/validate", json!({ "hostToken": ht })).await,
            h.post("/api/host/session/start", json!({ "hostToken": ht })).await,
            h.post("/api/host/session/end", json!({ "hostToken": ht })).await,
            h.post("/api/host/revoke-tokens", json!({ "hostToken": ht })).await,
            h.post(
                "/api/host/broadcast",
                json!({ "hostToken": ht, "content": "hi", "contentType": "Text" }),
            )
            .await,
            h.post(
                "/api/host/share-asset",
                json!({ "hostToken": ht, "assetType": "card", "testContent": "<p/>" }),
            )
            .await,
            h.get(&format!("/api/host/questions/{}", ht)).await,
            h.post("/api/host/annotations", json!({ "hostToken": ht, "data": { "x": 1 } })).await,
        ];

        for (status, body) in checks.into_iter().chain(host_checks) {
            assert_eq!(status, StatusCode::BAD_REQUEST, "token {}: {}", t, body);
            assert_eq!(body["error"], "invalid or expired token");
        }
    }

    // Nothing above touched the real session
    let (status, body) = h.post("/api/host/validate", json!({ "hostToken": s.host })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "Created");
}

#[tokio::test]
async fn tokens_only_work_for_their_own_role() {
    let h = Harness::new();
    let s = h.session("Tafsir").await;

    let (status, _) = h.post("/api/host/validate", json!({ "hostToken": s.user })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = h.post("/api/participant/validate-session", json!({ "token": s.host })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = h.post("/api/participant/validate-session", json!({ "token": s.user })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["sessionId"], s.id);
    assert_eq!(body["role"], "Participant");
}

#[tokio::test]
async fn lowercase_token_resolves_and_counts_access() {
    let h = Harness::new();
    let s = h.session("Tafsir").await;

    for _ in 0..2 {
        let (status, _) = h
            .post("/api/participant/validate-session", json!({ "token": s.user.to_lowercase() }))
            .await;
        assert_eq!(status, StatusCode::OK);
    }

    let row = h.state.db.get_token(&s.user).unwrap().unwrap();
    assert_eq!(row.access_count, 2);
    assert!(row.last_accessed_at.is_some());
}

#[tokio::test]
async fn broadcasts_are_visible_only_in_their_session() {
    let h = Harness::new();
    let a = h.session("A").await;
    let b = h.session("B").await;

    let (status, created) = h
        .post(
            "/api/host/broadcast",
            json!({
                "hostToken": a.host,
                "content": "<h2>Ayat al-Kursi</h2><script>steal()</script>",
                "contentType": "Html"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", created);
    assert_eq!(created["content"], "<h2>Ayat al-Kursi</h2>");

    let (status, listed_a) = h.get(&format!("/api/contentbroadcast/session/{}", a.id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed_a.as_array().unwrap().len(), 1);
    assert_eq!(listed_a[0]["id"], created["id"]);

    let (_, listed_b) = h.get(&format!("/api/contentbroadcast/session/{}", b.id)).await;
    assert!(listed_b.as_array().unwrap().is_empty());

    // Re-fetching without a new write is stable
    let (_, again) = h.get(&format!("/api/contentbroadcast/session/{}", a.id)).await;
    assert_eq!(listed_a, again);

    let (status, _) = h.get("/api/contentbroadcast/session/999999").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn broadcast_is_published_after_it_is_stored() {
    let h = Harness::new();
    let s = h.session("Tafsir").await;
    let mut rx = h.state.dispatcher.subscribe();

    let (status, created) = h
        .post(
            "/api/host/broadcast",
            json!({ "hostToken": s.host, "content": "Welcome", "contentType": "Text" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let envelope = rx.try_recv().unwrap();
    assert!(envelope.is_for(s.id));
    let event: Value = serde_json::from_str(&envelope.json).unwrap();
    assert_eq!(event["type"], "ContentBroadcast");
    assert_eq!(event["data"]["broadcastId"], created["id"]);
    assert_eq!(event["data"]["content"], "Welcome");
}

#[tokio::test]
async fn question_length_limit_is_inclusive() {
    let h = Harness::new();
    let s = h.session("Tafsir").await;
    let user = h.register(&s.user, "Amina").await;

    let (status, body) = h.ask(&s.user, user, &"q".repeat(280)).await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    assert_eq!(body["status"], "Queued");
    assert_eq!(body["userName"], "Amina");

    let (status, _) = h.ask(&s.user, user, &"q".repeat(281)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, listed) = h.get(&format!("/api/participant/questions/{}", s.user)).await;
    assert_eq!(listed.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn new_question_notifies_the_session_group() {
    let h = Harness::new();
    let s = h.session("Tafsir").await;
    let user = h.register(&s.user, "Amina").await;
    let mut rx = h.state.dispatcher.subscribe();

    let (status, created) = h.ask(&s.user, user, "What is tawakkul?").await;
    assert_eq!(status, StatusCode::CREATED);

    let envelope = rx.try_recv().unwrap();
    assert!(envelope.is_for(s.id));
    let event: Value = serde_json::from_str(&envelope.json).unwrap();
    assert_eq!(event["type"], "NewQuestion");
    assert_eq!(event["data"]["questionId"], created["questionId"]);
    assert_eq!(event["data"]["questionText"], "What is tawakkul?");
    assert_eq!(event["data"]["userName"], "Amina");
}

#[tokio::test]
async fn unregistered_participant_cannot_ask() {
    let h = Harness::new();
    let s = h.session("Tafsir").await;

    let (status, body) = h.ask(&s.user, Uuid::new_v4(), "Hello?").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "participant is not registered in this session");
}

#[tokio::test]
async fn ended_session_rejects_questions() {
    let h = Harness::new();
    let s = h.session("Tafsir").await;
    let user = h.register(&s.user, "Amina").await;

    let (status, body) = h.post("/api/host/session/end", json!({ "hostToken": s.host })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "Ended");

    let (status, body) = h.ask(&s.user, user, "Too late?").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "session is not active");

    // Reads still work
    let (status, body) = h.post("/api/participant/validate-session", json!({ "token": s.user })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "Ended");
}

#[tokio::test]
async fn duplicate_vote_is_a_conflict() {
    let h = Harness::new();
    let s = h.session("Tafsir").await;
    let author = h.register(&s.user, "Amina").await;
    let voter = h.register(&s.user, "Bilal").await;
    let (_, q) = h.ask(&s.user, author, "Question").await;
    let qid = q["questionId"].as_i64().unwrap();

    let vote = json!({ "token": s.user, "userId": voter, "questionId": qid });
    let (status, body) = h.post("/api/participant/vote", vote.clone()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["voteCount"], 1);

    let (status, _) = h.post("/api/participant/vote", vote).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, listed) = h.get(&format!("/api/participant/questions/{}", s.user)).await;
    assert_eq!(listed[0]["voteCount"], 1);

    let (status, _) = h
        .post(
            "/api/participant/vote",
            json!({ "token": s.user, "userId": voter, "questionId": 424242 }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn host_moderation_hides_and_answers() {
    let h = Harness::new();
    let s = h.session("Tafsir").await;
    let user = h.register(&s.user, "Amina").await;
    let (_, keep) = h.ask(&s.user, user, "Keep me").await;
    let (_, hide) = h.ask(&s.user, user, "Hide me").await;

    let (status, body) = h
        .post(
            "/api/host/question-status",
            json!({ "hostToken": s.host, "questionId": hide["questionId"], "status": "Hidden" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "Hidden");

    let (status, answer) = h
        .post(
            "/api/host/answer",
            json!({ "hostToken": s.host, "questionId": keep["questionId"], "text": "Answered live." }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(answer["text"], "Answered live.");

    let (_, participant_view) = h.get(&format!("/api/participant/questions/{}", s.user)).await;
    let participant_view = participant_view.as_array().unwrap();
    assert_eq!(participant_view.len(), 1);
    assert_eq!(participant_view[0]["status"], "Answered");
    assert_eq!(participant_view[0]["answers"][0]["text"], "Answered live.");

    let (_, host_view) = h.get(&format!("/api/host/questions/{}", s.host)).await;
    assert_eq!(host_view.as_array().unwrap().len(), 2);

    // Answered questions are closed for voting
    let (status, _) = h
        .post(
            "/api/participant/vote",
            json!({ "token": s.user, "userId": user, "questionId": keep["questionId"] }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn questions_from_another_session_are_not_found() {
    let h = Harness::new();
    let a = h.session("A").await;
    let b = h.session("B").await;
    let user = h.register(&a.user, "Amina").await;
    let (_, q) = h.ask(&a.user, user, "Question").await;

    let (status, _) = h
        .post(
            "/api/host/question-status",
            json!({ "hostToken": b.host, "questionId": q["questionId"], "status": "Selected" }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn roster_resolves_display_names_with_fallback() {
    let h = Harness::new();
    let s = h.session("Tafsir").await;
    h.register(&s.user, "  Amina ").await;

    // A legacy row with a blank name
    let blank = Uuid::new_v4().to_string();
    h.state
        .db
        .upsert_user(&blank, &UserProfile { name: "   ", ..Default::default() })
        .unwrap();
    h.state.db.register_participant(s.id, &blank).unwrap();

    let (status, roster) = h.get(&format!("/api/participant/participants/{}", s.host)).await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = roster
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["displayName"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Amina", ANONYMOUS_NAME]);
}

#[tokio::test]
async fn rejoin_keeps_identity() {
    let h = Harness::new();
    let s = h.session("Tafsir").await;
    let user = h.register(&s.user, "Amina").await;

    let (status, body) = h
        .post(
            "/api/participant/register",
            json!({ "token": s.user, "name": "Amina K.", "userId": user, "city": "Lahore" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["rejoined"], true);
    assert_eq!(body["userId"], user.to_string());
    assert_eq!(body["displayName"], "Amina K.");

    let (_, roster) = h.get(&format!("/api/participant/participants/{}", s.user)).await;
    assert_eq!(roster.as_array().unwrap().len(), 1);
    assert_eq!(roster[0]["city"], "Lahore");
}

#[tokio::test]
async fn both_asset_shapes_are_accepted() {
    let h = Harness::new();
    let s = h.session("Tafsir").await;

    let (status, inline) = h
        .post(
            "/api/host/share-asset",
            json!({ "hostToken": s.host, "assetType": "ayah-card", "testContent": "<p>2:255</p>" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", inline);
    assert_eq!(inline["testContent"], "<p>2:255</p>");

    let (status, by_selector) = h
        .post(
            "/api/host/share-asset",
            json!({
                "hostToken": s.host,
                "assetType": "etymology-card",
                "selector": "#root-sbr",
                "metadata": { "root": "ص ب ر" }
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(by_selector["metadata"]["root"], "ص ب ر");
    assert!(by_selector["testContent"].is_null());

    let (status, _) = h
        .post("/api/host/share-asset", json!({ "hostToken": s.host, "assetType": "empty" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, assets) = h.get(&format!("/api/participant/assets/{}", s.user)).await;
    assert_eq!(assets.as_array().unwrap().len(), 2);

    let delete = json!({ "hostToken": s.host, "shareId": inline["shareId"] });
    let (status, _) = h.post("/api/host/delete-asset", delete.clone()).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = h.post("/api/host/delete-asset", delete).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, assets) = h.get(&format!("/api/participant/assets/{}", s.user)).await;
    assert_eq!(assets.as_array().unwrap().len(), 1);
    assert_eq!(assets[0]["shareId"], by_selector["shareId"]);
}

#[tokio::test]
async fn annotations_round_trip_through_the_api() {
    let h = Harness::new();
    let s = h.session("Tafsir").await;

    let (status, note) = h
        .post(
            "/api/host/annotations",
            json!({ "hostToken": s.host, "data": { "type": "highlight", "range": [3, 9] } }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, listed) = h.get(&format!("/api/annotations/{}", s.user)).await;
    assert_eq!(listed[0]["data"]["type"], "highlight");

    let (status, _) = h
        .post(
            "/api/host/delete-annotation",
            json!({ "hostToken": s.host, "annotationId": note["id"] }),
        )
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (_, listed) = h.get(&format!("/api/annotations/{}", s.user)).await;
    assert!(listed.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn session_start_is_announced_once() {
    let h = Harness::new();
    let s = h.session("Tafsir").await;
    let mut rx = h.state.dispatcher.subscribe();

    let (status, body) = h.post("/api/host/session/start", json!({ "hostToken": s.host })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "Active");
    assert!(body["startedAt"].is_string());
    h.post("/api/host/session/start", json!({ "hostToken": s.host })).await;

    let first = rx.try_recv().unwrap();
    assert!(first.json.contains("SessionStarted"));
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn revoked_tokens_stop_working() {
    let h = Harness::new();
    let s = h.session("Tafsir").await;

    let (status, body) = h.post("/api/host/revoke-tokens", json!({ "hostToken": s.host })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["revoked"], 2);

    let (status, _) = h.post("/api/participant/validate-session", json!({ "token": s.user })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn malformed_payloads_are_json_bad_requests() {
    let h = Harness::new();
    let s = h.session("Tafsir").await;
    let user = h.register(&s.user, "Amina").await;

    let cases = [
        // missing field
        ("/api/participant/questions", json!({ "token": s.user, "userId": user })),
        // unknown enum variant
        (
            "/api/host/broadcast",
            json!({ "hostToken": s.host, "content": "hi", "contentType": "Markdown" }),
        ),
        // unknown field
        ("/api/host/validate", json!({ "hostToken": s.host, "extra": true })),
        // not a UUID
        (
            "/api/participant/vote",
            json!({ "token": s.user, "userId": "amina", "questionId": 1 }),
        ),
    ];

    for (uri, body) in cases {
        let (status, response) = h.post(uri, body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}: {}", uri, response);
        assert!(response["error"].is_string(), "{}: {}", uri, response);
    }

    let (status, response) = h
        .post("/api/participant/questions", json!({ "token": s.user, "userId": user }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(response["error"].as_str().unwrap().contains("text"));
}

#[tokio::test]
async fn non_json_body_and_bad_path_are_bad_requests() {
    let h = Harness::new();

    let request = Request::builder()
        .method("POST")
        .uri("/api/participant/validate-session")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = h.app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert!(body["error"].is_string());

    let (status, body) = h.get("/api/contentbroadcast/session/not-a-number").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn admin_key_must_match_exactly() {
    let h = Harness::new();
    let body = json!({ "title": "Tafsir" });
    let same_length = "x".repeat(ADMIN_KEY.len());

    for key in [same_length.as_str(), &ADMIN_KEY[..ADMIN_KEY.len() - 1], "", "TEST-ADMIN-KEY"] {
        let (status, response) = h
            .call("POST", "/api/host/generate-token", Some(body.clone()), Some(key))
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "key {:?}", key);
        assert_eq!(response["error"], "unauthorized");
    }
}
