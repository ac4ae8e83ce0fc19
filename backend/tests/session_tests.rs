// tests/session_tests.rs

use backend::{config::Config, routes, state::AppState};
use serde_json::{Value, json};

/// Spawns the app backed by the in-memory store.
async fn spawn_app() -> String {
    let state = AppState::in_memory(Config::in_memory("session_test_secret"));
    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    address
}

struct TestClient {
    client: reqwest::Client,
    address: String,
}

impl TestClient {
    async fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            address: spawn_app().await,
        }
    }

    async fn user(&self, prefix: &str, is_examiner: bool) -> (String, String) {
        let username = format!("{}_{}", prefix, &uuid::Uuid::new_v4().to_string()[..8]);
        self.client
            .post(format!("{}/api/auth/register", self.address))
            .json(&json!({
                "username": username,
                "password": "password123",
                "is_examiner": is_examiner
            }))
            .send()
            .await
            .expect("Register failed");

        let login: Value = self
            .client
            .post(format!("{}/api/auth/login", self.address))
            .json(&json!({ "username": username, "password": "password123" }))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        (username, login["token"].as_str().unwrap().to_string())
    }

    async fn post(&self, path: &str, token: &str, body: Value) -> reqwest::Response {
        self.client
            .post(format!("{}{}", self.address, path))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .expect("Request failed")
    }

    async fn get(&self, path: &str, token: Option<&str>) -> reqwest::Response {
        let mut request = self.client.get(format!("{}{}", self.address, path));
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        request.send().await.expect("Request failed")
    }

    /// Creates a published quiz whose answer key is option 0 for every question.
    async fn quiz(&self, token: &str, title: &str, questions: usize) -> String {
        let questions: Vec<Value> = (0..questions)
            .map(|i| {
                json!({
                    "id": format!("q{}", i + 1),
                    "question": format!("Question number {}", i + 1),
                    "options": ["right", "wrong", "also wrong"],
                    "correct_option_index": 0
                })
            })
            .collect();
        let quiz: Value = self
            .post(
                "/api/quizzes",
                token,
                json!({
                    "title": title,
                    "description": "integration quiz",
                    "is_published": true,
                    "questions": questions
                }),
            )
            .await
            .json()
            .await
            .unwrap();
        quiz["id"].as_str().unwrap().to_string()
    }

    /// Takes `quiz_id`, answering question i with `answers[i]`, and submits.
    async fn take(&self, token: &str, quiz_id: &str, answers: &[usize]) -> Value {
        let started: Value = self
            .post("/api/sessions", token, json!({ "quiz_id": quiz_id }))
            .await
            .json()
            .await
            .unwrap();
        let session_id = started["session_id"].as_str().unwrap().to_string();

        for (i, index) in answers.iter().enumerate() {
            if i > 0 {
                self.post(&format!("/api/sessions/{}/next", session_id), token, json!({}))
                    .await;
            }
            self.post(
                &format!("/api/sessions/{}/select", session_id),
                token,
                json!({ "index": index }),
            )
            .await;
        }

        self.post(&format!("/api/sessions/{}/submit", session_id), token, json!({}))
            .await
            .json()
            .await
            .unwrap()
    }
}

#[tokio::test]
async fn session_start_navigate_and_submit() {
    let app = TestClient::new().await;
    let (_, author) = app.user("ex", true).await;
    let (_, taker) = app.user("u", false).await;
    let quiz_id = app.quiz(&author, "Navigation", 3).await;

    let response = app
        .post("/api/sessions", &taker, json!({ "quiz_id": quiz_id }))
        .await;
    assert_eq!(response.status().as_u16(), 201);
    let started: Value = response.json().await.unwrap();
    assert_eq!(started["state"], "in_progress");
    assert_eq!(started["remaining_seconds"], 90);
    assert_eq!(started["question_count"], 3);
    assert!(started["current_question"].get("correct_option_index").is_none());
    let session_id = started["session_id"].as_str().unwrap();

    let base = format!("/api/sessions/{}", session_id);
    app.post(&format!("{}/select", base), &taker, json!({ "index": 0 }))
        .await;
    app.post(&format!("{}/next", base), &taker, json!({})).await;
    app.post(&format!("{}/select", base), &taker, json!({ "index": 2 }))
        .await;
    let back: Value = app
        .post(&format!("{}/prev", base), &taker, json!({}))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(back["cursor"], 0);
    assert_eq!(back["selections"], json!([0, 2, null]));

    let out_of_range = app
        .post(&format!("{}/select", base), &taker, json!({ "index": 9 }))
        .await;
    assert_eq!(out_of_range.status().as_u16(), 400);

    let done: Value = app
        .post(&format!("{}/submit", base), &taker, json!({}))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(done["state"], "completed");
    assert_eq!(done["finalized_by"], "manual");
    assert_eq!(done["result"]["score"], 1);
    assert_eq!(done["result"]["max_score"], 3);
    assert_eq!(done["result"]["percentage"], 33);
    assert_eq!(done["result"]["grade"], "needs_practice");

    // A second submit is a no-op.
    let again: Value = app
        .post(&format!("{}/submit", base), &taker, json!({}))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(again["result"]["attempt_id"], done["result"]["attempt_id"]);

    let attempts: Vec<Value> = app
        .get("/api/attempts/me", Some(&taker))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(attempts.len(), 1);
    assert_eq!(attempts[0]["answers"][2]["selected_option_index"], Value::Null);
}

#[tokio::test]
async fn unknown_quiz_cannot_be_started() {
    let app = TestClient::new().await;
    let (_, taker) = app.user("u", false).await;
    let response = app
        .post("/api/sessions", &taker, json!({ "quiz_id": "quiz-missing" }))
        .await;
    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn other_users_cannot_drive_a_session() {
    let app = TestClient::new().await;
    let (_, author) = app.user("ex", true).await;
    let (_, owner) = app.user("u", false).await;
    let (_, intruder) = app.user("x", false).await;
    let quiz_id = app.quiz(&author, "Private run", 2).await;

    let started: Value = app
        .post("/api/sessions", &owner, json!({ "quiz_id": quiz_id }))
        .await
        .json()
        .await
        .unwrap();
    let path = format!("/api/sessions/{}/submit", started["session_id"].as_str().unwrap());

    let response = app.post(&path, &intruder, json!({})).await;
    assert_eq!(response.status().as_u16(), 403);
}

#[tokio::test]
async fn restarting_abandons_previous_session() {
    let app = TestClient::new().await;
    let (_, author) = app.user("ex", true).await;
    let (_, taker) = app.user("u", false).await;
    let quiz_id = app.quiz(&author, "Retry", 2).await;

    let first: Value = app
        .post("/api/sessions", &taker, json!({ "quiz_id": quiz_id }))
        .await
        .json()
        .await
        .unwrap();
    app.post("/api/sessions", &taker, json!({ "quiz_id": quiz_id }))
        .await;

    let old = app
        .get(
            &format!("/api/sessions/{}", first["session_id"].as_str().unwrap()),
            Some(&taker),
        )
        .await;
    assert_eq!(old.status().as_u16(), 404);
}

#[tokio::test]
async fn leaderboards_and_analytics_after_attempts() {
    let app = TestClient::new().await;
    let (_, author) = app.user("ex", true).await;
    let (alice, alice_token) = app.user("alice", false).await;
    let (bob, bob_token) = app.user("bob", false).await;

    let rust = app.quiz(&author, "Rust basics", 2).await;
    let tokio = app.quiz(&author, "Tokio basics", 2).await;

    app.take(&alice_token, &rust, &[0, 1]).await;
    app.take(&alice_token, &rust, &[0, 0]).await;
    app.take(&alice_token, &rust, &[1, 1]).await;
    app.take(&bob_token, &rust, &[0, 1]).await;
    app.take(&bob_token, &tokio, &[0, 0]).await;

    let board: Value = app
        .get(&format!("/api/leaderboard?quiz={}", rust), None)
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(board["scope"], "per_quiz");
    let entries = board["entries"].as_array().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["username"], alice.as_str());
    assert_eq!(entries[0]["score"], 2);
    assert_eq!(entries[1]["username"], bob.as_str());

    let overall: Value = app
        .get("/api/leaderboard?quiz=all", None)
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(overall["scope"], "cross_quiz");
    let entries = overall["entries"].as_array().unwrap();
    assert_eq!(entries[0]["username"], alice.as_str());
    assert_eq!(entries[0]["ratio"], 1.0);
    assert_eq!(entries[1]["username"], bob.as_str());
    assert_eq!(entries[1]["quiz_count"], 2);
    assert_eq!(entries[1]["total_score"], 3);

    let searched: Value = app
        .get(&format!("/api/leaderboard?quiz=all&search={}", &bob[..6]), None)
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(searched["entries"].as_array().unwrap().len(), 1);

    let snapshot: Value = app
        .get(&format!("/api/analytics?quiz_id={}", rust), Some(&author))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(snapshot["total_quizzes"], 2);
    assert_eq!(snapshot["total_attempts"], 4);
    assert_eq!(snapshot["most_popular_quiz"], "Rust basics");
    assert_eq!(snapshot["hardest_question"], "Question number 2");
    assert_eq!(snapshot["recent_attempts"].as_array().unwrap().len(), 4);

    let foreign = app
        .get(&format!("/api/analytics?quiz_id={}", rust), Some(&alice_token))
        .await;
    assert_eq!(foreign.status().as_u16(), 404);

    let edit = app
        .client
        .put(format!("{}/api/quizzes/{}", app.address, rust))
        .bearer_auth(&author)
        .json(&json!({
            "questions": [
                { "id": "q1", "question": "Only one left", "options": ["a", "b"], "correct_option_index": 0 }
            ]
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(edit.status().as_u16(), 409);
}
