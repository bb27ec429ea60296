//! Fake content service: the REST endpoints and realtime socket the client
//! talks to, backed by an in-memory store.

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use chrono::Utc;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

pub const TOKEN: &str = "test-token";
/// Requests for this work get a 404
pub const MISSING_WORK: u64 = 999;
/// Requests for this work get a 503
pub const DOWN_WORK: u64 = 503;

#[derive(Default)]
pub struct Store {
    pub chapters: Vec<Value>,
    pub characters: Vec<Value>,
    pub next_id: u64,
    pub autosaves: Vec<(u64, String)>,
    pub request_ids: Vec<String>,
    pub task_polls: u32,
    pub ws_connections: u32,
    /// Close this many socket connections right after the upgrade
    pub ws_drop_first: u32,
}

pub type Shared = Arc<Mutex<Store>>;

pub struct TestServer {
    pub addr: SocketAddr,
    pub store: Shared,
    handle: JoinHandle<()>,
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

impl TestServer {
    pub fn api_url(&self) -> String {
        format!("http://{}/api/v1", self.addr)
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }

    pub fn chapter(&self, id: u64) -> Option<Value> {
        let store = self.store.lock().unwrap();
        store.chapters.iter().find(|c| c["chapterId"] == id).cloned()
    }
}

pub async fn start_test_server() -> TestServer {
    let store: Shared = Arc::new(Mutex::new(Store::default()));

    let app = Router::new()
        .route("/api/v1/works", get(list_works))
        .route(
            "/api/v1/works/{work}/chapters",
            get(list_chapters).post(create_chapter),
        )
        .route("/api/v1/works/{work}/chapters/reorder", put(reorder_chapters))
        .route(
            "/api/v1/works/{work}/chapters/{id}",
            get(get_chapter).put(update_chapter).delete(delete_chapter),
        )
        .route("/api/v1/works/{work}/chapters/{id}/autosave", post(autosave_chapter))
        .route(
            "/api/v1/works/{work}/characters",
            get(list_characters).post(create_character),
        )
        .route(
            "/api/v1/works/{work}/characters/{id}",
            put(update_character).delete(delete_character),
        )
        .route("/api/v1/ai/polish", post(submit_polish))
        .route("/api/v1/ai/tasks/{id}", get(task_status))
        .route("/ws", get(socket_upgrade))
        .with_state(store.clone());

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind listener");
    let addr = listener.local_addr().expect("Failed to get addr");

    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Server failed");
    });

    TestServer { addr, store, handle }
}

fn ok(data: Value) -> Response {
    Json(json!({ "code": 200, "message": "success", "data": data })).into_response()
}

fn ok_empty(message: &str) -> Response {
    Json(json!({ "code": 200, "message": message })).into_response()
}

fn fail(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "code": status.as_u16(), "message": message }))).into_response()
}

fn words(content: &str) -> usize {
    content
        .replace("<p>", "")
        .replace("</p>", "")
        .trim()
        .chars()
        .count()
}

/// Record the request id and check the bearer token
fn authorize(headers: &HeaderMap, store: &Shared) -> Result<(), Response> {
    if let Some(id) = headers.get("x-request-id").and_then(|v| v.to_str().ok()) {
        store.lock().unwrap().request_ids.push(id.to_string());
    }
    let expected = format!("Bearer {}", TOKEN);
    match headers.get("authorization").and_then(|v| v.to_str().ok()) {
        Some(value) if value == expected => Ok(()),
        _ => Err(fail(StatusCode::UNAUTHORIZED, "invalid token")),
    }
}

fn check_work(work: u64) -> Result<(), Response> {
    match work {
        MISSING_WORK => Err(fail(StatusCode::NOT_FOUND, "work not found")),
        DOWN_WORK => Err(fail(StatusCode::SERVICE_UNAVAILABLE, "maintenance")),
        _ => Ok(()),
    }
}

async fn list_works(
    State(store): State<Shared>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    if let Err(r) = authorize(&headers, &store) {
        return r;
    }
    let now = Utc::now().to_rfc3339();
    let works = vec![
        json!({ "workId": 1, "type": "novel", "title": "The Harbor", "genre": "mystery",
                "status": "draft", "words": 1200, "createdAt": now, "updatedAt": now }),
        json!({ "workId": 2, "type": "screenplay", "title": "Night Shift", "genre": "drama",
                "status": "completed", "words": 0, "createdAt": now, "updatedAt": now }),
    ];
    let wanted = params.get("type").cloned().unwrap_or_else(|| "all".to_string());
    let works: Vec<Value> = works
        .into_iter()
        .filter(|w| wanted == "all" || w["type"] == wanted.as_str())
        .collect();
    let total = works.len();
    ok(json!({
        "works": works,
        "pagination": { "page": 1, "limit": 20, "total": total, "totalPages": 1 }
    }))
}

async fn list_chapters(State(store): State<Shared>, headers: HeaderMap, Path(work): Path<u64>) -> Response {
    if let Err(r) = authorize(&headers, &store).and_then(|_| check_work(work)) {
        return r;
    }
    let store = store.lock().unwrap();
    let items: Vec<Value> = store
        .chapters
        .iter()
        .filter(|c| c["workId"] == work)
        .map(|c| {
            // List responses omit content
            let mut item = c.clone();
            if let Some(obj) = item.as_object_mut() {
                obj.remove("content");
            }
            item
        })
        .collect();
    ok(json!(items))
}

async fn create_chapter(
    State(store): State<Shared>,
    headers: HeaderMap,
    Path(work): Path<u64>,
    Json(body): Json<Value>,
) -> Response {
    if let Err(r) = authorize(&headers, &store).and_then(|_| check_work(work)) {
        return r;
    }
    let title = body["title"].as_str().unwrap_or("").trim().to_string();
    if title.is_empty() || title.chars().count() > 200 {
        return fail(StatusCode::BAD_REQUEST, "title is required and at most 200 characters");
    }
    let Some(order) = body["order"].as_u64() else {
        return fail(StatusCode::BAD_REQUEST, "order is required");
    };

    let mut store = store.lock().unwrap();
    store.next_id += 1;
    let now = Utc::now().to_rfc3339();
    let chapter = json!({
        "chapterId": store.next_id,
        "workId": work,
        "title": title,
        "content": "",
        "order": order,
        "words": 0,
        "status": "draft",
        "createdAt": now,
        "updatedAt": now,
    });
    store.chapters.push(chapter.clone());
    (
        StatusCode::CREATED,
        Json(json!({ "code": 201, "message": "created", "data": chapter })),
    )
        .into_response()
}

async fn get_chapter(
    State(store): State<Shared>,
    headers: HeaderMap,
    Path((work, id)): Path<(u64, u64)>,
) -> Response {
    if let Err(r) = authorize(&headers, &store).and_then(|_| check_work(work)) {
        return r;
    }
    let store = store.lock().unwrap();
    match store
        .chapters
        .iter()
        .find(|c| c["workId"] == work && c["chapterId"] == id)
    {
        Some(chapter) => ok(chapter.clone()),
        None => fail(StatusCode::NOT_FOUND, "chapter not found"),
    }
}

async fn update_chapter(
    State(store): State<Shared>,
    headers: HeaderMap,
    Path((work, id)): Path<(u64, u64)>,
    Json(body): Json<Value>,
) -> Response {
    if let Err(r) = authorize(&headers, &store).and_then(|_| check_work(work)) {
        return r;
    }
    let mut store = store.lock().unwrap();
    let Some(chapter) = store
        .chapters
        .iter_mut()
        .find(|c| c["workId"] == work && c["chapterId"] == id)
    else {
        return fail(StatusCode::NOT_FOUND, "chapter not found");
    };
    for key in ["title", "status", "order"] {
        if let Some(value) = body.get(key) {
            chapter[key] = value.clone();
        }
    }
    if let Some(content) = body.get("content").and_then(|v| v.as_str()) {
        chapter["content"] = json!(content);
        chapter["words"] = json!(words(content));
    }
    chapter["updatedAt"] = json!(Utc::now().to_rfc3339());
    ok(chapter.clone())
}

async fn delete_chapter(
    State(store): State<Shared>,
    headers: HeaderMap,
    Path((work, id)): Path<(u64, u64)>,
) -> Response {
    if let Err(r) = authorize(&headers, &store).and_then(|_| check_work(work)) {
        return r;
    }
    let mut store = store.lock().unwrap();
    let before = store.chapters.len();
    store
        .chapters
        .retain(|c| !(c["workId"] == work && c["chapterId"] == id));
    if store.chapters.len() == before {
        return fail(StatusCode::NOT_FOUND, "chapter not found");
    }
    ok_empty("deleted")
}

async fn reorder_chapters(
    State(store): State<Shared>,
    headers: HeaderMap,
    Path(work): Path<u64>,
    Json(body): Json<Value>,
) -> Response {
    if let Err(r) = authorize(&headers, &store).and_then(|_| check_work(work)) {
        return r;
    }
    let Some(orders) = body["orders"].as_array() else {
        return fail(StatusCode::BAD_REQUEST, "orders is required");
    };
    let mut store = store.lock().unwrap();
    for entry in orders {
        let (Some(id), Some(order)) = (entry["chapterId"].as_u64(), entry["order"].as_u64()) else {
            return fail(StatusCode::BAD_REQUEST, "each order needs chapterId and order");
        };
        if let Some(chapter) = store
            .chapters
            .iter_mut()
            .find(|c| c["workId"] == work && c["chapterId"] == id)
        {
            chapter["order"] = json!(order);
        }
    }
    ok_empty("reordered")
}

async fn autosave_chapter(
    State(store): State<Shared>,
    headers: HeaderMap,
    Path((work, id)): Path<(u64, u64)>,
    Json(body): Json<Value>,
) -> Response {
    if let Err(r) = authorize(&headers, &store).and_then(|_| check_work(work)) {
        return r;
    }
    let content = body["content"].as_str().unwrap_or("").to_string();
    let mut store = store.lock().unwrap();
    let Some(chapter) = store
        .chapters
        .iter_mut()
        .find(|c| c["workId"] == work && c["chapterId"] == id)
    else {
        return fail(StatusCode::NOT_FOUND, "chapter not found");
    };
    chapter["content"] = json!(content);
    chapter["words"] = json!(words(&content));
    store.autosaves.push((id, content.clone()));
    ok(json!({ "savedAt": Utc::now().to_rfc3339(), "words": words(&content) }))
}

async fn list_characters(State(store): State<Shared>, headers: HeaderMap, Path(work): Path<u64>) -> Response {
    if let Err(r) = authorize(&headers, &store).and_then(|_| check_work(work)) {
        return r;
    }
    let store = store.lock().unwrap();
    let items: Vec<Value> = store
        .characters
        .iter()
        .filter(|c| c["workId"] == work)
        .cloned()
        .collect();
    ok(json!(items))
}

async fn create_character(
    State(store): State<Shared>,
    headers: HeaderMap,
    Path(work): Path<u64>,
    Json(body): Json<Value>,
) -> Response {
    if let Err(r) = authorize(&headers, &store).and_then(|_| check_work(work)) {
        return r;
    }
    let name = body["name"].as_str().unwrap_or("").trim().to_string();
    if name.is_empty() {
        return fail(StatusCode::BAD_REQUEST, "name is required");
    }

    let mut store = store.lock().unwrap();
    store.next_id += 1;
    let now = Utc::now().to_rfc3339();
    let character = json!({
        "characterId": store.next_id,
        "workId": work,
        "name": name,
        "description": body.get("description").cloned().unwrap_or(json!("")),
        "traits": body.get("traits").cloned().unwrap_or(json!([])),
        "relationships": body.get("relationships").cloned().unwrap_or(json!([])),
        "appearanceCount": 0,
        "createdAt": now,
        "updatedAt": now,
    });
    store.characters.push(character.clone());
    (
        StatusCode::CREATED,
        Json(json!({ "code": 201, "message": "created", "data": character })),
    )
        .into_response()
}

async fn update_character(
    State(store): State<Shared>,
    headers: HeaderMap,
    Path((work, id)): Path<(u64, u64)>,
    Json(body): Json<Value>,
) -> Response {
    if let Err(r) = authorize(&headers, &store).and_then(|_| check_work(work)) {
        return r;
    }
    let mut store = store.lock().unwrap();
    let Some(character) = store
        .characters
        .iter_mut()
        .find(|c| c["workId"] == work && c["characterId"] == id)
    else {
        return fail(StatusCode::NOT_FOUND, "character not found");
    };
    for key in ["name", "description", "traits", "relationships"] {
        if let Some(value) = body.get(key) {
            character[key] = value.clone();
        }
    }
    character["updatedAt"] = json!(Utc::now().to_rfc3339());
    ok(character.clone())
}

async fn delete_character(
    State(store): State<Shared>,
    headers: HeaderMap,
    Path((work, id)): Path<(u64, u64)>,
) -> Response {
    if let Err(r) = authorize(&headers, &store).and_then(|_| check_work(work)) {
        return r;
    }
    let mut store = store.lock().unwrap();
    let before = store.characters.len();
    store
        .characters
        .retain(|c| !(c["workId"] == work && c["characterId"] == id));
    if store.characters.len() == before {
        return fail(StatusCode::NOT_FOUND, "character not found");
    }
    ok_empty("deleted")
}

async fn submit_polish(State(store): State<Shared>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    if let Err(r) = authorize(&headers, &store) {
        return r;
    }
    if body["content"].as_str().map_or(true, |c| c.trim().is_empty()) {
        return fail(StatusCode::BAD_REQUEST, "content is required");
    }
    ok(json!({ "taskId": "task-1", "status": "pending", "estimatedTime": 5 }))
}

async fn task_status(State(store): State<Shared>, headers: HeaderMap, Path(id): Path<String>) -> Response {
    if let Err(r) = authorize(&headers, &store) {
        return r;
    }
    let polls = {
        let mut store = store.lock().unwrap();
        store.task_polls += 1;
        store.task_polls
    };
    let now = Utc::now().to_rfc3339();
    if polls < 3 {
        ok(json!({ "taskId": id, "status": "processing", "progress": polls * 30, "createdAt": now }))
    } else {
        ok(json!({ "taskId": id, "status": "completed", "progress": 100,
                   "result": "<p>Polished.</p>", "createdAt": now, "completedAt": now }))
    }
}

async fn socket_upgrade(
    State(store): State<Shared>,
    Query(params): Query<HashMap<String, String>>,
    ws: WebSocketUpgrade,
) -> Response {
    if params.get("token").map(String::as_str) != Some(TOKEN) {
        return fail(StatusCode::UNAUTHORIZED, "invalid token");
    }
    let drop_now = {
        let mut store = store.lock().unwrap();
        store.ws_connections += 1;
        if store.ws_drop_first > 0 {
            store.ws_drop_first -= 1;
            true
        } else {
            false
        }
    };
    ws.on_upgrade(move |socket| handle_socket(socket, store, drop_now))
}

async fn handle_socket(mut socket: WebSocket, store: Shared, drop_now: bool) {
    if drop_now {
        let _ = socket.send(Message::Close(None)).await;
        return;
    }

    while let Some(Ok(message)) = socket.recv().await {
        let Message::Text(text) = message else {
            continue;
        };
        let Ok(value) = serde_json::from_str::<Value>(text.as_str()) else {
            let reply = json!({ "type": "error", "message": "invalid message format" });
            let _ = socket.send(Message::Text(reply.to_string().into())).await;
            continue;
        };

        let reply = match value["type"].as_str() {
            Some("ping") => json!({ "type": "pong" }),
            Some("autosave") => {
                let content = value["content"].as_str().unwrap_or("").to_string();
                let chapter_id = value["chapterId"].as_u64().unwrap_or(0);
                store.lock().unwrap().autosaves.push((chapter_id, content.clone()));
                json!({
                    "type": "autosave_ack",
                    "success": true,
                    "chapterId": chapter_id,
                    "savedAt": Utc::now().to_rfc3339(),
                    "words": words(&content),
                })
            }
            _ => json!({ "type": "error", "message": "unknown message type" }),
        };
        if socket.send(Message::Text(reply.to_string().into())).await.is_err() {
            break;
        }
    }
}
