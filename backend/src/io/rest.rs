//! REST surface consumed by the web client.
//!
//! Thin handlers over the domain services; auth failures carry their
//! human-readable message, ignored mutations answer 204, and background
//! sync trouble never surfaces here.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post, put},
    Json, Router,
};
use tracing::info;

use shared::{
    AuthResponse, CreateTimeSlotRequest, CreateTodoRequest, CredentialsRequest,
    GroupedTodosResponse, SetCompletedRequest, TimeSlotListResponse, TimetableResponse,
    ToggleDateRequest,
};

use crate::domain::{SessionService, TimeSlotRegistry, TodoService};
use crate::storage::AuthError;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub session: Arc<SessionService>,
    pub todos: Arc<TodoService>,
    pub registry: Arc<TimeSlotRegistry>,
}

impl AppState {
    pub fn new(session: Arc<SessionService>, todos: Arc<TodoService>, registry: Arc<TimeSlotRegistry>) -> Self {
        Self {
            session,
            todos,
            registry,
        }
    }
}

pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/signup", post(sign_up))
        .route("/auth/signin", post(sign_in))
        .route("/auth/logout", post(logout))
        .route("/auth/me", get(current_user))
        .route("/todos", get(list_todos).post(create_todo))
        .route("/todos/calendar", get(calendar))
        .route("/todos/timetable", get(timetable))
        .route("/todos/timetable/toggle", post(toggle_expanded))
        .route("/todos/:id/completed", put(set_completed))
        .route("/todos/:id", delete(delete_todo))
        .route("/timeslots", get(list_time_slots).post(create_time_slot))
        .route("/timeslots/:id", delete(remove_time_slot))
}

fn auth_status(error: &AuthError) -> StatusCode {
    match error {
        AuthError::EmailTaken => StatusCode::CONFLICT,
        AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
        AuthError::MalformedCredentials => StatusCode::BAD_REQUEST,
        AuthError::Backend(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

async fn sign_up(
    State(state): State<AppState>,
    Json(request): Json<CredentialsRequest>,
) -> impl IntoResponse {
    info!("POST /api/auth/signup - email: {}", request.email);

    match state
        .session
        .sign_up(&request.email, &request.password, request.remember_me)
        .await
    {
        Ok(user) => (
            StatusCode::CREATED,
            Json(AuthResponse {
                user,
                success_message: "Account created successfully".to_string(),
            }),
        )
            .into_response(),
        Err(e) => (auth_status(&e), e.to_string()).into_response(),
    }
}

async fn sign_in(
    State(state): State<AppState>,
    Json(request): Json<CredentialsRequest>,
) -> impl IntoResponse {
    info!("POST /api/auth/signin - email: {}", request.email);

    match state
        .session
        .sign_in(&request.email, &request.password, request.remember_me)
        .await
    {
        Ok(user) => (
            StatusCode::OK,
            Json(AuthResponse {
                user,
                success_message: "Signed in successfully".to_string(),
            }),
        )
            .into_response(),
        Err(e) => (auth_status(&e), e.to_string()).into_response(),
    }
}

async fn logout(State(state): State<AppState>) -> impl IntoResponse {
    info!("POST /api/auth/logout");
    state.session.logout().await;
    StatusCode::NO_CONTENT
}

async fn current_user(State(state): State<AppState>) -> impl IntoResponse {
    match state.session.current_user() {
        Some(user) => (StatusCode::OK, Json(user)).into_response(),
        None => (StatusCode::UNAUTHORIZED, "Not signed in").into_response(),
    }
}

async fn list_todos(State(state): State<AppState>) -> impl IntoResponse {
    Json(GroupedTodosResponse {
        groups: state.todos.flat_groups(),
    })
}

async fn calendar(State(state): State<AppState>) -> impl IntoResponse {
    Json(GroupedTodosResponse {
        groups: state.todos.calendar(),
    })
}

async fn timetable(State(state): State<AppState>) -> impl IntoResponse {
    Json(TimetableResponse {
        days: state.todos.timetable(),
    })
}

async fn toggle_expanded(
    State(state): State<AppState>,
    Json(request): Json<ToggleDateRequest>,
) -> impl IntoResponse {
    state.todos.toggle_expanded(request.date);
    StatusCode::NO_CONTENT
}

async fn create_todo(
    State(state): State<AppState>,
    Json(request): Json<CreateTodoRequest>,
) -> impl IntoResponse {
    info!("POST /api/todos - title: '{}'", request.title);

    if state.session.current_user().is_none() {
        return (StatusCode::UNAUTHORIZED, "Not signed in").into_response();
    }

    match state.todos.create(request) {
        Some(todo) => (StatusCode::CREATED, Json(todo)).into_response(),
        // The mutation was ignored (blank title); nothing was created.
        None => StatusCode::NO_CONTENT.into_response(),
    }
}

async fn set_completed(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(request): Json<SetCompletedRequest>,
) -> impl IntoResponse {
    info!("PUT /api/todos/{}/completed - {}", id, request.is_completed);

    if state.session.current_user().is_none() {
        return (StatusCode::UNAUTHORIZED, "Not signed in").into_response();
    }

    match state.todos.set_completed(id, request.is_completed) {
        Some(todo) => (StatusCode::OK, Json(todo)).into_response(),
        None => (StatusCode::NOT_FOUND, "Todo not found").into_response(),
    }
}

async fn delete_todo(State(state): State<AppState>, Path(id): Path<i64>) -> impl IntoResponse {
    info!("DELETE /api/todos/{}", id);

    if state.session.current_user().is_none() {
        return (StatusCode::UNAUTHORIZED, "Not signed in").into_response();
    }

    if state.todos.delete(id) {
        StatusCode::NO_CONTENT.into_response()
    } else {
        (StatusCode::NOT_FOUND, "Todo not found").into_response()
    }
}

async fn list_time_slots(State(state): State<AppState>) -> impl IntoResponse {
    Json(TimeSlotListResponse {
        time_slots: state.registry.list(),
    })
}

async fn create_time_slot(
    State(state): State<AppState>,
    Json(request): Json<CreateTimeSlotRequest>,
) -> impl IntoResponse {
    info!("POST /api/timeslots - '{}'", request.display_name);

    let slot = state
        .registry
        .add(&request.start_time, &request.end_time, &request.display_name);
    (StatusCode::CREATED, Json(slot))
}

async fn remove_time_slot(State(state): State<AppState>, Path(id): Path<i32>) -> impl IntoResponse {
    info!("DELETE /api/timeslots/{}", id);

    if state.registry.remove(id) {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::notification::testing::RecordingScheduler;
    use crate::storage::local::{JsonPreferenceStore, LocalAccountService};
    use crate::storage::memory::MemoryCollectionStore;
    use crate::sync::SyncReconciler;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use serde_json::{json, Value};
    use std::time::Duration;
    use tempfile::TempDir;
    use tower::ServiceExt;

    async fn test_app() -> (Router, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(MemoryCollectionStore::new());
        let accounts = Arc::new(LocalAccountService::open(dir.path().join("accounts.json")).unwrap());
        let prefs = Arc::new(JsonPreferenceStore::open(dir.path().join("prefs.json")).unwrap());
        let reconciler = Arc::new(SyncReconciler::new(store, Duration::from_millis(50)));

        let session = Arc::new(SessionService::new(accounts, prefs, reconciler.clone()));
        let todos = Arc::new(TodoService::new(reconciler, Arc::new(RecordingScheduler::default())));
        let registry = Arc::new(TimeSlotRegistry::new());

        let app = Router::new()
            .nest("/api", api_routes())
            .with_state(AppState::new(session, todos, registry));
        (app, dir)
    }

    async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = match body {
            Some(body) => Request::builder()
                .method(method)
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => Request::builder().method(method).uri(uri).body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    async fn sign_up(app: &Router, email: &str) {
        let (status, _) = send(
            app,
            "POST",
            "/api/auth/signup",
            Some(json!({"email": email, "password": "hunter2"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    #[tokio::test]
    async fn test_signup_then_me() {
        let (app, _dir) = test_app().await;
        sign_up(&app, "a@b.com").await;

        let (status, me) = send(&app, "GET", "/api/auth/me", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(me["email"], "a@b.com");
    }

    #[tokio::test]
    async fn test_duplicate_signup_conflicts() {
        let (app, _dir) = test_app().await;
        sign_up(&app, "a@b.com").await;

        let (status, _) = send(
            &app,
            "POST",
            "/api/auth/signup",
            Some(json!({"email": "a@b.com", "password": "other"})),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_signin_with_bad_password() {
        let (app, _dir) = test_app().await;
        sign_up(&app, "a@b.com").await;

        let (status, _) = send(
            &app,
            "POST",
            "/api/auth/signin",
            Some(json!({"email": "a@b.com", "password": "wrong"})),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_create_todo_requires_auth() {
        let (app, _dir) = test_app().await;

        let (status, _) = send(&app, "POST", "/api/todos", Some(json!({"title": "x"}))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_create_and_list_todos() {
        let (app, _dir) = test_app().await;
        sign_up(&app, "a@b.com").await;

        let (status, created) = send(
            &app,
            "POST",
            "/api/todos",
            Some(json!({"title": "Buy milk", "date": "2024-03-01"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["title"], "Buy milk");
        assert_eq!(created["isCompleted"], false);

        let (status, listed) = send(&app, "GET", "/api/todos", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(listed["groups"][0]["items"][0]["title"], "Buy milk");
    }

    #[tokio::test]
    async fn test_blank_title_answers_no_content() {
        let (app, _dir) = test_app().await;
        sign_up(&app, "a@b.com").await;

        let (status, _) = send(&app, "POST", "/api/todos", Some(json!({"title": "   "}))).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn test_calendar_excludes_undated() {
        let (app, _dir) = test_app().await;
        sign_up(&app, "a@b.com").await;
        send(&app, "POST", "/api/todos", Some(json!({"title": "undated"}))).await;
        send(
            &app,
            "POST",
            "/api/todos",
            Some(json!({"title": "dated", "date": "2024-03-01"})),
        )
        .await;

        let (_, calendar) = send(&app, "GET", "/api/todos/calendar", None).await;
        let groups = calendar["groups"].as_array().unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0]["label"], "2024-03-01");
    }

    #[tokio::test]
    async fn test_toggle_and_delete() {
        let (app, _dir) = test_app().await;
        sign_up(&app, "a@b.com").await;
        let (_, created) = send(&app, "POST", "/api/todos", Some(json!({"title": "t"}))).await;
        let id = created["id"].as_i64().unwrap();

        let (status, toggled) = send(
            &app,
            "PUT",
            &format!("/api/todos/{}/completed", id),
            Some(json!({"isCompleted": true})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(toggled["isCompleted"], true);

        let (status, _) = send(&app, "DELETE", &format!("/api/todos/{}", id), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, _) = send(&app, "DELETE", &format!("/api/todos/{}", id), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_time_slot_crud() {
        let (app, _dir) = test_app().await;

        let (status, slot) = send(
            &app,
            "POST",
            "/api/timeslots",
            Some(json!({"startTime": "12:00", "endTime": "13:00", "displayName": "Lunch"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(slot["id"], 0);

        let (_, listed) = send(&app, "GET", "/api/timeslots", None).await;
        assert_eq!(listed["timeSlots"].as_array().unwrap().len(), 1);

        let (status, _) = send(&app, "DELETE", "/api/timeslots/0", None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, _) = send(&app, "DELETE", "/api/timeslots/0", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_logout_ends_session() {
        let (app, _dir) = test_app().await;
        sign_up(&app, "a@b.com").await;

        let (status, _) = send(&app, "POST", "/api/auth/logout", None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, _) = send(&app, "GET", "/api/auth/me", None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}
