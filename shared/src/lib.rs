use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

/// A named, reusable time-of-day interval (e.g. "Lunch Break, 12:00-13:00").
///
/// Times are wall-clock `HH:MM` text; no ordering between `start_time` and
/// `end_time` is enforced here (callers validate if they care).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSlot {
    pub id: i32,
    pub start_time: String,
    pub end_time: String,
    pub display_name: String,
}

/// A single task. The embedded `time_slot` is a copy taken at creation
/// time, not a live reference: later edits to the registry never
/// propagate into existing todos.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TodoItem {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub is_completed: bool,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub time_slot: Option<TimeSlot>,
}

impl TodoItem {
    /// Pure value construction; titles are not validated here.
    pub fn new(id: i64, title: impl Into<String>, date: Option<NaiveDate>, time_slot: Option<TimeSlot>) -> Self {
        Self {
            id,
            title: title.into(),
            is_completed: false,
            date,
            time_slot,
        }
    }

    /// Copy of this item with only `is_completed` changed.
    pub fn with_completed(&self, completed: bool) -> Self {
        Self {
            is_completed: completed,
            ..self.clone()
        }
    }
}

/// An authenticated account with its latest todo snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub todos: Vec<TodoItem>,
}

/// Request for creating a new todo
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTodoRequest {
    pub title: String,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub time_slot: Option<TimeSlot>,
}

/// Request for toggling a todo's completion state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetCompletedRequest {
    pub is_completed: bool,
}

/// Request for registering a new time slot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTimeSlotRequest {
    pub start_time: String,
    pub end_time: String,
    pub display_name: String,
}

/// Response containing the registered time slots
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSlotListResponse {
    pub time_slots: Vec<TimeSlot>,
}

/// Request for signing up or signing in
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialsRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub remember_me: bool,
}

/// Response after a successful sign-up or sign-in
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub user: User,
    pub success_message: String,
}

/// One date bucket of the flat or calendar view. A `None` date is the
/// "No Date" bucket (flat view only; the calendar view excludes it).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateGroup {
    pub date: Option<NaiveDate>,
    pub label: String,
    pub items: Vec<TodoItem>,
}

/// Todos of one date that share the same time slot value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotGroup {
    pub time_slot: TimeSlot,
    pub items: Vec<TodoItem>,
}

/// One day of the timetable view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimetableDay {
    pub date: NaiveDate,
    pub is_expanded: bool,
    pub slots: Vec<SlotGroup>,
}

/// Response containing date-grouped todos
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupedTodosResponse {
    pub groups: Vec<DateGroup>,
}

/// Response containing the timetable projection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimetableResponse {
    pub days: Vec<TimetableDay>,
}

/// Request for toggling a timetable date's expanded state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleDateRequest {
    pub date: NaiveDate,
}

/// Parse one todo document from a remote snapshot.
///
/// Records missing `id` or `title` are dropped (with a warning). A
/// malformed `date` or an incomplete `timeSlot` degrades to `None`
/// rather than rejecting the whole record.
pub fn parse_todo_doc(doc: &Value) -> Option<TodoItem> {
    let map = match doc.as_object() {
        Some(map) => map,
        None => {
            warn!("Dropping non-object todo record: {}", doc);
            return None;
        }
    };

    let id = match map.get("id").and_then(Value::as_i64) {
        Some(id) => id,
        None => {
            warn!("Dropping todo record with invalid or missing id");
            return None;
        }
    };

    let title = match map.get("title").and_then(Value::as_str) {
        Some(title) => title.to_string(),
        None => {
            warn!("Dropping todo record {} with invalid or missing title", id);
            return None;
        }
    };

    let is_completed = map
        .get("isCompleted")
        .and_then(Value::as_bool)
        .unwrap_or(false);

    let date = map.get("date").and_then(Value::as_str).and_then(|raw| {
        match raw.parse::<NaiveDate>() {
            Ok(date) => Some(date),
            Err(e) => {
                warn!("Ignoring unparseable date '{}' on todo {}: {}", raw, id, e);
                None
            }
        }
    });

    let time_slot = map.get("timeSlot").and_then(|slot| parse_time_slot(slot, id));

    Some(TodoItem {
        id,
        title,
        is_completed,
        date,
        time_slot,
    })
}

fn parse_time_slot(value: &Value, todo_id: i64) -> Option<TimeSlot> {
    let map = value.as_object()?;

    let id = map.get("id").and_then(Value::as_i64)? as i32;
    let start_time = map.get("startTime").and_then(Value::as_str)?.to_string();
    let end_time = map.get("endTime").and_then(Value::as_str)?.to_string();
    let display_name = map.get("displayName").and_then(Value::as_str).map(str::to_string);

    match display_name {
        Some(display_name) => Some(TimeSlot {
            id,
            start_time,
            end_time,
            display_name,
        }),
        None => {
            warn!("Ignoring incomplete time slot on todo {}", todo_id);
            None
        }
    }
}

/// Parse a full collection snapshot into todo records, dropping the
/// malformed ones and keeping the rest.
///
/// Accepts either a JSON array of documents or an object keyed by
/// opaque ids (the listener-based store delivers both shapes).
pub fn parse_todo_snapshot(snapshot: &Value) -> Vec<TodoItem> {
    match snapshot {
        Value::Array(docs) => docs.iter().filter_map(parse_todo_doc).collect(),
        Value::Object(map) => map.values().filter_map(parse_todo_doc).collect(),
        Value::Null => Vec::new(),
        other => {
            warn!("Ignoring snapshot with unexpected shape: {}", other);
            Vec::new()
        }
    }
}
