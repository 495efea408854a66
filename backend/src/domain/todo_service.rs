//! Todo CRUD on top of the sync reconciler.
//!
//! Every mutation proposes a whole new collection to the reconciler;
//! the authoritative value is whatever the remote listener most
//! recently delivered.

use std::collections::HashSet;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{Local, NaiveDate};
use tracing::{info, warn};

use shared::{CreateTodoRequest, DateGroup, TimetableDay, TodoItem};

use crate::domain::notification::{reminder_fire_time, NotificationScheduler};
use crate::domain::projection;
use crate::sync::SyncReconciler;

pub struct TodoService {
    reconciler: Arc<SyncReconciler>,
    scheduler: Arc<dyn NotificationScheduler>,
    /// High-water id counter. Seeded from snapshots and only ever
    /// ratcheted up, so ids are never reused after a delete even though
    /// the remote collection may shrink.
    next_id: AtomicI64,
    expanded_dates: Mutex<HashSet<NaiveDate>>,
}

impl TodoService {
    pub fn new(reconciler: Arc<SyncReconciler>, scheduler: Arc<dyn NotificationScheduler>) -> Self {
        Self {
            reconciler,
            scheduler,
            next_id: AtomicI64::new(0),
            expanded_dates: Mutex::new(HashSet::new()),
        }
    }

    fn allocate_id(&self, todos: &[TodoItem]) -> i64 {
        let floor = todos.iter().map(|t| t.id + 1).max().unwrap_or(0);
        self.next_id.fetch_max(floor, Ordering::SeqCst);
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    /// Create a todo. A blank title is not an error: the mutation is
    /// ignored with a warning and `None` is returned.
    pub fn create(&self, request: CreateTodoRequest) -> Option<TodoItem> {
        let title = request.title.trim();
        if title.is_empty() {
            warn!("Ignoring todo creation with blank title");
            return None;
        }

        let mut todos = self.reconciler.current();
        let id = self.allocate_id(&todos);
        let todo = TodoItem::new(id, title, request.date, request.time_slot);

        if let Some(fire_at) = reminder_fire_time(todo.date, todo.time_slot.as_ref()) {
            self.scheduler.schedule_at(fire_at.timestamp_millis(), todo.id, &todo.title);
        }

        info!("Creating todo {} ('{}')", todo.id, todo.title);
        todos.push(todo.clone());
        self.reconciler.propose(todos);
        Some(todo)
    }

    /// Toggle completion; everything else on the item is untouched.
    pub fn set_completed(&self, id: i64, completed: bool) -> Option<TodoItem> {
        let todos = self.reconciler.current();
        if !todos.iter().any(|t| t.id == id) {
            warn!("Cannot toggle unknown todo {}", id);
            return None;
        }

        let updated: Vec<TodoItem> = todos
            .iter()
            .map(|t| if t.id == id { t.with_completed(completed) } else { t.clone() })
            .collect();
        let toggled = updated.iter().find(|t| t.id == id).cloned();

        self.reconciler.propose(updated);
        toggled
    }

    /// Delete a todo, cancelling its pending reminder. Returns whether
    /// anything was removed.
    pub fn delete(&self, id: i64) -> bool {
        let todos = self.reconciler.current();
        if !todos.iter().any(|t| t.id == id) {
            return false;
        }

        self.scheduler.cancel(id);
        info!("Deleting todo {}", id);
        self.reconciler.propose(todos.into_iter().filter(|t| t.id != id).collect());
        true
    }

    pub fn all(&self) -> Vec<TodoItem> {
        self.reconciler.current()
    }

    /// Flat view: everything, grouped by date in encounter order.
    pub fn flat_groups(&self) -> Vec<DateGroup> {
        projection::group_by_date(&self.reconciler.current())
    }

    /// Calendar view: dated todos only, ascending by date.
    pub fn calendar(&self) -> Vec<DateGroup> {
        projection::calendar_view(&self.reconciler.current())
    }

    /// Timetable view for the local "today".
    pub fn timetable(&self) -> Vec<TimetableDay> {
        self.timetable_on(Local::now().date_naive())
    }

    pub fn timetable_on(&self, today: NaiveDate) -> Vec<TimetableDay> {
        let expanded = self.expanded_dates.lock().unwrap();
        projection::timetable_view(&self.reconciler.current(), today, &expanded)
    }

    /// Flip a date in and out of the explicitly-expanded set.
    pub fn toggle_expanded(&self, date: NaiveDate) {
        let mut expanded = self.expanded_dates.lock().unwrap();
        if !expanded.insert(date) {
            expanded.remove(&date);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::notification::testing::RecordingScheduler;
    use crate::storage::memory::MemoryCollectionStore;
    use crate::storage::traits::CollectionStore;
    use shared::TimeSlot;
    use std::time::Duration;

    struct Fixture {
        store: Arc<MemoryCollectionStore>,
        scheduler: Arc<RecordingScheduler>,
        service: TodoService,
    }

    async fn setup() -> Fixture {
        let store = Arc::new(MemoryCollectionStore::new());
        let reconciler = Arc::new(SyncReconciler::new(store.clone(), Duration::from_millis(50)));
        reconciler.attach("u1").await.unwrap();

        let scheduler = Arc::new(RecordingScheduler::default());
        let service = TodoService::new(reconciler, scheduler.clone());
        Fixture {
            store,
            scheduler,
            service,
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn create_request(title: &str) -> CreateTodoRequest {
        CreateTodoRequest {
            title: title.to_string(),
            date: None,
            time_slot: None,
        }
    }

    #[tokio::test]
    async fn test_create_assigns_sequential_ids() {
        let fx = setup().await;

        let a = fx.service.create(create_request("Buy milk")).unwrap();
        let b = fx.service.create(create_request("Pay rent")).unwrap();

        assert_eq!(a.id, 0);
        assert_eq!(b.id, 1);
        assert!(!a.is_completed);
        assert_eq!(fx.service.all().len(), 2);
    }

    #[tokio::test]
    async fn test_blank_title_is_silently_ignored() {
        let fx = setup().await;

        assert!(fx.service.create(create_request("   ")).is_none());
        assert!(fx.service.all().is_empty());

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(fx.store.write_count(), 0);
    }

    #[tokio::test]
    async fn test_ids_are_not_reused_after_delete() {
        let fx = setup().await;

        fx.service.create(create_request("a")).unwrap();
        let b = fx.service.create(create_request("b")).unwrap();
        assert!(fx.service.delete(b.id));

        let c = fx.service.create(create_request("c")).unwrap();
        assert_eq!(c.id, 2, "deleted id must not be reissued");
    }

    #[tokio::test]
    async fn test_toggle_changes_only_completion() {
        let fx = setup().await;
        let slot = TimeSlot {
            id: 0,
            start_time: "12:00".to_string(),
            end_time: "13:00".to_string(),
            display_name: "Lunch".to_string(),
        };
        let created = fx
            .service
            .create(CreateTodoRequest {
                title: "Eat".to_string(),
                date: Some(date(2024, 5, 10)),
                time_slot: Some(slot.clone()),
            })
            .unwrap();

        let toggled = fx.service.set_completed(created.id, true).unwrap();
        assert!(toggled.is_completed);
        assert_eq!(toggled.id, created.id);
        assert_eq!(toggled.title, created.title);
        assert_eq!(toggled.date, created.date);
        assert_eq!(toggled.time_slot, created.time_slot);
    }

    #[tokio::test]
    async fn test_toggle_unknown_id_is_noop() {
        let fx = setup().await;
        assert!(fx.service.set_completed(99, true).is_none());
    }

    #[tokio::test]
    async fn test_create_with_date_schedules_reminder() {
        let fx = setup().await;

        let created = fx
            .service
            .create(CreateTodoRequest {
                title: "Dentist".to_string(),
                date: Some(date(2024, 5, 10)),
                time_slot: None,
            })
            .unwrap();

        let scheduled = fx.scheduler.scheduled.lock().unwrap();
        assert_eq!(scheduled.len(), 1);
        let expected = reminder_fire_time(Some(date(2024, 5, 10)), None).unwrap();
        assert_eq!(scheduled[0], (expected.timestamp_millis(), created.id, "Dentist".to_string()));
    }

    #[tokio::test]
    async fn test_undated_todo_schedules_nothing() {
        let fx = setup().await;
        fx.service.create(create_request("Someday")).unwrap();
        assert!(fx.scheduler.scheduled.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_cancels_reminder_and_pushes() {
        let fx = setup().await;
        let created = fx
            .service
            .create(CreateTodoRequest {
                title: "Dentist".to_string(),
                date: Some(date(2024, 5, 10)),
                time_slot: None,
            })
            .unwrap();

        assert!(fx.service.delete(created.id));
        assert_eq!(*fx.scheduler.cancelled.lock().unwrap(), vec![created.id]);
        assert!(fx.service.all().is_empty());

        tokio::time::sleep(Duration::from_millis(150)).await;
        let remote = fx.store.read_once("users/u1/todos").await.unwrap();
        assert_eq!(shared::parse_todo_snapshot(&remote).len(), 0);
    }

    #[tokio::test]
    async fn test_delete_unknown_id_returns_false() {
        let fx = setup().await;
        assert!(!fx.service.delete(7));
    }

    #[tokio::test]
    async fn test_toggle_expanded_flips() {
        let fx = setup().await;
        let slot = TimeSlot {
            id: 0,
            start_time: "09:00".to_string(),
            end_time: "10:00".to_string(),
            display_name: "Morning".to_string(),
        };
        fx.service
            .create(CreateTodoRequest {
                title: "Standup".to_string(),
                date: Some(date(2024, 5, 12)),
                time_slot: Some(slot),
            })
            .unwrap();

        let today = date(2024, 5, 1);
        assert!(!fx.service.timetable_on(today)[0].is_expanded);

        fx.service.toggle_expanded(date(2024, 5, 12));
        assert!(fx.service.timetable_on(today)[0].is_expanded);

        fx.service.toggle_expanded(date(2024, 5, 12));
        assert!(!fx.service.timetable_on(today)[0].is_expanded);
    }
}
