//! Reminder scheduling contract.
//!
//! The fire time for a todo is its date at the time slot's start time,
//! or 09:00 local for date-only todos. Actual delivery is a platform
//! concern behind `NotificationScheduler`; the shipped implementation
//! only logs.

use chrono::{DateTime, Local, NaiveDate, NaiveTime, TimeZone};
use tracing::{info, warn};

use shared::TimeSlot;

const DEFAULT_REMINDER_TIME: (u32, u32) = (9, 0);

/// Compute when a todo's reminder should fire, in the local timezone.
/// Undated todos never fire.
pub fn reminder_fire_time(date: Option<NaiveDate>, time_slot: Option<&TimeSlot>) -> Option<DateTime<Local>> {
    let date = date?;

    let default_time = NaiveTime::from_hms_opt(DEFAULT_REMINDER_TIME.0, DEFAULT_REMINDER_TIME.1, 0).unwrap();
    let time = match time_slot {
        Some(slot) => match NaiveTime::parse_from_str(&slot.start_time, "%H:%M") {
            Ok(time) => time,
            Err(e) => {
                warn!("Unparseable slot start time '{}', using default: {}", slot.start_time, e);
                default_time
            }
        },
        None => default_time,
    };

    // An ambiguous local time (DST fold) resolves to the earlier
    // instant; a nonexistent one is skipped.
    Local.from_local_datetime(&date.and_time(time)).earliest()
}

/// Platform notification scheduler: fires a user-visible reminder
/// carrying the todo's title at the given instant.
pub trait NotificationScheduler: Send + Sync {
    fn schedule_at(&self, epoch_millis: i64, todo_id: i64, title: &str);
    fn cancel(&self, todo_id: i64);
}

/// Headless scheduler used when no platform integration is wired up.
#[derive(Default)]
pub struct LogScheduler;

impl NotificationScheduler for LogScheduler {
    fn schedule_at(&self, epoch_millis: i64, todo_id: i64, title: &str) {
        info!("Reminder for todo {} ('{}') scheduled at {}", todo_id, title, epoch_millis);
    }

    fn cancel(&self, todo_id: i64) {
        info!("Cancelled reminder for todo {}", todo_id);
    }
}
