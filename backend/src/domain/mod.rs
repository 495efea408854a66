//! Domain layer: records, projections, and the services that keep the
//! local collection, reminders, and session in step.

pub mod notification;
pub mod projection;
pub mod session_service;
pub mod timeslot_service;
pub mod todo_service;

pub use notification::{LogScheduler, NotificationScheduler};
pub use session_service::SessionService;
pub use timeslot_service::TimeSlotRegistry;
pub use todo_service::TodoService;
