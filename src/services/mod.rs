pub mod completion;
pub mod scheduler;
pub mod sync_service;

pub use completion::CompletionTracker;
pub use scheduler::{ReminderScheduler, TickStats};
pub use sync_service::{SyncService, SyncStats};
