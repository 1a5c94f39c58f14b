//! Interest matching and notification fan-out
//!
//! When a publication goes live, every active account whose declared
//! interests intersect the publication's tags gets exactly one notification
//! record. The `(user, publication)` uniqueness constraint makes the
//! fan-out safe to re-run at any time.

pub mod fanout;
pub mod manager;
pub mod matcher;
pub mod notification;

pub use fanout::{FanoutOutcome, NotificationFanout};
pub use manager::{NotifyManager, NotifyManagerImpl};
pub use matcher::InterestMatcher;
pub use notification::{Notification, NotifyError};
