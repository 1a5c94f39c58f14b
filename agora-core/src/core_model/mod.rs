//! Shared identifier and timestamp types

pub mod types;

pub use types::{
    EnumParseError, EventId, InterestId, NotificationId, PublicationId, Timestamp, UserId,
};
