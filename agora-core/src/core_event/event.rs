//! Event data structures

use crate::core_model::{EnumParseError, EventId, Timestamp};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A scheduled community event members can enroll in
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Unique identifier
    pub id: EventId,

    /// Human-readable name, unique across events
    pub name: String,

    pub starts_at: Timestamp,

    /// Never earlier than `starts_at`
    pub ends_at: Timestamp,

    pub modality: Modality,

    pub status: EventStatus,

    /// Maximum simultaneously held seats; `None` = unbounded
    pub capacity: Option<u32>,

    pub created_at: Timestamp,

    pub updated_at: Timestamp,
}

impl Event {
    /// Whether the event still accepts enrollment changes
    pub fn is_open(&self) -> bool {
        self.status == EventStatus::Scheduled
    }
}

/// How the event is held
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Modality {
    InPerson,
    Virtual,
    Hybrid,
}

impl Modality {
    pub fn as_str(&self) -> &'static str {
        match self {
            Modality::InPerson => "in_person",
            Modality::Virtual => "virtual",
            Modality::Hybrid => "hybrid",
        }
    }
}

impl fmt::Display for Modality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Modality {
    type Err = EnumParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "in_person" => Ok(Modality::InPerson),
            "virtual" => Ok(Modality::Virtual),
            "hybrid" => Ok(Modality::Hybrid),
            other => Err(EnumParseError::new("modality", other)),
        }
    }
}

/// Lifecycle of the event itself (not of a participation)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    Scheduled,
    Finished,
    Cancelled,
}

impl EventStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventStatus::Scheduled => "scheduled",
            EventStatus::Finished => "finished",
            EventStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for EventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for EventStatus {
    type Err = EnumParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "scheduled" => Ok(EventStatus::Scheduled),
            "finished" => Ok(EventStatus::Finished),
            "cancelled" => Ok(EventStatus::Cancelled),
            other => Err(EnumParseError::new("event status", other)),
        }
    }
}
