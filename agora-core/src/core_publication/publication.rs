//! Publication data structures

use crate::core_model::{EnumParseError, PublicationId, Timestamp, UserId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// An article-like item authored by a member
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Publication {
    /// Unique identifier
    pub id: PublicationId,

    pub title: String,

    pub content: String,

    /// Editorial lifecycle state
    pub status: PublicationStatus,

    /// Public items are readable by anyone once active; private items need
    /// authorship, staff role, or an explicit grant
    pub visibility: Visibility,

    /// Owning account
    pub author_id: UserId,

    pub created_at: Timestamp,

    pub updated_at: Timestamp,
}

/// Editorial lifecycle of a publication
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PublicationStatus {
    Draft,
    Pending,
    Active,
    Archived,
}

impl PublicationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PublicationStatus::Draft => "draft",
            PublicationStatus::Pending => "pending",
            PublicationStatus::Active => "active",
            PublicationStatus::Archived => "archived",
        }
    }
}

impl fmt::Display for PublicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for PublicationStatus {
    type Err = EnumParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(PublicationStatus::Draft),
            "pending" => Ok(PublicationStatus::Pending),
            "active" => Ok(PublicationStatus::Active),
            "archived" => Ok(PublicationStatus::Archived),
            other => Err(EnumParseError::new("publication status", other)),
        }
    }
}

/// Visibility modes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    Public,
    Private,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Public => "public",
            Visibility::Private => "private",
        }
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Visibility {
    type Err = EnumParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "public" => Ok(Visibility::Public),
            "private" => Ok(Visibility::Private),
            other => Err(EnumParseError::new("visibility", other)),
        }
    }
}
