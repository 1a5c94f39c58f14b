//! Interest tags and the member/interest relation

use crate::core_model::{InterestId, Timestamp};
use serde::{Deserialize, Serialize};

/// A keyword tag members and publications can declare
///
/// The member/interest edge itself lives in the `profile_interests` table;
/// it has no behavior beyond existing, so no separate struct models it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interest {
    /// Unique identifier
    pub id: InterestId,

    /// The keyword itself, unique case-insensitively
    pub keyword: String,

    /// When the keyword entered the vocabulary
    pub created_at: Timestamp,
}

/// Canonical form a keyword is stored under
pub fn normalize_keyword(keyword: &str) -> String {
    keyword.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_keyword() {
        assert_eq!(normalize_keyword("  Machine Learning "), "machine learning");
        assert_eq!(normalize_keyword("AI"), "ai");
    }
}
