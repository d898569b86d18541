//! User model for Gator.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// A registered user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    /// Unique user ID.
    pub id: Uuid,
    /// Login name (unique).
    pub name: String,
    /// Account creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

/// New user for registration.
#[derive(Debug, Clone)]
pub struct NewUser {
    /// Pre-generated user ID.
    pub id: Uuid,
    /// Login name.
    pub name: String,
    /// Creation timestamp (also used as the initial update timestamp).
    pub created_at: DateTime<Utc>,
}

impl NewUser {
    /// Create a new user with a fresh ID, timestamped now.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_user_generates_distinct_ids() {
        let a = NewUser::new("alice");
        let b = NewUser::new("alice");
        assert_eq!(a.name, "alice");
        assert_ne!(a.id, b.id);
    }
}
