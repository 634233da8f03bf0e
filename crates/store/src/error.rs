use sy_domain::status::EntityKind;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: EntityKind, id: String },

    /// A uniqueness or referential constraint would be violated.
    #[error("constraint violated: {0}")]
    Conflict(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("IO: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl StoreError {
    pub fn not_found(kind: EntityKind, id: impl ToString) -> Self {
        Self::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    /// Failures worth retrying unchanged: the same transaction may succeed
    /// once the backing storage recovers.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable(_) | Self::Io(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_message_names_kind_and_id() {
        let err = StoreError::not_found(EntityKind::Lesson, "abc");
        assert_eq!(err.to_string(), "lesson not found: abc");
        assert!(!err.is_transient());
    }

    #[test]
    fn io_and_unavailable_are_transient() {
        let io = StoreError::from(std::io::Error::other("disk full"));
        assert!(io.is_transient());
        assert!(StoreError::Unavailable("locked".into()).is_transient());
        assert!(!StoreError::Conflict("dup".into()).is_transient());
    }
}
