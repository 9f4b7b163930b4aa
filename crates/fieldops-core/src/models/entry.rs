use uuid::Uuid;

/// A domain entity wrapped with its optimistic-synchronization state.
///
/// Created unconfirmed at the moment a local change is applied to visible
/// state; confirmed (and given its server identity) when the server
/// acknowledges. A failed submission removes the entry entirely rather
/// than reverting it in place, so no half-updated value ever lingers.
#[derive(Debug, Clone, PartialEq)]
pub struct OptimisticEntry<T> {
    pub value: T,
    pub confirmed: bool,
    /// Temporary client-side identifier, stable for the entry's lifetime
    pub local_id: String,
    /// Server-assigned identifier, populated on acknowledgment
    pub server_id: Option<String>,
}

impl<T> OptimisticEntry<T> {
    /// Wrap a locally-built value awaiting server acknowledgment.
    pub fn pending(value: T) -> Self {
        Self {
            value,
            confirmed: false,
            local_id: format!("local-{}", Uuid::new_v4()),
            server_id: None,
        }
    }

    /// Wrap a value that already came from the server.
    pub fn acknowledged(value: T, server_id: impl Into<String>) -> Self {
        Self {
            value,
            confirmed: true,
            local_id: format!("local-{}", Uuid::new_v4()),
            server_id: Some(server_id.into()),
        }
    }

    /// Replace the optimistic guess with the server's authoritative
    /// representation.
    pub fn confirm(&mut self, value: T, server_id: impl Into<String>) {
        self.value = value;
        self.server_id = Some(server_id.into());
        self.confirmed = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pending_entries_get_unique_local_ids() {
        let a = OptimisticEntry::pending("draft");
        let b = OptimisticEntry::pending("draft");
        assert!(!a.confirmed);
        assert!(a.server_id.is_none());
        assert_ne!(a.local_id, b.local_id);
    }

    #[test]
    fn test_confirm_adopts_server_identity() {
        let mut entry = OptimisticEntry::pending("optimistic guess");
        let local_id = entry.local_id.clone();

        entry.confirm("server truth", "cmt-42");

        assert!(entry.confirmed);
        assert_eq!(entry.value, "server truth");
        assert_eq!(entry.server_id.as_deref(), Some("cmt-42"));
        assert_eq!(entry.local_id, local_id, "local id must stay stable");
    }
}
