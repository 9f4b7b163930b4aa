pub mod cursor;
pub mod entry;

pub use cursor::PageCursor;
pub use entry::OptimisticEntry;

/// Stable identity for entities held in remote-backed collections.
///
/// Used to keep item identity unique within a list across page appends
/// and to correlate optimistic entries with their server records.
pub trait HasId {
    fn id(&self) -> &str;
}
