use crate::error::StorageError;

/// Where load markers live between visits.
///
/// Keys and values are plain strings. The loader only asks whether a
/// non-empty value exists under a key; what the value says is up to the
/// writer.
///
/// Implementations: browser localStorage, JSON file, in-memory map.
pub trait Persistence {
    /// Whether the store can be used at all. An unavailable store is never
    /// read or written.
    fn is_available(&self) -> bool {
        true
    }

    /// Read a string value by key. Returns `Ok(None)` if not found.
    fn load(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Write a string value under key.
    fn save(&self, key: &str, value: &str) -> Result<(), StorageError>;
}
