//! Platform seams: the environment [`crate::fout`] runs against.

mod container;
mod font;
mod persistence;

pub use container::ClassList;
pub use font::FontWatcher;
pub use persistence::Persistence;

use crate::config::FontFace;

/// A complete execution environment: storage, DOM root, and font detection.
///
/// Implementations: browser (`fout-web`), in-memory ([`crate::memory`]),
/// native CLI harness.
pub trait Platform {
    type Element: ClassList;
    type Storage: Persistence;
    type Watcher: FontWatcher;

    /// The document's root element, used when no container is given.
    fn document_element(&self) -> Option<Self::Element>;

    /// The persistent store, or `None` if the environment has none.
    fn storage(&self) -> Option<Self::Storage>;

    /// Construct a watcher for `face`. Nothing happens until it is loaded.
    fn font_watcher(&self, face: &FontFace) -> Self::Watcher;
}
