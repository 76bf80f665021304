use std::path::PathBuf;
use std::time::Duration;

use fout_core::memory::MemoryElement;
use fout_core::{FontFace, Platform};

use crate::fonts::{FontDirWatcher, DEFAULT_POLL};
use crate::store::JsonFileStore;

/// Native stand-in for a browser: a JSON marker file, an in-memory root
/// element, and font-directory polling.
#[derive(Debug, Clone)]
pub struct NativePlatform {
    pub root: MemoryElement,
    store: Option<JsonFileStore>,
    font_dirs: Vec<PathBuf>,
    poll: Duration,
}

impl NativePlatform {
    /// `store: None` behaves like a browser with storage disabled.
    pub fn new(store: Option<JsonFileStore>, font_dirs: Vec<PathBuf>) -> Self {
        Self {
            root: MemoryElement::new(),
            store,
            font_dirs,
            poll: DEFAULT_POLL,
        }
    }

    pub fn with_poll(mut self, poll: Duration) -> Self {
        self.poll = poll;
        self
    }
}

impl Platform for NativePlatform {
    type Element = MemoryElement;
    type Storage = JsonFileStore;
    type Watcher = FontDirWatcher;

    fn document_element(&self) -> Option<MemoryElement> {
        Some(self.root.clone())
    }

    fn storage(&self) -> Option<JsonFileStore> {
        self.store.clone()
    }

    fn font_watcher(&self, face: &FontFace) -> FontDirWatcher {
        FontDirWatcher::new(self.font_dirs.clone(), face.clone(), self.poll)
    }
}
