//! In-memory platform.
//!
//! Handles share state when cloned, the way `localStorage` and DOM nodes are
//! shared handles in a browser. Used by the native CLI for its root element
//! and by tests for everything.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::future::Future;
use std::rc::Rc;

use crate::config::FontFace;
use crate::error::{DetectionError, StorageError};
use crate::system::{ClassList, FontWatcher, Persistence, Platform};

/// Key-value store backed by a shared map.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    entries: Rc<RefCell<BTreeMap<String, String>>>,
    unavailable: Rc<Cell<bool>>,
    fail_reads: Rc<Cell<bool>>,
    fail_writes: Rc<Cell<bool>>,
    reads: Rc<Cell<usize>>,
    writes: Rc<Cell<usize>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the store as absent from the environment.
    pub fn set_available(&self, available: bool) {
        self.unavailable.set(!available);
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.set(fail);
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.set(fail);
    }

    /// Insert directly, bypassing the counters.
    pub fn insert(&self, key: &str, value: &str) {
        self.entries.borrow_mut().insert(key.to_string(), value.to_string());
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.entries.borrow().get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    /// Number of `load` calls, including failed ones.
    pub fn reads(&self) -> usize {
        self.reads.get()
    }

    /// Number of `save` calls, including failed ones.
    pub fn writes(&self) -> usize {
        self.writes.get()
    }
}

impl Persistence for MemoryStorage {
    fn is_available(&self) -> bool {
        !self.unavailable.get()
    }

    fn load(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.reads.set(self.reads.get() + 1);
        if self.fail_reads.get() {
            return Err(StorageError::new(key, "read refused"));
        }
        Ok(self.get(key))
    }

    fn save(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.writes.set(self.writes.get() + 1);
        if self.fail_writes.get() {
            return Err(StorageError::new(key, "quota exceeded"));
        }
        self.insert(key, value);
        Ok(())
    }
}

/// An element holding nothing but an ordered class list.
#[derive(Debug, Clone, Default)]
pub struct MemoryElement {
    classes: Rc<RefCell<Vec<String>>>,
}

impl MemoryElement {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_classes<I, S>(classes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let el = Self::new();
        el.classes.borrow_mut().extend(classes.into_iter().map(Into::into));
        el
    }

    pub fn classes(&self) -> Vec<String> {
        self.classes.borrow().clone()
    }

    /// Whether both handles refer to the same element.
    pub fn same_node(&self, other: &MemoryElement) -> bool {
        Rc::ptr_eq(&self.classes, &other.classes)
    }
}

impl ClassList for MemoryElement {
    fn add_class(&self, class: &str) {
        let mut classes = self.classes.borrow_mut();
        if !classes.iter().any(|c| c == class) {
            classes.push(class.to_string());
        }
    }

    fn has_class(&self, class: &str) -> bool {
        self.classes.borrow().iter().any(|c| c == class)
    }
}

/// Watcher whose result is fixed when it is constructed.
#[derive(Debug)]
pub struct ScriptedWatcher {
    outcome: Result<(), DetectionError>,
    loads: Rc<Cell<usize>>,
}

impl FontWatcher for ScriptedWatcher {
    fn load(self) -> impl Future<Output = Result<(), DetectionError>> {
        async move {
            self.loads.set(self.loads.get() + 1);
            self.outcome
        }
    }
}

/// Platform over [`MemoryStorage`], [`MemoryElement`] and [`ScriptedWatcher`].
#[derive(Debug, Clone)]
pub struct MemoryPlatform {
    pub root: MemoryElement,
    pub storage: MemoryStorage,
    has_document: bool,
    detection: Rc<RefCell<Result<(), DetectionError>>>,
    watchers: Rc<RefCell<Vec<FontFace>>>,
    loads: Rc<Cell<usize>>,
}

impl Default for MemoryPlatform {
    fn default() -> Self {
        Self {
            root: MemoryElement::new(),
            storage: MemoryStorage::new(),
            has_document: true,
            detection: Rc::new(RefCell::new(Ok(()))),
            watchers: Rc::default(),
            loads: Rc::default(),
        }
    }
}

impl MemoryPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    /// A platform with no document root element.
    pub fn without_document(mut self) -> Self {
        self.has_document = false;
        self
    }

    /// Make every watcher built from now on fail with `err`.
    pub fn fail_detection(&self, err: DetectionError) {
        *self.detection.borrow_mut() = Err(err);
    }

    /// Faces for which a watcher was constructed, in order.
    pub fn watched_faces(&self) -> Vec<FontFace> {
        self.watchers.borrow().clone()
    }

    /// Number of watchers that were actually awaited.
    pub fn loads(&self) -> usize {
        self.loads.get()
    }
}

impl Platform for MemoryPlatform {
    type Element = MemoryElement;
    type Storage = MemoryStorage;
    type Watcher = ScriptedWatcher;

    fn document_element(&self) -> Option<MemoryElement> {
        self.has_document.then(|| self.root.clone())
    }

    fn storage(&self) -> Option<MemoryStorage> {
        Some(self.storage.clone())
    }

    fn font_watcher(&self, face: &FontFace) -> ScriptedWatcher {
        self.watchers.borrow_mut().push(face.clone());
        ScriptedWatcher {
            outcome: self.detection.borrow().clone(),
            loads: self.loads.clone(),
        }
    }
}
