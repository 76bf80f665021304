use std::future::Future;

use log::{debug, warn};

use crate::config::{FoutOptions, ResolvedOptions};
use crate::error::CoreError;
use crate::system::{ClassList, FontWatcher, Persistence, Platform};

/// Value written under the marker key once the font has loaded.
pub const MARKER_VALUE: &str = "1";

/// What [`fout`] did with the class.
#[must_use = "a pending load does nothing unless awaited"]
pub enum Loading<F> {
    /// Marker found: the class was applied synchronously.
    Applied,
    /// Marker missing: awaiting the future applies the class and writes the
    /// marker once the font is ready.
    Pending(F),
}

impl<F> Loading<F> {
    pub fn is_applied(&self) -> bool {
        matches!(self, Loading::Applied)
    }

    pub fn into_pending(self) -> Option<F> {
        match self {
            Loading::Applied => None,
            Loading::Pending(fut) => Some(fut),
        }
    }
}

impl<F> Loading<F>
where
    F: Future<Output = Result<(), CoreError>>,
{
    /// Drive a pending load to completion. Immediate for [`Loading::Applied`].
    pub async fn finish(self) -> Result<(), CoreError> {
        match self {
            Loading::Applied => Ok(()),
            Loading::Pending(fut) => fut.await,
        }
    }
}

/// Add `font_loaded_class` to the container once `font_name` is available.
///
/// If the store already holds a marker for the font, the class is added
/// before this returns. Otherwise a watcher is constructed and the returned
/// future adds the class and records the marker when the watcher resolves.
///
/// Invalid options fail here with no side effects. Detection failures fail
/// the future; the class is then never added and nothing is written. Storage
/// errors are never surfaced: a failed read is a cache miss and a failed
/// write is logged.
pub fn fout<P: Platform>(
    platform: &P,
    options: FoutOptions<P::Element>,
) -> Result<Loading<impl Future<Output = Result<(), CoreError>>>, CoreError> {
    let ResolvedOptions {
        container,
        stored_key,
        font_loaded_class,
        face,
    } = options.resolve(platform)?;

    let storage = platform.storage().filter(|s| s.is_available());
    if storage.is_none() {
        debug!("[fout] persistent storage unavailable; waiting for '{}'", face.family);
    }

    if let Some(storage) = &storage {
        if is_marked(storage, &stored_key) {
            debug!("[fout] marker '{stored_key}' present; applying '{font_loaded_class}'");
            container.add_class(&font_loaded_class);
            return Ok(Loading::Applied);
        }
    }

    let watcher = platform.font_watcher(&face);
    Ok(Loading::Pending(async move {
        watcher.load().await?;

        container.add_class(&font_loaded_class);
        debug!("[fout] '{}' loaded; applied '{font_loaded_class}'", face.family);

        if let Some(storage) = storage {
            if let Err(e) = storage.save(&stored_key, MARKER_VALUE) {
                warn!("[fout] could not record marker: {e}");
            }
        }
        Ok::<(), CoreError>(())
    }))
}

/// A present, non-empty value counts as a marker. Read errors count as absent.
fn is_marked<S: Persistence>(storage: &S, key: &str) -> bool {
    match storage.load(key) {
        Ok(value) => value.is_some_and(|v| !v.is_empty()),
        Err(e) => {
            debug!("[fout] treating unreadable marker as missing: {e}");
            false
        }
    }
}
