use std::future::Future;

use crate::error::DetectionError;

/// A single pending check that one font face is ready for rendering.
///
/// Any timeout belongs to the watcher; the loader never imposes one.
pub trait FontWatcher {
    /// Resolve once the font is confirmed available, or fail on timeout or
    /// load error.
    fn load(self) -> impl Future<Output = Result<(), DetectionError>>;
}
