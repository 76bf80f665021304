use std::future::Future;

use fout_core::{DetectionError, FontFace, FontWatcher};
use js_sys::{Array, Date, Function, Promise};
use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys::Window;

use crate::describe;

/// Pause between `document.fonts.load` attempts that matched nothing.
pub(crate) const RETRY_MS: f64 = 25.0;

/// How one race between `document.fonts.load` and the timer settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Settled {
    /// The load won with this many matching faces.
    Faces(u32),
    /// The timer won.
    TimerFired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Next {
    Loaded,
    Retry,
    TimedOut,
}

/// An empty match list means the `@font-face` rule may not be parsed yet, so
/// it is retried while time remains.
pub(crate) fn next_step(settled: Settled, remaining_ms: f64) -> Next {
    match settled {
        Settled::Faces(n) if n > 0 => Next::Loaded,
        Settled::Faces(_) if remaining_ms > 0.0 => Next::Retry,
        Settled::Faces(_) | Settled::TimerFired => Next::TimedOut,
    }
}

/// Waits on `document.fonts.load` for one face, bounded by the face's
/// timeout.
///
/// The load succeeds once at least one face matches. Attempts that match
/// nothing are repeated every [`RETRY_MS`] until the timeout elapses.
#[derive(Debug)]
pub struct FontFaceSetWatcher {
    window: Window,
    face: FontFace,
}

impl FontFaceSetWatcher {
    pub fn new(window: Window, face: FontFace) -> Self {
        Self { window, face }
    }

    fn failed(&self, message: impl Into<String>) -> DetectionError {
        DetectionError::Failed {
            family: self.face.family.clone(),
            message: message.into(),
        }
    }

    fn timed_out(&self) -> DetectionError {
        DetectionError::Timeout {
            family: self.face.family.clone(),
            timeout: self.face.timeout,
        }
    }

    /// A promise that resolves to `undefined` after `ms`.
    fn timer(&self, ms: f64) -> Promise {
        let window = self.window.clone();
        let ms = ms.clamp(0.0, f64::from(i32::MAX)) as i32;
        Promise::new(&mut |resolve: Function, reject: Function| {
            let fire = Closure::once_into_js(move || {
                let _ = resolve.call0(&JsValue::UNDEFINED);
            });
            if let Err(e) =
                window.set_timeout_with_callback_and_timeout_and_arguments_0(fire.unchecked_ref(), ms)
            {
                let _ = reject.call1(&JsValue::UNDEFINED, &e);
            }
        })
    }
}

impl FontWatcher for FontFaceSetWatcher {
    fn load(self) -> impl Future<Output = Result<(), DetectionError>> {
        async move {
            let document = self
                .window
                .document()
                .ok_or_else(|| self.failed("no document"))?;
            let fonts = document.fonts();
            let shorthand = self.face.css_shorthand();
            let deadline = Date::now() + self.face.timeout.as_millis() as f64;

            loop {
                let remaining = deadline - Date::now();
                if remaining <= 0.0 {
                    return Err(self.timed_out());
                }

                let load = match self.face.text.as_deref() {
                    Some(text) => fonts.load_with_text(&shorthand, text),
                    None => fonts.load(&shorthand),
                };
                let race = Promise::race(&Array::of2(&load, &self.timer(remaining)));
                let settled = JsFuture::from(race)
                    .await
                    .map_err(|e| self.failed(describe(&e)))?;
                let settled = match settled.dyn_into::<Array>() {
                    Ok(faces) => Settled::Faces(faces.length()),
                    Err(_) => Settled::TimerFired,
                };

                match next_step(settled, deadline - Date::now()) {
                    Next::Loaded => return Ok(()),
                    Next::TimedOut => return Err(self.timed_out()),
                    Next::Retry => {
                        let pause = RETRY_MS.min(deadline - Date::now());
                        let _ = JsFuture::from(self.timer(pause)).await;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matching_face_loads() {
        assert_eq!(next_step(Settled::Faces(1), 2000.0), Next::Loaded);
        assert_eq!(next_step(Settled::Faces(3), 0.0), Next::Loaded);
    }

    #[test]
    fn empty_match_retries_while_time_remains() {
        assert_eq!(next_step(Settled::Faces(0), 2975.0), Next::Retry);
        assert_eq!(next_step(Settled::Faces(0), 0.5), Next::Retry);
    }

    #[test]
    fn empty_match_after_deadline_times_out() {
        assert_eq!(next_step(Settled::Faces(0), 0.0), Next::TimedOut);
        assert_eq!(next_step(Settled::Faces(0), -10.0), Next::TimedOut);
    }

    #[test]
    fn timer_winning_times_out() {
        assert_eq!(next_step(Settled::TimerFired, 100.0), Next::TimedOut);
    }
}
