//! Browser platform for `fout`.
//!
//! Storage is `window.localStorage`, containers are DOM elements, and font
//! detection goes through `document.fonts.load`. [`fout_js`] exposes the
//! loader to page scripts as `fout(options)`.

mod options;
mod watcher;

use fout_core::{fout, ClassList, CoreError, FontFace, Loading, Persistence, Platform, StorageError};
use log::warn;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::future_to_promise;
use web_sys::{Element, Storage, Window};

pub use watcher::FontFaceSetWatcher;

/// `window.localStorage`.
#[derive(Debug, Clone)]
pub struct LocalStorage(Storage);

impl Persistence for LocalStorage {
    fn load(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.0
            .get_item(key)
            .map_err(|e| StorageError::new(key, describe(&e)))
    }

    fn save(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.0
            .set_item(key, value)
            .map_err(|e| StorageError::new(key, describe(&e)))
    }
}

/// A DOM element, mutated through its `classList`.
#[derive(Debug, Clone)]
pub struct DomElement(pub Element);

impl ClassList for DomElement {
    fn add_class(&self, class: &str) {
        if let Err(e) = self.0.class_list().add_1(class) {
            warn!("[fout] classList.add('{class}') failed: {}", describe(&e));
        }
    }

    fn has_class(&self, class: &str) -> bool {
        self.0.class_list().contains(class)
    }
}

/// The current browsing context.
#[derive(Debug, Clone)]
pub struct WebPlatform {
    window: Window,
}

impl WebPlatform {
    /// `None` outside a window context (workers, Node).
    pub fn new() -> Option<Self> {
        web_sys::window().map(|window| Self { window })
    }
}

impl Platform for WebPlatform {
    type Element = DomElement;
    type Storage = LocalStorage;
    type Watcher = FontFaceSetWatcher;

    fn document_element(&self) -> Option<DomElement> {
        self.window
            .document()
            .and_then(|doc| doc.document_element())
            .map(DomElement)
    }

    fn storage(&self) -> Option<LocalStorage> {
        // Throws a SecurityError when storage is disabled for the origin.
        self.window.local_storage().ok().flatten().map(LocalStorage)
    }

    fn font_watcher(&self, face: &FontFace) -> FontFaceSetWatcher {
        FontFaceSetWatcher::new(self.window.clone(), face.clone())
    }
}

/// `fout(options)` for page scripts.
///
/// Throws on missing `fontName`/`fontLoadedClass` or a `container` that is
/// not an Element. Returns `undefined` when
/// the class was applied from the cached marker, otherwise a `Promise` that
/// resolves once the font has loaded and the class is applied.
#[wasm_bindgen(js_name = fout)]
pub fn fout_js(options: JsValue) -> Result<JsValue, JsValue> {
    let options = options::from_js(&options).map_err(to_js)?;
    let platform = WebPlatform::new().ok_or_else(|| js_error("fout() requires a window"))?;

    match fout(&platform, options).map_err(to_js)? {
        Loading::Applied => Ok(JsValue::UNDEFINED),
        Loading::Pending(load) => {
            let promise = future_to_promise(async move {
                load.await.map_err(to_js)?;
                Ok(JsValue::UNDEFINED)
            });
            Ok(promise.into())
        }
    }
}

fn to_js(err: CoreError) -> JsValue {
    js_error(&err.to_string())
}

fn js_error(message: &str) -> JsValue {
    js_sys::Error::new(message).into()
}

/// Best-effort text for a thrown JS value.
pub(crate) fn describe(value: &JsValue) -> String {
    if let Some(s) = value.as_string() {
        return s;
    }
    if let Some(err) = value.dyn_ref::<js_sys::Error>() {
        return String::from(err.message());
    }
    format!("{value:?}")
}

#[cfg(all(test, target_arch = "wasm32"))]
mod tests {
    use super::*;
    use js_sys::{Object, Promise, Reflect};
    use wasm_bindgen_futures::JsFuture;
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    fn options(pairs: &[(&str, JsValue)]) -> JsValue {
        let obj = Object::new();
        for (key, value) in pairs {
            Reflect::set(&obj, &JsValue::from_str(key), value).unwrap();
        }
        obj.into()
    }

    fn element() -> Element {
        let document = web_sys::window().unwrap().document().unwrap();
        document.create_element("div").unwrap()
    }

    fn local_storage() -> Storage {
        web_sys::window().unwrap().local_storage().unwrap().unwrap()
    }

    #[wasm_bindgen_test]
    fn recorded_marker_returns_undefined_and_applies() {
        local_storage().set_item("fout-loader__CachedFace", "1").unwrap();
        let el = element();
        let result = fout_js(options(&[
            ("fontName", "CachedFace".into()),
            ("fontLoadedClass", "cached-loaded".into()),
            ("container", el.clone().into()),
        ]))
        .unwrap();
        assert!(result.is_undefined());
        assert!(el.class_list().contains("cached-loaded"));
        local_storage().remove_item("fout-loader__CachedFace").unwrap();
    }

    #[wasm_bindgen_test]
    async fn missing_font_returns_promise_that_rejects() {
        let el = element();
        let result = fout_js(options(&[
            ("fontName", "NoSuchFace".into()),
            ("fontLoadedClass", "never".into()),
            ("container", el.clone().into()),
            ("timeout", JsValue::from_f64(0.0)),
        ]))
        .unwrap();
        let promise = result.dyn_into::<Promise>().unwrap();
        let err = JsFuture::from(promise).await.unwrap_err();
        assert!(describe(&err).contains("not available"));
        assert!(!el.class_list().contains("never"));
        assert!(local_storage().get_item("fout-loader__NoSuchFace").unwrap().is_none());
    }

    #[wasm_bindgen_test]
    fn non_element_container_throws() {
        let err = fout_js(options(&[
            ("fontName", "Inter".into()),
            ("fontLoadedClass", "loaded".into()),
            ("container", "#root".into()),
        ]))
        .unwrap_err();
        assert!(describe(&err).contains("container is not an Element"));
    }

    #[wasm_bindgen_test]
    fn non_object_argument_throws() {
        let err = fout_js(JsValue::from_str("Inter")).unwrap_err();
        assert!(describe(&err).contains("invalid argument"));
    }

    #[wasm_bindgen_test]
    fn numeric_weight_is_accepted() {
        let result = fout_js(options(&[
            ("fontName", "WeightedFace".into()),
            ("fontLoadedClass", "loaded".into()),
            ("container", element().into()),
            ("weight", JsValue::from_f64(700.0)),
            ("timeout", JsValue::from_f64(0.0)),
        ]))
        .unwrap();
        assert!(result.is_instance_of::<Promise>());
    }
}
