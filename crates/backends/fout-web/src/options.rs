//! Reading the `fout(options)` argument object.

use fout_core::{CoreError, FoutOptions};
use js_sys::Reflect;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::Element;

use crate::DomElement;

/// What was passed as `container`.
#[derive(Debug)]
pub(crate) enum ContainerArg<E> {
    Absent,
    Element(E),
    NotAnElement,
}

/// The argument object's fields, already pulled out of JS.
#[derive(Debug)]
pub(crate) struct Fields<E> {
    pub font_name: Option<String>,
    pub font_loaded_class: Option<String>,
    pub container: ContainerArg<E>,
    pub local_storage_key: Option<String>,
    pub weight: Option<String>,
    pub style: Option<String>,
    pub stretch: Option<String>,
    pub text: Option<String>,
    pub timeout: Option<f64>,
}

impl<E> Default for Fields<E> {
    fn default() -> Self {
        Self {
            font_name: None,
            font_loaded_class: None,
            container: ContainerArg::Absent,
            local_storage_key: None,
            weight: None,
            style: None,
            stretch: None,
            text: None,
            timeout: None,
        }
    }
}

impl<E> Fields<E> {
    /// A `container` that is present but not an Element is rejected rather
    /// than replaced by the document root.
    pub fn into_options(self) -> Result<FoutOptions<E>, CoreError> {
        let container = match self.container {
            ContainerArg::Absent => None,
            ContainerArg::Element(el) => Some(el),
            ContainerArg::NotAnElement => {
                return Err(CoreError::InvalidArgument("container is not an Element".into()))
            }
        };
        Ok(FoutOptions {
            font_name: self.font_name.unwrap_or_default(),
            font_loaded_class: self.font_loaded_class.unwrap_or_default(),
            container,
            local_storage_key: self.local_storage_key,
            weight: self.weight,
            style: self.style,
            stretch: self.stretch,
            text: self.text,
            timeout_ms: self.timeout.and_then(timeout_ms),
        })
    }
}

/// Negative and non-finite timeouts fall back to the default.
pub(crate) fn timeout_ms(raw: f64) -> Option<u64> {
    (raw.is_finite() && raw >= 0.0).then(|| raw as u64)
}

/// Weights are commonly passed as numbers (`weight: 700`).
pub(crate) fn number_descriptor(n: f64) -> String {
    n.to_string()
}

/// Read the recognised fields off a JS options object. Anything that is not
/// an object yields empty options, which fail validation.
pub(crate) fn from_js(value: &JsValue) -> Result<FoutOptions<DomElement>, CoreError> {
    if !value.is_object() {
        return Fields::default().into_options();
    }
    let container = match field(value, "container") {
        None => ContainerArg::Absent,
        Some(v) => match v.dyn_into::<Element>() {
            Ok(el) => ContainerArg::Element(DomElement(el)),
            Err(_) => ContainerArg::NotAnElement,
        },
    };
    Fields {
        font_name: string(value, "fontName"),
        font_loaded_class: string(value, "fontLoadedClass"),
        container,
        local_storage_key: string(value, "localStorageKey"),
        weight: descriptor(value, "weight"),
        style: string(value, "style"),
        stretch: string(value, "stretch"),
        text: string(value, "text"),
        timeout: field(value, "timeout").and_then(|v| v.as_f64()),
    }
    .into_options()
}

fn field(obj: &JsValue, name: &str) -> Option<JsValue> {
    Reflect::get(obj, &JsValue::from_str(name))
        .ok()
        .filter(|v| !v.is_undefined() && !v.is_null())
}

fn string(obj: &JsValue, name: &str) -> Option<String> {
    field(obj, name).and_then(|v| v.as_string())
}

fn descriptor(obj: &JsValue, name: &str) -> Option<String> {
    let v = field(obj, name)?;
    v.as_string().or_else(|| v.as_f64().map(number_descriptor))
}
