use std::time::Duration;

use serde::Deserialize;

use crate::error::CoreError;
use crate::system::Platform;

/// Namespace prepended to the font name when no explicit storage key is given.
pub const STORAGE_KEY_PREFIX: &str = "fout-loader__";

/// How long a watcher waits for a face before giving up, unless overridden.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(3000);

/// Options accepted by [`crate::fout`].
///
/// Deserializes from the camelCase object shape used by page scripts
/// (`{"fontName": "Inter", "fontLoadedClass": "fonts-loaded"}`). Missing
/// required fields deserialize to empty strings and are rejected by
/// [`FoutOptions::resolve`]. The container can only be set in code.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", bound(deserialize = ""))]
pub struct FoutOptions<E> {
    /// Font family to watch.
    #[serde(default)]
    pub font_name: String,
    /// Class added to the container once the font is ready.
    #[serde(default)]
    pub font_loaded_class: String,
    /// Element receiving the class. Defaults to the document root element.
    #[serde(skip)]
    pub container: Option<E>,
    /// Marker key. Defaults to [`STORAGE_KEY_PREFIX`] + `font_name`.
    #[serde(default)]
    pub local_storage_key: Option<String>,
    #[serde(default)]
    pub weight: Option<String>,
    #[serde(default)]
    pub style: Option<String>,
    #[serde(default)]
    pub stretch: Option<String>,
    /// Sample text the watcher should test with.
    #[serde(default)]
    pub text: Option<String>,
    /// Watcher timeout in milliseconds.
    #[serde(default, rename = "timeout")]
    pub timeout_ms: Option<u64>,
}

impl<E> Default for FoutOptions<E> {
    fn default() -> Self {
        Self {
            font_name: String::new(),
            font_loaded_class: String::new(),
            container: None,
            local_storage_key: None,
            weight: None,
            style: None,
            stretch: None,
            text: None,
            timeout_ms: None,
        }
    }
}

impl<E> FoutOptions<E> {
    pub fn new(font_name: impl Into<String>, font_loaded_class: impl Into<String>) -> Self {
        Self {
            font_name: font_name.into(),
            font_loaded_class: font_loaded_class.into(),
            ..Self::default()
        }
    }

    pub fn container(mut self, container: E) -> Self {
        self.container = Some(container);
        self
    }

    pub fn local_storage_key(mut self, key: impl Into<String>) -> Self {
        self.local_storage_key = Some(key.into());
        self
    }

    pub fn weight(mut self, weight: impl Into<String>) -> Self {
        self.weight = Some(weight.into());
        self
    }

    pub fn style(mut self, style: impl Into<String>) -> Self {
        self.style = Some(style.into());
        self
    }

    pub fn stretch(mut self, stretch: impl Into<String>) -> Self {
        self.stretch = Some(stretch.into());
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = Some(timeout.as_millis() as u64);
        self
    }

    /// Check that both required fields are present.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.font_name.is_empty() || self.font_loaded_class.is_empty() {
            return Err(CoreError::InvalidArgument(
                "fontName or fontLoadedClass missing from fout() arguments".into(),
            ));
        }
        Ok(())
    }

    /// The marker key these options resolve to. An empty explicit key falls
    /// back to the derived one.
    pub fn stored_key(&self) -> String {
        match self.local_storage_key.as_deref() {
            Some(key) if !key.is_empty() => key.to_string(),
            _ => storage_key(&self.font_name),
        }
    }

    /// The face descriptor handed to the platform's font watcher.
    pub fn font_face(&self) -> FontFace {
        let descriptor = |value: &Option<String>| match value.as_deref() {
            Some(v) if !v.is_empty() => v.to_string(),
            _ => "normal".to_string(),
        };
        FontFace {
            family: self.font_name.clone(),
            weight: descriptor(&self.weight),
            style: descriptor(&self.style),
            stretch: descriptor(&self.stretch),
            text: self.text.clone().filter(|t| !t.is_empty()),
            timeout: self.timeout_ms.map(Duration::from_millis).unwrap_or(DEFAULT_TIMEOUT),
        }
    }

    /// Validate and fill in every default. Performs no storage access.
    pub fn resolve<P>(self, platform: &P) -> Result<ResolvedOptions<E>, CoreError>
    where
        P: Platform<Element = E>,
    {
        self.validate()?;
        let stored_key = self.stored_key();
        let face = self.font_face();
        let container = match self.container {
            Some(container) => container,
            None => platform.document_element().ok_or_else(|| {
                CoreError::Container("no container given and no document root element".into())
            })?,
        };
        Ok(ResolvedOptions {
            container,
            stored_key,
            font_loaded_class: self.font_loaded_class,
            face,
        })
    }
}

/// [`FoutOptions`] with every default filled in.
#[derive(Debug, Clone)]
pub struct ResolvedOptions<E> {
    pub container: E,
    pub stored_key: String,
    pub font_loaded_class: String,
    pub face: FontFace,
}

/// Derived marker key for a font family.
pub fn storage_key(font_name: &str) -> String {
    format!("{STORAGE_KEY_PREFIX}{font_name}")
}

/// Descriptor of the face a watcher waits for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FontFace {
    pub family: String,
    pub weight: String,
    pub style: String,
    pub stretch: String,
    pub text: Option<String>,
    pub timeout: Duration,
}

impl FontFace {
    /// CSS `font` shorthand suitable for `document.fonts.load`.
    pub fn css_shorthand(&self) -> String {
        let family = self.family.replace('\\', "\\\\").replace('"', "\\\"");
        format!(
            "{} {} {} 100px \"{}\"",
            self.style, self.weight, self.stretch, family
        )
    }
}
