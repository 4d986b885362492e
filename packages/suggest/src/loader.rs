//! Script tag generation for the browser-side places library.
//!
//! Pages embedding the places widget need the Google Maps JavaScript API
//! loaded with the `places` library. [`ScriptLoader`] builds that tag at
//! most once; a second attempt is an error rather than a silent no-op so
//! duplicated loads are caught early.

use std::fmt::Write as _;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::SuggestError;

/// Base URL of the Maps JavaScript API.
pub const SCRIPT_BASE_URL: &str = "https://maps.googleapis.com/maps/api/js";

/// Global callback invoked by the API once loaded.
pub const INIT_CALLBACK: &str = "initVGAMaps";

/// Credentials for the Maps JavaScript API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiKey {
    /// A plain API key, sent as `key=`.
    Key(String),
    /// Arbitrary URL parameters (e.g. `client` for premium plans, `v`,
    /// `language`). Later entries override earlier ones with the same name.
    Params(Vec<(String, String)>),
}

impl ApiKey {
    /// Interprets a JSON value: a string is a key, an object is a
    /// parameter bag.
    ///
    /// # Errors
    ///
    /// Returns [`SuggestError::MalformedApiKey`] for any other JSON type.
    pub fn from_value(value: &serde_json::Value) -> Result<Self, SuggestError> {
        match value {
            serde_json::Value::String(key) => Ok(Self::Key(key.clone())),
            serde_json::Value::Object(params) => Ok(Self::Params(
                params
                    .iter()
                    .map(|(name, value)| {
                        let value = value
                            .as_str()
                            .map_or_else(|| value.to_string(), String::from);
                        (name.clone(), value)
                    })
                    .collect(),
            )),
            _ => Err(SuggestError::MalformedApiKey),
        }
    }
}

/// What the page already has loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageGlobals {
    /// No maps library.
    Empty,
    /// Maps with the places library.
    MapsWithPlaces,
    /// Maps without the places library.
    MapsWithoutPlaces,
}

/// A `<script>` element loading the API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptTag {
    /// Script URL.
    pub src: String,
}

impl std::fmt::Display for ScriptTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            r#"<script src="{}" async defer></script>"#,
            self.src.replace('&', "&amp;").replace('"', "&quot;")
        )
    }
}

/// Builds the API script URL.
///
/// Parameters are `libraries=places`, `callback=initVGAMaps`, then the key
/// or the caller's parameters, each URI-component encoded. `version` is
/// appended verbatim as `&v=`.
#[must_use]
pub fn script_url(api_key: &ApiKey, version: Option<&str>) -> String {
    let mut options: Vec<(String, String)> = vec![
        ("libraries".to_string(), "places".to_string()),
        ("callback".to_string(), INIT_CALLBACK.to_string()),
    ];

    match api_key {
        ApiKey::Key(key) => set_option(&mut options, "key", key),
        ApiKey::Params(params) => {
            for (name, value) in params {
                set_option(&mut options, name, value);
            }
        }
    }

    let parameters = options
        .iter()
        .map(|(name, value)| {
            format!(
                "{}={}",
                encode_uri_component(name),
                encode_uri_component(value)
            )
        })
        .collect::<Vec<_>>()
        .join("&");

    let mut url = format!("{SCRIPT_BASE_URL}?{parameters}");
    if let Some(version) = version.filter(|v| !v.is_empty()) {
        write!(url, "&v={version}").unwrap();
    }
    url
}

/// Replaces the value of `name`, keeping its position, or appends it.
fn set_option(options: &mut Vec<(String, String)>, name: &str, value: &str) {
    if let Some(existing) = options.iter_mut().find(|(n, _)| n == name) {
        existing.1 = value.to_string();
    } else {
        options.push((name.to_string(), value.to_string()));
    }
}

/// Percent-encodes everything except `A-Z a-z 0-9 - _ . ! ~ * ' ( )`.
fn encode_uri_component(s: &str) -> String {
    let mut encoded = String::with_capacity(s.len());
    for byte in s.bytes() {
        if byte.is_ascii_alphanumeric() || b"-_.!~*'()".contains(&byte) {
            encoded.push(char::from(byte));
        } else {
            write!(encoded, "%{byte:02X}").unwrap();
        }
    }
    encoded
}

/// Emits the API script tag at most once.
#[derive(Debug, Default)]
pub struct ScriptLoader {
    injected: AtomicBool,
}

impl ScriptLoader {
    /// Creates a loader that has not injected anything yet.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            injected: AtomicBool::new(false),
        }
    }

    /// Returns the script tag to inject, or `None` when the page already
    /// has the maps library with places.
    ///
    /// # Errors
    ///
    /// Returns [`SuggestError::MissingPlacesLibrary`] if the page has maps
    /// without places, and [`SuggestError::AlreadyLoaded`] if this loader
    /// already produced a tag.
    pub fn load(
        &self,
        page: PageGlobals,
        api_key: &ApiKey,
        version: Option<&str>,
    ) -> Result<Option<ScriptTag>, SuggestError> {
        match page {
            PageGlobals::MapsWithPlaces => {
                log::debug!("Maps with places already present; not loading again");
                Ok(None)
            }
            PageGlobals::MapsWithoutPlaces => Err(SuggestError::MissingPlacesLibrary),
            PageGlobals::Empty => {
                if self.injected.swap(true, Ordering::SeqCst) {
                    return Err(SuggestError::AlreadyLoaded);
                }
                let tag = ScriptTag {
                    src: script_url(api_key, version),
                };
                log::info!("Loading places library from {}", SCRIPT_BASE_URL);
                Ok(Some(tag))
            }
        }
    }
}

static PAGE_LOADER: ScriptLoader = ScriptLoader::new();

/// Process-wide [`ScriptLoader::load`].
///
/// # Errors
///
/// See [`ScriptLoader::load`]; a second successful-path call in the same
/// process fails with [`SuggestError::AlreadyLoaded`].
pub fn load_gmaps(
    page: PageGlobals,
    api_key: &ApiKey,
    version: Option<&str>,
) -> Result<Option<ScriptTag>, SuggestError> {
    PAGE_LOADER.load(page, api_key, version)
}
