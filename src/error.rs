use thiserror::Error;
use wasm_bindgen::{JsCast, JsValue};

/// Reasons a load of more records can fail.
///
/// None of these are retried. The feed records the last one and keeps
/// accepting new load signals.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    /// The request never produced a response (offline, CORS, no window)
    #[error("network request failed: {0}")]
    Network(String),

    /// The server answered with a non-success status
    #[error("server responded with HTTP status {0}")]
    Status(u16),

    /// The body was not a JSON array of records
    #[error("failed to decode response body: {0}")]
    Decode(String),
}

impl LoadError {
    pub(crate) fn network(value: JsValue) -> Self {
        Self::Network(describe(&value))
    }

    pub(crate) fn decode(value: JsValue) -> Self {
        Self::Decode(describe(&value))
    }
}

impl From<serde_wasm_bindgen::Error> for LoadError {
    fn from(err: serde_wasm_bindgen::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

fn describe(value: &JsValue) -> String {
    if let Some(text) = value.as_string() {
        return text;
    }
    match value.dyn_ref::<js_sys::Error>() {
        Some(err) => err.message().into(),
        None => format!("{value:?}"),
    }
}
