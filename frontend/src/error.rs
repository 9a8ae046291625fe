use thiserror::Error;
use wasm_bindgen::JsValue;

/// Failures while installing behaviors on a page.
///
/// Field validation outcomes are not errors in this sense; see
/// [`crate::controllers::validation::FieldError`].
#[derive(Debug, Error)]
pub enum InteractionError {
    #[error("{behavior}: no element matches `{selector}`")]
    MissingElement {
        behavior: &'static str,
        selector: String,
    },
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("javascript error: {0}")]
    Js(String),
}

impl From<serde_json::Error> for InteractionError {
    fn from(err: serde_json::Error) -> Self {
        InteractionError::Config(err.to_string())
    }
}

impl From<serde_wasm_bindgen::Error> for InteractionError {
    fn from(err: serde_wasm_bindgen::Error) -> Self {
        InteractionError::Config(err.to_string())
    }
}

impl From<JsValue> for InteractionError {
    fn from(value: JsValue) -> Self {
        InteractionError::Js(value.as_string().unwrap_or_else(|| format!("{:?}", value)))
    }
}
