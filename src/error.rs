//! Structured error types for cellgrid.
//!
//! Only the two asynchronous operations (commit and clipboard write) surface
//! errors. Expected gesture conditions such as a press that hits no cell are
//! silent no-ops and never reach this type.

/// All errors that can be reported by the grid engine.
#[derive(Debug, thiserror::Error)]
pub enum GridError {
    /// The commit callback rejected a confirmed edit.
    #[error("Commit failed for {row_id}/{column_id}: {source}")]
    Commit {
        row_id: String,
        column_id: String,
        #[source]
        source: CommitError,
    },

    /// The system clipboard refused the write.
    #[error("Clipboard write failed: {0}")]
    Clipboard(String),

    /// A DOM query or listener registration failed.
    #[error("DOM error: {0}")]
    Dom(String),

    /// Configuration could not be decoded.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Catch-all for string errors coming from host callbacks.
    #[error("{0}")]
    Other(String),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, GridError>;

/// Reason a host commit callback gave for refusing a value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct CommitError(pub String);

impl CommitError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self(reason.into())
    }
}

impl From<String> for GridError {
    fn from(s: String) -> Self {
        Self::Other(s)
    }
}

impl From<&str> for GridError {
    fn from(s: &str) -> Self {
        Self::Other(s.to_string())
    }
}

impl From<serde_json::Error> for GridError {
    fn from(e: serde_json::Error) -> Self {
        Self::Config(e.to_string())
    }
}

#[cfg(target_arch = "wasm32")]
impl From<GridError> for wasm_bindgen::JsValue {
    fn from(e: GridError) -> Self {
        wasm_bindgen::JsValue::from_str(&e.to_string())
    }
}

/// Render a rejected JS promise value as a readable message.
#[cfg(target_arch = "wasm32")]
pub(crate) fn js_error_message(value: &wasm_bindgen::JsValue) -> String {
    if let Some(s) = value.as_string() {
        return s;
    }
    js_sys::Reflect::get(value, &wasm_bindgen::JsValue::from_str("message"))
        .ok()
        .and_then(|m| m.as_string())
        .unwrap_or_else(|| format!("{value:?}"))
}
