//! `navigator.clipboard.writeText`.

use wasm_bindgen_futures::JsFuture;

use crate::clipboard::ClipboardWriter;
use crate::error::{js_error_message, GridError, Result};
use crate::scheduler::LocalFuture;

/// Clipboard writer backed by the async Clipboard API. Needs a secure
/// context and usually a recent user gesture.
#[derive(Debug, Default, Clone, Copy)]
pub struct NavigatorClipboard;

impl ClipboardWriter for NavigatorClipboard {
    fn write_text(&self, text: String) -> LocalFuture<'static, Result<()>> {
        let promise = web_sys::window().map(|w| w.navigator().clipboard().write_text(&text));
        Box::pin(async move {
            let promise =
                promise.ok_or_else(|| GridError::Clipboard("no window".to_string()))?;
            JsFuture::from(promise)
                .await
                .map(|_| ())
                .map_err(|e| GridError::Clipboard(js_error_message(&e)))
        })
    }
}
