//! Toast sink for headless runs: toasts become log lines.

use crate::ports::{Toast, ToastId, ToastLevel, ToastSink};

#[derive(Debug, Default, Clone, Copy)]
pub struct TracingToastSink;

impl ToastSink for TracingToastSink {
    fn show(&self, toast: &Toast) {
        let title = toast.title.as_deref().unwrap_or("");
        match toast.level {
            ToastLevel::Error => tracing::error!(toast_id = %toast.id, title, "{}", toast.message),
            ToastLevel::Warning => tracing::warn!(toast_id = %toast.id, title, "{}", toast.message),
            ToastLevel::Info | ToastLevel::Success => {
                tracing::info!(toast_id = %toast.id, title, "{}", toast.message)
            }
        }
    }

    fn dismiss(&self, id: ToastId) {
        tracing::trace!(toast_id = %id, "toast dismissed");
    }
}
