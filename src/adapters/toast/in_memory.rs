//! Toast sink that keeps the visible toasts in memory.

use std::sync::{Mutex, PoisonError};

use crate::ports::{Toast, ToastId, ToastSink};

/// Records shown toasts; dismissed ones leave `visible` but stay in `history`.
#[derive(Default)]
pub struct InMemoryToastSink {
    state: Mutex<ToastLog>,
}

#[derive(Default)]
struct ToastLog {
    visible: Vec<Toast>,
    history: Vec<Toast>,
}

impl InMemoryToastSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Toasts currently on screen, oldest first.
    pub fn visible(&self) -> Vec<Toast> {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .visible
            .clone()
    }

    /// Every toast ever shown.
    pub fn history(&self) -> Vec<Toast> {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .history
            .clone()
    }
}

impl ToastSink for InMemoryToastSink {
    fn show(&self, toast: &Toast) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.visible.push(toast.clone());
        state.history.push(toast.clone());
    }

    fn dismiss(&self, id: ToastId) {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .visible
            .retain(|t| t.id != id);
    }
}
