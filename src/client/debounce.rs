use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::config::ClientConfig;

/// Emits a value only after `delay` passes without a newer one.
///
/// Each [`Debouncer::push`] cancels the pending timer and starts a new one;
/// only a timer that runs to completion forwards its value to the receiver.
#[derive(Debug)]
pub struct Debouncer<T> {
    delay: Duration,
    tx: mpsc::UnboundedSender<T>,
    pending: Option<CancellationToken>,
}

impl<T: Send + 'static> Debouncer<T> {
    pub fn new(delay: Duration) -> (Self, mpsc::UnboundedReceiver<T>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                delay,
                tx,
                pending: None,
            },
            rx,
        )
    }

    pub fn push(&mut self, value: T) {
        self.cancel();

        let token = CancellationToken::new();
        let timer = token.clone();
        let tx = self.tx.clone();
        let delay = self.delay;

        tokio::spawn(async move {
            tokio::select! {
                biased;
                _ = timer.cancelled() => {}
                _ = tokio::time::sleep(delay) => {
                    // Receiver gone means the view is gone; nothing to do.
                    let _ = tx.send(value);
                    timer.cancel();
                }
            }
        });

        self.pending = Some(token);
    }

    /// Skip the quiet period: drop any pending value and emit `value` now.
    pub fn flush_now(&mut self, value: T) {
        self.cancel();
        let _ = self.tx.send(value);
    }

    pub fn cancel(&mut self) {
        if let Some(token) = self.pending.take() {
            token.cancel();
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending
            .as_ref()
            .is_some_and(|token| !token.is_cancelled())
    }
}

impl<T> Drop for Debouncer<T> {
    fn drop(&mut self) {
        if let Some(token) = self.pending.take() {
            token.cancel();
        }
    }
}

/// Search box state: the raw text updates on every keystroke, the filter
/// is dispatched through the debouncer.
#[derive(Debug)]
pub struct SearchInput {
    text: String,
    debouncer: Debouncer<String>,
}

impl SearchInput {
    pub fn new(delay: Duration) -> (Self, mpsc::UnboundedReceiver<String>) {
        let (debouncer, rx) = Debouncer::new(delay);
        (
            Self {
                text: String::new(),
                debouncer,
            },
            rx,
        )
    }

    /// Search box using the client's configured quiet period.
    pub fn from_config(config: &ClientConfig) -> (Self, mpsc::UnboundedReceiver<String>) {
        Self::new(Duration::from_millis(config.search_debounce_ms))
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn on_input(&mut self, text: impl Into<String>) {
        self.text = text.into();
        self.debouncer.push(self.text.clone());
    }

    /// Clearing takes effect at once.
    pub fn clear(&mut self) {
        self.text.clear();
        self.debouncer.flush_now(String::new());
    }

    /// Mirror a filter changed elsewhere (e.g. "clear all filters") without dispatching.
    pub fn sync(&mut self, applied: &str) {
        self.debouncer.cancel();
        self.text = applied.to_string();
    }
}
