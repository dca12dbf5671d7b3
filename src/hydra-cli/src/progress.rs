//! Progress display and cooperative cancellation

use indicatif::{ProgressBar, ProgressStyle};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

const TEMPLATE: &str = "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}";

/// Bar over `len` steps in the shared template
pub fn bar(len: u64) -> ProgressBar {
    let pb = ProgressBar::new(len);
    if let Ok(style) = ProgressStyle::default_bar().template(TEMPLATE) {
        pb.set_style(style.progress_chars("#>-"));
    }
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Bar for a percentage reported as f32
pub fn percent_bar(message: &'static str) -> ProgressBar {
    let pb = bar(100);
    pb.set_message(message);
    pb
}

/// Shared stop flag, polled between blocks and between assets
#[derive(Debug, Clone, Default)]
pub struct Cancel(Arc<AtomicBool>);

impl Cancel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flag that trips itself after `timeout`, if one is given
    pub fn with_timeout(timeout: Option<Duration>) -> Self {
        let cancel = Self::new();
        if let Some(timeout) = timeout {
            let flag = cancel.clone();
            thread::spawn(move || {
                thread::sleep(timeout);
                tracing::warn!(seconds = timeout.as_secs(), "Timed out, stopping after current asset");
                flag.cancel();
            });
        }
        cancel
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_is_shared() {
        let cancel = Cancel::new();
        let observer = cancel.clone();
        assert!(!observer.is_cancelled());
        cancel.cancel();
        assert!(observer.is_cancelled());
    }

    #[test]
    fn test_cancel_timeout_trips() {
        let cancel = Cancel::with_timeout(Some(Duration::from_millis(10)));
        for _ in 0..200 {
            if cancel.is_cancelled() {
                return;
            }
            thread::sleep(Duration::from_millis(10));
        }
        panic!("timeout never tripped");
    }

    #[test]
    fn test_bar_length() {
        let pb = bar(7);
        assert_eq!(pb.length(), Some(7));
        pb.finish_and_clear();
    }
}
