// src/signal.rs
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use log::{info, warn};
/// Shared "please stop" flag, raised by Ctrl-C and polled by blocking loops.
#[derive(Clone, Debug, Default)]
pub struct StopSignal(Arc<AtomicBool>);
impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }
    /// Routes SIGINT / Ctrl-C to this flag for the rest of the process.
    /// A second install only logs a warning.
    pub fn install_ctrlc(self) -> Self {
        let flag = self.clone();
        let installed = ctrlc::set_handler(move || {
            if !flag.is_triggered() {
                info!("interrupt received, stopping");
            }
            flag.trigger();
        });
        if let Err(err) = installed {
            warn!("could not install Ctrl-C handler: {err}");
        }
        self
    }
    pub fn trigger(&self) {
        self.0.store(true, Ordering::SeqCst);
    }
    pub fn is_triggered(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn clones_share_the_flag() {
        let signal = StopSignal::new();
        let seen_by_handler = signal.clone();
        assert!(!signal.is_triggered());
        std::thread::spawn(move || seen_by_handler.trigger())
            .join()
            .unwrap();
        assert!(signal.is_triggered());
    }
}
