/// One-way status sink for long operations. Not a cancellation channel.
pub trait ProgressSink: Send + Sync {
    fn report(&self, percent: u8, title: &str, detail: &str);
}

/// Forwards progress to the `log` facade at debug level.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogProgress;

impl ProgressSink for LogProgress {
    fn report(&self, percent: u8, title: &str, detail: &str) {
        log::debug!("{}: {}% {}", title, percent, detail);
    }
}

/// Percentage of `done` out of `total`, clamped to 0..=100.
pub fn percent(done: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    ((done.min(total) * 100) / total) as u8
}
