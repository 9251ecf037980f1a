//! Event Loop Configuration

/// Event loop configuration options
#[derive(Debug, Clone)]
pub struct LoopConfig {
    /// Ticks [`EventLoop::run_until_idle`](crate::EventLoop::run_until_idle)
    /// may run before giving up
    pub max_ticks: usize,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self { max_ticks: 1_000 }
    }
}
