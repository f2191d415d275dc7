//! Bulk load configuration.

/// Configuration for [`load`](crate::load).
#[derive(Clone, Debug)]
pub struct LoadConfig {
    /// Number of decoder threads. `None` = auto-detect
    /// (`available_parallelism`, falling back to 4). Explicit values are
    /// clamped to `[1, 256]`. Never more threads than elements are used.
    pub threads: Option<usize>,
    /// Initial per-worker payload buffer in bytes. Default: 1 MiB.
    /// Workers grow their buffer when a payload is larger.
    pub initial_buffer: usize,
}

impl LoadConfig {
    /// Default initial payload buffer.
    pub const DEFAULT_INITIAL_BUFFER: usize = 1 << 20;

    /// Upper bound on decoder threads.
    pub const MAX_THREADS: usize = 256;

    /// A config with an explicit thread count.
    pub fn with_threads(threads: usize) -> Self {
        Self {
            threads: Some(threads),
            ..Self::default()
        }
    }

    /// Resolve the decoder thread count.
    pub fn resolved_threads(&self) -> usize {
        match self.threads {
            Some(n) => n.clamp(1, Self::MAX_THREADS),
            None => std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4)
                .min(Self::MAX_THREADS),
        }
    }
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            threads: None,
            initial_buffer: Self::DEFAULT_INITIAL_BUFFER,
        }
    }
}
