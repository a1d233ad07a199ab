/// Maximum number of threads of the global registry.
pub const DEFAULT_MAX_THREADS: usize = 128;

/// Hazard slots per thread when a domain is configured with zero (`K`).
pub const DEFAULT_SLOTS_PER_THREAD: usize = 4;

/// Retire-list length at which `retire` triggers a scan (`R`).
///
/// Zero scans on every retire.
pub const DEFAULT_SCAN_THRESHOLD: usize = 0;

/// Per-domain options, fixed once the domain is created.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Config {
    slots_per_thread: usize,
    scan_threshold: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub const fn new() -> Self {
        Self {
            slots_per_thread: DEFAULT_SLOTS_PER_THREAD,
            scan_threshold: DEFAULT_SCAN_THRESHOLD,
        }
    }

    /// Number of pointers a single thread may protect at the same time.
    /// Zero selects [`DEFAULT_SLOTS_PER_THREAD`].
    pub const fn with_slots_per_thread(mut self, slots: usize) -> Self {
        self.slots_per_thread = if slots == 0 {
            DEFAULT_SLOTS_PER_THREAD
        } else {
            slots
        };
        self
    }

    /// Retire-list length from which each `retire` runs a scan.
    pub const fn with_scan_threshold(mut self, threshold: usize) -> Self {
        self.scan_threshold = threshold;
        self
    }

    pub const fn slots_per_thread(&self) -> usize {
        self.slots_per_thread
    }

    pub const fn scan_threshold(&self) -> usize {
        self.scan_threshold
    }

    /// Capacity of each thread's retire list in a domain serving
    /// `max_threads` threads.
    pub const fn retire_capacity(&self, max_threads: usize) -> usize {
        max_threads * self.slots_per_thread
    }
}
