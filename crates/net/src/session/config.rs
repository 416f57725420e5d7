const DEFAULT_RECEIVE_BUFFER_CAPACITY: usize = 8 * 1024;
const DEFAULT_MAX_RECEIVE_BUFFER: usize = 8 * 1024 * 1024;
const DEFAULT_SEND_HIGH_WATER: usize = 1024 * 1024;
const DEFAULT_SEND_LOW_WATER: usize = 256 * 1024;

/// Per-session buffer limits and disconnect behavior.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    receive_buffer_capacity: usize,
    max_receive_buffer: usize,
    send_high_water: usize,
    send_low_water: usize,
    flush_on_disconnect: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            receive_buffer_capacity: DEFAULT_RECEIVE_BUFFER_CAPACITY,
            max_receive_buffer: DEFAULT_MAX_RECEIVE_BUFFER,
            send_high_water: DEFAULT_SEND_HIGH_WATER,
            send_low_water: DEFAULT_SEND_LOW_WATER,
            flush_on_disconnect: true,
        }
    }
}

impl SessionConfig {
    pub fn new() -> Self {
        Default::default()
    }

    /// Free space reserved in the receive buffer before every read.
    pub fn with_receive_buffer_capacity(mut self, capacity: usize) -> Self {
        self.receive_buffer_capacity = capacity.max(1);
        self
    }

    /// Unconsumed received bytes above this limit disconnect the session with `BufferOverflow`.
    pub fn with_max_receive_buffer(mut self, limit: usize) -> Self {
        self.max_receive_buffer = limit;
        self
    }

    pub fn with_send_high_water(mut self, high_water: usize) -> Self {
        self.send_high_water = high_water;
        self
    }

    pub fn with_send_low_water(mut self, low_water: usize) -> Self {
        self.send_low_water = low_water;
        self
    }

    /// Whether a requested disconnect writes out the queued data first.
    pub fn with_flush_on_disconnect(mut self, flush: bool) -> Self {
        self.flush_on_disconnect = flush;
        self
    }

    pub fn receive_buffer_capacity(&self) -> usize {
        self.receive_buffer_capacity
    }

    pub fn max_receive_buffer(&self) -> usize {
        self.max_receive_buffer
    }

    pub fn send_high_water(&self) -> usize {
        self.send_high_water
    }

    /// The low water mark, never above the high water mark.
    pub fn send_low_water(&self) -> usize {
        self.send_low_water.min(self.send_high_water)
    }

    pub fn flush_on_disconnect(&self) -> bool {
        self.flush_on_disconnect
    }
}
