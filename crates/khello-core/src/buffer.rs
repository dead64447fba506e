//! Fixed capacity data buffer

/// Total storage, including the terminating zero
pub const CAPACITY: usize = 32;

/// Largest payload a single write keeps
pub const MAX_PAYLOAD: usize = CAPACITY - 1;

/// Byte store behind the synchronized channel.
///
/// `data[len]` is always zero; bytes past it are left from earlier writes.
pub struct DataBuffer {
    data: [u8; CAPACITY],
    len: usize,
}

impl DataBuffer {
    /// Create a zeroed, empty buffer
    pub const fn new() -> Self {
        Self {
            data: [0; CAPACITY],
            len: 0,
        }
    }

    /// Number of payload bytes held
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Current payload
    pub fn as_bytes(&self) -> &[u8] {
        &self.data[..self.len]
    }

    /// Replace the payload, truncating to `MAX_PAYLOAD`. Returns bytes kept.
    pub fn store(&mut self, src: &[u8]) -> usize {
        let n = src.len().min(MAX_PAYLOAD);
        self.data[..n].copy_from_slice(&src[..n]);
        self.data[n] = 0;
        self.len = n;
        n
    }

    /// Payload up to the first zero byte, as text
    pub fn text(&self) -> String {
        let end = self
            .as_bytes()
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(self.len);
        String::from_utf8_lossy(&self.data[..end]).into_owned()
    }
}

impl Default for DataBuffer {
    fn default() -> Self {
        Self::new()
    }
}
