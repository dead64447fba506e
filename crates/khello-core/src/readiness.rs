//! Readiness bitmask

bitflags::bitflags! {
    /// Poll readiness, bit-compatible with `POLLIN` / `POLLOUT`.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct PollFlags: u32 {
        /// Data is available for reading.
        const IN = 0x0001;
        /// A write would not block.
        const OUT = 0x0004;
    }
}

impl PollFlags {
    /// Combine the read and write conditions.
    ///
    /// The two bits are independent; both are set when both hold.
    pub fn compute(len: usize, busy: bool) -> Self {
        let mut flags = PollFlags::empty();
        if len > 0 {
            flags |= PollFlags::IN;
        }
        if !busy {
            flags |= PollFlags::OUT;
        }
        flags
    }

    pub fn readable(self) -> bool {
        self.contains(PollFlags::IN)
    }

    pub fn writable(self) -> bool {
        self.contains(PollFlags::OUT)
    }
}
