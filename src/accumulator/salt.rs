//! Block-number salt.

/// Width of a serialized block number.
pub(crate) const LABEL_LEN: usize = 20;

/// Monotonic block counter; 0 is never handed out.
#[derive(Debug, Clone)]
pub(crate) struct SaltCounter {
    next: u32,
}

impl SaltCounter {
    pub(crate) fn new() -> Self {
        Self { next: 1 }
    }

    pub(crate) fn reset(&mut self) {
        self.next = 1;
    }

    /// Returns the current number as 20 zero padded decimal digits and
    /// advances the counter, skipping 0 on overflow.
    pub(crate) fn next_label(&mut self) -> [u8; LABEL_LEN] {
        let mut label = [b'0'; LABEL_LEN];
        label.copy_from_slice(format!("{:020}", self.next).as_bytes());

        self.next = self.next.wrapping_add(1);
        if self.next == 0 {
            self.next = 1;
        }
        label
    }
}
