use super::error::StorageError;

/// An inclusive byte range `[start, end]` within a blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

impl ByteRange {
    pub fn new(start: u64, end: u64) -> Self {
        Self { start, end }
    }

    /// Number of bytes covered by the range; 0 when `end < start`.
    pub fn len(&self) -> u64 {
        if self.is_empty() {
            return 0;
        }
        (self.end - self.start).saturating_add(1)
    }

    pub fn is_empty(&self) -> bool {
        self.end < self.start
    }

    /// Check the range against a blob of `size` bytes.
    pub fn check(&self, size: u64) -> Result<(), StorageError> {
        if self.is_empty() || self.end >= size {
            return Err(StorageError::InvalidRange {
                start: self.start,
                end: self.end,
                size,
            });
        }
        Ok(())
    }
}
