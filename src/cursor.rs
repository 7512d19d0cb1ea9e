//! Read cursor over a data region
//!
//! Every decode operation advances the cursor it is handed. Pointer
//! dereference saves the current position, jumps to the target, decodes,
//! and puts the position back, so several structures can share one
//! physical encoding without disturbing the caller.
//!
//! The cursor is a plain value owned by the caller of a decode. Two queries
//! running at the same time each carry their own, so nothing here needs
//! synchronization.

use crate::error::{MmdbError, Result};

/// Current read offset into a data region
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadCursor {
    position: usize,
}

impl ReadCursor {
    /// Create a cursor at `position`
    pub fn new(position: usize) -> Self {
        Self { position }
    }

    /// Current offset
    #[inline]
    pub fn position(&self) -> usize {
        self.position
    }

    /// Move to an absolute offset
    #[inline]
    pub fn set_position(&mut self, position: usize) {
        self.position = position;
    }

    /// Move forward by `n` bytes
    #[inline]
    pub fn advance(&mut self, n: usize) {
        self.position += n;
    }

    /// Read the byte under the cursor and step past it
    pub fn next_byte(&mut self, buffer: &[u8]) -> Result<u8> {
        let byte = *buffer.get(self.position).ok_or_else(|| {
            MmdbError::Decode(format!(
                "Read at offset {} past end of data ({} bytes)",
                self.position,
                buffer.len()
            ))
        })?;
        self.position += 1;
        Ok(byte)
    }

    /// Borrow the next `n` bytes and step past them
    pub fn take<'a>(&mut self, buffer: &'a [u8], n: usize) -> Result<&'a [u8]> {
        let end = self
            .position
            .checked_add(n)
            .filter(|&end| end <= buffer.len())
            .ok_or_else(|| {
                MmdbError::Decode(format!(
                    "Read of {} bytes at offset {} past end of data ({} bytes)",
                    n,
                    self.position,
                    buffer.len()
                ))
            })?;
        let bytes = &buffer[self.position..end];
        self.position = end;
        Ok(bytes)
    }

    /// Decode the value at `target`, leaving this cursor where it was
    ///
    /// The saved position is restored whether `decode` succeeds or fails.
    pub fn resolve_pointer<T, F>(&mut self, target: usize, decode: F) -> Result<T>
    where
        F: FnOnce(&mut ReadCursor) -> Result<T>,
    {
        let saved = self.position;
        self.position = target;
        let result = decode(self);
        self.position = saved;
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_advances() {
        let data = [1u8, 2, 3, 4, 5];
        let mut cursor = ReadCursor::new(1);
        assert_eq!(cursor.take(&data, 2).unwrap(), &[2, 3]);
        assert_eq!(cursor.position(), 3);
        assert_eq!(cursor.next_byte(&data).unwrap(), 4);
        assert_eq!(cursor.position(), 4);
    }

    #[test]
    fn test_take_past_end_leaves_position() {
        let data = [1u8, 2, 3];
        let mut cursor = ReadCursor::new(2);
        assert!(cursor.take(&data, 2).is_err());
        assert_eq!(cursor.position(), 2);
        cursor.set_position(3);
        assert!(cursor.next_byte(&data).is_err());
        assert_eq!(cursor.position(), 3);
    }

    #[test]
    fn test_resolve_pointer_restores() {
        let data = [10u8, 20, 30, 40];
        let mut cursor = ReadCursor::new(1);
        let value = cursor
            .resolve_pointer(3, |c| c.next_byte(&data))
            .unwrap();
        assert_eq!(value, 40);
        assert_eq!(cursor.position(), 1);
    }

    #[test]
    fn test_resolve_pointer_restores_on_error() {
        let data = [10u8, 20];
        let mut cursor = ReadCursor::new(1);
        let result = cursor.resolve_pointer(5, |c| c.next_byte(&data));
        assert!(result.is_err());
        assert_eq!(cursor.position(), 1);
    }

    #[test]
    fn test_nested_resolution() {
        let data = [1u8, 2, 3, 4, 5, 6];
        let mut cursor = ReadCursor::new(0);
        let (outer, inner) = cursor
            .resolve_pointer(2, |c| {
                let inner = c.resolve_pointer(5, |c2| c2.next_byte(&data))?;
                let outer = c.next_byte(&data)?;
                Ok((outer, inner))
            })
            .unwrap();
        assert_eq!(outer, 3);
        assert_eq!(inner, 6);
        assert_eq!(cursor.position(), 0);
    }
}
