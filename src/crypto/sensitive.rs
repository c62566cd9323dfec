//! Scoped buffers for secret bytes
//!
//! `SensitiveBuffer` owns bytes such as decrypted request plaintext or a
//! decoded seed. The bytes are only reachable through a closure passed to
//! [`SensitiveBuffer::expose`], and the backing allocation is zero-filled on
//! every exit path: explicitly through [`SensitiveBuffer::scrub`], or on drop
//! when an error or panic unwinds the owner.
//!
//! # Limitations
//!
//! This is best-effort memory hygiene. Copies made by the allocator when a
//! `Vec` grows, values spilled to registers or the stack by the compiler, and
//! copies held by third-party code (JSON parsers, HMAC state) are outside its
//! reach.

use std::fmt;
use zeroize::{Zeroize, Zeroizing};

/// A heap buffer holding secret bytes, zeroed on scrub and on drop
pub struct SensitiveBuffer {
    bytes: Zeroizing<Vec<u8>>,
    scrubbed: bool,
}

impl SensitiveBuffer {
    /// Take ownership of secret bytes
    pub fn new(bytes: Vec<u8>) -> Self {
        Self {
            bytes: Zeroizing::new(bytes),
            scrubbed: false,
        }
    }

    /// Decode a hex string straight into a sensitive buffer
    pub fn from_hex(hex_str: &str) -> Result<Self, hex::FromHexError> {
        hex::decode(hex_str).map(Self::new)
    }

    /// Run `f` with read access to the bytes.
    ///
    /// The reference cannot outlive the closure.
    pub fn expose<R>(&self, f: impl FnOnce(&[u8]) -> R) -> R {
        f(self.bytes.as_slice())
    }

    /// Split the buffer at `mid` into two new sensitive buffers and scrub the
    /// original.
    ///
    /// Returns `None` (leaving the original scrubbed) when `mid` is past the end.
    pub fn split_at(&mut self, mid: usize) -> Option<(SensitiveBuffer, SensitiveBuffer)> {
        let parts = if mid <= self.bytes.len() {
            let (head, tail) = self.bytes.split_at(mid);
            Some((Self::new(head.to_vec()), Self::new(tail.to_vec())))
        } else {
            None
        };
        self.scrub();
        parts
    }

    /// Overwrite every byte with zero. The length is kept so callers can
    /// observe the cleared contents.
    pub fn scrub(&mut self) {
        self.bytes.as_mut_slice().zeroize();
        self.scrubbed = true;
    }

    /// True once every byte is zero after an explicit scrub
    pub fn is_scrubbed(&self) -> bool {
        self.scrubbed && self.bytes.iter().all(|b| *b == 0)
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl fmt::Debug for SensitiveBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SensitiveBuffer")
            .field("len", &self.bytes.len())
            .field("bytes", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scrub_zeroes_bytes() {
        let mut buf = SensitiveBuffer::new(vec![1, 2, 3, 4]);
        assert!(!buf.is_scrubbed());

        buf.scrub();
        assert!(buf.is_scrubbed());
        assert_eq!(buf.len(), 4);
        buf.expose(|bytes| assert_eq!(bytes, &[0, 0, 0, 0]));
    }

    #[test]
    fn test_split_scrubs_original() {
        let mut buf = SensitiveBuffer::new(vec![9, 8, 7, 6, 5]);
        let (head, tail) = buf.split_at(2).unwrap();

        head.expose(|bytes| assert_eq!(bytes, &[9, 8]));
        tail.expose(|bytes| assert_eq!(bytes, &[7, 6, 5]));
        assert!(buf.is_scrubbed());
    }

    #[test]
    fn test_split_past_end_still_scrubs() {
        let mut buf = SensitiveBuffer::new(vec![1, 2]);
        assert!(buf.split_at(3).is_none());
        assert!(buf.is_scrubbed());
    }

    #[test]
    fn test_from_hex() {
        let buf = SensitiveBuffer::from_hex("deadbeef").unwrap();
        buf.expose(|bytes| assert_eq!(bytes, &[0xde, 0xad, 0xbe, 0xef]));
        assert!(SensitiveBuffer::from_hex("xyz").is_err());
    }

    #[test]
    fn test_debug_redacts() {
        let buf = SensitiveBuffer::new(vec![0xaa; 8]);
        let rendered = format!("{:?}", buf);
        assert!(rendered.contains("redacted"));
        assert!(!rendered.contains("170"));
    }
}
