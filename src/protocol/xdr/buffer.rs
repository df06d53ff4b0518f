use std::io::{self, Seek, SeekFrom, Write};

/// A fixed-capacity, seekable output buffer for building RPC replies.
///
/// Writes past the capacity are dropped and the buffer is flagged as
/// truncated; they never fail and never grow the allocation beyond the
/// capacity. Writing at a position before the end overwrites in place, which
/// is how the dispatcher back-patches the accept status and the TCP record
/// mark once the body is known.
#[derive(Debug)]
pub struct XdrBuffer {
    data: Vec<u8>,
    pos: usize,
    capacity: usize,
    truncated: bool,
}

impl XdrBuffer {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: Vec::with_capacity(capacity.min(64 * 1024)),
            pos: 0,
            capacity,
            truncated: false,
        }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    /// Moves the cursor, clamped to the bytes written so far.
    pub fn set_position(&mut self, pos: usize) {
        self.pos = pos.min(self.data.len());
    }

    /// Moves the cursor relative to its current position.
    pub fn seek_relative(&mut self, delta: i64) {
        let target = if delta.is_negative() {
            self.pos.saturating_sub(delta.unsigned_abs() as usize)
        } else {
            self.pos.saturating_add(delta as usize)
        };
        self.set_position(target);
    }

    /// Discards everything from `len` onward and leaves the cursor at the end.
    pub fn truncate(&mut self, len: usize) {
        self.data.truncate(len);
        self.pos = self.data.len();
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// True once any write has been cut short by the capacity.
    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.data
    }
}

impl Write for XdrBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let room = self.capacity.saturating_sub(self.pos);
        let n = buf.len().min(room);
        if n < buf.len() {
            self.truncated = true;
        }
        let end = self.pos + n;
        if end > self.data.len() {
            self.data.resize(end, 0);
        }
        self.data[self.pos..end].copy_from_slice(&buf[..n]);
        self.pos = end;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Seek for XdrBuffer {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        match pos {
            SeekFrom::Start(off) => self.set_position(usize::try_from(off).unwrap_or(usize::MAX)),
            SeekFrom::End(off) => {
                self.set_position(self.data.len());
                self.seek_relative(off);
            }
            SeekFrom::Current(off) => self.seek_relative(off),
        }
        Ok(self.pos as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overwrites_in_place() {
        let mut buf = XdrBuffer::with_capacity(16);
        buf.write_all(&[1, 2, 3, 4, 5, 6, 7, 8]).unwrap();
        buf.set_position(4);
        buf.write_all(&[9, 9]).unwrap();
        assert_eq!(buf.as_slice(), &[1, 2, 3, 4, 9, 9, 7, 8]);
        assert_eq!(buf.position(), 6);
    }

    #[test]
    fn truncates_at_capacity() {
        let mut buf = XdrBuffer::with_capacity(6);
        buf.write_all(&[0; 4]).unwrap();
        buf.write_all(&[1; 4]).unwrap();
        assert_eq!(buf.len(), 6);
        assert!(buf.is_truncated());
    }

    #[test]
    fn relative_seek_is_clamped() {
        let mut buf = XdrBuffer::with_capacity(8);
        buf.write_all(&[0; 4]).unwrap();
        buf.seek_relative(-10);
        assert_eq!(buf.position(), 0);
        buf.seek_relative(100);
        assert_eq!(buf.position(), 4);
    }
}
