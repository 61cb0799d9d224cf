use std::fmt;

use crate::pdu_parse_error::PduParseErr;

/// Byte-granular read/write cursor over a window of a byte vector.
/// Multi-byte fields are little-endian unless the `_be` variant is used.
pub struct ByteBuffer {
    buffer: Vec<u8>,
    start: usize,           // bytes before this are out of window
    pos: usize,             // next byte offset for read/write (absolute)
    end: usize,             // bytes at or after this are out of window
    flag_autoexpand: bool,  // if true, writes past end grow the buffer
}

impl ByteBuffer {
    /// Create a zeroed buffer of exactly `len` bytes.
    pub fn new(len: usize) -> Self {
        ByteBuffer {
            buffer: vec![0; len],
            start: 0,
            pos: 0,
            end: len,
            flag_autoexpand: false,
        }
    }

    /// Create an empty buffer with an initial capacity. Writes advance the end
    /// pointer and reallocate when needed.
    pub fn new_autoexpand(initial_capacity: usize) -> Self {
        ByteBuffer {
            buffer: Vec::with_capacity(initial_capacity),
            start: 0,
            pos: 0,
            end: 0,
            flag_autoexpand: true,
        }
    }

    /// Wrap an existing byte vector. No new allocation is needed here.
    pub fn from_vec(data: Vec<u8>) -> Self {
        let len = data.len();
        ByteBuffer {
            buffer: data,
            start: 0,
            pos: 0,
            end: len,
            flag_autoexpand: false,
        }
    }

    pub fn from_bytes(data: &[u8]) -> Self {
        Self::from_vec(data.to_vec())
    }

    /// Peek a byte at the current pos, without advancing.
    pub fn peek_u8(&self) -> Option<u8> {
        if self.pos < self.end { Some(self.buffer[self.pos]) } else { None }
    }

    /// Read `num_bytes` (at most 8) as a little-endian integer, advancing on success.
    pub fn read_le(&mut self, num_bytes: usize) -> Option<u64> {
        if num_bytes > 8 || self.pos + num_bytes > self.end {
            return None;
        }
        let mut v = 0u64;
        for i in 0..num_bytes {
            v |= (self.buffer[self.pos + i] as u64) << (8 * i);
        }
        self.pos += num_bytes;
        Some(v)
    }

    /// Read `num_bytes` (at most 8) as a big-endian integer, advancing on success.
    pub fn read_be(&mut self, num_bytes: usize) -> Option<u64> {
        if num_bytes > 8 || self.pos + num_bytes > self.end {
            return None;
        }
        let mut v = 0u64;
        for i in 0..num_bytes {
            v = (v << 8) | self.buffer[self.pos + i] as u64;
        }
        self.pos += num_bytes;
        Some(v)
    }

    /// Similar to read_le, but returns PduParseErr::BufferEnded naming `field` if not enough bytes are available.
    pub fn read_field(&mut self, num_bytes: usize, field: &'static str) -> Result<u64, PduParseErr> {
        self.read_le(num_bytes).ok_or(PduParseErr::BufferEnded { field: Some(field) })
    }

    pub fn read_field_be(&mut self, num_bytes: usize, field: &'static str) -> Result<u64, PduParseErr> {
        self.read_be(num_bytes).ok_or(PduParseErr::BufferEnded { field: Some(field) })
    }

    pub fn read_u8(&mut self, field: &'static str) -> Result<u8, PduParseErr> {
        Ok(self.read_field(1, field)? as u8)
    }

    pub fn read_u16(&mut self, field: &'static str) -> Result<u16, PduParseErr> {
        Ok(self.read_field(2, field)? as u16)
    }

    pub fn read_u24(&mut self, field: &'static str) -> Result<u32, PduParseErr> {
        Ok(self.read_field(3, field)? as u32)
    }

    pub fn read_u32(&mut self, field: &'static str) -> Result<u32, PduParseErr> {
        Ok(self.read_field(4, field)? as u32)
    }

    /// Borrow the next `num_bytes` and advance past them.
    pub fn read_slice(&mut self, num_bytes: usize, field: &'static str) -> Result<&[u8], PduParseErr> {
        if self.pos + num_bytes > self.end {
            return Err(PduParseErr::BufferEnded { field: Some(field) });
        }
        let from = self.pos;
        self.pos += num_bytes;
        Ok(&self.buffer[from..self.pos])
    }

    /// Copies all bytes between pos and end, advancing to the end.
    pub fn read_remaining(&mut self) -> Vec<u8> {
        let v = self.buffer[self.pos..self.end].to_vec();
        self.pos = self.end;
        v
    }

    /// When a write would exceed the end on an autoexpanding buffer, moves `end`
    /// and grows the backing vector as needed.
    fn _move_end(&mut self, needed_extra: usize) {
        let needed_total = self.end + needed_extra;
        if needed_total > self.buffer.len() {
            self.buffer.resize(needed_total, 0);
        }
        self.end = needed_total;
    }

    fn _reserve_write(&mut self, num_bytes: usize) {
        if self.pos + num_bytes > self.end {
            if self.flag_autoexpand {
                let extra = self.pos + num_bytes - self.end;
                self._move_end(extra);
            } else {
                panic!("write would exceed buffer end");
            }
        }
    }

    /// Write the low `num_bytes` of `value`, little-endian.
    pub fn write_le(&mut self, value: u64, num_bytes: usize) {
        assert!(num_bytes <= 8, "can only write up to 8 bytes");
        assert!(num_bytes == 8 || value >> (8 * num_bytes) == 0, "value exceeds num_bytes {} {}", value, num_bytes);
        self._reserve_write(num_bytes);
        for i in 0..num_bytes {
            self.buffer[self.pos + i] = (value >> (8 * i)) as u8;
        }
        self.pos += num_bytes;
    }

    /// Write the low `num_bytes` of `value`, big-endian.
    pub fn write_be(&mut self, value: u64, num_bytes: usize) {
        assert!(num_bytes <= 8, "can only write up to 8 bytes");
        assert!(num_bytes == 8 || value >> (8 * num_bytes) == 0, "value exceeds num_bytes {} {}", value, num_bytes);
        self._reserve_write(num_bytes);
        for i in 0..num_bytes {
            self.buffer[self.pos + i] = (value >> (8 * (num_bytes - 1 - i))) as u8;
        }
        self.pos += num_bytes;
    }

    pub fn write_u8(&mut self, value: u8) {
        self.write_le(value as u64, 1);
    }

    pub fn write_u16(&mut self, value: u16) {
        self.write_le(value as u64, 2);
    }

    pub fn write_u24(&mut self, value: u32) {
        self.write_le(value as u64 & 0xFF_FFFF, 3);
    }

    pub fn write_u32(&mut self, value: u32) {
        self.write_le(value as u64, 4);
    }

    pub fn write_bytes(&mut self, data: &[u8]) {
        self._reserve_write(data.len());
        self.buffer[self.pos..self.pos + data.len()].copy_from_slice(data);
        self.pos += data.len();
    }

    /// Writes `data` into a field of exactly `width` bytes, truncating or padding with `pad`.
    pub fn write_padded(&mut self, data: &[u8], width: usize, pad: u8) {
        let n = usize::min(data.len(), width);
        self.write_bytes(&data[..n]);
        for _ in n..width {
            self.write_u8(pad);
        }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        let mut v = self.buffer;
        v.truncate(self.end);
        v.drain(..self.start);
        v
    }

    /// The full window, regardless of pos.
    pub fn as_slice(&self) -> &[u8] {
        &self.buffer[self.start..self.end]
    }

    /// Window length in bytes
    pub fn get_len(&self) -> usize {
        self.end - self.start
    }

    /// Bytes between pos and end
    pub fn get_len_remaining(&self) -> usize {
        self.end - self.pos
    }

    /// Current position relative to the window start
    pub fn get_pos(&self) -> usize {
        self.pos - self.start
    }

    pub fn seek(&mut self, offset: usize) {
        let abs = self.start + offset;
        assert!(abs <= self.end, "seek out of window: got {}, allowed [{},{}]", abs, self.start, self.end);
        self.pos = abs;
    }

    pub fn dump_hex(&self) -> String {
        let mut s = String::with_capacity(self.get_len() * 2);
        for b in self.as_slice() {
            s.push_str(&format!("{:02X}", b));
        }
        s
    }
}

impl fmt::Debug for ByteBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ByteBuffer {{ len: {} pos: {} data: {} }}", self.get_len(), self.get_pos(), self.dump_hex())
    }
}
