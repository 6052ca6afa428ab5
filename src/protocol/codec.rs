//! Protocol codec
//!
//! Encoding and decoding functions for the RESP wire protocol.
//!
//! ## Wire Format
//!
//! ```text
//! +OK\r\n                      simple string
//! -ERR message\r\n             error
//! :42\r\n                      integer
//! $3\r\nfoo\r\n                bulk string   ($-1\r\n = null)
//! *2\r\n$3\r\nGET\r\n$1\r\nk\r\n  array      (*-1\r\n = null)
//! PING hello\r\n               inline command (any other first byte)
//! ```
//!
//! Line terminators are CRLF; a bare LF is tolerated when reading.

use std::io::{self, BufRead, ErrorKind, Read};

use bytes::Bytes;

use super::WireValue;
use crate::error::{RelayError, Result};

/// Longest header or inline-command line accepted (64 KB)
pub const MAX_LINE_LEN: usize = 64 * 1024;

/// Default cap on announced bulk lengths and array counts (512 MB)
pub const DEFAULT_MAX_BULK_LEN: usize = 512 * 1024 * 1024;

/// Default cap on how deeply arrays may nest inside one frame
pub const DEFAULT_MAX_DEPTH: usize = 32;

// =============================================================================
// Encoding
// =============================================================================

/// Encode a value to bytes
pub fn encode(value: &WireValue) -> Vec<u8> {
    let mut buf = Vec::with_capacity(estimate_size(value));
    write_value(&mut buf, value);
    buf
}

/// Append the encoding of `value` to `buf`
pub fn write_value(buf: &mut Vec<u8>, value: &WireValue) {
    match value {
        WireValue::SimpleString(s) => {
            buf.push(b'+');
            buf.extend_from_slice(s.as_bytes());
            buf.extend_from_slice(b"\r\n");
        }
        WireValue::Error(e) => {
            buf.push(b'-');
            buf.extend_from_slice(e.as_bytes());
            buf.extend_from_slice(b"\r\n");
        }
        WireValue::Integer(n) => {
            buf.push(b':');
            let mut num_buf = itoa::Buffer::new();
            buf.extend_from_slice(num_buf.format(*n).as_bytes());
            buf.extend_from_slice(b"\r\n");
        }
        WireValue::BulkString(Some(data)) => {
            buf.push(b'$');
            let mut num_buf = itoa::Buffer::new();
            buf.extend_from_slice(num_buf.format(data.len()).as_bytes());
            buf.extend_from_slice(b"\r\n");
            buf.extend_from_slice(data);
            buf.extend_from_slice(b"\r\n");
        }
        WireValue::BulkString(None) => buf.extend_from_slice(b"$-1\r\n"),
        WireValue::Array(Some(items)) => {
            buf.push(b'*');
            let mut num_buf = itoa::Buffer::new();
            buf.extend_from_slice(num_buf.format(items.len()).as_bytes());
            buf.extend_from_slice(b"\r\n");
            for item in items {
                write_value(buf, item);
            }
        }
        WireValue::Array(None) => buf.extend_from_slice(b"*-1\r\n"),
    }
}

/// Encode a request as an array of bulk strings, the way clients send them
pub fn encode_request<I, T>(args: I) -> Vec<u8>
where
    I: IntoIterator<Item = T>,
    T: AsRef<[u8]>,
{
    let items = args
        .into_iter()
        .map(|arg| WireValue::bulk(Bytes::copy_from_slice(arg.as_ref())))
        .collect();
    encode(&WireValue::Array(Some(items)))
}

fn estimate_size(value: &WireValue) -> usize {
    match value {
        WireValue::SimpleString(s) => s.len() + 3,
        WireValue::Error(e) => e.len() + 3,
        WireValue::Integer(_) => 24,
        WireValue::BulkString(Some(b)) => b.len() + 16,
        WireValue::BulkString(None) | WireValue::Array(None) => 5,
        WireValue::Array(Some(items)) => 16 + items.iter().map(estimate_size).sum::<usize>(),
    }
}

// =============================================================================
// Decoding
// =============================================================================

/// Streaming RESP decoder over any buffered reader
///
/// Blocks on the underlying reader until a whole frame is available, so it
/// works no matter how the peer chunks its bytes. Once a type prefix has
/// been read the decoder is committed to that frame shape.
pub struct Decoder<R> {
    reader: R,
    max_bulk_len: usize,
    max_depth: usize,
}

impl<R: BufRead> Decoder<R> {
    /// Create a decoder with the default bulk length cap
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            max_bulk_len: DEFAULT_MAX_BULK_LEN,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Override the cap on bulk lengths and array counts
    pub fn with_max_bulk_len(mut self, max_bulk_len: usize) -> Self {
        self.max_bulk_len = max_bulk_len;
        self
    }

    /// Override the cap on array nesting. Decoding recurses once per level,
    /// so this bounds the stack a single frame can use.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Decode the next frame
    ///
    /// Returns `Ok(None)` if the stream ended cleanly between frames. A
    /// stream that ends inside a frame, or a malformed length/count, is a
    /// [`RelayError::Protocol`].
    pub fn decode(&mut self) -> Result<Option<WireValue>> {
        match self.read_byte()? {
            Some(prefix) => self.decode_frame(prefix, 0).map(Some),
            None => Ok(None),
        }
    }

    fn decode_frame(&mut self, prefix: u8, depth: usize) -> Result<WireValue> {
        match prefix {
            b'+' => Ok(WireValue::SimpleString(self.read_text_line()?)),
            b'-' => Ok(WireValue::Error(self.read_text_line()?)),
            b':' => {
                let line = self.read_line()?;
                Ok(WireValue::Integer(parse_integer(&line, "integer")?))
            }
            b'$' => self.decode_bulk_string(),
            b'*' => self.decode_array(depth + 1),
            other => self.decode_inline(other),
        }
    }

    fn decode_bulk_string(&mut self) -> Result<WireValue> {
        let line = self.read_line()?;
        let len = parse_integer(&line, "bulk length")?;
        if len == -1 {
            return Ok(WireValue::BulkString(None));
        }
        let len = self.checked_len(len, "bulk length")?;

        let mut data = vec![0u8; len];
        self.reader.read_exact(&mut data).map_err(|e| match e.kind() {
            ErrorKind::UnexpectedEof => {
                RelayError::Protocol("stream closed inside bulk string".to_string())
            }
            _ => RelayError::Io(e),
        })?;

        // The payload is already complete; a bad trailer is logged, not fatal.
        let mut trailer = [0u8; 2];
        let filled = self.read_up_to(&mut trailer)?;
        if &trailer[..filled] != b"\r\n" {
            tracing::warn!(
                "Expected CRLF after {}-byte bulk string, got {:?}",
                len,
                String::from_utf8_lossy(&trailer[..filled])
            );
        }

        Ok(WireValue::BulkString(Some(Bytes::from(data))))
    }

    fn decode_array(&mut self, depth: usize) -> Result<WireValue> {
        if depth > self.max_depth {
            return Err(RelayError::Protocol(format!(
                "arrays nested deeper than {}",
                self.max_depth
            )));
        }

        let line = self.read_line()?;
        let count = parse_integer(&line, "array count")?;
        if count == -1 {
            return Ok(WireValue::Array(None));
        }
        let count = self.checked_len(count, "array count")?;

        // Don't trust the announced count for preallocation.
        let mut items = Vec::with_capacity(count.min(1024));
        for _ in 0..count {
            let prefix = self.read_byte()?.ok_or_else(|| {
                RelayError::Protocol("stream closed inside array".to_string())
            })?;
            items.push(self.decode_frame(prefix, depth)?);
        }
        Ok(WireValue::Array(Some(items)))
    }

    /// Plain-text command: the first byte plus the rest of its line, split
    /// on whitespace. An empty line yields an empty array.
    fn decode_inline(&mut self, first: u8) -> Result<WireValue> {
        let mut line = vec![first];
        if first != b'\n' {
            line.extend_from_slice(&self.read_line()?);
        }

        let tokens = line
            .split(|b| b.is_ascii_whitespace())
            .filter(|token| !token.is_empty())
            .map(|token| WireValue::SimpleString(String::from_utf8_lossy(token).into_owned()))
            .collect();

        Ok(WireValue::Array(Some(tokens)))
    }

    fn checked_len(&self, len: i64, what: &str) -> Result<usize> {
        if len < 0 {
            return Err(RelayError::Protocol(format!("invalid {}: {}", what, len)));
        }
        let len = usize::try_from(len)
            .map_err(|_| RelayError::Protocol(format!("{} out of range: {}", what, len)))?;
        if len > self.max_bulk_len {
            return Err(RelayError::Protocol(format!(
                "{} too large: {} (max {})",
                what, len, self.max_bulk_len
            )));
        }
        Ok(len)
    }

    // -------------------------------------------------------------------------
    // Low-level reads
    // -------------------------------------------------------------------------

    /// Read one byte, `None` at end of stream
    fn read_byte(&mut self) -> Result<Option<u8>> {
        let mut byte = [0u8; 1];
        Ok(match self.read_up_to(&mut byte)? {
            0 => None,
            _ => Some(byte[0]),
        })
    }

    /// Fill as much of `buf` as the stream allows before it ends
    fn read_up_to(&mut self, buf: &mut [u8]) -> Result<usize> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.reader.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(RelayError::Io(e)),
            }
        }
        Ok(filled)
    }

    /// Read the rest of the current line with its terminator stripped
    fn read_line(&mut self) -> Result<Vec<u8>> {
        let mut line = Vec::new();
        let limit = (MAX_LINE_LEN + 2) as u64;
        let read = (&mut self.reader)
            .take(limit)
            .read_until(b'\n', &mut line)
            .map_err(RelayError::Io)?;

        if line.last() != Some(&b'\n') {
            return Err(if read as u64 >= limit {
                RelayError::Protocol(format!("line longer than {} bytes", MAX_LINE_LEN))
            } else {
                RelayError::Protocol("stream closed mid-line".to_string())
            });
        }

        line.pop();
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        Ok(line)
    }

    fn read_text_line(&mut self) -> Result<String> {
        let line = self.read_line()?;
        Ok(String::from_utf8_lossy(&line).into_owned())
    }
}

impl<R: BufRead> Iterator for Decoder<R> {
    type Item = Result<WireValue>;

    fn next(&mut self) -> Option<Self::Item> {
        self.decode().transpose()
    }
}

fn parse_integer(line: &[u8], what: &str) -> Result<i64> {
    std::str::from_utf8(line)
        .ok()
        .and_then(|s| s.parse::<i64>().ok())
        .ok_or_else(|| {
            RelayError::Protocol(format!(
                "invalid {}: {:?}",
                what,
                String::from_utf8_lossy(line)
            ))
        })
}

/// Decode exactly one frame from a byte slice
pub fn decode_one(bytes: &[u8]) -> Result<Option<WireValue>> {
    Decoder::new(io::Cursor::new(bytes)).decode()
}
