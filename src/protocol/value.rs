//! Wire value definitions
//!
//! One variant per RESP frame kind.

use bytes::Bytes;

/// A single RESP frame, request or reply
///
/// The null bulk string (`BulkString(None)`) and the null array
/// (`Array(None)`) are distinct from their empty counterparts and survive
/// an encode/decode round trip as such.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WireValue {
    /// `+text\r\n`
    SimpleString(String),

    /// `-text\r\n`
    Error(String),

    /// `:n\r\n`
    Integer(i64),

    /// `$len\r\nbytes\r\n`, or `$-1\r\n` when absent
    BulkString(Option<Bytes>),

    /// `*count\r\n` followed by the children, or `*-1\r\n` when absent
    Array(Option<Vec<WireValue>>),
}

impl WireValue {
    /// `+OK`
    pub fn ok() -> Self {
        WireValue::SimpleString("OK".to_string())
    }

    pub fn simple(text: impl Into<String>) -> Self {
        WireValue::SimpleString(text.into())
    }

    pub fn error(text: impl Into<String>) -> Self {
        WireValue::Error(text.into())
    }

    pub fn bulk(bytes: impl Into<Bytes>) -> Self {
        WireValue::BulkString(Some(bytes.into()))
    }

    pub fn null_bulk() -> Self {
        WireValue::BulkString(None)
    }

    pub fn array(items: Vec<WireValue>) -> Self {
        WireValue::Array(Some(items))
    }

    pub fn null_array() -> Self {
        WireValue::Array(None)
    }

    /// Raw bytes of a string-like frame (simple or non-null bulk)
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            WireValue::SimpleString(s) => Some(s.as_bytes()),
            WireValue::BulkString(Some(b)) => Some(b),
            _ => None,
        }
    }

    /// True for `$-1` and `*-1`
    pub fn is_null(&self) -> bool {
        matches!(self, WireValue::BulkString(None) | WireValue::Array(None))
    }
}
