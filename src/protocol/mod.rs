//! Protocol Module
//!
//! Defines the RESP wire protocol spoken between clients and the server.
//!
//! ### Request Format
//! An array of bulk strings, first element the command name:
//! ```text
//! *2\r\n$3\r\nGET\r\n$3\r\nfoo\r\n
//! ```
//! Plain-text inline commands (`GET foo\r\n`) are accepted too.
//!
//! ### Commands
//! - PING [message]
//! - ECHO message
//! - SET key value [PX milliseconds]
//! - GET key
//! - DEL key [key ...]
//! - SUBSCRIBE channel [channel ...]
//! - UNSUBSCRIBE [channel ...]
//! - PUBLISH channel message
//!
//! ### Replies
//! Exactly one frame per request, except (UN)SUBSCRIBE which writes one
//! frame per channel as it goes.

mod command;
mod value;
pub mod codec;

pub use command::{Command, CommandError};
pub use value::WireValue;
pub use codec::{decode_one, encode, encode_request, write_value, Decoder};
