//! Command definitions
//!
//! Turns a decoded request frame into a typed command. Anything a client can
//! get wrong at this level is a [`CommandError`], which becomes an error
//! reply and leaves the connection open.

use bytes::Bytes;
use thiserror::Error;

use super::WireValue;

/// A parsed command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Health check, optionally echoing a message
    Ping { message: Option<Bytes> },

    /// Echo a message back
    Echo { message: Bytes },

    /// Store a value, replacing any previous value and expiry.
    /// A zero or negative TTL leaves a key that is already due to expire.
    Set {
        key: Bytes,
        value: Bytes,
        ttl_ms: Option<i64>,
    },

    /// Get a value by key
    Get { key: Bytes },

    /// Delete one or more keys
    Del { keys: Vec<Bytes> },

    /// Subscribe to one or more channels
    Subscribe { channels: Vec<Bytes> },

    /// Unsubscribe from the given channels, or from all when empty
    Unsubscribe { channels: Vec<Bytes> },

    /// Publish a message to a channel
    Publish { channel: Bytes, message: Bytes },
}

/// Client-caused command failures
///
/// `Display` is the exact error reply text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("ERR unknown command '{0}'")]
    UnknownCommand(String),

    #[error("ERR wrong number of arguments for '{0}' command")]
    WrongArity(&'static str),

    #[error("ERR value is not an integer or out of range")]
    NotAnInteger,

    #[error("ERR syntax error")]
    Syntax,

    #[error("ERR Protocol error: expected bulk string argument")]
    InvalidArgument,
}

impl From<CommandError> for WireValue {
    fn from(err: CommandError) -> Self {
        WireValue::Error(err.to_string())
    }
}

impl Command {
    /// Parse a request frame
    ///
    /// Returns `None` for frames that are not commands at all (anything but
    /// a non-empty array whose first element is present); the caller drops
    /// those silently.
    pub fn from_frame(frame: WireValue) -> Option<Result<Command, CommandError>> {
        let mut items = match frame {
            WireValue::Array(Some(items)) if !items.is_empty() => items.into_iter(),
            _ => return None,
        };

        let name = match items.next()? {
            WireValue::BulkString(None) | WireValue::Array(None) => return None,
            other => match argument(other) {
                Ok(name) => String::from_utf8_lossy(&name).to_ascii_uppercase(),
                Err(e) => return Some(Err(e)),
            },
        };

        let args: Result<Vec<Bytes>, CommandError> = items.map(argument).collect();
        Some(parse(&name, args))
    }

    /// Lowercase command name, as used in error replies and logs
    pub fn name(&self) -> &'static str {
        match self {
            Command::Ping { .. } => "ping",
            Command::Echo { .. } => "echo",
            Command::Set { .. } => "set",
            Command::Get { .. } => "get",
            Command::Del { .. } => "del",
            Command::Subscribe { .. } => "subscribe",
            Command::Unsubscribe { .. } => "unsubscribe",
            Command::Publish { .. } => "publish",
        }
    }

    /// Build the request frame a client sends for this command
    pub fn to_frame(&self) -> WireValue {
        let mut parts: Vec<Bytes> = vec![Bytes::from(self.name().to_ascii_uppercase())];
        match self {
            Command::Ping { message } => parts.extend(message.iter().cloned()),
            Command::Echo { message } => parts.push(message.clone()),
            Command::Set { key, value, ttl_ms } => {
                parts.push(key.clone());
                parts.push(value.clone());
                if let Some(ttl) = ttl_ms {
                    parts.push(Bytes::from_static(b"PX"));
                    parts.push(Bytes::from(ttl.to_string()));
                }
            }
            Command::Get { key } => parts.push(key.clone()),
            Command::Del { keys } => parts.extend(keys.iter().cloned()),
            Command::Subscribe { channels } | Command::Unsubscribe { channels } => {
                parts.extend(channels.iter().cloned())
            }
            Command::Publish { channel, message } => {
                parts.push(channel.clone());
                parts.push(message.clone());
            }
        }
        WireValue::Array(Some(parts.into_iter().map(WireValue::bulk).collect()))
    }
}

fn parse(
    name: &str,
    args: Result<Vec<Bytes>, CommandError>,
) -> Result<Command, CommandError> {
    match name {
        "PING" => {
            let mut args = args?;
            match args.len() {
                0 => Ok(Command::Ping { message: None }),
                1 => Ok(Command::Ping { message: args.pop() }),
                _ => Err(CommandError::WrongArity("ping")),
            }
        }
        "ECHO" => {
            let [message] = exact::<1>(args?, "echo")?;
            Ok(Command::Echo { message })
        }
        "SET" => parse_set(args?),
        "GET" => {
            let [key] = exact::<1>(args?, "get")?;
            Ok(Command::Get { key })
        }
        "DEL" => {
            let keys = at_least_one(args?, "del")?;
            Ok(Command::Del { keys })
        }
        "SUBSCRIBE" => {
            let channels = at_least_one(args?, "subscribe")?;
            Ok(Command::Subscribe { channels })
        }
        "UNSUBSCRIBE" => Ok(Command::Unsubscribe { channels: args? }),
        "PUBLISH" => {
            let [channel, message] = exact::<2>(args?, "publish")?;
            Ok(Command::Publish { channel, message })
        }
        _ => Err(CommandError::UnknownCommand(name.to_string())),
    }
}

/// `SET key value` or `SET key value PX milliseconds`
fn parse_set(args: Vec<Bytes>) -> Result<Command, CommandError> {
    match args.len() {
        2 => {
            let [key, value] = exact::<2>(args, "set")?;
            Ok(Command::Set {
                key,
                value,
                ttl_ms: None,
            })
        }
        4 => {
            let [key, value, option, ttl] = exact::<4>(args, "set")?;
            if !option.eq_ignore_ascii_case(b"PX") {
                return Err(CommandError::Syntax);
            }
            let ttl = std::str::from_utf8(&ttl)
                .ok()
                .and_then(|s| s.parse::<i64>().ok())
                .ok_or(CommandError::NotAnInteger)?;
            Ok(Command::Set {
                key,
                value,
                ttl_ms: Some(ttl),
            })
        }
        _ => Err(CommandError::WrongArity("set")),
    }
}

fn exact<const N: usize>(
    args: Vec<Bytes>,
    command: &'static str,
) -> Result<[Bytes; N], CommandError> {
    args.try_into()
        .map_err(|_| CommandError::WrongArity(command))
}

fn at_least_one(
    args: Vec<Bytes>,
    command: &'static str,
) -> Result<Vec<Bytes>, CommandError> {
    if args.is_empty() {
        return Err(CommandError::WrongArity(command));
    }
    Ok(args)
}

/// A request argument as raw bytes
///
/// Bulk strings arrive from regular clients, simple strings from inline
/// commands. Integers are accepted by their decimal text.
fn argument(value: WireValue) -> Result<Bytes, CommandError> {
    match value {
        WireValue::BulkString(Some(bytes)) => Ok(bytes),
        WireValue::SimpleString(text) => Ok(Bytes::from(text)),
        WireValue::Integer(n) => Ok(Bytes::from(n.to_string())),
        WireValue::Error(_) | WireValue::BulkString(None) | WireValue::Array(_) => {
            Err(CommandError::InvalidArgument)
        }
    }
}
