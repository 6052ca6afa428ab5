//! RelayKV CLI Client
//!
//! Command-line interface for interacting with RelayKV.

use std::io::{BufReader, Write};
use std::net::TcpStream;

use bytes::Bytes;
use clap::{Parser, Subcommand};
use relaykv::protocol::{encode, Command, Decoder, WireValue};

/// RelayKV CLI
#[derive(Parser, Debug)]
#[command(name = "relaykv-cli")]
#[command(about = "CLI for the RelayKV server")]
struct Args {
    /// Server address
    #[arg(short, long, default_value = "127.0.0.1:6379")]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Ping the server
    Ping {
        /// Optional message to echo back
        message: Option<String>,
    },

    /// Echo a message
    Echo {
        message: String,
    },

    /// Get a value by key
    Get {
        /// The key to get
        key: String,
    },

    /// Set a key-value pair
    Set {
        /// The key to set
        key: String,

        /// The value to set
        value: String,

        /// Expire the key after this many milliseconds
        #[arg(long, allow_negative_numbers = true)]
        px: Option<i64>,
    },

    /// Delete keys
    Del {
        /// The keys to delete
        #[arg(required = true)]
        keys: Vec<String>,
    },

    /// Publish a message to a channel
    Publish {
        channel: String,
        message: String,
    },

    /// Subscribe to channels and print messages until interrupted
    Subscribe {
        #[arg(required = true)]
        channels: Vec<String>,
    },
}

impl Commands {
    fn into_command(self) -> Command {
        match self {
            Commands::Ping { message } => Command::Ping {
                message: message.map(Bytes::from),
            },
            Commands::Echo { message } => Command::Echo {
                message: Bytes::from(message),
            },
            Commands::Get { key } => Command::Get {
                key: Bytes::from(key),
            },
            Commands::Set { key, value, px } => Command::Set {
                key: Bytes::from(key),
                value: Bytes::from(value),
                ttl_ms: px,
            },
            Commands::Del { keys } => Command::Del {
                keys: keys.into_iter().map(Bytes::from).collect(),
            },
            Commands::Publish { channel, message } => Command::Publish {
                channel: Bytes::from(channel),
                message: Bytes::from(message),
            },
            Commands::Subscribe { channels } => Command::Subscribe {
                channels: channels.into_iter().map(Bytes::from).collect(),
            },
        }
    }
}

fn main() {
    let args = Args::parse();
    if let Err(e) = run(args) {
        eprintln!("(error) {}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> relaykv::Result<()> {
    let mut stream = TcpStream::connect(&args.server)?;
    let command = args.command.into_command();
    let streaming = matches!(command, Command::Subscribe { .. });

    stream.write_all(&encode(&command.to_frame()))?;
    stream.flush()?;

    let mut decoder = Decoder::new(BufReader::new(stream));
    loop {
        match decoder.decode()? {
            Some(reply) => println!("{}", render(&reply, 0)),
            None => return Ok(()),
        }
        if !streaming {
            return Ok(());
        }
    }
}

/// Format a reply the way redis-cli does
fn render(value: &WireValue, indent: usize) -> String {
    match value {
        WireValue::SimpleString(s) => s.clone(),
        WireValue::Error(e) => format!("(error) {}", e),
        WireValue::Integer(n) => format!("(integer) {}", n),
        WireValue::BulkString(Some(b)) => format!("\"{}\"", String::from_utf8_lossy(b)),
        WireValue::BulkString(None) | WireValue::Array(None) => "(nil)".to_string(),
        WireValue::Array(Some(items)) if items.is_empty() => "(empty array)".to_string(),
        WireValue::Array(Some(items)) => items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                let pad = if i == 0 { String::new() } else { " ".repeat(indent) };
                format!("{}{}) {}", pad, i + 1, render(item, indent + 3))
            })
            .collect::<Vec<_>>()
            .join("\n"),
    }
}
