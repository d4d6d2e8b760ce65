//! # sbirc-proto
//!
//! IRC wire types for the sbirc bridge: message parsing and serialization,
//! numeric replies, CTCP ACTION helpers and a Tokio codec.
//!
//! Only the command subset the bridge speaks is modelled as typed variants.
//! Everything else parses into [`Command::Raw`] so a client never gets
//! disconnected for sending something unexpected.
//!
//! ```rust
//! use sbirc_proto::{Command, Message, Prefix};
//!
//! let msg: Message = "PRIVMSG #5 :hello there".parse().unwrap();
//! assert_eq!(msg.command, Command::PRIVMSG("#5".into(), "hello there".into()));
//!
//! let out = Message::privmsg("#5", "hi").with_prefix(Prefix::new("alice", "12", "smilebasic"));
//! assert_eq!(out.to_string(), ":alice!12@smilebasic PRIVMSG #5 :hi\r\n");
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod chan;
#[cfg(feature = "tokio")]
pub mod codec;
pub mod command;
pub mod ctcp;
pub mod error;
pub mod message;
pub mod prefix;
pub mod response;

pub use self::chan::ChannelExt;
#[cfg(feature = "tokio")]
pub use self::codec::IrcCodec;
pub use self::command::Command;
pub use self::ctcp::Ctcp;
pub use self::error::{MessageParseError, ProtocolError};
pub use self::message::Message;
pub use self::prefix::Prefix;
pub use self::response::Response;
