//! # slirc-wire
//!
//! Wire-level IRC protocol support for the Straylight operator console.
//!
//! This crate covers the byte-to-structure half of the engine:
//!
//! - CRLF line framing over a raw TCP stream ([`codec::LineCodec`])
//! - Parsing framed lines into prefix / command / parameters ([`Message`])
//! - Stripping mIRC formatting codes from display text ([`FormattedStringExt`])
//! - The numeric replies the console consumes ([`numeric`])
//!
//! Everything here is synchronous and allocation-light; the async plumbing
//! lives in the engine crate.

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod codec;
pub mod colors;
pub mod error;
pub mod message;
pub mod numeric;
pub mod prefix;

pub use self::codec::LineCodec;
pub use self::colors::FormattedStringExt;
pub use self::error::WireError;
pub use self::message::Message;
pub use self::prefix::Prefix;
