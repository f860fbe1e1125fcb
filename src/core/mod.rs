//! # Core Protocol Components
//!
//! Wire constants, the per-command length table and the frame codec.
//!
//! ## Wire Format
//! ```text
//! fixed:   [Code(2)] [Body(N - 2)]
//! dynamic: [Code(2)] [Length(2)] [Body(Length - 4)]
//! ```
//!
//! All integers are little-endian. Whether a command is fixed or dynamic,
//! and how long a fixed command is, comes from the [`packet::PacketLengthTable`];
//! nothing on the wire says so.

pub mod codec;
pub mod packet;
