//! JSON wire format of the channel protocol.

pub mod codec;
pub mod error;
pub mod payloads;

pub use codec::EventParser;
pub use error::{WireError, WireResult};
