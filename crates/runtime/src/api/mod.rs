//! Public runtime API surface.
//!
//! This module gathers the types exposed to consumers of the runtime crate:
//! errors, the wire messages, and the transport and presentation seams the
//! embedding application implements.

pub mod errors;
pub mod message;
pub mod sink;
pub mod transport;

pub use errors::{Result, RuntimeError};
pub use message::{Gate, NetMessage, ParticipantId};
pub use sink::{NullSink, PresentationSink};
pub use transport::{OfflineTransport, Transport};
