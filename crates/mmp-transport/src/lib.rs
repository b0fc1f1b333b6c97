//! Byte-oriented duplex transport abstraction.
//!
//! The link layer only ever needs three things from the wire:
//! - read one byte, giving up after a timeout
//! - write a run of bytes
//! - a second handle onto the same link, so reading and writing can happen
//!   on different threads
//!
//! [`Transport`] captures exactly that. Implementations:
//! - [`SerialTransport`] over a serial port (feature `serial`, default)
//! - [`MemoryTransport`], an in-memory duplex pair for tests and simulations

pub mod error;
pub mod memory;
#[cfg(feature = "serial")]
pub mod serial;
pub mod transport;

pub use error::{Result, TransportError};
pub use memory::MemoryTransport;
#[cfg(feature = "serial")]
pub use serial::{available_ports, PortInfo, SerialConfig, SerialTransport};
pub use transport::Transport;
