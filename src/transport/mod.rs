//! # Printer Transport Layer
//!
//! This module provides communication backends for exchanging bytes with
//! label printers. Transports are dumb pipes: they move bytes and report
//! connection state, and never interpret printer data. Framing and
//! decoding live in the language backends and the message pump.
//!
//! ## Available Transports
//!
//! - [`serial`]: serial/TTY devices (USB-serial adapters, RFCOMM
//!   bindings) opened in raw mode (Unix)
//! - [`mock`]: scripted in-memory transport for tests
//!
//! ## Future Transports
//!
//! - Network (TCP/IP, port 9100)
//! - Raw USB

pub mod mock;
pub mod serial;

pub use mock::MockTransport;
pub use serial::SerialTransport;

use async_trait::async_trait;

use crate::error::CommunicationError;

/// A bidirectional byte pipe to a printer.
///
/// `receive` is non-blocking: it returns whatever the device has buffered
/// right now, possibly nothing. Reply waiting (with timeouts) is the
/// driver's job, built on top of repeated polls.
#[async_trait]
pub trait Transport: Send {
    /// Send bytes to the printer. Implementations may chunk and pace
    /// large writes, but must deliver all of `data` in order.
    async fn send(&mut self, data: &[u8]) -> Result<(), CommunicationError>;

    /// Collect whatever the printer has sent since the last call. An
    /// empty vec means no data was pending; it is not an error.
    async fn receive(&mut self) -> Result<Vec<Vec<u8>>, CommunicationError>;

    fn is_connected(&self) -> bool;

    /// Release the underlying device. Further sends fail with
    /// [`CommunicationError::NotConnected`].
    async fn dispose(&mut self) -> Result<(), CommunicationError>;
}
