//! # Etiqueta - Thermal Label Printer Library
//!
//! Etiqueta drives desktop thermal label printers across their native
//! command languages. It provides:
//!
//! - **Abstract commands**: one printer-agnostic vocabulary for label
//!   layout, media setup, and queries
//! - **Transpiler**: form/transaction segmentation with boundary healing
//!   and whole-document error reporting
//! - **Language backends**: EPL2 (bytes) and ZPL (text), each with its
//!   own reply decoder
//! - **Driver**: async send/await-reply loop over a pluggable transport
//!
//! ## Quick Start
//!
//! ```no_run
//! use etiqueta::command::Command;
//! use etiqueta::lang::Epl;
//! use etiqueta::printer::Printer;
//! use etiqueta::transport::SerialTransport;
//!
//! # async fn example() -> Result<(), etiqueta::EtiquetaError> {
//! let transport = SerialTransport::open("/dev/ttyUSB0")?;
//! let mut printer = Printer::new(Epl::new(), transport);
//!
//! // forms open and close implicitly around drawing commands
//! let messages = printer
//!     .run(vec![
//!         Command::SetDarkness { percent: 60 },
//!         Command::AddBox { x: 10, y: 10, width: 200, height: 100, thickness: 2 },
//!         Command::AddLine { x: 10, y: 130, width: 200, height: 4 },
//!         Command::Print { count: 1 },
//!         Command::QueryStatus,
//!     ])
//!     .await?;
//! println!("{messages:?}");
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Overview
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`command`] | Abstract command vocabulary and effect flags |
//! | [`transpile`] | Document compiler: forms, transactions, state |
//! | [`lang`] | Per-language backends (EPL2, ZPL) |
//! | [`message`] | Decoded printer messages |
//! | [`pump`] | Read-buffer reducer turning bytes into messages |
//! | [`printer`] | Async driver and printer configuration |
//! | [`transport`] | Serial and mock byte pipes |
//! | [`error`] | Error types |
//!
//! ## Supported Printers
//!
//! Tested against EPL2 units (Zebra LP2844 family) and ZPL II units
//! (Zebra GK/ZD desktop series). Printers speaking either language over
//! a serial-like device should work.

pub mod command;
pub mod error;
pub mod lang;
pub mod message;
pub mod printer;
pub mod pump;
pub mod transpile;
pub mod transport;

// Re-exports for convenience
pub use command::Command;
pub use error::EtiquetaError;
pub use lang::{CommandSet, Language};
pub use message::PrinterMessage;
pub use printer::{Printer, PrinterConfig};
pub use transpile::{CompiledDocument, ReorderBehavior};
pub use transport::Transport;
