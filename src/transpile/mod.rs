//! # Document Transpiler
//!
//! Turns an abstract [`Command`](crate::command::Command) sequence into a
//! [`CompiledDocument`] of native-output transactions for one language
//! backend. Compilation runs in two passes:
//!
//! 1. [`forms`] segments the sequence into label forms and transactions,
//!    healing unbalanced form boundaries and applying the configured
//!    [`ReorderBehavior`] to form-illegal commands;
//! 2. [`compile`] flattens the forms and realizes every command as native
//!    output, aggregating all per-command errors before failing.
//!
//! Entry point: [`transpile`].

mod compile;
mod forms;
mod state;

pub use compile::{CompiledDocument, Transaction, transpile};
pub use state::{DocumentState, ReorderBehavior};
