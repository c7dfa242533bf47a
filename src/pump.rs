//! # Protocol Message Pump
//!
//! Drains decoded [`PrinterMessage`]s out of a transport read buffer.
//! The pump is a pure reducer: it takes ownership of the current buffer,
//! pulls complete frames off the front until only an incomplete tail (or
//! nothing) is left, and hands both the messages and the tail back. The
//! driver stores the tail and prepends the next transport read to it, so
//! frame boundaries never have to line up with read boundaries.
//!
//! At most one query is outstanding at a time. When a decoded frame
//! answers it, the pump fires the query's completion channel; the frame's
//! messages are still published normally.

use tokio::sync::oneshot;

use crate::command::Command;
use crate::error::MessageParseError;
use crate::lang::{CommandSet, NativeOutput};
use crate::message::PrinterMessage;

/// A sent command waiting for its reply, paired with the channel that
/// unblocks the sender when the reply arrives.
#[derive(Debug)]
pub struct AwaitedCommand {
    command: Command,
    completion: Option<oneshot::Sender<()>>,
}

impl AwaitedCommand {
    /// Returns the awaited slot plus the receiver the waiting sender
    /// blocks on.
    pub fn new(command: Command) -> (Self, oneshot::Receiver<()>) {
        let (tx, rx) = oneshot::channel();
        (
            Self {
                command,
                completion: Some(tx),
            },
            rx,
        )
    }

    pub fn command(&self) -> &Command {
        &self.command
    }

    /// Fire the completion channel. A dropped receiver just means the
    /// waiter gave up (timeout); resolving twice is a pump bug.
    pub fn resolve(&mut self) {
        match self.completion.take() {
            Some(tx) => {
                if tx.send(()).is_err() {
                    tracing::debug!(
                        command = self.command.name(),
                        "reply arrived after the waiter gave up"
                    );
                }
            }
            None => {
                tracing::error!(
                    command = self.command.name(),
                    "awaited command resolved twice"
                );
                debug_assert!(false, "awaited command resolved twice");
            }
        }
    }
}

/// Drain every complete frame from `buffer`.
///
/// Returns the undecoded tail (to be carried into the next read) and the
/// messages decoded from the drained frames, in arrival order.
pub fn pump<C: CommandSet>(
    command_set: &C,
    mut buffer: C::Output,
    mut awaited: Option<&mut AwaitedCommand>,
) -> Result<(C::Output, Vec<PrinterMessage>), MessageParseError> {
    // Cloned once up front: the borrow has to survive across the
    // resolve() call below.
    let mut sent = awaited.as_ref().map(|slot| slot.command.clone());
    let mut messages = Vec::new();

    while !buffer.is_empty() {
        let result = command_set.parse_message(buffer, sent.as_ref())?;
        messages.extend(result.messages);
        buffer = result.remainder;

        if result.matched_awaited {
            // one query, one answer; later frames in the same buffer are
            // parsed without query context
            sent = None;
            match awaited.take() {
                Some(slot) => slot.resolve(),
                None => {
                    tracing::error!("decoded a query reply with no query outstanding");
                    debug_assert!(false, "matched a reply with no query outstanding");
                }
            }
        }

        if result.incomplete {
            break;
        }
    }

    Ok((buffer, messages))
}
