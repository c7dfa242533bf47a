//! # Printer Driver
//!
//! Ties the pieces together: compiles command sequences with the active
//! language backend, sends the resulting transactions over a transport,
//! and runs the message pump over everything the printer sends back.
//!
//! One query is outstanding at a time. After sending a transaction whose
//! commands expect replies, the driver polls the transport until each
//! reply arrives or the reply timeout elapses. Unsolicited messages
//! (label-taken chimes, error reports) decoded along the way are returned
//! alongside the solicited ones, and configuration updates are folded
//! into the driver's [`PrinterConfig`] as they arrive.

mod config;

pub use config::PrinterConfig;

use std::time::Duration;

use crate::command::Command;
use crate::error::{CommunicationError, EtiquetaError, TranspileError};
use crate::lang::{CommandSet, NativeOutput};
use crate::message::PrinterMessage;
use crate::pump::{AwaitedCommand, pump};
use crate::transpile::{CompiledDocument, DocumentState, ReorderBehavior, transpile};
use crate::transport::Transport;

/// Default deadline for one awaited printer reply.
const DEFAULT_REPLY_TIMEOUT: Duration = Duration::from_secs(5);

/// Pause between transport polls while a reply is awaited.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// A connected label printer: one language backend, one transport.
///
/// ## Example
///
/// ```no_run
/// use etiqueta::command::Command;
/// use etiqueta::lang::Epl;
/// use etiqueta::printer::Printer;
/// use etiqueta::transport::SerialTransport;
///
/// # async fn example() -> Result<(), etiqueta::error::EtiquetaError> {
/// let transport = SerialTransport::open("/dev/ttyUSB0")?;
/// let mut printer = Printer::new(Epl::new(), transport);
///
/// let document = printer.compile(vec![
///     Command::AddLine { x: 0, y: 0, width: 200, height: 4 },
///     Command::Print { count: 1 },
/// ])?;
/// printer.print(&document).await?;
/// # Ok(())
/// # }
/// ```
pub struct Printer<C: CommandSet, T: Transport> {
    command_set: C,
    transport: T,
    config: PrinterConfig,
    reorder: ReorderBehavior,
    reply_timeout: Duration,
    /// Undecoded tail carried between transport reads.
    remainder: C::Output,
    awaited: Option<AwaitedCommand>,
}

impl<C: CommandSet, T: Transport> Printer<C, T> {
    pub fn new(command_set: C, transport: T) -> Self {
        Self::with_config(command_set, transport, PrinterConfig::default())
    }

    pub fn with_config(command_set: C, transport: T, config: PrinterConfig) -> Self {
        Self {
            command_set,
            transport,
            config,
            reorder: ReorderBehavior::default(),
            reply_timeout: DEFAULT_REPLY_TIMEOUT,
            remainder: C::Output::empty(),
            awaited: None,
        }
    }

    /// Current configuration snapshot, kept fresh from decoded config
    /// dumps.
    pub fn config(&self) -> &PrinterConfig {
        &self.config
    }

    pub fn set_reorder_behavior(&mut self, reorder: ReorderBehavior) {
        self.reorder = reorder;
    }

    pub fn set_reply_timeout(&mut self, timeout: Duration) {
        self.reply_timeout = timeout;
    }

    pub fn is_connected(&self) -> bool {
        self.transport.is_connected()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Compile a command sequence against the current configuration.
    pub fn compile(
        &self,
        commands: Vec<Command>,
    ) -> Result<CompiledDocument<C::Output>, TranspileError> {
        transpile(
            &self.command_set,
            commands,
            DocumentState::new(self.config.clone()),
            self.reorder,
        )
    }

    /// Send a compiled document.
    ///
    /// Transactions go out in order; after each one, the driver waits for
    /// the replies its commands solicit. All messages decoded during the
    /// print (solicited or not) are returned in arrival order.
    ///
    /// On a reply timeout the undecoded read buffer is kept, so a reply
    /// that arrives late is still decoded by the next poll.
    pub async fn print(
        &mut self,
        document: &CompiledDocument<C::Output>,
    ) -> Result<Vec<PrinterMessage>, EtiquetaError> {
        let mut collected = Vec::new();
        for transaction in document.transactions() {
            self.transport
                .send(transaction.buffer().as_bytes())
                .await
                .map_err(EtiquetaError::from)?;
            tracing::debug!(
                bytes = transaction.buffer().len(),
                waits = transaction.wait_commands().len(),
                "transaction sent"
            );

            for command in transaction.wait_commands() {
                collected.extend(self.await_reply(command.clone()).await?);
            }
        }
        Ok(collected)
    }

    /// Compile and print in one step.
    pub async fn run(
        &mut self,
        commands: Vec<Command>,
    ) -> Result<Vec<PrinterMessage>, EtiquetaError> {
        let document = self.compile(commands)?;
        self.print(&document).await
    }

    /// Drain the transport once and decode whatever is pending. Use this
    /// to pick up unsolicited traffic between prints.
    pub async fn poll_messages(&mut self) -> Result<Vec<PrinterMessage>, EtiquetaError> {
        self.drain_transport().await
    }

    /// Release the transport.
    pub async fn dispose(&mut self) -> Result<(), EtiquetaError> {
        self.awaited = None;
        self.transport.dispose().await.map_err(EtiquetaError::from)
    }

    /// Poll until the reply for `command` arrives or the deadline passes.
    async fn await_reply(
        &mut self,
        command: Command,
    ) -> Result<Vec<PrinterMessage>, EtiquetaError> {
        let name = command.name();
        let (awaited, mut reply) = AwaitedCommand::new(command);
        self.awaited = Some(awaited);

        let deadline = tokio::time::Instant::now() + self.reply_timeout;
        let mut collected = Vec::new();
        let result = loop {
            match self.drain_transport().await {
                Ok(messages) => collected.extend(messages),
                Err(error) => break Err(error),
            }
            if reply.try_recv().is_ok() {
                break Ok(collected);
            }
            if tokio::time::Instant::now() >= deadline {
                tracing::warn!(command = name, "printer reply timed out");
                break Err(CommunicationError::ReplyTimeout.into());
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        };

        // the slot never outlives the wait; whatever arrives later is
        // unsolicited traffic
        self.awaited = None;
        result
    }

    /// One transport read plus a pump run over the carried buffer.
    async fn drain_transport(&mut self) -> Result<Vec<PrinterMessage>, EtiquetaError> {
        let chunks = self
            .transport
            .receive()
            .await
            .map_err(EtiquetaError::from)?;

        let mut buffer = std::mem::take(&mut self.remainder);
        for chunk in &chunks {
            buffer.push_raw(chunk);
        }

        // undecodable bytes stay buffered; a later poll retries them
        let (rest, messages) =
            match pump(&self.command_set, buffer.clone(), self.awaited.as_mut()) {
                Ok(drained) => drained,
                Err(error) => {
                    self.remainder = buffer;
                    return Err(error.into());
                }
            };
        self.remainder = rest;

        for message in &messages {
            if let PrinterMessage::SettingUpdate(update) = message {
                self.config.apply_update(update);
            }
        }
        Ok(messages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lang::{Epl, epl};
    use crate::message::{ErrorConditions, StatusKind};
    use crate::transport::MockTransport;
    use pretty_assertions::assert_eq;

    fn short_timeout<C: CommandSet>(mut printer: Printer<C, MockTransport>) -> Printer<C, MockTransport> {
        printer.set_reply_timeout(Duration::from_millis(30));
        printer
    }

    #[tokio::test]
    async fn test_print_sends_transactions() {
        let printer = Printer::new(Epl::new(), MockTransport::new());
        let mut printer = short_timeout(printer);

        let document = printer
            .compile(vec![
                Command::AddLine { x: 0, y: 0, width: 10, height: 2 },
                Command::Print { count: 1 },
            ])
            .unwrap();
        let messages = printer.print(&document).await.unwrap();
        assert!(messages.is_empty());

        let sent = printer.transport.sent_bytes();
        assert_eq!(sent, b"\r\n\r\nN\r\nLO0,0,10,2\r\nP1\r\n\r\n");
    }

    #[tokio::test]
    async fn test_query_resolves_on_ack() {
        let mut transport = MockTransport::new();
        transport.push_reply(vec![vec![epl::ACK, 0x0D, 0x0A]]);
        let mut printer = short_timeout(Printer::new(Epl::new(), transport));

        let messages = printer.run(vec![Command::QueryStatus]).await.unwrap();
        assert_eq!(
            messages,
            vec![PrinterMessage::Status(StatusKind::Acknowledged)]
        );
    }

    #[tokio::test]
    async fn test_query_reply_split_across_reads() {
        let mut transport = MockTransport::new();
        transport.push_reply(vec![vec![epl::ACK]]);
        transport.push_reply(vec![]);
        transport.push_reply(vec![vec![0x0D, 0x0A]]);
        let mut printer = short_timeout(Printer::new(Epl::new(), transport));

        let messages = printer.run(vec![Command::QueryStatus]).await.unwrap();
        assert_eq!(
            messages,
            vec![PrinterMessage::Status(StatusKind::Acknowledged)]
        );
    }

    #[tokio::test]
    async fn test_reply_timeout_preserves_buffer() {
        let mut transport = MockTransport::new();
        // a partial frame arrives but never completes
        transport.push_reply(vec![vec![epl::ACK, 0x0D]]);
        let mut printer = short_timeout(Printer::new(Epl::new(), transport));

        let err = printer.run(vec![Command::QueryStatus]).await.unwrap_err();
        assert!(matches!(
            err,
            EtiquetaError::Communication(CommunicationError::ReplyTimeout)
        ));

        // the tail survives the timeout; a later poll finishes the frame
        printer.transport.push_reply(vec![vec![0x0A]]);
        let messages = printer.poll_messages().await.unwrap();
        assert_eq!(
            messages,
            vec![PrinterMessage::Status(StatusKind::Acknowledged)]
        );
    }

    #[tokio::test]
    async fn test_unsolicited_error_collected_during_query() {
        let mut transport = MockTransport::new();
        let mut reply = vec![epl::LABEL_TAKEN];
        reply.extend_from_slice(&[epl::ACK, 0x0D, 0x0A]);
        transport.push_reply(vec![reply]);
        let mut printer = short_timeout(Printer::new(Epl::new(), transport));

        let messages = printer.run(vec![Command::QueryStatus]).await.unwrap();
        assert_eq!(
            messages,
            vec![
                PrinterMessage::Status(StatusKind::LabelTaken),
                PrinterMessage::Status(StatusKind::Acknowledged),
            ]
        );
    }

    #[tokio::test]
    async fn test_config_dump_updates_printer_config() {
        let mut transport = MockTransport::new();
        transport.push_reply(vec![
            b"UKQ1935HLU     V4.59\r\nq600 Q208,25\r\n\r\n".to_vec(),
        ]);
        let mut printer = short_timeout(Printer::new(Epl::new(), transport));

        let messages = printer.run(vec![Command::QueryConfiguration]).await.unwrap();
        assert!(matches!(messages[0], PrinterMessage::SettingUpdate(_)));
        assert_eq!(printer.config().model, "UKQ1935HLU");
        assert_eq!(printer.config().label_width_dots, 600);
        assert_eq!(printer.config().label_height_dots, Some(208));
    }

    #[tokio::test]
    async fn test_poll_messages_decodes_unsolicited_nak() {
        let mut transport = MockTransport::new();
        let mut reply = vec![epl::NAK];
        reply.extend_from_slice(b"07\r\n");
        transport.push_reply(vec![reply]);
        let mut printer = Printer::new(Epl::new(), transport);

        let messages = printer.poll_messages().await.unwrap();
        let PrinterMessage::Error(report) = &messages[0] else {
            panic!("expected error message");
        };
        assert_eq!(
            report.conditions,
            ErrorConditions::MEDIA_EMPTY | ErrorConditions::RIBBON_EMPTY
        );
    }

    #[tokio::test]
    async fn test_unsolicited_ack_after_resolved_query() {
        let mut transport = MockTransport::new();
        transport.push_reply(vec![vec![epl::ACK, 0x0D, 0x0A]]);
        let mut printer = short_timeout(Printer::new(Epl::new(), transport));
        printer.run(vec![Command::QueryStatus]).await.unwrap();

        // a second ACK with no query outstanding is plain status traffic
        printer.transport.push_reply(vec![vec![epl::ACK, 0x0D, 0x0A]]);
        let messages = printer.poll_messages().await.unwrap();
        assert_eq!(
            messages,
            vec![PrinterMessage::Status(StatusKind::Acknowledged)]
        );
    }

    #[tokio::test]
    async fn test_failed_query_clears_awaited_slot() {
        let mut printer = short_timeout(Printer::new(Epl::new(), MockTransport::new()));
        let err = printer.run(vec![Command::QueryStatus]).await.unwrap_err();
        assert!(matches!(
            err,
            EtiquetaError::Communication(CommunicationError::ReplyTimeout)
        ));

        printer.transport.push_reply(vec![vec![epl::ACK, 0x0D, 0x0A]]);
        let messages = printer.poll_messages().await.unwrap();
        assert_eq!(
            messages,
            vec![PrinterMessage::Status(StatusKind::Acknowledged)]
        );
    }

    #[tokio::test]
    async fn test_parse_error_keeps_buffer_for_retry() {
        let mut transport = MockTransport::new();
        // an ACK byte followed by garbage instead of CRLF
        transport.push_reply(vec![vec![epl::ACK, b'X', b'Y']]);
        let mut printer = Printer::new(Epl::new(), transport);

        assert!(matches!(
            printer.poll_messages().await,
            Err(EtiquetaError::MessageParse(_))
        ));
        // the bad bytes were not discarded: the next poll sees them again
        assert!(matches!(
            printer.poll_messages().await,
            Err(EtiquetaError::MessageParse(_))
        ));
    }

    #[tokio::test]
    async fn test_dispose_disconnects() {
        let mut printer = Printer::new(Epl::new(), MockTransport::new());
        assert!(printer.is_connected());
        printer.dispose().await.unwrap();
        assert!(!printer.is_connected());
    }

    #[test]
    fn test_compile_uses_driver_config_snapshot() {
        let mut config = PrinterConfig::default();
        config.print_width_dots = 576;
        let printer = Printer::with_config(Epl::new(), MockTransport::new(), config);
        // compile succeeds against the narrower snapshot
        let document = printer
            .compile(vec![Command::Print { count: 1 }])
            .unwrap();
        assert_eq!(document.transactions().len(), 1);
    }
}
