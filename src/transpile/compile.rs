//! # Document Compilation
//!
//! The second transpiler pass: flatten segmented forms into one
//! transaction list and realize every command as native output through
//! the chosen command set. Per-command failures are collected and the
//! compile fails as a whole; no partial document is ever returned.

use crate::command::{Command, EffectFlags};
use crate::error::TranspileError;
use crate::lang::{CommandSet, Language, NativeOutput};

use super::forms::segment_document;
use super::{DocumentState, ReorderBehavior};

/// One combined native buffer ready to send atomically, plus the commands
/// in it that expect a reply. Immutable once constructed.
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction<O> {
    buffer: O,
    wait_commands: Vec<Command>,
}

impl<O: NativeOutput> Transaction<O> {
    pub fn buffer(&self) -> &O {
        &self.buffer
    }

    /// The commands in this transaction the printer is expected to answer,
    /// in send order. Always a subsequence of the commands whose output is
    /// concatenated into [`Self::buffer`].
    pub fn wait_commands(&self) -> &[Command] {
        &self.wait_commands
    }

    pub fn awaits_reply(&self) -> bool {
        !self.wait_commands.is_empty()
    }
}

/// The compiled document: ordered transactions plus document-wide
/// metadata. Frozen once returned; consumers only read it.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledDocument<O> {
    language: Language,
    effects: EffectFlags,
    transactions: Vec<Transaction<O>>,
}

impl<O: NativeOutput> CompiledDocument<O> {
    pub fn language(&self) -> Language {
        self.language
    }

    /// Union of the effect flags of every command in the document.
    pub fn effects(&self) -> EffectFlags {
        self.effects
    }

    pub fn transactions(&self) -> &[Transaction<O>] {
        &self.transactions
    }
}

/// Compile a command sequence for a language backend.
///
/// `state` is owned by this one compile; concurrent compiles share
/// nothing. See the module docs for the segmentation rules applied
/// before output generation.
pub fn transpile<C: CommandSet>(
    command_set: &C,
    commands: Vec<Command>,
    mut state: DocumentState,
    reorder: ReorderBehavior,
) -> Result<CompiledDocument<C::Output>, TranspileError> {
    let forms = segment_document(command_set, commands, reorder)?;

    // Per-form structure is intentionally collapsed here: transactions are
    // concatenated in form order and flags are unioned document-wide.
    let mut effects = EffectFlags::empty();
    let mut pending = Vec::new();
    for form in forms {
        effects |= form.effects;
        pending.extend(form.transactions);
    }

    let mut errors = Vec::new();
    let mut transactions = Vec::with_capacity(pending.len());
    for precompiled in pending {
        let mut parts = vec![command_set.document_start_prefix()];
        for cmd in &precompiled.commands {
            match command_set.transpile(cmd, &mut state) {
                Ok(output) => parts.push(output),
                Err(error) => errors.push(error),
            }
        }
        parts.push(command_set.document_end_suffix());
        transactions.push(Transaction {
            buffer: command_set.combine(parts),
            wait_commands: precompiled.wait_commands,
        });
    }

    if !errors.is_empty() {
        return Err(TranspileError::Multiple(errors));
    }

    tracing::debug!(
        language = %command_set.language(),
        transactions = transactions.len(),
        "document compiled"
    );

    Ok(CompiledDocument {
        language: command_set.language(),
        effects,
        transactions,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lang::{Epl, Zpl};

    fn line() -> Command {
        Command::AddLine {
            x: 0,
            y: 0,
            width: 10,
            height: 5,
        }
    }

    #[test]
    fn test_single_implicit_form_single_transaction() {
        let commands = vec![
            Command::SetDarkness { percent: 50 },
            line(),
            Command::Print { count: 1 },
        ];
        let doc = transpile(
            &Epl::new(),
            commands,
            DocumentState::default(),
            ReorderBehavior::AfterAllForms,
        )
        .unwrap();

        assert_eq!(doc.language(), Language::Epl);
        assert_eq!(doc.transactions().len(), 1);
        let buffer = doc.transactions()[0].buffer();
        // prefix, darkness, form start, line, print, form end
        assert_eq!(&buffer[..], b"\r\nD8\r\n\r\nN\r\nLO0,0,10,5\r\nP1\r\n\r\n" as &[u8]);
        assert!(!doc.transactions()[0].awaits_reply());
    }

    #[test]
    fn test_document_effects_union() {
        let commands = vec![line(), Command::Print { count: 1 }, Command::QueryStatus];
        let doc = transpile(
            &Epl::new(),
            commands,
            DocumentState::default(),
            ReorderBehavior::AfterAllForms,
        )
        .unwrap();

        assert!(doc.effects().contains(EffectFlags::FEEDS_PAPER));
        assert!(doc.effects().contains(EffectFlags::WAITS_FOR_RESPONSE));
    }

    #[test]
    fn test_errors_aggregate_and_fail_whole_document() {
        let commands = vec![
            line(),
            Command::Print { count: 0 },
            Command::SetDarkness { percent: 150 },
        ];
        let err = transpile(
            &Epl::new(),
            commands,
            DocumentState::default(),
            ReorderBehavior::AfterAllForms,
        )
        .unwrap_err();

        let inner = err.into_inner();
        assert_eq!(inner.len(), 2);
        assert!(matches!(
            inner[0],
            TranspileError::InvalidParameter { command: "Print", .. }
        ));
        assert!(matches!(
            inner[1],
            TranspileError::InvalidParameter { command: "SetDarkness", .. }
        ));
    }

    #[test]
    fn test_single_unsupported_command_reports_one_inner_error() {
        let commands = vec![line(), Command::Cut, Command::Print { count: 1 }];
        let err = transpile(
            &Zpl::new(),
            commands,
            DocumentState::default(),
            ReorderBehavior::AfterAllForms,
        )
        .unwrap_err();

        let inner = err.into_inner();
        assert_eq!(inner.len(), 1);
        assert!(matches!(
            inner[0],
            TranspileError::Unsupported { command: "Cut", .. }
        ));
    }

    #[test]
    fn test_zpl_expansion_flows_through_compile() {
        let commands = vec![
            Command::SetLabelDimensions {
                width_dots: 812,
                height_dots: Some(1218),
                gap_dots: Some(24),
            },
            line(),
            Command::Print { count: 2 },
        ];
        let doc = transpile(
            &Zpl::new(),
            commands,
            DocumentState::default(),
            ReorderBehavior::AfterAllForms,
        )
        .unwrap();

        assert_eq!(doc.transactions().len(), 1);
        let buffer = doc.transactions()[0].buffer();
        assert_eq!(
            buffer,
            "^PW812\n^LL1218\n^MNY\n^XA\n^FO0,0^GB10,5,5,B,0^FS\n^PQ2,0,0,N\n^XZ\n"
        );
    }

    #[test]
    fn test_offset_state_threads_across_transactions() {
        let commands = vec![
            Command::Offset { x: 10, y: 0, absolute: false },
            Command::QueryStatus,
            Command::Offset { x: 5, y: 5, absolute: false },
        ];
        let doc = transpile(
            &Epl::new(),
            commands,
            DocumentState::default(),
            ReorderBehavior::AfterAllForms,
        )
        .unwrap();

        // the wait command splits the sequence into two transactions, but
        // offset state carries across them
        assert_eq!(doc.transactions().len(), 2);
        let second = doc.transactions()[1].buffer();
        let text = String::from_utf8_lossy(second);
        assert!(text.contains("R15,5"), "got {text:?}");
    }

    #[test]
    fn test_empty_input_compiles_to_empty_document() {
        let doc = transpile(
            &Epl::new(),
            Vec::new(),
            DocumentState::default(),
            ReorderBehavior::AfterAllForms,
        )
        .unwrap();
        assert!(doc.transactions().is_empty());
        assert_eq!(doc.effects(), EffectFlags::empty());
    }
}
