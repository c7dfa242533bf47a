//! # Command-Set Contract
//!
//! One [`CommandSet`] implementation per printer language turns abstract
//! [`Command`]s into backend-native output and decodes whatever the
//! printer sends back. The output type is generic: EPL2 emits raw bytes
//! (its image upload embeds binary payloads), ZPL emits text.
//!
//! ## Available Backends
//!
//! - [`epl`]: EPL2 (ASCII line commands, `Vec<u8>` output)
//! - [`zpl`]: ZPL (caret/tilde commands, `String` output)
//!
//! Vendor-specific commands outside the universal vocabulary are handled
//! through the extended registry: each backend maps opaque
//! [`ExtendedTag`] tokens to transpile handlers at construction time.
//! Dispatching an unregistered tag is backend misconfiguration and
//! panics; it is not a recoverable transpile failure.

pub mod epl;
pub mod zpl;

use std::collections::HashMap;

use crate::command::{Command, ExtendedCommand, ExtendedTag};
use crate::error::{MessageParseError, TranspileError};
use crate::message::MessageParseResult;
use crate::transpile::DocumentState;

pub use epl::Epl;
pub use zpl::Zpl;

/// Printer command language tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum Language {
    Epl,
    Zpl,
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Epl => "EPL",
            Language::Zpl => "ZPL",
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Backend-native output value: bytes for binary languages, text for
/// line-oriented ones.
///
/// Concatenation must be associative with `empty()` as identity, which is
/// what lets the transpiler fold per-command fragments into transaction
/// buffers in any grouping.
pub trait NativeOutput: Clone + Default + PartialEq + std::fmt::Debug {
    fn empty() -> Self;
    fn is_empty(&self) -> bool;
    fn append(&mut self, other: &Self);
    /// View as wire bytes for the transport.
    fn as_bytes(&self) -> &[u8];
    /// Ingest raw transport bytes (lossy for text outputs).
    fn push_raw(&mut self, bytes: &[u8]);
    fn len(&self) -> usize {
        self.as_bytes().len()
    }
}

impl NativeOutput for Vec<u8> {
    fn empty() -> Self {
        Vec::new()
    }

    fn is_empty(&self) -> bool {
        Vec::is_empty(self)
    }

    fn append(&mut self, other: &Self) {
        self.extend_from_slice(other);
    }

    fn as_bytes(&self) -> &[u8] {
        self
    }

    fn push_raw(&mut self, bytes: &[u8]) {
        self.extend_from_slice(bytes);
    }
}

impl NativeOutput for String {
    fn empty() -> Self {
        String::new()
    }

    fn is_empty(&self) -> bool {
        String::is_empty(self)
    }

    fn append(&mut self, other: &Self) {
        self.push_str(other);
    }

    fn as_bytes(&self) -> &[u8] {
        str::as_bytes(self)
    }

    fn push_raw(&mut self, bytes: &[u8]) {
        self.push_str(&String::from_utf8_lossy(bytes));
    }
}

/// Transpile delegate for one extended-command tag.
pub type ExtendedHandler<O> =
    fn(&ExtendedCommand, &mut DocumentState) -> Result<O, TranspileError>;

struct ExtendedEntry<O> {
    handler: ExtendedHandler<O>,
    /// Whether this token is forbidden inside an open form.
    non_form: bool,
}

/// Tag → handler mapping, populated once at backend construction.
pub struct ExtendedRegistry<O> {
    entries: HashMap<ExtendedTag, ExtendedEntry<O>>,
}

impl<O> ExtendedRegistry<O> {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    pub fn register(&mut self, tag: ExtendedTag, non_form: bool, handler: ExtendedHandler<O>) {
        self.entries.insert(tag, ExtendedEntry { handler, non_form });
    }

    pub fn is_registered(&self, tag: ExtendedTag) -> bool {
        self.entries.contains_key(&tag)
    }

    pub fn is_non_form(&self, tag: ExtendedTag) -> bool {
        self.entries.get(&tag).map(|e| e.non_form).unwrap_or(false)
    }

    /// Dispatch an extended command to its registered handler.
    ///
    /// Panics on an unregistered tag: the registry is fixed at backend
    /// construction, so a miss here is a wiring bug, not printer input.
    pub fn dispatch(
        &self,
        language: Language,
        cmd: &ExtendedCommand,
        state: &mut DocumentState,
    ) -> Result<O, TranspileError> {
        match self.entries.get(&cmd.tag) {
            Some(entry) => (entry.handler)(cmd, state),
            None => panic!(
                "extended command tag `{}` has no registered handler in the {} backend",
                cmd.tag, language
            ),
        }
    }
}

impl<O> Default for ExtendedRegistry<O> {
    fn default() -> Self {
        Self::new()
    }
}

/// The per-language backend contract.
///
/// Implementations are stateless beyond their extended registry; all
/// mutable compile state lives in the [`DocumentState`] passed through
/// `transpile`.
pub trait CommandSet {
    type Output: NativeOutput;

    fn language(&self) -> Language;

    /// Native framing prepended once per transaction buffer.
    fn document_start_prefix(&self) -> Self::Output;

    /// Native framing appended once per transaction buffer.
    fn document_end_suffix(&self) -> Self::Output;

    /// The zero-length native value.
    fn noop(&self) -> Self::Output {
        Self::Output::empty()
    }

    /// Concatenate fragments into one buffer.
    fn combine(&self, parts: Vec<Self::Output>) -> Self::Output {
        let mut out = Self::Output::empty();
        for part in &parts {
            out.append(part);
        }
        out
    }

    /// Optional one-to-many substitution performed before the transpiler's
    /// form logic sees the command. `None` means use as-is.
    fn expand(&self, _cmd: &Command) -> Option<Vec<Command>> {
        None
    }

    /// True if this language forbids the command inside an open form.
    fn is_non_form_command(&self, cmd: &Command) -> bool;

    /// Realize one command as native output, mutating `state` for
    /// commands with positional or config side effects.
    fn transpile(
        &self,
        cmd: &Command,
        state: &mut DocumentState,
    ) -> Result<Self::Output, TranspileError>;

    /// Decode zero or more complete frames from the front of `buffer`.
    ///
    /// `sent` is the command currently awaiting a reply, when the caller
    /// has one outstanding; some reply formats are only distinguishable
    /// by knowing what was asked.
    fn parse_message(
        &self,
        buffer: Self::Output,
        sent: Option<&Command>,
    ) -> Result<MessageParseResult<Self::Output>, MessageParseError>;
}
