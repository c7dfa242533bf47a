//! # Command Model
//!
//! This module defines the printer-agnostic command vocabulary. A label
//! document is a flat sequence of commands that can be inspected, split
//! into forms and transactions, and compiled to a concrete printer
//! language (EPL2, ZPL).
//!
//! ## Design Philosophy
//!
//! Commands sit between the calling application and raw printer output:
//!
//! ```text
//! Commands → Transpiler (forms/transactions) → CommandSet → native output
//! ```
//!
//! Each command is pure data. Behavior lives in the language backends; the
//! only logic here is construction and effect-flag membership.
//!
//! Backend-specific commands outside this vocabulary travel as
//! [`Command::Extended`] and are dispatched by an opaque [`ExtendedTag`]
//! token through the backend's registry.

use bitflags::bitflags;
use serde::Serialize;

bitflags! {
    /// Side effects a command contributes to its enclosing form.
    ///
    /// Flags union-combine when commands are folded into a form and never
    /// shrink once set. A form's flags are exactly the union of the flags
    /// of every command in it.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
    pub struct EffectFlags: u8 {
        /// The printer is expected to send a reply to this command.
        const WAITS_FOR_RESPONSE = 1 << 0;
        /// Alters persistent printer configuration.
        const ALTERS_CONFIG = 1 << 1;
        /// Moves paper through the mechanism.
        const FEEDS_PAPER = 1 << 2;
        /// Feeds paper even when a peeler would normally hold the label.
        const FEEDS_PAPER_IGNORING_PEELER = 1 << 3;
    }
}

/// Opaque identity token for an extended (backend-specific) command.
///
/// Tags are compared by value and used as registry keys; the string is
/// stable identity, not a display name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExtendedTag(pub &'static str);

impl std::fmt::Display for ExtendedTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.0)
    }
}

/// A backend-specific command carried through the universal pipeline.
///
/// The payload is an opaque argument blob; only the registered handler for
/// `tag` knows how to interpret it. Effect flags are carried per instance
/// because extended commands are not in the fixed vocabulary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtendedCommand {
    pub tag: ExtendedTag,
    pub payload: Vec<u8>,
    pub effects: EffectFlags,
}

impl ExtendedCommand {
    pub fn new(tag: ExtendedTag, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            tag,
            payload: payload.into(),
            effects: EffectFlags::empty(),
        }
    }

    pub fn with_effects(mut self, effects: EffectFlags) -> Self {
        self.effects = effects;
        self
    }
}

/// Abstract print speed, mapped to a concrete rate per backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum PrintSpeed {
    Slow,
    #[default]
    Medium,
    Fast,
    Maximum,
}

/// The printer-agnostic command vocabulary.
///
/// Drawing coordinates are in printer dots. Commands with positional side
/// effects (currently [`Command::Offset`]) mutate the per-document state
/// during transpilation; everything else only produces output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Produces the backend's zero-length output. Used as a placeholder
    /// when commands are pulled out of a form for reordering.
    NoOp,

    // ========== Form Boundaries ==========
    /// Open a label form. Commands inside a form are buffered by the
    /// printer as one print job.
    StartLabel,

    /// Close the current label form.
    EndLabel,

    /// Print the buffered form `count` times.
    Print { count: u16 },

    // ========== Configuration ==========
    /// Set print darkness as a percentage (0-100), mapped to the
    /// backend's density range.
    SetDarkness { percent: u8 },

    /// Set print speed.
    SetPrintSpeed { speed: PrintSpeed },

    /// Set label width, and optionally height and inter-label gap, in dots.
    SetLabelDimensions {
        width_dots: u16,
        height_dots: Option<u16>,
        gap_dots: Option<u16>,
    },

    /// Adjust the document's drawing origin. Relative by default;
    /// `absolute` replaces the running offset instead of adding to it.
    /// The applied offset is clamped to >= 0 on each axis.
    Offset { x: i32, y: i32, absolute: bool },

    // ========== Drawing ==========
    /// Solid black line.
    AddLine { x: u16, y: u16, width: u16, height: u16 },

    /// Rectangular outline of the given stroke thickness.
    AddBox {
        x: u16,
        y: u16,
        width: u16,
        height: u16,
        thickness: u16,
    },

    /// Pre-packed 1bpp image rows (one bit per dot, rows padded to whole
    /// bytes). Bitmap conversion happens upstream; this command only
    /// carries the result.
    AddImage {
        x: u16,
        y: u16,
        width: u16,
        height: u16,
        rows: Vec<u8>,
    },

    // ========== Mechanism ==========
    /// Cut the media now.
    Cut,

    /// Run media calibration. Feeds several labels regardless of peeler
    /// state.
    Autosense,

    // ========== Queries ==========
    /// Ask the printer for its current status. Solicits a reply.
    QueryStatus,

    /// Ask the printer to dump its configuration. Solicits a reply.
    QueryConfiguration,

    // ========== Escape Hatches ==========
    /// Verbatim passthrough to the wire.
    Raw { data: Vec<u8> },

    /// Backend-specific command dispatched via its opaque tag.
    Extended(ExtendedCommand),
}

impl Command {
    /// Effect flags this command contributes to its enclosing form.
    pub fn effects(&self) -> EffectFlags {
        match self {
            Command::Print { .. } => EffectFlags::FEEDS_PAPER,
            Command::SetDarkness { .. }
            | Command::SetPrintSpeed { .. }
            | Command::SetLabelDimensions { .. } => EffectFlags::ALTERS_CONFIG,
            Command::Autosense => {
                EffectFlags::ALTERS_CONFIG
                    | EffectFlags::FEEDS_PAPER
                    | EffectFlags::FEEDS_PAPER_IGNORING_PEELER
            }
            Command::Cut => EffectFlags::FEEDS_PAPER,
            Command::QueryStatus | Command::QueryConfiguration => {
                EffectFlags::WAITS_FOR_RESPONSE
            }
            Command::Extended(ext) => ext.effects,
            _ => EffectFlags::empty(),
        }
    }

    /// Membership test for a single effect flag.
    pub fn has_effect(&self, flag: EffectFlags) -> bool {
        self.effects().contains(flag)
    }

    /// True for commands that only make sense inside a label form. The
    /// transpiler opens a form implicitly when one of these appears with
    /// no form open.
    pub fn is_form_content(&self) -> bool {
        matches!(
            self,
            Command::Print { .. }
                | Command::AddLine { .. }
                | Command::AddBox { .. }
                | Command::AddImage { .. }
        )
    }

    /// Short stable name for error reporting.
    pub fn name(&self) -> &'static str {
        match self {
            Command::NoOp => "NoOp",
            Command::StartLabel => "StartLabel",
            Command::EndLabel => "EndLabel",
            Command::Print { .. } => "Print",
            Command::SetDarkness { .. } => "SetDarkness",
            Command::SetPrintSpeed { .. } => "SetPrintSpeed",
            Command::SetLabelDimensions { .. } => "SetLabelDimensions",
            Command::Offset { .. } => "Offset",
            Command::AddLine { .. } => "AddLine",
            Command::AddBox { .. } => "AddBox",
            Command::AddImage { .. } => "AddImage",
            Command::Cut => "Cut",
            Command::Autosense => "Autosense",
            Command::QueryStatus => "QueryStatus",
            Command::QueryConfiguration => "QueryConfiguration",
            Command::Raw { .. } => "Raw",
            Command::Extended(_) => "Extended",
        }
    }
}
