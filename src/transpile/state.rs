//! # Per-Document Transpile State
//!
//! One [`DocumentState`] is created per compile and owned exclusively by
//! it. Commands with positional side effects mutate the state through the
//! transforms defined here; backends read it when realizing commands.

use crate::command::EffectFlags;
use crate::printer::PrinterConfig;

/// Policy for a command the backend forbids inside an open form.
///
/// Selected per transpile call; nothing is persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReorderBehavior {
    /// Pull the command out and emit it after every label form.
    #[default]
    AfterAllForms,
    /// Pull the command out and emit it before every label form.
    BeforeAllForms,
    /// Close the open form; the command starts the next one.
    CloseForm,
    /// Abort the compile.
    ThrowError,
}

/// Mutable state threaded through one document compile.
///
/// The initial printer configuration is a read-only snapshot; offsets and
/// margins evolve as commands are transpiled in order.
#[derive(Debug, Clone)]
pub struct DocumentState {
    /// Running horizontal drawing origin, in dots. Never negative.
    pub horizontal_offset: u16,
    /// Running vertical drawing origin, in dots. Never negative.
    pub vertical_offset: u16,
    /// Line spacing in dots, for text-capable backends.
    pub line_spacing_dots: u16,
    /// Left margin in character units.
    pub left_margin_chars: u16,
    /// Right margin in character units.
    pub right_margin_chars: u16,
    /// Current print width in dots.
    pub print_width_dots: u16,
    /// Effect flags accumulated across the whole document.
    pub effects: EffectFlags,
    initial_config: PrinterConfig,
}

impl DocumentState {
    pub fn new(config: PrinterConfig) -> Self {
        Self {
            horizontal_offset: 0,
            vertical_offset: 0,
            line_spacing_dots: 0,
            left_margin_chars: 0,
            right_margin_chars: 0,
            print_width_dots: config.print_width_dots,
            effects: EffectFlags::empty(),
            initial_config: config,
        }
    }

    /// The printer configuration snapshot taken when the compile began.
    pub fn initial_config(&self) -> &PrinterConfig {
        &self.initial_config
    }

    /// Apply an offset command: absolute replaces the running origin,
    /// relative adds to it. Results clamp to zero on each axis.
    pub fn apply_offset(&mut self, x: i32, y: i32, absolute: bool) {
        let (base_x, base_y) = if absolute {
            (0i64, 0i64)
        } else {
            (self.horizontal_offset as i64, self.vertical_offset as i64)
        };
        self.horizontal_offset = (base_x + x as i64).clamp(0, u16::MAX as i64) as u16;
        self.vertical_offset = (base_y + y as i64).clamp(0, u16::MAX as i64) as u16;
    }
}

impl Default for DocumentState {
    fn default() -> Self {
        Self::new(PrinterConfig::default())
    }
}
