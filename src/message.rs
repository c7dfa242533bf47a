//! # Printer Messages
//!
//! Structured data decoded from printer replies. Language backends parse
//! their own wire framing; everything they produce funnels into the
//! [`PrinterMessage`] union so callers never see backend-specific reply
//! formats.
//!
//! All fields of a [`ConfigUpdate`] are independently optional: absent
//! means "unknown or unchanged", so partial dumps merge cleanly into a
//! running configuration snapshot.

use bitflags::bitflags;
use serde::Serialize;

use crate::command::PrintSpeed;

bitflags! {
    /// Simultaneously-active printer error conditions.
    ///
    /// One error reply can carry several conditions at once (EPL error 07
    /// reports media *or* ribbon out without distinguishing, so both bits
    /// are set).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
    pub struct ErrorConditions: u32 {
        const SYNTAX_ERROR            = 1 << 0;
        const OBJECT_OUT_OF_BOUNDS    = 1 << 1;
        const BARCODE_DATA_LENGTH     = 1 << 2;
        const MEMORY_FULL             = 1 << 3;
        const MEMORY_CONFIGURATION    = 1 << 4;
        const SERIAL_COMM             = 1 << 5;
        const MEDIA_EMPTY             = 1 << 6;
        const RIBBON_EMPTY            = 1 << 7;
        const DUPLICATE_NAME          = 1 << 8;
        const NAME_NOT_FOUND          = 1 << 9;
        const NOT_IN_DATA_ENTRY_MODE  = 1 << 10;
        const PRINTHEAD_UP            = 1 << 11;
        const PAUSED                  = 1 << 12;
        const PRINTHEAD_TOO_HOT       = 1 << 13;
        const PRINTHEAD_TOO_COLD      = 1 << 14;
        const BUFFER_FULL             = 1 << 15;
        const CORRUPT_RAM             = 1 << 16;
    }
}

/// Transient printer state reported outside of error conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StatusKind {
    /// The printer acknowledged the last command.
    Acknowledged,
    /// No outstanding work or errors.
    Ready,
    /// A presented label was taken from the peeler.
    LabelTaken,
    Paused,
    Resumed,
}

/// Error reply contents: the active condition set plus optional counters
/// for work lost when the error struck.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ErrorReport {
    pub conditions: ErrorConditions,
    /// Labels queued but not printed when the error occurred.
    pub unprinted_labels: Option<u32>,
    /// Raster lines of the current label not yet printed.
    pub unprinted_raster_lines: Option<u32>,
}

/// Printer capability/configuration fields decoded from a config dump.
///
/// Every field is optional; backends fill in whatever their dump format
/// actually reports.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ConfigUpdate {
    pub model: Option<String>,
    pub firmware: Option<String>,
    pub serial_number: Option<String>,
    pub darkness_percent: Option<u8>,
    pub speed: Option<PrintSpeed>,
    pub label_width_dots: Option<u16>,
    pub label_height_dots: Option<u16>,
    pub label_gap_dots: Option<u16>,
    pub print_width_dots: Option<u16>,
}

impl ConfigUpdate {
    /// True when the dump produced no recognized fields.
    pub fn is_empty(&self) -> bool {
        self == &ConfigUpdate::default()
    }
}

/// One structured message decoded from the printer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum PrinterMessage {
    SettingUpdate(ConfigUpdate),
    Status(StatusKind),
    Error(ErrorReport),
}

/// Output of one `parse_message` step on a language backend.
///
/// `remainder` is the unconsumed tail of the input buffer (same type as
/// the input). `incomplete` asks the caller to wait for more transport
/// bytes before parsing again; `matched_awaited` reports that the decoded
/// frame answers the command the caller said it was waiting on.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageParseResult<O> {
    pub messages: Vec<PrinterMessage>,
    pub remainder: O,
    pub incomplete: bool,
    pub matched_awaited: bool,
}

impl<O> MessageParseResult<O> {
    /// A frame was started but not finished: hand the buffer back intact.
    pub fn incomplete(remainder: O) -> Self {
        Self {
            messages: Vec::new(),
            remainder,
            incomplete: true,
            matched_awaited: false,
        }
    }

    /// Complete frame(s) decoded.
    pub fn complete(messages: Vec<PrinterMessage>, remainder: O) -> Self {
        Self {
            messages,
            remainder,
            incomplete: false,
            matched_awaited: false,
        }
    }

    pub fn matched(mut self) -> Self {
        self.matched_awaited = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_update_empty() {
        assert!(ConfigUpdate::default().is_empty());
        let update = ConfigUpdate {
            darkness_percent: Some(60),
            ..Default::default()
        };
        assert!(!update.is_empty());
    }

    #[test]
    fn test_error_conditions_combine() {
        let conditions = ErrorConditions::MEDIA_EMPTY | ErrorConditions::RIBBON_EMPTY;
        assert!(conditions.contains(ErrorConditions::MEDIA_EMPTY));
        assert!(conditions.contains(ErrorConditions::RIBBON_EMPTY));
        assert!(!conditions.contains(ErrorConditions::PRINTHEAD_UP));
    }

    #[test]
    fn test_parse_result_constructors() {
        let r: MessageParseResult<String> = MessageParseResult::incomplete("abc".into());
        assert!(r.incomplete);
        assert!(!r.matched_awaited);
        assert_eq!(r.remainder, "abc");

        let r: MessageParseResult<String> =
            MessageParseResult::complete(vec![PrinterMessage::Status(StatusKind::Ready)], String::new())
                .matched();
        assert!(!r.incomplete);
        assert!(r.matched_awaited);
        assert_eq!(r.messages.len(), 1);
    }
}
