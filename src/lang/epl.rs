//! # EPL2 Backend
//!
//! This module implements the EPL2 (Eltron Programming Language) command
//! set used by Zebra's desktop label printers (LP2844, TLP2844, and
//! compatibles).
//!
//! ## Protocol Overview
//!
//! EPL2 is a line-oriented ASCII protocol: one command per line,
//! CRLF-terminated. A label form is opened with `N` (clear image buffer)
//! and printed with `P`. The one binary exception is `GW` (direct graphic
//! write), whose payload is raw 1bpp rows — which is why this backend's
//! native output type is `Vec<u8>`, not text.
//!
//! ## Replies
//!
//! | Frame | Shape | Meaning |
//! |-------|-------|---------|
//! | ACK   | `06 0D 0A` | command accepted |
//! | NAK   | `15 <code>[P<n>][L<n>] 0D 0A` | error, numeric code table below |
//! | EOT   | `04` | label taken from the peeler |
//! | dump  | CRLF lines, blank-line terminated | `UQ` configuration dump |
//!
//! NAK error codes follow the EPL2 manual's table; code 07 reports "media
//! or ribbon empty" without distinguishing, so it sets both conditions.
//! The optional `P<n>`/`L<n>` suffixes carry unprinted-label and
//! unprinted-raster-line counts.

use crate::command::{Command, ExtendedTag, PrintSpeed};
use crate::error::{MessageParseError, TranspileError};
use crate::message::{
    ConfigUpdate, ErrorConditions, ErrorReport, MessageParseResult, PrinterMessage, StatusKind,
};
use crate::transpile::DocumentState;

use super::{CommandSet, ExtendedRegistry, Language};

// ============================================================================
// WIRE CONSTANTS
// ============================================================================

/// ACK - command accepted
pub const ACK: u8 = 0x06;

/// NAK - error report follows
pub const NAK: u8 = 0x15;

/// EOT - label taken chime (single byte, no terminator)
pub const LABEL_TAKEN: u8 = 0x04;

const CR: u8 = 0x0D;
const LF: u8 = 0x0A;
const CRLF: &[u8] = b"\r\n";

/// Extended command: write a raw network/interface configuration line.
/// Payload is the vendor setvar line, emitted verbatim plus CRLF.
/// Forbidden inside a form.
pub const NETWORK_CONFIG: ExtendedTag = ExtendedTag("epl.network-config");

// ============================================================================
// COMMAND BUILDERS
// ============================================================================

/// # Clear Image Buffer (N)
///
/// Opens a label form. A leading CRLF flushes any partial line the
/// printer may be holding, which is the documented safe way to start a
/// form after arbitrary prior traffic.
///
/// | Format | Bytes          |
/// |--------|----------------|
/// | ASCII  | CR LF N CR LF  |
/// | Hex    | 0D 0A 4E 0D 0A |
#[inline]
pub fn form_start() -> Vec<u8> {
    b"\r\nN\r\n".to_vec()
}

/// # Print (P n)
///
/// Prints the buffered form `count` times and closes it.
#[inline]
pub fn print(count: u16) -> Vec<u8> {
    format!("P{count}\r\n").into_bytes()
}

/// # Density (D n)
///
/// Sets darkness, 0 (lightest) to 15 (darkest).
#[inline]
pub fn density(level: u8) -> Vec<u8> {
    format!("D{level}\r\n").into_bytes()
}

/// # Speed (S n)
///
/// Sets print speed, 1 (slowest) to 4 (fastest on most units).
#[inline]
pub fn speed(level: u8) -> Vec<u8> {
    format!("S{level}\r\n").into_bytes()
}

/// # Label Width (q n)
#[inline]
pub fn label_width(dots: u16) -> Vec<u8> {
    format!("q{dots}\r\n").into_bytes()
}

/// # Label Length and Gap (Q h,g)
#[inline]
pub fn label_length(height: u16, gap: u16) -> Vec<u8> {
    format!("Q{height},{gap}\r\n").into_bytes()
}

/// # Reference Point (R x,y)
///
/// Moves the drawing origin. The transpiler applies offset arithmetic to
/// the document state first and emits the resulting absolute reference.
#[inline]
pub fn reference_point(x: u16, y: u16) -> Vec<u8> {
    format!("R{x},{y}\r\n").into_bytes()
}

/// # Line Draw Black (LO x,y,w,h)
#[inline]
pub fn line_black(x: u16, y: u16, width: u16, height: u16) -> Vec<u8> {
    format!("LO{x},{y},{width},{height}\r\n").into_bytes()
}

/// # Draw Box (X x1,y1,t,x2,y2)
///
/// Outline from top-left to bottom-right corner with stroke thickness `t`.
#[inline]
pub fn draw_box(x: u16, y: u16, width: u16, height: u16, thickness: u16) -> Vec<u8> {
    let x2 = x.saturating_add(width);
    let y2 = y.saturating_add(height);
    format!("X{x},{y},{thickness},{x2},{y2}\r\n").into_bytes()
}

/// # Direct Graphic Write (GW x,y,wb,h,data)
///
/// The only binary EPL2 command: `data` is `wb * h` raw 1bpp row bytes
/// appended immediately after the header comma.
pub fn graphic_write(x: u16, y: u16, width_bytes: u16, height: u16, rows: &[u8]) -> Vec<u8> {
    let mut out = format!("GW{x},{y},{width_bytes},{height},").into_bytes();
    out.extend_from_slice(rows);
    out.extend_from_slice(CRLF);
    out
}

/// # Cut Immediate (C)
#[inline]
pub fn cut() -> Vec<u8> {
    b"C\r\n".to_vec()
}

/// # Media Autosense (xa)
///
/// Feeds and measures labels to calibrate the gap sensor.
#[inline]
pub fn autosense() -> Vec<u8> {
    b"xa\r\n".to_vec()
}

/// # Error Enquiry (^ee)
///
/// Solicits an ACK (no error) or NAK error frame.
#[inline]
pub fn status_enquiry() -> Vec<u8> {
    b"^ee\r\n".to_vec()
}

/// # Configuration Dump (UQ)
///
/// Solicits the multi-line configuration dump.
#[inline]
pub fn config_inquiry() -> Vec<u8> {
    b"UQ\r\n".to_vec()
}

// ============================================================================
// BACKEND
// ============================================================================

/// EPL2 command set. Construct once per connection; the extended-command
/// registry is fixed at construction.
pub struct Epl {
    registry: ExtendedRegistry<Vec<u8>>,
}

impl Epl {
    pub fn new() -> Self {
        let mut registry = ExtendedRegistry::new();
        registry.register(NETWORK_CONFIG, true, |cmd, _state| {
            let mut out = cmd.payload.clone();
            out.extend_from_slice(CRLF);
            Ok(out)
        });
        Self { registry }
    }

    fn map_speed(speed: PrintSpeed) -> u8 {
        match speed {
            PrintSpeed::Slow => 1,
            PrintSpeed::Medium => 2,
            PrintSpeed::Fast => 3,
            PrintSpeed::Maximum => 4,
        }
    }

    /// Percent (0-100) to EPL density (0-15), rounding to nearest.
    fn map_darkness(percent: u8) -> u8 {
        ((percent as u16 * 15 + 50) / 100) as u8
    }
}

impl Default for Epl {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandSet for Epl {
    type Output = Vec<u8>;

    fn language(&self) -> Language {
        Language::Epl
    }

    fn document_start_prefix(&self) -> Vec<u8> {
        // flush any partial line left in the printer's input buffer
        CRLF.to_vec()
    }

    fn document_end_suffix(&self) -> Vec<u8> {
        Vec::new()
    }

    fn is_non_form_command(&self, cmd: &Command) -> bool {
        match cmd {
            Command::QueryStatus | Command::QueryConfiguration | Command::Autosense => true,
            Command::Extended(ext) => self.registry.is_non_form(ext.tag),
            _ => false,
        }
    }

    fn transpile(
        &self,
        cmd: &Command,
        state: &mut DocumentState,
    ) -> Result<Vec<u8>, TranspileError> {
        match cmd {
            Command::NoOp => Ok(self.noop()),
            Command::StartLabel => Ok(form_start()),
            // a form ends at P; nothing further to emit
            Command::EndLabel => Ok(CRLF.to_vec()),
            Command::Print { count } => {
                if *count == 0 {
                    return Err(TranspileError::InvalidParameter {
                        command: "Print",
                        reason: "count must be at least 1".into(),
                    });
                }
                Ok(print(*count))
            }
            Command::SetDarkness { percent } => {
                if *percent > 100 {
                    return Err(TranspileError::InvalidParameter {
                        command: "SetDarkness",
                        reason: format!("percent {percent} exceeds 100"),
                    });
                }
                Ok(density(Self::map_darkness(*percent)))
            }
            Command::SetPrintSpeed { speed: s } => Ok(speed(Self::map_speed(*s))),
            Command::SetLabelDimensions {
                width_dots,
                height_dots,
                gap_dots,
            } => {
                let mut out = label_width(*width_dots);
                if let Some(height) = height_dots {
                    // 24 dots (~3mm at 203 DPI) is the EPL2 default gap
                    out.extend_from_slice(&label_length(*height, gap_dots.unwrap_or(24)));
                }
                Ok(out)
            }
            Command::Offset { x, y, absolute } => {
                state.apply_offset(*x, *y, *absolute);
                Ok(reference_point(
                    state.horizontal_offset,
                    state.vertical_offset,
                ))
            }
            Command::AddLine {
                x,
                y,
                width,
                height,
            } => Ok(line_black(*x, *y, *width, *height)),
            Command::AddBox {
                x,
                y,
                width,
                height,
                thickness,
            } => Ok(draw_box(*x, *y, *width, *height, *thickness)),
            Command::AddImage {
                x,
                y,
                width,
                height,
                rows,
            } => {
                let width_bytes = width.div_ceil(8);
                let expected = width_bytes as usize * *height as usize;
                if rows.len() != expected {
                    return Err(TranspileError::InvalidParameter {
                        command: "AddImage",
                        reason: format!(
                            "row data is {} bytes, expected {} ({}x{} at 1bpp)",
                            rows.len(),
                            expected,
                            width,
                            height
                        ),
                    });
                }
                Ok(graphic_write(*x, *y, width_bytes, *height, rows))
            }
            Command::Cut => Ok(cut()),
            Command::Autosense => Ok(autosense()),
            Command::QueryStatus => Ok(status_enquiry()),
            Command::QueryConfiguration => Ok(config_inquiry()),
            Command::Raw { data } => Ok(data.clone()),
            Command::Extended(ext) => self.registry.dispatch(Language::Epl, ext, state),
        }
    }

    fn parse_message(
        &self,
        buffer: Vec<u8>,
        sent: Option<&Command>,
    ) -> Result<MessageParseResult<Vec<u8>>, MessageParseError> {
        if buffer.is_empty() {
            return Ok(MessageParseResult::incomplete(buffer));
        }

        // A solicited config dump is free text; no frame byte to scan for.
        if matches!(sent, Some(Command::QueryConfiguration)) {
            return Ok(parse_config_dump(buffer));
        }

        // Anything before the first recognized frame byte is noise from a
        // desynced stream; keep it in the remainder rather than dropping it.
        let Some(start) = buffer
            .iter()
            .position(|b| matches!(*b, ACK | NAK | LABEL_TAKEN))
        else {
            return Ok(MessageParseResult::incomplete(buffer));
        };
        let (noise, frame) = buffer.split_at(start);

        let result = match frame[0] {
            LABEL_TAKEN => one_frame(
                PrinterMessage::Status(StatusKind::LabelTaken),
                &frame[1..],
                false,
            ),
            ACK => {
                if frame.len() < 3 {
                    return Ok(MessageParseResult::incomplete(buffer));
                }
                if frame[1] != CR || frame[2] != LF {
                    return Err(MessageParseError::MalformedFrame {
                        frame: "ACK",
                        reason: format!("expected CRLF after ACK, got {:02X?}", &frame[1..3]),
                    });
                }
                one_frame(
                    PrinterMessage::Status(StatusKind::Acknowledged),
                    &frame[3..],
                    sent.is_some(),
                )
            }
            NAK => {
                let Some(end) = find_crlf(&frame[1..]) else {
                    return Ok(MessageParseResult::incomplete(buffer));
                };
                let body = &frame[1..1 + end];
                let report = parse_error_body(body)?;
                one_frame(
                    PrinterMessage::Error(report),
                    &frame[1 + end + 2..],
                    sent.is_some(),
                )
            }
            _ => unreachable!("position() only stops on frame bytes"),
        };

        Ok(prepend_noise(noise, result))
    }
}

// ============================================================================
// REPLY PARSING HELPERS
// ============================================================================

fn one_frame(
    message: PrinterMessage,
    rest: &[u8],
    matched: bool,
) -> MessageParseResult<Vec<u8>> {
    let result = MessageParseResult::complete(vec![message], rest.to_vec());
    if matched { result.matched() } else { result }
}

fn prepend_noise(noise: &[u8], mut result: MessageParseResult<Vec<u8>>) -> MessageParseResult<Vec<u8>> {
    if !noise.is_empty() {
        let mut remainder = noise.to_vec();
        remainder.extend_from_slice(&result.remainder);
        result.remainder = remainder;
    }
    result
}

fn find_crlf(data: &[u8]) -> Option<usize> {
    data.windows(2).position(|w| w == CRLF)
}

/// Decode a NAK body: `<2-digit code>[P<n>][L<n>]`.
fn parse_error_body(body: &[u8]) -> Result<ErrorReport, MessageParseError> {
    let text = std::str::from_utf8(body).map_err(|_| MessageParseError::MalformedFrame {
        frame: "NAK",
        reason: "error body is not ASCII".into(),
    })?;
    if text.len() < 2 || !text.is_char_boundary(2) {
        return Err(MessageParseError::MalformedFrame {
            frame: "NAK",
            reason: format!("error body `{text}` too short for a code"),
        });
    }
    if !text.is_ascii() {
        return Err(MessageParseError::MalformedFrame {
            frame: "NAK",
            reason: format!("error body `{text}` contains non-ASCII data"),
        });
    }
    let (code_text, mut rest) = text.split_at(2);
    let code: u8 = code_text
        .parse()
        .map_err(|_| MessageParseError::MalformedFrame {
            frame: "NAK",
            reason: format!("error code `{code_text}` is not numeric"),
        })?;

    let mut report = ErrorReport {
        conditions: error_code_conditions(code),
        ..Default::default()
    };

    while !rest.is_empty() {
        let (tag, tail) = rest.split_at(1);
        let digits_len = tail.bytes().take_while(u8::is_ascii_digit).count();
        let (digits, after) = tail.split_at(digits_len);
        let value: u32 = digits.parse().map_err(|_| MessageParseError::MalformedFrame {
            frame: "NAK",
            reason: format!("counter `{tag}` has no numeric value"),
        })?;
        match tag {
            "P" => report.unprinted_labels = Some(value),
            "L" => report.unprinted_raster_lines = Some(value),
            other => {
                return Err(MessageParseError::MalformedFrame {
                    frame: "NAK",
                    reason: format!("unknown counter suffix `{other}`"),
                });
            }
        }
        rest = after;
    }

    Ok(report)
}

/// EPL2 numeric error code table.
fn error_code_conditions(code: u8) -> ErrorConditions {
    match code {
        1 => ErrorConditions::SYNTAX_ERROR,
        2 => ErrorConditions::OBJECT_OUT_OF_BOUNDS,
        3 => ErrorConditions::BARCODE_DATA_LENGTH,
        4 => ErrorConditions::MEMORY_FULL,
        5 => ErrorConditions::MEMORY_CONFIGURATION,
        6 => ErrorConditions::SERIAL_COMM,
        // the printer cannot tell which ran out
        7 => ErrorConditions::MEDIA_EMPTY | ErrorConditions::RIBBON_EMPTY,
        8 => ErrorConditions::DUPLICATE_NAME,
        9 => ErrorConditions::NAME_NOT_FOUND,
        10 => ErrorConditions::NOT_IN_DATA_ENTRY_MODE,
        11 => ErrorConditions::PRINTHEAD_UP,
        12 => ErrorConditions::PAUSED,
        13 => ErrorConditions::PRINTHEAD_TOO_HOT,
        other => {
            tracing::warn!(code = other, "unknown EPL error code");
            ErrorConditions::empty()
        }
    }
}

/// Parse a `UQ` configuration dump: CRLF-separated lines, terminated by a
/// blank line. Incomplete until the terminator arrives.
fn parse_config_dump(buffer: Vec<u8>) -> MessageParseResult<Vec<u8>> {
    let Some(end) = buffer.windows(4).position(|w| w == b"\r\n\r\n") else {
        return MessageParseResult::incomplete(buffer);
    };
    let dump = String::from_utf8_lossy(&buffer[..end]).into_owned();
    let remainder = buffer[end + 4..].to_vec();

    let mut update = ConfigUpdate::default();
    for (index, line) in dump.lines().enumerate() {
        let line = line.trim();
        if index == 0 {
            // model line, e.g. `UKQ1935HLU     V4.59`
            let mut tokens = line.split_whitespace();
            update.model = tokens.next().map(str::to_owned);
            update.firmware = tokens.next_back().map(str::to_owned);
            continue;
        }
        if let Some(serial) = line.strip_prefix("S/N:") {
            update.serial_number = Some(serial.trim().to_owned());
            continue;
        }
        for token in line.split_whitespace() {
            parse_dump_token(token, &mut update);
        }
    }

    MessageParseResult::complete(vec![PrinterMessage::SettingUpdate(update)], remainder).matched()
}

/// The dump echoes settings in command syntax: `q600`, `Q208,25`, `S4`,
/// `D10`.
fn parse_dump_token(token: &str, update: &mut ConfigUpdate) {
    if let Some(rest) = token.strip_prefix('q') {
        update.label_width_dots = rest.parse().ok();
    } else if let Some(rest) = token.strip_prefix('Q') {
        let mut parts = rest.splitn(2, ',');
        update.label_height_dots = parts.next().and_then(|v| v.parse().ok());
        update.label_gap_dots = parts.next().and_then(|v| v.parse().ok());
    } else if let Some(rest) = token.strip_prefix('S') {
        update.speed = match rest.parse::<u8>() {
            Ok(1) => Some(PrintSpeed::Slow),
            Ok(2) => Some(PrintSpeed::Medium),
            Ok(3) => Some(PrintSpeed::Fast),
            Ok(4) => Some(PrintSpeed::Maximum),
            _ => None,
        };
    } else if let Some(rest) = token.strip_prefix('D') {
        update.darkness_percent = rest
            .parse::<u16>()
            .ok()
            .filter(|d| *d <= 15)
            .map(|d| ((d * 100 + 7) / 15) as u8);
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{EffectFlags, ExtendedCommand};

    fn transpile(cmd: &Command) -> Result<Vec<u8>, TranspileError> {
        Epl::new().transpile(cmd, &mut DocumentState::default())
    }

    #[test]
    fn test_form_start_bytes() {
        assert_eq!(form_start(), b"\r\nN\r\n");
    }

    #[test]
    fn test_print_command() {
        assert_eq!(transpile(&Command::Print { count: 3 }).unwrap(), b"P3\r\n");
    }

    #[test]
    fn test_print_zero_count_rejected() {
        let err = transpile(&Command::Print { count: 0 }).unwrap_err();
        assert!(matches!(err, TranspileError::InvalidParameter { command: "Print", .. }));
    }

    #[test]
    fn test_darkness_mapping() {
        assert_eq!(transpile(&Command::SetDarkness { percent: 0 }).unwrap(), b"D0\r\n");
        assert_eq!(transpile(&Command::SetDarkness { percent: 50 }).unwrap(), b"D8\r\n");
        assert_eq!(
            transpile(&Command::SetDarkness { percent: 100 }).unwrap(),
            b"D15\r\n"
        );
    }

    #[test]
    fn test_darkness_over_100_rejected() {
        assert!(transpile(&Command::SetDarkness { percent: 101 }).is_err());
    }

    #[test]
    fn test_speed_mapping() {
        assert_eq!(
            transpile(&Command::SetPrintSpeed { speed: PrintSpeed::Maximum }).unwrap(),
            b"S4\r\n"
        );
    }

    #[test]
    fn test_label_dimensions() {
        let out = transpile(&Command::SetLabelDimensions {
            width_dots: 600,
            height_dots: Some(208),
            gap_dots: Some(25),
        })
        .unwrap();
        assert_eq!(out, b"q600\r\nQ208,25\r\n");
    }

    #[test]
    fn test_label_dimensions_default_gap() {
        let out = transpile(&Command::SetLabelDimensions {
            width_dots: 600,
            height_dots: Some(208),
            gap_dots: None,
        })
        .unwrap();
        assert_eq!(out, b"q600\r\nQ208,24\r\n");
    }

    #[test]
    fn test_offset_mutates_state_and_emits_reference() {
        let epl = Epl::new();
        let mut state = DocumentState::default();
        let out = epl
            .transpile(&Command::Offset { x: 10, y: 20, absolute: false }, &mut state)
            .unwrap();
        assert_eq!(out, b"R10,20\r\n");
        assert_eq!(state.horizontal_offset, 10);

        let out = epl
            .transpile(&Command::Offset { x: -4, y: 0, absolute: false }, &mut state)
            .unwrap();
        assert_eq!(out, b"R6,20\r\n");
    }

    #[test]
    fn test_line_and_box() {
        assert_eq!(
            transpile(&Command::AddLine { x: 1, y: 2, width: 10, height: 5 }).unwrap(),
            b"LO1,2,10,5\r\n"
        );
        assert_eq!(
            transpile(&Command::AddBox { x: 10, y: 10, width: 90, height: 40, thickness: 2 })
                .unwrap(),
            b"X10,10,2,100,50\r\n"
        );
    }

    #[test]
    fn test_image_embeds_binary_rows() {
        let rows = vec![0xFF, 0x00, 0xAA, 0x55];
        let out = transpile(&Command::AddImage {
            x: 0,
            y: 0,
            width: 16,
            height: 2,
            rows: rows.clone(),
        })
        .unwrap();
        assert!(out.starts_with(b"GW0,0,2,2,"));
        assert_eq!(&out[10..14], &rows[..]);
        assert!(out.ends_with(CRLF));
    }

    #[test]
    fn test_image_row_length_validated() {
        let err = transpile(&Command::AddImage {
            x: 0,
            y: 0,
            width: 16,
            height: 2,
            rows: vec![0xFF],
        })
        .unwrap_err();
        assert!(matches!(err, TranspileError::InvalidParameter { command: "AddImage", .. }));
    }

    #[test]
    fn test_non_form_commands() {
        let epl = Epl::new();
        assert!(epl.is_non_form_command(&Command::QueryStatus));
        assert!(epl.is_non_form_command(&Command::Autosense));
        assert!(!epl.is_non_form_command(&Command::AddLine {
            x: 0,
            y: 0,
            width: 1,
            height: 1
        }));
    }

    #[test]
    fn test_network_config_extended_command() {
        let epl = Epl::new();
        let cmd = Command::Extended(
            ExtendedCommand::new(NETWORK_CONFIG, b"IP=10.0.0.5".to_vec())
                .with_effects(EffectFlags::ALTERS_CONFIG),
        );
        assert!(epl.is_non_form_command(&cmd));
        let out = epl.transpile(&cmd, &mut DocumentState::default()).unwrap();
        assert_eq!(out, b"IP=10.0.0.5\r\n");
    }

    // ========== Reply Parsing ==========

    #[test]
    fn test_ack_frame() {
        let epl = Epl::new();
        let result = epl
            .parse_message(vec![ACK, CR, LF], Some(&Command::QueryStatus))
            .unwrap();
        assert_eq!(
            result.messages,
            vec![PrinterMessage::Status(StatusKind::Acknowledged)]
        );
        assert!(result.remainder.is_empty());
        assert!(result.matched_awaited);
        assert!(!result.incomplete);
    }

    #[test]
    fn test_ack_prefix_is_incomplete() {
        let epl = Epl::new();
        let result = epl.parse_message(vec![ACK, CR], None).unwrap();
        assert!(result.incomplete);
        assert_eq!(result.remainder, vec![ACK, CR]);
    }

    #[test]
    fn test_label_taken_chime_is_unsolicited() {
        let epl = Epl::new();
        let result = epl.parse_message(vec![LABEL_TAKEN], Some(&Command::QueryStatus)).unwrap();
        assert_eq!(
            result.messages,
            vec![PrinterMessage::Status(StatusKind::LabelTaken)]
        );
        assert!(!result.matched_awaited);
    }

    #[test]
    fn test_nak_with_counters() {
        let epl = Epl::new();
        let mut buffer = vec![NAK];
        buffer.extend_from_slice(b"07P123L54321\r\n");
        let result = epl.parse_message(buffer, Some(&Command::QueryStatus)).unwrap();

        let expected = ErrorReport {
            conditions: ErrorConditions::MEDIA_EMPTY | ErrorConditions::RIBBON_EMPTY,
            unprinted_labels: Some(123),
            unprinted_raster_lines: Some(54321),
        };
        assert_eq!(result.messages, vec![PrinterMessage::Error(expected)]);
        assert!(result.matched_awaited);
        assert!(result.remainder.is_empty());
    }

    #[test]
    fn test_nak_without_counters() {
        let epl = Epl::new();
        let mut buffer = vec![NAK];
        buffer.extend_from_slice(b"11\r\n");
        let result = epl.parse_message(buffer, None).unwrap();
        let PrinterMessage::Error(report) = &result.messages[0] else {
            panic!("expected error message");
        };
        assert_eq!(report.conditions, ErrorConditions::PRINTHEAD_UP);
        assert_eq!(report.unprinted_labels, None);
    }

    #[test]
    fn test_nak_incomplete_without_crlf() {
        let epl = Epl::new();
        let mut buffer = vec![NAK];
        buffer.extend_from_slice(b"07P12");
        let result = epl.parse_message(buffer.clone(), None).unwrap();
        assert!(result.incomplete);
        assert_eq!(result.remainder, buffer);
    }

    #[test]
    fn test_noise_before_frame_is_preserved() {
        let epl = Epl::new();
        let mut buffer = b"garbage".to_vec();
        buffer.extend_from_slice(&[ACK, CR, LF]);
        let result = epl.parse_message(buffer, None).unwrap();
        assert_eq!(result.messages.len(), 1);
        assert_eq!(result.remainder, b"garbage");
    }

    #[test]
    fn test_pure_noise_is_incomplete() {
        let epl = Epl::new();
        let result = epl.parse_message(b"zzzz".to_vec(), None).unwrap();
        assert!(result.incomplete);
        assert_eq!(result.remainder, b"zzzz");
    }

    #[test]
    fn test_config_dump() {
        let epl = Epl::new();
        let dump = b"UKQ1935HLU     V4.59\r\nS/N: 123456789\r\nq600 Q208,25\r\nS2 D10\r\n\r\n".to_vec();
        let result = epl
            .parse_message(dump, Some(&Command::QueryConfiguration))
            .unwrap();
        assert!(result.matched_awaited);
        assert!(result.remainder.is_empty());

        let PrinterMessage::SettingUpdate(update) = &result.messages[0] else {
            panic!("expected setting update");
        };
        assert_eq!(update.model.as_deref(), Some("UKQ1935HLU"));
        assert_eq!(update.firmware.as_deref(), Some("V4.59"));
        assert_eq!(update.serial_number.as_deref(), Some("123456789"));
        assert_eq!(update.label_width_dots, Some(600));
        assert_eq!(update.label_height_dots, Some(208));
        assert_eq!(update.label_gap_dots, Some(25));
        assert_eq!(update.speed, Some(PrintSpeed::Medium));
        assert_eq!(update.darkness_percent, Some(67));
    }

    #[test]
    fn test_config_dump_incomplete_without_terminator() {
        let epl = Epl::new();
        let dump = b"UKQ1935HLU V4.59\r\nq600".to_vec();
        let result = epl
            .parse_message(dump.clone(), Some(&Command::QueryConfiguration))
            .unwrap();
        assert!(result.incomplete);
        assert_eq!(result.remainder, dump);
    }
}
