//! # ZPL Backend
//!
//! ZPL II command set for Zebra industrial/desktop printers. Pure text:
//! caret (`^`) format commands inside `^XA`/`^XZ` forms, tilde (`~`)
//! control commands outside them. Graphics are hex-encoded ASCII, so the
//! native output type is `String`.
//!
//! ## Replies
//!
//! Host replies are framed `STX … ETX`, optionally followed by CRLF.
//! `~HS` (host status) answers with three frames of comma-delimited
//! fields, distinguished by field count; `^HH` (host configuration)
//! answers with one frame of `value description` lines.

use crate::command::{Command, ExtendedTag, PrintSpeed};
use crate::error::{MessageParseError, TranspileError};
use crate::message::{
    ConfigUpdate, ErrorConditions, ErrorReport, MessageParseResult, PrinterMessage, StatusKind,
};
use crate::transpile::DocumentState;

use super::{CommandSet, ExtendedRegistry, Language};

/// STX - start of a host reply frame
pub const STX: char = '\x02';

/// ETX - end of a host reply frame
pub const ETX: char = '\x03';

/// Extended command: host RAM status query (`~HM`). Forbidden inside a
/// form; solicits a framed reply.
pub const HOST_RAM_STATUS: ExtendedTag = ExtendedTag("zpl.host-ram-status");

/// ZPL II command set.
pub struct Zpl {
    registry: ExtendedRegistry<String>,
}

impl Zpl {
    pub fn new() -> Self {
        let mut registry = ExtendedRegistry::new();
        registry.register(HOST_RAM_STATUS, true, |_cmd, _state| Ok("~HM\n".into()));
        Self { registry }
    }

    /// Abstract speed to inches-per-second for `^PR`.
    fn map_speed(speed: PrintSpeed) -> u8 {
        match speed {
            PrintSpeed::Slow => 2,
            PrintSpeed::Medium => 4,
            PrintSpeed::Fast => 6,
            PrintSpeed::Maximum => 12,
        }
    }

    /// Percent (0-100) to `~SD` darkness (00-30), zero-padded.
    fn map_darkness(percent: u8) -> u8 {
        ((percent as u16 * 30 + 50) / 100) as u8
    }
}

impl Default for Zpl {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandSet for Zpl {
    type Output = String;

    fn language(&self) -> Language {
        Language::Zpl
    }

    fn document_start_prefix(&self) -> String {
        String::new()
    }

    fn document_end_suffix(&self) -> String {
        String::new()
    }

    fn expand(&self, cmd: &Command) -> Option<Vec<Command>> {
        match cmd {
            // ZPL has no gap argument on its dimension commands; gapped
            // media is selected separately with ^MNY.
            Command::SetLabelDimensions {
                width_dots,
                height_dots,
                gap_dots: Some(_),
            } => Some(vec![
                Command::SetLabelDimensions {
                    width_dots: *width_dots,
                    height_dots: *height_dots,
                    gap_dots: None,
                },
                Command::Raw {
                    data: b"^MNY\n".to_vec(),
                },
            ]),
            _ => None,
        }
    }

    fn is_non_form_command(&self, cmd: &Command) -> bool {
        match cmd {
            Command::QueryStatus | Command::QueryConfiguration | Command::Autosense => true,
            Command::Extended(ext) => self.registry.is_non_form(ext.tag),
            _ => false,
        }
    }

    fn transpile(&self, cmd: &Command, state: &mut DocumentState) -> Result<String, TranspileError> {
        match cmd {
            Command::NoOp => Ok(self.noop()),
            Command::StartLabel => Ok("^XA\n".into()),
            Command::EndLabel => Ok("^XZ\n".into()),
            Command::Print { count } => {
                if *count == 0 {
                    return Err(TranspileError::InvalidParameter {
                        command: "Print",
                        reason: "count must be at least 1".into(),
                    });
                }
                Ok(format!("^PQ{count},0,0,N\n"))
            }
            Command::SetDarkness { percent } => {
                if *percent > 100 {
                    return Err(TranspileError::InvalidParameter {
                        command: "SetDarkness",
                        reason: format!("percent {percent} exceeds 100"),
                    });
                }
                Ok(format!("~SD{:02}\n", Self::map_darkness(*percent)))
            }
            Command::SetPrintSpeed { speed } => {
                let ips = Self::map_speed(*speed);
                Ok(format!("^PR{ips},{ips},{ips}\n"))
            }
            Command::SetLabelDimensions {
                width_dots,
                height_dots,
                gap_dots: None,
            } => {
                let mut out = format!("^PW{width_dots}\n");
                if let Some(height) = height_dots {
                    out.push_str(&format!("^LL{height}\n"));
                }
                Ok(out)
            }
            Command::SetLabelDimensions { gap_dots: Some(_), .. } => {
                // expand() rewrites gapped dimensions before transpile
                unreachable!("gapped SetLabelDimensions is expanded before transpilation")
            }
            Command::Offset { x, y, absolute } => {
                state.apply_offset(*x, *y, *absolute);
                Ok(format!(
                    "^LH{},{}\n",
                    state.horizontal_offset, state.vertical_offset
                ))
            }
            Command::AddLine {
                x,
                y,
                width,
                height,
            } => {
                // a solid line is a fully-thick graphic box
                let thickness = (*width).min(*height).max(1);
                Ok(format!("^FO{x},{y}^GB{width},{height},{thickness},B,0^FS\n"))
            }
            Command::AddBox {
                x,
                y,
                width,
                height,
                thickness,
            } => Ok(format!("^FO{x},{y}^GB{width},{height},{thickness},B,0^FS\n")),
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
                let mut hex = String::with_capacity(rows.len() * 2);
                for byte in rows {
                    hex.push_str(&format!("{byte:02X}"));
                }
                Ok(format!(
                    "^FO{x},{y}^GFA,{total},{total},{width_bytes},{hex}^FS\n",
                    total = rows.len()
                ))
            }
            Command::Cut => Err(TranspileError::Unsupported {
                language: "ZPL",
                command: "Cut",
                reason: "no immediate-cut command; select cutter print mode with ^MM instead"
                    .into(),
            }),
            Command::Autosense => Ok("~JC\n".into()),
            Command::QueryStatus => Ok("~HS\n".into()),
            // ^HH only answers from inside a format block
            Command::QueryConfiguration => Ok("^XA^HH^XZ\n".into()),
            Command::Raw { data } => Ok(String::from_utf8_lossy(data).into_owned()),
            Command::Extended(ext) => self.registry.dispatch(Language::Zpl, ext, state),
        }
    }

    fn parse_message(
        &self,
        buffer: String,
        sent: Option<&Command>,
    ) -> Result<MessageParseResult<String>, MessageParseError> {
        if buffer.is_empty() {
            return Ok(MessageParseResult::incomplete(buffer));
        }

        let Some(start) = buffer.find(STX) else {
            // no frame in sight; keep whatever this is and wait
            return Ok(MessageParseResult::incomplete(buffer));
        };
        let Some(end) = buffer[start..].find(ETX).map(|i| start + i) else {
            return Ok(MessageParseResult::incomplete(buffer));
        };

        let noise = &buffer[..start];
        let content = &buffer[start + 1..end];
        let mut rest = &buffer[end + 1..];
        rest = rest.strip_prefix("\r\n").unwrap_or(rest);

        let mut result = match sent {
            Some(Command::QueryConfiguration) => {
                MessageParseResult::complete(
                    vec![PrinterMessage::SettingUpdate(parse_host_config(content))],
                    rest.to_owned(),
                )
                .matched()
            }
            _ => parse_host_status_frame(content, sent, rest),
        };

        if !noise.is_empty() {
            let mut remainder = noise.to_owned();
            remainder.push_str(&result.remainder);
            result.remainder = remainder;
        }
        Ok(result)
    }
}

// ============================================================================
// REPLY PARSING HELPERS
// ============================================================================

fn flag(fields: &[&str], index: usize) -> bool {
    fields.get(index).copied() == Some("1")
}

/// Dispatch a `~HS` frame by field count: 12 fields is status line 1,
/// 11 is line 2, 2 is line 3 (password/static RAM, nothing to report).
fn parse_host_status_frame(
    content: &str,
    sent: Option<&Command>,
    rest: &str,
) -> MessageParseResult<String> {
    let fields: Vec<&str> = content.split(',').collect();
    let mut messages = Vec::new();
    let mut matched = false;

    match fields.len() {
        12 => {
            // aaa,b,c,dddd,eee,f,g,h,iii,j,k,l
            if let Some(length) = fields.get(3).and_then(|v| v.parse::<u16>().ok()) {
                messages.push(PrinterMessage::SettingUpdate(ConfigUpdate {
                    label_height_dots: Some(length),
                    ..Default::default()
                }));
            }
            let mut conditions = ErrorConditions::empty();
            if flag(&fields, 1) {
                conditions |= ErrorConditions::MEDIA_EMPTY;
            }
            if flag(&fields, 5) {
                conditions |= ErrorConditions::BUFFER_FULL;
            }
            if flag(&fields, 9) {
                conditions |= ErrorConditions::CORRUPT_RAM;
            }
            if flag(&fields, 10) {
                conditions |= ErrorConditions::PRINTHEAD_TOO_COLD;
            }
            if flag(&fields, 11) {
                conditions |= ErrorConditions::PRINTHEAD_TOO_HOT;
            }
            if !conditions.is_empty() {
                messages.push(PrinterMessage::Error(ErrorReport {
                    conditions,
                    ..Default::default()
                }));
            }
            if flag(&fields, 2) {
                messages.push(PrinterMessage::Status(StatusKind::Paused));
            } else if conditions.is_empty() {
                messages.push(PrinterMessage::Status(StatusKind::Ready));
            }
            // first status line answers the query; the trailing two
            // frames must not re-resolve it
            matched = matches!(sent, Some(Command::QueryStatus));
        }
        11 => {
            let mut conditions = ErrorConditions::empty();
            if flag(&fields, 2) {
                conditions |= ErrorConditions::PRINTHEAD_UP;
            }
            if flag(&fields, 3) {
                conditions |= ErrorConditions::RIBBON_EMPTY;
            }
            if !conditions.is_empty() {
                messages.push(PrinterMessage::Error(ErrorReport {
                    conditions,
                    unprinted_labels: fields.get(8).and_then(|v| v.parse().ok()),
                    ..Default::default()
                }));
            }
        }
        2 => {}
        other => {
            tracing::warn!(fields = other, "unrecognized ZPL host frame shape");
        }
    }

    let result = MessageParseResult::complete(messages, rest.to_owned());
    if matched { result.matched() } else { result }
}

/// Parse a `^HH` host configuration frame. Lines read `value description`,
/// e.g. `+10.0  DARKNESS` or `832  PRINT WIDTH`.
fn parse_host_config(content: &str) -> ConfigUpdate {
    let mut update = ConfigUpdate::default();
    for line in content.lines() {
        let line = line.trim();
        let Some((value, description)) = line.split_once(char::is_whitespace) else {
            continue;
        };
        let description = description.trim();
        if description.ends_with("DARKNESS") {
            if let Ok(darkness) = value.parse::<f32>() {
                update.darkness_percent =
                    Some((darkness / 30.0 * 100.0).round().clamp(0.0, 100.0) as u8);
            }
        } else if description.ends_with("PRINT SPEED") {
            if let Ok(ips) = value.parse::<f32>() {
                update.speed = Some(match ips {
                    s if s <= 3.0 => PrintSpeed::Slow,
                    s if s <= 5.0 => PrintSpeed::Medium,
                    s if s <= 8.0 => PrintSpeed::Fast,
                    _ => PrintSpeed::Maximum,
                });
            }
        } else if description.ends_with("PRINT WIDTH") {
            update.print_width_dots = value.parse().ok();
        } else if description.ends_with("LABEL LENGTH") {
            update.label_height_dots = value.parse().ok();
        } else if description.ends_with("FIRMWARE") {
            update.firmware = Some(value.to_owned());
        }
    }
    update
}

// ============================================================================
// TESTS
// ============================================================================
