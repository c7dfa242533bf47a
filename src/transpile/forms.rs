//! # Form and Transaction Segmentation
//!
//! The first transpiler pass: split a flat command sequence into label
//! forms and atomically-sendable transactions, without producing any
//! native output yet. Output generation happens afterwards in
//! [`super::compile`], so that per-command errors can be aggregated
//! across the whole document.
//!
//! The pass is an iterative state machine over a work stack. Healing and
//! reordering are expressed by pushing synthetic commands back onto the
//! stack for reprocessing, which keeps every rule in one place:
//!
//! - a `StartLabel` while a form is open closes the previous form first;
//! - an `EndLabel` with no form open becomes a no-op;
//! - form-content commands outside a form open one implicitly;
//! - form-illegal commands inside a form are moved, fenced, or rejected
//!   per the configured [`ReorderBehavior`];
//! - a still-open form at end of input is closed synthetically.

use std::collections::VecDeque;

use crate::command::{Command, EffectFlags};
use crate::error::TranspileError;
use crate::lang::CommandSet;

use super::ReorderBehavior;

/// One atomically-sendable group of commands, before output generation.
///
/// `wait_commands` is the subsequence of `commands` flagged
/// `WAITS_FOR_RESPONSE`.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct PrecompiledTransaction {
    pub commands: Vec<Command>,
    pub wait_commands: Vec<Command>,
}

impl PrecompiledTransaction {
    fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

/// One label form: its transactions plus the union of the effect flags of
/// every command folded into it.
#[derive(Debug, Clone, Default)]
pub(crate) struct RawCommandForm {
    pub transactions: Vec<PrecompiledTransaction>,
    pub effects: EffectFlags,
}

/// Segment a command sequence into forms, applying the reorder behavior
/// and splicing displaced commands back in as their own forms.
pub(crate) fn segment_document<C: CommandSet>(
    command_set: &C,
    commands: Vec<Command>,
    reorder: ReorderBehavior,
) -> Result<Vec<RawCommandForm>, TranspileError> {
    let (mut forms, displaced) = segment_pass(command_set, commands, reorder)?;

    if !displaced.is_empty() {
        tracing::debug!(count = displaced.len(), "reordering form-illegal commands");
        // A displaced command triggering another reorder would mean the
        // backend contradicts itself, so the second pass is strict.
        let (displaced_forms, leftover) =
            segment_pass(command_set, displaced, ReorderBehavior::ThrowError)?;
        debug_assert!(leftover.is_empty());

        match reorder {
            ReorderBehavior::AfterAllForms => forms.extend(displaced_forms),
            ReorderBehavior::BeforeAllForms => {
                let mut spliced = displaced_forms;
                spliced.extend(forms);
                forms = spliced;
            }
            ReorderBehavior::CloseForm | ReorderBehavior::ThrowError => {
                unreachable!("these behaviors never displace commands")
            }
        }
    }

    Ok(forms)
}

/// The main state-machine pass. Returns the forms built in place plus the
/// commands pulled aside for global reordering.
fn segment_pass<C: CommandSet>(
    command_set: &C,
    commands: Vec<Command>,
    reorder: ReorderBehavior,
) -> Result<(Vec<RawCommandForm>, Vec<Command>), TranspileError> {
    let mut stack: VecDeque<Command> = commands.into();
    let mut forms: Vec<RawCommandForm> = Vec::new();
    let mut displaced: Vec<Command> = Vec::new();
    let mut form = RawCommandForm::default();
    let mut transaction = PrecompiledTransaction::default();
    let mut inside_form = false;

    loop {
        let Some(cmd) = stack.pop_front() else {
            if inside_form {
                // unterminated trailing form: close it and keep going
                stack.push_front(Command::EndLabel);
                continue;
            }
            break;
        };

        // Substitution happens before any form logic sees the command;
        // substitutes may themselves expand or be form-illegal.
        if let Some(substitutes) = command_set.expand(&cmd) {
            for substitute in substitutes.into_iter().rev() {
                stack.push_front(substitute);
            }
            continue;
        }

        match cmd {
            Command::StartLabel if inside_form => {
                // the previous form was never closed; heal the boundary
                stack.push_front(cmd);
                stack.push_front(Command::EndLabel);
            }
            Command::StartLabel => {
                inside_form = true;
                form.effects |= cmd.effects();
                transaction.commands.push(cmd);
            }
            Command::EndLabel if inside_form => {
                inside_form = false;
                form.effects |= cmd.effects();
                transaction.commands.push(cmd);
                form.transactions.push(std::mem::take(&mut transaction));
                forms.push(std::mem::take(&mut form));
            }
            Command::EndLabel => {
                // spurious close with nothing open; swallow it
                stack.push_front(Command::NoOp);
            }
            cmd if inside_form && command_set.is_non_form_command(&cmd) => match reorder {
                ReorderBehavior::AfterAllForms | ReorderBehavior::BeforeAllForms => {
                    // leave a no-op behind so transaction segmentation is
                    // undisturbed
                    displaced.push(cmd);
                    stack.push_front(Command::NoOp);
                }
                ReorderBehavior::CloseForm => {
                    stack.push_front(cmd);
                    stack.push_front(Command::EndLabel);
                }
                ReorderBehavior::ThrowError => {
                    return Err(TranspileError::NonFormCommandInForm {
                        command: cmd.name(),
                    });
                }
            },
            cmd if !inside_form && cmd.is_form_content() => {
                // forms open implicitly on demand
                stack.push_front(cmd);
                stack.push_front(Command::StartLabel);
            }
            cmd => {
                let waits = cmd.has_effect(EffectFlags::WAITS_FOR_RESPONSE);
                form.effects |= cmd.effects();
                if waits {
                    transaction.wait_commands.push(cmd.clone());
                }
                transaction.commands.push(cmd);
                if waits && !inside_form {
                    // natural send boundary: the caller must collect the
                    // reply before sending anything further
                    form.transactions.push(std::mem::take(&mut transaction));
                }
            }
        }
    }

    if !transaction.is_empty() {
        form.transactions.push(transaction);
    }
    if !form.transactions.is_empty() {
        forms.push(form);
    }

    Ok((forms, displaced))
}
