// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Jason Ish

//! Edit buffer and the pure reducer that drives it.
//!
//! The reducer never touches the terminal. It mutates the buffer and returns
//! the repaint instructions plus what the read loop should do next.
//!
//! Cursor arithmetic assumes every character occupies a single column.

use super::history::InputHistory;
use super::keys::KeyEvent;
use super::render::{PROMPT_WIDTH, Repaint};

/// Not-yet-submitted text. The cursor is always at the end.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub(crate) struct EditBuffer {
    text: String,
}

impl EditBuffer {
    /// Seed the buffer with outside text, such as a loaded document.
    pub(crate) fn new(text: &str) -> Self {
        Self {
            text: normalize(text),
        }
    }

    pub(crate) fn as_str(&self) -> &str {
        &self.text
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub(crate) fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }

    pub(crate) fn push(&mut self, c: char) {
        self.text.push(c);
    }

    /// Append a newline, unless the current line is empty.
    pub(crate) fn push_newline(&mut self) -> bool {
        if self.last_line().is_empty() {
            return false;
        }
        self.text.push('\n');
        true
    }

    pub(crate) fn pop(&mut self) -> Option<char> {
        self.text.pop()
    }

    /// Text after the last newline.
    pub(crate) fn last_line(&self) -> &str {
        match self.text.rfind('\n') {
            Some(idx) => &self.text[idx + 1..],
            None => &self.text,
        }
    }

    pub(crate) fn lines(&self) -> impl Iterator<Item = &str> {
        self.text.split('\n')
    }

    pub(crate) fn line_count(&self) -> usize {
        self.text.matches('\n').count() + 1
    }

    /// 0-based display column of the cursor, past the prompt marker.
    pub(crate) fn cursor_column(&self) -> u16 {
        let chars = self.last_line().chars().count();
        PROMPT_WIDTH.saturating_add(u16::try_from(chars).unwrap_or(u16::MAX))
    }

    pub(crate) fn clear(&mut self) {
        self.text.clear();
    }

    pub(crate) fn replace(&mut self, text: String) {
        self.text = text;
    }

    pub(crate) fn take(&mut self) -> String {
        std::mem::take(&mut self.text)
    }
}

const TAB_WIDTH: usize = 4;

/// Make text safe for single-column cursor math: CRLF becomes LF, tabs
/// become spaces and other control characters are dropped.
fn normalize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\n' => out.push('\n'),
            '\t' => out.extend(std::iter::repeat_n(' ', TAB_WIDTH)),
            c if c.is_control() => {}
            c => out.push(c),
        }
    }
    out
}

/// The single pending destructive action. Arming one disarms the other.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Pending {
    #[default]
    None,
    QuitArmed,
    ClearArmed,
}

#[derive(Debug, Default)]
pub(crate) struct EditorState {
    pub(crate) buffer: EditBuffer,
    pub(crate) pending: Pending,
}

impl EditorState {
    pub(crate) fn new(prefill: &str) -> Self {
        Self {
            buffer: EditBuffer::new(prefill),
            pending: Pending::None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Step {
    Continue,
    Submit,
    Interrupt,
    OpenPalette,
}

#[derive(Debug, PartialEq, Eq)]
pub(crate) struct Effect {
    pub(crate) repaint: Vec<Repaint>,
    pub(crate) step: Step,
}

impl Effect {
    fn continue_with(repaint: Vec<Repaint>) -> Self {
        Self {
            repaint,
            step: Step::Continue,
        }
    }
}

/// Apply one event to the editor state.
pub(crate) fn apply(state: &mut EditorState, event: KeyEvent, history: &mut InputHistory) -> Effect {
    let was_armed = state.pending != Pending::None;
    // Every event other than the arming ones clears the latch.
    state.pending = match event {
        KeyEvent::InterruptFirst => Pending::QuitArmed,
        KeyEvent::EscapeArmFirst => Pending::ClearArmed,
        _ => Pending::None,
    };
    let restore_helper = if was_armed { vec![Repaint::Helper] } else { Vec::new() };

    match event {
        KeyEvent::Printable(c) => {
            history.reset_position();
            state.buffer.push(c);
            let mut repaint = vec![Repaint::Echo(c)];
            repaint.extend(restore_helper);
            Effect::continue_with(repaint)
        }
        KeyEvent::Submit => Effect {
            repaint: vec![Repaint::Finish],
            step: Step::Submit,
        },
        KeyEvent::DiscardBlank | KeyEvent::EscapeConfirm => {
            history.reset_position();
            let erase_rows = rows_above(&state.buffer);
            state.buffer.clear();
            Effect::continue_with(vec![Repaint::Replace { erase_rows }, Repaint::Helper])
        }
        KeyEvent::NewlineInsert => {
            history.reset_position();
            if state.buffer.push_newline() {
                Effect::continue_with(vec![Repaint::OpenLine, Repaint::Helper])
            } else {
                Effect::continue_with(restore_helper)
            }
        }
        KeyEvent::Backspace => {
            history.reset_position();
            match state.buffer.pop() {
                Some('\n') => Effect::continue_with(vec![Repaint::JoinLine, Repaint::Helper]),
                Some(_) => {
                    let mut repaint = vec![Repaint::EraseChar];
                    repaint.extend(restore_helper);
                    Effect::continue_with(repaint)
                }
                None => Effect::continue_with(restore_helper),
            }
        }
        KeyEvent::HistoryUp => match history.get_previous(state.buffer.as_str()) {
            Some(text) => replace_buffer(state, text),
            None => Effect::continue_with(restore_helper),
        },
        KeyEvent::HistoryDown => {
            // Past the live edge the buffer is emptied.
            let text = history.get_next().unwrap_or_default();
            replace_buffer(state, text)
        }
        KeyEvent::PaletteTrigger => Effect {
            repaint: Vec::new(),
            step: Step::OpenPalette,
        },
        KeyEvent::InterruptFirst | KeyEvent::EscapeArmFirst => {
            Effect::continue_with(vec![Repaint::Helper])
        }
        KeyEvent::InterruptConfirm => Effect {
            repaint: vec![Repaint::Cancel {
                erase_rows: rows_above(&state.buffer),
            }],
            step: Step::Interrupt,
        },
        KeyEvent::Ignored => Effect::continue_with(restore_helper),
    }
}

fn rows_above(buffer: &EditBuffer) -> u16 {
    u16::try_from(buffer.line_count() - 1).unwrap_or(u16::MAX)
}

fn replace_buffer(state: &mut EditorState, text: String) -> Effect {
    let erase_rows = rows_above(&state.buffer);
    state.buffer.replace(text);
    Effect::continue_with(vec![Repaint::Replace { erase_rows }, Repaint::Helper])
}
