// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Jason Ish

//! Terminal output for the line editor.
//!
//! The editor does not know its absolute screen position, so everything here
//! is cursor-relative: the helper line always sits directly below the last
//! buffer line and the cursor is returned to the end of that buffer line
//! after each repaint.

use std::io::{self, Write};

use crossterm::cursor;
use crossterm::queue;
use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};
use crossterm::terminal::{self, ClearType};

use super::buffer::{EditorState, Pending};

/// Prompt marker shown at the start of every buffer line.
pub(crate) const PROMPT: &str = "› ";
pub(crate) const PROMPT_WIDTH: u16 = 2;

const QUIT_WARNING: &str = "Ctrl+C again to quit";
const CLEAR_WARNING: &str = "Hit Esc again to start over";

/// Incremental screen update produced by the reducer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Repaint {
    /// Echo one character at the cursor.
    Echo(char),
    /// Erase the character left of the cursor.
    EraseChar,
    /// Start a fresh prompt line below the current one.
    OpenLine,
    /// Remove the (empty) current line and return to the end of the one above.
    JoinLine,
    /// Redraw the whole buffer. `erase_rows` is how many lines above the
    /// current one belonged to the previous content.
    Replace { erase_rows: u16 },
    /// Redraw the helper line for the current latch state.
    Helper,
    /// Leave the editor: drop the helper line and park on a clean line.
    Finish,
    /// Leave the editor without submitting: erase the prompt lines and the
    /// helper line, leaving the cursor where the prompt started.
    Cancel { erase_rows: u16 },
}

pub(crate) fn paint<W: Write>(out: &mut W, repaints: &[Repaint], state: &EditorState) -> io::Result<()> {
    for repaint in repaints {
        match *repaint {
            Repaint::Echo(c) => queue!(out, Print(c))?,
            Repaint::EraseChar => queue!(out, Print("\x08 \x08"))?,
            Repaint::OpenLine => queue!(
                out,
                Print("\r\n"),
                terminal::Clear(ClearType::FromCursorDown),
                Print(PROMPT)
            )?,
            Repaint::JoinLine => queue!(
                out,
                Print("\r"),
                terminal::Clear(ClearType::FromCursorDown),
                cursor::MoveUp(1),
                cursor::MoveToColumn(state.buffer.cursor_column())
            )?,
            Repaint::Replace { erase_rows } => {
                if erase_rows > 0 {
                    queue!(out, cursor::MoveUp(erase_rows))?;
                }
                queue!(out, Print("\r"), terminal::Clear(ClearType::FromCursorDown))?;
                for (idx, line) in state.buffer.lines().enumerate() {
                    if idx > 0 {
                        queue!(out, Print("\r\n"))?;
                    }
                    queue!(out, Print(PROMPT), Print(line))?;
                }
            }
            Repaint::Helper => paint_helper(out, state)?,
            Repaint::Finish => queue!(
                out,
                Print("\r\n"),
                terminal::Clear(ClearType::FromCursorDown)
            )?,
            Repaint::Cancel { erase_rows } => {
                if erase_rows > 0 {
                    queue!(out, cursor::MoveUp(erase_rows))?;
                }
                queue!(out, Print("\r"), terminal::Clear(ClearType::FromCursorDown))?;
            }
        }
    }
    Ok(())
}

/// Draw the helper line below the cursor line and come back.
fn paint_helper<W: Write>(out: &mut W, state: &EditorState) -> io::Result<()> {
    queue!(
        out,
        Print("\r\n"),
        terminal::Clear(ClearType::CurrentLine)
    )?;
    match state.pending {
        Pending::None => paint_key_hints(out)?,
        Pending::QuitArmed => queue!(
            out,
            SetForegroundColor(Color::Red),
            Print(QUIT_WARNING),
            ResetColor
        )?,
        Pending::ClearArmed => queue!(
            out,
            SetForegroundColor(Color::Red),
            Print(CLEAR_WARNING),
            ResetColor
        )?,
    }
    queue!(
        out,
        cursor::MoveUp(1),
        cursor::MoveToColumn(state.buffer.cursor_column())
    )
}

fn paint_key_hints<W: Write>(out: &mut W) -> io::Result<()> {
    let hints = [
        ("Enter", "send"),
        ("Ctrl+J", "newline"),
        ("Ctrl+C", "quit"),
        ("↑↓", "history"),
        ("/", "command"),
    ];
    queue!(out, SetForegroundColor(Color::DarkGrey), Print("("))?;
    for (idx, (key, action)) in hints.iter().enumerate() {
        if idx > 0 {
            queue!(out, Print(", "))?;
        }
        queue!(
            out,
            SetForegroundColor(Color::Cyan),
            Print(key),
            SetForegroundColor(Color::DarkGrey),
            Print(format!(" = {action}"))
        )?;
    }
    queue!(out, Print(")"), ResetColor)
}

/// Plain prompt used when raw mode is unavailable.
pub(crate) fn paint_fallback_prompt<W: Write>(out: &mut W) -> io::Result<()> {
    queue!(out, Print("> "))?;
    out.flush()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rendered(repaints: &[Repaint], state: &EditorState) -> String {
        let mut out = Vec::new();
        paint(&mut out, repaints, state).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_echo_and_erase() {
        let state = EditorState::new("a");
        assert_eq!(rendered(&[Repaint::Echo('a')], &state), "a");
        assert_eq!(rendered(&[Repaint::EraseChar], &state), "\x08 \x08");
    }

    #[test]
    fn test_replace_draws_every_line_with_prompt() {
        let state = EditorState::new("one\ntwo");
        let out = rendered(&[Repaint::Replace { erase_rows: 2 }], &state);
        // Cursor moves up over the old content first.
        assert!(out.starts_with("\x1b[2A"));
        assert!(out.ends_with("› one\r\n› two"));
    }

    #[test]
    fn test_helper_returns_to_cursor_column() {
        let state = EditorState::new("abc");
        let out = rendered(&[Repaint::Helper], &state);
        assert!(out.starts_with("\r\n"));
        assert!(out.contains("Ctrl+J"));
        // Back up one row and to 1-based column 6 (prompt plus three chars).
        assert!(out.ends_with("\x1b[1A\x1b[6G"));
    }

    #[test]
    fn test_helper_shows_armed_warnings() {
        let mut state = EditorState::new("x");
        state.pending = Pending::QuitArmed;
        assert!(rendered(&[Repaint::Helper], &state).contains(QUIT_WARNING));
        state.pending = Pending::ClearArmed;
        assert!(rendered(&[Repaint::Helper], &state).contains(CLEAR_WARNING));
    }

    #[test]
    fn test_cancel_erases_prompt_lines() {
        let state = EditorState::new("ab\ncd");
        assert_eq!(
            rendered(&[Repaint::Cancel { erase_rows: 1 }], &state),
            "\x1b[1A\r\x1b[J"
        );
        assert_eq!(
            rendered(&[Repaint::Cancel { erase_rows: 0 }], &state),
            "\r\x1b[J"
        );
    }

    #[test]
    fn test_join_line_lands_on_previous_line_end() {
        let state = EditorState::new("ab");
        let out = rendered(&[Repaint::JoinLine], &state);
        assert!(out.ends_with("\x1b[1A\x1b[5G"));
    }
}
