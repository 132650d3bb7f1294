// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Jason Ish

//! The multiline line editor.
//!
//! `LineEditor::read_line` runs one prompt: it enters raw mode, decodes
//! keys, feeds them through the reducer and paints the result until the
//! user submits, cancels or leaves through the palette.

use std::io::{self, Write};
use std::time::Duration;

use crossterm::queue;
use crossterm::style::Print;
use crossterm::terminal::{self, ClearType};

use super::buffer::{EditorState, Step, apply};
use super::history::InputHistory;
use super::keys::{KeyDecoder, classify};
use super::render::{Repaint, paint, paint_fallback_prompt};
use super::terminal::{KeySource, RawModeGuard};

/// Result of one `read_line` call.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum ReadOutcome {
    Submitted(String),
    /// Nothing to send this turn; prompt again.
    Skipped,
    /// The palette asked to leave the session.
    Exit,
    /// Ctrl+C twice, or end of input.
    Interrupted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PaletteOutcome {
    Continue,
    Exit,
}

/// Invoked when `/` is typed on an empty line. Called in cooked mode.
pub(crate) trait PaletteHook {
    fn open_palette(&mut self) -> crate::error::Result<PaletteOutcome>;
}

pub(crate) struct LineEditor<S: KeySource, W: Write> {
    source: S,
    out: W,
    history: InputHistory,
    decoder: KeyDecoder,
}

impl<S: KeySource, W: Write> LineEditor<S, W> {
    pub(crate) fn new(source: S, out: W, history_size: usize, escape_timeout: Duration) -> Self {
        Self {
            source,
            out,
            history: InputHistory::new(history_size),
            decoder: KeyDecoder::new(escape_timeout),
        }
    }

    pub(crate) fn read_line(
        &mut self,
        prefill: &str,
        hook: &mut dyn PaletteHook,
    ) -> io::Result<ReadOutcome> {
        let err = match RawModeGuard::enter(&mut self.source) {
            Ok(guard) => {
                return run_raw(
                    guard,
                    &mut self.out,
                    &mut self.history,
                    &mut self.decoder,
                    prefill,
                    hook,
                );
            }
            Err(e) => e,
        };
        tracing::debug!("raw mode unavailable, using line input: {err}");
        read_fallback(&mut self.source, &mut self.out, &mut self.history)
    }

    #[cfg(test)]
    fn output(&self) -> &W {
        &self.out
    }
}

fn run_raw<S: KeySource, W: Write>(
    mut guard: RawModeGuard<'_, S>,
    out: &mut W,
    history: &mut InputHistory,
    decoder: &mut KeyDecoder,
    prefill: &str,
    hook: &mut dyn PaletteHook,
) -> io::Result<ReadOutcome> {
    let mut state = EditorState::new(prefill);
    let initial = [Repaint::Replace { erase_rows: 0 }, Repaint::Helper];
    paint(out, &initial, &state)?;
    out.flush()?;

    loop {
        let Some(key) = decoder.next_key(guard.source())? else {
            // Input closed underneath us.
            let erase_rows = u16::try_from(state.buffer.line_count() - 1).unwrap_or(u16::MAX);
            paint(out, &[Repaint::Cancel { erase_rows }], &state)?;
            out.flush()?;
            return Ok(ReadOutcome::Interrupted);
        };

        let event = classify(key, &state);
        let effect = apply(&mut state, event, history);
        paint(out, &effect.repaint, &state)?;
        out.flush()?;

        match effect.step {
            Step::Continue => {}
            Step::Submit => {
                let text = state.buffer.take();
                history.add_entry(&text);
                return Ok(ReadOutcome::Submitted(text));
            }
            Step::Interrupt => return Ok(ReadOutcome::Interrupted),
            Step::OpenPalette => {
                guard.suspend()?;
                queue!(out, Print("\r"), terminal::Clear(ClearType::FromCursorDown))?;
                out.flush()?;

                let outcome = hook.open_palette().unwrap_or_else(|e| {
                    tracing::warn!("command palette failed: {e}");
                    PaletteOutcome::Continue
                });
                if outcome == PaletteOutcome::Exit {
                    return Ok(ReadOutcome::Exit);
                }

                guard.resume()?;
                paint(out, &initial, &state)?;
                out.flush()?;
            }
        }
    }
}

/// Line input for when stdin is not a terminal.
///
/// Ctrl+C does not end this read once a chat turn has run, because the
/// runtime's SIGINT handler stays installed for the life of the process.
/// End of input (Ctrl+D) still ends the session.
fn read_fallback<S: KeySource, W: Write>(
    source: &mut S,
    out: &mut W,
    history: &mut InputHistory,
) -> io::Result<ReadOutcome> {
    paint_fallback_prompt(out)?;
    let Some(line) = source.read_cooked_line()? else {
        return Ok(ReadOutcome::Interrupted);
    };
    if line.trim().is_empty() {
        return Ok(ReadOutcome::Skipped);
    }
    history.add_entry(&line);
    Ok(ReadOutcome::Submitted(line))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::terminal::ScriptedKeys;
    use crate::error::Error;

    struct RecordingHook {
        calls: usize,
        outcome: PaletteOutcome,
        fail: bool,
    }

    impl RecordingHook {
        fn new(outcome: PaletteOutcome) -> Self {
            Self {
                calls: 0,
                outcome,
                fail: false,
            }
        }
    }

    impl PaletteHook for RecordingHook {
        fn open_palette(&mut self) -> crate::error::Result<PaletteOutcome> {
            self.calls += 1;
            if self.fail {
                return Err(Error::Other("palette exploded".to_string()));
            }
            Ok(self.outcome)
        }
    }

    /// Accepts a fixed number of writes, then fails every one after.
    struct FailingWriter {
        writes_left: usize,
    }

    impl Write for FailingWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if self.writes_left == 0 {
                return Err(io::Error::new(io::ErrorKind::BrokenPipe, "display gone"));
            }
            self.writes_left -= 1;
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn editor(keys: ScriptedKeys) -> LineEditor<ScriptedKeys, Vec<u8>> {
        LineEditor::new(keys, Vec::new(), 100, Duration::from_millis(10))
    }

    fn read(editor: &mut LineEditor<ScriptedKeys, Vec<u8>>) -> ReadOutcome {
        let mut hook = RecordingHook::new(PaletteOutcome::Continue);
        editor.read_line("", &mut hook).unwrap()
    }

    #[test]
    fn test_submit_simple_line() {
        let mut editor = editor(ScriptedKeys::typed(b"hello\r"));
        assert_eq!(read(&mut editor), ReadOutcome::Submitted("hello".into()));
        assert!(!editor.source.raw);
        assert_eq!(editor.source.restores, 1);
    }

    #[test]
    fn test_multiline_submit() {
        let mut editor = editor(ScriptedKeys::typed(b"ab\ncd\r"));
        assert_eq!(read(&mut editor), ReadOutcome::Submitted("ab\ncd".into()));
    }

    #[test]
    fn test_newline_on_empty_line_is_ignored() {
        let mut editor = editor(ScriptedKeys::typed(b"\n\nx\n\ny\r"));
        assert_eq!(read(&mut editor), ReadOutcome::Submitted("x\ny".into()));
    }

    #[test]
    fn test_backspace_across_lines() {
        let mut editor = editor(ScriptedKeys::typed(b"ab\ncd\x7f\x7f\x7f\r"));
        assert_eq!(read(&mut editor), ReadOutcome::Submitted("ab".into()));

        let mut editor = self::editor(ScriptedKeys::typed(b"ab\ncd\x7f\x7f\x7f\x7f\r"));
        assert_eq!(read(&mut editor), ReadOutcome::Submitted("a".into()));
    }

    #[test]
    fn test_blank_enter_does_not_submit() {
        let mut editor = editor(ScriptedKeys::typed(b"   \rok\r"));
        assert_eq!(read(&mut editor), ReadOutcome::Submitted("ok".into()));
    }

    #[test]
    fn test_double_ctrl_c_interrupts() {
        let mut editor = editor(ScriptedKeys::typed(b"draft\x03\x03"));
        assert_eq!(read(&mut editor), ReadOutcome::Interrupted);
        assert_eq!(editor.source.restores, 1);
        let output = String::from_utf8_lossy(editor.output());
        assert!(output.contains("Ctrl+C again to quit"));
    }

    #[test]
    fn test_double_ctrl_c_erases_prompt_lines() {
        let mut editor = editor(ScriptedKeys::typed(b"ab\ncd\x03\x03"));
        assert_eq!(read(&mut editor), ReadOutcome::Interrupted);
        let output = String::from_utf8_lossy(editor.output()).into_owned();
        let tail = &output[output.rfind("Ctrl+C again to quit").unwrap()..];
        // Up over the first prompt line, then clear everything below.
        assert!(tail.ends_with("\x1b[1A\r\x1b[J"), "{tail:?}");
    }

    #[test]
    fn test_write_failure_restores_terminal_mode() {
        let keys = ScriptedKeys::typed(b"hello\r");
        let mut editor = LineEditor::new(
            keys,
            FailingWriter { writes_left: 3 },
            100,
            Duration::from_millis(10),
        );
        let mut hook = RecordingHook::new(PaletteOutcome::Continue);
        assert!(editor.read_line("", &mut hook).is_err());
        assert!(!editor.source.raw);
        assert_eq!(editor.source.raw_entries, 1);
        assert_eq!(editor.source.restores, 1);
    }

    #[test]
    fn test_ctrl_c_then_typing_disarms() {
        let mut editor = editor(ScriptedKeys::typed(b"\x03a\x03b\r"));
        assert_eq!(read(&mut editor), ReadOutcome::Submitted("ab".into()));
    }

    #[test]
    fn test_double_escape_clears_buffer() {
        let mut editor = editor(ScriptedKeys::new(&[
            b"d", b"r", b"a", b"f", b"t", b" ", b"t", b"e", b"x", b"t", b"\x1b", b"\x1b", b"n",
            b"\r",
        ]));
        assert_eq!(read(&mut editor), ReadOutcome::Submitted("n".into()));
        let output = String::from_utf8_lossy(editor.output());
        assert!(output.contains("Hit Esc again to start over"));
    }

    #[test]
    fn test_up_arrow_recalls_history() {
        let mut editor = editor(ScriptedKeys::typed(b"hello\r"));
        read(&mut editor);

        editor.source = ScriptedKeys::new(&[b"\x1b[A", b"\r"]);
        assert_eq!(read(&mut editor), ReadOutcome::Submitted("hello".into()));
    }

    #[test]
    fn test_up_then_down_restores_draft() {
        let mut editor = editor(ScriptedKeys::typed(b"first\r"));
        read(&mut editor);

        editor.source = ScriptedKeys::new(&[b"d", b"r", b"\x1b[A", b"\x1b[B", b"\r"]);
        assert_eq!(read(&mut editor), ReadOutcome::Submitted("dr".into()));
    }

    #[test]
    fn test_slash_opens_palette_once() {
        let mut editor = editor(ScriptedKeys::typed(b"/a/b\r"));
        let mut hook = RecordingHook::new(PaletteOutcome::Continue);
        let outcome = editor.read_line("", &mut hook).unwrap();
        assert_eq!(outcome, ReadOutcome::Submitted("a/b".into()));
        assert_eq!(hook.calls, 1);
        // Raw mode was handed back for the palette and taken again.
        assert_eq!(editor.source.raw_entries, 2);
        assert_eq!(editor.source.restores, 2);
    }

    #[test]
    fn test_palette_exit_ends_read() {
        let mut editor = editor(ScriptedKeys::typed(b"/ignored\r"));
        let mut hook = RecordingHook::new(PaletteOutcome::Exit);
        assert_eq!(editor.read_line("", &mut hook).unwrap(), ReadOutcome::Exit);
        assert!(!editor.source.raw);
        assert_eq!(editor.source.restores, 1);
    }

    #[test]
    fn test_palette_failure_continues_editing() {
        let mut editor = editor(ScriptedKeys::typed(b"/ok\r"));
        let mut hook = RecordingHook::new(PaletteOutcome::Exit);
        hook.fail = true;
        let outcome = editor.read_line("", &mut hook).unwrap();
        assert_eq!(outcome, ReadOutcome::Submitted("ok".into()));
        assert!(!editor.source.raw);
    }

    #[test]
    fn test_prefill_is_editable() {
        let mut editor = editor(ScriptedKeys::typed(b"\x7f!\r"));
        let mut hook = RecordingHook::new(PaletteOutcome::Continue);
        let outcome = editor.read_line("draft", &mut hook).unwrap();
        assert_eq!(outcome, ReadOutcome::Submitted("draf!".into()));
    }

    #[test]
    fn test_loaded_document_prefill_keeps_cursor_in_step() {
        let mut editor = editor(ScriptedKeys::typed(b"!\r"));
        let mut hook = RecordingHook::new(PaletteOutcome::Continue);
        let outcome = editor.read_line("a\tb\r\n", &mut hook).unwrap();
        assert_eq!(outcome, ReadOutcome::Submitted("a    b\n!".into()));
        let output = String::from_utf8_lossy(editor.output());
        assert!(!output.contains('\t'));
    }

    #[test]
    fn test_end_of_input_interrupts() {
        let mut editor = editor(ScriptedKeys::typed(b"partial"));
        assert_eq!(read(&mut editor), ReadOutcome::Interrupted);
        assert!(!editor.source.raw);
    }

    #[test]
    fn test_fallback_when_not_a_terminal() {
        let mut editor = editor(ScriptedKeys::non_interactive("plain line\n"));
        assert_eq!(read(&mut editor), ReadOutcome::Submitted("plain line".into()));
        assert_eq!(editor.source.raw_entries, 0);
        assert_eq!(editor.history.len(), 1);
    }

    #[test]
    fn test_fallback_blank_and_eof() {
        let mut editor = editor(ScriptedKeys::non_interactive("\n"));
        assert_eq!(read(&mut editor), ReadOutcome::Skipped);
        assert_eq!(read(&mut editor), ReadOutcome::Interrupted);
    }
}
