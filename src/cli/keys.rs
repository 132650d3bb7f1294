// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Jason Ish

//! Turning raw input bytes into editor events.
//!
//! Decoding happens in two steps. `KeyDecoder` groups bytes into keys,
//! resolving escape sequences and UTF-8. `classify` then maps a key to a
//! `KeyEvent` using the current buffer and latch, which is all the reducer
//! needs to know.

use std::io;
use std::time::Duration;

use super::buffer::{EditorState, Pending};
use super::terminal::KeySource;

pub(crate) const DEFAULT_ESCAPE_TIMEOUT: Duration = Duration::from_millis(10);

const CTRL_C: u8 = 0x03;
const BACKSPACE: u8 = 0x08;
const LINE_FEED: u8 = 0x0a;
const CARRIAGE_RETURN: u8 = 0x0d;
const ESC: u8 = 0x1b;
const DELETE: u8 = 0x7f;

/// A decoded keypress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Key {
    Char(char),
    /// Carriage return (Enter).
    Enter,
    /// Line feed (Ctrl+J), the "insert newline" key.
    LineFeed,
    Backspace,
    CtrlC,
    /// A lone Escape with nothing following it in time.
    Escape,
    Up,
    Down,
    /// Any other escape sequence, identified by its final byte.
    Sequence(u8),
    /// Control bytes and malformed input with no editor meaning.
    Other(u8),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum KeyEvent {
    Printable(char),
    Submit,
    /// Enter on a whitespace-only buffer.
    DiscardBlank,
    NewlineInsert,
    Backspace,
    HistoryUp,
    HistoryDown,
    PaletteTrigger,
    InterruptFirst,
    InterruptConfirm,
    EscapeArmFirst,
    EscapeConfirm,
    Ignored,
}

pub(crate) struct KeyDecoder {
    escape_timeout: Duration,
    /// A byte read while probing after Escape that belongs to the next key.
    pushback: Option<u8>,
}

impl KeyDecoder {
    pub(crate) fn new(escape_timeout: Duration) -> Self {
        Self {
            escape_timeout,
            pushback: None,
        }
    }

    /// Read the next key. `Ok(None)` means the input reached end of file.
    pub(crate) fn next_key<S: KeySource + ?Sized>(
        &mut self,
        source: &mut S,
    ) -> io::Result<Option<Key>> {
        let byte = match self.pushback.take() {
            Some(byte) => byte,
            None => match source.read_byte()? {
                Some(byte) => byte,
                None => return Ok(None),
            },
        };

        let key = match byte {
            CTRL_C => Key::CtrlC,
            CARRIAGE_RETURN => Key::Enter,
            LINE_FEED => Key::LineFeed,
            BACKSPACE | DELETE => Key::Backspace,
            ESC => self.decode_escape(source)?,
            0x20..=0x7e => Key::Char(byte as char),
            0x80..=0xff => decode_utf8(byte, source)?,
            other => Key::Other(other),
        };
        Ok(Some(key))
    }

    fn decode_escape<S: KeySource + ?Sized>(&mut self, source: &mut S) -> io::Result<Key> {
        if !source.poll_byte(self.escape_timeout)? {
            return Ok(Key::Escape);
        }
        let Some(intro) = source.read_byte()? else {
            return Ok(Key::Escape);
        };

        match intro {
            b'[' => self.decode_csi(source),
            b'O' => {
                // SS3: arrows in application cursor mode. A bare `ESC O`
                // is Escape followed by the letter.
                if source.poll_byte(self.escape_timeout)?
                    && let Some(final_byte) = source.read_byte()?
                {
                    return Ok(final_key(final_byte));
                }
                self.pushback = Some(intro);
                Ok(Key::Escape)
            }
            other => {
                self.pushback = Some(other);
                Ok(Key::Escape)
            }
        }
    }

    /// Consume parameter and intermediate bytes up to the final byte.
    fn decode_csi<S: KeySource + ?Sized>(&mut self, source: &mut S) -> io::Result<Key> {
        loop {
            if !source.poll_byte(self.escape_timeout)? {
                return Ok(Key::Sequence(b'['));
            }
            let Some(byte) = source.read_byte()? else {
                return Ok(Key::Sequence(b'['));
            };
            match byte {
                0x20..=0x3f => continue,
                0x40..=0x7e => return Ok(final_key(byte)),
                other => {
                    // Not part of a well-formed sequence; hand it back.
                    self.pushback = Some(other);
                    return Ok(Key::Sequence(b'['));
                }
            }
        }
    }
}

impl Default for KeyDecoder {
    fn default() -> Self {
        Self::new(DEFAULT_ESCAPE_TIMEOUT)
    }
}

fn final_key(byte: u8) -> Key {
    match byte {
        b'A' => Key::Up,
        b'B' => Key::Down,
        other => Key::Sequence(other),
    }
}

fn decode_utf8<S: KeySource + ?Sized>(lead: u8, source: &mut S) -> io::Result<Key> {
    let len = match lead {
        0xc2..=0xdf => 2,
        0xe0..=0xef => 3,
        0xf0..=0xf4 => 4,
        _ => return Ok(Key::Other(lead)),
    };
    let mut bytes = [lead, 0, 0, 0];
    for slot in bytes.iter_mut().take(len).skip(1) {
        match source.read_byte()? {
            Some(byte) if byte & 0xc0 == 0x80 => *slot = byte,
            _ => return Ok(Key::Other(lead)),
        }
    }
    Ok(std::str::from_utf8(&bytes[..len])
        .ok()
        .and_then(|s| s.chars().next())
        .map_or(Key::Other(lead), Key::Char))
}

/// Decide what a key means given the current editor state.
pub(crate) fn classify(key: Key, state: &EditorState) -> KeyEvent {
    let buffer = &state.buffer;
    match key {
        Key::CtrlC => match state.pending {
            Pending::QuitArmed => KeyEvent::InterruptConfirm,
            _ => KeyEvent::InterruptFirst,
        },
        Key::Char('/') if buffer.is_empty() => KeyEvent::PaletteTrigger,
        Key::Char(c) if !c.is_control() => KeyEvent::Printable(c),
        Key::Enter if buffer.is_blank() => KeyEvent::DiscardBlank,
        Key::Enter => KeyEvent::Submit,
        Key::LineFeed if !buffer.last_line().is_empty() => KeyEvent::NewlineInsert,
        Key::Backspace if !buffer.is_empty() => KeyEvent::Backspace,
        Key::Up => KeyEvent::HistoryUp,
        Key::Down => KeyEvent::HistoryDown,
        Key::Escape if buffer.is_blank() => KeyEvent::Ignored,
        Key::Escape => match state.pending {
            Pending::ClearArmed => KeyEvent::EscapeConfirm,
            _ => KeyEvent::EscapeArmFirst,
        },
        _ => KeyEvent::Ignored,
    }
}
