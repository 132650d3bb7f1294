// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Jason Ish

//! Raw keystroke source for the line editor.
//!
//! The editor consumes the keyboard one byte at a time with echo and line
//! buffering disabled. Bytes are read straight from the stdin descriptor
//! rather than through `std::io::Stdin`, whose internal buffer would hide
//! pending bytes from `poll(2)` and break Escape disambiguation.

use std::collections::VecDeque;
use std::io::{self, BufRead, IsTerminal};
use std::os::fd::AsRawFd;
use std::time::Duration;

use crossterm::terminal::{disable_raw_mode, enable_raw_mode};

/// Byte-level keyboard contract used by the line editor.
pub(crate) trait KeySource {
    /// Switch the terminal into raw mode. Fails when input is not an
    /// interactive terminal.
    fn enter_raw_mode(&mut self) -> io::Result<()>;

    /// Restore the mode that was active before `enter_raw_mode`.
    fn restore_mode(&mut self) -> io::Result<()>;

    /// Block until one byte is available. `None` means end of input.
    fn read_byte(&mut self) -> io::Result<Option<u8>>;

    /// Wait at most `timeout` for another byte to become readable.
    fn poll_byte(&mut self, timeout: Duration) -> io::Result<bool>;

    /// Cooked-mode fallback: read one whole line, without its terminator.
    fn read_cooked_line(&mut self) -> io::Result<Option<String>>;
}

/// Keystrokes from the process's controlling terminal on stdin.
pub(crate) struct TtyKeys {
    pending: VecDeque<u8>,
}

impl TtyKeys {
    pub(crate) fn new() -> Self {
        Self {
            pending: VecDeque::new(),
        }
    }

    fn fill(&mut self) -> io::Result<usize> {
        let fd = io::stdin().as_raw_fd();
        let mut chunk = [0u8; 64];
        loop {
            // SAFETY: `chunk` is a valid writable buffer of the given length
            // and `fd` stays open for the life of the process.
            let n = unsafe { libc::read(fd, chunk.as_mut_ptr().cast(), chunk.len()) };
            if n < 0 {
                let err = io::Error::last_os_error();
                if err.kind() == io::ErrorKind::Interrupted {
                    continue;
                }
                return Err(err);
            }
            let n = n as usize;
            self.pending.extend(&chunk[..n]);
            return Ok(n);
        }
    }
}

impl KeySource for TtyKeys {
    fn enter_raw_mode(&mut self) -> io::Result<()> {
        if !io::stdin().is_terminal() {
            return Err(io::Error::new(
                io::ErrorKind::Unsupported,
                "stdin is not an interactive terminal",
            ));
        }
        enable_raw_mode()
    }

    fn restore_mode(&mut self) -> io::Result<()> {
        disable_raw_mode()
    }

    fn read_byte(&mut self) -> io::Result<Option<u8>> {
        if self.pending.is_empty() && self.fill()? == 0 {
            return Ok(None);
        }
        Ok(self.pending.pop_front())
    }

    fn poll_byte(&mut self, timeout: Duration) -> io::Result<bool> {
        if !self.pending.is_empty() {
            return Ok(true);
        }
        let mut pfd = libc::pollfd {
            fd: io::stdin().as_raw_fd(),
            events: libc::POLLIN,
            revents: 0,
        };
        let millis = libc::c_int::try_from(timeout.as_millis()).unwrap_or(libc::c_int::MAX);
        loop {
            // SAFETY: `pfd` is a single valid pollfd for the duration of the call.
            let ready = unsafe { libc::poll(&mut pfd, 1, millis) };
            if ready < 0 {
                let err = io::Error::last_os_error();
                if err.kind() == io::ErrorKind::Interrupted {
                    continue;
                }
                return Err(err);
            }
            return Ok(ready > 0 && pfd.revents & libc::POLLIN != 0);
        }
    }

    fn read_cooked_line(&mut self) -> io::Result<Option<String>> {
        let mut line = String::new();
        if io::stdin().lock().read_line(&mut line)? == 0 {
            return Ok(None);
        }
        let trimmed = line.trim_end_matches(['\r', '\n']).len();
        line.truncate(trimmed);
        Ok(Some(line))
    }
}

/// Scoped ownership of raw mode.
///
/// Created by entering raw mode; restores the previous mode exactly once when
/// dropped, whichever path leaves the editor. `suspend`/`resume` hand the
/// terminal back in cooked mode temporarily (e.g. to the command palette).
pub(crate) struct RawModeGuard<'a, S: KeySource + ?Sized> {
    source: &'a mut S,
    raw: bool,
}

impl<'a, S: KeySource + ?Sized> RawModeGuard<'a, S> {
    pub(crate) fn enter(source: &'a mut S) -> io::Result<Self> {
        source.enter_raw_mode()?;
        tracing::debug!("raw mode entered");
        Ok(Self { source, raw: true })
    }

    pub(crate) fn suspend(&mut self) -> io::Result<()> {
        if self.raw {
            self.source.restore_mode()?;
            self.raw = false;
        }
        Ok(())
    }

    pub(crate) fn resume(&mut self) -> io::Result<()> {
        if !self.raw {
            self.source.enter_raw_mode()?;
            self.raw = true;
        }
        Ok(())
    }

    pub(crate) fn source(&mut self) -> &mut S {
        self.source
    }
}

impl<S: KeySource + ?Sized> Drop for RawModeGuard<'_, S> {
    fn drop(&mut self) {
        if self.raw {
            if let Err(e) = self.source.restore_mode() {
                tracing::warn!("failed to restore terminal mode: {e}");
            }
            self.raw = false;
            tracing::debug!("raw mode restored");
        }
    }
}

/// In-memory key source for tests.
///
/// Input is a list of chunks; bytes within one chunk "arrive together", so
/// `poll_byte` only reports readiness while the current chunk has bytes left.
#[cfg(test)]
pub(crate) struct ScriptedKeys {
    chunks: VecDeque<VecDeque<u8>>,
    pub(crate) interactive: bool,
    pub(crate) raw: bool,
    pub(crate) raw_entries: usize,
    pub(crate) restores: usize,
}

#[cfg(test)]
impl ScriptedKeys {
    pub(crate) fn new(chunks: &[&[u8]]) -> Self {
        Self {
            chunks: chunks
                .iter()
                .map(|chunk| chunk.iter().copied().collect())
                .collect(),
            interactive: true,
            raw: false,
            raw_entries: 0,
            restores: 0,
        }
    }

    /// Every byte as its own keypress.
    pub(crate) fn typed(bytes: &[u8]) -> Self {
        let chunks: Vec<&[u8]> = bytes.chunks(1).collect();
        Self::new(&chunks)
    }

    pub(crate) fn non_interactive(input: &str) -> Self {
        let mut keys = Self::new(&[input.as_bytes()]);
        keys.interactive = false;
        keys
    }
}

#[cfg(test)]
impl KeySource for ScriptedKeys {
    fn enter_raw_mode(&mut self) -> io::Result<()> {
        if !self.interactive {
            return Err(io::Error::new(io::ErrorKind::Unsupported, "not a tty"));
        }
        self.raw = true;
        self.raw_entries += 1;
        Ok(())
    }

    fn restore_mode(&mut self) -> io::Result<()> {
        self.raw = false;
        self.restores += 1;
        Ok(())
    }

    fn read_byte(&mut self) -> io::Result<Option<u8>> {
        // An exhausted chunk stays at the front until the next read so that
        // `poll_byte` reports nothing pending in between.
        while let Some(chunk) = self.chunks.front_mut() {
            if let Some(byte) = chunk.pop_front() {
                return Ok(Some(byte));
            }
            self.chunks.pop_front();
        }
        Ok(None)
    }

    fn poll_byte(&mut self, _timeout: Duration) -> io::Result<bool> {
        Ok(self.chunks.front().is_some_and(|chunk| !chunk.is_empty()))
    }

    fn read_cooked_line(&mut self) -> io::Result<Option<String>> {
        let mut bytes = Vec::new();
        let mut saw_any = false;
        while let Some(byte) = self.read_byte()? {
            saw_any = true;
            if byte == b'\n' {
                break;
            }
            bytes.push(byte);
        }
        if !saw_any {
            return Ok(None);
        }
        Ok(Some(String::from_utf8_lossy(&bytes).into_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard_restores_on_drop() {
        let mut keys = ScriptedKeys::new(&[]);
        {
            let _guard = RawModeGuard::enter(&mut keys).unwrap();
        }
        assert!(!keys.raw);
        assert_eq!(keys.raw_entries, 1);
        assert_eq!(keys.restores, 1);
    }

    #[test]
    fn test_guard_suspend_resume_restores_once_at_end() {
        let mut keys = ScriptedKeys::new(&[]);
        {
            let mut guard = RawModeGuard::enter(&mut keys).unwrap();
            guard.suspend().unwrap();
            guard.suspend().unwrap();
            guard.resume().unwrap();
        }
        assert_eq!(keys.raw_entries, 2);
        assert_eq!(keys.restores, 2);
        assert!(!keys.raw);
    }

    #[test]
    fn test_guard_not_created_without_tty() {
        let mut keys = ScriptedKeys::non_interactive("hello\n");
        assert!(RawModeGuard::enter(&mut keys).is_err());
        assert_eq!(keys.restores, 0);
    }

    #[test]
    fn test_scripted_poll_respects_chunks() {
        let mut keys = ScriptedKeys::new(&[b"\x1b", b"[A"]);
        assert_eq!(keys.read_byte().unwrap(), Some(0x1b));
        assert!(!keys.poll_byte(Duration::ZERO).unwrap());
        assert_eq!(keys.read_byte().unwrap(), Some(b'['));
        assert!(keys.poll_byte(Duration::ZERO).unwrap());
        assert_eq!(keys.read_byte().unwrap(), Some(b'A'));
        assert_eq!(keys.read_byte().unwrap(), None);
    }
}
