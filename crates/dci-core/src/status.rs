//! Self-erasing status line.
//!
//! All output goes to stderr (or any injected writer) and is flushed on every
//! write. Inside an erasing scope, lines are drawn without a trailing newline and
//! wiped by the next write, so a run of phases shows up as one updating line.
//! Anything written outside an erasing scope, or with `erase: false`, becomes
//! permanent scrollback.

use std::io::{self, Write};
use std::ops::{Deref, DerefMut};

const INDENT: &str = "    ";

/// Per-write options.
#[derive(Debug, Clone, Copy)]
pub struct PrintOptions<'a> {
    /// Participate in the enclosing erasing scope, if there is one.
    pub erase: bool,
    /// Joins the parts of a single write.
    pub separator: &'a str,
    /// Line terminator used when the write is permanent.
    pub end: &'a str,
}

impl Default for PrintOptions<'_> {
    fn default() -> Self {
        Self {
            erase: true,
            separator: " ",
            end: "\n",
        }
    }
}

/// Tracks what is currently drawn on the terminal.
///
/// `pending_len` is `Some` exactly when an erasable line is on screen.
#[derive(Debug)]
pub struct StatusLine<W: Write = io::Stderr> {
    out: W,
    pending_len: Option<usize>,
    erasing: bool,
    indent: usize,
    write_failed: bool,
}

impl StatusLine<io::Stderr> {
    pub fn stderr() -> Self {
        Self::new(io::stderr())
    }
}

impl<W: Write> StatusLine<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            pending_len: None,
            erasing: false,
            indent: 0,
            write_failed: false,
        }
    }

    /// Writes an erasable line.
    pub fn print(&mut self, text: impl AsRef<str>) {
        self.write_parts(&[text.as_ref()], PrintOptions::default());
    }

    /// Writes a line that stays on screen even inside an erasing scope.
    pub fn print_permanent(&mut self, text: impl AsRef<str>) {
        self.write_parts(
            &[text.as_ref()],
            PrintOptions {
                erase: false,
                ..PrintOptions::default()
            },
        );
    }

    /// Writes text verbatim as permanent output, with no terminator added.
    ///
    /// Used for captured child output, which carries its own newlines.
    pub fn print_verbatim(&mut self, text: impl AsRef<str>) {
        self.write_parts(
            &[text.as_ref()],
            PrintOptions {
                erase: false,
                separator: "",
                end: "",
            },
        );
    }

    pub fn write_parts(&mut self, parts: &[&str], opts: PrintOptions<'_>) {
        let mut line = INDENT.repeat(self.indent);
        line.push_str(&parts.join(opts.separator));
        let len = line.chars().count();

        if self.pending_len.is_some() {
            self.erase_pending();
        }

        let end = if opts.erase && self.erasing {
            self.pending_len = Some(len);
            ""
        } else {
            self.pending_len = None;
            opts.end
        };

        // A broken stderr must not abort the run; the child exit code still decides.
        let written = write!(self.out, "{line}{end}").and_then(|()| self.out.flush());
        self.note_write(written);
    }

    /// Enters an erasing scope. The line drawn last inside the scope is wiped
    /// when the guard drops, whichever way the scope is left.
    pub fn erasing(&mut self) -> ErasingScope<'_, W> {
        self.erasing = true;
        ErasingScope { line: self }
    }

    /// Indents every write by one more level until the guard drops.
    pub fn indent(&mut self) -> IndentScope<'_, W> {
        self.indent += 1;
        IndentScope { line: self }
    }

    pub fn indent_level(&self) -> usize {
        self.indent
    }

    pub fn pending_len(&self) -> Option<usize> {
        self.pending_len
    }

    pub fn is_erasing(&self) -> bool {
        self.erasing
    }

    pub fn get_ref(&self) -> &W {
        &self.out
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn erase_pending(&mut self) {
        if let Some(len) = self.pending_len {
            let written = write!(self.out, "\r{}\r", " ".repeat(len));
            self.note_write(written);
        }
    }

    fn flush(&mut self) {
        let flushed = self.out.flush();
        self.note_write(flushed);
    }

    /// Logs the first failed write; later failures are dropped silently.
    fn note_write(&mut self, result: io::Result<()>) {
        if let Err(e) = result
            && !self.write_failed
        {
            self.write_failed = true;
            tracing::debug!(error = %e, "status write failed");
        }
    }
}

/// Guard returned by [`StatusLine::erasing`].
pub struct ErasingScope<'a, W: Write> {
    line: &'a mut StatusLine<W>,
}

impl<W: Write> Deref for ErasingScope<'_, W> {
    type Target = StatusLine<W>;

    fn deref(&self) -> &Self::Target {
        self.line
    }
}

impl<W: Write> DerefMut for ErasingScope<'_, W> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.line
    }
}

impl<W: Write> Drop for ErasingScope<'_, W> {
    fn drop(&mut self) {
        self.line.erase_pending();
        self.line.erasing = false;
        self.line.pending_len = None;
        self.line.flush();
    }
}

/// Guard returned by [`StatusLine::indent`].
pub struct IndentScope<'a, W: Write> {
    line: &'a mut StatusLine<W>,
}

impl<W: Write> Deref for IndentScope<'_, W> {
    type Target = StatusLine<W>;

    fn deref(&self) -> &Self::Target {
        self.line
    }
}

impl<W: Write> DerefMut for IndentScope<'_, W> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.line
    }
}

impl<W: Write> Drop for IndentScope<'_, W> {
    fn drop(&mut self) {
        self.line.indent = self.line.indent.saturating_sub(1);
    }
}
