//! Terminal emitter: writes diagnostics in `file:line:col: severity[code]: msg`
//! form, optionally colored.

use std::io::{self, Write};

use crate::{Diagnostic, Severity};

mod colors {
    pub const ERROR: &str = "\x1b[1;31m";
    pub const WARNING: &str = "\x1b[1;33m";
    pub const NOTE: &str = "\x1b[1;36m";
    pub const BOLD: &str = "\x1b[1m";
    pub const RESET: &str = "\x1b[0m";
}

/// Color output mode.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ColorMode {
    #[default]
    Auto,
    Always,
    Never,
}

impl ColorMode {
    /// `is_tty` only matters for `Auto`.
    pub fn should_use_colors(self, is_tty: bool) -> bool {
        match self {
            ColorMode::Auto => is_tty,
            ColorMode::Always => true,
            ColorMode::Never => false,
        }
    }
}

pub struct TerminalEmitter<W: Write> {
    writer: W,
    colors: bool,
}

impl TerminalEmitter<io::Stderr> {
    pub fn stderr(mode: ColorMode, is_tty: bool) -> Self {
        TerminalEmitter::with_color_mode(io::stderr(), mode, is_tty)
    }
}

impl<W: Write> TerminalEmitter<W> {
    pub fn with_color_mode(writer: W, mode: ColorMode, is_tty: bool) -> Self {
        TerminalEmitter {
            writer,
            colors: mode.should_use_colors(is_tty),
        }
    }

    fn paint(&mut self, color: &str, text: &str) -> io::Result<()> {
        if self.colors {
            write!(self.writer, "{color}{text}{}", colors::RESET)
        } else {
            write!(self.writer, "{text}")
        }
    }

    pub fn emit(&mut self, diag: &Diagnostic) -> io::Result<()> {
        if let Some(location) = &diag.location {
            self.paint(colors::BOLD, &format!("{location}: "))?;
        }
        let color = match diag.severity {
            Severity::Error => colors::ERROR,
            Severity::Warning => colors::WARNING,
            Severity::Note => colors::NOTE,
        };
        self.paint(color, &format!("{}[{}]", diag.severity, diag.code))?;
        writeln!(self.writer, ": {}", diag.message)?;
        for note in &diag.notes {
            self.paint(colors::NOTE, "  note")?;
            writeln!(self.writer, ": {note}")?;
        }
        Ok(())
    }

    pub fn emit_all<'a>(&mut self, diags: impl IntoIterator<Item = &'a Diagnostic>) -> io::Result<()> {
        for diag in diags {
            self.emit(diag)?;
        }
        self.writer.flush()
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}
