use std::fs;
use std::io::{self, Write};
use std::path::Path;

use crate::error::{ConvertError, Result};

/// Rendered character art: newline-terminated lines of `width` glyphs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AsciiArt {
    text: String,
    width: u32,
    height: u32,
}

impl AsciiArt {
    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn into_string(self) -> String {
        self.text
    }

    /// Line width (the resized image width).
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Number of lines.
    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn lines(&self) -> std::str::Lines<'_> {
        self.text.lines()
    }

    /// Truncates `path` and writes the whole text in one call.
    pub fn write_to(&self, path: &Path) -> Result<()> {
        fs::write(path, &self.text).map_err(|source| ConvertError::Write {
            path: path.to_path_buf(),
            source,
        })?;
        log::info!("wrote {}x{} art to {}", self.width, self.height, path.display());
        Ok(())
    }

    /// Writes every line, in order, to a display stream.
    pub fn echo<W: Write>(&self, out: &mut W) -> io::Result<()> {
        for line in self.lines() {
            writeln!(out, "{}", line)?;
        }
        out.flush()
    }
}

impl std::fmt::Display for AsciiArt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.text)
    }
}

/// Splits a flat glyph sequence into `line_width`-wide lines.
///
/// A glyph count that is not a multiple of `line_width` leaves a shorter
/// final line. A `line_width` of zero is treated as one.
pub fn layout(chars: &[char], line_width: u32) -> AsciiArt {
    let step = line_width.max(1) as usize;
    let mut text = String::with_capacity(chars.len() + chars.len() / step + 1);
    let mut height = 0u32;
    for line in chars.chunks(step) {
        text.extend(line.iter());
        text.push('\n');
        height += 1;
    }
    AsciiArt {
        text,
        width: step as u32,
        height,
    }
}
