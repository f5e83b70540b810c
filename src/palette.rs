/// Width of one brightness bucket.
pub const BUCKET_WIDTH: u8 = 25;

/// Ordered set of glyphs indexed by `brightness / BUCKET_WIDTH`.
///
/// Brightness 0 maps to the first glyph, 255 to the last. With the classic
/// palette that means `@` for black and `.` for white.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    glyphs: &'static [char],
}

impl Palette {
    /// The 11-glyph palette used for every conversion.
    pub const CLASSIC: Palette = Palette {
        glyphs: &['@', '#', '$', '%', '?', '*', '+', ';', ':', ',', '.'],
    };

    pub fn glyphs(&self) -> &'static [char] {
        self.glyphs
    }

    pub fn len(&self) -> usize {
        self.glyphs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.glyphs.is_empty()
    }

    /// Bucket index for a brightness value, capped at the last glyph.
    pub fn index_for(&self, luma: u8) -> usize {
        let idx = (luma / BUCKET_WIDTH) as usize;
        idx.min(self.glyphs.len().saturating_sub(1))
    }

    pub fn glyph_for(&self, luma: u8) -> char {
        self.glyphs[self.index_for(luma)]
    }

    pub fn contains(&self, ch: char) -> bool {
        self.glyphs.contains(&ch)
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self::CLASSIC
    }
}
