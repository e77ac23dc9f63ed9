pub const GLYPH_COLUMNS: usize = 5;
pub const GLYPH_ROWS: usize = 7;

/// A single 7-row × 5-column bitmap; bit 4 of each row mask is the leftmost column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Glyph {
    rows: [u8; GLYPH_ROWS],
}

impl Glyph {
    pub const BLANK: Glyph = Glyph::new([0; GLYPH_ROWS]);

    pub const fn new(rows: [u8; GLYPH_ROWS]) -> Self {
        Self { rows }
    }

    /// Returns whether the cell at `row`/`col` is lit. Out of range cells are
    /// reported as unlit.
    pub fn is_set(&self, row: usize, col: usize) -> bool {
        if row >= GLYPH_ROWS || col >= GLYPH_COLUMNS {
            return false;
        }
        self.rows[row] & (1 << (GLYPH_COLUMNS - 1 - col)) != 0
    }

    /// Iterates over the `(row, col)` coordinates of every lit cell in
    /// row-major order.
    pub fn cells(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        (0..GLYPH_ROWS).flat_map(move |row| {
            (0..GLYPH_COLUMNS)
                .filter(move |&col| self.is_set(row, col))
                .map(move |col| (row, col))
        })
    }

    pub fn lit_count(&self) -> usize {
        self.rows.iter().map(|row| row.count_ones() as usize).sum()
    }

    pub fn is_blank(&self) -> bool {
        self.rows.iter().all(|row| *row == 0)
    }
}

/// Static character → glyph table.
#[derive(Debug, Clone, Copy, Default)]
pub struct GlyphTable;

impl GlyphTable {
    /// Looks up `ch` (case-sensitive; callers uppercase first). Unknown
    /// characters resolve to [`Glyph::BLANK`].
    pub fn lookup(ch: char) -> Glyph {
        GLYPHS
            .iter()
            .find(|(key, _)| *key == ch)
            .map(|(_, glyph)| *glyph)
            .unwrap_or(Glyph::BLANK)
    }

    pub fn contains(ch: char) -> bool {
        GLYPHS.iter().any(|(key, _)| *key == ch)
    }

    pub fn characters() -> impl Iterator<Item = char> {
        GLYPHS.iter().map(|(key, _)| *key)
    }
}

const GLYPHS: &[(char, Glyph)] = &[
    ('A', Glyph::new([0b01110, 0b10001, 0b10001, 0b11111, 0b10001, 0b10001, 0b10001])),
    ('B', Glyph::new([0b11110, 0b10001, 0b10001, 0b11110, 0b10001, 0b10001, 0b11110])),
    ('C', Glyph::new([0b01110, 0b10001, 0b10000, 0b10000, 0b10000, 0b10001, 0b01110])),
    ('D', Glyph::new([0b11110, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b11110])),
    ('E', Glyph::new([0b11111, 0b10000, 0b10000, 0b11110, 0b10000, 0b10000, 0b11111])),
    ('F', Glyph::new([0b11111, 0b10000, 0b10000, 0b11110, 0b10000, 0b10000, 0b10000])),
    ('G', Glyph::new([0b01110, 0b10001, 0b10000, 0b10111, 0b10001, 0b10001, 0b01110])),
    ('H', Glyph::new([0b10001, 0b10001, 0b10001, 0b11111, 0b10001, 0b10001, 0b10001])),
    ('I', Glyph::new([0b11111, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100, 0b11111])),
    ('J', Glyph::new([0b00111, 0b00010, 0b00010, 0b00010, 0b00010, 0b10010, 0b01100])),
    ('K', Glyph::new([0b10001, 0b10010, 0b10100, 0b11000, 0b10100, 0b10010, 0b10001])),
    ('L', Glyph::new([0b10000, 0b10000, 0b10000, 0b10000, 0b10000, 0b10000, 0b11111])),
    ('M', Glyph::new([0b10001, 0b11011, 0b10101, 0b10101, 0b10001, 0b10001, 0b10001])),
    ('N', Glyph::new([0b10001, 0b11001, 0b10101, 0b10011, 0b10001, 0b10001, 0b10001])),
    ('O', Glyph::new([0b01110, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b01110])),
    ('P', Glyph::new([0b11110, 0b10001, 0b10001, 0b11110, 0b10000, 0b10000, 0b10000])),
    ('Q', Glyph::new([0b01110, 0b10001, 0b10001, 0b10001, 0b10101, 0b10010, 0b01101])),
    ('R', Glyph::new([0b11110, 0b10001, 0b10001, 0b11110, 0b10100, 0b10010, 0b10001])),
    ('S', Glyph::new([0b01110, 0b10001, 0b10000, 0b01110, 0b00001, 0b10001, 0b01110])),
    ('T', Glyph::new([0b11111, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100])),
    ('U', Glyph::new([0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b01110])),
    ('V', Glyph::new([0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b01010, 0b00100])),
    ('W', Glyph::new([0b10001, 0b10001, 0b10001, 0b10101, 0b10101, 0b11011, 0b10001])),
    ('X', Glyph::new([0b10001, 0b10001, 0b01010, 0b00100, 0b01010, 0b10001, 0b10001])),
    ('Y', Glyph::new([0b10001, 0b10001, 0b01010, 0b00100, 0b00100, 0b00100, 0b00100])),
    ('Z', Glyph::new([0b11111, 0b00001, 0b00010, 0b00100, 0b01000, 0b10000, 0b11111])),
    ('0', Glyph::new([0b01110, 0b10011, 0b10101, 0b10101, 0b10101, 0b11001, 0b01110])),
    ('1', Glyph::new([0b00100, 0b01100, 0b00100, 0b00100, 0b00100, 0b00100, 0b01110])),
    ('2', Glyph::new([0b01110, 0b10001, 0b00001, 0b00110, 0b01000, 0b10000, 0b11111])),
    ('3', Glyph::new([0b01110, 0b10001, 0b00001, 0b00110, 0b00001, 0b10001, 0b01110])),
    ('4', Glyph::new([0b00010, 0b00110, 0b01010, 0b10010, 0b11111, 0b00010, 0b00010])),
    ('5', Glyph::new([0b11111, 0b10000, 0b11110, 0b00001, 0b00001, 0b10001, 0b01110])),
    ('6', Glyph::new([0b01110, 0b10000, 0b10000, 0b11110, 0b10001, 0b10001, 0b01110])),
    ('7', Glyph::new([0b11111, 0b00001, 0b00010, 0b00100, 0b01000, 0b01000, 0b01000])),
    ('8', Glyph::new([0b01110, 0b10001, 0b10001, 0b01110, 0b10001, 0b10001, 0b01110])),
    ('9', Glyph::new([0b01110, 0b10001, 0b10001, 0b01111, 0b00001, 0b00001, 0b01110])),
    (' ', Glyph::BLANK),
    ('-', Glyph::new([0b00000, 0b00000, 0b00000, 0b11111, 0b00000, 0b00000, 0b00000])),
    ('.', Glyph::new([0b00000, 0b00000, 0b00000, 0b00000, 0b00000, 0b01100, 0b01100])),
    ('/', Glyph::new([0b00001, 0b00010, 0b00010, 0b00100, 0b01000, 0b01000, 0b10000])),
    (':', Glyph::new([0b00000, 0b01100, 0b01100, 0b00000, 0b01100, 0b01100, 0b00000])),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn letter_a_has_eighteen_lit_cells() {
        let glyph = GlyphTable::lookup('A');
        assert_eq!(glyph.lit_count(), 18);
        assert!(!glyph.is_set(0, 0));
        assert!(glyph.is_set(0, 1));
        assert!(glyph.is_set(3, 4));
    }

    #[test]
    fn unknown_characters_are_blank() {
        assert!(GlyphTable::lookup('~').is_blank());
        assert!(GlyphTable::lookup('a').is_blank());
        assert!(GlyphTable::lookup('é').is_blank());
        assert_eq!(GlyphTable::lookup('!'), Glyph::BLANK);
    }

    #[test]
    fn table_covers_letters_digits_and_punctuation() {
        for ch in ('A'..='Z').chain('0'..='9').chain([' ', '-', '.', '/', ':']) {
            assert!(GlyphTable::contains(ch), "missing glyph for {ch:?}");
        }
        assert_eq!(GlyphTable::characters().count(), 41);
    }

    #[test]
    fn cells_iterate_row_major() {
        let cells: Vec<_> = GlyphTable::lookup('-').cells().collect();
        assert_eq!(cells, vec![(3, 0), (3, 1), (3, 2), (3, 3), (3, 4)]);
    }
}
