//! Glyph advance tables for the built-in faces.
//!
//! Widths are in 1/1000 em for the printable ASCII range (U+0020..=U+007E),
//! taken from the standard Type 1 AFM files. Characters outside the table use
//! the face's `default_width`. Times bold and italic reuse the roman widths.

#[rustfmt::skip]
const HELVETICA: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556,
    278, 278, 584, 584, 584, 556, 1015,
    667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833,
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611,
    278, 278, 278, 469, 556, 333,
    556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833,
    556, 556, 556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500,
    334, 260, 334, 584,
];

#[rustfmt::skip]
const HELVETICA_BOLD: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556,
    333, 333, 584, 584, 584, 611, 975,
    722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833,
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611,
    333, 278, 333, 584, 556, 333,
    556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889,
    611, 611, 611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500,
    389, 280, 389, 584,
];

#[rustfmt::skip]
const TIMES_ROMAN: [u16; 95] = [
    250, 333, 408, 500, 500, 833, 778, 180, 333, 333, 500, 564, 250, 333, 250, 278,
    500, 500, 500, 500, 500, 500, 500, 500, 500, 500,
    278, 278, 564, 564, 564, 444, 921,
    722, 667, 667, 722, 611, 556, 722, 722, 333, 389, 722, 611, 889,
    722, 722, 556, 722, 667, 556, 611, 722, 722, 944, 722, 722, 611,
    333, 278, 333, 469, 500, 333,
    444, 500, 444, 500, 444, 333, 500, 500, 278, 278, 500, 278, 778,
    500, 500, 500, 500, 333, 389, 278, 500, 500, 722, 500, 500, 444,
    480, 200, 480, 541,
];

const COURIER: [u16; 95] = [600; 95];

/// Metrics for one built-in face.
#[derive(Debug)]
pub struct StandardFontMetrics {
    widths: &'static [u16; 95],
    default_width: u16,
    ellipsis_width: u16,
    pub ascender: u16,
    pub descender: u16,
    pub line_gap: u16,
}

pub(crate) static HELVETICA_METRICS: StandardFontMetrics = StandardFontMetrics {
    widths: &HELVETICA,
    default_width: 556,
    ellipsis_width: 1000,
    ascender: 718,
    descender: 207,
    line_gap: 275,
};

pub(crate) static HELVETICA_BOLD_METRICS: StandardFontMetrics = StandardFontMetrics {
    widths: &HELVETICA_BOLD,
    default_width: 556,
    ellipsis_width: 1000,
    ascender: 718,
    descender: 207,
    line_gap: 275,
};

pub(crate) static TIMES_METRICS: StandardFontMetrics = StandardFontMetrics {
    widths: &TIMES_ROMAN,
    default_width: 500,
    ellipsis_width: 1000,
    ascender: 683,
    descender: 217,
    line_gap: 300,
};

pub(crate) static COURIER_METRICS: StandardFontMetrics = StandardFontMetrics {
    widths: &COURIER,
    default_width: 600,
    ellipsis_width: 600,
    ascender: 629,
    descender: 157,
    line_gap: 414,
};

impl StandardFontMetrics {
    /// Advance width of one character in points.
    pub fn char_width(&self, ch: char, font_size: f64) -> f64 {
        let units = match ch {
            ' '..='~' => self.widths[ch as usize - 0x20],
            '\u{2026}' => self.ellipsis_width,
            '\u{00A0}' => self.widths[0],
            // Zero-width: soft hyphen, zero-width space and joiners.
            '\u{00AD}' | '\u{200B}'..='\u{200D}' => 0,
            _ => self.default_width,
        };
        units as f64 / 1000.0 * font_size
    }

    /// Width of a string in points.
    pub fn measure_string(&self, text: &str, font_size: f64) -> f64 {
        text.chars().map(|ch| self.char_width(ch, font_size)).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn helvetica_space() {
        assert!((HELVETICA_METRICS.char_width(' ', 12.0) - 3.336).abs() < 1e-9);
    }

    #[test]
    fn courier_is_monospace() {
        assert_eq!(COURIER_METRICS.measure_string("iiii", 10.0), 24.0);
        assert_eq!(COURIER_METRICS.measure_string("MMMM", 10.0), 24.0);
        assert_eq!(COURIER_METRICS.char_width('\u{2026}', 10.0), 6.0);
    }

    #[test]
    fn bold_capitals_are_wider() {
        assert!(HELVETICA_BOLD_METRICS.char_width('J', 10.0) > HELVETICA_METRICS.char_width('J', 10.0));
    }
}
