//! # Text Layout
//!
//! Line breaking, truncation, line metrics and per-line positioning.
//!
//! Everything here is pure: text arrives as [`StyledChar`]s that already
//! carry their advance width and the index of the run (span) they came
//! from, so the algorithms never talk to a font provider and can be tested
//! with hand-built widths.

use crate::geometry::EPSILON;
use crate::style::{LineBreakMode, TextAlign};
use unicode_linebreak::linebreaks;

pub const ELLIPSIS: char = '\u{2026}';

/// A character with its measured advance and source run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StyledChar {
    pub ch: char,
    pub run: usize,
    pub width: f64,
}

impl StyledChar {
    pub fn new(ch: char, run: usize, width: f64) -> Self {
        Self { ch, run, width }
    }
}

/// A line of text after line-breaking. Trailing whitespace is already trimmed.
#[derive(Debug, Clone, PartialEq)]
pub struct BrokenLine {
    pub chars: Vec<StyledChar>,
    /// Total advance of `chars`.
    pub width: f64,
    /// Last line of a newline-separated segment. Justified text leaves
    /// these lines ragged.
    pub ends_segment: bool,
}

impl BrokenLine {
    fn new(chars: &[StyledChar], ends_segment: bool) -> Self {
        let trimmed_len = chars
            .iter()
            .rposition(|c| !c.ch.is_whitespace())
            .map_or(0, |last| last + 1);
        let chars = chars[..trimmed_len].to_vec();
        let width = chars.iter().map(|c| c.width).sum();
        Self {
            chars,
            width,
            ends_segment,
        }
    }

    pub fn text(&self) -> String {
        self.chars.iter().map(|c| c.ch).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    /// Runs that contribute at least one character, in order, deduplicated.
    pub fn runs(&self) -> Vec<usize> {
        let mut runs: Vec<usize> = Vec::new();
        for c in &self.chars {
            if !runs.contains(&c.run) {
                runs.push(c.run);
            }
        }
        runs
    }

    fn space_count(&self) -> usize {
        self.chars.iter().filter(|c| c.ch == ' ').count()
    }
}

/// Compute UAX#14 break opportunities indexed by char position.
///
/// Entry `i` is true when a line may end before `chars[i]`. Index 0 is
/// always false; the implicit break at end of text is not reported.
pub fn compute_break_opportunities(text: &str) -> Vec<bool> {
    let char_count = text.chars().count();
    let mut result = vec![false; char_count];

    // linebreaks() yields byte offsets of the start of the next segment.
    let mut byte_to_char = vec![0usize; text.len() + 1];
    for (char_idx, (byte_idx, _)) in text.char_indices().enumerate() {
        byte_to_char[byte_idx] = char_idx;
    }
    byte_to_char[text.len()] = char_count;

    for (byte_offset, _) in linebreaks(text) {
        let char_idx = byte_to_char[byte_offset];
        if char_idx > 0 && char_idx < char_count {
            result[char_idx] = true;
        }
    }

    result
}

/// Break styled text into lines.
///
/// The text is split on `'\n'` first; each segment then follows `mode`.
/// Truncation modes produce a single line with newlines read as spaces.
/// `ellipsis_width` reports the advance of `…` in a given run.
pub fn break_into_lines(
    chars: &[StyledChar],
    max_width: f64,
    mode: LineBreakMode,
    ellipsis_width: &dyn Fn(usize) -> f64,
) -> Vec<BrokenLine> {
    if mode.is_truncation() {
        let single_line: Vec<StyledChar> = chars
            .iter()
            .map(|c| {
                if c.ch == '\n' {
                    StyledChar { ch: ' ', ..*c }
                } else {
                    *c
                }
            })
            .collect();
        let truncated = truncate(&single_line, max_width, mode, ellipsis_width);
        return vec![BrokenLine::new(&truncated, true)];
    }

    let mut lines = Vec::new();
    for segment in chars.split(|c| c.ch == '\n') {
        match mode {
            LineBreakMode::WordWrap => wrap_segment(segment, max_width, &mut lines),
            _ => lines.push(BrokenLine::new(segment, true)),
        }
    }
    lines
}

/// Reopen segment ends whose newline was a soft wrap. `soft[k]` is true when
/// the `k`-th newline of the source text stands for a wrap rather than a
/// hard break, so justified text keeps stretching across it.
pub fn restore_soft_breaks(lines: &mut [BrokenLine], soft: &[bool]) {
    for (newline, line) in lines.iter_mut().filter(|l| l.ends_segment).enumerate() {
        if soft.get(newline).copied().unwrap_or(false) {
            line.ends_segment = false;
        }
    }
}

/// Greedy fill of one newline-free segment.
fn wrap_segment(chars: &[StyledChar], max_width: f64, lines: &mut Vec<BrokenLine>) {
    if chars.is_empty() {
        lines.push(BrokenLine::new(chars, true));
        return;
    }

    let text: String = chars.iter().map(|c| c.ch).collect();
    let breaks = compute_break_opportunities(&text);

    let mut line_start = 0;
    let mut line_width = 0.0;
    let mut last_break: Option<usize> = None;
    let mut i = 0;

    while i < chars.len() {
        if i > line_start && breaks[i] {
            last_break = Some(i);
        }

        let ch = chars[i];
        // Whitespace may hang past the edge; it is trimmed from the line.
        let overflows = line_width + ch.width > max_width + EPSILON && !ch.ch.is_whitespace();

        if overflows && i > line_start {
            let end = match last_break {
                Some(b) if b > line_start => b,
                // No boundary on this line: hard-break mid-word.
                _ => i,
            };
            lines.push(BrokenLine::new(&chars[line_start..end], false));
            line_start = end;
            line_width = chars[line_start..i].iter().map(|c| c.width).sum();
            last_break = None;
            if end < i {
                // Re-check the same char against the new line.
                continue;
            }
        }

        line_width += ch.width;
        i += 1;
    }

    lines.push(BrokenLine::new(&chars[line_start..], true));
}

/// Shorten `chars` with an ellipsis so that it fits `max_width`.
///
/// Text that already fits is returned unchanged, which makes truncation
/// idempotent. When not even the ellipsis fits, the result is empty.
pub fn truncate(
    chars: &[StyledChar],
    max_width: f64,
    mode: LineBreakMode,
    ellipsis_width: &dyn Fn(usize) -> f64,
) -> Vec<StyledChar> {
    let total: f64 = chars.iter().map(|c| c.width).sum();
    if total <= max_width + EPSILON || chars.is_empty() {
        return chars.to_vec();
    }

    let ellipsis_run = match mode {
        LineBreakMode::HeadTruncation => chars[chars.len() - 1].run,
        _ => chars[0].run,
    };
    let ellipsis = StyledChar::new(ELLIPSIS, ellipsis_run, ellipsis_width(ellipsis_run));
    if ellipsis.width > max_width + EPSILON {
        return Vec::new();
    }
    let budget = max_width - ellipsis.width + EPSILON;

    let n = chars.len();
    // prefix[k] = width of the first k chars, suffix[k] = width of the last k.
    let mut prefix = Vec::with_capacity(n + 1);
    let mut suffix = Vec::with_capacity(n + 1);
    prefix.push(0.0);
    suffix.push(0.0);
    for k in 0..n {
        prefix.push(prefix[k] + chars[k].width);
        suffix.push(suffix[k] + chars[n - 1 - k].width);
    }

    // Largest kept count whose width fits the budget. Widths are
    // non-negative, so every kept-width function below is monotone.
    let fits = |kept: &dyn Fn(usize) -> f64| -> usize {
        let (mut lo, mut hi) = (0usize, n);
        while lo < hi {
            let mid = (lo + hi + 1) / 2;
            if kept(mid) <= budget {
                lo = mid;
            } else {
                hi = mid - 1;
            }
        }
        lo
    };

    let mut result = Vec::new();
    match mode {
        LineBreakMode::HeadTruncation => {
            let k = fits(&|k| suffix[k]);
            result.push(ellipsis);
            result.extend(trim_start(&chars[n - k..]));
        }
        LineBreakMode::MiddleTruncation => {
            let k = fits(&|k| prefix[k.div_ceil(2)] + suffix[k / 2]);
            result.extend(trim_end(&chars[..k.div_ceil(2)]));
            result.push(ellipsis);
            result.extend(trim_start(&chars[n - k / 2..]));
        }
        _ => {
            let k = fits(&|k| prefix[k]);
            result.extend(trim_end(&chars[..k]));
            result.push(ellipsis);
        }
    }
    result
}

fn trim_end(chars: &[StyledChar]) -> &[StyledChar] {
    let end = chars
        .iter()
        .rposition(|c| !c.ch.is_whitespace())
        .map_or(0, |i| i + 1);
    &chars[..end]
}

fn trim_start(chars: &[StyledChar]) -> &[StyledChar] {
    let start = chars
        .iter()
        .position(|c| !c.ch.is_whitespace())
        .unwrap_or(chars.len());
    &chars[start..]
}

/// Vertical extent of one line, already scaled by line spacing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineBox {
    pub ascent: f64,
    pub descent: f64,
    /// Distance from the previous baseline to this one.
    pub advance: f64,
}

/// Height of a block of lines: the first line's ascent, one advance per
/// following line, and the last line's descent.
pub fn block_height(boxes: &[LineBox]) -> f64 {
    match (boxes.first(), boxes.last()) {
        (Some(first), Some(last)) => {
            first.ascent + boxes[1..].iter().map(|b| b.advance).sum::<f64>() + last.descent
        }
        _ => 0.0,
    }
}

/// Per-line height increments whose running sum is `block_height` of the
/// lines so far. This is the shape the page-break decision consumes.
pub fn line_increments(boxes: &[LineBox]) -> Vec<f64> {
    let mut increments = Vec::with_capacity(boxes.len());
    for (i, b) in boxes.iter().enumerate() {
        if i == 0 {
            increments.push(b.ascent + b.descent);
        } else {
            increments.push(b.advance + b.descent - boxes[i - 1].descent);
        }
    }
    increments
}

/// Baseline of each line, relative to the top of the block.
pub fn baselines(boxes: &[LineBox]) -> Vec<f64> {
    let mut result = Vec::with_capacity(boxes.len());
    let mut y = 0.0;
    for (i, b) in boxes.iter().enumerate() {
        y += if i == 0 { b.ascent } else { b.advance };
        result.push(y);
    }
    result
}

/// A piece of a line drawn with a single run.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionedFragment {
    pub run: usize,
    pub text: String,
    /// Offset from the left edge of the content box.
    pub x: f64,
    pub width: f64,
}

/// Split a line into single-run fragments and place them horizontally.
///
/// `Justify` stretches every space on lines that do not end a segment;
/// those lines are emitted word by word so each word lands on its own x.
pub fn position_line(line: &BrokenLine, content_width: f64, align: TextAlign) -> Vec<PositionedFragment> {
    let free = if content_width.is_finite() {
        (content_width - line.width).max(0.0)
    } else {
        0.0
    };
    let spaces = line.space_count();
    let justify = align == TextAlign::Justify && !line.ends_segment && spaces > 0 && free > EPSILON;
    let extra_per_space = if justify { free / spaces as f64 } else { 0.0 };

    let mut x = match align {
        TextAlign::Center => free / 2.0,
        TextAlign::End => free,
        TextAlign::Start | TextAlign::Justify => 0.0,
    };

    let mut fragments: Vec<PositionedFragment> = Vec::new();
    let mut current: Option<PositionedFragment> = None;

    for c in &line.chars {
        if justify && c.ch == ' ' {
            if let Some(frag) = current.take() {
                fragments.push(frag);
            }
            x += c.width + extra_per_space;
            continue;
        }
        match current.as_mut() {
            Some(frag) if frag.run == c.run => {
                frag.text.push(c.ch);
                frag.width += c.width;
            }
            _ => {
                if let Some(frag) = current.take() {
                    fragments.push(frag);
                }
                current = Some(PositionedFragment {
                    run: c.run,
                    text: c.ch.to_string(),
                    x,
                    width: c.width,
                });
            }
        }
        x += c.width;
    }
    if let Some(frag) = current {
        fragments.push(frag);
    }
    fragments
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Monospace text: every char is 6pt wide, all in run 0.
    fn mono(text: &str) -> Vec<StyledChar> {
        text.chars().map(|ch| StyledChar::new(ch, 0, 6.0)).collect()
    }

    fn ellipsis_6(_run: usize) -> f64 {
        6.0
    }

    fn texts(lines: &[BrokenLine]) -> Vec<String> {
        lines.iter().map(|l| l.text()).collect()
    }

    #[test]
    fn break_opportunities_after_spaces_and_hyphens() {
        let opps = compute_break_opportunities("ab cd-ef");
        assert!(!opps[0]);
        assert!(opps[3]); // before 'c'
        assert!(opps[6]); // before 'e'
        assert!(!opps[4]);
    }

    #[test]
    fn word_wrap_backs_off_to_boundary() {
        // 10 chars per line.
        let lines = break_into_lines(&mono("hello brave new world"), 60.0, LineBreakMode::WordWrap, &ellipsis_6);
        assert_eq!(texts(&lines), vec!["hello", "brave new", "world"]);
        assert!(lines.iter().all(|l| l.width <= 60.0));
        assert!(lines[2].ends_segment);
        assert!(!lines[0].ends_segment);
    }

    #[test]
    fn word_wrap_hard_breaks_long_words() {
        let lines = break_into_lines(&mono("abcdefghijklmnop"), 30.0, LineBreakMode::WordWrap, &ellipsis_6);
        assert_eq!(texts(&lines), vec!["abcde", "fghij", "klmno", "p"]);
    }

    #[test]
    fn long_word_after_short_word() {
        let lines = break_into_lines(&mono("a bcdefghijkl"), 30.0, LineBreakMode::WordWrap, &ellipsis_6);
        assert_eq!(texts(&lines), vec!["a", "bcdef", "ghijk", "l"]);
    }

    #[test]
    fn newlines_split_segments() {
        let lines = break_into_lines(&mono("one\n\ntwo"), 600.0, LineBreakMode::WordWrap, &ellipsis_6);
        assert_eq!(texts(&lines), vec!["one", "", "two"]);
        assert!(lines.iter().all(|l| l.ends_segment));
    }

    #[test]
    fn no_wrap_is_one_line_per_segment() {
        let lines = break_into_lines(&mono("a very long line of text"), 12.0, LineBreakMode::NoWrap, &ellipsis_6);
        assert_eq!(lines.len(), 1);
        assert!(lines[0].width > 12.0);
    }

    #[test]
    fn hyphen_is_a_boundary() {
        let lines = break_into_lines(&mono("well-known"), 36.0, LineBreakMode::WordWrap, &ellipsis_6);
        assert_eq!(texts(&lines), vec!["well-", "known"]);
    }

    #[test]
    fn tail_truncation() {
        let out = truncate(&mono("abcdefghij"), 36.0, LineBreakMode::TailTruncation, &ellipsis_6);
        let text: String = out.iter().map(|c| c.ch).collect();
        assert_eq!(text, "abcde\u{2026}");
    }

    #[test]
    fn head_truncation() {
        let out = truncate(&mono("abcdefghij"), 36.0, LineBreakMode::HeadTruncation, &ellipsis_6);
        let text: String = out.iter().map(|c| c.ch).collect();
        assert_eq!(text, "\u{2026}fghij");
    }

    #[test]
    fn middle_truncation() {
        let out = truncate(&mono("abcdefghij"), 36.0, LineBreakMode::MiddleTruncation, &ellipsis_6);
        let text: String = out.iter().map(|c| c.ch).collect();
        assert_eq!(text, "abc\u{2026}ij");
    }

    #[test]
    fn truncation_degenerate_widths() {
        let only_ellipsis = truncate(&mono("abc"), 7.0, LineBreakMode::TailTruncation, &ellipsis_6);
        assert_eq!(only_ellipsis.len(), 1);
        assert_eq!(only_ellipsis[0].ch, ELLIPSIS);
        assert!(truncate(&mono("abc"), 1.0, LineBreakMode::TailTruncation, &ellipsis_6).is_empty());
    }

    #[test]
    fn truncation_is_idempotent() {
        for mode in [
            LineBreakMode::HeadTruncation,
            LineBreakMode::MiddleTruncation,
            LineBreakMode::TailTruncation,
        ] {
            for width in [0.0, 5.0, 6.0, 20.0, 37.0, 100.0] {
                let once = truncate(&mono("the quick brown fox"), width, mode, &ellipsis_6);
                let twice = truncate(&once, width, mode, &ellipsis_6);
                assert_eq!(once, twice, "{mode:?} at {width}");
            }
        }
    }

    #[test]
    fn trailing_space_is_trimmed_before_ellipsis() {
        let out = truncate(&mono("ab cdefgh"), 24.0, LineBreakMode::TailTruncation, &ellipsis_6);
        let text: String = out.iter().map(|c| c.ch).collect();
        assert_eq!(text, "ab\u{2026}");
    }

    #[test]
    fn block_height_uses_ascent_and_descent() {
        let b = LineBox {
            ascent: 6.29,
            descent: 1.57,
            advance: 12.0,
        };
        let h = block_height(&[b, b, b]);
        assert!((h - 31.86).abs() < 1e-9);
        let increments = line_increments(&[b, b, b]);
        assert!((increments.iter().sum::<f64>() - h).abs() < 1e-9);
        let ys = baselines(&[b, b]);
        assert!((ys[1] - ys[0] - 12.0).abs() < 1e-9);
        assert_eq!(block_height(&[]), 0.0);
    }

    #[test]
    fn fragments_follow_runs() {
        let mut chars = mono("ab");
        chars.extend("cd".chars().map(|ch| StyledChar::new(ch, 1, 10.0)));
        let line = BrokenLine::new(&chars, true);
        let frags = position_line(&line, 100.0, TextAlign::End);
        assert_eq!(frags.len(), 2);
        assert_eq!(frags[0].text, "ab");
        assert_eq!(frags[0].x, 100.0 - 32.0);
        assert_eq!(frags[1].run, 1);
        assert_eq!(frags[1].x, 100.0 - 20.0);
    }

    #[test]
    fn justify_spreads_spaces_except_last_line() {
        let lines = break_into_lines(&mono("aa bb cc dd"), 54.0, LineBreakMode::WordWrap, &ellipsis_6);
        assert_eq!(texts(&lines), vec!["aa bb cc", "dd"]);
        let first = position_line(&lines[0], 54.0, TextAlign::Justify);
        assert_eq!(first.len(), 3);
        assert!((first[1].x - 21.0).abs() < 1e-9);
        assert!((first[2].x + first[2].width - 54.0).abs() < 1e-9);
        let last = position_line(&lines[1], 54.0, TextAlign::Justify);
        assert_eq!(last.len(), 1);
        assert_eq!(last[0].x, 0.0);
    }

    #[test]
    fn soft_breaks_reopen_segment_ends() {
        let mut lines = break_into_lines(&mono("gg hh ii\njj kk\nll"), 54.0, LineBreakMode::WordWrap, &ellipsis_6);
        assert!(lines.iter().all(|l| l.ends_segment));
        restore_soft_breaks(&mut lines, &[true, false]);
        assert!(!lines[0].ends_segment);
        assert!(lines[1].ends_segment);
        assert!(lines[2].ends_segment);
        let first = position_line(&lines[0], 54.0, TextAlign::Justify);
        assert_eq!(first.len(), 3);
    }
}
