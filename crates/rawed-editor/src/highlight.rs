//! Syntax highlighting by SGR color markers.
//!
//! Colors Python keywords cyan and string literals magenta by inserting
//! `ESC[36m` / `ESC[35m` before a token and `ESC[39m` (default foreground)
//! after it. The text itself is never changed; stripping the markers gives
//! back the input.
//!
//! # Architecture
//!
//! 1. [`spans`] scans the original text once for strings and once for
//!    keywords and returns sorted, non-overlapping [`HighlightSpan`]s.
//!    A keyword inside a string is not a keyword.
//! 2. [`apply`] walks the text once, copying it into a fresh `String` with
//!    markers around each span.
//!
//! Offsets are always against the original text, so markers inserted for
//! one token can never shift or corrupt another.
//!
//! [`clip_spans`] cuts spans computed over the whole text down to a byte
//! window of it (one visible row), so a string that opens above the window
//! is still colored inside it.
//!
//! # String rules
//!
//! Triple-quoted literals are tried before single-quoted ones. A single- or
//! double-quoted literal honors backslash escapes and may run across lines.
//! A literal with no closing quote runs to the end of the text.

use std::ops::Range;
use std::sync::LazyLock;

use rawed_term::ansi::{self, SGR_FG_CYAN, SGR_FG_DEFAULT, SGR_FG_MAGENTA};
use regex::Regex;

// ---------------------------------------------------------------------------
// Token tables
// ---------------------------------------------------------------------------

/// Python's reserved words.
pub const KEYWORDS: [&str; 35] = [
    "False", "None", "True", "and", "as", "assert", "async", "await", "break", "class",
    "continue", "def", "del", "elif", "else", "except", "finally", "for", "from", "global",
    "if", "import", "in", "is", "lambda", "nonlocal", "not", "or", "pass", "raise", "return",
    "try", "while", "with", "yield",
];

/// String literals, longest opener first.
const STRING_PATTERN: &str = concat!(
    r#"(?s)"""(?:.*?)(?:"""|\z)"#,
    r"|'''(?:.*?)(?:'''|\z)",
    r#"|"(?:\\.|[^"\\])*(?:"|\z)"#,
    r"|'(?:\\.|[^'\\])*(?:'|\z)",
);

static PYTHON: LazyLock<Highlighter> = LazyLock::new(Highlighter::python);

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// What a span was recognized as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Keyword,
    String,
}

impl TokenKind {
    /// The SGR foreground code the token is drawn in.
    #[inline]
    #[must_use]
    pub const fn color(self) -> u8 {
        match self {
            Self::Keyword => SGR_FG_CYAN,
            Self::String => SGR_FG_MAGENTA,
        }
    }
}

/// A colored token: half-open byte range `[start, end)` of the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HighlightSpan {
    pub start: usize,
    pub end: usize,
    pub kind: TokenKind,
}

impl HighlightSpan {
    #[inline]
    #[must_use]
    pub const fn color(&self) -> u8 {
        self.kind.color()
    }

    #[inline]
    #[must_use]
    pub const fn range(&self) -> Range<usize> {
        self.start..self.end
    }
}

/// Compiled token patterns for one language.
#[derive(Debug, Clone)]
pub struct Highlighter {
    keywords: Regex,
    strings: Regex,
}

impl Highlighter {
    /// The Python keyword and string rules.
    ///
    /// # Panics
    ///
    /// Never in practice: the patterns are fixed and covered by tests.
    #[must_use]
    pub fn python() -> Self {
        let alternation = KEYWORDS.map(regex::escape).join("|");
        Self {
            keywords: Regex::new(&format!(r"\b(?:{alternation})\b"))
                .expect("keyword pattern is valid"),
            strings: Regex::new(STRING_PATTERN).expect("string pattern is valid"),
        }
    }

    /// Sorted, non-overlapping spans over `text`. Strings win over keywords.
    #[must_use]
    pub fn spans(&self, text: &str) -> Vec<HighlightSpan> {
        let strings: Vec<HighlightSpan> = self
            .strings
            .find_iter(text)
            .map(|m| HighlightSpan {
                start: m.start(),
                end: m.end(),
                kind: TokenKind::String,
            })
            .collect();

        let keywords = self
            .keywords
            .find_iter(text)
            .filter(|m| !overlaps_any(&strings, m.start(), m.end()))
            .map(|m| HighlightSpan {
                start: m.start(),
                end: m.end(),
                kind: TokenKind::Keyword,
            });

        let mut all: Vec<HighlightSpan> = keywords.chain(strings.iter().copied()).collect();
        all.sort_unstable_by_key(|s| s.start);
        all
    }

}

impl Default for Highlighter {
    fn default() -> Self {
        Self::python()
    }
}

/// Whether `[start, end)` intersects any of the sorted, disjoint `spans`.
fn overlaps_any(spans: &[HighlightSpan], start: usize, end: usize) -> bool {
    let i = spans.partition_point(|s| s.end <= start);
    spans.get(i).is_some_and(|s| s.start < end)
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

/// Copy `text` with SGR markers around each span. `spans` must be sorted,
/// disjoint and on char boundaries; spans that aren't are skipped.
#[must_use]
pub fn apply(text: &str, spans: &[HighlightSpan]) -> String {
    let reset = ansi::select_graphic_rendition(SGR_FG_DEFAULT);
    let mut out = String::with_capacity(text.len() + spans.len() * 10);
    let mut last = 0;

    for span in spans {
        if span.start < last || span.end > text.len() || span.start >= span.end {
            continue;
        }
        let (Some(before), Some(token)) = (text.get(last..span.start), text.get(span.range()))
        else {
            continue;
        };
        out.push_str(before);
        out.push_str(&ansi::select_graphic_rendition(span.color()));
        out.push_str(token);
        out.push_str(&reset);
        last = span.end;
    }

    out.push_str(&text[last..]);
    out
}

/// Spans over `text` with the Python rules.
#[must_use]
pub fn spans(text: &str) -> Vec<HighlightSpan> {
    PYTHON.spans(text)
}

/// Highlight the whole of `text`.
#[must_use]
pub fn highlight(text: &str) -> String {
    apply(text, &spans(text))
}

/// The parts of `spans` inside `window`, rebased so offsets are relative
/// to `window.start`. Feed the result to [`apply`] with `text[window]`.
#[must_use]
pub fn clip_spans(spans: &[HighlightSpan], window: Range<usize>) -> Vec<HighlightSpan> {
    spans
        .iter()
        .filter(|s| s.start < window.end && s.end > window.start)
        .map(|s| HighlightSpan {
            start: s.start.max(window.start) - window.start,
            end: s.end.min(window.end) - window.start,
            kind: s.kind,
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const CYAN: &str = "\x1b[36m";
    const MAGENTA: &str = "\x1b[35m";
    const RESET: &str = "\x1b[39m";

    fn kw(s: &str) -> String {
        format!("{CYAN}{s}{RESET}")
    }

    fn st(s: &str) -> String {
        format!("{MAGENTA}{s}{RESET}")
    }

    /// Remove every SGR marker.
    fn strip(s: &str) -> String {
        Regex::new("\x1b\\[[0-9]*m").unwrap().replace_all(s, "").into_owned()
    }

    // -- Basics -------------------------------------------------------------

    #[test]
    fn empty_text() {
        assert_eq!(highlight(""), "");
    }

    #[test]
    fn no_tokens_is_unchanged() {
        assert_eq!(highlight("x = y + 1"), "x = y + 1");
    }

    #[test]
    fn def_is_the_only_keyword() {
        assert_eq!(highlight("def foo():"), format!("{} foo():", kw("def")));
    }

    #[test]
    fn every_keyword_is_recognized() {
        for word in KEYWORDS {
            assert_eq!(highlight(word), kw(word), "{word}");
        }
    }

    #[test]
    fn whole_words_only() {
        assert_eq!(highlight("define classy import_x"), "define classy import_x");
        assert_eq!(highlight("Trueish"), "Trueish");
    }

    #[test]
    fn keywords_are_case_sensitive() {
        assert_eq!(highlight("DEF If none"), "DEF If none");
    }

    #[test]
    fn several_keywords() {
        assert_eq!(
            highlight("if a and not b:"),
            format!("{} a {} {} b:", kw("if"), kw("and"), kw("not"))
        );
    }

    // -- Strings ------------------------------------------------------------

    #[test]
    fn double_quoted() {
        assert_eq!(highlight(r#"x = "hi""#), format!("x = {}", st(r#""hi""#)));
    }

    #[test]
    fn escaped_quote_stays_inside() {
        let text = r"'it\'s ok'";
        assert_eq!(highlight(text), st(text));
    }

    #[test]
    fn triple_quoted_spans_lines() {
        let text = "\"\"\"doc\nstring\"\"\"\nx";
        assert_eq!(
            highlight(text),
            format!("{}\nx", st("\"\"\"doc\nstring\"\"\""))
        );
    }

    #[test]
    fn triple_single_quotes() {
        let text = "'''a'b'''";
        assert_eq!(highlight(text), st(text));
    }

    #[test]
    fn unterminated_runs_to_end() {
        assert_eq!(highlight("s = 'abc"), format!("s = {}", st("'abc")));
        assert_eq!(highlight("\"\"\"open"), st("\"\"\"open"));
    }

    #[test]
    fn quote_of_other_kind_inside() {
        let text = r#""it's""#;
        assert_eq!(highlight(text), st(text));
    }

    #[test]
    fn adjacent_strings() {
        assert_eq!(highlight("'a''b'"), format!("{}{}", st("'a'"), st("'b'")));
    }

    #[test]
    fn keyword_inside_string_is_not_colored() {
        assert_eq!(
            highlight("print('if x')"),
            format!("print({})", st("'if x'"))
        );
    }

    #[test]
    fn keyword_and_string_together() {
        assert_eq!(
            highlight("return 'x' or None"),
            format!("{} {} {} {}", kw("return"), st("'x'"), kw("or"), kw("None"))
        );
    }

    #[test]
    fn unicode_text_is_preserved() {
        let text = "s = 'café' if 中 else \"🦀\"";
        assert_eq!(strip(&highlight(text)), text);
    }

    // -- Spans --------------------------------------------------------------

    #[test]
    fn spans_are_sorted_and_disjoint() {
        let s = spans("def f(): return 'a' + \"b\" if x else y");
        for pair in s.windows(2) {
            assert!(pair[0].end <= pair[1].start, "{pair:?}");
        }
        assert_eq!(s.len(), 6);
    }

    #[test]
    fn span_offsets_are_bytes() {
        let s = spans("é = 'x'");
        assert_eq!(
            s,
            [HighlightSpan {
                start: 5,
                end: 8,
                kind: TokenKind::String
            }]
        );
    }

    #[test]
    fn span_colors() {
        assert_eq!(TokenKind::Keyword.color(), 36);
        assert_eq!(TokenKind::String.color(), 35);
    }

    #[test]
    fn apply_skips_bad_spans() {
        let bogus = [
            HighlightSpan {
                start: 2,
                end: 1,
                kind: TokenKind::Keyword,
            },
            HighlightSpan {
                start: 0,
                end: 99,
                kind: TokenKind::String,
            },
        ];
        assert_eq!(apply("abc", &bogus), "abc");
    }

    // -- Windows ------------------------------------------------------------

    #[test]
    fn clipped_window_colors_string_opened_above() {
        let text = "x = '''a\nb''' if y\nz";
        let line1 = text.find('\n').unwrap() + 1;
        let line2 = text.rfind('\n').unwrap();
        let window = line1..line2;
        assert_eq!(
            apply(&text[window.clone()], &clip_spans(&spans(text), window)),
            format!("{} {} y", st("b'''"), kw("if"))
        );
    }

    #[test]
    fn clipping_to_whole_text_is_identity() {
        let text = "def f():\n    return 'x'\n";
        let all = spans(text);
        assert_eq!(clip_spans(&all, 0..text.len()), all);
    }

    #[test]
    fn clip_cuts_and_rebases() {
        let text = "a\nif b = 'long string'";
        let all = spans(text);
        assert_eq!(
            clip_spans(&all, 2..14),
            [
                HighlightSpan {
                    start: 0,
                    end: 2,
                    kind: TokenKind::Keyword
                },
                HighlightSpan {
                    start: 7,
                    end: 12,
                    kind: TokenKind::String
                },
            ]
        );
    }

    #[test]
    fn clip_outside_every_span_is_empty() {
        assert!(clip_spans(&spans("if x"), 2..4).is_empty());
    }
}
