//! mIRC formatting code handling.
//!
//! Strips display-formatting control codes from text destined for human
//! display. Stripping is a pure text transform with no shared state and is
//! safe to call from any thread.
//!
//! # Format codes
//! - 0x02 (^B): Bold
//! - 0x03 (^C): Color, followed by an optional `fg[,bg]` pair of 1-2 digit groups
//! - 0x0F (^O): Reset all formatting
//! - 0x16 (^V): Reverse/Inverse
//! - 0x1D (^]): Italic
//! - 0x1F (^_): Underline

use std::borrow::Cow;

/// Single-byte format control characters.
const FORMAT_CHARS: &[char] = &[
    '\x02', // Bold
    '\x03', // Color
    '\x0F', // Reset
    '\x16', // Reverse
    '\x1D', // Italic
    '\x1F', // Underline
];

/// Extension trait for handling formatted IRC strings.
pub trait FormattedStringExt<'a> {
    /// Check if the string contains any IRC formatting codes.
    fn is_formatted(&self) -> bool;

    /// Strip all IRC formatting codes from the string.
    ///
    /// Returns `Cow::Borrowed` if no formatting was present,
    /// or `Cow::Owned` with the stripped string otherwise.
    fn strip_formatting(self) -> Cow<'a, str>;
}

impl<'a> FormattedStringExt<'a> for &'a str {
    fn is_formatted(&self) -> bool {
        self.contains(FORMAT_CHARS)
    }

    fn strip_formatting(self) -> Cow<'a, str> {
        if !self.is_formatted() {
            return Cow::Borrowed(self);
        }

        let mut out = String::with_capacity(self.len());
        let mut parser = ColorParser::new();
        for c in self.chars() {
            parser.feed(c, &mut out);
        }
        Cow::Owned(out)
    }
}

impl FormattedStringExt<'static> for String {
    fn is_formatted(&self) -> bool {
        self.as_str().is_formatted()
    }

    fn strip_formatting(self) -> Cow<'static, str> {
        if !self.is_formatted() {
            return Cow::Owned(self);
        }
        Cow::Owned(self.as_str().strip_formatting().into_owned())
    }
}

/// Parser state for a color escape sequence.
enum State {
    /// Normal text.
    Text,
    /// Just saw the color escape (0x03).
    ColorStart,
    /// One foreground digit seen.
    Foreground1,
    /// Both foreground digits seen.
    Foreground2,
    /// Comma after the foreground group.
    Comma,
    /// One background digit seen.
    Background1,
}

struct ColorParser {
    state: State,
}

impl ColorParser {
    fn new() -> Self {
        Self { state: State::Text }
    }

    /// Consume one character, appending any retained text to `out`.
    ///
    /// A comma is only part of the escape when followed by a digit, so it
    /// is held back until the next character decides its fate.
    fn feed(&mut self, c: char, out: &mut String) {
        use State::*;

        match self.state {
            Text | Foreground1 | Foreground2 | Background1 if c == '\x03' => {
                self.state = ColorStart;
            }

            Text => {
                if !FORMAT_CHARS.contains(&c) {
                    out.push(c);
                }
            }

            ColorStart if c.is_ascii_digit() => self.state = Foreground1,

            Foreground1 if c.is_ascii_digit() => self.state = Foreground2,
            Foreground1 | Foreground2 if c == ',' => self.state = Comma,

            Comma if c.is_ascii_digit() => self.state = Background1,
            Comma => {
                // The comma was ordinary text after all.
                out.push(',');
                self.state = Text;
                self.feed(c, out);
            }

            Background1 if c.is_ascii_digit() => self.state = Text,

            // Sequence over; reprocess as normal text.
            _ => {
                self.state = Text;
                self.feed(c, out);
            }
        }
    }
}
