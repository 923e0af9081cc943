#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TextStats {
    pub chars: usize,
    // U+0020 only
    pub spaces: usize,
    pub words: usize,
    pub lines: usize,
}

pub fn text_stats(text: &str) -> TextStats {
    let mut stats = TextStats {
        lines: count_lines(text),
        ..TextStats::default()
    };
    let mut in_word = false;

    for c in text.chars() {
        if !c.is_whitespace() {
            stats.chars += 1;
        }
        if c == ' ' {
            stats.spaces += 1;
        }

        let is_word_char = c.is_alphanumeric() || c == '_';
        if is_word_char && !in_word {
            stats.words += 1;
        }
        in_word = is_word_char;
    }

    stats
}

// LF, CR, VT, FF, FS, GS, RS, NEL, LS and PS all end a line; CRLF counts once.
fn is_line_break(c: char) -> bool {
    matches!(
        c,
        '\n' | '\r' | '\u{0b}' | '\u{0c}' | '\u{1c}' | '\u{1d}' | '\u{1e}' | '\u{85}'
            | '\u{2028}' | '\u{2029}'
    )
}

fn count_lines(text: &str) -> usize {
    let mut lines = 0;
    let mut open_line = false;
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if is_line_break(c) {
            if c == '\r' && chars.peek() == Some(&'\n') {
                chars.next();
            }
            lines += 1;
            open_line = false;
        } else {
            open_line = true;
        }
    }
    lines + usize::from(open_line)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_plain_sentence() {
        assert_eq!(
            text_stats("hello big world"),
            TextStats {
                chars: 13,
                spaces: 2,
                words: 3,
                lines: 1,
            }
        );
    }

    #[test]
    fn tabs_and_newlines_are_not_spaces() {
        let stats = text_stats("a\tb\nc d\n");
        assert_eq!(stats.spaces, 1);
        assert_eq!(stats.chars, 4);
        assert_eq!(stats.lines, 2);
    }

    #[test]
    fn punctuation_splits_words() {
        let stats = text_stats("don't stop_me, año-2024!");
        assert_eq!(stats.words, 5);
    }

    #[test]
    fn empty_text_has_no_lines() {
        assert_eq!(text_stats(""), TextStats::default());
    }

    #[test]
    fn counts_every_line_separator() {
        assert_eq!(text_stats("one\rtwo").lines, 2);
        assert_eq!(text_stats("one\r\ntwo\r\n").lines, 2);
        assert_eq!(text_stats("a\u{2028}b\u{0c}c").lines, 3);
        assert_eq!(text_stats("\n\n").lines, 2);
    }
}
