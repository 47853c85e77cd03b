use crate::span::{Idx, Span};

/// Represents a single "word" inside a line of source code.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Token {
    /// Text of the token, without separators
    pub val: String,
    /// Location inside the source file
    pub span: Span,
}

/// Tokens of one source line which is neither blank nor a comment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceLine {
    /// Line number inside the file, starting at 1
    pub line: usize,
    /// Never empty
    pub tokens: Vec<Token>,
}

impl SourceLine {
    /// Span from the first to the last token of the line.
    pub fn span(&self) -> Span {
        let first = self.tokens.first().map(|tok| tok.span).unwrap_or_default();
        let last = self.tokens.last().map(|tok| tok.span).unwrap_or_default();
        first.join(last)
    }
}

/// Test if a character separates tokens.
pub(crate) fn is_separator(c: char) -> bool {
    // Operand commas are noise, same as whitespace
    c.is_whitespace() || c == ','
}

/// Test if a source line is a full-line comment.
pub(crate) fn is_comment(line: &str) -> bool {
    line.trim_start().starts_with('@')
}

/// Turn source text into a list of tokenized lines.
///
/// Comment lines (first non-blank character is `@`) and blank lines produce no entry. Line
/// terminators, including `\r`, are stripped.
pub fn tokenize(src: &str) -> Vec<SourceLine> {
    let mut lines = Vec::new();
    let mut line_start = 0;

    for (i, raw) in src.split_inclusive('\n').enumerate() {
        let offs = line_start;
        line_start += raw.len();

        if is_comment(raw) {
            continue;
        }

        let mut tokens = Vec::new();
        let mut start = None;
        // Trailing separator flushes the final token
        for (j, ch) in raw.char_indices().chain(std::iter::once((raw.len(), '\n'))) {
            if is_separator(ch) {
                if let Some(s) = start.take() {
                    let offset = u32::try_from(offs + s).unwrap_or(u32::MAX);
                    let len = u32::try_from(j - s).unwrap_or(u32::MAX);
                    tokens.push(Token {
                        val: raw[s..j].to_string(),
                        span: Span::new(Idx(offset), len),
                    });
                }
            } else if start.is_none() {
                start = Some(j);
            }
        }

        // Filter after iteration to preserve correct line numbers
        if !tokens.is_empty() {
            lines.push(SourceLine { line: i + 1, tokens });
        }
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(lines: &[SourceLine]) -> Vec<Vec<&str>> {
        lines
            .iter()
            .map(|line| line.tokens.iter().map(|tok| tok.val.as_str()).collect())
            .collect()
    }

    #[test]
    fn splits_words_and_strips_noise() {
        let lines = tokenize("LDM #5\r\nCMP  #0,\n\tOUT\n");
        assert_eq!(
            words(&lines),
            vec![vec!["LDM", "#5"], vec!["CMP", "#0"], vec!["OUT"]]
        );
    }

    #[test]
    fn skips_comments_and_blank_lines() {
        let src = "@ header comment\nLDM #1\n\n   \n  @ indented comment\nEND";
        let lines = tokenize(src);
        assert_eq!(words(&lines), vec![vec!["LDM", "#1"], vec!["END"]]);
        assert_eq!(lines[0].line, 2);
        assert_eq!(lines[1].line, 6);
    }

    #[test]
    fn spans_point_into_source() {
        let src = "LDM #5\nLOOP:\n  JMP LOOP\n";
        let lines = tokenize(src);
        for line in &lines {
            for tok in &line.tokens {
                assert_eq!(&src[tok.span.as_range()], tok.val);
            }
        }
        assert_eq!(&src[lines[2].span().as_range()], "JMP LOOP");
    }

    #[test]
    fn long_tokens_keep_full_span() {
        let src = format!("LDD {}\n", "X".repeat(70_000));
        let lines = tokenize(&src);
        let operand = &lines[0].tokens[1];
        assert_eq!(operand.span.as_range(), 4..70_004);
        assert_eq!(&src[lines[0].span().as_range()], src.trim_end());
    }
}
