//! Masking of protected spans.
//!
//! Dollar-quoted blocks, quoted strings, block comments and line comments
//! are swapped out for opaque tokens before any placeholder rewriting, so
//! that a `:name` or `?` inside them is never touched. [`MaskedSql::restore`]
//! puts the original spans back verbatim.

const TOKEN_OPEN: char = '\u{1}';
const TOKEN_CLOSE: char = '\u{2}';

/// SQL text with its protected spans replaced by opaque tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaskedSql {
    text: String,
    swaps: Vec<String>,
}

impl MaskedSql {
    /// Masks every protected span of `sql`.
    ///
    /// The scan runs left to right. At each position a dollar-quoted block is
    /// tried first, then a quoted string, a block comment and a line comment.
    /// An unterminated string, block or comment is left as ordinary text.
    /// A token opener already present in the input is swapped out on its own,
    /// so restoring only ever resolves tokens produced here.
    #[must_use]
    pub fn new(sql: &str) -> Self {
        let mut scanner = Scanner::new(sql);
        let mut text = String::with_capacity(sql.len());
        let mut swaps = Vec::new();
        let mut copied = 0;

        while let Some((start, end)) = scanner.next_span() {
            text.push_str(&sql[copied..start]);
            text.push(TOKEN_OPEN);
            text.push_str(&swaps.len().to_string());
            text.push(TOKEN_CLOSE);
            swaps.push(sql[start..end].to_string());
            copied = end;
        }
        text.push_str(&sql[copied..]);

        Self { text, swaps }
    }

    /// Returns the masked text.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Returns the original spans, indexed by token number.
    #[must_use]
    pub fn swaps(&self) -> &[String] {
        &self.swaps
    }

    /// Restores the protected spans in `text`.
    ///
    /// `text` is usually a rewritten version of [`MaskedSql::text`]. Tokens
    /// this instance did not produce are copied through unchanged.
    #[must_use]
    pub fn restore(&self, text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        let mut rest = text;

        while let Some(open) = rest.find(TOKEN_OPEN) {
            out.push_str(&rest[..open]);
            let after = &rest[open + TOKEN_OPEN.len_utf8()..];
            let original = after.find(TOKEN_CLOSE).and_then(|close| {
                after[..close]
                    .parse::<usize>()
                    .ok()
                    .and_then(|index| self.swaps.get(index))
                    .map(|span| (span, close))
            });
            match original {
                Some((span, close)) => {
                    out.push_str(span);
                    rest = &after[close + TOKEN_CLOSE.len_utf8()..];
                }
                None => {
                    out.push(TOKEN_OPEN);
                    rest = after;
                }
            }
        }
        out.push_str(rest);
        out
    }

    /// Restores the unmodified masked text, yielding the original SQL.
    #[must_use]
    pub fn unmask(&self) -> String {
        self.restore(&self.text)
    }
}

/// Finds protected spans in SQL text.
struct Scanner<'a> {
    input: &'a str,
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Scanner<'a> {
    const fn new(input: &'a str) -> Self {
        Self {
            input,
            bytes: input.as_bytes(),
            pos: 0,
        }
    }

    /// Returns the byte range of the next protected span.
    fn next_span(&mut self) -> Option<(usize, usize)> {
        while self.pos < self.bytes.len() {
            let start = self.pos;
            let end = self
                .token_opener(start)
                .or_else(|| self.dollar_block(start))
                .or_else(|| self.quoted(start))
                .or_else(|| self.block_comment(start))
                .or_else(|| self.line_comment(start));
            if let Some(end) = end {
                self.pos = end;
                return Some((start, end));
            }
            self.pos += 1;
        }
        None
    }

    fn peek(&self, pos: usize) -> Option<u8> {
        self.bytes.get(pos).copied()
    }

    fn token_opener(&self, start: usize) -> Option<usize> {
        self.bytes[start..]
            .starts_with(TOKEN_OPEN.encode_utf8(&mut [0; 4]).as_bytes())
            .then_some(start + TOKEN_OPEN.len_utf8())
    }

    /// `$$ ... $$` or `$tag$ ... $tag$`.
    fn dollar_block(&self, start: usize) -> Option<usize> {
        if self.peek(start) != Some(b'$') {
            return None;
        }
        let mut i = start + 1;
        if let Some(c) = self.peek(i) {
            if c.is_ascii_alphabetic() || c == b'_' {
                while self
                    .peek(i)
                    .is_some_and(|c| c.is_ascii_alphanumeric() || c == b'_')
                {
                    i += 1;
                }
            }
        }
        if self.peek(i) != Some(b'$') {
            return None;
        }
        let delimiter = &self.input[start..=i];
        let body = i + 1;
        self.input[body..]
            .find(delimiter)
            .map(|offset| body + offset + delimiter.len())
    }

    /// Single- or double-quoted string; a backslash escapes the quote.
    fn quoted(&self, start: usize) -> Option<usize> {
        let quote = self.peek(start).filter(|c| *c == b'\'' || *c == b'"')?;
        let mut i = start + 1;
        while let Some(c) = self.peek(i) {
            if c == b'\\' && self.peek(i + 1) == Some(quote) {
                i += 2;
            } else if c == quote {
                return Some(i + 1);
            } else {
                i += 1;
            }
        }
        None
    }

    fn block_comment(&self, start: usize) -> Option<usize> {
        if !self.bytes[start..].starts_with(b"/*") {
            return None;
        }
        self.input[start + 2..]
            .find("*/")
            .map(|offset| start + 2 + offset + 2)
    }

    /// `--` up to, not including, the line break.
    fn line_comment(&self, start: usize) -> Option<usize> {
        if !self.bytes[start..].starts_with(b"--") {
            return None;
        }
        Some(
            self.input[start..]
                .find('\n')
                .map_or(self.input.len(), |offset| start + offset),
        )
    }
}
