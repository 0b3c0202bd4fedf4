//! Template tokenization.
//!
//! A template is first split into literal text, `{{ output }}` tags,
//! `{% statement %}` tags and `{# comments #}`. The inside of output and
//! statement tags is then tokenized by [`Lexer`].

use super::error::{Span, TemplateError};

/// A top-level piece of a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment<'a> {
    /// Literal text, emitted verbatim.
    Text(&'a str),
    /// The expression inside `{{ }}`.
    Output {
        /// Expression source.
        source: &'a str,
        /// Byte offset of `source` in the template.
        offset: usize,
    },
    /// The content of `{% %}`.
    Statement {
        /// Statement source.
        source: &'a str,
        /// Byte offset of `source` in the template.
        offset: usize,
    },
}

/// Splits a template into segments. Comments are dropped.
///
/// A statement or comment tag swallows the line break directly after it.
/// Everything between `{% raw %}` and `{% endraw %}` is literal text, which
/// is how SQL containing `{{` (such as a `'{{1,2}}'` array literal) is
/// written.
///
/// # Errors
///
/// Returns an error for a tag without its closing delimiter.
pub fn split(source: &str) -> Result<Vec<Segment<'_>>, TemplateError> {
    let mut segments = Vec::new();
    let mut text_start = 0;
    let mut search = 0;

    while let Some(found) = source[search..].find('{') {
        let open = search + found;
        let close_delim = match source.as_bytes().get(open + 1) {
            Some(b'{') => "}}",
            Some(b'%') => "%}",
            Some(b'#') => "#}",
            _ => {
                search = open + 1;
                continue;
            }
        };

        let inner_start = open + 2;
        let Some(inner_len) = source[inner_start..].find(close_delim) else {
            return Err(TemplateError::new(
                format!("unclosed tag, expected '{close_delim}'"),
                Span::new(open, source.len()),
            ));
        };
        let inner_end = inner_start + inner_len;
        let mut after = inner_end + close_delim.len();

        if open > text_start {
            segments.push(Segment::Text(&source[text_start..open]));
        }

        let inner = &source[inner_start..inner_end];
        if close_delim != "}}" {
            after = skip_line_break(source, after);
        }
        match close_delim {
            "}}" => segments.push(Segment::Output {
                source: inner,
                offset: inner_start,
            }),
            "%}" if inner.trim() == "raw" => {
                let Some((end_open, end_close)) = find_endraw(source, after) else {
                    return Err(TemplateError::new(
                        "unclosed 'raw' block, expected 'endraw'",
                        Span::new(open, source.len()),
                    ));
                };
                if end_open > after {
                    segments.push(Segment::Text(&source[after..end_open]));
                }
                after = skip_line_break(source, end_close);
            }
            "%}" => segments.push(Segment::Statement {
                source: inner,
                offset: inner_start,
            }),
            _ => {}
        }

        text_start = after;
        search = after;
    }

    if text_start < source.len() {
        segments.push(Segment::Text(&source[text_start..]));
    }

    Ok(segments)
}

fn skip_line_break(source: &str, pos: usize) -> usize {
    if source[pos..].starts_with("\r\n") {
        pos + 2
    } else if source[pos..].starts_with('\n') {
        pos + 1
    } else {
        pos
    }
}

/// Returns the start and end of the first `{% endraw %}` tag at or after
/// `from`.
fn find_endraw(source: &str, from: usize) -> Option<(usize, usize)> {
    let mut search = from;
    while let Some(found) = source[search..].find("{%") {
        let open = search + found;
        let inner_start = open + 2;
        let close = inner_start + source[inner_start..].find("%}")?;
        if source[inner_start..close].trim() == "endraw" {
            return Some((open, close + 2));
        }
        search = inner_start;
    }
    None
}

/// Token types of template expressions.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    /// Identifier or keyword (`and`, `or`, `not`, `in`, `is`, ...).
    Ident(String),
    /// String literal, escapes resolved.
    Str(String),
    /// Integer literal.
    Int(i64),
    /// Float literal.
    Float(f64),
    /// `(`
    LeftParen,
    /// `)`
    RightParen,
    /// `[`
    LeftBracket,
    /// `]`
    RightBracket,
    /// `,`
    Comma,
    /// `.`
    Dot,
    /// `==`
    EqEq,
    /// `!=`
    NotEq,
    /// `<`
    Lt,
    /// `<=`
    LtEq,
    /// `>`
    Gt,
    /// `>=`
    GtEq,
    /// Invalid input.
    Error(String),
    /// End of the expression.
    Eof,
}

/// A token with its location in the template.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    /// The token type.
    pub kind: TokenKind,
    /// Location in the template.
    pub span: Span,
}

impl Token {
    /// Creates a new token.
    #[must_use]
    pub const fn new(kind: TokenKind, span: Span) -> Self {
        Self { kind, span }
    }

    /// Returns whether the token is the identifier `word`.
    #[must_use]
    pub fn is_word(&self, word: &str) -> bool {
        matches!(&self.kind, TokenKind::Ident(ident) if ident == word)
    }
}

/// Tokenizer for the inside of a tag.
pub struct Lexer<'a> {
    input: &'a str,
    offset: usize,
    pos: usize,
    start: usize,
}

impl<'a> Lexer<'a> {
    /// Creates a lexer for `input`, located at `offset` in the template.
    #[must_use]
    pub const fn new(input: &'a str, offset: usize) -> Self {
        Self {
            input,
            offset,
            pos: 0,
            start: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn peek_next(&self) -> Option<char> {
        let mut chars = self.input[self.pos..].chars();
        chars.next();
        chars.next()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn span(&self) -> Span {
        Span::new(self.offset + self.start, self.offset + self.pos)
    }

    fn make_token(&self, kind: TokenKind) -> Token {
        Token::new(kind, self.span())
    }

    /// Returns the next token.
    pub fn next_token(&mut self) -> Token {
        while self.peek().is_some_and(char::is_whitespace) {
            self.advance();
        }
        self.start = self.pos;

        let Some(c) = self.advance() else {
            return self.make_token(TokenKind::Eof);
        };

        match c {
            '(' => self.make_token(TokenKind::LeftParen),
            ')' => self.make_token(TokenKind::RightParen),
            '[' => self.make_token(TokenKind::LeftBracket),
            ']' => self.make_token(TokenKind::RightBracket),
            ',' => self.make_token(TokenKind::Comma),
            '.' => self.make_token(TokenKind::Dot),
            '=' if self.peek() == Some('=') => {
                self.advance();
                self.make_token(TokenKind::EqEq)
            }
            '!' if self.peek() == Some('=') => {
                self.advance();
                self.make_token(TokenKind::NotEq)
            }
            '<' if self.peek() == Some('=') => {
                self.advance();
                self.make_token(TokenKind::LtEq)
            }
            '<' => self.make_token(TokenKind::Lt),
            '>' if self.peek() == Some('=') => {
                self.advance();
                self.make_token(TokenKind::GtEq)
            }
            '>' => self.make_token(TokenKind::Gt),
            '\'' | '"' => self.scan_string(c),
            '-' if self.peek().is_some_and(|c| c.is_ascii_digit()) => self.scan_number(),
            c if c.is_ascii_digit() => self.scan_number(),
            c if c.is_alphabetic() || c == '_' => {
                while self
                    .peek()
                    .is_some_and(|c| c.is_alphanumeric() || c == '_')
                {
                    self.advance();
                }
                let word = &self.input[self.start..self.pos];
                self.make_token(TokenKind::Ident(word.to_string()))
            }
            other => self.make_token(TokenKind::Error(format!("unexpected character '{other}'"))),
        }
    }

    /// Scans a string; the opening quote is already consumed.
    fn scan_string(&mut self, quote: char) -> Token {
        let mut value = String::new();
        loop {
            match self.advance() {
                None => {
                    return self.make_token(TokenKind::Error("unterminated string".to_string()))
                }
                Some(c) if c == quote => break,
                Some('\\') => match self.advance() {
                    Some('n') => value.push('\n'),
                    Some('t') => value.push('\t'),
                    Some(c) => value.push(c),
                    None => {
                        return self
                            .make_token(TokenKind::Error("unterminated string".to_string()))
                    }
                },
                Some(c) => value.push(c),
            }
        }
        self.make_token(TokenKind::Str(value))
    }

    /// Scans an integer or float; the first character is already consumed.
    fn scan_number(&mut self) -> Token {
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
        }
        let mut is_float = false;
        if self.peek() == Some('.') && self.peek_next().is_some_and(|c| c.is_ascii_digit()) {
            is_float = true;
            self.advance();
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.advance();
            }
        }

        let text = &self.input[self.start..self.pos];
        let kind = if is_float {
            text.parse::<f64>().map_or_else(
                |_| TokenKind::Error(format!("invalid number '{text}'")),
                TokenKind::Float,
            )
        } else {
            text.parse::<i64>().map_or_else(
                |_| TokenKind::Error(format!("invalid number '{text}'")),
                TokenKind::Int,
            )
        };
        self.make_token(kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<TokenKind> {
        let mut lexer = Lexer::new(input, 0);
        let mut out = Vec::new();
        loop {
            let token = lexer.next_token();
            if token.kind == TokenKind::Eof {
                break;
            }
            out.push(token.kind);
        }
        out
    }

    #[test]
    fn test_split_segments() {
        let segments = split("SELECT {{ a }} {% if b %}x{% endif %}{# note #}").unwrap();
        assert_eq!(
            segments,
            vec![
                Segment::Text("SELECT "),
                Segment::Output {
                    source: " a ",
                    offset: 9
                },
                Segment::Text(" "),
                Segment::Statement {
                    source: " if b ",
                    offset: 17
                },
                Segment::Text("x"),
                Segment::Statement {
                    source: " endif ",
                    offset: 28
                },
            ]
        );
    }

    #[test]
    fn test_statement_swallows_newline() {
        let segments = split("{% if a %}\nx\n{% endif %}\n").unwrap();
        assert_eq!(segments[1], Segment::Text("x\n"));
        assert_eq!(segments.len(), 3);
    }

    #[test]
    fn test_plain_braces_are_text() {
        let segments = split(r#"SELECT '{"a": 1}'"#).unwrap();
        assert_eq!(segments, vec![Segment::Text(r#"SELECT '{"a": 1}'"#)]);
    }

    #[test]
    fn test_raw_block_is_text() {
        let segments = split("SELECT {% raw %}'{{1,2}}'::int[]{% endraw %}{{ a }}").unwrap();
        assert_eq!(
            segments,
            vec![
                Segment::Text("SELECT "),
                Segment::Text("'{{1,2}}'::int[]"),
                Segment::Output {
                    source: " a ",
                    offset: 46,
                },
            ]
        );
    }

    #[test]
    fn test_unclosed_raw_block() {
        let err = split("{% raw %}{{ a }}").unwrap_err();
        assert_eq!(err.message, "unclosed 'raw' block, expected 'endraw'");
    }

    #[test]
    fn test_unclosed_tag() {
        let err = split("SELECT {{ a ").unwrap_err();
        assert_eq!(err.span.start, 7);
    }

    #[test]
    fn test_tokens() {
        assert_eq!(
            kinds(r#"dialect == "pgsql" and n >= -2 or x.y[0] != 1.5"#),
            vec![
                TokenKind::Ident("dialect".into()),
                TokenKind::EqEq,
                TokenKind::Str("pgsql".into()),
                TokenKind::Ident("and".into()),
                TokenKind::Ident("n".into()),
                TokenKind::GtEq,
                TokenKind::Int(-2),
                TokenKind::Ident("or".into()),
                TokenKind::Ident("x".into()),
                TokenKind::Dot,
                TokenKind::Ident("y".into()),
                TokenKind::LeftBracket,
                TokenKind::Int(0),
                TokenKind::RightBracket,
                TokenKind::NotEq,
                TokenKind::Float(1.5),
            ]
        );
    }

    #[test]
    fn test_string_escapes() {
        assert_eq!(kinds(r"'it\'s'"), vec![TokenKind::Str("it's".into())]);
    }

    #[test]
    fn test_token_spans_are_absolute() {
        let mut lexer = Lexer::new(" name", 10);
        assert_eq!(lexer.next_token().span, Span::new(11, 15));
    }

    #[test]
    fn test_invalid_character() {
        assert!(matches!(kinds("a ; b")[1], TokenKind::Error(_)));
    }
}
