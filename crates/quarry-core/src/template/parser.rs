//! Template parser.
//!
//! Statement tags are parsed into a tree of [`Node`]s; expressions use Pratt
//! parsing with the binding powers below.

use super::error::{Span, TemplateError};
use super::lexer::{split, Lexer, Segment, Token, TokenKind};

/// Binary operators of template expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    /// `or`
    Or,
    /// `and`
    And,
    /// `==`
    Eq,
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
    /// `in`
    In,
    /// `not in`
    NotIn,
}

/// A template expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A literal value.
    Literal(serde_json::Value, Span),
    /// A list literal.
    List(Vec<Expr>, Span),
    /// A variable reference.
    Var(String, Span),
    /// `expr.field`
    Attr(Box<Expr>, String, Span),
    /// `expr[index]`
    Index(Box<Expr>, Box<Expr>, Span),
    /// `not expr`
    Not(Box<Expr>, Span),
    /// `lhs op rhs`
    Binary(BinaryOp, Box<Expr>, Box<Expr>, Span),
    /// `expr is [not] defined`
    Defined {
        /// The tested expression.
        expr: Box<Expr>,
        /// `is not defined`.
        negated: bool,
        /// Location.
        span: Span,
    },
}

impl Expr {
    /// Returns the location of the expression.
    #[must_use]
    pub const fn span(&self) -> Span {
        match self {
            Self::Literal(_, span)
            | Self::List(_, span)
            | Self::Var(_, span)
            | Self::Attr(_, _, span)
            | Self::Index(_, _, span)
            | Self::Not(_, span)
            | Self::Binary(_, _, _, span)
            | Self::Defined { span, .. } => *span,
        }
    }
}

/// A node of the template tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Literal text.
    Text(String),
    /// `{{ expr }}`
    Output(Expr),
    /// `{% if %}` with its `elif` branches and optional `else`.
    If {
        /// Conditions and bodies, in order.
        branches: Vec<(Expr, Vec<Node>)>,
        /// The `else` body.
        otherwise: Option<Vec<Node>>,
    },
    /// `{% for var in iterable %}`
    For {
        /// Loop variable.
        var: String,
        /// Iterated expression.
        iterable: Expr,
        /// Loop body.
        body: Vec<Node>,
    },
}

/// Infix binding power as `(left, right)`; higher binds tighter.
const fn infix_binding_power(op: BinaryOp) -> (u8, u8) {
    match op {
        BinaryOp::Or => (1, 2),
        BinaryOp::And => (3, 4),
        BinaryOp::Eq
        | BinaryOp::NotEq
        | BinaryOp::Lt
        | BinaryOp::LtEq
        | BinaryOp::Gt
        | BinaryOp::GtEq
        | BinaryOp::In
        | BinaryOp::NotIn => (7, 8),
    }
}

/// Prefix binding power of `not`.
const NOT_BINDING_POWER: u8 = 5;

/// A statement tag whose keyword ended a block.
struct EndTag {
    keyword: String,
    parser: ExprParser,
    span: Span,
}

/// Parses a whole template.
///
/// # Errors
///
/// Returns the first syntax error found.
pub fn parse(source: &str) -> Result<Vec<Node>, TemplateError> {
    let segments = split(source)?;
    let mut parser = Parser {
        segments,
        pos: 0,
        source_len: source.len(),
    };
    let (nodes, end) = parser.parse_block(&[])?;
    if let Some(end) = end {
        return Err(TemplateError::new(
            format!("unexpected '{}'", end.keyword),
            end.span,
        ));
    }
    Ok(nodes)
}

struct Parser<'a> {
    segments: Vec<Segment<'a>>,
    pos: usize,
    source_len: usize,
}

impl Parser<'_> {
    /// Parses nodes until one of `terminators` or the end of the template.
    fn parse_block(
        &mut self,
        terminators: &[&str],
    ) -> Result<(Vec<Node>, Option<EndTag>), TemplateError> {
        let mut nodes = Vec::new();

        while let Some(segment) = self.segments.get(self.pos).cloned() {
            self.pos += 1;
            match segment {
                Segment::Text(text) => nodes.push(Node::Text(text.to_string())),
                Segment::Output { source, offset } => {
                    let mut expr = ExprParser::new(source, offset);
                    let value = expr.parse_expression(0)?;
                    expr.expect_end()?;
                    nodes.push(Node::Output(value));
                }
                Segment::Statement { source, offset } => {
                    let mut parser = ExprParser::new(source, offset);
                    let keyword_token = parser.advance();
                    let TokenKind::Ident(keyword) = keyword_token.kind else {
                        return Err(TemplateError::new(
                            "expected a statement keyword",
                            keyword_token.span,
                        ));
                    };
                    if terminators.contains(&keyword.as_str()) {
                        return Ok((
                            nodes,
                            Some(EndTag {
                                keyword,
                                parser,
                                span: keyword_token.span,
                            }),
                        ));
                    }
                    match keyword.as_str() {
                        "if" => nodes.push(self.parse_if(parser)?),
                        "for" => nodes.push(self.parse_for(parser)?),
                        _ => {
                            return Err(TemplateError::new(
                                format!("unexpected '{keyword}'"),
                                keyword_token.span,
                            ))
                        }
                    }
                }
            }
        }

        Ok((nodes, None))
    }

    fn parse_if(&mut self, mut parser: ExprParser) -> Result<Node, TemplateError> {
        let start = parser.current.span;
        let mut condition = parser.parse_expression(0)?;
        parser.expect_end()?;
        let mut branches = Vec::new();

        loop {
            let (body, end) = self.parse_block(&["elif", "else", "endif"])?;
            branches.push((condition, body));
            let Some(mut end) = end else {
                return Err(self.unclosed("if", start));
            };
            match end.keyword.as_str() {
                "elif" => {
                    condition = end.parser.parse_expression(0)?;
                    end.parser.expect_end()?;
                }
                "else" => {
                    end.parser.expect_end()?;
                    let (body, end) = self.parse_block(&["endif"])?;
                    if end.is_none() {
                        return Err(self.unclosed("if", start));
                    }
                    return Ok(Node::If {
                        branches,
                        otherwise: Some(body),
                    });
                }
                _ => {
                    end.parser.expect_end()?;
                    return Ok(Node::If {
                        branches,
                        otherwise: None,
                    });
                }
            }
        }
    }

    fn parse_for(&mut self, mut parser: ExprParser) -> Result<Node, TemplateError> {
        let start = parser.current.span;
        let var_token = parser.advance();
        let TokenKind::Ident(var) = var_token.kind else {
            return Err(TemplateError::new("expected a loop variable", var_token.span));
        };
        let in_token = parser.advance();
        if !in_token.is_word("in") {
            return Err(TemplateError::new("expected 'in'", in_token.span));
        }
        let iterable = parser.parse_expression(0)?;
        parser.expect_end()?;

        let (body, end) = self.parse_block(&["endfor"])?;
        match end {
            Some(mut end) => end.parser.expect_end()?,
            None => return Err(self.unclosed("for", start)),
        }
        Ok(Node::For {
            var,
            iterable,
            body,
        })
    }

    fn unclosed(&self, keyword: &str, span: Span) -> TemplateError {
        TemplateError::new(
            format!("unclosed '{keyword}' block, expected 'end{keyword}'"),
            Span::new(span.start, self.source_len),
        )
    }
}

/// Expression parser over the tokens of one tag.
struct ExprParser {
    tokens: Vec<Token>,
    pos: usize,
    current: Token,
}

impl ExprParser {
    fn new(source: &str, offset: usize) -> Self {
        let mut lexer = Lexer::new(source, offset);
        let mut tokens = Vec::new();
        loop {
            let token = lexer.next_token();
            let done = token.kind == TokenKind::Eof;
            tokens.push(token);
            if done {
                break;
            }
        }
        let current = tokens[0].clone();
        Self {
            tokens,
            pos: 0,
            current,
        }
    }

    /// Consumes and returns the current token.
    fn advance(&mut self) -> Token {
        let token = self.current.clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
            self.current = self.tokens[self.pos].clone();
        }
        token
    }

    fn peek_next(&self) -> Option<&Token> {
        self.tokens.get(self.pos + 1)
    }

    fn expect(&mut self, kind: &TokenKind, what: &str) -> Result<Token, TemplateError> {
        if std::mem::discriminant(&self.current.kind) == std::mem::discriminant(kind) {
            Ok(self.advance())
        } else {
            Err(self.unexpected(what))
        }
    }

    fn expect_end(&mut self) -> Result<(), TemplateError> {
        if self.current.kind == TokenKind::Eof {
            Ok(())
        } else {
            Err(self.unexpected("end of tag"))
        }
    }

    fn unexpected(&self, expected: &str) -> TemplateError {
        let message = match &self.current.kind {
            TokenKind::Error(message) => message.clone(),
            TokenKind::Eof => format!("unexpected end of tag, expected {expected}"),
            found => format!("expected {expected}, found {found:?}"),
        };
        TemplateError::new(message, self.current.span)
    }

    /// Returns the infix operator at the current position and how many
    /// tokens it spans.
    fn infix_operator(&self) -> Option<(BinaryOp, usize)> {
        let op = match &self.current.kind {
            TokenKind::EqEq => BinaryOp::Eq,
            TokenKind::NotEq => BinaryOp::NotEq,
            TokenKind::Lt => BinaryOp::Lt,
            TokenKind::LtEq => BinaryOp::LtEq,
            TokenKind::Gt => BinaryOp::Gt,
            TokenKind::GtEq => BinaryOp::GtEq,
            TokenKind::Ident(word) => match word.as_str() {
                "or" => BinaryOp::Or,
                "and" => BinaryOp::And,
                "in" => BinaryOp::In,
                "not" if self.peek_next().is_some_and(|t| t.is_word("in")) => {
                    return Some((BinaryOp::NotIn, 2))
                }
                _ => return None,
            },
            _ => return None,
        };
        Some((op, 1))
    }

    fn parse_expression(&mut self, min_bp: u8) -> Result<Expr, TemplateError> {
        let mut lhs = self.parse_prefix()?;

        loop {
            if self.current.is_word("is") {
                let (l_bp, _) = infix_binding_power(BinaryOp::Eq);
                if l_bp < min_bp {
                    break;
                }
                self.advance();
                let negated = if self.current.is_word("not") {
                    self.advance();
                    true
                } else {
                    false
                };
                if !self.current.is_word("defined") {
                    return Err(self.unexpected("'defined'"));
                }
                let end = self.advance().span;
                let span = lhs.span().merge(end);
                lhs = Expr::Defined {
                    expr: Box::new(lhs),
                    negated,
                    span,
                };
                continue;
            }

            let Some((op, width)) = self.infix_operator() else {
                break;
            };
            let (l_bp, r_bp) = infix_binding_power(op);
            if l_bp < min_bp {
                break;
            }
            for _ in 0..width {
                self.advance();
            }
            let rhs = self.parse_expression(r_bp)?;
            let span = lhs.span().merge(rhs.span());
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs), span);
        }

        Ok(lhs)
    }

    fn parse_prefix(&mut self) -> Result<Expr, TemplateError> {
        if self.current.is_word("not") {
            let start = self.advance().span;
            let operand = self.parse_expression(NOT_BINDING_POWER)?;
            let span = start.merge(operand.span());
            return Ok(Expr::Not(Box::new(operand), span));
        }
        let primary = self.parse_primary()?;
        self.parse_postfix(primary)
    }

    fn parse_primary(&mut self) -> Result<Expr, TemplateError> {
        let token = self.current.clone();
        let span = token.span;
        let expr = match token.kind {
            TokenKind::Str(s) => Expr::Literal(serde_json::Value::String(s), span),
            TokenKind::Int(n) => Expr::Literal(serde_json::Value::from(n), span),
            TokenKind::Float(f) => Expr::Literal(serde_json::Value::from(f), span),
            TokenKind::Ident(word) => match word.as_str() {
                "true" => Expr::Literal(serde_json::Value::Bool(true), span),
                "false" => Expr::Literal(serde_json::Value::Bool(false), span),
                "null" | "none" => Expr::Literal(serde_json::Value::Null, span),
                "and" | "or" | "in" | "is" => return Err(self.unexpected("an expression")),
                _ => Expr::Var(word, span),
            },
            TokenKind::LeftParen => {
                self.advance();
                let inner = self.parse_expression(0)?;
                self.expect(&TokenKind::RightParen, "')'")?;
                return Ok(inner);
            }
            TokenKind::LeftBracket => {
                self.advance();
                let mut items = Vec::new();
                if self.current.kind != TokenKind::RightBracket {
                    loop {
                        items.push(self.parse_expression(0)?);
                        if self.current.kind == TokenKind::Comma {
                            self.advance();
                        } else {
                            break;
                        }
                    }
                }
                let end = self.expect(&TokenKind::RightBracket, "']'")?.span;
                return Ok(Expr::List(items, span.merge(end)));
            }
            _ => return Err(self.unexpected("an expression")),
        };
        self.advance();
        Ok(expr)
    }

    fn parse_postfix(&mut self, mut expr: Expr) -> Result<Expr, TemplateError> {
        loop {
            match self.current.kind {
                TokenKind::Dot => {
                    self.advance();
                    let token = self.advance();
                    let field = match token.kind {
                        TokenKind::Ident(name) => name,
                        TokenKind::Int(n) => n.to_string(),
                        _ => {
                            return Err(TemplateError::new(
                                "expected an attribute name",
                                token.span,
                            ))
                        }
                    };
                    let span = expr.span().merge(token.span);
                    expr = Expr::Attr(Box::new(expr), field, span);
                }
                TokenKind::LeftBracket => {
                    self.advance();
                    let index = self.parse_expression(0)?;
                    let end = self.expect(&TokenKind::RightBracket, "']'")?.span;
                    let span = expr.span().merge(end);
                    expr = Expr::Index(Box::new(expr), Box::new(index), span);
                }
                _ => return Ok(expr),
            }
        }
    }
}
