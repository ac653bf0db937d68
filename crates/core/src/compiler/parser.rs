use super::tokens::{Spanned, Token};
use crate::ast::{Call, ContextRef, Expr, Literal, Path, PathSegment, Scope};
use crate::error::CompileError;

/// A parsed statement before the implicit-assignment rules are applied.
pub(super) struct ParsedStatement {
    pub target: Option<Path>,
    pub tree: Expr,
}

/// Recursive-descent parser over one logical statement.
///
/// ```text
/// statement := [target '='] operand ('|>' stage)*
/// stage     := name ['(' args ')']            -- partial call, accumulator first
/// operand   := primary ('->' follow_key)*
/// primary   := literal | call | '$' name selector* | name selector*
/// ```
pub(super) struct Parser<'a> {
    tokens: &'a [Spanned],
    pos: usize,
    statement: &'a str,
}

impl<'a> Parser<'a> {
    pub(super) fn new(tokens: &'a [Spanned], statement: &'a str) -> Self {
        Parser {
            tokens,
            pos: 0,
            statement,
        }
    }

    fn cur(&self) -> &Spanned {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek(&self) -> &Token {
        &self.cur().token
    }

    fn peek_at(&self, offset: usize) -> &Token {
        &self.tokens[(self.pos + offset).min(self.tokens.len() - 1)].token
    }

    fn advance(&mut self) -> Token {
        let t = self.cur().token.clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        t
    }

    fn err(&self, msg: impl Into<String>) -> CompileError {
        CompileError::Syntax {
            statement: self.statement.to_owned(),
            column: self.cur().column,
            message: msg.into(),
        }
    }

    fn expect(&mut self, token: Token, what: &str) -> Result<(), CompileError> {
        if self.peek() == &token {
            self.advance();
            Ok(())
        } else {
            Err(self.err(format!("expected {}, got {:?}", what, self.peek())))
        }
    }

    fn take_word(&mut self) -> Result<String, CompileError> {
        if let Token::Word(w) = self.peek().clone() {
            self.advance();
            Ok(w)
        } else {
            Err(self.err(format!("expected identifier, got {:?}", self.peek())))
        }
    }

    // -- Statement ----------------------------------------------

    pub(super) fn parse_statement(&mut self) -> Result<ParsedStatement, CompileError> {
        if self.peek() == &Token::Assign {
            return Err(CompileError::EmptyAssignmentTarget {
                statement: self.statement.to_owned(),
            });
        }
        let target = self.parse_assignment_target()?;

        let mut tree = self.parse_operand()?;
        while self.peek() == &Token::Pipe {
            self.advance();
            let Call { verb, args } = self.parse_stage()?;
            let mut folded = Vec::with_capacity(args.len() + 1);
            folded.push(tree);
            folded.extend(args);
            tree = Expr::Call(Call::new(verb, folded));
        }

        if self.peek() != &Token::Eof {
            return Err(self.err(format!("unexpected {:?}", self.peek())));
        }
        Ok(ParsedStatement { target, tree })
    }

    /// Try `path '='`; rewinds and returns `None` if the statement is not an
    /// assignment.
    fn parse_assignment_target(&mut self) -> Result<Option<Path>, CompileError> {
        let start = self.pos;
        let first = match self.peek().clone() {
            Token::Word(w) => PathSegment::Key(w),
            Token::Str(s) => PathSegment::Key(s),
            _ => return Ok(None),
        };
        self.advance();
        let mut path = Path::from_segments(vec![first]);
        if self.parse_selectors(&mut path).is_err() || self.peek() != &Token::Assign {
            self.pos = start;
            return Ok(None);
        }
        self.advance();
        if self.peek() == &Token::Eof {
            return Err(self.err("assignment has no expression"));
        }
        Ok(Some(path))
    }

    fn parse_stage(&mut self) -> Result<Call, CompileError> {
        if !matches!(self.peek(), Token::Word(_)) {
            return Err(self.err(format!(
                "pipeline stage must be a call or verb name, got {:?}",
                self.peek()
            )));
        }
        let verb = self.parse_dotted_name()?;
        let args = if self.peek() == &Token::LParen {
            self.parse_args()?
        } else {
            Vec::new()
        };
        Ok(Call::new(verb, args))
    }

    fn parse_dotted_name(&mut self) -> Result<String, CompileError> {
        let mut name = self.take_word()?;
        while self.peek() == &Token::Dot && matches!(self.peek_at(1), Token::Word(_)) {
            self.advance();
            name.push('.');
            name.push_str(&self.take_word()?);
        }
        Ok(name)
    }

    fn parse_args(&mut self) -> Result<Vec<Expr>, CompileError> {
        self.expect(Token::LParen, "'('")?;
        let mut args = Vec::new();
        while self.peek() != &Token::RParen {
            args.push(self.parse_operand()?);
            match self.peek() {
                Token::Comma => {
                    self.advance();
                }
                Token::RParen => {}
                other => return Err(self.err(format!("expected ',' or ')', got {:?}", other))),
            }
        }
        self.expect(Token::RParen, "')'")?;
        Ok(args)
    }

    // -- Operands -----------------------------------------------

    fn parse_operand(&mut self) -> Result<Expr, CompileError> {
        let mut expr = self.parse_primary()?;
        while self.peek() == &Token::Arrow {
            self.advance();
            let key = self.parse_follow_key()?;
            expr = Expr::call("follow", vec![expr, Expr::str(key)]);
        }
        Ok(expr)
    }

    /// `name.*.log` style relationship key, kept verbatim.
    fn parse_follow_key(&mut self) -> Result<String, CompileError> {
        let mut key = String::new();
        loop {
            match self.peek().clone() {
                Token::Word(w) => key.push_str(&w),
                Token::Int(n) if n >= 0 => key.push_str(&n.to_string()),
                Token::Star => key.push('*'),
                other => {
                    return Err(self.err(format!("expected relationship key, got {:?}", other)))
                }
            }
            self.advance();
            if self.peek() != &Token::Dot {
                return Ok(key);
            }
            self.advance();
            key.push('.');
        }
    }

    fn parse_primary(&mut self) -> Result<Expr, CompileError> {
        match self.peek().clone() {
            Token::Str(s) => {
                self.advance();
                Ok(Expr::Literal(Literal::Str(s)))
            }
            Token::Int(n) => {
                self.advance();
                Ok(Expr::Literal(Literal::Int(n)))
            }
            Token::Float(f) => {
                self.advance();
                Ok(Expr::Literal(Literal::Float(f)))
            }
            Token::Dollar => {
                self.advance();
                let name = self.take_word()?;
                let (scope, mut path) = match name.as_str() {
                    "this" => (Scope::This, Path::root()),
                    "self" => (Scope::SelfName, Path::root()),
                    "form" => (Scope::Form, Path::root()),
                    _ => (Scope::Context, Path::key(name)),
                };
                self.parse_selectors(&mut path)?;
                Ok(Expr::Ref(ContextRef { scope, path }))
            }
            Token::Word(_) => self.parse_name_operand(),
            other => Err(self.err(format!("expected call or literal, got {:?}", other))),
        }
    }

    fn parse_name_operand(&mut self) -> Result<Expr, CompileError> {
        let start = self.pos;
        let name = self.parse_dotted_name()?;
        if self.peek() == &Token::LParen {
            let args = self.parse_args()?;
            return Ok(Expr::Call(Call::new(name, args)));
        }
        self.pos = start;

        let word = self.take_word()?;
        let is_bare = !matches!(self.peek(), Token::Dot | Token::LBracket);
        if is_bare {
            let literal = match word.as_str() {
                "true" | "True" => Some(Literal::Bool(true)),
                "false" | "False" => Some(Literal::Bool(false)),
                "null" | "None" => Some(Literal::Null),
                _ => None,
            };
            if let Some(lit) = literal {
                return Ok(Expr::Literal(lit));
            }
        }

        let mut path = if word == "context" {
            Path::root()
        } else {
            Path::key(word)
        };
        self.parse_selectors(&mut path)?;
        Ok(Expr::Ref(ContextRef {
            scope: Scope::Context,
            path,
        }))
    }

    /// `.key`, `["key"]` and `[0]` selectors appended to `path`.
    fn parse_selectors(&mut self, path: &mut Path) -> Result<(), CompileError> {
        loop {
            match self.peek() {
                Token::Dot => {
                    self.advance();
                    let key = self.take_word()?;
                    path.push(PathSegment::Key(key));
                }
                Token::LBracket => {
                    self.advance();
                    let segment = match self.advance() {
                        Token::Str(s) => PathSegment::Key(s),
                        Token::Int(n) if n >= 0 => PathSegment::Index(n as usize),
                        other => {
                            return Err(self.err(format!(
                                "expected quoted key or index in '[...]', got {:?}",
                                other
                            )))
                        }
                    };
                    self.expect(Token::RBracket, "']'")?;
                    path.push(segment);
                }
                _ => return Ok(()),
            }
        }
    }
}
