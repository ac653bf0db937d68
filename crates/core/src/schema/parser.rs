use std::collections::BTreeMap;

use super::lexer::{Spanned, Token};
use super::{is_scalar, FieldSpec};
use crate::error::SchemaSyntaxError;

pub(super) type TypeTable = BTreeMap<String, BTreeMap<String, FieldSpec>>;

pub(super) struct Parser<'a> {
    tokens: &'a [Spanned],
    pos: usize,
}

impl<'a> Parser<'a> {
    pub(super) fn new(tokens: &'a [Spanned]) -> Self {
        Parser { tokens, pos: 0 }
    }

    fn cur(&self) -> &Spanned {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek(&self) -> &Token {
        &self.cur().token
    }

    fn advance(&mut self) -> &Spanned {
        let idx = self.pos.min(self.tokens.len() - 1);
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        &self.tokens[idx]
    }

    fn err(&self, msg: impl Into<String>) -> SchemaSyntaxError {
        let t = self.cur();
        SchemaSyntaxError::new(t.line, t.column, msg)
    }

    fn expect(&mut self, token: Token, what: &str) -> Result<(), SchemaSyntaxError> {
        if self.peek() == &token {
            self.advance();
            Ok(())
        } else {
            Err(self.err(format!("expected {}, got {:?}", what, self.peek())))
        }
    }

    fn take_word(&mut self, what: &str) -> Result<String, SchemaSyntaxError> {
        if let Token::Word(w) = self.peek().clone() {
            self.advance();
            Ok(w)
        } else {
            Err(self.err(format!("expected {}, got {:?}", what, self.peek())))
        }
    }

    pub(super) fn parse(&mut self) -> Result<TypeTable, SchemaSyntaxError> {
        let mut types = TypeTable::new();
        while self.peek() != &Token::Eof {
            match self.peek() {
                Token::Word(w) if w == "type" => {
                    self.advance();
                }
                other => {
                    return Err(self.err(format!("expected 'type', got {:?}", other)));
                }
            }
            let name_err = self.err("");
            let name = self.take_word("type name")?;
            if is_scalar(&name) {
                return Err(SchemaSyntaxError {
                    message: format!("cannot redefine built-in scalar '{}'", name),
                    ..name_err
                });
            }
            if types.contains_key(&name) {
                return Err(SchemaSyntaxError {
                    message: format!("duplicate type '{}'", name),
                    ..name_err
                });
            }
            let fields = self.parse_fields()?;
            types.insert(name, fields);
        }
        Ok(types)
    }

    fn parse_fields(&mut self) -> Result<BTreeMap<String, FieldSpec>, SchemaSyntaxError> {
        self.expect(Token::LBrace, "'{'")?;
        let mut fields = BTreeMap::new();
        loop {
            match self.peek() {
                Token::RBrace => {
                    self.advance();
                    return Ok(fields);
                }
                Token::Comma | Token::Semicolon => {
                    self.advance();
                    continue;
                }
                _ => {}
            }
            let field_err = self.err("");
            let field = self.take_word("field name or '}'")?;
            self.expect(Token::Colon, "':'")?;
            let type_name = self.take_word("field type")?;
            let nullable = if self.peek() == &Token::Bang {
                self.advance();
                false
            } else {
                true
            };
            if fields.contains_key(&field) {
                return Err(SchemaSyntaxError {
                    message: format!("duplicate field '{}'", field),
                    ..field_err
                });
            }
            fields.insert(
                field,
                FieldSpec {
                    type_name,
                    nullable,
                },
            );
        }
    }
}
