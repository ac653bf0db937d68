use crate::error::CompileError;

#[derive(Debug, Clone, PartialEq)]
pub(super) enum Token {
    /// Identifier (`[A-Za-z_][A-Za-z0-9_]*`)
    Word(String),
    /// Quoted string literal, single or double quotes, escapes resolved
    Str(String),
    Int(i64),
    /// Decimal literal -- kept as written
    Float(String),
    Dollar,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    Dot,
    Star,
    /// `=`
    Assign,
    /// `|>`
    Pipe,
    /// `->`
    Arrow,
    Eof,
}

#[derive(Debug, Clone)]
pub(super) struct Spanned {
    pub token: Token,
    /// 1-based column of the first character.
    pub column: usize,
}

pub(super) fn tokenize(statement: &str) -> Result<Vec<Spanned>, CompileError> {
    let chars: Vec<char> = statement.chars().collect();
    let mut tokens = Vec::new();
    let mut pos = 0usize;

    let err = |column: usize, message: String| CompileError::Syntax {
        statement: statement.to_owned(),
        column,
        message,
    };

    while pos < chars.len() {
        let c = chars[pos];
        let column = pos + 1;

        if c.is_whitespace() {
            pos += 1;
            continue;
        }

        if c == '"' || c == '\'' {
            pos += 1;
            let mut s = String::new();
            loop {
                let Some(&sc) = chars.get(pos) else {
                    return Err(err(column, "unterminated string literal".into()));
                };
                pos += 1;
                if sc == c {
                    break;
                }
                if sc == '\\' {
                    let Some(&esc) = chars.get(pos) else {
                        return Err(err(column, "unterminated escape in string".into()));
                    };
                    pos += 1;
                    match esc {
                        'n' => s.push('\n'),
                        't' => s.push('\t'),
                        '\\' | '"' | '\'' => s.push(esc),
                        other => {
                            s.push('\\');
                            s.push(other);
                        }
                    }
                    continue;
                }
                s.push(sc);
            }
            tokens.push(Spanned {
                token: Token::Str(s),
                column,
            });
            continue;
        }

        if c.is_ascii_digit()
            || (c == '-' && chars.get(pos + 1).is_some_and(|d| d.is_ascii_digit()))
        {
            let start = pos;
            pos += 1;
            while chars.get(pos).is_some_and(|d| d.is_ascii_digit()) {
                pos += 1;
            }
            let is_float = chars.get(pos) == Some(&'.')
                && chars.get(pos + 1).is_some_and(|d| d.is_ascii_digit());
            if is_float {
                pos += 1;
                while chars.get(pos).is_some_and(|d| d.is_ascii_digit()) {
                    pos += 1;
                }
            }
            let text: String = chars[start..pos].iter().collect();
            let token = if is_float {
                Token::Float(text)
            } else {
                Token::Int(
                    text.parse()
                        .map_err(|_| err(column, format!("invalid integer '{}'", text)))?,
                )
            };
            tokens.push(Spanned { token, column });
            continue;
        }

        if c.is_ascii_alphabetic() || c == '_' {
            let start = pos;
            while chars
                .get(pos)
                .is_some_and(|w| w.is_ascii_alphanumeric() || *w == '_')
            {
                pos += 1;
            }
            tokens.push(Spanned {
                token: Token::Word(chars[start..pos].iter().collect()),
                column,
            });
            continue;
        }

        let next = chars.get(pos + 1).copied();
        let (token, width) = match (c, next) {
            ('|', Some('>')) => (Token::Pipe, 2),
            ('-', Some('>')) => (Token::Arrow, 2),
            ('=', Some('=')) => {
                return Err(err(column, "comparison operators are not supported".into()))
            }
            ('=', _) => (Token::Assign, 1),
            ('$', _) => (Token::Dollar, 1),
            ('(', _) => (Token::LParen, 1),
            (')', _) => (Token::RParen, 1),
            ('[', _) => (Token::LBracket, 1),
            (']', _) => (Token::RBracket, 1),
            (',', _) => (Token::Comma, 1),
            ('.', _) => (Token::Dot, 1),
            ('*', _) => (Token::Star, 1),
            _ => return Err(err(column, format!("unexpected character '{}'", c))),
        };
        tokens.push(Spanned { token, column });
        pos += width;
    }

    tokens.push(Spanned {
        token: Token::Eof,
        column: chars.len() + 1,
    });
    Ok(tokens)
}
