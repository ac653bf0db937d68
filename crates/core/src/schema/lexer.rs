use crate::error::SchemaSyntaxError;

#[derive(Debug, Clone, PartialEq)]
pub(super) enum Token {
    /// Identifiers and the `type` keyword -- distinguished in the parser
    Word(String),
    LBrace,
    RBrace,
    Colon,
    /// `!` non-null marker
    Bang,
    // Field separators, both optional
    Comma,
    Semicolon,
    Eof,
}

#[derive(Debug, Clone)]
pub(super) struct Spanned {
    pub token: Token,
    pub line: u32,
    pub column: u32,
}

pub(super) fn lex(src: &str) -> Result<Vec<Spanned>, SchemaSyntaxError> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = src.chars().collect();
    let mut pos = 0usize;
    let mut line: u32 = 1;
    let mut line_start = 0usize;

    while pos < chars.len() {
        let c = chars[pos];
        let column = (pos - line_start) as u32 + 1;

        if c == '#' {
            while pos < chars.len() && chars[pos] != '\n' {
                pos += 1;
            }
            continue;
        }

        if c == '\n' {
            pos += 1;
            line += 1;
            line_start = pos;
            continue;
        }

        if c.is_whitespace() {
            pos += 1;
            continue;
        }

        if c.is_ascii_alphabetic() || c == '_' {
            let start = pos;
            while pos < chars.len() && (chars[pos].is_ascii_alphanumeric() || chars[pos] == '_') {
                pos += 1;
            }
            tokens.push(Spanned {
                token: Token::Word(chars[start..pos].iter().collect()),
                line,
                column,
            });
            continue;
        }

        let token = match c {
            '{' => Token::LBrace,
            '}' => Token::RBrace,
            ':' => Token::Colon,
            '!' => Token::Bang,
            ',' => Token::Comma,
            ';' => Token::Semicolon,
            _ => {
                return Err(SchemaSyntaxError::new(
                    line,
                    column,
                    format!("unexpected character '{}'", c),
                ))
            }
        };
        tokens.push(Spanned {
            token,
            line,
            column,
        });
        pos += 1;
    }

    tokens.push(Spanned {
        token: Token::Eof,
        line,
        column: (pos - line_start) as u32 + 1,
    });
    Ok(tokens)
}
