//! Contract source lexer: raw text to logical statements.
//!
//! In order, for each physical line:
//!   1. strip everything from the first `#` to end of line
//!   2. trim boundary whitespace and drop blank lines
//!   3. join lines ending in `\` with the following (cleaned) line
//!
//! Comment stripping is not quote-aware: a `#` inside a quoted literal still
//! starts a comment, so `f("#")` lexes to `f("`. Contract authors must avoid
//! `#` in string literals.

use crate::error::CompileError;

const COMMENT: char = '#';
const CONTINUATION: char = '\\';

fn clean_line(line: &str) -> &str {
    let line = match line.find(COMMENT) {
        Some(i) => &line[..i],
        None => line,
    };
    line.trim()
}

/// Split contract source text into logical statements.
pub fn logical_statements(src: &str) -> Result<Vec<String>, CompileError> {
    statements_from_lines(src.lines())
}

/// Same as [`logical_statements`] for source already split into lines
/// (e.g. a YAML list). Entries may themselves contain newlines.
pub fn statements_from_lines<'a, I>(lines: I) -> Result<Vec<String>, CompileError>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut physical = lines.into_iter().flat_map(|l| l.lines()).enumerate();
    let mut out = Vec::new();

    while let Some((idx, raw)) = physical.next() {
        let mut line = clean_line(raw).to_owned();
        let mut last = idx;
        while line.ends_with(CONTINUATION) {
            line.pop();
            match physical.next() {
                Some((next_idx, next)) => {
                    line.push_str(clean_line(next));
                    last = next_idx;
                }
                None => {
                    return Err(CompileError::UnexpectedEndOfInput {
                        line: last as u32 + 1,
                    })
                }
            }
        }
        if !line.trim().is_empty() {
            out.push(line);
        }
    }

    Ok(out)
}
