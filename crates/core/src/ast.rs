//! Compiled contract AST.
//!
//! A contract statement compiles to a [`ContractExpression`]: an explicit call
//! tree walked by the evaluator's verb table. Nothing here is ever turned back
//! into executable text; [`fmt::Display`] renders the canonical form used in
//! diagnostics.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CompileError;

// ──────────────────────────────────────────────
// Paths
// ──────────────────────────────────────────────

/// One step into a nested map/sequence value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

/// Ordered key/index segments identifying a location inside a nested value.
///
/// Text form: `a.b[0]["odd key"]`. [`Path::parse`] and `Display` round-trip.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Path(Vec<PathSegment>);

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn is_plain_key(key: &str) -> bool {
    !key.is_empty() && key.chars().all(is_ident_char)
}

impl Path {
    /// The empty path, addressing the root value itself.
    pub fn root() -> Self {
        Path(Vec::new())
    }

    pub fn from_segments(segments: Vec<PathSegment>) -> Self {
        Path(segments)
    }

    /// A single-key path.
    pub fn key(key: impl Into<String>) -> Self {
        Path(vec![PathSegment::Key(key.into())])
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn push(&mut self, segment: PathSegment) {
        self.0.push(segment);
    }

    /// Parse a dotted/bracketed path such as `model.inputs[0]["raw data"]`.
    /// Inside a quoted key, `\` escapes the next character.
    pub fn parse(text: &str) -> Result<Path, CompileError> {
        let invalid = |message: &str| CompileError::InvalidPath {
            path: text.to_owned(),
            message: message.to_owned(),
        };

        let chars: Vec<char> = text.trim().chars().collect();
        if chars.is_empty() {
            return Err(invalid("empty path"));
        }

        let mut segments = Vec::new();
        let mut pos = 0usize;
        loop {
            if chars[pos] == '[' {
                pos += 1;
                let Some(&open) = chars.get(pos) else {
                    return Err(invalid("unterminated '['"));
                };
                if open == '"' || open == '\'' {
                    pos += 1;
                    let mut key = String::new();
                    loop {
                        match chars.get(pos) {
                            None => return Err(invalid("unterminated quoted key")),
                            Some(&c) if c == open => break,
                            Some('\\') => {
                                let Some(&escaped) = chars.get(pos + 1) else {
                                    return Err(invalid("unterminated quoted key"));
                                };
                                key.push(escaped);
                                pos += 2;
                            }
                            Some(&c) => {
                                key.push(c);
                                pos += 1;
                            }
                        }
                    }
                    segments.push(PathSegment::Key(key));
                    pos += 1;
                } else if open.is_ascii_digit() {
                    let start = pos;
                    while pos < chars.len() && chars[pos].is_ascii_digit() {
                        pos += 1;
                    }
                    let digits: String = chars[start..pos].iter().collect();
                    let index = digits
                        .parse::<usize>()
                        .map_err(|_| invalid("index out of range"))?;
                    segments.push(PathSegment::Index(index));
                } else {
                    return Err(invalid("expected quoted key or index after '['"));
                }
                if chars.get(pos) != Some(&']') {
                    return Err(invalid("expected ']'"));
                }
                pos += 1;
            } else if is_ident_char(chars[pos]) {
                let start = pos;
                while pos < chars.len() && is_ident_char(chars[pos]) {
                    pos += 1;
                }
                segments.push(PathSegment::Key(chars[start..pos].iter().collect()));
            } else {
                return Err(invalid(&format!("unexpected character '{}'", chars[pos])));
            }

            match chars.get(pos) {
                None => break,
                Some('[') => {}
                Some('.') => {
                    pos += 1;
                    if !chars.get(pos).copied().is_some_and(is_ident_char) {
                        return Err(invalid("expected key after '.'"));
                    }
                }
                Some(c) => return Err(invalid(&format!("unexpected character '{}'", c))),
            }
        }

        Ok(Path(segments))
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, seg) in self.0.iter().enumerate() {
            match seg {
                PathSegment::Key(k) if is_plain_key(k) => {
                    if i > 0 {
                        f.write_str(".")?;
                    }
                    f.write_str(k)?;
                }
                PathSegment::Key(k) => {
                    let quote = if k.contains('"') && !k.contains('\'') { '\'' } else { '"' };
                    write!(f, "[{}", quote)?;
                    for c in k.chars() {
                        if c == quote || c == '\\' {
                            f.write_str("\\")?;
                        }
                        write!(f, "{}", c)?;
                    }
                    write!(f, "{}]", quote)?;
                }
                PathSegment::Index(n) => write!(f, "[{}]", n)?,
            }
        }
        Ok(())
    }
}

impl From<Vec<PathSegment>> for Path {
    fn from(segments: Vec<PathSegment>) -> Self {
        Path(segments)
    }
}

// ──────────────────────────────────────────────
// Expressions
// ──────────────────────────────────────────────

/// A literal argument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Literal {
    Null,
    Bool(bool),
    Int(i64),
    /// Decimal literal -- kept as written so compilation stays bit-exact.
    Float(String),
    Str(String),
}

/// Where a reference is rooted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    /// The invocation's execution context.
    Context,
    /// `$this`: the owning root object of the form.
    This,
    /// `$self`: the owner's name.
    SelfName,
    /// `$form`: the sub-form's name.
    Form,
}

/// A reference resolved against the execution environment at evaluation time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextRef {
    pub scope: Scope,
    pub path: Path,
}

impl ContextRef {
    /// The whole execution context (bare `context`).
    pub fn context() -> Self {
        ContextRef {
            scope: Scope::Context,
            path: Path::root(),
        }
    }

    pub fn key(key: impl Into<String>) -> Self {
        ContextRef {
            scope: Scope::Context,
            path: Path::key(key),
        }
    }
}

/// A verb applied to ordered arguments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Call {
    pub verb: String,
    pub args: Vec<Expr>,
}

impl Call {
    pub fn new(verb: impl Into<String>, args: Vec<Expr>) -> Self {
        Call {
            verb: verb.into(),
            args,
        }
    }
}

/// A node of the call tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expr {
    Call(Call),
    Literal(Literal),
    Ref(ContextRef),
}

impl Expr {
    pub fn call(verb: impl Into<String>, args: Vec<Expr>) -> Self {
        Expr::Call(Call::new(verb, args))
    }

    pub fn str(s: impl Into<String>) -> Self {
        Expr::Literal(Literal::Str(s.into()))
    }

    /// True if a call to `verb` appears anywhere in this tree.
    pub fn mentions_verb(&self, verb: &str) -> bool {
        match self {
            Expr::Call(call) => {
                call.verb == verb || call.args.iter().any(|a| a.mentions_verb(verb))
            }
            Expr::Literal(_) | Expr::Ref(_) => false,
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Null => f.write_str("null"),
            Literal::Bool(b) => write!(f, "{}", b),
            Literal::Int(n) => write!(f, "{}", n),
            Literal::Float(s) => f.write_str(s),
            Literal::Str(s) => {
                let quoted = serde_json::to_string(s).map_err(|_| fmt::Error)?;
                f.write_str(&quoted)
            }
        }
    }
}

impl fmt::Display for ContextRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let root = match self.scope {
            Scope::Context if self.path.is_empty() => return f.write_str("context"),
            Scope::Context => "",
            Scope::This => "this",
            Scope::SelfName => "self",
            Scope::Form => "form",
        };
        f.write_str("$")?;
        f.write_str(root)?;
        if root.is_empty() || self.path.is_empty() {
            return write!(f, "{}", self.path);
        }
        match self.path.segments().first() {
            Some(PathSegment::Key(k)) if is_plain_key(k) => write!(f, ".{}", self.path),
            _ => write!(f, "{}", self.path),
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Call(call) => {
                write!(f, "{}(", call.verb)?;
                for (i, arg) in call.args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                f.write_str(")")
            }
            Expr::Literal(lit) => write!(f, "{}", lit),
            Expr::Ref(r) => write!(f, "{}", r),
        }
    }
}

// ──────────────────────────────────────────────
// Programs
// ──────────────────────────────────────────────

/// Contract phase: pre-condition or post-condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Expect,
    Finish,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Expect => "expect",
            Phase::Finish => "finish",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One compiled statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractExpression {
    /// The logical statement this was compiled from.
    pub source: String,
    /// Assignment target, if the statement writes into the context. The write
    /// itself is the trailing `assign` call in `tree`.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub target: Option<Path>,
    pub tree: Expr,
}

impl fmt::Display for ContractExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tree)
    }
}

/// An ordered list of compiled statements for one phase of one form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractProgram {
    pub form: String,
    pub phase: Phase,
    pub expressions: Vec<ContractExpression>,
}

impl ContractProgram {
    pub fn new(form: impl Into<String>, phase: Phase, expressions: Vec<ContractExpression>) -> Self {
        ContractProgram {
            form: form.into(),
            phase,
            expressions,
        }
    }

    pub fn empty(form: impl Into<String>, phase: Phase) -> Self {
        ContractProgram::new(form, phase, Vec::new())
    }

    pub fn len(&self) -> usize {
        self.expressions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.expressions.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ContractExpression> {
        self.expressions.iter()
    }

    /// Canonical text of every statement, one per entry.
    pub fn render(&self) -> Vec<String> {
        self.expressions.iter().map(|e| e.to_string()).collect()
    }
}
