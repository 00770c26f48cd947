//! Splitting of multi-statement SQL scripts.
//!
//! Embedded engines only accept one statement per query call, so scripts are
//! cut on `;` outside of string literals, quoted identifiers and comments.

/// Lexical state while scanning a script.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Code,
    Quoted(char),
    LineComment,
    BlockComment,
}

/// Splits `script` on `separator` wherever it appears in plain code.
///
/// Separators inside `'...'`, `"..."` and `` `...` `` literals (a doubled
/// quote stays inside the literal), `-- ...` line comments and `/* ... */`
/// block comments are kept. The split is lossless: joining the segments with
/// `separator` yields `script` again.
pub fn split_raw(script: &str, separator: char) -> Vec<&str> {
    let mut segments = Vec::new();
    let mut state = State::Code;
    let mut start = 0;
    let mut chars = script.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        match state {
            State::Code => {
                if c == separator {
                    segments.push(&script[start..i]);
                    start = i + c.len_utf8();
                } else if c == '\'' || c == '"' || c == '`' {
                    state = State::Quoted(c);
                } else if c == '-' && matches!(chars.peek(), Some((_, '-'))) {
                    chars.next();
                    state = State::LineComment;
                } else if c == '/' && matches!(chars.peek(), Some((_, '*'))) {
                    chars.next();
                    state = State::BlockComment;
                }
            }
            State::Quoted(quote) => {
                // A doubled quote closes and reopens, which leaves us quoted.
                if c == quote {
                    state = State::Code;
                }
            }
            State::LineComment => {
                if c == '\n' {
                    state = State::Code;
                }
            }
            State::BlockComment => {
                if c == '*' && matches!(chars.peek(), Some((_, '/'))) {
                    chars.next();
                    state = State::Code;
                }
            }
        }
    }

    segments.push(&script[start..]);
    segments
}

/// Returns the trimmed statements of `script` in source order.
///
/// Segments holding only whitespace and comments are dropped.
pub fn statements(script: &str) -> Vec<&str> {
    split_raw(script, ';')
        .into_iter()
        .map(str::trim)
        .filter(|s| has_code(s))
        .collect()
}

/// True when `segment` contains something other than whitespace and comments.
fn has_code(segment: &str) -> bool {
    let mut rest = segment.trim_start();
    loop {
        if let Some(after) = rest.strip_prefix("--") {
            rest = after.split_once('\n').map_or("", |(_, tail)| tail).trim_start();
        } else if let Some(after) = rest.strip_prefix("/*") {
            rest = after.split_once("*/").map_or("", |(_, tail)| tail).trim_start();
        } else {
            return !rest.is_empty();
        }
    }
}

/// Appends `;` to a statement, on a new line when a trailing line comment
/// would otherwise swallow it.
pub fn terminate(statement: &str) -> String {
    if ends_in_line_comment(statement) {
        format!("{statement}\n;")
    } else {
        format!("{statement};")
    }
}

fn ends_in_line_comment(statement: &str) -> bool {
    statement.lines().last().is_some_and(|line| line.contains("--"))
}

/// A script cut into the statements that must run before the final query
/// and the final query itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Script<'a> {
    statements: Vec<&'a str>,
}

impl<'a> Script<'a> {
    pub fn parse(sql: &'a str) -> Self {
        Self {
            statements: statements(sql),
        }
    }

    pub fn statements(&self) -> &[&'a str] {
        &self.statements
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    /// Every statement but the last, joined into one batch, or `None` when
    /// the script is a single statement.
    pub fn prelude(&self) -> Option<String> {
        let (_, rest) = self.statements.split_last()?;
        if rest.is_empty() {
            return None;
        }

        let mut batch = String::new();
        for statement in rest {
            if !batch.is_empty() {
                batch.push_str(";\n");
            }
            batch.push_str(statement);
            if ends_in_line_comment(statement) {
                batch.push('\n');
            }
        }
        Some(batch)
    }

    /// The statement whose result is returned.
    pub fn last(&self) -> Option<&'a str> {
        self.statements.last().copied()
    }
}
