//! Parsing of JSON objects that are still being streamed
//!
//! A model asked for `{"latex": "..."}` produces the object a few characters
//! at a time. [`repair`] closes whatever is open in such a prefix (strings,
//! arrays, objects) and cuts away the parts that cannot be completed yet
//! (a half-written key, a dangling `:` or `,`, a half-typed escape), so the
//! result parses as the object seen so far.

use serde::de::DeserializeOwned;
use texdraft_common::{Result, TexdraftError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Expect {
    Key,
    Colon,
    Value,
    CommaOrClose,
}

#[derive(Debug)]
struct Frame {
    closer: char,
    expect: Expect,
    /// Byte offset just past the last complete member
    last_complete: usize,
    members: usize,
}

impl Frame {
    fn open(closer: char, at: usize) -> Self {
        Frame {
            closer,
            expect: if closer == '}' { Expect::Key } else { Expect::Value },
            last_complete: at,
            members: 0,
        }
    }

    fn is_object(&self) -> bool {
        self.closer == '}'
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StringRole {
    Key,
    Value,
}

/// Complete a (possibly truncated) JSON object or array text.
///
/// Returns `None` when the text does not start a JSON container or is not
/// valid JSON up to the point where it stops.
pub fn repair(text: &str) -> Option<String> {
    let text = strip_fence(text);
    let mut stack: Vec<Frame> = Vec::new();
    let mut string: Option<StringRole> = None;
    let mut escape = false;
    let mut unicode_left = 0usize;
    let mut literal: Option<usize> = None;

    for (i, c) in text.char_indices() {
        if let Some(role) = string {
            if unicode_left > 0 {
                if !c.is_ascii_hexdigit() {
                    return None;
                }
                unicode_left -= 1;
            } else if escape {
                escape = false;
                if c == 'u' {
                    unicode_left = 4;
                }
            } else if c == '\\' {
                escape = true;
            } else if c == '"' {
                string = None;
                let top = stack.last_mut()?;
                match role {
                    StringRole::Key => top.expect = Expect::Colon,
                    StringRole::Value => complete_value(top, i + 1),
                }
            }
            continue;
        }

        if let Some(start) = literal {
            if c.is_whitespace() || matches!(c, ',' | '}' | ']') {
                if !is_scalar(&text[start..i]) {
                    return None;
                }
                literal = None;
                complete_value(stack.last_mut()?, i);
            } else {
                continue;
            }
        }

        if c.is_whitespace() {
            continue;
        }

        match c {
            '{' | '[' => {
                if let Some(top) = stack.last() {
                    if top.expect != Expect::Value {
                        return None;
                    }
                } else if i != 0 {
                    return None;
                }
                stack.push(Frame::open(if c == '{' { '}' } else { ']' }, i + 1));
            }
            '}' | ']' => {
                let top = stack.last()?;
                let opening_expect = if top.is_object() { Expect::Key } else { Expect::Value };
                let empty_close = top.members == 0 && top.expect == opening_expect;
                if top.closer != c || !(top.expect == Expect::CommaOrClose || empty_close) {
                    return None;
                }
                stack.pop();
                match stack.last_mut() {
                    Some(parent) => complete_value(parent, i + 1),
                    // Top-level container closed; anything after it is ignored.
                    None => return Some(text[..=i].to_string()),
                }
            }
            '"' => {
                let top = stack.last()?;
                string = match top.expect {
                    Expect::Key if top.is_object() => Some(StringRole::Key),
                    Expect::Value => Some(StringRole::Value),
                    _ => return None,
                };
            }
            ':' => {
                let top = stack.last_mut()?;
                if top.expect != Expect::Colon {
                    return None;
                }
                top.expect = Expect::Value;
            }
            ',' => {
                let top = stack.last_mut()?;
                if top.expect != Expect::CommaOrClose {
                    return None;
                }
                top.expect = if top.is_object() { Expect::Key } else { Expect::Value };
            }
            '-' | '0'..='9' | 't' | 'f' | 'n' => {
                if stack.last()?.expect != Expect::Value {
                    return None;
                }
                literal = Some(i);
            }
            _ => return None,
        }
    }

    let top = stack.last()?;
    let mut out = text.to_string();

    match (string, literal) {
        (Some(StringRole::Value), _) => {
            if unicode_left > 0 {
                // Drop the `\u` and the hex digits typed so far.
                out.truncate(out.len() - (2 + 4 - unicode_left));
            } else if escape {
                out.pop();
            }
            out.push('"');
        }
        (Some(StringRole::Key), _) => out.truncate(top.last_complete),
        (None, Some(start)) => {
            let completed = complete_scalar(&text[start..]);
            out.truncate(start);
            match completed {
                Some(scalar) => out.push_str(&scalar),
                None => out.truncate(top.last_complete),
            }
        }
        (None, None) => {
            if top.expect != Expect::CommaOrClose {
                out.truncate(top.last_complete);
            }
        }
    }

    for frame in stack.iter().rev() {
        out.push(frame.closer);
    }
    Some(out)
}

/// Repair a streamed prefix and deserialize it.
///
/// Fails with a validation error when the prefix is not repairable JSON or
/// does not match the shape of `T`.
pub fn parse_partial<T: DeserializeOwned>(text: &str) -> Result<T> {
    let repaired = repair(text).ok_or_else(|| {
        TexdraftError::Validation("stream does not hold a JSON object prefix".to_string())
    })?;
    serde_json::from_str(&repaired).map_err(|e| TexdraftError::Validation(e.to_string()))
}

fn complete_value(frame: &mut Frame, at: usize) {
    frame.expect = Expect::CommaOrClose;
    frame.last_complete = at;
    frame.members += 1;
}

fn is_scalar(token: &str) -> bool {
    serde_json::from_str::<serde_json::Value>(token).is_ok()
}

/// Finish a literal cut off at end of input, e.g. `tr` -> `true`, `12.` -> `12`
fn complete_scalar(token: &str) -> Option<String> {
    if is_scalar(token) {
        return Some(token.to_string());
    }
    for word in ["true", "false", "null"] {
        if word.starts_with(token) {
            return Some(word.to_string());
        }
    }
    let trimmed = token.trim_end_matches(['.', 'e', 'E', '+', '-']);
    is_scalar(trimmed).then(|| trimmed.to_string())
}

/// Skip leading whitespace and an opening markdown code fence
fn strip_fence(text: &str) -> &str {
    let text = text.trim_start();
    match text.strip_prefix("```") {
        Some(rest) => rest.trim_start_matches("json").trim_start(),
        None => text,
    }
}
