//! Placeholder parsing and substitution for fixture templates.
//!
//! Static fixture files carry placeholders for values that are only known
//! once a version has been chosen (a runtime version in `runtime.txt`, a Go
//! version in `Godeps.json`, and so on).
//!
//! # Placeholder Format
//!
//! - `$${var:NAME}` - the value bound to `NAME` for this generation
//!
//! # Shell Variables
//!
//! Single `$` characters pass through unchanged, so `$PORT` in a Procfile or
//! `$HOME` in a profile script is copied as written.
//!
//! # Escaping
//!
//! Use `$$$` before `{` to produce a literal `$${` sequence.
//!
//! # Example
//!
//! ```
//! use brats_lib::placeholder::{parse, Segment, Placeholder};
//!
//! let segments = parse("python-$${var:python_version}").unwrap();
//! assert_eq!(segments, vec![
//!     Segment::Literal("python-".to_string()),
//!     Segment::Placeholder(Placeholder::Var("python_version".to_string())),
//! ]);
//! ```

use std::collections::BTreeMap;

use thiserror::Error;

/// A parsed placeholder reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placeholder {
  /// `$${var:NAME}`
  Var(String),
}

/// A segment of parsed text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
  /// Literal text (no placeholders)
  Literal(String),

  /// A placeholder to be resolved
  Placeholder(Placeholder),
}

/// Errors that can occur during placeholder parsing or resolution.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlaceholderError {
  #[error("unclosed placeholder at position {0}")]
  Unclosed(usize),

  #[error("unknown placeholder type: {0}")]
  UnknownType(String),

  #[error("malformed placeholder: {0}")]
  Malformed(String),

  #[error("unresolved variable: {0}")]
  UnresolvedVar(String),
}

/// Supplies values for placeholders.
pub trait Resolver {
  fn resolve_var(&self, name: &str) -> Result<&str, PlaceholderError>;
}

/// Name/value bindings for one fixture generation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Vars {
  values: BTreeMap<String, String>,
}

impl Vars {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with(mut self, name: &str, value: impl Into<String>) -> Self {
    self.insert(name, value);
    self
  }

  pub fn insert(&mut self, name: &str, value: impl Into<String>) {
    self.values.insert(name.to_string(), value.into());
  }

  pub fn get(&self, name: &str) -> Option<&str> {
    self.values.get(name).map(String::as_str)
  }
}

impl Resolver for Vars {
  fn resolve_var(&self, name: &str) -> Result<&str, PlaceholderError> {
    self
      .get(name)
      .ok_or_else(|| PlaceholderError::UnresolvedVar(name.to_string()))
  }
}

/// Parse a string containing placeholders into segments.
///
/// # Errors
///
/// Returns an error if a placeholder is unclosed, has an unknown type or an
/// empty name.
pub fn parse(input: &str) -> Result<Vec<Segment>, PlaceholderError> {
  let mut segments = Vec::new();
  let mut literal = String::new();
  let mut chars = input.char_indices().peekable();

  while let Some((pos, ch)) = chars.next() {
    if ch != '$' {
      literal.push(ch);
      continue;
    }

    if !matches!(chars.peek(), Some((_, '$'))) {
      // lone $ (shell variable)
      literal.push('$');
      continue;
    }
    chars.next();

    match chars.peek() {
      Some((_, '$')) => {
        chars.next();
        if matches!(chars.peek(), Some((_, '{'))) {
          chars.next();
          literal.push_str("$${");
        } else {
          literal.push_str("$$$");
        }
      }
      Some((_, '{')) => {
        chars.next();

        if !literal.is_empty() {
          segments.push(Segment::Literal(std::mem::take(&mut literal)));
        }

        let mut content = String::new();
        let mut found_close = false;
        for (_, c) in chars.by_ref() {
          if c == '}' {
            found_close = true;
            break;
          }
          content.push(c);
        }

        if !found_close {
          return Err(PlaceholderError::Unclosed(pos));
        }

        segments.push(Segment::Placeholder(parse_placeholder_content(&content)?));
      }
      _ => literal.push_str("$$"),
    }
  }

  if !literal.is_empty() {
    segments.push(Segment::Literal(literal));
  }

  Ok(segments)
}

/// Parse the content between `$${` and `}`.
fn parse_placeholder_content(content: &str) -> Result<Placeholder, PlaceholderError> {
  let (kind, rest) = content
    .split_once(':')
    .ok_or_else(|| PlaceholderError::Malformed(format!("missing colon in '{content}'")))?;

  match kind {
    "var" => {
      let name = rest.trim();
      if name.is_empty() {
        return Err(PlaceholderError::Malformed(format!("empty variable name in '{content}'")));
      }
      Ok(Placeholder::Var(name.to_string()))
    }
    _ => Err(PlaceholderError::UnknownType(kind.to_string())),
  }
}

/// Whether `input` contains anything that needs substitution or unescaping.
pub fn needs_rendering(input: &str) -> bool {
  input.contains("$${") || input.contains("$$$")
}

/// Parse and substitute in one step.
pub fn substitute(input: &str, resolver: &impl Resolver) -> Result<String, PlaceholderError> {
  let segments = parse(input)?;
  substitute_segments(&segments, resolver)
}

/// Substitute placeholders in pre-parsed segments.
pub fn substitute_segments(segments: &[Segment], resolver: &impl Resolver) -> Result<String, PlaceholderError> {
  let mut result = String::new();

  for segment in segments {
    match segment {
      Segment::Literal(s) => result.push_str(s),
      Segment::Placeholder(Placeholder::Var(name)) => result.push_str(resolver.resolve_var(name)?),
    }
  }

  Ok(result)
}
