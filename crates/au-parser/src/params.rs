use std::sync::OnceLock;

use au_core::ParameterDeclaration;
use regex::Regex;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParameterParseError {
    #[error("Empty parameter at position {position}.")]
    EmptyParameter { position: usize },
    #[error("Invalid parameter \"{text}\" at position {position}.")]
    InvalidParameter { position: usize, text: String },
    #[error("Modifier \"{modifier}\" repeated in parameter {position}.")]
    RepeatedModifier { position: usize, modifier: String },
    #[error("Missing default value for parameter {position}.")]
    EmptyDefault { position: usize },
}

/// Parses the text between the parentheses of a function declaration.
pub fn parse_parameter_list(raw: &str) -> Result<Vec<ParameterDeclaration>, ParameterParseError> {
    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }

    let segments = split_items(raw);
    let mut params = Vec::with_capacity(segments.len());

    for (index, segment) in segments.iter().enumerate() {
        params.push(parse_parameter(index + 1, segment)?);
    }

    Ok(params)
}

fn parse_parameter(position: usize, segment: &str) -> Result<ParameterDeclaration, ParameterParseError> {
    if segment.is_empty() {
        return Err(ParameterParseError::EmptyParameter { position });
    }

    let (head, default_value) = match split_default(segment) {
        Some((head, value)) => {
            let value = value.trim();
            if value.is_empty() {
                return Err(ParameterParseError::EmptyDefault { position });
            }
            (head.trim(), Some(value.to_string()))
        }
        None => (segment, None),
    };

    let mut is_byref = false;
    let mut is_const = false;
    let mut rest = head;

    while let Some(caps) = modifier_regex().captures(rest) {
        let Some(modifier) = caps.get(1) else {
            break;
        };
        let flag = if modifier.as_str().eq_ignore_ascii_case("byref") {
            &mut is_byref
        } else {
            &mut is_const
        };
        if *flag {
            return Err(ParameterParseError::RepeatedModifier {
                position,
                modifier: modifier.as_str().to_string(),
            });
        }
        *flag = true;
        rest = &rest[caps.get(0).map_or(0, |m| m.end())..];
    }

    let Some(caps) = identifier_regex().captures(rest.trim()) else {
        return Err(ParameterParseError::InvalidParameter {
            position,
            text: segment.to_string(),
        });
    };
    let name = caps.get(1).map_or("", |m| m.as_str());

    let mut param = ParameterDeclaration::required(name);
    param.is_byref = is_byref;
    param.is_const = is_const;
    param.default_value = default_value;
    Ok(param)
}

/// Splits `name = value` at the first `=` outside of quotes.
fn split_default(segment: &str) -> Option<(&str, &str)> {
    let mut quote: Option<char> = None;
    for (index, ch) in segment.char_indices() {
        if let Some(active_quote) = quote {
            if ch == active_quote {
                quote = None;
            }
            continue;
        }
        match ch {
            '\'' | '"' => quote = Some(ch),
            '=' => return Some((&segment[..index], &segment[index + 1..])),
            _ => {}
        }
    }
    None
}

/// Splits at commas outside quotes and outside `()`, `[]` and `{}`. Every
/// item is kept, so empty items stay visible to the caller.
fn split_items(raw: &str) -> Vec<&str> {
    let mut items = Vec::new();
    let mut depth = 0usize;
    let mut quote = None;
    let mut start = 0;

    for (index, ch) in raw.char_indices() {
        match (quote, ch) {
            (Some(open), _) if ch == open => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(ch),
            (None, '(' | '[' | '{') => depth += 1,
            (None, ')' | ']' | '}') => depth = depth.saturating_sub(1),
            (None, ',') if depth == 0 => {
                items.push(raw[start..index].trim());
                start = index + 1;
            }
            _ => {}
        }
    }

    items.push(raw[start..].trim());
    items
}

fn modifier_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"(?i)^\s*(byref|const)\s+").expect("modifier regex"))
}

fn identifier_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"(?i)^\$?([a-z_][a-z0-9_]*)$").expect("parameter identifier regex")
    })
}
