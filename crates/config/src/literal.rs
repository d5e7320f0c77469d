//! Parser for the structured literals accepted on the command line and in environment variables.
//!
//! The accepted grammar is deliberately small and never evaluates code:
//!
//! ```text
//! value  := none | bool | number | string | list | tuple | dict
//! none   := "None" | "null"
//! bool   := "True" | "False" | "true" | "false"
//! number := ["-"|"+"] digits ["." digits] [("e"|"E") ["-"|"+"] digits]
//! string := '...' | "..."            (escapes: \\ \' \" \n \t \r)
//! list   := "[" [value ("," value)* [","]] "]"
//! tuple  := "(" [value ("," value)* [","]] ")"     read as a list
//! dict   := "{" [string ":" value ("," string ":" value)* [","]] "}"
//! ```
//!
//! Bare words, sets, unterminated input and trailing characters are errors.

use crate::error::ConfigError;
use crate::value::Value;
use std::borrow::Cow;
use std::collections::BTreeMap;

const MAX_DEPTH: usize = 64;

/// Parses `input` as a single literal value.
///
/// # Errors
/// Returns [`ConfigError::Literal`] with the byte offset of the first problem.
pub fn parse_literal(input: &str) -> Result<Value, ConfigError> {
    let mut parser = Parser { input, pos: 0, depth: 0 };
    parser.skip_ws();
    let value = parser.value()?;
    parser.skip_ws();
    if parser.pos < input.len() {
        return Err(parser.error("unexpected trailing characters"));
    }
    Ok(value)
}

struct Parser<'a> {
    input: &'a str,
    pos: usize,
    depth: usize,
}

impl Parser<'_> {
    fn error(&self, message: impl Into<Cow<'static, str>>) -> ConfigError {
        ConfigError::Literal {
            input: self.input.to_owned(),
            offset: self.pos,
            message: message.into(),
            context: None,
        }
    }

    fn rest(&self) -> &str {
        &self.input[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    fn value(&mut self) -> Result<Value, ConfigError> {
        match self.peek() {
            None => Err(self.error("expected a value")),
            Some('[') => self.sequence(']'),
            Some('(') => self.sequence(')'),
            Some('{') => self.dict(),
            Some(q @ ('\'' | '"')) => self.string(q).map(Value::Str),
            Some(c) if c.is_ascii_digit() || matches!(c, '-' | '+' | '.') => self.number(),
            Some(c) if c.is_alphabetic() || c == '_' => self.keyword(),
            Some(c) => Err(self.error(format!("unexpected character '{c}'"))),
        }
    }

    fn enter(&mut self) -> Result<(), ConfigError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(self.error("literal is nested too deeply"));
        }
        Ok(())
    }

    fn sequence(&mut self, close: char) -> Result<Value, ConfigError> {
        self.enter()?;
        self.bump();
        let mut items = Vec::new();
        loop {
            self.skip_ws();
            if self.peek() == Some(close) {
                self.bump();
                break;
            }
            items.push(self.value()?);
            self.skip_ws();
            match self.bump() {
                Some(',') => {},
                Some(c) if c == close => break,
                Some(_) => {
                    self.pos -= 1;
                    return Err(self.error(format!("expected ',' or '{close}'")));
                },
                None => return Err(self.error(format!("unterminated sequence, missing '{close}'"))),
            }
        }
        self.depth -= 1;
        Ok(Value::List(items))
    }

    fn dict(&mut self) -> Result<Value, ConfigError> {
        self.enter()?;
        self.bump();
        let mut map = BTreeMap::new();
        loop {
            self.skip_ws();
            match self.peek() {
                Some('}') => {
                    self.bump();
                    break;
                },
                Some(q @ ('\'' | '"')) => {
                    let key = self.string(q)?;
                    self.skip_ws();
                    if self.bump() != Some(':') {
                        return Err(self.error("expected ':' after dict key"));
                    }
                    self.skip_ws();
                    let value = self.value()?;
                    map.insert(key, value);
                },
                None => return Err(self.error("unterminated dict, missing '}'")),
                Some(_) => return Err(self.error("dict keys must be quoted strings")),
            }
            self.skip_ws();
            match self.bump() {
                Some(',') => {},
                Some('}') => break,
                None => return Err(self.error("unterminated dict, missing '}'")),
                Some(_) => return Err(self.error("expected ',' or '}'")),
            }
        }
        self.depth -= 1;
        Ok(Value::Dict(map))
    }

    fn string(&mut self, quote: char) -> Result<String, ConfigError> {
        let start = self.pos;
        self.bump();
        let mut out = String::new();
        loop {
            match self.bump() {
                None => {
                    self.pos = start;
                    return Err(self.error("unterminated string"));
                },
                Some(c) if c == quote => return Ok(out),
                Some('\\') => match self.bump() {
                    Some('n') => out.push('\n'),
                    Some('t') => out.push('\t'),
                    Some('r') => out.push('\r'),
                    Some(c @ ('\\' | '\'' | '"')) => out.push(c),
                    Some(c) => {
                        out.push('\\');
                        out.push(c);
                    },
                    None => {
                        self.pos = start;
                        return Err(self.error("unterminated string"));
                    },
                },
                Some(c) => out.push(c),
            }
        }
    }

    fn number(&mut self) -> Result<Value, ConfigError> {
        let start = self.pos;
        let len = self
            .rest()
            .char_indices()
            .find(|&(i, c)| {
                let sign_ok = matches!(c, '-' | '+')
                    && (i == 0 || matches!(self.rest()[..i].chars().last(), Some('e' | 'E')));
                !(c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '_') || sign_ok)
            })
            .map_or(self.rest().len(), |(i, _)| i);
        let token = &self.input[start..start + len];
        let cleaned = token.replace('_', "");

        let parsed = if cleaned.contains(['.', 'e', 'E']) {
            cleaned.parse::<f64>().ok().map(Value::Float)
        } else {
            cleaned.parse::<i64>().ok().map(Value::Int)
        };

        match parsed {
            Some(value) => {
                self.pos = start + len;
                Ok(value)
            },
            None => Err(self.error(format!("invalid number '{token}'"))),
        }
    }

    fn keyword(&mut self) -> Result<Value, ConfigError> {
        let len = self
            .rest()
            .char_indices()
            .find(|&(_, c)| !(c.is_alphanumeric() || c == '_'))
            .map_or(self.rest().len(), |(i, _)| i);
        let word = &self.input[self.pos..self.pos + len];
        let value = match word {
            "None" | "null" => Value::Null,
            "True" | "true" => Value::Bool(true),
            "False" | "false" => Value::Bool(false),
            _ => return Err(self.error(format!("unquoted word '{word}'"))),
        };
        self.pos += len;
        Ok(value)
    }
}
