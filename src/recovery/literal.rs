//! Permissive parser for Python-style literals.
//!
//! Models asked for JSON sometimes answer with `{'a': True, 'b': None}`.
//! This accepts dicts, lists, tuples, sets, quoted strings (either quote,
//! adjacent strings concatenate), numbers, `True`, `False` and `None`,
//! with trailing commas, and maps them onto JSON values.

use serde_json::{ Map, Number, Value as JsonValue };
use thiserror::Error;

/// Container nesting limit, the same one `serde_json` applies.
pub const MAX_DEPTH: usize = 128;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("{message} at offset {offset}")]
pub struct LiteralError {
    pub offset: usize,
    pub message: String,
}

pub fn parse(text: &str) -> Result<JsonValue, LiteralError> {
    let mut parser = Parser { src: text, pos: 0, depth: 0 };
    let value = parser.value()?;
    parser.skip_ws();
    if parser.pos < parser.src.len() {
        return Err(parser.error("unexpected trailing input"));
    }
    Ok(value)
}

struct Parser<'a> {
    src: &'a str,
    pos: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn error(&self, message: &str) -> LiteralError {
        LiteralError { offset: self.pos, message: message.to_string() }
    }

    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_ws(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_whitespace() {
                self.pos += c.len_utf8();
            } else {
                break;
            }
        }
    }

    fn eat(&mut self, expected: char) -> bool {
        self.skip_ws();
        if self.peek() == Some(expected) {
            self.pos += expected.len_utf8();
            true
        } else {
            false
        }
    }

    fn value(&mut self) -> Result<JsonValue, LiteralError> {
        self.skip_ws();
        match self.peek() {
            Some('{' | '[' | '(') => self.container(),
            Some('\'') | Some('"') => self.strings(),
            Some(c) if c.is_ascii_digit() || c == '-' || c == '+' || c == '.' => self.number(),
            Some(c) if c.is_alphabetic() => self.keyword(),
            Some(_) => Err(self.error("unexpected character")),
            None => Err(self.error("unexpected end of input")),
        }
    }

    fn container(&mut self) -> Result<JsonValue, LiteralError> {
        if self.depth >= MAX_DEPTH {
            return Err(self.error("nesting too deep"));
        }
        self.depth += 1;
        let value = match self.peek() {
            Some('{') => self.dict_or_set()?,
            Some('(') => self.tuple()?,
            _ => {
                self.bump();
                JsonValue::Array(self.items(']')?)
            }
        };
        self.depth -= 1;
        Ok(value)
    }

    /// Comma-separated values up to `close`, trailing comma allowed.
    fn items(&mut self, close: char) -> Result<Vec<JsonValue>, LiteralError> {
        let mut items = Vec::new();
        loop {
            if self.eat(close) {
                return Ok(items);
            }
            items.push(self.value()?);
            if !self.eat(',') {
                if self.eat(close) {
                    return Ok(items);
                }
                return Err(self.error(&format!("expected ',' or '{}'", close)));
            }
        }
    }

    fn tuple(&mut self) -> Result<JsonValue, LiteralError> {
        self.bump();
        if self.eat(')') {
            return Ok(JsonValue::Array(Vec::new()));
        }
        let first = self.value()?;
        if self.eat(')') {
            return Ok(first);
        }
        if !self.eat(',') {
            return Err(self.error("expected ',' or ')'"));
        }
        let mut items = vec![first];
        items.extend(self.items(')')?);
        Ok(JsonValue::Array(items))
    }

    fn dict_or_set(&mut self) -> Result<JsonValue, LiteralError> {
        self.bump();
        let mut map = Map::new();
        if self.eat('}') {
            return Ok(JsonValue::Object(map));
        }

        let first = self.value()?;
        if !self.eat(':') {
            // {a, b} is a set
            if self.eat('}') {
                return Ok(JsonValue::Array(vec![first]));
            }
            if !self.eat(',') {
                return Err(self.error("expected ':', ',' or '}'"));
            }
            let mut items = vec![first];
            items.extend(self.items('}')?);
            return Ok(JsonValue::Array(items));
        }

        let mut key = first;
        loop {
            let value = self.value()?;
            map.insert(key_string(key), value);
            if !self.eat(',') {
                if self.eat('}') {
                    return Ok(JsonValue::Object(map));
                }
                return Err(self.error("expected ',' or '}'"));
            }
            if self.eat('}') {
                return Ok(JsonValue::Object(map));
            }
            key = self.value()?;
            if !self.eat(':') {
                return Err(self.error("expected ':'"));
            }
        }
    }

    fn strings(&mut self) -> Result<JsonValue, LiteralError> {
        let mut out = self.string()?;
        loop {
            self.skip_ws();
            match self.peek() {
                Some('\'') | Some('"') => out.push_str(&self.string()?),
                _ => return Ok(JsonValue::String(out)),
            }
        }
    }

    fn string(&mut self) -> Result<String, LiteralError> {
        let quote = self.bump().ok_or_else(|| self.error("expected string"))?;
        let mut out = String::new();
        loop {
            match self.bump() {
                None => return Err(self.error("unterminated string")),
                Some(c) if c == quote => return Ok(out),
                Some('\\') => out.push(self.escape()?),
                Some(c) => out.push(c),
            }
        }
    }

    fn escape(&mut self) -> Result<char, LiteralError> {
        match self.bump() {
            Some('n') => Ok('\n'),
            Some('t') => Ok('\t'),
            Some('r') => Ok('\r'),
            Some('0') => Ok('\0'),
            Some('u') => {
                let src = self.src;
                let start = self.pos;
                let end = start + 4;
                let hex = src.get(start..end).ok_or_else(|| self.error("short \\u escape"))?;
                let code = u32::from_str_radix(hex, 16).map_err(|_| self.error("bad \\u escape"))?;
                self.pos = end;
                char::from_u32(code).ok_or_else(|| self.error("invalid code point"))
            }
            // \\, \', \" and unknown escapes keep the character
            Some(c) => Ok(c),
            None => Err(self.error("unterminated escape")),
        }
    }

    fn number(&mut self) -> Result<JsonValue, LiteralError> {
        let start = self.pos;
        if matches!(self.peek(), Some('-') | Some('+')) {
            self.bump();
        }
        while let Some(c) = self.peek() {
            let exponent_sign =
                (c == '-' || c == '+') && matches!(self.src[..self.pos].chars().last(), Some('e' | 'E'));
            if c.is_ascii_digit() || c == '.' || c == 'e' || c == 'E' || c == '_' || exponent_sign {
                self.bump();
            } else {
                break;
            }
        }
        let raw: String = self.src[start..self.pos].chars().filter(|c| *c != '_').collect();
        let raw = raw.strip_prefix('+').unwrap_or(&raw);

        if let Ok(i) = raw.parse::<i64>() {
            return Ok(JsonValue::Number(i.into()));
        }
        if let Ok(u) = raw.parse::<u64>() {
            return Ok(JsonValue::Number(u.into()));
        }
        raw.parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(JsonValue::Number)
            .ok_or_else(|| LiteralError { offset: start, message: format!("invalid number '{}'", raw) })
    }

    fn keyword(&mut self) -> Result<JsonValue, LiteralError> {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '_' {
                self.bump();
            } else {
                break;
            }
        }
        match &self.src[start..self.pos] {
            "True" => Ok(JsonValue::Bool(true)),
            "False" => Ok(JsonValue::Bool(false)),
            "None" => Ok(JsonValue::Null),
            word =>
                Err(LiteralError { offset: start, message: format!("unexpected name '{}'", word) }),
        }
    }
}

fn key_string(key: JsonValue) -> String {
    match key {
        JsonValue::String(s) => s,
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn python_dict() {
        let value = parse("{'widgets': [{'type': 'defineGraph', 'parameters': {'content': 'x**2'}},], 'answer': None}").unwrap();
        assert_eq!(
            value,
            json!({"widgets": [{"type": "defineGraph", "parameters": {"content": "x**2"}}], "answer": null})
        );
    }

    #[test]
    fn scalars_and_containers() {
        assert_eq!(parse("(1, -2.5, 3e2)").unwrap(), json!([1, -2.5, 300.0]));
        assert_eq!(parse("(7)").unwrap(), json!(7));
        assert_eq!(parse("{1, 2}").unwrap(), json!([1, 2]));
        assert_eq!(parse("{1: 'one'}").unwrap(), json!({"1": "one"}));
        assert_eq!(parse("[True, False]").unwrap(), json!([true, false]));
    }

    #[test]
    fn string_escapes_and_concatenation() {
        assert_eq!(parse(r#"'it\'s' " fine\n""#).unwrap(), json!("it's fine\n"));
        assert_eq!(parse(r#"'é'"#).unwrap(), json!("é"));
    }

    #[test]
    fn rejects_prose() {
        let err = parse("not json at all").unwrap_err();
        assert_eq!(err.offset, 0);
        assert!(err.message.contains("'not'"));
    }

    #[test]
    fn rejects_trailing_input() {
        let err = parse("{'a': 1} extra").unwrap_err();
        assert_eq!(err.message, "unexpected trailing input");
    }

    #[test]
    fn deep_nesting_is_an_error() {
        for open in ["[", "(", "{1: "] {
            let text = open.repeat(100_000);
            let err = parse(&text).unwrap_err();
            assert_eq!(err.message, "nesting too deep");
        }
        let ok = format!("{}1{}", "[".repeat(MAX_DEPTH), "]".repeat(MAX_DEPTH));
        assert!(parse(&ok).is_ok());
    }

    #[test]
    fn rejects_unterminated() {
        assert!(parse("{'a': [1, 2}").is_err());
        assert!(parse("'open").is_err());
    }
}
