//! Tolerant JSON reading: strict-invalid but structurally plausible text in,
//! strict [`serde_json::Value`] out.
//!
//! The reader accepts, beyond strict JSON:
//!
//! - single-quoted strings and keys
//! - unquoted (bareword) keys and scalar values
//! - trailing commas in objects and arrays
//! - members separated only by newlines, with no comma
//! - Python-style literals `True`, `False`, `None`
//! - structures truncated at end of input, which are closed implicitly
//! - trailing junk after the first complete structure, which is ignored
//!
//! Repair is deterministic and single-pass; it never invents fields and never
//! reorders members.

use crate::error::RepairError;
use serde_json::{Map, Number, Value};

/// Repair `text` into a strict JSON string.
///
/// Strictly valid input is parsed and re-serialized, so the output is always
/// canonical `serde_json` formatting.
pub fn repair(text: &str) -> Result<String, RepairError> {
    tolerant_parse(text).map(|value| value.to_string())
}

/// Parse `text` tolerantly into a [`Value`].
///
/// The first `{` or `[` in the text anchors the parse; anything before or
/// after the structure is ignored. Returns [`RepairError::NoStructure`] when
/// no anchor exists.
pub fn tolerant_parse(text: &str) -> Result<Value, RepairError> {
    // Strict input needs no tolerance.
    if let Ok(value) = serde_json::from_str::<Value>(text.trim()) {
        if value.is_object() || value.is_array() {
            return Ok(value);
        }
    }

    let start = text
        .find(['{', '['])
        .ok_or(RepairError::NoStructure)?;
    let mut reader = Reader::new(&text[start..], start);
    reader.value()
}

/// Cursor over the input. Positions are byte offsets into the original text
/// so error messages point at the real location.
struct Reader<'a> {
    chars: Vec<(usize, char)>,
    pos: usize,
    base: usize,
    src: &'a str,
}

impl<'a> Reader<'a> {
    fn new(src: &'a str, base: usize) -> Self {
        Self {
            chars: src.char_indices().collect(),
            pos: 0,
            base,
            src,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).map(|&(_, c)| c)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek();
        if c.is_some() {
            self.pos += 1;
        }
        c
    }

    fn offset(&self) -> usize {
        self.base
            + self
                .chars
                .get(self.pos)
                .map_or(self.src.len(), |&(i, _)| i)
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.pos += 1;
        }
    }

    fn error(&self, message: impl Into<String>) -> RepairError {
        RepairError::Unreadable {
            offset: self.offset(),
            message: message.into(),
        }
    }

    fn value(&mut self) -> Result<Value, RepairError> {
        self.skip_ws();
        match self.peek() {
            Some('{') => self.object(),
            Some('[') => self.array(),
            Some(q @ ('"' | '\'')) => Ok(Value::String(self.string(q))),
            Some(_) => self.bareword(),
            None => Err(self.error("unexpected end of input")),
        }
    }

    fn object(&mut self) -> Result<Value, RepairError> {
        self.bump(); // '{'
        let mut map = Map::new();
        loop {
            // Commas are optional separators; newlines alone also separate.
            self.skip_separators();
            match self.peek() {
                Some('}') => {
                    self.bump();
                    break;
                }
                // Truncated output: close the object at end of input.
                None => break,
                Some(_) => {}
            }
            let key = self.key()?;
            self.skip_ws();
            if self.peek() == Some(':') {
                self.bump();
            } else {
                return Err(self.error(format!("expected ':' after key {key:?}")));
            }
            let value = self.value()?;
            map.insert(key, value);
        }
        Ok(Value::Object(map))
    }

    fn array(&mut self) -> Result<Value, RepairError> {
        self.bump(); // '['
        let mut items = Vec::new();
        loop {
            self.skip_separators();
            match self.peek() {
                Some(']') => {
                    self.bump();
                    break;
                }
                None => break,
                Some(_) => {}
            }
            items.push(self.value()?);
        }
        Ok(Value::Array(items))
    }

    fn skip_separators(&mut self) {
        loop {
            self.skip_ws();
            if self.peek() == Some(',') {
                self.bump();
            } else {
                return;
            }
        }
    }

    fn key(&mut self) -> Result<String, RepairError> {
        self.skip_ws();
        match self.peek() {
            Some(q @ ('"' | '\'')) => Ok(self.string(q)),
            Some(_) => {
                let mut key = String::new();
                while let Some(c) = self.peek() {
                    if c == ':' || c == '}' || c == '\n' {
                        break;
                    }
                    key.push(c);
                    self.pos += 1;
                }
                let key = key.trim().to_string();
                if key.is_empty() {
                    Err(self.error("empty object key"))
                } else {
                    Ok(key)
                }
            }
            None => Err(self.error("expected object key")),
        }
    }

    /// Read a quoted string. An unterminated string runs to end of input.
    fn string(&mut self, quote: char) -> String {
        self.bump(); // opening quote
        let mut out = String::new();
        while let Some(c) = self.bump() {
            if c == quote {
                return out;
            }
            if c == '\\' {
                match self.bump() {
                    Some('n') => out.push('\n'),
                    Some('t') => out.push('\t'),
                    Some('r') => out.push('\r'),
                    Some('u') => {
                        let mut code = String::new();
                        for _ in 0..4 {
                            if let Some(h) = self.peek() {
                                if h.is_ascii_hexdigit() {
                                    code.push(h);
                                    self.pos += 1;
                                }
                            }
                        }
                        match u32::from_str_radix(&code, 16)
                            .ok()
                            .and_then(char::from_u32)
                        {
                            Some(decoded) => out.push(decoded),
                            None => {
                                out.push_str("\\u");
                                out.push_str(&code);
                            }
                        }
                    }
                    Some(other) => out.push(other),
                    None => break,
                }
            } else {
                out.push(c);
            }
        }
        out
    }

    /// Read an unquoted scalar: literal, number, or bare string.
    fn bareword(&mut self) -> Result<Value, RepairError> {
        let mut word = String::new();
        while let Some(c) = self.peek() {
            if matches!(c, ',' | '}' | ']' | '\n') {
                break;
            }
            word.push(c);
            self.pos += 1;
        }
        let word = word.trim();
        if word.is_empty() {
            return Err(self.error("expected a value"));
        }
        Ok(interpret_bareword(word))
    }
}

/// Map an unquoted token to the value it most plausibly encodes.
fn interpret_bareword(word: &str) -> Value {
    match word {
        "true" | "True" => return Value::Bool(true),
        "false" | "False" => return Value::Bool(false),
        "null" | "None" | "nil" => return Value::Null,
        _ => {}
    }
    if let Ok(n) = word.parse::<i64>() {
        return Value::Number(n.into());
    }
    if let Ok(f) = word.parse::<f64>() {
        if let Some(n) = Number::from_f64(f) {
            return Value::Number(n);
        }
    }
    Value::String(word.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_strict_json_passes_through() {
        let value = tolerant_parse(r#"{"title": "A", "score": 7}"#).unwrap();
        assert_eq!(value, json!({"title": "A", "score": 7}));
    }

    #[test]
    fn test_single_quotes_and_unquoted_keys() {
        let value = tolerant_parse("{title: 'A', hook: 'B',}").unwrap();
        assert_eq!(value, json!({"title": "A", "hook": "B"}));
    }

    #[test]
    fn test_trailing_comma_in_array() {
        let value = tolerant_parse("[1, 2, 3,]").unwrap();
        assert_eq!(value, json!([1, 2, 3]));
    }

    #[test]
    fn test_newline_separated_members() {
        let value = tolerant_parse("{\n\"a\": 1\n\"b\": 2\n}").unwrap();
        assert_eq!(value, json!({"a": 1, "b": 2}));
    }

    #[test]
    fn test_python_literals() {
        let value = tolerant_parse("{ok: True, bad: False, missing: None}").unwrap();
        assert_eq!(value, json!({"ok": true, "bad": false, "missing": null}));
    }

    #[test]
    fn test_truncated_object_closes_implicitly() {
        let value = tolerant_parse(r#"{"title": "A", "hook": "cut off"#).unwrap();
        assert_eq!(value, json!({"title": "A", "hook": "cut off"}));
    }

    #[test]
    fn test_truncated_nested_structures() {
        let value = tolerant_parse(r#"{"a": [1, 2, {"b": 3"#).unwrap();
        assert_eq!(value, json!({"a": [1, 2, {"b": 3}]}));
    }

    #[test]
    fn test_trailing_junk_ignored() {
        let value = tolerant_parse("{\"a\": 1} and that's my answer!").unwrap();
        assert_eq!(value, json!({"a": 1}));
    }

    #[test]
    fn test_leading_prose_ignored() {
        let value = tolerant_parse("The result is {\"a\": 1}").unwrap();
        assert_eq!(value, json!({"a": 1}));
    }

    #[test]
    fn test_bare_multiword_value_becomes_string() {
        let value = tolerant_parse("{type: side hustle}").unwrap();
        assert_eq!(value, json!({"type": "side hustle"}));
    }

    #[test]
    fn test_numbers_survive() {
        let value = tolerant_parse("{a: 7, b: 8.75, c: -2}").unwrap();
        assert_eq!(value, json!({"a": 7, "b": 8.75, "c": -2}));
    }

    #[test]
    fn test_escapes_in_strings() {
        let value = tolerant_parse(r#"{"a": "line\nbreak \"quoted\""}"#).unwrap();
        assert_eq!(value, json!({"a": "line\nbreak \"quoted\""}));
    }

    #[test]
    fn test_no_structure() {
        assert!(matches!(
            tolerant_parse("nothing here"),
            Err(RepairError::NoStructure)
        ));
    }

    #[test]
    fn test_repair_reserializes_strictly() {
        let fixed = repair("{title: 'A', hook: 'B',}").unwrap();
        let value: Value = serde_json::from_str(&fixed).unwrap();
        assert_eq!(value, json!({"title": "A", "hook": "B"}));
    }

    #[test]
    fn test_member_order_preserved() {
        // serde_json is built with preserve_order in this workspace.
        let fixed = repair("{z: 1, a: 2}").unwrap();
        assert!(fixed.find("\"z\"").unwrap() < fixed.find("\"a\"").unwrap());
    }
}
