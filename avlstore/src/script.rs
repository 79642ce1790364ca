//! Command scripts replayed by the driver.
//!
//! A script is plain text with one command per line:
//!
//! - `# <key>` removes `key`
//! - `<key> <string fields...> <int fields...>` inserts `key`
//!
//! Tokens are separated by whitespace, so string fields cannot contain
//! spaces. An insert line must carry exactly one token per schema field.
//! Blank lines are ignored.

use crate::storage::Schema;

/// One parsed script command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Insert {
        key: i32,
        strings: Vec<String>,
        ints: Vec<i32>,
    },
    Remove(i32),
}

/// Error returned when a script line cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptError {
    /// 1-based line number.
    pub line: usize,
    pub message: String,
}

impl std::fmt::Display for ScriptError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "script line {}: {}", self.line, self.message)
    }
}

impl std::error::Error for ScriptError {}

/// Parse a whole script.
pub fn parse_script(text: &str, schema: &Schema) -> Result<Vec<Command>, ScriptError> {
    text.lines()
        .enumerate()
        .filter_map(|(i, line)| parse_line(i + 1, line, schema).transpose())
        .collect()
}

/// Parse one line. Returns `None` for a blank line.
pub fn parse_line(line: usize, text: &str, schema: &Schema) -> Result<Option<Command>, ScriptError> {
    let error = |message: String| ScriptError { line, message };
    let mut tokens = text.split_whitespace();

    let Some(first) = tokens.next() else {
        return Ok(None);
    };

    if let Some(rest) = first.strip_prefix('#') {
        // Accept both "# 12" and "#12".
        let key_token = if rest.is_empty() { tokens.next() } else { Some(rest) };
        let key_token = key_token.ok_or_else(|| error("remove is missing a key".to_string()))?;
        let key = parse_int(key_token).map_err(&error)?;
        if let Some(extra) = tokens.next() {
            return Err(error(format!("unexpected token '{extra}' after remove key")));
        }
        return Ok(Some(Command::Remove(key)));
    }

    let key = parse_int(first).map_err(&error)?;
    let fields: Vec<&str> = tokens.collect();
    let expected = schema.string_count() + schema.int_count();
    if fields.len() != expected {
        return Err(error(format!(
            "insert of key {key} has {} fields, schema expects {expected}",
            fields.len()
        )));
    }

    let (strings, ints) = fields.split_at(schema.string_count());
    let ints = ints
        .iter()
        .map(|token| parse_int(token))
        .collect::<Result<Vec<_>, _>>()
        .map_err(&error)?;

    Ok(Some(Command::Insert {
        key,
        strings: strings.iter().map(|s| (*s).to_string()).collect(),
        ints,
    }))
}

fn parse_int(token: &str) -> Result<i32, String> {
    token
        .parse::<i32>()
        .map_err(|e| format!("'{token}' is not a valid integer: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> Schema {
        Schema::new([10, 10], 2)
    }

    #[test]
    fn test_parse_insert() {
        let command = parse_line(1, "42 Ada Lovelace 1815 -3", &schema()).unwrap();
        assert_eq!(
            command,
            Some(Command::Insert {
                key: 42,
                strings: vec!["Ada".to_string(), "Lovelace".to_string()],
                ints: vec![1815, -3],
            })
        );
    }

    #[test]
    fn test_parse_remove() {
        assert_eq!(
            parse_line(1, "# 17", &schema()).unwrap(),
            Some(Command::Remove(17))
        );
        assert_eq!(
            parse_line(1, "  #-5  ", &schema()).unwrap(),
            Some(Command::Remove(-5))
        );
    }

    #[test]
    fn test_blank_lines_are_skipped() {
        assert_eq!(parse_line(1, "   \t", &schema()).unwrap(), None);

        let commands = parse_script("1 a b 1 2\n\n# 1\n", &schema()).unwrap();
        assert_eq!(commands.len(), 2);
        assert_eq!(commands[1], Command::Remove(1));
    }

    #[test]
    fn test_wrong_field_count() {
        let error = parse_line(3, "1 a b 1", &schema()).unwrap_err();
        assert_eq!(error.line, 3);
        assert!(error.message.contains("has 3 fields, schema expects 4"));
    }

    #[test]
    fn test_bad_integers() {
        let error = parse_line(1, "x a b 1 2", &schema()).unwrap_err();
        assert!(error.message.contains("'x' is not a valid integer"));

        let error = parse_line(1, "1 a b 1 two", &schema()).unwrap_err();
        assert!(error.message.contains("'two'"));

        let error = parse_line(1, "#", &schema()).unwrap_err();
        assert_eq!(error.message, "remove is missing a key");

        let error = parse_line(1, "# 1 2", &schema()).unwrap_err();
        assert!(error.message.contains("unexpected token '2'"));
    }

    #[test]
    fn test_script_error_reports_line() {
        let error = parse_script("1 a b 1 2\n2 a b 1\n", &schema()).unwrap_err();
        assert_eq!(error.line, 2);
        assert!(error.to_string().starts_with("script line 2: "));
    }
}
