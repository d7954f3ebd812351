use super::cef::ParseError;
use std::collections::HashMap;

/// Parse the CEF extension blob: whitespace-delimited `key=value` pairs.
///
/// Values split on the *first* `=` only, so values containing `=` stay
/// intact. An empty value (`tokenID=`) is valid and parses to `""`. A
/// token with no `=` at all is a typed failure, never a panic.
pub fn parse_extensions(blob: &str) -> Result<HashMap<String, String>, ParseError> {
    let mut data = HashMap::new();

    for token in blob.split_whitespace() {
        let Some((name, value)) = token.split_once('=') else {
            return Err(ParseError::MalformedExtensionToken {
                token: token.to_string(),
            });
        };
        data.insert(name.to_string(), value.to_string());
    }

    Ok(data)
}
