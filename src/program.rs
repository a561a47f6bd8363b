use crate::error::ParseError;

/// Parse comma-separated program text (e.g. `"1,0,0,3,99\n"`) into memory.
///
/// Whitespace around each token is ignored, so a trailing newline is fine.
pub fn parse(text: &str) -> Result<Vec<i64>, ParseError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(ParseError::Empty);
    }
    text.split(',')
        .enumerate()
        .map(|(index, token)| {
            let token = token.trim();
            token.parse::<i64>().map_err(|source| ParseError::InvalidToken {
                index,
                token: token.to_string(),
                source,
            })
        })
        .collect()
}
