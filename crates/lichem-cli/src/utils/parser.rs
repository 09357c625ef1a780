use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("Invalid --set format: '{0}'. Expected KEY=VALUE.")]
    InvalidKeyValue(String),

    #[error("Invalid atom index '{token}' in list '{list}'.")]
    InvalidIndex { token: String, list: String },

    #[error("Descending atom range '{0}'.")]
    DescendingRange(String),
}

/// Splits a `-S` override into its key and value.
pub fn split_key_value(pair: &str) -> Result<(&str, &str), ParseError> {
    match pair.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => Ok((key.trim(), value.trim())),
        _ => Err(ParseError::InvalidKeyValue(pair.to_string())),
    }
}

/// Parses an atom index list such as `0-4, 9, 12-13` into sorted, unique indices.
///
/// An empty string yields an empty list.
pub fn parse_index_list(list: &str) -> Result<Vec<usize>, ParseError> {
    let invalid = |token: &str| ParseError::InvalidIndex {
        token: token.to_string(),
        list: list.to_string(),
    };
    let mut indices = Vec::new();
    for token in list.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        match token.split_once('-') {
            Some((start, end)) => {
                let start: usize = start.trim().parse().map_err(|_| invalid(token))?;
                let end: usize = end.trim().parse().map_err(|_| invalid(token))?;
                if end < start {
                    return Err(ParseError::DescendingRange(token.to_string()));
                }
                indices.extend(start..=end);
            }
            None => indices.push(token.parse().map_err(|_| invalid(token))?),
        }
    }
    indices.sort_unstable();
    indices.dedup();
    Ok(indices)
}
