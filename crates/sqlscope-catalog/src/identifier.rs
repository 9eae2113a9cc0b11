//! Identifier normalization

const QUOTES: [(char, char); 3] = [('"', '"'), ('`', '`'), ('[', ']')];

/// Returns true if the identifier text is wrapped in quotes
pub fn is_quoted(raw: &str) -> bool {
    split_quotes(raw.trim()).is_some()
}

/// Normalize identifier text as written in a query.
///
/// Quoted identifiers keep their exact case (with doubled quote characters
/// unescaped); unquoted identifiers are folded to lowercase.
pub fn normalize_identifier(raw: &str) -> String {
    let raw = raw.trim();
    match split_quotes(raw) {
        Some((inner, close)) => {
            let doubled: String = [close, close].iter().collect();
            inner.replace(&doubled, &close.to_string())
        }
        None => raw.to_lowercase(),
    }
}

fn split_quotes(raw: &str) -> Option<(&str, char)> {
    QUOTES.iter().find_map(|&(open, close)| {
        if raw.len() >= 2 && raw.starts_with(open) && raw.ends_with(close) {
            Some((&raw[1..raw.len() - 1], close))
        } else {
            None
        }
    })
}
