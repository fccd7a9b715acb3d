use tracing::{debug, warn};

/// Parse a header string in format "Name: Value".
pub fn parse_header(header_str: &str) -> Option<(String, String)> {
    // Find the first colon which separates name and value
    let Some(colon_pos) = header_str.find(':') else {
        warn!(
            "Invalid header format: '{}'. Expected 'Name: Value'",
            header_str
        );
        return None;
    };

    let name = header_str[..colon_pos].trim();
    let value = header_str[colon_pos + 1..].trim();

    if name.is_empty() {
        warn!("Invalid header name in '{}'", header_str);
        return None;
    }

    debug!("Adding header: {}", name);
    Some((name.to_string(), value.to_string()))
}

/// Parse a collection of header strings, skipping malformed entries.
pub fn parse_headers(header_strings: &[String]) -> Vec<(String, String)> {
    header_strings
        .iter()
        .filter_map(|h| parse_header(h))
        .collect()
}
