//! Free-text cleaning shared by every normalized field.

/// Cap for ordinary text fields (company, title, location, ...).
pub const TEXT_LIMIT: usize = 500;

/// Cap for job descriptions.
pub const DESCRIPTION_LIMIT: usize = 5000;

/// Cap for employment-type text that matched no known type.
pub const EMPLOYMENT_TEXT_LIMIT: usize = 50;

/// Cap for posted-date text we could not resolve.
pub const UNPARSED_DATE_LIMIT: usize = 20;

/// Cap for state and country values passed through verbatim.
pub const REGION_LIMIT: usize = 20;

/// Strip non-printable characters, collapse whitespace, trim, and cap at
/// `limit` characters.
pub fn clean_text(input: &str, limit: usize) -> String {
    let printable: String = input
        .chars()
        .map(|c| if c.is_whitespace() { ' ' } else { c })
        .filter(|c| !c.is_control() && !is_invisible(*c))
        .collect();

    let collapsed = printable.split_whitespace().collect::<Vec<_>>().join(" ");
    let mut capped = truncate_chars(&collapsed, limit);
    capped.truncate(capped.trim_end().len());
    capped
}

/// Take at most `limit` characters (not bytes).
pub fn truncate_chars(input: &str, limit: usize) -> String {
    match input.char_indices().nth(limit) {
        Some((byte_idx, _)) => input[..byte_idx].to_string(),
        None => input.to_string(),
    }
}

/// Zero-width and formatting characters that render as nothing.
fn is_invisible(c: char) -> bool {
    matches!(
        c,
        '\u{200B}' | '\u{200C}' | '\u{200D}' | '\u{2060}' | '\u{FEFF}' | '\u{00AD}'
    )
}
