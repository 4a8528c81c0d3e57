// src/utils/html.rs

/// Whitelist-sanitizes admin-authored HTML (announcement bodies) before it is
/// stored. Keeps formatting tags, strips scripts and event-handler
/// attributes. Stored XSS fail-safe for everything the portal later renders.
pub fn clean_html(input: &str) -> String {
    ammonia::clean(input)
}
