// src/utils/html.rs

/// Sanitizes author-supplied quiz text with ammonia's whitelist policy.
///
/// Safe inline markup (`<b>`, `<code>`, ...) survives, scripts and event
/// handler attributes are removed. Surrounding whitespace is trimmed so that
/// a prompt consisting only of stripped markup ends up empty.
pub fn clean_html(input: &str) -> String {
    ammonia::clean(input).trim().to_string()
}
