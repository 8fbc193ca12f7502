// src/utils/html.rs

/// Sanitises author-supplied rich text (question bodies, test descriptions).
///
/// Whitelist based: formatting tags such as `<p>`, `<code>` and `<pre>`
/// survive, `<script>` (with its content), `<iframe>` and event-handler
/// attributes are removed.
pub fn clean_html(input: &str) -> String {
    ammonia::clean(input)
}

pub fn clean_optional(input: Option<String>) -> Option<String> {
    input.map(|s| clean_html(&s))
}
