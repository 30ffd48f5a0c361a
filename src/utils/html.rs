// src/utils/html.rs

use std::collections::HashSet;

/// Reduces author input to plain text.
///
/// Every tag is dropped (text inside ordinary tags is kept, `<script>` and
/// `<style>` bodies are removed). Ammonia serializes the remaining text as
/// HTML, so entities are decoded back: clients render text, not markup.
pub fn plain_text(input: &str) -> String {
    let cleaned = ammonia::Builder::default()
        .tags(HashSet::new())
        .clean(input)
        .to_string();
    html_escape::decode_html_entities(&cleaned).into_owned()
}
