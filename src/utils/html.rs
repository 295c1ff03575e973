// src/utils/html.rs

/// Sanitizes free text typed into the back office (fee notes, event
/// descriptions, addresses) before it is stored.
///
/// Whitelist-based: harmless inline tags survive, `<script>` and its content,
/// event-handler attributes and other active content are dropped.
/// Blank input becomes `None` so optional columns stay NULL.
pub fn clean_text(input: Option<&str>) -> Option<String> {
    let trimmed = input?.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(ammonia::clean(trimmed))
}
