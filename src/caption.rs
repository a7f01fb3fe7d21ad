use crate::models::AssetSpec;

/// Ready-to-post caption: quote, attribution, body, hashtags, separated by
/// blank lines. Returns `None` when the spec carries no caption.
///
/// Caption fields win over the spec's own quote and metadata when both are
/// present, since the model may have tidied the attribution for posting.
pub fn format_caption(spec: &AssetSpec) -> Option<String> {
    let caption = spec.caption.as_ref()?;

    let quote = non_empty(&caption.quote).unwrap_or(spec.quote_text());
    let author = non_empty(&caption.author).unwrap_or(&spec.metadata.author);
    let source = non_empty(&caption.source).unwrap_or(&spec.metadata.source);

    let mut attribution = format!("- {}", author);
    if !source.is_empty() {
        attribution.push_str(&format!(" ({})", source));
    }

    let hashtags = caption
        .hashtags
        .iter()
        .map(|tag| tag.trim())
        .filter(|tag| !tag.is_empty())
        .map(|tag| {
            if tag.starts_with('#') {
                tag.to_string()
            } else {
                format!("#{}", tag)
            }
        })
        .collect::<Vec<_>>()
        .join(" ");

    Some(format!(
        "{}\n{}\n\n{}\n\n{}",
        quote, attribution, caption.description, hashtags
    ))
}

fn non_empty(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}
