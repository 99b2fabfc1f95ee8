//! Deck preparation helpers.

/// Make sure a generated deck carries marp front matter so the CLI treats
/// it as a slide deck rather than a plain document.
pub fn ensure_front_matter(markdown: &str, theme: &str) -> String {
    let trimmed = markdown.trim_start();
    if let Some(rest) = trimmed.strip_prefix("---") {
        if let Some(end) = rest.find("\n---") {
            let block = &rest[..end];
            if block
                .lines()
                .any(|line| line.trim().starts_with("marp:"))
            {
                return markdown.to_string();
            }
            // Front matter exists but marp is not enabled in it.
            return format!("---\nmarp: true{}\n---{}", block, &rest[end + 4..]);
        }
    }
    format!(
        "---\nmarp: true\ntheme: {}\npaginate: true\n---\n\n{}",
        theme, trimmed
    )
}

/// Count the slides a deck would render to: slide-boundary markers plus
/// one, or headers when there are no markers, but never less than one.
/// Used to size the placeholder sequence when rendering fails outright.
pub fn count_slides(markdown: &str) -> usize {
    let body = strip_front_matter(markdown);
    let boundaries = body.lines().filter(|line| line.trim() == "---").count();
    if boundaries > 0 {
        return boundaries + 1;
    }
    let headers = body
        .lines()
        .filter(|line| {
            let t = line.trim_start();
            t.starts_with("# ") || t.starts_with("## ")
        })
        .count();
    headers.max(1)
}

fn strip_front_matter(markdown: &str) -> &str {
    let trimmed = markdown.trim_start();
    if let Some(rest) = trimmed.strip_prefix("---") {
        if let Some(end) = rest.find("\n---") {
            return &rest[end + 4..];
        }
    }
    trimmed
}
