//! Slug helpers shared by the page cache and the store.

/// Aliases that address the external site's root page.
const ROOT_ALIASES: &[&str] = &["", "home", "index"];

/// Normalize a requested slug: trim whitespace and surrounding slashes.
///
/// Root aliases collapse to the empty slug so the home page is stored once.
pub fn normalize_slug(input: &str) -> String {
    let trimmed = input.trim().trim_matches('/');
    if ROOT_ALIASES.iter().any(|alias| trimmed.eq_ignore_ascii_case(alias)) {
        return String::new();
    }
    trimmed.to_string()
}

/// Derive a human-readable title from a slug.
///
/// `about-us` becomes `About Us`, `events/summer_camp` becomes `Summer Camp`
/// and the root slug becomes `Home`.
pub fn title_from_slug(slug: &str) -> String {
    let last = slug.rsplit('/').find(|segment| !segment.is_empty()).unwrap_or("");

    let words: Vec<String> = last
        .split(['-', '_'])
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect();

    if words.is_empty() { "Home".to_string() } else { words.join(" ") }
}
