//! Inner-content replacement by element identifier.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use lol_html::html_content::ContentType;
use lol_html::{RewriteStrSettings, element, rewrite_str};
use pagesync_core::store::collapse_duplicate_keys;
use pagesync_core::{DuplicateKeyPolicy, Error, SectionContent};

use super::extract_sections;

/// Markup with editorial overrides applied, and the section contents that
/// extraction of that markup now yields for every section the edit touched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rewrite {
    pub full_code: String,
    pub sections: Vec<SectionContent>,
}

/// Rewrite `html` so each element whose `id` matches an edit holds the edit's
/// content as its inner HTML. Everything else is passed through untouched.
///
/// With [`DuplicateKeyPolicy::LastWins`] every element carrying an edited id
/// is rewritten, so extraction sees the edit whichever occurrence it keeps.
/// With [`DuplicateKeyPolicy::Reject`] an edited id that occurs more than once
/// fails with [`Error::DuplicateSection`]. Edits whose id never appears are
/// ignored.
pub fn replace_sections(html: &str, edits: &[SectionContent], duplicates: DuplicateKeyPolicy) -> Result<String, Error> {
    if edits.is_empty() {
        return Ok(html.to_string());
    }

    let contents: HashMap<&str, &str> = edits
        .iter()
        .map(|edit| (edit.key.as_str(), edit.content.as_str()))
        .collect();
    let hits: Rc<RefCell<HashMap<String, usize>>> = Rc::new(RefCell::new(HashMap::new()));

    let out = rewrite_str(
        html,
        RewriteStrSettings {
            element_content_handlers: vec![element!("[id]", {
                let hits = Rc::clone(&hits);
                let contents = &contents;
                move |el| {
                    if let Some(id) = el.get_attribute("id")
                        && let Some(content) = contents.get(id.as_str())
                    {
                        el.set_inner_content(content, ContentType::Html);
                        *hits.borrow_mut().entry(id).or_default() += 1;
                    }
                    Ok(())
                }
            })],
            ..RewriteStrSettings::default()
        },
    )
    .map_err(|e| Error::ExtractFailed(format!("markup rewrite failed: {e}")))?;

    if duplicates == DuplicateKeyPolicy::Reject
        && let Some((key, _)) = hits.borrow().iter().find(|(_, count)| **count > 1)
    {
        return Err(Error::DuplicateSection(key.clone()));
    }

    Ok(out)
}

/// Apply `edits` to `html` and work out which section contents to persist.
///
/// The result holds each edited key plus every other section whose extracted
/// content changed because of the edit (an identified ancestor of an edited
/// element). Edited keys take the content extraction of the new markup gives
/// them, falling back to the edit itself when the key no longer appears.
///
/// An edit that would drop another section from the markup (replacing an
/// outer element without its identified children) fails with
/// [`Error::InvalidInput`].
pub fn rewrite_sections(html: &str, edits: &[SectionContent], duplicates: DuplicateKeyPolicy) -> Result<Rewrite, Error> {
    let edits = collapse_duplicate_keys(edits.to_vec());

    let before: HashMap<String, String> = extract_sections(html, duplicates)?
        .into_iter()
        .map(|section| (section.key, section.content))
        .collect();
    let full_code = replace_sections(html, &edits, duplicates)?;
    let after = extract_sections(&full_code, duplicates)?;

    let edited: HashSet<&str> = edits.iter().map(|edit| edit.key.as_str()).collect();
    let present: HashMap<&str, &str> = after
        .iter()
        .map(|section| (section.key.as_str(), section.content.as_str()))
        .collect();

    let mut dropped: Vec<&str> = before
        .keys()
        .map(String::as_str)
        .filter(|key| !edited.contains(key) && !present.contains_key(key))
        .collect();
    if !dropped.is_empty() {
        dropped.sort_unstable();
        return Err(Error::InvalidInput(format!("edit would remove nested sections: {}", dropped.join(", "))));
    }

    let mut sections: Vec<SectionContent> = edits
        .iter()
        .map(|edit| {
            let content = present.get(edit.key.as_str()).copied().unwrap_or(edit.content.as_str());
            SectionContent::new(edit.key.as_str(), content)
        })
        .collect();

    let changed = after.iter().filter(|section| {
        !edited.contains(section.key.as_str()) && before.get(&section.key).is_some_and(|old| *old != section.content)
    });
    sections.extend(changed.cloned());

    Ok(Rewrite { full_code, sections })
}
