//! sections_update tool implementation.
//!
//! Editorial override: writes caller-supplied content into existing sections.

use pagesync_core::{Section, SectionContent};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::{AppState, json_result};

/// One section edit.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SectionEdit {
    /// Identifier of an existing section.
    pub key: String,
    /// New inner HTML for the section.
    pub content: String,
}

/// Parameters for the sections_update tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SectionsUpdateParams {
    /// Page slug.
    #[serde(default)]
    pub slug: String,
    /// Edits to apply. Every key must already exist for the page.
    pub sections: Vec<SectionEdit>,
}

/// Output from the sections_update tool.
#[derive(Debug, Clone, Serialize)]
pub struct SectionsUpdateOutput {
    /// The edited sections as now stored.
    pub sections: Vec<Section>,
}

pub async fn sections_update_impl(state: &AppState, params: SectionsUpdateParams) -> Result<CallToolResult, McpError> {
    let edits = params
        .sections
        .into_iter()
        .map(|edit| SectionContent::new(edit.key, edit.content))
        .collect();

    let sections = state.pages.update_sections(&params.slug, edits).await?;
    Ok(json_result(&SectionsUpdateOutput { sections })?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::{body, state};
    use crate::tools::{PageParams, page_get_impl};

    fn edit(key: &str, content: &str) -> SectionEdit {
        SectionEdit { key: key.into(), content: content.into() }
    }

    #[tokio::test]
    async fn test_sections_update_round_trip() {
        let state = state(Some(r#"<div id="hero">Hi</div><div id="news">old</div>"#)).await;
        page_get_impl(&state, PageParams { slug: "club".into() }).await.unwrap();

        let params = SectionsUpdateParams { slug: "club".into(), sections: vec![edit("news", "<p>new</p>")] };
        let json = body(&sections_update_impl(&state, params).await.unwrap());
        assert_eq!(json["sections"].as_array().unwrap().len(), 1);
        assert_eq!(json["sections"][0]["content"], "<p>new</p>");

        let page = state.pages.get_sections("club").await.unwrap().page;
        assert!(page.full_code.contains(r#"<div id="news"><p>new</p></div>"#));
    }

    #[tokio::test]
    async fn test_sections_update_unknown_key_is_invalid_input() {
        let state = state(Some(r#"<div id="hero">Hi</div>"#)).await;
        page_get_impl(&state, PageParams { slug: "club".into() }).await.unwrap();

        let params = SectionsUpdateParams { slug: "club".into(), sections: vec![edit("ghost", "x")] };
        let err = sections_update_impl(&state, params).await.unwrap_err();
        assert_eq!(err.code.0, -32602);
    }

    #[tokio::test]
    async fn test_sections_update_empty_list() {
        let state = state(None).await;
        let params = SectionsUpdateParams { slug: "club".into(), sections: Vec::new() };
        assert!(sections_update_impl(&state, params).await.is_err());
    }
}
