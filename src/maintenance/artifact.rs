//! Reading an emitted artifact back.
//!
//! The artifact is TypeScript, but both payloads are plain JSON following
//! an `export const <name>... =` declaration. Each is located by its
//! declaration and read with a streaming deserializer that stops at the end
//! of the first JSON value, ignoring the trailing `;` and anything after it.

use crate::emit::EmitError;
use crate::scan::ScanError;
use crate::types::{Category, GalleryItem};
use serde::de::DeserializeOwned;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ArtifactError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Write failed: {0}")]
    Emit(#[from] EmitError),
    #[error("Scan failed: {0}")]
    Scan(#[from] ScanError),
    #[error("Malformed artifact: {0}")]
    Malformed(String),
}

const ITEMS_DECLARATION: &str = "export const galleryItems";
const CATEGORIES_DECLARATION: &str = "export const categories";

/// Both payloads of an artifact.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedArtifact {
    pub items: Vec<GalleryItem>,
    pub categories: Vec<Category>,
}

fn payload_after<T: DeserializeOwned>(text: &str, declaration: &str) -> Result<T, ArtifactError> {
    let start = text
        .find(declaration)
        .ok_or_else(|| ArtifactError::Malformed(format!("no `{declaration}` declaration")))?;
    let rest = &text[start + declaration.len()..];
    let eq = rest
        .find('=')
        .ok_or_else(|| ArtifactError::Malformed(format!("`{declaration}` has no initializer")))?;

    let mut stream = serde_json::Deserializer::from_str(&rest[eq + 1..]).into_iter::<T>();
    match stream.next() {
        Some(value) => Ok(value?),
        None => Err(ArtifactError::Malformed(format!(
            "`{declaration}` has an empty initializer"
        ))),
    }
}

pub fn parse_artifact(text: &str) -> Result<ParsedArtifact, ArtifactError> {
    Ok(ParsedArtifact {
        items: payload_after(text, ITEMS_DECLARATION)?,
        categories: payload_after(text, CATEGORIES_DECLARATION)?,
    })
}

pub fn read_artifact(path: &Path) -> Result<ParsedArtifact, ArtifactError> {
    let text = std::fs::read_to_string(path)?;
    parse_artifact(&text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emit::render_artifact;
    use crate::metadata::Metadata;
    use crate::types::Orientation;

    fn item(href: &str, category: &str) -> GalleryItem {
        GalleryItem {
            label: "A".into(),
            href: href.into(),
            thumbnail: None,
            category: category.into(),
            original_category: None,
            categories: vec![],
            orientation: Orientation::Portrait,
            aspect_ratio: "2:3".into(),
            modified_time: Some(7),
            metadata: Metadata::default(),
        }
    }

    #[test]
    fn reads_back_rendered_artifact() {
        let items = vec![item("/a.avif", "all"), item("/a.avif", "bw")];
        let categories = vec![Category::all(), Category::new("bw", "B&W")];
        let text = render_artifact(&items, &categories).unwrap();

        let parsed = parse_artifact(&text).unwrap();
        assert_eq!(parsed.items, items);
        assert_eq!(parsed.categories, categories);
    }

    #[test]
    fn tolerates_hand_formatting() {
        let text = r#"
            export const galleryItems: GalleryItem[] =
              [{"label": "X", "href": "/x.avif", "category": "all"}];
            export const categories = [{"value": "all", "label": "All"}]
        "#;
        let parsed = parse_artifact(text).unwrap();
        assert_eq!(parsed.items[0].href, "/x.avif");
        assert_eq!(parsed.categories, vec![Category::all()]);
    }

    #[test]
    fn missing_declaration_is_malformed() {
        let err = parse_artifact("export const categories = [];").unwrap_err();
        assert!(matches!(err, ArtifactError::Malformed(_)));
    }

    #[test]
    fn truncated_json_is_error() {
        let text = "export const galleryItems: GalleryItem[] = [{\"label\": \"X\",";
        assert!(matches!(parse_artifact(text), Err(ArtifactError::Json(_))));
    }

    #[test]
    fn empty_initializer_is_malformed() {
        let text = "export const galleryItems: GalleryItem[] =   ";
        assert!(matches!(parse_artifact(text), Err(ArtifactError::Malformed(_))));
    }

    #[test]
    fn read_missing_file_is_io_error() {
        let err = read_artifact(Path::new("/nonexistent/gallery.ts")).unwrap_err();
        assert!(matches!(err, ArtifactError::Io(_)));
    }
}
