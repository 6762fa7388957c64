//! Disk resolution of config candidates.

use std::path::{Path, PathBuf};

use super::ConfigDocument;

/// Outcome of a candidate search.
#[derive(Debug, Clone)]
pub struct Resolution {
    /// The winning document, or `{}` when no candidate parsed.
    pub document: ConfigDocument,
    /// Candidate that supplied `document`.
    pub source: Option<PathBuf>,
    /// Candidates actually read, in order.
    pub attempted: Vec<PathBuf>,
}

/// Read candidates in order and stop at the first valid JSON object.
///
/// Unreadable files and invalid JSON are skipped the same way; later
/// candidates are never touched once one succeeds.
pub async fn load_first_valid(candidates: &[PathBuf]) -> Resolution {
    let mut attempted = Vec::with_capacity(candidates.len());

    for candidate in candidates {
        attempted.push(candidate.clone());
        if let Some(document) = read_document(candidate).await {
            return Resolution {
                document,
                source: Some(candidate.clone()),
                attempted,
            };
        }
    }

    Resolution {
        document: ConfigDocument::empty(),
        source: None,
        attempted,
    }
}

async fn read_document(path: &Path) -> Option<ConfigDocument> {
    let text = match tokio::fs::read_to_string(path).await {
        Ok(text) => text,
        Err(e) => {
            tracing::trace!("[cache] skipping {}: {e}", path.display());
            return None;
        }
    };
    match ConfigDocument::from_json_str(&text) {
        Ok(document) => Some(document),
        Err(e) => {
            crate::debug_event!("cache", "invalid config", "{}: {e}", path.display());
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_primary_candidate_short_circuits() {
        let temp_dir = TempDir::new().unwrap();
        let primary = temp_dir.path().join("bar.config.json");
        let fallback = temp_dir.path().join("foo.bar.config.json");
        fs::write(&primary, r#"{"from":"primary"}"#).unwrap();
        fs::write(&fallback, r#"{"from":"fallback"}"#).unwrap();

        let resolution = load_first_valid(&[primary.clone(), fallback]).await;
        assert_eq!(resolution.source, Some(primary.clone()));
        assert_eq!(resolution.attempted, vec![primary]);
    }

    #[tokio::test]
    async fn test_invalid_primary_falls_through() {
        let temp_dir = TempDir::new().unwrap();
        let primary = temp_dir.path().join("bar.config.json");
        let fallback = temp_dir.path().join("foo.bar.config.json");
        fs::write(&primary, r#"{"from":"#).unwrap();
        fs::write(&fallback, r#"{"from":"fallback"}"#).unwrap();

        let resolution = load_first_valid(&[primary, fallback.clone()]).await;
        assert_eq!(resolution.source, Some(fallback));
        assert_eq!(resolution.document.to_json_string(), r#"{"from":"fallback"}"#);
        assert_eq!(resolution.attempted.len(), 2);
    }

    #[tokio::test]
    async fn test_nothing_resolves_to_empty_document() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("missing.config.json");
        let resolution = load_first_valid(&[missing]).await;
        assert!(resolution.source.is_none());
        assert_eq!(resolution.document, ConfigDocument::empty());
    }
}
