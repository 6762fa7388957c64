//! View rendering.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use minijinja::{AutoEscape, Environment};
use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Cannot read view {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot render view {path}: {source}")]
    Template {
        path: PathBuf,
        #[source]
        source: minijinja::Error,
    },
}

/// Output of a rendered view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    pub body: String,
    pub content_type: &'static str,
}

/// Turns a view file plus context into a response body.
#[async_trait]
pub trait Renderer: Send + Sync {
    async fn render(&self, view: &Path, context: &Value) -> Result<Rendered, RenderError>;
}

/// Renders every view as a minijinja template.
///
/// HTML views are auto-escaped.
#[derive(Debug, Default, Clone, Copy)]
pub struct TemplateRenderer;

impl TemplateRenderer {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Renderer for TemplateRenderer {
    async fn render(&self, view: &Path, context: &Value) -> Result<Rendered, RenderError> {
        let source = tokio::fs::read_to_string(view)
            .await
            .map_err(|source| RenderError::Read {
                path: view.to_path_buf(),
                source,
            })?;

        let content_type = view_content_type(view);
        let mut env = Environment::new();
        if content_type.starts_with("text/html") {
            env.set_auto_escape_callback(|_| AutoEscape::Html);
        }

        let body = env
            .render_str(&source, context)
            .map_err(|source| RenderError::Template {
                path: view.to_path_buf(),
                source,
            })?;

        Ok(Rendered { body, content_type })
    }
}

/// Content type of a rendered view; unknown template extensions are HTML.
pub fn view_content_type(view: &Path) -> &'static str {
    match extension(view).as_str() {
        "txt" => "text/plain; charset=utf-8",
        "json" => "application/json",
        "xml" => "application/xml",
        "svg" => "image/svg+xml",
        "css" => "text/css",
        "js" => "application/javascript",
        _ => "text/html; charset=utf-8",
    }
}

fn extension(path: &Path) -> String {
    path.extension()
        .and_then(|s| s.to_str())
        .unwrap_or("")
        .to_lowercase()
}
