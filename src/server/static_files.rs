//! Static files served ahead of the component routes.

use std::path::{Component, Path, PathBuf};

use axum::extract::{Request, State};
use axum::http::Method;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tower::ServiceExt;
use tower_http::services::ServeFile;

/// A directory whose files shadow component routes.
#[derive(Debug, Clone)]
pub struct StaticFiles {
    base_dir: PathBuf,
}

impl StaticFiles {
    pub fn new<P: Into<PathBuf>>(base: P) -> Self {
        Self { base_dir: base.into() }
    }

    /// Map a URL path into the base directory; `None` for anything that
    /// would step outside it.
    fn map_path(&self, url_path: &str) -> Option<PathBuf> {
        let mut pb = self.base_dir.clone();
        for comp in Path::new(url_path.trim_start_matches('/')).components() {
            match comp {
                Component::Normal(s) => pb.push(s),
                Component::CurDir => {}
                _ => return None,
            }
        }
        Some(pb)
    }

    /// Existing regular file for `url_path`.
    pub fn lookup(&self, url_path: &str) -> Option<PathBuf> {
        let path = self.map_path(url_path)?;
        path.is_file().then_some(path)
    }
}

/// Middleware: answer GET/HEAD from the static directory when a file
/// exists there, otherwise continue to the router.
pub async fn serve_static_first(
    State(files): State<StaticFiles>,
    request: Request,
    next: Next,
) -> Response {
    let method = request.method();
    if *method == Method::GET || *method == Method::HEAD {
        if let Some(path) = files.lookup(request.uri().path()) {
            crate::debug_event!("http", "static", "{}", path.display());
            return match ServeFile::new(path).oneshot(request).await {
                Ok(response) => response.into_response(),
                Err(never) => match never {},
            };
        }
    }
    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_map_path_prevents_traversal() {
        let files = StaticFiles::new("/srv/app/static");
        assert!(files.map_path("/../roost.toml").is_none());
        assert!(files.map_path("/css/../../roost.toml").is_none());
        assert_eq!(
            files.map_path("/css/./site.css"),
            Some(PathBuf::from("/srv/app/static/css/site.css"))
        );
    }

    #[test]
    fn test_lookup_only_returns_files() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::create_dir_all(temp_dir.path().join("css")).unwrap();
        std::fs::write(temp_dir.path().join("robots.txt"), "User-agent: *\n").unwrap();

        let files = StaticFiles::new(temp_dir.path());
        assert!(files.lookup("/robots.txt").is_some());
        assert!(files.lookup("/css").is_none());
        assert!(files.lookup("/").is_none());
        assert!(files.lookup("/missing.txt").is_none());
    }
}
