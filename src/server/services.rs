//! Service sub-routers declared by manifests in the components tree.
//!
//! Any `*service*.json` file under the components root is a manifest:
//!
//! ```json
//! { "routes": [
//!     { "method": "GET", "path": "/status", "body": { "ok": true } },
//!     { "path": "/terms", "file": "terms.html", "content_type": "text/html" }
//! ] }
//! ```
//!
//! Manifests are read once when a worker starts. Each one is validated
//! before it is mounted; a bad manifest is logged and skipped.
//!
//! Only the declared routes are added, each at its full path under the
//! service prefix. Any other path below the prefix still reaches the
//! component routes and the catch-all.

use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

use axum::Router;
use axum::body::Bytes;
use axum::http::{HeaderValue, Method, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{MethodFilter, MethodRouter, on};
use serde::Deserialize;
use thiserror::Error;

/// Prefixes owned by the server itself.
const RESERVED_PREFIXES: &[&str] = &["/assets"];

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Cannot read service manifest {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid service manifest {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Service manifest {path} declares no routes")]
    NoRoutes { path: PathBuf },

    #[error("Service manifest {path}, route {index}: {reason}")]
    InvalidRoute {
        path: PathBuf,
        index: usize,
        reason: String,
    },

    #[error("Cannot derive a mount prefix for {path}")]
    InvalidPrefix { path: PathBuf },

    #[error("Mount prefix {prefix} is already taken")]
    DuplicatePrefix { prefix: String },

    #[error("Service {prefix} declares {path}, already served by {owner}")]
    RouteConflict {
        prefix: String,
        path: String,
        owner: String,
    },
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ServiceManifest {
    routes: Vec<RouteSpec>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RouteSpec {
    #[serde(default = "default_method")]
    method: String,
    path: String,
    #[serde(default = "default_status")]
    status: u16,
    body: Option<serde_json::Value>,
    file: Option<PathBuf>,
    content_type: Option<String>,
}

fn default_method() -> String {
    "GET".to_string()
}

fn default_status() -> u16 {
    200
}

/// A fixed response prepared at load time.
#[derive(Debug, Clone)]
struct Reply {
    status: StatusCode,
    content_type: HeaderValue,
    body: Bytes,
}

impl IntoResponse for Reply {
    fn into_response(self) -> Response {
        (self.status, [(header::CONTENT_TYPE, self.content_type)], self.body).into_response()
    }
}

/// A validated manifest ready to mount.
#[derive(Debug)]
pub struct MountedService {
    pub prefix: String,
    pub manifest: PathBuf,
    /// `METHOD /path` for every route, in manifest order.
    pub routes: Vec<String>,
    /// Full request paths the service answers.
    pub paths: Vec<String>,
    router: Router,
}

/// Mount prefix → service, built once at worker startup.
#[derive(Debug, Default)]
pub struct ServiceRegistry {
    services: BTreeMap<String, MountedService>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scan `components_root` for manifests and register every valid one.
    pub fn discover(components_root: &Path) -> Self {
        let mut registry = Self::new();

        for manifest in find_manifests(components_root) {
            let result = load_service(components_root, &manifest)
                .and_then(|service| registry.register(service));
            if let Err(e) = result {
                tracing::warn!("[services] skipping: {e}");
            }
        }

        if !registry.is_empty() {
            crate::log_event!(
                "services",
                "mounted",
                "{}",
                registry.prefixes().collect::<Vec<_>>().join(", ")
            );
        }
        registry
    }

    /// Add a service unless its prefix or one of its paths is taken.
    pub fn register(&mut self, service: MountedService) -> Result<(), ServiceError> {
        let reserved = RESERVED_PREFIXES.iter().any(|reserved| {
            service.prefix == *reserved || service.prefix.starts_with(&format!("{reserved}/"))
        });
        if reserved || self.services.contains_key(&service.prefix) {
            return Err(ServiceError::DuplicatePrefix {
                prefix: service.prefix,
            });
        }
        for other in self.services.values() {
            if let Some(path) = service.paths.iter().find(|path| other.paths.contains(path)) {
                return Err(ServiceError::RouteConflict {
                    prefix: service.prefix.clone(),
                    path: path.clone(),
                    owner: other.prefix.clone(),
                });
            }
        }
        crate::debug_event!(
            "services",
            "registered",
            "{} from {} ({} routes)",
            service.prefix,
            service.manifest.display(),
            service.routes.len()
        );
        self.services.insert(service.prefix.clone(), service);
        Ok(())
    }

    pub fn get(&self, prefix: &str) -> Option<&MountedService> {
        self.services.get(prefix)
    }

    pub fn prefixes(&self) -> impl Iterator<Item = &str> {
        self.services.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    /// Merge every service's routes into `router`.
    pub fn mount(&self, router: Router) -> Router {
        self.services
            .values()
            .fold(router, |router, service| router.merge(service.router.clone()))
    }
}

fn find_manifests(components_root: &Path) -> Vec<PathBuf> {
    let Some(root) = components_root.to_str() else {
        tracing::warn!("[services] components root is not valid UTF-8");
        return Vec::new();
    };
    let pattern = format!("{}/**/*service*.json", glob::Pattern::escape(root));

    match glob::glob(&pattern) {
        Ok(paths) => paths
            .filter_map(|entry| match entry {
                Ok(path) if path.is_file() => Some(path),
                Ok(_) => None,
                Err(e) => {
                    tracing::warn!("[services] {e}");
                    None
                }
            })
            .collect(),
        Err(e) => {
            tracing::warn!("[services] bad scan pattern {pattern}: {e}");
            Vec::new()
        }
    }
}

/// Mount prefix for a manifest.
///
/// The manifest's directory relative to the components root, plus the
/// file stem (text before the first `.`) unless the stem repeats the last
/// directory name. `components/shop/cart.service.json` mounts at
/// `/shop/cart`, `components/shop/shop.service.json` at `/shop`.
pub fn mount_prefix(components_root: &Path, manifest: &Path) -> Result<String, ServiceError> {
    let invalid = || ServiceError::InvalidPrefix {
        path: manifest.to_path_buf(),
    };

    let relative = manifest.strip_prefix(components_root).map_err(|_| invalid())?;
    let file_name = relative
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(invalid)?;
    let stem = file_name.split('.').next().unwrap_or_default();
    if stem.is_empty() {
        return Err(invalid());
    }

    let mut segments = Vec::new();
    if let Some(parent) = relative.parent() {
        for comp in parent.components() {
            match comp {
                Component::Normal(s) => segments.push(s.to_str().ok_or_else(invalid)?),
                _ => return Err(invalid()),
            }
        }
    }
    if segments.last() != Some(&stem) {
        segments.push(stem);
    }
    // Route syntax characters would turn the prefix into a pattern
    if segments.iter().any(|s| s.contains(['{', '}', '*', ':'])) {
        return Err(invalid());
    }

    Ok(format!("/{}", segments.join("/")))
}

/// Parse and validate one manifest into a mountable service.
pub fn load_service(components_root: &Path, manifest: &Path) -> Result<MountedService, ServiceError> {
    let prefix = mount_prefix(components_root, manifest)?;

    let text = std::fs::read_to_string(manifest).map_err(|source| ServiceError::Read {
        path: manifest.to_path_buf(),
        source,
    })?;
    let text = text.strip_prefix('\u{feff}').unwrap_or(&text);
    let parsed: ServiceManifest = serde_json::from_str(text).map_err(|source| ServiceError::Parse {
        path: manifest.to_path_buf(),
        source,
    })?;
    if parsed.routes.is_empty() {
        return Err(ServiceError::NoRoutes {
            path: manifest.to_path_buf(),
        });
    }

    let base_dir = manifest.parent().unwrap_or(components_root);
    let mut by_path: BTreeMap<String, MethodRouter> = BTreeMap::new();
    let mut routes = Vec::with_capacity(parsed.routes.len());

    for (index, route) in parsed.routes.into_iter().enumerate() {
        let invalid = |reason: String| ServiceError::InvalidRoute {
            path: manifest.to_path_buf(),
            index,
            reason,
        };

        if !route.path.starts_with('/') {
            return Err(invalid(format!("path `{}` must start with '/'", route.path)));
        }
        if route.path.contains(['{', '}', '*', ':']) {
            return Err(invalid(format!("path `{}` must be literal", route.path)));
        }
        let method = Method::from_bytes(route.method.to_ascii_uppercase().as_bytes())
            .map_err(|_| invalid(format!("unknown method `{}`", route.method)))?;
        let filter = MethodFilter::try_from(method.clone())
            .map_err(|_| invalid(format!("method `{method}` cannot be routed")))?;
        let label = format!("{method} {}", route.path);
        if routes.contains(&label) {
            return Err(invalid(format!("duplicate route `{label}`")));
        }
        // A GET route already answers HEAD
        let head_pair = if method == Method::GET {
            Some(format!("HEAD {}", route.path))
        } else if method == Method::HEAD {
            Some(format!("GET {}", route.path))
        } else {
            None
        };
        if head_pair.is_some_and(|other| routes.contains(&other)) {
            return Err(invalid(format!("`{label}` overlaps the GET route for the same path")));
        }

        let reply = prepare_reply(base_dir, &route).map_err(invalid)?;
        let handler = move || {
            let reply = reply.clone();
            async move { reply }
        };

        let method_router = match by_path.remove(&route.path) {
            Some(existing) => existing.on(filter, handler),
            None => on(filter, handler),
        };
        by_path.insert(route.path, method_router);
        routes.push(label);
    }

    let mut paths = Vec::with_capacity(by_path.len());
    let mut router = Router::new();
    for (path, method_router) in by_path {
        let full = full_path(&prefix, &path);
        router = router.route(&full, method_router);
        paths.push(full);
    }

    Ok(MountedService {
        prefix,
        manifest: manifest.to_path_buf(),
        routes,
        paths,
        router,
    })
}

/// `/` maps to the prefix itself.
fn full_path(prefix: &str, path: &str) -> String {
    if path == "/" {
        prefix.to_string()
    } else {
        format!("{prefix}{path}")
    }
}

fn prepare_reply(base_dir: &Path, route: &RouteSpec) -> Result<Reply, String> {
    let status = StatusCode::from_u16(route.status)
        .map_err(|_| format!("invalid status {}", route.status))?;

    let (default_type, body) = match (&route.body, &route.file) {
        (Some(_), Some(_)) => return Err("set either `body` or `file`, not both".to_string()),
        (None, None) => return Err("one of `body` or `file` is required".to_string()),
        (Some(serde_json::Value::String(text)), None) => {
            ("text/plain; charset=utf-8", Bytes::from(text.clone()))
        }
        (Some(value), None) => ("application/json", Bytes::from(value.to_string())),
        (None, Some(file)) => {
            if file.components().any(|c| !matches!(c, Component::Normal(_) | Component::CurDir)) {
                return Err(format!("file `{}` must stay inside the service directory", file.display()));
            }
            let path = base_dir.join(file);
            let bytes = std::fs::read(&path).map_err(|e| format!("{}: {e}", path.display()))?;
            ("application/octet-stream", Bytes::from(bytes))
        }
    };

    let content_type = route.content_type.as_deref().unwrap_or(default_type);
    let content_type = HeaderValue::from_str(content_type)
        .map_err(|_| format!("invalid content type `{content_type}`"))?;

    Ok(Reply {
        status,
        content_type,
        body,
    })
}
