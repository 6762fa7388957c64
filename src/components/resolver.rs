//! Filesystem locations of component config and view files.
//!
//! Nothing here is cached: directory existence can change between
//! rebuilds, so every lookup consults the filesystem.

use std::path::{Path, PathBuf};

use super::ComponentKey;

/// Resolves component directories, config candidates and views
/// relative to `{home}/components`.
#[derive(Debug, Clone)]
pub struct PathResolver {
    components_root: PathBuf,
}

impl PathResolver {
    /// Create a resolver for the application rooted at `home`.
    pub fn new(home: impl AsRef<Path>) -> Self {
        Self {
            components_root: home.as_ref().join("components"),
        }
    }

    /// The shared components directory.
    pub fn components_root(&self) -> &Path {
        &self.components_root
    }

    /// `{root}/{component}` when that directory exists, otherwise the
    /// shared components root. A missing directory is not an error.
    pub fn resolve_root(&self, component: &str) -> PathBuf {
        let dir = self.components_root.join(component);
        if dir.is_dir() {
            dir
        } else {
            self.components_root.clone()
        }
    }

    /// Config files to try, in priority order.
    ///
    /// - `component`: `{root}/{component}.config.json`
    /// - `component/sub`: `{root}/{sub}/{sub}.config.json`, then
    ///   `{root}/{sub}/{component}.{sub}.config.json`
    pub fn config_candidates(&self, key: &ComponentKey) -> Vec<PathBuf> {
        let root = self.resolve_root(key.component());
        match key.subcomponent() {
            None => vec![root.join(format!("{}.config.json", key.component()))],
            Some(sub) => {
                let dir = root.join(sub);
                vec![
                    dir.join(format!("{sub}.config.json")),
                    dir.join(format!("{}.{sub}.config.json", key.component())),
                ]
            }
        }
    }

    /// Directory of a subcomponent, if the key names one and it exists.
    pub fn subcomponent_dir(&self, key: &ComponentKey) -> Option<PathBuf> {
        let sub = key.subcomponent()?;
        let dir = self.resolve_root(key.component()).join(sub);
        dir.is_dir().then_some(dir)
    }

    /// View path without its extension: `{root}/{component}.view` or
    /// `{root}/{sub}/{sub}.view`.
    pub fn view_base(&self, key: &ComponentKey) -> PathBuf {
        let root = self.resolve_root(key.component());
        match key.subcomponent() {
            None => root.join(format!("{}.view", key.component())),
            Some(sub) => root.join(sub).join(format!("{sub}.view")),
        }
    }

    /// First file matching `{base}.*`, or `None` when the view is missing.
    pub fn resolve_view(&self, base: &Path) -> Option<PathBuf> {
        let base = base.to_str()?;
        let pattern = format!("{}.*", glob::Pattern::escape(base));
        let matches = glob::glob(&pattern).ok()?;
        matches.filter_map(Result::ok).find(|path| path.is_file())
    }
}
