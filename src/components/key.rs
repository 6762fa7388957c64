//! Cache keys for components and component/subcomponent pairs.

use std::fmt;

use thiserror::Error;

/// Errors produced when a path segment cannot name a component.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KeyError {
    #[error("component segment is empty")]
    Empty,

    #[error("invalid component segment '{segment}': {reason}")]
    InvalidSegment { segment: String, reason: &'static str },

    #[error("component key '{key}' has more than two segments")]
    TooDeep { key: String },
}

/// Identifies a component (`nav`) or a subcomponent (`nav/header`).
///
/// The joined form is used verbatim as the shared cache key, so a request
/// for `/nav/header` and a direct lookup of `"nav/header"` address the
/// same entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ComponentKey {
    component: String,
    subcomponent: Option<String>,
    joined: String,
}

impl ComponentKey {
    /// Build a key from already-split request segments.
    pub fn new(component: &str, subcomponent: Option<&str>) -> Result<Self, KeyError> {
        validate_segment(component)?;
        if let Some(sub) = subcomponent {
            validate_segment(sub)?;
        }

        let joined = match subcomponent {
            Some(sub) => format!("{component}/{sub}"),
            None => component.to_string(),
        };

        Ok(Self {
            component: component.to_string(),
            subcomponent: subcomponent.map(str::to_string),
            joined,
        })
    }

    /// Parse a joined key such as `nav` or `nav/header`.
    pub fn parse(key: &str) -> Result<Self, KeyError> {
        let mut parts = key.splitn(3, '/');
        let component = parts.next().unwrap_or_default();
        let subcomponent = parts.next();
        if parts.next().is_some() {
            return Err(KeyError::TooDeep {
                key: key.to_string(),
            });
        }
        Self::new(component, subcomponent)
    }

    pub fn component(&self) -> &str {
        &self.component
    }

    pub fn subcomponent(&self) -> Option<&str> {
        self.subcomponent.as_deref()
    }

    /// The cache key string.
    pub fn as_str(&self) -> &str {
        &self.joined
    }
}

impl fmt::Display for ComponentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.joined)
    }
}

fn validate_segment(segment: &str) -> Result<(), KeyError> {
    if segment.is_empty() {
        return Err(KeyError::Empty);
    }
    let reason = if segment == "." || segment == ".." {
        Some("relative path segment")
    } else if segment.contains(['/', '\\']) {
        Some("contains a path separator")
    } else if segment.contains('\0') {
        Some("contains a NUL byte")
    } else {
        None
    };
    match reason {
        Some(reason) => Err(KeyError::InvalidSegment {
            segment: segment.to_string(),
            reason,
        }),
        None => Ok(()),
    }
}
