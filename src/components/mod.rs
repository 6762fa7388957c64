//! Component addressing and filesystem resolution.
//!
//! A component lives under `{home}/components/{component}` and may own
//! subcomponents one level below it. This module turns request path
//! segments into a [`ComponentKey`] and resolves where that component's
//! config and view files are expected to be.

mod key;
mod resolver;

pub use key::{ComponentKey, KeyError};
pub use resolver::PathResolver;
