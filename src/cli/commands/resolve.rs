//! Resolve command - show how a component's config is found on disk.

use crate::cache::resolve;
use crate::components::{ComponentKey, PathResolver};
use crate::config::Settings;

/// Run the resolve command. Reads only; the cache is not touched.
pub async fn run(settings: &Settings, component: &str, subcomponent: Option<&str>) {
    let key = match ComponentKey::new(component, subcomponent) {
        Ok(key) => key,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    let resolver = PathResolver::new(&settings.home);
    let candidates = resolver.config_candidates(&key);
    let resolution = resolve::load_first_valid(&candidates).await;

    println!("Key: {key}");
    println!("Candidates:");
    for candidate in &candidates {
        let marker = if resolution.source.as_ref() == Some(candidate) {
            "used"
        } else if resolution.attempted.contains(candidate) {
            "skipped"
        } else {
            "not read"
        };
        println!("  [{marker}] {}", candidate.display());
    }

    match resolver.resolve_view(&resolver.view_base(&key)) {
        Some(view) => println!("View: {}", view.display()),
        None => println!("View: (none)"),
    }

    println!("Document:");
    match serde_json::to_string_pretty(&resolution.document) {
        Ok(json) => println!("{json}"),
        Err(e) => eprintln!("Error displaying document: {e}"),
    }
}
