use roost::Settings;
use roost::config::{CONFIG_FILE, Overrides};
use std::env;
use tempfile::TempDir;

// Both cases live in one test: the process environment is shared between
// concurrently running tests.
#[test]
fn test_env_layering() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join(CONFIG_FILE);
    std::fs::write(
        &config_path,
        "[server]\nport = 7000\nentrypoint = \"home\"\n\n[workers]\ncount = 3\n",
    )
    .unwrap();

    unsafe {
        // Use double underscore to separate nested levels
        env::set_var("ROOST_SERVER__PORT", "9999");
        env::set_var("ROOST_CACHE__BACKEND", "memory");
        env::set_var("ROOST_BUILD__WATCH", "false");
    }

    // Environment beats the file
    let settings = Settings::load(Some(&config_path), &Overrides::default()).unwrap();
    assert_eq!(settings.server.port, 9999, "port should come from env");
    assert_eq!(settings.server.entrypoint, "home", "file value without env override");
    assert_eq!(settings.workers.count, 3);
    assert_eq!(settings.cache.backend, roost::config::CacheBackend::Memory);
    assert!(!settings.build.watch);

    // CLI beats the environment
    let overrides = Overrides {
        port: Some(8123),
        ..Overrides::default()
    };
    let settings = Settings::load(Some(&config_path), &overrides).unwrap();
    assert_eq!(settings.server.port, 8123, "port should come from CLI");

    unsafe {
        // Clean up
        env::remove_var("ROOST_SERVER__PORT");
        env::remove_var("ROOST_CACHE__BACKEND");
        env::remove_var("ROOST_BUILD__WATCH");
    }
}
