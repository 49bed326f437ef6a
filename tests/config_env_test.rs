use docqa::Settings;
use std::env;
use std::fs;
use tempfile::TempDir;

// Environment variables are process-global, so every layering check lives
// in this single test.
#[test]
fn test_env_overrides_file_and_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("settings.toml");
    fs::write(
        &config_path,
        r#"
collection = "from-file"

[generation]
model = "file-model"
timeout_secs = 42

[chunking]
chunk_size = 900
"#,
    )
    .unwrap();

    unsafe {
        // Double underscore separates nested levels
        env::set_var("DOCQA_GENERATION__MODEL", "env-model");
        env::set_var("DOCQA_CHUNKING__OVERLAP", "150");
        env::set_var("DOCQA_SERVER__BIND", "0.0.0.0:9000");
        env::set_var("DOCQA_EMBEDDING__MODEL", "hashing");
    }

    let settings = Settings::load_from(&config_path);

    unsafe {
        env::remove_var("DOCQA_GENERATION__MODEL");
        env::remove_var("DOCQA_CHUNKING__OVERLAP");
        env::remove_var("DOCQA_SERVER__BIND");
        env::remove_var("DOCQA_EMBEDDING__MODEL");
    }

    let settings = settings.unwrap();

    // Env beats file
    assert_eq!(settings.generation.model, "env-model");
    // File beats defaults
    assert_eq!(settings.collection, "from-file");
    assert_eq!(settings.generation.timeout_secs, 42);
    assert_eq!(settings.chunking.chunk_size, 900);
    // Env fills keys the file never mentions
    assert_eq!(settings.chunking.overlap, 150);
    assert_eq!(settings.server.bind, "0.0.0.0:9000");
    assert_eq!(settings.embedding.model, "hashing");
    // Defaults remain elsewhere
    assert_eq!(settings.retrieval.search_k, 5);
    assert_eq!(settings.server.max_upload_bytes, 50 * 1024 * 1024);
    assert!(settings.validate().is_ok());
}
