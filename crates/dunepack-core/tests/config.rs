use dunepack_core::config::{dirs_path, GlobalConfig};
use tempfile::TempDir;

#[test]
fn test_global_config_default_build_type() {
    let config = GlobalConfig::default();
    assert_eq!(config.build.build_type, "RelWithDebInfo");
}

#[test]
fn test_global_config_default_no_extra_recipes() {
    let config = GlobalConfig::default();
    assert!(config.recipes.paths.is_empty());
    assert!(config.recipe_paths().is_empty());
}

#[test]
fn test_global_config_empty_toml_uses_defaults() {
    let config: GlobalConfig = toml::from_str("").unwrap();
    assert_eq!(config.build.build_type, "RelWithDebInfo");
    assert_eq!(config.build.prefix, "~/.dunepack/opt/{name}-{version}");
}

#[test]
fn test_dirs_path_contains_dunepack() {
    assert!(dirs_path().ends_with(".dunepack"));
}

#[test]
fn test_prefix_template_expansion() {
    let config: GlobalConfig = toml::from_str(
        r#"
[build]
prefix = "/opt/{name}/{version}"
"#,
    )
    .unwrap();
    let prefix = config.build.prefix_for("dune", "2.7");
    assert_eq!(prefix, std::path::PathBuf::from("/opt/dune/2.7"));
}

#[test]
fn test_global_config_parse_from_toml() {
    let toml = r#"
[recipes]
paths = ["/srv/recipes", "~/my-recipes"]

[build]
build-type = "Release"
"#;
    let config: GlobalConfig = toml::from_str(toml).unwrap();
    assert_eq!(config.build.build_type, "Release");
    let paths = config.recipe_paths();
    assert_eq!(paths[0], std::path::PathBuf::from("/srv/recipes"));
    assert!(paths[1].ends_with("my-recipes"));
}

#[test]
fn test_load_from_missing_file_is_default() {
    let tmp = TempDir::new().unwrap();
    let config = GlobalConfig::load_from(&tmp.path().join("config.toml")).unwrap();
    assert_eq!(config.build.build_type, "RelWithDebInfo");
}

#[test]
fn test_load_from_invalid_file_errors() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("config.toml");
    std::fs::write(&path, "[build\nbuild-type = ").unwrap();
    let err = GlobalConfig::load_from(&path).unwrap_err();
    assert!(err.to_string().contains("Failed to parse global config"), "got: {err}");
}
