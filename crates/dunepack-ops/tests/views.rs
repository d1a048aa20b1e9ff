use std::fs;
use std::path::PathBuf;

use dunepack_core::config::GlobalConfig;
use dunepack_core::recipe::Recipe;
use dunepack_core::repository::RecipeRepository;
use dunepack_ops::ops_check::check_repository;
use dunepack_ops::ops_conflicts::conflict_report;
use dunepack_ops::ops_info::{format_info, format_list};
use dunepack_ops::ops_setup::{recipe_dir, Context};
use dunepack_ops::ops_tree::{render_tree, TreeOptions};
use tempfile::TempDir;

fn recipes_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .unwrap()
        .parent()
        .unwrap()
        .join("recipes")
}

fn dune() -> Recipe {
    Recipe::from_path(&recipes_dir().join("dune.toml")).unwrap()
}

fn shipped() -> Context {
    let repo = RecipeRepository::load(&recipes_dir()).unwrap();
    Context::new(repo, GlobalConfig::default()).unwrap()
}

#[test]
fn test_shipped_repository_checks_clean() {
    let report = check_repository(&shipped());
    assert!(report.is_ok(), "failures: {:?}", report.failures);
    // Five default plans, dune's arpackpp dependency, and two
    // in-repository dependencies each for dorie, dune-randomfield and funcep.
    assert_eq!(report.checked, 12);
}

#[test]
fn test_check_reports_broken_dependency() {
    let tmp = TempDir::new().unwrap();
    fs::copy(recipes_dir().join("dune.toml"), tmp.path().join("dune.toml")).unwrap();
    fs::write(
        tmp.path().join("needs-pdelab.toml"),
        r#"
[package]
name = "needs-pdelab"
git = "https://example.org/needs-pdelab.git"

[[version]]
name = "master"
branch = "master"

[[dependencies]]
spec = "dune@2.7+pdelab"
"#,
    )
    .unwrap();

    let repo = RecipeRepository::load(tmp.path()).unwrap();
    let report = check_repository(&Context::new(repo, GlobalConfig::default()).unwrap());
    assert_eq!(report.failures.len(), 1);
    let failure = &report.failures[0];
    assert_eq!(failure.recipe, "needs-pdelab");
    assert_eq!(failure.spec, "dune@2.7+pdelab");
    assert!(failure.to_string().contains("requires '+functions'"));
}

#[test]
fn test_tree_of_one_module() {
    let opts = TreeOptions {
        module: Some("dune-pdelab".into()),
        ..TreeOptions::default()
    };
    let tree = render_tree(&shipped(), "dune", &opts).unwrap();
    assert!(tree.starts_with("dune-pdelab\n"));
    assert!(tree.contains("├── dune-functions"));
    assert!(tree.contains("dune-localfunctions"));
    assert!(tree.ends_with("\ndune-pdelab fetches 7 modules\n"));
}

#[test]
fn test_inverted_tree() {
    let opts = TreeOptions {
        module: Some("dune-typetree".into()),
        inverted: true,
        depth: None,
    };
    let tree = render_tree(&shipped(), "dune", &opts).unwrap();
    assert!(tree.contains("dune-multidomaingrid"));
    assert!(tree.contains("dune-functions"));
    assert!(tree.contains("dune-codegen"));
}

#[test]
fn test_tree_of_all_roots() {
    let tree = render_tree(&shipped(), "dune", &TreeOptions::default()).unwrap();
    assert!(tree.contains("dune-codegen\n"));
    assert!(tree.contains("dune-python\n"));
    assert!(tree.starts_with("dune-codegen\n"));
}

#[test]
fn test_tree_unknown_module() {
    let opts = TreeOptions {
        module: Some("dune-nope".into()),
        ..TreeOptions::default()
    };
    let err = render_tree(&shipped(), "dune", &opts).unwrap_err();
    assert_eq!(err.to_string(), "Package 'dune' has no module 'dune-nope'");
}

#[test]
fn test_inverted_tree_unknown_module() {
    let opts = TreeOptions {
        module: Some("dune-nope".into()),
        inverted: true,
        depth: None,
    };
    let err = render_tree(&shipped(), "dune", &opts).unwrap_err();
    assert_eq!(err.to_string(), "Package 'dune' has no module 'dune-nope'");
}

#[test]
fn test_tree_of_leaf_module() {
    let opts = TreeOptions {
        module: Some("dune-geometry".into()),
        ..TreeOptions::default()
    };
    let tree = render_tree(&shipped(), "dune", &opts).unwrap();
    assert_eq!(tree, "dune-geometry\n\ndune-geometry fetches 1 module\n");
}

#[test]
fn test_tree_unknown_package() {
    let err = render_tree(&shipped(), "nope", &TreeOptions::default()).unwrap_err();
    assert_eq!(err.to_string(), "Unknown package 'nope'");
}

#[test]
fn test_info_lists_modules_and_variants() {
    let info = format_info(&dune());
    assert!(info.starts_with("dune\n"));
    assert!(info.contains("releases/2.7"));
    assert!(info.contains("+shared"));
    assert!(info.contains("branch master (development)"));
    assert!(info.contains("[dune-pdelab]"));
    assert!(info.contains("dune-codegen -> dune-pdelab, dune-testtools, dune-alugrid (only master, 2.7)"));
    assert!(info.contains("dune-fempy -> dune-fem when +fem+python"));
}

#[test]
fn test_list() {
    let repo = RecipeRepository::load(&recipes_dir()).unwrap();
    let list = format_list(&repo);
    assert_eq!(list.lines().count(), 5);
    assert!(list.lines().next().unwrap().starts_with("arpackpp"));
    assert!(list.contains("2.3.0"));

    assert_eq!(format_list(&RecipeRepository::default()), "No recipes found.\n");
}

#[test]
fn test_conflict_report() {
    let report = conflict_report(&shipped(), "dune").unwrap();
    assert_eq!(report.declared.len(), 1);
    let text = report.to_string();
    assert!(text.contains("+pdelab requires +functions"));
    assert!(text.contains("@2.6 when +codegen"));
}

#[test]
fn test_explicit_recipe_dir_wins() {
    let tmp = TempDir::new().unwrap();
    assert_eq!(recipe_dir(Some(tmp.path())).unwrap(), tmp.path());
}
