use assert_cmd::Command;
use assert_cmd::cargo;
use std::fs;
use tempfile::tempdir;

fn drubuild() -> Command {
    Command::new(cargo::cargo_bin!("drubuild"))
}

#[test]
fn test_resolve_with_vendor_rule() {
    let dir = tempdir().unwrap();
    let config = dir.path().join("composer.json");
    fs::write(
        &config,
        r#"{"extra": {"drupal-modules": {"acme/*": "contrib"}}}"#,
    )
    .unwrap();

    drubuild()
        .arg("resolve")
        .arg("acme/widgets")
        .arg("--config")
        .arg(&config)
        .assert()
        .success()
        .stdout(predicates::str::contains(
            "core/sites/all/modules/contrib/widgets",
        ));
}

#[test]
fn test_resolve_unmatched_module_uses_custom_bucket() {
    drubuild()
        .arg("resolve")
        .arg("other/thing")
        .assert()
        .success()
        .stdout(predicates::str::contains(
            "core/sites/all/modules/custom/thing",
        ));
}

#[test]
fn test_resolve_root_package() {
    let dir = tempdir().unwrap();
    let config = dir.path().join("composer.json");
    fs::write(&config, r#"{"extra": {"drupal-root": "web"}}"#).unwrap();

    drubuild()
        .arg("resolve")
        .arg("drupal/drupal")
        .arg("--type")
        .arg("drupal-core")
        .arg("--config")
        .arg(&config)
        .assert()
        .success()
        .stdout(predicates::str::diff("web\n"));
}

#[test]
fn test_resolve_library_without_rule_has_no_opinion() {
    drubuild()
        .arg("resolve")
        .arg("other/lib")
        .arg("--type")
        .arg("library")
        .assert()
        .success()
        .stdout(predicates::str::contains("(host default)"));
}

#[test]
fn test_resolve_rejects_malformed_name() {
    drubuild()
        .arg("resolve")
        .arg("not-a-package")
        .assert()
        .failure();
}

#[test]
fn test_resolve_rejects_unreadable_config() {
    drubuild()
        .arg("resolve")
        .arg("acme/widgets")
        .arg("--config")
        .arg("/nonexistent/composer.json")
        .assert()
        .failure()
        .stderr(predicates::str::contains("cannot read configuration"));
}

#[test]
fn test_version_canonical_and_display() {
    drubuild()
        .arg("version")
        .arg("7.1.2")
        .arg("--package")
        .arg("drupal/views")
        .assert()
        .success()
        .stdout(predicates::str::contains("canonical: 7.1.2.5"))
        .stdout(predicates::str::contains("display:   7.x-1.2"));
}

#[test]
fn test_version_with_distribution_series() {
    drubuild()
        .arg("version")
        .arg("3.24.0")
        .arg("--package")
        .arg("drupal/views")
        .arg("--series")
        .arg("7")
        .assert()
        .success()
        .stdout(predicates::str::contains("display:   7.x-3.24.0"));
}

#[test]
fn test_version_prerelease_ordering_components() {
    drubuild()
        .arg("version")
        .arg("1.0.0-rc1")
        .assert()
        .success()
        .stdout(predicates::str::contains("canonical: 1.0.0.4.1"));
}

#[test]
fn test_no_subcommand_fails() {
    drubuild().assert().failure();
}
