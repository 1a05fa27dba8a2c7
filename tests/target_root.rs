// tests/target_root.rs

//! Root isolation: every data path, lock and manifest hangs off the
//! `--root` prefix, so two roots never interfere.

mod common;

use blink::{Error, Lock};
use common::{pipeline_lock, with_installer, TestRoot};
use std::fs;

fn seed_simple_package(root: &TestRoot, name: &str) {
    let archive = format!("{name}.tar.gz");
    let sha = root.seed_targz(&archive, &[(&format!("{name}-1.0/README"), "hi")]);
    let recipe = serde_json::json!({
        "name": name,
        "version": "1.0",
        "release": 1,
        "source": {
            "url": format!("https://example.org/{archive}"),
            "type": "tar.gz",
            "sha256": sha
        },
        "build": { "kind": "toCompile" }
    })
    .to_string();
    root.seed_recipe(name, &recipe);
}

#[test]
fn test_roots_do_not_share_state() {
    let _guard = pipeline_lock();
    let root_a = TestRoot::new();
    let root_b = TestRoot::new();
    seed_simple_package(&root_a, "alpha");
    seed_simple_package(&root_b, "beta");

    with_installer(&root_a, &[], |installer, manifest| {
        installer.install("alpha", false).unwrap();
        assert!(manifest.is_installed("alpha").unwrap());
    });

    with_installer(&root_b, &[], |installer, manifest| {
        // Root B has its own repositories: alpha does not exist there.
        let err = installer.install("alpha", false).unwrap_err();
        assert!(matches!(err, Error::PackageNotFound(_)));
        assert!(manifest.load().unwrap().is_empty());

        installer.install("beta", false).unwrap();
        assert!(manifest.is_installed("beta").unwrap());
        assert!(!manifest.is_installed("alpha").unwrap());
    });

    // And root A never learned about beta.
    let manifest_a = root_a.manifest();
    assert!(manifest_a.is_installed("alpha").unwrap());
    assert!(!manifest_a.is_installed("beta").unwrap());
}

#[test]
fn test_lock_exclusion_per_root() {
    let root_a = TestRoot::new();
    let root_b = TestRoot::new();

    // Holder on root A blocks a second acquirer on A only.
    let mut held = Lock::acquire(&root_a.layout).unwrap();
    assert!(matches!(
        Lock::acquire(&root_a.layout),
        Err(Error::AnotherInstanceRunning(_))
    ));
    let mut other_root = Lock::acquire(&root_b.layout).unwrap();

    held.release().unwrap();
    other_root.release().unwrap();

    // Released: root A is acquirable again.
    Lock::acquire(&root_a.layout).unwrap().release().unwrap();
}

#[test]
fn test_loser_mutates_nothing() {
    let _guard = pipeline_lock();
    let root = TestRoot::new();
    seed_simple_package(&root, "alpha");

    // A competing process holds the lock; this invocation must stop
    // before touching any state.
    let mut held = Lock::acquire(&root.layout).unwrap();
    let manifest_before = fs::read_to_string(root.layout.manifest_file()).ok();

    assert!(matches!(
        Lock::acquire(&root.layout),
        Err(Error::AnotherInstanceRunning(_))
    ));

    let manifest_after = fs::read_to_string(root.layout.manifest_file()).ok();
    assert_eq!(manifest_before, manifest_after);
    held.release().unwrap();
}
