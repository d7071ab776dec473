// tests/resolution_properties.rs
//
// Module reference matching and shared-directory resolution.

use std::sync::Arc;

use appvisor::fs::RealFileSystem;
use appvisor::modules::{DependencyResolutionBridge, ModuleIdentity, ModuleResolver, ModuleVersion};
use proptest::prelude::*;

fn name() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9.]{0,12}"
}

fn version() -> impl Strategy<Value = ModuleVersion> {
    (0u64..20, 0u64..20, 0u64..20).prop_map(|(a, b, c)| ModuleVersion::new(a, b, c))
}

fn token() -> impl Strategy<Value = Option<String>> {
    proptest::option::of("[0-9a-f]{16}")
}

proptest! {
    #[test]
    fn an_identity_satisfies_itself(n in name(), v in proptest::option::of(version()), t in token()) {
        let mut id = ModuleIdentity::new(n);
        id.version = v;
        id.public_key_token = t;
        prop_assert!(id.satisfies(&id));
    }

    #[test]
    fn names_and_tokens_compare_case_insensitively(n in name(), v in version(), t in "[0-9a-f]{16}") {
        let candidate = ModuleIdentity::new(n.to_ascii_uppercase())
            .with_version(v)
            .with_public_key_token(t.to_ascii_uppercase());
        let request = ModuleIdentity::new(n).with_version(v).with_public_key_token(t);
        prop_assert!(candidate.satisfies(&request));
    }

    #[test]
    fn a_different_major_never_satisfies(n in name(), want in version(), have in version()) {
        prop_assume!(want.major != have.major);
        let candidate = ModuleIdentity::new(n.clone()).with_version(have);
        let request = ModuleIdentity::new(n).with_version(want);
        prop_assert!(!candidate.satisfies(&request));
    }

    #[test]
    fn same_major_satisfies_exactly_when_not_older(n in name(), want in version(), minor in 0u64..20, patch in 0u64..20) {
        let have = ModuleVersion::new(want.major, minor, patch);
        let candidate = ModuleIdentity::new(n.clone()).with_version(have);
        let request = ModuleIdentity::new(n).with_version(want);
        prop_assert_eq!(candidate.satisfies(&request), have >= want);
    }

    #[test]
    fn display_round_trips_through_parsing(n in name(), v in version(), t in token()) {
        let mut id = ModuleIdentity::new(n).with_version(v);
        id.public_key_token = t;
        let parsed: ModuleIdentity = id.to_string().parse().unwrap();
        prop_assert_eq!(parsed, id);
    }
}

#[test]
fn bridge_resolves_from_a_real_directory_and_caches_handles() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("framework.core-2.1.0.dll"), b"v2.1").unwrap();
    std::fs::write(dir.path().join("framework.core-3.0.0.dll"), b"v3").unwrap();
    std::fs::write(dir.path().join("README.txt"), b"not a module").unwrap();

    let bridge = DependencyResolutionBridge::new(dir.path(), Arc::new(RealFileSystem));
    assert_eq!(bridge.candidates().len(), 2);

    let request: ModuleIdentity = "Framework.Core-2.0.0".parse().unwrap();
    let first = bridge.resolve(&request).unwrap();
    assert_eq!(first.bytes(), b"v2.1");
    assert_eq!(first.identity().version, Some(ModuleVersion::new(2, 1, 0)));

    let again = bridge.resolve(&"framework.core-2.1.0".parse().unwrap()).unwrap();
    assert!(Arc::ptr_eq(&first, &again));

    let v3 = bridge.resolve(&"framework.core-3".parse().unwrap()).unwrap();
    assert_eq!(v3.bytes(), b"v3");

    assert!(bridge.resolve(&"framework.core-4.0.0".parse().unwrap()).is_none());
    assert!(bridge.resolve(&"missing".parse().unwrap()).is_none());
}

#[test]
fn bridge_over_a_missing_directory_resolves_nothing() {
    let bridge = DependencyResolutionBridge::new("/definitely/not/here", Arc::new(RealFileSystem));
    assert!(bridge.candidates().is_empty());
    assert!(bridge.resolve(&"anything".parse().unwrap()).is_none());
}
