// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn short_base_dir_joins_directly() {
    let resolver = SocketPathResolver::new("/tmp/iota-applet-engine");
    let path = resolver.resolve("bichat.sock").unwrap();
    assert_eq!(path, PathBuf::from("/tmp/iota-applet-engine/bichat.sock"));
}

#[test]
fn long_base_dir_falls_back_to_short_hashed_dir() {
    let long_component = "x".repeat(150);
    let base = PathBuf::from("/tmp").join(long_component);
    let resolver = SocketPathResolver::new(base);
    let path = resolver.resolve("bichat.sock").unwrap();

    let path_str = path.to_string_lossy();
    assert!(path_str.starts_with("/tmp/iota-ae-"));
    assert!(path_str.ends_with("/bichat.sock"));
    assert!(path.parent().unwrap().exists());
}

#[test]
fn fallback_directory_is_deterministic_for_same_base_dir() {
    let long_component = "y".repeat(150);
    let base = PathBuf::from("/tmp").join(&long_component);
    let a = SocketPathResolver::new(base.clone()).resolve("a.sock").unwrap();
    let b = SocketPathResolver::new(base).resolve("b.sock").unwrap();
    assert_eq!(a.parent(), b.parent());
}
