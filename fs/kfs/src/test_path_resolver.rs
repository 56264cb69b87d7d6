//! Unit tests for PathResolver.

#![cfg(test)]

use crate::{PathResolver, SYMLOOP_MAX};

#[test]
fn test_path_resolver_symloop_config() {
    assert_eq!(PathResolver::new().symloop_max(), SYMLOOP_MAX);
    assert_eq!(PathResolver::default().symloop_max(), SYMLOOP_MAX);
    assert_eq!(PathResolver::with_symloop_max(100).symloop_max(), 100);
}

#[test]
fn test_path_resolver_copy() {
    let resolver1 = PathResolver::with_symloop_max(8);
    let resolver2 = resolver1;
    assert_eq!(resolver1.symloop_max(), resolver2.symloop_max());
}
