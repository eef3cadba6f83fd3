use kvm_sgx::registry::{DlRegistry, LIBRARY_ENV};
use kvm_sgx::{Resolver, SgxVirt, SymbolRegistry, Unavailable};

#[test]
fn missing_library() {
    let mut sgx = SgxVirt::new(DlRegistry::new("libkvm-sgx-test-does-not-exist.so"));
    assert_eq!(
        sgx.feature_init(),
        Err(Unavailable {
            symbol: "sgx_alloc_page"
        })
    );
    assert!(!sgx.is_supported());
}

#[cfg_attr(not(all(target_os = "linux", target_env = "gnu")), ignore)]
#[test]
fn library_without_driver() {
    let mut resolver = Resolver::new(DlRegistry::new("libc.so.6"));
    assert_eq!(
        resolver.acquire(),
        Err(Unavailable {
            symbol: "sgx_alloc_page"
        })
    );
}

#[cfg_attr(not(all(target_os = "linux", target_env = "gnu")), ignore)]
#[test]
fn lookup_and_release() {
    let mut registry = DlRegistry::new("libc.so.6");
    let export = registry.lookup("getpid").expect("libc does not export getpid");
    assert_eq!(export.name(), "getpid");
    registry.release(export);
    assert!(registry.lookup("sgx_alloc_page").is_none());
}

#[test]
fn builder() {
    assert_eq!(
        DlRegistry::builder().build().path(),
        std::path::Path::new("libsgx_epc.so.1")
    );
    assert_eq!(
        DlRegistry::builder().library("/opt/sgx/libepc.so").build().path(),
        std::path::Path::new("/opt/sgx/libepc.so")
    );

    std::env::set_var(LIBRARY_ENV, "/run/epc/libsgx_epc.so");
    let registry = DlRegistry::builder()
        .library("/opt/sgx/libepc.so")
        .from_env()
        .build();
    std::env::remove_var(LIBRARY_ENV);
    assert_eq!(registry.path(), std::path::Path::new("/run/epc/libsgx_epc.so"));
}
