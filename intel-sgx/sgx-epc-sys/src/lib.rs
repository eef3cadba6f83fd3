/* Copyright (c) Fortanix, Inc.
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

//! Raw interface of an SGX EPC page driver.
//!
//! The driver exports four functions that a hypervisor needs in order to back
//! guest enclave memory with EPC pages. This crate only describes their
//! shapes. Binding to them at runtime is the job of the `kvm-sgx` crate.

#![doc(html_logo_url = "https://edp.fortanix.com/img/docs/edp-logo.svg",
       html_favicon_url = "https://edp.fortanix.com/favicon.ico",
       html_root_url = "https://edp.fortanix.com/docs/api/")]

#[macro_use]
extern crate bitflags;

use std::os::raw::{c_int, c_uint, c_void};

pub const PAGE_SHIFT: u32 = 12;
pub const PAGE_SIZE: u64 = 1 << PAGE_SHIFT;

/// Largest errno value that can be encoded in a returned pointer.
pub const MAX_ERRNO: usize = 4095;

/// Shared object that exports the driver interface, unless configured
/// otherwise.
pub const DEFAULT_LIBRARY: &str = "libsgx_epc.so.1";

bitflags! {
    pub struct AllocFlags: c_uint {
        /// Fail instead of waiting for the driver to reclaim pages.
        const ATOMIC = 0x1;
    }
}

/// A page of the Enclave Page Cache, as tracked by the driver.
///
/// The driver keeps more bookkeeping after `pa`. Only the physical address is
/// part of the shared interface.
#[repr(C)]
#[derive(Debug)]
pub struct EpcPage {
    pub pa: u64,
    _driver: [u8; 0],
}

impl EpcPage {
    pub const fn new(pa: u64) -> EpcPage {
        EpcPage { pa, _driver: [] }
    }
}

pub const SYM_ALLOC_PAGE: &str = "sgx_alloc_page";
pub type AllocPageFn = unsafe extern "C" fn(flags: c_uint) -> *mut EpcPage;

/// The driver's signature takes the owning enclave. Callers that do not track
/// enclaves pass null.
pub const SYM_FREE_PAGE: &str = "sgx_free_page";
pub type FreePageFn = unsafe extern "C" fn(page: *mut EpcPage, encl: *mut c_void) -> c_int;

/// Maps the page into the kernel address space.
pub const SYM_GET_PAGE: &str = "sgx_get_page";
pub type GetPageFn = unsafe extern "C" fn(page: *mut EpcPage) -> *mut c_void;

/// Undoes `sgx_get_page`.
pub const SYM_PUT_PAGE: &str = "sgx_put_page";
pub type PutPageFn = unsafe extern "C" fn(addr: *mut c_void);

/// Encode `errno` (a positive error number) as a pointer, the way
/// `sgx_alloc_page` reports failures.
pub fn err_ptr<T>(errno: c_int) -> *mut T {
    debug_assert!(errno > 0 && errno as usize <= MAX_ERRNO);
    (-(errno as isize)) as usize as *mut T
}

pub fn is_err<T>(ptr: *const T) -> bool {
    ptr as usize >= (-(MAX_ERRNO as isize)) as usize
}

pub fn is_err_or_null<T>(ptr: *const T) -> bool {
    ptr.is_null() || is_err(ptr)
}

/// The errno encoded in `ptr`, if it is an error pointer.
pub fn ptr_err<T>(ptr: *const T) -> Option<c_int> {
    if is_err(ptr) {
        Some(-(ptr as isize) as c_int)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ENOMEM: c_int = 12;

    #[test]
    fn error_pointers() {
        let p = err_ptr::<EpcPage>(ENOMEM);
        assert!(is_err(p));
        assert!(is_err_or_null(p));
        assert_eq!(ptr_err(p), Some(ENOMEM));

        assert!(is_err(err_ptr::<EpcPage>(MAX_ERRNO as c_int)));
    }

    #[test]
    fn valid_pointers() {
        let page = EpcPage::new(0x7000_0000);
        let p = &page as *const EpcPage;
        assert!(!is_err(p));
        assert!(!is_err_or_null(p));
        assert_eq!(ptr_err(p), None);

        let null = std::ptr::null::<EpcPage>();
        assert!(!is_err(null));
        assert!(is_err_or_null(null));
    }

    #[test]
    fn page_size() {
        assert_eq!(PAGE_SIZE, 4096);
    }
}
