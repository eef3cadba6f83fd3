/* Copyright (c) Fortanix, Inc.
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

//! Typed access to the bound EPC page operations.
//!
//! These are only meaningful once [`Resolver::acquire`] has succeeded. Using
//! them before that, or after [`Resolver::release`], is a bug in the caller
//! and panics.

use std::os::raw::c_void;
use std::ptr::{self, NonNull};

use sgx_epc_sys::{is_err_or_null, ptr_err, AllocFlags, EpcPage, PAGE_SHIFT};

use crate::registry::SymbolRegistry;
use crate::resolver::{Operation, OperationTable, Resolver};
use crate::LOG_TARGET;

/// An EPC page owned by the driver.
///
/// Obtained from [`Resolver::allocate`] and given back with
/// [`Resolver::free`].
#[derive(Debug, PartialEq, Eq)]
pub struct EpcPageHandle(NonNull<EpcPage>);

// EPC pages are global driver objects, not tied to the allocating thread.
unsafe impl Send for EpcPageHandle {}

impl EpcPageHandle {
    /// # Safety
    /// `page` must point to a live page descriptor, and stay live until the
    /// handle is freed or turned back into a raw pointer.
    pub unsafe fn from_raw(page: NonNull<EpcPage>) -> EpcPageHandle {
        EpcPageHandle(page)
    }

    pub fn into_raw(self) -> NonNull<EpcPage> {
        self.0
    }

    pub fn as_ptr(&self) -> *mut EpcPage {
        self.0.as_ptr()
    }

    /// Physical address of the page.
    pub fn pa(&self) -> u64 {
        unsafe { self.0.as_ref().pa }
    }

    /// Physical frame number of the page.
    pub fn pfn(&self) -> u64 {
        self.pa() >> PAGE_SHIFT
    }
}

/// Physical frame number of `page`. Does not involve the driver.
pub fn page_to_pfn(page: &EpcPageHandle) -> u64 {
    page.pfn()
}

impl<R: SymbolRegistry> Resolver<R> {
    fn bound(&self, op: Operation) -> &OperationTable<R::Pin> {
        match self.table {
            Some(ref table) => table,
            None => panic!("SGX: {} used while the EPC driver is not bound", op),
        }
    }

    /// Allocates an EPC page. `None` if the driver has none to give.
    pub fn allocate(&self, flags: AllocFlags) -> Option<EpcPageHandle> {
        let ops = self.bound(Operation::AllocatePage);
        let page = unsafe { (ops.alloc_page)(flags.bits()) };

        // The driver reports errors as error pointers rather than null.
        if is_err_or_null(page) {
            if let Some(errno) = ptr_err(page) {
                debug!(target: LOG_TARGET, "EPC page allocation failed: errno {}", errno);
            }
            return None;
        }
        NonNull::new(page).map(EpcPageHandle)
    }

    /// Returns `page` to the driver.
    pub fn free(&self, page: EpcPageHandle) {
        let ops = self.bound(Operation::FreePage);
        // No enclave accounting here: the owner is always null.
        let ret = unsafe { (ops.free_page)(page.into_raw().as_ptr(), ptr::null_mut()) };
        if ret != 0 {
            debug!(target: LOG_TARGET, "sgx_free_page returned {}", ret);
        }
    }

    /// Maps `page` and returns the address of its contents. The mapping lasts
    /// until the address is passed to [`unmap`](Self::unmap).
    pub fn map(&self, page: &EpcPageHandle) -> *mut c_void {
        let ops = self.bound(Operation::MapPage);
        unsafe { (ops.get_page)(page.as_ptr()) }
    }

    /// # Safety
    /// `addr` must come from [`map`](Self::map) on this binding and must not
    /// have been unmapped yet.
    pub unsafe fn unmap(&self, addr: *mut c_void) {
        let ops = self.bound(Operation::UnmapPage);
        (ops.put_page)(addr)
    }
}
