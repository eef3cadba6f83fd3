//! A stand-in EPC driver built from heap allocations.

#![allow(dead_code)]

use std::os::raw::{c_int, c_uint, c_void};
use std::ptr::{self, NonNull};
use std::sync::atomic::{AtomicUsize, Ordering};

use kvm_sgx::{EpcPage, ExportTable, Operation};
use sgx_epc_sys::{err_ptr, AllocPageFn, FreePageFn, GetPageFn, PutPageFn};

pub const PAGE_PA: u64 = 0x8000_3000;
pub const ENOMEM: c_int = 12;

/// Number of `sgx_free_page` calls that named an owning enclave.
pub static FREED_WITH_OWNER: AtomicUsize = AtomicUsize::new(0);

type PageContents = [u8; 4096];

unsafe extern "C" fn alloc_page(_flags: c_uint) -> *mut EpcPage {
    Box::into_raw(Box::new(EpcPage::new(PAGE_PA)))
}

unsafe extern "C" fn alloc_page_enomem(_flags: c_uint) -> *mut EpcPage {
    err_ptr(ENOMEM)
}

unsafe extern "C" fn alloc_page_null(_flags: c_uint) -> *mut EpcPage {
    ptr::null_mut()
}

unsafe extern "C" fn free_page(page: *mut EpcPage, encl: *mut c_void) -> c_int {
    if !encl.is_null() {
        FREED_WITH_OWNER.fetch_add(1, Ordering::SeqCst);
    }
    drop(Box::from_raw(page));
    0
}

unsafe extern "C" fn get_page(_page: *mut EpcPage) -> *mut c_void {
    Box::into_raw(Box::new([0u8; 4096])) as *mut c_void
}

unsafe extern "C" fn put_page(addr: *mut c_void) {
    drop(Box::from_raw(addr as *mut PageContents));
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Alloc {
    Page,
    Enomem,
    Null,
}

fn address(op: Operation, alloc: Alloc) -> NonNull<c_void> {
    let address = match op {
        Operation::AllocatePage => match alloc {
            Alloc::Page => alloc_page as AllocPageFn as *mut c_void,
            Alloc::Enomem => alloc_page_enomem as AllocPageFn as *mut c_void,
            Alloc::Null => alloc_page_null as AllocPageFn as *mut c_void,
        },
        Operation::FreePage => free_page as FreePageFn as *mut c_void,
        Operation::MapPage => get_page as GetPageFn as *mut c_void,
        Operation::UnmapPage => put_page as PutPageFn as *mut c_void,
    };
    NonNull::new(address).unwrap()
}

/// A driver that exports only `ops`.
pub fn driver_with(ops: &[Operation], alloc: Alloc) -> ExportTable {
    let mut table = ExportTable::new();
    for &op in ops {
        unsafe { table.export(op.symbol(), address(op, alloc)).unwrap() };
    }
    table
}

pub fn driver() -> ExportTable {
    driver_with(&Operation::ALL, Alloc::Page)
}

pub fn pins(table: &ExportTable) -> Vec<usize> {
    Operation::ALL
        .iter()
        .map(|op| table.pin_count(op.symbol()).unwrap_or(0))
        .collect()
}

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}
