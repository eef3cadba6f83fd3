/* Copyright (c) Fortanix, Inc.
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

use std::fmt;
use std::mem;
use std::os::raw::c_void;

use sgx_epc_sys::{
    AllocPageFn, FreePageFn, GetPageFn, PutPageFn, SYM_ALLOC_PAGE, SYM_FREE_PAGE, SYM_GET_PAGE,
    SYM_PUT_PAGE,
};

use crate::error::Unavailable;
use crate::registry::{Export, SymbolRegistry};
use crate::LOG_TARGET;

/// The driver operations the hypervisor binds to.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Operation {
    AllocatePage,
    FreePage,
    MapPage,
    UnmapPage,
}

impl Operation {
    /// Resolution order. Bindings are released in this order too.
    pub const ALL: [Operation; 4] = [
        Operation::AllocatePage,
        Operation::FreePage,
        Operation::MapPage,
        Operation::UnmapPage,
    ];

    /// Name of the driver export implementing this operation.
    pub fn symbol(self) -> &'static str {
        match self {
            Operation::AllocatePage => SYM_ALLOC_PAGE,
            Operation::FreePage => SYM_FREE_PAGE,
            Operation::MapPage => SYM_GET_PAGE,
            Operation::UnmapPage => SYM_PUT_PAGE,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            Operation::AllocatePage => "allocate_page",
            Operation::FreePage => "free_page",
            Operation::MapPage => "map_page",
            Operation::UnmapPage => "unmap_page",
        })
    }
}

/// All four driver operations. There is no partially filled table: the
/// resolver either has one of these or nothing.
pub(crate) struct OperationTable<P> {
    pub alloc_page: AllocPageFn,
    pub free_page: FreePageFn,
    pub get_page: GetPageFn,
    pub put_page: PutPageFn,
    exports: Vec<Export<P>>,
}

impl<P> OperationTable<P> {
    /// `exports` must hold one export per operation, in `Operation::ALL`
    /// order, from a registry that honors the `SymbolRegistry` contract.
    unsafe fn from_exports(exports: Vec<Export<P>>) -> OperationTable<P> {
        assert_eq!(exports.len(), Operation::ALL.len());
        let address = |op: Operation| -> *mut c_void {
            let export = &exports[op as usize];
            debug_assert_eq!(export.name(), op.symbol());
            export.address().as_ptr()
        };

        let alloc_page = mem::transmute::<*mut c_void, AllocPageFn>(address(Operation::AllocatePage));
        let free_page = mem::transmute::<*mut c_void, FreePageFn>(address(Operation::FreePage));
        let get_page = mem::transmute::<*mut c_void, GetPageFn>(address(Operation::MapPage));
        let put_page = mem::transmute::<*mut c_void, PutPageFn>(address(Operation::UnmapPage));

        OperationTable {
            alloc_page,
            free_page,
            get_page,
            put_page,
            exports,
        }
    }
}

impl<P> fmt::Debug for OperationTable<P> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("OperationTable")
            .field("alloc_page", &(self.alloc_page as *const c_void))
            .field("free_page", &(self.free_page as *const c_void))
            .field("get_page", &(self.get_page as *const c_void))
            .field("put_page", &(self.put_page as *const c_void))
            .finish()
    }
}

/// Binds the EPC driver's operations through a [`SymbolRegistry`].
///
/// The binding is all or nothing: `acquire` either resolves every operation
/// or leaves nothing pinned. The page operations themselves live in
/// [`crate::epc`].
pub struct Resolver<R: SymbolRegistry> {
    registry: R,
    pub(crate) table: Option<OperationTable<R::Pin>>,
}

impl<R: SymbolRegistry> Resolver<R> {
    pub fn new(registry: R) -> Resolver<R> {
        Resolver {
            registry,
            table: None,
        }
    }

    pub fn is_bound(&self) -> bool {
        self.table.is_some()
    }

    pub fn registry(&self) -> &R {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut R {
        &mut self.registry
    }

    /// Resolves all driver operations.
    ///
    /// If any of them is missing, the ones already resolved by this call are
    /// released again before returning. Calling this while bound does nothing.
    pub fn acquire(&mut self) -> Result<(), Unavailable> {
        if self.is_bound() {
            warn!(target: LOG_TARGET, "driver operations are already bound");
            return Ok(());
        }

        let mut exports = Vec::with_capacity(Operation::ALL.len());
        for &op in Operation::ALL.iter() {
            match self.registry.lookup(op.symbol()) {
                Some(export) => {
                    debug!(target: LOG_TARGET, "{}: bound to {}", op, export.name());
                    exports.push(export);
                }
                None => {
                    debug!(target: LOG_TARGET, "{}: {} not found", op, op.symbol());
                    self.unpin(exports);
                    return Err(Unavailable {
                        symbol: op.symbol(),
                    });
                }
            }
        }

        self.table = Some(unsafe { OperationTable::from_exports(exports) });
        Ok(())
    }

    /// Releases the binding. Does nothing when not bound.
    pub fn release(&mut self) {
        if let Some(table) = self.table.take() {
            self.unpin(table.exports);
        }
    }

    fn unpin(&mut self, exports: Vec<Export<R::Pin>>) {
        for export in exports {
            debug!(target: LOG_TARGET, "releasing {}", export.name());
            self.registry.release(export);
        }
    }
}

impl<R: SymbolRegistry> Drop for Resolver<R> {
    fn drop(&mut self) {
        self.release()
    }
}

impl<R: SymbolRegistry + fmt::Debug> fmt::Debug for Resolver<R> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Resolver")
            .field("registry", &self.registry)
            .field("table", &self.table)
            .finish()
    }
}
