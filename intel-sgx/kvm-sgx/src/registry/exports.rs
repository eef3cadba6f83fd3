/* Copyright (c) Fortanix, Inc.
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

use std::collections::hash_map::{Entry, HashMap};
use std::os::raw::c_void;
use std::ptr::NonNull;

use super::{Export, SymbolRegistry};
use crate::error::ExportError;
use crate::LOG_TARGET;

#[derive(Debug)]
struct Exported {
    address: NonNull<c_void>,
    pins: usize,
}

// Same reasoning as for `Export`: the address is a fixed function address.
unsafe impl Send for Exported {}
unsafe impl Sync for Exported {}

/// In-process export table, for drivers that are linked into the host.
///
/// Lookups pin an export and releases unpin it. A pinned export can't be
/// withdrawn.
#[derive(Debug, Default)]
pub struct ExportTable {
    exports: HashMap<String, Exported>,
}

impl ExportTable {
    pub fn new() -> ExportTable {
        Default::default()
    }

    /// Makes `address` available under `name`.
    ///
    /// # Safety
    /// If `name` is one of the symbols declared in `sgx_epc_sys`, `address`
    /// must be a function with the matching signature, and it must stay
    /// callable until `unexport(name)` succeeds.
    pub unsafe fn export(&mut self, name: &str, address: NonNull<c_void>) -> Result<(), ExportError> {
        match self.exports.entry(name.to_owned()) {
            Entry::Occupied(_) => Err(ExportError::AlreadyExported(name.to_owned())),
            Entry::Vacant(v) => {
                v.insert(Exported { address, pins: 0 });
                Ok(())
            }
        }
    }

    pub fn unexport(&mut self, name: &str) -> Result<(), ExportError> {
        match self.exports.get(name) {
            None => Err(ExportError::NotExported(name.to_owned())),
            Some(e) if e.pins > 0 => Err(ExportError::Busy {
                name: name.to_owned(),
                pins: e.pins,
            }),
            Some(_) => {
                self.exports.remove(name);
                Ok(())
            }
        }
    }

    /// Outstanding lookups of `name`, or `None` if it isn't exported.
    pub fn pin_count(&self, name: &str) -> Option<usize> {
        self.exports.get(name).map(|e| e.pins)
    }

    pub fn is_pinned(&self) -> bool {
        self.exports.values().any(|e| e.pins > 0)
    }
}

impl SymbolRegistry for ExportTable {
    type Pin = ();

    fn lookup(&mut self, name: &'static str) -> Option<Export<()>> {
        let exported = self.exports.get_mut(name)?;
        exported.pins += 1;
        Some(Export::new(name, exported.address, ()))
    }

    fn release(&mut self, export: Export<()>) {
        match self.exports.get_mut(export.name()) {
            Some(exported) if exported.pins > 0 => exported.pins -= 1,
            Some(_) => warn!(target: LOG_TARGET, "unbalanced release of `{}`", export.name()),
            None => warn!(target: LOG_TARGET, "released `{}`, which is not exported", export.name()),
        }
    }
}
