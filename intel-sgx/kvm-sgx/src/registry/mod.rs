/* Copyright (c) Fortanix, Inc.
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

//! Sources of driver exports.
//!
//! A registry hands out named function addresses and keeps whatever provides
//! them from going away until each address is released again.

mod dl;
mod exports;

use std::os::raw::c_void;
use std::ptr::NonNull;

pub use self::dl::{DlRegistry, DlRegistryBuilder, LIBRARY_ENV};
pub use self::exports::ExportTable;

/// A resolved export together with the pin that keeps it valid.
#[derive(Debug)]
pub struct Export<P> {
    name: &'static str,
    address: NonNull<c_void>,
    pin: P,
}

// `address` is a function address that never changes, and the pin keeps it
// valid for as long as the export exists.
unsafe impl<P: Send> Send for Export<P> {}
unsafe impl<P: Sync> Sync for Export<P> {}

impl<P> Export<P> {
    pub fn new(name: &'static str, address: NonNull<c_void>, pin: P) -> Self {
        Export { name, address, pin }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn address(&self) -> NonNull<c_void> {
        self.address
    }

    pub fn into_pin(self) -> P {
        self.pin
    }
}

/// Runtime symbol lookup with reference counting against the exporter.
///
/// An address returned by `lookup` for one of the driver's symbol names must
/// point to a function with the signature `sgx_epc_sys` declares for that
/// name, and must stay valid until the export is passed back to `release`.
pub trait SymbolRegistry {
    type Pin;

    /// Resolves `name`, pinning its exporter. `None` if it isn't exported.
    fn lookup(&mut self, name: &'static str) -> Option<Export<Self::Pin>>;

    /// Drops the pin taken by the `lookup` that produced `export`.
    fn release(&mut self, export: Export<Self::Pin>);
}

impl<'a, R: SymbolRegistry + ?Sized> SymbolRegistry for &'a mut R {
    type Pin = R::Pin;

    fn lookup(&mut self, name: &'static str) -> Option<Export<Self::Pin>> {
        (**self).lookup(name)
    }

    fn release(&mut self, export: Export<Self::Pin>) {
        (**self).release(export)
    }
}
