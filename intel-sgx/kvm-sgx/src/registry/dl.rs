/* Copyright (c) Fortanix, Inc.
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

use std::env;
use std::os::raw::c_void;
use std::path::{Path, PathBuf};
use std::ptr::NonNull;

use libloading as dl;

use sgx_epc_sys::DEFAULT_LIBRARY;

use super::{Export, SymbolRegistry};
use crate::LOG_TARGET;

/// Environment variable that overrides the driver library path, see
/// [`DlRegistryBuilder::from_env`].
pub const LIBRARY_ENV: &str = "KVM_SGX_EPC_LIBRARY";

/// Resolves driver exports from a shared object with the dynamic loader.
///
/// Every successful lookup opens the library once more, so the loader keeps
/// it mapped for as long as any export is held. Releasing an export closes
/// that handle again.
#[derive(Debug, Clone)]
pub struct DlRegistry {
    path: PathBuf,
}

impl DlRegistry {
    pub fn new<P: Into<PathBuf>>(path: P) -> DlRegistry {
        DlRegistry { path: path.into() }
    }

    pub fn builder() -> DlRegistryBuilder {
        DlRegistryBuilder { path: None }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for DlRegistry {
    fn default() -> Self {
        DlRegistry::new(DEFAULT_LIBRARY)
    }
}

impl SymbolRegistry for DlRegistry {
    type Pin = dl::Library;

    fn lookup(&mut self, name: &'static str) -> Option<Export<dl::Library>> {
        let library = match dl::Library::new(self.path.as_os_str()) {
            Ok(library) => library,
            Err(e) => {
                debug!(target: LOG_TARGET, "failed to open {}: {}", self.path.display(), e);
                return None;
            }
        };
        let address = match unsafe { library.get::<*mut c_void>(name.as_bytes()) } {
            Ok(symbol) => *symbol,
            Err(e) => {
                debug!(target: LOG_TARGET, "{}: {}", self.path.display(), e);
                return None;
            }
        };
        NonNull::new(address).map(|address| Export::new(name, address, library))
    }

    fn release(&mut self, export: Export<dl::Library>) {
        drop(export.into_pin());
    }
}

#[derive(Debug)]
pub struct DlRegistryBuilder {
    path: Option<PathBuf>,
}

impl DlRegistryBuilder {
    pub fn library<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Use the path in `KVM_SGX_EPC_LIBRARY`, if it is set.
    pub fn from_env(mut self) -> Self {
        if let Some(path) = env::var_os(LIBRARY_ENV) {
            self.path = Some(path.into());
        }
        self
    }

    pub fn build(self) -> DlRegistry {
        self.path.map_or_else(DlRegistry::default, DlRegistry::new)
    }
}
