/* Copyright (c) Fortanix, Inc.
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

//! SGX EPC support for a hypervisor.
//!
//! EPC pages are managed by the SGX driver, and the hypervisor needs the
//! driver's functions to allocate, free, map and unmap them. It can't link to
//! the driver directly: on a machine without SGX the driver is not there, and
//! the hypervisor must still start. Instead the driver's functions are looked
//! up at runtime through a [`SymbolRegistry`], and SGX virtualization is
//! simply turned off if they can't be found.
//!
//! ```no_run
//! use kvm_sgx::{AllocFlags, DlRegistry, SgxVirt};
//!
//! let mut sgx = SgxVirt::new(DlRegistry::builder().from_env().build());
//! if sgx.feature_init().is_ok() {
//!     let epc = sgx.epc();
//!     if let Some(page) = epc.allocate(AllocFlags::empty()) {
//!         println!("got EPC frame {:#x}", page.pfn());
//!         epc.free(page);
//!     }
//! }
//! sgx.feature_teardown();
//! ```

#![doc(html_logo_url = "https://edp.fortanix.com/img/docs/edp-logo.svg",
       html_favicon_url = "https://edp.fortanix.com/favicon.ico",
       html_root_url = "https://edp.fortanix.com/docs/api/")]

#[macro_use]
extern crate log;

use std::fmt;

pub mod epc;
mod error;
pub mod registry;
mod resolver;

pub use sgx_epc_sys::{AllocFlags, EpcPage, PAGE_SIZE};

pub use crate::epc::{page_to_pfn, EpcPageHandle};
pub use crate::error::{ExportError, Unavailable};
pub use crate::registry::{DlRegistry, Export, ExportTable, SymbolRegistry};
pub use crate::resolver::{Operation, Resolver};

pub(crate) const LOG_TARGET: &str = "kvm::sgx";

/// SGX virtualization state of a hypervisor instance.
///
/// Hold one per hypervisor, call [`feature_init`](Self::feature_init) once
/// while starting up (before any vCPU runs) and
/// [`feature_teardown`](Self::feature_teardown) once when shutting down.
pub struct SgxVirt<R: SymbolRegistry> {
    resolver: Resolver<R>,
}

impl<R: SymbolRegistry> SgxVirt<R> {
    pub fn new(registry: R) -> SgxVirt<R> {
        SgxVirt {
            resolver: Resolver::new(registry),
        }
    }

    /// Binds the EPC driver. On error, SGX must not be offered to guests.
    pub fn feature_init(&mut self) -> Result<(), Unavailable> {
        match self.resolver.acquire() {
            Ok(()) => {
                info!(target: LOG_TARGET, "SGX virtualization supported.");
                Ok(())
            }
            Err(e) => {
                error!(target: LOG_TARGET, "SGX driver is not loaded: {}", e);
                Err(e)
            }
        }
    }

    pub fn feature_teardown(&mut self) {
        self.resolver.release()
    }

    pub fn is_supported(&self) -> bool {
        self.resolver.is_bound()
    }

    /// The EPC page operations.
    pub fn epc(&self) -> &Resolver<R> {
        &self.resolver
    }

    pub fn registry(&self) -> &R {
        self.resolver.registry()
    }
}

impl<R: SymbolRegistry + fmt::Debug> fmt::Debug for SgxVirt<R> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("SgxVirt")
            .field("resolver", &self.resolver)
            .finish()
    }
}
