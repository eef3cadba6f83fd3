/* Copyright (c) Fortanix, Inc.
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

/// The EPC driver is not loaded, or does not export everything the
/// hypervisor needs.
///
/// `symbol` is the first export that could not be resolved.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("SGX driver does not export `{symbol}`")]
pub struct Unavailable {
    pub symbol: &'static str,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ExportError {
    #[error("symbol `{0}` is already exported")]
    AlreadyExported(String),
    #[error("symbol `{0}` is not exported")]
    NotExported(String),
    #[error("symbol `{name}` is still in use ({pins} pins)")]
    Busy { name: String, pins: usize },
}
