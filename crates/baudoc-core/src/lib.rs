// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Baudoc — Core types, configuration, and error definitions shared by the
// scan pipeline crates.

pub mod config;
pub mod error;
pub mod human_errors;
pub mod logging;
pub mod types;

pub use config::{AppConfig, ScanConfig};
pub use error::BaudocError;
pub use types::*;
