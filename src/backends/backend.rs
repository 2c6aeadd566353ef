// This file is part of dsufreqd, a daemon that governs the frequency of the DSU clock domain from userspace.
//
// Copyright 2025 Canonical Ltd.
//
// SPDX-License-Identifier: GPL-3.0-only
//
// dsufreqd is free software: you can redistribute it and/or modify it under the terms of the GNU General Public License version 3, as published by the Free Software Foundation.
//
// dsufreqd is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranties of MERCHANTABILITY, SATISFACTORY QUALITY, or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with this program.  If not, see http://www.gnu.org/licenses/.

//! Clock backend abstraction.
//!
//! The backend is the governor's only route to hardware: it reports the
//! domain's absolute frequency range and boot frequency, programs a resolved
//! frequency, and supplies the voltage paired with each operating point.
//!
//! Backends register themselves at daemon startup with a compatibility string
//! matching what the domain's device directory advertises. At bring-up the
//! daemon matches the configured (or discovered) string against the registry,
//! falling back to the generic sysfs backend when nothing matches.

use crate::backends::sysfs::SysfsBackend;
use crate::config;
use crate::error::DsufreqError;
use crate::system_io::{fs_read, fs_read_dir};
use log::{trace, warn};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::{Mutex, OnceLock};

/// Constructor stored in the backend registry. Probing the device directory
/// may fail, so construction is fallible.
type BackendConstructor = fn(&Path) -> Result<Box<dyn ClockBackend>, DsufreqError>;

/// Global registry mapping compatibility strings to backend constructors.
/// Initialized lazily on first registration; only mutated during startup.
pub static BACKEND_REGISTRY: OnceLock<Mutex<HashMap<&'static str, BackendConstructor>>> =
    OnceLock::new();

/// Trait for programming one DSU clock domain.
///
/// The range and boot-frequency getters are queried once at bring-up;
/// implementations cache whatever device state they need at probe time so the
/// getters are infallible afterwards.
pub trait ClockBackend: Send + Sync {
    /// Short name for logs (e.g. "generic").
    fn name(&self) -> &str;

    /// Lowest frequency the hardware supports, in kHz.
    fn min_freq_khz(&self) -> u64;

    /// Highest frequency the hardware supports, in kHz.
    fn max_freq_khz(&self) -> u64;

    /// Frequency the domain was left at by firmware, in kHz.
    fn boot_freq_khz(&self) -> u64;

    /// Program the domain to `khz`. The caller guarantees `khz` is a resolved
    /// table entry; a failure here must leave the hardware at its previous
    /// frequency.
    fn set_frequency(&self, khz: u64) -> Result<(), DsufreqError>;

    /// Supply voltage paired with `khz`, in microvolts. Unknown frequencies
    /// report 0.
    fn voltage_for_freq(&self, khz: u64) -> u32;
}

fn init_backend_registry() -> Mutex<HashMap<&'static str, BackendConstructor>> {
    Mutex::new(HashMap::new())
}

/// Register a backend constructor under a comma-separated compatibility string.
pub fn register_backend(compatible: &'static str, constructor: BackendConstructor) {
    let mut registry = BACKEND_REGISTRY
        .get_or_init(init_backend_registry)
        .lock()
        .expect("couldnt get BACKEND_REGISTRY");

    registry.insert(compatible, constructor);
}

/// Match a compatibility string to a registered backend constructor.
///
/// Both the registered string and the query are split on commas; every
/// component of the query must appear in the registered string for a match.
fn match_backend_string(compatible: &str) -> Result<BackendConstructor, DsufreqError> {
    let registry = BACKEND_REGISTRY
        .get()
        .ok_or(DsufreqError::Internal(String::from(
            "couldn't get BACKEND_REGISTRY",
        )))?
        .lock()
        .map_err(|_| DsufreqError::Internal(String::from("couldn't lock BACKEND_REGISTRY")))?;

    for (compat_string, constructor) in registry.iter() {
        let compat_set: HashSet<&str> = compat_string.split(',').collect();
        let compat_found = compatible.split(',').all(|x| compat_set.contains(x));
        if compat_found {
            return Ok(*constructor);
        }
    }

    Err(DsufreqError::Argument(format!(
        "dsufreqd could not match {compatible} to a known clock backend."
    )))
}

/// Read the compatibility string advertised by a domain device directory.
///
/// Drivers often write null-terminated strings to their virtual files, so
/// trailing null bytes are stripped.
pub fn read_compatible_string(device_dir: &Path) -> Result<String, DsufreqError> {
    let raw = fs_read(&device_dir.join("compatible")).map_err(|e| {
        DsufreqError::Argument(format!(
            "Failed to read compatibility string from {device_dir:?}: {e}"
        ))
    })?;
    Ok(raw.trim_end_matches(['\0', '\n']).to_string())
}

/// Construct the backend for a domain from its configured compatibility string,
/// or by device discovery when the config does not name one.
///
/// A string that matches nothing in the registry falls back to the generic
/// sysfs backend with a warning, mirroring what the kernel driver does when a
/// SoC-specific clock layer is absent.
pub fn backend_for_domain(
    compatible: &str,
    device_dir: &Path,
) -> Result<Box<dyn ClockBackend>, DsufreqError> {
    let compat_string = if compatible.is_empty() {
        read_compatible_string(device_dir)?
    } else {
        compatible.to_string()
    };
    trace!("Selecting clock backend for compatibility string '{compat_string}'");

    match match_backend_string(&compat_string) {
        Ok(constructor) => constructor(device_dir),
        Err(_) => {
            warn!("{compat_string} not supported. Defaulting to generic sysfs backend.");
            Ok(Box::new(SysfsBackend::probe(device_dir)?))
        }
    }
}

/// List the DSU domain device directories present on the system.
pub fn list_domain_devices() -> Result<Vec<String>, DsufreqError> {
    fs_read_dir(config::DSU_DEVICES_DIR.as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_test_registry() {
        register_backend("samsung,exynos-dsu,exynos-acpm", |dir| {
            Ok(Box::new(SysfsBackend::probe_with_range(dir, 100, 200, 100)))
        });
    }

    #[test]
    fn test_match_backend_string_empty_string_fails() {
        setup_test_registry();
        let result = match_backend_string("");

        assert!(
            result.is_err(),
            "Empty string should fail to match any backend"
        );
    }

    #[test]
    fn test_match_backend_string_single_component_succeeds() {
        setup_test_registry();
        assert!(match_backend_string("exynos-dsu").is_ok());
    }

    #[test]
    fn test_match_backend_string_multiple_components_succeeds() {
        setup_test_registry();
        assert!(match_backend_string("samsung,exynos-acpm").is_ok());
    }

    #[test]
    fn test_match_backend_string_partial_component_fails() {
        setup_test_registry();
        assert!(match_backend_string("samsung,exynos-").is_err());
    }

    #[test]
    fn test_match_backend_string_mixed_valid_invalid_fails() {
        setup_test_registry();
        assert!(match_backend_string("samsung,unknown-ip").is_err());
    }

    #[test]
    fn test_match_backend_string_case_sensitive() {
        setup_test_registry();
        assert!(match_backend_string("SAMSUNG").is_err());
    }
}
