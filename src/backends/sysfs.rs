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

//! Generic sysfs-node clock backend.
//!
//! Works with any DSU frequency-domain driver that exports the standard
//! attribute nodes under its device directory:
//!
//! ```text
//! /sys/class/dsufreq/dsu0
//! ├── compatible
//! ├── min_freq      (kHz, read once at probe)
//! ├── max_freq      (kHz, read once at probe)
//! ├── boot_freq     (kHz, read once at probe)
//! ├── target_freq   (kHz, written to program the domain)
//! └── opp_table     ("<khz> <uV>" per line, read once at probe)
//! ```
//!
//! The frequency range and OPP voltages are cached at probe time so that the
//! trait getters never touch the filesystem afterwards. Writes to
//! `target_freq` are read back and verified, since drivers silently clamp
//! out-of-range values.

use crate::backends::backend::{ClockBackend, register_backend};
use crate::error::DsufreqError;
use crate::system_io::{fs_read, fs_write};
use log::{trace, warn};
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub struct SysfsBackend {
    device_dir: PathBuf,
    min_khz: u64,
    max_khz: u64,
    boot_khz: u64,
    opps: Vec<(u64, u32)>,
}

fn parse_u64(raw: &str, what: &'static str, file: &Path) -> Result<u64, DsufreqError> {
    raw.trim().parse().map_err(|_| DsufreqError::Parse {
        what,
        raw: raw.trim().to_string(),
        file: file.into(),
    })
}

fn read_khz_attr(device_dir: &Path, attr: &str, what: &'static str) -> Result<u64, DsufreqError> {
    let path = device_dir.join(attr);
    parse_u64(&fs_read(&path)?, what, &path)
}

/// Parse the `opp_table` node: one "<khz> <uV>" pair per line, blank lines
/// ignored.
fn parse_opp_table(raw: &str, file: &Path) -> Result<Vec<(u64, u32)>, DsufreqError> {
    let mut opps = Vec::new();
    for line in raw.lines().filter(|l| !l.trim().is_empty()) {
        let mut fields = line.split_whitespace();
        let khz = parse_u64(fields.next().unwrap_or(""), "OPP frequency", file)?;
        let uv = parse_u64(fields.next().unwrap_or(""), "OPP voltage", file)?;
        opps.push((khz, uv as u32));
    }
    Ok(opps)
}

impl SysfsBackend {
    /// Probe a domain device directory, caching the frequency range, boot
    /// frequency and OPP table.
    ///
    /// # Arguments
    ///
    /// * `device_dir` - The domain's device directory (e.g. `/sys/class/dsufreq/dsu0/`)
    ///
    /// # Returns: `Result<SysfsBackend, DsufreqError>`
    /// * `Ok(SysfsBackend)` - Ready backend with cached device state
    /// * `Err(DsufreqError::IORead)` - A required attribute node was unreadable
    /// * `Err(DsufreqError::Parse)` - An attribute node held a non-numeric value
    pub fn probe(device_dir: &Path) -> Result<SysfsBackend, DsufreqError> {
        let min_khz = read_khz_attr(device_dir, "min_freq", "minimum frequency")?;
        let max_khz = read_khz_attr(device_dir, "max_freq", "maximum frequency")?;
        let boot_khz = read_khz_attr(device_dir, "boot_freq", "boot frequency")?;
        let opp_path = device_dir.join("opp_table");
        let opps = match fs_read(&opp_path) {
            Ok(raw) => parse_opp_table(&raw, &opp_path)?,
            Err(e) => {
                // Not every driver exports voltages; energy data degrades to 0.
                warn!("no readable opp_table in {device_dir:?}: {e}");
                Vec::new()
            }
        };
        trace!(
            "probed {device_dir:?}: {min_khz}..{max_khz} kHz, boot {boot_khz} kHz, {} OPPs",
            opps.len()
        );
        Ok(SysfsBackend {
            device_dir: device_dir.to_path_buf(),
            min_khz,
            max_khz,
            boot_khz,
            opps,
        })
    }

    /// Register this backend as the generic fallback.
    pub fn register() {
        register_backend("generic,dsu-sysfs", |device_dir| {
            Ok(Box::new(SysfsBackend::probe(device_dir)?))
        });
    }

    #[cfg(test)]
    pub(crate) fn probe_with_range(
        device_dir: &Path,
        min_khz: u64,
        max_khz: u64,
        boot_khz: u64,
    ) -> SysfsBackend {
        SysfsBackend {
            device_dir: device_dir.to_path_buf(),
            min_khz,
            max_khz,
            boot_khz,
            opps: Vec::new(),
        }
    }
}

impl ClockBackend for SysfsBackend {
    fn name(&self) -> &str {
        "generic"
    }

    fn min_freq_khz(&self) -> u64 {
        self.min_khz
    }

    fn max_freq_khz(&self) -> u64 {
        self.max_khz
    }

    fn boot_freq_khz(&self) -> u64 {
        self.boot_khz
    }

    /// Write the target frequency node and verify the value stuck.
    ///
    /// # Returns: `Result<(), DsufreqError>`
    /// * `Ok(())` - Frequency written and read back unchanged
    /// * `Err(DsufreqError::IOWrite)` - The node rejected the write
    /// * `Err(DsufreqError::Internal)` - Read-back disagreed with the written value
    fn set_frequency(&self, khz: u64) -> Result<(), DsufreqError> {
        let target_path = self.device_dir.join("target_freq");
        trace!("Writing {khz} to {target_path:?}");
        fs_write(&target_path, false, khz.to_string())?;

        let read_back = parse_u64(
            &fs_read(&target_path)?,
            "target frequency read-back",
            &target_path,
        )?;
        if read_back != khz {
            return Err(DsufreqError::Internal(format!(
                "wrote {khz} kHz to {target_path:?} but read back {read_back} kHz"
            )));
        }
        Ok(())
    }

    fn voltage_for_freq(&self, khz: u64) -> u32 {
        match self.opps.iter().find(|(f, _)| *f == khz) {
            Some((_, uv)) => *uv,
            None => {
                warn!("no OPP voltage for {khz} kHz in {:?}", self.device_dir);
                0
            }
        }
    }
}
