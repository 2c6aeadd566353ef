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

pub mod domain_config;

/// The driver-decided location of DSU frequency-domain device directories.
/// Each domain directory carries the `min_freq`, `max_freq`, `boot_freq`,
/// `target_freq` and `opp_table` attribute nodes consumed by the sysfs backend.
pub static DSU_DEVICES_DIR: &str = "/sys/class/dsufreq/";

/// The domain device directory used when the config file does not name one.
pub static DEFAULT_DEVICE_DIR: &str = "/sys/class/dsufreq/dsu0/";

/// The default location of the domain description file. Override with the
/// `DSUFREQD_CONFIG` environment variable.
pub static DEFAULT_CONFIG_PATH: &str = "/etc/dsufreqd/config.toml";

/// Backend compatible string assumed when the config file and the device
/// directory both fail to provide one.
pub static FALLBACK_COMPATIBLE: &str = "generic";
