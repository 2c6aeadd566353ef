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

//! DBus proxy interfaces for the dsufreqd daemon.
//!
//! The proxies are generated with the `zbus` crate's `#[proxy]` macro and give
//! the CLI type-safe asynchronous access to the daemon's DBus interfaces.
//!
//! # DBus Service Information
//!
//! - **Service Name**: `org.dsufreq`
//! - **Control Interface**: `org.dsufreq.control` at `/org/dsufreq/control`
//! - **Status Interface**: `org.dsufreq.status` at `/org/dsufreq/status`

pub mod control_proxy;
pub mod status_proxy;
