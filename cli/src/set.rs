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

//! Write commands for the DSU frequency CLI.
//!
//! Each handler opens a system-bus connection, invokes one method on the
//! daemon's control interface and returns the daemon's reply verbatim.

use crate::proxies::control_proxy::ControlProxy;
use zbus::Connection;

/// Request a frequency change, rounding per `relation` ("up" or "down").
pub async fn set_target_handler(khz: u64, relation: &str) -> Result<String, zbus::Error> {
    let connection = Connection::system().await?;
    let proxy = ControlProxy::new(&connection).await?;
    proxy.set_target_frequency(khz, relation).await
}

/// Raise or lower this requester's minimum-frequency QoS request.
pub async fn set_min_handler(khz: u64) -> Result<String, zbus::Error> {
    let connection = Connection::system().await?;
    let proxy = ControlProxy::new(&connection).await?;
    proxy.set_min_frequency(khz).await
}

/// Raise or lower this requester's maximum-frequency QoS request.
pub async fn set_max_handler(khz: u64) -> Result<String, zbus::Error> {
    let connection = Connection::system().await?;
    let proxy = ControlProxy::new(&connection).await?;
    proxy.set_max_frequency(khz).await
}
