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

//! Status and statistics commands for the DSU frequency CLI.

use crate::proxies::status_proxy::StatusProxy;
use zbus::Connection;

/// Render the domain overview: identity, bounds, current frequency and the
/// legal frequency table.
pub async fn status_handler() -> Result<String, zbus::Error> {
    let connection = Connection::system().await?;
    let proxy = StatusProxy::new(&connection).await?;

    let mut ret_string = proxy.get_domain_info().await?;
    let current_khz = proxy.get_current_frequency().await?;
    let (min_khz, max_khz) = proxy.get_limits().await?;
    ret_string += format!("current: {current_khz} kHz (window {min_khz}..{max_khz} kHz)\n").as_str();

    let table = proxy.get_available_frequencies().await?;
    ret_string += "available:";
    for khz in table {
        ret_string += format!(" {khz}").as_str();
    }
    ret_string += " kHz\n";
    Ok(ret_string)
}

/// Render the per-frequency residency table and the transition counter.
pub async fn stats_handler() -> Result<String, zbus::Error> {
    let connection = Connection::system().await?;
    let proxy = StatusProxy::new(&connection).await?;

    let mut ret_string = String::from("| kHz | residency (ns) |\n");
    for line in proxy.get_time_in_state().await?.lines() {
        match line.split_once(' ') {
            Some((khz, nanos)) => ret_string += format!("| {khz} | {nanos} |\n").as_str(),
            None => ret_string += format!("| {line} |\n").as_str(),
        }
    }
    let transitions = proxy.get_total_transitions().await?;
    ret_string += format!("total transitions: {transitions}\n").as_str();
    Ok(ret_string)
}
