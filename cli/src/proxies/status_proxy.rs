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

use zbus::{Result, proxy};
#[proxy(
    default_service = "org.dsufreq",
    interface = "org.dsufreq.status",
    default_path = "/org/dsufreq/status"
)]
pub trait Status {
    async fn get_current_frequency(&self) -> Result<u64>;
    async fn get_available_frequencies(&self) -> Result<Vec<u64>>;
    async fn get_limits(&self) -> Result<(u64, u64)>;
    async fn get_time_in_state(&self) -> Result<String>;
    async fn get_total_transitions(&self) -> Result<u64>;
    async fn get_domain_info(&self) -> Result<String>;
    async fn get_domains(&self) -> Result<String>;
}
