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

use crate::arbiter::FreqArbiter;
use crate::backends::backend::list_domain_devices;
use crate::comm::dbus::format_time_in_state;
use crate::governor::Governor;
use log::info;
use std::sync::Arc;
use zbus::{fdo, interface};

/// Read-only view of the governed domain.
pub struct StatusInterface {
    pub governor: Arc<Governor>,
    pub arbiter: Arc<FreqArbiter>,
}

#[interface(name = "org.dsufreq.status")]
impl StatusInterface {
    async fn get_current_frequency(&self) -> Result<u64, fdo::Error> {
        info!("get_current_frequency called");
        Ok(self.governor.current_khz()?)
    }

    async fn get_available_frequencies(&self) -> Result<Vec<u64>, fdo::Error> {
        info!("get_available_frequencies called");
        Ok(self.governor.table().frequencies())
    }

    async fn get_limits(&self) -> Result<(u64, u64), fdo::Error> {
        info!("get_limits called");
        let limits = self.governor.limits();
        Ok((limits.min_khz, limits.max_khz))
    }

    async fn get_time_in_state(&self) -> Result<String, fdo::Error> {
        info!("get_time_in_state called");
        let rows = self.governor.time_in_state()?;
        Ok(format_time_in_state(&rows))
    }

    async fn get_total_transitions(&self) -> Result<u64, fdo::Error> {
        info!("get_total_transitions called");
        Ok(self.governor.total_transitions()?)
    }

    async fn get_domain_info(&self) -> Result<String, fdo::Error> {
        info!("get_domain_info called");
        let id = self.governor.domain_id();
        let limits = self.governor.limits();
        let mut ret_string = format!(
            "domain {id}: {}..{} kHz absolute, {}..{} kHz active, {} entries\n",
            self.governor.min_khz_orig(),
            self.governor.max_khz_orig(),
            limits.min_khz,
            limits.max_khz,
            self.governor.table().len()
        );
        for (master, rows) in self.arbiter.constraint_summary(id)? {
            ret_string += format!("constraint {master}: {rows} rows\n").as_str();
        }
        Ok(ret_string)
    }

    async fn get_domains(&self) -> Result<String, fdo::Error> {
        info!("get_domains called");
        let device_handles = list_domain_devices()?;
        Ok(device_handles.join("\n"))
    }
}
