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
use crate::governor::qos::{QosAggregator, RequestHandle};
use crate::governor::table::Relation;
use log::info;
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard, OnceCell};
use zbus::{fdo, interface};

static WRITE_LOCK: OnceCell<Arc<Mutex<()>>> = OnceCell::const_new();

async fn get_write_lock_guard() -> MutexGuard<'static, ()> {
    let lock = WRITE_LOCK
        .get_or_init(|| async { Arc::new(Mutex::new(())) })
        .await;
    lock.lock().await
}

/// Write operations against the governed domain. All mutations funnel through
/// a single write lock so at most one is in flight at a time.
pub struct ControlInterface {
    pub arbiter: Arc<FreqArbiter>,
    pub qos: Arc<QosAggregator>,
    pub domain_id: u32,
    pub min_handle: RequestHandle,
    pub max_handle: RequestHandle,
}

#[interface(name = "org.dsufreq.control")]
impl ControlInterface {
    async fn set_target_frequency(&self, khz: u64, relation: &str) -> Result<String, fdo::Error> {
        info!("set_target_frequency called with khz: {khz} and relation: {relation}");
        let relation = Relation::try_from(relation).map_err(fdo::Error::from)?;
        let _guard = get_write_lock_guard().await;
        let programmed_khz = self.arbiter.request(self.domain_id, khz, relation)?;
        Ok(format!(
            "Requested {khz} kHz ({relation}); domain {} now runs at {programmed_khz} kHz",
            self.domain_id
        ))
    }

    async fn set_min_frequency(&self, khz: u64) -> Result<String, fdo::Error> {
        info!("set_min_frequency called with khz: {khz}");
        let _guard = get_write_lock_guard().await;
        self.qos
            .update_request(self.min_handle, khz)
            .map_err(fdo::Error::from)?;
        let (min_khz, max_khz) = self.qos.effective();
        Ok(format!(
            "Minimum-frequency request set to {khz} kHz; effective window {min_khz}..{max_khz} kHz"
        ))
    }

    async fn set_max_frequency(&self, khz: u64) -> Result<String, fdo::Error> {
        info!("set_max_frequency called with khz: {khz}");
        let _guard = get_write_lock_guard().await;
        self.qos
            .update_request(self.max_handle, khz)
            .map_err(fdo::Error::from)?;
        let (min_khz, max_khz) = self.qos.effective();
        Ok(format!(
            "Maximum-frequency request set to {khz} kHz; effective window {min_khz}..{max_khz} kHz"
        ))
    }
}
