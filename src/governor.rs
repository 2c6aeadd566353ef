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

//! The DSU frequency governor.
//!
//! One [`Governor`] owns one clock domain: the immutable frequency table built
//! at bring-up, the clock backend, the residency statistics, and the dynamic
//! QoS window. The arbiter drives it through the scaler callback installed by
//! [`Governor::register_with`]; the D-Bus status interface reads it directly.
//!
//! Locking: `state` (current frequency + statistics) is one mutex, taken by
//! the scaling path and by statistics readers; `limits` is a second mutex for
//! the QoS window. The scaling path holds `state` across the backend write, so
//! at most one hardware programming operation is in flight per domain.

pub mod qos;
pub mod stats;
pub mod table;

use crate::arbiter::FreqArbiter;
use crate::backends::backend::ClockBackend;
use crate::config::domain_config::{ClusterTable, ConstraintTable};
use crate::error::DsufreqError;
use crate::governor::stats::FreqStats;
use crate::governor::table::{FreqTable, Relation};
use log::{debug, info, warn};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// The dynamic QoS window. Always inside the hardware-original bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QosLimits {
    pub min_khz: u64,
    pub max_khz: u64,
}

#[derive(Debug)]
struct ScalingState {
    cur_khz: u64,
    stats: FreqStats,
}

pub struct Governor {
    domain_id: u32,
    table: FreqTable,
    backend: Box<dyn ClockBackend>,
    min_khz_orig: u64,
    max_khz_orig: u64,
    state: Mutex<ScalingState>,
    limits: Mutex<QosLimits>,
}

impl Governor {
    /// Bring up a governor for one domain.
    ///
    /// Queries the backend's hardware range and boot frequency, builds the
    /// frequency table from the cluster mapping tables, and starts statistics
    /// at the boot frequency's table entry (the boot frequency is resolved
    /// upward if firmware left the domain between entries).
    ///
    /// # Arguments
    ///
    /// * `domain_id` - Identifier used with the arbiter
    /// * `clusters` - Per-cluster tables from the domain description
    /// * `backend` - Probed clock backend for this domain
    ///
    /// # Returns: `Result<Governor, DsufreqError>`
    /// * `Ok(Governor)` - Ready governor at the boot frequency
    /// * `Err(DsufreqError::EmptyTable)` - No legal frequency inside the hardware range
    pub fn new(
        domain_id: u32,
        clusters: &[ClusterTable],
        backend: Box<dyn ClockBackend>,
    ) -> Result<Governor, DsufreqError> {
        let min_khz_orig = backend.min_freq_khz();
        let max_khz_orig = backend.max_freq_khz();
        let table = FreqTable::build(clusters, backend.as_ref())?;

        let boot_khz = table.resolve(backend.boot_freq_khz(), Relation::AtLeast);
        let boot_index = table
            .position(boot_khz)
            .expect("resolved boot frequency is a table entry");
        info!(
            "domain {domain_id}: governor up with {} entries, boot at {boot_khz} kHz (backend {})",
            table.len(),
            backend.name()
        );

        Ok(Governor {
            domain_id,
            backend,
            min_khz_orig,
            max_khz_orig,
            state: Mutex::new(ScalingState {
                cur_khz: boot_khz,
                stats: FreqStats::new(table.len(), boot_index),
            }),
            limits: Mutex::new(QosLimits {
                min_khz: min_khz_orig,
                max_khz: max_khz_orig,
            }),
            table,
        })
    }

    /// Register this governor's domain, constraint tables and scaler callback
    /// with the arbiter. Called once at bring-up; any failure is fatal.
    pub fn register_with(
        self: &Arc<Self>,
        arbiter: &Arc<FreqArbiter>,
        constraints: &[ConstraintTable],
    ) -> Result<(), DsufreqError> {
        arbiter.register_domain(
            self.domain_id,
            self.min_khz_orig,
            self.max_khz_orig,
            self.current_khz()?,
        )?;
        for constraint in constraints {
            arbiter.register_constraint_table(self.domain_id, constraint)?;
        }
        let governor = Arc::clone(self);
        arbiter.register_scaler(
            self.domain_id,
            Arc::new(move |khz, relation| governor.scale(khz, relation)),
        )?;
        Ok(())
    }

    /// The scaling callback: resolve, program, account.
    ///
    /// Resolves the request against the table, short-circuits when the domain
    /// is already at the resolved frequency, otherwise programs the backend
    /// and, only on success, folds the outgoing frequency's residency into the
    /// statistics and records the transition. A backend failure propagates as
    /// [`DsufreqError::Scaling`] with frequency and statistics untouched.
    ///
    /// # Arguments
    ///
    /// * `target_khz` - Requested frequency, already clamped by the arbiter
    /// * `relation` - Rounding policy for off-table requests
    ///
    /// # Returns: `Result<u64, DsufreqError>`
    /// * `Ok(u64)` - The frequency now programmed (resolved request)
    /// * `Err(DsufreqError::Scaling)` - The backend refused the write
    pub fn scale(&self, target_khz: u64, relation: Relation) -> Result<u64, DsufreqError> {
        let resolved_khz = self.table.resolve(target_khz, relation);
        let mut state = self.lock_state()?;

        if resolved_khz == state.cur_khz {
            debug!(
                "domain {}: {target_khz} kHz ({relation}) resolves to current {resolved_khz} kHz, nothing to do",
                self.domain_id
            );
            return Ok(resolved_khz);
        }

        if let Err(e) = self.backend.set_frequency(resolved_khz) {
            return Err(DsufreqError::Scaling {
                khz: resolved_khz,
                e: Box::new(e),
            });
        }

        let old_khz = state.cur_khz;
        state.stats.update_time_in_state();
        let index = self
            .table
            .position(resolved_khz)
            .unwrap_or_else(|| panic!("scaled to {resolved_khz} kHz which is not a table entry"));
        state.stats.record_transition(index);
        state.cur_khz = resolved_khz;
        debug!(
            "domain {}: scaled {old_khz} -> {resolved_khz} kHz (requested {target_khz}, {relation})",
            self.domain_id
        );
        Ok(resolved_khz)
    }

    /// Enforce a QoS window change.
    ///
    /// Clamps both bounds into the hardware-original range; if the clamped
    /// window inverts, the minimum wins and the maximum is raised to meet it.
    /// Returns the window actually stored. Deliberately does not rescale: the
    /// next request through the arbiter is clamped into the new window.
    pub fn apply_limits(&self, new_min_khz: u64, new_max_khz: u64) -> (u64, u64) {
        let min_khz = new_min_khz.clamp(self.min_khz_orig, self.max_khz_orig);
        let mut max_khz = new_max_khz.clamp(self.min_khz_orig, self.max_khz_orig);
        if min_khz > max_khz {
            warn!(
                "domain {}: QoS window inverted (min {min_khz} > max {max_khz} kHz), minimum wins",
                self.domain_id
            );
            max_khz = min_khz;
        }
        let mut limits = self.limits.lock().expect("QoS limits lock poisoned");
        *limits = QosLimits { min_khz, max_khz };
        info!(
            "domain {}: QoS window now {min_khz}..{max_khz} kHz",
            self.domain_id
        );
        (min_khz, max_khz)
    }

    pub fn domain_id(&self) -> u32 {
        self.domain_id
    }

    pub fn table(&self) -> &FreqTable {
        &self.table
    }

    pub fn min_khz_orig(&self) -> u64 {
        self.min_khz_orig
    }

    pub fn max_khz_orig(&self) -> u64 {
        self.max_khz_orig
    }

    pub fn current_khz(&self) -> Result<u64, DsufreqError> {
        Ok(self.lock_state()?.cur_khz)
    }

    pub fn limits(&self) -> QosLimits {
        *self.limits.lock().expect("QoS limits lock poisoned")
    }

    /// Per-frequency residency, current to the moment of the call.
    pub fn time_in_state(&self) -> Result<Vec<(u64, Duration)>, DsufreqError> {
        let mut state = self.lock_state()?;
        state.stats.update_time_in_state();
        Ok(self
            .table
            .frequencies()
            .into_iter()
            .zip(state.stats.time_in_state().iter().copied())
            .collect())
    }

    pub fn total_transitions(&self) -> Result<u64, DsufreqError> {
        Ok(self.lock_state()?.stats.total_transitions())
    }

    fn lock_state(&self) -> Result<MutexGuard<'_, ScalingState>, DsufreqError> {
        self.state
            .lock()
            .map_err(|_| DsufreqError::Internal("scaling state lock poisoned".to_string()))
    }
}
