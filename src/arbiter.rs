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

//! The frequency arbiter.
//!
//! Domains register themselves here at bring-up: their absolute frequency
//! range, their cross-domain constraint tables, and the scaler callback that
//! actually programs hardware. Every scaling request enters through
//! [`FreqArbiter::request`], which clamps the target into the domain's current
//! QoS window before invoking the scaler, so governors only ever see targets
//! inside their window.
//!
//! Constraint tables are held read-only for inspection; with a single domain
//! in the process there is no cross-domain propagation to run, but the tables
//! keep the declared coupling visible to the status surface.

use crate::config::domain_config::ConstraintTable;
use crate::error::DsufreqError;
use crate::governor::table::Relation;
use log::{info, trace, warn};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

/// A domain's scaler callback, installed by its governor.
pub type Scaler = Arc<dyn Fn(u64, Relation) -> Result<u64, DsufreqError> + Send + Sync>;

/// Upper bound on rows accepted per constraint table; overflowing rows are
/// logged and skipped.
pub const MAX_CONSTRAINT_ROWS: usize = 32;

struct DomainRecord {
    min_khz: u64,
    max_khz: u64,
    boot_khz: u64,
    scaler: Option<Scaler>,
    constraints: Vec<ConstraintTable>,
}

#[derive(Default)]
pub struct FreqArbiter {
    domains: Mutex<HashMap<u32, DomainRecord>>,
}

impl FreqArbiter {
    pub fn new() -> FreqArbiter {
        FreqArbiter::default()
    }

    /// Register a domain with its absolute range and boot frequency.
    ///
    /// # Returns: `Result<(), DsufreqError>`
    /// * `Ok(())` - Domain registered
    /// * `Err(DsufreqError::Argument)` - Domain id already registered
    pub fn register_domain(
        &self,
        domain_id: u32,
        min_khz: u64,
        max_khz: u64,
        boot_khz: u64,
    ) -> Result<(), DsufreqError> {
        let mut domains = self.lock()?;
        if domains.contains_key(&domain_id) {
            return Err(DsufreqError::Argument(format!(
                "domain {domain_id} is already registered"
            )));
        }
        info!("registered domain {domain_id}: {min_khz}..{max_khz} kHz, boot {boot_khz} kHz");
        domains.insert(
            domain_id,
            DomainRecord {
                min_khz,
                max_khz,
                boot_khz,
                scaler: None,
                constraints: Vec::new(),
            },
        );
        Ok(())
    }

    /// Install a domain's scaler callback.
    ///
    /// # Returns: `Result<(), DsufreqError>`
    /// * `Ok(())` - Scaler installed
    /// * `Err(DsufreqError::Argument)` - Unknown domain, or a scaler is already installed
    pub fn register_scaler(&self, domain_id: u32, scaler: Scaler) -> Result<(), DsufreqError> {
        let mut domains = self.lock()?;
        let record = record_mut(&mut domains, domain_id)?;
        if record.scaler.is_some() {
            return Err(DsufreqError::Argument(format!(
                "domain {domain_id} already has a scaler"
            )));
        }
        record.scaler = Some(scaler);
        Ok(())
    }

    /// Attach a cross-domain constraint table to a registered domain.
    ///
    /// Tables longer than [`MAX_CONSTRAINT_ROWS`] are truncated; the overflow
    /// is logged and skipped rather than failing bring-up.
    pub fn register_constraint_table(
        &self,
        domain_id: u32,
        table: &ConstraintTable,
    ) -> Result<(), DsufreqError> {
        let mut domains = self.lock()?;
        let record = record_mut(&mut domains, domain_id)?;
        let mut kept = table.clone();
        if kept.rows.len() > MAX_CONSTRAINT_ROWS {
            warn!(
                "{}",
                DsufreqError::ConstraintOversize {
                    master: kept.master.clone(),
                    rows: kept.rows.len(),
                    max: MAX_CONSTRAINT_ROWS,
                }
            );
            kept.rows.truncate(MAX_CONSTRAINT_ROWS);
        }
        trace!(
            "domain {domain_id}: constraint table against {:?} with {} rows",
            kept.master,
            kept.rows.len()
        );
        record.constraints.push(kept);
        Ok(())
    }

    /// Update a domain's QoS window. One-way notification from the QoS layer;
    /// no rescale is triggered here.
    pub fn update_window(
        &self,
        domain_id: u32,
        min_khz: u64,
        max_khz: u64,
    ) -> Result<(), DsufreqError> {
        let mut domains = self.lock()?;
        let record = record_mut(&mut domains, domain_id)?;
        record.min_khz = min_khz;
        record.max_khz = max_khz;
        Ok(())
    }

    /// The domain's current QoS window.
    pub fn window(&self, domain_id: u32) -> Result<(u64, u64), DsufreqError> {
        let mut domains = self.lock()?;
        let record = record_mut(&mut domains, domain_id)?;
        Ok((record.min_khz, record.max_khz))
    }

    /// Per-master constraint row counts, for the status surface.
    pub fn constraint_summary(&self, domain_id: u32) -> Result<Vec<(String, usize)>, DsufreqError> {
        let mut domains = self.lock()?;
        let record = record_mut(&mut domains, domain_id)?;
        Ok(record
            .constraints
            .iter()
            .map(|c| (c.master.clone(), c.rows.len()))
            .collect())
    }

    /// Entry point for scaling requests.
    ///
    /// Clamps the target into the domain's current window, then invokes the
    /// domain's scaler outside the registry lock (the governor serializes its
    /// own scaling path).
    ///
    /// # Arguments
    ///
    /// * `domain_id` - Target domain
    /// * `target_khz` - Requested frequency before clamping
    /// * `relation` - Rounding policy handed through to the governor
    ///
    /// # Returns: `Result<u64, DsufreqError>`
    /// * `Ok(u64)` - Frequency the domain now runs at
    /// * `Err(DsufreqError::Argument)` - Unknown domain
    /// * `Err(DsufreqError::Internal)` - Domain registered but no scaler installed
    /// * `Err(DsufreqError::Scaling)` - The governor's backend write failed
    pub fn request(
        &self,
        domain_id: u32,
        target_khz: u64,
        relation: Relation,
    ) -> Result<u64, DsufreqError> {
        let (clamped_khz, scaler) = {
            let mut domains = self.lock()?;
            let record = record_mut(&mut domains, domain_id)?;
            let clamped_khz = target_khz.clamp(record.min_khz, record.max_khz);
            let scaler = record.scaler.clone().ok_or_else(|| {
                DsufreqError::Internal(format!("domain {domain_id} has no scaler installed"))
            })?;
            (clamped_khz, scaler)
        };
        if clamped_khz != target_khz {
            trace!(
                "domain {domain_id}: request {target_khz} kHz clamped to {clamped_khz} kHz by QoS window"
            );
        }
        scaler(clamped_khz, relation)
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<u32, DomainRecord>>, DsufreqError> {
        self.domains
            .lock()
            .map_err(|_| DsufreqError::Internal("arbiter domain registry lock poisoned".into()))
    }
}

fn record_mut<'a>(
    domains: &'a mut HashMap<u32, DomainRecord>,
    domain_id: u32,
) -> Result<&'a mut DomainRecord, DsufreqError> {
    domains.get_mut(&domain_id).ok_or_else(|| {
        DsufreqError::Argument(format!("domain {domain_id} is not registered with the arbiter"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use googletest::prelude::*;
    use std::sync::atomic::{AtomicU64, Ordering};

    fn arbiter_with_domain() -> FreqArbiter {
        let arbiter = FreqArbiter::new();
        arbiter.register_domain(0, 800, 1200, 800).unwrap();
        arbiter
    }

    #[gtest]
    fn test_duplicate_domain_rejected() {
        let arbiter = arbiter_with_domain();
        let result = arbiter.register_domain(0, 800, 1200, 800);
        assert!(matches!(result, Err(DsufreqError::Argument(_))));
    }

    #[gtest]
    fn test_request_unknown_domain_rejected() {
        let arbiter = arbiter_with_domain();
        let result = arbiter.request(7, 1000, Relation::AtLeast);
        assert!(matches!(result, Err(DsufreqError::Argument(_))));
    }

    #[gtest]
    fn test_request_without_scaler_fails() {
        let arbiter = arbiter_with_domain();
        let result = arbiter.request(0, 1000, Relation::AtLeast);
        assert!(matches!(result, Err(DsufreqError::Internal(_))));
    }

    #[gtest]
    fn test_request_clamps_into_window() {
        let arbiter = arbiter_with_domain();
        let seen = Arc::new(AtomicU64::new(0));
        let seen_by_scaler = Arc::clone(&seen);
        arbiter
            .register_scaler(
                0,
                Arc::new(move |khz, _| {
                    seen_by_scaler.store(khz, Ordering::SeqCst);
                    Ok(khz)
                }),
            )
            .unwrap();

        arbiter.request(0, 5000, Relation::AtMost).unwrap();
        expect_that!(seen.load(Ordering::SeqCst), eq(1200));

        arbiter.update_window(0, 900, 1100).unwrap();
        assert_that!(arbiter.window(0), ok(eq(&(900, 1100))));
        arbiter.request(0, 5000, Relation::AtMost).unwrap();
        expect_that!(seen.load(Ordering::SeqCst), eq(1100));
        arbiter.request(0, 100, Relation::AtLeast).unwrap();
        expect_that!(seen.load(Ordering::SeqCst), eq(900));
    }

    #[gtest]
    fn test_oversize_constraint_table_truncated() {
        let arbiter = arbiter_with_domain();
        let table = ConstraintTable {
            master: "cpucl0".to_string(),
            rows: (0..40).map(|i| (i, i * 2)).collect(),
        };
        arbiter.register_constraint_table(0, &table).unwrap();
        let summary = arbiter.constraint_summary(0).unwrap();
        assert_that!(summary, container_eq([("cpucl0".to_string(), MAX_CONSTRAINT_ROWS)]));
    }
}
