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

//! Frequency QoS request aggregation.
//!
//! Any number of requesters may hold a minimum- or maximum-frequency request
//! against the domain. The effective window is the standard QoS aggregation:
//! the largest of all minimum requests and the smallest of all maximum
//! requests, seeded with the hardware bounds. Every accepted update recomputes
//! the window and fires the registered change notifier. Requests live for the
//! process lifetime; there is no removal.

use crate::error::DsufreqError;
use std::sync::Mutex;

/// Which bound a request constrains.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QosKind {
    Min,
    Max,
}

/// Opaque handle identifying one requester's slot.
#[derive(Debug, Clone, Copy)]
pub struct RequestHandle(usize);

type ChangeNotifier = std::sync::Arc<dyn Fn(u64, u64) + Send + Sync>;

struct AggregatorInner {
    requests: Vec<(QosKind, u64)>,
    notifier: Option<ChangeNotifier>,
}

pub struct QosAggregator {
    hw_min_khz: u64,
    hw_max_khz: u64,
    inner: Mutex<AggregatorInner>,
}

impl QosAggregator {
    /// Create an aggregator seeded with the hardware bounds.
    pub fn new(hw_min_khz: u64, hw_max_khz: u64) -> QosAggregator {
        QosAggregator {
            hw_min_khz,
            hw_max_khz,
            inner: Mutex::new(AggregatorInner {
                requests: Vec::new(),
                notifier: None,
            }),
        }
    }

    /// Add a request and return its handle. Does not fire the notifier; the
    /// caller pushes the seed values through [`QosAggregator::update_request`]
    /// once wiring is complete.
    pub fn add_request(&self, kind: QosKind, initial_khz: u64) -> RequestHandle {
        let mut inner = self.lock();
        inner.requests.push((kind, initial_khz));
        RequestHandle(inner.requests.len() - 1)
    }

    /// Replace the value of an existing request, recompute the effective
    /// window and fire the change notifier.
    pub fn update_request(&self, handle: RequestHandle, khz: u64) -> Result<(), DsufreqError> {
        let (min_khz, max_khz, notifier) = {
            let mut inner = self.lock();
            let slot = inner.requests.get_mut(handle.0).ok_or_else(|| {
                DsufreqError::Argument(format!("no QoS request with handle {}", handle.0))
            })?;
            slot.1 = khz;
            let (min_khz, max_khz) = effective(&inner.requests, self.hw_min_khz, self.hw_max_khz);
            (min_khz, max_khz, inner.notifier.clone())
        };
        // Fired outside the lock so a notifier may call back into the aggregator.
        if let Some(notifier) = notifier {
            notifier(min_khz, max_khz);
        }
        Ok(())
    }

    /// Install the single change notifier. Installing a second one is a wiring
    /// bug and fails with `DsufreqError::QosInit`.
    pub fn register_change_notifier(
        &self,
        notifier: impl Fn(u64, u64) + Send + Sync + 'static,
    ) -> Result<(), DsufreqError> {
        let mut inner = self.lock();
        if inner.notifier.is_some() {
            return Err(DsufreqError::QosInit(
                "a change notifier is already registered".to_string(),
            ));
        }
        inner.notifier = Some(std::sync::Arc::new(notifier));
        Ok(())
    }

    /// The current effective `(min, max)` window.
    pub fn effective(&self) -> (u64, u64) {
        let inner = self.lock();
        effective(&inner.requests, self.hw_min_khz, self.hw_max_khz)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, AggregatorInner> {
        // A panic while holding this short lock is already fatal to the daemon.
        self.inner.lock().expect("QoS aggregator lock poisoned")
    }
}

fn effective(requests: &[(QosKind, u64)], hw_min_khz: u64, hw_max_khz: u64) -> (u64, u64) {
    let min_khz = requests
        .iter()
        .filter(|(kind, _)| *kind == QosKind::Min)
        .map(|(_, khz)| *khz)
        .fold(hw_min_khz, u64::max);
    let max_khz = requests
        .iter()
        .filter(|(kind, _)| *kind == QosKind::Max)
        .map(|(_, khz)| *khz)
        .fold(hw_max_khz, u64::min);
    (min_khz, max_khz)
}

#[cfg(test)]
mod tests {
    use super::*;
    use googletest::prelude::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU64, Ordering};

    #[gtest]
    fn test_effective_defaults_to_hardware_bounds() {
        let qos = QosAggregator::new(800, 1200);
        assert_that!(qos.effective(), eq((800, 1200)));
    }

    #[gtest]
    fn test_min_requests_take_the_largest() {
        let qos = QosAggregator::new(800, 1200);
        let a = qos.add_request(QosKind::Min, 800);
        let b = qos.add_request(QosKind::Min, 800);
        qos.update_request(a, 900).unwrap();
        qos.update_request(b, 1000).unwrap();
        assert_that!(qos.effective(), eq((1000, 1200)));
        qos.update_request(b, 850).unwrap();
        assert_that!(qos.effective(), eq((900, 1200)));
    }

    #[gtest]
    fn test_max_requests_take_the_smallest() {
        let qos = QosAggregator::new(800, 1200);
        let a = qos.add_request(QosKind::Max, 1200);
        qos.add_request(QosKind::Max, 1100);
        qos.update_request(a, 1000).unwrap();
        assert_that!(qos.effective(), eq((800, 1000)));
    }

    #[gtest]
    fn test_update_unknown_handle_fails() {
        let qos = QosAggregator::new(800, 1200);
        let result = qos.update_request(RequestHandle(3), 900);
        assert!(matches!(result, Err(DsufreqError::Argument(_))));
    }

    #[gtest]
    fn test_notifier_fires_with_new_window() {
        let qos = QosAggregator::new(800, 1200);
        let handle = qos.add_request(QosKind::Min, 800);
        let seen = Arc::new(AtomicU64::new(0));
        let seen_by_notifier = Arc::clone(&seen);
        qos.register_change_notifier(move |min_khz, _max_khz| {
            seen_by_notifier.store(min_khz, Ordering::SeqCst);
        })
        .unwrap();
        qos.update_request(handle, 950).unwrap();
        assert_that!(seen.load(Ordering::SeqCst), eq(950));
    }

    #[gtest]
    fn test_second_notifier_is_rejected() {
        let qos = QosAggregator::new(800, 1200);
        qos.register_change_notifier(|_, _| {}).unwrap();
        let result = qos.register_change_notifier(|_, _| {});
        assert!(matches!(result, Err(DsufreqError::QosInit(_))));
    }
}
