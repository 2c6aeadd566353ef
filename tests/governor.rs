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

//! End-to-end governor scenarios against an in-memory clock backend.

use dsufreqd::arbiter::FreqArbiter;
use dsufreqd::backends::backend::ClockBackend;
use dsufreqd::config::domain_config::ClusterTable;
use dsufreqd::error::DsufreqError;
use dsufreqd::governor::Governor;
use dsufreqd::governor::table::Relation;
use googletest::prelude::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Observable side of the mock backend, shared with the test body.
#[derive(Default)]
struct BackendLog {
    programmed: Mutex<Vec<u64>>,
    fail_next: AtomicBool,
}

struct MockBackend {
    min_khz: u64,
    max_khz: u64,
    boot_khz: u64,
    log: Arc<BackendLog>,
}

impl ClockBackend for MockBackend {
    fn name(&self) -> &str {
        "mock"
    }
    fn min_freq_khz(&self) -> u64 {
        self.min_khz
    }
    fn max_freq_khz(&self) -> u64 {
        self.max_khz
    }
    fn boot_freq_khz(&self) -> u64 {
        self.boot_khz
    }
    fn set_frequency(&self, khz: u64) -> Result<(), DsufreqError> {
        if self.log.fail_next.swap(false, Ordering::SeqCst) {
            return Err(DsufreqError::Internal("injected backend failure".into()));
        }
        self.log.programmed.lock().unwrap().push(khz);
        Ok(())
    }
    fn voltage_for_freq(&self, khz: u64) -> u32 {
        (khz / 1000) as u32
    }
}

fn cluster(dsu_khz: &[u64]) -> ClusterTable {
    ClusterTable {
        name: "cl0".to_string(),
        dsu_khz: dsu_khz.to_vec(),
    }
}

/// Governor over the table [800000, 1000000, 1200000] kHz, booted at 1000000.
fn governor_with_trio_table() -> (Arc<Governor>, Arc<BackendLog>) {
    let log = Arc::new(BackendLog::default());
    let backend = MockBackend {
        min_khz: 800_000,
        max_khz: 1_200_000,
        boot_khz: 1_000_000,
        log: Arc::clone(&log),
    };
    let governor = Governor::new(
        0,
        &[cluster(&[800_000, 1_000_000, 1_200_000])],
        Box::new(backend),
    )
    .unwrap();
    (Arc::new(governor), log)
}

#[gtest]
fn test_scale_up_programs_backend_and_counts_transition() {
    let (governor, log) = governor_with_trio_table();
    assert_that!(governor.current_khz(), ok(eq(&1_000_000)));

    std::thread::sleep(Duration::from_millis(10));
    let programmed = governor.scale(1_100_000, Relation::AtLeast).unwrap();

    assert_that!(programmed, eq(1_200_000));
    assert_that!(governor.current_khz(), ok(eq(&1_200_000)));
    assert_that!(governor.total_transitions(), ok(eq(&1)));
    assert_that!(
        *log.programmed.lock().unwrap(),
        container_eq([1_200_000])
    );

    // The outgoing frequency's residency was closed out at the switch.
    let time_in_state = governor.time_in_state().unwrap();
    let at = |khz: u64| {
        time_in_state
            .iter()
            .find(|(f, _)| *f == khz)
            .map(|(_, d)| *d)
            .unwrap()
    };
    expect_that!(at(1_000_000), ge(Duration::from_millis(5)));
    expect_that!(at(800_000), eq(Duration::ZERO));
}

#[gtest]
fn test_resolving_to_current_is_a_noop() {
    let (governor, log) = governor_with_trio_table();
    let programmed = governor.scale(950_000, Relation::AtLeast).unwrap();
    assert_that!(programmed, eq(1_000_000));
    assert_that!(governor.total_transitions(), ok(eq(&0)));
    assert_that!(log.programmed.lock().unwrap().len(), eq(0));
}

#[gtest]
fn test_backend_failure_leaves_state_untouched() {
    let (governor, log) = governor_with_trio_table();
    log.fail_next.store(true, Ordering::SeqCst);

    let result = governor.scale(1_200_000, Relation::AtLeast);
    assert!(matches!(result, Err(DsufreqError::Scaling { .. })));
    assert_that!(governor.current_khz(), ok(eq(&1_000_000)));
    assert_that!(governor.total_transitions(), ok(eq(&0)));
    assert_that!(log.programmed.lock().unwrap().len(), eq(0));

    // The domain recovers on the next request.
    assert_that!(governor.scale(1_200_000, Relation::AtLeast), ok(eq(&1_200_000)));
    assert_that!(governor.total_transitions(), ok(eq(&1)));
}

#[gtest]
fn test_time_in_state_is_conserved() {
    let before_init = Instant::now();
    let (governor, _log) = governor_with_trio_table();

    std::thread::sleep(Duration::from_millis(15));
    governor.scale(800_000, Relation::AtMost).unwrap();
    std::thread::sleep(Duration::from_millis(15));

    let sum: Duration = governor
        .time_in_state()
        .unwrap()
        .iter()
        .map(|(_, d)| *d)
        .sum();
    // Everything between stats init and the read is accounted somewhere.
    assert_that!(sum, ge(Duration::from_millis(30)));
    assert_that!(sum, le(before_init.elapsed()));
}

#[gtest]
fn test_qos_window_clamps_to_absolute_bounds() {
    let (governor, _log) = governor_with_trio_table();

    let window = governor.apply_limits(700_000, 1_500_000);
    assert_that!(window, eq((800_000, 1_200_000)));

    // Inverted after clamping: the minimum wins.
    let window = governor.apply_limits(1_300_000, 900_000);
    assert_that!(window, eq((1_200_000, 1_200_000)));

    let limits = governor.limits();
    assert_that!(limits.min_khz, eq(1_200_000));
    assert_that!(limits.max_khz, eq(1_200_000));
}

#[gtest]
fn test_arbiter_clamps_requests_into_window() {
    let (governor, _log) = governor_with_trio_table();
    let arbiter = Arc::new(FreqArbiter::new());
    governor.register_with(&arbiter, &[]).unwrap();

    // Full window: a request above the table maximum saturates at it.
    assert_that!(arbiter.request(0, 5_000_000, Relation::AtMost), ok(eq(&1_200_000)));

    let (min_khz, max_khz) = governor.apply_limits(900_000, 1_100_000);
    arbiter.update_window(0, min_khz, max_khz).unwrap();

    // 5 GHz clamps to the 1.1 GHz window top, which rounds down to 1 GHz.
    assert_that!(arbiter.request(0, 5_000_000, Relation::AtMost), ok(eq(&1_000_000)));
    // A request below the window floor is raised to it.
    assert_that!(arbiter.request(0, 100_000, Relation::AtLeast), ok(eq(&1_000_000)));
}

#[gtest]
fn test_empty_table_fails_bring_up() {
    let log = Arc::new(BackendLog::default());
    let backend = MockBackend {
        min_khz: 2_000_000,
        max_khz: 3_000_000,
        boot_khz: 2_000_000,
        log,
    };
    let result = Governor::new(0, &[cluster(&[800_000, 1_000_000])], Box::new(backend));
    assert!(matches!(result, Err(DsufreqError::EmptyTable { .. })));
}

#[gtest]
fn test_voltages_attach_to_table_entries() {
    let (governor, _log) = governor_with_trio_table();
    let entries = governor.table().entries();
    assert_that!(entries.len(), eq(3));
    for entry in entries {
        expect_that!(entry.volt_uv as u64, eq(entry.freq_khz / 1000));
    }
}
