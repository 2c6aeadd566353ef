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

pub mod control_interface;
pub mod status_interface;

use std::time::Duration;

/// Render a time-in-state table as one "<khz> <nanoseconds>" line per entry,
/// the shape the kernel's cpufreq stats export uses.
pub(crate) fn format_time_in_state(rows: &[(u64, Duration)]) -> String {
    rows.iter()
        .map(|(khz, residency)| format!("{khz} {}\n", residency.as_nanos()))
        .collect()
}

#[cfg(test)]
mod test_format_time_in_state {
    use super::*;
    use googletest::prelude::*;

    #[gtest]
    fn test_rows_render_one_per_line() {
        let rows = [
            (800000, Duration::from_nanos(1500)),
            (1000000, Duration::ZERO),
        ];
        assert_that!(
            format_time_in_state(&rows),
            eq("800000 1500\n1000000 0\n")
        );
    }

    #[gtest]
    fn test_empty_table_renders_empty() {
        assert_that!(format_time_in_state(&[]), eq(""));
    }
}
