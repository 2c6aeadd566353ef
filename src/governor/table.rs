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

//! DSU operating-point table construction and frequency resolution.
//!
//! The DSU domain has no frequency table of its own; it is derived at bring-up by
//! merging the DSU column of every cluster's CPU-to-DSU mapping table, clamping
//! the result to the hardware range reported by the clock backend, and attaching
//! the backend's voltage for each surviving frequency. The finished table is
//! strictly ascending, duplicate-free, and immutable for the life of the daemon.

use crate::backends::backend::ClockBackend;
use crate::config::domain_config::ClusterTable;
use crate::error::DsufreqError;
use log::debug;
use std::fmt;

/// Rounding policy applied when a requested frequency falls between table entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    /// Pick the lowest entry at least as fast as the request (round up).
    AtLeast,
    /// Pick the highest entry no faster than the request (round down).
    AtMost,
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Relation::AtLeast => write!(f, "at-least"),
            Relation::AtMost => write!(f, "at-most"),
        }
    }
}

impl TryFrom<&str> for Relation {
    type Error = DsufreqError;

    /// Parse the wire form used by the D-Bus and CLI surfaces.
    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "up" | "at-least" => Ok(Relation::AtLeast),
            "down" | "at-most" => Ok(Relation::AtMost),
            _ => Err(DsufreqError::Argument(format!(
                "{value:?} is not a rounding relation. Expected 'up' or 'down'."
            ))),
        }
    }
}

/// One operating point: a legal DSU frequency and its supply voltage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OppEntry {
    pub freq_khz: u64,
    pub volt_uv: u32,
}

/// The immutable, ascending table of legal DSU frequencies.
#[derive(Debug)]
pub struct FreqTable {
    entries: Vec<OppEntry>,
}

/// Merge two ascending frequency lists into one ascending duplicate-free list.
///
/// This is the merge step of a merge sort with deduplication folded in: whichever
/// head is smaller is emitted unless it equals the previously emitted value. An
/// empty accumulator short-circuits to a copy of the new table.
///
/// Both inputs being sorted ascending is a precondition, not re-validated here;
/// the config parser enforces it where foreign data enters the daemon.
pub(crate) fn merge_freq_tables(acc: &[u64], new: &[u64]) -> Vec<u64> {
    if acc.is_empty() {
        return new.to_vec();
    }
    let mut merged = Vec::with_capacity(acc.len() + new.len());
    let (mut i, mut j) = (0, 0);
    while i < acc.len() || j < new.len() {
        let next = match (acc.get(i), new.get(j)) {
            (Some(&a), Some(&b)) if a <= b => {
                i += 1;
                a
            }
            (Some(_), Some(&b)) => {
                j += 1;
                b
            }
            (Some(&a), None) => {
                i += 1;
                a
            }
            (None, Some(&b)) => {
                j += 1;
                b
            }
            (None, None) => unreachable!(),
        };
        if merged.last() != Some(&next) {
            merged.push(next);
        }
    }
    merged
}

impl FreqTable {
    /// Build the domain's frequency table from the per-cluster mapping tables.
    ///
    /// Merges every cluster's DSU column, drops entries outside the backend's
    /// `[min, max]` range, and attaches the backend voltage for each survivor.
    ///
    /// # Arguments
    ///
    /// * `clusters` - Per-cluster tables from the domain description
    /// * `backend` - Clock backend supplying the hardware range and voltages
    ///
    /// # Returns: `Result<FreqTable, DsufreqError>`
    /// * `Ok(FreqTable)` - Non-empty ascending table
    /// * `Err(DsufreqError::EmptyTable)` - Range filtering removed every entry
    pub fn build(
        clusters: &[ClusterTable],
        backend: &dyn ClockBackend,
    ) -> Result<Self, DsufreqError> {
        let mut merged: Vec<u64> = Vec::new();
        for cluster in clusters {
            merged = merge_freq_tables(&merged, &cluster.dsu_khz);
        }

        let min_khz = backend.min_freq_khz();
        let max_khz = backend.max_freq_khz();
        let entries: Vec<OppEntry> = merged
            .into_iter()
            .filter(|khz| (min_khz..=max_khz).contains(khz))
            .map(|freq_khz| OppEntry {
                freq_khz,
                volt_uv: backend.voltage_for_freq(freq_khz),
            })
            .collect();

        if entries.is_empty() {
            return Err(DsufreqError::EmptyTable { min_khz, max_khz });
        }
        debug!(
            "built DSU frequency table ({} entries, {}..{} kHz)",
            entries.len(),
            entries[0].freq_khz,
            entries[entries.len() - 1].freq_khz
        );
        Ok(FreqTable { entries })
    }

    pub fn entries(&self) -> &[OppEntry] {
        &self.entries
    }

    pub fn frequencies(&self) -> Vec<u64> {
        self.entries.iter().map(|e| e.freq_khz).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Lowest legal frequency. The table is never empty after [`FreqTable::build`].
    pub fn min_khz(&self) -> u64 {
        self.entries[0].freq_khz
    }

    /// Highest legal frequency.
    pub fn max_khz(&self) -> u64 {
        self.entries[self.entries.len() - 1].freq_khz
    }

    /// Position of an exact table entry, if present.
    pub fn position(&self, khz: u64) -> Option<usize> {
        self.entries.iter().position(|e| e.freq_khz == khz)
    }

    /// Map a requested frequency to a legal table entry.
    ///
    /// Pure function of the table contents and arguments; never fails. A request
    /// above the table maximum resolves to the maximum, one below the minimum to
    /// the minimum, regardless of relation.
    pub fn resolve(&self, target_khz: u64, relation: Relation) -> u64 {
        match relation {
            Relation::AtLeast => self
                .entries
                .iter()
                .map(|e| e.freq_khz)
                .find(|khz| *khz >= target_khz)
                .unwrap_or_else(|| self.max_khz()),
            Relation::AtMost => self
                .entries
                .iter()
                .map(|e| e.freq_khz)
                .take_while(|khz| *khz <= target_khz)
                .last()
                .unwrap_or_else(|| self.min_khz()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use googletest::prelude::*;
    use rstest::*;

    struct FixedBackend {
        min_khz: u64,
        max_khz: u64,
    }

    impl ClockBackend for FixedBackend {
        fn name(&self) -> &str {
            "fixed"
        }
        fn min_freq_khz(&self) -> u64 {
            self.min_khz
        }
        fn max_freq_khz(&self) -> u64 {
            self.max_khz
        }
        fn boot_freq_khz(&self) -> u64 {
            self.min_khz
        }
        fn set_frequency(&self, _khz: u64) -> Result<(), DsufreqError> {
            Ok(())
        }
        fn voltage_for_freq(&self, khz: u64) -> u32 {
            // Distinct per-frequency value so attachment is observable.
            (khz / 1000) as u32
        }
    }

    fn cluster(name: &str, dsu_khz: &[u64]) -> ClusterTable {
        ClusterTable {
            name: name.to_string(),
            dsu_khz: dsu_khz.to_vec(),
        }
    }

    fn table(freqs: &[u64]) -> FreqTable {
        FreqTable::build(
            &[cluster("cl0", freqs)],
            &FixedBackend {
                min_khz: 0,
                max_khz: u64::MAX,
            },
        )
        .unwrap()
    }

    #[gtest]
    #[rstest]
    #[case::interleaved(&[100, 300, 500], &[200, 300, 400], &[100, 200, 300, 400, 500])]
    #[case::empty_acc(&[], &[200, 300], &[200, 300])]
    #[case::empty_new(&[100, 200], &[], &[100, 200])]
    #[case::disjoint_low(&[400, 500], &[100, 200], &[100, 200, 400, 500])]
    #[case::all_equal(&[100, 200], &[100, 200], &[100, 200])]
    fn test_merge(#[case] acc: &[u64], #[case] new: &[u64], #[case] expected: &[u64]) {
        assert_that!(merge_freq_tables(acc, new), container_eq(expected.to_vec()));
    }

    #[gtest]
    fn test_build_merges_clusters_ascending_unique() {
        let t = FreqTable::build(
            &[
                cluster("cl0", &[100, 300, 500]),
                cluster("cl1", &[200, 300, 400]),
            ],
            &FixedBackend {
                min_khz: 0,
                max_khz: u64::MAX,
            },
        )
        .unwrap();
        assert_that!(t.frequencies(), container_eq([100, 200, 300, 400, 500]));
        assert!(t.frequencies().windows(2).all(|w| w[0] < w[1]));
    }

    #[gtest]
    fn test_build_clamps_to_backend_range() {
        let t = FreqTable::build(
            &[cluster("cl0", &[100, 200, 300, 400, 500])],
            &FixedBackend {
                min_khz: 200,
                max_khz: 400,
            },
        )
        .unwrap();
        assert_that!(t.frequencies(), container_eq([200, 300, 400]));
    }

    #[gtest]
    fn test_build_attaches_voltages() {
        let t = table(&[1000, 2000]);
        assert_that!(t.entries()[0].volt_uv, eq(1));
        assert_that!(t.entries()[1].volt_uv, eq(2));
    }

    #[gtest]
    fn test_build_empty_after_filter_fails() {
        let result = FreqTable::build(
            &[cluster("cl0", &[100, 200])],
            &FixedBackend {
                min_khz: 300,
                max_khz: 400,
            },
        );
        assert!(matches!(
            result,
            Err(DsufreqError::EmptyTable { .. })
        ));
    }

    #[gtest]
    #[rstest]
    #[case::exact(1000, Relation::AtLeast, 1000)]
    #[case::between_up(1100, Relation::AtLeast, 1200)]
    #[case::above_max_up(1300, Relation::AtLeast, 1200)]
    #[case::below_min_up(100, Relation::AtLeast, 800)]
    #[case::exact_down(1000, Relation::AtMost, 1000)]
    #[case::between_down(1100, Relation::AtMost, 1000)]
    #[case::below_min_down(100, Relation::AtMost, 800)]
    #[case::above_max_down(1300, Relation::AtMost, 1200)]
    fn test_resolve(#[case] target: u64, #[case] relation: Relation, #[case] expected: u64) {
        let t = table(&[800, 1000, 1200]);
        assert_that!(t.resolve(target, relation), eq(expected));
    }

    #[gtest]
    fn test_resolve_is_idempotent() {
        let t = table(&[800, 1000, 1200]);
        for target in [0, 799, 800, 801, 1000, 1100, 1200, 5000] {
            for relation in [Relation::AtLeast, Relation::AtMost] {
                let once = t.resolve(target, relation);
                expect_that!(t.resolve(once, relation), eq(once));
            }
        }
    }

    #[gtest]
    #[rstest]
    #[case::up("up", Relation::AtLeast)]
    #[case::down("down", Relation::AtMost)]
    #[case::at_least("at-least", Relation::AtLeast)]
    #[case::at_most("at-most", Relation::AtMost)]
    fn test_relation_from_str(#[case] raw: &str, #[case] expected: Relation) {
        assert_that!(Relation::try_from(raw), ok(eq(&expected)));
    }

    #[gtest]
    fn test_relation_from_bad_str_fails() {
        assert!(matches!(
            Relation::try_from("sideways"),
            Err(DsufreqError::Argument(_))
        ));
    }
}
