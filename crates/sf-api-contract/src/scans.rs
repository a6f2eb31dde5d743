// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Scan-narrowing helper
//!
//! Pure reduction over scan listings; no client state involved.

use crate::types::Scan;

/// Narrow a scan listing to the records worth reporting per volume: the
/// single most recent scan, plus the most recent completed-and-successful
/// scan when the latest one is still running or itself succeeded.
pub fn most_recent_scans(scans: &[Scan]) -> Vec<Scan> {
    let mut volumes: Vec<&str> = scans.iter().map(|s| s.volume.as_str()).collect();
    volumes.sort_unstable();
    volumes.dedup();

    let mut narrowed = Vec::new();
    for volume in volumes {
        let Some(latest) = scans
            .iter()
            .filter(|s| s.volume == volume)
            .max_by_key(|s| s.creation_time)
        else {
            continue;
        };
        narrowed.push(latest.clone());

        if latest.state.is_running || latest.state.is_successful {
            let completed = scans
                .iter()
                .filter(|s| {
                    s.volume == volume && !s.state.is_running && s.state.is_successful
                })
                .max_by_key(|s| s.creation_time);
            if let Some(completed) = completed {
                narrowed.push(completed.clone());
            }
        }
    }
    narrowed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ScanState;

    fn scan(volume: &str, creation_time: i64, is_running: bool, is_successful: bool) -> Scan {
        Scan {
            volume: volume.to_string(),
            creation_time,
            state: ScanState {
                is_running,
                is_successful,
                ..ScanState::default()
            },
            ..Scan::default()
        }
    }

    #[test]
    fn keeps_latest_scan_per_volume() {
        let scans = vec![
            scan("kappa", 100, false, false),
            scan("kappa", 200, false, false),
            scan("projects", 150, false, false),
        ];
        let narrowed = most_recent_scans(&scans);
        assert_eq!(narrowed.len(), 2);
        assert!(narrowed.iter().any(|s| s.volume == "kappa" && s.creation_time == 200));
        assert!(narrowed.iter().any(|s| s.volume == "projects" && s.creation_time == 150));
    }

    #[test]
    fn running_latest_also_yields_last_successful() {
        let scans = vec![
            scan("kappa", 100, false, true),
            scan("kappa", 200, false, true),
            scan("kappa", 300, true, false),
        ];
        let narrowed = most_recent_scans(&scans);
        assert_eq!(narrowed.len(), 2);
        assert_eq!(narrowed[0].creation_time, 300);
        assert_eq!(narrowed[1].creation_time, 200);
        assert!(narrowed[1].state.is_successful);
    }

    #[test]
    fn successful_latest_is_reported_twice_as_both_roles() {
        let scans = vec![scan("kappa", 100, false, true), scan("kappa", 200, false, true)];
        let narrowed = most_recent_scans(&scans);
        assert_eq!(narrowed.len(), 2);
        assert_eq!(narrowed[0].creation_time, 200);
        assert_eq!(narrowed[1].creation_time, 200);
    }

    #[test]
    fn failed_latest_with_no_successful_history_stands_alone() {
        let scans = vec![scan("kappa", 100, false, false), scan("kappa", 200, true, false)];
        let narrowed = most_recent_scans(&scans);
        assert_eq!(narrowed.len(), 1);
        assert_eq!(narrowed[0].creation_time, 200);
    }

    #[test]
    fn empty_listing_narrows_to_nothing() {
        assert!(most_recent_scans(&[]).is_empty());
    }
}
