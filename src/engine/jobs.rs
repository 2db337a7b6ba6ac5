//! Backfill and consistency jobs.
//!
//! Repair derived fields that live ingestion could not know yet or that
//! predate a resolver change. Every job supports a dry run that produces
//! the same diagnostics as a live run while writing nothing.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use log::info;

use crate::engine::errors::EngineError;
use crate::engine::storage::RoamStore;
use crate::engine::types::PoiKind;

/// Result of one consistency job run.
#[derive(Debug, Clone)]
pub struct JobReport {
    pub job: &'static str,
    pub examined: usize,
    pub changed: usize,
    /// One line per change, identical between dry and live runs.
    pub changes: Vec<String>,
}

impl JobReport {
    pub fn new(job: &'static str) -> Self {
        Self {
            job,
            examined: 0,
            changed: 0,
            changes: Vec::new(),
        }
    }

    fn examine(&mut self) {
        self.examined += 1;
    }

    fn record(&mut self, line: String) {
        self.changed += 1;
        self.changes.push(line);
    }

    pub fn merge(&mut self, other: JobReport) {
        self.examined += other.examined;
        self.changed += other.changed;
        self.changes.extend(other.changes);
    }

    pub fn summary(&self) -> String {
        format!(
            "{}: examined {}, changed {}",
            self.job, self.examined, self.changed
        )
    }
}

fn fmt_discovered(value: Option<DateTime<Utc>>) -> String {
    match value {
        Some(at) => at.to_rfc3339(),
        None => "unset".to_string(),
    }
}

/// Reset each POI's discovery timestamp to the earliest walk log that
/// references it. Capitals are provisioned, not discovered, and are left
/// alone.
pub fn backfill_poi_discovered(store: &RoamStore, dry_run: bool) -> Result<JobReport, EngineError> {
    let mut report = JobReport::new("poi-discovered");

    let mut earliest: HashMap<(String, String), DateTime<Utc>> = HashMap::new();
    for (_key, log) in store.walk_log_entries()? {
        if let Some(poi) = &log.poi {
            let entry = earliest
                .entry((poi.region.clone(), poi.name.clone()))
                .or_insert(log.created_at);
            if log.created_at < *entry {
                *entry = log.created_at;
            }
        }
    }

    for mut poi in store.list_pois()? {
        if poi.kind == PoiKind::Capital {
            continue;
        }
        report.examine();
        let Some(min) = earliest.get(&(poi.region.clone(), poi.name.clone())) else {
            continue;
        };
        let needs_update = match poi.discovered {
            None => true,
            Some(current) => current > *min,
        };
        if needs_update {
            report.record(format!(
                "poi {}/{}: discovered {} -> {}",
                poi.region,
                poi.name,
                fmt_discovered(poi.discovered),
                min.to_rfc3339()
            ));
            if !dry_run {
                poi.discovered = Some(*min);
                store.put_poi(poi)?;
            }
        }
    }

    info!("{}", report.summary());
    Ok(report)
}

/// Fill the last-known-region field of ocean logs that predate the
/// resolver carrying it, walking the log stream once in order. Only land
/// rows with a catalog-resolved region feed the carry, matching what live
/// ingestion would have written.
pub fn backfill_last_known_region(
    store: &RoamStore,
    dry_run: bool,
) -> Result<JobReport, EngineError> {
    let mut report = JobReport::new("last-known-region");

    let mut carry: Option<String> = None;
    for (key, mut log) in store.walk_log_entries()? {
        if log.is_ocean() {
            report.examine();
            if log.last_known_region.is_none() {
                if let Some(region) = &carry {
                    report.record(format!(
                        "log {}: last known region unset -> {}",
                        log.id, region
                    ));
                    if !dry_run {
                        log.last_known_region = Some(region.clone());
                        store.update_walk_log(&key, &log)?;
                    }
                }
            }
        } else if let Some(region) = &log.region {
            carry = Some(region.clone());
        }
    }

    info!("{}", report.summary());
    Ok(report)
}

/// Link orphaned chat rows to profiles that now exist, matching usernames
/// case-insensitively.
pub fn relink_chat_profiles(store: &RoamStore, dry_run: bool) -> Result<JobReport, EngineError> {
    let mut report = JobReport::new("chat-profiles");

    for (key, mut row) in store.chat_entries()? {
        if row.profile.is_some() {
            continue;
        }
        report.examine();
        if let Some(profile) = store.get_profile(&row.username)? {
            let lower = profile.username.to_ascii_lowercase();
            report.record(format!(
                "chat {}: linked {} -> {}",
                row.id, row.username, lower
            ));
            if !dry_run {
                row.profile = Some(lower);
                store.update_chat_command(&key, &row)?;
            }
        }
    }

    info!("{}", report.summary());
    Ok(report)
}

/// Run every consistency job and merge their reports.
pub fn run_all(store: &RoamStore, dry_run: bool) -> Result<JobReport, EngineError> {
    let mut report = JobReport::new("all");
    report.merge(backfill_poi_discovered(store, dry_run)?);
    report.merge(backfill_last_known_region(store, dry_run)?);
    report.merge(relink_chat_profiles(store, dry_run)?);
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::ingest::{append_log, record_chat_command, NewChatCommand, NewWalkLog};
    use crate::engine::storage::RoamStoreBuilder;
    use crate::engine::types::{ProfileRecord, Season, WalkLogRecord, WALK_LOG_SCHEMA_VERSION};
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn at(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 1, 9, minute, 0).unwrap()
    }

    /// A row shaped like pre-fallback history: region resolved at write
    /// time, last-known-region never filled. `resolved` is `None` for rows
    /// whose raw name was not in the catalog back then either.
    fn legacy_log(
        id: u64,
        region: &str,
        resolved: Option<&str>,
        created_at: DateTime<Utc>,
    ) -> WalkLogRecord {
        WalkLogRecord {
            id,
            world_x: 0,
            world_z: 0,
            map_pixel_x: 0,
            map_pixel_y: 0,
            region_raw: region.to_string(),
            region: resolved.map(|r| r.to_string()),
            location: "Wilderness".to_string(),
            poi: None,
            player_x: 0.0,
            player_y: 0.0,
            player_z: 0.0,
            date: String::new(),
            season: Season::Unknown,
            weather: "Clear".to_string(),
            current_song: None,
            last_known_region: None,
            created_at,
            schema_version: WALK_LOG_SCHEMA_VERSION,
        }
    }

    #[test]
    fn discovered_backfills_to_earliest_linked_log() {
        let dir = TempDir::new().expect("tempdir");
        let store = RoamStoreBuilder::new(dir.path()).open().expect("store");

        // Later log first: creates the POI with the later discovery time
        append_log(
            &store,
            &NewWalkLog::at("Daggerfall", "Tower of Ankhasha").with_created_at(at(30)),
        )
        .expect("append");
        // An earlier row for the same place arrives out of order
        append_log(
            &store,
            &NewWalkLog::at("Daggerfall", "Tower of Ankhasha").with_created_at(at(10)),
        )
        .expect("append");

        let dry = backfill_poi_discovered(&store, true).expect("dry run");
        assert_eq!(dry.changed, 1);
        let untouched = store
            .get_poi("Daggerfall", "Tower of Ankhasha")
            .expect("get")
            .expect("present");
        assert_eq!(untouched.discovered, Some(at(30)), "dry run must not write");

        let live = backfill_poi_discovered(&store, false).expect("live run");
        assert_eq!(live.changes, dry.changes);
        let fixed = store
            .get_poi("Daggerfall", "Tower of Ankhasha")
            .expect("get")
            .expect("present");
        assert_eq!(fixed.discovered, Some(at(10)));

        let again = backfill_poi_discovered(&store, false).expect("idempotent");
        assert_eq!(again.changed, 0);
    }

    #[test]
    fn discovered_backfill_skips_capitals() {
        let dir = TempDir::new().expect("tempdir");
        let store = RoamStoreBuilder::new(dir.path()).open().expect("store");
        append_log(
            &store,
            &NewWalkLog::at("Sentinel", "Sentinel").with_created_at(at(5)),
        )
        .expect("append");

        let report = backfill_poi_discovered(&store, false).expect("run");
        assert_eq!(report.changed, 0);
        let capital = store
            .get_poi("Sentinel", "Sentinel")
            .expect("get")
            .expect("present");
        assert!(capital.discovered.is_none());
    }

    #[test]
    fn last_known_region_fills_legacy_ocean_rows() {
        let dir = TempDir::new().expect("tempdir");
        let store = RoamStoreBuilder::new(dir.path())
            .without_region_seed()
            .without_quest_seed()
            .open()
            .expect("store");

        // Rows written before the resolver carried last-known-region
        store
            .commit_walk_log(&legacy_log(1, "Ocean", Some("Ocean"), at(0)), None)
            .expect("commit"); // no land yet, must stay unset
        store
            .commit_walk_log(&legacy_log(2, "Anticlere", Some("Anticlere"), at(1)), None)
            .expect("commit");
        // Unresolved land row: never feeds the carry
        store
            .commit_walk_log(&legacy_log(3, "Atrofall", None, at(2)), None)
            .expect("commit");
        store
            .commit_walk_log(&legacy_log(4, "Ocean", Some("Ocean"), at(3)), None)
            .expect("commit");
        store
            .commit_walk_log(&legacy_log(5, "Ocean", Some("Ocean"), at(4)), None)
            .expect("commit");

        let dry = backfill_last_known_region(&store, true).expect("dry");
        assert_eq!(dry.examined, 3);
        assert_eq!(dry.changed, 2);

        let live = backfill_last_known_region(&store, false).expect("live");
        assert_eq!(live.changes, dry.changes);

        let rows = store.walk_log_entries().expect("entries");
        assert!(rows[0].1.last_known_region.is_none());
        assert_eq!(
            rows[3].1.last_known_region.as_deref(),
            Some("Anticlere"),
            "carry skips the unresolved land row"
        );
        assert_eq!(rows[4].1.last_known_region.as_deref(), Some("Anticlere"));
    }

    #[test]
    fn chat_relink_waits_for_a_profile() {
        let dir = TempDir::new().expect("tempdir");
        let store = RoamStoreBuilder::new(dir.path())
            .without_region_seed()
            .without_quest_seed()
            .open()
            .expect("store");
        record_chat_command(
            &store,
            &NewChatCommand::new("Bob", "!walk").with_created_at(at(0)),
        )
        .expect("chat");

        let nothing = relink_chat_profiles(&store, false).expect("run");
        assert_eq!(nothing.changed, 0, "no profile to link against yet");

        store
            .put_profile(ProfileRecord::new("Bob", at(1)))
            .expect("profile");

        let dry = relink_chat_profiles(&store, true).expect("dry");
        assert_eq!(dry.changed, 1);
        let (_key, row) = &store.chat_entries().expect("entries")[0];
        assert!(row.profile.is_none(), "dry run must not write");

        let live = relink_chat_profiles(&store, false).expect("live");
        assert_eq!(live.changes, dry.changes);
        let (_key, row) = &store.chat_entries().expect("entries")[0];
        assert_eq!(row.profile.as_deref(), Some("bob"));

        let again = relink_chat_profiles(&store, false).expect("again");
        assert_eq!(again.changed, 0);
    }

    #[test]
    fn run_all_merges_reports() {
        let dir = TempDir::new().expect("tempdir");
        let store = RoamStoreBuilder::new(dir.path()).open().expect("store");
        append_log(
            &store,
            &NewWalkLog::at("Wayrest", "Gothway Garden").with_created_at(at(0)),
        )
        .expect("append");

        let report = run_all(&store, true).expect("run all");
        assert_eq!(report.job, "all");
        assert_eq!(report.changed, 0);
        assert!(report.examined >= 1);
    }
}
