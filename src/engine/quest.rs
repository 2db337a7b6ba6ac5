//! Quest lifecycle: completion windows, participant crediting, atomic
//! rotation, and outfitting of bare quests.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use log::info;
use rand::Rng;
use serde::Serialize;

use crate::engine::errors::EngineError;
use crate::engine::storage::{PlannedParticipant, RoamStore, RotationPlan};
use crate::engine::textgen;
use crate::engine::types::{PoiRef, QuestRecord, QuestStatus};
use crate::logutil::escape_log;

/// Tunables for outfitting a bare quest.
#[derive(Debug, Clone)]
pub struct OutfitConfig {
    /// How many recent quest descriptions the uniqueness check considers.
    pub recent_window: usize,
    pub max_description_tries: usize,
    pub xp_min: u32,
    pub xp_max: u32,
    /// Number of quest-giver portraits available downstream.
    pub giver_images: u8,
}

impl Default for OutfitConfig {
    fn default() -> Self {
        Self {
            recent_window: 10,
            max_description_tries: textgen::MAX_DESCRIPTION_TRIES,
            xp_min: 100,
            xp_max: 300,
            giver_images: 8,
        }
    }
}

/// What a completed rotation handed back.
#[derive(Debug, Clone)]
pub struct CompletionOutcome {
    pub completed: QuestRecord,
    pub next: QuestRecord,
    /// Credited participants, profile casing, in order of first activity.
    pub participants: Vec<String>,
    pub profiles_created: usize,
    pub window_end: DateTime<Utc>,
}

/// Complete a quest and start its successor in one atomic step.
///
/// The completion timestamp is `completed_at` (or now), widened to the
/// latest chat row carrying `completing_request_id` when one is given.
/// Chat commands with timestamps in `[quest.created_at, window_end]`,
/// inclusive on both ends, define the credited participants. Usernames
/// resolve to profiles case-insensitively, creating missing profiles with
/// the casing of the user's earliest qualifying row. Credits are keyed per
/// (quest, user), so re-crediting is a no-op, and a quest that is no
/// longer in progress aborts the whole step with
/// [`EngineError::RotationConflict`].
pub fn complete_and_rotate(
    store: &RoamStore,
    quest_id: u64,
    completed_at: Option<DateTime<Utc>>,
    completing_request_id: Option<&str>,
) -> Result<CompletionOutcome, EngineError> {
    let quest = store.get_quest(quest_id)?;
    if quest.status != QuestStatus::InProgress {
        return Err(EngineError::RotationConflict { quest_id });
    }

    let now = Utc::now();
    let mut window_end = completed_at.unwrap_or(now);
    if let Some(request_id) = completing_request_id {
        // The completing request's chat traffic may trail the completion
        // timestamp; the window stretches to cover it.
        for row in store.chat_for_request(request_id)? {
            if row.created_at > window_end {
                window_end = row.created_at;
            }
        }
    }

    let mut seen: HashSet<String> = HashSet::new();
    let mut participants: Vec<PlannedParticipant> = Vec::new();
    for row in store.chat_in_window(quest.created_at, window_end)? {
        if row.username.trim().is_empty() {
            continue;
        }
        let lower = row.username.to_ascii_lowercase();
        if seen.insert(lower) {
            participants.push(PlannedParticipant {
                orphan_chat_keys: store.orphan_chat_keys_for(&row.username)?,
                username: row.username,
            });
        }
    }

    let plan = RotationPlan {
        quest_id,
        window_end,
        now,
        participants,
    };
    let commit = store.commit_rotation(&plan)?;
    info!(
        "quest {} completed with {} participant(s); quest {} now active",
        quest_id,
        commit.participants.len(),
        commit.next.id
    );

    Ok(CompletionOutcome {
        completed: commit.completed,
        next: commit.next,
        participants: commit.participants,
        profiles_created: commit.profiles_created,
        window_end,
    })
}

/// Complete the currently active quest and rotate.
pub fn rotate_active(
    store: &RoamStore,
    completed_at: Option<DateTime<Utc>>,
    completing_request_id: Option<&str>,
) -> Result<CompletionOutcome, EngineError> {
    let Some(quest_id) = store.active_quest_id()? else {
        return Err(EngineError::NotFound("active quest".to_string()));
    };
    complete_and_rotate(store, quest_id, completed_at, completing_request_id)
}

/// Outfit a bare in-progress quest with a target POI, reward, description,
/// and giver identity. All draws derive from the quest id, so outfitting
/// the same quest against the same catalog always lands the same way.
/// Already-outfitted quests are returned unchanged.
pub fn outfit_quest(
    store: &RoamStore,
    quest_id: u64,
    config: &OutfitConfig,
) -> Result<QuestRecord, EngineError> {
    let mut quest = store.get_quest(quest_id)?;
    if quest.status != QuestStatus::InProgress {
        return Err(EngineError::RotationConflict { quest_id });
    }
    if !quest.is_bare() {
        return Ok(quest);
    }

    let pois = store.list_pois()?;
    if pois.is_empty() {
        return Err(EngineError::NotFound(
            "no points of interest to target".to_string(),
        ));
    }

    // Do not hand out the previous quest's target again back to back.
    let previous: Option<PoiRef> = store
        .list_quests_desc(10)?
        .into_iter()
        .find(|q| q.id != quest_id && q.poi.is_some())
        .and_then(|q| q.poi);
    let mut candidates: Vec<_> = pois.iter().collect();
    if let Some(prev) = &previous {
        if candidates.len() > 1 {
            candidates.retain(|p| !(p.region == prev.region && p.name == prev.name));
        }
    }

    let seed = format!("quest:{}", quest_id);
    let mut target_rng = textgen::seeded_rng(&format!("{}:target", seed));
    let target = candidates[target_rng.gen_range(0..candidates.len())];

    let recent: HashSet<String> = store
        .recent_quest_descriptions(config.recent_window)?
        .into_iter()
        .collect();

    quest.poi = Some(target.poi_ref());
    quest.description = textgen::unique_description(
        &target.name,
        &seed,
        &recent,
        config.max_description_tries,
    );
    quest.giver_name = textgen::quest_giver_name(&format!("{}:giver", seed));

    let mut reward_rng = textgen::seeded_rng(&format!("{}:reward", seed));
    quest.xp = reward_rng.gen_range(config.xp_min..=config.xp_max.max(config.xp_min));
    quest.giver_image = reward_rng.gen_range(0..config.giver_images.max(1));

    store.put_quest(quest.clone())?;
    info!(
        "quest {} outfitted for {}: {}",
        quest_id,
        escape_log(&target.name),
        escape_log(&quest.description)
    );
    Ok(quest)
}

/// A quest together with its credited participants, for display paths.
#[derive(Debug, Clone, Serialize)]
pub struct QuestSummary {
    pub quest: QuestRecord,
    pub participants: Vec<String>,
}

pub fn quest_summary(store: &RoamStore, quest_id: u64) -> Result<QuestSummary, EngineError> {
    let quest = store.get_quest(quest_id)?;
    let participants = store.quest_participants(quest_id)?;
    Ok(QuestSummary {
        quest,
        participants,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::ingest::{record_chat_command, NewChatCommand};
    use crate::engine::storage::RoamStoreBuilder;
    use crate::engine::types::ProfileRecord;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn setup_bare_store() -> (TempDir, RoamStore) {
        let dir = TempDir::new().expect("tempdir");
        let store = RoamStoreBuilder::new(dir.path())
            .without_region_seed()
            .without_quest_seed()
            .open()
            .expect("store");
        (dir, store)
    }

    fn setup_world_store() -> (TempDir, RoamStore) {
        let dir = TempDir::new().expect("tempdir");
        let store = RoamStoreBuilder::new(dir.path())
            .without_quest_seed()
            .open()
            .expect("store");
        (dir, store)
    }

    fn at(second: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 1, 12, 0, 0).unwrap() + chrono::Duration::seconds(second as i64)
    }

    fn chat_at(store: &RoamStore, username: &str, second: u32) {
        record_chat_command(
            store,
            &NewChatCommand::new(username, "!walk").with_created_at(at(second)),
        )
        .expect("chat");
    }

    #[test]
    fn participant_window_is_inclusive_and_case_folded() {
        let (_dir, store) = setup_bare_store();
        store
            .install_active_quest(QuestRecord::new(1, at(0)))
            .expect("install");

        chat_at(&store, "Bob", 0); // lower boundary, inclusive
        chat_at(&store, "alice", 20);
        chat_at(&store, "BOB", 40); // same user, different casing
        chat_at(&store, "Cara", 60); // upper boundary, inclusive
        chat_at(&store, "outsider", 61); // past the window

        let outcome =
            complete_and_rotate(&store, 1, Some(at(60)), None).expect("rotate");
        assert_eq!(outcome.participants, vec!["Bob", "alice", "Cara"]);
        assert_eq!(outcome.profiles_created, 3);
        assert_eq!(outcome.completed.completed_at, Some(at(60)));

        let bob = store.get_profile("bob").expect("get").expect("present");
        assert_eq!(bob.username, "Bob", "earliest casing wins");
        let alice = store.get_profile("ALICE").expect("get").expect("present");
        assert_eq!(alice.username, "alice");
        assert!(store.get_profile("outsider").expect("get").is_none());

        assert!(store.has_credit(1, "BOB").expect("credit"));
        assert!(store.has_credit(1, "cara").expect("credit"));
        assert!(!store.has_credit(1, "outsider").expect("credit"));
    }

    #[test]
    fn reward_window_stretches_to_request_chat() {
        let (_dir, store) = setup_bare_store();
        // Id well above anything the store's id generator will hand out here
        store
            .install_active_quest(QuestRecord::new(1003, at(0)))
            .expect("install");

        record_chat_command(
            &store,
            &NewChatCommand::new("Bob", "!walk")
                .with_request_id("req-1")
                .with_created_at(at(10)),
        )
        .expect("chat");
        // Trails the nominal completion time but belongs to the request
        record_chat_command(
            &store,
            &NewChatCommand::new("alice", "!song")
                .with_request_id("req-1")
                .with_created_at(at(90)),
        )
        .expect("chat");
        // Later still, but a different request: must not stretch the window
        record_chat_command(
            &store,
            &NewChatCommand::new("mallory", "!walk")
                .with_request_id("req-2")
                .with_created_at(at(120)),
        )
        .expect("chat");

        let outcome = complete_and_rotate(&store, 1003, Some(at(60)), Some("req-1"))
            .expect("rotate");
        assert_eq!(outcome.window_end, at(90));
        assert_eq!(outcome.completed.completed_at, Some(at(90)));
        assert_eq!(outcome.participants, vec!["Bob", "alice"]);
        assert!(!store.has_credit(1003, "mallory").expect("credit"));
    }

    #[test]
    fn existing_profiles_keep_their_casing() {
        let (_dir, store) = setup_bare_store();
        store
            .install_active_quest(QuestRecord::new(5, at(0)))
            .expect("install");
        store
            .put_profile(ProfileRecord::new("Bob", at(0)))
            .expect("profile");

        chat_at(&store, "BOB", 10);
        let outcome = complete_and_rotate(&store, 5, Some(at(30)), None).expect("rotate");
        assert_eq!(outcome.participants, vec!["Bob"]);
        assert_eq!(outcome.profiles_created, 0);
    }

    #[test]
    fn rotation_links_orphaned_chat_rows() {
        let (_dir, store) = setup_bare_store();
        store
            .install_active_quest(QuestRecord::new(1002, at(0)))
            .expect("install");
        chat_at(&store, "Bob", 5);
        chat_at(&store, "BOB", 15);

        complete_and_rotate(&store, 1002, Some(at(30)), None).expect("rotate");

        for (_key, row) in store.chat_entries().expect("entries") {
            assert_eq!(row.profile.as_deref(), Some("bob"), "row left orphaned");
        }
    }

    #[test]
    fn rotation_with_no_chat_credits_nobody() {
        let (_dir, store) = setup_bare_store();
        store
            .install_active_quest(QuestRecord::new(4, at(0)))
            .expect("install");
        let outcome = complete_and_rotate(&store, 4, Some(at(10)), None).expect("rotate");
        assert!(outcome.participants.is_empty());
        assert!(outcome.next.is_bare());
        let active = store.active_quest().expect("active").expect("present");
        assert_eq!(active.id, outcome.next.id);
    }

    #[test]
    fn double_completion_is_refused() {
        let (_dir, store) = setup_bare_store();
        store
            .install_active_quest(QuestRecord::new(6, at(0)))
            .expect("install");
        complete_and_rotate(&store, 6, Some(at(10)), None).expect("first rotate");
        let err = complete_and_rotate(&store, 6, Some(at(20)), None).expect_err("second");
        assert!(matches!(err, EngineError::RotationConflict { quest_id: 6 }));
    }

    #[test]
    fn outfit_fills_target_reward_and_description() {
        let (_dir, store) = setup_world_store();
        store
            .install_active_quest(QuestRecord::new(11, at(0)))
            .expect("install");

        let config = OutfitConfig::default();
        let quest = outfit_quest(&store, 11, &config).expect("outfit");
        let target = quest.poi.clone().expect("target");
        assert!(store
            .get_poi(&target.region, &target.name)
            .expect("get")
            .is_some());
        assert!(quest.xp >= config.xp_min && quest.xp <= config.xp_max);
        assert!(quest.giver_image < config.giver_images);
        assert!(quest.description.ends_with('.'));
        assert!(quest.description.contains(&target.name));
        assert!(!quest.giver_name.is_empty());

        // Outfitting again changes nothing
        let again = outfit_quest(&store, 11, &config).expect("outfit again");
        assert_eq!(again, quest);
    }

    #[test]
    fn outfit_is_deterministic_per_quest_id() {
        let (_dir_a, store_a) = setup_world_store();
        let (_dir_b, store_b) = setup_world_store();
        store_a
            .install_active_quest(QuestRecord::new(21, at(0)))
            .expect("install");
        store_b
            .install_active_quest(QuestRecord::new(21, at(0)))
            .expect("install");

        let config = OutfitConfig::default();
        let a = outfit_quest(&store_a, 21, &config).expect("outfit");
        let b = outfit_quest(&store_b, 21, &config).expect("outfit");
        assert_eq!(a.poi, b.poi);
        assert_eq!(a.description, b.description);
        assert_eq!(a.giver_name, b.giver_name);
        assert_eq!(a.xp, b.xp);
        assert_eq!(a.giver_image, b.giver_image);
    }

    #[test]
    fn outfit_requires_an_in_progress_quest() {
        let (_dir, store) = setup_world_store();
        let mut quest = QuestRecord::new(8, at(0));
        quest.status = QuestStatus::Completed;
        quest.completed_at = Some(at(5));
        store.put_quest(quest).expect("put");

        let err = outfit_quest(&store, 8, &OutfitConfig::default()).expect_err("refuse");
        assert!(matches!(err, EngineError::RotationConflict { quest_id: 8 }));
    }

    #[test]
    fn outfit_without_pois_is_an_error() {
        let (_dir, store) = setup_bare_store();
        store
            .install_active_quest(QuestRecord::new(9, at(0)))
            .expect("install");
        let err = outfit_quest(&store, 9, &OutfitConfig::default()).expect_err("no pois");
        assert!(matches!(err, EngineError::NotFound(_)));
    }
}
