use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use sled::transaction::ConflictableTransactionError;
use sled::{IVec, Transactional};

use crate::engine::errors::EngineError;
use crate::engine::types::{
    ChatCommandRecord, CreditRecord, PoiRecord, ProfileRecord, QuestRecord, QuestStatus,
    RegionRecord, WalkLogRecord, POI_SCHEMA_VERSION, PROFILE_SCHEMA_VERSION,
    QUEST_SCHEMA_VERSION, REGION_SCHEMA_VERSION, WALK_LOG_SCHEMA_VERSION,
};
use crate::engine::world::{canonical_capital_seed, canonical_region_seed};

const TREE_PRIMARY: &str = "roamlog";
const TREE_LOGS: &str = "roamlog_walklogs";
const TREE_CHAT: &str = "roamlog_chat";

/// Pointer to the quest currently in progress. Lives outside the
/// `quests:` prefix so quest scans never pick it up.
const ACTIVE_QUEST_KEY: &[u8] = b"active_quest";

fn timestamp_nanos(at: DateTime<Utc>) -> i64 {
    at.timestamp_nanos_opt()
        .unwrap_or_else(|| at.timestamp_micros() * 1000)
}

/// Helper builder so tests can easily create throwaway stores with custom
/// paths or skip the canonical seeds.
pub struct RoamStoreBuilder {
    path: PathBuf,
    ensure_region_seed: bool,
    ensure_quest_seed: bool,
}

impl RoamStoreBuilder {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ensure_region_seed: true,
            ensure_quest_seed: true,
        }
    }

    /// Opt out of seeding the canonical region catalog during initialization.
    pub fn without_region_seed(mut self) -> Self {
        self.ensure_region_seed = false;
        self
    }

    /// Opt out of creating the first bare quest during initialization.
    pub fn without_quest_seed(mut self) -> Self {
        self.ensure_quest_seed = false;
        self
    }

    pub fn open(self) -> Result<RoamStore, EngineError> {
        RoamStore::open_with_options(self.path, self.ensure_region_seed, self.ensure_quest_seed)
    }
}

/// Input to [`RoamStore::commit_rotation`], computed read-only before the
/// transaction runs. The transaction re-checks quest status itself, so a
/// plan built against a quest that rotated in the meantime aborts cleanly.
#[derive(Debug, Clone)]
pub struct RotationPlan {
    pub quest_id: u64,
    /// Completion timestamp written to the quest, already widened to the
    /// latest chat activity on the completing request.
    pub window_end: DateTime<Utc>,
    /// Wall-clock creation time for the next quest and any new profiles.
    pub now: DateTime<Utc>,
    pub participants: Vec<PlannedParticipant>,
}

/// One viewer to credit, with the chat rows that still need linking to
/// their profile.
#[derive(Debug, Clone)]
pub struct PlannedParticipant {
    /// Username in the casing of the participant's earliest qualifying
    /// chat command. Only used verbatim when no profile exists yet.
    pub username: String,
    pub orphan_chat_keys: Vec<Vec<u8>>,
}

/// What a committed rotation produced.
#[derive(Debug, Clone)]
pub struct RotationCommit {
    pub completed: QuestRecord,
    pub next: QuestRecord,
    /// Display usernames of every credited participant, profile casing.
    pub participants: Vec<String>,
    pub profiles_created: usize,
}

fn tx_encode<T: serde::Serialize>(
    value: &T,
) -> Result<Vec<u8>, ConflictableTransactionError<EngineError>> {
    bincode::serialize(value).map_err(|e| ConflictableTransactionError::Abort(EngineError::Bincode(e)))
}

fn tx_decode<T: serde::de::DeserializeOwned>(
    bytes: &IVec,
) -> Result<T, ConflictableTransactionError<EngineError>> {
    bincode::deserialize::<T>(bytes)
        .map_err(|e| ConflictableTransactionError::Abort(EngineError::Bincode(e)))
}

fn abort<T>(err: EngineError) -> Result<T, ConflictableTransactionError<EngineError>> {
    Err(ConflictableTransactionError::Abort(err))
}

/// Sled-backed persistence for the roamlog engine: region and POI
/// catalogs, walk logs, chat commands, quests, profiles, and participant
/// credits.
pub struct RoamStore {
    db: sled::Db,
    primary: sled::Tree,
    logs: sled::Tree,
    chat: sled::Tree,
}

impl RoamStore {
    /// Open (or create) the store rooted at `path`. Seeds the canonical
    /// region catalog and the first bare quest if none exist yet.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, EngineError> {
        Self::open_with_options(path, true, true)
    }

    fn open_with_options<P: AsRef<Path>>(
        path: P,
        seed_regions: bool,
        seed_quest: bool,
    ) -> Result<Self, EngineError> {
        let path_ref = path.as_ref();
        std::fs::create_dir_all(path_ref)?;
        let db = sled::open(path_ref)?;
        let primary = db.open_tree(TREE_PRIMARY)?;
        let logs = db.open_tree(TREE_LOGS)?;
        let chat = db.open_tree(TREE_CHAT)?;
        let store = Self {
            db,
            primary,
            logs,
            chat,
        };

        if seed_regions {
            store.seed_regions_if_needed()?;
        }
        if seed_quest {
            store.seed_initial_quest_if_needed()?;
        }

        Ok(store)
    }

    fn region_key(name: &str) -> Vec<u8> {
        format!("regions:{}", name).into_bytes()
    }

    fn poi_key(region: &str, name: &str) -> Vec<u8> {
        format!("pois:{}:{}", region, name).into_bytes()
    }

    fn quest_key(id: u64) -> Vec<u8> {
        format!("quests:{:020}", id).into_bytes()
    }

    fn profile_key(username: &str) -> Vec<u8> {
        format!("profiles:{}", username.to_ascii_lowercase()).into_bytes()
    }

    fn credit_key(quest_id: u64, username_lower: &str) -> Vec<u8> {
        format!("credits:{:020}:{}", quest_id, username_lower).into_bytes()
    }

    fn walk_key(record: &WalkLogRecord) -> Vec<u8> {
        format!(
            "walk:{:020}:{:020}",
            timestamp_nanos(record.created_at),
            record.id
        )
        .into_bytes()
    }

    fn chat_key(record: &ChatCommandRecord) -> Vec<u8> {
        format!(
            "chat:{:020}:{:020}",
            timestamp_nanos(record.created_at),
            record.id
        )
        .into_bytes()
    }

    fn serialize<T: serde::Serialize>(value: &T) -> Result<Vec<u8>, EngineError> {
        Ok(bincode::serialize(value)?)
    }

    fn deserialize<T: serde::de::DeserializeOwned>(bytes: IVec) -> Result<T, EngineError> {
        Ok(bincode::deserialize::<T>(&bytes)?)
    }

    /// Allocate a monotonic id for a new log, chat, or quest record.
    pub fn next_id(&self) -> Result<u64, EngineError> {
        Ok(self.db.generate_id()?)
    }

    // ------------------------------------------------------------------
    // Regions
    // ------------------------------------------------------------------

    /// Insert or update a region record.
    pub fn put_region(&self, mut region: RegionRecord) -> Result<(), EngineError> {
        region.schema_version = REGION_SCHEMA_VERSION;
        let key = Self::region_key(&region.name);
        let bytes = Self::serialize(&region)?;
        self.primary.insert(key, bytes)?;
        self.primary.flush()?;
        Ok(())
    }

    /// Fetch a region by exact name. Unknown names are a normal miss, not
    /// an error; raw client strings flow straight in here.
    pub fn get_region(&self, name: &str) -> Result<Option<RegionRecord>, EngineError> {
        let key = Self::region_key(name);
        let Some(bytes) = self.primary.get(&key)? else {
            return Ok(None);
        };
        let record: RegionRecord = Self::deserialize(bytes)?;
        if record.schema_version != REGION_SCHEMA_VERSION {
            return Err(EngineError::SchemaMismatch {
                entity: "region",
                expected: REGION_SCHEMA_VERSION,
                found: record.schema_version,
            });
        }
        Ok(Some(record))
    }

    pub fn list_regions(&self) -> Result<Vec<RegionRecord>, EngineError> {
        let mut regions = Vec::new();
        for entry in self.primary.scan_prefix(b"regions:") {
            let (_key, value) = entry?;
            regions.push(Self::deserialize(value)?);
        }
        Ok(regions)
    }

    // ------------------------------------------------------------------
    // Points of interest
    // ------------------------------------------------------------------

    /// Insert or update a POI. POIs are keyed by (region, name), which is
    /// what makes the pair unique.
    pub fn put_poi(&self, mut poi: PoiRecord) -> Result<(), EngineError> {
        poi.schema_version = POI_SCHEMA_VERSION;
        let key = Self::poi_key(&poi.region, &poi.name);
        let bytes = Self::serialize(&poi)?;
        self.primary.insert(key, bytes)?;
        self.primary.flush()?;
        Ok(())
    }

    pub fn get_poi(&self, region: &str, name: &str) -> Result<Option<PoiRecord>, EngineError> {
        let key = Self::poi_key(region, name);
        let Some(bytes) = self.primary.get(&key)? else {
            return Ok(None);
        };
        let record: PoiRecord = Self::deserialize(bytes)?;
        if record.schema_version != POI_SCHEMA_VERSION {
            return Err(EngineError::SchemaMismatch {
                entity: "poi",
                expected: POI_SCHEMA_VERSION,
                found: record.schema_version,
            });
        }
        Ok(Some(record))
    }

    pub fn list_pois(&self) -> Result<Vec<PoiRecord>, EngineError> {
        let mut pois = Vec::new();
        for entry in self.primary.scan_prefix(b"pois:") {
            let (_key, value) = entry?;
            pois.push(Self::deserialize(value)?);
        }
        Ok(pois)
    }

    pub fn list_pois_in_region(&self, region: &str) -> Result<Vec<PoiRecord>, EngineError> {
        let prefix = format!("pois:{}:", region);
        let mut pois = Vec::new();
        for entry in self.primary.scan_prefix(prefix.as_bytes()) {
            let (_key, value) = entry?;
            pois.push(Self::deserialize(value)?);
        }
        Ok(pois)
    }

    // ------------------------------------------------------------------
    // Walk logs
    // ------------------------------------------------------------------

    /// Commit a walk log, creating its newly discovered POI in the same
    /// transaction when the resolver produced one.
    pub fn commit_walk_log(
        &self,
        record: &WalkLogRecord,
        new_poi: Option<&PoiRecord>,
    ) -> Result<(), EngineError> {
        let log_key = Self::walk_key(record);
        let poi_key = new_poi.map(|p| Self::poi_key(&p.region, &p.name));

        (&self.primary, &self.logs)
            .transaction(|(primary, logs)| {
                if let (Some(poi), Some(key)) = (new_poi, poi_key.as_ref()) {
                    // A concurrent writer may have created the same POI
                    // after the resolver looked; first write wins.
                    if primary.get(key.as_slice())?.is_none() {
                        primary.insert(key.as_slice(), tx_encode(poi)?)?;
                    }
                }
                logs.insert(log_key.as_slice(), tx_encode(record)?)?;
                Ok(())
            })
            .map_err(EngineError::from)?;

        self.primary.flush()?;
        self.logs.flush()?;
        Ok(())
    }

    /// Rewrite a walk log in place. Only the backfill jobs use this; the
    /// ingest path is append-only.
    pub fn update_walk_log(&self, key: &[u8], record: &WalkLogRecord) -> Result<(), EngineError> {
        let bytes = Self::serialize(record)?;
        self.logs.insert(key, bytes)?;
        self.logs.flush()?;
        Ok(())
    }

    /// Most recent walk log, if any.
    pub fn latest_walk_log(&self) -> Result<Option<WalkLogRecord>, EngineError> {
        let Some((_key, value)) = self.logs.last()? else {
            return Ok(None);
        };
        let record: WalkLogRecord = Self::deserialize(value)?;
        if record.schema_version != WALK_LOG_SCHEMA_VERSION {
            return Err(EngineError::SchemaMismatch {
                entity: "walk_log",
                expected: WALK_LOG_SCHEMA_VERSION,
                found: record.schema_version,
            });
        }
        Ok(Some(record))
    }

    /// Most recent walk log that was on land with a catalog-resolved
    /// region, scanning backwards past ocean rows and rows whose raw
    /// region never matched.
    pub fn latest_land_log(&self) -> Result<Option<WalkLogRecord>, EngineError> {
        for entry in self.logs.iter().rev() {
            let (_key, value) = entry?;
            let record: WalkLogRecord = Self::deserialize(value)?;
            if !record.is_ocean() && record.region.is_some() {
                return Ok(Some(record));
            }
        }
        Ok(None)
    }

    /// All walk logs in chronological order, with their storage keys.
    /// The backfill jobs rewrite rows through these keys.
    pub fn walk_log_entries(&self) -> Result<Vec<(IVec, WalkLogRecord)>, EngineError> {
        let mut entries = Vec::new();
        for entry in self.logs.scan_prefix(b"walk:") {
            let (key, value) = entry?;
            entries.push((key, Self::deserialize(value)?));
        }
        Ok(entries)
    }

    pub fn count_walk_logs(&self) -> Result<usize, EngineError> {
        Ok(self.logs.scan_prefix(b"walk:").count())
    }

    // ------------------------------------------------------------------
    // Chat commands
    // ------------------------------------------------------------------

    /// Append a chat command row.
    pub fn append_chat_command(&self, record: &ChatCommandRecord) -> Result<(), EngineError> {
        let key = Self::chat_key(record);
        let bytes = Self::serialize(record)?;
        self.chat.insert(key, bytes)?;
        self.chat.flush()?;
        Ok(())
    }

    /// Rewrite a chat row in place (profile relinking).
    pub fn update_chat_command(
        &self,
        key: &[u8],
        record: &ChatCommandRecord,
    ) -> Result<(), EngineError> {
        let bytes = Self::serialize(record)?;
        self.chat.insert(key, bytes)?;
        self.chat.flush()?;
        Ok(())
    }

    /// All chat rows in chronological order, with their storage keys.
    pub fn chat_entries(&self) -> Result<Vec<(IVec, ChatCommandRecord)>, EngineError> {
        let mut entries = Vec::new();
        for entry in self.chat.scan_prefix(b"chat:") {
            let (key, value) = entry?;
            entries.push((key, Self::deserialize(value)?));
        }
        Ok(entries)
    }

    /// Chat rows whose timestamps fall inside `[from, to]`, both ends
    /// inclusive.
    pub fn chat_in_window(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<ChatCommandRecord>, EngineError> {
        let mut rows = Vec::new();
        for entry in self.chat.scan_prefix(b"chat:") {
            let (_key, value) = entry?;
            let record: ChatCommandRecord = Self::deserialize(value)?;
            if record.created_at >= from && record.created_at <= to {
                rows.push(record);
            }
        }
        Ok(rows)
    }

    /// Chat rows carrying the given request correlation id.
    pub fn chat_for_request(&self, request_id: &str) -> Result<Vec<ChatCommandRecord>, EngineError> {
        let mut rows = Vec::new();
        for entry in self.chat.scan_prefix(b"chat:") {
            let (_key, value) = entry?;
            let record: ChatCommandRecord = Self::deserialize(value)?;
            if record.request_id.as_deref() == Some(request_id) {
                rows.push(record);
            }
        }
        Ok(rows)
    }

    /// Keys of chat rows for `username` (case-insensitive) that are not
    /// yet linked to a profile.
    pub fn orphan_chat_keys_for(&self, username: &str) -> Result<Vec<Vec<u8>>, EngineError> {
        let lower = username.to_ascii_lowercase();
        let mut keys = Vec::new();
        for entry in self.chat.scan_prefix(b"chat:") {
            let (key, value) = entry?;
            let record: ChatCommandRecord = Self::deserialize(value)?;
            if record.profile.is_none() && record.username.to_ascii_lowercase() == lower {
                keys.push(key.to_vec());
            }
        }
        Ok(keys)
    }

    pub fn count_chat_commands(&self) -> Result<usize, EngineError> {
        Ok(self.chat.scan_prefix(b"chat:").count())
    }

    // ------------------------------------------------------------------
    // Quests
    // ------------------------------------------------------------------

    /// Insert or update a quest record.
    pub fn put_quest(&self, mut quest: QuestRecord) -> Result<(), EngineError> {
        quest.schema_version = QUEST_SCHEMA_VERSION;
        let key = Self::quest_key(quest.id);
        let bytes = Self::serialize(&quest)?;
        self.primary.insert(key, bytes)?;
        self.primary.flush()?;
        Ok(())
    }

    pub fn get_quest(&self, id: u64) -> Result<QuestRecord, EngineError> {
        let key = Self::quest_key(id);
        let Some(bytes) = self.primary.get(&key)? else {
            return Err(EngineError::NotFound(format!("quest: {}", id)));
        };
        let record: QuestRecord = Self::deserialize(bytes)?;
        if record.schema_version != QUEST_SCHEMA_VERSION {
            return Err(EngineError::SchemaMismatch {
                entity: "quest",
                expected: QUEST_SCHEMA_VERSION,
                found: record.schema_version,
            });
        }
        Ok(record)
    }

    pub fn active_quest_id(&self) -> Result<Option<u64>, EngineError> {
        let Some(bytes) = self.primary.get(ACTIVE_QUEST_KEY)? else {
            return Ok(None);
        };
        let raw: [u8; 8] = bytes.as_ref().try_into().map_err(|_| {
            EngineError::Internal("active quest pointer is not 8 bytes".to_string())
        })?;
        Ok(Some(u64::from_be_bytes(raw)))
    }

    pub fn active_quest(&self) -> Result<Option<QuestRecord>, EngineError> {
        match self.active_quest_id()? {
            Some(id) => Ok(Some(self.get_quest(id)?)),
            None => Ok(None),
        }
    }

    /// Store a quest and point the active marker at it. Used by the seed
    /// path and by tests that stage a quest with fixed timestamps.
    pub fn install_active_quest(&self, quest: QuestRecord) -> Result<(), EngineError> {
        let id = quest.id;
        self.put_quest(quest)?;
        self.primary.insert(ACTIVE_QUEST_KEY, &id.to_be_bytes())?;
        self.primary.flush()?;
        Ok(())
    }

    /// Quests newest-first, up to `limit`.
    pub fn list_quests_desc(&self, limit: usize) -> Result<Vec<QuestRecord>, EngineError> {
        let mut quests = Vec::new();
        for entry in self.primary.scan_prefix(b"quests:").rev().take(limit) {
            let (_key, value) = entry?;
            quests.push(Self::deserialize(value)?);
        }
        Ok(quests)
    }

    /// Descriptions of the most recently created quests that have one,
    /// newest first. This is the uniqueness window for outfitting.
    pub fn recent_quest_descriptions(&self, limit: usize) -> Result<Vec<String>, EngineError> {
        let mut descriptions = Vec::new();
        for entry in self.primary.scan_prefix(b"quests:").rev() {
            if descriptions.len() >= limit {
                break;
            }
            let (_key, value) = entry?;
            let record: QuestRecord = Self::deserialize(value)?;
            if !record.description.is_empty() {
                descriptions.push(record.description);
            }
        }
        Ok(descriptions)
    }

    // ------------------------------------------------------------------
    // Profiles and participant credits
    // ------------------------------------------------------------------

    /// Fetch a profile by username, case-insensitively.
    pub fn get_profile(&self, username: &str) -> Result<Option<ProfileRecord>, EngineError> {
        let key = Self::profile_key(username);
        let Some(bytes) = self.primary.get(&key)? else {
            return Ok(None);
        };
        let record: ProfileRecord = Self::deserialize(bytes)?;
        if record.schema_version != PROFILE_SCHEMA_VERSION {
            return Err(EngineError::SchemaMismatch {
                entity: "profile",
                expected: PROFILE_SCHEMA_VERSION,
                found: record.schema_version,
            });
        }
        Ok(Some(record))
    }

    pub fn put_profile(&self, mut profile: ProfileRecord) -> Result<(), EngineError> {
        profile.schema_version = PROFILE_SCHEMA_VERSION;
        let key = Self::profile_key(&profile.username);
        let bytes = Self::serialize(&profile)?;
        self.primary.insert(key, bytes)?;
        self.primary.flush()?;
        Ok(())
    }

    pub fn list_profiles(&self) -> Result<Vec<ProfileRecord>, EngineError> {
        let mut profiles = Vec::new();
        for entry in self.primary.scan_prefix(b"profiles:") {
            let (_key, value) = entry?;
            profiles.push(Self::deserialize(value)?);
        }
        Ok(profiles)
    }

    pub fn count_profiles(&self) -> Result<usize, EngineError> {
        Ok(self.primary.scan_prefix(b"profiles:").count())
    }

    /// Whether a participant already holds credit for a quest.
    pub fn has_credit(&self, quest_id: u64, username: &str) -> Result<bool, EngineError> {
        let key = Self::credit_key(quest_id, &username.to_ascii_lowercase());
        Ok(self.primary.get(key)?.is_some())
    }

    /// Display usernames credited on a quest, in order of first activity.
    pub fn quest_participants(&self, quest_id: u64) -> Result<Vec<String>, EngineError> {
        let prefix = format!("credits:{:020}:", quest_id);
        let mut credited: Vec<CreditRecord> = Vec::new();
        for entry in self.primary.scan_prefix(prefix.as_bytes()) {
            let (_key, value) = entry?;
            credited.push(Self::deserialize(value)?);
        }
        // The prefix scan hands credits back alphabetically; the stored
        // ordinal restores the window-scan order.
        credited.sort_by_key(|credit| credit.order);
        let mut usernames = Vec::new();
        for credit in credited {
            match self.get_profile(&credit.profile)? {
                Some(profile) => usernames.push(profile.username),
                None => usernames.push(credit.profile),
            }
        }
        Ok(usernames)
    }

    // ------------------------------------------------------------------
    // Rotation
    // ------------------------------------------------------------------

    /// Atomically complete a quest and start its successor.
    ///
    /// Inside one transaction: re-check the quest is still in progress
    /// (abort with [`EngineError::RotationConflict`] otherwise), mark it
    /// completed at the plan's window end, resolve-or-create a profile per
    /// participant, write idempotent credit rows, link any orphaned chat
    /// rows, then create the next bare quest and move the active pointer.
    pub fn commit_rotation(&self, plan: &RotationPlan) -> Result<RotationCommit, EngineError> {
        let quest_key = Self::quest_key(plan.quest_id);

        let commit = (&self.primary, &self.chat)
            .transaction(|(primary, chat)| {
                let Some(bytes) = primary.get(quest_key.as_slice())? else {
                    return abort(EngineError::NotFound(format!("quest: {}", plan.quest_id)));
                };
                let mut quest: QuestRecord = tx_decode(&bytes)?;
                if quest.status != QuestStatus::InProgress {
                    return abort(EngineError::RotationConflict {
                        quest_id: plan.quest_id,
                    });
                }

                quest.status = QuestStatus::Completed;
                quest.completed_at = Some(plan.window_end);
                primary.insert(quest_key.as_slice(), tx_encode(&quest)?)?;

                let mut participants = Vec::new();
                let mut profiles_created = 0usize;
                for (order, planned) in plan.participants.iter().enumerate() {
                    let lower = planned.username.to_ascii_lowercase();
                    let profile_key = Self::profile_key(&planned.username);
                    let display = match primary.get(profile_key.as_slice())? {
                        Some(bytes) => {
                            let profile: ProfileRecord = tx_decode(&bytes)?;
                            profile.username
                        }
                        None => {
                            let profile = ProfileRecord::new(&planned.username, plan.now);
                            primary.insert(profile_key.as_slice(), tx_encode(&profile)?)?;
                            profiles_created += 1;
                            planned.username.clone()
                        }
                    };

                    // Credits are keyed per (quest, user); re-inserting the
                    // same key is how double completion stays idempotent. The
                    // ordinal records where in the window the viewer first
                    // turned up.
                    let credit_key = Self::credit_key(plan.quest_id, &lower);
                    let credit = CreditRecord::new(order as u32, &lower);
                    primary.insert(credit_key.as_slice(), tx_encode(&credit)?)?;

                    for chat_row_key in &planned.orphan_chat_keys {
                        if let Some(bytes) = chat.get(chat_row_key.as_slice())? {
                            let mut row: ChatCommandRecord = tx_decode(&bytes)?;
                            if row.profile.is_none() {
                                row.profile = Some(lower.clone());
                                chat.insert(chat_row_key.as_slice(), tx_encode(&row)?)?;
                            }
                        }
                    }

                    participants.push(display);
                }

                let next_id = primary.generate_id()?;
                let next = QuestRecord::new(next_id, plan.now);
                primary.insert(Self::quest_key(next_id).as_slice(), tx_encode(&next)?)?;
                primary.insert(ACTIVE_QUEST_KEY, &next_id.to_be_bytes())?;

                Ok(RotationCommit {
                    completed: quest,
                    next,
                    participants,
                    profiles_created,
                })
            })
            .map_err(EngineError::from)?;

        self.primary.flush()?;
        self.chat.flush()?;
        Ok(commit)
    }

    // ------------------------------------------------------------------
    // Seeding
    // ------------------------------------------------------------------

    /// Seed the canonical region catalog and capital POIs if no regions
    /// exist yet. Returns the number of records inserted.
    pub fn seed_regions_if_needed(&self) -> Result<usize, EngineError> {
        if self.primary.scan_prefix(b"regions:").next().is_some() {
            return Ok(0);
        }
        let now = Utc::now();
        let mut inserted = 0usize;
        for region in canonical_region_seed(now) {
            self.put_region(region)?;
            inserted += 1;
        }
        for capital in canonical_capital_seed(now) {
            self.put_poi(capital)?;
            inserted += 1;
        }
        Ok(inserted)
    }

    /// Create the first bare quest if the store holds no quests at all.
    /// Returns the new quest id when one was created.
    pub fn seed_initial_quest_if_needed(&self) -> Result<Option<u64>, EngineError> {
        if self.primary.scan_prefix(b"quests:").next().is_some() {
            return Ok(None);
        }
        let id = self.next_id()?;
        let quest = QuestRecord::new(id, Utc::now());
        self.install_active_quest(quest)?;
        Ok(Some(id))
    }
}
