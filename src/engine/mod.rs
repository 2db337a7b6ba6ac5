//! Roamlog data model and engine.
//! Storage-backed ingestion of walk logs and chat commands, region and
//! POI resolution, deterministic quest text generation, and the quest
//! rotation lifecycle, all over a single embedded sled database.

pub mod errors;
pub mod ingest;
pub mod jobs;
pub mod quest;
pub mod resolver;
pub mod storage;
pub mod textgen;
pub mod types;
pub mod world;

pub use errors::EngineError;
pub use ingest::{
    append_log, latest_log, load_shape_index, record_chat_command, region_map_data,
    NewChatCommand, NewWalkLog, RegionMapData, ShapeIndex,
};
pub use jobs::{
    backfill_last_known_region, backfill_poi_discovered, relink_chat_profiles, run_all, JobReport,
};
pub use quest::{
    complete_and_rotate, outfit_quest, quest_summary, rotate_active, CompletionOutcome,
    OutfitConfig, QuestSummary,
};
pub use resolver::{
    is_ocean_region, is_wilderness, parse_season, resolve_placement, ResolvedPlacement,
    OCEAN_REGION, WILDERNESS_LOCATION,
};
pub use storage::{RoamStore, RoamStoreBuilder};
pub use textgen::{
    fix_articles, quest_description, quest_giver_name, seeded_rng, unique_description,
    MAX_DESCRIPTION_TRIES,
};
pub use types::*;
pub use world::{canonical_capital_seed, canonical_region_seed, CANONICAL_REGION_NAMES};
