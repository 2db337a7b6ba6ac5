//! Walk log and chat command ingestion, plus the read accessors built on
//! the log stream.

use std::collections::HashMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::engine::errors::EngineError;
use crate::engine::resolver;
use crate::engine::storage::RoamStore;
use crate::engine::types::{
    ChatCommandRecord, PoiKind, PoiRecord, RegionRecord, WalkLogRecord,
    CHAT_COMMAND_SCHEMA_VERSION, WALK_LOG_SCHEMA_VERSION,
};
use crate::logutil::escape_log;

/// One incoming telemetry row, exactly as the walker client reports it.
/// `created_at` is optional so replayed or test traffic can carry its own
/// timestamps; live traffic leaves it unset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewWalkLog {
    pub world_x: i64,
    pub world_z: i64,
    pub map_pixel_x: i64,
    pub map_pixel_y: i64,
    pub region: String,
    pub location: String,
    pub player_x: f64,
    pub player_y: f64,
    pub player_z: f64,
    #[serde(default)]
    pub date: String,
    pub weather: String,
    #[serde(default)]
    pub current_song: Option<String>,
    #[serde(default)]
    pub last_known_region: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl NewWalkLog {
    pub fn at(region: &str, location: &str) -> Self {
        Self {
            world_x: 0,
            world_z: 0,
            map_pixel_x: 0,
            map_pixel_y: 0,
            region: region.to_string(),
            location: location.to_string(),
            player_x: 0.0,
            player_y: 0.0,
            player_z: 0.0,
            date: String::new(),
            weather: "Clear".to_string(),
            current_song: None,
            last_known_region: None,
            created_at: None,
        }
    }

    pub fn with_date(mut self, date: &str) -> Self {
        self.date = date.to_string();
        self
    }

    pub fn with_weather(mut self, weather: &str) -> Self {
        self.weather = weather.to_string();
        self
    }

    pub fn with_song(mut self, song: &str) -> Self {
        self.current_song = Some(song.to_string());
        self
    }

    pub fn with_map_pixel(mut self, x: i64, y: i64) -> Self {
        self.map_pixel_x = x;
        self.map_pixel_y = y;
        self
    }

    pub fn with_world(mut self, x: i64, z: i64) -> Self {
        self.world_x = x;
        self.world_z = z;
        self
    }

    pub fn with_player(mut self, x: f64, y: f64, z: f64) -> Self {
        self.player_x = x;
        self.player_y = y;
        self.player_z = z;
        self
    }

    pub fn with_last_known_region(mut self, region: &str) -> Self {
        self.last_known_region = Some(region.to_string());
        self
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }
}

/// Append one walk log.
///
/// Resolution against the region and POI catalogs happens first, as a
/// read-only step; the log row and any newly discovered POI are then
/// committed in a single transaction. The raw region and location strings
/// are stored verbatim alongside the resolved references.
pub fn append_log(store: &RoamStore, input: &NewWalkLog) -> Result<WalkLogRecord, EngineError> {
    let created_at = input.created_at.unwrap_or_else(Utc::now);
    let placement = resolver::resolve_placement(store, input, created_at)?;
    let id = store.next_id()?;

    let record = WalkLogRecord {
        id,
        world_x: input.world_x,
        world_z: input.world_z,
        map_pixel_x: input.map_pixel_x,
        map_pixel_y: input.map_pixel_y,
        region_raw: input.region.clone(),
        region: placement.region.clone(),
        location: input.location.clone(),
        poi: placement.poi.clone(),
        player_x: input.player_x,
        player_y: input.player_y,
        player_z: input.player_z,
        date: input.date.clone(),
        season: placement.season,
        weather: input.weather.clone(),
        current_song: input.current_song.clone(),
        last_known_region: placement.last_known_region.clone(),
        created_at,
        schema_version: WALK_LOG_SCHEMA_VERSION,
    };

    store.commit_walk_log(&record, placement.new_poi.as_ref())?;

    if let Some(poi) = &placement.new_poi {
        info!(
            "discovered {} in {} (landmark)",
            escape_log(&poi.name),
            escape_log(&poi.region)
        );
    }
    debug!(
        "walk log {} appended: region={} season={}",
        id,
        escape_log(&record.region_raw),
        record.season
    );
    Ok(record)
}

/// One incoming chat command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewChatCommand {
    pub username: String,
    pub command: String,
    #[serde(default)]
    pub request_id: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl NewChatCommand {
    pub fn new(username: &str, command: &str) -> Self {
        Self {
            username: username.to_string(),
            command: command.to_string(),
            request_id: None,
            created_at: None,
        }
    }

    pub fn with_request_id(mut self, request_id: &str) -> Self {
        self.request_id = Some(request_id.to_string());
        self
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }
}

/// Record a chat command row. When a profile already exists for the
/// username (case-insensitive), the row is linked immediately; otherwise
/// it stays orphaned until a rotation or the relink job picks it up.
pub fn record_chat_command(
    store: &RoamStore,
    input: &NewChatCommand,
) -> Result<ChatCommandRecord, EngineError> {
    if input.username.trim().is_empty() {
        return Err(EngineError::InvalidInput("chat username is empty".to_string()));
    }
    let created_at = input.created_at.unwrap_or_else(Utc::now);
    let id = store.next_id()?;
    let profile = store
        .get_profile(&input.username)?
        .map(|p| p.username.to_ascii_lowercase());

    let record = ChatCommandRecord {
        id,
        username: input.username.clone(),
        command: input.command.clone(),
        request_id: input.request_id.clone(),
        profile,
        created_at,
        schema_version: CHAT_COMMAND_SCHEMA_VERSION,
    };
    store.append_chat_command(&record)?;
    debug!(
        "chat command {} recorded for {}",
        id,
        escape_log(&record.username)
    );
    Ok(record)
}

/// Latest walk log for display.
///
/// With `substitute_ocean` set, an ocean row is merged with the most
/// recent land row: position and region fields come from the land row,
/// while weather, season, date, song, id, and timestamp stay those of the
/// ocean row. Without a prior land row the ocean row is returned as-is.
pub fn latest_log(
    store: &RoamStore,
    substitute_ocean: bool,
) -> Result<Option<WalkLogRecord>, EngineError> {
    let Some(latest) = store.latest_walk_log()? else {
        return Ok(None);
    };
    if !substitute_ocean || !latest.is_ocean() {
        return Ok(Some(latest));
    }
    let Some(land) = store.latest_land_log()? else {
        return Ok(Some(latest));
    };
    let mut merged = land;
    merged.id = latest.id;
    merged.date = latest.date;
    merged.season = latest.season;
    merged.weather = latest.weather;
    merged.current_song = latest.current_song;
    merged.last_known_region = latest.last_known_region;
    merged.created_at = latest.created_at;
    Ok(Some(merged))
}

/// Optional region outline polygons, loaded from a sidecar JSON file
/// mapping region name to a list of `[x, y]` map pixels.
pub type ShapeIndex = HashMap<String, Vec<[i64; 2]>>;

pub fn load_shape_index(path: &Path) -> Result<ShapeIndex, EngineError> {
    let text = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

/// Everything a map consumer needs to draw one region.
#[derive(Debug, Clone, Serialize)]
pub struct RegionMapData {
    pub region: RegionRecord,
    pub capital: Option<PoiRecord>,
    pub pois: Vec<PoiRecord>,
    pub shape: Option<Vec<[i64; 2]>>,
}

pub fn region_map_data(
    store: &RoamStore,
    name: &str,
    shapes: Option<&ShapeIndex>,
) -> Result<Option<RegionMapData>, EngineError> {
    let Some(region) = store.get_region(name)? else {
        return Ok(None);
    };
    let pois = store.list_pois_in_region(&region.name)?;
    let capital = pois.iter().find(|p| p.kind == PoiKind::Capital).cloned();
    let shape = shapes.and_then(|s| s.get(&region.name).cloned());
    Ok(Some(RegionMapData {
        region,
        capital,
        pois,
        shape,
    }))
}
