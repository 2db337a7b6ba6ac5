use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const REGION_SCHEMA_VERSION: u8 = 1;
pub const POI_SCHEMA_VERSION: u8 = 1;
pub const WALK_LOG_SCHEMA_VERSION: u8 = 1;
pub const QUEST_SCHEMA_VERSION: u8 = 1;
pub const PROFILE_SCHEMA_VERSION: u8 = 1;
pub const CREDIT_SCHEMA_VERSION: u8 = 1;
pub const CHAT_COMMAND_SCHEMA_VERSION: u8 = 1;

/// In-game season derived from the calendar date carried on each walk log.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Season {
    Winter,
    Spring,
    Summer,
    Autumn,
    /// Date string carried no recognizable month name.
    Unknown,
}

impl Season {
    pub fn as_str(&self) -> &'static str {
        match self {
            Season::Winter => "Winter",
            Season::Spring => "Spring",
            Season::Summer => "Summer",
            Season::Autumn => "Autumn",
            Season::Unknown => "Unknown",
        }
    }
}

impl std::fmt::Display for Season {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Default for Season {
    fn default() -> Self {
        Self::Unknown
    }
}

/// Classification of a point of interest on the region map.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PoiKind {
    /// Seat of a region, provisioned with the world seed and never auto-created.
    Capital,
    Town,
    Dungeon,
    /// Default kind for locations first observed in a walk log.
    Landmark,
}

impl PoiKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PoiKind::Capital => "capital",
            PoiKind::Town => "town",
            PoiKind::Dungeon => "dungeon",
            PoiKind::Landmark => "landmark",
        }
    }
}

impl std::fmt::Display for PoiKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One image tile of a region's map. Most regions render from a single
/// tile; a few span several with per-tile pixel offsets.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MapPart {
    pub image: String,
    pub offset_x: i64,
    pub offset_y: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RegionRecord {
    pub name: String,
    pub province: String,
    pub climate: String,
    #[serde(default)]
    pub emoji: Option<String>,
    #[serde(default)]
    pub map_parts: Vec<MapPart>,
    pub created_at: DateTime<Utc>,
    pub schema_version: u8,
}

impl RegionRecord {
    pub fn new(name: &str, province: &str, climate: &str) -> Self {
        Self {
            name: name.to_string(),
            province: province.to_string(),
            climate: climate.to_string(),
            emoji: None,
            map_parts: Vec::new(),
            created_at: Utc::now(),
            schema_version: REGION_SCHEMA_VERSION,
        }
    }

    pub fn with_emoji(mut self, emoji: &str) -> Self {
        self.emoji = Some(emoji.to_string());
        self
    }

    pub fn with_part(mut self, image: &str, offset_x: i64, offset_y: i64) -> Self {
        self.map_parts.push(MapPart {
            image: image.to_string(),
            offset_x,
            offset_y,
        });
        self
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    /// True when the region map is stitched from more than one image tile.
    pub fn multi_part(&self) -> bool {
        self.map_parts.len() > 1
    }

    pub fn is_ocean(&self) -> bool {
        self.name.eq_ignore_ascii_case(super::resolver::OCEAN_REGION)
    }
}

/// Composite reference to a point of interest. POIs are unique per
/// (region, name) pair, so the pair is the stable handle other records keep.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct PoiRef {
    pub region: String,
    pub name: String,
}

impl PoiRef {
    pub fn new(region: &str, name: &str) -> Self {
        Self {
            region: region.to_string(),
            name: name.to_string(),
        }
    }
}

impl std::fmt::Display for PoiRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name, self.region)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PoiRecord {
    pub region: String,
    pub name: String,
    pub kind: PoiKind,
    #[serde(default)]
    pub map_x: Option<i64>,
    #[serde(default)]
    pub map_y: Option<i64>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub emoji: Option<String>,
    /// Timestamp of the earliest walk log that referenced this POI.
    /// Unset for capitals, which are provisioned rather than discovered.
    #[serde(default)]
    pub discovered: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub schema_version: u8,
}

impl PoiRecord {
    pub fn new(region: &str, name: &str, kind: PoiKind) -> Self {
        Self {
            region: region.to_string(),
            name: name.to_string(),
            kind,
            map_x: None,
            map_y: None,
            description: None,
            emoji: None,
            discovered: None,
            created_at: Utc::now(),
            schema_version: POI_SCHEMA_VERSION,
        }
    }

    pub fn with_map_pixel(mut self, map_x: i64, map_y: i64) -> Self {
        self.map_x = Some(map_x);
        self.map_y = Some(map_y);
        self
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    pub fn with_emoji(mut self, emoji: &str) -> Self {
        self.emoji = Some(emoji.to_string());
        self
    }

    pub fn with_discovered(mut self, discovered: DateTime<Utc>) -> Self {
        self.discovered = Some(discovered);
        self
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    pub fn poi_ref(&self) -> PoiRef {
        PoiRef::new(&self.region, &self.name)
    }
}

/// One telemetry row from the wandering game client.
///
/// Raw region and location strings arrive verbatim and are preserved even
/// after resolution, so resolver behavior can be audited and re-run later.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WalkLogRecord {
    pub id: u64,
    pub world_x: i64,
    pub world_z: i64,
    pub map_pixel_x: i64,
    pub map_pixel_y: i64,
    /// Region name exactly as reported by the client.
    pub region_raw: String,
    /// Resolved region reference, if the raw name matched the catalog.
    pub region: Option<String>,
    /// Location name exactly as reported by the client.
    pub location: String,
    /// Resolved POI reference, absent for wilderness strings.
    #[serde(default)]
    pub poi: Option<PoiRef>,
    pub player_x: f64,
    pub player_y: f64,
    pub player_z: f64,
    /// In-game calendar date string, e.g. "Morndas, 12 Hearthfire 3E 406".
    pub date: String,
    pub season: Season,
    pub weather: String,
    #[serde(default)]
    pub current_song: Option<String>,
    /// Last land region seen before the player drifted into the ocean.
    #[serde(default)]
    pub last_known_region: Option<String>,
    pub created_at: DateTime<Utc>,
    pub schema_version: u8,
}

impl WalkLogRecord {
    /// True when the client reported the player at sea.
    pub fn is_ocean(&self) -> bool {
        self.region_raw
            .eq_ignore_ascii_case(super::resolver::OCEAN_REGION)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum QuestStatus {
    InProgress,
    Completed,
}

impl QuestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestStatus::InProgress => "in_progress",
            QuestStatus::Completed => "completed",
        }
    }
}

impl std::fmt::Display for QuestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A rotating ambient quest. Exactly one quest is in progress at any time.
///
/// Quests are created bare, with only an id, status, and creation time.
/// Target POI, reward, description, and giver identity are filled in by a
/// later outfitting step.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QuestRecord {
    pub id: u64,
    pub status: QuestStatus,
    #[serde(default)]
    pub poi: Option<PoiRef>,
    #[serde(default)]
    pub xp: u32,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub giver_name: String,
    #[serde(default)]
    pub giver_image: u8,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    pub schema_version: u8,
}

impl QuestRecord {
    pub fn new(id: u64, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            status: QuestStatus::InProgress,
            poi: None,
            xp: 0,
            description: String::new(),
            giver_name: String::new(),
            giver_image: 0,
            created_at,
            completed_at: None,
            schema_version: QUEST_SCHEMA_VERSION,
        }
    }

    /// True until the outfitting step assigns a target POI.
    pub fn is_bare(&self) -> bool {
        self.poi.is_none()
    }
}

/// Viewer identity, resolved case-insensitively from chat usernames.
/// The stored username keeps the exact casing first seen.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProfileRecord {
    pub username: String,
    pub created_at: DateTime<Utc>,
    pub schema_version: u8,
}

impl ProfileRecord {
    pub fn new(username: &str, created_at: DateTime<Utc>) -> Self {
        Self {
            username: username.to_string(),
            created_at,
            schema_version: PROFILE_SCHEMA_VERSION,
        }
    }
}

/// Credit tying a viewer profile to a quest they helped complete. `order`
/// is the viewer's position in the completion window scan, so rosters read
/// back in order of first activity rather than key order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CreditRecord {
    pub order: u32,
    /// Lowercase profile key the credit resolves to.
    pub profile: String,
    pub schema_version: u8,
}

impl CreditRecord {
    pub fn new(order: u32, profile: &str) -> Self {
        Self {
            order,
            profile: profile.to_string(),
            schema_version: CREDIT_SCHEMA_VERSION,
        }
    }
}

/// One chat command observed on the stream. Username arrives in whatever
/// casing the chat platform reported; `profile` holds the lowercase profile
/// key once the row has been linked to an identity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatCommandRecord {
    pub id: u64,
    pub username: String,
    pub command: String,
    /// Correlation id tying the command to an upstream request, if any.
    #[serde(default)]
    pub request_id: Option<String>,
    #[serde(default)]
    pub profile: Option<String>,
    pub created_at: DateTime<Utc>,
    pub schema_version: u8,
}
