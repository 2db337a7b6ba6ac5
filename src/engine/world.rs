use chrono::{DateTime, Utc};

use crate::engine::resolver::OCEAN_REGION;
use crate::engine::types::{PoiKind, PoiRecord, RegionRecord};

/// Province names used by the canonical seed.
pub const PROVINCE_HIGH_ROCK: &str = "High Rock";
pub const PROVINCE_HAMMERFELL: &str = "Hammerfell";

/// Iliac Bay region names that ship with the seed, plus the ocean sentinel.
///
/// The walker client reports these names verbatim; the catalog is the
/// authority on which of them are real land regions. Operators can add
/// regions later, but the seed covers everywhere the stream has roamed.
pub const CANONICAL_REGION_NAMES: &[&str] = &[
    // High Rock
    "Daggerfall",
    "Wayrest",
    "Anticlere",
    "Dwynnen",
    "Glenpoint",
    "Ilessan Hills",
    "Shalgora",
    "Daenia",
    "Kambria",
    "Northmoor",
    "Menevia",
    "Alcaire",
    "Koegria",
    "Gavaudon",
    "Wrothgarian Mountains",
    "Isle of Balfiera",
    // Hammerfell
    "Sentinel",
    "Abibon-Gora",
    "Kairou",
    "Pothago",
    "Myrkwasa",
    "Ayasofya",
    "Tigonus",
    "Satakalaam",
    "Mournoth",
    "Bergama",
    "Lainlyn",
    "Alik'r Desert",
    "Dragontail Mountains",
    // Not a land region; logs reported here fall back to the last land region
    OCEAN_REGION,
];

/// Build the canonical Iliac Bay region catalog that first startup seeds
/// into the database.
///
/// Timestamps are deterministic based on the `now` provided so tests can
/// supply a fixed value. Callers typically pass `Utc::now()` in production
/// paths.
pub fn canonical_region_seed(now: DateTime<Utc>) -> Vec<RegionRecord> {
    let mut regions = Vec::new();

    let high_rock: &[(&str, &str, Option<&str>)] = &[
        ("Daggerfall", "Woodlands", Some("🏰")),
        ("Wayrest", "Woodlands", Some("💰")),
        ("Anticlere", "Woodlands", None),
        ("Dwynnen", "Woodlands", Some("👻")),
        ("Glenpoint", "Woodlands", None),
        ("Ilessan Hills", "Woodlands", None),
        ("Shalgora", "Woodlands", None),
        ("Daenia", "Woodlands", None),
        ("Kambria", "Woodlands", None),
        ("Northmoor", "Woodlands", None),
        ("Menevia", "Woodlands", None),
        ("Alcaire", "Woodlands", None),
        ("Koegria", "Woodlands", None),
        ("Gavaudon", "Swamp", None),
        ("Wrothgarian Mountains", "Mountain", Some("⛰️")),
        ("Isle of Balfiera", "Temperate", Some("🗼")),
    ];
    for (name, climate, emoji) in high_rock {
        let mut region = RegionRecord::new(name, PROVINCE_HIGH_ROCK, climate).with_created_at(now);
        if let Some(emoji) = emoji {
            region = region.with_emoji(emoji);
        }
        regions.push(region);
    }

    let hammerfell: &[(&str, &str, Option<&str>)] = &[
        ("Sentinel", "Desert", Some("🌅")),
        ("Abibon-Gora", "Desert", None),
        ("Kairou", "Desert", None),
        ("Pothago", "Desert", None),
        ("Myrkwasa", "Desert", None),
        ("Ayasofya", "Desert", None),
        ("Tigonus", "Desert", None),
        ("Satakalaam", "Desert", Some("🕌")),
        ("Mournoth", "Desert", None),
        ("Bergama", "Desert", None),
        ("Lainlyn", "Desert", None),
        ("Alik'r Desert", "Desert", Some("🏜️")),
        ("Dragontail Mountains", "Mountain", Some("🐉")),
    ];
    for (name, climate, emoji) in hammerfell {
        let mut region = RegionRecord::new(name, PROVINCE_HAMMERFELL, climate).with_created_at(now);
        if let Some(emoji) = emoji {
            region = region.with_emoji(emoji);
        }
        regions.push(region);
    }

    // Single-tile map images for most regions; the two mountain ranges are
    // stitched from a pair of tiles with pixel offsets.
    for region in regions.iter_mut() {
        let slug = map_slug(&region.name);
        match region.name.as_str() {
            "Wrothgarian Mountains" => {
                *region = region
                    .clone()
                    .with_part(&format!("{}_west.png", slug), 0, 0)
                    .with_part(&format!("{}_east.png", slug), 412, 0);
            }
            "Dragontail Mountains" => {
                *region = region
                    .clone()
                    .with_part(&format!("{}_north.png", slug), 0, 0)
                    .with_part(&format!("{}_south.png", slug), 0, 296);
            }
            _ => {
                *region = region.clone().with_part(&format!("{}.png", slug), 0, 0);
            }
        }
    }

    let ocean = RegionRecord::new(OCEAN_REGION, "Iliac Bay", "Ocean")
        .with_emoji("🌊")
        .with_created_at(now);
    regions.push(ocean);

    regions
}

/// Build the capital POIs matching [`canonical_region_seed`]. Capitals are
/// provisioned here rather than discovered through walk logs.
pub fn canonical_capital_seed(now: DateTime<Utc>) -> Vec<PoiRecord> {
    let capitals: &[(&str, &str, i64, i64)] = &[
        ("Daggerfall", "Daggerfall", 207, 216),
        ("Wayrest", "Wayrest", 637, 199),
        ("Anticlere", "Anticlere", 406, 171),
        ("Dwynnen", "Castle Wightmoor", 397, 111),
        ("Glenpoint", "Glenpoint", 266, 109),
        ("Ilessan Hills", "Black Wastes", 294, 166),
        ("Shalgora", "Vermeir Wastes", 292, 238),
        ("Daenia", "Midvale", 353, 188),
        ("Kambria", "Vanech Hills", 391, 147),
        ("Northmoor", "Normar Heights", 462, 133),
        ("Menevia", "Wind Keep", 575, 160),
        ("Alcaire", "Lysandus' Tomb", 500, 178),
        ("Koegria", "Bhoriane", 556, 188),
        ("Gavaudon", "Longhaven", 717, 175),
        ("Wrothgarian Mountains", "Kagrenac", 576, 95),
        ("Isle of Balfiera", "Direnni Tower", 545, 238),
        ("Sentinel", "Sentinel", 245, 336),
        ("Abibon-Gora", "Abibon-Gora", 81, 439),
        ("Kairou", "Kairou", 129, 402),
        ("Pothago", "Pothago", 186, 393),
        ("Myrkwasa", "Myrkwasa", 244, 377),
        ("Ayasofya", "Ayasofya", 373, 407),
        ("Tigonus", "Tigonus", 600, 421),
        ("Satakalaam", "Satakalaam", 706, 331),
        ("Mournoth", "Mournoth", 747, 293),
        ("Bergama", "Bergama", 414, 341),
        ("Lainlyn", "Castle Lainlyn", 522, 282),
        ("Alik'r Desert", "Chasetown", 330, 309),
        ("Dragontail Mountains", "Heldorn Mount", 650, 370),
    ];

    capitals
        .iter()
        .map(|(region, name, map_x, map_y)| {
            PoiRecord::new(region, name, PoiKind::Capital)
                .with_map_pixel(*map_x, *map_y)
                .with_created_at(now)
        })
        .collect()
}

/// Lowercase file-name slug for a region's map tiles.
fn map_slug(region: &str) -> String {
    region
        .chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() {
                ch.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seed_covers_every_canonical_region() {
        let now = Utc::now();
        let regions = canonical_region_seed(now);
        assert_eq!(regions.len(), CANONICAL_REGION_NAMES.len());
        for name in CANONICAL_REGION_NAMES {
            assert!(
                regions.iter().any(|r| r.name == *name),
                "missing region {}",
                name
            );
        }
    }

    #[test]
    fn every_land_region_has_a_capital() {
        let now = Utc::now();
        let regions = canonical_region_seed(now);
        let capitals = canonical_capital_seed(now);
        for region in regions.iter().filter(|r| !r.is_ocean()) {
            assert!(
                capitals.iter().any(|c| c.region == region.name),
                "no capital for {}",
                region.name
            );
        }
        assert!(capitals.iter().all(|c| c.kind == PoiKind::Capital));
        assert!(capitals.iter().all(|c| c.discovered.is_none()));
    }

    #[test]
    fn mountain_ranges_are_multi_part() {
        let regions = canonical_region_seed(Utc::now());
        let wrothgaria = regions
            .iter()
            .find(|r| r.name == "Wrothgarian Mountains")
            .unwrap();
        assert!(wrothgaria.multi_part());
        let daggerfall = regions.iter().find(|r| r.name == "Daggerfall").unwrap();
        assert!(!daggerfall.multi_part());
        assert_eq!(daggerfall.map_parts[0].image, "daggerfall.png");
    }

    #[test]
    fn ocean_is_seeded_but_not_land() {
        let regions = canonical_region_seed(Utc::now());
        let ocean = regions.iter().find(|r| r.is_ocean()).unwrap();
        assert_eq!(ocean.name, OCEAN_REGION);
        assert_eq!(ocean.climate, "Ocean");
    }
}
