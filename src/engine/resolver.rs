use chrono::{DateTime, Utc};

use crate::engine::errors::EngineError;
use crate::engine::ingest::NewWalkLog;
use crate::engine::storage::RoamStore;
use crate::engine::types::{PoiKind, PoiRecord, PoiRef, Season};

/// Sentinel region name the walker client reports while at sea.
pub const OCEAN_REGION: &str = "Ocean";

/// Location string the client reports between named places.
pub const WILDERNESS_LOCATION: &str = "Wilderness";

/// Daggerfall calendar months and the season each falls in, in calendar
/// order. Matching is by normalized substring, so "Sun's Dawn" and
/// "Suns Dawn" both hit `sunsdawn`. No month name is a substring of
/// another, so order only decides ties that cannot occur.
const MONTH_SEASONS: &[(&str, Season)] = &[
    ("morningstar", Season::Winter),
    ("sunsdawn", Season::Winter),
    ("firstseed", Season::Spring),
    ("rainshand", Season::Spring),
    ("secondseed", Season::Spring),
    ("midyear", Season::Summer),
    ("sunsheight", Season::Summer),
    ("lastseed", Season::Summer),
    ("hearthfire", Season::Autumn),
    ("frostfall", Season::Autumn),
    ("sunsdusk", Season::Autumn),
    ("eveningstar", Season::Winter),
];

pub fn is_ocean_region(raw: &str) -> bool {
    raw.trim().eq_ignore_ascii_case(OCEAN_REGION)
}

/// True for location strings that name no point of interest. The client
/// tags open terrain and open water loosely, so any location containing
/// "wilderness" or "ocean" counts, as does an empty report.
pub fn is_wilderness(raw: &str) -> bool {
    let lower = raw.trim().to_ascii_lowercase();
    lower.is_empty() || lower.contains("wilderness") || lower.contains("ocean")
}

/// Lowercase a date string and drop everything that is not a letter or
/// digit, so month names survive apostrophes and spacing differences.
fn normalize_date(date: &str) -> String {
    date.chars()
        .filter(|ch| ch.is_ascii_alphanumeric())
        .map(|ch| ch.to_ascii_lowercase())
        .collect()
}

/// Map an in-game date string to its season.
///
/// Malformed or empty dates never fail a log write; they parse to
/// [`Season::Unknown`].
pub fn parse_season(date: &str) -> Season {
    let normalized = normalize_date(date);
    if normalized.is_empty() {
        return Season::Unknown;
    }
    for (month, season) in MONTH_SEASONS {
        if normalized.contains(month) {
            return *season;
        }
    }
    Season::Unknown
}

/// Outcome of resolving one incoming log against the region and POI
/// catalogs. Carries everything the ingest step needs to commit: the
/// resolved references plus, when the location is new, the POI record
/// that still has to be created.
#[derive(Debug, Clone)]
pub struct ResolvedPlacement {
    /// Catalog region the raw name matched, ocean included. `None` when
    /// the raw name is unknown to the catalog.
    pub region: Option<String>,
    /// POI the location string resolved to, existing or about to exist.
    pub poi: Option<PoiRef>,
    /// POI record to create alongside the log when the location was
    /// never seen before. Always a landmark.
    pub new_poi: Option<PoiRecord>,
    /// Last land region, carried on ocean logs for downstream display.
    pub last_known_region: Option<String>,
    pub season: Season,
}

/// Resolve an incoming log's raw region and location strings against the
/// catalogs. Read-only; the caller commits any new POI together with the
/// log row.
///
/// `observed_at` is the timestamp the log will carry, used as the
/// discovery time of a newly created POI.
pub fn resolve_placement(
    store: &RoamStore,
    input: &NewWalkLog,
    observed_at: DateTime<Utc>,
) -> Result<ResolvedPlacement, EngineError> {
    let season = parse_season(&input.date);

    if is_ocean_region(&input.region) {
        // At sea there is no POI to resolve. Downstream map display needs
        // a land region, so carry the most recent resolved one forward.
        let last_known = match &input.last_known_region {
            Some(name) => Some(name.clone()),
            None => store.latest_land_log()?.and_then(|log| log.region),
        };
        let region = store.get_region(OCEAN_REGION)?.map(|r| r.name);
        return Ok(ResolvedPlacement {
            region,
            poi: None,
            new_poi: None,
            last_known_region: last_known,
            season,
        });
    }

    let region = store.get_region(&input.region)?.map(|r| r.name);

    // Unknown regions keep their raw string only; without a catalog
    // region there is nothing to key a POI under.
    let (poi, new_poi) = match &region {
        Some(region_name) if !is_wilderness(&input.location) => {
            let location = input.location.trim();
            match store.get_poi(region_name, location)? {
                Some(existing) => (Some(existing.poi_ref()), None),
                None => {
                    let record = PoiRecord::new(region_name, location, PoiKind::Landmark)
                        .with_map_pixel(input.map_pixel_x, input.map_pixel_y)
                        .with_discovered(observed_at)
                        .with_created_at(observed_at);
                    (Some(record.poi_ref()), Some(record))
                }
            }
        }
        _ => (None, None),
    };

    Ok(ResolvedPlacement {
        region,
        poi,
        new_poi,
        last_known_region: input.last_known_region.clone(),
        season,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seasons_follow_the_daggerfall_calendar() {
        assert_eq!(parse_season("Morndas, 12 Hearthfire 3E 406"), Season::Autumn);
        assert_eq!(parse_season("Tirdas, 3 Morning Star 3E 407"), Season::Winter);
        assert_eq!(parse_season("Sundas, 28 Sun's Dawn 3E 407"), Season::Winter);
        assert_eq!(parse_season("Loredas, 9 First Seed 3E 407"), Season::Spring);
        assert_eq!(parse_season("Middas, 21 Rain's Hand 3E 407"), Season::Spring);
        assert_eq!(parse_season("Fredas, 2 Second Seed 3E 407"), Season::Spring);
        assert_eq!(parse_season("Morndas, 16 Midyear 3E 407"), Season::Summer);
        assert_eq!(parse_season("Turdas, 30 Sun's Height 3E 407"), Season::Summer);
        assert_eq!(parse_season("Tirdas, 11 Last Seed 3E 407"), Season::Summer);
        assert_eq!(parse_season("Sundas, 8 Frostfall 3E 407"), Season::Autumn);
        assert_eq!(parse_season("Middas, 19 Sun's Dusk 3E 407"), Season::Autumn);
        assert_eq!(parse_season("Loredas, 24 Evening Star 3E 407"), Season::Winter);
    }

    #[test]
    fn malformed_dates_default_to_unknown() {
        assert_eq!(parse_season(""), Season::Unknown);
        assert_eq!(parse_season("   "), Season::Unknown);
        assert_eq!(parse_season("not a calendar date"), Season::Unknown);
        assert_eq!(parse_season("12/31/2025"), Season::Unknown);
    }

    #[test]
    fn month_matching_survives_apostrophes_and_case() {
        assert_eq!(parse_season("3 SUNS DAWN"), Season::Winter);
        assert_eq!(parse_season("suns'dawn"), Season::Winter);
        assert_eq!(parse_season("RAINS HAND"), Season::Spring);
    }

    #[test]
    fn ocean_and_wilderness_markers() {
        assert!(is_ocean_region("Ocean"));
        assert!(is_ocean_region("  OCEAN "));
        assert!(!is_ocean_region("Oceania"));
        assert!(is_wilderness(WILDERNESS_LOCATION));
        assert!(is_wilderness("wilderness"));
        assert!(is_wilderness("Wilderness near Daggerfall"));
        assert!(is_wilderness("Ocean"));
        assert!(is_wilderness("open ocean waters"));
        assert!(is_wilderness("   "));
        assert!(!is_wilderness("Privateer's Hold"));
    }
}
