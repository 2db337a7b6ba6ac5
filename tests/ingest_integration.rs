/// Integration tests for the walk log ingestion pipeline.
///
/// Exercises the full path from a raw telemetry row through region and POI
/// resolution to the committed record, including ocean fallback and the
/// display-side land substitution.
use chrono::{DateTime, TimeZone, Utc};
use roamlog::engine::{append_log, latest_log, NewWalkLog, PoiKind, RoamStore, Season};
use tempfile::TempDir;

fn setup_store() -> (RoamStore, TempDir) {
    let temp_dir = TempDir::new().expect("tempdir");
    let store = RoamStore::open(temp_dir.path()).expect("open store");
    (store, temp_dir)
}

fn at(minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 8, 20, 15, minute, 0).unwrap()
}

#[test]
fn known_region_resolves_with_capital_poi() {
    let (store, _temp) = setup_store();

    let input = NewWalkLog::at("Daggerfall", "Daggerfall")
        .with_date("Morndas, 12 Hearthfire 3E 406")
        .with_weather("Rain")
        .with_map_pixel(207, 216)
        .with_created_at(at(0));
    let record = append_log(&store, &input).expect("append");

    assert_eq!(record.region.as_deref(), Some("Daggerfall"));
    assert_eq!(record.season, Season::Autumn);
    let poi = record.poi.expect("capital poi linked");
    assert_eq!(poi.region, "Daggerfall");
    assert_eq!(poi.name, "Daggerfall");

    // Linking to a seeded capital must not touch its record
    let capital = store
        .get_poi("Daggerfall", "Daggerfall")
        .expect("lookup")
        .expect("capital exists");
    assert_eq!(capital.kind, PoiKind::Capital);
    assert!(capital.discovered.is_none(), "capitals are provisioned, not discovered");
}

#[test]
fn first_visit_discovers_a_landmark() {
    let (store, _temp) = setup_store();

    let first = NewWalkLog::at("Wayrest", "Ruins of the Gray Keep")
        .with_map_pixel(640, 200)
        .with_created_at(at(5));
    append_log(&store, &first).expect("first visit");

    let poi = store
        .get_poi("Wayrest", "Ruins of the Gray Keep")
        .expect("lookup")
        .expect("landmark created");
    assert_eq!(poi.kind, PoiKind::Landmark);
    assert_eq!(poi.discovered, Some(at(5)));

    // A later visit links to the existing record without rewriting it
    let second = NewWalkLog::at("Wayrest", "Ruins of the Gray Keep").with_created_at(at(30));
    let record = append_log(&store, &second).expect("second visit");
    assert!(record.poi.is_some());
    let unchanged = store
        .get_poi("Wayrest", "Ruins of the Gray Keep")
        .expect("lookup")
        .expect("still there");
    assert_eq!(
        unchanged.discovered,
        Some(at(5)),
        "discovery timestamp belongs to the first visit"
    );
}

#[test]
fn wilderness_rows_never_create_pois() {
    let (store, _temp) = setup_store();
    let before = store.list_pois().expect("list before").len();

    let input = NewWalkLog::at("Sentinel", "Wilderness").with_created_at(at(0));
    let record = append_log(&store, &input).expect("append");

    assert_eq!(record.region.as_deref(), Some("Sentinel"));
    assert!(record.poi.is_none());
    assert_eq!(store.list_pois().expect("list after").len(), before);
}

#[test]
fn ocean_rows_carry_the_last_land_region() {
    let (store, _temp) = setup_store();

    let land = NewWalkLog::at("Anticlere", "Wilderness").with_created_at(at(0));
    append_log(&store, &land).expect("land row");

    let ocean_one = NewWalkLog::at("Ocean", "Wilderness")
        .with_weather("Fog")
        .with_created_at(at(10));
    let first = append_log(&store, &ocean_one).expect("first ocean row");
    assert_eq!(first.region.as_deref(), Some("Ocean"));
    assert_eq!(first.last_known_region.as_deref(), Some("Anticlere"));
    assert!(first.poi.is_none());

    // A second consecutive ocean row still reaches past ocean history
    let ocean_two = NewWalkLog::at("ocean", "Wilderness").with_created_at(at(20));
    let second = append_log(&store, &ocean_two).expect("second ocean row");
    assert_eq!(second.region.as_deref(), Some("Ocean"));
    assert_eq!(second.last_known_region.as_deref(), Some("Anticlere"));
}

#[test]
fn ocean_with_no_land_history_has_no_fallback() {
    let (store, _temp) = setup_store();

    let input = NewWalkLog::at("Ocean", "Wilderness").with_created_at(at(0));
    let record = append_log(&store, &input).expect("append");
    assert_eq!(record.region.as_deref(), Some("Ocean"));
    assert!(record.last_known_region.is_none());
}

#[test]
fn latest_log_substitution_merges_land_position_with_ocean_conditions() {
    let (store, _temp) = setup_store();

    let land = NewWalkLog::at("Glenpoint", "Glenpoint")
        .with_date("Tirdas, 3 Midyear 3E 406")
        .with_weather("Sunny")
        .with_map_pixel(266, 109)
        .with_song("Snowing")
        .with_created_at(at(0));
    append_log(&store, &land).expect("land row");

    let ocean = NewWalkLog::at("Ocean", "Wilderness")
        .with_date("Tirdas, 4 Midyear 3E 406")
        .with_weather("Fog")
        .with_created_at(at(30));
    let ocean_record = append_log(&store, &ocean).expect("ocean row");

    let merged = latest_log(&store, true).expect("latest").expect("some row");
    // Position and region come from the land row
    assert_eq!(merged.region.as_deref(), Some("Glenpoint"));
    assert_eq!(merged.location, "Glenpoint");
    assert_eq!(merged.map_pixel_x, 266);
    // Conditions and identity stay from the ocean row
    assert_eq!(merged.id, ocean_record.id);
    assert_eq!(merged.weather, "Fog");
    assert_eq!(merged.date, "Tirdas, 4 Midyear 3E 406");
    assert_eq!(merged.created_at, at(30));

    // Without substitution, the ocean row comes back untouched
    let raw = latest_log(&store, false).expect("latest").expect("some row");
    assert_eq!(raw.region.as_deref(), Some("Ocean"));
    assert_eq!(raw.location, "Wilderness");
}

#[test]
fn unknown_region_is_kept_raw_without_resolution() {
    let (store, _temp) = setup_store();

    let input = NewWalkLog::at("Atrofall Wastes", "Shrine of the Forgotten")
        .with_created_at(at(0));
    let record = append_log(&store, &input).expect("append");

    assert!(record.region.is_none(), "unknown regions stay unresolved");
    assert_eq!(record.region_raw, "Atrofall Wastes");
    assert!(
        record.poi.is_none(),
        "no POI is created outside a catalogued region"
    );
}

#[test]
fn season_defaults_to_unknown_for_unparseable_dates() {
    let (store, _temp) = setup_store();

    let record = append_log(
        &store,
        &NewWalkLog::at("Daggerfall", "Wilderness")
            .with_date("??? garbled ???")
            .with_created_at(at(0)),
    )
    .expect("append");
    assert_eq!(record.season, Season::Unknown);

    let empty = append_log(
        &store,
        &NewWalkLog::at("Daggerfall", "Wilderness").with_created_at(at(1)),
    )
    .expect("append");
    assert_eq!(empty.season, Season::Unknown);
}

#[test]
fn walk_logs_are_returned_in_chronological_order() {
    let (store, _temp) = setup_store();

    for minute in [30, 10, 50, 20] {
        let input = NewWalkLog::at("Daggerfall", "Wilderness").with_created_at(at(minute));
        append_log(&store, &input).expect("append");
    }

    let entries = store.walk_log_entries().expect("entries");
    let minutes: Vec<u32> = entries
        .iter()
        .map(|(_, record)| {
            use chrono::Timelike;
            record.created_at.minute()
        })
        .collect();
    assert_eq!(minutes, vec![10, 20, 30, 50]);
}
