//! Deterministic quest text generation.
//!
//! Every piece of generated text is a pure function of a seed string. The
//! seed is hashed with SHA-256 and the digest keys a ChaCha8 stream, so
//! the same seed yields the same phrase on every platform and every run.
//! Callers that need variation derive sub-seeds by suffixing the base
//! seed rather than by consuming extra randomness.

use std::collections::HashSet;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use sha2::{Digest, Sha256};

/// Template selection thresholds on the first uniform draw in [0, 1).
const DIRECT_MAX: f64 = 0.30;
const DELIVERY_MAX: f64 = 0.65;
const SURVEY_MAX: f64 = 0.85;

/// Attempts the uniqueness wrapper makes before accepting a repeat.
pub const MAX_DESCRIPTION_TRIES: usize = 10;

const INSPECT_VERBS: &[&str] = &["inspect", "investigate", "examine", "scout", "appraise"];

const DELIVERY_VERBS: &[&str] = &["deliver", "carry", "bring", "convey"];

const SURVEY_VERBS: &[&str] = &["survey", "chart", "comb", "sweep"];

const OBJECTS: &[&str] = &[
    "sealed letter",
    "unmarked parcel",
    "ancient relic",
    "old signet ring",
    "iron strongbox",
    "amber talisman",
    "embroidered banner",
    "urgent writ",
    "alchemical sample",
    "heirloom blade",
];

const TRAVELERS: &[&str] = &[
    "anxious courier",
    "weary pilgrim",
    "absent-minded scholar",
    "merchant apprentice",
    "old cartographer",
    "errant squire",
];

const GIVER_GIVEN_HEADS: &[&str] = &[
    "Ael", "Bren", "Cyn", "Dro", "Ed", "Fen", "Gal", "Hal", "Ise", "Jor", "Kat", "Lis", "Mor",
    "Ny", "Ola", "Per",
];

const GIVER_GIVEN_TAILS: &[&str] = &[
    "wyn", "dric", "mond", "essa", "gar", "ian", "wen", "eth", "ard", "ina", "oth", "ys",
];

const GIVER_EPITHETS: &[&str] = &[
    "",
    "",
    "",
    "the Bold",
    "the Quiet",
    "of the Bay",
    "the Elder",
    "",
    "the Wayward",
    "of the Reach",
    "",
    "the Thrice-Wed",
];

/// Words spelled with a leading vowel but spoken with a consonant sound.
const A_SOUND_PREFIXES: &[&str] = &[
    "uni", "use", "usu", "uten", "ubi", "eu", "one", "once", "ouija",
];

/// Words spelled with a leading consonant but spoken with a vowel sound.
const AN_SOUND_PREFIXES: &[&str] = &[
    "honest", "honor", "honour", "hour", "heir", "herb", "homage",
];

/// Letters whose spoken names begin with a vowel sound, for acronyms.
const VOWEL_NAME_LETTERS: &[char] = &['A', 'E', 'F', 'H', 'I', 'L', 'M', 'N', 'O', 'R', 'S', 'X'];

/// Build the deterministic RNG for a seed string.
pub fn seeded_rng(seed: &str) -> ChaCha8Rng {
    let digest = Sha256::digest(seed.as_bytes());
    ChaCha8Rng::from_seed(digest.into())
}

fn pick<'a>(rng: &mut ChaCha8Rng, pool: &'a [&'a str]) -> &'a str {
    pool[rng.gen_range(0..pool.len())]
}

/// Generate the quest description for a POI from a seed.
///
/// The first uniform draw selects one of four phrasings; later draws fill
/// in the verb and object. Articles, capitalization, and the terminal
/// period are normalized afterwards.
pub fn quest_description(poi_name: &str, seed: &str) -> String {
    let mut rng = seeded_rng(seed);
    let roll: f64 = rng.gen();

    let raw = if roll < DIRECT_MAX {
        let verb = pick(&mut rng, INSPECT_VERBS);
        format!("{} the grounds of {} and report back", verb, poi_name)
    } else if roll < DELIVERY_MAX {
        let verb = pick(&mut rng, DELIVERY_VERBS);
        if rng.gen_bool(0.5) {
            let object = pick(&mut rng, OBJECTS);
            format!("{} a {} to {}", verb, object, poi_name)
        } else {
            format!("{} a consignment to {}, no questions asked", verb, poi_name)
        }
    } else if roll < SURVEY_MAX {
        let verb = pick(&mut rng, SURVEY_VERBS);
        let object = pick(&mut rng, OBJECTS);
        format!(
            "{} the area around {} and recover a {} lost there",
            verb, poi_name, object
        )
    } else {
        let traveler = pick(&mut rng, TRAVELERS);
        format!("escort a {} safely to {}", traveler, poi_name)
    };

    polish(&fix_articles(&raw))
}

/// Generate a description not present in `recent`, retrying with derived
/// sub-seeds `seed:0`, `seed:1`, ... up to `max_tries`. When every attempt
/// collides, the final attempt is returned anyway.
pub fn unique_description(
    poi_name: &str,
    seed: &str,
    recent: &HashSet<String>,
    max_tries: usize,
) -> String {
    let mut last = String::new();
    for attempt in 0..max_tries.max(1) {
        let candidate = quest_description(poi_name, &format!("{}:{}", seed, attempt));
        if !recent.contains(&candidate) {
            return candidate;
        }
        last = candidate;
    }
    last
}

/// Assemble a quest-giver display name from the name pools. Roughly half
/// carry an epithet.
pub fn quest_giver_name(seed: &str) -> String {
    let mut rng = seeded_rng(seed);
    let given = format!(
        "{}{}",
        pick(&mut rng, GIVER_GIVEN_HEADS),
        pick(&mut rng, GIVER_GIVEN_TAILS)
    );
    let epithet = pick(&mut rng, GIVER_EPITHETS);
    if epithet.is_empty() {
        given
    } else {
        format!("{} {}", given, epithet)
    }
}

/// Correct a/an agreement against the following word. Words other than
/// the articles themselves are never altered.
pub fn fix_articles(text: &str) -> String {
    let tokens: Vec<&str> = text.split_whitespace().collect();
    let mut out: Vec<String> = Vec::with_capacity(tokens.len());
    for (i, token) in tokens.iter().enumerate() {
        let fixed = match (*token, tokens.get(i + 1)) {
            ("a", Some(next)) if wants_an(next) => "an".to_string(),
            ("A", Some(next)) if wants_an(next) => "An".to_string(),
            ("an", Some(next)) if !wants_an(next) => "a".to_string(),
            ("An", Some(next)) if !wants_an(next) => "A".to_string(),
            _ => (*token).to_string(),
        };
        out.push(fixed);
    }
    out.join(" ")
}

/// Whether the word is spoken with a leading vowel sound.
fn wants_an(word: &str) -> bool {
    let core: String = word
        .chars()
        .filter(|ch| ch.is_ascii_alphanumeric())
        .collect();
    if core.is_empty() {
        return false;
    }
    // Short all-caps tokens read letter by letter: "an FAQ", "a UFO"
    if core.len() <= 4 && core.chars().all(|ch| ch.is_ascii_uppercase()) {
        if let Some(first) = core.chars().next() {
            return VOWEL_NAME_LETTERS.contains(&first);
        }
    }
    let lower = core.to_ascii_lowercase();
    if AN_SOUND_PREFIXES.iter().any(|p| lower.starts_with(p)) {
        return true;
    }
    if A_SOUND_PREFIXES.iter().any(|p| lower.starts_with(p)) {
        return false;
    }
    matches!(
        lower.chars().next(),
        Some('a') | Some('e') | Some('i') | Some('o') | Some('u')
    )
}

/// Capitalize the first letter and normalize the terminal period.
fn polish(text: &str) -> String {
    let trimmed = text.trim().trim_end_matches('.');
    let mut chars = trimmed.chars();
    let mut result: String = match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    };
    result.push('.');
    result
}
