//! # Roamlog - Log-Driven Quest Rotation Engine
//!
//! Roamlog ingests position telemetry from an always-on wandering game
//! stream, resolves it against a region and point-of-interest catalog, and
//! rotates an ambient quest that stream viewers complete together through
//! chat commands.
//!
//! ## Features
//!
//! - **Walk Log Ingestion**: Append-only telemetry rows with derived
//!   season, resolved region, and automatic POI discovery, committed
//!   transactionally.
//! - **Region/POI Resolution**: Exact catalog lookups, ocean fallback to
//!   the last land region, and wilderness classification.
//! - **Deterministic Quest Text**: SHA-256 seeded ChaCha8 phrase
//!   generation with article correction and a uniqueness window, so the
//!   same seed always produces the same quest.
//! - **Quest Rotation**: A single in-progress quest at any time, completed
//!   and replaced atomically, with inclusive participant windows and
//!   idempotent per-viewer credits.
//! - **Consistency Jobs**: Dry-runnable backfills for POI discovery
//!   timestamps, ocean last-known-regions, and orphaned chat rows.
//! - **Embedded Storage**: Everything persists in a single sled database;
//!   no external services.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use roamlog::config::Config;
//! use roamlog::engine::{self, RoamStore};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     // Load configuration
//!     let config = Config::load("config.toml").await?;
//!
//!     // Open the store; first open seeds the region catalog and quest
//!     let store = RoamStore::open(config.storage.db_path())?;
//!
//!     // Append one telemetry row
//!     let input = engine::NewWalkLog::at("Daggerfall", "Privateer's Hold")
//!         .with_date("Morndas, 12 Hearthfire 3E 406")
//!         .with_weather("Rain");
//!     let record = engine::append_log(&store, &input)?;
//!     println!("logged {} in {:?}", record.id, record.region);
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`engine`] - Storage, resolution, ingestion, quests, text generation,
//!   and consistency jobs
//! - [`config`] - Configuration management
//! - [`logutil`] - Log line sanitization for client-reported strings
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────┐
//! │  Ingest / Chat   │ ← Telemetry rows and viewer commands
//! └──────────────────┘
//!          │
//! ┌──────────────────┐
//! │  Resolver        │ ← Region, POI, season, ocean fallback
//! └──────────────────┘
//!          │
//! ┌──────────────────┐
//! │  Quest Lifecycle │ ← Rotation, credits, outfitting
//! └──────────────────┘
//!          │
//! ┌──────────────────┐
//! │  Sled Storage    │ ← Single embedded database
//! └──────────────────┘
//! ```

pub mod config;
pub mod engine;
pub mod logutil;
