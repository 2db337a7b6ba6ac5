//! Binary entrypoint for the roamlog CLI.
//!
//! Commands:
//! - `init` - create a starter `config.toml` and seed the region catalog
//! - `ingest` - append one walk log row (flags or `--json` payload)
//! - `chat` - record a viewer chat command
//! - `rotate` - complete the active quest, credit participants, start the next
//! - `outfit` - fill the active quest's target, description, giver, and reward
//! - `status` - print the latest log, the active quest, and store counts
//! - `map <region>` - print catalog and shape data for one region
//! - `jobs [discovered|ocean|chat-links|all]` - run consistency backfills
//!
//! See the library crate docs for module-level details: `roamlog::`.
use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use log::info;

// Use the published library crate modules instead of redefining them here.
use roamlog::config::Config;
use roamlog::engine::{
    self, jobs, JobReport, NewChatCommand, NewWalkLog, RoamStore, WILDERNESS_LOCATION,
};

#[derive(Parser)]
#[command(name = "roamlog")]
#[command(about = "Log ingestion and quest rotation engine for a wandering game stream")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path (can be used before or after subcommand)
    #[arg(short, long, default_value = "config.toml", global = true)]
    config: String,

    /// Verbose logging (-v, -vv for more; may appear before or after subcommand)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new configuration and seed the store
    Init,
    /// Append one walk log row
    Ingest {
        /// JSON payload file ("-" reads stdin); overrides the field flags
        #[arg(long)]
        json: Option<String>,
        /// Region name as the walker client reports it
        #[arg(short, long)]
        region: Option<String>,
        /// Location or site name; empty means wilderness
        #[arg(short, long, default_value = WILDERNESS_LOCATION)]
        location: String,
        /// In-game date string, e.g. "Morndas, 12 Hearthfire 3E 406"
        #[arg(long)]
        date: Option<String>,
        /// Current weather
        #[arg(long, default_value = "Clear")]
        weather: String,
        /// Track currently playing on the stream
        #[arg(long)]
        song: Option<String>,
        /// Map pixel X coordinate
        #[arg(long)]
        map_x: Option<i64>,
        /// Map pixel Y coordinate
        #[arg(long)]
        map_y: Option<i64>,
        /// World-space X coordinate
        #[arg(long)]
        world_x: Option<i64>,
        /// World-space Z coordinate
        #[arg(long)]
        world_z: Option<i64>,
    },
    /// Record a viewer chat command
    Chat {
        /// Viewer username, casing preserved
        #[arg(short, long)]
        user: String,
        /// The command text, e.g. "!quest"
        #[arg(short = 'm', long)]
        message: String,
        /// Correlation id linking this row to a completion request
        #[arg(long)]
        request: Option<String>,
        /// Mint a fresh correlation id and print it
        #[arg(long)]
        mint_request: bool,
    },
    /// Complete the active quest and rotate to the next one
    Rotate {
        /// Completion timestamp (RFC 3339); defaults to now
        #[arg(long)]
        at: Option<String>,
        /// Correlation id of the completing request; late chat rows
        /// carrying it still earn credit
        #[arg(long)]
        request: Option<String>,
    },
    /// Outfit the active quest if it is still bare
    Outfit,
    /// Show the latest log, the active quest, and store counts
    Status {
        /// Emit JSON instead of a text summary
        #[arg(long)]
        json: bool,
    },
    /// Show catalog and shape data for one region
    Map {
        /// Region name
        region: String,
        /// Emit JSON instead of a text summary
        #[arg(long)]
        json: bool,
    },
    /// Run consistency backfill jobs
    Jobs {
        /// Which job to run: discovered, ocean, chat-links, or all
        #[arg(default_value = "all")]
        job: String,
        /// Report what would change without writing anything
        #[arg(long)]
        dry_run: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load config early to configure logging (except for Init which writes it)
    let pre_config = match cli.command {
        Commands::Init => None,
        _ => Config::load(&cli.config).await.ok(),
    };
    if !matches!(cli.command, Commands::Init) {
        init_logging(&pre_config, cli.verbose);
    }

    match cli.command {
        Commands::Init => {
            init_logging(&None, cli.verbose);
            info!("Initializing new roamlog configuration");
            Config::create_default(&cli.config).await?;
            info!("Configuration file created at {}", cli.config);

            // First open seeds the region catalog, the province capitals,
            // and the initial bare quest.
            let config = Config::load(&cli.config).await?;
            let store = RoamStore::open(config.storage.db_path())?;
            let regions = store.list_regions()?;
            let pois = store.list_pois()?;
            info!(
                "Store ready at {} with {} regions and {} points of interest",
                config.storage.db_path(),
                regions.len(),
                pois.len()
            );
            if let Some(quest) = store.active_quest()? {
                info!("Quest {} is active; run `roamlog outfit` to fill it", quest.id);
            }
        }
        Commands::Ingest {
            json,
            region,
            location,
            date,
            weather,
            song,
            map_x,
            map_y,
            world_x,
            world_z,
        } => {
            let config = require_config(pre_config, &cli.config).await?;
            let store = RoamStore::open(config.storage.db_path())?;
            let input = match json {
                Some(path) => read_json_payload(&path).await?,
                None => {
                    let Some(region) = region else {
                        anyhow::bail!("either --json or --region is required");
                    };
                    let mut input = NewWalkLog::at(&region, &location).with_weather(&weather);
                    if let Some(date) = date {
                        input = input.with_date(&date);
                    }
                    if let Some(song) = song {
                        input = input.with_song(&song);
                    }
                    if let (Some(x), Some(y)) = (map_x, map_y) {
                        input = input.with_map_pixel(x, y);
                    }
                    if let (Some(x), Some(z)) = (world_x, world_z) {
                        input = input.with_world(x, z);
                    }
                    input
                }
            };
            let record = engine::append_log(&store, &input)?;
            println!(
                "log {}: {} / {} ({}, {})",
                record.id,
                record.region.as_deref().unwrap_or(&record.region_raw),
                record.location,
                record.season,
                record.weather
            );
            if let Some(poi) = &record.poi {
                println!("  at {}", poi);
            }
        }
        Commands::Chat {
            user,
            message,
            request,
            mint_request,
        } => {
            let config = require_config(pre_config, &cli.config).await?;
            let store = RoamStore::open(config.storage.db_path())?;
            let request_id = match (request, mint_request) {
                (Some(id), _) => Some(id),
                (None, true) => Some(uuid::Uuid::new_v4().to_string()),
                (None, false) => None,
            };
            let mut input = NewChatCommand::new(&user, &message);
            if let Some(id) = &request_id {
                input = input.with_request_id(id);
            }
            let record = engine::record_chat_command(&store, &input)?;
            match &record.request_id {
                Some(id) => println!("chat {} recorded (request {})", record.id, id),
                None => println!("chat {} recorded", record.id),
            }
        }
        Commands::Rotate { at, request } => {
            let config = require_config(pre_config, &cli.config).await?;
            let store = RoamStore::open(config.storage.db_path())?;
            let completed_at = match at {
                Some(raw) => Some(parse_rfc3339(&raw)?),
                None => None,
            };
            let outcome = engine::rotate_active(&store, completed_at, request.as_deref())?;
            println!(
                "quest {} completed at {}",
                outcome.completed.id,
                outcome.window_end.to_rfc3339()
            );
            if outcome.participants.is_empty() {
                println!("no participants credited");
            } else {
                println!(
                    "credited {} participant(s): {}",
                    outcome.participants.len(),
                    outcome.participants.join(", ")
                );
            }
            let next = engine::outfit_quest(&store, outcome.next.id, &config.quest.outfit())?;
            println!("quest {} now active: {}", next.id, next.description);
        }
        Commands::Outfit => {
            let config = require_config(pre_config, &cli.config).await?;
            let store = RoamStore::open(config.storage.db_path())?;
            let Some(quest_id) = store.active_quest_id()? else {
                anyhow::bail!("no active quest; run `roamlog init` first");
            };
            let quest = engine::outfit_quest(&store, quest_id, &config.quest.outfit())?;
            println!("quest {}: {}", quest.id, quest.description);
            if let Some(poi) = &quest.poi {
                println!("  target: {}", poi);
            }
            println!("  giver: {} (portrait {})", quest.giver_name, quest.giver_image);
            println!("  reward: {} xp", quest.xp);
        }
        Commands::Status { json } => {
            let config = require_config(pre_config, &cli.config).await?;
            let store = RoamStore::open(config.storage.db_path())?;
            let latest = engine::latest_log(&store, config.ingest.substitute_ocean)?;
            let summary = match store.active_quest_id()? {
                Some(id) => Some(engine::quest_summary(&store, id)?),
                None => None,
            };
            let logs = store.count_walk_logs()?;
            let chats = store.count_chat_commands()?;
            let profiles = store.count_profiles()?;
            if json {
                let payload = serde_json::json!({
                    "latest_log": latest,
                    "active_quest": summary,
                    "counts": {
                        "walk_logs": logs,
                        "chat_commands": chats,
                        "profiles": profiles,
                    },
                });
                println!("{}", serde_json::to_string_pretty(&payload)?);
            } else {
                match &latest {
                    Some(log) => println!(
                        "latest: {} / {} ({}, {})",
                        log.region.as_deref().unwrap_or(&log.region_raw),
                        log.location,
                        log.season,
                        log.weather
                    ),
                    None => println!("latest: no walk logs yet"),
                }
                match &summary {
                    Some(s) if s.quest.is_bare() => {
                        println!("quest {}: bare (run `roamlog outfit`)", s.quest.id)
                    }
                    Some(s) => {
                        println!("quest {}: {}", s.quest.id, s.quest.description);
                        if !s.participants.is_empty() {
                            println!("  participants: {}", s.participants.join(", "));
                        }
                    }
                    None => println!("quest: none active"),
                }
                println!(
                    "counts: {} logs, {} chat commands, {} profiles",
                    logs, chats, profiles
                );
            }
        }
        Commands::Map { region, json } => {
            let config = require_config(pre_config, &cli.config).await?;
            let store = RoamStore::open(config.storage.db_path())?;
            let shapes = match &config.storage.shapes_file {
                Some(path) => Some(engine::load_shape_index(std::path::Path::new(path))?),
                None => None,
            };
            let Some(data) = engine::region_map_data(&store, &region, shapes.as_ref())? else {
                anyhow::bail!("unknown region: {}", region);
            };
            if json {
                println!("{}", serde_json::to_string_pretty(&data)?);
            } else {
                println!(
                    "{} ({}, {})",
                    data.region.name, data.region.province, data.region.climate
                );
                if let Some(capital) = &data.capital {
                    println!("  capital: {}", capital.name);
                }
                println!("  {} point(s) of interest", data.pois.len());
                if let Some(shape) = &data.shape {
                    println!("  shape: {} vertices", shape.len());
                }
            }
        }
        Commands::Jobs { job, dry_run } => {
            let config = require_config(pre_config, &cli.config).await?;
            let store = RoamStore::open(config.storage.db_path())?;
            let report = match job.as_str() {
                "discovered" => jobs::backfill_poi_discovered(&store, dry_run)?,
                "ocean" => jobs::backfill_last_known_region(&store, dry_run)?,
                "chat-links" => jobs::relink_chat_profiles(&store, dry_run)?,
                "all" => jobs::run_all(&store, dry_run)?,
                other => anyhow::bail!(
                    "unknown job '{}'; expected discovered, ocean, chat-links, or all",
                    other
                ),
            };
            print_report(&report, dry_run);
        }
    }

    Ok(())
}

async fn require_config(pre_config: Option<Config>, path: &str) -> Result<Config> {
    match pre_config {
        Some(config) => Ok(config),
        None => Config::load(path).await,
    }
}

async fn read_json_payload(path: &str) -> Result<NewWalkLog> {
    let text = if path == "-" {
        use tokio::io::AsyncReadExt;
        let mut buf = String::new();
        tokio::io::stdin().read_to_string(&mut buf).await?;
        buf
    } else {
        tokio::fs::read_to_string(path).await?
    };
    Ok(serde_json::from_str(&text)?)
}

fn parse_rfc3339(raw: &str) -> Result<DateTime<Utc>> {
    let parsed = DateTime::parse_from_rfc3339(raw)
        .map_err(|e| anyhow::anyhow!("invalid --at timestamp '{}': {}", raw, e))?;
    Ok(parsed.with_timezone(&Utc))
}

fn print_report(report: &JobReport, dry_run: bool) {
    if dry_run {
        println!("[dry run] {}", report.summary());
    } else {
        println!("{}", report.summary());
    }
    for line in &report.changes {
        println!("  {}", line);
    }
}

fn init_logging(config: &Option<Config>, verbosity: u8) {
    use std::io::Write;
    let mut builder = env_logger::Builder::new();
    // CLI verbosity overrides the configured level
    let base_level = match verbosity {
        0 => config
            .as_ref()
            .and_then(|c| c.logging.level.parse().ok())
            .unwrap_or(log::LevelFilter::Info),
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    builder.filter_level(base_level);
    if let Some(cfg) = config {
        if let Some(ref file) = cfg.logging.file {
            if let Ok(f) = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(file)
            {
                let mutex = std::sync::Arc::new(std::sync::Mutex::new(f));
                let write_mutex = mutex.clone();

                // When stdout is a terminal, mirror log lines to the console
                // as well as the file.
                let is_tty = atty::is(atty::Stream::Stdout);

                builder.format(move |fmt, record| {
                    let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
                    let line = format!("{} [{}] {}", ts, record.level(), record.args());

                    if let Ok(mut guard) = write_mutex.lock() {
                        let _ = writeln!(guard, "{}", line);
                    }

                    if is_tty {
                        writeln!(fmt, "{}", line)
                    } else {
                        Ok(())
                    }
                });
            } else {
                builder.format(|fmt, record| {
                    writeln!(
                        fmt,
                        "{} [{}] {}",
                        chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ"),
                        record.level(),
                        record.args()
                    )
                });
            }
        } else {
            builder.format(|fmt, record| {
                let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
                writeln!(fmt, "{} [{}] {}", ts, record.level(), record.args())
            });
        }
    } else {
        builder.format(|fmt, record| {
            writeln!(
                fmt,
                "{} [{}] {}",
                chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ"),
                record.level(),
                record.args()
            )
        });
    }
    let _ = builder.try_init();
}
