mod config;
mod database;
mod domain;
mod entities;
mod logging;
mod persistence;
mod ports;
mod services;
#[cfg(test)]
mod test_utils;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use clap::{Parser, Subcommand};
use color_eyre::{
    Result,
    eyre::{Context, OptionExt, bail},
};
use tokio_util::sync::CancellationToken;

use crate::{
    config::Config,
    database::Database,
    domain::{
        ConflictPolicy, Connector, MatchStrategy, OperationKind, OperationTarget, Playlist,
        SequenceMetadata, Track, TrackSequence, UpdateOptions,
    },
    logging::init_tracing,
    persistence::{SeaPlaylistRepository, SeaTrackRepository},
    ports::repository::PlaylistRepository,
    services::playlist_update::{
        PlaylistRef, UpdateCommand, UpdateOrchestrator, UpdateOutcome, UpdateResult,
    },
    services::spotify::{SpotifySyncService, SpotifyWebClient},
};

const SERVICE_NAME: &str = "playlist-sync";

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// The config file to use
    #[arg(short, long, env = "PLAYLIST_SYNC_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Log filter, e.g. `debug` or `playlist_sync=trace` (default: from config)
    #[arg(long, env = "LOG_LEVEL", global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Update a playlist to match a target track list
    Update(UpdateArgs),
    #[command(subcommand)]
    Playlist(PlaylistCommands),
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(clap::Args, Debug)]
struct UpdateArgs {
    /// Local playlist id
    #[arg(long, conflicts_with = "external_id", required_unless_present = "external_id")]
    playlist_id: Option<i64>,

    /// Connector the external playlist id belongs to
    #[arg(long, value_enum, default_value_t = Connector::Spotify)]
    connector: Connector,

    /// External playlist id on the connector
    #[arg(long)]
    external_id: Option<String>,

    /// JSON file holding the target tracks, in order
    #[arg(short, long)]
    target: PathBuf,

    #[arg(long, value_enum, default_value_t)]
    strategy: MatchStrategy,

    /// Where changes are applied
    #[arg(long, value_enum, default_value_t)]
    mode: OperationTarget,

    #[arg(long, value_enum, default_value_t)]
    conflict_policy: ConflictPolicy,

    /// Tracks per add/remove call (default: from config)
    #[arg(long)]
    batch_size: Option<usize>,

    /// Remote call budget for this run (default: from config)
    #[arg(long)]
    max_api_calls: Option<usize>,

    /// Compute and print the diff without applying it
    #[arg(long)]
    dry_run: bool,

    /// Only update the local store
    #[arg(long)]
    no_external_sync: bool,

    /// Abort when an added track cannot be saved
    #[arg(long)]
    fail_on_track_error: bool,
}

#[derive(Subcommand, Debug)]
enum PlaylistCommands {
    /// Create a local playlist from a track file
    Create {
        #[arg(short, long)]
        name: String,

        #[arg(short, long)]
        description: Option<String>,

        /// JSON file holding the initial tracks
        #[arg(short, long)]
        tracks: Option<PathBuf>,

        /// Link the playlist to an existing playlist on this connector
        #[arg(long, value_enum, requires = "external_id")]
        connector: Option<Connector>,

        #[arg(long)]
        external_id: Option<String>,

        /// Version token of the linked playlist as last seen
        #[arg(long, requires = "connector")]
        version_token: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Create a default config file, if it doesn't exist
    CreateDefault,
    /// Print the path to the config file
    Path,
}

fn read_tracks(path: &Path) -> Result<TrackSequence> {
    let contents = std::fs::read_to_string(path)
        .context(format!("Failed to read track file: {}", path.display()))?;
    let tracks: Vec<Track> = serde_json::from_str(&contents)
        .context(format!("Failed to parse track file: {}", path.display()))?;

    Ok(TrackSequence::new(tracks).with_metadata(SequenceMetadata {
        source: Some(path.display().to_string()),
        generated_at: Some(Utc::now()),
    }))
}

fn print_result(result: &UpdateResult) {
    let diff = &result.diff;
    match result.outcome {
        UpdateOutcome::Unchanged => {
            println!("'{}' is already up to date", result.playlist.name);
            return;
        }
        UpdateOutcome::Preview => {
            println!("Dry run for '{}':", result.playlist.name);
            for op in &diff.operations {
                println!("  {}", op);
            }
        }
        UpdateOutcome::Applied => {
            println!(
                "Updated '{}': {} added, {} removed, {} moved, {} API calls",
                result.playlist.name,
                result.tracks_added,
                result.tracks_removed,
                result.tracks_moved,
                result.api_calls_made
            );
        }
    }

    println!(
        "Diff: {} add, {} remove, {} move, estimated {} API calls, confidence {:.2}",
        diff.count(OperationKind::Add),
        diff.count(OperationKind::Remove),
        diff.count(OperationKind::Move),
        diff.api_call_estimate,
        diff.confidence_score
    );
    if result.conflicts > 0 {
        println!("Conflicts: {}", result.conflicts);
    }
    for error in &result.errors {
        println!("Error: {}", error);
    }
}

async fn run_update(config: &Config, database: Arc<Database>, args: UpdateArgs) -> Result<()> {
    let target = read_tracks(&args.target)?;

    let playlist = match (args.playlist_id, args.external_id) {
        (Some(id), _) => PlaylistRef::Internal(id),
        (None, Some(external_id)) => PlaylistRef::Connector {
            connector: args.connector,
            external_id,
        },
        (None, None) => bail!("Either --playlist-id or --external-id is required"),
    };

    let defaults = config.update_defaults();
    let options = UpdateOptions {
        target: args.mode,
        conflict_policy: args.conflict_policy,
        strategy: args.strategy,
        dry_run: args.dry_run,
        batch_size: args.batch_size.unwrap_or(defaults.batch_size),
        max_api_calls: args.max_api_calls.unwrap_or(defaults.max_api_calls),
        sync_external: !args.no_external_sync,
        fail_on_track_error: args.fail_on_track_error,
    };

    let mut orchestrator = UpdateOrchestrator::new(
        Arc::new(SeaPlaylistRepository::new(database.clone())),
        Arc::new(SeaTrackRepository::new(database)),
        config.sync.max_batch_size,
    );
    match config.spotify_access_token() {
        Some(token) => {
            let client = SpotifyWebClient::new(&config.spotify.api_base_url, token)?;
            orchestrator = orchestrator.with_service(Arc::new(SpotifySyncService::new(client)));
        }
        None => tracing::debug!("No Spotify access token configured, Spotify sync disabled"),
    }

    let cancellation = CancellationToken::new();
    let ctrl_c = {
        let cancellation = cancellation.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Cancelling update");
                cancellation.cancel();
            }
        })
    };

    let result = orchestrator
        .execute_with_cancellation(UpdateCommand::new(playlist, target, options), cancellation)
        .await;
    ctrl_c.abort();

    print_result(&result?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let args = Args::parse();

    if let Commands::Config(command) = &args.command {
        let path = args
            .config
            .clone()
            .or_else(Config::config_path)
            .ok_or_eyre("No default config path found")?;
        match command {
            ConfigCommands::CreateDefault => {
                Config::create_default(&path)?;
                println!("Created {}", path.display());
            }
            ConfigCommands::Path => println!("{}", path.display()),
        }
        return Ok(());
    }

    let config =
        Config::load(args.config.as_deref()).wrap_err("Failed to load playlist-sync config")?;
    let _telemetry = init_tracing(SERVICE_NAME, &config.telemetry, args.log_level.as_deref())?;

    tracing::debug!("Opening database at: {}", config.database_path().display());
    let database = Arc::new(Database::open(&config.database_path()).await?);

    match args.command {
        Commands::Update(update) => run_update(&config, database, update).await?,
        Commands::Playlist(PlaylistCommands::Create {
            name,
            description,
            tracks,
            connector,
            external_id,
            version_token,
        }) => {
            let mut playlist = Playlist::new(name);
            playlist.description = description;
            if let Some(path) = tracks {
                playlist.tracks = read_tracks(&path)?;
            }
            if let (Some(connector), Some(external_id)) = (connector, external_id) {
                playlist.connector_ids.insert(connector, external_id);
                if let Some(token) = version_token {
                    playlist.metadata.version_tokens.insert(connector, token);
                }
            }

            let saved = SeaPlaylistRepository::new(database).save(&playlist).await?;
            println!(
                "Created playlist #{} '{}' with {} tracks",
                saved.id,
                saved.name,
                saved.tracks.len()
            );
        }
        Commands::Config(_) => {}
    }

    Ok(())
}
