//! Serves the multiverse browser pages, or browses a listing in the terminal.
//!
//! Usage:
//! - `multiverse-server` serves the static pages until ctrl-c.
//! - `multiverse-server browse [character|episode|location]` prints the first
//!   page of a listing, then treats each stdin line as the search box value
//!   (an empty line returns to browsing).
//!
//! Configuration comes from the JSON file named by `MULTIVERSE_CONFIG` and
//! the `PORT`, `MULTIVERSE_API_URL`, `MULTIVERSE_STATIC_ROOT` and
//! `MULTIVERSE_SEARCH_CONCURRENCY` variables, which may also be set in `.env`.

use multiverse::{
    Character, ClientError, ClientResult, Entity, EntityKind, Episode, ListViewController,
    Location, MultiverseConfig, Server, TextRenderer,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match MultiverseConfig::from_env() {
        Ok(config) => config,
        Err(error) => {
            log::error!("invalid configuration: {error}");
            std::process::exit(2);
        }
    };

    let args: Vec<String> = std::env::args().skip(1).collect();
    let result = match args.first().map(String::as_str) {
        None | Some("serve") => serve(&config).await,
        Some("browse") => match parse_kind(args.get(1).map(String::as_str)) {
            Ok(EntityKind::Character) => browse::<Character>(&config).await,
            Ok(EntityKind::Episode) => browse::<Episode>(&config).await,
            Ok(EntityKind::Location) => browse::<Location>(&config).await,
            Err(error) => Err(error),
        },
        Some(other) => Err(ClientError::InvalidInput(format!("unknown command: {other}"))),
    };

    if let Err(error) = result {
        log::error!("{error}");
        std::process::exit(1);
    }
}

async fn serve(config: &MultiverseConfig) -> ClientResult<()> {
    let server = Server::start(&config.server).await?;
    log::info!(
        "serving {} on http://{} (api: {})",
        server.static_root().display(),
        server.addr(),
        config.api.base_url
    );

    if let Err(error) = tokio::signal::ctrl_c().await {
        log::warn!("failed to listen for ctrl-c: {error}");
    }
    log::info!("shutting down");
    server.stop().await;
    Ok(())
}

async fn browse<E: Entity>(config: &MultiverseConfig) -> ClientResult<()> {
    let renderer = TextRenderer::new(std::io::stdout());
    let mut controller = ListViewController::<E, _>::from_config(config, renderer)?;
    controller.load().await?;

    let (tx, rx) = mpsc::channel(16);
    let reader = tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if tx.send(line).await.is_err() {
                break;
            }
        }
    });
    controller.run_search_box(rx).await;
    let _ = reader.await;
    Ok(())
}

fn parse_kind(arg: Option<&str>) -> ClientResult<EntityKind> {
    match arg.unwrap_or("character") {
        "character" | "characters" => Ok(EntityKind::Character),
        "episode" | "episodes" => Ok(EntityKind::Episode),
        "location" | "locations" => Ok(EntityKind::Location),
        other => Err(ClientError::InvalidInput(format!("unknown listing: {other}"))),
    }
}
