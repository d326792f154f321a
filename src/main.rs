// Copyright 2025 Chris Custine
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

mod aviation_data;
mod config;
mod photo_cache;
mod render;
mod weather;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use log::{info, warn};
use tokio::io::{AsyncBufReadExt, BufReader};
use traffic_engine::viewport::resolve_focus;
use traffic_engine::window::load_activity;
use traffic_engine::{
    ActivityKind, AirportCatalog, AirportFeed, HttpFeed, LatLng, MapFocus, RecomputeScheduler, TzfResolver,
    ViewportBounds,
};

use config::{AppConfig, ViewportConfig};
use photo_cache::{PhotoCache, MAX_PHOTOS};
use weather::WeatherSummary;

type AppResult<T> = Result<T, Box<dyn std::error::Error>>;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Traffic proxy base URL
    #[arg(long, global = true, env = config::FEED_URL_ENV)]
    feed_url: Option<String>,

    /// Directory holding airports.csv
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Follow the map: read viewport changes from stdin and print intensity frames
    Watch {
        /// Initial focus: "lat,lng" or an IATA code
        #[arg(long)]
        focus: Option<String>,

        /// Maximum airports listed per frame
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Show weather and today's activity for one airport
    Airport {
        /// ICAO ident or IATA code
        code: String,

        /// Show arrivals instead of departures
        #[arg(long)]
        arrivals: bool,

        /// Download airport photos into the cache
        #[arg(long)]
        images: bool,
    },
    /// Find airports by name, IATA or GPS code
    Search { query: String },
    /// Print the intensity legend
    Legend,
    /// Show the active configuration
    Config {
        /// Write the configuration file with current values
        #[arg(long)]
        save: bool,
    },
}

#[tokio::main]
async fn main() -> AppResult<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let mut config = AppConfig::load().unwrap_or_else(|e| {
        warn!("Failed to load configuration, using defaults: {}", e);
        AppConfig::default()
    });
    if let Some(url) = cli.feed_url {
        config.feed_url = url;
    }
    if let Some(dir) = cli.data_dir {
        config.data_dir = Some(dir);
    }

    match cli.command {
        Commands::Watch { focus, limit } => watch(&config, focus.as_deref(), limit).await,
        Commands::Airport { code, arrivals, images } => airport(&config, &code, arrivals, images).await,
        Commands::Search { query } => search(&config, &query).await,
        Commands::Legend => {
            print!(
                "{}",
                render::format_legend(&config.thresholds(), config.traffic_half_window_minutes)
            );
            Ok(())
        }
        Commands::Config { save } => show_config(&config, save),
    }
}

async fn load_catalog(config: &AppConfig) -> AppResult<Arc<AirportCatalog>> {
    let catalog = aviation_data::load_or_download(&config.data_dir()).await?;
    if catalog.is_empty() {
        warn!("Airport catalog is empty");
    }
    Ok(Arc::new(catalog))
}

async fn watch(config: &AppConfig, focus: Option<&str>, limit: usize) -> AppResult<()> {
    let catalog = load_catalog(config).await?;
    let feed = Arc::new(HttpFeed::new(config.feed_config())?);
    let thresholds = config.thresholds();
    info!("Using traffic feed {} ({})", feed.base_url(), AppConfig::feed_url_source());

    let scheduler = RecomputeScheduler::spawn(config.scheduler_config(), Arc::clone(&catalog), feed);

    let initial = match focus {
        Some(query) => focus_bounds(&catalog, query, &config.initial_viewport).unwrap_or_else(|| {
            warn!("Unknown focus '{}', using default view", query);
            config.initial_bounds()
        }),
        None => config.initial_bounds(),
    };
    scheduler.viewport_changed(initial);

    println!("Enter bounds as 'south west north east', 'focus <lat,lng|IATA>', 'refresh' or 'quit'.");

    let mut visible = scheduler.subscribe_visible();
    let mut intensity = scheduler.subscribe_intensity();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = &mut ctrl_c => break,
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };
                match parse_command(&line) {
                    Some(WatchCommand::Quit) => break,
                    Some(WatchCommand::Refresh) => scheduler.request_refresh(),
                    Some(WatchCommand::Bounds(bounds)) => scheduler.viewport_changed(bounds),
                    Some(WatchCommand::Focus(query)) => {
                        match focus_bounds(&catalog, &query, &config.initial_viewport) {
                            Some(bounds) => scheduler.viewport_changed(bounds),
                            None => println!("Unknown focus '{query}'"),
                        }
                    }
                    None if line.trim().is_empty() => {}
                    None => println!("Unrecognised input '{}'", line.trim()),
                }
            }
            Ok(()) = visible.changed() => {
                print!("{}", render::format_frame(&scheduler.frame(&thresholds), limit));
            }
            Ok(()) = intensity.changed() => {
                print!("{}", render::format_frame(&scheduler.frame(&thresholds), limit));
                println!("({})", render::format_status(&scheduler.refresh_status()));
            }
        }
    }

    scheduler.shutdown().await;
    Ok(())
}

async fn airport(config: &AppConfig, code: &str, arrivals: bool, images: bool) -> AppResult<()> {
    let catalog = load_catalog(config).await?;
    let Some(airport) = catalog.lookup(code) else {
        println!("No large airport found for '{code}'");
        return Ok(());
    };
    let feed = HttpFeed::new(config.feed_config())?;
    let resolver = TzfResolver::new();
    let kind = if arrivals {
        ActivityKind::Arrivals
    } else {
        ActivityKind::Departures
    };

    println!("{}", render::format_airport_header(airport));

    let (weather, activity) = tokio::join!(
        feed.weather(airport.position()),
        load_activity(&feed, airport, kind, &resolver, chrono::Utc::now(), &chrono::Local),
    );

    // Each section fails on its own
    match weather {
        Ok(report) => println!("  Weather: {}", WeatherSummary::from_report(&report)),
        Err(e) => println!("  Weather unavailable: {e}"),
    }
    match activity {
        Ok(report) => print!("{}", render::format_activity(&report, &chrono::Local)),
        Err(e) => println!("Activity unavailable: {e}"),
    }

    if images {
        show_photos(&feed, &airport.name).await;
    }
    Ok(())
}

async fn show_photos(feed: &HttpFeed, name: &str) {
    let urls = match feed.airport_images(name).await {
        Ok(urls) => urls,
        Err(e) => {
            println!("Photos unavailable: {e}");
            return;
        }
    };
    if urls.is_empty() {
        println!("No photos available.");
        return;
    }

    let cache = match PhotoCache::new() {
        Ok(cache) => cache,
        Err(e) => {
            println!("Photo cache unavailable: {e}");
            return;
        }
    };
    for url in urls.iter().take(MAX_PHOTOS) {
        match cache.fetch(url).await {
            Ok(path) => println!("  Photo: {}", path.display()),
            Err(e) => warn!("Failed to fetch photo {}: {}", url, e),
        }
    }
}

async fn search(config: &AppConfig, query: &str) -> AppResult<()> {
    let catalog = load_catalog(config).await?;
    let results = catalog.search(query);
    if results.is_empty() {
        println!("No airports match '{query}'");
    }
    for airport in results {
        println!("{:<5} {:<8} {} ({})", airport.ident, airport.code_label(), airport.name, airport.iso_country);
    }
    Ok(())
}

fn show_config(config: &AppConfig, save: bool) -> AppResult<()> {
    if let Ok(path) = AppConfig::get_config_path() {
        println!("Config file: {}", path.display());
    }
    println!("Feed URL: {} ({})", config.resolve_feed_url(), AppConfig::feed_url_source());
    println!("Data directory: {}", config.data_dir().display());
    println!("{}", serde_json::to_string_pretty(config)?);
    if save {
        config.save()?;
        println!("Configuration saved");
    }
    Ok(())
}

#[derive(Debug, PartialEq)]
enum WatchCommand {
    Bounds(ViewportBounds),
    Focus(String),
    Refresh,
    Quit,
}

fn parse_command(line: &str) -> Option<WatchCommand> {
    let line = line.trim();
    match line {
        "quit" | "exit" => return Some(WatchCommand::Quit),
        "refresh" => return Some(WatchCommand::Refresh),
        _ => {}
    }
    if let Some(query) = line.strip_prefix("focus ") {
        return Some(WatchCommand::Focus(query.trim().to_string()));
    }

    let values: Vec<f64> = line
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .map(str::parse)
        .collect::<Result<_, _>>()
        .ok()?;
    let [south, west, north, east] = values[..] else {
        return None;
    };
    ViewportBounds::new(LatLng::new(south, west), LatLng::new(north, east))
        .ok()
        .map(WatchCommand::Bounds)
}

fn focus_bounds(catalog: &AirportCatalog, query: &str, view: &ViewportConfig) -> Option<ViewportBounds> {
    let MapFocus { center, zoom, selected } = resolve_focus(catalog, query)?;
    if let Some(ident) = selected {
        info!("Focused on {}", ident);
    }
    ViewportBounds::from_center_zoom(center, zoom, view.width_px, view.height_px).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use traffic_engine::Airport;

    #[test]
    fn test_parse_bounds_line() {
        let expected = ViewportBounds::new(LatLng::new(30.0, -90.0), LatLng::new(35.0, -80.0)).unwrap();
        assert_eq!(parse_command("30 -90 35 -80"), Some(WatchCommand::Bounds(expected)));
        assert_eq!(parse_command(" 30, -90, 35, -80 "), Some(WatchCommand::Bounds(expected)));
    }

    #[test]
    fn test_parse_rejects_bad_bounds() {
        assert_eq!(parse_command("35 -90 30 -80"), None);
        assert_eq!(parse_command("30 -90 35"), None);
        assert_eq!(parse_command("hello"), None);
    }

    #[test]
    fn test_parse_keywords() {
        assert_eq!(parse_command("refresh"), Some(WatchCommand::Refresh));
        assert_eq!(parse_command("quit"), Some(WatchCommand::Quit));
        assert_eq!(parse_command("focus ATL"), Some(WatchCommand::Focus("ATL".to_string())));
    }

    #[test]
    fn test_focus_on_airport_contains_it() {
        let catalog = AirportCatalog::new(vec![
            Airport::new("KATL", "Hartsfield-Jackson Atlanta International Airport", 33.6367, -84.4281)
                .with_iata("ATL"),
        ]);
        let bounds = focus_bounds(&catalog, "atl", &ViewportConfig::default()).unwrap();
        assert!(bounds.contains(LatLng::new(33.6367, -84.4281)));
        assert!(focus_bounds(&catalog, "ZZZ", &ViewportConfig::default()).is_none());
    }
}
