mod display;

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, bail};
use clap::{Args, Parser, Subcommand};
use venuemap_core::config::LIST_PAGE_SIZE;
use venuemap_core::{Coordinate, MapConfig, ViewportBounds};
use venuemap_map::{MapController, MapHandle, MapState};
use venuemap_sync::{MemoryStore, RestClient, VenueStore};

#[derive(Parser)]
#[command(name = "venuemap", version, about = "Venue directory and map marker pipeline")]
struct Cli {
    #[command(flatten)]
    source: SourceArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct SourceArgs {
    /// Backend project URL, e.g. https://project.example.co
    #[arg(long, env = "VENUEMAP_URL", global = true)]
    url: Option<String>,

    /// Backend anon API key
    #[arg(long, env = "VENUEMAP_KEY", global = true, hide_env_values = true)]
    key: Option<String>,

    /// Read venues from a JSON export instead of the backend (takes precedence over --url)
    #[arg(long, global = true)]
    fixture: Option<PathBuf>,

    /// Per-request timeout in seconds (no timeout by default)
    #[arg(long, global = true)]
    timeout_secs: Option<u64>,
}

#[derive(Args)]
struct PipelineArgs {
    /// JSON file with a MapConfig (flags below override it)
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    page_size: Option<usize>,

    #[arg(long)]
    max_pages: Option<usize>,

    #[arg(long)]
    marker_limit: Option<usize>,
}

#[derive(Subcommand)]
enum Command {
    /// Bulk-load every venue and report what was fetched
    Load {
        #[command(flatten)]
        pipeline: PipelineArgs,
    },
    /// Load venues and list the markers visible in a viewport
    Map {
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,
        #[arg(long, allow_hyphen_values = true)]
        lon: f64,
        #[arg(long, default_value_t = 0.2)]
        lat_span: f64,
        #[arg(long, default_value_t = 0.2)]
        lon_span: f64,
        /// Keep only venues in this county
        #[arg(long)]
        region: Option<String>,
        /// Keep only venues in this local authority (requires --region)
        #[arg(long, requires = "region")]
        authority: Option<String>,
        /// Show the detail card for this venue id
        #[arg(long)]
        select: Option<i64>,
        #[command(flatten)]
        pipeline: PipelineArgs,
    },
    /// List the counties venues are recorded in
    Regions,
    /// List the local authorities within a county
    Authorities { region: String },
    /// List one page of venues ordered by id
    Venues {
        #[arg(long, default_value_t = 0)]
        page: usize,
    },
    /// Show the detail card for one venue
    Show { id: i64 },
    /// List one page of upcoming events
    Events {
        #[arg(long, default_value_t = 0)]
        page: usize,
    },
}

/// The configured store, plus the base URL photo paths resolve against.
struct Source {
    store: Arc<dyn VenueStore>,
    base_url: Option<String>,
}

impl SourceArgs {
    async fn open(&self) -> anyhow::Result<Source> {
        if let Some(path) = &self.fixture {
            let store = MemoryStore::from_json_file(path)
                .await
                .with_context(|| format!("reading fixture {}", path.display()))?;
            return Ok(Source {
                store: Arc::new(store),
                base_url: None,
            });
        }

        let (Some(url), Some(key)) = (&self.url, &self.key) else {
            bail!("set --url and --key (or VENUEMAP_URL / VENUEMAP_KEY), or pass --fixture");
        };
        let client = match self.timeout_secs {
            Some(secs) => RestClient::with_timeout(url.clone(), key.clone(), Duration::from_secs(secs))
                .context("building HTTP client")?,
            None => RestClient::new(url.clone(), key.clone()),
        };
        let base_url = client.base_url().to_string();
        Ok(Source {
            store: Arc::new(client),
            base_url: Some(base_url),
        })
    }
}

impl PipelineArgs {
    fn map_config(&self) -> anyhow::Result<MapConfig> {
        let mut config = match &self.config {
            Some(path) => read_config(path)?,
            None => MapConfig::default(),
        };
        if let Some(n) = self.page_size {
            config.page_size = n;
        }
        if let Some(n) = self.max_pages {
            config.max_pages = n;
        }
        if let Some(n) = self.marker_limit {
            config.marker_limit = n;
        }
        config.validate()?;
        Ok(config)
    }
}

fn read_config(path: &Path) -> anyhow::Result<MapConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing config {}", path.display()))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();
    tracing::info!("venuemap v{}", env!("CARGO_PKG_VERSION"));

    let cli = Cli::parse();
    let source = cli.source.open().await?;

    match cli.command {
        Command::Load { pipeline } => cmd_load(&source, pipeline.map_config()?).await,
        Command::Map {
            lat,
            lon,
            lat_span,
            lon_span,
            region,
            authority,
            select,
            pipeline,
        } => {
            let mut config = pipeline.map_config()?;
            config.initial_viewport = ViewportBounds::new(Coordinate::new(lat, lon), lat_span, lon_span);
            config.validate()?;
            cmd_map(&source, config, region, authority, select).await
        }
        Command::Regions => {
            for region in source.store.fetch_regions().await? {
                println!("{region}");
            }
            Ok(())
        }
        Command::Authorities { region } => {
            for authority in source.store.fetch_authorities(&region).await? {
                println!("{authority}");
            }
            Ok(())
        }
        Command::Venues { page } => {
            let venues = source
                .store
                .fetch_page(page_offset(page)?, LIST_PAGE_SIZE)
                .await?;
            display::print_venue_table(&venues)?;
            if venues.len() == LIST_PAGE_SIZE {
                eprintln!("  more venues on page {}", page + 1);
            }
            Ok(())
        }
        Command::Show { id } => {
            let Some(venue) = source.store.fetch_venue(id).await? else {
                bail!("no venue with id {id}");
            };
            let photo = source.base_url.as_deref().and_then(|base| venue.photo_url(base));
            display::print_venue_card(&venue, photo.as_deref())
        }
        Command::Events { page } => {
            let events = source
                .store
                .fetch_events(page_offset(page)?, LIST_PAGE_SIZE)
                .await?;
            display::print_events(&events);
            if events.len() == LIST_PAGE_SIZE {
                eprintln!("  more events on page {}", page + 1);
            }
            Ok(())
        }
    }
}

/// Row offset of a zero-based list page.
fn page_offset(page: usize) -> anyhow::Result<usize> {
    page.checked_mul(LIST_PAGE_SIZE)
        .with_context(|| format!("page {page} is out of range"))
}

/// Start a controller and wait for its initial bulk load, echoing progress.
async fn start_and_load(source: &Source, config: MapConfig) -> anyhow::Result<(MapHandle, MapState)> {
    let handle = MapController::spawn(Arc::clone(&source.store), config)?;
    let mut rx = handle.subscribe();
    loop {
        let state = rx.borrow_and_update().clone();
        if state.loads_completed > 0 && !state.is_loading {
            eprintln!();
            // A completed load leaves progress at 1.0; a failed one resets it.
            if let Some(error) = state.last_error.as_deref().filter(|_| state.loading_progress < 1.0) {
                bail!("venue load failed: {error}");
            }
            return Ok((handle, state));
        }
        eprint!(
            "\r  Loading venues... {:>5.1}% of page ceiling",
            state.loading_progress * 100.0
        );
        let _ = std::io::stderr().flush();
        rx.changed().await.context("map controller stopped during load")?;
    }
}

async fn cmd_load(source: &Source, config: MapConfig) -> anyhow::Result<()> {
    let start = Instant::now();
    let ceiling = config.max_records();
    let (_handle, state) = start_and_load(source, config).await?;

    let mapped = state
        .venues
        .iter()
        .filter(|v| v.coordinate().is_some())
        .count();
    println!("Loaded {} venues in {:.1}s", state.venues.len(), start.elapsed().as_secs_f64());
    println!("  with map position: {mapped}");
    if state.venues.len() >= ceiling {
        println!("  reached the {ceiling}-row load ceiling; later rows were not fetched");
    }
    Ok(())
}

async fn cmd_map(
    source: &Source,
    config: MapConfig,
    region: Option<String>,
    authority: Option<String>,
    select: Option<i64>,
) -> anyhow::Result<()> {
    let marker_limit = config.marker_limit;
    let (handle, _) = start_and_load(source, config).await?;

    if region.is_some() {
        handle.filter_venues(region, authority)?;
    }
    if let Some(id) = select {
        handle.select(id)?;
    }
    handle.flush().await?;
    let state = handle.snapshot();

    display::print_annotation_table(&state.annotations, state.selected.as_ref().map(|v| v.id))?;
    println!(
        "{} markers from {} venues",
        state.annotations.len(),
        state.venues.len()
    );
    if state.too_many_markers {
        println!("  more than {marker_limit} venues in view; showing the first {marker_limit}, zoom in to see the rest");
    }

    if let Some(id) = select {
        match &state.selected {
            Some(venue) => {
                println!();
                let photo = source.base_url.as_deref().and_then(|base| venue.photo_url(base));
                display::print_venue_card(venue, photo.as_deref())?;
            }
            None => eprintln!("  venue {id} is not in the loaded collection"),
        }
    }
    Ok(())
}
