//! Listing browser demo binary
//!
//! Drives a browser against an in-memory map surface and prints every
//! command the surface receives. Listings come from the REST source when
//! `SPACEMAP_LISTINGS_URL` is set, from a built-in catalog otherwise.

use spacemap_browser::config::MapConfig;
use spacemap_browser::mocks::{MockListingSource, MockMapProvider};
use spacemap_browser::{
    BrowserEnvironment, ContainerId, Listing, ListingBrowser, ListingSource, RestListingSource,
    SelectionOrigin, SurfaceEvent,
};
use spacemap_runtime::metrics::MetricsServer;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const SETTLE: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = MapConfig::from_env()?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.observability.log_filter.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut metrics = config.observability.metrics_addr.map(MetricsServer::new);
    if let Some(server) = metrics.as_mut() {
        server.start()?;
        spacemap_browser::metrics::describe_metrics();
    }

    match config.listings.clone() {
        Some(source) => {
            tracing::info!(table = %source.table, "Reading listings over REST");
            run(config, RestListingSource::new(&source)).await?;
        },
        None => run(config, MockListingSource::new(catalog())).await?,
    }

    if let Some(rendered) = metrics.as_ref().and_then(MetricsServer::render) {
        println!("\n=== Metrics ===\n{rendered}");
    }
    Ok(())
}

fn catalog() -> Vec<Listing> {
    vec![
        Listing::new("1", "Tribeca Loft", 75.0, "New York, NY").at(40.71, -74.01),
        Listing::new("2", "Arts District Venue", 200.0, "Los Angeles, CA").at(34.05, -118.24),
        Listing::new("3", "Rooftop Without Address", 120.0, "Chicago, IL"),
    ]
}

async fn run<L>(config: MapConfig, source: L) -> anyhow::Result<()>
where
    L: ListingSource + Clone + 'static,
{
    let provider = MockMapProvider::available();
    let browser = ListingBrowser::new(config, BrowserEnvironment::new(provider.clone(), source));

    println!("=== Listing Browser Demo ===\n");

    browser.mount(ContainerId::new("map")).await?;
    browser.settle(SETTLE).await?;
    browser.surface_event(SurfaceEvent::Loaded).await?;
    browser.settle(SETTLE).await?;

    let listings = browser.state(|s| s.listings.len()).await;
    println!("Listings fetched: {listings}");
    println!("Markers on the map: {:?}", browser.live_markers());

    let Some(surface) = provider.surface() else {
        anyhow::bail!("no surface was constructed");
    };

    // Click the second marker, as a user would.
    if let Some(marker) = surface.live_markers().get(1).copied() {
        println!("\n>>> Clicking {marker}");
        browser.surface_event(SurfaceEvent::MarkerClicked { marker }).await?;
        browser.settle(SETTLE).await?;
    }

    // Then pick the first listing from the list view.
    if let Some(first) = browser.state(|s| s.listings.first().map(|l| l.id.clone())).await {
        println!(">>> Selecting {first} from the list");
        browser.select(Some(first), SelectionOrigin::ListRow).await?;
        browser.settle(SETTLE).await?;
    }

    println!("\nSurface commands:");
    for command in surface.commands() {
        println!("  {command:?}");
    }

    browser.unmount().await?;
    browser.settle(SETTLE).await?;
    println!("\nUnmounted, surface destroyed: {}", surface.is_destroyed());
    Ok(())
}
