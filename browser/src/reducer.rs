//! Listing browser reducer.
//!
//! Every decision the synchronizer makes lives here: surface lifecycle,
//! which fetch result applies, when a render cycle runs and what it draws.
//! Surface commands are issued by effects, through the marker layer.
//!
//! # Render cycle
//!
//! Whenever the listing set or the selection changes while the surface is
//! ready, the reducer bumps the render generation, plans the full marker set
//! and the focus flight with [`sync`](crate::sync), and returns them as one
//! `Effect::Sequential`. Markers are therefore always synchronized before
//! the camera moves, and a cycle superseded by a newer one is dropped by the
//! layer instead of overwriting it.
//!
//! # Fetch races
//!
//! Each search takes a fresh [`RequestId`](crate::state::RequestId). Only a
//! result carrying the most recently issued id is applied, so a slow early
//! fetch can never overwrite a faster later one.

use crate::actions::{BrowserAction, SelectionOrigin};
use crate::config::MapConfig;
use crate::effects;
use crate::environment::BrowserEnvironment;
use crate::error::MapError;
use crate::listing::ListingFilter;
use crate::providers::{ListingSource, MapProvider, SurfaceOptions};
use crate::state::{BrowserState, SurfacePhase};
use crate::sync;
use spacemap_core::effect::Effect;
use spacemap_core::reducer::Reducer;
use spacemap_core::{SmallVec, delay, smallvec};
use spacemap_runtime::RetryPolicy;
use std::sync::Arc;

/// Listing browser reducer.
#[derive(Debug, Clone)]
pub struct BrowserReducer<P, L> {
    config: Arc<MapConfig>,
    retry: RetryPolicy,
    _phantom: std::marker::PhantomData<(P, L)>,
}

impl<P, L> BrowserReducer<P, L> {
    /// Create a reducer with the design defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(MapConfig::default())
    }

    /// Create a reducer with a custom configuration.
    #[must_use]
    pub fn with_config(config: MapConfig) -> Self {
        Self {
            retry: config.provider.retry_policy(),
            config: Arc::new(config),
            _phantom: std::marker::PhantomData,
        }
    }

    /// Configuration in use.
    #[must_use]
    pub fn config(&self) -> &MapConfig {
        &self.config
    }

    fn surface_options(&self, state: &BrowserState) -> Option<SurfaceOptions> {
        let camera = &self.config.camera;
        state.container.clone().map(|container| SurfaceOptions {
            container,
            center: camera.center,
            zoom: camera.zoom,
            style: camera.style.clone(),
            access_token: self.config.provider.access_token.clone(),
        })
    }
}

impl<P, L> Default for BrowserReducer<P, L> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P, L> BrowserReducer<P, L>
where
    P: MapProvider + Clone + 'static,
    L: ListingSource + Clone + 'static,
{
    /// Move through `ProviderReady` to `SurfaceInitializing` and construct
    /// the surface.
    fn construct_surface(
        &self,
        state: &mut BrowserState,
        env: &BrowserEnvironment<P, L>,
    ) -> Effect<BrowserAction> {
        let Some(options) = self.surface_options(state) else {
            tracing::warn!("No display container, surface not constructed");
            return Effect::None;
        };
        if state.phase != SurfacePhase::ProviderReady && !state.transition(SurfacePhase::ProviderReady) {
            return Effect::None;
        }
        if !state.transition(SurfacePhase::SurfaceInitializing) {
            return Effect::None;
        }
        effects::initialize_surface(env.provider.clone(), Arc::clone(&env.layer), options)
    }

    /// Start a fetch that supersedes any in flight.
    fn start_fetch(
        state: &mut BrowserState,
        env: &BrowserEnvironment<P, L>,
        filter: ListingFilter,
    ) -> Effect<BrowserAction> {
        let request = state.fetch.begin();
        tracing::debug!(%request, ?filter, "Fetching listings");
        state.filter = filter.clone();
        effects::fetch_listings(env.listings.clone(), request, filter)
    }

    /// Plan and issue one render cycle, if the surface is ready.
    fn render_cycle(
        &self,
        state: &mut BrowserState,
        env: &BrowserEnvironment<P, L>,
    ) -> Effect<BrowserAction> {
        if !state.phase.is_ready() {
            return Effect::None;
        }
        state.render_generation += 1;
        let generation = state.render_generation;
        let selection = state.selection.as_ref();

        let plan = sync::plan_markers(generation, &state.listings, selection, &self.config);
        let flight = sync::plan_focus(generation, &state.listings, selection, &self.config.focus);
        if let (Some(selected), None) = (selection, &flight) {
            tracing::debug!(listing = %selected, "Selection not on the map, focus skipped");
        }

        effects::render(Arc::clone(&env.layer), plan, flight)
    }
}

impl<P, L> Reducer for BrowserReducer<P, L>
where
    P: MapProvider + Clone + 'static,
    L: ListingSource + Clone + 'static,
{
    type State = BrowserState;
    type Action = BrowserAction;
    type Environment = BrowserEnvironment<P, L>;

    #[allow(clippy::too_many_lines)] // One arm per action reads best as a single match
    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        if state.phase.is_destroyed() {
            tracing::trace!(?action, "View destroyed, ignoring action");
            return smallvec![Effect::None];
        }

        match action {
            // ═══════════════════════════════════════════════════════════════
            // Mount: load the provider, fetch the initial listing set
            // ═══════════════════════════════════════════════════════════════
            BrowserAction::Mount { container } => {
                if state.phase != SurfacePhase::Uninitialized {
                    tracing::warn!(phase = %state.phase, "Already mounted");
                    return smallvec![Effect::None];
                }
                tracing::info!(%container, "Mounting listing browser");
                state.container = Some(container);

                let surface = if env.provider.is_available() {
                    self.construct_surface(state, env)
                } else {
                    state.transition(SurfacePhase::ProviderLoading);
                    effects::load_provider(env.provider.clone())
                };
                let filter = state.filter.clone();
                smallvec![surface, Self::start_fetch(state, env, filter)]
            },

            // ═══════════════════════════════════════════════════════════════
            // ProviderLoaded: construct the surface
            // ═══════════════════════════════════════════════════════════════
            BrowserAction::ProviderLoaded => {
                if state.phase != SurfacePhase::ProviderLoading {
                    tracing::debug!(phase = %state.phase, "Ignoring provider load");
                    return smallvec![Effect::None];
                }
                tracing::debug!("Map provider loaded");
                state.provider_failures = 0;
                smallvec![self.construct_surface(state, env)]
            },

            // ═══════════════════════════════════════════════════════════════
            // ProviderLoadFailed: stay loading, maybe schedule a retry
            // ═══════════════════════════════════════════════════════════════
            BrowserAction::ProviderLoadFailed { reason } => {
                if state.phase != SurfacePhase::ProviderLoading {
                    return smallvec![Effect::None];
                }
                metrics::counter!(crate::metrics::PROVIDER_LOAD_FAILURES).increment(1);
                state.provider_failures += 1;
                state.last_error = Some(MapError::ProviderLoad(reason.clone()));

                let retries_used = state.provider_failures - 1;
                if self.retry.should_retry(retries_used) {
                    let duration = self.retry.delay_for_attempt(retries_used);
                    tracing::warn!(%reason, attempt = state.provider_failures, ?duration, "Map provider failed to load, retrying");
                    smallvec![delay! {
                        duration: duration,
                        action: BrowserAction::RetryProviderLoad
                    }]
                } else {
                    tracing::error!(%reason, attempts = state.provider_failures, "Map provider failed to load");
                    smallvec![Effect::None]
                }
            },

            // ═══════════════════════════════════════════════════════════════
            // RetryProviderLoad: another attempt
            // ═══════════════════════════════════════════════════════════════
            BrowserAction::RetryProviderLoad => {
                if state.phase != SurfacePhase::ProviderLoading {
                    return smallvec![Effect::None];
                }
                tracing::debug!(attempt = state.provider_failures + 1, "Retrying map provider load");
                smallvec![effects::load_provider(env.provider.clone())]
            },

            // ═══════════════════════════════════════════════════════════════
            // SurfaceLoaded: ready, render whatever is already known
            // ═══════════════════════════════════════════════════════════════
            BrowserAction::SurfaceLoaded => {
                if state.phase != SurfacePhase::SurfaceInitializing
                    || !state.transition(SurfacePhase::SurfaceReady)
                {
                    tracing::debug!(phase = %state.phase, "Ignoring surface load");
                    return smallvec![Effect::None];
                }
                tracing::info!(listings = state.listings.len(), "Map surface ready");
                state.last_error = None;
                smallvec![self.render_cycle(state, env)]
            },

            // ═══════════════════════════════════════════════════════════════
            // SurfaceFailed: degrade, never crash
            // ═══════════════════════════════════════════════════════════════
            BrowserAction::SurfaceFailed { reason } => {
                match state.phase {
                    SurfacePhase::ProviderReady | SurfacePhase::SurfaceInitializing => {
                        tracing::error!(%reason, "Map surface failed to initialize");
                        state.last_error = Some(MapError::SurfaceInit(reason));
                    },
                    SurfacePhase::SurfaceReady => {
                        tracing::error!(%reason, "Map surface error");
                    },
                    _ => tracing::debug!(%reason, phase = %state.phase, "Ignoring surface error"),
                }
                smallvec![Effect::None]
            },

            // ═══════════════════════════════════════════════════════════════
            // Unmount: release everything, ignore outstanding fetches
            // ═══════════════════════════════════════════════════════════════
            BrowserAction::Unmount => {
                state.transition(SurfacePhase::Destroyed);
                state.fetch.cancel();
                tracing::info!("Listing browser unmounted");
                smallvec![effects::teardown(Arc::clone(&env.layer))]
            },

            // ═══════════════════════════════════════════════════════════════
            // Search: new filter, new request
            // ═══════════════════════════════════════════════════════════════
            BrowserAction::Search { filter } => {
                smallvec![Self::start_fetch(state, env, filter)]
            },

            // ═══════════════════════════════════════════════════════════════
            // SearchThisArea: current filter, visible region
            // ═══════════════════════════════════════════════════════════════
            BrowserAction::SearchThisArea => {
                let Some(viewport) = state.viewport else {
                    tracing::debug!("No viewport reported yet, nothing to search");
                    return smallvec![Effect::None];
                };
                if viewport.wraps() {
                    tracing::debug!(
                        ?viewport,
                        "Viewport crosses the antimeridian, searching every longitude"
                    );
                }
                let filter = state.filter.clone().within(viewport.unwrapped());
                smallvec![Self::start_fetch(state, env, filter)]
            },

            // ═══════════════════════════════════════════════════════════════
            // ListingsLoaded: apply the latest set only
            // ═══════════════════════════════════════════════════════════════
            BrowserAction::ListingsLoaded {
                request,
                mut listings,
            } => {
                if !state.fetch.complete(request) {
                    tracing::warn!(%request, latest = ?state.fetch.latest(), "Discarding stale listing set");
                    metrics::counter!(crate::metrics::FETCH_STALE_DISCARDED).increment(1);
                    return smallvec![Effect::None];
                }

                let duplicates = sync::dedupe(&mut listings);
                if !duplicates.is_empty() {
                    tracing::warn!(?duplicates, "Dropped listings with duplicate ids");
                }
                tracing::info!(%request, count = listings.len(), "Listing set applied");
                state.listings = listings;
                state.listings_updated_at = Some(env.clock.now());

                smallvec![self.render_cycle(state, env)]
            },

            // ═══════════════════════════════════════════════════════════════
            // ListingsFailed: keep the current set
            // ═══════════════════════════════════════════════════════════════
            BrowserAction::ListingsFailed { request, reason } => {
                if !state.fetch.complete(request) {
                    tracing::debug!(%request, %reason, "Ignoring failure of a superseded fetch");
                    return smallvec![Effect::None];
                }
                tracing::warn!(%request, %reason, "Listing fetch failed");
                metrics::counter!(crate::metrics::FETCH_FAILED).increment(1);
                state.last_error = Some(MapError::ListingFetch(reason));
                smallvec![Effect::None]
            },

            // ═══════════════════════════════════════════════════════════════
            // SelectListing: one selection, whatever the input channel
            // ═══════════════════════════════════════════════════════════════
            BrowserAction::SelectListing { id, origin } => {
                if state.selection == id {
                    return smallvec![Effect::None];
                }
                match (&id, origin) {
                    (Some(listing), SelectionOrigin::MarkerClick) => {
                        tracing::debug!(%listing, "Marker clicked");
                    },
                    (Some(listing), _) => tracing::debug!(%listing, ?origin, "Listing selected"),
                    (None, _) => tracing::debug!(?origin, "Selection cleared"),
                }
                state.selection = id.clone();
                state.selection_sequence += 1;

                smallvec![
                    effects::notify_selection(
                        Arc::clone(&env.observer),
                        state.selection_sequence,
                        id
                    ),
                    self.render_cycle(state, env),
                ]
            },

            // ═══════════════════════════════════════════════════════════════
            // Marker hover: lazy popups
            // ═══════════════════════════════════════════════════════════════
            BrowserAction::MarkerHovered { marker } => {
                if !state.phase.is_ready() {
                    return smallvec![Effect::None];
                }
                smallvec![effects::show_popup(Arc::clone(&env.layer), marker)]
            },

            BrowserAction::MarkerUnhovered { marker } => {
                if !state.phase.is_ready() {
                    return smallvec![Effect::None];
                }
                smallvec![effects::hide_popup(Arc::clone(&env.layer), marker)]
            },

            // ═══════════════════════════════════════════════════════════════
            // ViewportChanged: remember and report upward
            // ═══════════════════════════════════════════════════════════════
            BrowserAction::ViewportChanged { bounds } => {
                state.viewport = Some(bounds);
                smallvec![effects::notify_viewport(Arc::clone(&env.observer), bounds)]
            },
        }
    }
}
