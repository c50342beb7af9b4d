//! Population density overlay with a fetch-once, toggle-forever cache.
//!
//! The first activation fetches the raster locator, then the raster itself,
//! and decodes it. Later activations flip visibility without touching the
//! network. Overlapping activations while a fetch is running collapse into
//! that single fetch.

use std::sync::Arc;

use bevy::prelude::*;
use bevy::tasks::{IoTaskPool, Task, block_on, futures_lite::future};

use crate::backend::{Backend, FetchError, SatelliteSource};
use crate::control::{Alert, ControlCommand, ControlSet};

/// Result of asking the cache to activate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Activation {
    /// Resource already cached; overlay is now active
    Activated,
    /// No resource yet; caller must start the fetch
    FetchStarted,
    /// A fetch is already running; nothing to do
    AlreadyFetching,
}

#[derive(Clone, Debug, PartialEq)]
enum Phase<T> {
    Empty,
    Fetching,
    Ready(T),
}

/// On/off overlay state plus a lazily fetched resource.
///
/// Once populated the resource is never fetched again.
#[derive(Resource, Clone, Debug, PartialEq)]
pub struct OverlayCache<T: Send + Sync + 'static> {
    active: bool,
    /// Whether the user still wants the overlay when a running fetch lands
    wanted: bool,
    phase: Phase<T>,
}

impl<T: Send + Sync + 'static> Default for OverlayCache<T> {
    fn default() -> Self {
        Self {
            active: false,
            wanted: false,
            phase: Phase::Empty,
        }
    }
}

impl<T: Send + Sync + 'static> OverlayCache<T> {
    pub fn activate(&mut self) -> Activation {
        self.wanted = true;
        match self.phase {
            Phase::Ready(_) => {
                self.active = true;
                Activation::Activated
            }
            Phase::Fetching => Activation::AlreadyFetching,
            Phase::Empty => {
                self.phase = Phase::Fetching;
                Activation::FetchStarted
            }
        }
    }

    /// Hide the overlay. The cached resource is kept.
    pub fn deactivate(&mut self) {
        self.wanted = false;
        self.active = false;
    }

    /// Record the outcome of the fetch started by [`Self::activate`].
    ///
    /// Success caches the resource and activates unless the user switched the
    /// overlay off while it was loading. Failure rolls back to inactive and
    /// unfetched so a later activation retries.
    pub fn complete<E>(&mut self, result: Result<T, E>) -> Result<(), E> {
        match result {
            Ok(resource) => {
                self.phase = Phase::Ready(resource);
                self.active = self.wanted;
                Ok(())
            }
            Err(err) => {
                self.phase = Phase::Empty;
                self.active = false;
                self.wanted = false;
                Err(err)
            }
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn is_fetching(&self) -> bool {
        matches!(self.phase, Phase::Fetching)
    }

    /// Whether the user still wants the overlay shown.
    pub fn is_wanted(&self) -> bool {
        self.wanted
    }

    pub fn resource(&self) -> Option<&T> {
        match &self.phase {
            Phase::Ready(resource) => Some(resource),
            _ => None,
        }
    }
}

/// Decoded RGBA8 raster.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecodedRaster {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

/// Decode PNG or JPEG bytes to RGBA8.
pub fn decode_raster(bytes: &[u8]) -> Result<DecodedRaster, FetchError> {
    let image = image::load_from_memory(bytes).map_err(|e| FetchError::Decode(e.to_string()))?;
    let rgba = image.to_rgba8();
    Ok(DecodedRaster {
        width: rgba.width(),
        height: rgba.height(),
        rgba: rgba.into_raw(),
    })
}

/// Population overlay state.
pub type PopulationOverlay = OverlayCache<Arc<DecodedRaster>>;

/// Locator fetch, resource fetch and decode, in that order.
pub fn fetch_population_raster(
    source: &dyn SatelliteSource,
) -> Result<Arc<DecodedRaster>, FetchError> {
    let locator = source.population_density_locator()?;
    let bytes = source.fetch_resource(&locator)?;
    decode_raster(&bytes).map(Arc::new)
}

/// Running overlay fetch, if any.
#[derive(Resource, Default)]
pub struct OverlayFetch(Option<Task<Result<Arc<DecodedRaster>, FetchError>>>);

/// Plugin wiring the population overlay to the control surface.
pub struct OverlayPlugin;

impl Plugin for OverlayPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<PopulationOverlay>()
            .init_resource::<OverlayFetch>()
            .add_systems(Update, apply_overlay_commands.in_set(ControlSet))
            .add_systems(Update, collect_overlay_fetch.after(ControlSet));
    }
}

fn apply_overlay_commands(
    mut commands: MessageReader<ControlCommand>,
    mut overlay: ResMut<PopulationOverlay>,
    mut fetch: ResMut<OverlayFetch>,
    backend: Res<Backend>,
) {
    for command in commands.read() {
        let activate = match command {
            ControlCommand::SetPopulationOverlay(on) => *on,
            ControlCommand::TogglePopulationOverlay => !(overlay.is_active() || overlay.is_fetching()),
            _ => continue,
        };

        if !activate {
            overlay.deactivate();
            info!("Population overlay off");
            continue;
        }

        match overlay.activate() {
            Activation::Activated => info!("Population overlay on (cached)"),
            Activation::AlreadyFetching => debug!("Population overlay fetch already running"),
            Activation::FetchStarted => {
                info!("Fetching population overlay");
                let source = backend.source();
                fetch.0 = Some(
                    IoTaskPool::get().spawn(async move { fetch_population_raster(source.as_ref()) }),
                );
            }
        }
    }
}

fn collect_overlay_fetch(
    mut overlay: ResMut<PopulationOverlay>,
    mut fetch: ResMut<OverlayFetch>,
    mut alert: ResMut<Alert>,
) {
    let Some(task) = fetch.0.as_mut() else {
        return;
    };
    let Some(result) = block_on(future::poll_once(task)) else {
        return;
    };
    fetch.0 = None;

    let wanted = overlay.is_wanted();
    match overlay.complete(result) {
        Ok(()) => {
            if let Some(raster) = overlay.resource() {
                info!(
                    "Population overlay ready ({}x{})",
                    raster.width, raster.height
                );
            }
        }
        Err(err) if wanted => {
            error!("Population overlay failed: {err}");
            alert.raise(format!("Could not load the population overlay: {err}"));
        }
        // Switched off while loading; nobody is waiting for it
        Err(err) => warn!("Population overlay failed after it was turned off: {err}"),
    }
}
