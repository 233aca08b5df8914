#[cfg(target_arch = "wasm32")]
fn main() {
    console_error_panic_hook::set_once();
    if let Err(e) = listing_map_client::web::start() {
        tracing::error!(error = %e, "listing map failed to start");
    }
}

/// Replays a listings file through the engine against an in-memory map and logs what a user
/// would see: markers, clusters and the popups opened by clicking each cluster.
#[cfg(not(target_arch = "wasm32"))]
fn main() {
    use tracing_subscriber::EnvFilter;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let Some(path) = std::env::args().nth(1) else {
        tracing::error!("usage: listing-map-client <listings.json>");
        std::process::exit(2);
    };
    if let Err(e) = replay::run(&path) {
        tracing::error!(error = %e, "replay failed");
        std::process::exit(1);
    }
}

#[cfg(not(target_arch = "wasm32"))]
mod replay {
    use listing_map_client::ConfigError;
    use listing_map_client::provider::{HeadlessMap, MapProvider};
    use listing_map_client::surface::{HeadlessPopupSurface, HeadlessSidebar};
    use listing_map_client::{MapConfig, UiEvent, ViewCoordinator};
    use listing_map_shared::{LatLng, ListingBatch, ListingsPayload, RawListing};
    use thiserror::Error;

    const REPLAY_ZOOM: f64 = 12.0;

    #[derive(Debug, Error)]
    pub enum ReplayError {
        #[error(transparent)]
        Config(#[from] ConfigError),
        #[error("failed to read {path}: {source}")]
        Read {
            path: String,
            source: std::io::Error,
        },
        #[error("{path} is not a listings payload: {source}")]
        Payload {
            path: String,
            source: serde_json::Error,
        },
        #[error("map reported no viewport")]
        NoViewport,
    }

    /// Center the camera on the mean of every listing that has coordinates.
    fn initial_center(listings: &[RawListing]) -> LatLng {
        let points: Vec<LatLng> = listings
            .iter()
            .filter_map(|raw| Some(LatLng::new(raw.lat?, raw.lng?)))
            .filter(LatLng::is_valid)
            .collect();
        if points.is_empty() {
            return LatLng::new(0.0, 0.0);
        }
        let n = points.len() as f64;
        LatLng::new(
            points.iter().map(|p| p.lat).sum::<f64>() / n,
            points.iter().map(|p| p.lng).sum::<f64>() / n,
        )
    }

    pub fn run(path: &str) -> Result<(), ReplayError> {
        let config = MapConfig::from_env()?;
        let raw = std::fs::read_to_string(path).map_err(|source| ReplayError::Read {
            path: path.to_string(),
            source,
        })?;
        let batch = serde_json::from_str::<ListingsPayload>(&raw)
            .map_err(|source| ReplayError::Payload {
                path: path.to_string(),
                source,
            })?
            .decode();
        tracing::info!(
            path,
            count = batch.records.len(),
            undecodable = batch.undecodable,
            provider = ?config.provider,
            "loaded listings file"
        );

        let map = HeadlessMap::new(initial_center(&batch.records), REPLAY_ZOOM);
        let mut view = ViewCoordinator::new(
            config,
            map,
            HeadlessPopupSurface::default(),
            HeadlessSidebar::default(),
        );

        let queue = view.queue();
        queue.push(UiEvent::MapIdle);
        let requests = view.pump();
        let Some(request) = requests.last() else {
            return Err(ReplayError::NoViewport);
        };

        // Stand-in for the listings endpoint: bounding-box filter plus the result cap.
        let visible: Vec<RawListing> = batch
            .records
            .into_iter()
            .filter(|raw| match (raw.lat, raw.lng) {
                (Some(lat), Some(lng)) => request.bounds.contains(LatLng::new(lat, lng)),
                // Let the engine report listings it cannot place.
                _ => true,
            })
            .take(request.limit)
            .collect();
        queue.push(UiEvent::ListingsLoaded {
            generation: request.generation,
            result: Ok(ListingBatch {
                records: visible,
                undecodable: batch.undecodable,
            }),
        });
        view.pump();

        let clusters: Vec<_> = view
            .markers()
            .handles()
            .iter()
            .filter(|handle| handle.group.is_cluster())
            .map(|handle| (handle.key, handle.group.len()))
            .collect();
        tracing::info!(
            listings = view.listings().len(),
            markers = view.markers().len(),
            clusters = clusters.len(),
            "viewport loaded"
        );

        for (key, size) in clusters {
            queue.push(UiEvent::MarkerClicked(key));
            view.pump();
            tracing::info!(marker = key.0, size, open = view.open_popups().len(), "expanded cluster");
        }

        let center = view.map().center();
        tracing::info!(
            open = view.open_popups().len(),
            lat = center.lat,
            lng = center.lng,
            close_all_visible = view.popups().surface().close_all_visible,
            "popups after expanding clusters"
        );

        queue.push(UiEvent::CloseAllClicked);
        view.pump();
        tracing::info!(open = view.open_popups().len(), "closed all popups");
        Ok(())
    }

}
