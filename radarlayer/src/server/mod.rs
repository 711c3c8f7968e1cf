//! HTTP server wiring.
//!
//! Builds the axum router over a shared [`RadarRenderer`] and runs it.
//! The route table mirrors the RainViewer v2 API the TopSky plugin
//! expects, including its non-standard lat/lon tile grammar.

mod routes;

use std::sync::Arc;

use axum::extract::Request;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use thiserror::Error;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::config::Settings;
use crate::provider::{
    OpenWeatherMapProvider, ProviderError, ReqwestClient, TileProvider,
};
use crate::render::RadarRenderer;

/// Errors raised while starting the server.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Failed to create upstream HTTP client: {0}")]
    Provider(#[from] ProviderError),
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: std::net::SocketAddr,
        source: std::io::Error,
    },
    #[error("Server I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Shared per-process state handed to every handler.
pub struct AppState<P: TileProvider> {
    pub renderer: RadarRenderer<P>,
    pub public_base_url: String,
}

impl<P: TileProvider + 'static> AppState<P> {
    pub fn new(renderer: RadarRenderer<P>, public_base_url: impl Into<String>) -> Self {
        Self {
            renderer,
            public_base_url: public_base_url.into(),
        }
    }
}

/// The production provider stack: OWM over reqwest.
pub type OwmProvider = OpenWeatherMapProvider<ReqwestClient>;

/// Build the application state from resolved settings.
pub fn app_state(settings: &Settings) -> Result<AppState<OwmProvider>, ServerError> {
    let client = ReqwestClient::with_timeout(settings.fetch_timeout)?;
    let provider = OpenWeatherMapProvider::new(client, settings.api_key.clone(), settings.layer)
        .with_base_url(settings.upstream_base_url.clone());
    let renderer = RadarRenderer::new(provider, settings.render_config());
    Ok(AppState::new(renderer, settings.public_base_url.clone()))
}

/// Build the router over the given state.
pub fn router<P: TileProvider + 'static>(state: Arc<AppState<P>>) -> Router {
    Router::new()
        .route("/", get(routes::root))
        .route("/health", get(routes::health))
        .route("/public/weather-maps.json", get(routes::weather_maps::<P>))
        // Both radar grammars share segment positions, and the router
        // requires one parameter name per position; tuple extraction in
        // the handlers is positional, so the names stay neutral.
        // Standard: :a/:b/:c = z/x/y.png; the :ts segment also matches
        // nowcast_<id>
        .route(
            "/v2/radar/:ts/:a/:b/:c",
            get(routes::radar_tile_standard::<P>),
        )
        // TopSky: :a/:b/:c/:d = x/z/lon/lat, trailing ".png" as its own
        // segment
        .route(
            "/v2/radar/:ts/:a/:b/:c/:d/.png",
            get(routes::radar_tile_topsky::<P>),
        )
        .route(
            "/v2/satellite/:id/:z/:x/:y",
            get(routes::satellite_tile::<P>),
        )
        // All methods: the plugin probes with more than GET
        .fallback(routes::catch_all::<P>)
        .layer(middleware::from_fn(log_requests))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Log every request and its response status.
async fn log_requests(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let response = next.run(request).await;
    info!(%method, %uri, status = response.status().as_u16(), "request");
    response
}

/// Run the server until the process is stopped.
pub async fn serve(settings: Settings) -> Result<(), ServerError> {
    let state = Arc::new(app_state(&settings)?);
    let app = router(state);

    let listener = TcpListener::bind(settings.bind_addr)
        .await
        .map_err(|source| ServerError::Bind {
            addr: settings.bind_addr,
            source,
        })?;

    info!(addr = %settings.bind_addr, layer = settings.layer.as_path(), "Serving RainViewer-compatible API");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutdown signal received");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coord::GeoPoint;
    use crate::grid::GridPlan;
    use crate::provider::MockTileProvider;
    use crate::render::RenderConfig;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request as HttpRequest, StatusCode};
    use bytes::Bytes;
    use image::{Rgba, RgbaImage};
    use tower::ServiceExt;

    fn solid_tile_png(r: u8, g: u8, b: u8) -> Bytes {
        let img = RgbaImage::from_pixel(256, 256, Rgba([r, g, b, 255]));
        Bytes::from(crate::compose::encode_png(&img).unwrap())
    }

    fn test_router(provider: MockTileProvider) -> (Router, Arc<AppState<MockTileProvider>>) {
        let renderer = RadarRenderer::new(provider, RenderConfig::default());
        let state = Arc::new(AppState::new(renderer, "http://radar.test"));
        (router(Arc::clone(&state)), state)
    }

    async fn get_response(app: Router, uri: &str) -> (StatusCode, Option<String>, Vec<u8>) {
        let response = app
            .oneshot(
                HttpRequest::builder()
                    .uri(uri)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let content_type = response
            .headers()
            .get("content-type")
            .map(|v| v.to_str().unwrap().to_string());
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, content_type, body.to_vec())
    }

    fn decode(png: &[u8]) -> RgbaImage {
        image::load_from_memory(png).unwrap().to_rgba8()
    }

    #[tokio::test]
    async fn test_root_and_health() {
        let (app, _) = test_router(MockTileProvider::always(Ok(solid_tile_png(1, 2, 3))));
        let (status, _, body) = get_response(app.clone(), "/").await;
        assert_eq!(status, StatusCode::OK);
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "running");

        let (status, _, body) = get_response(app, "/health").await;
        assert_eq!(status, StatusCode::OK);
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "healthy");
    }

    #[tokio::test]
    async fn test_weather_maps_listing() {
        let (app, _) = test_router(MockTileProvider::always(Ok(solid_tile_png(1, 2, 3))));

        for uri in [
            "/public/weather-maps.json",
            "/public/weather-maps.json/",
            "/public/weather-maps.json/extra/segments",
        ] {
            let (status, _, body) = get_response(app.clone(), uri).await;
            assert_eq!(status, StatusCode::OK, "uri {}", uri);
            let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
            assert_eq!(json["version"], "2.0");
            assert_eq!(json["host"], "http://radar.test");
            assert_eq!(json["radar"]["past"].as_array().unwrap().len(), 4);
            assert_eq!(json["radar"]["nowcast"].as_array().unwrap().len(), 2);
        }
    }

    #[tokio::test]
    async fn test_standard_tile_route() {
        let (app, state) = test_router(MockTileProvider::always(Ok(solid_tile_png(9, 8, 7))));

        let (status, content_type, body) =
            get_response(app, "/v2/radar/1700000000/6/31/21.png").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(content_type.as_deref(), Some("image/png"));
        let img = decode(&body);
        assert_eq!(img.dimensions(), (256, 256));
        assert_eq!(*img.get_pixel(0, 0), Rgba([9, 8, 7, 255]));
        assert_eq!(state.renderer.config().source_tile_size, 256);
    }

    #[tokio::test]
    async fn test_nowcast_tile_uses_standard_route() {
        let (app, _) = test_router(MockTileProvider::always(Ok(solid_tile_png(9, 8, 7))));

        let (status, content_type, body) =
            get_response(app, "/v2/radar/nowcast_d00dfeed1234/6/31/21.png").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(content_type.as_deref(), Some("image/png"));
        assert_eq!(decode(&body).dimensions(), (256, 256));
    }

    #[tokio::test]
    async fn test_topsky_route_stitches_from_lat_lon() {
        let (app, state) = test_router(MockTileProvider::always(Ok(solid_tile_png(0, 200, 0))));

        let (status, content_type, body) =
            get_response(app, "/v2/radar/1700000000/12/5/-0.12/51.5/.png").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(content_type.as_deref(), Some("image/png"));
        let img = decode(&body);
        assert_eq!(img.dimensions(), (256, 256));
        assert_eq!(*img.get_pixel(128, 128), Rgba([0, 200, 0, 255]));
        // zoom 5 + 256px output stitches a 2×2 grid at zoom 6
        assert_eq!(state.renderer.config().fetch_timeout.as_secs(), 10);
    }

    #[tokio::test]
    async fn test_topsky_route_with_size_query() {
        let (app, _) = test_router(MockTileProvider::always(Ok(solid_tile_png(0, 200, 0))));

        let (_, _, body) =
            get_response(app, "/v2/radar/1700000000/12/5/-0.12/51.5/.png?size=128").await;
        assert_eq!(decode(&body).dimensions(), (128, 128));
    }

    #[tokio::test]
    async fn test_topsky_route_malformed_lat_lon_returns_blank_png() {
        let (app, _) = test_router(MockTileProvider::always(Ok(solid_tile_png(0, 200, 0))));

        let (status, content_type, body) =
            get_response(app, "/v2/radar/1700000000/12/5/abc/def/.png").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(content_type.as_deref(), Some("image/png"));
        let img = decode(&body);
        assert_eq!(img.dimensions(), (256, 256));
        assert!(img.pixels().all(|p| p[3] == 0));
    }

    #[tokio::test]
    async fn test_satellite_route_is_blank() {
        let (app, _) = test_router(MockTileProvider::always(Ok(solid_tile_png(1, 2, 3))));

        let (status, _, body) = get_response(app, "/v2/satellite/feedface/6/31/21.png").await;
        assert_eq!(status, StatusCode::OK);
        let img = decode(&body);
        assert!(img.pixels().all(|p| p[3] == 0));
    }

    #[tokio::test]
    async fn test_catch_all_png_returns_blank_image() {
        let (app, _) = test_router(MockTileProvider::always(Ok(solid_tile_png(1, 2, 3))));

        let (status, content_type, body) = get_response(app, "/some/unknown/tile.png").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(content_type.as_deref(), Some("image/png"));
        assert_eq!(decode(&body).dimensions(), (256, 256));
    }

    #[tokio::test]
    async fn test_catch_all_other_returns_json_404() {
        let (app, _) = test_router(MockTileProvider::always(Ok(solid_tile_png(1, 2, 3))));

        let (status, _, body) = get_response(app, "/some/unknown/route").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "Not found");
        assert_eq!(json["path"], "/some/unknown/route");
    }

    #[tokio::test]
    async fn test_unparseable_standard_tile_path_returns_blank() {
        let (app, _) = test_router(MockTileProvider::always(Ok(solid_tile_png(1, 2, 3))));

        let (status, content_type, body) =
            get_response(app, "/v2/radar/1700000000/zz/31/21.png").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(content_type.as_deref(), Some("image/png"));
        assert!(decode(&body).pixels().all(|p| p[3] == 0));
    }

    #[tokio::test]
    async fn test_upstream_failure_still_yields_png() {
        let (app, _) = test_router(MockTileProvider::always(Err(
            crate::provider::ProviderError::Http("down".into()),
        )));

        let (status, content_type, body) =
            get_response(app, "/v2/radar/1700000000/12/5/-0.12/51.5/.png").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(content_type.as_deref(), Some("image/png"));
        assert!(decode(&body).pixels().all(|p| p[3] == 0));
    }

    #[test]
    fn test_grid_shape_behind_topsky_route() {
        // The route's 256px default against 256px source tiles plans a
        // 2×2 grid at the enhanced zoom
        let center = GeoPoint::new(51.5, -0.12).unwrap();
        let plan = GridPlan::build(center, 5, 256, 256).unwrap();
        assert_eq!(plan.effective_zoom(), 6);
        assert_eq!(plan.distinct_coords().len(), 4);
    }
}
