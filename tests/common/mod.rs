// SPDX-License-Identifier: GPL-3.0-only

//! Shared fixtures for the scanner page tests
//!
//! - [`MockCamera`]: a [`CameraBackend`] with real tracks whose release can
//!   be observed after the page took ownership of the backend
//! - [`MockEndpoint`]: an in-process axum server recording JSON submissions
//! - [`qr_frame`]: a camera frame showing a rendered QR code

#![allow(dead_code)]

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Json;
use codescan::app::frame_processor::{DetectedSymbol, SymbolFormat, VideoDecoder};
use codescan::app::{CameraController, StatusLog};
use codescan::backends::camera::{
    BackendError, BackendResult, CameraBackend, CameraBackendType, CameraDevice, CameraFrame,
    CaptureLoopController, FrameWatch, LoopAction, MediaStream, MediaTrack, StreamRequest,
    TrackProbe, TrackState, frame_channel,
};
use codescan::backends::geolocation::{
    GeoPosition, GeoResult, GeolocationError, GeolocationProvider, Geolocator, PositionOptions,
};
use codescan::constants::GeolocationPolicy;
use codescan::errors::DetectError;
use futures::future::BoxFuture;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// How the mock camera behaves when opened
#[derive(Debug, Clone)]
pub enum CameraMode {
    /// Publishes this frame every 10 ms
    Frames(CameraFrame),
    /// Opens but never publishes a frame
    NeverReady,
    /// Refuses access
    Denied,
}

/// Observer for everything a [`MockBackend`] handed out
#[derive(Debug, Clone, Default)]
pub struct MockCamera {
    probes: Arc<Mutex<Vec<TrackProbe>>>,
    opens: Arc<AtomicUsize>,
}

impl MockCamera {
    /// Backend plus its observer
    pub fn new(mode: CameraMode) -> (Box<dyn CameraBackend>, MockCamera) {
        let camera = MockCamera::default();
        let backend = MockBackend {
            mode,
            camera: camera.clone(),
        };
        (Box::new(backend), camera)
    }

    /// Controller over a mock backend, with a short readiness timeout
    pub fn controller(mode: CameraMode) -> (CameraController, MockCamera) {
        let (backend, camera) = Self::new(mode);
        let controller = CameraController::new(
            backend,
            StreamRequest::default(),
            Duration::from_millis(300),
        );
        (controller, camera)
    }

    pub fn open_count(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    pub fn track_count(&self) -> usize {
        self.probes.lock().unwrap().len()
    }

    /// Whether every track ever handed out has ended
    pub fn all_tracks_ended(&self) -> bool {
        self.probes
            .lock()
            .unwrap()
            .iter()
            .all(|p| p.state() == TrackState::Ended)
    }
}

struct MockBackend {
    mode: CameraMode,
    camera: MockCamera,
}

impl CameraBackend for MockBackend {
    fn enumerate_cameras(&self) -> Vec<CameraDevice> {
        vec![CameraDevice {
            name: "Mock Camera".into(),
            path: "mock://0".into(),
            driver: None,
            location: Some("back".into()),
        }]
    }

    fn open(&self, _request: &StreamRequest) -> BackendResult<MediaStream> {
        self.camera.opens.fetch_add(1, Ordering::SeqCst);

        let (sender, frames) = frame_channel();
        let capture = match &self.mode {
            CameraMode::Denied => {
                return Err(BackendError::PermissionDenied("mock camera".into()));
            }
            CameraMode::NeverReady => CaptureLoopController::start("mock-idle", move || {
                let _keep = &sender;
                std::thread::sleep(Duration::from_millis(10));
                LoopAction::Continue
            }),
            CameraMode::Frames(frame) => {
                let frame = Arc::new(frame.clone());
                CaptureLoopController::start("mock-frames", move || {
                    let _ = sender.send(Some(Arc::clone(&frame)));
                    std::thread::sleep(Duration::from_millis(10));
                    LoopAction::Continue
                })
            }
        };

        let track = MediaTrack::new("Mock Camera", capture);
        self.camera.probes.lock().unwrap().push(track.probe());
        Ok(MediaStream::new(vec![track], frames))
    }

    fn backend_type(&self) -> CameraBackendType {
        CameraBackendType::File
    }

    fn is_available(&self) -> bool {
        true
    }
}

/// RGBA frame showing `text` as a QR code
pub fn qr_frame(text: &str) -> CameraFrame {
    let code = qrcode::QrCode::new(text.as_bytes()).unwrap();
    let luma = code
        .render::<image::Luma<u8>>()
        .module_dimensions(6, 6)
        .build();
    let rgba = image::DynamicImage::ImageLuma8(luma).to_rgba8();
    let (width, height) = rgba.dimensions();
    CameraFrame::from_rgba(width, height, rgba.into_raw())
}

/// Plain white frame without any code
pub fn blank_frame() -> CameraFrame {
    CameraFrame::from_rgba(64, 64, vec![255; 64 * 64 * 4])
}

/// Endpoint that answers every POST with a fixed status and body
pub struct MockEndpoint {
    pub addr: SocketAddr,
    requests: Arc<Mutex<Vec<serde_json::Value>>>,
}

#[derive(Clone)]
struct EndpointState {
    status: StatusCode,
    body: serde_json::Value,
    requests: Arc<Mutex<Vec<serde_json::Value>>>,
}

async fn record_post(
    State(state): State<EndpointState>,
    Json(payload): Json<serde_json::Value>,
) -> (StatusCode, Json<serde_json::Value>) {
    state.requests.lock().unwrap().push(payload);
    (state.status, Json(state.body.clone()))
}

impl MockEndpoint {
    /// Start a server on an ephemeral port
    pub async fn start(status: StatusCode, body: serde_json::Value) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let requests = Arc::new(Mutex::new(Vec::new()));

        let state = EndpointState {
            status,
            body,
            requests: Arc::clone(&requests),
        };
        let app = axum::Router::new()
            .route("/api/post", axum::routing::post(record_post))
            .with_state(state);
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { addr, requests }
    }

    pub fn url(&self) -> String {
        format!("http://{}/api/post", self.addr)
    }

    /// Every JSON body received so far
    pub fn requests(&self) -> Vec<serde_json::Value> {
        self.requests.lock().unwrap().clone()
    }
}

/// Provider that always fails
pub struct FailingProvider(pub GeolocationError);

impl GeolocationProvider for FailingProvider {
    fn name(&self) -> &str {
        "failing"
    }

    fn current_position<'a>(
        &'a self,
        _options: &'a PositionOptions,
    ) -> BoxFuture<'a, GeoResult<GeoPosition>> {
        let err = self.0.clone();
        Box::pin(async move { Err(err) })
    }
}

/// Provider that always answers with one position
pub struct StaticProvider(pub GeoPosition);

impl GeolocationProvider for StaticProvider {
    fn name(&self) -> &str {
        "static"
    }

    fn current_position<'a>(
        &'a self,
        _options: &'a PositionOptions,
    ) -> BoxFuture<'a, GeoResult<GeoPosition>> {
        let position = self.0;
        Box::pin(async move { Ok(position) })
    }
}

pub fn geolocator(
    provider: impl GeolocationProvider + 'static,
    policy: GeolocationPolicy,
) -> Geolocator {
    let provider: Arc<dyn GeolocationProvider> = Arc::new(provider);
    Geolocator::new(
        Some(provider),
        PositionOptions {
            high_accuracy: true,
            timeout: Duration::from_millis(500),
        },
        policy,
    )
}

/// Decoder that ignores the video and answers after a delay
pub struct ScriptedDecoder {
    pub result: Option<&'static str>,
    pub delay: Duration,
}

impl VideoDecoder for ScriptedDecoder {
    fn decode_once(
        &self,
        _frames: FrameWatch,
        _timeout: Duration,
    ) -> BoxFuture<'static, Result<Option<DetectedSymbol>, DetectError>> {
        let result = self.result;
        let delay = self.delay;
        Box::pin(async move {
            tokio::time::sleep(delay).await;
            Ok(result.map(|text| DetectedSymbol::new(SymbolFormat::Pdf417, text)))
        })
    }
}

pub fn status_log() -> Arc<StatusLog> {
    Arc::new(StatusLog::new())
}
