// SPDX-License-Identifier: GPL-3.0-only

//! One-shot geolocation
//!
//! A [`Geolocator`] asks its provider for a single fix, bounds the wait and
//! applies the configured [`GeolocationPolicy`] to failures. Fixes are never
//! cached; every submission asks again.

pub mod fixed;
pub mod geoclue;

pub use fixed::FixedProvider;
pub use geoclue::GeoClueProvider;

use crate::config::{GeolocationConfig, ProviderKind};
use crate::constants::GeolocationPolicy;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// A single resolved coordinate reading
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPosition {
    pub latitude: f64,
    pub longitude: f64,
    /// Accuracy radius in meters, when the provider reports one
    pub accuracy: Option<f64>,
}

impl GeoPosition {
    /// Placeholder used when no fix could be obtained
    pub const ZERO: GeoPosition = GeoPosition {
        latitude: 0.0,
        longitude: 0.0,
        accuracy: None,
    };

    pub fn new(latitude: f64, longitude: f64, accuracy: Option<f64>) -> Self {
        Self {
            latitude,
            longitude,
            accuracy,
        }
    }
}

impl std::fmt::Display for GeoPosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Latitude: {}, Longitude: {}", self.latitude, self.longitude)?;
        if let Some(accuracy) = self.accuracy {
            write!(f, ", Accuracy: {} m", accuracy)?;
        }
        Ok(())
    }
}

/// Options for one position request
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionOptions {
    /// Ask for the most precise fix available (GPS)
    pub high_accuracy: bool,
    /// Upper bound on the wait
    pub timeout: Duration,
}

/// Result type for geolocation
pub type GeoResult<T> = Result<T, GeolocationError>;

/// Why no fix was obtained
#[derive(Debug, Clone, PartialEq)]
pub enum GeolocationError {
    /// No provider is configured or reachable
    Unsupported,
    /// The location service refused access
    PermissionDenied,
    /// No fix arrived in time
    Timeout(Duration),
    /// The provider failed
    Unavailable(String),
}

impl std::fmt::Display for GeolocationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GeolocationError::Unsupported => write!(f, "geolocation is not supported"),
            GeolocationError::PermissionDenied => {
                write!(f, "permission to read the location was denied")
            }
            GeolocationError::Timeout(t) => {
                write!(f, "no position fix within {} ms", t.as_millis())
            }
            GeolocationError::Unavailable(msg) => write!(f, "position unavailable: {}", msg),
        }
    }
}

impl std::error::Error for GeolocationError {}

/// Source of position fixes
pub trait GeolocationProvider: Send + Sync {
    /// Provider name for logs
    fn name(&self) -> &str;

    /// Resolve one fix
    ///
    /// Implementations need not enforce `options.timeout`; the
    /// [`Geolocator`] bounds the wait.
    fn current_position<'a>(
        &'a self,
        options: &'a PositionOptions,
    ) -> BoxFuture<'a, GeoResult<GeoPosition>>;
}

/// Build the provider selected by the configuration
pub fn build_provider(config: &GeolocationConfig) -> Option<Arc<dyn GeolocationProvider>> {
    match config.provider {
        ProviderKind::GeoClue => Some(Arc::new(GeoClueProvider::new(config.desktop_id.clone()))),
        ProviderKind::Fixed => Some(Arc::new(FixedProvider::new(GeoPosition::new(
            config.latitude,
            config.longitude,
            config.accuracy,
        )))),
        ProviderKind::None => None,
    }
}

/// Provider plus the per-variant wait and failure policy
#[derive(Clone)]
pub struct Geolocator {
    provider: Option<Arc<dyn GeolocationProvider>>,
    options: PositionOptions,
    policy: GeolocationPolicy,
}

impl Geolocator {
    pub fn new(
        provider: Option<Arc<dyn GeolocationProvider>>,
        options: PositionOptions,
        policy: GeolocationPolicy,
    ) -> Self {
        Self {
            provider,
            options,
            policy,
        }
    }

    pub fn policy(&self) -> GeolocationPolicy {
        self.policy
    }

    pub fn options(&self) -> &PositionOptions {
        &self.options
    }

    /// Obtain one fix, applying the failure policy
    ///
    /// Under [`GeolocationPolicy::BestEffort`] this never fails: any error
    /// resolves to [`GeoPosition::ZERO`].
    pub async fn get_position(&self) -> GeoResult<GeoPosition> {
        match self.fetch().await {
            Ok(position) => {
                debug!(
                    latitude = position.latitude,
                    longitude = position.longitude,
                    accuracy = ?position.accuracy,
                    "Position fix obtained"
                );
                Ok(position)
            }
            Err(e) if !self.policy.blocks_submission() => {
                warn!(error = %e, "Geolocation failed, using zero coordinates");
                Ok(GeoPosition::ZERO)
            }
            Err(e) => {
                warn!(error = %e, "Geolocation failed");
                Err(e)
            }
        }
    }

    async fn fetch(&self) -> GeoResult<GeoPosition> {
        let provider = self
            .provider
            .as_ref()
            .ok_or(GeolocationError::Unsupported)?;
        debug!(
            provider = provider.name(),
            timeout_ms = self.options.timeout.as_millis() as u64,
            "Requesting position"
        );

        tokio::time::timeout(
            self.options.timeout,
            provider.current_position(&self.options),
        )
        .await
        .unwrap_or(Err(GeolocationError::Timeout(self.options.timeout)))
    }
}

impl std::fmt::Debug for Geolocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Geolocator")
            .field("provider", &self.provider.as_ref().map(|p| p.name().to_string()))
            .field("options", &self.options)
            .field("policy", &self.policy)
            .finish()
    }
}
