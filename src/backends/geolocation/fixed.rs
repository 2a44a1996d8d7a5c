// SPDX-License-Identifier: GPL-3.0-only

//! Fixed position provider
//!
//! For machines without a location service (kiosks, fixed scanning stations)
//! the position comes from configuration.

use super::{GeoPosition, GeoResult, GeolocationProvider, PositionOptions};
use futures::future::BoxFuture;

/// Provider that always reports the same fix
#[derive(Debug, Clone, Copy)]
pub struct FixedProvider {
    position: GeoPosition,
}

impl FixedProvider {
    pub fn new(position: GeoPosition) -> Self {
        Self { position }
    }
}

impl GeolocationProvider for FixedProvider {
    fn name(&self) -> &str {
        "fixed"
    }

    fn current_position<'a>(
        &'a self,
        _options: &'a PositionOptions,
    ) -> BoxFuture<'a, GeoResult<GeoPosition>> {
        let position = self.position;
        Box::pin(async move { Ok(position) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::geolocation::Geolocator;
    use crate::constants::GeolocationPolicy;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_fixed_position_is_reported() {
        let position = GeoPosition::new(52.52, 13.405, Some(25.0));
        let geolocator = Geolocator::new(
            Some(Arc::new(FixedProvider::new(position))),
            PositionOptions {
                high_accuracy: true,
                timeout: Duration::from_secs(1),
            },
            GeolocationPolicy::Strict,
        );

        assert_eq!(geolocator.get_position().await, Ok(position));
    }
}
