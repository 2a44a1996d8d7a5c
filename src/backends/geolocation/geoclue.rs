// SPDX-License-Identifier: GPL-3.0-only

//! GeoClue2 D-Bus integration
//!
//! Flow for one fix: ask the manager for a client, announce our desktop id
//! and accuracy level, subscribe to `LocationUpdated`, start the client,
//! read the first location object it reports, then stop the client again.

use super::{GeoPosition, GeoResult, GeolocationError, GeolocationProvider, PositionOptions};
use crate::constants::geolocation::{GEOCLUE_ACCURACY_CITY, GEOCLUE_ACCURACY_EXACT};
use futures::StreamExt;
use futures::future::BoxFuture;
use tracing::{debug, info, warn};
use zbus::zvariant::OwnedObjectPath;

const GEOCLUE_SERVICE: &str = "org.freedesktop.GeoClue2";
const GEOCLUE_MANAGER_PATH: &str = "/org/freedesktop/GeoClue2/Manager";
const GEOCLUE_MANAGER_IFACE: &str = "org.freedesktop.GeoClue2.Manager";
const GEOCLUE_CLIENT_IFACE: &str = "org.freedesktop.GeoClue2.Client";
const GEOCLUE_LOCATION_IFACE: &str = "org.freedesktop.GeoClue2.Location";

/// Position provider backed by the GeoClue2 system service
#[derive(Debug, Clone)]
pub struct GeoClueProvider {
    desktop_id: String,
}

impl GeoClueProvider {
    pub fn new(desktop_id: impl Into<String>) -> Self {
        Self {
            desktop_id: desktop_id.into(),
        }
    }

    async fn locate(&self, options: &PositionOptions) -> GeoResult<GeoPosition> {
        let connection = zbus::Connection::system().await.map_err(|e| {
            debug!(error = %e, "System D-Bus unavailable");
            GeolocationError::Unsupported
        })?;

        let manager = zbus::Proxy::new(
            &connection,
            GEOCLUE_SERVICE,
            GEOCLUE_MANAGER_PATH,
            GEOCLUE_MANAGER_IFACE,
        )
        .await
        .map_err(map_dbus_error)?;

        let client_path: OwnedObjectPath = manager
            .call("GetClient", &())
            .await
            .map_err(map_dbus_error)?;
        debug!(client = %client_path, "Obtained GeoClue client");

        let client = zbus::Proxy::new(
            &connection,
            GEOCLUE_SERVICE,
            client_path.as_str(),
            GEOCLUE_CLIENT_IFACE,
        )
        .await
        .map_err(map_dbus_error)?;

        let accuracy_level = if options.high_accuracy {
            GEOCLUE_ACCURACY_EXACT
        } else {
            GEOCLUE_ACCURACY_CITY
        };
        client
            .set_property("DesktopId", self.desktop_id.as_str())
            .await
            .map_err(|e| map_dbus_error(e.into()))?;
        client
            .set_property("RequestedAccuracyLevel", accuracy_level)
            .await
            .map_err(|e| map_dbus_error(e.into()))?;

        // Subscribe before starting so the first update cannot be missed
        let mut updates = client
            .receive_signal("LocationUpdated")
            .await
            .map_err(map_dbus_error)?;

        client
            .call::<_, _, ()>("Start", &())
            .await
            .map_err(map_dbus_error)?;

        let result = async {
            let message = updates.next().await.ok_or_else(|| {
                GeolocationError::Unavailable("location updates ended".to_string())
            })?;
            let (_old, new): (OwnedObjectPath, OwnedObjectPath) = message
                .body()
                .deserialize()
                .map_err(|e| GeolocationError::Unavailable(e.to_string()))?;
            read_location(&connection, &new).await
        }
        .await;

        if let Err(e) = client.call::<_, _, ()>("Stop", &()).await {
            warn!(error = %e, "Failed to stop GeoClue client");
        }

        let position = result?;
        info!(
            latitude = position.latitude,
            longitude = position.longitude,
            accuracy = ?position.accuracy,
            "GeoClue reported a location"
        );
        Ok(position)
    }
}

impl GeolocationProvider for GeoClueProvider {
    fn name(&self) -> &str {
        "geoclue"
    }

    fn current_position<'a>(
        &'a self,
        options: &'a PositionOptions,
    ) -> BoxFuture<'a, GeoResult<GeoPosition>> {
        Box::pin(self.locate(options))
    }
}

/// Read the coordinates of a location object
async fn read_location(
    connection: &zbus::Connection,
    path: &OwnedObjectPath,
) -> GeoResult<GeoPosition> {
    let location = zbus::Proxy::new(
        connection,
        GEOCLUE_SERVICE,
        path.as_str(),
        GEOCLUE_LOCATION_IFACE,
    )
    .await
    .map_err(map_dbus_error)?;

    let latitude: f64 = location
        .get_property("Latitude")
        .await
        .map_err(map_dbus_error)?;
    let longitude: f64 = location
        .get_property("Longitude")
        .await
        .map_err(map_dbus_error)?;
    let accuracy: Option<f64> = location.get_property("Accuracy").await.ok();

    Ok(GeoPosition::new(latitude, longitude, accuracy))
}

/// Classify a D-Bus failure
fn map_dbus_error(error: zbus::Error) -> GeolocationError {
    let text = error.to_string();
    if text.contains("AccessDenied") {
        GeolocationError::PermissionDenied
    } else if text.contains("ServiceUnknown") || text.contains("NameHasNoOwner") {
        GeolocationError::Unsupported
    } else {
        GeolocationError::Unavailable(text)
    }
}
