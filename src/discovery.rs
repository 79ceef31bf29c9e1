//! Device discovery via a timed BLE scan.

use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};
use tokio::time::Instant;

use crate::errors::Error;
use crate::light::Light;
use crate::transport::{Transport, TransportScanner};

type Result<T> = std::result::Result<T, Error>;

/// Discover up to `target_count` light engines within `timeout`.
///
/// Runs a single active scan window and collects every advertisement that
/// carries the known control service UUID. The result is ordered by
/// ascending link-layer address, independent of arrival order, so discovery
/// index is a stable identity for the host layer. Duplicate advertisements
/// from an already-known address are ignored.
///
/// Scanning stops as soon as `target_count` matches accumulate or when the
/// window closes, whichever comes first; a partial result is valid and
/// returned as-is. Discovery is never retried here — devices found once
/// only ever need reconnection, which is the fleet's job.
///
/// # Examples
///
/// ```ignore
/// let lights = discover_lights(&transport, 4, Duration::from_secs(10)).await?;
/// println!("found {} light engines", lights.len());
/// ```
pub async fn discover_lights<T: Transport>(
    transport: &Arc<T>,
    target_count: usize,
    timeout: Duration,
) -> Result<Vec<Light<T>>> {
    let mut scanner = transport.scanner()?;
    scanner.start_scan(timeout, true).await?;

    let deadline = Instant::now() + timeout;
    let mut lights: Vec<Light<T>> = Vec::new();

    while lights.len() < target_count {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            break;
        }

        let advertisement =
            match tokio::time::timeout(remaining, scanner.next_advertisement()).await {
                Ok(Ok(Some(advertisement))) => advertisement,
                // Scan window closed on the transport side.
                Ok(Ok(None)) => break,
                Ok(Err(err)) => {
                    warn!("scan error, returning partial results: {err}");
                    break;
                }
                // Window elapsed while the air was quiet.
                Err(_) => break,
            };

        if !advertisement.is_light_engine() {
            continue;
        }

        match lights.binary_search_by(|light| light.address().cmp(&advertisement.address)) {
            Ok(_) => debug!("{}: duplicate advertisement ignored", advertisement.address),
            Err(position) => {
                info!("found light engine at {}", advertisement.address);
                let mut light = Light::new(Arc::clone(transport), &advertisement.address, None);
                light.bind(advertisement.device);
                lights.insert(position, light);
            }
        }
    }

    if let Err(err) = scanner.stop_scan().await {
        warn!("failed to stop scan: {err}");
    }

    debug!(
        "discovery finished with {} of {} light engines",
        lights.len(),
        target_count
    );
    Ok(lights)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::mock::{MockPeripheral, MockTransport};
    use uuid::Uuid;

    fn addresses<T: Transport>(lights: &[Light<T>]) -> Vec<&str> {
        lights.iter().map(|light| light.address()).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_result_sorted_by_address() {
        let transport = MockTransport::new(vec![
            MockPeripheral::new("B0:00:00:00:00:01"),
            MockPeripheral::new("A1:00:00:00:00:02"),
            MockPeripheral::new("C2:00:00:00:00:03"),
        ]);

        let lights = discover_lights(&transport, 3, Duration::from_secs(10))
            .await
            .unwrap();
        assert_eq!(
            addresses(&lights),
            vec![
                "A1:00:00:00:00:02",
                "B0:00:00:00:00:01",
                "C2:00:00:00:00:03"
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_duplicate_advertisements_ignored() {
        let transport = MockTransport::new(vec![
            MockPeripheral::new("B0:00:00:00:00:01"),
            MockPeripheral::new("B0:00:00:00:00:01"),
            MockPeripheral::new("A1:00:00:00:00:02"),
        ]);

        let lights = discover_lights(&transport, 2, Duration::from_secs(10))
            .await
            .unwrap();
        assert_eq!(
            addresses(&lights),
            vec!["A1:00:00:00:00:02", "B0:00:00:00:00:01"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_stops_at_target_count() {
        let transport = MockTransport::new(vec![
            MockPeripheral::new("A1:00:00:00:00:01"),
            MockPeripheral::new("B0:00:00:00:00:02"),
            MockPeripheral::new("C2:00:00:00:00:03"),
        ]);

        let lights = discover_lights(&transport, 2, Duration::from_secs(10))
            .await
            .unwrap();
        assert_eq!(lights.len(), 2);
        assert_eq!(
            addresses(&lights),
            vec!["A1:00:00:00:00:01", "B0:00:00:00:00:02"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_returns_partial_results() {
        let transport = MockTransport::new(vec![MockPeripheral::new("A1:00:00:00:00:01")]);

        let lights = discover_lights(&transport, 3, Duration::from_secs(10))
            .await
            .unwrap();
        assert_eq!(lights.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_foreign_services_filtered() {
        let transport = MockTransport::new(vec![
            MockPeripheral::with_services("A1:00:00:00:00:01", vec![Uuid::from_u128(0xBEEF)]),
            MockPeripheral::new("B0:00:00:00:00:02"),
        ]);

        let lights = discover_lights(&transport, 2, Duration::from_secs(10))
            .await
            .unwrap();
        assert_eq!(addresses(&lights), vec!["B0:00:00:00:00:02"]);
    }
}
