//! Fleet lifecycle: startup discovery, reconnection backoff, teardown.

use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};
use serde_json::{Value, json};

use crate::discovery::discover_lights;
use crate::errors::Error;
use crate::light::{Light, LinkState};
use crate::transport::Transport;

type Result<T> = std::result::Result<T, Error>;

/// Reconnect sweeps a handle may fail before it is declared failed.
pub const MAX_RETRIES: u32 = 5;

/// Ticks between reconnect sweeps at backoff multiplier 1.
const TICKS_PER_SWEEP: u64 = 10;

/// Callback invoked once when a handle is permanently given up on.
///
/// Receives the handle's discovery index and address.
pub type FailureCallback = Box<dyn Fn(usize, &str) + Send + 'static>;

/// Owns the full collection of light engine handles and drives their
/// connection health from an external periodic tick.
///
/// The handle collection is populated exactly once by [`FleetManager::start`]
/// and never reordered afterward: discovery index is the stable identity a
/// host integration uses to address individual engines.
pub struct FleetManager<T: Transport> {
    transport: Arc<T>,
    lights: Vec<Light<T>>,
    backoff_multiplier: u32,
    ticks: u64,
    on_failure: Option<FailureCallback>,
}

impl<T: Transport> FleetManager<T> {
    pub fn new(transport: Arc<T>) -> Self {
        FleetManager {
            transport,
            lights: Vec::new(),
            backoff_multiplier: 1,
            ticks: 0,
            on_failure: None,
        }
    }

    /// Register a hook fired once per handle when its retry cap is exceeded.
    pub fn on_failure(&mut self, callback: FailureCallback) {
        self.on_failure = Some(callback);
    }

    pub fn len(&self) -> usize {
        self.lights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lights.is_empty()
    }

    pub fn lights(&self) -> &[Light<T>] {
        &self.lights
    }

    /// Look up a handle by its discovery index.
    pub fn light(&self, index: usize) -> Option<&Light<T>> {
        self.lights.get(index)
    }

    pub fn light_mut(&mut self, index: usize) -> Option<&mut Light<T>> {
        self.lights.get_mut(index)
    }

    /// Current fleet-wide backoff multiplier.
    pub fn backoff_multiplier(&self) -> u32 {
        self.backoff_multiplier
    }

    /// Run discovery, then attempt one initial connect per handle.
    ///
    /// A handle whose initial connect fails transiently begins life with
    /// retry count 1, making it eligible for the same backoff treatment as
    /// a handle that drops later. Returns the number of handles discovered;
    /// fewer than `target_count` is not an error.
    pub async fn start(&mut self, target_count: usize, scan_timeout: Duration) -> Result<usize> {
        self.lights = discover_lights(&self.transport, target_count, scan_timeout).await?;
        info!(
            "discovered {} of {} light engines",
            self.lights.len(),
            target_count
        );

        for light in &mut self.lights {
            if light.connect().await {
                // Put the engine into the locally known state right away.
                light.push().await;
            } else if light.state() != LinkState::Failed {
                light.seed_retry();
            }
        }
        Ok(self.lights.len())
    }

    /// Drive reconnection; call on a fixed cadence (once per second in the
    /// reference deployment). Never returns an error.
    ///
    /// Every `10 * backoff_multiplier` ticks, each handle that is neither
    /// connected nor failed gets one reconnect attempt. Success replays the
    /// handle's frame so commands issued while disconnected take effect;
    /// failure escalates the shared multiplier. A handle exceeding
    /// [`MAX_RETRIES`] is marked failed, the failure hook fires once, and
    /// the multiplier drops back to 1 so the rest of the fleet is not
    /// punished for a dead device.
    pub async fn tick(&mut self) {
        self.ticks = self.ticks.wrapping_add(1);
        let interval = TICKS_PER_SWEEP * u64::from(self.backoff_multiplier);
        if self.ticks % interval != 0 {
            return;
        }

        let mut gave_up = Vec::new();
        for index in 0..self.lights.len() {
            let light = &mut self.lights[index];
            if light.state() == LinkState::Failed || light.is_connected() {
                continue;
            }

            if light.connect().await {
                debug!("{}: reconnected, replaying last frame", light.address());
                light.push().await;
                continue;
            }

            if light.state() == LinkState::Failed {
                // Handshake revealed an incompatible peripheral.
                gave_up.push(index);
                continue;
            }

            light.bump_retries();
            let retries = light.retries();
            if retries > MAX_RETRIES {
                warn!(
                    "{}: giving up after {} failed attempts",
                    light.address(),
                    retries
                );
                light.mark_failed();
                gave_up.push(index);
            } else if retries > self.backoff_multiplier {
                self.backoff_multiplier = retries;
            }
        }

        if !gave_up.is_empty() {
            self.backoff_multiplier = 1;
            for index in gave_up {
                if let Some(callback) = &self.on_failure {
                    callback(index, self.lights[index].address());
                }
            }
        }

        // One failing handle holds the whole fleet's backoff elevated; only
        // a fully healthy fleet returns to the base cadence.
        if self
            .lights
            .iter()
            .all(|light| light.is_connected() || light.state() == LinkState::Failed)
        {
            self.backoff_multiplier = 1;
        }
    }

    /// Disconnect every connected handle. Idempotent.
    pub async fn shutdown(&mut self) {
        for light in &mut self.lights {
            if light.state() == LinkState::Connected {
                light.disconnect().await;
            }
        }
        info!("fleet shut down");
    }

    /// Diagnostics snapshot of the whole fleet.
    pub fn diagnostics(&self) -> Value {
        json!({
            "total": self.lights.len(),
            "connected": self.lights.iter().filter(|l| l.is_connected()).count(),
            "failed": self.lights.iter().filter(|l| l.state() == LinkState::Failed).count(),
            "backoff_multiplier": self.backoff_multiplier,
            "lights": self.lights.iter().map(|light| json!({
                "address": light.address(),
                "state": format!("{:?}", light.state()),
                "retries": light.retries(),
                "status": serde_json::to_value(light.status()).unwrap_or(Value::Null),
            })).collect::<Vec<_>>(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::mock::{MockPeripheral, MockTransport};
    use std::sync::Mutex;

    const SCAN: Duration = Duration::from_secs(5);

    async fn ticks(fleet: &mut FleetManager<MockTransport>, count: u64) {
        for _ in 0..count {
            fleet.tick().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_connects_all() {
        let peripherals = vec![
            MockPeripheral::new("A1:00:00:00:00:01"),
            MockPeripheral::new("B0:00:00:00:00:02"),
        ];
        let transport = MockTransport::new(peripherals.clone());

        let mut fleet = FleetManager::new(transport);
        assert_eq!(fleet.start(2, SCAN).await.unwrap(), 2);
        assert!(fleet.lights().iter().all(|l| l.is_connected()));
        // The initial known state was written to both engines.
        for peripheral in &peripherals {
            assert_eq!(peripheral.writes().len(), 1);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_initial_failure_seeds_retry() {
        let flaky = MockPeripheral::new("A1:00:00:00:00:01");
        flaky.plan_connects(&[false]);
        let transport = MockTransport::new(vec![flaky.clone()]);

        let mut fleet = FleetManager::new(transport);
        fleet.start(1, SCAN).await.unwrap();
        assert!(!fleet.light(0).unwrap().is_connected());
        assert_eq!(fleet.light(0).unwrap().retries(), 1);

        // First sweep reconnects and replays the frame.
        ticks(&mut fleet, 10).await;
        assert!(fleet.light(0).unwrap().is_connected());
        assert_eq!(fleet.light(0).unwrap().retries(), 0);
        assert_eq!(flaky.writes().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reconnect_replays_pending_command() {
        let peripheral = MockPeripheral::new("A1:00:00:00:00:01");
        let transport = MockTransport::new(vec![peripheral.clone()]);

        let mut fleet = FleetManager::new(transport);
        fleet.start(1, SCAN).await.unwrap();
        assert_eq!(peripheral.writes().len(), 1);

        peripheral.drop_link();
        // Command issued while the link is down is queued in the frame.
        fleet.light_mut(0).unwrap().set_brightness(42).await;
        assert_eq!(peripheral.writes().len(), 1);

        ticks(&mut fleet, 10).await;
        assert!(fleet.light(0).unwrap().is_connected());
        let writes = peripheral.writes();
        assert_eq!(writes.len(), 2);
        assert_eq!(writes[1][9], 42);
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_escalates_linearly() {
        let dead = MockPeripheral::new("A1:00:00:00:00:01");
        dead.plan_connects(&[false; 16]);
        let transport = MockTransport::new(vec![dead.clone()]);

        let mut fleet = FleetManager::new(transport);
        fleet.start(1, SCAN).await.unwrap();
        assert_eq!(fleet.backoff_multiplier(), 1);

        // Sweep at tick 10: retries 1 -> 2, multiplier follows.
        ticks(&mut fleet, 10).await;
        assert_eq!(fleet.light(0).unwrap().retries(), 2);
        assert_eq!(fleet.backoff_multiplier(), 2);

        // Next sweep only at a multiple of 20.
        ticks(&mut fleet, 9).await;
        assert_eq!(fleet.light(0).unwrap().retries(), 2);
        ticks(&mut fleet, 1).await;
        assert_eq!(fleet.light(0).unwrap().retries(), 3);
        assert_eq!(fleet.backoff_multiplier(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_cap_marks_failed_and_resets_backoff() {
        let dead = MockPeripheral::new("A1:00:00:00:00:01");
        // Exactly enough refusals to exhaust the cap; a post-cap attempt
        // would succeed and be visible as a write.
        dead.plan_connects(&[false; 6]);
        let healthy = MockPeripheral::new("B0:00:00:00:00:02");
        let transport = MockTransport::new(vec![dead.clone(), healthy.clone()]);

        let failures = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&failures);

        let mut fleet = FleetManager::new(transport);
        fleet.on_failure(Box::new(move |index, address| {
            seen.lock().unwrap().push((index, address.to_string()));
        }));
        fleet.start(2, SCAN).await.unwrap();

        // Enough ticks for the dead handle to burn through every retry.
        ticks(&mut fleet, 2000).await;

        let dead_light = fleet.light(0).unwrap();
        assert_eq!(dead_light.state(), LinkState::Failed);
        assert!(dead_light.retries() > MAX_RETRIES);
        assert_eq!(fleet.backoff_multiplier(), 1);
        assert_eq!(
            failures.lock().unwrap().as_slice(),
            &[(0, "A1:00:00:00:00:01".to_string())]
        );

        // The healthy handle was never disturbed.
        assert!(fleet.light(1).unwrap().is_connected());

        // Failed handles are excluded from further sweeps.
        let attempts_after_cap = dead.writes().len();
        ticks(&mut fleet, 100).await;
        assert_eq!(dead.writes().len(), attempts_after_cap);
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_resets_when_fleet_healthy() {
        let flaky = MockPeripheral::new("A1:00:00:00:00:01");
        flaky.plan_connects(&[false, false, false]);
        let transport = MockTransport::new(vec![flaky.clone()]);

        let mut fleet = FleetManager::new(transport);
        fleet.start(1, SCAN).await.unwrap();

        ticks(&mut fleet, 10).await;
        assert_eq!(fleet.backoff_multiplier(), 2);
        ticks(&mut fleet, 10).await;
        assert_eq!(fleet.backoff_multiplier(), 3);

        // Next sweep (tick 60) succeeds and the whole fleet is healthy again.
        ticks(&mut fleet, 40).await;
        assert!(fleet.light(0).unwrap().is_connected());
        assert_eq!(fleet.backoff_multiplier(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_is_idempotent() {
        let peripherals = vec![
            MockPeripheral::new("A1:00:00:00:00:01"),
            MockPeripheral::new("B0:00:00:00:00:02"),
        ];
        let transport = MockTransport::new(peripherals);

        let mut fleet = FleetManager::new(transport);
        fleet.start(2, SCAN).await.unwrap();
        assert!(fleet.lights().iter().all(|l| l.is_connected()));

        fleet.shutdown().await;
        assert!(fleet.lights().iter().all(|l| !l.is_connected()));

        fleet.shutdown().await;
        assert!(fleet.lights().iter().all(|l| !l.is_connected()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_diagnostics_shape() {
        let transport = MockTransport::new(vec![MockPeripheral::new("A1:00:00:00:00:01")]);
        let mut fleet = FleetManager::new(transport);
        fleet.start(1, SCAN).await.unwrap();

        let diag = fleet.diagnostics();
        assert_eq!(diag["total"], 1);
        assert_eq!(diag["connected"], 1);
        assert_eq!(diag["failed"], 0);
        assert_eq!(diag["lights"][0]["address"], "A1:00:00:00:00:01");
    }
}
