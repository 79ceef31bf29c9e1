//! Discover a simulated fleet of light engines and drive it through a few
//! lighting states.
//!
//! This example demonstrates:
//! - Discovery ordering by BLE address, independent of arrival order
//! - Initial connect, reconnect backoff, frame replay, and shutdown
//!
//! The BLE stack is replaced by a small in-memory transport so the demo runs
//! anywhere. One peripheral refuses its first two connect attempts to make
//! the reconnect sweep visible.
//!
//! Run with: cargo run --example simulated_fleet

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rgbw_lights_rs::transport::{
    Advertisement, CHARACTERISTIC_UUID, ConnectionFlag, SERVICE_UUID, Transport, TransportClient,
    TransportScanner,
};
use rgbw_lights_rs::{ColorRgbw, Error, FleetManager};
use uuid::Uuid;

/// One simulated light engine peripheral.
#[derive(Clone)]
struct SimPeripheral {
    inner: Arc<SimState>,
}

struct SimState {
    address: String,
    refusals_left: Mutex<u32>,
    writes: Mutex<Vec<Vec<u8>>>,
}

impl SimPeripheral {
    fn new(address: &str, refusals: u32) -> Self {
        SimPeripheral {
            inner: Arc::new(SimState {
                address: address.to_string(),
                refusals_left: Mutex::new(refusals),
                writes: Mutex::new(Vec::new()),
            }),
        }
    }
}

struct SimTransport {
    peripherals: Vec<SimPeripheral>,
}

impl Transport for SimTransport {
    type DeviceRef = SimPeripheral;
    type Scanner = SimScanner;
    type Client = SimClient;

    fn scanner(&self) -> Result<SimScanner, Error> {
        Ok(SimScanner {
            pending: self.peripherals.iter().cloned().collect(),
        })
    }

    fn create_client(&self, link: ConnectionFlag) -> Result<SimClient, Error> {
        Ok(SimClient {
            link,
            peripheral: None,
        })
    }
}

struct SimScanner {
    pending: VecDeque<SimPeripheral>,
}

impl TransportScanner for SimScanner {
    type DeviceRef = SimPeripheral;

    async fn start_scan(&mut self, _duration: Duration, _active: bool) -> Result<(), Error> {
        Ok(())
    }

    async fn next_advertisement(&mut self) -> Result<Option<Advertisement<SimPeripheral>>, Error> {
        Ok(self.pending.pop_front().map(|peripheral| Advertisement {
            address: peripheral.inner.address.clone(),
            services: vec![SERVICE_UUID],
            device: peripheral,
        }))
    }

    async fn stop_scan(&mut self) -> Result<(), Error> {
        Ok(())
    }
}

struct SimClient {
    link: ConnectionFlag,
    peripheral: Option<SimPeripheral>,
}

impl TransportClient for SimClient {
    type DeviceRef = SimPeripheral;

    async fn connect_link(&mut self, device: &SimPeripheral) -> Result<bool, Error> {
        let mut refusals = device.inner.refusals_left.lock().unwrap();
        if *refusals > 0 {
            *refusals -= 1;
            return Ok(false);
        }
        self.link.set_up(true);
        self.peripheral = Some(device.clone());
        Ok(true)
    }

    async fn disconnect_link(&mut self) -> Result<(), Error> {
        self.link.set_up(false);
        self.peripheral = None;
        Ok(())
    }

    async fn has_service(&mut self, service: Uuid) -> Result<bool, Error> {
        Ok(service == SERVICE_UUID)
    }

    async fn has_characteristic(&mut self, characteristic: Uuid) -> Result<bool, Error> {
        Ok(characteristic == CHARACTERISTIC_UUID)
    }

    async fn write_characteristic(&mut self, bytes: &[u8]) -> Result<(), Error> {
        if let Some(peripheral) = &self.peripheral {
            peripheral.inner.writes.lock().unwrap().push(bytes.to_vec());
        }
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let peripherals = vec![
        SimPeripheral::new("C4:00:00:00:00:03", 0),
        SimPeripheral::new("A9:00:00:00:00:01", 2), // flaky: refuses twice
        SimPeripheral::new("B2:00:00:00:00:02", 0),
    ];
    let transport = Arc::new(SimTransport {
        peripherals: peripherals.clone(),
    });

    let mut fleet = FleetManager::new(transport);
    fleet.on_failure(Box::new(|index, address| {
        println!("light {index} ({address}) failed permanently");
    }));

    println!("Scanning for light engines...");
    let found = fleet.start(3, Duration::from_secs(5)).await?;
    println!("Found {found} light engine(s), in address order:");
    for light in fleet.lights() {
        println!(
            "  - {} connected={}",
            light.address(),
            light.is_connected()
        );
    }

    // Set every engine to warm red at 80% brightness.
    println!("\nSetting all lights to red...");
    for index in 0..fleet.len() {
        if let Some(light) = fleet.light_mut(index) {
            light
                .set_color_brightness_power(80, ColorRgbw::rgb(255, 0, 0), true)
                .await;
        }
    }

    // Drive the tick until the flaky engine has reconnected; the red frame
    // is replayed for it automatically.
    for _ in 0..40 {
        fleet.tick().await;
    }

    println!("\nFrames received per engine:");
    for peripheral in &peripherals {
        println!(
            "  - {}: {} frame(s)",
            peripheral.inner.address,
            peripheral.inner.writes.lock().unwrap().len()
        );
    }
    println!("\nDiagnostics: {}", fleet.diagnostics());

    fleet.shutdown().await;
    println!("Fleet shut down.");
    Ok(())
}
