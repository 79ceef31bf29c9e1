//! Individual light engine control.

use std::sync::Arc;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::errors::Error;
use crate::frame::Frame;
use crate::status::EngineStatus;
use crate::transport::{
    CHARACTERISTIC_UUID, ConnectionFlag, SERVICE_UUID, Transport, TransportClient,
};
use crate::types::ColorRgbw;

type Result<T> = std::result::Result<T, Error>;

/// Connection lifecycle of a [`Light`].
///
/// `Failed` is terminal: a handle that exhausted its retries (or turned out
/// not to be a compatible peripheral) is never reconnected, but it stays in
/// the fleet for status reporting.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Unbound,
    Connecting,
    Connected,
    Disconnected,
    Failed,
}

/// A single RGBW light engine and its connection state machine.
///
/// The handle owns the peripheral's [`Frame`] as the local source of truth:
/// every mutation lands in the frame first and is then opportunistically
/// flushed with [`Light::push`]. The peripheral keeps no memory of missed
/// updates, so the full frame is replayed after any reconnection.
pub struct Light<T: Transport> {
    transport: Arc<T>,
    address: String,
    name: Option<String>,
    device: Option<T::DeviceRef>,
    client: Option<T::Client>,
    link: ConnectionFlag,
    frame: Frame,
    state: LinkState,
    retries: u32,
}

impl<T: Transport> Light<T> {
    pub fn new(transport: Arc<T>, address: &str, name: Option<&str>) -> Self {
        Light {
            transport,
            address: address.to_string(),
            name: name.map(String::from),
            device: None,
            client: None,
            link: ConnectionFlag::new(),
            frame: Frame::new(),
            state: LinkState::Unbound,
            retries: 0,
        }
    }

    /// Link-layer address captured from the advertisement, also the handle's
    /// sort key within the fleet.
    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn set_name(&mut self, name: Option<&str>) {
        self.name = name.map(String::from);
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    /// Reconnect attempts since the last successful connect.
    pub fn retries(&self) -> u32 {
        self.retries
    }

    /// Attach the transport-level device reference found during discovery.
    ///
    /// Required before [`Light::connect`].
    pub fn bind(&mut self, device: T::DeviceRef) {
        self.device = Some(device);
        if self.state == LinkState::Unbound {
            self.state = LinkState::Disconnected;
        }
    }

    /// Live link state, written only by the transport's connection callback.
    pub fn is_connected(&self) -> bool {
        self.link.is_up()
    }

    /// The handle's current desired state.
    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    /// Snapshot of the last state written (or queued) for this engine.
    pub fn status(&self) -> EngineStatus {
        EngineStatus::new(&self.frame, self.name.as_deref())
    }

    /// Attempt the three-step handshake: link connect, locate the control
    /// service, locate the control characteristic.
    ///
    /// Returns `false` and leaves the handle `Disconnected` when any step
    /// fails transiently. A peripheral that connects but lacks the expected
    /// service or characteristic is not one of ours: the link is torn down
    /// and the handle goes straight to `Failed`.
    pub async fn connect(&mut self) -> bool {
        if self.state == LinkState::Failed {
            return false;
        }
        if self.is_connected() {
            return true;
        }
        let Some(device) = self.device.clone() else {
            warn!("{}: connect() called before bind()", self.address);
            return false;
        };

        self.state = LinkState::Connecting;
        match self.try_connect(&device).await {
            Ok(()) => {
                info!("{}: connected", self.address);
                self.state = LinkState::Connected;
                self.retries = 0;
                true
            }
            Err(err @ (Error::ServiceNotFound(_) | Error::CharacteristicNotFound(_))) => {
                warn!("{}: not a compatible light engine: {err}", self.address);
                self.state = LinkState::Failed;
                false
            }
            Err(err) => {
                debug!("{}: connect attempt failed: {err}", self.address);
                self.state = LinkState::Disconnected;
                false
            }
        }
    }

    async fn try_connect(&mut self, device: &T::DeviceRef) -> Result<()> {
        let mut client = self.transport.create_client(self.link.clone())?;

        if !client.connect_link(device).await? {
            return Err(Error::transport("connect", "link attempt refused"));
        }
        if !client.has_service(SERVICE_UUID).await? {
            self.teardown(&mut client).await;
            return Err(Error::ServiceNotFound(SERVICE_UUID));
        }
        if !client.has_characteristic(CHARACTERISTIC_UUID).await? {
            self.teardown(&mut client).await;
            return Err(Error::CharacteristicNotFound(CHARACTERISTIC_UUID));
        }

        self.client = Some(client);
        Ok(())
    }

    async fn teardown(&self, client: &mut T::Client) {
        if let Err(err) = client.disconnect_link().await {
            warn!("{}: teardown failed: {err}", self.address);
        }
    }

    /// Request link teardown; no-op if not connected.
    pub async fn disconnect(&mut self) {
        if let Some(mut client) = self.client.take()
            && self.is_connected()
        {
            if let Err(err) = client.disconnect_link().await {
                warn!("{}: disconnect failed: {err}", self.address);
            }
        }
        if self.state == LinkState::Connected {
            self.state = LinkState::Disconnected;
        }
    }

    /// Transmit the full current frame if and only if the link is up.
    ///
    /// A write while disconnected is silently dropped (logged); the fleet's
    /// reconnect path re-pushes the frame once the link comes back.
    pub async fn push(&mut self) {
        if !self.is_connected() {
            debug!("{}: dropping frame write while disconnected", self.address);
            return;
        }
        let Some(client) = self.client.as_mut() else {
            debug!("{}: dropping frame write, no client", self.address);
            return;
        };
        if let Err(err) = client.write_characteristic(&self.frame.encode()).await {
            warn!("{}: frame write failed: {err}", self.address);
        }
    }

    pub async fn set_power(&mut self, on: bool) {
        self.frame.set_power(on);
        self.push().await;
    }

    pub async fn set_color(&mut self, color: ColorRgbw) {
        self.frame.set_color(color);
        self.push().await;
    }

    pub async fn set_brightness(&mut self, brightness: u8) {
        self.frame.set_brightness(brightness);
        self.push().await;
    }

    /// Atomically update color, brightness, and power in one write.
    pub async fn set_color_brightness_power(
        &mut self,
        brightness: u8,
        color: ColorRgbw,
        power: bool,
    ) {
        self.frame
            .set_color_brightness_power(brightness, color, power);
        self.push().await;
    }

    pub async fn set_effect(&mut self, index: u8, speed: u8) {
        self.frame.set_effect(index, speed);
        self.push().await;
    }

    pub async fn set_twinkle_speed(&mut self, speed: u8) {
        self.frame.set_twinkle(speed);
        self.push().await;
    }

    pub async fn set_music_mode(&mut self, level: u8) {
        self.frame.set_music_mode(level);
        self.push().await;
    }

    pub(crate) fn mark_failed(&mut self) {
        self.state = LinkState::Failed;
    }

    pub(crate) fn bump_retries(&mut self) {
        self.retries += 1;
    }

    /// An initial connect failure starts the handle at retry count 1 so it
    /// gets the same backoff treatment as a handle that drops later.
    pub(crate) fn seed_retry(&mut self) {
        self.retries = 1;
    }
}
