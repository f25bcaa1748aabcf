//! DSU server: socket, device registry, request dispatch and lifecycle
//!
//! # Scheduling Model
//!
//! Everything runs on one thread. The server never blocks and never
//! spawns: the embedding application drives it by calling the pump
//! methods from its own loop, or hands the thread over to [`PadServer::run`],
//! which multiplexes the three inputs a DSU server needs:
//!
//! 1. **Socket readability** — [`PadServer::pump_socket`] drains every
//!    currently buffered datagram
//! 2. **Device events** — [`PadServer::pump_events`] drains the channel
//!    devices raise `updated`/`disconnected` through
//! 3. **Expiry timer** — [`PadServer::sweep`] runs on a 1 second cadence
//!
//! # Slots
//!
//! Up to four devices, slot id = insertion order. Removing a device
//! shifts higher slots down, exactly as DSU clients expect. Subscription
//! state keys on the stable [`DeviceId`] instead of the slot, so the
//! shift costs nothing; entries for a removed device simply stop
//! matching and age out within one request timeout.

pub mod emitter;
pub mod subscriptions;

use crate::config::Config;
use crate::device::{format_mac, DeviceEvent, DeviceId, EventSink, SharedPad};
use crate::error::{Error, Result};
use crate::protocol::constants::{
    DATA_REQUEST_BODY_SIZE, FULL_HEADER_SIZE, MAGIC_CLIENT, MAX_PORTS_PER_REQUEST, MSG_DATA,
    MSG_PORTS, MSG_VERSION, RECV_BUFFER_SIZE, SLOTS_PER_SERVER, SWEEP_INTERVAL,
};
use crate::protocol::{messages, parse_header};
use crossbeam_channel::{Receiver, Sender};
use std::net::{SocketAddr, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

struct RegisteredDevice {
    id: DeviceId,
    handle: SharedPad,
}

/// Cemuhook DSU server
///
/// # Examples
///
/// ```no_run
/// use setu_pad::{Config, PadServer};
/// use std::sync::atomic::AtomicBool;
/// use std::sync::Arc;
///
/// # fn main() -> setu_pad::Result<()> {
/// let mut server = PadServer::new(&Config::default())?;
/// // server.add_device(pad)?;
///
/// let running = Arc::new(AtomicBool::new(true));
/// server.run(&running);
/// # Ok(())
/// # }
/// ```
pub struct PadServer {
    socket: UdpSocket,
    server_id: u32,
    devices: Vec<RegisteredDevice>,
    next_device_id: u32,
    table: subscriptions::SubscriptionTable,
    events_tx: Sender<DeviceEvent>,
    events_rx: Receiver<DeviceEvent>,
    started: Instant,
    last_sweep: Instant,
}

impl PadServer {
    /// Bind the UDP socket and initialise an empty registry
    pub fn new(config: &Config) -> Result<Self> {
        let addr = config.network.socket_addr()?;
        let socket = UdpSocket::bind(addr)?;
        socket.set_nonblocking(true)?;

        let server_id: u32 = rand::random();
        let (events_tx, events_rx) = crossbeam_channel::unbounded();

        log::info!(
            "SetuPad: Server {:#010x} listening on {}",
            server_id,
            socket.local_addr()?
        );

        Ok(Self {
            socket,
            server_id,
            devices: Vec::with_capacity(SLOTS_PER_SERVER),
            next_device_id: 0,
            table: subscriptions::SubscriptionTable::new(),
            events_tx,
            events_rx,
            started: Instant::now(),
            last_sweep: Instant::now(),
        })
    }

    /// The random id stamped into every outbound header
    pub fn server_id(&self) -> u32 {
        self.server_id
    }

    /// Address the socket actually bound (useful with port 0)
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    /// Number of currently registered devices
    pub fn active_devices_count(&self) -> u8 {
        self.devices.len() as u8
    }

    /// Register a device in the next free slot
    ///
    /// Installs the event sink the device raises `updated` and
    /// `disconnected` through. There is no `remove_device`: removal is
    /// always device-initiated via the `disconnected` signal.
    pub fn add_device(&mut self, device: SharedPad) -> Result<DeviceId> {
        if self
            .devices
            .iter()
            .any(|d| Arc::ptr_eq(&d.handle, &device))
        {
            return Err(Error::AlreadyServing);
        }
        if self.devices.len() >= SLOTS_PER_SERVER {
            return Err(Error::ServerFull(SLOTS_PER_SERVER));
        }

        let id = DeviceId(self.next_device_id);
        self.next_device_id += 1;

        {
            let mut dev = device.lock();
            dev.attach(EventSink::new(id, self.events_tx.clone()));
            log::info!(
                "SetuPad: {} (MAC {}) registered at slot {}",
                id,
                format_mac(dev.mac()),
                self.devices.len()
            );
        }
        self.devices.push(RegisteredDevice { id, handle: device });

        Ok(id)
    }

    /// Monotonic microseconds since server construction
    fn now_us(&self) -> u64 {
        self.started.elapsed().as_micros() as u64
    }

    // === Socket pump ===

    /// Drain every datagram currently buffered on the socket
    pub fn pump_socket(&mut self) {
        let mut buf = [0u8; RECV_BUFFER_SIZE];
        loop {
            match self.socket.recv_from(&mut buf) {
                Ok((len, addr)) => self.handle_datagram(&buf[..len], addr),
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => break,
                Err(e) => {
                    log::warn!("SetuPad: Socket receive error: {}", e);
                    break;
                }
            }
        }
    }

    fn handle_datagram(&mut self, buf: &[u8], addr: SocketAddr) {
        let header = match parse_header(MAGIC_CLIENT, buf) {
            Ok(header) => header,
            Err(e) => {
                log::debug!("SetuPad: Dropping datagram from {}: {}", addr, e);
                return;
            }
        };

        let body = &buf[FULL_HEADER_SIZE..];
        match header.message_type {
            MSG_VERSION => self.handle_version(addr),
            MSG_PORTS => self.handle_ports(body, addr),
            MSG_DATA => self.handle_data(header.source_id, body, addr),
            other => {
                log::debug!(
                    "SetuPad: Unknown message type {:#x} from {}",
                    other,
                    addr
                );
            }
        }
    }

    fn handle_version(&self, addr: SocketAddr) {
        let reply = messages::version_reply(self.server_id);
        self.send_reply(&reply, addr);
    }

    fn handle_ports(&self, body: &[u8], addr: SocketAddr) {
        if body.len() < 4 {
            log::debug!("SetuPad: Truncated PORTS request from {}", addr);
            return;
        }
        let count = u32::from_le_bytes([body[0], body[1], body[2], body[3]]) as usize;
        let slot_ids = &body[4..];

        // The count is sender-controlled; never trust it further than the
        // actual body
        for &slot_id in slot_ids.iter().take(count.min(MAX_PORTS_PER_REQUEST)) {
            if slot_id as usize >= SLOTS_PER_SERVER {
                log::debug!(
                    "SetuPad: PORTS request from {} names invalid slot {}",
                    addr,
                    slot_id
                );
                continue;
            }

            let info = self
                .devices
                .get(slot_id as usize)
                .map(|d| emitter::slot_info(&*d.handle.lock()));
            let reply = messages::ports_reply(self.server_id, slot_id, info.as_ref());
            self.send_reply(&reply, addr);
        }
    }

    fn handle_data(&mut self, client_id: u32, body: &[u8], addr: SocketAddr) {
        if body.len() < DATA_REQUEST_BODY_SIZE {
            log::debug!("SetuPad: Truncated DATA request from {}", addr);
            return;
        }
        let registration = body[0];
        let slot = body[1];
        let mac = u64::from(body[2]) << 40
            | u64::from(body[3]) << 32
            | u64::from(body[4]) << 24
            | u64::from(body[5]) << 16
            | u64::from(body[6]) << 8
            | u64::from(body[7]);

        let mut selected: Vec<DeviceId> = Vec::new();
        if registration == 0 {
            // ALL mode: everything currently registered
            selected.extend(self.devices.iter().map(|d| d.id));
        } else {
            if registration & 0x01 != 0 {
                if let Some(d) = self.devices.get(slot as usize) {
                    selected.push(d.id);
                }
            }
            if registration & 0x02 != 0 {
                if mac == 0 {
                    log::warn!(
                        "SetuPad: Client {} registering by MAC 0 - matches every device without a unique identity",
                        client_id
                    );
                }
                for d in &self.devices {
                    if d.handle.lock().mac() == mac && !selected.contains(&d.id) {
                        selected.push(d.id);
                    }
                }
            }
        }

        let now_us = self.now_us();
        for id in selected {
            self.table.register(client_id, id, addr, now_us);
        }
    }

    fn send_reply(&self, reply: &[u8], addr: SocketAddr) {
        if let Err(e) = self.socket.send_to(reply, addr) {
            log::warn!("SetuPad: Failed to send reply to {}: {}", addr, e);
        }
    }

    // === Device event pump ===

    /// Drain the device event channel
    pub fn pump_events(&mut self) {
        while let Ok(event) = self.events_rx.try_recv() {
            match event {
                DeviceEvent::Updated(id) => self.device_updated(id),
                DeviceEvent::Disconnected(id) => self.device_disconnected(id),
            }
        }
    }

    fn slot_of(&self, id: DeviceId) -> Option<usize> {
        self.devices.iter().position(|d| d.id == id)
    }

    fn device_updated(&mut self, id: DeviceId) {
        let Some(slot) = self.slot_of(id) else {
            // update raced a disconnect; the device is already gone
            log::debug!("SetuPad: Dropping update from unregistered {}", id);
            return;
        };
        assert!(slot < SLOTS_PER_SERVER);

        let (info, snapshot) = {
            let dev = self.devices[slot].handle.lock();
            emitter::snapshot_device(&*dev)
        };
        emitter::fan_out(
            &self.socket,
            self.server_id,
            slot as u8,
            id,
            &info,
            &snapshot,
            &mut self.table,
        );
    }

    fn device_disconnected(&mut self, id: DeviceId) {
        let Some(slot) = self.slot_of(id) else {
            return;
        };
        log::info!("SetuPad: {} disconnected, freeing slot {}", id, slot);

        let removed = self.devices.remove(slot);
        removed.handle.lock().detach();
        // Subscription entries for this device stay behind on purpose:
        // they hold no device resources and the sweeper reaps them within
        // the request timeout.
    }

    // === Expiry timer ===

    /// Expire stale subscriptions; call on a 1 second cadence
    pub fn sweep(&mut self) {
        let now_us = self.now_us();
        self.table.sweep(now_us);
    }

    /// Built-in cooperative driver
    ///
    /// Drains the socket and the device channel, sweeps once a second and
    /// yields the CPU briefly when idle. Returns when `running` is
    /// cleared. Applications with their own main loop can skip this and
    /// call the pump methods directly.
    pub fn run(&mut self, running: &AtomicBool) {
        log::info!("SetuPad: Server loop started");

        while running.load(Ordering::Relaxed) {
            self.pump_socket();
            self.pump_events();

            if self.last_sweep.elapsed() >= SWEEP_INTERVAL {
                self.sweep();
                self.last_sweep = Instant::now();
            }

            std::thread::sleep(Duration::from_millis(1));
        }

        log::info!("SetuPad: Server loop stopped");
    }
}

impl Drop for PadServer {
    fn drop(&mut self) {
        // Detach every device before any state goes away, so a device may
        // still poke its (soon to be dead) sink from another thread
        // without consequence.
        for d in &self.devices {
            d.handle.lock().detach();
        }
        log::info!("SetuPad: Server {:#010x} shut down", self.server_id);
    }
}
