//! Per-client subscription bookkeeping
//!
//! A client subscribes to a device by sending a DATA registration request
//! and keeps the subscription alive by repeating it; anything not renewed
//! within [`REQUEST_TIMEOUT_US`] is reaped by the periodic sweep.
//!
//! The table is three indices over one set of records plus the per-client
//! packet counters:
//!
//! | Index | Keyed by | Answers |
//! |-------|----------|---------|
//! | `clients` | `(client_id, DeviceId)` | the record itself |
//! | `device_to_clients` | `DeviceId` | who gets this device's frames |
//! | `client_to_devices` | `client_id` | does this client still subscribe to anything |
//!
//! All three are updated together; a record present in one index but
//! missing from another is a bug, not a runtime condition.

use crate::device::DeviceId;
use crate::protocol::constants::REQUEST_TIMEOUT_US;
use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;

/// One live subscription of a client to a device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientRecord {
    /// Where data frames for this subscription are sent. Refreshed on
    /// every renewal, so a client rebinding its source port keeps working.
    pub addr: SocketAddr,
    pub client_id: u32,
    /// Monotonic microseconds of the last registration request
    pub last_request_us: u64,
}

/// Subscription table with expiry
///
/// Packet counters are per client, not per subscription: one counter
/// feeds the frames of every device the client watches. Counters are
/// `u32` and wrap silently, matching what DSU clients expect.
#[derive(Debug, Default)]
pub struct SubscriptionTable {
    clients: HashMap<(u32, DeviceId), ClientRecord>,
    device_to_clients: HashMap<DeviceId, HashSet<u32>>,
    client_to_devices: HashMap<u32, HashSet<DeviceId>>,
    packet_counters: HashMap<u32, u32>,
}

impl SubscriptionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create or renew the `(client_id, device)` subscription
    pub fn register(&mut self, client_id: u32, device: DeviceId, addr: SocketAddr, now_us: u64) {
        match self.clients.entry((client_id, device)) {
            Entry::Occupied(mut e) => {
                let record = e.get_mut();
                record.last_request_us = now_us;
                record.addr = addr;
            }
            Entry::Vacant(e) => {
                log::debug!(
                    "SetuPad: Client {} @ {} subscribed to {}",
                    client_id,
                    addr,
                    device
                );
                e.insert(ClientRecord {
                    addr,
                    client_id,
                    last_request_us: now_us,
                });
                self.device_to_clients.entry(device).or_default().insert(client_id);
                self.client_to_devices.entry(client_id).or_default().insert(device);
                self.packet_counters.entry(client_id).or_insert(0);
            }
        }
    }

    /// Records currently subscribed to `device`
    pub fn subscribers(&self, device: DeviceId) -> Vec<ClientRecord> {
        match self.device_to_clients.get(&device) {
            Some(ids) => ids
                .iter()
                .map(|&client_id| {
                    // I1: every index entry has a backing record
                    self.clients[&(client_id, device)]
                })
                .collect(),
            None => Vec::new(),
        }
    }

    /// Fetch-and-increment the packet number for `client_id`
    ///
    /// Wraps silently at `u32::MAX`.
    pub fn next_packet_number(&mut self, client_id: u32) -> u32 {
        let counter = self.packet_counters.entry(client_id).or_insert(0);
        let n = *counter;
        *counter = counter.wrapping_add(1);
        n
    }

    /// Drop every subscription older than [`REQUEST_TIMEOUT_US`], then
    /// the packet counters of clients with no subscriptions left
    pub fn sweep(&mut self, now_us: u64) {
        let expired: Vec<(u32, DeviceId)> = self
            .clients
            .iter()
            .filter(|(_, record)| now_us.saturating_sub(record.last_request_us) > REQUEST_TIMEOUT_US)
            .map(|(&key, _)| key)
            .collect();

        for (client_id, device) in expired {
            log::debug!(
                "SetuPad: Client {} subscription to {} expired",
                client_id,
                device
            );
            self.clients.remove(&(client_id, device));

            // A key in `clients` is always mirrored in both indices
            let in_device_index = self
                .device_to_clients
                .get_mut(&device)
                .map(|set| set.remove(&client_id))
                .unwrap_or(false);
            debug_assert!(in_device_index, "device index out of sync");
            if self.device_to_clients.get(&device).is_some_and(HashSet::is_empty) {
                self.device_to_clients.remove(&device);
            }

            let in_client_index = self
                .client_to_devices
                .get_mut(&client_id)
                .map(|set| set.remove(&device))
                .unwrap_or(false);
            debug_assert!(in_client_index, "client index out of sync");
            if self.client_to_devices.get(&client_id).is_some_and(HashSet::is_empty) {
                self.client_to_devices.remove(&client_id);
            }
        }

        // Counters go second so clients expired above are purged in the
        // same sweep
        let alive = &self.client_to_devices;
        self.packet_counters
            .retain(|client_id, _| alive.contains_key(client_id));
    }

    pub fn subscription_count(&self) -> usize {
        self.clients.len()
    }

    #[cfg(test)]
    pub fn has_counter(&self, client_id: u32) -> bool {
        self.packet_counters.contains_key(&client_id)
    }
}
