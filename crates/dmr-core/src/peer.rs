use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Instant;

/// Connection state of a repeater, in handshake order. `Dead` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PeerStatus {
    Login,
    Auth,
    Config,
    Active,
    Dead,
}

impl PeerStatus {
    /// Whether a peer currently in `current` accepts a packet whose
    /// minimum required state is `test`.
    ///
    /// `Dead` accepts nothing. `Login` requires an exact match — a peer
    /// past the login step can never re-process `RPTL`, even though
    /// `Login` is ordinally the smallest state. Every other state matches
    /// loosely: a peer may still be applicable for a lower-required packet
    /// once it has progressed past it.
    pub fn is_applicable(self, test: PeerStatus) -> bool {
        match self {
            PeerStatus::Dead => false,
            PeerStatus::Login => test == PeerStatus::Login,
            _ => self >= test,
        }
    }
}

/// A subscriber radio heard transmitting through a peer, tracked so UNIT
/// calls can be routed to the repeater(s) that last heard that unit.
#[derive(Debug, Clone, Copy)]
pub struct Unit {
    pub unit_id: u32,
    pub last_heard: Instant,
}

/// The 13 ASCII fields a repeater reports in its RPTC configuration
/// packet, stored verbatim (space-trimmed) as the original's
/// `peer_controller.py` keeps the whole dict rather than projecting out
/// a subset.
#[derive(Debug, Clone, Default)]
pub struct PeerConfig {
    pub callsign: String,
    pub rx_freq: String,
    pub tx_freq: String,
    pub power: String,
    pub color_code: String,
    pub lat: String,
    pub lon: String,
    pub height: String,
    pub location: String,
    pub description: String,
    pub slots: String,
    pub url: String,
    pub software_id: String,
    pub package_id: String,
}

/// A connected repeater.
#[derive(Debug, Clone)]
pub struct Peer {
    pub addr: SocketAddr,
    pub peer_id: u32,
    pub status: PeerStatus,
    pub salt: [u8; 4],
    pub last_active: Instant,
    pub config: PeerConfig,
    pub units: HashMap<u32, Instant>,
}

impl Peer {
    pub fn new(addr: SocketAddr, now: Instant) -> Self {
        Self {
            addr,
            peer_id: 0,
            status: PeerStatus::Login,
            salt: [0; 4],
            last_active: now,
            config: PeerConfig::default(),
            units: HashMap::new(),
        }
    }

    pub fn touch(&mut self, now: Instant) {
        self.last_active = now;
    }

    pub fn update_unit(&mut self, unit_id: u32, now: Instant) {
        self.units.insert(unit_id, now);
    }

    /// Removes units that haven't been heard from in `timeout`.
    pub fn expire_units(&mut self, now: Instant, timeout: std::time::Duration) {
        self.units.retain(|_, last_heard| now.duration_since(*last_heard) < timeout);
    }

    pub fn has_unit(&self, unit_id: u32) -> bool {
        self.units.contains_key(&unit_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_is_exact_match_only() {
        assert!(PeerStatus::Login.is_applicable(PeerStatus::Login));
        assert!(!PeerStatus::Active.is_applicable(PeerStatus::Login));
        assert!(!PeerStatus::Auth.is_applicable(PeerStatus::Login));
    }

    #[test]
    fn active_is_forward_loose() {
        assert!(PeerStatus::Active.is_applicable(PeerStatus::Auth));
        assert!(PeerStatus::Active.is_applicable(PeerStatus::Config));
        assert!(PeerStatus::Active.is_applicable(PeerStatus::Active));
    }

    #[test]
    fn dead_accepts_nothing() {
        assert!(!PeerStatus::Dead.is_applicable(PeerStatus::Login));
        assert!(!PeerStatus::Dead.is_applicable(PeerStatus::Active));
        assert!(!PeerStatus::Dead.is_applicable(PeerStatus::Dead));
    }

    #[test]
    fn active_peer_resending_login_does_not_reset_state() {
        // This is the preserved quirk: an ACTIVE peer re-sending RPTL is
        // simply not applicable, not a state reset back to LOGIN.
        let peer_status = PeerStatus::Active;
        assert!(!peer_status.is_applicable(PeerStatus::Login));
    }
}
