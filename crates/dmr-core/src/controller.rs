//! Per-packet peer state machine: LOGIN → AUTH → CONFIG → ACTIVE, terminal
//! DEAD. See SPEC_FULL.md §4.D for the full transition table.

use std::net::SocketAddr;
use std::time::Instant;

use dmr_proto::packet::{Ack, MasterClose, Pong, Salt};
use dmr_proto::Packet;

use crate::auth::AuthPolicy;
use crate::error::DmrError;
use crate::peer::PeerStatus;
use crate::registry::PeerRegistry;

/// Outcome of running one inbound packet through the controller.
#[derive(Debug, Clone, Default)]
pub struct ControlResult {
    /// Bytes to send back to the originating address, if any.
    pub reply: Option<Vec<u8>>,
    /// Whether the dispatcher should continue processing this packet
    /// (call tracking + distribution). Only set for `DMRD`/`DMRA`.
    pub forward: bool,
}

impl ControlResult {
    fn drop() -> Self {
        Self::default()
    }

    fn reply(bytes: Vec<u8>) -> Self {
        Self { reply: Some(bytes), forward: false }
    }

    fn forward() -> Self {
        Self { reply: None, forward: true }
    }
}

fn close_bytes(peer_id: u32) -> Vec<u8> {
    let mut p = MasterClose::new();
    p.set_peer_id(peer_id);
    p.as_bytes().to_vec()
}

fn ack_bytes(peer_id: u32) -> Vec<u8> {
    let mut p = Ack::new();
    p.set_peer_id(peer_id);
    p.as_bytes().to_vec()
}

fn pong_bytes(peer_id: u32) -> Vec<u8> {
    let mut p = Pong::new();
    p.set_peer_id(peer_id);
    p.as_bytes().to_vec()
}

fn required_status(packet: &Packet) -> Option<PeerStatus> {
    match packet {
        Packet::Login(_) => Some(PeerStatus::Login),
        Packet::Auth(_) => Some(PeerStatus::Auth),
        Packet::Config(_) => Some(PeerStatus::Config),
        Packet::Ping(_) => Some(PeerStatus::Active),
        Packet::Data(_) => Some(PeerStatus::Active),
        Packet::TalkerAlias(_) => Some(PeerStatus::Active),
        _ => None,
    }
}

/// Runs one inbound packet through the peer state machine, mutating
/// `registry` in place.
pub fn handle_inbound(
    registry: &mut PeerRegistry,
    auth: &dyn AuthPolicy,
    addr: SocketAddr,
    packet: &Packet,
    now: Instant,
) -> Result<ControlResult, DmrError> {
    if let Packet::RepeaterClose(_) = packet {
        if let Some(peer) = registry.get_mut(&addr) {
            tracing::info!(peer_id = peer.peer_id, %addr, "peer sent RPTCL");
            peer.status = PeerStatus::Dead;
        }
        return Ok(ControlResult::drop());
    }

    if let Packet::Login(login) = packet {
        let peer_id = login.peer_id();
        let current_status = registry.get(&addr).map(|p| p.status).unwrap_or(PeerStatus::Login);
        let duplicate = registry.get_by_id(peer_id).iter().any(|p| p.addr != addr);

        if !current_status.is_applicable(PeerStatus::Login)
            || duplicate
            || !auth.allow_peer_id(peer_id)
        {
            tracing::warn!(peer_id, %addr, duplicate, "login rejected");
            let peer = registry.get_by_addr(addr, now);
            peer.status = PeerStatus::Dead;
            return Ok(ControlResult::reply(close_bytes(peer_id)));
        }

        let peer = registry.get_by_addr(addr, now);
        peer.peer_id = peer_id;
        peer.status = PeerStatus::Auth;
        peer.touch(now);
        let salt = Salt::random();
        peer.salt = salt.salt();
        return Ok(ControlResult::reply(salt.as_bytes().to_vec()));
    }

    let Some(required) = required_status(packet) else {
        return Err(DmrError::ProtocolViolation(format!(
            "unexpected inbound packet type {}",
            packet.type_name()
        )));
    };

    let Some(peer) = registry.get_mut(&addr) else {
        return Err(DmrError::ProtocolViolation("packet from unregistered peer".into()));
    };

    if !peer.status.is_applicable(required) {
        let peer_id = peer.peer_id;
        peer.status = PeerStatus::Dead;
        tracing::warn!(peer_id, %addr, packet = packet.type_name(), "protocol violation: state mismatch");
        return Ok(ControlResult::reply(close_bytes(peer_id)));
    }

    match packet {
        Packet::Auth(p) => {
            if !auth.check_password(p.peer_id(), &peer.salt, &p.pass_hash()) {
                let peer_id = peer.peer_id;
                peer.status = PeerStatus::Dead;
                tracing::warn!(peer_id, %addr, "auth failure");
                return Ok(ControlResult::reply(close_bytes(peer_id)));
            }
            peer.peer_id = p.peer_id();
            peer.status = PeerStatus::Config;
            peer.touch(now);
            Ok(ControlResult::reply(ack_bytes(peer.peer_id)))
        }
        Packet::Config(p) => {
            peer.config = crate::peer::PeerConfig {
                callsign: p.callsign(),
                rx_freq: p.rx_freq(),
                tx_freq: p.tx_freq(),
                power: p.power(),
                color_code: p.color_code(),
                lat: p.lat(),
                lon: p.lon(),
                height: p.height(),
                location: p.location(),
                description: p.description(),
                slots: p.slots(),
                url: p.url(),
                software_id: p.software_id(),
                package_id: p.package_id(),
            };
            peer.status = PeerStatus::Active;
            peer.touch(now);
            tracing::info!(peer_id = peer.peer_id, callsign = %peer.config.callsign, "peer active");
            Ok(ControlResult::reply(ack_bytes(peer.peer_id)))
        }
        Packet::Ping(_) => {
            peer.touch(now);
            Ok(ControlResult::reply(pong_bytes(peer.peer_id)))
        }
        Packet::Data(p) => {
            peer.touch(now);
            peer.update_unit(p.src_id(), now);
            Ok(ControlResult::forward())
        }
        Packet::TalkerAlias(_) => Ok(ControlResult::forward()),
        _ => unreachable!("required_status only matches the variants handled above"),
    }
}
