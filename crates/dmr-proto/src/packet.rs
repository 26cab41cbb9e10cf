//! MMDVM/Homebrew wire packets.
//!
//! Every variant is a fixed-size, space/NUL-padded ASCII-and-binary frame.
//! Offsets are `const`s per variant rather than runtime-computed, unlike
//! the reference implementation's auto-offsetting descriptor.

use crate::error::ProtoError;
use crate::fields::{get_ascii, get_bytes, get_uint, set_ascii, set_bytes, set_uint};

macro_rules! peer_packet {
    ($name:ident, $magic:expr, $size:expr) => {
        #[derive(Debug, Clone, PartialEq, Eq)]
        pub struct $name {
            data: Vec<u8>,
        }

        impl $name {
            pub const MAGIC: &'static [u8] = $magic;
            pub const SIZE: usize = $size;

            pub fn new() -> Self {
                let mut data = vec![0u8; Self::SIZE];
                data[..Self::MAGIC.len()].copy_from_slice(Self::MAGIC);
                Self { data }
            }

            pub fn parse(data: &[u8]) -> Result<Self, ProtoError> {
                parse_fixed(data, Self::MAGIC, Self::SIZE)?;
                Ok(Self { data: data.to_vec() })
            }

            pub fn as_bytes(&self) -> &[u8] {
                &self.data
            }

            pub fn peer_id(&self) -> u32 {
                get_uint(&self.data, Self::MAGIC.len(), 4)
            }

            pub fn set_peer_id(&mut self, peer_id: u32) {
                set_uint(&mut self.data, Self::MAGIC.len(), 4, peer_id, "peer_id")
                    .expect("peer_id fits in u32");
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }
    };
}

fn parse_fixed(data: &[u8], magic: &'static [u8], size: usize) -> Result<(), ProtoError> {
    if !data.starts_with(magic) {
        return Err(ProtoError::BadPacket("magic mismatch"));
    }
    if data.len() != size {
        return Err(ProtoError::BadPacket("unexpected length"));
    }
    Ok(())
}

peer_packet!(Login, b"RPTL", 8);
peer_packet!(Ping, b"RPTPING", 11);
peer_packet!(Pong, b"MSTPONG", 11);
peer_packet!(MasterNak, b"MSTNAK", 10);
peer_packet!(MasterClose, b"MSTCL", 9);
peer_packet!(RepeaterClose, b"RPTCL", 9);
peer_packet!(Ack, b"RPTACK", 10);
peer_packet!(Beacon, b"RPTSBKN", 11);

/// Server-emitted salt challenge. Shares the `RPTACK` magic and size with
/// [`Ack`]; the two are distinguished by which side constructs them, never
/// by inspecting the bytes (see DESIGN.md).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Salt {
    data: Vec<u8>,
}

impl Salt {
    pub const MAGIC: &'static [u8] = b"RPTACK";
    pub const SIZE: usize = 10;
    const SALT_OFFSET: usize = 6;

    pub fn new() -> Self {
        let mut data = vec![0u8; Self::SIZE];
        data[..Self::MAGIC.len()].copy_from_slice(Self::MAGIC);
        Self { data }
    }

    /// Builds a salt packet with 4 cryptographically random bytes.
    pub fn random() -> Self {
        use rand::RngCore;
        let mut p = Self::new();
        let mut salt = [0u8; 4];
        rand::thread_rng().fill_bytes(&mut salt);
        p.set_salt(&salt);
        p
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn salt(&self) -> [u8; 4] {
        let v = get_bytes(&self.data, Self::SALT_OFFSET, 4);
        v.try_into().expect("4 bytes")
    }

    pub fn set_salt(&mut self, salt: &[u8; 4]) {
        set_bytes(&mut self.data, Self::SALT_OFFSET, 4, salt, "salt").expect("4 bytes fits");
    }
}

impl Default for Salt {
    fn default() -> Self {
        Self::new()
    }
}

/// `SHA-256(salt || password)` password challenge response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Auth {
    data: Vec<u8>,
}

impl Auth {
    pub const MAGIC: &'static [u8] = b"RPTK";
    pub const SIZE: usize = 40;
    const PEER_ID_OFFSET: usize = 4;
    const PASS_HASH_OFFSET: usize = 8;

    pub fn new() -> Self {
        let mut data = vec![0u8; Self::SIZE];
        data[..Self::MAGIC.len()].copy_from_slice(Self::MAGIC);
        Self { data }
    }

    pub fn parse(data: &[u8]) -> Result<Self, ProtoError> {
        parse_fixed(data, Self::MAGIC, Self::SIZE)?;
        Ok(Self { data: data.to_vec() })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn peer_id(&self) -> u32 {
        get_uint(&self.data, Self::PEER_ID_OFFSET, 4)
    }

    pub fn set_peer_id(&mut self, peer_id: u32) {
        set_uint(&mut self.data, Self::PEER_ID_OFFSET, 4, peer_id, "peer_id").expect("fits u32");
    }

    pub fn pass_hash(&self) -> [u8; 32] {
        let v = get_bytes(&self.data, Self::PASS_HASH_OFFSET, 32);
        v.try_into().expect("32 bytes")
    }

    pub fn set_pass_hash(&mut self, hash: &[u8; 32]) {
        set_bytes(&mut self.data, Self::PASS_HASH_OFFSET, 32, hash, "pass_hash").expect("32 bytes");
    }

    /// Sets `pass_hash` to `SHA-256(salt || password)`.
    pub fn set_password_hash(&mut self, salt: &[u8; 4], password: &str) {
        self.set_pass_hash(&calc_password_hash(salt, password));
    }

    pub fn check_password_hash(&self, salt: &[u8; 4], password: &str) -> bool {
        self.pass_hash() == calc_password_hash(salt, password)
    }
}

impl Default for Auth {
    fn default() -> Self {
        Self::new()
    }
}

pub fn calc_password_hash(salt: &[u8; 4], password: &str) -> [u8; 32] {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(salt);
    hasher.update(password.as_bytes());
    hasher.finalize().into()
}

/// Repeater configuration block: 13 fixed-width ASCII fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    data: Vec<u8>,
}

macro_rules! ascii_field {
    ($getter:ident, $setter:ident, $offset:expr, $len:expr) => {
        pub fn $getter(&self) -> String {
            get_ascii(&self.data, $offset, $len)
        }

        pub fn $setter(&mut self, value: &str) {
            set_ascii(&mut self.data, $offset, $len, value);
        }
    };
}

impl Config {
    pub const MAGIC: &'static [u8] = b"RPTC";
    pub const SIZE: usize = 302;
    const PEER_ID_OFFSET: usize = 4;

    pub fn new() -> Self {
        // Fields default to space-padded, not zero, per the original's `create()`.
        let mut data = vec![b' '; Self::SIZE];
        data[..Self::MAGIC.len()].copy_from_slice(Self::MAGIC);
        Self { data }
    }

    pub fn parse(data: &[u8]) -> Result<Self, ProtoError> {
        parse_fixed(data, Self::MAGIC, Self::SIZE)?;
        Ok(Self { data: data.to_vec() })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn peer_id(&self) -> u32 {
        get_uint(&self.data, Self::PEER_ID_OFFSET, 4)
    }

    pub fn set_peer_id(&mut self, peer_id: u32) {
        set_uint(&mut self.data, Self::PEER_ID_OFFSET, 4, peer_id, "peer_id").expect("fits u32");
    }

    ascii_field!(callsign, set_callsign, 8, 8);
    ascii_field!(rx_freq, set_rx_freq, 16, 9);
    ascii_field!(tx_freq, set_tx_freq, 25, 9);
    ascii_field!(power, set_power, 34, 2);
    ascii_field!(color_code, set_color_code, 36, 2);
    ascii_field!(lat, set_lat, 38, 8);
    ascii_field!(lon, set_lon, 46, 9);
    ascii_field!(height, set_height, 55, 3);
    ascii_field!(location, set_location, 58, 20);
    ascii_field!(description, set_description, 78, 19);
    ascii_field!(slots, set_slots, 97, 1);
    ascii_field!(url, set_url, 98, 124);
    ascii_field!(software_id, set_software_id, 222, 40);
    ascii_field!(package_id, set_package_id, 262, 40);
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

/// Talker-alias chunk, carried out-of-band from the in-call embedded LC.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TalkerAlias {
    data: Vec<u8>,
}

impl TalkerAlias {
    pub const MAGIC: &'static [u8] = b"DMRA";
    pub const SIZE: usize = 15;
    const PEER_ID_OFFSET: usize = 4;
    const SRC_ID_OFFSET: usize = 8;
    const TA_DATA_OFFSET: usize = 11;

    pub fn new() -> Self {
        let mut data = vec![0u8; Self::SIZE];
        data[..Self::MAGIC.len()].copy_from_slice(Self::MAGIC);
        Self { data }
    }

    pub fn parse(data: &[u8]) -> Result<Self, ProtoError> {
        parse_fixed(data, Self::MAGIC, Self::SIZE)?;
        Ok(Self { data: data.to_vec() })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn peer_id(&self) -> u32 {
        get_uint(&self.data, Self::PEER_ID_OFFSET, 4)
    }

    pub fn set_peer_id(&mut self, peer_id: u32) {
        set_uint(&mut self.data, Self::PEER_ID_OFFSET, 4, peer_id, "peer_id").expect("fits u32");
    }

    pub fn src_id(&self) -> u32 {
        get_uint(&self.data, Self::SRC_ID_OFFSET, 3)
    }

    pub fn set_src_id(&mut self, src_id: u32) -> Result<(), ProtoError> {
        set_uint(&mut self.data, Self::SRC_ID_OFFSET, 3, src_id, "src_id")
    }

    pub fn ta_data(&self) -> [u8; 4] {
        let v = get_bytes(&self.data, Self::TA_DATA_OFFSET, 4);
        v.try_into().expect("4 bytes")
    }

    pub fn set_ta_data(&mut self, ta_data: &[u8; 4]) {
        set_bytes(&mut self.data, Self::TA_DATA_OFFSET, 4, ta_data, "ta_data").expect("4 bytes");
    }
}

impl Default for TalkerAlias {
    fn default() -> Self {
        Self::new()
    }
}

/// Call type carried in the `DMRD` bits byte, bit 6.
#[derive(Debug, Clone, Copy, Hash)]
pub enum CallType {
    Group,
    Unit,
}

/// Combined view of bits 5..0 of the `DMRD` bits byte.
#[derive(Debug, Clone, Copy, Hash)]
pub enum VoiceType {
    None,
    Head,
    BurstA,
    BurstB,
    BurstC,
    BurstD,
    BurstE,
    BurstF,
    Term,
}

impl VoiceType {
    pub fn from_bits(bits6: u8) -> Self {
        match bits6 & 0x3F {
            0b100001 => VoiceType::Head,
            0b010000 => VoiceType::BurstA,
            0b000001 => VoiceType::BurstB,
            0b000010 => VoiceType::BurstC,
            0b000011 => VoiceType::BurstD,
            0b000100 => VoiceType::BurstE,
            0b000101 => VoiceType::BurstF,
            0b100010 => VoiceType::Term,
            _ => VoiceType::None,
        }
    }

    pub fn value(self) -> u8 {
        match self {
            VoiceType::None => 0b000000,
            VoiceType::Head => 0b100001,
            VoiceType::BurstA => 0b010000,
            VoiceType::BurstB => 0b000001,
            VoiceType::BurstC => 0b000010,
            VoiceType::BurstD => 0b000011,
            VoiceType::BurstE => 0b000100,
            VoiceType::BurstF => 0b000101,
            VoiceType::Term => 0b100010,
        }
    }

    pub fn is_voice_burst(self) -> bool {
        matches!(
            self,
            VoiceType::BurstA
                | VoiceType::BurstB
                | VoiceType::BurstC
                | VoiceType::BurstD
                | VoiceType::BurstE
                | VoiceType::BurstF
        )
    }

    pub fn is_full_lc_carrier(self) -> bool {
        matches!(self, VoiceType::Head | VoiceType::Term)
    }
}

/// Voice/data payload, the workhorse packet of the protocol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Data {
    data: Vec<u8>,
}

impl Data {
    pub const MAGIC: &'static [u8] = b"DMRD";
    pub const SIZE: usize = 55;

    const SEQ_OFFSET: usize = 4;
    const SRC_ID_OFFSET: usize = 5;
    const DST_ID_OFFSET: usize = 8;
    const PEER_ID_OFFSET: usize = 11;
    const BITS_OFFSET: usize = 15;
    const STREAM_ID_OFFSET: usize = 16;
    const DMR_DATA_OFFSET: usize = 20;
    const DMR_DATA_LEN: usize = 33;
    const BER_OFFSET: usize = 53;
    const RSSI_OFFSET: usize = 54;

    pub fn new() -> Self {
        let mut data = vec![0u8; Self::SIZE];
        data[..Self::MAGIC.len()].copy_from_slice(Self::MAGIC);
        Self { data }
    }

    pub fn parse(data: &[u8]) -> Result<Self, ProtoError> {
        parse_fixed(data, Self::MAGIC, Self::SIZE)?;
        Ok(Self { data: data.to_vec() })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn seq(&self) -> u8 {
        self.data[Self::SEQ_OFFSET]
    }

    pub fn set_seq(&mut self, seq: u8) {
        self.data[Self::SEQ_OFFSET] = seq;
    }

    pub fn src_id(&self) -> u32 {
        get_uint(&self.data, Self::SRC_ID_OFFSET, 3)
    }

    pub fn set_src_id(&mut self, src_id: u32) -> Result<(), ProtoError> {
        set_uint(&mut self.data, Self::SRC_ID_OFFSET, 3, src_id, "src_id")
    }

    pub fn dst_id(&self) -> u32 {
        get_uint(&self.data, Self::DST_ID_OFFSET, 3)
    }

    pub fn set_dst_id(&mut self, dst_id: u32) -> Result<(), ProtoError> {
        set_uint(&mut self.data, Self::DST_ID_OFFSET, 3, dst_id, "dst_id")
    }

    pub fn peer_id(&self) -> u32 {
        get_uint(&self.data, Self::PEER_ID_OFFSET, 4)
    }

    pub fn set_peer_id(&mut self, peer_id: u32) {
        set_uint(&mut self.data, Self::PEER_ID_OFFSET, 4, peer_id, "peer_id").expect("fits u32");
    }

    pub fn stream_id(&self) -> u32 {
        get_uint(&self.data, Self::STREAM_ID_OFFSET, 4)
    }

    pub fn set_stream_id(&mut self, stream_id: u32) {
        set_uint(&mut self.data, Self::STREAM_ID_OFFSET, 4, stream_id, "stream_id")
            .expect("fits u32");
    }

    pub fn set_random_stream_id(&mut self) {
        use rand::RngCore;
        self.set_stream_id(rand::thread_rng().next_u32());
    }

    pub fn bits(&self) -> u8 {
        self.data[Self::BITS_OFFSET]
    }

    pub fn set_bits(&mut self, bits: u8) {
        self.data[Self::BITS_OFFSET] = bits;
    }

    pub fn dmr_data(&self) -> &[u8] {
        &self.data[Self::DMR_DATA_OFFSET..Self::DMR_DATA_OFFSET + Self::DMR_DATA_LEN]
    }

    pub fn set_dmr_data(&mut self, dmr_data: &[u8]) -> Result<(), ProtoError> {
        set_bytes(&mut self.data, Self::DMR_DATA_OFFSET, Self::DMR_DATA_LEN, dmr_data, "dmr_data")
    }

    pub fn ber(&self) -> u8 {
        self.data[Self::BER_OFFSET]
    }

    pub fn set_ber(&mut self, ber: u8) {
        self.data[Self::BER_OFFSET] = ber;
    }

    pub fn rssi(&self) -> u8 {
        self.data[Self::RSSI_OFFSET]
    }

    pub fn set_rssi(&mut self, rssi: u8) {
        self.data[Self::RSSI_OFFSET] = rssi;
    }

    // ---- bits byte sub-fields ----

    pub fn slot(&self) -> u8 {
        if self.bits() & 0x80 != 0 {
            2
        } else {
            1
        }
    }

    pub fn set_slot(&mut self, slot: u8) -> Result<(), ProtoError> {
        if !(1..=2).contains(&slot) {
            return Err(ProtoError::FieldOutOfRange { field: "slot", expected: "1..2" });
        }
        let bits = self.bits();
        self.set_bits((bits & !0x80) | if slot == 2 { 0x80 } else { 0 });
        Ok(())
    }

    pub fn call_type(&self) -> CallType {
        if self.bits() & 0x40 != 0 {
            CallType::Unit
        } else {
            CallType::Group
        }
    }

    pub fn set_call_type(&mut self, call_type: CallType) {
        let bits = self.bits();
        self.set_bits((bits & !0x40) | if call_type == CallType::Unit { 0x40 } else { 0 });
    }

    pub fn frame_type(&self) -> u8 {
        (self.bits() & 0x30) >> 4
    }

    pub fn set_frame_type(&mut self, frame_type: u8) -> Result<(), ProtoError> {
        if frame_type >= 1 << 2 {
            return Err(ProtoError::FieldOutOfRange { field: "frame_type", expected: "uint2" });
        }
        let bits = self.bits();
        self.set_bits((bits & !0x30) | (frame_type << 4));
        Ok(())
    }

    pub fn vseq(&self) -> u8 {
        self.bits() & 0x0F
    }

    pub fn set_vseq(&mut self, vseq: u8) -> Result<(), ProtoError> {
        if vseq >= 1 << 4 {
            return Err(ProtoError::FieldOutOfRange { field: "vseq", expected: "uint4" });
        }
        let bits = self.bits();
        self.set_bits((bits & !0x0F) | (vseq & 0x0F));
        Ok(())
    }

    pub fn voice_type(&self) -> VoiceType {
        VoiceType::from_bits(self.bits())
    }

    pub fn set_voice_type(&mut self, voice_type: VoiceType) {
        let bits = self.bits();
        self.set_bits((bits & !0x3F) | (voice_type.value() & 0x3F));
    }

    pub fn is_voice_term(&self) -> bool {
        self.voice_type() == VoiceType::Term
    }
}

impl Default for Data {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for CallType {
    fn eq(&self, other: &Self) -> bool {
        matches!((self, other), (CallType::Group, CallType::Group) | (CallType::Unit, CallType::Unit))
    }
}
impl Eq for CallType {}

impl PartialEq for VoiceType {
    fn eq(&self, other: &Self) -> bool {
        self.value() == other.value()
    }
}
impl Eq for VoiceType {}

/// Tagged union over every wire packet variant, as produced by [`parse`].
#[derive(Debug, Clone)]
pub enum Packet {
    Login(Login),
    Auth(Auth),
    Config(Config),
    Ping(Ping),
    Pong(Pong),
    MasterNak(MasterNak),
    MasterClose(MasterClose),
    RepeaterClose(RepeaterClose),
    Ack(Ack),
    Beacon(Beacon),
    Data(Data),
    TalkerAlias(TalkerAlias),
}

impl Packet {
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Packet::Login(p) => p.as_bytes(),
            Packet::Auth(p) => p.as_bytes(),
            Packet::Config(p) => p.as_bytes(),
            Packet::Ping(p) => p.as_bytes(),
            Packet::Pong(p) => p.as_bytes(),
            Packet::MasterNak(p) => p.as_bytes(),
            Packet::MasterClose(p) => p.as_bytes(),
            Packet::RepeaterClose(p) => p.as_bytes(),
            Packet::Ack(p) => p.as_bytes(),
            Packet::Beacon(p) => p.as_bytes(),
            Packet::Data(p) => p.as_bytes(),
            Packet::TalkerAlias(p) => p.as_bytes(),
        }
    }

    pub fn peer_id(&self) -> u32 {
        match self {
            Packet::Login(p) => p.peer_id(),
            Packet::Auth(p) => p.peer_id(),
            Packet::Config(p) => p.peer_id(),
            Packet::Ping(p) => p.peer_id(),
            Packet::Pong(p) => p.peer_id(),
            Packet::MasterNak(p) => p.peer_id(),
            Packet::MasterClose(p) => p.peer_id(),
            Packet::RepeaterClose(p) => p.peer_id(),
            Packet::Ack(p) => p.peer_id(),
            Packet::Beacon(p) => p.peer_id(),
            Packet::Data(p) => p.peer_id(),
            Packet::TalkerAlias(p) => p.peer_id(),
        }
    }

    /// Rewrites the packet's `peer_id` field in place, used when fanning a
    /// packet out to multiple peers (each must see its own id).
    pub fn set_peer_id(&mut self, peer_id: u32) {
        match self {
            Packet::Login(p) => p.set_peer_id(peer_id),
            Packet::Auth(p) => p.set_peer_id(peer_id),
            Packet::Config(p) => p.set_peer_id(peer_id),
            Packet::Ping(p) => p.set_peer_id(peer_id),
            Packet::Pong(p) => p.set_peer_id(peer_id),
            Packet::MasterNak(p) => p.set_peer_id(peer_id),
            Packet::MasterClose(p) => p.set_peer_id(peer_id),
            Packet::RepeaterClose(p) => p.set_peer_id(peer_id),
            Packet::Ack(p) => p.set_peer_id(peer_id),
            Packet::Beacon(p) => p.set_peer_id(peer_id),
            Packet::Data(p) => p.set_peer_id(peer_id),
            Packet::TalkerAlias(p) => p.set_peer_id(peer_id),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Packet::Login(_) => "RPTL",
            Packet::Auth(_) => "RPTK",
            Packet::Config(_) => "RPTC",
            Packet::Ping(_) => "RPTPING",
            Packet::Pong(_) => "MSTPONG",
            Packet::MasterNak(_) => "MSTNAK",
            Packet::MasterClose(_) => "MSTCL",
            Packet::RepeaterClose(_) => "RPTCL",
            Packet::Ack(_) => "RPTACK",
            Packet::Beacon(_) => "RPTSBKN",
            Packet::Data(_) => "DMRD",
            Packet::TalkerAlias(_) => "DMRA",
        }
    }
}

/// Detects the packet type by magic+length and parses it.
///
/// Variants are tried in a fixed order, matching the reference factory's
/// registration order; the first magic+length match wins. `RPTACK` from
/// the wire is always parsed as [`Ack`] — [`Salt`] is only ever
/// constructed server-side and is not reachable through this factory.
pub fn parse(data: &[u8]) -> Result<Packet, ProtoError> {
    if data.len() == MasterNak::SIZE && data.starts_with(MasterNak::MAGIC) {
        return Ok(Packet::MasterNak(MasterNak::parse(data)?));
    }
    if data.len() == MasterClose::SIZE && data.starts_with(MasterClose::MAGIC) {
        return Ok(Packet::MasterClose(MasterClose::parse(data)?));
    }
    if data.len() == RepeaterClose::SIZE && data.starts_with(RepeaterClose::MAGIC) {
        return Ok(Packet::RepeaterClose(RepeaterClose::parse(data)?));
    }
    if data.len() == Login::SIZE && data.starts_with(Login::MAGIC) {
        return Ok(Packet::Login(Login::parse(data)?));
    }
    if data.len() == Ack::SIZE && data.starts_with(Ack::MAGIC) {
        return Ok(Packet::Ack(Ack::parse(data)?));
    }
    if data.len() == Auth::SIZE && data.starts_with(Auth::MAGIC) {
        return Ok(Packet::Auth(Auth::parse(data)?));
    }
    if data.len() == Config::SIZE && data.starts_with(Config::MAGIC) {
        return Ok(Packet::Config(Config::parse(data)?));
    }
    if data.len() == Ping::SIZE && data.starts_with(Ping::MAGIC) {
        return Ok(Packet::Ping(Ping::parse(data)?));
    }
    if data.len() == Pong::SIZE && data.starts_with(Pong::MAGIC) {
        return Ok(Packet::Pong(Pong::parse(data)?));
    }
    if data.len() == Beacon::SIZE && data.starts_with(Beacon::MAGIC) {
        return Ok(Packet::Beacon(Beacon::parse(data)?));
    }
    if data.len() == Data::SIZE && data.starts_with(Data::MAGIC) {
        return Ok(Packet::Data(Data::parse(data)?));
    }
    if data.len() == TalkerAlias::SIZE && data.starts_with(TalkerAlias::MAGIC) {
        return Ok(Packet::TalkerAlias(TalkerAlias::parse(data)?));
    }

    let prefix_len = data.len().min(4);
    let type_str = String::from_utf8_lossy(&data[..prefix_len]).into_owned();
    Err(ProtoError::UnknownPacketType(type_str))
}
