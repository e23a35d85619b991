#![allow(dead_code)]

/// Size of the main DNS header, that includes flags and the size of each section.
pub const DNS_HEADER_SIZE: usize = 12;

/// Offset to the first (and usually only) record of the question section, from the start of the packet.
pub const DNS_QUESTION_OFFSET: usize = DNS_HEADER_SIZE;

/// Maximum length of an encoded domain name, including length prefixes and the terminating zero.
pub const DNS_MAX_NAME_LEN: usize = 255;

/// Maximum length of a single label, excluding its length prefix.
pub const DNS_MAX_LABEL_LEN: usize = 63;

/// Compression pointers only address the first 16KB of a message.
pub const DNS_MAX_POINTER_OFFSET: u16 = 0x3fff;

/// Size of the header for a RR in the question section (type + class).
pub const DNS_RR_QUESTION_HEADER_SIZE: usize = 4;

/// Size of the fixed header for a RR outside of the question section (type + class + ttl + rdlength).
pub const DNS_RR_HEADER_SIZE: usize = 10;

/// Size of the header of an OPT pseudo-RR, identical in shape to `DNS_RR_HEADER_SIZE`.
pub const DNS_OPT_RR_HEADER_SIZE: usize = 10;

/// Size of the header of a single option within OPT RDATA (option-code + option-length).
pub const DNS_EDNS_OPTION_HEADER_SIZE: usize = 4;

/// Smallest UDP payload size a truncated response may be clamped down to.
pub const DNS_MIN_TRUNCATED_SIZE: usize = 512;

/// Default advertised UDP payload size when none was requested.
pub const DNS_DEFAULT_EDNS_PAYLOAD_SIZE: u16 = 4096;

// Main header flags, packed into the two octets at `DNS_FLAGS_OFFSET`.
pub const DNS_FLAGS_OFFSET: usize = 2;

pub const DNS_FLAG_QR: u16 = 1 << 15;
pub const DNS_FLAG_AA: u16 = 1 << 10;
pub const DNS_FLAG_TC: u16 = 1 << 9;
pub const DNS_FLAG_RD: u16 = 1 << 8;
pub const DNS_FLAG_RA: u16 = 1 << 7;
pub const DNS_FLAG_Z: u16 = 1 << 6;
pub const DNS_FLAG_AD: u16 = 1 << 5;
pub const DNS_FLAG_CD: u16 = 1 << 4;

// Extended (EDNS) flags, packed into the low 16 bits of the OPT TTL.
pub const DNS_EDNS_FLAG_DO: u16 = 1 << 15;

/// DNS query/record class.
#[allow(non_camel_case_types)]
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Class {
    IN = 1,
    CH = 3,
    HS = 4,
    NONE = 254,
    ANY = 255,
}

impl From<Class> for u16 {
    fn from(v: Class) -> u16 {
        v as u16
    }
}

impl Class {
    /// Classes for which RFC 2136 UPDATE gives a RR class a meaning other than "the zone class".
    pub fn is_update_exempt(class: u16) -> bool {
        class == Class::ANY as u16 || class == Class::NONE as u16
    }
}

/// DNS record type.
#[allow(non_camel_case_types)]
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Type {
    A = 1,
    NS = 2,
    CNAME = 5,
    SOA = 6,
    PTR = 12,
    MX = 15,
    TXT = 16,
    AAAA = 28,
    SRV = 33,
    NAPTR = 35,
    DNAME = 39,
    OPT = 41,
    DS = 43,
    RRSIG = 46,
    NSEC = 47,
    DNSKEY = 48,
    NSEC3 = 50,
    TLSA = 52,
    SVCB = 64,
    HTTPS = 65,
    SIG = 24,
    KEY = 25,
    TKEY = 249,
    TSIG = 250,
    IXFR = 251,
    AXFR = 252,
    ANY = 255,
}

impl From<Type> for u16 {
    fn from(v: Type) -> u16 {
        v as u16
    }
}

impl Type {
    /// Well-known record types (RFC 1035) whose RDATA contains a name eligible for
    /// compression against names already emitted earlier in the same message.
    /// Newer types never compress their names (RFC 3597 §4).
    pub fn compresses_names(rr_type: u16) -> bool {
        rr_type == Type::CNAME as u16
            || rr_type == Type::MX as u16
            || rr_type == Type::NS as u16
            || rr_type == Type::PTR as u16
            || rr_type == Type::SOA as u16
    }
}

/// A single EDNS(0) option code (RFC 6891 and friends).
#[allow(non_camel_case_types)]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum EdnsOptionCode {
    Llq = 1,
    Ul = 2,
    Nsid = 3,
    Dau = 5,
    Dhu = 6,
    N3u = 7,
    ClientSubnet = 8,
    Expire = 9,
    Cookie = 10,
    Keepalive = 11,
    Padding = 12,
}

impl From<EdnsOptionCode> for u16 {
    fn from(v: EdnsOptionCode) -> u16 {
        v as u16
    }
}

/// DNS return codes, base 4 bits. Extended codes add bits 4..11 from the OPT record.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Rcode {
    NoError = 0,
    FormErr = 1,
    ServFail = 2,
    NxDomain = 3,
    NotImp = 4,
    Refused = 5,
    YxDomain = 6,
    YxRrSet = 7,
    NxRrSet = 8,
    NotAuth = 9,
    NotZone = 10,
    BadSig = 16,
    BadKey = 17,
    BadTime = 18,
    BadTrunc = 22,
}

impl From<Rcode> for u16 {
    fn from(v: Rcode) -> u16 {
        v as u16
    }
}

/// DNS opcodes.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Opcode {
    Query = 0,
    IQuery = 1,
    Status = 2,
    Notify = 4,
    Update = 5,
}

impl From<Opcode> for u8 {
    fn from(v: Opcode) -> u8 {
        v as u8
    }
}

impl Opcode {
    pub fn from_u8(v: u8) -> Option<Opcode> {
        match v {
            0 => Some(Opcode::Query),
            1 => Some(Opcode::IQuery),
            2 => Some(Opcode::Status),
            4 => Some(Opcode::Notify),
            5 => Some(Opcode::Update),
            _ => None,
        }
    }
}

/// A section within a DNS packet. UPDATE (RFC 2136) reuses the same four
/// sections with different print labels and RR-class semantics; the
/// section identity doesn't change, only how it's interpreted.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Section {
    Question,
    Answer,
    Authority,
    Additional,
}

/// Resolves the section-key aliases accepted by `Packet::push`/`unique_push`/`pop`:
/// the literal section names, and the RFC 2136 UPDATE aliases (`pre`, `update`, `add`).
pub fn resolve_section(key: &str) -> Option<Section> {
    let lower = key.to_ascii_lowercase();
    match lower.as_str() {
        "question" | "zone" | "que" | "zon" | "qd" => Some(Section::Question),
        "answer" | "prerequisite" | "pre" | "ans" | "an" => Some(Section::Answer),
        "authority" | "update" | "aut" | "upd" | "ns" => Some(Section::Authority),
        "additional" | "add" | "ar" => Some(Section::Additional),
        _ => None,
    }
}
