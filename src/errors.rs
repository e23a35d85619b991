use thiserror::Error;

/// Errors that can occur while decoding, encoding, truncating or signing a packet.
///
/// Decode errors never panic: a `DecodeError` (see `packet.rs`) always carries
/// the partially-parsed packet alongside the variant that stopped parsing.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DnsError {
    #[error("packet too small")]
    PacketTooSmall,

    #[error("packet too large")]
    PacketTooLarge,

    #[error("truncated header")]
    TruncatedHeader,

    #[error("truncated name: {0}")]
    TruncatedName(&'static str),

    #[error("truncated rdata")]
    TruncatedRData,

    #[error("truncated section")]
    TruncatedSection,

    #[error("malformed name: reserved label type")]
    MalformedName,

    #[error("unbounded name expansion (compression pointer cycle)")]
    UnboundedNameExpansion,

    #[error("name too long")]
    NameTooLong,

    #[error("label too long")]
    LabelTooLong,

    #[error("unsupported class: {0}")]
    UnsupportedClass(u16),

    #[error("invalid packet: {0}")]
    InvalidPacket(&'static str),

    #[error("unknown section key: {0}")]
    UnknownSection(String),

    #[error("reply() called on a packet that already has the QR bit set")]
    ErroneousQr,

    #[error("packet is not signed")]
    SigNotPresent,

    #[error("bad TSIG signature")]
    BadTsigSig,

    #[error("bad TSIG key")]
    BadTsigKey,

    #[error("bad TSIG time")]
    BadTsigTime,

    #[error("bad TSIG truncation")]
    BadTsigTrunc,
}

pub type Result<T> = std::result::Result<T, DnsError>;
