//! Encode, decode, truncate and sign DNS packets.
//!
//! The entry point is [`Packet`]: build one with [`Packet::new_query`] or
//! parse one off the wire with [`Packet::decode`], mutate its sections with
//! `push`/`unique_push`/`pop`, then call `encode()`. [`truncate::truncate`]
//! enforces RFC 2181 §9 size limits, and [`tsig`] handles TSIG signing and
//! verification.

pub mod compress;
pub mod constants;
pub mod edns;
pub mod errors;
pub mod header;
pub mod name;
pub mod packet;
pub mod question;
pub mod rr;
pub mod truncate;
pub mod tsig;

pub use constants::*;
pub use edns::{Edns, EdnsOpt, EdnsOption};
pub use errors::{DnsError, Result};
pub use header::Header;
pub use name::{name2labels, wire2presentation, Name};
pub use packet::{DecodeError, Packet};
pub use question::Question;
pub use rr::{RData, ResourceRecord};
pub use truncate::truncate;
pub use tsig::{
    sign_sig0, sign_tsig, verify_sig0, verify_tsig, Sig0Key, Sig0State, SignatureProvider, TsigKey,
    TsigState,
};
