use crate::constants::{DNS_EDNS_FLAG_DO, DNS_EDNS_OPTION_HEADER_SIZE};
use crate::errors::{DnsError, Result};
use crate::name::Name;
use crate::rr::{RData, ResourceRecord};
use byteorder::{BigEndian, ByteOrder};

/// A single EDNS(0) option: an opaque `(code, data)` pair (RFC 6891 §6.1.2).
/// Known option codes are listed in `constants::EdnsOptionCode`; unrecognized
/// codes just ride along as opaque data.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct EdnsOption {
    pub code: u16,
    pub data: Vec<u8>,
}

impl EdnsOption {
    fn encoded_len(&self) -> usize {
        DNS_EDNS_OPTION_HEADER_SIZE + self.data.len()
    }
}

/// The RDATA of an OPT pseudo-record: a concatenation of `(code, length, data)`
/// triples. Carries no fields of its own — the extended-rcode, version and
/// flags live in the OPT record's repurposed class/ttl fields, modeled by
/// `Edns` below.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct EdnsOpt {
    pub options: Vec<EdnsOption>,
}

impl EdnsOpt {
    pub fn encode(&self, out: &mut Vec<u8>) {
        for opt in &self.options {
            let mut head = [0u8; DNS_EDNS_OPTION_HEADER_SIZE];
            BigEndian::write_u16(&mut head[0..2], opt.code);
            BigEndian::write_u16(&mut head[2..4], opt.data.len() as u16);
            out.extend_from_slice(&head);
            out.extend_from_slice(&opt.data);
        }
    }

    pub fn decode(rdata: &[u8]) -> Result<EdnsOpt> {
        let mut options = Vec::new();
        let mut pos = 0;
        while pos < rdata.len() {
            if pos + DNS_EDNS_OPTION_HEADER_SIZE > rdata.len() {
                return Err(DnsError::TruncatedRData);
            }
            let code = BigEndian::read_u16(&rdata[pos..pos + 2]);
            let len = BigEndian::read_u16(&rdata[pos + 2..pos + 4]) as usize;
            pos += DNS_EDNS_OPTION_HEADER_SIZE;
            if pos + len > rdata.len() {
                return Err(DnsError::TruncatedRData);
            }
            options.push(EdnsOption {
                code,
                data: rdata[pos..pos + len].to_vec(),
            });
            pos += len;
        }
        Ok(EdnsOpt { options })
    }

    pub fn encoded_len(&self) -> usize {
        self.options.iter().map(EdnsOption::encoded_len).sum()
    }
}

/// A decoded view of a packet's single OPT record: the pieces of RFC 6891
/// that don't fit the plain `(name, type, class, ttl, rdata)` RR shape.
///
/// `class` carries the requester's UDP payload size; `ttl` is split into
/// extended-rcode (bits 24..31), version (bits 16..23) and flags (bits
/// 0..15, with the DO bit at the top).
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Edns {
    pub udp_payload_size: u16,
    pub extended_rcode: u8,
    pub version: u8,
    pub do_bit: bool,
    pub options: Vec<EdnsOption>,
}

impl Edns {
    pub fn new(udp_payload_size: u16) -> Self {
        Edns {
            udp_payload_size,
            extended_rcode: 0,
            version: 0,
            do_bit: false,
            options: Vec::new(),
        }
    }

    fn pack_ttl(&self) -> u32 {
        ((self.extended_rcode as u32) << 24)
            | ((self.version as u32) << 16)
            | (self.flags() as u32)
    }

    fn flags(&self) -> u16 {
        if self.do_bit {
            DNS_EDNS_FLAG_DO
        } else {
            0
        }
    }

    fn unpack_ttl(ttl: u32) -> (u8, u8, bool) {
        let extended_rcode = (ttl >> 24) as u8;
        let version = (ttl >> 16) as u8;
        let flags = ttl as u16;
        (extended_rcode, version, flags & DNS_EDNS_FLAG_DO != 0)
    }

    /// Builds the pseudo-RR that represents this OPT record on the wire.
    pub fn to_rr(&self) -> ResourceRecord {
        ResourceRecord {
            owner: Name::root(),
            rrtype: crate::constants::Type::OPT as u16,
            rrclass: self.udp_payload_size,
            ttl: self.pack_ttl(),
            rdata: RData::Opt(EdnsOpt {
                options: self.options.clone(),
            }),
        }
    }

    /// Recovers an `Edns` view from a decoded OPT pseudo-RR.
    pub fn from_rr(rr: &ResourceRecord) -> Result<Edns> {
        let (extended_rcode, version, do_bit) = Self::unpack_ttl(rr.ttl);
        let options = match &rr.rdata {
            RData::Opt(opt) => opt.options.clone(),
            _ => return Err(DnsError::InvalidPacket("OPT record with non-OPT rdata")),
        };
        Ok(Edns {
            udp_payload_size: rr.rrclass,
            extended_rcode,
            version,
            do_bit,
            options,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opt_rr_round_trips_through_edns_view() {
        let mut edns = Edns::new(4096);
        edns.do_bit = true;
        edns.extended_rcode = 1;
        edns.options.push(EdnsOption {
            code: 10,
            data: vec![1, 2, 3, 4],
        });
        let rr = edns.to_rr();
        let recovered = Edns::from_rr(&rr).unwrap();
        assert_eq!(recovered, edns);
    }

    #[test]
    fn option_list_round_trips_raw_bytes() {
        let opt = EdnsOpt {
            options: vec![
                EdnsOption {
                    code: 3,
                    data: vec![],
                },
                EdnsOption {
                    code: 8,
                    data: vec![0, 1, 0, 4, 192, 0, 2, 0],
                },
            ],
        };
        let mut buf = Vec::new();
        opt.encode(&mut buf);
        let decoded = EdnsOpt::decode(&buf).unwrap();
        assert_eq!(decoded, opt);
    }
}
