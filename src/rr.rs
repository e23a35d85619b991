use crate::compress::CompressionTable;
use crate::constants::{Type, DNS_RR_HEADER_SIZE};
use crate::edns::EdnsOpt;
use crate::errors::{DnsError, Result};
use crate::name::Name;
use byteorder::{BigEndian, ByteOrder};

/// The decoded RDATA of a resource record. Only the two type-specific shapes
/// required by the core codec get a typed variant (see SPEC_FULL.md §4.2);
/// every other rrtype rides along as opaque octets, already decompressed if
/// it happened to embed a name, but otherwise untouched.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum RData {
    Ptr(Name),
    Opt(EdnsOpt),
    Opaque(Vec<u8>),
}

/// A single resource record: owner name, type, class, TTL and RDATA
/// (RFC 1035 §4.1.3). Used uniformly across the answer, authority and
/// additional sections, and also to carry the packet's OPT pseudo-record.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ResourceRecord {
    pub owner: Name,
    pub rrtype: u16,
    pub rrclass: u16,
    pub ttl: u32,
    pub rdata: RData,
}

impl ResourceRecord {
    pub fn new(owner: Name, rrtype: u16, rrclass: u16, ttl: u32, rdata: RData) -> Self {
        ResourceRecord {
            owner,
            rrtype,
            rrclass,
            ttl,
            rdata,
        }
    }

    /// Canonical-key octets used by `Packet::unique_push` dedup: owner
    /// (case-folded), type, class and RDATA, with the TTL normalised to 0
    /// since RFC 2181 §5.2 permits RRset members to disagree on TTL without
    /// being distinct records.
    pub fn dedup_key(&self) -> (String, u16, u16, Vec<u8>) {
        let mut rdata_bytes = Vec::new();
        let mut table = CompressionTable::new();
        self.encode_rdata(0, &mut table, &mut rdata_bytes);
        (
            self.owner.canonical_key(),
            self.rrtype,
            self.rrclass,
            rdata_bytes,
        )
    }

    fn encode_rdata(&self, offset: usize, table: &mut CompressionTable, out: &mut Vec<u8>) {
        match &self.rdata {
            RData::Ptr(name) => {
                if Type::compresses_names(self.rrtype) {
                    name.encode(offset, table, out);
                } else {
                    // Newer types never compress their names (RFC 3597 §4):
                    // encode against a throwaway table so this name neither
                    // consults nor contributes compression pointers.
                    name.encode(offset, &mut CompressionTable::new(), out);
                }
            }
            RData::Opt(opt) => opt.encode(out),
            RData::Opaque(bytes) => out.extend_from_slice(bytes),
        }
    }

    pub fn encode(&self, offset: usize, table: &mut CompressionTable, out: &mut Vec<u8>) -> usize {
        let start = out.len();
        self.owner.encode(offset, table, out);
        let mut head = [0u8; 8];
        BigEndian::write_u16(&mut head[0..2], self.rrtype);
        BigEndian::write_u16(&mut head[2..4], self.rrclass);
        BigEndian::write_u32(&mut head[4..8], self.ttl);
        out.extend_from_slice(&head);
        let rdlength_pos = out.len();
        out.extend_from_slice(&[0u8, 0u8]);
        let rdata_offset = offset + (out.len() - start);
        let rdata_start = out.len();
        self.encode_rdata(rdata_offset, table, out);
        let rdlength = (out.len() - rdata_start) as u16;
        BigEndian::write_u16(&mut out[rdlength_pos..rdlength_pos + 2], rdlength);
        out.len() - start
    }

    pub fn decode(buffer: &[u8], offset: usize) -> Result<(ResourceRecord, usize)> {
        let (owner, pos) = Name::decode(buffer, offset)?;
        if pos + DNS_RR_HEADER_SIZE > buffer.len() {
            return Err(DnsError::TruncatedSection);
        }
        let rrtype = BigEndian::read_u16(&buffer[pos..pos + 2]);
        let rrclass = BigEndian::read_u16(&buffer[pos + 2..pos + 4]);
        let ttl = BigEndian::read_u32(&buffer[pos + 4..pos + 8]);
        let rdlength = BigEndian::read_u16(&buffer[pos + 8..pos + 10]) as usize;
        let rdata_offset = pos + DNS_RR_HEADER_SIZE;
        if rdata_offset + rdlength > buffer.len() {
            return Err(DnsError::TruncatedRData);
        }
        let rdata_slice = &buffer[rdata_offset..rdata_offset + rdlength];
        let rdata = if rrtype == Type::PTR as u16 {
            let (name, next) = Name::decode(buffer, rdata_offset)?;
            if next != rdata_offset + rdlength {
                return Err(DnsError::TruncatedRData);
            }
            RData::Ptr(name)
        } else if rrtype == Type::OPT as u16 {
            RData::Opt(EdnsOpt::decode(rdata_slice)?)
        } else {
            RData::Opaque(rdata_slice.to_vec())
        };
        Ok((
            ResourceRecord {
                owner,
                rrtype,
                rrclass,
                ttl,
                rdata,
            },
            rdata_offset + rdlength,
        ))
    }
}
