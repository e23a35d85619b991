use crate::compress::CompressionTable;
use crate::constants::{resolve_section, Class, Opcode, Section, Type, DNS_HEADER_SIZE};
use crate::edns::Edns;
use crate::errors::{DnsError, Result};
use crate::header::Header;
use crate::name::Name;
use crate::question::Question;
use crate::rr::{RData, ResourceRecord};
use rand::Rng;
use std::net::SocketAddr;

/// Carries whatever was successfully parsed before decoding gave up, paired
/// with the error that stopped it. Decoding a hostile or truncated buffer
/// never panics and never discards the prefix that did parse cleanly.
#[derive(Debug)]
pub struct DecodeError {
    pub error: DnsError,
    pub partial: Packet,
}

impl std::fmt::Display for DecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.error)
    }
}

impl std::error::Error for DecodeError {}

/// An in-memory DNS message: a header plus the four RFC 1035 sections.
///
/// `answerfrom`/`answersize` are populated by the transport collaborator
/// (out of scope here) once a reply has actually been received over the
/// wire; the codec only ever reads them back for diagnostics.
#[derive(Clone, Debug, Default)]
pub struct Packet {
    pub header: Header,
    pub question: Vec<Question>,
    pub answer: Vec<ResourceRecord>,
    pub authority: Vec<ResourceRecord>,
    pub additional: Vec<ResourceRecord>,
    pub answerfrom: Option<SocketAddr>,
    pub answersize: Option<usize>,
    /// Cached view of the packet's single OPT record, if any. Preferred over
    /// a scattered OPT left in `additional` when `encode()` consolidates.
    pub edns: Option<Edns>,
    verifyerr: Option<DnsError>,
}

impl Packet {
    /// An empty outbound packet: `rd=1`, a fresh pseudo-random id.
    pub fn new() -> Self {
        Packet {
            header: Header::new(random_id()),
            ..Default::default()
        }
    }

    /// An outbound query packet carrying a single question.
    pub fn new_query(qname: &str, qtype: u16, qclass: u16) -> Result<Self> {
        let mut packet = Packet::new();
        packet
            .question
            .push(Question::new(Name::from_dotted(qname)?, qtype, qclass));
        Ok(packet)
    }

    /// Parses a received buffer into a packet. On any structural error the
    /// partial packet assembled so far is returned alongside the error
    /// rather than discarded.
    pub fn decode(buffer: &[u8]) -> std::result::Result<Packet, DecodeError> {
        let header = match Header::decode(buffer) {
            Ok(h) => h,
            Err(e) => {
                return Err(DecodeError {
                    error: e,
                    partial: Packet::default(),
                })
            }
        };
        let mut packet = Packet {
            header: header.clone(),
            ..Default::default()
        };
        let mut offset = DNS_HEADER_SIZE;

        macro_rules! try_decode {
            ($count:expr, $decode_one:expr, $push:expr) => {
                for _ in 0..$count {
                    match $decode_one(buffer, offset) {
                        Ok((item, next)) => {
                            offset = next;
                            $push(&mut packet, item);
                        }
                        Err(e) => {
                            return Err(DecodeError {
                                error: e,
                                partial: packet,
                            })
                        }
                    }
                }
            };
        }

        try_decode!(
            header.qdcount,
            Question::decode,
            |p: &mut Packet, q| p.question.push(q)
        );
        try_decode!(
            header.ancount,
            ResourceRecord::decode,
            |p: &mut Packet, rr| p.answer.push(rr)
        );
        try_decode!(
            header.nscount,
            ResourceRecord::decode,
            |p: &mut Packet, rr| p.authority.push(rr)
        );
        try_decode!(
            header.arcount,
            ResourceRecord::decode,
            |p: &mut Packet, rr| p.additional.push(rr)
        );

        packet.refresh_edns_cache();
        Ok(packet)
    }

    fn refresh_edns_cache(&mut self) {
        self.edns = self
            .additional
            .iter()
            .find(|rr| rr.rrtype == Type::OPT as u16)
            .and_then(|rr| Edns::from_rr(rr).ok());
    }

    fn section_vec_mut(&mut self, section: Section) -> Option<&mut Vec<ResourceRecord>> {
        match section {
            Section::Question => None,
            Section::Answer => Some(&mut self.answer),
            Section::Authority => Some(&mut self.authority),
            Section::Additional => Some(&mut self.additional),
        }
    }

    fn section_vec(&self, section: Section) -> Option<&Vec<ResourceRecord>> {
        match section {
            Section::Question => None,
            Section::Answer => Some(&self.answer),
            Section::Authority => Some(&self.authority),
            Section::Additional => Some(&self.additional),
        }
    }

    /// If this is an UPDATE packet, RFC 2136 coerces a pushed RR's class to
    /// the zone class unless it's ANY or NONE. Only applies to `answer`
    /// (prerequisite) and `authority` (update) — `additional` carries glue
    /// and signature RRs, which RFC 2136 never reclasses.
    fn coerce_update_class(&self, section: Section, rr: &mut ResourceRecord) {
        if !matches!(section, Section::Answer | Section::Authority) {
            return;
        }
        if self.header.opcode() != Opcode::Update as u8 {
            return;
        }
        if Class::is_update_exempt(rr.rrclass) {
            return;
        }
        if let Some(zone) = self.question.first() {
            rr.rrclass = zone.qclass;
        }
    }

    /// Appends RRs to the named section, returning its new length.
    pub fn push(&mut self, section_key: &str, rrs: Vec<ResourceRecord>) -> Result<usize> {
        let section = resolve_section(section_key).ok_or_else(|| {
            DnsError::UnknownSection(section_key.to_string())
        })?;
        for mut rr in rrs {
            self.coerce_update_class(section, &mut rr);
            match self.section_vec_mut(section) {
                Some(vec) => vec.push(rr),
                None => return Err(DnsError::InvalidPacket("cannot push a resource record into the question section")),
            }
        }
        Ok(self.section_vec(section).map_or(0, |v| v.len()))
    }

    /// Appends RRs, replacing any existing member whose dedup key (owner,
    /// type, class, canonical RDATA; TTL ignored) matches. Last write wins.
    pub fn unique_push(&mut self, section_key: &str, rrs: Vec<ResourceRecord>) -> Result<usize> {
        let section = resolve_section(section_key)
            .ok_or_else(|| DnsError::UnknownSection(section_key.to_string()))?;
        for mut rr in rrs {
            self.coerce_update_class(section, &mut rr);
            let vec = self.section_vec_mut(section).ok_or_else(|| {
                DnsError::InvalidPacket("cannot push a resource record into the question section")
            })?;
            let key = rr.dedup_key();
            vec.retain(|existing| existing.dedup_key() != key);
            vec.push(rr);
        }
        Ok(self.section_vec(section).map_or(0, |v| v.len()))
    }

    /// Removes and returns the last RR of the named section, if any.
    pub fn pop(&mut self, section_key: &str) -> Result<Option<ResourceRecord>> {
        let section = resolve_section(section_key)
            .ok_or_else(|| DnsError::UnknownSection(section_key.to_string()))?;
        let vec = self.section_vec_mut(section).ok_or_else(|| {
            DnsError::InvalidPacket("cannot pop a resource record from the question section")
        })?;
        Ok(vec.pop())
    }

    /// The effective return code: the header's base 4 bits, extended by the
    /// OPT record's upper 8 bits when present.
    pub fn rcode(&self) -> u16 {
        let base = self.header.rcode_base() as u16;
        match &self.edns {
            Some(edns) => ((edns.extended_rcode as u16) << 4) | base,
            None => base,
        }
    }

    /// Sets the return code, splitting values above 15 across the header's
    /// base field and the OPT record's extended-rcode field (creating an
    /// OPT with a default payload size if none is cached yet).
    pub fn set_rcode(&mut self, rcode: u16) {
        self.header.set_rcode_base((rcode & 0x0f) as u8);
        let extended = (rcode >> 4) as u8;
        if extended != 0 || self.edns.is_some() {
            let edns = self
                .edns
                .get_or_insert_with(|| Edns::new(crate::constants::DNS_DEFAULT_EDNS_PAYLOAD_SIZE));
            edns.extended_rcode = extended;
        }
    }

    /// Merges any OPT records scattered through `additional` into the
    /// packet's cached `edns` view (which wins over a stray wire copy),
    /// leaving at most one OPT, placed at the head of `additional`.
    fn consolidate_edns(&mut self) {
        let mut found: Option<Edns> = None;
        self.additional.retain(|rr| {
            if rr.rrtype == Type::OPT as u16 {
                if found.is_none() {
                    found = Edns::from_rr(rr).ok();
                }
                false
            } else {
                true
            }
        });
        if self.edns.is_none() {
            self.edns = found;
        }
        if let Some(edns) = &self.edns {
            self.additional.insert(0, edns.to_rr());
        }
    }

    /// Encodes the packet to its wire form. A fresh compression table is
    /// created for the call and discarded afterwards.
    pub fn encode(&self) -> Vec<u8> {
        let mut working = self.clone();
        working.consolidate_edns();

        let mut header = working.header.clone();
        header.qdcount = working.question.len() as u16;
        header.ancount = working.answer.len() as u16;
        header.nscount = working.authority.len() as u16;
        header.arcount = working.additional.len() as u16;

        let mut out = Vec::new();
        header.encode(&mut out);

        let mut table = CompressionTable::new();
        for q in &working.question {
            q.encode(out.len(), &mut table, &mut out);
        }
        for rr in working
            .answer
            .iter()
            .chain(working.authority.iter())
            .chain(working.additional.iter())
        {
            rr.encode(out.len(), &mut table, &mut out);
        }
        out
    }

    /// Builds a reply skeleton: `qr=1`, same id/opcode/rd/cd, the source
    /// question list copied verbatim, rcode defaulted to FORMERR. If the
    /// request carried EDNS, the reply gets a fresh OPT advertising
    /// `max_udp`.
    pub fn reply(&self, max_udp: u16) -> Result<Packet> {
        if self.header.qr() {
            return Err(DnsError::ErroneousQr);
        }
        let mut reply = Packet::new();
        reply.header.id = self.header.id;
        reply.header.set_qr(true);
        reply.header.set_opcode(self.header.opcode());
        reply.header.set_rd(self.header.rd());
        reply.header.set_cd(self.header.cd());
        reply.header.set_rcode_base(crate::constants::Rcode::FormErr as u8);
        reply.question = self.question.clone();
        if self.edns.is_some() {
            reply.edns = Some(Edns::new(max_udp));
        }
        Ok(reply)
    }

    pub fn verifyerr(&self) -> Option<&DnsError> {
        self.verifyerr.as_ref()
    }

    pub fn set_verifyerr(&mut self, err: Option<DnsError>) {
        self.verifyerr = err;
    }

    /// Human-readable zone-file-ish dump, with UPDATE-aware section labels.
    pub fn diagnostic_string(&self) -> String {
        let is_update = self.header.opcode() == Opcode::Update as u8;
        let (q_label, an_label, au_label) = if is_update {
            ("ZONE", "PREREQUISITE", "UPDATE")
        } else {
            ("QUESTION", "ANSWER", "AUTHORITY")
        };
        let mut out = String::new();
        out.push_str(&format!(
            ";; ->>HEADER<<- opcode: {}, rcode: {}, id: {}\n",
            self.header.opcode(),
            self.rcode(),
            self.header.id
        ));
        out.push_str(&format!(
            ";; flags: qr={} aa={} tc={} rd={} ra={} ad={} cd={}\n",
            self.header.qr() as u8,
            self.header.aa() as u8,
            self.header.tc() as u8,
            self.header.rd() as u8,
            self.header.ra() as u8,
            self.header.ad() as u8,
            self.header.cd() as u8
        ));
        out.push_str(&format!(";; {} SECTION:\n", q_label));
        for q in &self.question {
            out.push_str(&format!("; {}\t{}\t{}\n", q.qname, q.qclass, q.qtype));
        }
        out.push_str(&format!(";; {} SECTION:\n", an_label));
        for rr in &self.answer {
            out.push_str(&rr_line(rr));
        }
        out.push_str(&format!(";; {} SECTION:\n", au_label));
        for rr in &self.authority {
            out.push_str(&rr_line(rr));
        }
        out.push_str(";; ADDITIONAL SECTION:\n");
        for rr in &self.additional {
            out.push_str(&rr_line(rr));
        }
        out
    }

    pub fn string(&self) -> String {
        self.diagnostic_string()
    }
}

fn rr_line(rr: &ResourceRecord) -> String {
    match &rr.rdata {
        RData::Ptr(name) => format!(
            "{}\t{}\t{}\t{}\tPTR\t{}\n",
            rr.owner, rr.ttl, rr.rrclass, rr.rrtype, name
        ),
        RData::Opt(_) => format!("{}\t{}\tOPT\n", rr.owner, rr.rrclass),
        RData::Opaque(bytes) => format!(
            "{}\t{}\t{}\t{}\t{} octets\n",
            rr.owner,
            rr.ttl,
            rr.rrclass,
            rr.rrtype,
            bytes.len()
        ),
    }
}

/// A 16-bit query id with no particular guarantee beyond pseudo-random
/// spread: collision resistance across concurrent outstanding queries is
/// what matters, not unpredictability against an off-path attacker (which
/// is TSIG's job, not the id's).
fn random_id() -> u16 {
    rand::thread_rng().gen()
}
