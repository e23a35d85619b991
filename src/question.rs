use crate::compress::CompressionTable;
use crate::constants::DNS_RR_QUESTION_HEADER_SIZE;
use crate::errors::{DnsError, Result};
use crate::name::Name;
use byteorder::{BigEndian, ByteOrder};

/// A single entry of the question section: QNAME/QTYPE/QCLASS (RFC 1035 §4.1.2).
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct Question {
    pub qname: Name,
    pub qtype: u16,
    pub qclass: u16,
}

impl Question {
    pub fn new(qname: Name, qtype: u16, qclass: u16) -> Self {
        Question {
            qname,
            qtype,
            qclass,
        }
    }

    pub fn encode(&self, offset: usize, table: &mut CompressionTable, out: &mut Vec<u8>) {
        self.qname.encode(offset, table, out);
        let mut tail = [0u8; DNS_RR_QUESTION_HEADER_SIZE];
        BigEndian::write_u16(&mut tail[0..2], self.qtype);
        BigEndian::write_u16(&mut tail[2..4], self.qclass);
        out.extend_from_slice(&tail);
    }

    pub fn decode(buffer: &[u8], offset: usize) -> Result<(Question, usize)> {
        let (qname, pos) = Name::decode(buffer, offset)?;
        if pos + DNS_RR_QUESTION_HEADER_SIZE > buffer.len() {
            return Err(DnsError::TruncatedSection);
        }
        let qtype = BigEndian::read_u16(&buffer[pos..pos + 2]);
        let qclass = BigEndian::read_u16(&buffer[pos + 2..pos + 4]);
        Ok((
            Question {
                qname,
                qtype,
                qclass,
            },
            pos + DNS_RR_QUESTION_HEADER_SIZE,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{Class, Type};

    #[test]
    fn question_round_trips() {
        let q = Question::new(
            Name::from_dotted("example.com").unwrap(),
            Type::A as u16,
            Class::IN as u16,
        );
        let mut table = CompressionTable::new();
        let mut buf = Vec::new();
        q.encode(12, &mut table, &mut buf);
        let (decoded, next) = Question::decode(&buf, 0).unwrap();
        assert_eq!(decoded, q);
        assert_eq!(next, buf.len());
    }

    #[test]
    fn truncated_question_tail_is_rejected() {
        let mut buf = vec![0u8]; // root name, then nothing
        buf.truncate(1);
        let err = Question::decode(&buf, 0).unwrap_err();
        assert_eq!(err, DnsError::TruncatedSection);
    }
}
