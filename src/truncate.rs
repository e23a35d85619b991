use crate::constants::DNS_MIN_TRUNCATED_SIZE;
use crate::packet::Packet;
use crate::rr::ResourceRecord;

/// Enforces a maximum wire length per RFC 2181 §9, mutating the packet in
/// place and setting TC as required.
///
/// The two-pass split matters: TC exists to tell a resolver "a required
/// RRset was omitted, retry over TCP" — not "some optional glue was
/// trimmed". Popping whole `additional` RRsets first, without TC, lets glue
/// get dropped silently; only once `authority`/`answer`/`question` starts
/// losing data does TC get set.
pub fn truncate(packet: &mut Packet, max_len: usize) {
    let max_len = max_len.max(DNS_MIN_TRUNCATED_SIZE);

    while packet.encode().len() > max_len && !packet.additional.is_empty() {
        pop_rrset(&mut packet.additional);
    }

    if packet.encode().len() <= max_len {
        return;
    }

    for section_key in ["authority", "answer", "question"] {
        while packet.encode().len() > max_len {
            let popped = match section_key {
                "authority" => pop_rrset(&mut packet.authority),
                "answer" => pop_rrset(&mut packet.answer),
                "question" => packet.question.pop().is_some(),
                _ => unreachable!(),
            };
            if !popped {
                break;
            }
            tracing::warn!(section = section_key, "dropping required RRset to fit size cap, setting TC");
            packet.header.set_tc(true);
        }
    }
}

/// Pops every record sharing owner+type+class with the last record of the
/// section (an RRset, RFC 2181 §5.2 — indivisible for transmission).
/// Returns whether anything was popped.
fn pop_rrset(section: &mut Vec<ResourceRecord>) -> bool {
    let last = match section.last() {
        Some(rr) => (rr.owner.canonical_key(), rr.rrtype, rr.rrclass),
        None => return false,
    };
    let mut popped_any = false;
    while let Some(rr) = section.last() {
        let key = (rr.owner.canonical_key(), rr.rrtype, rr.rrclass);
        if key != last {
            break;
        }
        section.pop();
        popped_any = true;
    }
    popped_any
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{Class, Type};
    use crate::name::Name;
    use crate::rr::RData;

    fn a_record(owner: &str, octet: u8) -> ResourceRecord {
        ResourceRecord::new(
            Name::from_dotted(owner).unwrap(),
            Type::A as u16,
            Class::IN as u16,
            300,
            RData::Opaque(vec![192, 0, 2, octet]),
        )
    }

    #[test]
    fn truncation_drops_answer_rrsets_and_sets_tc() {
        let mut packet = Packet::new_query("example.com", Type::A as u16, Class::IN as u16).unwrap();
        packet.header.set_qr(true);
        let rrs: Vec<_> = (0..10u8).map(|i| a_record("example.com", i)).collect();
        packet.push("answer", rrs).unwrap();
        let full_len = packet.encode().len();
        assert!(full_len > 512);

        truncate(&mut packet, 512);
        let truncated_len = packet.encode().len();
        assert!(truncated_len <= 512);
        assert!(truncated_len >= 12 + 17);
        assert!(packet.header.tc());
        assert!(packet.answer.len() < 10);
    }

    #[test]
    fn truncation_is_monotone_in_the_cap() {
        let mut packet = Packet::new_query("example.com", Type::A as u16, Class::IN as u16).unwrap();
        packet.header.set_qr(true);
        let rrs: Vec<_> = (0..10u8).map(|i| a_record("example.com", i)).collect();
        packet.push("answer", rrs).unwrap();

        let mut low = packet.clone();
        truncate(&mut low, 512);
        let mut high = packet.clone();
        truncate(&mut high, 900);

        assert!(low.encode().len() <= high.encode().len());
        assert!(high.encode().len() <= 900);
    }

    #[test]
    fn additional_only_truncation_does_not_set_tc() {
        let mut packet = Packet::new_query("example.com", Type::A as u16, Class::IN as u16).unwrap();
        packet.header.set_qr(true);
        let rrs: Vec<_> = (0..20u8).map(|i| a_record("glue.example.com", i)).collect();
        packet.push("additional", rrs).unwrap();
        let full_len = packet.encode().len();
        assert!(full_len > 512);

        truncate(&mut packet, 512);
        assert!(packet.encode().len() <= 512);
        assert!(!packet.header.tc());
    }
}
