//! End-to-end checks: build, serialize, load and query

use mmdbkit::data_section::{DataEncoder, DataValue};
use mmdbkit::mmdb::{serialize, Envelope, PrefixTree};
use mmdbkit::{Database, IpVersion, Metadata, MmdbBuilder, MmdbError, RecordSize};
use proptest::prelude::*;
use std::net::{IpAddr, Ipv4Addr};

/// Tree with no nodes at all
struct EmptyTree;

impl PrefixTree for EmptyTree {
    fn node_count(&self) -> u32 {
        0
    }

    fn record_size(&self) -> RecordSize {
        RecordSize::Bits28
    }

    fn to_bytes(&self) -> mmdbkit::Result<Vec<u8>> {
        Ok(Vec::new())
    }
}

const RECORD_SIZES: [RecordSize; 3] = [RecordSize::Bits24, RecordSize::Bits28, RecordSize::Bits32];

#[test]
fn test_empty_tree_never_matches() {
    let mut encoder = DataEncoder::new();
    encoder
        .encode(&DataValue::String("unreachable".to_string()))
        .unwrap();

    let mut metadata = Metadata::new();
    let bytes = serialize(&EmptyTree, &encoder.into_bytes(), &mut metadata).unwrap();

    let envelope = Envelope::load(&bytes).unwrap();
    assert_eq!(envelope.metadata().node_count, 0);
    assert!(envelope.tree().is_empty());
    for address in [[0u8; 16], [0xFF; 16], [0x80; 16]] {
        assert_eq!(envelope.query(&address).unwrap(), None);
    }
}

#[test]
fn test_metadata_round_trip_per_record_size() {
    for record_size in RECORD_SIZES {
        let mut builder = MmdbBuilder::new()
            .with_record_size(record_size)
            .with_ip_version(IpVersion::V6)
            .with_database_type("RoundTrip")
            .with_description("en", "Round trip")
            .with_languages(["en", "pt-BR"]);
        builder
            .add_network("203.0.113.0".parse().unwrap(), 24, DataValue::Uint32(1))
            .unwrap();
        let bytes = builder.build().unwrap();

        let db = Database::from_bytes(bytes).unwrap();
        let metadata = db.metadata();
        assert_eq!(metadata.record_size, record_size);
        assert_eq!(metadata.ip_version, IpVersion::V6);
        assert_eq!(metadata.node_count, 96 + 24);
        assert_eq!(metadata.database_type, "RoundTrip");
        assert_eq!(metadata.languages, vec!["en", "pt-BR"]);
        assert_eq!(metadata.binary_format_major_version, 2);

        let envelope = db.envelope();
        assert_eq!(
            envelope.tree().len(),
            metadata.node_count as usize * record_size.node_bytes()
        );

        let found = db.lookup("203.0.113.9").unwrap().unwrap();
        assert_eq!(found.data, DataValue::Uint32(1));
        assert_eq!(found.prefix_len, 24);
    }
}

#[test]
fn test_truncated_database() {
    let mut builder = MmdbBuilder::new();
    builder
        .add_network("192.0.2.0".parse().unwrap(), 24, DataValue::Bool(true))
        .unwrap();
    let bytes = builder.build().unwrap();

    // Cut inside the metadata marker
    let cut = Envelope::load(&bytes).unwrap().sections().data_end + 5;
    assert!(matches!(
        Database::from_bytes(bytes[..cut].to_vec()),
        Err(MmdbError::MalformedEnvelope(_))
    ));
}

#[test]
fn test_corrupt_leaf_is_reported() {
    let mut builder = MmdbBuilder::new().with_record_size(RecordSize::Bits32);
    builder
        .add_network("0.0.0.0".parse().unwrap(), 1, DataValue::Uint16(5))
        .unwrap();
    let mut bytes = builder.build().unwrap();

    // Root's left record is the leaf; point it far past the data section
    bytes[..4].copy_from_slice(&0x00FF_FFFFu32.to_be_bytes());
    let db = Database::from_bytes(bytes).unwrap();
    assert!(matches!(
        db.lookup("1.2.3.4"),
        Err(MmdbError::TraversalOutOfRange(_))
    ));
    assert!(db.lookup("200.0.0.1").unwrap().is_none());
}

/// Longest matching prefix by brute force; later entries win ties
fn expected_match(entries: &[(u32, u8)], addr: u32) -> Option<usize> {
    entries
        .iter()
        .enumerate()
        .filter(|&(_, &(net, len))| len == 0 || (net ^ addr) >> (32 - len) == 0)
        .max_by_key(|&(i, &(_, len))| (len, i))
        .map(|(i, _)| i)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_lookup_matches_brute_force(
        entries in prop::collection::vec((any::<u32>(), 0u8..=32), 1..40),
        probes in prop::collection::vec(any::<u32>(), 0..40),
        size_index in 0usize..3,
    ) {
        let mut builder = MmdbBuilder::new().with_record_size(RECORD_SIZES[size_index]);
        for (i, &(net, len)) in entries.iter().enumerate() {
            builder
                .add_network(IpAddr::V4(Ipv4Addr::from(net)), len, DataValue::Uint32(i as u32))
                .unwrap();
        }
        let db = Database::from_bytes(builder.build().unwrap()).unwrap();

        let addresses = entries.iter().map(|&(net, _)| net).chain(probes);
        for addr in addresses {
            let result = db.lookup_ip(IpAddr::V4(Ipv4Addr::from(addr))).unwrap();
            let expected = expected_match(&entries, addr).map(|i| DataValue::Uint32(i as u32));
            prop_assert_eq!(result.map(|r| r.data), expected);
        }
    }

    #[test]
    fn prop_any_address_terminates(
        address in any::<[u8; 16]>(),
        size_index in 0usize..3,
    ) {
        let mut builder = MmdbBuilder::new().with_record_size(RECORD_SIZES[size_index]);
        builder.add_network("2001:db8::".parse().unwrap(), 32, DataValue::Uint16(6)).unwrap();
        builder.add_network("10.0.0.0".parse().unwrap(), 8, DataValue::Uint16(4)).unwrap();
        let db = Database::from_bytes(builder.build().unwrap()).unwrap();

        if let Some(found) = db.lookup_address(&address).unwrap() {
            prop_assert!(found.prefix_len <= 128);
        }
    }
}
