//! Test exact IP matching behavior
//!
//! When individual IP addresses (as /32s) are inserted, only those exact IPs
//! match, not broader CIDR ranges.

use mmdbkit::data_section::DataValue;
use mmdbkit::database::Database;
use mmdbkit::mmdb_builder::MmdbBuilder;
use std::collections::HashMap;

fn build(keys: &[&str]) -> Database {
    let mut builder = MmdbBuilder::new();
    for key in keys {
        builder.add_ip(key, HashMap::new()).unwrap();
    }
    Database::from_bytes(builder.build().unwrap()).unwrap()
}

fn found(db: &Database, ip: &str) -> bool {
    db.lookup(ip).unwrap().is_some()
}

#[test]
fn test_exact_ip_matching_no_overmatch() {
    let db = build(&["0.0.0.1", "0.0.0.3", "0.0.0.5"]);

    for ip in ["0.0.0.1", "0.0.0.3", "0.0.0.5"] {
        assert!(found(&db, ip), "{} should be found", ip);
    }
    for ip in ["0.0.0.0", "0.0.0.2", "0.0.0.4", "0.0.0.6"] {
        assert!(!found(&db, ip), "{} should NOT be found (not inserted)", ip);
    }
}

#[test]
fn test_sequential_ips_no_range_expansion() {
    let keys: Vec<String> = (0..10).map(|i| format!("10.0.0.{}", i)).collect();
    let refs: Vec<&str> = keys.iter().map(String::as_str).collect();
    let db = build(&refs);

    for i in 0..10 {
        assert!(found(&db, &format!("10.0.0.{}", i)), "10.0.0.{} should be found", i);
    }
    for i in 10..20 {
        assert!(
            !found(&db, &format!("10.0.0.{}", i)),
            "10.0.0.{} should NOT be found (not inserted)",
            i
        );
    }
    assert!(!found(&db, "10.0.1.0"));
}

#[test]
fn test_sparse_ips_no_implicit_ranges() {
    let db = build(&["192.168.1.1", "192.168.1.100", "192.168.1.200"]);

    for ip in ["192.168.1.1", "192.168.1.100", "192.168.1.200"] {
        assert!(found(&db, ip));
    }
    for ip in ["192.168.1.2", "192.168.1.50", "192.168.1.150", "192.168.1.250"] {
        assert!(!found(&db, ip), "{} should NOT match", ip);
    }
}

#[test]
fn test_cidr_vs_individual_ips() {
    let mut builder = MmdbBuilder::new();
    let mut cidr_data = HashMap::new();
    cidr_data.insert("type".to_string(), DataValue::String("cidr".to_string()));
    let mut individual_data = HashMap::new();
    individual_data.insert(
        "type".to_string(),
        DataValue::String("individual".to_string()),
    );

    // A /30 covers .0 through .3
    builder.add_ip("10.0.0.0/30", cidr_data.clone()).unwrap();
    builder.add_ip("10.0.0.5", individual_data.clone()).unwrap();
    builder.add_ip("10.0.0.10", individual_data.clone()).unwrap();

    let db = Database::from_bytes(builder.build().unwrap()).unwrap();

    for i in 0..4 {
        let result = db.lookup(&format!("10.0.0.{}", i)).unwrap().unwrap();
        assert_eq!(result.data, DataValue::Map(cidr_data.clone()));
        assert_eq!(result.prefix_len, 30);
    }
    for ip in ["10.0.0.4", "10.0.0.6", "10.0.0.9", "10.0.0.11"] {
        assert!(!found(&db, ip), "{} should NOT match", ip);
    }
    for ip in ["10.0.0.5", "10.0.0.10"] {
        let result = db.lookup(ip).unwrap().unwrap();
        assert_eq!(result.data, DataValue::Map(individual_data.clone()));
        assert_eq!(result.prefix_len, 32);
    }
}

#[test]
fn test_ipv4_mapped_network_matches_both_forms() {
    let db = build(&["::ffff:192.0.2.0/120"]);

    for ip in ["::ffff:192.0.2.7", "192.0.2.7"] {
        let result = db.lookup(ip).unwrap();
        assert_eq!(result.map(|r| r.prefix_len), Some(24), "{} should match", ip);
    }
    assert!(!found(&db, "192.0.3.1"));
    assert!(!found(&db, "::ffff:192.0.3.1"));
}

#[test]
fn test_ipv4_mapped_host_matches_plain_ipv4() {
    let db = build(&["::ffff:10.0.0.1", "2001:db8::1"]);

    assert!(found(&db, "10.0.0.1"));
    assert!(found(&db, "::ffff:10.0.0.1"));
    assert!(!found(&db, "10.0.0.2"));
}
