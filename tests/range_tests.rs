//! Range parsing and target enumeration tests

use httpscan::{
    scanner::{AddressRange, OctetRange, ScanSpec, Target},
    utils::{parse_cidr, parse_octets, parse_ports, parse_scan_args},
    ScanError,
};
use proptest::prelude::*;
use std::collections::HashSet;
use std::net::Ipv4Addr;

fn octet_range() -> impl Strategy<Value = OctetRange> {
    (any::<u8>(), any::<u8>()).prop_map(|(a, b)| OctetRange::new(a.min(b), a.max(b)).unwrap())
}

/// Keep generated ranges small enough to enumerate
fn small_range() -> impl Strategy<Value = AddressRange> {
    (any::<u8>(), 0u8..4, any::<u8>(), 0u8..6, any::<u8>(), any::<u8>()).prop_map(
        |(a, a_len, b, b_len, c, d)| {
            AddressRange::new([
                OctetRange::single(a),
                OctetRange::new(b / 2, b / 2 + a_len).unwrap(),
                OctetRange::new(c / 2, c / 2 + b_len).unwrap(),
                OctetRange::single(d),
            ])
        },
    )
}

proptest! {
    #[test]
    fn octet_range_yields_every_value_once(range in octet_range()) {
        let values: Vec<u8> = range.iter().collect();
        let distinct: HashSet<u8> = values.iter().copied().collect();

        prop_assert_eq!(values.len(), usize::from(range.len()));
        prop_assert_eq!(distinct.len(), values.len());
        prop_assert!(values.iter().all(|v| range.contains(*v)));
    }

    #[test]
    fn targets_match_expected_count(
        range in small_range(),
        ports in prop::collection::vec(1u16.., 1..4),
    ) {
        let spec = ScanSpec::builder().range(range).ports(ports.clone()).build().unwrap();
        let targets: Vec<Target> = spec.targets().collect();

        prop_assert_eq!(targets.len() as u64, spec.expected_count());
        prop_assert_eq!(spec.expected_count(), range.address_count() * ports.len() as u64);
        prop_assert!(targets.iter().all(|t| range.contains(t.ip()) && ports.contains(&t.port())));

        let distinct: HashSet<Target> = targets.iter().copied().collect();
        let distinct_ports: HashSet<u16> = ports.iter().copied().collect();
        prop_assert_eq!(distinct.len() as u64, range.address_count() * distinct_ports.len() as u64);
    }

    #[test]
    fn cidr_never_covers_network_address(address in any::<u32>(), mask in 0u32..32) {
        let input = format!("{}/{}", Ipv4Addr::from(address), mask);
        let host_mask = ((1u64 << (32 - mask)) - 1) as u32;
        let network = address & !host_mask;

        if let Ok(range) = parse_cidr(&input) {
            prop_assert!(!range.contains(Ipv4Addr::from(network)));
            prop_assert!(range.contains(Ipv4Addr::from(network + 1)));
            if mask <= 24 {
                prop_assert!(!range.contains(Ipv4Addr::from(network | host_mask)));
            }
        }
    }

    #[test]
    fn small_cidr_stays_inside_network(address in any::<u32>(), mask in 24u32..32) {
        let input = format!("{}/{}", Ipv4Addr::from(address), mask);
        let host_mask = ((1u64 << (32 - mask)) - 1) as u32;
        let network = address & !host_mask;

        if let Ok(range) = parse_cidr(&input) {
            let spec = ScanSpec::builder().range(range).build().unwrap();
            let addrs: Vec<u32> = spec.targets().map(|t| u32::from(t.ip())).collect();

            prop_assert_eq!(addrs.len() as u64, range.address_count());
            prop_assert!(addrs.iter().all(|a| *a > network && *a <= (network | host_mask)));
        }
    }

    #[test]
    fn cidr_24_equals_wildcard_octets(a in any::<u8>(), b in any::<u8>(), c in any::<u8>(), ports in prop::collection::vec(1u16.., 0..3)) {
        let ports: Vec<String> = ports.iter().map(|p| p.to_string()).collect();

        let mut cidr_args = vec![format!("{}.{}.{}.0/24", a, b, c)];
        cidr_args.extend(ports.iter().cloned());
        let mut range_args = vec![a.to_string(), b.to_string(), c.to_string(), "1-254".to_string()];
        range_args.extend(ports.iter().cloned());
        let mut wildcard_args = vec![a.to_string(), b.to_string(), c.to_string(), "*".to_string()];
        wildcard_args.extend(ports.iter().cloned());

        let cidr = parse_scan_args(&cidr_args, 16).unwrap();
        prop_assert_eq!(&cidr, &parse_scan_args(&range_args, 16).unwrap());
        prop_assert_eq!(&cidr, &parse_scan_args(&wildcard_args, 16).unwrap());
        prop_assert_eq!(cidr.range().address_count(), 254);
    }
}

#[test]
fn test_wildcard_counts() {
    let all = parse_octets(&["*", "*", "*", "*"]).unwrap();
    assert_eq!(all.address_count(), 256 * 256 * 256 * 254);

    let last_only = parse_octets(&["10", "0", "0", "*"]).unwrap();
    assert_eq!(last_only.address_count(), 254);

    let middle = parse_octets(&["10", "*", "0", "1"]).unwrap();
    assert_eq!(middle.address_count(), 256);
    assert!(middle.contains(Ipv4Addr::new(10, 0, 0, 1)));
    assert!(middle.contains(Ipv4Addr::new(10, 255, 0, 1)));
}

#[test]
fn test_localhost_cidr_16() {
    let spec = parse_scan_args(&["127.0.0.0/16"], 64).unwrap();
    assert_eq!(spec.expected_count(), 256 * 254);
    assert_eq!(spec.ports(), &[80]);

    let mut targets = spec.targets();
    assert_eq!(targets.next(), Some(Target::new([127, 0, 0, 1], 80)));
    assert_eq!(targets.last(), Some(Target::new([127, 0, 255, 254], 80)));
}

#[test]
fn test_enumeration_order() {
    let spec = parse_scan_args(&["10", "0", "1-2", "5-6", "80", "443"], 4).unwrap();
    let targets: Vec<String> = spec.targets().map(|t| t.to_string()).collect();
    assert_eq!(
        targets,
        vec![
            "10.0.1.5:80",
            "10.0.1.5:443",
            "10.0.1.6:80",
            "10.0.1.6:443",
            "10.0.2.5:80",
            "10.0.2.5:443",
            "10.0.2.6:80",
            "10.0.2.6:443",
        ]
    );
}

#[test]
fn test_remaining_tracks_progress() {
    let spec = parse_scan_args(&["10.0.0.0/30", "80", "81"], 4).unwrap();
    let mut targets = spec.targets();
    assert_eq!(targets.remaining(), 6);
    targets.next();
    targets.next();
    assert_eq!(targets.remaining(), 4);
    assert_eq!(targets.size_hint(), (4, Some(4)));
}

#[test]
fn test_default_port() {
    assert_eq!(parse_ports::<&str>(&[]).unwrap(), vec![80]);
    let spec = parse_scan_args(&["192", "168", "1", "1"], 1).unwrap();
    assert_eq!(spec.ports(), &[80]);
    assert_eq!(spec.expected_count(), 1);
}

#[test]
fn test_invalid_inputs_are_rejected() {
    let empty: [&str; 0] = [];
    assert!(matches!(parse_scan_args(&empty, 4), Err(ScanError::NotEnoughArguments(_))));
    assert!(matches!(parse_scan_args(&["10", "0", "0"], 4), Err(ScanError::NotEnoughArguments(_))));

    assert!(matches!(parse_cidr("10.0.0.0/32"), Err(ScanError::InvalidMask(_))));
    assert!(matches!(parse_cidr("10.0.0.0/33"), Err(ScanError::InvalidMask(_))));
    assert!(matches!(parse_cidr("256.0.0.0/8"), Err(ScanError::InvalidOctet(_))));
    assert!(matches!(parse_cidr("10.0.0/8"), Err(ScanError::InvalidRange(_))));

    assert!(matches!(parse_octets(&["10", "0", "0", "256"]), Err(ScanError::InvalidOctet(_))));
    assert!(matches!(parse_octets(&["10", "0", "4-3", "1"]), Err(ScanError::InvalidRange(_))));
    assert!(matches!(parse_octets(&["10", "x", "0", "1"]), Err(ScanError::InvalidOctet(_))));

    assert!(matches!(parse_ports(&["http"]), Err(ScanError::InvalidPort(_))));
    assert!(matches!(parse_ports(&["0"]), Err(ScanError::InvalidPort(_))));
    assert!(matches!(parse_ports(&["65536"]), Err(ScanError::InvalidPort(_))));
    assert!(matches!(
        parse_scan_args(&["10.0.0.0/24", "80", "eighty"], 4),
        Err(ScanError::InvalidPort(_))
    ));
}

#[test]
fn test_validation_errors_are_flagged() {
    let err = parse_cidr("10.0.0.0/40").unwrap_err();
    assert!(err.is_validation());
}
