//! Robustness tests for edge cases and error conditions.
//!
//! These tests verify that rirset handles hostile or degenerate feeds
//! gracefully.

use ipnet::IpNet;
use rirset::aggregator::{collapse, collapse_cidrs, count_ips};
use rirset::delegation::{
    derive_block, interpret, AddressFamily, InvalidRecordPolicy, RecordFilter,
};
use std::time::Duration;

fn cn(family: AddressFamily) -> RecordFilter {
    RecordFilter::new("apnic", "CN", family)
}

/// Test that network timeout handling works correctly
#[tokio::test]
async fn test_fetch_timeout() {
    use rirset::fetcher::Fetcher;

    let fetcher = Fetcher::new(Duration::from_millis(1)).unwrap();

    // Non-routable address: should time out or fail to connect, not panic
    let result = fetcher
        .fetch_lines("https://10.255.255.1:12345/delegated-apnic-latest")
        .await;
    assert!(result.is_err());
}

/// Test that malformed lines never abort interpretation under the skip policy
#[test]
fn test_malformed_feed_lines() {
    let lines = vec![
        "",
        "\r",
        "apnic|CN|ipv4",
        "apnic|CN|ipv4|",
        "apnic|CN|ipv4|1.0.1.0",
        "apnic|CN|ipv4|||",
        "apnic|CN|ipv4|not-an-ip|256|20110414|allocated",
        "apnic|CN|ipv4|1.0.1.0|-1|20110414|allocated",
        "apnic|CN|ipv4|1.0.1.0|0|20110414|allocated",
        "apnic|CN|ipv4|1.0.1.0|99999999999999999999|20110414|allocated",
        "apnic|CN|ipv4|::1|256|20110414|allocated",
        "apnic|CN|ipv6|1.0.1.0|32|20110414|allocated",
        "apnic|CN|ipv6|2001:db8::|129|20110414|allocated",
        "apnic|CN|ipv4|1.0.2.0|256|20110414|allocated",
    ];

    let v4 = interpret(&lines, &cn(AddressFamily::Ipv4), InvalidRecordPolicy::Skip).unwrap();
    assert_eq!(v4.cidrs(), vec!["1.0.2.0/24"]);
    assert!(v4.skipped > 0);

    let v6 = interpret(&lines, &cn(AddressFamily::Ipv6), InvalidRecordPolicy::Skip).unwrap();
    assert!(v6.blocks.is_empty());
}

/// Test that the fail policy stops at the first bad record
#[test]
fn test_fail_policy_rejects_bad_record() {
    let lines = vec![
        "apnic|CN|ipv4|1.0.1.0|256|20110414|allocated",
        "apnic|CN|ipv4|1.0.2.0|zero|20110414|allocated",
    ];
    let result = interpret(&lines, &cn(AddressFamily::Ipv4), InvalidRecordPolicy::Fail);
    assert!(result.is_err());
}

/// Test CRLF-terminated feeds
#[test]
fn test_crlf_feed() {
    let content = "apnic|CN|ipv4|1.0.1.0|256|20110414|allocated\r\n\
                   apnic|CN|ipv6|2001:250::|35|20000426|allocated\r\n";
    let lines: Vec<&str> = content.split('\n').collect();

    let v4 = interpret(&lines, &cn(AddressFamily::Ipv4), InvalidRecordPolicy::Fail).unwrap();
    assert_eq!(v4.cidrs(), vec!["1.0.1.0/24"]);
    let v6 = interpret(&lines, &cn(AddressFamily::Ipv6), InvalidRecordPolicy::Fail).unwrap();
    assert_eq!(v6.cidrs(), vec!["2001:250::/35"]);
}

/// Test block derivation edge cases
#[test]
fn test_derive_block_edge_cases() {
    // Largest and smallest representable IPv4 blocks
    assert_eq!(
        derive_block("128.0.0.0", "2147483648", AddressFamily::Ipv4)
            .unwrap()
            .to_string(),
        "128.0.0.0/1"
    );
    assert_eq!(
        derive_block("255.255.255.255", "1", AddressFamily::Ipv4)
            .unwrap()
            .to_string(),
        "255.255.255.255/32"
    );
    // A size covering the whole space is rejected
    assert!(derive_block("0.0.0.0", "4294967296", AddressFamily::Ipv4).is_err());

    // IPv6 extremes
    assert_eq!(
        derive_block("::1", "128", AddressFamily::Ipv6)
            .unwrap()
            .to_string(),
        "::1/128"
    );
    assert!(derive_block("::", "0", AddressFamily::Ipv6).is_err());
}

/// Test CIDR parsing edge cases in the collapse entry point
#[test]
fn test_collapse_cidr_edge_cases() {
    assert_eq!(collapse_cidrs(&["0.0.0.0/0"]).unwrap(), vec!["0.0.0.0/0"]);
    assert_eq!(collapse_cidrs(&["::/0"]).unwrap(), vec!["::/0"]);
    assert_eq!(
        collapse_cidrs(&["255.255.255.255/32"]).unwrap(),
        vec!["255.255.255.255/32"]
    );
    assert_eq!(
        collapse_cidrs(&["ffff:ffff:ffff:ffff:ffff:ffff:ffff:ffff/128"]).unwrap(),
        vec!["ffff:ffff:ffff:ffff:ffff:ffff:ffff:ffff/128"]
    );

    assert!(collapse_cidrs(&["192.168.1.1/33"]).is_err());
    assert!(collapse_cidrs(&["192.168.1.1/"]).is_err());
    assert!(collapse_cidrs(&["/24"]).is_err());
    assert!(collapse_cidrs(&["192.168.1.1"]).is_err());
    assert!(collapse_cidrs(&[""]).is_err());
}

/// Test the top of each address space, where inclusive ends touch the maximum
#[test]
fn test_collapse_at_address_space_end() {
    let input: Vec<IpNet> = [
        "255.255.255.0/25",
        "255.255.255.128/25",
        "ffff:ffff:ffff:ffff:ffff:ffff:ffff:fffe/128",
        "ffff:ffff:ffff:ffff:ffff:ffff:ffff:ffff/128",
    ]
    .iter()
    .map(|s| s.parse().unwrap())
    .collect();

    let merged: Vec<String> = collapse(&input).iter().map(|n| n.to_string()).collect();
    assert_eq!(
        merged,
        vec![
            "255.255.255.0/24",
            "ffff:ffff:ffff:ffff:ffff:ffff:ffff:fffe/127",
        ]
    );
}

/// Test large input handling
#[test]
fn test_large_feed() {
    // 65536 consecutive /24 allocations starting at 10.0.0.0 collapse to one /8
    let lines: Vec<String> = (0..65536u32)
        .map(|i| {
            format!(
                "apnic|CN|ipv4|10.{}.{}.0|256|20110414|allocated",
                i >> 8,
                i & 0xff
            )
        })
        .collect();

    let interpretation =
        interpret(&lines, &cn(AddressFamily::Ipv4), InvalidRecordPolicy::Fail).unwrap();
    assert_eq!(interpretation.blocks.len(), 65536);

    let merged = collapse(&interpretation.blocks);
    assert_eq!(merged.len(), 1);
    assert_eq!(merged[0].to_string(), "10.0.0.0/8");
    assert_eq!(count_ips(&merged), 1 << 24);
}

/// Test that a reversed, duplicated feed still collapses to the same result
#[test]
fn test_unordered_duplicated_feed() {
    let mut lines: Vec<String> = (0..512u32)
        .rev()
        .map(|i| format!("apnic|CN|ipv4|172.16.{}.0|256|20110414|allocated", i % 256))
        .collect();
    lines.extend(lines.clone());

    let interpretation =
        interpret(&lines, &cn(AddressFamily::Ipv4), InvalidRecordPolicy::Fail).unwrap();
    let merged = collapse(&interpretation.blocks);
    assert_eq!(merged.len(), 1);
    assert_eq!(merged[0].to_string(), "172.16.0.0/16");
}
