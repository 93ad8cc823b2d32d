//! CIDR collapsing for delegated address space.
//!
//! Blocks that overlap or touch are merged and cut back into the fewest
//! aligned CIDR blocks.
//! For example: [10.0.0.0/25, 10.0.0.128/25] -> [10.0.0.0/24]
//!
//! IPv4 and IPv6 are always collapsed separately.

use ipnet::{IpNet, Ipv4Net, Ipv6Net};

use crate::error::{Result, RirsetError};

/// Collapse IPv4 blocks into the minimal disjoint set, ascending.
pub fn collapse_v4(nets: &[Ipv4Net]) -> Vec<Ipv4Net> {
    Ipv4Net::aggregate(&nets.to_vec())
}

/// Collapse IPv6 blocks into the minimal disjoint set, ascending.
pub fn collapse_v6(nets: &[Ipv6Net]) -> Vec<Ipv6Net> {
    Ipv6Net::aggregate(&nets.to_vec())
}

/// Collapse a list of blocks into the minimal set covering the same space.
///
/// Families are collapsed independently; the result holds the IPv4 blocks
/// followed by the IPv6 blocks, each in ascending order.
pub fn collapse(nets: &[IpNet]) -> Vec<IpNet> {
    let mut v4_nets = Vec::new();
    let mut v6_nets = Vec::new();
    for net in nets {
        match net {
            IpNet::V4(v4) => v4_nets.push(*v4),
            IpNet::V6(v6) => v6_nets.push(*v6),
        }
    }

    collapse_v4(&v4_nets)
        .into_iter()
        .map(IpNet::V4)
        .chain(collapse_v6(&v6_nets).into_iter().map(IpNet::V6))
        .collect()
}

/// Parse one `address/prefix` string.
///
/// Host bits are allowed and dropped when collapsing. A bare address without
/// a prefix length is rejected.
pub fn parse_cidr(cidr: &str) -> Result<IpNet> {
    let trimmed = cidr.trim();
    if !trimmed.contains('/') {
        return Err(RirsetError::InvalidCidr(format!(
            "{} (missing prefix length)",
            trimmed
        )));
    }
    trimmed
        .parse()
        .map_err(|_| RirsetError::InvalidCidr(trimmed.to_string()))
}

/// Collapse CIDR strings, returning canonical strings.
///
/// Any unparseable entry rejects the whole list.
///
/// # Examples
/// ```
/// use rirset::aggregator::collapse_cidrs;
/// let merged = collapse_cidrs(&["10.0.0.0/25", "10.0.0.128/25"]).unwrap();
/// assert_eq!(merged, vec!["10.0.0.0/24"]);
/// assert!(collapse_cidrs(&["10.0.0.0/33"]).is_err());
/// ```
pub fn collapse_cidrs<S: AsRef<str>>(cidrs: &[S]) -> Result<Vec<String>> {
    let nets = cidrs
        .iter()
        .map(|c| parse_cidr(c.as_ref()))
        .collect::<Result<Vec<IpNet>>>()?;

    Ok(collapse(&nets).iter().map(|n| n.to_string()).collect())
}

/// Calculate the total number of individual addresses covered by a list of CIDRs.
///
/// Uses saturating arithmetic to prevent overflow on large prefixes like /0.
pub fn count_ips(nets: &[IpNet]) -> u128 {
    nets.iter()
        .map(|net| {
            let shift = net.max_prefix_len() - net.prefix_len();
            // 1 << 128 would overflow u128
            if shift >= 128 {
                u128::MAX
            } else {
                1u128 << shift
            }
        })
        .fold(0u128, |acc, count| acc.saturating_add(count))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    fn nets(cidrs: &[&str]) -> Vec<IpNet> {
        cidrs.iter().map(|c| c.parse().unwrap()).collect()
    }

    fn strings(nets: &[IpNet]) -> Vec<String> {
        nets.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn test_collapse_adjacent() {
        let result = collapse(&nets(&["10.0.0.0/25", "10.0.0.128/25"]));
        assert_eq!(strings(&result), vec!["10.0.0.0/24"]);
    }

    #[test]
    fn test_collapse_subsumed() {
        let result = collapse(&nets(&["10.0.0.0/24", "10.0.0.0/25"]));
        assert_eq!(strings(&result), vec!["10.0.0.0/24"]);

        let result = collapse(&nets(&["10.0.0.64/26", "10.0.0.0/24"]));
        assert_eq!(strings(&result), vec!["10.0.0.0/24"]);
    }

    #[test]
    fn test_collapse_duplicates() {
        let result = collapse(&nets(&["192.168.0.0/24", "192.168.0.0/24"]));
        assert_eq!(strings(&result), vec!["192.168.0.0/24"]);
    }

    #[test]
    fn test_collapse_adjacent_but_unaligned() {
        // 1.2.3.0 is not on a /23 boundary
        let result = collapse(&nets(&["1.2.3.0/24", "1.2.4.0/24"]));
        assert_eq!(strings(&result), vec!["1.2.3.0/24", "1.2.4.0/24"]);

        let result = collapse(&nets(&["1.2.2.0/24", "1.2.3.0/24"]));
        assert_eq!(strings(&result), vec!["1.2.2.0/23"]);
    }

    #[test]
    fn test_collapse_decomposes_unaligned_run() {
        let input: Vec<IpNet> = (1..=6)
            .map(|i| format!("10.0.0.{}/32", i).parse().unwrap())
            .collect();
        let result = collapse(&input);
        assert_eq!(
            strings(&result),
            vec!["10.0.0.1/32", "10.0.0.2/31", "10.0.0.4/31", "10.0.0.6/32"]
        );
    }

    #[test]
    fn test_collapse_overlapping_chain() {
        let result = collapse(&nets(&["10.0.0.0/23", "10.0.1.0/24", "10.0.2.0/23"]));
        assert_eq!(strings(&result), vec!["10.0.0.0/22"]);
    }

    #[test]
    fn test_collapse_non_contiguous_sorted() {
        let result = collapse(&nets(&["192.168.0.0/24", "10.0.0.0/8"]));
        assert_eq!(strings(&result), vec!["10.0.0.0/8", "192.168.0.0/24"]);
    }

    #[test]
    fn test_collapse_canonicalizes_host_bits() {
        let input = vec![IpNet::V4(
            Ipv4Net::new(Ipv4Addr::new(10, 0, 0, 77), 24).unwrap(),
        )];
        assert_eq!(strings(&collapse(&input)), vec!["10.0.0.0/24"]);
    }

    #[test]
    fn test_collapse_whole_space() {
        let result = collapse(&nets(&["0.0.0.0/1", "128.0.0.0/1"]));
        assert_eq!(strings(&result), vec!["0.0.0.0/0"]);

        let result = collapse(&nets(&["::/1", "8000::/1", "2001:db8::/32"]));
        assert_eq!(strings(&result), vec!["::/0"]);

        let result = collapse(&nets(&["255.255.255.255/32", "255.255.255.254/32"]));
        assert_eq!(strings(&result), vec!["255.255.255.254/31"]);

        let result = collapse(&nets(&["ffff:ffff:ffff:ffff:ffff:ffff:ffff:ffff/128"]));
        assert_eq!(strings(&result), vec!["ffff:ffff:ffff:ffff:ffff:ffff:ffff:ffff/128"]);
    }

    #[test]
    fn test_collapse_single_family_forms() {
        let v4: Vec<Ipv4Net> = ["1.2.4.0/24", "1.2.3.0/24", "1.2.5.0/24", "128.0.0.0/1"]
            .iter()
            .map(|s| s.parse().unwrap())
            .collect();
        let result: Vec<String> = collapse_v4(&v4).iter().map(|n| n.to_string()).collect();
        assert_eq!(result, vec!["1.2.3.0/24", "1.2.4.0/23", "128.0.0.0/1"]);

        let v6: Vec<Ipv6Net> = ["8000::/1", "::/1"].iter().map(|s| s.parse().unwrap()).collect();
        let result: Vec<String> = collapse_v6(&v6).iter().map(|n| n.to_string()).collect();
        assert_eq!(result, vec!["::/0"]);
    }

    #[test]
    fn test_collapse_ipv6() {
        let result = collapse(&nets(&["2001:db8::/33", "2001:db8:8000::/33", "2001:db9::/32"]));
        assert_eq!(strings(&result), vec!["2001:db8::/31"]);
    }

    #[test]
    fn test_collapse_family_isolation() {
        // 0.0.0.0/8 and ::/8 share an integer base, and 1.0.0.0/8 would merge
        // with either if families were mixed
        let result = collapse(&nets(&["::/8", "0.0.0.0/8", "1.0.0.0/8", "100::/8"]));
        assert_eq!(strings(&result), vec!["0.0.0.0/7", "::/7"]);

        let result = collapse(&nets(&["::/96", "0.0.0.0/0"]));
        assert_eq!(strings(&result), vec!["0.0.0.0/0", "::/96"]);
    }

    #[test]
    fn test_collapse_empty() {
        assert!(collapse(&[]).is_empty());
    }

    #[test]
    fn test_collapse_cidrs() {
        let merged = collapse_cidrs(&["1.2.3.0/24", "1.2.2.0/24", "2001:db8::/32"]).unwrap();
        assert_eq!(merged, vec!["1.2.2.0/23", "2001:db8::/32"]);
    }

    #[test]
    fn test_collapse_cidrs_rejects_invalid() {
        for bad in ["10.0.0.0/33", "300.0.0.0/8", "not-a-cidr", "10.0.0.1", "::/129", "/24"] {
            let err = collapse_cidrs(&["10.0.0.0/8", bad]).unwrap_err();
            assert!(matches!(err, RirsetError::InvalidCidr(_)), "{}", bad);
        }
    }

    #[test]
    fn test_parse_cidr_trims() {
        assert_eq!(
            parse_cidr("  10.0.0.0/8\t").unwrap(),
            "10.0.0.0/8".parse::<IpNet>().unwrap()
        );
    }

    #[test]
    fn test_count_ips() {
        let input = nets(&["192.168.0.0/24", "10.0.0.0/8"]);
        assert_eq!(count_ips(&input), 256 + 16_777_216);
    }

    #[test]
    fn test_count_ips_overflow_protection() {
        assert_eq!(count_ips(&nets(&["0.0.0.0/0"])), 1u128 << 32);
        assert_eq!(count_ips(&nets(&["::/0"])), u128::MAX);
        assert_eq!(count_ips(&nets(&["::/0", "::/1"])), u128::MAX);
    }
}
