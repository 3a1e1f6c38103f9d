//! Target parsing for the two accepted range notations
//!
//! A scan range is written either as CIDR (`192.168.1.0/24`) or as four
//! separate octet tokens (`192 168 0-1 *`). Any tokens after the range are
//! ports. Both forms skip network and broadcast host addresses:
//! - CIDR drops the all-zero and all-ones host values
//! - a `*` in the fourth octet means `1-254`, in the other octets `0-255`
//!
//! Everything here runs before scanning starts; a parse error means no probe
//! is ever sent.

use crate::scanner::range::{AddressRange, OctetRange};
use crate::scanner::scan_spec::{ScanSpec, ScanSpecBuilder, DEFAULT_PORT};
use crate::ScanError;
use once_cell::sync::Lazy;
use regex::Regex;

static CIDR_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([0-9]+)\.([0-9]+)\.([0-9]+)\.([0-9]+)/([0-9]+)$").expect("valid CIDR pattern")
});

/// Parse `b0.b1.b2.b3/mask` into per-octet ranges.
pub fn parse_cidr(input: &str) -> crate::Result<AddressRange> {
    let caps = CIDR_PATTERN
        .captures(input.trim())
        .ok_or_else(|| ScanError::InvalidRange(format!("{} is not in a.b.c.d/mask form", input)))?;

    let mut address: u32 = 0;
    for i in 1..=4 {
        let byte = parse_byte(&caps[i])?;
        address = (address << 8) | u32::from(byte);
    }

    let mask: u32 = caps[5]
        .parse()
        .map_err(|_| ScanError::InvalidMask(format!("{} is not a valid mask", &caps[5])))?;
    if mask >= 32 {
        return Err(ScanError::InvalidMask(format!("mask must be < 32, got {}", mask)));
    }

    let host_mask = ((1u64 << (32 - mask)) - 1) as u32;
    let low = (address & !host_mask) + 1;
    let mut high = address | host_mask;
    if high & 0xff == 0xff {
        high -= 1;
    }

    let (low, high) = (low.to_be_bytes(), high.to_be_bytes());
    let mut octets = [OctetRange::FULL; 4];
    for (i, octet) in octets.iter_mut().enumerate() {
        *octet = OctetRange::new(low[i], high[i])
            .map_err(|_| ScanError::InvalidRange(format!("{} has no host addresses", input)))?;
    }

    Ok(AddressRange::new(octets))
}

/// Parse one octet token: a byte, an inclusive `a-b` range or `*`.
///
/// `index` is the octet position; it decides what `*` expands to.
pub fn parse_octet_token(token: &str, index: usize) -> crate::Result<OctetRange> {
    if token == "*" {
        return Ok(if index == 3 { OctetRange::HOSTS } else { OctetRange::FULL });
    }

    match token.split_once('-') {
        Some((low, high)) => {
            let (low, high) = (parse_byte(low)?, parse_byte(high)?);
            OctetRange::new(low, high)
        }
        None => parse_byte(token).map(OctetRange::single),
    }
}

/// Parse four octet tokens into an address range
pub fn parse_octets<S: AsRef<str>>(tokens: &[S]) -> crate::Result<AddressRange> {
    if tokens.len() < 4 {
        return Err(ScanError::NotEnoughArguments(format!(
            "expected 4 octet tokens, got {}",
            tokens.len()
        )));
    }

    let mut octets = [OctetRange::FULL; 4];
    for (i, octet) in octets.iter_mut().enumerate() {
        *octet = parse_octet_token(tokens[i].as_ref(), i)?;
    }
    Ok(AddressRange::new(octets))
}

/// Parse port tokens in order. No tokens means port 80.
pub fn parse_ports<S: AsRef<str>>(tokens: &[S]) -> crate::Result<Vec<u16>> {
    if tokens.is_empty() {
        return Ok(vec![DEFAULT_PORT]);
    }

    tokens
        .iter()
        .map(|token| {
            let token = token.as_ref();
            match token.parse::<u32>() {
                Ok(port) if (1..=u32::from(u16::MAX)).contains(&port) => Ok(port as u16),
                Ok(port) => Err(ScanError::InvalidPort(format!("{} is out of range", port))),
                Err(_) => Err(ScanError::InvalidPort(format!("{} is not a number", token))),
            }
        })
        .collect()
}

/// Turn positional arguments into a scan spec.
///
/// A first token containing `/` is parsed as CIDR and the rest as ports;
/// otherwise the first four tokens are octets and the rest are ports.
pub fn parse_scan_args<S: AsRef<str>>(args: &[S], concurrency: usize) -> crate::Result<ScanSpec> {
    let first = args
        .first()
        .map(|a| a.as_ref())
        .ok_or_else(|| ScanError::NotEnoughArguments("no address range given".to_string()))?;

    let (range, port_tokens) = if first.contains('/') {
        (parse_cidr(first)?, &args[1..])
    } else {
        (parse_octets(args)?, &args[4..])
    };

    ScanSpecBuilder::new()
        .range(range)
        .ports(parse_ports(port_tokens)?)
        .concurrency(concurrency)
        .build()
}

fn parse_byte(token: &str) -> crate::Result<u8> {
    let value: u32 = token
        .parse()
        .map_err(|_| ScanError::InvalidOctet(format!("{} is not a number", token)))?;
    u8::try_from(value).map_err(|_| ScanError::InvalidOctet(format!("{} is greater than 255", value)))
}
