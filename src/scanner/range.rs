//! Address ranges and lazy target enumeration

use crate::ScanError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{Ipv4Addr, SocketAddrV4};

/// Inclusive `[low, high]` bound on one address byte
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OctetRange {
    low: u8,
    high: u8,
}

impl OctetRange {
    /// Every byte value
    pub const FULL: OctetRange = OctetRange { low: 0, high: 255 };

    /// Host byte without the network and broadcast values
    pub const HOSTS: OctetRange = OctetRange { low: 1, high: 254 };

    pub fn new(low: u8, high: u8) -> crate::Result<Self> {
        if low > high {
            return Err(ScanError::InvalidRange(format!("{}-{} is inverted", low, high)));
        }
        Ok(Self { low, high })
    }

    pub fn single(value: u8) -> Self {
        Self { low: value, high: value }
    }

    pub fn low(&self) -> u8 {
        self.low
    }

    pub fn high(&self) -> u8 {
        self.high
    }

    /// Number of byte values covered, 1..=256
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> u16 {
        u16::from(self.high) - u16::from(self.low) + 1
    }

    pub fn contains(&self, value: u8) -> bool {
        self.low <= value && value <= self.high
    }

    pub fn iter(&self) -> impl Iterator<Item = u8> {
        self.low..=self.high
    }
}

impl fmt::Display for OctetRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.low == self.high {
            write!(f, "{}", self.low)
        } else {
            write!(f, "{}-{}", self.low, self.high)
        }
    }
}

/// Four octet ranges; the addresses are their cross product
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AddressRange {
    octets: [OctetRange; 4],
}

impl AddressRange {
    pub fn new(octets: [OctetRange; 4]) -> Self {
        Self { octets }
    }

    pub fn octets(&self) -> &[OctetRange; 4] {
        &self.octets
    }

    /// Number of addresses covered
    pub fn address_count(&self) -> u64 {
        self.octets.iter().map(|o| u64::from(o.len())).product()
    }

    pub fn contains(&self, addr: Ipv4Addr) -> bool {
        self.octets
            .iter()
            .zip(addr.octets())
            .all(|(range, byte)| range.contains(byte))
    }
}

impl fmt::Display for AddressRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d] = &self.octets;
        write!(f, "{}.{}.{}.{}", a, b, c, d)
    }
}

/// One concrete address and port to probe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Target {
    addr: SocketAddrV4,
}

impl Target {
    pub fn new(octets: [u8; 4], port: u16) -> Self {
        Self {
            addr: SocketAddrV4::new(Ipv4Addr::from(octets), port),
        }
    }

    pub fn socket_addr(&self) -> SocketAddrV4 {
        self.addr
    }

    pub fn ip(&self) -> Ipv4Addr {
        *self.addr.ip()
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.addr)
    }
}

/// Lazy enumeration of every target of an address range and port list.
///
/// Iterates byte0, byte1, byte2, byte3 and then the ports, outermost first.
/// Nothing is materialized beyond the current position.
#[derive(Debug, Clone)]
pub struct TargetIter<'a> {
    octets: [OctetRange; 4],
    ports: &'a [u16],
    current: [u8; 4],
    port_index: usize,
    remaining: u64,
}

impl<'a> TargetIter<'a> {
    pub fn new(range: &AddressRange, ports: &'a [u16]) -> Self {
        let octets = *range.octets();
        let current = [octets[0].low, octets[1].low, octets[2].low, octets[3].low];
        Self {
            octets,
            ports,
            current,
            port_index: 0,
            remaining: range.address_count() * ports.len() as u64,
        }
    }

    /// Targets not yet yielded
    pub fn remaining(&self) -> u64 {
        self.remaining
    }

    // Odometer step over the address bytes, innermost byte first.
    fn advance_address(&mut self) {
        for i in (0..4).rev() {
            if self.current[i] < self.octets[i].high {
                self.current[i] += 1;
                return;
            }
            self.current[i] = self.octets[i].low;
        }
    }
}

impl Iterator for TargetIter<'_> {
    type Item = Target;

    fn next(&mut self) -> Option<Target> {
        if self.remaining == 0 {
            return None;
        }

        let target = Target::new(self.current, self.ports[self.port_index]);
        self.remaining -= 1;

        self.port_index += 1;
        if self.port_index == self.ports.len() {
            self.port_index = 0;
            self.advance_address();
        }

        Some(target)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match usize::try_from(self.remaining) {
            Ok(n) => (n, Some(n)),
            Err(_) => (usize::MAX, None),
        }
    }
}
