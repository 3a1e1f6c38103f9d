//! The validated description of a scan and its builder

use super::range::{AddressRange, TargetIter};
use crate::ScanError;
use tokio::sync::Semaphore;

/// Port scanned when the caller names none
pub const DEFAULT_PORT: u16 = 80;

/// Address range, ports and concurrency limit of one scan.
///
/// Only [`ScanSpecBuilder::build`] creates one, so every `ScanSpec` in
/// existence has passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanSpec {
    range: AddressRange,
    ports: Vec<u16>,
    concurrency: usize,
}

impl ScanSpec {
    pub fn builder() -> ScanSpecBuilder {
        ScanSpecBuilder::default()
    }

    pub fn range(&self) -> &AddressRange {
        &self.range
    }

    pub fn ports(&self) -> &[u16] {
        &self.ports
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Number of probe results a complete scan produces
    pub fn expected_count(&self) -> u64 {
        self.range.address_count() * self.ports.len() as u64
    }

    pub fn targets(&self) -> TargetIter<'_> {
        TargetIter::new(&self.range, &self.ports)
    }
}

/// Accumulates validated pieces of a [`ScanSpec`]
#[derive(Debug, Clone, Default)]
pub struct ScanSpecBuilder {
    range: Option<AddressRange>,
    ports: Vec<u16>,
    concurrency: Option<usize>,
}

impl ScanSpecBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn range(mut self, range: AddressRange) -> Self {
        self.range = Some(range);
        self
    }

    /// Append one port; order and duplicates are kept
    pub fn port(mut self, port: u16) -> Self {
        self.ports.push(port);
        self
    }

    pub fn ports<I: IntoIterator<Item = u16>>(mut self, ports: I) -> Self {
        self.ports.extend(ports);
        self
    }

    pub fn concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = Some(concurrency);
        self
    }

    /// Finish the spec. Without ports the scan targets port 80 only.
    pub fn build(self) -> crate::Result<ScanSpec> {
        let range = self
            .range
            .ok_or_else(|| ScanError::NotEnoughArguments("no address range given".to_string()))?;

        if self.ports.contains(&0) {
            return Err(ScanError::InvalidPort("port 0 cannot be scanned".to_string()));
        }

        let concurrency = self.concurrency.unwrap_or(crate::config::ScanConfig::default().threads);
        if concurrency == 0 || concurrency > Semaphore::MAX_PERMITS {
            return Err(ScanError::ConfigError(format!(
                "concurrency must be between 1 and {}, got {}",
                Semaphore::MAX_PERMITS,
                concurrency
            )));
        }

        let ports = if self.ports.is_empty() {
            vec![DEFAULT_PORT]
        } else {
            self.ports
        };

        Ok(ScanSpec {
            range,
            ports,
            concurrency,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::range::OctetRange;

    fn local_range() -> AddressRange {
        AddressRange::new([
            OctetRange::single(127),
            OctetRange::single(0),
            OctetRange::single(0),
            OctetRange::new(1, 4).unwrap(),
        ])
    }

    #[test]
    fn test_build_defaults_port_80() {
        let spec = ScanSpec::builder().range(local_range()).build().unwrap();
        assert_eq!(spec.ports(), &[80]);
        assert_eq!(spec.concurrency(), 512);
        assert_eq!(spec.expected_count(), 4);
    }

    #[test]
    fn test_build_keeps_port_order_and_duplicates() {
        let spec = ScanSpec::builder()
            .range(local_range())
            .ports([8080, 80])
            .port(8080)
            .concurrency(3)
            .build()
            .unwrap();
        assert_eq!(spec.ports(), &[8080, 80, 8080]);
        assert_eq!(spec.expected_count(), 12);
        assert_eq!(spec.targets().count(), 12);
    }

    #[test]
    fn test_build_without_range_fails() {
        let err = ScanSpec::builder().port(80).build().unwrap_err();
        assert!(matches!(err, ScanError::NotEnoughArguments(_)));
    }

    #[test]
    fn test_build_rejects_zero_concurrency_and_port() {
        assert!(ScanSpec::builder().range(local_range()).concurrency(0).build().is_err());
        assert!(ScanSpec::builder().range(local_range()).port(0).build().is_err());
    }

    #[test]
    fn test_expected_count_of_full_space_does_not_overflow() {
        let spec = ScanSpec::builder()
            .range(AddressRange::new([OctetRange::FULL; 4]))
            .ports([80, 443])
            .build()
            .unwrap();
        assert_eq!(spec.expected_count(), 2 * (1u64 << 32));
    }
}
