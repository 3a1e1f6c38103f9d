//! Utility modules for the scanner

pub mod target_parser;

pub use target_parser::{parse_cidr, parse_octets, parse_ports, parse_scan_args};

/// Raise the open-file limit to `limit` if given, and return the soft limit
/// in effect afterwards.
#[cfg(unix)]
pub fn adjust_ulimit_size(limit: Option<u64>) -> Option<u64> {
    use rlimit::Resource;

    if let Some(limit) = limit {
        match Resource::NOFILE.set(limit, limit) {
            Ok(()) => log::info!("Raised open file limit to {}", limit),
            Err(e) => log::warn!("Failed to set open file limit to {}: {}", limit, e),
        }
    }

    match Resource::NOFILE.get() {
        Ok((soft, _)) => Some(soft),
        Err(e) => {
            log::warn!("Could not read open file limit: {}", e);
            None
        }
    }
}

#[cfg(not(unix))]
pub fn adjust_ulimit_size(_limit: Option<u64>) -> Option<u64> {
    None
}
