//! Core types: ports and job sets, scan handles, and resolved targets.

mod port;
mod scan_id;
mod target;

pub use port::{build_port_set, Port, PortError, PortRange, PortSpec, COMMON_PORTS, DEEP_SCAN_MAX};
pub use scan_id::ScanId;
pub use target::{
    classify, normalize, resolve, resolve_with, AddressFamily, AddressKind, DnsLookup, HostLookup,
    ScanTarget,
};
