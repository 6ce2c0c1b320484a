//! ovfkit Core Library
//!
//! This crate reads the OVF descriptor of an extracted OVA appliance and turns
//! it into typed records: disks, networks, deployment options, product
//! properties and license agreements.
//!
//! # Overview
//!
//! An OVA is a tar archive holding an `.ovf` XML descriptor plus the disk
//! images it references. Once unpacked, [`OvfReader::inspect`] loads the
//! descriptor once and runs every extractor over it. The extractors are also
//! usable on their own over a parsed [`xml::Document`].
//!
//! # Modules
//!
//! - [`error`] - Error types and Result alias
//! - [`xml`] - XML document tree with namespace-tolerant lookups
//! - [`units`] - Capacity unit conversion
//! - [`storage`] - Filesystem seam
//! - [`compress`] - License payload compression
//! - [`disk`] - Disk discovery, controller resolution and reconciliation
//! - [`network`] - Network prerequisites
//! - [`hardware`] - Virtual hardware and deployment options
//! - [`property`] - Product section properties
//! - [`eula`] - License agreements
//! - [`rewrite`] - Single-disk descriptor rewriting
//! - [`appliance`] - Reader tying the above together
//!
//! # Quick Start
//!
//! ```no_run
//! use ovfkit_core::{InspectOptions, OvfReader};
//! use std::path::Path;
//!
//! let reader = OvfReader::new();
//! let info = reader
//!     .inspect(Path::new("/path/to/extracted/appliance"), &InspectOptions::default())
//!     .unwrap();
//!
//! for disk in &info.disks {
//!     println!("{} ({} bytes)", disk.path.display(), disk.virtual_size);
//! }
//! ```

pub mod appliance;
pub mod compress;
pub mod disk;
pub mod error;
pub mod eula;
pub mod hardware;
pub mod network;
pub mod property;
pub mod rewrite;
pub mod storage;
pub mod units;
pub mod xml;

pub use error::{Error, Result};

pub use appliance::{disk_details, template_virtual_size, ApplianceInfo, InspectOptions, OvfReader};
pub use compress::{CompressionLevel, Compressor, GzipCompressor};
pub use disk::{extract_disks, DiskDescriptor};
pub use eula::{extract_eula_sections, EulaSection};
pub use hardware::{
    extract_virtual_hardware, DeploymentConfiguration, HardwareItem, ResourceType, VirtualHardware,
};
pub use network::{extract_network_prerequisites, NetworkPrerequisite};
pub use property::{extract_configurable_properties, extract_properties, OvfProperty};
pub use storage::{LocalStorage, Storage};
pub use units::disk_capacity_bytes;
pub use xml::Document;
