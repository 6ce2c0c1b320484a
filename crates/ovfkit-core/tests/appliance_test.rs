//! Integration tests over a complete extracted ASAv appliance.

use std::fs;
use std::path::{Path, PathBuf};

use ovfkit_core::hardware::extract_hardware_items;
use ovfkit_core::{
    disk_details, extract_configurable_properties, extract_network_prerequisites,
    extract_virtual_hardware, Document, Error, InspectOptions, OvfReader, ResourceType,
};
use tempfile::TempDir;

const GIB: u64 = 1024 * 1024 * 1024;

fn fixture_path() -> &'static Path {
    Path::new(concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/asav.ovf"))
}

/// An extracted appliance: the descriptor plus dummy images.
fn extracted_appliance() -> TempDir {
    let dir = TempDir::new().expect("Failed to create temp dir");
    fs::copy(fixture_path(), dir.path().join("asav.ovf")).expect("Failed to copy fixture");
    fs::write(dir.path().join("asav-day0.iso"), vec![0u8; 2048]).unwrap();
    fs::write(dir.path().join("asav-disk1.vmdk"), vec![0u8; 4096]).unwrap();
    fs::write(dir.path().join("asav-disk2.vmdk"), vec![0u8; 1024]).unwrap();
    dir
}

fn load_fixture() -> Document {
    let xml = fs::read_to_string(fixture_path()).expect("Failed to read fixture");
    Document::parse_str(&xml).expect("Failed to parse fixture")
}

#[test]
fn test_inspect_disks() {
    let dir = extracted_appliance();
    let info = OvfReader::new()
        .inspect(dir.path(), &InspectOptions::default())
        .expect("Failed to inspect appliance");

    assert_eq!(info.ovf_path, dir.path().join("asav.ovf"));
    assert_eq!(info.disks.len(), 3);

    // leading ISO moved to the end, disk numbers keep file order
    let numbers: Vec<_> = info.disks.iter().map(|d| d.disk_number).collect();
    assert_eq!(numbers, vec![1, 2, 0]);

    let boot = &info.disks[0];
    assert_eq!(boot.path, dir.path().join("asav-disk1.vmdk"));
    assert!(boot.is_bootable);
    assert_eq!(boot.virtual_size, 8 * GIB);
    assert_eq!(boot.file_size, 174080512);
    assert_eq!(boot.controller, "SCSI controller 0");
    assert_eq!(boot.controller_sub_type, "lsilogic");

    let data = &info.disks[1];
    assert!(!data.is_bootable);
    assert_eq!(data.virtual_size, 16 * GIB);
    // no declared size: measured on disk
    assert_eq!(data.file_size, 1024);

    let iso = &info.disks[2];
    assert!(iso.is_iso);
    assert_eq!(iso.file_id, "file3");
    assert_eq!(iso.virtual_size, 358400);
    assert_eq!(iso.controller, "");

    assert_eq!(info.virtual_size, 24 * GIB);
}

#[test]
fn test_inspect_networks_properties_and_eulas() {
    let dir = extracted_appliance();
    let reader = OvfReader::new();
    let info = reader
        .inspect(&dir.path().join("asav.ovf"), &InspectOptions::default())
        .expect("Failed to inspect appliance");

    assert_eq!(info.networks.len(), 10);
    let mgmt = &info.networks[0];
    assert_eq!(mgmt.name, "Management0-0");
    assert_eq!(mgmt.network_description.as_deref(), Some("Management network"));
    assert_eq!(mgmt.address_on_parent, Some(7));
    assert_eq!(mgmt.instance_id, Some(6));
    let last = &info.networks[9];
    assert_eq!(last.name, "GigabitEthernet0-8");
    assert_eq!(last.element_name.as_deref(), Some("Network adapter 10"));
    assert_eq!(last.address_on_parent, Some(16));

    assert_eq!(info.properties.len(), 2);
    assert_eq!(info.properties[0].key, "va-ssh-public-key");

    assert_eq!(info.eulas.len(), 2);
    let text = info.eulas[0].license_text(reader.compressor()).unwrap();
    assert!(text.starts_with("END USER LICENSE AGREEMENT"));
    assert!(text.contains("\u{a9} 1998"));
}

#[test]
fn test_virtual_hardware_fixture() {
    let doc = load_fixture();
    assert_eq!(extract_hardware_items(&doc).len(), 20);

    let hardware = extract_virtual_hardware(&doc);
    let ids: Vec<_> = hardware.configurations.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, vec!["ASAv5", "ASAv10", "ASAv30"]);
    for configuration in &hardware.configurations {
        assert_eq!(configuration.hardware_items.len(), 2, "{}", configuration.id);
    }

    let asav30 = &hardware.configurations[2];
    assert_eq!(asav30.label.as_deref(), Some("2 Gbps (ASAv30)"));
    let cpu = &asav30.hardware_items[0];
    assert_eq!(cpu.resource_type, Some(ResourceType::Processor));
    assert_eq!(cpu.virtual_quantity, Some(4));
    assert_eq!(cpu.limit, Some(20000));

    assert_eq!(hardware.common_items.len(), 16);
}

#[test]
fn test_configurable_properties_fixture() {
    let doc = load_fixture();
    let props = extract_configurable_properties(&doc);
    let keys: Vec<_> = props.iter().map(|p| p.key.as_str()).collect();
    assert_eq!(keys, vec!["va-ssh-public-key", "user-data"]);
}

#[test]
fn test_extract_disks_is_idempotent() {
    let dir = extracted_appliance();
    let reader = OvfReader::new();
    let doc = reader.parse_file(&dir.path().join("asav.ovf")).unwrap();

    let first = reader.extract_disks(dir.path(), &doc).unwrap();
    let second = reader.extract_disks(dir.path(), &doc).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_missing_image_fails_whole_extraction() {
    let dir = extracted_appliance();
    fs::remove_file(dir.path().join("asav-disk2.vmdk")).unwrap();

    let err = OvfReader::new()
        .inspect(dir.path(), &InspectOptions::default())
        .unwrap_err();
    assert!(matches!(err, Error::Ovf { .. }));
    assert!(err.to_string().contains("asav-disk2.vmdk"));
}

#[test]
fn test_trailing_garbage_is_parse_error() {
    let xml = fs::read_to_string(fixture_path()).unwrap() + "xxxxxxxxxxxxxxxxx";
    let err = Document::parse_str(&xml).unwrap_err();
    assert!(matches!(err, Error::Xml { .. }));
}

#[test]
fn test_disk_details_fixture() {
    let doc = load_fixture();
    let ovf = fixture_path();
    assert_eq!(
        disk_details(&doc, ovf, "asav-disk1.vmdk").unwrap(),
        (8 * GIB, 174080512)
    );
    // the ISO has a file but no disk
    assert_eq!(disk_details(&doc, ovf, "asav-day0.iso").unwrap(), (0, 358400));
    // declared without a size
    assert!(disk_details(&doc, ovf, "asav-disk2.vmdk").is_err());
}

#[test]
fn test_rewrite_keeps_second_disk() {
    let dir = extracted_appliance();
    let reader = OvfReader::new();
    let dest = dir.path().join("single").join("asav-disk2.ovf");
    fs::create_dir(dest.parent().unwrap()).unwrap();
    fs::copy(dir.path().join("asav-disk2.vmdk"), dir.path().join("single/asav-disk2.vmdk")).unwrap();

    reader
        .rewrite_for_single_disk(dir.path(), &dest, "asav-disk2.vmdk")
        .expect("Failed to rewrite");

    let doc = reader.parse_file(&dest).unwrap();
    assert_eq!(doc.elements_by_name("File").len(), 1);
    assert_eq!(doc.elements_by_name("Disk").len(), 1);
    // Hard disk 1 and the CD-ROM backed by the ISO are gone
    assert_eq!(doc.elements_by_name("Item").len(), 18);
    assert_eq!(extract_network_prerequisites(&doc).unwrap().len(), 10);

    let disks = reader.extract_disks(dest.parent().unwrap(), &doc).unwrap();
    assert_eq!(disks.len(), 1);
    assert!(disks[0].is_bootable);
    assert_eq!(disks[0].virtual_size, 16 * GIB);
    assert_eq!(disks[0].controller, "SCSI controller 0");
}

#[test]
fn test_rewrite_unknown_disk() {
    let dir = extracted_appliance();
    let dest: PathBuf = dir.path().join("out.ovf");
    let err = OvfReader::new()
        .rewrite_for_single_disk(&dir.path().join("asav.ovf"), &dest, "asav-disk3.vmdk")
        .unwrap_err();
    assert!(err.to_string().contains("asav-disk3.vmdk"));
    assert!(!dest.exists());
}
