//! Version Tests

use firmata::board::{Compatibility, PeerVersion};
use firmata::Version;

#[test]
fn test_protocol_version_names() {
    let version = Version::protocol(2, 5);
    assert_eq!(version.client.name, "v2.6.0");
    assert_eq!(version.client.bugfix, Some(0));
    assert_eq!(version.server.name, "v2.5");
    assert_eq!(version.server.bugfix, None);
}

#[test]
fn test_firmware_version_carries_name() {
    let version = Version::firmware(2, 3, "StandardFirmata.ino");
    assert_eq!(version.server.name, "StandardFirmata.ino");
    assert_eq!(version.client.major, 2);
    assert_eq!(version.client.minor, 11);
}

#[test]
fn test_compatibility() {
    assert_eq!(Version::protocol(2, 6).compatibility, Compatibility::Identical);
    assert_eq!(Version::protocol(2, 3).compatibility, Compatibility::Compatible);
    assert_eq!(Version::protocol(3, 6).compatibility, Compatibility::Incompatible);
}

#[test]
fn test_compatibility_ignores_bugfix() {
    let version = Version::new(
        PeerVersion::new(1, 4, Some(2), "client"),
        PeerVersion::new(1, 4, Some(7), "server"),
    );
    assert_eq!(version.compatibility, Compatibility::Identical);
}
