//! Protocol and firmware versions
//!
//! Each version pairs what this host speaks (client) with what the board
//! reported (server).

use serde::{Deserialize, Serialize};

use crate::protocol::constants::{
    FIRMWARE_BUGFIX_VERSION, FIRMWARE_MAJOR_VERSION, FIRMWARE_MINOR_VERSION,
    PROTOCOL_BUGFIX_VERSION, PROTOCOL_MAJOR_VERSION, PROTOCOL_MINOR_VERSION,
};

/// How far apart client and server are
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Compatibility {
    /// Major versions differ
    Incompatible,
    /// Same major, different minor
    Compatible,
    /// Same major and minor
    Identical,
}

/// One side of a version pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerVersion {
    pub major: u8,
    pub minor: u8,
    /// Boards never report a bugfix number
    pub bugfix: Option<u8>,
    pub name: String,
}

impl PeerVersion {
    pub fn new(major: u8, minor: u8, bugfix: Option<u8>, name: impl Into<String>) -> Self {
        Self {
            major,
            minor,
            bugfix,
            name: name.into(),
        }
    }
}

/// Client/server version pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Version {
    pub client: PeerVersion,
    pub server: PeerVersion,
    pub compatibility: Compatibility,
}

impl Version {
    pub fn new(client: PeerVersion, server: PeerVersion) -> Self {
        let compatibility = if client.major != server.major {
            Compatibility::Incompatible
        } else if client.minor != server.minor {
            Compatibility::Compatible
        } else {
            Compatibility::Identical
        };
        Self {
            client,
            server,
            compatibility,
        }
    }

    /// Version pair for a REPORT_VERSION reply
    pub fn protocol(major: u8, minor: u8) -> Self {
        Self::new(
            PeerVersion::new(
                PROTOCOL_MAJOR_VERSION,
                PROTOCOL_MINOR_VERSION,
                Some(PROTOCOL_BUGFIX_VERSION),
                format!(
                    "v{}.{}.{}",
                    PROTOCOL_MAJOR_VERSION, PROTOCOL_MINOR_VERSION, PROTOCOL_BUGFIX_VERSION
                ),
            ),
            PeerVersion::new(major, minor, None, format!("v{}.{}", major, minor)),
        )
    }

    /// Version pair for a REPORT_FIRMWARE reply; the server side carries the
    /// firmware name
    pub fn firmware(major: u8, minor: u8, name: impl Into<String>) -> Self {
        Self::new(
            PeerVersion::new(
                FIRMWARE_MAJOR_VERSION,
                FIRMWARE_MINOR_VERSION,
                Some(FIRMWARE_BUGFIX_VERSION),
                format!(
                    "v{}.{}.{}",
                    FIRMWARE_MAJOR_VERSION, FIRMWARE_MINOR_VERSION, FIRMWARE_BUGFIX_VERSION
                ),
            ),
            PeerVersion::new(major, minor, None, name),
        )
    }
}
