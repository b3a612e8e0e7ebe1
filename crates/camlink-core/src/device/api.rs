//! Wire types for the vendor camera control API.
//!
//! All endpoints speak JSON except the binary artifact download. The
//! listing response keeps the vendor's quirk of calling its array `url`.

use serde::{Deserialize, Serialize};

/// Device identity returned by the info endpoint; used as the
/// connectivity probe. A response that fails to parse into this shape
/// means the candidate is not a camera.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub name: String,
    pub serial: String,
    #[serde(default)]
    pub mac: Option<String>,
    #[serde(default)]
    pub firmware: Option<String>,
    /// Battery percentage, when the device reports it.
    #[serde(default)]
    pub battery: Option<u8>,
}

/// One remote file known to the device.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactDescriptor {
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub size: Option<u64>,
}

/// Listing endpoint payload: `{"url": [descriptor, ...]}`.
#[derive(Debug, Clone, Deserialize)]
pub struct ListingResponse {
    pub url: Vec<ArtifactDescriptor>,
}
