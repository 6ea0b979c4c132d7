use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::CapabilityError;

/// Key the grid vendor expects its options under
pub const VENDOR_OPTIONS_KEY: &str = "bstack:options";

/// A platform as listed by the vendor inventory.
///
/// Desktop entries have no `device`; mobile entries usually have no
/// `browser_version`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformDescriptor {
    pub os: String,
    pub os_version: String,
    pub browser: String,
    #[serde(default)]
    pub browser_version: Option<String>,
    #[serde(default)]
    pub device: Option<String>,
    #[serde(default)]
    pub real_mobile: Option<bool>,
}

impl PlatformDescriptor {
    pub fn is_mobile(&self) -> bool {
        self.device.is_some()
    }
}

/// Screen orientation for mobile sessions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    Portrait,
    Landscape,
}

impl Orientation {
    pub const ALL: [Orientation; 2] = [Orientation::Portrait, Orientation::Landscape];

    pub fn as_str(&self) -> &'static str {
        match self {
            Orientation::Portrait => "portrait",
            Orientation::Landscape => "landscape",
        }
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Vendor specific session options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VendorOptions {
    pub os: String,
    pub os_version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub console_logs: Option<String>,
    #[serde(default)]
    pub local: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_identifier: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build_name: Option<String>,
}

/// Session capabilities in the shape the remote driver expects.
///
/// Only [`CapabilityBuilder`] constructs these, so a mobile capability
/// never carries a resolution and a desktop one never carries an
/// orientation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Capability {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device: Option<String>,
    pub browser_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub browser_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_orientation: Option<Orientation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolution: Option<String>,
    #[serde(rename = "bstack:options")]
    pub options: VendorOptions,
}

impl Capability {
    pub fn is_mobile(&self) -> bool {
        self.device.is_some()
    }

    /// Apply a matrix variant, producing the capability a session is opened with
    pub fn with_variant(&self, variant: &Variant) -> Result<Capability, CapabilityError> {
        let mut builder = CapabilityBuilder::from_capability(self);
        match variant {
            Variant::Orientation(o) => builder = builder.orientation(*o),
            Variant::Resolution(r) => builder = builder.resolution(r.clone()),
        }
        builder.build()
    }
}

/// A per-session override layered on top of a base capability
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Variant {
    Orientation(Orientation),
    Resolution(String),
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Variant::Orientation(o) => write!(f, "{}", o),
            Variant::Resolution(r) => f.write_str(r),
        }
    }
}

/// Typed builder for [`Capability`].
///
/// `build()` rejects combinations the grid would either refuse or
/// silently ignore.
#[derive(Debug, Clone, Default)]
pub struct CapabilityBuilder {
    os: Option<(String, String)>,
    browser: Option<(String, Option<String>)>,
    device: Option<String>,
    orientation: Option<Orientation>,
    resolution: Option<String>,
    console_logs: Option<String>,
    local: bool,
    local_identifier: Option<String>,
    project_name: Option<String>,
    build_name: Option<String>,
}

impl CapabilityBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing capability, keeping every field
    pub fn from_capability(cap: &Capability) -> Self {
        Self {
            os: Some((cap.options.os.clone(), cap.options.os_version.clone())),
            browser: Some((cap.browser_name.clone(), cap.browser_version.clone())),
            device: cap.device.clone(),
            orientation: cap.device_orientation,
            resolution: cap.resolution.clone(),
            console_logs: cap.options.console_logs.clone(),
            local: cap.options.local,
            local_identifier: cap.options.local_identifier.clone(),
            project_name: cap.options.project_name.clone(),
            build_name: cap.options.build_name.clone(),
        }
    }

    pub fn os(mut self, os: impl Into<String>, version: impl Into<String>) -> Self {
        self.os = Some((os.into(), version.into()));
        self
    }

    pub fn browser(mut self, name: impl Into<String>, version: Option<String>) -> Self {
        self.browser = Some((name.into(), version));
        self
    }

    pub fn device(mut self, device: Option<String>) -> Self {
        self.device = device;
        self
    }

    pub fn orientation(mut self, orientation: Orientation) -> Self {
        self.orientation = Some(orientation);
        self
    }

    pub fn resolution(mut self, resolution: impl Into<String>) -> Self {
        self.resolution = Some(resolution.into());
        self
    }

    pub fn console_logs(mut self, level: impl Into<String>) -> Self {
        self.console_logs = Some(level.into());
        self
    }

    pub fn local(mut self, identifier: Option<String>) -> Self {
        self.local = true;
        self.local_identifier = identifier;
        self
    }

    pub fn project(mut self, project: Option<String>, build: Option<String>) -> Self {
        self.project_name = project;
        self.build_name = build;
        self
    }

    pub fn build(self) -> Result<Capability, CapabilityError> {
        let (os, os_version) = self.os.ok_or(CapabilityError::Missing("os"))?;
        if os.trim().is_empty() {
            return Err(CapabilityError::Missing("os"));
        }
        let (browser_name, browser_version) =
            self.browser.ok_or(CapabilityError::Missing("browserName"))?;
        if browser_name.trim().is_empty() {
            return Err(CapabilityError::Missing("browserName"));
        }
        if self.orientation.is_some() && self.resolution.is_some() {
            return Err(CapabilityError::OrientationAndResolution);
        }
        if self.orientation.is_some() && self.device.is_none() {
            return Err(CapabilityError::OrientationWithoutDevice);
        }
        if self.resolution.is_some() && self.device.is_some() {
            return Err(CapabilityError::ResolutionOnDevice);
        }

        Ok(Capability {
            device: self.device,
            browser_name,
            browser_version,
            device_orientation: self.orientation,
            resolution: self.resolution,
            options: VendorOptions {
                os,
                os_version,
                console_logs: self.console_logs,
                local: self.local,
                local_identifier: self.local_identifier,
                project_name: self.project_name,
                build_name: self.build_name,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn desktop() -> CapabilityBuilder {
        CapabilityBuilder::new()
            .os("Windows", "10")
            .browser("Chrome", Some("120.0".to_string()))
    }

    #[test]
    fn test_builder_rejects_orientation_without_device() {
        let err = desktop().orientation(Orientation::Portrait).build().unwrap_err();
        assert_eq!(err, CapabilityError::OrientationWithoutDevice);
    }

    #[test]
    fn test_builder_rejects_resolution_on_device() {
        let err = CapabilityBuilder::new()
            .os("ios", "16")
            .browser("Safari", None)
            .device(Some("iPhone 14".to_string()))
            .resolution("1024x768")
            .build()
            .unwrap_err();
        assert_eq!(err, CapabilityError::ResolutionOnDevice);
    }

    #[test]
    fn test_builder_requires_browser() {
        let err = CapabilityBuilder::new().os("Windows", "11").build().unwrap_err();
        assert_eq!(err, CapabilityError::Missing("browserName"));
    }

    #[test]
    fn test_capability_serializes_in_driver_shape() {
        let cap = desktop()
            .resolution("1920x1080")
            .console_logs("errors")
            .local(Some("tunnel-1".to_string()))
            .build()
            .unwrap();
        let json = serde_json::to_value(&cap).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "browserName": "Chrome",
                "browserVersion": "120.0",
                "resolution": "1920x1080",
                "bstack:options": {
                    "os": "Windows",
                    "osVersion": "10",
                    "consoleLogs": "errors",
                    "local": true,
                    "localIdentifier": "tunnel-1"
                }
            })
        );
    }

    #[test]
    fn test_with_variant_applies_orientation() {
        let base = CapabilityBuilder::new()
            .os("android", "13.0")
            .browser("Chrome", None)
            .device(Some("Pixel 7".to_string()))
            .build()
            .unwrap();
        let cap = base
            .with_variant(&Variant::Orientation(Orientation::Landscape))
            .unwrap();
        assert_eq!(cap.device_orientation, Some(Orientation::Landscape));
        assert_eq!(cap.resolution, None);
    }
}
