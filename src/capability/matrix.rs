//! Resolution and minimum-version tables used to expand the capability
//! matrix.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::HarnessResult;

use super::types::{Capability, Orientation, Variant};

/// Per-platform tables driving the expansion of capabilities into sessions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformMatrix {
    /// OS -> OS version -> screen resolutions
    pub operating_systems: BTreeMap<String, BTreeMap<String, Vec<String>>>,
    /// Browser name -> minimum version (exclusive)
    pub min_versions: BTreeMap<String, f64>,
}

impl PlatformMatrix {
    /// Tables matching the grid's current desktop offering
    pub fn builtin() -> Self {
        let windows_legacy = ["1024x768", "1280x1024", "1920x1080"];
        let windows = ["1024x768", "1366x768", "1920x1080"];
        let mac = ["1024x768", "1280x960", "1920x1080"];

        let mut operating_systems = BTreeMap::new();
        operating_systems.insert(
            "Windows".to_string(),
            table(&[
                ("7", &windows_legacy),
                ("8", &windows_legacy),
                ("8.1", &windows),
                ("10", &windows),
                ("11", &windows),
            ]),
        );
        operating_systems.insert(
            "OS X".to_string(),
            table(&[
                ("Catalina", &mac),
                ("Big Sur", &mac),
                ("Monterey", &mac),
                ("Ventura", &mac),
                ("Sonoma", &mac),
            ]),
        );

        let min_versions = [
            ("Chrome", 80.0),
            ("Firefox", 75.0),
            ("Edge", 80.0),
            ("Safari", 13.0),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();

        Self {
            operating_systems,
            min_versions,
        }
    }

    /// Load tables from a JSON file with the same shape as the built-in ones
    pub fn load(path: &Path) -> HarnessResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Minimum version for a browser, matched case-insensitively
    pub fn min_version(&self, browser: &str) -> Option<f64> {
        self.min_versions
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(browser))
            .map(|(_, v)| *v)
    }

    /// Resolutions offered for an OS and version, if the platform is known
    pub fn resolutions(&self, os: &str, os_version: &str) -> Option<&[String]> {
        self.operating_systems
            .get(os)
            .and_then(|versions| versions.get(os_version))
            .map(Vec::as_slice)
    }

    /// Session variants for a base capability.
    ///
    /// Mobile: both orientations. Desktop: one per resolution in the table;
    /// unknown desktop platforms yield nothing.
    pub fn variants(&self, cap: &Capability) -> Vec<Variant> {
        if cap.is_mobile() {
            return Orientation::ALL.into_iter().map(Variant::Orientation).collect();
        }
        match self.resolutions(&cap.options.os, &cap.options.os_version) {
            Some(resolutions) => resolutions.iter().cloned().map(Variant::Resolution).collect(),
            None => {
                tracing::warn!(
                    os = %cap.options.os,
                    os_version = %cap.options.os_version,
                    browser = %cap.browser_name,
                    "no resolution table for platform, skipping"
                );
                Vec::new()
            }
        }
    }
}

impl Default for PlatformMatrix {
    fn default() -> Self {
        Self::builtin()
    }
}

fn table(rows: &[(&str, &[&str; 3])]) -> BTreeMap<String, Vec<String>> {
    rows.iter()
        .map(|(version, resolutions)| {
            (
                version.to_string(),
                resolutions.iter().map(|r| r.to_string()).collect(),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::types::CapabilityBuilder;
    use std::io::Write;

    fn desktop(os: &str, version: &str) -> Capability {
        CapabilityBuilder::new()
            .os(os, version)
            .browser("Chrome", Some("120.0".to_string()))
            .build()
            .unwrap()
    }

    #[test]
    fn test_mobile_variants_are_orientations() {
        let cap = CapabilityBuilder::new()
            .os("android", "13.0")
            .browser("Chrome", None)
            .device(Some("Pixel 7".to_string()))
            .build()
            .unwrap();
        let variants = PlatformMatrix::builtin().variants(&cap);
        assert_eq!(
            variants,
            vec![
                Variant::Orientation(Orientation::Portrait),
                Variant::Orientation(Orientation::Landscape)
            ]
        );
    }

    #[test]
    fn test_desktop_variants_follow_table() {
        let matrix = PlatformMatrix::builtin();
        let variants = matrix.variants(&desktop("Windows", "10"));
        assert_eq!(variants.len(), 3);
        assert!(variants.contains(&Variant::Resolution("1366x768".to_string())));
    }

    #[test]
    fn test_unknown_desktop_platform_has_no_variants() {
        assert!(PlatformMatrix::builtin().variants(&desktop("Windows", "XP")).is_empty());
    }

    #[test]
    fn test_min_version_is_case_insensitive() {
        let matrix = PlatformMatrix::builtin();
        assert_eq!(matrix.min_version("chrome"), Some(80.0));
        assert_eq!(matrix.min_version("Opera"), None);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"operatingSystems": {{"Linux": {{"22.04": ["800x600"]}}}}, "minVersions": {{"Firefox": 90}}}}"#
        )
        .unwrap();
        let matrix = PlatformMatrix::load(file.path()).unwrap();
        assert_eq!(matrix.resolutions("Linux", "22.04"), Some(&["800x600".to_string()][..]));
        assert_eq!(matrix.min_version("firefox"), Some(90.0));
    }
}
