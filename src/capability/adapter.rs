//! Conversion from vendor inventory entries to driver capabilities.

use std::collections::BTreeSet;

use crate::config::{DEFAULT_CONSOLE_LOGS, GridSettings};
use crate::error::CapabilityError;

use super::matrix::PlatformMatrix;
use super::types::{Capability, CapabilityBuilder, PlatformDescriptor};

/// Browsers the harness knows how to drive
pub const SUPPORTED_BROWSERS: [&str; 6] = [
    "Chrome",
    "Safari",
    "Firefox",
    "Edge",
    "Android Browser",
    "Mobile Safari",
];

/// Uppercase the first character, leave the rest untouched
pub fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Map one inventory entry to a base capability (no variant applied)
pub fn adapt_one(
    descriptor: &PlatformDescriptor,
    grid: &GridSettings,
) -> Result<Capability, CapabilityError> {
    CapabilityBuilder::new()
        .os(&descriptor.os, &descriptor.os_version)
        .browser(
            capitalize(&descriptor.browser),
            descriptor.browser_version.clone(),
        )
        .device(descriptor.device.clone())
        .console_logs(DEFAULT_CONSOLE_LOGS)
        .local(grid.local_identifier.clone())
        .project(grid.project_name.clone(), grid.build_name.clone())
        .build()
}

/// Map inventory entries to base capabilities.
///
/// Entries the builder rejects (blank OS or browser) are logged and dropped.
pub fn adapt(descriptors: &[PlatformDescriptor], grid: &GridSettings) -> Vec<Capability> {
    descriptors
        .iter()
        .filter_map(|d| match adapt_one(d, grid) {
            Ok(cap) => Some(cap),
            Err(e) => {
                tracing::warn!(os = %d.os, browser = %d.browser, error = %e, "skipping platform");
                None
            }
        })
        .collect()
}

/// Keep capabilities the harness can run.
///
/// Mobile entries pass the version check unconditionally. Desktop entries
/// need a numeric browser version strictly above the matrix minimum for
/// their browser; a browser without a minimum never passes.
pub fn filter_supported(caps: Vec<Capability>, matrix: &PlatformMatrix) -> Vec<Capability> {
    caps.into_iter()
        .filter(|cap| cap.is_mobile() || meets_min_version(cap, matrix))
        .filter(|cap| is_supported_browser(&cap.browser_name))
        .collect()
}

fn meets_min_version(cap: &Capability, matrix: &PlatformMatrix) -> bool {
    let Some(min) = matrix.min_version(&cap.browser_name) else {
        return false;
    };
    cap.browser_version
        .as_deref()
        .and_then(leading_float)
        .is_some_and(|current| min < current)
}

fn is_supported_browser(name: &str) -> bool {
    SUPPORTED_BROWSERS
        .iter()
        .any(|supported| supported.eq_ignore_ascii_case(name))
}

/// Parse the numeric prefix of a version string ("120.0 beta" -> 120.0)
pub fn leading_float(version: &str) -> Option<f64> {
    let trimmed = version.trim();
    let mut end = 0;
    let mut seen_dot = false;
    for (i, c) in trimmed.char_indices() {
        if c.is_ascii_digit() {
            end = i + 1;
        } else if c == '.' && !seen_dot {
            seen_dot = true;
        } else {
            break;
        }
    }
    trimmed[..end].parse().ok()
}

/// Log prefix identifying a platform.
///
/// `device-orientation-browser-version` for mobile and
/// `os-osVersion-resolution-browser-version` for desktop.
pub fn platform_header(cap: &Capability) -> String {
    let mut parts: Vec<String> = Vec::with_capacity(5);
    match &cap.device {
        Some(device) => {
            parts.push(device.clone());
            parts.push(
                cap.device_orientation
                    .map(|o| o.to_string())
                    .unwrap_or_default(),
            );
        }
        None => {
            parts.push(cap.options.os.clone());
            parts.push(cap.options.os_version.clone());
            parts.push(cap.resolution.clone().unwrap_or_default());
        }
    }
    parts.push(cap.browser_name.clone());
    parts.push(cap.browser_version.clone().unwrap_or_default());
    parts.join("-")
}

/// Distinct `os-browser-device` keys in sorted order
pub fn unique_platforms(descriptors: &[PlatformDescriptor]) -> Vec<String> {
    descriptors
        .iter()
        .map(|d| {
            format!(
                "{}-{}-{}",
                d.os,
                d.browser,
                d.device.as_deref().unwrap_or("desktop")
            )
        })
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
