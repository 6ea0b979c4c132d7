pub mod adapter;
pub mod inventory;
pub mod matrix;
pub mod types;

pub use adapter::{SUPPORTED_BROWSERS, adapt, adapt_one, capitalize, filter_supported, platform_header, unique_platforms};
pub use inventory::{CapabilitySource, RemoteInventory, StaticInventory};
pub use matrix::PlatformMatrix;
pub use types::{Capability, CapabilityBuilder, Orientation, PlatformDescriptor, VENDOR_OPTIONS_KEY, Variant, VendorOptions};
