// Build-time version from Cargo.toml, logged at startup by both binaries

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub const NAME: &str = env!("CARGO_PKG_NAME");

/// `name/version`, used as the startup banner.
pub fn banner() -> String {
    format!("{}/{}", NAME, VERSION)
}
