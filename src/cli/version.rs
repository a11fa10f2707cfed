//! Version command for the chatwire CLI.

/// The current version of chatwire, read from Cargo.toml at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// `chatwire <version>`
pub fn version_line() -> String {
    format!("chatwire {}", VERSION)
}
