//! Build version information.
//!
//! Values other than the package version are read from the environment at
//! compile time, so a build script or CI job can stamp them.

use std::fmt;

/// Version details of the running binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionInfo {
    pub version: &'static str,
    pub build_time: &'static str,
    pub git_hash: &'static str,
    pub rustc_version: &'static str,
}

impl VersionInfo {
    pub const fn current() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION"),
            build_time: match option_env!("STAGEHAND_BUILD_TIME") {
                Some(v) => v,
                None => "unknown-buildtime",
            },
            git_hash: match option_env!("STAGEHAND_GIT_HASH") {
                Some(v) => v,
                None => "unknown-githash",
            },
            rustc_version: match option_env!("STAGEHAND_RUSTC_VERSION") {
                Some(v) => v,
                None => "unknown-rustcversion",
            },
        }
    }

    /// Render the version block for application `name`.
    pub fn render(&self, name: &str) -> String {
        format!("\nApp: {name}\n{self}")
    }
}

impl fmt::Display for VersionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "  Version:      {}", self.version)?;
        writeln!(f, "  Build time:   {}", self.build_time)?;
        writeln!(f, "  GitHash:      {}", self.git_hash)?;
        writeln!(f, "  Rust version: {}", self.rustc_version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_block() {
        let info = VersionInfo {
            version: "1.2.3",
            build_time: "now",
            git_hash: "abc",
            rustc_version: "1.80",
        };
        assert_eq!(
            info.render("demo"),
            "\nApp: demo\n  Version:      1.2.3\n  Build time:   now\n  GitHash:      abc\n  Rust version: 1.80\n"
        );
    }

    #[test]
    fn test_current_uses_package_version() {
        assert_eq!(VersionInfo::current().version, env!("CARGO_PKG_VERSION"));
    }
}
