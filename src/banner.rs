//! Startup banner for the `protogen` CLI (SPEC_FULL.md §11).
//!
//! Grounded on `examples/appujet-baja/src/common/banner.rs`: an ASCII-art
//! banner plus a small build-info block sourced from `build.rs`'s
//! `cargo:rustc-env` vars, reskinned for this crate and trimmed of the
//! teacher's Discord-bot-specific framing.

/// Build metadata embedded by `build.rs`.
pub struct BuildInfo {
    pub version: &'static str,
    pub git_branch: &'static str,
    pub git_commit: &'static str,
    pub build_time: &'static str,
}

impl BuildInfo {
    pub fn current() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION"),
            git_branch: env!("GIT_BRANCH"),
            git_commit: env!("GIT_COMMIT"),
            build_time: env!("BUILD_TIME"),
        }
    }
}

const BANNER: &str = r#"
  ____  _         _
 |  _ \| |__  ___| |_ _ __ ___  __ _ _ __ ___
 | |_) | '_ \/ __| __| '__/ _ \/ _` | '_ ` _ \
 |  __/| |_) \__ \ |_| | |  __/ (_| | | | | | |
 |_|   |_.__/|___/\__|_|  \___|\__,_|_| |_| |_|
"#;

/// Prints the banner and build info to stdout. Called once by the
/// `protogen` binary before it does anything else.
pub fn print() {
    let info = BuildInfo::current();
    println!("{BANNER}");
    println!(
        "  version {} ({}@{}, built {})",
        info.version, info.git_branch, info.git_commit, info.build_time
    );
    println!();
}
