//! brats-lib: acceptance-test harness for Cloud Foundry buildpacks.
//!
//! The library resolves which dependency versions a buildpack ships, renders
//! a minimal fixture app per version, packages and registers the buildpack,
//! pushes each fixture and checks what the platform and the app report:
//! - `manifest`: dependency manifests and their remote resolution
//! - `fixture`: template rendering, version descriptors, PHP extension table
//! - `deploy`: buildpack packaging and application lifecycle
//! - `observe`: HTTP visits and capture-log assertions
//! - `scenario`: per-runtime suites tying the above together

pub mod config;
pub mod consts;
pub mod deploy;
pub mod exec;
pub mod fixture;
pub mod manifest;
pub mod observe;
pub mod placeholder;
pub mod scenario;
pub mod util;
pub mod version;
