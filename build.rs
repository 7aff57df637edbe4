//! Linker setup for the firmware images.
//!
//! Host builds (tests, docs) don't link against the Cortex-M runtime, so the
//! linker scripts are only passed when the `board` feature is enabled.

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    if std::env::var_os("CARGO_FEATURE_BOARD").is_none() {
        return;
    }

    println!("cargo:rustc-link-arg-bins=--nmagic");
    println!("cargo:rustc-link-arg-bins=-Tlink.x");
    println!("cargo:rustc-link-arg-bins=-Tdefmt.x");
}
