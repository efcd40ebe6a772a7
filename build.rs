//! Build script for generating WGSL constants from the Rust radix constants

use std::{env, fs, path::Path};

// Single source of truth shared with the library
#[allow(dead_code)]
mod shared {
    include!("constants.rs");
}

fn main() {
    println!("cargo:rerun-if-changed=constants.rs");
    println!("cargo:rerun-if-changed=src/gpu/shaders");

    let out_dir = env::var("OUT_DIR").expect("OUT_DIR is set by cargo");
    let constants_path = Path::new(&out_dir).join("sort_constants.wgsl");

    fs::write(&constants_path, shared::generate_wgsl_constants())
        .expect("Failed to write generated constants WGSL");
}
