//! # Voxel Volume Engine Entry Point
//!
//! This is the main entry point for the native build. It simply calls into the library's
//! `run()` function, a headless demo of the engine.
//!
//! For web builds, see the `run_web()` function in the library.
//!
//! ## Usage
//!
//! ```bash
//! RUST_LOG=info cargo run --release -- engine.json
//! ```

fn main() {
    #[cfg(not(target_family = "wasm"))]
    voxel_volume_engine::run();
}
