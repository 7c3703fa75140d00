//! GlassFE — liquid glass displacement map generation.
//!
//! The core is a pure, deterministic generator: given raster dimensions and
//! shape parameters it produces an RGBA map whose red/green channels encode a
//! per-pixel 2D displacement vector for a refractive "glass" bulge, computed
//! from the signed distance field of a rounded rectangle. A runtime shader
//! (see [`shader`]) samples the map to warp and chromatically aberrate its
//! content layer; [`ops::preview`] reproduces that shader on the CPU for
//! offline previews.

pub mod cli;
pub mod io;
pub mod logger;
pub mod ops;
pub mod shader;

pub use ops::displacement::{GlassParams, generate, generate_legacy};
pub use ops::preview::apply_displacement_core;
