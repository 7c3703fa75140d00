// ============================================================================
// DISPLACEMENT MAP GENERATOR — SDF-based liquid glass refraction field
// ============================================================================
//
// Produces the RGBA raster the liquid glass runtime shader samples as its
// `displacementMap` input. Each pixel encodes a 2D offset vector:
//
//   red   = horizontal displacement, (dx / width  + 0.5) quantized to 8 bits
//   green = vertical displacement,   (dy / height + 0.5) quantized to 8 bits
//   blue  = copy of green (the shader only reads .rg)
//   alpha = 255
//
// The refractive bulge is confined to a band between an outer rounded
// rectangle hugging the raster bounds and an inner rounded rectangle inset by
// `thickness`. Inside the band, pixels are pulled toward the center by up to
// `displacement_scale`, eased with a smoothstep so the warp is C¹-continuous
// at both band edges.

use image::RgbaImage;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Band parametrization guard: when the outer and inner SDFs coincide
/// (zero-thickness band) the denominator goes to zero; fall back to no
/// displacement instead of dividing.
const BAND_EPSILON: f32 = 1e-6;

// ============================================================================
// PARAMETERS
// ============================================================================

/// Shape and strength parameters for one displacement map.
///
/// Value-like and immutable: build one per target size, generate, discard.
/// `corner_radius` and `thickness` are given in pixels and normalized
/// internally by `min(width, height)`, so the same parameter set produces the
/// same visual proportions at any resolution. Out-of-range shape values are
/// clamped, never rejected; only the dimensions are a hard precondition.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GlassParams {
    /// Target raster width in pixels. Must be positive.
    pub width: u32,
    /// Target raster height in pixels. Must be positive.
    pub height: u32,
    /// Corner radius of the glass shape, in pixels of the smaller dimension.
    pub corner_radius: f32,
    /// Width of the refractive band between the outer and inner rounded
    /// rectangle, in pixels of the smaller dimension.
    pub thickness: f32,
    /// Strength of the bulge. 0.0 = identity field (effect disabled).
    pub displacement_scale: f32,
}

impl GlassParams {
    /// Params for a `width` × `height` map with the stock glass look.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ..Self::default()
        }
    }
}

impl Default for GlassParams {
    fn default() -> Self {
        Self {
            width: 512,
            height: 512,
            corner_radius: 48.0,
            thickness: 24.0,
            displacement_scale: 0.5,
        }
    }
}

// ============================================================================
// SDF PRIMITIVES
// ============================================================================

/// Signed distance from point `(x, y)` to a rounded rectangle centered at the
/// origin with the given half-extents and corner radius. Negative inside,
/// positive outside, zero on the boundary.
#[inline]
pub fn rounded_rect_sdf(x: f32, y: f32, half_w: f32, half_h: f32, radius: f32) -> f32 {
    let qx = x.abs() - half_w + radius;
    let qy = y.abs() - half_h + radius;
    let mx = qx.max(0.0);
    let my = qy.max(0.0);
    qx.max(qy).min(0.0) + (mx * mx + my * my).sqrt() - radius
}

/// Hermite smoothstep between `edge0` and `edge1` (GLSL semantics; edges may
/// be given in descending order for an inverted ramp).
#[inline]
pub fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

// ============================================================================
// CANONICAL FRAGMENT FUNCTION
// ============================================================================

/// Per-map constants derived once from [`GlassParams`]: aspect-corrected box
/// extents and clamped, resolution-normalized radii.
#[derive(Debug, Clone, Copy)]
struct BandShape {
    aspect: f32,
    half_w: f32,
    half_h: f32,
    corner_radius: f32,
    inner_half_w: f32,
    inner_half_h: f32,
    inner_corner_radius: f32,
    displacement_scale: f32,
}

impl BandShape {
    fn from_params(params: &GlassParams) -> Self {
        let aspect = params.width as f32 / params.height as f32;

        // Aspect-corrected half-extents: the rounded rect stays an
        // undistorted rectangle in true pixel space for any aspect ratio.
        let (half_w, half_h) = if aspect > 1.0 {
            (0.5 * aspect, 0.5)
        } else {
            (0.5, 0.5 / aspect)
        };

        // Normalize pixel-unit parameters by the smaller raster dimension,
        // then clamp so the inner rectangle can never invert: both radius and
        // thickness are capped at the smaller half-extent.
        let min_dim = params.width.min(params.height) as f32;
        let max_inset = half_w.min(half_h);
        let corner_radius = (params.corner_radius / min_dim).clamp(0.0, max_inset);
        let thickness = (params.thickness / min_dim).clamp(0.0, max_inset);

        Self {
            aspect,
            half_w,
            half_h,
            corner_radius,
            inner_half_w: half_w - thickness,
            inner_half_h: half_h - thickness,
            inner_corner_radius: (corner_radius - thickness).max(0.0),
            displacement_scale: params.displacement_scale.max(0.0),
        }
    }
}

/// Map a normalized UV coordinate to the UV it should sample from.
///
/// Position within the refractive band is parametrized 0 at the inner edge
/// and 1 at the outer edge; smoothstepped intensity drives a uniform scale of
/// the (centered, aspect-corrected) coordinate toward the origin.
fn glass_fragment(u: f32, v: f32, shape: &BandShape) -> (f32, f32) {
    let mut ix = u - 0.5;
    let mut iy = v - 0.5;
    if shape.aspect > 1.0 {
        ix *= shape.aspect;
    } else {
        iy /= shape.aspect;
    }

    let sdf_outer = rounded_rect_sdf(ix, iy, shape.half_w, shape.half_h, shape.corner_radius);
    let sdf_inner = rounded_rect_sdf(
        ix,
        iy,
        shape.inner_half_w,
        shape.inner_half_h,
        shape.inner_corner_radius,
    );

    let denom = sdf_inner - sdf_outer;
    let band = if denom > BAND_EPSILON {
        (sdf_inner / denom).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let intensity = smoothstep(0.0, 1.0, band);

    let scale = 1.0 - shape.displacement_scale * intensity;
    let mut nx = ix * scale;
    let mut ny = iy * scale;
    if shape.aspect > 1.0 {
        nx /= shape.aspect;
    } else {
        ny *= shape.aspect;
    }
    (nx + 0.5, ny + 0.5)
}

// ============================================================================
// LEGACY PRESET
// ============================================================================

/// Empirically tuned constants of the original fixed-shape bulge. Kept
/// verbatim as the `legacy` preset; no derivation exists for these values.
pub mod legacy {
    /// Half-extents of the fixed rounded rectangle, in centered UV units.
    pub const BOX_HALF_EXTENTS: [f32; 2] = [0.3, 0.2];
    /// Corner radius of the fixed rounded rectangle.
    pub const CORNER_RADIUS: f32 = 0.6;
    /// Distance at which the falloff ramp starts.
    pub const FALLOFF_START: f32 = 0.8;
    /// Outward offset applied to the SDF before the falloff ramp.
    pub const EDGE_OFFSET: f32 = 0.15;
}

/// The original whole-interior bulge: one SDF against a fixed rounded
/// rectangle, falloff applied directly as the scale intensity. Equivalent to
/// the banded algorithm with an unbounded band and a fixed shape.
fn legacy_fragment(u: f32, v: f32) -> (f32, f32) {
    let ix = u - 0.5;
    let iy = v - 0.5;
    let distance_to_edge = rounded_rect_sdf(
        ix,
        iy,
        legacy::BOX_HALF_EXTENTS[0],
        legacy::BOX_HALF_EXTENTS[1],
        legacy::CORNER_RADIUS,
    );
    let displacement = smoothstep(
        legacy::FALLOFF_START,
        0.0,
        distance_to_edge - legacy::EDGE_OFFSET,
    );
    let scale = smoothstep(0.0, 1.0, displacement);
    (ix * scale + 0.5, iy * scale + 0.5)
}

// ============================================================================
// RASTER FILL DRIVER
// ============================================================================

/// Fill a `width` × `height` RGBA raster from a UV-remapping fragment
/// function, quantizing the pixel-unit displacement into the channel
/// encoding described at the top of this module. Rows are independent, so
/// the fill is parallel by row.
fn render_field<F>(width: u32, height: u32, fragment: F) -> RgbaImage
where
    F: Fn(f32, f32) -> (f32, f32) + Sync,
{
    let w = width as usize;
    let h = height as usize;
    let wf = width as f32;
    let hf = height as f32;
    let stride = w * 4;

    let mut raw = vec![0u8; w * h * 4];
    raw.par_chunks_mut(stride).enumerate().for_each(|(y, row_out)| {
        let v = y as f32 / hf;
        for x in 0..w {
            let u = x as f32 / wf;
            let (px, py) = fragment(u, v);

            // Displacement in pixel units, then biased to unsigned channels.
            let dx = px * wf - x as f32;
            let dy = py * hf - y as f32;
            let red = ((dx / wf + 0.5) * 255.0).clamp(0.0, 255.0) as u8;
            let green = ((dy / hf + 0.5) * 255.0).clamp(0.0, 255.0) as u8;

            let pi = x * 4;
            row_out[pi] = red;
            row_out[pi + 1] = green;
            row_out[pi + 2] = green;
            row_out[pi + 3] = 255;
        }
    });

    RgbaImage::from_raw(width, height, raw).unwrap()
}

/// Generate a liquid glass displacement map for the given parameters.
///
/// Pure and deterministic: identical params produce byte-identical rasters.
/// Shape parameters outside their valid range are clamped (see
/// [`GlassParams`]); dimensions must be positive.
pub fn generate(params: &GlassParams) -> RgbaImage {
    assert!(
        params.width > 0 && params.height > 0,
        "displacement map dimensions must be positive (got {}x{})",
        params.width,
        params.height
    );
    let shape = BandShape::from_params(params);
    render_field(params.width, params.height, move |u, v| {
        glass_fragment(u, v, &shape)
    })
}

/// Generate a displacement map with the original fixed-shape bulge tuning.
pub fn generate_legacy(width: u32, height: u32) -> RgbaImage {
    assert!(
        width > 0 && height > 0,
        "displacement map dimensions must be positive (got {}x{})",
        width,
        height
    );
    render_field(width, height, legacy_fragment)
}

// ============================================================================
// TESTS
// ============================================================================
