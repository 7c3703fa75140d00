//! Integration tests: displacement map generation
//!
//! Verifies the observable contract of the generator — channel encoding,
//! determinism, parameter clamping — and the agreement between the encoder
//! and the CPU preview's decoder.

use glassfe::ops::displacement::{GlassParams, generate, generate_legacy};
use glassfe::ops::preview::apply_displacement_core;
use glassfe::shader::decode_channel;
use image::RgbaImage;

fn reference_params() -> GlassParams {
    GlassParams {
        width: 100,
        height: 100,
        corner_radius: 20.0,
        thickness: 10.0,
        displacement_scale: 0.5,
    }
}

/// Horizontal gradient source image for preview tests.
fn gradient_image(width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_fn(width, height, |x, _| {
        let v = (x * 255 / width.max(1)) as u8;
        image::Rgba([v, 255 - v, v / 2, 255])
    })
}

// ============================================================================
// Channel encoding invariants
// ============================================================================

#[test]
fn alpha_is_fully_opaque_everywhere() {
    let map = generate(&reference_params());
    for p in map.pixels() {
        assert_eq!(p[3], 255, "alpha must be constant 255");
    }
}

#[test]
fn blue_always_mirrors_green() {
    for (w, h) in [(100, 100), (640, 123), (33, 470)] {
        let map = generate(&GlassParams {
            width: w,
            height: h,
            ..reference_params()
        });
        for (x, y, p) in map.enumerate_pixels() {
            assert_eq!(
                p[2], p[1],
                "blue != green at ({}, {}) in {}x{} map",
                x, y, w, h
            );
        }
    }
}

#[test]
fn zero_scale_produces_identity_field() {
    // The flat/no-op configuration: every channel quantizes a ~zero
    // displacement, whatever the shape parameters.
    let map = generate(&GlassParams {
        width: 80,
        height: 200,
        corner_radius: 500.0,
        thickness: 3.0,
        displacement_scale: 0.0,
    });
    for (x, y, p) in map.enumerate_pixels() {
        for c in [p[0], p[1]] {
            assert!(
                c == 127 || c == 128,
                "non-neutral channel {} at ({}, {}) with zero scale",
                c,
                x,
                y
            );
        }
    }
}

// ============================================================================
// Determinism
// ============================================================================

#[test]
fn identical_params_produce_identical_bytes() {
    let params = reference_params();
    let a = generate(&params);
    let b = generate(&params);
    assert_eq!(a.as_raw(), b.as_raw(), "generation must be deterministic");
}

#[test]
fn legacy_preset_is_deterministic() {
    let a = generate_legacy(120, 90);
    let b = generate_legacy(120, 90);
    assert_eq!(a.as_raw(), b.as_raw());
}

// ============================================================================
// Geometry
// ============================================================================

#[test]
fn center_pixel_is_neutral_for_any_aspect_ratio() {
    for (w, h) in [(100, 100), (300, 100), (100, 300), (101, 53), (53, 101)] {
        let map = generate(&GlassParams {
            width: w,
            height: h,
            corner_radius: 10.0,
            thickness: 5.0,
            displacement_scale: 0.5,
        });
        let p = map.get_pixel(w / 2, h / 2);
        for c in [p[0], p[1]] {
            assert!(
                (c as i32 - 127).abs() <= 1,
                "center of {}x{} map displaced: channel {}",
                w,
                h,
                c
            );
        }
    }
}

#[test]
fn reference_scenario_center_and_corner() {
    // 100x100, radius 20px, thickness 10px, scale 0.5.
    let map = generate(&reference_params());

    // Dead center: zero displacement.
    let center = map.get_pixel(50, 50);
    assert!(center[0] == 127 || center[0] == 128);
    assert!(center[1] == 127 || center[1] == 128);

    // (5,5) sits in the corner band: strongly displaced, symmetric in x/y.
    let corner = map.get_pixel(5, 5);
    assert_eq!(corner[0], corner[1], "diagonal pixel must displace equally");
    assert!(
        corner[0] > 140,
        "corner pixel should carry a large displacement, got {}",
        corner[0]
    );
}

#[test]
fn displacement_magnitude_grows_with_scale() {
    let mut previous = 0u8;
    for scale in [0.2, 0.5, 0.8] {
        let map = generate(&GlassParams {
            displacement_scale: scale,
            ..reference_params()
        });
        let c = map.get_pixel(5, 5)[0];
        assert!(
            c > previous,
            "channel at scale {} should exceed {} but is {}",
            scale,
            previous,
            c
        );
        previous = c;
    }
}

#[test]
fn interior_pixels_inside_inner_rect_are_untouched() {
    let map = generate(&reference_params());
    // Points well inside the inner rounded rect (band is 10px wide at the
    // borders) must be identity.
    for (x, y) in [(30, 30), (50, 25), (70, 60)] {
        let p = map.get_pixel(x, y);
        assert!(
            p[0] == 127 || p[0] == 128,
            "({}, {}) is inside the inner rect but displaced: {}",
            x,
            y,
            p[0]
        );
    }
}

// ============================================================================
// Parameter clamping
// ============================================================================

#[test]
fn oversized_shape_parameters_stay_finite() {
    for (w, h) in [(64, 256), (256, 64)] {
        let params = GlassParams {
            width: w,
            height: h,
            corner_radius: 1.0e9,
            thickness: 1.0e9,
            displacement_scale: 1.0,
        };
        let a = generate(&params);
        let b = generate(&params);
        assert_eq!(a.as_raw(), b.as_raw());
        for p in a.pixels() {
            assert_eq!(p[3], 255);
            assert_eq!(p[2], p[1]);
        }
    }
}

#[test]
fn degenerate_band_equal_radius_and_thickness() {
    // thickness == corner_radius squares the inner corners (inner radius 0);
    // the map must still be well-formed.
    let map = generate(&GlassParams {
        width: 100,
        height: 100,
        corner_radius: 20.0,
        thickness: 20.0,
        displacement_scale: 0.5,
    });
    let center = map.get_pixel(50, 50);
    assert!(center[0] == 127 || center[0] == 128);
}

#[test]
fn negative_shape_parameters_are_clamped_not_rejected() {
    let map = generate(&GlassParams {
        width: 50,
        height: 50,
        corner_radius: -10.0,
        thickness: -10.0,
        displacement_scale: -2.0,
    });
    // Negative scale clamps to zero: identity field.
    for p in map.pixels() {
        assert!(p[0] == 127 || p[0] == 128);
    }
}

// ============================================================================
// Legacy preset
// ============================================================================

#[test]
fn legacy_preset_center_is_neutral() {
    let map = generate_legacy(200, 160);
    let p = map.get_pixel(100, 80);
    assert!(p[0] == 127 || p[0] == 128);
    assert!(p[1] == 127 || p[1] == 128);
}

#[test]
fn legacy_preset_obeys_channel_invariants() {
    let map = generate_legacy(97, 41);
    for p in map.pixels() {
        assert_eq!(p[3], 255);
        assert_eq!(p[2], p[1]);
    }
}

// ============================================================================
// Encoder / preview decoder agreement
// ============================================================================

#[test]
fn decoder_inverts_neutral_encoding() {
    // The quantized zero displacement must decode back below the preview's
    // blend threshold so identity maps leave images untouched.
    assert!(decode_channel(127).abs() < 0.05);
    assert!(decode_channel(128).abs() < 0.05);
}

#[test]
fn identity_map_preserves_uniform_image_exactly() {
    let src = RgbaImage::from_pixel(64, 64, image::Rgba([90, 140, 200, 255]));
    let map = generate(&GlassParams {
        width: 64,
        height: 64,
        corner_radius: 12.0,
        thickness: 6.0,
        displacement_scale: 0.0,
    });
    let out = apply_displacement_core(&src, &map, 2.0);
    assert_eq!(
        out.as_raw(),
        src.as_raw(),
        "identity map must not alter a uniform image"
    );
}

#[test]
fn displaced_map_warps_gradient_image() {
    let src = gradient_image(64, 64);
    let map = generate(&GlassParams {
        width: 64,
        height: 64,
        corner_radius: 12.0,
        thickness: 20.0,
        displacement_scale: 0.6,
    });
    let out = apply_displacement_core(&src, &map, 0.0);
    assert_eq!(out.dimensions(), src.dimensions());
    assert_ne!(
        out.as_raw(),
        src.as_raw(),
        "a strong bulge must visibly warp a gradient"
    );
    // Alpha is untouched by the warp of an opaque image.
    for p in out.pixels() {
        assert_eq!(p[3], 255);
    }
}

#[test]
fn preview_is_deterministic() {
    let src = gradient_image(48, 32);
    let map = generate(&GlassParams {
        width: 48,
        height: 32,
        corner_radius: 8.0,
        thickness: 8.0,
        displacement_scale: 0.4,
    });
    let a = apply_displacement_core(&src, &map, 1.5);
    let b = apply_displacement_core(&src, &map, 1.5);
    assert_eq!(a.as_raw(), b.as_raw());
}

// ============================================================================
// Raster shape
// ============================================================================

#[test]
fn output_matches_requested_dimensions() {
    let map = generate(&GlassParams {
        width: 123,
        height: 45,
        ..reference_params()
    });
    assert_eq!(map.dimensions(), (123, 45));
    assert_eq!(map.as_raw().len(), 123 * 45 * 4);
}
