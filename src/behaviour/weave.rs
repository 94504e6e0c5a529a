use std::f64::consts::{PI, SQRT_2, TAU};

use nalgebra::{UnitQuaternion, Vector3};

// ---------------------------------------------------------------------------
// 2D gradient noise
// ---------------------------------------------------------------------------

/// Smooth 2D gradient noise in [0, 1]. Lattice points map to exactly 0.5.
pub fn perlin(x: f64, y: f64) -> f64 {
    let x0 = x.floor();
    let y0 = y.floor();
    let (fx, fy) = (x - x0, y - y0);
    let (ix, iy) = (x0 as i64, y0 as i64);

    let n00 = corner(ix, iy, fx, fy);
    let n10 = corner(ix + 1, iy, fx - 1.0, fy);
    let n01 = corner(ix, iy + 1, fx, fy - 1.0);
    let n11 = corner(ix + 1, iy + 1, fx - 1.0, fy - 1.0);

    let (u, v) = (fade(fx), fade(fy));
    let n = lerp(lerp(n00, n10, u), lerp(n01, n11, u), v);
    (0.5 + 0.5 * n * SQRT_2).clamp(0.0, 1.0)
}

fn corner(ix: i64, iy: i64, dx: f64, dy: f64) -> f64 {
    let angle = (lattice_hash(ix, iy) >> 11) as f64 / (1u64 << 53) as f64 * TAU;
    angle.cos() * dx + angle.sin() * dy
}

// splitmix64 finalizer over both lattice coordinates
fn lattice_hash(ix: i64, iy: i64) -> u64 {
    let mut z = (ix as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15) ^ (iy as u64).wrapping_mul(0xC2B2_AE3D_27D4_EB4F);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

fn fade(t: f64) -> f64 {
    t * t * t * (t * (t * 6.0 - 15.0) + 10.0)
}

fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

// ---------------------------------------------------------------------------
// Weaving heading around a travel direction
// ---------------------------------------------------------------------------

/// Unit heading that wanders around `path` as time advances.
///
/// Noise offsets in [-1, 1] on two lateral axes are scaled onto a cone of
/// `radius`, then the cone (built around +Z) is rotated onto the path. A zero
/// path falls back to +Z.
pub fn weave_direction(path: &Vector3<f64>, time: f64, speed: f64, radius: f64) -> Vector3<f64> {
    let t = time * speed;
    let ox = (perlin(t, 0.0) - 0.5) * 2.0;
    let oy = (perlin(0.0, t) - 0.5) * 2.0;

    let v = Vector3::new(ox, oy, 1.0).normalize() * radius;
    let local = Vector3::new(v.x, v.y, 1.0).normalize();

    let Some(path) = path.try_normalize(1e-9) else {
        return local;
    };
    let onto_path = UnitQuaternion::rotation_between(&Vector3::z(), &path)
        // Antiparallel: any half turn about a lateral axis will do
        .unwrap_or_else(|| UnitQuaternion::from_axis_angle(&Vector3::y_axis(), PI));
    onto_path * local
}
