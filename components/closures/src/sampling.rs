//! Sampling utilities shared by the scattering models

use glam::{Vec2, Vec3};
use std::f32::consts::{FRAC_1_PI, FRAC_PI_4};

/// Map a point of the unit square onto the unit disk, preserving area.
///
/// Concentric mapping (Shirley, "Realistic Ray Tracing", p. 103): each
/// quadrant-wedge of the square maps to a wedge of the disk.
pub fn to_unit_disk(x: f32, y: f32) -> Vec2 {
    let a = 2.0 * x - 1.0;
    let b = 2.0 * y - 1.0;
    let (r, phi) = if a > -b {
        if a > b {
            (a, FRAC_PI_4 * (b / a))
        } else {
            (b, FRAC_PI_4 * (2.0 - a / b))
        }
    } else if a < b {
        (-a, FRAC_PI_4 * (4.0 + b / a))
    } else if b != 0.0 {
        (-b, FRAC_PI_4 * (6.0 - a / b))
    } else {
        (-b, 0.0)
    };
    Vec2::new(r * phi.cos(), r * phi.sin())
}

/// Two unit vectors orthogonal to `n` and to each other.
///
/// `n` must be normalized. The first axis is `(1,1,1) x n`, or `(-1,1,1) x n`
/// when all components of `n` are equal; the second is `n x a`.
pub fn make_orthonormals(n: Vec3) -> (Vec3, Vec3) {
    let a = if n.x != n.y || n.x != n.z {
        Vec3::new(n.z - n.y, n.x - n.z, n.y - n.x)
    } else {
        Vec3::new(n.z - n.y, n.x + n.z, -n.y - n.x)
    };
    let a = a.normalize();
    let b = n.cross(a);
    (a, b)
}

/// Cosine-weighted direction on the hemisphere around `n` and its density
pub fn sample_cos_hemisphere(n: Vec3, u: f32, v: f32) -> (Vec3, f32) {
    let disk = to_unit_disk(u, v);
    let cos_theta = (1.0 - disk.x * disk.x - disk.y * disk.y).max(0.0).sqrt();
    let (t, b) = make_orthonormals(n);
    let omega_in = disk.x * t + disk.y * b + cos_theta * n;
    (omega_in, cos_theta * FRAC_1_PI)
}

/// Density of [`sample_cos_hemisphere`] for a given direction
pub fn pdf_cos_hemisphere(n: Vec3, omega_in: Vec3) -> f32 {
    let cos_theta = n.dot(omega_in);
    if cos_theta > 0.0 {
        cos_theta * FRAC_1_PI
    } else {
        0.0
    }
}
