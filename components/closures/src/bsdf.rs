//! Scattering-model contract and the reference models
//!
//! Every model answers four questions about an outgoing direction `omega_out`
//! (pointing toward the viewer): where it can scatter (`get_cone`), how much
//! it scatters into a given direction (`eval`), where to send a sample
//! (`sample`) and with what density (`pdf`).

use crate::sampling::{make_orthonormals, pdf_cos_hemisphere, sample_cos_hemisphere};
use glam::Vec3;
use std::f32::consts::{FRAC_1_PI, PI};
use std::fmt;

/// Bounding cone of directions with nonzero contribution
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cone {
    /// Cone axis (unit length)
    pub axis: Vec3,
    /// Half-angle in radians
    pub angle: f32,
}

/// A sampled incoming direction
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BsdfSample {
    /// Incoming direction
    pub omega_in: Vec3,
    /// Probability density of `omega_in`
    pub pdf: f32,
}

impl BsdfSample {
    /// The "no valid sample" result: zero direction, zero density
    pub const NONE: BsdfSample = BsdfSample {
        omega_in: Vec3::ZERO,
        pdf: 0.0,
    };

    /// True if the sample carries no contribution
    pub fn is_none(&self) -> bool {
        self.pdf == 0.0
    }
}

/// Polymorphic scattering model
pub trait Bsdf: fmt::Debug + Send + Sync {
    /// Registered model name
    fn name(&self) -> &'static str;

    /// Conservative cone of contributing directions, or `None` when the model
    /// must not be integrated over the hemisphere directly
    fn get_cone(&self, omega_out: Vec3) -> Option<Cone>;

    /// Scattered color for a direction pair (zero where the pair is invalid)
    fn eval(&self, omega_out: Vec3, omega_in: Vec3) -> Vec3;

    /// Draw an incoming direction from two uniform numbers in `[0, 1)`
    fn sample(&self, omega_out: Vec3, u: f32, v: f32) -> BsdfSample;

    /// Density that `sample` would report for `omega_in`
    fn pdf(&self, omega_out: Vec3, omega_in: Vec3) -> f32;
}

// ============================================================================
// Diffuse
// ============================================================================

/// Lambertian reflection around a normal
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Diffuse {
    /// Surface normal (unit length)
    pub n: Vec3,
}

impl Diffuse {
    /// Create a diffuse model for normal `n`
    pub fn new(n: Vec3) -> Self {
        Self { n }
    }
}

impl Bsdf for Diffuse {
    fn name(&self) -> &'static str {
        "diffuse"
    }

    fn get_cone(&self, omega_out: Vec3) -> Option<Cone> {
        if self.n.dot(omega_out) > 0.0 {
            Some(Cone {
                axis: self.n,
                angle: PI,
            })
        } else {
            None
        }
    }

    fn eval(&self, omega_out: Vec3, omega_in: Vec3) -> Vec3 {
        let cos_ni = self.n.dot(omega_in);
        if self.n.dot(omega_out) <= 0.0 || cos_ni <= 0.0 {
            return Vec3::ZERO;
        }
        Vec3::splat(cos_ni * FRAC_1_PI)
    }

    fn sample(&self, omega_out: Vec3, u: f32, v: f32) -> BsdfSample {
        if self.n.dot(omega_out) <= 0.0 {
            // viewed from behind
            return BsdfSample::NONE;
        }
        let (omega_in, pdf) = sample_cos_hemisphere(self.n, u, v);
        BsdfSample { omega_in, pdf }
    }

    fn pdf(&self, omega_out: Vec3, omega_in: Vec3) -> f32 {
        if self.n.dot(omega_out) <= 0.0 {
            return 0.0;
        }
        pdf_cos_hemisphere(self.n, omega_in)
    }
}

// ============================================================================
// Transparent
// ============================================================================

/// Ideal straight-through transmission
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Transparent;

impl Bsdf for Transparent {
    fn name(&self) -> &'static str {
        "transparent"
    }

    fn get_cone(&self, _omega_out: Vec3) -> Option<Cone> {
        None
    }

    fn eval(&self, _omega_out: Vec3, _omega_in: Vec3) -> Vec3 {
        Vec3::ZERO
    }

    fn sample(&self, omega_out: Vec3, _u: f32, _v: f32) -> BsdfSample {
        BsdfSample {
            omega_in: -omega_out,
            pdf: 1.0,
        }
    }

    fn pdf(&self, _omega_out: Vec3, _omega_in: Vec3) -> f32 {
        // a single direction carries probability mass, not density
        0.0
    }
}

// ============================================================================
// Phong
// ============================================================================

/// Power-cosine lobe around the mirror direction.
///
/// `eval` is normalized with `(e + 2) / 2π` while `pdf` and `sample` use
/// `(e + 1) / 2π`, so the lobe does not conserve energy at grazing angles.
/// Rendered results depend on this pairing; keep the two constants distinct.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Phong {
    /// Surface normal (unit length)
    pub n: Vec3,
    /// Specular exponent
    pub exponent: f32,
}

impl Phong {
    /// Create a Phong lobe for normal `n`
    pub fn new(n: Vec3, exponent: f32) -> Self {
        Self { n, exponent }
    }

    /// Mirror of `omega_out` about the normal
    pub fn reflect(&self, omega_out: Vec3) -> Vec3 {
        (2.0 * self.n.dot(omega_out)) * self.n - omega_out
    }

    fn lobe(&self, cos_ri: f32, normalization: f32) -> f32 {
        normalization * 0.5 * FRAC_1_PI * cos_ri.powf(self.exponent)
    }
}

impl Bsdf for Phong {
    fn name(&self) -> &'static str {
        "phong"
    }

    fn get_cone(&self, omega_out: Vec3) -> Option<Cone> {
        if self.n.dot(omega_out) > 0.0 {
            Some(Cone {
                axis: self.n,
                angle: PI,
            })
        } else {
            None
        }
    }

    fn eval(&self, omega_out: Vec3, omega_in: Vec3) -> Vec3 {
        let cos_no = self.n.dot(omega_out);
        let cos_ni = self.n.dot(omega_in);
        if cos_no <= 0.0 || cos_ni <= 0.0 {
            return Vec3::ZERO;
        }
        let cos_ri = self.reflect(omega_out).dot(omega_in);
        if cos_ri <= 0.0 {
            return Vec3::ZERO;
        }
        Vec3::splat(cos_ni * self.lobe(cos_ri, self.exponent + 2.0))
    }

    fn sample(&self, omega_out: Vec3, u: f32, v: f32) -> BsdfSample {
        if self.n.dot(omega_out) <= 0.0 {
            return BsdfSample::NONE;
        }
        let r = self.reflect(omega_out);
        let (t, b) = make_orthonormals(r);
        let phi = 2.0 * PI * u;
        let cos_theta = v.powf(1.0 / (self.exponent + 1.0));
        let sin_theta = (1.0 - cos_theta * cos_theta).max(0.0).sqrt();
        let omega_in = (phi.cos() * sin_theta) * t + (phi.sin() * sin_theta) * b + cos_theta * r;
        if self.n.dot(omega_in) <= 0.0 {
            // lobe dipped below the surface
            return BsdfSample::NONE;
        }
        BsdfSample {
            omega_in,
            pdf: self.lobe(r.dot(omega_in), self.exponent + 1.0),
        }
    }

    fn pdf(&self, omega_out: Vec3, omega_in: Vec3) -> f32 {
        if self.n.dot(omega_out) <= 0.0 || self.n.dot(omega_in) <= 0.0 {
            return 0.0;
        }
        let cos_ri = self.reflect(omega_out).dot(omega_in);
        if cos_ri <= 0.0 {
            return 0.0;
        }
        self.lobe(cos_ri, self.exponent + 1.0)
    }
}
