//! Contract tests for the scattering models
//!
//! These tests verify the sampling/evaluation contract every model must honor.

use closures::{Bsdf, ClosureColor, Diffuse, Phong, Transparent};
use glam::Vec3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f32::consts::PI;
use std::sync::Arc;

/// Uniformly distributed direction on the hemisphere around +Z
fn uniform_hemisphere(rng: &mut StdRng) -> Vec3 {
    let z: f32 = rng.gen();
    let phi = 2.0 * PI * rng.gen::<f32>();
    let r = (1.0 - z * z).max(0.0).sqrt();
    Vec3::new(r * phi.cos(), r * phi.sin(), z)
}

/// Monte-Carlo estimate of the integral of `f` over the +Z hemisphere
fn integrate_hemisphere(samples: usize, seed: u64, f: impl Fn(Vec3) -> f32) -> f32 {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut sum = 0.0f64;
    for _ in 0..samples {
        sum += f(uniform_hemisphere(&mut rng)) as f64;
    }
    (sum / samples as f64 * 2.0 * std::f64::consts::PI) as f32
}

// ============================================================================
// Diffuse
// ============================================================================

/// Test the diffuse density integrates to one over the hemisphere
#[test]
fn test_diffuse_pdf_integrates_to_one() {
    let bsdf = Diffuse::new(Vec3::Z);
    let wo = Vec3::new(0.3, 0.2, 0.93).normalize();
    let integral = integrate_hemisphere(200_000, 7, |wi| bsdf.pdf(wo, wi));
    assert!((integral - 1.0).abs() < 0.02, "integral = {}", integral);
}

/// Test every diffuse sample stays above the surface and reports pdf()
#[test]
fn test_diffuse_samples_stay_in_hemisphere() {
    let n = Vec3::new(0.2, -0.5, 0.84).normalize();
    let bsdf = Diffuse::new(n);
    let mut rng = StdRng::seed_from_u64(11);
    for _ in 0..10_000 {
        let sample = bsdf.sample(n, rng.gen(), rng.gen());
        assert!(n.dot(sample.omega_in) >= -1e-6);
        assert!((sample.omega_in.length() - 1.0).abs() < 1e-4);
        assert!((bsdf.pdf(n, sample.omega_in) - sample.pdf).abs() < 1e-4);
    }
}

/// Test the diffuse cone covers the normal only when viewed from the front
#[test]
fn test_diffuse_cone() {
    let bsdf = Diffuse::new(Vec3::Z);
    let cone = bsdf.get_cone(Vec3::Z).expect("front side has a cone");
    assert_eq!(cone.axis, Vec3::Z);
    assert!(bsdf.get_cone(-Vec3::Z).is_none());
}

// ============================================================================
// Transparent
// ============================================================================

/// Test transparent sampling is exactly the reversed outgoing direction
#[test]
fn test_transparent_sample_is_exact() {
    let mut rng = StdRng::seed_from_u64(3);
    for _ in 0..1_000 {
        let wo = Vec3::new(
            rng.gen_range(-1.0..1.0),
            rng.gen_range(-1.0..1.0),
            rng.gen_range(-1.0..1.0),
        );
        let sample = Transparent.sample(wo, rng.gen(), rng.gen());
        assert_eq!(sample.omega_in, -wo);
        assert_eq!(sample.pdf, 1.0);
    }
    assert!(Transparent.get_cone(Vec3::Z).is_none());
}

// ============================================================================
// Phong
// ============================================================================

/// Test the Phong density integrates to one at normal incidence
#[test]
fn test_phong_pdf_integrates_to_one_at_normal_incidence() {
    let bsdf = Phong::new(Vec3::Z, 6.0);
    let integral = integrate_hemisphere(400_000, 5, |wi| bsdf.pdf(Vec3::Z, wi));
    assert!((integral - 1.0).abs() < 0.03, "integral = {}", integral);
}

/// Test eval and pdf keep their distinct normalizations
///
/// At normal incidence eval(wi) / (cos * pdf(wi)) = (e + 2) / (e + 1). The two
/// constants are intentionally different; this test fails if they are unified.
#[test]
fn test_phong_eval_pdf_asymmetry_is_preserved() {
    let exponent = 6.0;
    let bsdf = Phong::new(Vec3::Z, exponent);
    let wi = Vec3::new(0.1, 0.05, 0.99).normalize();
    let ratio = bsdf.eval(Vec3::Z, wi).x / (wi.z * bsdf.pdf(Vec3::Z, wi));
    assert!((ratio - (exponent + 2.0) / (exponent + 1.0)).abs() < 1e-4);
}

/// Test rejected Phong samples report zero density and direction
#[test]
fn test_phong_rejects_back_side() {
    let bsdf = Phong::new(Vec3::Z, 2.0);
    let sample = bsdf.sample(-Vec3::Z, 0.5, 0.5);
    assert_eq!(sample.pdf, 0.0);
    assert_eq!(sample.omega_in, Vec3::ZERO);
}

/// Test accepted Phong samples are consistent with pdf()
#[test]
fn test_phong_samples_match_pdf() {
    let bsdf = Phong::new(Vec3::Z, 12.0);
    let wo = Vec3::new(0.5, 0.0, 0.866).normalize();
    let mut rng = StdRng::seed_from_u64(19);
    let mut accepted = 0;
    for _ in 0..5_000 {
        let sample = bsdf.sample(wo, rng.gen(), rng.gen());
        if sample.pdf == 0.0 {
            assert_eq!(sample.omega_in, Vec3::ZERO);
            continue;
        }
        accepted += 1;
        assert!(sample.omega_in.z > 0.0);
        let expected = bsdf.pdf(wo, sample.omega_in);
        assert!((expected - sample.pdf).abs() <= 1e-3 * expected.max(1.0));
    }
    assert!(accepted > 4_000);
}

// ============================================================================
// Closure trees
// ============================================================================

/// Test evaluation of a composed tree is linear in its components
#[test]
fn test_closure_tree_is_linear() {
    let diffuse: Arc<dyn Bsdf> = Arc::new(Diffuse::new(Vec3::Z));
    let phong: Arc<dyn Bsdf> = Arc::new(Phong::new(Vec3::Z, 4.0));
    let wd = Vec3::new(0.8, 0.6, 0.4);
    let wp = Vec3::new(0.2, 0.3, 0.5);

    let tree = ClosureColor::component(diffuse.clone())
        .scale(wd)
        .add(&ClosureColor::component(phong.clone()).scale(wp));

    let wo = Vec3::new(0.1, 0.2, 0.97).normalize();
    let wi = Vec3::new(-0.2, 0.1, 0.97).normalize();
    let expected = wd * diffuse.eval(wo, wi) + wp * phong.eval(wo, wi);
    assert!((tree.eval(wo, wi) - expected).length() < 1e-5);
}
