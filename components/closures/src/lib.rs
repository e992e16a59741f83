//! Scattering closures for the shading runtime
//!
//! This crate provides:
//! - The BSDF contract (`get_cone`, `eval`, `sample`, `pdf`)
//! - Diffuse, Transparent and Phong reference models
//! - Closure trees: weighted sums of models with shared nodes
//! - A read-only registry of closure constructors
//!
//! # Example
//!
//! ```
//! use closures::{Bsdf, ClosureParam, ClosureRegistry, Diffuse};
//! use glam::Vec3;
//!
//! let diffuse = Diffuse::new(Vec3::Z);
//! let sample = diffuse.sample(Vec3::Z, 0.3, 0.6);
//! assert!(sample.omega_in.z >= 0.0);
//!
//! let tree = ClosureRegistry::builtin()
//!     .build("diffuse", &[ClosureParam::Vector(Vec3::Z)])
//!     .unwrap()
//!     .scale_scalar(0.5);
//! assert_eq!(tree.len(), 1);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod bsdf;
pub mod registry;
pub mod sampling;
pub mod tree;

// Re-export main types at crate root
pub use bsdf::{Bsdf, BsdfSample, Cone, Diffuse, Phong, Transparent};
pub use registry::{ClosureDescriptor, ClosureParam, ClosureRegistry, ParamType};
pub use sampling::{make_orthonormals, to_unit_disk};
pub use tree::{ClosureColor, ClosureNode, WeightedBsdf};
