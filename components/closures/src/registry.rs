//! Read-only table of closure constructors
//!
//! Models are stateless beyond their parameter block, so the registry only
//! stores descriptors: a name, the expected parameter types and a builder.
//! The built-in table is created once and never mutated.

use crate::bsdf::{Bsdf, Diffuse, Phong, Transparent};
use crate::tree::ClosureColor;
use glam::Vec3;
use shader_types::{ErrorKind, Result, ShadeError};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};
use tracing::debug;

/// Parameter type a closure constructor expects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    /// A triple (normal, vector, color)
    Vector,
    /// A float
    Float,
}

/// A constructor argument
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClosureParam {
    /// Triple argument
    Vector(Vec3),
    /// Float argument
    Float(f32),
}

impl ClosureParam {
    fn param_type(&self) -> ParamType {
        match self {
            ClosureParam::Vector(_) => ParamType::Vector,
            ClosureParam::Float(_) => ParamType::Float,
        }
    }

    fn vector(&self) -> Vec3 {
        match self {
            ClosureParam::Vector(v) => *v,
            ClosureParam::Float(f) => Vec3::splat(*f),
        }
    }

    fn float(&self) -> f32 {
        match self {
            ClosureParam::Float(f) => *f,
            ClosureParam::Vector(v) => v.x,
        }
    }
}

type Builder = fn(&[ClosureParam]) -> Arc<dyn Bsdf>;

/// Describes one constructible closure
#[derive(Clone)]
pub struct ClosureDescriptor {
    /// Name used by the `closure` opcode
    pub name: &'static str,
    /// Expected parameter types in order
    pub params: &'static [ParamType],
    build: Builder,
}

impl fmt::Debug for ClosureDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClosureDescriptor")
            .field("name", &self.name)
            .field("params", &self.params)
            .finish()
    }
}

impl ClosureDescriptor {
    /// Build an instance after checking the argument list
    pub fn build(&self, params: &[ClosureParam]) -> Result<ClosureColor> {
        let types: Vec<ParamType> = params.iter().map(ClosureParam::param_type).collect();
        if types != self.params {
            return Err(ShadeError::new(
                ErrorKind::UnsupportedTypes,
                format!(
                    "closure '{}' expects {:?}, got {:?}",
                    self.name, self.params, types
                ),
            ));
        }
        Ok(ClosureColor::component((self.build)(params)))
    }
}

/// Name → descriptor table
#[derive(Debug, Clone, Default)]
pub struct ClosureRegistry {
    entries: HashMap<&'static str, ClosureDescriptor>,
}

impl ClosureRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in models, constructed on first use
    pub fn builtin() -> &'static ClosureRegistry {
        static BUILTIN: OnceLock<ClosureRegistry> = OnceLock::new();
        BUILTIN.get_or_init(|| {
            let mut registry = ClosureRegistry::new();
            registry.register("diffuse", &[ParamType::Vector], |p| {
                Arc::new(Diffuse::new(p[0].vector()))
            });
            registry.register("transparent", &[], |_| Arc::new(Transparent));
            registry.register("phong", &[ParamType::Vector, ParamType::Float], |p| {
                Arc::new(Phong::new(p[0].vector(), p[1].float()))
            });
            debug!(models = registry.entries.len(), "built-in closure registry ready");
            registry
        })
    }

    /// Add a descriptor
    pub fn register(&mut self, name: &'static str, params: &'static [ParamType], build: Builder) {
        self.entries.insert(
            name,
            ClosureDescriptor {
                name,
                params,
                build,
            },
        );
    }

    /// Look up a descriptor
    pub fn get(&self, name: &str) -> Option<&ClosureDescriptor> {
        self.entries.get(name)
    }

    /// Build a named closure
    pub fn build(&self, name: &str, params: &[ClosureParam]) -> Result<ClosureColor> {
        let descriptor = self.get(name).ok_or_else(|| {
            ShadeError::new(
                ErrorKind::UnknownClosure,
                format!("no closure named '{}'", name),
            )
        })?;
        descriptor.build(params)
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.entries.keys().copied().collect();
        names.sort_unstable();
        names
    }
}
