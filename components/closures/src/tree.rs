//! Closure trees
//!
//! A [`ClosureColor`] is a weighted sum of scattering models built from
//! shared, immutable nodes. Composition (`add`, `scale`, ...) allocates one
//! new node that points at its operands; it never copies a subtree.

use crate::bsdf::Bsdf;
use glam::Vec3;
use std::fmt;
use std::sync::Arc;

/// One node of a closure tree
#[derive(Debug)]
pub enum ClosureNode {
    /// A single scattering model
    Component(Arc<dyn Bsdf>),
    /// Sum of two subtrees
    Add(Arc<ClosureNode>, Arc<ClosureNode>),
    /// Subtree scaled by a color weight
    Mul(Vec3, Arc<ClosureNode>),
}

/// A flattened term of a closure tree
#[derive(Debug, Clone)]
pub struct WeightedBsdf {
    /// Accumulated weight along the path to the component
    pub weight: Vec3,
    /// The scattering model
    pub bsdf: Arc<dyn Bsdf>,
}

/// A (possibly empty) closure tree
#[derive(Debug, Clone, Default)]
pub struct ClosureColor {
    root: Option<Arc<ClosureNode>>,
}

impl ClosureColor {
    /// The empty closure
    pub fn empty() -> Self {
        Self { root: None }
    }

    /// A closure with a single unit-weight component
    pub fn component(bsdf: Arc<dyn Bsdf>) -> Self {
        Self {
            root: Some(Arc::new(ClosureNode::Component(bsdf))),
        }
    }

    /// True if the closure has no components
    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Root node, if any
    pub fn root(&self) -> Option<&Arc<ClosureNode>> {
        self.root.as_ref()
    }

    /// `self + other`
    pub fn add(&self, other: &ClosureColor) -> ClosureColor {
        match (&self.root, &other.root) {
            (None, _) => other.clone(),
            (_, None) => self.clone(),
            (Some(a), Some(b)) => Self {
                root: Some(Arc::new(ClosureNode::Add(a.clone(), b.clone()))),
            },
        }
    }

    /// `self - other`, built as `self + (-1 * other)`
    pub fn sub(&self, other: &ClosureColor) -> ClosureColor {
        self.add(&other.negate())
    }

    /// Scale every component by a color
    pub fn scale(&self, weight: Vec3) -> ClosureColor {
        match &self.root {
            None => Self::empty(),
            Some(node) => Self {
                root: Some(Arc::new(ClosureNode::Mul(weight, node.clone()))),
            },
        }
    }

    /// Scale every component by a scalar
    pub fn scale_scalar(&self, weight: f32) -> ClosureColor {
        self.scale(Vec3::splat(weight))
    }

    /// `-self`
    pub fn negate(&self) -> ClosureColor {
        self.scale_scalar(-1.0)
    }

    /// Weighted components in depth-first order
    pub fn flatten(&self) -> Vec<WeightedBsdf> {
        let mut terms = Vec::new();
        if let Some(root) = &self.root {
            collect(root, Vec3::ONE, &mut terms);
        }
        terms
    }

    /// Number of components
    pub fn len(&self) -> usize {
        self.flatten().len()
    }

    /// Weighted sum of every component's evaluation
    pub fn eval(&self, omega_out: Vec3, omega_in: Vec3) -> Vec3 {
        self.flatten()
            .iter()
            .map(|term| term.weight * term.bsdf.eval(omega_out, omega_in))
            .sum()
    }

    /// True if both closures share the same root node
    pub fn ptr_eq(&self, other: &ClosureColor) -> bool {
        match (&self.root, &other.root) {
            (None, None) => true,
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

fn collect(node: &ClosureNode, weight: Vec3, terms: &mut Vec<WeightedBsdf>) {
    match node {
        ClosureNode::Component(bsdf) => terms.push(WeightedBsdf {
            weight,
            bsdf: bsdf.clone(),
        }),
        ClosureNode::Add(a, b) => {
            collect(a, weight, terms);
            collect(b, weight, terms);
        }
        ClosureNode::Mul(w, inner) => collect(inner, weight * *w, terms),
    }
}

impl fmt::Display for ClosureColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let terms = self.flatten();
        if terms.is_empty() {
            return f.write_str("(empty)");
        }
        for (i, term) in terms.iter().enumerate() {
            if i > 0 {
                f.write_str(" + ")?;
            }
            write!(
                f,
                "({}, {}, {}) * {}",
                term.weight.x,
                term.weight.y,
                term.weight.z,
                term.bsdf.name()
            )?;
        }
        Ok(())
    }
}
