//! Shading-state record
//!
//! `ShaderGlobals` is the fixed-layout structure through which the renderer
//! supplies per-point quantities. Generated native code reads it by byte
//! offset, so field order and types are a binary contract shared with every
//! producer of the record.

use glam::Vec3;
use std::ffi::c_void;
use std::mem::offset_of;
use std::ptr;

/// Number of fields in [`ShaderGlobals`]
pub const SHADER_GLOBALS_FIELDS: usize = 30;

/// Storage type of one state-record field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    /// Three packed f32
    Vec3,
    /// One f32
    Float,
    /// Opaque pointer
    Pointer,
    /// i32 flag
    Int,
}

/// Per-point renderer state, laid out exactly as generated code expects.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct ShaderGlobals {
    /// Surface position
    pub p: [f32; 3],
    /// dP/dx
    pub dp_dx: [f32; 3],
    /// dP/dy
    pub dp_dy: [f32; 3],
    /// Incident ray direction
    pub i: [f32; 3],
    /// dI/dx
    pub di_dx: [f32; 3],
    /// dI/dy
    pub di_dy: [f32; 3],
    /// Shading normal
    pub n: [f32; 3],
    /// Geometric normal
    pub ng: [f32; 3],
    /// Surface parameter u
    pub u: f32,
    /// Surface parameter v
    pub v: f32,
    /// du/dx
    pub du_dx: f32,
    /// du/dy
    pub du_dy: f32,
    /// dv/dx
    pub dv_dx: f32,
    /// dv/dy
    pub dv_dy: f32,
    /// dP/du
    pub dp_du: [f32; 3],
    /// dP/dv
    pub dp_dv: [f32; 3],
    /// Shutter time
    pub time: f32,
    /// Time derivative
    pub dtime: f32,
    /// dP/dtime
    pub dp_dtime: [f32; 3],
    /// Light position (light shaders)
    pub ps: [f32; 3],
    /// dPs/dx
    pub dps_dx: [f32; 3],
    /// dPs/dy
    pub dps_dy: [f32; 3],
    /// Renderer state, opaque to shading
    pub renderstate: *mut c_void,
    /// Object-to-common transform, opaque
    pub object2common: *mut c_void,
    /// Shader-to-common transform, opaque
    pub shader2common: *mut c_void,
    /// Output closure
    pub ci: *mut c_void,
    /// Area of the surface element
    pub surfacearea: f32,
    /// Nonzero for camera rays
    pub iscameraray: i32,
    /// Nonzero for shadow rays
    pub isshadowray: i32,
    /// Nonzero when the object transform flips handedness
    pub flip_handedness: i32,
}

/// A field's value read by index
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue {
    /// Vector field
    Vec3(Vec3),
    /// Float field
    Float(f32),
    /// Integer flag
    Int(i32),
    /// Opaque pointer field
    Pointer,
}

/// Field types in declaration order
pub const FIELD_TYPES: [FieldType; SHADER_GLOBALS_FIELDS] = [
    FieldType::Vec3,
    FieldType::Vec3,
    FieldType::Vec3,
    FieldType::Vec3,
    FieldType::Vec3,
    FieldType::Vec3,
    FieldType::Vec3,
    FieldType::Vec3,
    FieldType::Float,
    FieldType::Float,
    FieldType::Float,
    FieldType::Float,
    FieldType::Float,
    FieldType::Float,
    FieldType::Vec3,
    FieldType::Vec3,
    FieldType::Float,
    FieldType::Float,
    FieldType::Vec3,
    FieldType::Vec3,
    FieldType::Vec3,
    FieldType::Vec3,
    FieldType::Pointer,
    FieldType::Pointer,
    FieldType::Pointer,
    FieldType::Pointer,
    FieldType::Float,
    FieldType::Int,
    FieldType::Int,
    FieldType::Int,
];

/// Byte offset of every field in declaration order
pub const FIELD_OFFSETS: [usize; SHADER_GLOBALS_FIELDS] = [
    offset_of!(ShaderGlobals, p),
    offset_of!(ShaderGlobals, dp_dx),
    offset_of!(ShaderGlobals, dp_dy),
    offset_of!(ShaderGlobals, i),
    offset_of!(ShaderGlobals, di_dx),
    offset_of!(ShaderGlobals, di_dy),
    offset_of!(ShaderGlobals, n),
    offset_of!(ShaderGlobals, ng),
    offset_of!(ShaderGlobals, u),
    offset_of!(ShaderGlobals, v),
    offset_of!(ShaderGlobals, du_dx),
    offset_of!(ShaderGlobals, du_dy),
    offset_of!(ShaderGlobals, dv_dx),
    offset_of!(ShaderGlobals, dv_dy),
    offset_of!(ShaderGlobals, dp_du),
    offset_of!(ShaderGlobals, dp_dv),
    offset_of!(ShaderGlobals, time),
    offset_of!(ShaderGlobals, dtime),
    offset_of!(ShaderGlobals, dp_dtime),
    offset_of!(ShaderGlobals, ps),
    offset_of!(ShaderGlobals, dps_dx),
    offset_of!(ShaderGlobals, dps_dy),
    offset_of!(ShaderGlobals, renderstate),
    offset_of!(ShaderGlobals, object2common),
    offset_of!(ShaderGlobals, shader2common),
    offset_of!(ShaderGlobals, ci),
    offset_of!(ShaderGlobals, surfacearea),
    offset_of!(ShaderGlobals, iscameraray),
    offset_of!(ShaderGlobals, isshadowray),
    offset_of!(ShaderGlobals, flip_handedness),
];

/// Global names a shader may read, in field order of their value plane
pub const GLOBAL_NAMES: [&str; 12] = [
    "P", "I", "N", "Ng", "u", "v", "dPdu", "dPdv", "time", "dtime", "dPdtime", "Ps",
];

/// Map a global name and derivative plane (0 value, 1 d/dx, 2 d/dy) to its
/// field index. Planes the record does not carry map to `None`.
pub fn global_field(name: &str, plane: usize) -> Option<usize> {
    let planes: &[usize] = match name {
        "P" => &[0, 1, 2],
        "I" => &[3, 4, 5],
        "N" => &[6],
        "Ng" => &[7],
        "u" => &[8, 10, 11],
        "v" => &[9, 12, 13],
        "dPdu" => &[14],
        "dPdv" => &[15],
        "time" => &[16],
        "dtime" => &[17],
        "dPdtime" => &[18],
        "Ps" => &[19, 20, 21],
        _ => return None,
    };
    planes.get(plane).copied()
}

/// True if `name` is a recognized global
pub fn is_global_name(name: &str) -> bool {
    global_field(name, 0).is_some()
}

impl ShaderGlobals {
    /// A zeroed record with null pointers
    pub fn new() -> Self {
        Self {
            p: [0.0; 3],
            dp_dx: [0.0; 3],
            dp_dy: [0.0; 3],
            i: [0.0; 3],
            di_dx: [0.0; 3],
            di_dy: [0.0; 3],
            n: [0.0; 3],
            ng: [0.0; 3],
            u: 0.0,
            v: 0.0,
            du_dx: 0.0,
            du_dy: 0.0,
            dv_dx: 0.0,
            dv_dy: 0.0,
            dp_du: [0.0; 3],
            dp_dv: [0.0; 3],
            time: 0.0,
            dtime: 0.0,
            dp_dtime: [0.0; 3],
            ps: [0.0; 3],
            dps_dx: [0.0; 3],
            dps_dy: [0.0; 3],
            renderstate: ptr::null_mut(),
            object2common: ptr::null_mut(),
            shader2common: ptr::null_mut(),
            ci: ptr::null_mut(),
            surfacearea: 0.0,
            iscameraray: 0,
            isshadowray: 0,
            flip_handedness: 0,
        }
    }

    /// Read a field by index
    pub fn field(&self, index: usize) -> Option<FieldValue> {
        let vec = |v: &[f32; 3]| Some(FieldValue::Vec3(Vec3::from_array(*v)));
        match index {
            0 => vec(&self.p),
            1 => vec(&self.dp_dx),
            2 => vec(&self.dp_dy),
            3 => vec(&self.i),
            4 => vec(&self.di_dx),
            5 => vec(&self.di_dy),
            6 => vec(&self.n),
            7 => vec(&self.ng),
            8 => Some(FieldValue::Float(self.u)),
            9 => Some(FieldValue::Float(self.v)),
            10 => Some(FieldValue::Float(self.du_dx)),
            11 => Some(FieldValue::Float(self.du_dy)),
            12 => Some(FieldValue::Float(self.dv_dx)),
            13 => Some(FieldValue::Float(self.dv_dy)),
            14 => vec(&self.dp_du),
            15 => vec(&self.dp_dv),
            16 => Some(FieldValue::Float(self.time)),
            17 => Some(FieldValue::Float(self.dtime)),
            18 => vec(&self.dp_dtime),
            19 => vec(&self.ps),
            20 => vec(&self.dps_dx),
            21 => vec(&self.dps_dy),
            22..=25 => Some(FieldValue::Pointer),
            26 => Some(FieldValue::Float(self.surfacearea)),
            27 => Some(FieldValue::Int(self.iscameraray)),
            28 => Some(FieldValue::Int(self.isshadowray)),
            29 => Some(FieldValue::Int(self.flip_handedness)),
            _ => None,
        }
    }

    /// Read a global by name and plane; planes the record lacks read as zero
    pub fn global(&self, name: &str, plane: usize) -> Option<FieldValue> {
        if !is_global_name(name) {
            return None;
        }
        match global_field(name, plane) {
            Some(index) => self.field(index),
            None => match self.field(global_field(name, 0)?)? {
                FieldValue::Vec3(_) => Some(FieldValue::Vec3(Vec3::ZERO)),
                FieldValue::Float(_) => Some(FieldValue::Float(0.0)),
                other => Some(other),
            },
        }
    }

    /// Set the position and its screen-space derivatives
    pub fn with_position(mut self, p: Vec3, dp_dx: Vec3, dp_dy: Vec3) -> Self {
        self.p = p.to_array();
        self.dp_dx = dp_dx.to_array();
        self.dp_dy = dp_dy.to_array();
        self
    }

    /// Set the shading and geometric normals
    pub fn with_normal(mut self, n: Vec3) -> Self {
        self.n = n.to_array();
        self.ng = n.to_array();
        self
    }

    /// Set the incident direction
    pub fn with_incident(mut self, i: Vec3) -> Self {
        self.i = i.to_array();
        self
    }

    /// Set surface parameters
    pub fn with_uv(mut self, u: f32, v: f32) -> Self {
        self.u = u;
        self.v = v;
        self
    }
}

impl Default for ShaderGlobals {
    fn default() -> Self {
        Self::new()
    }
}
