//! Type declarations, both as declared in a module and as reported after
//! reflection.
use std::fmt;
use num_derive::FromPrimitive;
use crate::parse::InstrId;

pub type TypeId = InstrId;
pub type ConstantId = InstrId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, FromPrimitive)]
pub enum ExecutionModel {
    Vertex = 0,
    TessellationControl = 1,
    TessellationEvaluation = 2,
    Geometry = 3,
    Fragment = 4,
    GLCompute = 5,
    Kernel = 6,
    TaskNV = 5267,
    MeshNV = 5268,
    RayGeneration = 5313,
    Intersection = 5314,
    AnyHit = 5315,
    ClosestHit = 5316,
    Miss = 5317,
    Callable = 5318,
    TaskEXT = 5364,
    MeshEXT = 5365,
}
impl ExecutionModel {
    /// Whether the stage is dispatched in workgroups.
    pub fn has_workgroups(&self) -> bool {
        use ExecutionModel::*;
        match self {
            GLCompute | Kernel | TaskNV | MeshNV | TaskEXT | MeshEXT => true,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, FromPrimitive)]
pub enum StorageClass {
    UniformConstant = 0,
    Input = 1,
    Uniform = 2,
    Output = 3,
    Workgroup = 4,
    CrossWorkgroup = 5,
    Private = 6,
    // Texture calls to sampler object will translate to function class.
    Function = 7,
    Generic = 8,
    PushConstant = 9,
    AtomicCounter = 10,
    Image = 11,
    StorageBuffer = 12,
    CallableData = 5328,
    IncomingCallableData = 5329,
    RayPayload = 5338,
    HitAttribute = 5339,
    IncomingRayPayload = 5342,
    ShaderRecordBuffer = 5343,
    PhysicalStorageBuffer = 5349,
    TaskPayloadWorkgroup = 5402,
}
impl StorageClass {
    /// Storage classes of variables bound through descriptors or push
    /// constants.
    pub fn is_resource(&self) -> bool {
        use StorageClass::*;
        match self {
            Uniform | UniformConstant | StorageBuffer | PushConstant => true,
            _ => false,
        }
    }
    pub fn is_interface(&self) -> bool {
        *self == StorageClass::Input || *self == StorageClass::Output
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, FromPrimitive)]
pub enum Dim {
    Dim1D = 0,
    Dim2D = 1,
    Dim3D = 2,
    Cube = 3,
    Rect = 4,
    Buffer = 5,
    SubpassData = 6,
    TileImageData = 4173,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, FromPrimitive)]
pub enum ImageFormat {
    Unknown = 0,
    Rgba32f = 1,
    Rgba16f = 2,
    R32f = 3,
    Rgba8 = 4,
    Rgba8Snorm = 5,
    Rg32f = 6,
    Rg16f = 7,
    R11fG11fB10f = 8,
    R16f = 9,
    Rgba16 = 10,
    Rgb10A2 = 11,
    Rg16 = 12,
    Rg8 = 13,
    R16 = 14,
    R8 = 15,
    Rgba16Snorm = 16,
    Rg16Snorm = 17,
    Rg8Snorm = 18,
    R16Snorm = 19,
    R8Snorm = 20,
    Rgba32i = 21,
    Rgba16i = 22,
    Rgba8i = 23,
    R32i = 24,
    Rg32i = 25,
    Rg16i = 26,
    Rg8i = 27,
    R16i = 28,
    R8i = 29,
    Rgba32ui = 30,
    Rgba16ui = 31,
    Rgba8ui = 32,
    R32ui = 33,
    Rgb10a2ui = 34,
    Rg32ui = 35,
    Rg16ui = 36,
    Rg8ui = 37,
    R16ui = 38,
    R8ui = 39,
    R64ui = 40,
    R64i = 41,
}

#[derive(Debug, Hash, Clone, Copy, PartialEq, Eq)]
pub enum MatrixAxisOrder {
    ColumnMajor,
    RowMajor,
}
impl Default for MatrixAxisOrder {
    fn default() -> MatrixAxisOrder { MatrixAxisOrder::ColumnMajor }
}

#[derive(Debug, Hash, Clone, Copy, PartialEq, Eq)]
pub enum AccessType {
    ReadOnly,
    WriteOnly,
    ReadWrite,
}
impl AccessType {
    pub(crate) fn from_decos(non_writable: bool, non_readable: bool) -> Option<AccessType> {
        match (non_writable, non_readable) {
            (true, true) => None,
            (true, false) => Some(AccessType::ReadOnly),
            (false, true) => Some(AccessType::WriteOnly),
            (false, false) => Some(AccessType::ReadWrite),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ImageType {
    /// Type of a texel component, a scalar type ID in the declaring module.
    pub unit_ty: TypeId,
    pub dim: Dim,
    /// `None` when the module doesn't tell whether it's a depth image.
    pub is_depth: Option<bool>,
    pub is_array: bool,
    pub is_multisampled: bool,
    /// `Some(true)` for sampled images, `Some(false)` for storage images,
    /// `None` if only known at runtime.
    pub is_sampled: Option<bool>,
    pub fmt: ImageFormat,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructMember {
    pub ty: TypeId,
    pub name: Option<String>,
    pub offset: Option<u32>,
    pub mat_stride: Option<u32>,
    pub mat_major: Option<MatrixAxisOrder>,
    pub non_writable: bool,
    pub non_readable: bool,
}

/// A type node in the module graph. Nested types are referred to by ID.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Type {
    Void,
    Bool,
    Int { nbit: u32, is_signed: bool },
    Float { nbit: u32 },
    Vector { elem_ty: TypeId, nelem: u32 },
    Matrix { col_ty: TypeId, ncol: u32 },
    /// `len_id` refers to the constant holding the element count.
    Array { elem_ty: TypeId, len_id: ConstantId, stride: Option<u32> },
    RuntimeArray { elem_ty: TypeId, stride: Option<u32> },
    Struct { name: Option<String>, members: Vec<StructMember>, is_buffer_block: bool },
    Pointer { store_cls: StorageClass, pointee_ty: TypeId },
    /// A `PhysicalStorageBuffer` pointer, stored as a 64-bit address. The
    /// pointee isn't an operand, so self-referencing structs stay acyclic.
    DeviceAddress { pointee_ty: TypeId },
    Image(ImageType),
    Sampler,
    /// SPIR-V `OpTypeSampledImage`, an image with its sampler state.
    SampledImage { img_ty: TypeId },
    AccelStruct,
    /// Declared but never reported, like function types and ray queries.
    Opaque,
}
impl Type {
    /// IDs of the types this type is built from.
    pub fn operand_tys(&self) -> Vec<TypeId> {
        match self {
            Type::Vector { elem_ty, .. } => vec![*elem_ty],
            Type::Matrix { col_ty, .. } => vec![*col_ty],
            Type::Array { elem_ty, .. } => vec![*elem_ty],
            Type::RuntimeArray { elem_ty, .. } => vec![*elem_ty],
            Type::Struct { members, .. } => members.iter().map(|x| x.ty).collect(),
            Type::Pointer { pointee_ty, .. } => vec![*pointee_ty],
            Type::Image(img_ty) => vec![img_ty.unit_ty],
            Type::SampledImage { img_ty } => vec![*img_ty],
            _ => Vec::new(),
        }
    }
    /// Byte width of a scalar value of this type, if it is a scalar.
    pub fn scalar_nbyte(&self) -> Option<usize> {
        match self {
            // Booleans are specialized as 32-bit values.
            Type::Bool => Some(4),
            Type::Int { nbit, .. } | Type::Float { nbit } => Some((*nbit as usize + 7) / 8),
            _ => None,
        }
    }
}

/// Where the element count of an array type comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArrayLength {
    Literal(u32),
    Specialized(ConstantId),
}


/// Index of a reported type in its reflection's type arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeIdx(pub(crate) usize);
impl TypeIdx {
    pub fn index(&self) -> usize { self.0 }
}
impl fmt::Display for TypeIdx {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MemberDesc {
    pub name: Option<String>,
    /// Byte offset from the `Offset` decoration. Interface blocks have none.
    pub offset: Option<usize>,
    pub ty: TypeIdx,
    /// Byte size of the member, `None` if unsized.
    pub nbyte: Option<usize>,
    pub mat_stride: Option<usize>,
    pub mat_major: Option<MatrixAxisOrder>,
    pub access: Option<AccessType>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StructDesc {
    pub name: Option<String>,
    pub members: Vec<MemberDesc>,
}

/// A fully concretized type. Array lengths are specialized and nested types
/// are indices into the same arena.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeDesc {
    Void,
    Bool,
    Int { nbit: u32, is_signed: bool },
    Float { nbit: u32 },
    Vector { elem: TypeIdx, nelem: u32 },
    Matrix { col: TypeIdx, ncol: u32 },
    Array { elem: TypeIdx, nelem: u32, stride: Option<usize> },
    RuntimeArray { elem: TypeIdx, stride: Option<usize> },
    Struct(StructDesc),
    Pointer { store_cls: StorageClass, pointee: TypeIdx },
    DeviceAddress,
    Image { unit: TypeIdx, dim: Dim, is_depth: Option<bool>, is_array: bool,
        is_multisampled: bool, is_sampled: Option<bool>, fmt: ImageFormat },
    Sampler,
    CombinedImageSampler { img: TypeIdx },
    AccelStruct,
}
impl TypeDesc {
    pub fn is_struct(&self) -> bool {
        if let TypeDesc::Struct(_) = self { true } else { false }
    }
    pub fn as_struct(&self) -> Option<&StructDesc> {
        if let TypeDesc::Struct(x) = self { Some(x) } else { None }
    }
}
