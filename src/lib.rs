//! SPIR-V Reflection
//!
//! Reflect SPIR-V binaries offline and extract, per entry point, the
//! descriptor bindings, push constants, stage inputs and outputs,
//! specialization constants and workgroup size a pipeline layout has to
//! agree with.
//!
//! ```ignore
//! let refl = ReflectConfig::new()
//!     .spv(words)
//!     .combine_img_samplers(true)
//!     .specialize(0, 64u32.to_le_bytes().to_vec())
//!     .reflect()?;
//! for entry_point in refl.entry_points() {
//!     for desc in entry_point.descs.iter() {
//!         println!("{}", desc);
//!     }
//! }
//! ```
pub mod error;
pub mod consts;
pub mod parse;
mod instr;
pub mod ty;
pub mod graph;
pub mod spec;
pub mod analysis;
pub mod combine;
pub mod reflect;
pub mod walk;
pub mod handle;

#[cfg(test)]
mod test_utils;

pub use error::{Error, Result};
pub use parse::{InstrId, ModuleHeader, SpirvBinary};
pub use instr::{FunctionId, MemberIdx, VariableId};
pub use ty::{AccessType, Dim, ExecutionModel, ImageFormat, MatrixAxisOrder,
    MemberDesc, StorageClass, StructDesc, TypeDesc, TypeIdx};
pub use spec::ConstantValue;
pub use reflect::{DescriptorBinding, DescriptorType, EntryPoint,
    ExecutionMode, ExecutionModeOperand, InterfaceVariable, PushConstantBlock,
    ReflectConfig, Reflection, SpecConstantVar};
pub use walk::{MemberRoute, Walk};
pub use handle::{EntryPointRef, ReflectionHandle};
