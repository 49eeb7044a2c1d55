use std::collections::HashMap;
use std::ops::RangeInclusive;
use lazy_static::lazy_static;

pub const SPIRV_MAGIC: u32 = 0x07230203;
pub const HEADER_LEN: usize = 5;
/// Highest supported SPIR-V version, in `(major, minor)`.
pub const MAX_VERSION: (u8, u8) = (1, 6);

pub const OP_NOP: u32 = 0;
pub const OP_UNDEF: u32 = 1;
pub const OP_SOURCE_CONTINUED: u32 = 2;
pub const OP_SOURCE: u32 = 3;
pub const OP_SOURCE_EXTENSION: u32 = 4;
pub const OP_NAME: u32 = 5;
pub const OP_MEMBER_NAME: u32 = 6;
pub const OP_STRING: u32 = 7;
pub const OP_LINE: u32 = 8;
pub const OP_EXTENSION: u32 = 10;
pub const OP_EXT_INST_IMPORT: u32 = 11;
pub const OP_EXT_INST: u32 = 12;
pub const OP_MEMORY_MODEL: u32 = 14;
pub const OP_ENTRY_POINT: u32 = 15;
pub const OP_EXECUTION_MODE: u32 = 16;
pub const OP_CAPABILITY: u32 = 17;

pub const OP_TYPE_VOID: u32 = 19;
pub const OP_TYPE_BOOL: u32 = 20;
pub const OP_TYPE_INT: u32 = 21;
pub const OP_TYPE_FLOAT: u32 = 22;
pub const OP_TYPE_VECTOR: u32 = 23;
pub const OP_TYPE_MATRIX: u32 = 24;
pub const OP_TYPE_IMAGE: u32 = 25;
pub const OP_TYPE_SAMPLER: u32 = 26;
pub const OP_TYPE_SAMPLED_IMAGE: u32 = 27;
pub const OP_TYPE_ARRAY: u32 = 28;
pub const OP_TYPE_RUNTIME_ARRAY: u32 = 29;
pub const OP_TYPE_STRUCT: u32 = 30;
pub const OP_TYPE_OPAQUE: u32 = 31;
pub const OP_TYPE_POINTER: u32 = 32;
pub const OP_TYPE_FUNCTION: u32 = 33;
pub const OP_TYPE_EVENT: u32 = 34;
pub const OP_TYPE_DEVICE_EVENT: u32 = 35;
pub const OP_TYPE_RESERVE_ID: u32 = 36;
pub const OP_TYPE_QUEUE: u32 = 37;
pub const OP_TYPE_PIPE: u32 = 38;
pub const OP_TYPE_FORWARD_POINTER: u32 = 39;
pub const OP_TYPE_PIPE_STORAGE: u32 = 322;
pub const OP_TYPE_NAMED_BARRIER: u32 = 327;
pub const OP_TYPE_RAY_QUERY_KHR: u32 = 4472;
pub const OP_TYPE_ACCELERATION_STRUCTURE_KHR: u32 = 5341;

pub const OP_CONSTANT_TRUE: u32 = 41;
pub const OP_CONSTANT_FALSE: u32 = 42;
pub const OP_CONSTANT: u32 = 43;
pub const OP_CONSTANT_COMPOSITE: u32 = 44;
pub const OP_CONSTANT_SAMPLER: u32 = 45;
pub const OP_CONSTANT_NULL: u32 = 46;
pub const OP_CONSTANT_PIPE_STORAGE: u32 = 323;

pub const OP_SPEC_CONSTANT_TRUE: u32 = 48;
pub const OP_SPEC_CONSTANT_FALSE: u32 = 49;
pub const OP_SPEC_CONSTANT: u32 = 50;
pub const OP_SPEC_CONSTANT_COMPOSITE: u32 = 51;
pub const OP_SPEC_CONSTANT_OP: u32 = 52;

pub const OP_FUNCTION: u32 = 54;
pub const OP_FUNCTION_PARAMETER: u32 = 55;
pub const OP_FUNCTION_END: u32 = 56;
pub const OP_FUNCTION_CALL: u32 = 57;
pub const OP_VARIABLE: u32 = 59;
pub const OP_IMAGE_TEXEL_POINTER: u32 = 60;
pub const OP_LOAD: u32 = 61;
pub const OP_STORE: u32 = 62;
pub const OP_COPY_MEMORY: u32 = 63;
pub const OP_COPY_MEMORY_SIZED: u32 = 64;
pub const OP_ACCESS_CHAIN: u32 = 65;
pub const OP_IN_BOUNDS_ACCESS_CHAIN: u32 = 66;
pub const OP_PTR_ACCESS_CHAIN: u32 = 67;
pub const OP_ARRAY_LENGTH: u32 = 68;
pub const OP_IN_BOUNDS_PTR_ACCESS_CHAIN: u32 = 70;

pub const OP_DECORATE: u32 = 71;
pub const OP_MEMBER_DECORATE: u32 = 72;
pub const OP_DECORATION_GROUP: u32 = 73;
pub const OP_GROUP_DECORATE: u32 = 74;
pub const OP_GROUP_MEMBER_DECORATE: u32 = 75;
pub const OP_DECORATE_ID: u32 = 332;
pub const OP_DECORATE_STRING: u32 = 5632;
pub const OP_MEMBER_DECORATE_STRING: u32 = 5633;

pub const OP_VECTOR_SHUFFLE: u32 = 79;
pub const OP_COMPOSITE_EXTRACT: u32 = 81;
pub const OP_COMPOSITE_INSERT: u32 = 82;
pub const OP_COPY_OBJECT: u32 = 83;
pub const OP_SAMPLED_IMAGE: u32 = 86;

pub const OP_S_CONVERT: u32 = 114;
pub const OP_U_CONVERT: u32 = 113;
pub const OP_S_NEGATE: u32 = 126;
pub const OP_I_ADD: u32 = 128;
pub const OP_I_SUB: u32 = 130;
pub const OP_I_MUL: u32 = 132;
pub const OP_U_DIV: u32 = 134;
pub const OP_S_DIV: u32 = 135;
pub const OP_U_MOD: u32 = 137;
pub const OP_S_REM: u32 = 138;
pub const OP_S_MOD: u32 = 139;
pub const OP_LOGICAL_EQUAL: u32 = 164;
pub const OP_LOGICAL_NOT_EQUAL: u32 = 165;
pub const OP_LOGICAL_OR: u32 = 166;
pub const OP_LOGICAL_AND: u32 = 167;
pub const OP_LOGICAL_NOT: u32 = 168;
pub const OP_SELECT: u32 = 169;
pub const OP_I_EQUAL: u32 = 170;
pub const OP_I_NOT_EQUAL: u32 = 171;
pub const OP_U_GREATER_THAN: u32 = 172;
pub const OP_S_GREATER_THAN: u32 = 173;
pub const OP_U_GREATER_THAN_EQUAL: u32 = 174;
pub const OP_S_GREATER_THAN_EQUAL: u32 = 175;
pub const OP_U_LESS_THAN: u32 = 176;
pub const OP_S_LESS_THAN: u32 = 177;
pub const OP_U_LESS_THAN_EQUAL: u32 = 178;
pub const OP_S_LESS_THAN_EQUAL: u32 = 179;
pub const OP_SHIFT_RIGHT_LOGICAL: u32 = 194;
pub const OP_SHIFT_RIGHT_ARITHMETIC: u32 = 195;
pub const OP_SHIFT_LEFT_LOGICAL: u32 = 196;
pub const OP_BITWISE_OR: u32 = 197;
pub const OP_BITWISE_XOR: u32 = 198;
pub const OP_BITWISE_AND: u32 = 199;
pub const OP_NOT: u32 = 200;

pub const OP_ATOMIC_LOAD: u32 = 227;
pub const OP_ATOMIC_STORE: u32 = 228;
/// Atomics taking `result type, result id, pointer, ...`.
pub const ATOMIC_RMW_RANGE: RangeInclusive<u32> = 229..=242;
pub const OP_ATOMIC_I_ADD: u32 = 234;
pub const OP_ATOMIC_FLAG_TEST_AND_SET: u32 = 318;
pub const OP_ATOMIC_FLAG_CLEAR: u32 = 319;
pub const OP_ATOMIC_F_MIN_EXT: u32 = 5614;
pub const OP_ATOMIC_F_MAX_EXT: u32 = 5615;
pub const OP_ATOMIC_F_ADD_EXT: u32 = 6035;

pub const OP_NO_LINE: u32 = 317;
pub const OP_MODULE_PROCESSED: u32 = 330;
pub const OP_EXECUTION_MODE_ID: u32 = 331;


pub const DECO_SPEC_ID: u32 = 1;
pub const DECO_BLOCK: u32 = 2;
pub const DECO_BUFFER_BLOCK: u32 = 3;
pub const DECO_ROW_MAJOR: u32 = 4;
pub const DECO_COL_MAJOR: u32 = 5;
pub const DECO_ARRAY_STRIDE: u32 = 6;
pub const DECO_MATRIX_STRIDE: u32 = 7;
pub const DECO_BUILT_IN: u32 = 11;
pub const DECO_NON_WRITABLE: u32 = 24;
pub const DECO_NON_READABLE: u32 = 25;
pub const DECO_LOCATION: u32 = 30;
pub const DECO_COMPONENT: u32 = 31;
pub const DECO_BINDING: u32 = 33;
pub const DECO_DESCRIPTOR_SET: u32 = 34;
pub const DECO_OFFSET: u32 = 35;
pub const DECO_INPUT_ATTACHMENT_INDEX: u32 = 43;

pub const BUILT_IN_WORKGROUP_SIZE: u32 = 25;

pub const EXEC_MODE_ORIGIN_UPPER_LEFT: u32 = 7;
pub const EXEC_MODE_LOCAL_SIZE: u32 = 17;
pub const EXEC_MODE_LOCAL_SIZE_HINT: u32 = 18;
pub const EXEC_MODE_LOCAL_SIZE_ID: u32 = 38;


/// Operand layout of instructions that touch memory through a pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessShape {
    /// `result type, result id, pointer, ...`; the result is derived from the
    /// pointer (loads, access chains, copies, texel pointers).
    Derive,
    /// `result type, result id, pointer, ...`; the result is a plain value.
    Read,
    /// `pointer, ...`
    Write,
    /// `target pointer, source pointer, ...`
    Copy,
}

/// How the graph builder treats an opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpClass {
    /// Carries nothing reflection cares about.
    Ignore,
    EntryPoint,
    ExecutionMode,
    ExecutionModeId,
    Name,
    MemberName,
    Decorate,
    MemberDecorate,
    Type,
    Constant,
    SpecConstant,
    Composite,
    SpecConstantOp,
    Variable,
    Function,
    FunctionEnd,
    FunctionCall,
    Access(AccessShape),
    SampledImage,
    /// Declares an entity of a shape reflection doesn't understand.
    Unsupported,
}

lazy_static! {
    /// The single place deciding which instructions are understood. Opcodes
    /// missing from this table are skipped in function bodies and rejected at
    /// module scope.
    pub static ref OP_CLASSES: HashMap<u32, OpClass> = {
        use OpClass::*;
        let mut m = HashMap::new();
        for &op in &[
            OP_NOP, OP_UNDEF, OP_SOURCE_CONTINUED, OP_SOURCE,
            OP_SOURCE_EXTENSION, OP_STRING, OP_LINE, OP_NO_LINE,
            OP_EXTENSION, OP_EXT_INST_IMPORT, OP_EXT_INST, OP_MEMORY_MODEL,
            OP_CAPABILITY, OP_MODULE_PROCESSED, OP_GROUP_DECORATE,
            OP_GROUP_MEMBER_DECORATE, OP_DECORATE_ID, OP_DECORATE_STRING,
            OP_MEMBER_DECORATE_STRING, OP_FUNCTION_PARAMETER,
            OP_DECORATION_GROUP,
        ] {
            m.insert(op, Ignore);
        }
        m.insert(OP_ENTRY_POINT, EntryPoint);
        m.insert(OP_EXECUTION_MODE, ExecutionMode);
        m.insert(OP_EXECUTION_MODE_ID, ExecutionModeId);
        m.insert(OP_NAME, Name);
        m.insert(OP_MEMBER_NAME, MemberName);
        m.insert(OP_DECORATE, Decorate);
        m.insert(OP_MEMBER_DECORATE, MemberDecorate);
        for &op in &[
            OP_TYPE_VOID, OP_TYPE_BOOL, OP_TYPE_INT, OP_TYPE_FLOAT,
            OP_TYPE_VECTOR, OP_TYPE_MATRIX, OP_TYPE_IMAGE, OP_TYPE_SAMPLER,
            OP_TYPE_SAMPLED_IMAGE, OP_TYPE_ARRAY, OP_TYPE_RUNTIME_ARRAY,
            OP_TYPE_STRUCT, OP_TYPE_POINTER, OP_TYPE_FORWARD_POINTER,
            OP_TYPE_FUNCTION, OP_TYPE_RAY_QUERY_KHR,
            OP_TYPE_ACCELERATION_STRUCTURE_KHR,
        ] {
            m.insert(op, Type);
        }
        for &op in &[
            OP_TYPE_OPAQUE, OP_TYPE_EVENT, OP_TYPE_DEVICE_EVENT,
            OP_TYPE_RESERVE_ID, OP_TYPE_QUEUE, OP_TYPE_PIPE,
            OP_TYPE_PIPE_STORAGE,
            OP_TYPE_NAMED_BARRIER, OP_CONSTANT_PIPE_STORAGE,
        ] {
            m.insert(op, Unsupported);
        }
        for &op in &[
            OP_CONSTANT_TRUE, OP_CONSTANT_FALSE, OP_CONSTANT,
            OP_CONSTANT_SAMPLER, OP_CONSTANT_NULL,
        ] {
            m.insert(op, Constant);
        }
        for &op in &[OP_SPEC_CONSTANT_TRUE, OP_SPEC_CONSTANT_FALSE, OP_SPEC_CONSTANT] {
            m.insert(op, SpecConstant);
        }
        m.insert(OP_CONSTANT_COMPOSITE, Composite);
        m.insert(OP_SPEC_CONSTANT_COMPOSITE, Composite);
        m.insert(OP_SPEC_CONSTANT_OP, SpecConstantOp);
        m.insert(OP_VARIABLE, Variable);
        m.insert(OP_FUNCTION, Function);
        m.insert(OP_FUNCTION_END, FunctionEnd);
        m.insert(OP_FUNCTION_CALL, FunctionCall);
        for &op in &[
            OP_LOAD, OP_ACCESS_CHAIN, OP_IN_BOUNDS_ACCESS_CHAIN,
            OP_PTR_ACCESS_CHAIN, OP_IN_BOUNDS_PTR_ACCESS_CHAIN,
            OP_IMAGE_TEXEL_POINTER, OP_COPY_OBJECT,
        ] {
            m.insert(op, Access(AccessShape::Derive));
        }
        m.insert(OP_ARRAY_LENGTH, Access(AccessShape::Read));
        m.insert(OP_ATOMIC_LOAD, Access(AccessShape::Read));
        m.insert(OP_ATOMIC_FLAG_TEST_AND_SET, Access(AccessShape::Read));
        m.insert(OP_ATOMIC_F_MIN_EXT, Access(AccessShape::Read));
        m.insert(OP_ATOMIC_F_MAX_EXT, Access(AccessShape::Read));
        m.insert(OP_ATOMIC_F_ADD_EXT, Access(AccessShape::Read));
        for op in ATOMIC_RMW_RANGE {
            m.insert(op, Access(AccessShape::Read));
        }
        m.insert(OP_STORE, Access(AccessShape::Write));
        m.insert(OP_ATOMIC_STORE, Access(AccessShape::Write));
        m.insert(OP_ATOMIC_FLAG_CLEAR, Access(AccessShape::Write));
        m.insert(OP_COPY_MEMORY, Access(AccessShape::Copy));
        m.insert(OP_COPY_MEMORY_SIZED, Access(AccessShape::Copy));
        m.insert(OP_SAMPLED_IMAGE, SampledImage);
        m
    };
}

/// Classify an opcode. `None` means the opcode is unknown to reflection.
pub fn classify(opcode: u32) -> Option<OpClass> {
    OP_CLASSES.get(&opcode).copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_ops_are_classified() {
        assert_eq!(classify(OP_TYPE_STRUCT), Some(OpClass::Type));
        assert_eq!(classify(OP_TYPE_FORWARD_POINTER), Some(OpClass::Type));
        assert_eq!(classify(OP_TYPE_PIPE), Some(OpClass::Unsupported));
        assert_eq!(classify(OP_ATOMIC_STORE), Some(OpClass::Access(AccessShape::Write)));
        assert_eq!(classify(OP_ATOMIC_I_ADD), Some(OpClass::Access(AccessShape::Read)));
        // Arithmetic doesn't matter to reflection.
        assert_eq!(classify(OP_I_ADD), None);
    }
}
