//! Typed views of the instructions reflection reads.
use std::convert::TryFrom;
use std::marker::PhantomData;
use crate::parse::{Instr, InstrId};
use crate::error::{Error, Result};
use crate::ty::{ConstantId, ExecutionModel, StorageClass, TypeId};

pub type FunctionId = InstrId;
pub type VariableId = InstrId;
pub type MemberIdx = u32;

macro_rules! define_ops {
    ($($opcode:ident { $($field:ident: $type:ty = $read_fn:ident(),)+ })+) => {
        $(
            #[derive(Debug)]
            pub struct $opcode<'a> {
                $( pub $field: $type, )+
                _ph: PhantomData<&'a ()>,
            }
            impl<'a> TryFrom<&Instr<'a>> for $opcode<'a> {
                type Error = Error;
                fn try_from(instr: &Instr<'a>) -> Result<Self> {
                    let mut operands = instr.operands();
                    let op = $opcode {
                        $( $field: operands.$read_fn()?, )+
                        _ph: PhantomData,
                    };
                    Ok(op)
                }
            }
        )+
    };
}

// Operands are read in declaration order, so don't reorder fields.
define_ops! {
    OpEntryPoint {
        exec_model: ExecutionModel = read_enum(),
        func_id: FunctionId = read_id(),
        name: String = read_str(),
        interface_ids: &'a [VariableId] = read_id_list(),
    }
    OpExecutionMode {
        func_id: FunctionId = read_id(),
        exec_mode: u32 = read_u32(),
        params: &'a [u32] = read_list(),
    }

    OpName {
        target_id: InstrId = read_id(),
        name: String = read_str(),
    }
    OpMemberName {
        target_id: InstrId = read_id(),
        member_idx: MemberIdx = read_u32(),
        name: String = read_str(),
    }

    OpDecorate {
        target_id: InstrId = read_id(),
        deco: u32 = read_u32(),
        params: &'a [u32] = read_list(),
    }
    OpMemberDecorate {
        target_id: InstrId = read_id(),
        member_idx: MemberIdx = read_u32(),
        deco: u32 = read_u32(),
        params: &'a [u32] = read_list(),
    }

    OpTypeNullary {
        ty_id: TypeId = read_id(),
    }
    OpTypeInt {
        ty_id: TypeId = read_id(),
        nbit: u32 = read_u32(),
        is_signed: bool = read_bool(),
    }
    OpTypeFloat {
        ty_id: TypeId = read_id(),
        nbit: u32 = read_u32(),
    }
    OpTypeVector {
        ty_id: TypeId = read_id(),
        scalar_ty_id: TypeId = read_id(),
        nscalar: u32 = read_u32(),
    }
    OpTypeMatrix {
        ty_id: TypeId = read_id(),
        vec_ty_id: TypeId = read_id(),
        nvec: u32 = read_u32(),
    }
    OpTypeImage {
        ty_id: TypeId = read_id(),
        unit_ty_id: TypeId = read_id(),
        dim: u32 = read_u32(),
        is_depth: u32 = read_u32(),
        is_array: bool = read_bool(),
        is_multisampled: bool = read_bool(),
        is_sampled: u32 = read_u32(),
        color_fmt: u32 = read_u32(),
    }
    OpTypeSampledImage {
        ty_id: TypeId = read_id(),
        img_ty_id: TypeId = read_id(),
    }
    OpTypeArray {
        ty_id: TypeId = read_id(),
        proto_ty_id: TypeId = read_id(),
        nrepeat_const_id: ConstantId = read_id(),
    }
    OpTypeRuntimeArray {
        ty_id: TypeId = read_id(),
        proto_ty_id: TypeId = read_id(),
    }
    OpTypeStruct {
        ty_id: TypeId = read_id(),
        member_ty_ids: &'a [TypeId] = read_id_list(),
    }
    OpTypePointer {
        ty_id: TypeId = read_id(),
        store_cls: StorageClass = read_enum(),
        target_ty_id: TypeId = read_id(),
    }
    OpTypeForwardPointer {
        ty_id: TypeId = read_id(),
        store_cls: StorageClass = read_enum(),
    }

    OpConstantCommon {
        ty_id: TypeId = read_id(),
        const_id: ConstantId = read_id(),
        value: &'a [u32] = read_list(),
    }
    OpConstantComposite {
        ty_id: TypeId = read_id(),
        const_id: ConstantId = read_id(),
        constituents: &'a [ConstantId] = read_id_list(),
    }
    OpSpecConstantOp {
        ty_id: TypeId = read_id(),
        const_id: ConstantId = read_id(),
        opcode: u32 = read_u32(),
        operands: &'a [u32] = read_list(),
    }
    OpVariable {
        ty_id: TypeId = read_id(),
        var_id: VariableId = read_id(),
        store_cls: StorageClass = read_enum(),
    }

    OpFunction {
        return_ty_id: TypeId = read_id(),
        func_id: FunctionId = read_id(),
    }
    OpFunctionCall {
        return_ty_id: TypeId = read_id(),
        return_id: InstrId = read_id(),
        func_id: FunctionId = read_id(),
        args: &'a [InstrId] = read_id_list(),
    }
    // Loads, access chains and other instructions yielding a value computed
    // from a pointer.
    OpPointerRead {
        return_ty_id: TypeId = read_id(),
        return_id: InstrId = read_id(),
        ptr_id: InstrId = read_id(),
    }
    OpPointerWrite {
        ptr_id: InstrId = read_id(),
    }
    OpPointerCopy {
        dst_ptr_id: InstrId = read_id(),
        src_ptr_id: InstrId = read_id(),
    }
    OpSampledImage {
        return_ty_id: TypeId = read_id(),
        return_id: InstrId = read_id(),
        img_id: InstrId = read_id(),
        sampler_id: InstrId = read_id(),
    }
}
