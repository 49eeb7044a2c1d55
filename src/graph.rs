//! ID-indexed tables built from a single pass over a module.
use std::convert::TryFrom;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::collections::hash_map::Entry::Vacant;
use log::debug;
use num_traits::FromPrimitive;
use crate::consts::*;
use crate::error::{Error, Result};
use crate::instr::*;
use crate::parse::{check_id, Instr, InstrId, ModuleHeader, SpirvModule};
use crate::ty::*;

#[derive(Debug, Clone)]
pub struct EntryPointDecl {
    pub name: String,
    pub exec_model: ExecutionModel,
    pub func_id: FunctionId,
    pub interface_ids: Vec<VariableId>,
}

#[derive(Debug, Clone)]
pub enum ExecutionModeParams<'a> {
    Literals(&'a [u32]),
    /// `OpExecutionModeId` operands, each a constant ID.
    Ids(&'a [ConstantId]),
}
#[derive(Debug, Clone)]
pub struct ExecutionModeDecl<'a> {
    pub exec_mode: u32,
    pub params: ExecutionModeParams<'a>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstantKind<'a> {
    Bool(bool),
    /// Scalar value words, low-order word first.
    Scalar(&'a [u32]),
    Composite(&'a [ConstantId]),
    SpecOp { opcode: u32, operands: &'a [u32] },
    /// Null and sampler constants; no value to fold.
    Opaque,
}
#[derive(Debug, Clone, Copy)]
pub struct Constant<'a> {
    pub ty: TypeId,
    pub kind: ConstantKind<'a>,
    pub is_spec: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct Variable {
    /// Pointer type of the variable.
    pub ty: TypeId,
    pub store_cls: StorageClass,
}

#[derive(Debug, Default, Clone)]
pub struct Function {
    /// Module-level variables touched by the function body.
    pub accessed_vars: HashSet<VariableId>,
    pub callees: HashSet<FunctionId>,
    /// `(image, sampler)` operands of `OpSampledImage`, resolved to the
    /// variables they were loaded from where possible.
    pub sampled_imgs: Vec<(InstrId, InstrId)>,
}

type DecoKey = (InstrId, Option<MemberIdx>, u32);
type NameKey = (InstrId, Option<MemberIdx>);

#[derive(Debug)]
pub struct ModuleGraph<'a> {
    header: ModuleHeader,
    pub entry_points: Vec<EntryPointDecl>,
    pub exec_modes: HashMap<FunctionId, Vec<ExecutionModeDecl<'a>>>,
    pub ty_map: HashMap<TypeId, Type>,
    /// Type IDs ordered so that every type follows the types it's built from.
    pub ty_order: Vec<TypeId>,
    pub const_map: HashMap<ConstantId, Constant<'a>>,
    /// Constant IDs in declaration order.
    pub const_order: Vec<ConstantId>,
    pub var_map: BTreeMap<VariableId, Variable>,
    pub func_map: HashMap<FunctionId, Function>,
    deco_map: HashMap<DecoKey, &'a [u32]>,
    name_map: HashMap<NameKey, String>,
    /// Result IDs of pointer-derived values mapped to the variable they came
    /// from.
    derived: HashMap<InstrId, VariableId>,
    /// Pointer types declared by `OpTypeForwardPointer`.
    fwd_ptrs: HashSet<TypeId>,
}
impl<'a> ModuleGraph<'a> {
    pub fn build(module: &SpirvModule<'a>) -> Result<ModuleGraph<'a>> {
        let mut graph = ModuleGraph {
            header: *module.header(),
            entry_points: Vec::new(),
            exec_modes: HashMap::new(),
            ty_map: HashMap::new(),
            ty_order: Vec::new(),
            const_map: HashMap::new(),
            const_order: Vec::new(),
            var_map: BTreeMap::new(),
            func_map: HashMap::new(),
            deco_map: HashMap::new(),
            name_map: HashMap::new(),
            derived: HashMap::new(),
            fwd_ptrs: HashSet::new(),
        };
        let mut cur_func: Option<(FunctionId, Function)> = None;
        for instr in module.instrs() {
            let instr = instr?;
            graph.populate_one(&instr, &mut cur_func)?;
        }
        if cur_func.is_some() {
            return Err(Error::corrupted("function is not terminated"));
        }
        graph.finalize()?;
        debug!("built module graph: {} types, {} constants, {} variables, {} functions",
            graph.ty_map.len(), graph.const_map.len(), graph.var_map.len(),
            graph.func_map.len());
        Ok(graph)
    }
    pub fn header(&self) -> &ModuleHeader { &self.header }

    fn populate_one(
        &mut self,
        instr: &Instr<'a>,
        cur_func: &mut Option<(FunctionId, Function)>,
    ) -> Result<()> {
        let opcode = instr.opcode();
        let cls = match classify(opcode) {
            Some(x) => x,
            // Unknown instructions in function bodies can't declare anything
            // reflection reads.
            None if cur_func.is_some() => return Ok(()),
            None => return Err(Error::unsupported(format!("unknown opcode {} at module scope", opcode))),
        };
        match cls {
            OpClass::Ignore => {},
            OpClass::Unsupported => {
                return Err(Error::unsupported(format!("opcode {}", opcode)));
            },
            OpClass::EntryPoint => {
                let op = OpEntryPoint::try_from(instr)?;
                let decl = EntryPointDecl {
                    name: op.name,
                    exec_model: op.exec_model,
                    func_id: op.func_id,
                    interface_ids: op.interface_ids.to_owned(),
                };
                self.entry_points.push(decl);
            },
            OpClass::ExecutionMode | OpClass::ExecutionModeId => {
                let op = OpExecutionMode::try_from(instr)?;
                let params = if cls == OpClass::ExecutionModeId {
                    for &id in op.params { check_id(id, self.header.bound)?; }
                    ExecutionModeParams::Ids(op.params)
                } else {
                    ExecutionModeParams::Literals(op.params)
                };
                let decl = ExecutionModeDecl { exec_mode: op.exec_mode, params };
                self.exec_modes.entry(op.func_id).or_default().push(decl);
            },
            OpClass::Name => {
                let op = OpName::try_from(instr)?;
                self.insert_name((op.target_id, None), op.name);
            },
            OpClass::MemberName => {
                let op = OpMemberName::try_from(instr)?;
                self.insert_name((op.target_id, Some(op.member_idx)), op.name);
            },
            OpClass::Decorate => {
                let op = OpDecorate::try_from(instr)?;
                self.deco_map.entry((op.target_id, None, op.deco)).or_insert(op.params);
            },
            OpClass::MemberDecorate => {
                let op = OpMemberDecorate::try_from(instr)?;
                self.deco_map.entry((op.target_id, Some(op.member_idx), op.deco))
                    .or_insert(op.params);
            },
            OpClass::Type => {
                if cur_func.is_some() {
                    return Err(Error::corrupted("type declared in function body"));
                }
                self.populate_one_ty(instr)?;
            },
            OpClass::Constant | OpClass::SpecConstant | OpClass::Composite |
            OpClass::SpecConstantOp => {
                self.populate_one_const(instr, cls)?;
            },
            OpClass::Variable => {
                // Function-local variables can't be bound to anything.
                if cur_func.is_none() {
                    self.populate_one_var(instr)?;
                }
            },
            OpClass::Function => {
                if cur_func.is_some() {
                    return Err(Error::corrupted("nested function"));
                }
                let op = OpFunction::try_from(instr)?;
                *cur_func = Some((op.func_id, Function::default()));
            },
            OpClass::FunctionEnd => {
                let (func_id, func) = cur_func.take()
                    .ok_or_else(|| Error::corrupted("unmatched function end"))?;
                if let Vacant(entry) = self.func_map.entry(func_id) {
                    entry.insert(func);
                } else {
                    return Err(Error::corrupted(format!("function {} is redefined", func_id)));
                }
            },
            OpClass::FunctionCall => {
                let op = OpFunctionCall::try_from(instr)?;
                let func = self.body_of(cur_func)?;
                func.callees.insert(op.func_id);
                let args = op.args.iter()
                    .filter_map(|x| self.resolve_var(*x))
                    .collect::<Vec<_>>();
                self.body_of(cur_func)?.accessed_vars.extend(args);
            },
            OpClass::Access(shape) => self.populate_one_access(instr, shape, cur_func)?,
            OpClass::SampledImage => {
                let op = OpSampledImage::try_from(instr)?;
                let img = self.resolve_var(op.img_id).unwrap_or(op.img_id);
                let sampler = self.resolve_var(op.sampler_id).unwrap_or(op.sampler_id);
                self.body_of(cur_func)?.sampled_imgs.push((img, sampler));
            },
        }
        Ok(())
    }
    fn body_of<'b>(&self, cur_func: &'b mut Option<(FunctionId, Function)>) -> Result<&'b mut Function> {
        cur_func.as_mut()
            .map(|x| &mut x.1)
            .ok_or_else(|| Error::corrupted("instruction is only allowed in function bodies"))
    }
    fn insert_name(&mut self, key: NameKey, name: String) {
        if !name.is_empty() {
            self.name_map.entry(key).or_insert(name);
        }
    }
    /// Find the module-level variable an ID is, or was derived from.
    fn resolve_var(&self, id: InstrId) -> Option<VariableId> {
        if self.var_map.contains_key(&id) {
            Some(id)
        } else {
            self.derived.get(&id).copied()
        }
    }
    fn populate_one_access(
        &mut self,
        instr: &Instr<'a>,
        shape: AccessShape,
        cur_func: &mut Option<(FunctionId, Function)>,
    ) -> Result<()> {
        let mut accessed = Vec::with_capacity(2);
        match shape {
            AccessShape::Derive | AccessShape::Read => {
                let op = OpPointerRead::try_from(instr)?;
                if let Some(var_id) = self.resolve_var(op.ptr_id) {
                    accessed.push(var_id);
                    if shape == AccessShape::Derive {
                        self.derived.insert(op.return_id, var_id);
                    }
                }
            },
            AccessShape::Write => {
                let op = OpPointerWrite::try_from(instr)?;
                accessed.extend(self.resolve_var(op.ptr_id));
            },
            AccessShape::Copy => {
                let op = OpPointerCopy::try_from(instr)?;
                accessed.extend(self.resolve_var(op.dst_ptr_id));
                accessed.extend(self.resolve_var(op.src_ptr_id));
            },
        }
        self.body_of(cur_func)?.accessed_vars.extend(accessed);
        Ok(())
    }
    fn populate_one_ty(&mut self, instr: &Instr<'a>) -> Result<()> {
        if instr.opcode() == OP_TYPE_FORWARD_POINTER {
            // The pointer itself is declared later by `OpTypePointer`.
            let op = OpTypeForwardPointer::try_from(instr)?;
            self.fwd_ptrs.insert(op.ty_id);
            return Ok(());
        }
        let (key, value) = match instr.opcode() {
            OP_TYPE_VOID => (OpTypeNullary::try_from(instr)?.ty_id, Type::Void),
            OP_TYPE_BOOL => (OpTypeNullary::try_from(instr)?.ty_id, Type::Bool),
            OP_TYPE_INT => {
                let op = OpTypeInt::try_from(instr)?;
                (op.ty_id, Type::Int { nbit: op.nbit, is_signed: op.is_signed })
            },
            OP_TYPE_FLOAT => {
                let op = OpTypeFloat::try_from(instr)?;
                (op.ty_id, Type::Float { nbit: op.nbit })
            },
            OP_TYPE_VECTOR => {
                let op = OpTypeVector::try_from(instr)?;
                (op.ty_id, Type::Vector { elem_ty: op.scalar_ty_id, nelem: op.nscalar })
            },
            OP_TYPE_MATRIX => {
                let op = OpTypeMatrix::try_from(instr)?;
                (op.ty_id, Type::Matrix { col_ty: op.vec_ty_id, ncol: op.nvec })
            },
            OP_TYPE_IMAGE => {
                let op = OpTypeImage::try_from(instr)?;
                let dim = Dim::from_u32(op.dim)
                    .ok_or_else(|| Error::unsupported(format!("image dimension {}", op.dim)))?;
                let fmt = ImageFormat::from_u32(op.color_fmt)
                    .ok_or_else(|| Error::unsupported(format!("image format {}", op.color_fmt)))?;
                let img_ty = ImageType {
                    unit_ty: op.unit_ty_id,
                    dim,
                    is_depth: match op.is_depth { 0 => Some(false), 1 => Some(true), _ => None },
                    is_array: op.is_array,
                    is_multisampled: op.is_multisampled,
                    is_sampled: match op.is_sampled { 1 => Some(true), 2 => Some(false), _ => None },
                    fmt,
                };
                (op.ty_id, Type::Image(img_ty))
            },
            OP_TYPE_SAMPLER => (OpTypeNullary::try_from(instr)?.ty_id, Type::Sampler),
            OP_TYPE_SAMPLED_IMAGE => {
                let op = OpTypeSampledImage::try_from(instr)?;
                (op.ty_id, Type::SampledImage { img_ty: op.img_ty_id })
            },
            OP_TYPE_ARRAY => {
                let op = OpTypeArray::try_from(instr)?;
                let arr_ty = Type::Array {
                    elem_ty: op.proto_ty_id,
                    len_id: op.nrepeat_const_id,
                    stride: None,
                };
                (op.ty_id, arr_ty)
            },
            OP_TYPE_RUNTIME_ARRAY => {
                let op = OpTypeRuntimeArray::try_from(instr)?;
                (op.ty_id, Type::RuntimeArray { elem_ty: op.proto_ty_id, stride: None })
            },
            OP_TYPE_STRUCT => {
                let op = OpTypeStruct::try_from(instr)?;
                let members = op.member_ty_ids.iter()
                    .map(|&ty| StructMember {
                        ty,
                        name: None,
                        offset: None,
                        mat_stride: None,
                        mat_major: None,
                        non_writable: false,
                        non_readable: false,
                    })
                    .collect();
                (op.ty_id, Type::Struct { name: None, members, is_buffer_block: false })
            },
            OP_TYPE_POINTER => {
                let op = OpTypePointer::try_from(instr)?;
                let ty = if op.store_cls == StorageClass::PhysicalStorageBuffer {
                    Type::DeviceAddress { pointee_ty: op.target_ty_id }
                } else {
                    Type::Pointer { store_cls: op.store_cls, pointee_ty: op.target_ty_id }
                };
                (op.ty_id, ty)
            },
            OP_TYPE_ACCELERATION_STRUCTURE_KHR => {
                (OpTypeNullary::try_from(instr)?.ty_id, Type::AccelStruct)
            },
            // Function types and ray queries.
            _ => (OpTypeNullary::try_from(instr)?.ty_id, Type::Opaque),
        };
        if let Vacant(entry) = self.ty_map.entry(key) {
            entry.insert(value); Ok(())
        } else { Err(Error::corrupted(format!("type {} is redefined", key))) }
    }
    fn populate_one_var(&mut self, instr: &Instr<'a>) -> Result<()> {
        let op = OpVariable::try_from(instr)?;
        let var = Variable { ty: op.ty_id, store_cls: op.store_cls };
        if self.const_map.contains_key(&op.var_id) {
            return Err(Error::corrupted(format!("variable {} is redefined", op.var_id)));
        }
        if self.var_map.insert(op.var_id, var).is_some() {
            Err(Error::corrupted(format!("variable {} is redefined", op.var_id)))
        } else { Ok(()) }
    }
    fn populate_one_const(&mut self, instr: &Instr<'a>, cls: OpClass) -> Result<()> {
        let opcode = instr.opcode();
        let (const_id, constant) = match cls {
            OpClass::Constant | OpClass::SpecConstant => {
                let op = OpConstantCommon::try_from(instr)?;
                let kind = match opcode {
                    OP_CONSTANT_TRUE | OP_SPEC_CONSTANT_TRUE => ConstantKind::Bool(true),
                    OP_CONSTANT_FALSE | OP_SPEC_CONSTANT_FALSE => ConstantKind::Bool(false),
                    OP_CONSTANT | OP_SPEC_CONSTANT => {
                        if op.value.is_empty() {
                            return Err(Error::corrupted(format!("constant {} has no value", op.const_id)));
                        }
                        ConstantKind::Scalar(op.value)
                    },
                    _ => ConstantKind::Opaque,
                };
                let is_spec = cls == OpClass::SpecConstant;
                (op.const_id, Constant { ty: op.ty_id, kind, is_spec })
            },
            OpClass::Composite => {
                let op = OpConstantComposite::try_from(instr)?;
                let kind = ConstantKind::Composite(op.constituents);
                let is_spec = opcode == OP_SPEC_CONSTANT_COMPOSITE;
                (op.const_id, Constant { ty: op.ty_id, kind, is_spec })
            },
            _ => {
                let op = OpSpecConstantOp::try_from(instr)?;
                let kind = ConstantKind::SpecOp { opcode: op.opcode, operands: op.operands };
                (op.const_id, Constant { ty: op.ty_id, kind, is_spec: true })
            },
        };
        if self.var_map.contains_key(&const_id) {
            return Err(Error::corrupted(format!("constant {} is redefined", const_id)));
        }
        if let Vacant(entry) = self.const_map.entry(const_id) {
            entry.insert(constant);
            self.const_order.push(const_id);
            Ok(())
        } else { Err(Error::corrupted(format!("constant {} is redefined", const_id))) }
    }

    fn finalize(&mut self) -> Result<()> {
        self.apply_decos();
        self.validate()?;
        self.ty_order = self.sort_tys()?;
        Ok(())
    }
    fn apply_decos(&mut self) {
        let deco_map = &self.deco_map;
        let name_map = &self.name_map;
        let has_deco = |id: InstrId, member_idx: Option<MemberIdx>, deco: u32| {
            deco_map.contains_key(&(id, member_idx, deco))
        };
        let get_deco_u32 = |id: InstrId, member_idx: Option<MemberIdx>, deco: u32| {
            deco_map.get(&(id, member_idx, deco))
                .and_then(|x| x.first())
                .copied()
        };
        for (&ty_id, ty) in self.ty_map.iter_mut() {
            match ty {
                Type::Array { stride, .. } | Type::RuntimeArray { stride, .. } => {
                    *stride = get_deco_u32(ty_id, None, DECO_ARRAY_STRIDE);
                },
                Type::Struct { name, members, is_buffer_block } => {
                    *name = name_map.get(&(ty_id, None)).cloned();
                    *is_buffer_block = has_deco(ty_id, None, DECO_BUFFER_BLOCK);
                    for (i, member) in members.iter_mut().enumerate() {
                        let i = Some(i as u32);
                        member.name = name_map.get(&(ty_id, i)).cloned();
                        member.offset = get_deco_u32(ty_id, i, DECO_OFFSET);
                        member.mat_stride = get_deco_u32(ty_id, i, DECO_MATRIX_STRIDE);
                        member.mat_major = if has_deco(ty_id, i, DECO_ROW_MAJOR) {
                            Some(MatrixAxisOrder::RowMajor)
                        } else if has_deco(ty_id, i, DECO_COL_MAJOR) {
                            Some(MatrixAxisOrder::ColumnMajor)
                        } else { None };
                        member.non_writable = has_deco(ty_id, i, DECO_NON_WRITABLE);
                        member.non_readable = has_deco(ty_id, i, DECO_NON_READABLE);
                    }
                },
                _ => {},
            }
        }
    }
    fn validate(&self) -> Result<()> {
        for (ty_id, ty) in self.ty_map.iter() {
            for operand_ty in ty.operand_tys() {
                self.get_ty(operand_ty)?;
            }
            match ty {
                Type::Array { len_id, .. } => {
                    if !self.const_map.contains_key(len_id) {
                        return Err(Error::corrupted(format!("array type {} has undeclared length {}", ty_id, len_id)));
                    }
                },
                Type::DeviceAddress { pointee_ty } => { self.get_ty(*pointee_ty)?; },
                _ => {},
            }
        }
        for ty_id in self.fwd_ptrs.iter() {
            match self.ty_map.get(ty_id) {
                Some(Type::Pointer { .. }) | Some(Type::DeviceAddress { .. }) => {},
                _ => return Err(Error::corrupted(format!("forward pointer {} is never declared", ty_id))),
            }
        }
        for (const_id, constant) in self.const_map.iter() {
            self.get_ty(constant.ty)?;
            match constant.kind {
                ConstantKind::Composite(constituents) => {
                    for x in constituents {
                        if !self.const_map.contains_key(x) {
                            return Err(Error::corrupted(format!("constant {} has undeclared constituent {}", const_id, x)));
                        }
                    }
                },
                ConstantKind::SpecOp { opcode, operands } => {
                    // Trailing operands of these are literal indices.
                    let nid = match opcode {
                        OP_COMPOSITE_EXTRACT => 1,
                        OP_VECTOR_SHUFFLE | OP_COMPOSITE_INSERT => 2,
                        _ => operands.len(),
                    };
                    for &x in operands.iter().take(nid) {
                        check_id(x, self.header.bound)?;
                        if !self.const_map.contains_key(&x) {
                            return Err(Error::corrupted(format!("constant {} has undeclared operand {}", const_id, x)));
                        }
                    }
                },
                _ => {},
            }
        }
        for (var_id, var) in self.var_map.iter() {
            match self.get_ty(var.ty)? {
                Type::Pointer { .. } => {},
                _ => return Err(Error::corrupted(format!("variable {} is not typed by a pointer", var_id))),
            }
        }
        for entry_point in self.entry_points.iter() {
            if !self.func_map.contains_key(&entry_point.func_id) {
                return Err(Error::corrupted(format!("entry point {} has no function", entry_point.name)));
            }
        }
        for func in self.func_map.values() {
            for callee in func.callees.iter() {
                if !self.func_map.contains_key(callee) {
                    return Err(Error::corrupted(format!("call to undefined function {}", callee)));
                }
            }
        }
        Ok(())
    }
    /// Topologically sort the type graph, failing on reference cycles.
    fn sort_tys(&self) -> Result<Vec<TypeId>> {
        let mut ty_ids = self.ty_map.keys().copied().collect::<Vec<_>>();
        ty_ids.sort();
        let mut order = Vec::with_capacity(ty_ids.len());
        let mut visited = HashSet::new();
        let mut on_stack = HashSet::new();
        // `(type, whether its operands are pushed)`
        let mut stack = Vec::new();
        for root in ty_ids {
            if visited.contains(&root) { continue; }
            stack.push((root, false));
            while let Some((ty_id, expanded)) = stack.pop() {
                if expanded {
                    on_stack.remove(&ty_id);
                    visited.insert(ty_id);
                    order.push(ty_id);
                    continue;
                }
                if visited.contains(&ty_id) { continue; }
                if !on_stack.insert(ty_id) {
                    return Err(Error::corrupted(format!("type {} refers to itself", ty_id)));
                }
                stack.push((ty_id, true));
                for operand_ty in self.get_ty(ty_id)?.operand_tys() {
                    if on_stack.contains(&operand_ty) {
                        return Err(Error::corrupted(format!("type {} refers to itself", operand_ty)));
                    }
                    if !visited.contains(&operand_ty) {
                        stack.push((operand_ty, false));
                    }
                }
            }
        }
        Ok(order)
    }

    pub fn get_ty(&self, ty_id: TypeId) -> Result<&Type> {
        self.ty_map.get(&ty_id)
            .ok_or_else(|| Error::corrupted(format!("type {} is not declared", ty_id)))
    }
    pub fn get_const(&self, const_id: ConstantId) -> Result<&Constant<'a>> {
        self.const_map.get(&const_id)
            .ok_or_else(|| Error::corrupted(format!("constant {} is not declared", const_id)))
    }
    pub fn get_var(&self, var_id: VariableId) -> Result<&Variable> {
        self.var_map.get(&var_id)
            .ok_or_else(|| Error::corrupted(format!("variable {} is not declared", var_id)))
    }
    /// The type a variable's pointer refers to.
    pub fn var_pointee(&self, var: &Variable) -> Result<(TypeId, &Type)> {
        if let Type::Pointer { pointee_ty, .. } = self.get_ty(var.ty)? {
            Ok((*pointee_ty, self.get_ty(*pointee_ty)?))
        } else { Err(Error::corrupted(format!("type {} is not a pointer", var.ty))) }
    }
    pub fn array_len_src(&self, len_id: ConstantId) -> Result<ArrayLength> {
        let constant = self.get_const(len_id)?;
        let len = match constant.kind {
            ConstantKind::Scalar(value) if !constant.is_spec => ArrayLength::Literal(value[0]),
            _ => ArrayLength::Specialized(len_id),
        };
        Ok(len)
    }
    pub fn has_deco(&self, id: InstrId, member_idx: Option<MemberIdx>, deco: u32) -> bool {
        self.deco_map.contains_key(&(id, member_idx, deco))
    }
    pub fn get_deco(&self, id: InstrId, member_idx: Option<MemberIdx>, deco: u32) -> Option<&'a [u32]> {
        self.deco_map.get(&(id, member_idx, deco))
            .copied()
    }
    pub fn get_deco_u32(&self, id: InstrId, member_idx: Option<MemberIdx>, deco: u32) -> Option<u32> {
        self.get_deco(id, member_idx, deco)
            .and_then(|x| x.first())
            .copied()
    }
    pub fn get_name(&self, id: InstrId, member_idx: Option<MemberIdx>) -> Option<&str> {
        self.name_map.get(&(id, member_idx))
            .map(|x| x.as_str())
    }
    /// Constants decorated with `SpecId`, mapped to their spec IDs.
    pub fn spec_ids(&self) -> impl Iterator<Item=(ConstantId, u32)> + '_ {
        self.const_order.iter()
            .filter_map(move |&const_id| {
                self.get_deco_u32(const_id, None, DECO_SPEC_ID)
                    .map(|spec_id| (const_id, spec_id))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::ModuleBuilder;

    fn build(words: &[u32]) -> Result<ModuleGraph> {
        let module = SpirvModule::new(words)?;
        ModuleGraph::build(&module)
    }

    #[test]
    fn test_forward_decorations() {
        let mut b = ModuleBuilder::new();
        let float = b.ty_float(32);
        let ty_struct = b.id();
        // Decorations and names appear before the struct is declared.
        b.member_decorate(ty_struct, 0, DECO_OFFSET, &[16]);
        b.member_name(ty_struct, 0, "a");
        b.name(ty_struct, "Foo");
        b.ty_struct_with_id(ty_struct, &[float]);
        let words = b.build();
        let graph = build(&words).unwrap();
        if let Type::Struct { name, members, .. } = graph.get_ty(ty_struct).unwrap() {
            assert_eq!(name.as_ref().map(|x| x.as_str()), Some("Foo"));
            assert_eq!(members[0].offset, Some(16));
            assert_eq!(members[0].name.as_ref().map(|x| x.as_str()), Some("a"));
        } else { panic!("not a struct"); }
        let float_pos = graph.ty_order.iter().position(|x| *x == float).unwrap();
        let struct_pos = graph.ty_order.iter().position(|x| *x == ty_struct).unwrap();
        assert!(float_pos < struct_pos);
    }
    #[test]
    fn test_cyclic_types() {
        let mut b = ModuleBuilder::new();
        let a = b.id();
        let c = b.id();
        b.ty_struct_with_id(a, &[c]);
        b.ty_struct_with_id(c, &[a]);
        let words = b.build();
        assert!(build(&words).unwrap_err().is_corrupted());
    }
    #[test]
    fn test_undeclared_operand() {
        let mut b = ModuleBuilder::new();
        let missing = b.id();
        b.ty_vec(missing, 4);
        let words = b.build();
        assert!(build(&words).unwrap_err().is_corrupted());
    }
    #[test]
    fn test_unknown_opcodes() {
        // OpLabel and OpReturn aren't in the table but live in bodies.
        let mut b = ModuleBuilder::new();
        let void = b.ty_void();
        let func = b.function(void);
        b.function_end();
        b.entry_point(ExecutionModel::GLCompute, func, "main", &[]);
        let words = b.build();
        assert!(build(&words).is_ok());

        let mut b = ModuleBuilder::new();
        b.op(4242, &[]);
        let words = b.build();
        assert!(build(&words).unwrap_err().is_unsupported());
    }
    #[test]
    fn test_unsupported_type() {
        let mut b = ModuleBuilder::new();
        let id = b.id();
        b.op(OP_TYPE_PIPE, &[id, 0]);
        let words = b.build();
        assert!(build(&words).unwrap_err().is_unsupported());
    }
    #[test]
    fn test_duplicate_result_id() {
        let mut b = ModuleBuilder::new();
        let float = b.ty_float(32);
        b.op(OP_TYPE_FLOAT, &[float, 32]);
        let words = b.build();
        assert!(build(&words).unwrap_err().is_corrupted());
    }
    #[test]
    fn test_derived_access() {
        let mut b = ModuleBuilder::new();
        let void = b.ty_void();
        let float = b.ty_float(32);
        let int = b.ty_int(32, true);
        let ty_struct = b.ty_struct(&[float]);
        let ptr = b.ty_ptr(StorageClass::Uniform, ty_struct);
        let member_ptr = b.ty_ptr(StorageClass::Uniform, float);
        let var = b.variable(ptr, StorageClass::Uniform);
        let zero = b.constant(int, 0);
        let func = b.function(void);
        let chain = b.access_chain(member_ptr, var, &[zero]);
        b.load(float, chain);
        b.function_end();
        b.entry_point(ExecutionModel::Fragment, func, "main", &[]);
        let words = b.build();
        let graph = build(&words).unwrap();
        assert!(graph.func_map[&func].accessed_vars.contains(&var));
        assert_eq!(graph.array_len_src(zero).unwrap(), ArrayLength::Literal(0));
    }
    #[test]
    fn test_spec_op_operands() {
        let mut b = ModuleBuilder::new();
        let uint = b.ty_int(32, false);
        let uvec2 = b.ty_vec(uint, 2);
        let one = b.constant(uint, 1);
        let pair = b.constant_composite(uvec2, &[one, one]);
        // The index 7 is a literal, not an ID.
        b.spec_constant_op(uint, OP_COMPOSITE_EXTRACT, &[pair, 7]);
        b.spec_constant_op(uint, OP_I_ADD, &[one, one]);
        let words = b.build();
        assert!(build(&words).is_ok());

        let mut undeclared = b.clone();
        let missing = undeclared.id();
        undeclared.spec_constant_op(uint, OP_I_MUL, &[missing, one]);
        let words = undeclared.build();
        assert!(build(&words).unwrap_err().is_corrupted());

        let mut out_of_bound = b.clone();
        out_of_bound.spec_constant_op(uint, OP_I_ADD, &[0xFFFF, 0xFFFE]);
        let words = out_of_bound.build();
        assert!(build(&words).unwrap_err().is_corrupted());

        let mut bad_extract = b.clone();
        bad_extract.spec_constant_op(uint, OP_COMPOSITE_EXTRACT, &[0xFFFF, 0]);
        let words = bad_extract.build();
        assert!(build(&words).unwrap_err().is_corrupted());
    }
    #[test]
    fn test_forward_pointers() {
        let mut b = ModuleBuilder::new();
        let float = b.ty_float(32);
        let node_ptr = b.id();
        b.op(OP_TYPE_FORWARD_POINTER, &[node_ptr, StorageClass::PhysicalStorageBuffer as u32]);
        let node = b.ty_struct(&[float, node_ptr]);
        b.op(OP_TYPE_POINTER, &[node_ptr, StorageClass::PhysicalStorageBuffer as u32, node]);
        let words = b.build();
        let graph = build(&words).unwrap();
        assert_eq!(graph.get_ty(node_ptr).unwrap(), &Type::DeviceAddress { pointee_ty: node });
        let node_pos = graph.ty_order.iter().position(|x| *x == node).unwrap();
        let ptr_pos = graph.ty_order.iter().position(|x| *x == node_ptr).unwrap();
        assert!(ptr_pos < node_pos);

        // Forward declared but never defined.
        let mut b = ModuleBuilder::new();
        let ptr = b.id();
        b.op(OP_TYPE_FORWARD_POINTER, &[ptr, StorageClass::PhysicalStorageBuffer as u32]);
        let words = b.build();
        assert!(build(&words).unwrap_err().is_corrupted());
    }
    #[test]
    fn test_missing_entry_function() {
        let mut b = ModuleBuilder::new();
        let func = b.id();
        b.entry_point(ExecutionModel::Vertex, func, "main", &[]);
        let words = b.build();
        assert!(build(&words).unwrap_err().is_corrupted());
    }
}
