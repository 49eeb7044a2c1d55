//! Reflection configuration and per-entry-point metadata assembly.
use std::collections::{HashMap, HashSet};
use std::fmt;
use log::{debug, info, warn};
use crate::analysis::Reachability;
use crate::combine::Combination;
use crate::consts::*;
use crate::error::{Error, Result};
use crate::graph::{EntryPointDecl, ExecutionModeParams, ModuleGraph};
use crate::instr::{FunctionId, VariableId};
use crate::parse::{ModuleHeader, SpirvBinary, SpirvModule};
use crate::spec::{ConstantValue, Evaluated, Specialization, Specialized};
use crate::ty::*;
use crate::walk::{self, MemberRoute, Walk};

/// Reflection configuration builder.
#[derive(Debug, Default, Clone)]
pub struct ReflectConfig {
    spv: Option<SpirvBinary>,
    ref_all_rscs: bool,
    combine_img_samplers: bool,
    gen_unique_names: bool,
    specs: Vec<Specialization>,
}
impl ReflectConfig {
    pub fn new() -> Self { Default::default() }

    /// SPIR-V binary to be reflected.
    pub fn spv<Spv: Into<SpirvBinary>>(&mut self, x: Spv) -> &mut Self {
        self.spv = Some(x.into());
        self
    }
    /// Attribute every resource in the module to every entry point, whether
    /// or not the entry point uses it.
    pub fn ref_all_rscs(&mut self, x: bool) -> &mut Self {
        self.ref_all_rscs = x;
        self
    }
    /// Report images used with exactly one sampler as combined image
    /// samplers.
    pub fn combine_img_samplers(&mut self, x: bool) -> &mut Self {
        self.combine_img_samplers = x;
        self
    }
    /// Give anonymous resources, types and struct members generated names
    /// that are unique within an entry point.
    pub fn gen_unique_names(&mut self, x: bool) -> &mut Self {
        self.gen_unique_names = x;
        self
    }
    /// Override the specialization constant at `spec_id` with the raw
    /// little-endian bytes in `value`.
    pub fn specialize<V: Into<Vec<u8>>>(&mut self, spec_id: u32, value: V) -> &mut Self {
        self.specs.push(Specialization { spec_id, value: value.into() });
        self
    }

    /// Reflect the SPIR-V binary and extract all entry points.
    pub fn reflect(&self) -> Result<Reflection> {
        let spv = self.spv.as_ref().ok_or(Error::NullArgument("spv"))?;
        if spv.is_empty() {
            return Err(Error::OutOfRange("spirv binary is empty".to_owned()));
        }
        let module = SpirvModule::new(spv.words())?;
        let graph = ModuleGraph::build(&module)?;
        let specialized = Specialized::apply(&graph, &self.specs)?;
        let mut arena = TypeArena::new(&graph, &specialized, self.gen_unique_names);
        let mut entry_points = Vec::with_capacity(graph.entry_points.len());
        for decl in graph.entry_points.iter() {
            let reach = Reachability::analyze(&graph, decl, self.ref_all_rscs)?;
            let comb = if self.combine_img_samplers {
                Combination::combine(&graph, &reach)
            } else { Combination::default() };
            let entry_point = EntryPointAssembler {
                cfg: self,
                graph: &graph,
                specialized: &specialized,
                arena: &mut arena,
                decl,
                reach: &reach,
                comb: &comb,
            }.assemble()?;
            entry_points.push(entry_point);
        }
        let refl = Reflection {
            header: *graph.header(),
            types: arena.types,
            entry_points,
        };
        info!("reflected {} entry points", refl.entry_points.len());
        Ok(refl)
    }
}

/// Result of a reflection. Owns all reported types and entry points.
#[derive(Debug, Clone)]
pub struct Reflection {
    header: ModuleHeader,
    types: Vec<TypeDesc>,
    entry_points: Vec<EntryPoint>,
}
impl Reflection {
    pub fn header(&self) -> &ModuleHeader { &self.header }
    pub fn types(&self) -> &[TypeDesc] { &self.types }
    pub fn ty(&self, idx: TypeIdx) -> Option<&TypeDesc> { self.types.get(idx.0) }
    pub fn entry_points(&self) -> &[EntryPoint] { &self.entry_points }
    pub fn entry_point(&self, name: &str) -> Option<&EntryPoint> {
        self.entry_points.iter().find(|x| x.name == name)
    }
    /// Find the member of `ty` at a dot-separated `path` of member names and
    /// array indices, like `lights.2.color`.
    pub fn resolve_member(&self, ty: TypeIdx, path: &str) -> Option<MemberRoute> {
        walk::resolve(self, ty, path)
    }
    /// Visit the members of `ty` and every sized array element inside it,
    /// parents before children.
    pub fn walk_members(&self, ty: TypeIdx) -> Walk {
        Walk::new(self, ty)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DescriptorType {
    Sampler,
    CombinedImageSampler,
    SampledImage,
    StorageImage(AccessType),
    UniformTexelBuffer,
    StorageTexelBuffer(AccessType),
    UniformBuffer,
    StorageBuffer(AccessType),
    /// Input attachment with its `InputAttachmentIndex`.
    InputAttachment(u32),
    AccelStruct,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescriptorBinding {
    pub var_id: VariableId,
    pub set: u32,
    pub binding: u32,
    pub desc_ty: DescriptorType,
    pub name: Option<String>,
    /// Type of a single descriptor, with array dimensions stripped.
    pub ty: TypeIdx,
    /// Array dimensions of the binding, outermost first.
    pub dims: Vec<u32>,
    /// The binding is an array with a runtime-sized outermost dimension,
    /// in addition to `dims`.
    pub unbounded: bool,
    /// An image merged with the only sampler it's used with.
    pub is_combined: bool,
}
impl DescriptorBinding {
    /// Number of descriptors bound, `None` if unbounded.
    pub fn count(&self) -> Option<u32> {
        if self.unbounded { return None; }
        Some(self.dims.iter().product())
    }
}
impl fmt::Display for DescriptorBinding {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "(set={}, bind={}) {:?}", self.set, self.binding, self.desc_ty)?;
        for dim in self.dims.iter() {
            write!(f, "[{}]", dim)?;
        }
        if self.unbounded { write!(f, "[]")?; }
        if let Some(name) = &self.name { write!(f, " {}", name)?; }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushConstantBlock {
    pub var_id: VariableId,
    pub name: Option<String>,
    pub ty: TypeIdx,
    /// Members with the offsets given by decorations.
    pub members: Vec<MemberDesc>,
    /// Byte size of the block, `None` if it can't be determined.
    pub nbyte: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceVariable {
    pub var_id: VariableId,
    pub name: Option<String>,
    pub location: u32,
    pub component: u32,
    pub ty: TypeIdx,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpecConstantVar {
    pub name: Option<String>,
    pub spec_id: u32,
    pub ty: TypeIdx,
    pub value: Option<ConstantValue>,
    pub is_overridden: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionModeOperand {
    /// Literal operands are 32-bit unsigned integers. `None` if the operand
    /// constant couldn't be evaluated.
    pub value: Option<ConstantValue>,
    /// Spec ID of the operand constant, if it's a specialization constant.
    pub spec_id: Option<u32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionMode {
    /// SPIR-V execution mode number, like `consts::EXEC_MODE_LOCAL_SIZE`.
    pub exec_mode: u32,
    pub operands: Vec<ExecutionModeOperand>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EntryPoint {
    pub name: String,
    pub exec_model: ExecutionModel,
    pub func_id: FunctionId,
    /// Interface variable IDs as declared.
    pub interface_ids: Vec<VariableId>,
    /// Execution modes in declaration order, with specialized operands.
    pub exec_modes: Vec<ExecutionMode>,
    /// Workgroup size of stages dispatched in workgroups.
    pub local_size: Option<[u32; 3]>,
    /// Resource variables attributed to the entry point.
    pub rsc_var_ids: Vec<VariableId>,
    /// Ordered by set, binding then variable ID.
    pub descs: Vec<DescriptorBinding>,
    pub push_consts: Vec<PushConstantBlock>,
    /// Ordered by location then component.
    pub inputs: Vec<InterfaceVariable>,
    pub outputs: Vec<InterfaceVariable>,
    pub spec_consts: Vec<SpecConstantVar>,
}
impl EntryPoint {
    pub fn desc(&self, set: u32, binding: u32) -> Option<&DescriptorBinding> {
        self.descs.iter().find(|x| x.set == set && x.binding == binding)
    }
    pub fn exec_mode(&self, exec_mode: u32) -> Option<&ExecutionMode> {
        self.exec_modes.iter().find(|x| x.exec_mode == exec_mode)
    }
}


/// Concretized types shared by all entry points of a reflection.
struct TypeArena<'g, 'a> {
    graph: &'g ModuleGraph<'a>,
    specialized: &'g Specialized,
    gen_unique_names: bool,
    memo: HashMap<TypeId, TypeIdx>,
    interned: HashMap<TypeDesc, TypeIdx>,
    types: Vec<TypeDesc>,
    nbytes: Vec<Option<usize>>,
    /// Struct names given so far. Types are shared by all entry points, so
    /// their names are unique across the whole reflection.
    ty_names: NameTable,
}
impl<'g, 'a> TypeArena<'g, 'a> {
    fn new(graph: &'g ModuleGraph<'a>, specialized: &'g Specialized, gen_unique_names: bool) -> Self {
        TypeArena {
            graph,
            specialized,
            gen_unique_names,
            memo: HashMap::new(),
            interned: HashMap::new(),
            types: Vec::new(),
            nbytes: Vec::new(),
            ty_names: NameTable::default(),
        }
    }
    fn get(&self, idx: TypeIdx) -> &TypeDesc { &self.types[idx.0] }
    fn nbyte(&self, idx: TypeIdx) -> Option<usize> { self.nbytes[idx.0] }
    fn idx(&self, ty_id: TypeId) -> Result<TypeIdx> {
        self.memo.get(&ty_id)
            .copied()
            .ok_or_else(|| Error::corrupted(format!("type {} is used before materialized", ty_id)))
    }
    fn intern(&mut self, desc: TypeDesc, nbyte: Option<usize>) -> TypeIdx {
        if let Some(idx) = self.interned.get(&desc) { return *idx; }
        let idx = TypeIdx(self.types.len());
        let mut named = desc.clone();
        if self.gen_unique_names {
            if let TypeDesc::Struct(struct_ty) = &mut named {
                let name = struct_ty.name.take()
                    .unwrap_or_else(|| format!("type{}", idx.0));
                struct_ty.name = Some(self.ty_names.claim(name, idx.0));
            }
        }
        self.interned.insert(desc, idx);
        self.types.push(named);
        self.nbytes.push(nbyte);
        idx
    }
    /// Materialize a type and everything it's built from, bottom-up.
    fn materialize(&mut self, root: TypeId) -> Result<TypeIdx> {
        if let Some(idx) = self.memo.get(&root) { return Ok(*idx); }
        let graph = self.graph;
        let mut stack = vec![(root, false)];
        while let Some((ty_id, expanded)) = stack.pop() {
            if self.memo.contains_key(&ty_id) { continue; }
            let ty = graph.get_ty(ty_id)?;
            if expanded {
                let (desc, nbyte) = self.concretize(ty_id, ty)?;
                let idx = self.intern(desc, nbyte);
                self.memo.insert(ty_id, idx);
            } else {
                // The module graph is acyclic, so this terminates.
                stack.push((ty_id, true));
                for operand_ty in ty.operand_tys() {
                    if !self.memo.contains_key(&operand_ty) {
                        stack.push((operand_ty, false));
                    }
                }
            }
        }
        self.idx(root)
    }
    fn concretize(&self, ty_id: TypeId, ty: &Type) -> Result<(TypeDesc, Option<usize>)> {
        let out = match ty {
            Type::Void => (TypeDesc::Void, None),
            Type::Bool => (TypeDesc::Bool, ty.scalar_nbyte()),
            Type::Int { nbit, is_signed } => {
                (TypeDesc::Int { nbit: *nbit, is_signed: *is_signed }, ty.scalar_nbyte())
            },
            Type::Float { nbit } => (TypeDesc::Float { nbit: *nbit }, ty.scalar_nbyte()),
            Type::Vector { elem_ty, nelem } => {
                let elem = self.idx(*elem_ty)?;
                let nbyte = self.nbyte(elem).map(|x| x * *nelem as usize);
                (TypeDesc::Vector { elem, nelem: *nelem }, nbyte)
            },
            Type::Matrix { col_ty, ncol } => {
                let col = self.idx(*col_ty)?;
                let nbyte = self.nbyte(col).map(|x| x * *ncol as usize);
                (TypeDesc::Matrix { col, ncol: *ncol }, nbyte)
            },
            Type::Array { elem_ty, len_id, stride } => {
                let elem = self.idx(*elem_ty)?;
                let nelem = self.specialized.array_len(self.graph, *len_id)?;
                let stride = stride.map(|x| x as usize);
                let nbyte = stride.or_else(|| self.nbyte(elem))
                    .map(|x| x * nelem as usize);
                (TypeDesc::Array { elem, nelem, stride }, nbyte)
            },
            Type::RuntimeArray { elem_ty, stride } => {
                let elem = self.idx(*elem_ty)?;
                (TypeDesc::RuntimeArray { elem, stride: stride.map(|x| x as usize) }, None)
            },
            Type::Struct { name, members, .. } => {
                let mut member_descs = Vec::with_capacity(members.len());
                let mut member_names = NameTable::default();
                for (i, member) in members.iter().enumerate() {
                    let ty = self.idx(member.ty)?;
                    let nbyte = self.member_nbyte(ty, member);
                    let name = if self.gen_unique_names {
                        let name = member.name.clone().unwrap_or_else(|| format!("member{}", i));
                        Some(member_names.claim(name, i))
                    } else { member.name.clone() };
                    let member_desc = MemberDesc {
                        name,
                        offset: member.offset.map(|x| x as usize),
                        ty,
                        nbyte,
                        mat_stride: member.mat_stride.map(|x| x as usize),
                        mat_major: member.mat_major,
                        access: AccessType::from_decos(member.non_writable, member.non_readable),
                    };
                    member_descs.push(member_desc);
                }
                let nbyte = struct_nbyte(&member_descs);
                let struct_ty = StructDesc { name: name.clone(), members: member_descs };
                (TypeDesc::Struct(struct_ty), nbyte)
            },
            Type::Pointer { store_cls, pointee_ty } => {
                let pointee = self.idx(*pointee_ty)?;
                (TypeDesc::Pointer { store_cls: *store_cls, pointee }, None)
            },
            Type::DeviceAddress { .. } => (TypeDesc::DeviceAddress, Some(8)),
            Type::Image(img_ty) => {
                let desc = TypeDesc::Image {
                    unit: self.idx(img_ty.unit_ty)?,
                    dim: img_ty.dim,
                    is_depth: img_ty.is_depth,
                    is_array: img_ty.is_array,
                    is_multisampled: img_ty.is_multisampled,
                    is_sampled: img_ty.is_sampled,
                    fmt: img_ty.fmt,
                };
                (desc, None)
            },
            Type::Sampler => (TypeDesc::Sampler, None),
            Type::SampledImage { img_ty } => {
                (TypeDesc::CombinedImageSampler { img: self.idx(*img_ty)? }, None)
            },
            Type::AccelStruct => (TypeDesc::AccelStruct, None),
            Type::Opaque => {
                return Err(Error::unsupported(format!("type {} cannot be reflected", ty_id)));
            },
        };
        Ok(out)
    }
    fn member_nbyte(&self, ty: TypeIdx, member: &StructMember) -> Option<usize> {
        match (self.get(ty), member.mat_stride) {
            (TypeDesc::Matrix { col, ncol }, Some(stride)) => {
                let nvec = match (member.mat_major, self.get(*col)) {
                    (Some(MatrixAxisOrder::RowMajor), TypeDesc::Vector { nelem, .. }) => *nelem,
                    _ => *ncol,
                };
                Some(stride as usize * nvec as usize)
            },
            _ => self.nbyte(ty),
        }
    }
}

/// Byte size of a struct. With explicit offsets it's the end of the furthest
/// member; a trailing runtime array contributes nothing. Without offsets the
/// members are assumed tightly packed.
fn struct_nbyte(members: &[MemberDesc]) -> Option<usize> {
    if members.iter().all(|x| x.offset.is_some()) {
        members.iter()
            .map(|x| x.offset.unwrap_or_default() + x.nbyte.unwrap_or_default())
            .max()
            .or(Some(0))
    } else {
        members.iter()
            .map(|x| x.nbyte)
            .sum()
    }
}

/// Names already given within one scope.
#[derive(Default)]
struct NameTable {
    used: HashSet<String>,
}
impl NameTable {
    /// Claim `name`, or a variant suffixed with `pos` if it's taken.
    fn claim(&mut self, name: String, pos: usize) -> String {
        if !self.used.contains(&name) {
            self.used.insert(name.clone());
            return name;
        }
        let mut candidate = format!("{}_{}", name, pos);
        let mut i = 1;
        while self.used.contains(&candidate) {
            candidate = format!("{}_{}_{}", name, pos, i);
            i += 1;
        }
        self.used.insert(candidate.clone());
        candidate
    }
}


struct EntryPointAssembler<'r, 'g, 'a> {
    cfg: &'r ReflectConfig,
    graph: &'g ModuleGraph<'a>,
    specialized: &'g Specialized,
    arena: &'r mut TypeArena<'g, 'a>,
    decl: &'g EntryPointDecl,
    reach: &'r Reachability,
    comb: &'r Combination,
}
impl<'r, 'g, 'a> EntryPointAssembler<'r, 'g, 'a> {
    fn assemble(mut self) -> Result<EntryPoint> {
        let graph = self.graph;
        let reach = self.reach;
        let decl = self.decl;
        let mut descs = Vec::new();
        let mut push_consts = Vec::new();
        for &var_id in reach.rsc_vars.iter() {
            let var = graph.get_var(var_id)?;
            if var.store_cls == StorageClass::PushConstant {
                push_consts.push(self.make_push_const(var_id)?);
            } else if let Some(desc) = self.make_desc(var_id)? {
                descs.push(desc);
            }
        }
        descs.sort_by_key(|x| (x.set, x.binding, x.var_id));

        let mut inputs = Vec::new();
        let mut outputs = Vec::new();
        for &var_id in reach.interface_vars.iter() {
            let var = graph.get_var(var_id)?;
            // Built-ins have no location.
            let location = match graph.get_deco_u32(var_id, None, DECO_LOCATION) {
                Some(x) => x,
                None => continue,
            };
            let (pointee_id, _) = graph.var_pointee(var)?;
            let interface_var = InterfaceVariable {
                var_id,
                name: graph.get_name(var_id, None).map(|x| x.to_owned()),
                location,
                component: graph.get_deco_u32(var_id, None, DECO_COMPONENT).unwrap_or(0),
                ty: self.arena.materialize(pointee_id)?,
            };
            if var.store_cls == StorageClass::Input {
                inputs.push(interface_var);
            } else {
                outputs.push(interface_var);
            }
        }
        inputs.sort_by_key(|x| (x.location, x.component, x.var_id));
        outputs.sort_by_key(|x| (x.location, x.component, x.var_id));

        let specialized = self.specialized;
        let mut spec_consts = Vec::with_capacity(specialized.spec_consts.len());
        for spec_const in specialized.spec_consts.iter() {
            let spec_const = SpecConstantVar {
                name: spec_const.name.clone(),
                spec_id: spec_const.spec_id,
                ty: self.arena.materialize(spec_const.ty)?,
                value: spec_const.value,
                is_overridden: spec_const.is_overridden,
            };
            spec_consts.push(spec_const);
        }

        let mut entry_point = EntryPoint {
            name: decl.name.clone(),
            exec_model: decl.exec_model,
            func_id: decl.func_id,
            interface_ids: decl.interface_ids.clone(),
            exec_modes: self.exec_modes(),
            local_size: self.local_size()?,
            rsc_var_ids: reach.rsc_vars.iter().copied().collect(),
            descs,
            push_consts,
            inputs,
            outputs,
            spec_consts,
        };
        if self.cfg.gen_unique_names {
            gen_unique_names(&mut entry_point);
        }
        debug!("assembled entry point {}: {} descriptors, {} push constants, {} inputs, {} outputs",
            entry_point.name, entry_point.descs.len(), entry_point.push_consts.len(),
            entry_point.inputs.len(), entry_point.outputs.len());
        Ok(entry_point)
    }

    fn make_push_const(&mut self, var_id: VariableId) -> Result<PushConstantBlock> {
        let var = self.graph.get_var(var_id)?;
        let (pointee_id, _) = self.graph.var_pointee(var)?;
        let ty = self.arena.materialize(pointee_id)?;
        let members = match self.arena.get(ty) {
            TypeDesc::Struct(struct_ty) => struct_ty.members.clone(),
            _ => return Err(Error::corrupted(format!("push constant {} is not a struct", var_id))),
        };
        let push_const = PushConstantBlock {
            var_id,
            name: self.graph.get_name(var_id, None).map(|x| x.to_owned()),
            ty,
            members,
            nbyte: self.arena.nbyte(ty),
        };
        Ok(push_const)
    }
    fn make_desc(&mut self, var_id: VariableId) -> Result<Option<DescriptorBinding>> {
        if self.comb.removed_samplers.contains(&var_id) {
            return Ok(None);
        }
        let graph = self.graph;
        let var = graph.get_var(var_id)?;
        let (mut ty_id, mut ty) = graph.var_pointee(var)?;
        // Unwrap descriptor arrays.
        let mut dims = Vec::new();
        let mut unbounded = false;
        loop {
            match ty {
                Type::Array { elem_ty, len_id, .. } => {
                    dims.push(self.specialized.array_len(graph, *len_id)?);
                    ty_id = *elem_ty;
                },
                Type::RuntimeArray { elem_ty, .. } if dims.is_empty() && !unbounded => {
                    unbounded = true;
                    ty_id = *elem_ty;
                },
                _ => break,
            }
            ty = graph.get_ty(ty_id)?;
        }
        let non_writable = graph.has_deco(var_id, None, DECO_NON_WRITABLE);
        let non_readable = graph.has_deco(var_id, None, DECO_NON_READABLE);
        let access = |members: &[StructMember]| {
            let all_members = |f: fn(&StructMember) -> bool| {
                !members.is_empty() && members.iter().all(f)
            };
            AccessType::from_decos(
                non_writable || all_members(|x| x.non_writable),
                non_readable || all_members(|x| x.non_readable),
            ).unwrap_or(AccessType::ReadWrite)
        };
        let mut is_combined = false;
        let desc_ty = match ty {
            Type::Struct { members, is_buffer_block, .. } => {
                let is_storage = var.store_cls == StorageClass::StorageBuffer ||
                    (var.store_cls == StorageClass::Uniform && *is_buffer_block);
                if is_storage {
                    DescriptorType::StorageBuffer(access(members))
                } else {
                    DescriptorType::UniformBuffer
                }
            },
            Type::Image(img_ty) => match (img_ty.dim, img_ty.is_sampled) {
                (Dim::SubpassData, _) => {
                    let idx = graph.get_deco_u32(var_id, None, DECO_INPUT_ATTACHMENT_INDEX)
                        .ok_or_else(|| Error::corrupted(format!("input attachment {} has no index", var_id)))?;
                    DescriptorType::InputAttachment(idx)
                },
                (Dim::Buffer, Some(false)) => DescriptorType::StorageTexelBuffer(access(&[])),
                (_, Some(false)) => DescriptorType::StorageImage(access(&[])),
                (Dim::Buffer, _) => DescriptorType::UniformTexelBuffer,
                _ if self.comb.combined_imgs.contains_key(&var_id) => {
                    is_combined = true;
                    DescriptorType::CombinedImageSampler
                },
                _ => DescriptorType::SampledImage,
            },
            Type::Sampler => DescriptorType::Sampler,
            Type::SampledImage { img_ty } => match graph.get_ty(*img_ty)? {
                Type::Image(ImageType { dim: Dim::Buffer, .. }) => DescriptorType::UniformTexelBuffer,
                _ => DescriptorType::CombinedImageSampler,
            },
            Type::AccelStruct => DescriptorType::AccelStruct,
            _ => {
                warn!("resource variable {} of type {} is not a descriptor; ignored", var_id, ty_id);
                return Ok(None);
            },
        };
        let mut desc_ty_idx = self.arena.materialize(ty_id)?;
        if is_combined {
            desc_ty_idx = self.arena.intern(TypeDesc::CombinedImageSampler { img: desc_ty_idx }, None);
        }
        let desc = DescriptorBinding {
            var_id,
            set: graph.get_deco_u32(var_id, None, DECO_DESCRIPTOR_SET).unwrap_or(0),
            binding: graph.get_deco_u32(var_id, None, DECO_BINDING).unwrap_or(0),
            desc_ty,
            name: graph.get_name(var_id, None).map(|x| x.to_owned()),
            ty: desc_ty_idx,
            dims,
            unbounded,
            is_combined,
        };
        Ok(Some(desc))
    }
    fn exec_modes(&self) -> Vec<ExecutionMode> {
        let graph = self.graph;
        let specialized = self.specialized;
        let decls = match graph.exec_modes.get(&self.decl.func_id) {
            Some(x) => x,
            None => return Vec::new(),
        };
        decls.iter()
            .map(|decl| {
                let operands = match decl.params {
                    ExecutionModeParams::Literals(params) => params.iter()
                        .map(|x| ExecutionModeOperand {
                            value: Some(ConstantValue::Int { nbit: 32, is_signed: false, bits: *x as u64 }),
                            spec_id: None,
                        })
                        .collect(),
                    ExecutionModeParams::Ids(params) => params.iter()
                        .map(|x| ExecutionModeOperand {
                            value: specialized.get(*x).copied(),
                            spec_id: graph.get_deco_u32(*x, None, DECO_SPEC_ID),
                        })
                        .collect(),
                };
                ExecutionMode { exec_mode: decl.exec_mode, operands }
            })
            .collect()
    }
    /// Workgroup size from execution modes, overridden by a constant
    /// decorated as the `WorkgroupSize` built-in.
    fn local_size(&self) -> Result<Option<[u32; 3]>> {
        if !self.decl.exec_model.has_workgroups() { return Ok(None); }
        let graph = self.graph;
        let specialized = self.specialized;
        let to_size = |values: Vec<Option<u32>>, what: &str| -> Result<[u32; 3]> {
            match values.as_slice() {
                [Some(x), Some(y), Some(z)] => Ok([*x, *y, *z]),
                _ => Err(Error::specialization(format!("{} of entry point {} is not resolved", what, self.decl.name))),
            }
        };
        let builtin = graph.const_order.iter()
            .find(|x| graph.get_deco_u32(**x, None, DECO_BUILT_IN) == Some(BUILT_IN_WORKGROUP_SIZE));
        if let Some(&const_id) = builtin {
            let values = match specialized.get_evaluated(const_id) {
                Some(Evaluated::Composite(x)) => x.iter()
                    .map(|x| x.as_scalar().and_then(|x| x.to_u32()))
                    .collect(),
                _ => Vec::new(),
            };
            return to_size(values, "workgroup size built-in").map(Some);
        }
        let exec_modes = match graph.exec_modes.get(&self.decl.func_id) {
            Some(x) => x,
            None => return Ok(None),
        };
        for exec_mode in exec_modes.iter() {
            match (exec_mode.exec_mode, &exec_mode.params) {
                (EXEC_MODE_LOCAL_SIZE, ExecutionModeParams::Literals(params)) => {
                    let values = params.iter().map(|x| Some(*x)).collect();
                    return to_size(values, "local size").map(Some);
                },
                (EXEC_MODE_LOCAL_SIZE_ID, ExecutionModeParams::Ids(params)) => {
                    let values = params.iter()
                        .map(|x| specialized.get(*x).and_then(|x| x.to_u32()))
                        .collect();
                    return to_size(values, "local size").map(Some);
                },
                _ => {},
            }
        }
        Ok(None)
    }
}

/// Name anonymous resources after where they're bound, and make all names in
/// the entry point distinct.
fn gen_unique_names(entry_point: &mut EntryPoint) {
    let mut names = NameTable::default();
    for (i, desc) in entry_point.descs.iter_mut().enumerate() {
        let name = desc.name.take()
            .unwrap_or_else(|| format!("set{}_bind{}", desc.set, desc.binding));
        desc.name = Some(names.claim(name, i));
    }
    for (i, push_const) in entry_point.push_consts.iter_mut().enumerate() {
        let name = push_const.name.take().unwrap_or_else(|| "push_const".to_owned());
        push_const.name = Some(names.claim(name, i));
    }
    for (i, input) in entry_point.inputs.iter_mut().enumerate() {
        let name = input.name.take()
            .unwrap_or_else(|| format!("in_loc{}_comp{}", input.location, input.component));
        input.name = Some(names.claim(name, i));
    }
    for (i, output) in entry_point.outputs.iter_mut().enumerate() {
        let name = output.name.take()
            .unwrap_or_else(|| format!("out_loc{}_comp{}", output.location, output.component));
        output.name = Some(names.claim(name, i));
    }
    for (i, spec_const) in entry_point.spec_consts.iter_mut().enumerate() {
        let name = spec_const.name.take()
            .unwrap_or_else(|| format!("spec_const{}", spec_const.spec_id));
        spec_const.name = Some(names.claim(name, i));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_table() {
        let mut names = NameTable::default();
        assert_eq!(names.claim("a".to_owned(), 0), "a");
        assert_eq!(names.claim("a".to_owned(), 1), "a_1");
        assert_eq!(names.claim("a_1".to_owned(), 2), "a_1_2");
        assert_eq!(names.claim("a".to_owned(), 1), "a_1_1");
    }
    #[test]
    fn test_struct_nbyte() {
        let member = |offset: Option<usize>, nbyte: Option<usize>| MemberDesc {
            name: None,
            offset,
            ty: TypeIdx(0),
            nbyte,
            mat_stride: None,
            mat_major: None,
            access: None,
        };
        assert_eq!(struct_nbyte(&[member(Some(16), Some(4)), member(Some(0), Some(16))]), Some(20));
        // Trailing runtime array.
        assert_eq!(struct_nbyte(&[member(Some(0), Some(4)), member(Some(16), None)]), Some(16));
        assert_eq!(struct_nbyte(&[member(None, Some(4)), member(None, Some(8))]), Some(12));
        assert_eq!(struct_nbyte(&[member(None, Some(4)), member(None, None)]), None);
    }
}
