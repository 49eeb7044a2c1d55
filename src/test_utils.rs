//! Word-by-word SPIR-V module assembly for tests.
use crate::consts::*;
use crate::parse::InstrId;
use crate::ty::{ExecutionModel, StorageClass};

const OP_LABEL: u32 = 248;
const OP_RETURN: u32 = 253;

/// Builds a module from instructions emitted in any order. Each instruction
/// goes to its logical layout section by opcode as it's emitted, so tests
/// may decorate an ID before declaring it.
///
/// Header: magic, version 1.3, generator 0, bound one past the largest
/// allocated ID, schema 0.
#[derive(Clone)]
pub struct ModuleBuilder {
    next_id: InstrId,
    version: u32,
    preamble: Vec<u32>,
    entries: Vec<u32>,
    debug: Vec<u32>,
    annotations: Vec<u32>,
    globals: Vec<u32>,
    funcs: Vec<u32>,
    in_func: bool,
}
impl ModuleBuilder {
    pub fn new() -> ModuleBuilder {
        let mut b = ModuleBuilder {
            next_id: 1,
            version: 0x0001_0300,
            preamble: Vec::new(),
            entries: Vec::new(),
            debug: Vec::new(),
            annotations: Vec::new(),
            globals: Vec::new(),
            funcs: Vec::new(),
            in_func: false,
        };
        // OpCapability Shader, OpMemoryModel Logical GLSL450.
        b.op(OP_CAPABILITY, &[1]);
        b.op(OP_MEMORY_MODEL, &[0, 1]);
        b
    }
    pub fn version(&mut self, major: u8, minor: u8) -> &mut Self {
        self.version = ((major as u32) << 16) | ((minor as u32) << 8);
        self
    }
    pub fn id(&mut self) -> InstrId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
    /// Emit a raw instruction.
    pub fn op(&mut self, opcode: u32, operands: &[u32]) -> &mut Self {
        let in_func = self.in_func;
        let section = match opcode {
            OP_CAPABILITY | OP_MEMORY_MODEL | OP_EXTENSION | OP_EXT_INST_IMPORT => &mut self.preamble,
            OP_ENTRY_POINT | OP_EXECUTION_MODE | OP_EXECUTION_MODE_ID => &mut self.entries,
            OP_NAME | OP_MEMBER_NAME | OP_SOURCE => &mut self.debug,
            OP_DECORATE | OP_MEMBER_DECORATE | OP_DECORATION_GROUP |
            OP_GROUP_DECORATE => &mut self.annotations,
            _ if in_func => &mut self.funcs,
            _ => &mut self.globals,
        };
        section.push(((operands.len() as u32 + 1) << 16) | opcode);
        section.extend_from_slice(operands);
        self
    }
    pub fn str_words(s: &str) -> Vec<u32> {
        let mut bytes = s.as_bytes().to_owned();
        // At least one nul, then pad to a word boundary.
        bytes.push(0);
        while bytes.len() % 4 != 0 { bytes.push(0); }
        bytes.chunks(4)
            .map(|x| u32::from_le_bytes([x[0], x[1], x[2], x[3]]))
            .collect()
    }
    pub fn build(&self) -> Vec<u32> {
        let mut words = vec![SPIRV_MAGIC, self.version, 0, self.next_id, 0];
        words.extend(&self.preamble);
        words.extend(&self.entries);
        words.extend(&self.debug);
        words.extend(&self.annotations);
        words.extend(&self.globals);
        words.extend(&self.funcs);
        words
    }

    pub fn entry_point(&mut self, exec_model: ExecutionModel, func: InstrId, name: &str, interface: &[InstrId]) {
        let mut operands = vec![exec_model as u32, func];
        operands.extend(Self::str_words(name));
        operands.extend(interface);
        self.op(OP_ENTRY_POINT, &operands);
    }
    pub fn exec_mode(&mut self, func: InstrId, exec_mode: u32, params: &[u32]) {
        let mut operands = vec![func, exec_mode];
        operands.extend(params);
        self.op(OP_EXECUTION_MODE, &operands);
    }
    pub fn exec_mode_id(&mut self, func: InstrId, exec_mode: u32, ids: &[InstrId]) {
        let mut operands = vec![func, exec_mode];
        operands.extend(ids);
        self.op(OP_EXECUTION_MODE_ID, &operands);
    }
    pub fn name(&mut self, id: InstrId, name: &str) {
        let mut operands = vec![id];
        operands.extend(Self::str_words(name));
        self.op(OP_NAME, &operands);
    }
    pub fn member_name(&mut self, id: InstrId, member_idx: u32, name: &str) {
        let mut operands = vec![id, member_idx];
        operands.extend(Self::str_words(name));
        self.op(OP_MEMBER_NAME, &operands);
    }
    pub fn decorate(&mut self, id: InstrId, deco: u32, params: &[u32]) {
        let mut operands = vec![id, deco];
        operands.extend(params);
        self.op(OP_DECORATE, &operands);
    }
    pub fn member_decorate(&mut self, id: InstrId, member_idx: u32, deco: u32, params: &[u32]) {
        let mut operands = vec![id, member_idx, deco];
        operands.extend(params);
        self.op(OP_MEMBER_DECORATE, &operands);
    }
    /// Decorate a resource variable with its descriptor set and binding.
    pub fn bind(&mut self, var: InstrId, set: u32, binding: u32) {
        self.decorate(var, DECO_DESCRIPTOR_SET, &[set]);
        self.decorate(var, DECO_BINDING, &[binding]);
    }

    fn result(&mut self, opcode: u32, operands: &[u32]) -> InstrId {
        let id = self.id();
        let mut x = vec![id];
        x.extend(operands);
        self.op(opcode, &x);
        id
    }
    fn typed_result(&mut self, opcode: u32, ty: InstrId, operands: &[u32]) -> InstrId {
        let id = self.id();
        let mut x = vec![ty, id];
        x.extend(operands);
        self.op(opcode, &x);
        id
    }
    pub fn ty_void(&mut self) -> InstrId { self.result(OP_TYPE_VOID, &[]) }
    pub fn ty_bool(&mut self) -> InstrId { self.result(OP_TYPE_BOOL, &[]) }
    pub fn ty_int(&mut self, nbit: u32, is_signed: bool) -> InstrId {
        self.result(OP_TYPE_INT, &[nbit, is_signed as u32])
    }
    pub fn ty_float(&mut self, nbit: u32) -> InstrId { self.result(OP_TYPE_FLOAT, &[nbit]) }
    pub fn ty_vec(&mut self, elem: InstrId, nelem: u32) -> InstrId {
        self.result(OP_TYPE_VECTOR, &[elem, nelem])
    }
    pub fn ty_mat(&mut self, col: InstrId, ncol: u32) -> InstrId {
        self.result(OP_TYPE_MATRIX, &[col, ncol])
    }
    pub fn ty_array(&mut self, elem: InstrId, len: InstrId) -> InstrId {
        self.result(OP_TYPE_ARRAY, &[elem, len])
    }
    pub fn ty_runtime_array(&mut self, elem: InstrId) -> InstrId {
        self.result(OP_TYPE_RUNTIME_ARRAY, &[elem])
    }
    pub fn ty_struct(&mut self, members: &[InstrId]) -> InstrId {
        self.result(OP_TYPE_STRUCT, members)
    }
    pub fn ty_struct_with_id(&mut self, id: InstrId, members: &[InstrId]) {
        let mut operands = vec![id];
        operands.extend(members);
        self.op(OP_TYPE_STRUCT, &operands);
    }
    pub fn ty_ptr(&mut self, store_cls: StorageClass, pointee: InstrId) -> InstrId {
        self.result(OP_TYPE_POINTER, &[store_cls as u32, pointee])
    }
    /// `OpTypeImage` with an unknown format. `sampled` is 1 for sampled
    /// images and 2 for storage images.
    pub fn ty_image(&mut self, unit: InstrId, dim: u32, sampled: u32) -> InstrId {
        self.result(OP_TYPE_IMAGE, &[unit, dim, 0, 0, 0, sampled, 0])
    }
    pub fn ty_sampler(&mut self) -> InstrId { self.result(OP_TYPE_SAMPLER, &[]) }
    pub fn ty_sampled_image(&mut self, img: InstrId) -> InstrId {
        self.result(OP_TYPE_SAMPLED_IMAGE, &[img])
    }

    pub fn constant(&mut self, ty: InstrId, value: u32) -> InstrId {
        self.typed_result(OP_CONSTANT, ty, &[value])
    }
    pub fn spec_constant(&mut self, ty: InstrId, default: u32) -> InstrId {
        self.typed_result(OP_SPEC_CONSTANT, ty, &[default])
    }
    pub fn spec_constant_bool(&mut self, ty: InstrId, default: bool) -> InstrId {
        let opcode = if default { OP_SPEC_CONSTANT_TRUE } else { OP_SPEC_CONSTANT_FALSE };
        self.typed_result(opcode, ty, &[])
    }
    pub fn spec_constant_op(&mut self, ty: InstrId, opcode: u32, operands: &[u32]) -> InstrId {
        let mut x = vec![opcode];
        x.extend(operands);
        self.typed_result(OP_SPEC_CONSTANT_OP, ty, &x)
    }
    pub fn constant_composite(&mut self, ty: InstrId, constituents: &[InstrId]) -> InstrId {
        self.typed_result(OP_CONSTANT_COMPOSITE, ty, constituents)
    }
    pub fn spec_constant_composite(&mut self, ty: InstrId, constituents: &[InstrId]) -> InstrId {
        self.typed_result(OP_SPEC_CONSTANT_COMPOSITE, ty, constituents)
    }
    pub fn variable(&mut self, ptr_ty: InstrId, store_cls: StorageClass) -> InstrId {
        self.typed_result(OP_VARIABLE, ptr_ty, &[store_cls as u32])
    }

    /// Open a function body returning `ret_ty` with no parameters.
    pub fn function(&mut self, ret_ty: InstrId) -> InstrId {
        let fn_ty = self.result(OP_TYPE_FUNCTION, &[ret_ty]);
        self.in_func = true;
        let func = self.typed_result(OP_FUNCTION, ret_ty, &[0, fn_ty]);
        self.result(OP_LABEL, &[]);
        func
    }
    pub fn function_end(&mut self) {
        self.op(OP_RETURN, &[]);
        self.op(OP_FUNCTION_END, &[]);
        self.in_func = false;
    }
    pub fn load(&mut self, ty: InstrId, ptr: InstrId) -> InstrId {
        self.typed_result(OP_LOAD, ty, &[ptr])
    }
    pub fn store(&mut self, ptr: InstrId, value: InstrId) {
        self.op(OP_STORE, &[ptr, value]);
    }
    pub fn access_chain(&mut self, ptr_ty: InstrId, base: InstrId, idxs: &[InstrId]) -> InstrId {
        let mut x = vec![base];
        x.extend(idxs);
        self.typed_result(OP_ACCESS_CHAIN, ptr_ty, &x)
    }
    pub fn call(&mut self, ret_ty: InstrId, func: InstrId) -> InstrId {
        self.typed_result(OP_FUNCTION_CALL, ret_ty, &[func])
    }
    pub fn sampled_image(&mut self, ty: InstrId, img: InstrId, sampler: InstrId) -> InstrId {
        self.typed_result(OP_SAMPLED_IMAGE, ty, &[img, sampler])
    }
}
