//! Constant evaluation with specialization overrides.
use std::collections::{HashMap, HashSet};
use std::fmt;
use byteorder::{ByteOrder, LittleEndian};
use log::{debug, warn};
use crate::consts::*;
use crate::error::{Error, Result};
use crate::graph::{ConstantKind, ModuleGraph};
use crate::ty::{ArrayLength, ConstantId, Type, TypeId};

/// A client-supplied value for the constant decorated with `SpecId`
/// `spec_id`. `value` holds the raw little-endian bytes of the scalar.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Specialization {
    pub spec_id: u32,
    pub value: Vec<u8>,
}

fn mask(nbit: u32) -> u64 {
    if nbit >= 64 { !0 } else { (1 << nbit) - 1 }
}

/// A scalar constant value. Integer and floating-point bits are kept in the
/// low-order `nbit` bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConstantValue {
    Bool(bool),
    Int { nbit: u32, is_signed: bool, bits: u64 },
    Float { nbit: u32, bits: u64 },
}
impl ConstantValue {
    fn int_of(ty: &Type, bits: u64) -> Option<ConstantValue> {
        if let Type::Int { nbit, is_signed } = *ty {
            Some(ConstantValue::Int { nbit, is_signed, bits: bits & mask(nbit) })
        } else { None }
    }
    fn from_words(ty: &Type, words: &[u32]) -> Option<ConstantValue> {
        let lo = *words.first()? as u64;
        let hi = words.get(1).copied().unwrap_or(0) as u64;
        let bits = lo | (hi << 32);
        match *ty {
            Type::Int { .. } => ConstantValue::int_of(ty, bits),
            Type::Float { nbit } => Some(ConstantValue::Float { nbit, bits: bits & mask(nbit) }),
            _ => None,
        }
    }
    fn from_bytes(ty: &Type, bytes: &[u8]) -> Option<ConstantValue> {
        match *ty {
            Type::Bool if bytes.len() == 4 => Some(ConstantValue::Bool(LittleEndian::read_u32(bytes) != 0)),
            Type::Int { .. } | Type::Float { .. } if !bytes.is_empty() && bytes.len() <= 8 => {
                let bits = LittleEndian::read_uint(bytes, bytes.len());
                ConstantValue::from_words(ty, &[bits as u32, (bits >> 32) as u32])
            },
            _ => None,
        }
    }
    /// Raw bits and the sign-extended value of an integer.
    fn as_int(&self) -> Option<(u64, i64)> {
        if let ConstantValue::Int { nbit, is_signed, bits } = *self {
            let signed = if is_signed && nbit > 0 && nbit < 64 {
                let shift = 64 - nbit;
                ((bits << shift) as i64) >> shift
            } else { bits as i64 };
            Some((bits, signed))
        } else { None }
    }
    /// The value as an unsigned 32-bit integer, if it is an integer
    /// representable as one.
    pub fn to_u32(&self) -> Option<u32> {
        let (bits, signed) = self.as_int()?;
        if let ConstantValue::Int { is_signed: true, .. } = self {
            if signed < 0 { return None; }
        }
        if bits > u32::MAX as u64 { None } else { Some(bits as u32) }
    }
    pub fn to_bool(&self) -> Option<bool> {
        if let ConstantValue::Bool(x) = self { Some(*x) } else { None }
    }
}
impl fmt::Display for ConstantValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            ConstantValue::Bool(x) => write!(f, "{}", x),
            ConstantValue::Int { is_signed: true, .. } => {
                write!(f, "{}", self.as_int().map(|x| x.1).unwrap_or_default())
            },
            ConstantValue::Int { bits, .. } => write!(f, "{}", bits),
            ConstantValue::Float { nbit: 32, bits } => write!(f, "{}", f32::from_bits(bits as u32)),
            ConstantValue::Float { nbit: 64, bits } => write!(f, "{}", f64::from_bits(bits)),
            ConstantValue::Float { bits, .. } => write!(f, "{:#x}", bits),
        }
    }
}

/// A constant after evaluation. Composites keep their structure so they can
/// be indexed by `OpCompositeExtract`.
#[derive(Debug, Clone, PartialEq)]
pub enum Evaluated {
    Scalar(ConstantValue),
    Composite(Vec<Evaluated>),
}
impl Evaluated {
    pub fn as_scalar(&self) -> Option<&ConstantValue> {
        if let Evaluated::Scalar(x) = self { Some(x) } else { None }
    }
    fn extract(&self, idxs: &[u32]) -> Option<&Evaluated> {
        let mut cur = self;
        for &idx in idxs {
            if let Evaluated::Composite(x) = cur {
                cur = x.get(idx as usize)?;
            } else { return None; }
        }
        Some(cur)
    }
}

/// A constant the client can override, as reported to the client.
#[derive(Debug, Clone, PartialEq)]
pub struct SpecConstant {
    pub name: Option<String>,
    pub spec_id: u32,
    pub const_id: ConstantId,
    pub ty: TypeId,
    /// The specialized value, `None` if the constant isn't scalar.
    pub value: Option<ConstantValue>,
    pub is_overridden: bool,
}

/// Constant values of a module after specialization.
#[derive(Debug, Default)]
pub struct Specialized {
    values: HashMap<ConstantId, Evaluated>,
    pub spec_consts: Vec<SpecConstant>,
}
impl Specialized {
    pub fn apply(graph: &ModuleGraph, specs: &[Specialization]) -> Result<Specialized> {
        let mut overrides = HashMap::new();
        for spec in specs {
            if spec.value.is_empty() {
                return Err(Error::OutOfRange(format!("specialization {} has no value", spec.spec_id)));
            }
            if overrides.insert(spec.spec_id, spec.value.as_slice()).is_some() {
                return Err(Error::InvalidArgument(format!("specialization {} is given twice", spec.spec_id)));
            }
        }
        let spec_ids = graph.spec_ids().collect::<HashMap<_, _>>();
        let declared = spec_ids.values().copied().collect::<HashSet<_>>();
        for spec_id in overrides.keys() {
            if !declared.contains(spec_id) {
                warn!("ignored specialization {} absent from the module", spec_id);
            }
        }

        let mut out = Specialized::default();
        for &const_id in graph.const_order.iter() {
            let constant = graph.get_const(const_id)?;
            let ty = graph.get_ty(constant.ty)?;
            let spec_id = spec_ids.get(&const_id).copied();
            let value = spec_id.and_then(|x| overrides.get(&x).copied());
            let evaluated = if let Some(value) = value {
                match constant.kind {
                    ConstantKind::Bool(_) | ConstantKind::Scalar(_) if constant.is_spec => {},
                    _ => return Err(Error::specialization(format!("constant {} is not a scalar specialization constant", const_id))),
                }
                let nbyte = ty.scalar_nbyte()
                    .ok_or_else(|| Error::corrupted(format!("constant {} is not a scalar", const_id)))?;
                if value.len() != nbyte {
                    return Err(Error::InvalidArgument(format!("specialization of constant {} has {} bytes, expected {}",
                        const_id, value.len(), nbyte)));
                }
                ConstantValue::from_bytes(ty, value).map(Evaluated::Scalar)
            } else {
                out.eval(ty, constant.kind)
            };
            if let Some(spec_id) = spec_id {
                let spec_const = SpecConstant {
                    name: graph.get_name(const_id, None).map(|x| x.to_owned()),
                    spec_id,
                    const_id,
                    ty: constant.ty,
                    value: evaluated.as_ref().and_then(|x| x.as_scalar()).copied(),
                    is_overridden: value.is_some(),
                };
                out.spec_consts.push(spec_const);
            }
            if let Some(evaluated) = evaluated {
                out.values.insert(const_id, evaluated);
            }
        }
        debug!("evaluated {} of {} constants, {} overridden", out.values.len(),
            graph.const_order.len(), out.spec_consts.iter().filter(|x| x.is_overridden).count());
        Ok(out)
    }
    fn eval(&self, ty: &Type, kind: ConstantKind) -> Option<Evaluated> {
        match kind {
            ConstantKind::Bool(x) => Some(Evaluated::Scalar(ConstantValue::Bool(x))),
            ConstantKind::Scalar(words) => ConstantValue::from_words(ty, words).map(Evaluated::Scalar),
            ConstantKind::Composite(constituents) => {
                constituents.iter()
                    .map(|x| self.values.get(x).cloned())
                    .collect::<Option<Vec<_>>>()
                    .map(Evaluated::Composite)
            },
            ConstantKind::SpecOp { opcode: OP_COMPOSITE_EXTRACT, operands } => {
                let (composite, idxs) = operands.split_first()?;
                self.values.get(composite)?.extract(idxs).cloned()
            },
            ConstantKind::SpecOp { opcode, operands } => {
                let args = operands.iter()
                    .map(|x| self.get(*x).copied())
                    .collect::<Option<Vec<_>>>()?;
                let value = fold(opcode, ty, &args);
                if value.is_none() {
                    debug!("cannot fold spec constant op {} on {:?}", opcode, args);
                }
                value.map(Evaluated::Scalar)
            },
            ConstantKind::Opaque => None,
        }
    }

    /// Scalar value of a constant, `None` if it couldn't be evaluated.
    pub fn get(&self, const_id: ConstantId) -> Option<&ConstantValue> {
        self.values.get(&const_id).and_then(|x| x.as_scalar())
    }
    pub fn get_evaluated(&self, const_id: ConstantId) -> Option<&Evaluated> {
        self.values.get(&const_id)
    }
    /// Concrete element count of an array type whose length is held by
    /// `len_id`.
    pub fn array_len(&self, graph: &ModuleGraph, len_id: ConstantId) -> Result<u32> {
        let len = self.get(len_id)
            .and_then(|x| x.to_u32())
            .filter(|x| *x > 0);
        match (graph.array_len_src(len_id)?, len) {
            (_, Some(len)) => Ok(len),
            (ArrayLength::Literal(_), None) => {
                Err(Error::corrupted(format!("array length {} is not a positive integer", len_id)))
            },
            (ArrayLength::Specialized(_), None) => {
                Err(Error::specialization(format!("array length {} is not specialized to a positive integer", len_id)))
            },
        }
    }
}

/// Fold an integer or boolean `OpSpecConstantOp`. `None` if the op isn't
/// foldable or the result is undefined.
fn fold(opcode: u32, ty: &Type, args: &[ConstantValue]) -> Option<ConstantValue> {
    use ConstantValue::Bool;
    match (opcode, args) {
        (OP_LOGICAL_NOT, [Bool(a)]) => return Some(Bool(!a)),
        (OP_LOGICAL_EQUAL, [Bool(a), Bool(b)]) => return Some(Bool(a == b)),
        (OP_LOGICAL_NOT_EQUAL, [Bool(a), Bool(b)]) => return Some(Bool(a != b)),
        (OP_LOGICAL_OR, [Bool(a), Bool(b)]) => return Some(Bool(*a || *b)),
        (OP_LOGICAL_AND, [Bool(a), Bool(b)]) => return Some(Bool(*a && *b)),
        (OP_SELECT, [Bool(c), a, b]) => return Some(if *c { *a } else { *b }),
        _ => {},
    }
    let ints = args.iter()
        .map(|x| x.as_int())
        .collect::<Option<Vec<_>>>()?;
    let cmp = match (opcode, ints.as_slice()) {
        (OP_I_EQUAL, [a, b]) => Some(a.0 == b.0),
        (OP_I_NOT_EQUAL, [a, b]) => Some(a.0 != b.0),
        (OP_U_GREATER_THAN, [a, b]) => Some(a.0 > b.0),
        (OP_S_GREATER_THAN, [a, b]) => Some(a.1 > b.1),
        (OP_U_GREATER_THAN_EQUAL, [a, b]) => Some(a.0 >= b.0),
        (OP_S_GREATER_THAN_EQUAL, [a, b]) => Some(a.1 >= b.1),
        (OP_U_LESS_THAN, [a, b]) => Some(a.0 < b.0),
        (OP_S_LESS_THAN, [a, b]) => Some(a.1 < b.1),
        (OP_U_LESS_THAN_EQUAL, [a, b]) => Some(a.0 <= b.0),
        (OP_S_LESS_THAN_EQUAL, [a, b]) => Some(a.1 <= b.1),
        _ => None,
    };
    if let Some(x) = cmp { return Some(Bool(x)); }
    let bits = match (opcode, ints.as_slice()) {
        (OP_S_NEGATE, [a]) => a.1.wrapping_neg() as u64,
        (OP_NOT, [a]) => !a.0,
        (OP_U_CONVERT, [a]) => a.0,
        (OP_S_CONVERT, [a]) => a.1 as u64,
        (OP_I_ADD, [a, b]) => a.0.wrapping_add(b.0),
        (OP_I_SUB, [a, b]) => a.0.wrapping_sub(b.0),
        (OP_I_MUL, [a, b]) => a.0.wrapping_mul(b.0),
        (OP_U_DIV, [a, b]) => a.0.checked_div(b.0)?,
        (OP_S_DIV, [a, b]) => a.1.checked_div(b.1)? as u64,
        (OP_U_MOD, [a, b]) => a.0.checked_rem(b.0)?,
        (OP_S_REM, [a, b]) => a.1.checked_rem(b.1)? as u64,
        (OP_S_MOD, [a, b]) => {
            // The result takes the sign of the divisor.
            let rem = a.1.checked_rem(b.1)?;
            if rem != 0 && (rem < 0) != (b.1 < 0) { (rem + b.1) as u64 } else { rem as u64 }
        },
        (OP_SHIFT_RIGHT_LOGICAL, [a, b]) if b.0 < 64 => a.0 >> b.0,
        (OP_SHIFT_RIGHT_ARITHMETIC, [a, b]) if b.0 < 64 => (a.1 >> b.0) as u64,
        (OP_SHIFT_LEFT_LOGICAL, [a, b]) if b.0 < 64 => a.0 << b.0,
        (OP_BITWISE_OR, [a, b]) => a.0 | b.0,
        (OP_BITWISE_XOR, [a, b]) => a.0 ^ b.0,
        (OP_BITWISE_AND, [a, b]) => a.0 & b.0,
        _ => return None,
    };
    ConstantValue::int_of(ty, bits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::SpirvModule;
    use crate::test_utils::ModuleBuilder;

    fn spec(spec_id: u32, value: u32) -> Specialization {
        Specialization { spec_id, value: value.to_le_bytes().to_vec() }
    }

    #[test]
    fn test_fold_int_ops() {
        let int = Type::Int { nbit: 32, is_signed: true };
        let v = |x: i32| ConstantValue::Int { nbit: 32, is_signed: true, bits: x as u32 as u64 };
        assert_eq!(fold(OP_I_ADD, &int, &[v(3), v(-5)]), Some(v(-2)));
        assert_eq!(fold(OP_S_DIV, &int, &[v(-7), v(2)]), Some(v(-3)));
        assert_eq!(fold(OP_S_MOD, &int, &[v(-7), v(3)]), Some(v(2)));
        assert_eq!(fold(OP_S_REM, &int, &[v(-7), v(3)]), Some(v(-1)));
        assert_eq!(fold(OP_U_DIV, &int, &[v(1), v(0)]), None);
        assert_eq!(fold(OP_S_LESS_THAN, &Type::Bool, &[v(-1), v(0)]), Some(ConstantValue::Bool(true)));
        assert_eq!(fold(OP_U_LESS_THAN, &Type::Bool, &[v(-1), v(0)]), Some(ConstantValue::Bool(false)));
        assert_eq!(fold(OP_SHIFT_RIGHT_ARITHMETIC, &int, &[v(-8), v(1)]), Some(v(-4)));
    }
    #[test]
    fn test_override_and_fold() {
        let mut b = ModuleBuilder::new();
        let uint = b.ty_int(32, false);
        let n = b.spec_constant(uint, 4);
        b.decorate(n, DECO_SPEC_ID, &[7]);
        b.name(n, "N");
        let two = b.constant(uint, 2);
        let n2 = b.spec_constant_op(uint, OP_I_MUL, &[n, two]);
        let words = b.build();
        let module = SpirvModule::new(&words).unwrap();
        let graph = ModuleGraph::build(&module).unwrap();

        let specialized = Specialized::apply(&graph, &[]).unwrap();
        assert_eq!(specialized.array_len(&graph, n2).unwrap(), 8);
        assert!(!specialized.spec_consts[0].is_overridden);

        let specialized = Specialized::apply(&graph, &[spec(7, 5)]).unwrap();
        assert_eq!(specialized.array_len(&graph, n2).unwrap(), 10);
        assert_eq!(specialized.array_len(&graph, two).unwrap(), 2);
        let spec_const = &specialized.spec_consts[0];
        assert_eq!(spec_const.name.as_ref().map(|x| x.as_str()), Some("N"));
        assert_eq!(spec_const.spec_id, 7);
        assert_eq!(spec_const.value.and_then(|x| x.to_u32()), Some(5));
        assert!(spec_const.is_overridden);

        // Zero-length arrays don't exist.
        let specialized = Specialized::apply(&graph, &[spec(7, 0)]).unwrap();
        match specialized.array_len(&graph, n2) {
            Err(Error::InvalidSpecialization(_)) => {},
            x => panic!("unexpected {:?}", x),
        }
    }
    #[test]
    fn test_bad_overrides() {
        let mut b = ModuleBuilder::new();
        let uint = b.ty_int(32, false);
        let n = b.spec_constant(uint, 4);
        b.decorate(n, DECO_SPEC_ID, &[0]);
        let words = b.build();
        let module = SpirvModule::new(&words).unwrap();
        let graph = ModuleGraph::build(&module).unwrap();

        let empty = Specialization { spec_id: 0, value: Vec::new() };
        match Specialized::apply(&graph, &[empty]) {
            Err(Error::OutOfRange(_)) => {},
            x => panic!("unexpected {:?}", x),
        }
        let short = Specialization { spec_id: 0, value: vec![1, 0] };
        match Specialized::apply(&graph, &[short]) {
            Err(Error::InvalidArgument(_)) => {},
            x => panic!("unexpected {:?}", x),
        }
        match Specialized::apply(&graph, &[spec(0, 1), spec(0, 2)]) {
            Err(Error::InvalidArgument(_)) => {},
            x => panic!("unexpected {:?}", x),
        }
        // Unknown spec IDs are ignored.
        let specialized = Specialized::apply(&graph, &[spec(9, 1)]).unwrap();
        assert_eq!(specialized.get(n).and_then(|x| x.to_u32()), Some(4));
    }
}
