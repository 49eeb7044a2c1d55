//! Member lookup by path and walks over nested struct members.
use crate::reflect::Reflection;
use crate::ty::{TypeDesc, TypeIdx};

/// A member reached from a root type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberRoute {
    /// Dot-separated member names and array indices. Members without a name
    /// are named by their index.
    pub path: String,
    /// Byte offset from the start of the root type. `None` if a member on
    /// the way has no `Offset` or an array has no stride.
    pub offset: Option<usize>,
    pub ty: TypeIdx,
}

fn join_offset(base: Option<usize>, rel: Option<usize>) -> Option<usize> {
    base.and_then(|base| rel.map(|rel| base + rel))
}

/// The `i`-th child of a composite type: its path segment, type and offset
/// within the parent. Runtime arrays have no children to walk.
fn nth_child(refl: &Reflection, ty: TypeIdx, i: usize) -> Option<(String, TypeIdx, Option<usize>)> {
    match refl.ty(ty)? {
        TypeDesc::Struct(struct_ty) => {
            let member = struct_ty.members.get(i)?;
            let seg = member.name.clone().unwrap_or_else(|| i.to_string());
            Some((seg, member.ty, member.offset))
        },
        TypeDesc::Array { elem, nelem, stride } if i < *nelem as usize => {
            Some((i.to_string(), *elem, stride.map(|x| x * i)))
        },
        _ => None,
    }
}

pub(crate) fn resolve(refl: &Reflection, root: TypeIdx, path: &str) -> Option<MemberRoute> {
    let mut ty = root;
    let mut offset = Some(0);
    for seg in path.split('.') {
        let (child_ty, rel_offset) = match refl.ty(ty)? {
            TypeDesc::Struct(struct_ty) => {
                let member = struct_ty.members.iter()
                    .find(|x| x.name.as_ref().map(String::as_str) == Some(seg))
                    .or_else(|| seg.parse::<usize>().ok().and_then(|i| struct_ty.members.get(i)))?;
                (member.ty, member.offset)
            },
            TypeDesc::Array { elem, nelem, stride } => {
                let i = seg.parse::<usize>().ok().filter(|i| *i < *nelem as usize)?;
                (*elem, stride.map(|x| x * i))
            },
            TypeDesc::RuntimeArray { elem, stride } => {
                let i = seg.parse::<usize>().ok()?;
                (*elem, stride.map(|x| x * i))
            },
            _ => return None,
        };
        ty = child_ty;
        offset = join_offset(offset, rel_offset);
    }
    Some(MemberRoute { path: path.to_owned(), offset, ty })
}

struct WalkFrame {
    ty: TypeIdx,
    path: String,
    offset: Option<usize>,
    i: usize,
}

/// Pre-order walk over the members of a type, see
/// `Reflection::walk_members`.
pub struct Walk<'a> {
    refl: &'a Reflection,
    stack: Vec<WalkFrame>,
}
impl<'a> Walk<'a> {
    pub(crate) fn new(refl: &'a Reflection, root: TypeIdx) -> Walk<'a> {
        let frame = WalkFrame { ty: root, path: String::new(), offset: Some(0), i: 0 };
        Walk { refl, stack: vec![frame] }
    }
}
impl<'a> Iterator for Walk<'a> {
    type Item = MemberRoute;
    fn next(&mut self) -> Option<MemberRoute> {
        loop {
            let frame = self.stack.last_mut()?;
            let (seg, ty, rel_offset) = match nth_child(self.refl, frame.ty, frame.i) {
                Some(x) => x,
                None => {
                    self.stack.pop();
                    continue;
                },
            };
            frame.i += 1;
            let path = if frame.path.is_empty() { seg } else { format!("{}.{}", frame.path, seg) };
            let offset = join_offset(frame.offset, rel_offset);
            if nth_child(self.refl, ty, 0).is_some() {
                let child = WalkFrame { ty, path: path.clone(), offset, i: 0 };
                self.stack.push(child);
            }
            return Some(MemberRoute { path, offset, ty });
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::consts::*;
    use crate::reflect::ReflectConfig;
    use crate::test_utils::ModuleBuilder;
    use crate::ty::{ExecutionModel, StorageClass, TypeDesc};

    /// `struct Light { vec4 color; float radius; }` and
    /// `uniform Scene { float time; Light lights[2]; }` at (0, 0).
    fn scene_module() -> Vec<u32> {
        let mut b = ModuleBuilder::new();
        let void = b.ty_void();
        let float = b.ty_float(32);
        let uint = b.ty_int(32, false);
        let vec4 = b.ty_vec(float, 4);
        let light = b.ty_struct(&[vec4, float]);
        b.name(light, "Light");
        b.member_name(light, 0, "color");
        b.member_name(light, 1, "radius");
        b.member_decorate(light, 0, DECO_OFFSET, &[0]);
        b.member_decorate(light, 1, DECO_OFFSET, &[16]);
        let two = b.constant(uint, 2);
        let lights = b.ty_array(light, two);
        b.decorate(lights, DECO_ARRAY_STRIDE, &[32]);
        let scene = b.ty_struct(&[float, lights]);
        b.decorate(scene, DECO_BLOCK, &[]);
        b.member_name(scene, 0, "time");
        b.member_name(scene, 1, "lights");
        b.member_decorate(scene, 0, DECO_OFFSET, &[0]);
        b.member_decorate(scene, 1, DECO_OFFSET, &[16]);
        let ptr = b.ty_ptr(StorageClass::Uniform, scene);
        let ubo = b.variable(ptr, StorageClass::Uniform);
        b.bind(ubo, 0, 0);
        let main = b.function(void);
        b.load(scene, ubo);
        b.function_end();
        b.entry_point(ExecutionModel::Fragment, main, "main", &[]);
        b.build()
    }

    #[test]
    fn test_resolve_member() {
        let words = scene_module();
        let refl = ReflectConfig::new().spv(words).reflect().unwrap();
        let scene = refl.entry_points()[0].desc(0, 0).unwrap().ty;

        let route = refl.resolve_member(scene, "lights.1.radius").unwrap();
        assert_eq!(route.offset, Some(16 + 32 + 16));
        assert_eq!(refl.ty(route.ty), Some(&TypeDesc::Float { nbit: 32 }));
        let route = refl.resolve_member(scene, "1.0").unwrap();
        assert_eq!(route.offset, Some(16));
        assert!(refl.ty(route.ty).map_or(false, |x| x.is_struct()));
        assert!(refl.resolve_member(scene, "lights.2").is_none());
        assert!(refl.resolve_member(scene, "time.x").is_none());
        assert!(refl.resolve_member(scene, "missing").is_none());
    }
    #[test]
    fn test_walk_members() {
        let words = scene_module();
        let refl = ReflectConfig::new().spv(words).reflect().unwrap();
        let scene = refl.entry_points()[0].desc(0, 0).unwrap().ty;
        let routes = refl.walk_members(scene)
            .map(|x| (x.path, x.offset))
            .collect::<Vec<_>>();
        let expected = [
            ("time", 0),
            ("lights", 16),
            ("lights.0", 16),
            ("lights.0.color", 16),
            ("lights.0.radius", 32),
            ("lights.1", 48),
            ("lights.1.color", 48),
            ("lights.1.radius", 64),
        ];
        let expected = expected.iter()
            .map(|(path, offset)| (path.to_string(), Some(*offset)))
            .collect::<Vec<_>>();
        assert_eq!(routes, expected);
    }
}
