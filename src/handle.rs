//! Reflection handle with create/destroy states and entry point
//! enumeration.
use std::ops::Deref;
use log::debug;
use crate::error::{Error, Result};
use crate::reflect::{EntryPoint, ReflectConfig, Reflection};
use crate::ty::{TypeDesc, TypeIdx};

#[derive(Debug)]
enum HandleState {
    Uninitialized,
    Created(Reflection),
    Destroyed,
}

/// A view of one entry point in a reflection. It can't outlive the
/// reflection it's taken from.
#[derive(Debug, Clone, Copy)]
pub struct EntryPointRef<'a> {
    refl: &'a Reflection,
    idx: usize,
}
impl<'a> EntryPointRef<'a> {
    pub fn reflection(&self) -> &'a Reflection { self.refl }
    /// Position of the entry point in the reflection.
    pub fn index(&self) -> usize { self.idx }
    pub fn ty(&self, idx: TypeIdx) -> Option<&'a TypeDesc> { self.refl.ty(idx) }
}
impl<'a> Deref for EntryPointRef<'a> {
    type Target = EntryPoint;
    fn deref(&self) -> &EntryPoint { &self.refl.entry_points()[self.idx] }
}

#[derive(Debug)]
pub struct ReflectionHandle {
    state: HandleState,
}
impl Default for ReflectionHandle {
    fn default() -> Self { ReflectionHandle::new() }
}
impl ReflectionHandle {
    pub fn new() -> ReflectionHandle {
        ReflectionHandle { state: HandleState::Uninitialized }
    }
    /// Reflect with `cfg`. The handle is left as it was if reflection fails.
    pub fn create(&mut self, cfg: &ReflectConfig) -> Result<()> {
        if self.is_created() {
            return Err(Error::InvalidArgument("handle already holds a reflection".to_owned()));
        }
        let refl = cfg.reflect()?;
        self.state = HandleState::Created(refl);
        Ok(())
    }
    /// Release the reflection. Does nothing if there's none.
    pub fn destroy(&mut self) {
        if let HandleState::Created(_) = self.state {
            debug!("destroyed reflection");
        }
        self.state = HandleState::Destroyed;
    }
    pub fn is_created(&self) -> bool {
        if let HandleState::Created(_) = self.state { true } else { false }
    }
    pub fn reflection(&self) -> Option<&Reflection> {
        if let HandleState::Created(refl) = &self.state { Some(refl) } else { None }
    }
    /// Without `out`, return the number of entry points. With `out`, fill
    /// its first elements with entry point views and return the count; `out`
    /// is left untouched if it's too short.
    pub fn enumerate_entry_points<'a>(
        &'a self,
        out: Option<&mut [Option<EntryPointRef<'a>>]>,
    ) -> Result<usize> {
        let refl = self.reflection()
            .ok_or(Error::NullArgument("reflection"))?;
        let count = refl.entry_points().len();
        if let Some(out) = out {
            if out.len() < count {
                return Err(Error::OutOfRange(format!("{} entry points don't fit in {} slots",
                    count, out.len())));
            }
            for (idx, slot) in out.iter_mut().take(count).enumerate() {
                *slot = Some(EntryPointRef { refl, idx });
            }
        }
        Ok(count)
    }
    /// All entry point views at once.
    pub fn entry_points(&self) -> Result<Vec<EntryPointRef>> {
        let mut out = vec![None; self.enumerate_entry_points(None)?];
        self.enumerate_entry_points(Some(&mut out[..]))?;
        Ok(out.into_iter().flatten().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::ModuleBuilder;
    use crate::ty::ExecutionModel;

    fn minimal() -> Vec<u32> {
        let mut b = ModuleBuilder::new();
        let void = b.ty_void();
        let func = b.function(void);
        b.function_end();
        b.entry_point(ExecutionModel::GLCompute, func, "main", &[]);
        b.build()
    }

    #[test]
    fn test_state_machine() {
        let mut handle = ReflectionHandle::new();
        match handle.enumerate_entry_points(None) {
            Err(Error::NullArgument(_)) => {},
            x => panic!("unexpected {:?}", x),
        }
        // Never-created handles can be destroyed.
        handle.destroy();
        handle.destroy();
        assert!(!handle.is_created());

        let mut cfg = ReflectConfig::new();
        cfg.spv(minimal());
        handle.create(&cfg).unwrap();
        assert!(handle.is_created());
        match handle.create(&cfg) {
            Err(Error::InvalidArgument(_)) => {},
            x => panic!("unexpected {:?}", x),
        }
        handle.destroy();
        handle.destroy();
        assert!(!handle.is_created());
        assert!(handle.reflection().is_none());
    }
    #[test]
    fn test_failed_create_leaves_handle() {
        let mut words = minimal();
        words[0] = 0xDEADBEEF;
        let mut cfg = ReflectConfig::new();
        cfg.spv(words);
        let mut handle = ReflectionHandle::new();
        assert!(handle.create(&cfg).unwrap_err().is_corrupted());
        assert!(!handle.is_created());
    }
    #[test]
    fn test_two_call_enumeration() {
        let mut cfg = ReflectConfig::new();
        cfg.spv(minimal());
        let mut handle = ReflectionHandle::new();
        handle.create(&cfg).unwrap();
        let count = handle.enumerate_entry_points(None).unwrap();
        assert_eq!(count, 1);

        let mut empty: [Option<EntryPointRef>; 0] = [];
        match handle.enumerate_entry_points(Some(&mut empty[..])) {
            Err(Error::OutOfRange(_)) => {},
            x => panic!("unexpected {:?}", x),
        }
        let mut out = [None, None];
        assert_eq!(handle.enumerate_entry_points(Some(&mut out[..])).unwrap(), 1);
        let entry_point = out[0].unwrap();
        assert_eq!(entry_point.name, "main");
        assert_eq!(entry_point.exec_model, ExecutionModel::GLCompute);
        assert!(out[1].is_none());
        assert_eq!(handle.entry_points().unwrap().len(), 1);
    }
}
