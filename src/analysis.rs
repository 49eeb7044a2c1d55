//! Per-entry-point reachability over the call graph.
use std::collections::BTreeSet;
use log::debug;
use crate::error::{Error, Result};
use crate::graph::{EntryPointDecl, ModuleGraph};
use crate::instr::{FunctionId, VariableId};

#[derive(Debug, Default, Clone)]
pub struct Reachability {
    /// Functions whose bodies contribute to the entry point.
    pub funcs: BTreeSet<FunctionId>,
    /// Resource variables the entry point uses.
    pub rsc_vars: BTreeSet<VariableId>,
    /// Input and output variables in interface declaration order.
    pub interface_vars: Vec<VariableId>,
}
impl Reachability {
    /// With `ref_all_rscs` every resource variable in the module is
    /// attributed to the entry point, and every function body is considered.
    pub fn analyze(
        graph: &ModuleGraph,
        entry_point: &EntryPointDecl,
        ref_all_rscs: bool,
    ) -> Result<Reachability> {
        let mut out = Reachability::default();
        if ref_all_rscs {
            out.funcs.extend(graph.func_map.keys());
            out.rsc_vars.extend(graph.var_map.iter()
                .filter(|(_, var)| var.store_cls.is_resource())
                .map(|(var_id, _)| *var_id));
        } else {
            let mut worklist = vec![entry_point.func_id];
            while let Some(func_id) = worklist.pop() {
                if !out.funcs.insert(func_id) { continue; }
                let func = graph.func_map.get(&func_id)
                    .ok_or_else(|| Error::corrupted(format!("function {} is not defined", func_id)))?;
                worklist.extend(func.callees.iter().filter(|x| !out.funcs.contains(*x)));
                for var_id in func.accessed_vars.iter() {
                    let var = graph.get_var(*var_id)?;
                    if var.store_cls.is_resource() {
                        out.rsc_vars.insert(*var_id);
                    }
                }
            }
        }
        for &var_id in entry_point.interface_ids.iter() {
            let var = graph.get_var(var_id)?;
            if var.store_cls.is_interface() && !out.interface_vars.contains(&var_id) {
                out.interface_vars.push(var_id);
            }
        }
        debug!("entry point {} reaches {} functions and {} resources", entry_point.name,
            out.funcs.len(), out.rsc_vars.len());
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::SpirvModule;
    use crate::test_utils::ModuleBuilder;
    use crate::ty::{ExecutionModel, StorageClass};

    #[test]
    fn test_transitive_calls() {
        let mut b = ModuleBuilder::new();
        let void = b.ty_void();
        let float = b.ty_float(32);
        let block = b.ty_struct(&[float]);
        let ptr = b.ty_ptr(StorageClass::Uniform, block);
        let used = b.variable(ptr, StorageClass::Uniform);
        let unused = b.variable(ptr, StorageClass::Uniform);
        let in_ptr = b.ty_ptr(StorageClass::Input, float);
        let input = b.variable(in_ptr, StorageClass::Input);

        let leaf = b.function(void);
        b.load(block, used);
        b.function_end();
        let mid = b.function(void);
        b.call(void, leaf);
        b.function_end();
        let main = b.function(void);
        b.call(void, mid);
        // Recursion must terminate too.
        b.call(void, main);
        b.function_end();
        let other = b.function(void);
        b.load(block, unused);
        b.function_end();
        b.entry_point(ExecutionModel::Fragment, main, "main", &[input, input]);
        b.entry_point(ExecutionModel::Fragment, other, "other", &[]);

        let words = b.build();
        let module = SpirvModule::new(&words).unwrap();
        let graph = ModuleGraph::build(&module).unwrap();
        let main_decl = &graph.entry_points[0];
        let reach = Reachability::analyze(&graph, main_decl, false).unwrap();
        assert_eq!(reach.funcs.iter().copied().collect::<Vec<_>>(), vec![leaf, mid, main]);
        assert_eq!(reach.rsc_vars.iter().copied().collect::<Vec<_>>(), vec![used]);
        assert_eq!(reach.interface_vars, vec![input]);

        let reach = Reachability::analyze(&graph, main_decl, true).unwrap();
        assert_eq!(reach.rsc_vars.iter().copied().collect::<Vec<_>>(), vec![used, unused]);
        assert_eq!(reach.funcs.len(), 4);
    }
}
