//! Merging of separately bound images and samplers that are always used
//! together.
use std::collections::{BTreeMap, BTreeSet};
use log::{debug, warn};
use crate::analysis::Reachability;
use crate::graph::ModuleGraph;
use crate::instr::VariableId;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Combination {
    /// Image variables reported as combined image samplers, mapped to the
    /// sampler each is used with.
    pub combined_imgs: BTreeMap<VariableId, VariableId>,
    /// Sampler variables only ever used with combined images.
    pub removed_samplers: BTreeSet<VariableId>,
}
impl Combination {
    /// Pair images with samplers through the `OpSampledImage` instructions in
    /// reachable functions. Images sampled with more than one sampler stay
    /// separate.
    pub fn combine(graph: &ModuleGraph, reach: &Reachability) -> Combination {
        let mut img_samplers: BTreeMap<VariableId, BTreeSet<VariableId>> = BTreeMap::new();
        let mut sampler_imgs: BTreeMap<VariableId, BTreeSet<VariableId>> = BTreeMap::new();
        for func_id in reach.funcs.iter() {
            let func = match graph.func_map.get(func_id) {
                Some(x) => x,
                None => continue,
            };
            for &(img, sampler) in func.sampled_imgs.iter() {
                // Images and samplers passed around as function parameters
                // don't resolve to variables.
                if !reach.rsc_vars.contains(&img) || !reach.rsc_vars.contains(&sampler) {
                    continue;
                }
                img_samplers.entry(img).or_default().insert(sampler);
                sampler_imgs.entry(sampler).or_default().insert(img);
            }
        }
        let mut out = Combination::default();
        for (img, samplers) in img_samplers.iter() {
            if samplers.len() == 1 {
                if let Some(&sampler) = samplers.iter().next() {
                    out.combined_imgs.insert(*img, sampler);
                }
            } else {
                warn!("image {} is sampled with {} samplers; left uncombined", img, samplers.len());
            }
        }
        for (sampler, imgs) in sampler_imgs.iter() {
            if imgs.iter().all(|x| out.combined_imgs.contains_key(x)) {
                out.removed_samplers.insert(*sampler);
            }
        }
        debug!("combined {} images, removed {} samplers", out.combined_imgs.len(),
            out.removed_samplers.len());
        out
    }
    pub fn is_empty(&self) -> bool {
        self.combined_imgs.is_empty() && self.removed_samplers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::SpirvModule;
    use crate::test_utils::ModuleBuilder;
    use crate::ty::{ExecutionModel, StorageClass};

    #[test]
    fn test_shared_and_ambiguous() {
        let mut b = ModuleBuilder::new();
        let void = b.ty_void();
        let float = b.ty_float(32);
        let img_ty = b.ty_image(float, 1, 1);
        let sampler_ty = b.ty_sampler();
        let sampled_img_ty = b.ty_sampled_image(img_ty);
        let img_ptr = b.ty_ptr(StorageClass::UniformConstant, img_ty);
        let sampler_ptr = b.ty_ptr(StorageClass::UniformConstant, sampler_ty);
        let img_a = b.variable(img_ptr, StorageClass::UniformConstant);
        let img_b = b.variable(img_ptr, StorageClass::UniformConstant);
        let sampler_x = b.variable(sampler_ptr, StorageClass::UniformConstant);
        let sampler_y = b.variable(sampler_ptr, StorageClass::UniformConstant);

        let main = b.function(void);
        // `img_a` only with `sampler_x`; `img_b` with both.
        let a = b.load(img_ty, img_a);
        let bb = b.load(img_ty, img_b);
        let x = b.load(sampler_ty, sampler_x);
        let y = b.load(sampler_ty, sampler_y);
        b.sampled_image(sampled_img_ty, a, x);
        b.sampled_image(sampled_img_ty, bb, x);
        b.sampled_image(sampled_img_ty, bb, y);
        b.function_end();
        b.entry_point(ExecutionModel::Fragment, main, "main", &[]);

        let words = b.build();
        let module = SpirvModule::new(&words).unwrap();
        let graph = ModuleGraph::build(&module).unwrap();
        let reach = Reachability::analyze(&graph, &graph.entry_points[0], false).unwrap();
        let comb = Combination::combine(&graph, &reach);
        assert_eq!(comb.combined_imgs.get(&img_a), Some(&sampler_x));
        assert!(!comb.combined_imgs.contains_key(&img_b));
        // `sampler_x` is still needed by `img_b`; `sampler_y` never by a
        // combined image.
        assert!(comb.removed_samplers.is_empty());
    }
}
