//! Centralized storage for WGSL kernel sources and their binding contract.

pub mod compute {
    /// Single-record expression kernel.
    pub const EVALUATE_EXPRESSION: &str = include_str!("kernels/evaluate_expression.wgsl");

    pub const EVALUATE_EXPRESSION_ENTRY: &str = "evaluate_expression";
}

/// Binding slots of the expression kernel, all in bind group 0.
pub mod bindings {
    pub const GROUP: u32 = 0;
    pub const RECORD: u32 = 0;
    pub const RESULT: u32 = 1;
    pub const DIAGNOSTICS: u32 = 2;
}

#[cfg(test)]
mod tests {
    use super::*;
    use naga::valid::{Capabilities, ValidationFlags, Validator};

    fn parse_wgsl(label: &str, source: &str) -> naga::Module {
        naga::front::wgsl::parse_str(source).unwrap_or_else(|err| panic!("{label}: {err:?}"))
    }

    #[test]
    fn compute_shaders_validate() {
        let module = parse_wgsl("evaluate_expression", compute::EVALUATE_EXPRESSION);
        let mut validator = Validator::new(ValidationFlags::all(), Capabilities::all());
        validator
            .validate(&module)
            .unwrap_or_else(|err| panic!("evaluate_expression: {err:?}"));
    }

    #[test]
    fn entry_point_runs_a_single_invocation() {
        let module = parse_wgsl("evaluate_expression", compute::EVALUATE_EXPRESSION);
        let entry = module
            .entry_points
            .iter()
            .find(|ep| ep.name == compute::EVALUATE_EXPRESSION_ENTRY)
            .expect("entry point present");
        assert_eq!(entry.stage, naga::ShaderStage::Compute);
        assert_eq!(entry.workgroup_size, [1, 1, 1]);
    }

    #[test]
    fn binding_contract_is_preserved() {
        let module = parse_wgsl("evaluate_expression", compute::EVALUATE_EXPRESSION);
        let mut seen = Vec::new();
        for (_, var) in module.global_variables.iter() {
            let Some(binding) = &var.binding else {
                continue;
            };
            assert_eq!(binding.group, bindings::GROUP);
            let naga::AddressSpace::Storage { access } = var.space else {
                panic!("binding {} is not a storage buffer", binding.binding);
            };
            let size = module.types[var.ty].inner.size(module.to_ctx());
            match binding.binding {
                bindings::RECORD => {
                    assert!(!access.contains(naga::StorageAccess::STORE));
                    assert_eq!(size, 16);
                }
                bindings::RESULT => {
                    assert!(access.contains(naga::StorageAccess::STORE));
                    assert_eq!(size, 4);
                }
                bindings::DIAGNOSTICS => {
                    assert!(access.contains(naga::StorageAccess::STORE));
                    assert_eq!(size, 64);
                }
                other => panic!("unexpected binding {other}"),
            }
            seen.push(binding.binding);
        }
        seen.sort_unstable();
        assert_eq!(
            seen,
            vec![bindings::RECORD, bindings::RESULT, bindings::DIAGNOSTICS]
        );
    }
}
