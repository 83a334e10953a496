//! Guest module validation: ABI compatibility checks.
//!
//! Validates that a compiled module can be driven by the bridge before it
//! is instantiated. Checks:
//!
//! 1. `memory` export present
//! 2. `init` export present with signature `() -> ()`
//! 3. Optional entry points, when exported, have the expected signature
//! 4. All imports come from the configured import module and name a known
//!    host function (no WASI)

use wasmtime::{ExternType, FuncType, Module, ValType};

use crate::error::BridgeError;
use crate::guest;
use crate::linker::HOST_FUNCTIONS;
use crate::memory::MEMORY_EXPORT;

/// Value kinds used by the boundary ABI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    I32,
    I64,
    F32,
}

fn kind_matches(vt: &ValType, kind: Kind) -> bool {
    matches!(
        (vt, kind),
        (ValType::I32, Kind::I32) | (ValType::I64, Kind::I64) | (ValType::F32, Kind::F32)
    )
}

/// Expected guest export: (name, params, results, required).
const GUEST_EXPORTS: &[(&str, &[Kind], &[Kind], bool)] = &[
    (guest::INIT, &[], &[], true),
    (guest::ON_KEY, &[Kind::I32, Kind::I32], &[], false),
    (
        guest::ON_MOUSE_MOVE,
        &[Kind::F32, Kind::F32, Kind::F32, Kind::F32],
        &[],
        false,
    ),
    (guest::ON_MOUSE_BUTTON, &[Kind::I32, Kind::I32], &[], false),
    (guest::ON_RESIZE, &[Kind::I32, Kind::I32], &[], false),
    (guest::FRAME_BEGIN, &[], &[], false),
    (guest::FRAME, &[], &[Kind::I64], false),
    (guest::FRAME_END, &[], &[], false),
    (guest::QUIT, &[], &[], false),
];

/// Validate that a module meets the bridge ABI for `import_module`.
pub fn validate_module(module: &Module, import_module: &str) -> Result<(), BridgeError> {
    validate_exports(module)?;
    validate_imports(module, import_module)?;
    Ok(())
}

fn validate_exports(module: &Module) -> Result<(), BridgeError> {
    let has_memory = module
        .exports()
        .any(|e| e.name() == MEMORY_EXPORT && matches!(e.ty(), ExternType::Memory(_)));
    if !has_memory {
        return Err(BridgeError::Validation(format!(
            "module must export '{}'",
            MEMORY_EXPORT
        )));
    }

    for &(name, params, results, required) in GUEST_EXPORTS {
        let export = match module.exports().find(|e| e.name() == name) {
            Some(e) => e,
            None if required => {
                return Err(BridgeError::Validation(format!(
                    "missing required export: {}",
                    name
                )));
            }
            None => continue,
        };

        let func_ty = match export.ty() {
            ExternType::Func(ft) => ft,
            _ => {
                return Err(BridgeError::Validation(format!(
                    "export '{}' must be a function",
                    name
                )));
            }
        };

        check_signature(name, &func_ty, params, results)?;
    }

    Ok(())
}

fn check_signature(
    name: &str,
    func_ty: &FuncType,
    params: &[Kind],
    results: &[Kind],
) -> Result<(), BridgeError> {
    let actual_params: Vec<ValType> = func_ty.params().collect();
    let actual_results: Vec<ValType> = func_ty.results().collect();

    let params_ok = actual_params.len() == params.len()
        && actual_params.iter().zip(params).all(|(vt, &k)| kind_matches(vt, k));
    let results_ok = actual_results.len() == results.len()
        && actual_results.iter().zip(results).all(|(vt, &k)| kind_matches(vt, k));

    if !params_ok || !results_ok {
        return Err(BridgeError::Validation(format!(
            "export '{}' has wrong signature: expected {:?} -> {:?}, got {} params and {} results",
            name,
            params,
            results,
            actual_params.len(),
            actual_results.len()
        )));
    }
    Ok(())
}

fn validate_imports(module: &Module, import_module: &str) -> Result<(), BridgeError> {
    for import in module.imports() {
        let module_name = import.module();

        if module_name.starts_with("wasi") {
            return Err(BridgeError::Validation(format!(
                "WASI imports are not allowed: {}::{}",
                module_name,
                import.name()
            )));
        }

        if module_name != import_module {
            return Err(BridgeError::Validation(format!(
                "import from disallowed module '{}' (only '{}' is permitted): {}",
                module_name,
                import_module,
                import.name()
            )));
        }

        if !matches!(import.ty(), ExternType::Func(_)) {
            return Err(BridgeError::Validation(format!(
                "import '{}' must be a function",
                import.name()
            )));
        }

        if !HOST_FUNCTIONS.contains(&import.name()) {
            return Err(BridgeError::Validation(format!(
                "unknown host function: {}",
                import.name()
            )));
        }
    }

    Ok(())
}
