//! Parameter environments

use std::collections::BTreeSet;

use super::env::GlobalEnv;
use super::scope::Scope;
use super::types::{resolve_type, Position};
use crate::common::{CheckError, CheckResult};
use crate::syntax::{Param, Type};

/// Checked parameter list of one function or function type
#[derive(Debug, Clone, Default)]
pub struct ParamEnv {
    /// Resolved `(name, type)` pairs in declaration order
    pub params: Vec<(String, Type)>,
    /// The parameter names
    pub names: BTreeSet<String>,
    /// Outermost local scope of the body
    pub scope: Scope,
}

/// Check each parameter's type and reject repeated names
///
/// Types are validated before names, one parameter at a time.
pub fn build_param_env(env: &GlobalEnv, params: &[Param]) -> CheckResult<ParamEnv> {
    let mut result = ParamEnv::default();
    for param in params {
        let ty = resolve_type(env, &param.ty, Position::Parameter, param.span)?;
        if !result.names.insert(param.name.clone()) {
            return Err(CheckError::duplicate_parameter(&param.name, param.span));
        }
        result
            .scope
            .define(&param.name, ty.clone())
            .map_err(|e| CheckError::type_error(e, param.span))?;
        result.params.push((param.name.clone(), ty));
    }
    Ok(result)
}
