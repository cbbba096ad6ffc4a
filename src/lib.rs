//! SSA middle end that canonicalizes signed `(x - y) R 0` branch conditions.

pub mod analysis;
pub mod config;
pub mod error;
pub mod ir;
pub mod opt;

pub use error::Error;

use crate::config::OptConfig;
use crate::ir::{Module, verify_module};
use crate::opt::{PassManager, PipelineReport};

/// Verifies `module` and runs the standard pipeline over every function in it.
pub fn optimize(module: &mut Module, config: OptConfig) -> Result<PipelineReport, Error> {
    verify_module(module)?;
    let mut manager = PassManager::standard(config);
    Ok(manager.run(&mut module.funcs)?)
}

#[cfg(test)]
#[path = "tests/support.rs"]
pub(crate) mod test_support;
