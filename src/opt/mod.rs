//! SSA optimization passes and the pass manager.

use std::fmt;

use bitflags::bitflags;
use thiserror::Error;
use tracing::{debug, info};

use crate::analysis::Analyses;
use crate::config::OptConfig;
use crate::ir::{Function, VerifyError, verify_function};

pub mod cmp;
pub mod dve;

bitflags! {
    /// Structural guarantees a function is known to satisfy.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct IrProperties: u32 {
        /// Single definition per value, every use defined (see `ir::verify`).
        const SSA = 1 << 0;
    }
}

bitflags! {
    /// Work the pass manager performs after a pass has run.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct TodoFlags: u32 {
        /// Drop side-effect-free instructions whose results are no longer read.
        const REMOVE_UNUSED_VALUES = 1 << 0;
        /// Re-verify the function even when verification is off in the config.
        const VERIFY = 1 << 1;
    }
}

/// Static description of a pass.
#[derive(Debug)]
pub struct PassInfo {
    pub name: &'static str,
    pub required: IrProperties,
    pub provided: IrProperties,
    pub destroyed: IrProperties,
    pub finish: TodoFlags,
    /// Passes that must not appear earlier in the pipeline than this one.
    pub run_before: &'static [&'static str],
    /// The pass never adds, removes or retargets blocks.
    pub preserves_cfg: bool,
}

/// SSA optimization pass trait.
pub trait Pass {
    fn info(&self) -> &'static PassInfo;

    /// Gate evaluated once per function before `run`.
    fn should_run(&self, _config: &OptConfig) -> bool {
        true
    }

    /// Transforms `func` in place and returns true if anything changed.
    fn run(&mut self, func: &mut Function, analyses: &mut Analyses) -> bool;

    fn name(&self) -> &'static str {
        self.info().name
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineError {
    #[error("pass '{pass}' must run before '{other}'")]
    Ordering {
        pass: &'static str,
        other: &'static str,
    },

    #[error("pass '{pass}' requires {missing:?} on function '{func}'")]
    MissingProperty {
        pass: &'static str,
        func: String,
        missing: IrProperties,
    },

    #[error("after pass '{pass}': {source}")]
    Verify {
        pass: &'static str,
        #[source]
        source: VerifyError,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassOutcome {
    /// The gate rejected the pass.
    Skipped,
    Unchanged,
    Changed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassRun {
    pub pass: &'static str,
    pub func: String,
    pub outcome: PassOutcome,
    /// Values removed by the pass's finish work.
    pub removed_values: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineReport {
    pub runs: Vec<PassRun>,
}

impl PipelineReport {
    pub fn changed(&self, pass: &str, func: &str) -> bool {
        self.runs
            .iter()
            .any(|run| run.pass == pass && run.func == func && run.outcome == PassOutcome::Changed)
    }

    pub fn outcome(&self, pass: &str, func: &str) -> Option<PassOutcome> {
        self.runs
            .iter()
            .find(|run| run.pass == pass && run.func == func)
            .map(|run| run.outcome)
    }
}

impl fmt::Display for PipelineReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for run in &self.runs {
            let outcome = match run.outcome {
                PassOutcome::Skipped => "skipped",
                PassOutcome::Unchanged => "unchanged",
                PassOutcome::Changed => "changed",
            };
            write!(f, "{:<8} {:<16} {}", run.pass, run.func, outcome)?;
            if run.removed_values > 0 {
                write!(f, " (removed {} values)", run.removed_values)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

pub struct PassManager {
    config: OptConfig,
    passes: Vec<Box<dyn Pass>>,
}

impl PassManager {
    pub fn new(config: OptConfig) -> Self {
        Self {
            config,
            passes: Vec::new(),
        }
    }

    /// The default pipeline: comparison canonicalization, then dead value elimination.
    pub fn standard(config: OptConfig) -> Self {
        Self {
            config,
            passes: vec![cmp::make_pass_cmp(), dve::make_pass_dve()],
        }
    }

    pub fn pass_names(&self) -> Vec<&'static str> {
        self.passes.iter().map(|pass| pass.name()).collect()
    }

    /// Appends a pass, rejecting it if a pass it must precede is already scheduled.
    pub fn add(&mut self, pass: Box<dyn Pass>) -> Result<(), PipelineError> {
        let info = pass.info();
        if let Some(other) = self
            .passes
            .iter()
            .map(|existing| existing.name())
            .find(|name| info.run_before.contains(name))
        {
            return Err(PipelineError::Ordering {
                pass: info.name,
                other,
            });
        }
        self.passes.push(pass);
        Ok(())
    }

    pub fn run(&mut self, funcs: &mut [Function]) -> Result<PipelineReport, PipelineError> {
        let mut report = PipelineReport::default();
        let mut states: Vec<(IrProperties, Analyses)> = funcs
            .iter()
            .map(|func| (initial_properties(func), Analyses::new()))
            .collect();

        for pass in &mut self.passes {
            let info = pass.info();
            for (func, (props, analyses)) in funcs.iter_mut().zip(states.iter_mut()) {
                if !pass.should_run(&self.config) {
                    debug!(pass = info.name, func = %func.name, "gate rejected pass");
                    report.runs.push(PassRun {
                        pass: info.name,
                        func: func.name.clone(),
                        outcome: PassOutcome::Skipped,
                        removed_values: 0,
                    });
                    continue;
                }

                if !props.contains(info.required) {
                    return Err(PipelineError::MissingProperty {
                        pass: info.name,
                        func: func.name.clone(),
                        missing: info.required.difference(*props),
                    });
                }

                info!(pass = info.name, func = %func.name, "running pass");
                let changed = pass.run(func, analyses);
                if changed && !info.preserves_cfg {
                    analyses.invalidate_cfg();
                }
                *props = props.difference(info.destroyed).union(info.provided);

                let removed_values = if info.finish.contains(TodoFlags::REMOVE_UNUSED_VALUES) {
                    dve::remove_unused_values(func)
                } else {
                    0
                };
                let verify = info.finish.contains(TodoFlags::VERIFY)
                    || (self.config.verify && (changed || removed_values > 0));
                if verify {
                    verify_function(func).map_err(|source| PipelineError::Verify {
                        pass: info.name,
                        source,
                    })?;
                }

                report.runs.push(PassRun {
                    pass: info.name,
                    func: func.name.clone(),
                    outcome: if changed {
                        PassOutcome::Changed
                    } else {
                        PassOutcome::Unchanged
                    },
                    removed_values,
                });
            }
        }

        Ok(report)
    }
}

fn initial_properties(func: &Function) -> IrProperties {
    match verify_function(func) {
        Ok(()) => IrProperties::SSA,
        Err(err) => {
            debug!(func = %func.name, %err, "function is not in SSA form");
            IrProperties::empty()
        }
    }
}

#[cfg(test)]
#[path = "../tests/opt/t_pipeline.rs"]
mod t_pipeline;
