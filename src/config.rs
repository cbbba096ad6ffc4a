//! Optimizer configuration.
//!
//! The configuration is an immutable value handed to the pass manager and from there to
//! every pass gate; nothing in the optimizer reads process-wide state.

use clap::ValueEnum;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OptLevel {
    #[value(name = "0")]
    O0,
    #[value(name = "1")]
    O1,
    #[value(name = "2")]
    O2,
    #[value(name = "3")]
    O3,
    #[value(name = "s")]
    Os,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OptConfig {
    /// Enables the signed comparison canonicalization pass.
    pub tree_cmp: bool,
    /// Signed overflow wraps (two's complement) instead of being undefined.
    pub wrapv: bool,
    /// Re-verify functions after passes that changed them.
    pub verify: bool,
}

impl OptConfig {
    pub fn from_level(level: OptLevel) -> Self {
        Self {
            tree_cmp: level != OptLevel::O0,
            wrapv: false,
            verify: true,
        }
    }

    pub fn with_tree_cmp(mut self, enabled: bool) -> Self {
        self.tree_cmp = enabled;
        self
    }

    pub fn with_wrapv(mut self, wrapv: bool) -> Self {
        self.wrapv = wrapv;
        self
    }

    pub fn with_verify(mut self, verify: bool) -> Self {
        self.verify = verify;
        self
    }
}

impl Default for OptConfig {
    fn default() -> Self {
        Self::from_level(OptLevel::O2)
    }
}
