//! 3.0-dialect execution adapter.
//!
//! The modern engine enforces strict content models: probes are non-output
//! sequence instructions tagged with an idempotence marker, more contexts
//! are off limits to instrumentation, and embedded script blocks are
//! refused outright before any instrumentation happens.

use std::collections::BTreeSet;
use std::sync::Arc;

use xslt_sheet::Dialect;

use crate::adapter::{ExecutionAdapter, LaunchSpec, RunCore, VariantPolicy};
use crate::debug::{DebugControl, RunSinks};
use crate::engine::EngineFactory;
use crate::error::LaunchError;

const POLICY: VariantPolicy = VariantPolicy {
    name: "modern",
    dialect: Dialect::V3,
    refuse_embedded_script: true,
    expected_major: 3,
};

pub struct ModernAdapter {
    core: RunCore,
    factory: Arc<dyn EngineFactory>,
}

impl ModernAdapter {
    #[must_use]
    pub fn new(factory: Arc<dyn EngineFactory>, sinks: RunSinks) -> Self {
        Self {
            core: RunCore::new(sinks),
            factory,
        }
    }
}

impl ExecutionAdapter for ModernAdapter {
    fn start(&mut self, spec: &LaunchSpec) -> Result<(), LaunchError> {
        let engine = self.factory.create();
        self.core.launch(engine, POLICY, spec)
    }

    fn set_breakpoints(&mut self, file: &str, lines: &BTreeSet<u32>) {
        self.core.set_breakpoints(file, lines);
    }

    fn continue_run(&self) {
        self.core.control().continue_run();
    }

    fn step_over(&self) {
        self.core.control().step_over();
    }

    fn step_in(&self) {
        self.core.control().step_in();
    }

    fn step_out(&self) {
        self.core.control().step_out();
    }

    fn detach(&self) {
        self.core.control().detach();
    }

    fn control(&self) -> DebugControl {
        self.core.control()
    }

    fn dialect(&self) -> Dialect {
        Dialect::V3
    }
}
