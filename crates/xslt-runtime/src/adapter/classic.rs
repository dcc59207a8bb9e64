//! 1.0-dialect execution adapter.
//!
//! The classic engine accepts permissive content models, so its probes are
//! value-producing calls that are legal wherever text-producing
//! instructions are, and embedded script blocks are left to the engine.

use std::collections::BTreeSet;
use std::sync::Arc;

use xslt_sheet::Dialect;

use crate::adapter::{ExecutionAdapter, LaunchSpec, RunCore, VariantPolicy};
use crate::debug::{DebugControl, RunSinks};
use crate::engine::EngineFactory;
use crate::error::LaunchError;

const POLICY: VariantPolicy = VariantPolicy {
    name: "classic",
    dialect: Dialect::V1,
    refuse_embedded_script: false,
    expected_major: 1,
};

pub struct ClassicAdapter {
    core: RunCore,
    factory: Arc<dyn EngineFactory>,
}

impl ClassicAdapter {
    #[must_use]
    pub fn new(factory: Arc<dyn EngineFactory>, sinks: RunSinks) -> Self {
        Self {
            core: RunCore::new(sinks),
            factory,
        }
    }
}

impl ExecutionAdapter for ClassicAdapter {
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
        Dialect::V1
    }
}
