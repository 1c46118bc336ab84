use std::path::{Path, PathBuf};
use std::sync::Arc;

use itertools::Itertools;

use crate::assertion::engine::{AssertionEngine, AssertionResult};
use crate::assertion::report::SuiteResult;
use crate::assertion::TestCase;
use crate::cmd::command::does_binary_exist;
use crate::config::HarnessConfig;
use crate::errors::ConfigError;
use crate::plan::cache::{PlanCache, PlanResult};
use crate::plan::runner::{PlanRunner, TerraformPlanRunner};
use crate::variables::VariableSet;

/// Plans one template directory and checks test cases against the plans.
///
/// Cheap to clone: clones share the runner and the plan cache, so a variable set is only planned once per run.
#[derive(Clone)]
pub struct Harness {
    template_dir: PathBuf,
    runner: Arc<dyn PlanRunner>,
    cache: Arc<PlanCache>,
    engine: AssertionEngine,
}

impl Harness {
    pub fn new<P: Into<PathBuf>>(template_dir: P, runner: Arc<dyn PlanRunner>, cache: Arc<PlanCache>) -> Harness {
        Harness {
            template_dir: template_dir.into(),
            runner,
            cache,
            engine: AssertionEngine::new(),
        }
    }

    /// Harness planning with the terraform binary of `config`.
    pub fn from_config(config: &HarnessConfig, cache: Arc<PlanCache>) -> Result<Harness, ConfigError> {
        let template_dir = config.template_dir()?;
        if !template_dir.is_dir() {
            return Err(ConfigError::Io {
                path: template_dir.to_path_buf(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "template directory not found"),
            });
        }

        if !does_binary_exist(&config.terraform_binary) {
            return Err(ConfigError::BinaryNotFound(config.terraform_binary.clone()));
        }

        let runner = TerraformPlanRunner::new(config.terraform_cli());
        Ok(Harness::new(template_dir, Arc::new(runner), cache))
    }

    pub fn template_dir(&self) -> &Path {
        &self.template_dir
    }

    pub fn cache(&self) -> &Arc<PlanCache> {
        &self.cache
    }

    /// Plan for `variables`, computed at most once for the lifetime of the cache.
    pub fn plan(&self, variables: &VariableSet) -> PlanResult {
        self.cache
            .get_or_compute(variables, |vars| self.runner.run(&self.template_dir, vars))
    }

    /// Evaluates every case against the plan of `variables`. A failed plan fails every case.
    pub fn run_cases(&self, variables: &VariableSet, cases: &[TestCase]) -> Vec<AssertionResult> {
        cases
            .iter()
            .map(|case| case.name())
            .duplicates()
            .for_each(|name| warn!("test case name `{}` is used more than once, its results are ambiguous", name));

        match self.plan(variables) {
            Ok(plan) => self.engine.evaluate_all(cases, &plan),
            Err(err) => {
                let mut results = cases
                    .iter()
                    .map(|case| AssertionResult::plan_failed(case, &err))
                    .collect::<Vec<_>>();
                results.sort_by(|a, b| a.name.cmp(&b.name));
                results
            }
        }
    }

    /// Same as `run_cases`, packaged as a named suite result.
    pub fn run_suite(&self, name: &str, variables: &VariableSet, cases: &[TestCase]) -> SuiteResult {
        let span = info_span!("suite", name = name);
        let _enter = span.enter();

        let results = self.run_cases(variables, cases);
        let plan_error = self.plan(variables).err();
        let suite = SuiteResult {
            name: name.to_string(),
            variables_key: variables.cache_key().short(),
            results,
            plan_error,
        };
        info!(
            "suite {} done: {} passed, {} failed",
            name,
            suite.passed_count(),
            suite.failed_count()
        );

        suite
    }
}
