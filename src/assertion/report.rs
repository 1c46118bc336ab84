use std::fmt::Write;

use crate::assertion::engine::AssertionResult;
use crate::errors::PlanError;

/// Outcome of one suite: one plan, every case evaluated against it.
#[derive(Clone, Debug, PartialEq)]
pub struct SuiteResult {
    pub name: String,
    /// Short cache key of the effective variable set.
    pub variables_key: String,
    pub results: Vec<AssertionResult>,
    pub plan_error: Option<PlanError>,
}

impl SuiteResult {
    pub fn passed(&self) -> bool {
        self.plan_error.is_none() && self.results.iter().all(|r| r.passed)
    }

    pub fn failures(&self) -> impl Iterator<Item = &AssertionResult> {
        self.results.iter().filter(|r| !r.passed)
    }

    pub fn passed_count(&self) -> usize {
        self.results.iter().filter(|r| r.passed).count()
    }

    pub fn failed_count(&self) -> usize {
        self.results.len() - self.passed_count()
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SuiteReport {
    pub suites: Vec<SuiteResult>,
}

impl SuiteReport {
    pub fn new(mut suites: Vec<SuiteResult>) -> SuiteReport {
        suites.sort_by(|a, b| a.name.cmp(&b.name));
        SuiteReport { suites }
    }

    pub fn all_passed(&self) -> bool {
        self.suites.iter().all(SuiteResult::passed)
    }

    pub fn passed_count(&self) -> usize {
        self.suites.iter().map(SuiteResult::passed_count).sum()
    }

    pub fn failed_count(&self) -> usize {
        self.suites.iter().map(SuiteResult::failed_count).sum()
    }

    /// Process exit code: 0 when every case of every suite passed, 1 otherwise.
    pub fn exit_code(&self) -> u8 {
        match self.all_passed() {
            true => 0,
            false => 1,
        }
    }

    pub fn render(&self) -> String {
        let mut output = String::new();

        for suite in &self.suites {
            let _ = writeln!(output, "suite {} (variables {})", suite.name, suite.variables_key);
            if let Some(err) = &suite.plan_error {
                let _ = writeln!(output, "  plan failed, every case of the suite fails:");
                for line in err.diagnostic().lines() {
                    let _ = writeln!(output, "    | {}", line);
                }
            }
            for result in &suite.results {
                match result.passed {
                    true => {
                        let _ = writeln!(output, "  PASS {}", result.name);
                    }
                    false => {
                        let _ = writeln!(output, "  FAIL {}", result.name);
                        // the plan diagnostic is printed once above
                        if suite.plan_error.is_none() {
                            for line in result.detail.lines() {
                                let _ = writeln!(output, "       {}", line);
                            }
                        }
                    }
                }
            }
        }

        let _ = writeln!(
            output,
            "\n{} passed, {} failed, {} suites",
            self.passed_count(),
            self.failed_count(),
            self.suites.len()
        );
        output
    }
}
