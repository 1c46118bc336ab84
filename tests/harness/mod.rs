mod plan_runner;
mod suites;
