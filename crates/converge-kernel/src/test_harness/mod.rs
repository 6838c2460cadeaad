// Test harness module
// Randomized simulation and certification for the executor

pub mod simulator;

pub use simulator::*;

use serde::Serialize;

/// Test harness for running stress tests and certification
pub struct TestHarness;

impl TestHarness {
    /// Run a stress test with the specified parameters
    pub fn run_stress_test(goals: u64, flakiness: f64) -> StressTestReport {
        tracing::info!(goals, flakiness, "running stress test");

        let config = SimulatorConfig {
            seed: 12345,
            total_goals: goals,
            flakiness,
            stop_on_first_violation: false,
            ..Default::default()
        };

        let report = run_simulator(config);

        StressTestReport {
            goals,
            violations: report.violations.len(),
            success: report.passed(),
        }
    }

    /// Run certification simulation across multiple seeds
    pub fn run_certification() -> CertificationReport {
        tracing::info!("running certification simulation");

        let mut all_passed = true;
        let mut total_violations = 0;

        for seed in 0..10 {
            let config = SimulatorConfig {
                seed,
                total_goals: 2_000,
                stop_on_first_violation: false,
                ..Default::default()
            };

            let report = run_simulator(config);
            if !report.passed() {
                all_passed = false;
            }
            total_violations += report.violations.len();
        }

        CertificationReport {
            passed: all_passed && total_violations == 0,
            total_violations,
            seeds_tested: 10,
        }
    }
}

/// Report from a stress test
#[derive(Debug, Clone, Serialize)]
pub struct StressTestReport {
    pub goals: u64,
    pub violations: usize,
    pub success: bool,
}

/// Report from certification
#[derive(Debug, Clone, Serialize)]
pub struct CertificationReport {
    pub passed: bool,
    pub total_violations: usize,
    pub seeds_tested: u64,
}
