use crate::driver::{Driver, RunOutcome};
use crate::trace::RunReport;
use anyhow::{Context, Result, bail};
use arq_lab_abstract::{ScenarioAction, ScenarioAssertion, TestScenario};
use std::fs;
use std::path::Path;
use tracing::info;

pub fn load_scenario(path: &Path) -> Result<TestScenario> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read scenario file {}", path.display()))?;
    let scenario: TestScenario =
        toml::from_str(&content).context("failed to parse scenario file")?;
    Ok(scenario)
}

/// Execute a scenario run and check every assertion against the report.
pub fn run_scenario(scenario: &TestScenario) -> Result<RunReport> {
    info!(name = %scenario.name, "running scenario");
    let config = scenario.config.to_run_config();

    let mut driver = Driver::new();
    driver
        .start(config)
        .with_context(|| format!("scenario {:?}: configuration rejected", scenario.name))?;

    for action in &scenario.actions {
        match action {
            ScenarioAction::ScheduleLoss { seq } => driver
                .schedule_loss(*seq)
                .with_context(|| format!("scenario {:?}: invalid loss target", scenario.name))?,
        }
    }

    let report = driver.run_to_completion()?;
    check_assertions(scenario, &report)?;
    Ok(report)
}

fn check_assertions(scenario: &TestScenario, report: &RunReport) -> Result<()> {
    for assertion in &scenario.assertions {
        match assertion {
            ScenarioAssertion::DeliveredOrder { seqs } => {
                if &report.delivered != seqs {
                    bail!(
                        "scenario {:?}: delivered order {:?}, expected {:?}",
                        scenario.name,
                        report.delivered,
                        seqs
                    );
                }
            }
            ScenarioAssertion::FrameTransmissions { min, max } => {
                let n = report.frame_transmissions;
                if n < *min || max.is_some_and(|max| n > max) {
                    bail!(
                        "scenario {:?}: {} frame transmissions outside {}..={:?}",
                        scenario.name,
                        n,
                        min,
                        max
                    );
                }
            }
            ScenarioAssertion::MaxDuration { ms } => {
                if report.duration_ms > *ms {
                    bail!(
                        "scenario {:?}: took {} ms, allowed {} ms",
                        scenario.name,
                        report.duration_ms,
                        ms
                    );
                }
            }
            ScenarioAssertion::Finished => {
                if report.outcome != RunOutcome::Finished {
                    bail!(
                        "scenario {:?}: run ended as {:?}, expected Finished",
                        scenario.name,
                        report.outcome
                    );
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const GBN_LOSS_SCENARIO: &str = r#"
        name = "gbn-base-loss"
        description = "losing the window base forces a full go-back"

        [config]
        protocol = "go-back-n"
        total_frames = 4
        window_size = 2

        [[actions]]
        type = "schedule_loss"
        seq = 0

        [[assertions]]
        type = "delivered_order"
        seqs = [0, 1, 2, 3]

        [[assertions]]
        type = "frame_transmissions"
        min = 6
        max = 6

        [[assertions]]
        type = "finished"
    "#;

    #[test]
    fn scenario_round_trips_from_toml_and_passes() {
        let scenario: TestScenario = toml::from_str(GBN_LOSS_SCENARIO).unwrap();
        let report = run_scenario(&scenario).unwrap();
        assert_eq!(report.outcome, RunOutcome::Finished);
    }

    #[test]
    fn failed_assertion_names_the_scenario() {
        let mut scenario: TestScenario = toml::from_str(GBN_LOSS_SCENARIO).unwrap();
        scenario.assertions = vec![ScenarioAssertion::MaxDuration { ms: 1 }];
        let err = run_scenario(&scenario).unwrap_err();
        assert!(err.to_string().contains("gbn-base-loss"));
    }
}
