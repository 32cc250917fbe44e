//! Human-readable bootstrap report

use colored::Colorize;
use plinth_core::{BootstrapReport, ReconcileResult, ResourceReport};
use plinth_provider_aws::suggestion_for_code;

pub fn print_report(report: &BootstrapReport) {
    println!();
    for line in render_report(report) {
        println!("{}", line);
    }
    println!();

    let failed = report.failures().count();
    if failed == 0 {
        println!("{}", "State backend is ready.".green().bold());
    } else {
        println!(
            "{}",
            format!(
                "State backend is not ready: {} of {} resources failed.",
                failed,
                report.resources.len()
            )
            .red()
            .bold()
        );
    }
}

pub fn render_report(report: &BootstrapReport) -> Vec<String> {
    report.resources.iter().flat_map(render_resource).collect()
}

fn render_resource(resource: &ResourceReport) -> Vec<String> {
    let label = format!("{} {}", resource.spec.kind_label(), resource.spec.name.bold());
    match &resource.result {
        ReconcileResult::AlreadyPresent => {
            vec![format!("  {} {} already present", "=".dimmed(), label)]
        }
        ReconcileResult::CreatedAndConfigured => {
            vec![format!("  {} {} created and configured", "+".green(), label)]
        }
        ReconcileResult::Failed { stage, cause } => {
            let mut lines = vec![format!(
                "  {} {} failed at {}: {}",
                "x".red().bold(),
                label,
                stage.name().yellow(),
                cause
            )];
            if let Some(hint) = cause.code.as_deref().and_then(suggestion_for_code) {
                lines.push(format!("      {} {}", "hint:".cyan(), hint));
            }
            lines
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plinth_core::{
        BackendError, ConfigurationStep, LockTableParams, ObjectStoreParams, Principal,
        ResourceSpec, Stage,
    };

    fn bucket(result: ReconcileResult) -> ResourceReport {
        ResourceReport {
            spec: ResourceSpec::object_store(
                "state-bucket",
                ObjectStoreParams {
                    region: "eu-west-1".to_string(),
                    principal: Principal::parse("218585377303").unwrap(),
                    encryption: Default::default(),
                },
            ),
            result,
        }
    }

    fn table(result: ReconcileResult) -> ResourceReport {
        ResourceReport {
            spec: ResourceSpec::lock_table("locks", LockTableParams::default()),
            result,
        }
    }

    #[test]
    fn test_render_success() {
        colored::control::set_override(false);
        let report = BootstrapReport {
            resources: vec![
                bucket(ReconcileResult::CreatedAndConfigured),
                table(ReconcileResult::AlreadyPresent),
            ],
        };

        assert_eq!(
            render_report(&report),
            vec![
                "  + object store state-bucket created and configured",
                "  = lock table locks already present",
            ]
        );
    }

    #[test]
    fn test_render_failure_with_hint() {
        colored::control::set_override(false);
        let report = BootstrapReport {
            resources: vec![bucket(ReconcileResult::Failed {
                stage: Stage::Configure(ConfigurationStep::PublicAccessBlock),
                cause: BackendError::new("Access Denied").with_code("AccessDenied"),
            })],
        };

        let lines = render_report(&report);
        assert_eq!(
            lines[0],
            "  x object store state-bucket failed at public-access-block: AccessDenied: Access Denied"
        );
        assert!(lines[1].starts_with("      hint: Check that the active credentials"));
    }

    #[test]
    fn test_render_failure_without_code() {
        colored::control::set_override(false);
        let report = BootstrapReport {
            resources: vec![table(ReconcileResult::Failed {
                stage: Stage::Probe,
                cause: BackendError::new("dispatch failure"),
            })],
        };

        assert_eq!(
            render_report(&report),
            vec!["  x lock table locks failed at probe: dispatch failure"]
        );
    }
}
