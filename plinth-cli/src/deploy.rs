//! Deployment steps run after a successful bootstrap

use std::path::Path;

use colored::Colorize;
use log::{debug, info};
use thiserror::Error;
use tokio::process::Command;

#[derive(Debug, Error)]
pub enum StepError {
    #[error("Failed to start step '{step}': {source}")]
    Spawn {
        step: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Step '{step}' failed{}", exit_suffix(.code))]
    Failed { step: String, code: Option<i32> },
}

impl StepError {
    /// Exit status the process should end with
    pub fn exit_code(&self) -> i32 {
        match self {
            StepError::Failed { code: Some(code), .. } if *code != 0 => *code,
            _ => 1,
        }
    }
}

fn exit_suffix(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!(" with exit status {}", code),
        None => " (terminated by signal)".to_string(),
    }
}

/// Run each step through the shell in order, stopping at the first failure
pub async fn run_steps(steps: &[String], dir: Option<&Path>) -> Result<(), StepError> {
    for (i, step) in steps.iter().enumerate() {
        println!(
            "{} {}",
            format!("[{}/{}]", i + 1, steps.len()).cyan().bold(),
            step
        );
        run_step(step, dir).await?;
    }
    info!("All {} deployment steps succeeded", steps.len());
    Ok(())
}

async fn run_step(step: &str, dir: Option<&Path>) -> Result<(), StepError> {
    let mut command = shell_command(step);
    if let Some(dir) = dir {
        command.current_dir(dir);
    }
    debug!("Running {:?}", command);

    let status = command.status().await.map_err(|source| StepError::Spawn {
        step: step.to_string(),
        source,
    })?;

    if status.success() {
        Ok(())
    } else {
        Err(StepError::Failed {
            step: step.to_string(),
            code: status.code(),
        })
    }
}

#[cfg(unix)]
fn shell_command(step: &str) -> Command {
    let mut command = Command::new("sh");
    command.arg("-c").arg(step);
    command
}

#[cfg(windows)]
fn shell_command(step: &str) -> Command {
    let mut command = Command::new("cmd");
    command.arg("/C").arg(step);
    command
}
