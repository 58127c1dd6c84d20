//! `geoshort plan`: declare the deployment and emit the plan

use std::path::PathBuf;

use anyhow::{Context, Result};
use geoshort::config::Config;
use geoshort::deploy;

/// Parameters of the plan command
#[derive(Debug, Default)]
pub struct PlanParams {
    pub locations: Option<String>,
    pub stack: Option<String>,
    pub output: Option<PathBuf>,
}

pub fn plan(mut config: Config, params: PlanParams) -> Result<()> {
    if let Some(locations) = params.locations {
        config.deployment.locations = Some(locations);
    }
    if let Some(stack) = params.stack {
        config.deployment.stack = stack;
    }
    config.validate()?;
    let regions = config.deployment.regions()?;

    let deployment = deploy::declare_for(&config.deployment, &regions)
        .context("Failed to declare deployment")?;
    let plan = deployment.stack.plan();
    let json = plan.to_json_pretty().context("Failed to serialize plan")?;

    match &params.output {
        Some(path) => {
            std::fs::write(path, &json)
                .with_context(|| format!("Failed to write plan: {}", path.display()))?;
            tracing::info!(path = %path.display(), "Plan written");
        }
        None => println!("{json}"),
    }

    if !plan.required_config.is_empty() {
        tracing::info!(
            keys = ?plan.required_config,
            "Stack config secrets must be set before applying"
        );
    }

    for (name, value) in &plan.outputs {
        eprintln!("  {name}: {value}");
    }

    Ok(())
}
