use crate::utils::Workspace;
use anyhow::Context;
use colored::Colorize;
use docstack_cloud::TemplateFormat;
use std::fs;
use std::path::PathBuf;

pub fn handle(
    workspace: &Workspace,
    env: Option<String>,
    all: bool,
    format: TemplateFormat,
    out: Option<PathBuf>,
) -> anyhow::Result<()> {
    let environments: Vec<String> = if all {
        workspace
            .definition()
            .environment_names()
            .into_iter()
            .map(String::from)
            .collect()
    } else {
        vec![workspace.environment(env)?]
    };

    if out.is_none() && environments.len() > 1 {
        anyhow::bail!("--all with more than one environment needs --out <DIR>");
    }

    let lookups = workspace.lookups()?;

    for environment in &environments {
        let topology = workspace.build(environment, &lookups)?;
        let rendered = topology.template()?.to_string_as(format)?;

        match &out {
            Some(dir) => {
                fs::create_dir_all(dir)
                    .with_context(|| format!("failed to create {}", dir.display()))?;
                let path = dir.join(format!("{}.template.{}", topology.stack_id, format.extension()));
                fs::write(&path, rendered)
                    .with_context(|| format!("failed to write {}", path.display()))?;
                println!(
                    "{} {} ({} resources) → {}",
                    "✓".green(),
                    topology.stack_id.cyan(),
                    topology.graph.len(),
                    path.display()
                );
            }
            None => println!("{}", rendered),
        }
    }

    Ok(())
}
