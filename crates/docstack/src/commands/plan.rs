use crate::utils::Workspace;
use colored::Colorize;

pub fn handle(workspace: &Workspace, env: Option<String>, json: bool) -> anyhow::Result<()> {
    let environment = workspace.environment(env)?;
    let lookups = workspace.lookups()?;
    let topology = workspace.build(&environment, &lookups)?;
    let plan = topology.plan()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
        return Ok(());
    }

    println!("Plan for {}", plan.stack.cyan().bold());
    for wave in 0..plan.wave_count() {
        println!();
        println!("{}", format!("Wave {}", wave).bold());
        for step in plan.wave(wave) {
            println!(
                "  {} {} ({})",
                "+".green(),
                step.logical_id,
                step.resource_type.dimmed()
            );
            if !step.explicit.is_empty() {
                println!("      waits for: {}", step.explicit.join(", ").yellow());
            }
        }
    }

    println!();
    println!("{}", plan.summary());
    if !plan.outputs.is_empty() {
        println!("Outputs: {}", plan.outputs.join(", "));
    }
    Ok(())
}
