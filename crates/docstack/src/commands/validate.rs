use crate::utils::Workspace;
use colored::Colorize;

pub fn handle(workspace: &Workspace) -> anyhow::Result<()> {
    let definition = workspace.definition();

    println!("{}", "Validating stack definition...".blue());
    println!(
        "Stack definition: {}",
        workspace.stack.path.display().to_string().cyan()
    );
    println!("{}", "✓ Stack definition is valid".green().bold());
    println!();
    println!("Summary:");
    println!("  project:    {}", definition.project);
    println!("  domain:     {} (zone {})", definition.domain, definition.zone);
    println!("  region:     {}", definition.region);
    println!("  production: {}", definition.production);
    println!("  environments: {}", definition.environments.len());
    for (name, spec) in &definition.environments {
        println!(
            "    - {} ({}, port {}, health {} [{}])",
            name.cyan(),
            spec.exposure,
            spec.container_port,
            spec.health_check.path,
            spec.health_check.matcher()
        );
    }

    let Some(lookups) = workspace.optional_lookups()? else {
        println!();
        println!("{}", "⚠ Skipping topology checks".yellow());
        println!("  no {} next to the stack definition", docstack_config::CONTEXT_FILE);
        return Ok(());
    };

    println!();
    println!("Topologies:");
    let mut failed = 0;
    for name in definition.environment_names() {
        match workspace.build(name, &lookups) {
            Ok(topology) => println!(
                "  {} {} ({} resources)",
                "✓".green(),
                topology.stack_id.cyan(),
                topology.graph.len()
            ),
            Err(e) => {
                failed += 1;
                println!("  {} {}: {:#}", "✗".red(), name, e);
            }
        }
    }

    if failed > 0 {
        anyhow::bail!("{} environment(s) failed to build", failed);
    }
    Ok(())
}
