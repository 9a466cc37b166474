use crate::utils::Workspace;
use colored::Colorize;
use docstack_topology::{LookupKind, naming, required_lookups};

pub fn handle(workspace: &Workspace, env: Option<String>) -> anyhow::Result<()> {
    let environment = workspace.environment(env)?;
    let profile = workspace.definition().profile(&environment)?;
    let names = naming::resolve(workspace.definition(), &profile);
    let lookups = workspace.lookups()?;

    println!(
        "Lookups for {} ({})",
        environment.cyan().bold(),
        workspace.context_path()?.display()
    );

    let mut missing = 0;
    for required in required_lookups(workspace.definition(), &names) {
        let kind = match required.kind {
            LookupKind::Parameter => "parameter".to_string(),
            LookupKind::SecureParameter { version } => format!("secure parameter, version {}", version),
            LookupKind::Vpc => "vpc".to_string(),
        };
        if required.is_satisfied(&lookups) {
            println!("  {} {} ({})", "✓".green(), required.key, kind.dimmed());
        } else {
            missing += 1;
            println!("  {} {} ({})", "✗".red(), required.key, kind.dimmed());
        }
    }

    if missing > 0 {
        anyhow::bail!("{} lookup(s) missing for {}", missing, environment);
    }
    println!("{}", "✓ All lookups satisfied".green().bold());
    Ok(())
}
