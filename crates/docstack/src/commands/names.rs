use crate::utils::Workspace;
use colored::Colorize;
use docstack_topology::naming;

pub fn handle(workspace: &Workspace, env: Option<String>, json: bool) -> anyhow::Result<()> {
    let environment = workspace.environment(env)?;
    let profile = workspace.definition().profile(&environment)?;
    let names = naming::resolve(workspace.definition(), &profile);

    if json {
        println!("{}", serde_json::to_string_pretty(&names)?);
        return Ok(());
    }

    let tier = if profile.is_production() {
        "production".red().bold()
    } else {
        "non-production".green()
    };
    println!("{} ({})", environment.cyan().bold(), tier);
    println!("  stack:        {}", names.stack_id);
    println!("  hostname:     {}", names.hostname);
    println!("  url:          {}", names.full_url);
    println!("  cluster:      {}", names.cluster_name);
    println!("  database:     {}", names.database_name);
    println!("  db user:      {}", names.database_username);
    println!("  secret param: {}", names.secret_parameter_path);
    println!("  vpc:          {}", names.vpc_name);
    println!("  exposure:     {}", profile.exposure);
    Ok(())
}
