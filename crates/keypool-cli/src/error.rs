use colored::Colorize;

pub fn handle_error(err: anyhow::Error) -> ! {
    eprintln!("{} {:#}", "Error:".red().bold(), err);

    let msg = format!("{err:#}").to_lowercase();

    if msg.contains("connection refused") || msg.contains("failed to reach") {
        eprintln!("\n{}", "Suggestion:".yellow().bold());
        eprintln!("  Start the server, or drop --server to use the local database:");
        eprintln!("  {} keypool-server", "$".dimmed());
    }

    if msg.contains("401") || msg.contains("unauthorized") || msg.contains("admin access") {
        eprintln!("\n{}", "Suggestion:".yellow().bold());
        eprintln!("  Pass the server's admin token:");
        eprintln!("  {} keypool --token <token> admin list", "$".dimmed());
    }

    if msg.contains("unsupported provider") || msg.contains("provider is required") {
        eprintln!("\n{}", "Suggestion:".yellow().bold());
        eprintln!("  Use one of: deepseek, openai, volcengine, qwen, siliconflow");
    }

    std::process::exit(1);
}
