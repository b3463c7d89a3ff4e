use clap::Parser;
use ldapcerts::{Cli, LdapCerts, OutputFormatter, UserFriendlyError};
use std::process;
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let exit_code = run().await;
    process::exit(exit_code);
}

async fn run() -> i32 {
    let cli = Cli::parse();
    setup_logging(&cli);

    if cli.generate_config {
        return handle_generate_config(&cli);
    }

    let ldapcerts = match LdapCerts::from_cli(&cli) {
        Ok(ldapcerts) => ldapcerts,
        Err(e) => {
            print_startup_error(&cli, &e);
            return e.exit_code();
        }
    };

    if cli.dry_run {
        return handle_dry_run(&ldapcerts);
    }

    match ldapcerts.run().await {
        Ok(report) => {
            ldapcerts
                .output_formatter()
                .print_extraction_report(&report);
            0
        }
        Err(e) => {
            tracing::error!("extraction failed: {}", e);
            ldapcerts.handle_error(&e);
            e.exit_code()
        }
    }
}

fn handle_generate_config(cli: &Cli) -> i32 {
    let config_path = cli
        .config
        .as_ref()
        .map(|p| p.to_string_lossy().to_string())
        .unwrap_or_else(|| "ldapcerts.toml".to_string());

    match LdapCerts::generate_sample_config(&config_path) {
        Ok(()) => {
            println!("Generated sample configuration file: {}", config_path);
            println!("\nTo use this configuration:");
            println!("  ldapcerts --config {}", config_path);
            println!("\nEdit the file to point at your directory server.");
            0
        }
        Err(e) => {
            eprintln!(
                "Failed to generate configuration file: {}",
                e.user_message()
            );
            if let Some(suggestion) = e.suggestion() {
                eprintln!("Suggestion: {}", suggestion);
            }
            1
        }
    }
}

fn handle_dry_run(ldapcerts: &LdapCerts) -> i32 {
    let formatter = ldapcerts.output_formatter();
    let config = ldapcerts.config();

    formatter.print_header("DRY RUN - nothing will be contacted or written");

    println!("  Server:            {}", config.directory.url);
    println!(
        "  Authentication:    {}",
        if config.credentials().is_anonymous() {
            "anonymous".to_string()
        } else {
            format!("simple bind as {}", config.credentials().identity())
        }
    );
    println!("  StartTLS:          {}", config.directory.starttls);
    println!("  Connect timeout:   {}s", config.directory.connect_timeout);
    println!("  Base DN:           {}", config.search.base_dn);
    println!("  Scope:             subtree");
    println!("  Filter:            {}", config.search.filter);
    println!("  Attribute:         {}", config.search.attribute);
    println!("  Size limit:        {}", describe_limit(config.search.size_limit, ""));
    println!("  Time limit:        {}", describe_limit(config.search.time_limit, "s"));
    println!("  Output directory:  {}", config.output.directory.display());
    println!("  On collision:      {}", config.output.collision_policy);

    formatter.print_separator();
    formatter.success("Configuration is valid");

    0
}

fn describe_limit(limit: u32, unit: &str) -> String {
    if limit == 0 {
        "server default".to_string()
    } else {
        format!("{}{}", limit, unit)
    }
}

fn print_startup_error(cli: &Cli, error: &ldapcerts::CertExtractError) {
    let formatter = OutputFormatter::new(cli.output_mode(), cli.verbosity_level(), false);
    formatter.print_user_friendly_error(error);
}

fn setup_logging(cli: &Cli) {
    let default_level = match (cli.quiet, cli.verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, 2) => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("ldapcerts={}", default_level)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
