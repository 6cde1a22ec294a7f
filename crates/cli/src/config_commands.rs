use {
    anyhow::Result,
    clap::Subcommand,
    freshet_config::{LoadedConfig, Severity, render_toml, validate},
};

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print the effective configuration as TOML. The password is redacted.
    Show,
    /// Validate the configuration and report errors and warnings.
    Check,
}

pub fn handle_config(action: ConfigAction, loaded: LoadedConfig) -> Result<()> {
    match action {
        ConfigAction::Show => show(&loaded),
        ConfigAction::Check => check(&loaded),
    }
}

const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";
const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

fn source_line(loaded: &LoadedConfig) -> String {
    match &loaded.path {
        Some(path) => format!("# loaded from {}", path.display()),
        None => "# no config file found, showing defaults".to_owned(),
    }
}

fn show(loaded: &LoadedConfig) -> Result<()> {
    println!("{}\n", source_line(loaded));
    print!("{}", render_toml(&loaded.config)?);
    Ok(())
}

fn check(loaded: &LoadedConfig) -> Result<()> {
    match &loaded.path {
        Some(path) => eprintln!("Checking {}\n", path.display()),
        None => eprintln!("No config file found; checking defaults.\n"),
    }

    let diagnostics = validate(&loaded.config);
    for d in &diagnostics {
        let color = match d.severity {
            Severity::Error => RED,
            Severity::Warning => YELLOW,
        };
        eprintln!("  {BOLD}{color}{}{RESET} {}: {}", d.severity, d.path, d.message);
    }

    let errors = diagnostics
        .iter()
        .filter(|d| d.severity == Severity::Error)
        .count();
    let warnings = diagnostics.len() - errors;

    if !diagnostics.is_empty() {
        eprintln!();
    }
    if diagnostics.is_empty() {
        eprintln!("No issues found.");
    } else {
        eprintln!("{errors} error(s), {warnings} warning(s)");
    }

    if errors > 0 {
        std::process::exit(1);
    }
    Ok(())
}
