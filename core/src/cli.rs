use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};

use crate::application::Application;
use crate::config::Config;
use crate::engine::DispatcherHandle;
use crate::types::{ExecutionOutcome, ExecutionRequest};

#[derive(Parser)]
#[command(name = "reprise")]
#[command(about = "Reprise - persistent script sessions with a synchronous tool bridge", long_about = None)]
pub struct Cli {
    /// Path to config file (overrides default search)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Script store directory (overrides config file and env vars)
    #[arg(long, global = true)]
    pub scripts_dir: Option<PathBuf>,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Serve JSON-lines requests on stdin/stdout
    Serve,

    /// Execute code once and print its output
    Exec {
        /// Code to run (reads --file when omitted)
        code: Option<String>,

        /// Read code from a file
        #[arg(short = 'f', long = "file", conflicts_with = "code")]
        file: Option<PathBuf>,

        #[command(flatten)]
        target: ExecTarget,
    },

    /// Manage stored scripts
    Scripts {
        #[command(subcommand)]
        command: ScriptCommands,
    },

    /// Print the effective configuration as TOML
    Config,
}

#[derive(Args, Clone)]
pub struct ExecTarget {
    /// Session to run against
    #[arg(short = 's', long = "session")]
    pub session: Option<String>,

    /// Use a throwaway namespace even when a session is named
    #[arg(long)]
    pub ephemeral: bool,

    /// Run on the dedicated main thread
    #[arg(long)]
    pub main_thread: bool,

    /// Print the full outcome as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Subcommand)]
pub enum ScriptCommands {
    /// List stored scripts
    List,
    /// Print a stored script
    Show { filename: String },
    /// Store a script from a local file
    Save {
        filename: String,
        /// Source file to store
        #[arg(long = "from")]
        from: PathBuf,
    },
    /// Delete a stored script
    Delete { filename: String },
    /// Run a stored script
    Run {
        filename: String,
        #[command(flatten)]
        target: ExecTarget,
    },
}

/// Resolve configuration from CLI flags, the environment and config files
pub fn load_config(cli: &Cli) -> Result<Config> {
    Config::builder()
        .config_path(cli.config.clone())
        .scripts_dir(cli.scripts_dir.clone())
        .log_level(cli.log_level.clone())
        .build()
        .context("Failed to load configuration")
}

/// Run a parsed command; returns whether it succeeded
pub async fn run(cli: Cli, config: Config, dispatcher: Option<DispatcherHandle>) -> Result<bool> {
    if let Commands::Config = cli.command {
        let rendered = toml::to_string_pretty(&config).context("Failed to render configuration")?;
        print!("{}", rendered);
        return Ok(true);
    }

    let app = Application::new(config, dispatcher);

    match cli.command {
        Commands::Serve => {
            let handler = Arc::new(app.protocol_handler());
            let stdin = tokio::io::BufReader::new(tokio::io::stdin());
            crate::protocol::serve(handler, stdin, tokio::io::stdout()).await?;
            Ok(true)
        }

        Commands::Exec { code, file, target } => {
            let code = match (code, file) {
                (Some(code), _) => code,
                (None, Some(path)) => tokio::fs::read_to_string(&path)
                    .await
                    .with_context(|| format!("Failed to read {}", path.display()))?,
                (None, None) => anyhow::bail!("Provide code or --file"),
            };
            execute(&app, code, &target).await
        }

        Commands::Scripts { command } => match command {
            ScriptCommands::List => {
                let scripts = app.script_service.list().await?;
                if scripts.is_empty() {
                    println!("No scripts in {}", app.config.scripts_dir.display());
                }
                for script in scripts {
                    println!("{:<32} {:>8}  {}", script.filename, script.size, script.modified);
                }
                Ok(true)
            }
            ScriptCommands::Show { filename } => {
                let script = app.script_service.load(&filename).await?;
                print!("{}", script.code);
                Ok(true)
            }
            ScriptCommands::Save { filename, from } => {
                let code = tokio::fs::read_to_string(&from)
                    .await
                    .with_context(|| format!("Failed to read {}", from.display()))?;
                let saved = app.script_service.save(&filename, &code).await?;
                println!("Saved {} ({} bytes) to {}", saved.filename, saved.size, saved.path);
                Ok(true)
            }
            ScriptCommands::Delete { filename } => {
                app.script_service.delete(&filename).await?;
                println!("Deleted {}", filename);
                Ok(true)
            }
            ScriptCommands::Run { filename, target } => {
                let script = app.script_service.load(&filename).await?;
                execute(&app, script.code, &target).await
            }
        },

        Commands::Config => Ok(true),
    }
}

async fn execute(app: &Application, code: String, target: &ExecTarget) -> Result<bool> {
    let defaults = app.config.protocol_defaults();
    let request = ExecutionRequest {
        code,
        session_id: Some(target.session.clone().unwrap_or(defaults.session_id)),
        persistent: !target.ephemeral,
        main_thread: target.main_thread || defaults.main_thread,
    };
    let outcome = app.session_service.execute(request).await?;
    report(&outcome, target.json)?;
    Ok(outcome.success)
}

fn report(outcome: &ExecutionOutcome, json: bool) -> Result<()> {
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(outcome).context("Failed to render outcome")?
        );
        return Ok(());
    }

    print!("{}", outcome.stdout);
    eprint!("{}", outcome.stderr);
    if let Some(result) = &outcome.result {
        println!("=> {}", result);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_exec_flags() {
        let cli = Cli::try_parse_from([
            "reprise", "exec", "print(1)", "--session", "s1", "--main-thread", "--json",
        ])
        .unwrap();
        let Commands::Exec { code, file, target } = cli.command else {
            panic!("expected exec");
        };
        assert_eq!(code.as_deref(), Some("print(1)"));
        assert!(file.is_none());
        assert_eq!(target.session.as_deref(), Some("s1"));
        assert!(target.main_thread);
        assert!(target.json);
        assert!(!target.ephemeral);
    }

    #[test]
    fn test_parse_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["reprise", "scripts", "list", "--scripts-dir", "/tmp/s"])
            .unwrap();
        assert_eq!(cli.scripts_dir, Some(PathBuf::from("/tmp/s")));
        assert!(matches!(
            cli.command,
            Commands::Scripts {
                command: ScriptCommands::List
            }
        ));
    }

    #[test]
    fn test_exec_code_and_file_conflict() {
        assert!(Cli::try_parse_from(["reprise", "exec", "x", "--file", "a.rs"]).is_err());
    }
}
