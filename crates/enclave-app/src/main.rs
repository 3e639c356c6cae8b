//! enclave command-line entry point.
//!
//! Runs the sandboxed shell against a project directory on disk, or against
//! an in-memory demo project when none is configured. Lines are read from
//! stdin one at a time; `-c` runs a single line and exits with its status.

mod demo;

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::Result;

use enclave_terminal::Shell;
use enclave_types::config::EnclaveConfig;
use enclave_vfs::{MemoryVfs, RealVfs, Vfs};

/// Config file picked up from the working directory when `--config` is absent.
const DEFAULT_CONFIG: &str = "enclave.toml";

const USAGE: &str =
    "Usage: enclave [--config FILE] [--list-commands] [-c LINE] [PROJECT_DIR]";

// ---------------------------------------------------------------------------
// CLI parsing
// ---------------------------------------------------------------------------

#[derive(Debug, Default, PartialEq, Eq)]
struct Args {
    /// Explicit configuration file.
    config: Option<PathBuf>,
    /// Print command descriptors as JSON and exit.
    list_commands: bool,
    /// Run one line instead of the interactive loop.
    command: Option<String>,
    /// Overrides `project_dir` from the config.
    project_dir: Option<PathBuf>,
}

fn parse_args(argv: impl IntoIterator<Item = String>) -> Result<Args> {
    let mut args = Args::default();
    let mut iter = argv.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config" => match iter.next() {
                Some(path) => args.config = Some(PathBuf::from(path)),
                None => anyhow::bail!("--config needs a file\n{USAGE}"),
            },
            "--list-commands" => args.list_commands = true,
            "-c" => match iter.next() {
                Some(line) => args.command = Some(line),
                None => anyhow::bail!("-c needs a command line\n{USAGE}"),
            },
            "-h" | "--help" => anyhow::bail!("{USAGE}"),
            other if other.starts_with('-') => {
                anyhow::bail!("Unknown argument: {other}\n{USAGE}")
            },
            dir => {
                if args.project_dir.is_some() {
                    anyhow::bail!("Only one project directory may be given\n{USAGE}");
                }
                args.project_dir = Some(PathBuf::from(dir));
            },
        }
    }
    Ok(args)
}

fn load_config(explicit: Option<&Path>) -> Result<EnclaveConfig> {
    match explicit {
        Some(path) => Ok(EnclaveConfig::load(path)?),
        None if Path::new(DEFAULT_CONFIG).is_file() => {
            Ok(EnclaveConfig::load(Path::new(DEFAULT_CONFIG))?)
        },
        None => Ok(EnclaveConfig::default()),
    }
}

fn open_project(config: &EnclaveConfig) -> Result<Box<dyn Vfs>> {
    match &config.project_dir {
        Some(dir) => Ok(Box::new(RealVfs::new(dir)?)),
        None => {
            log::info!("No project directory configured; using the demo project");
            let mut vfs = MemoryVfs::new();
            demo::populate_demo_project(&mut vfs)?;
            Ok(Box::new(vfs))
        },
    }
}

fn main() -> Result<()> {
    let args = parse_args(std::env::args().skip(1))?;
    let mut config = load_config(args.config.as_deref())?;
    if let Some(dir) = args.project_dir {
        config.project_dir = Some(dir);
    }

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.log_filter.as_str()),
    )
    .init();

    let mut shell = Shell::with_config(open_project(&config)?, &config);

    if args.list_commands {
        println!("{}", serde_json::to_string_pretty(&shell.list_commands())?);
        return Ok(());
    }

    if let Some(line) = args.command {
        let result = shell.execute(&line);
        print!("{}", result.stdout);
        eprint!("{}", result.stderr);
        io::stdout().flush()?;
        std::process::exit(result.exit_code);
    }

    run_repl(&mut shell)
}

/// Read-eval-print loop over stdin until EOF or `exit`.
fn run_repl(shell: &mut Shell) -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut last_status = 0;

    loop {
        write!(stdout, "{}$ ", shell.cwd())?;
        stdout.flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            writeln!(stdout)?;
            break;
        }
        let line = line.trim_end_matches(['\n', '\r']);
        if line.trim() == "exit" {
            break;
        }

        let result = shell.execute(line);
        let rendered = result.render();
        write!(stdout, "{rendered}")?;
        if !rendered.is_empty() && !rendered.ends_with('\n') {
            writeln!(stdout)?;
        }
        last_status = result.exit_code;
    }

    log::debug!("session ended, last status {last_status}");
    Ok(())
}
