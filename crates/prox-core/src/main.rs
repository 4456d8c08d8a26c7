//! prox - inspect and control a running process
//!
//! Thin CLI over `prox_core`: each subcommand maps onto one lookup or
//! control operation and every failure onto a stable exit code.

use clap::{Args, Parser, Subcommand};
use prox_common::{Error, ProcessId};
use prox_core::action::{ControlError, Controller};
use prox_core::collect::{Lookup, ProcessSource, ToolSource};
use prox_core::config::{load_config, ConfigOptions};
use prox_core::exit_codes::ExitCode;
use prox_core::logging::{init_logging, LogConfig, LogFormat, LogLevel};
use prox_core::record::ProcessRecord;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tracing::{debug, warn};

/// Inspect, check, restart and re-type running processes
#[derive(Parser)]
#[command(name = "prox")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    global: GlobalOpts,
}

/// Global options available to all commands
#[derive(Args, Debug)]
struct GlobalOpts {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Log format on stderr (human, jsonl)
    #[arg(long, global = true)]
    log_format: Option<LogFormat>,

    /// Path to config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Print records and errors as JSON on stdout
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Show a process by pid
    Show {
        pid: u32,
    },

    /// Find a process by command line and terminal
    Find(FindArgs),

    /// Choose a process interactively by name
    Pick {
        name: String,
    },

    /// Check whether a process is running (exit 0) or not (exit 1)
    Check {
        pid: u32,
    },

    /// Kill a process and run its command line again in the foreground
    Restart {
        pid: u32,

        /// Start in a new process group (tty) or session (no tty)
        #[arg(long)]
        detach: bool,
    },

    /// Kill a process and type its command line back into its terminal
    Retype {
        pid: u32,
    },
}

#[derive(Args, Debug)]
struct FindArgs {
    /// Command name
    cmd: String,

    /// Command arguments
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    args: Vec<String>,

    /// Controlling terminal (e.g. pts/3, ttys001, ??)
    #[arg(long)]
    tty: Option<String>,
}

fn main() {
    let cli = Cli::parse();

    let log_config = LogConfig::from_env(
        LogLevel::from_verbosity(cli.global.verbose, cli.global.quiet),
        cli.global.log_format,
    );
    init_logging(&log_config);

    let exit_code = match run(&cli) {
        Ok(code) => code,
        Err(err) => {
            report_error(&cli.global, &err);
            ExitCode::from_error(&err)
        }
    };

    std::process::exit(exit_code.as_i32());
}

fn run(cli: &Cli) -> Result<ExitCode, Error> {
    let resolved = load_config(&ConfigOptions {
        config_path: cli.global.config.clone(),
        ..ConfigOptions::default()
    })?;
    debug!(source = %resolved.source, "configuration resolved");

    let source = ToolSource::new(resolved.config.tools.clone());
    let controller = Controller::new(Lookup::new(source), &resolved.config.terminal);
    let global = &cli.global;

    match &cli.command {
        Commands::Show { pid } => {
            let record = controller.lookup().resolve_by_pid(ProcessId(*pid))?;
            emit(global, &record)?;
        }
        Commands::Find(args) => {
            let tty = args.tty.as_deref().unwrap_or_default();
            let record = controller
                .lookup()
                .resolve_by_fingerprint(&args.cmd, &args.args, tty)?;
            emit(global, &record)?;
        }
        Commands::Pick { name } => {
            let stdin = std::io::stdin();
            let stdout = std::io::stdout();
            let record = controller
                .lookup()
                .select_by_name(name, stdin.lock(), stdout.lock())?;
            emit(global, &record)?;
        }
        Commands::Check { pid } => return check(&controller, ProcessId(*pid)),
        Commands::Restart { pid, detach } => {
            return restart(&controller, ProcessId(*pid), *detach);
        }
        Commands::Retype { pid } => {
            let record = retype(&controller, ProcessId(*pid))?;
            emit(global, &record)?;
        }
    }

    Ok(ExitCode::Ok)
}

fn check<S: ProcessSource>(controller: &Controller<S>, pid: ProcessId) -> Result<ExitCode, Error> {
    let record = match controller.lookup().resolve_by_pid(pid) {
        Ok(record) => record,
        Err(err) => {
            let err = Error::from(err);
            if matches!(err, Error::ProcessNotFound { .. }) {
                println!("not running");
                return Ok(ExitCode::NotRunning);
            }
            return Err(err);
        }
    };

    match controller.health_check(&record) {
        Ok(()) => {
            println!("running");
            Ok(ExitCode::Ok)
        }
        Err(err) => {
            debug!(error = %err, "health check failed");
            println!("not running");
            Ok(ExitCode::NotRunning)
        }
    }
}

fn restart<S: ProcessSource>(
    controller: &Controller<S>,
    pid: ProcessId,
    detach: bool,
) -> Result<ExitCode, Error> {
    let record = controller.lookup().resolve_by_pid(pid)?;

    match controller.change_directory(&record) {
        Ok(()) => {}
        Err(ControlError::CwdUnresolved) => {
            warn!(pid = pid.0, "working directory unknown; starting in current directory")
        }
        Err(err) => return Err(err.into()),
    }

    record.kill()?;
    wait_until_gone(controller, &record);

    let status = controller.start(
        &record,
        detach,
        Stdio::inherit(),
        Stdio::inherit(),
        Stdio::inherit(),
        None,
    )?;
    if status.success() {
        Ok(ExitCode::Ok)
    } else {
        eprintln!("prox: {} exited with {}", record.cmd(), status);
        Ok(ExitCode::InternalError)
    }
}

fn retype<S: ProcessSource>(
    controller: &Controller<S>,
    pid: ProcessId,
) -> Result<ProcessRecord, Error> {
    let mut record = controller.lookup().resolve_by_pid(pid)?;
    let tty = controller.open_terminal(&record)?;

    record.kill()?;
    wait_until_gone(controller, &record);

    controller.start_in_terminal(&mut record, &tty, None)?;
    Ok(record)
}

/// Give a killed process a moment to disappear from the process table, so
/// that a fingerprint lookup does not find it again.
fn wait_until_gone<S: ProcessSource>(controller: &Controller<S>, record: &ProcessRecord) {
    for _ in 0..50 {
        if controller.health_check(record).is_err() {
            return;
        }
        std::thread::sleep(Duration::from_millis(20));
    }
    warn!(pid = record.pid().0, "process still present after SIGKILL");
}

fn emit(global: &GlobalOpts, record: &ProcessRecord) -> Result<(), Error> {
    if global.json {
        let json = serde_json::to_string_pretty(record).map_err(std::io::Error::other)?;
        println!("{}", json);
    } else {
        print!("{}", record);
    }
    Ok(())
}

fn report_error(global: &GlobalOpts, err: &Error) {
    if global.json {
        let output = serde_json::json!({
            "error": {
                "code": err.code(),
                "category": err.category(),
                "message": err.to_string(),
                "remediation": err.remediation(),
            }
        });
        println!("{}", output);
    } else {
        eprintln!("prox: {}", err);
        eprintln!("hint: {}", err.remediation());
    }
}
