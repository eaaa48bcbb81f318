use std::{
    io::{self, Read},
    path::PathBuf,
    process::ExitCode,
    time::Duration,
};

use clap::{Parser as ClapParser, ValueEnum};
use ogree_cli::{
    Session,
    backend::HttpBackend,
    cli::CliError,
    output::Output,
    repl, script,
    viz::Ogree3D,
};
use tracing::error;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, ValueEnum)]
#[value(rename_all = "UPPER")]
enum Verbosity {
    None,
    Error,
    Warning,
    Info,
    Debug,
}

impl Verbosity {
    fn directive(self) -> &'static str {
        match self {
            Verbosity::None => "off",
            Verbosity::Error => "error",
            Verbosity::Warning => "warn",
            Verbosity::Info => "info",
            Verbosity::Debug => "debug",
        }
    }
}

#[derive(ClapParser)]
#[command(name = "ocli")]
#[command(about = "OGrEE CLI - build and explore a datacenter digital twin")]
#[command(version)]
struct Cli {
    /// URL of the OGrEE API
    #[arg(short, long, env = "OGREE_API_URL", default_value = "http://localhost:3001")]
    api_url: String,

    /// Token sent to the API
    #[arg(long, env = "OGREE_API_TOKEN", default_value = "", hide_env_values = true)]
    token: String,

    /// Address of OGrEE-3D
    #[arg(short, long, env = "OGREE_3D_URL", default_value = "localhost:5500")]
    unity_url: String,

    /// Network timeout in milliseconds
    #[arg(long, env = "OGREE_TIMEOUT", default_value_t = 5000)]
    timeout: u64,

    /// Log level, RUST_LOG takes precedence when set
    #[arg(short, long, value_enum, default_value = "ERROR")]
    verbose: Verbosity,

    /// File keeping the REPL history
    #[arg(long, default_value = ".history")]
    history_path: PathBuf,

    /// Run an .ocli script and exit
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Run one command and exit
    #[arg(short, long)]
    command: Option<String>,

    /// Initial variable, as name=value
    #[arg(long = "var", value_name = "NAME=VALUE")]
    vars: Vec<String>,
}

fn init_tracing(verbosity: Verbosity) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(verbosity.directive()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> Result<(), CliError> {
    let timeout = Duration::from_millis(cli.timeout);
    let backend = HttpBackend::new(&cli.api_url, &cli.token, timeout);
    let viz = Ogree3D::new(&cli.unity_url, timeout, &cli.api_url, &cli.token);
    let mut session = Session::new(Box::new(backend), Box::new(viz), Output::stdout());

    for var in &cli.vars {
        session.run(&format!(".var:{}", var))?;
    }

    if let Some(command) = &cli.command {
        session.run(command)?;
        return Ok(());
    }
    if let Some(file) = &cli.file {
        script::run_file(&mut session, file)?;
        return Ok(());
    }
    if !atty::is(atty::Stream::Stdin) {
        let mut text = String::new();
        io::stdin().read_to_string(&mut text)?;
        script::run_script(&mut session, "stdin", &text)?;
        return Ok(());
    }

    let completion = HttpBackend::new(&cli.api_url, &cli.token, timeout);
    repl::run(&mut session, Box::new(completion), &cli.history_path)
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "ocli failed");
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
    }
}
