use clap::Parser;
use std::env;

use crate::cli::command::Command;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Online course service with enrollment, exams and an admin registry",
    long_about = "Serves the course catalogue, enrollment, exam submission and admin views over HTTP, and authors users and course content from the command line.",
    subcommand_required = false,
    arg_required_else_help = false
)]
pub struct Cli {
    #[arg(
        long,
        default_value_t = false,
        help = "Reset all persisted state (delete the SQLite database) before starting"
    )]
    pub reset: bool,

    #[arg(
        long,
        env = "ONLINECOURSE_DATA_DIR",
        default_value = ".onlinecourse/",
        value_name = "DIR",
        help = "Directory to store persistent data"
    )]
    pub data_dir: String,

    #[arg(
        long = "log-file",
        env = "ONLINECOURSE_LOG_FILE",
        value_name = "PATH",
        help = "Write logs to PATH (in addition to stderr)"
    )]
    pub log_file: Option<String>,

    #[arg(
        long = "api-listen",
        env = "ONLINECOURSE_API_LISTEN",
        value_name = "ADDR",
        default_value = "127.0.0.1:8000",
        help = "HTTP listen address (host:port)"
    )]
    pub api_listen: std::net::SocketAddr,

    #[command(subcommand)]
    pub cmd: Option<Command>,
}

pub fn parse() -> Cli {
    let dotenv_path = env::var("DOTENV_PATH").unwrap_or(".env".into());
    if dotenvy::from_filename(&dotenv_path).is_ok() {
        eprintln!("Loaded env from {}", dotenv_path);
    }
    Cli::parse()
}
