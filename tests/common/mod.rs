use std::process::{Command as ProcCommand, Output, Stdio};

use tempfile::TempDir;

pub fn base_cmd(data_dir: &TempDir) -> ProcCommand {
    let mut command = ProcCommand::new(env!("CARGO_BIN_EXE_onlinecourse"));

    command
        .env("DOTENV_PATH", data_dir.path().join("missing.env"))
        .env_remove("ONLINECOURSE_LOG_FILE")
        .env_remove("ONLINECOURSE_API_LISTEN")
        .env("RUST_LOG", "warn")
        .stdin(Stdio::null())
        .arg("--data-dir")
        .arg(data_dir.path());

    command
}

pub fn run_ok(data_dir: &TempDir, args: &[&str]) -> String {
    let output = base_cmd(data_dir).args(args).output().expect("run onlinecourse");
    assert_success(args, &output);
    String::from_utf8(output.stdout).expect("utf8 stdout").trim().to_string()
}

pub fn assert_success(args: &[&str], output: &Output) {
    assert!(
        output.status.success(),
        "{:?} failed\nstdout:\n{}\nstderr:\n{}",
        args,
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
}
