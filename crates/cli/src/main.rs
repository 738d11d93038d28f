use std::process::ExitCode;

fn main() -> ExitCode {
    mentor_cli::run()
}
