use authd::cli::{print_error, Cli};
use std::process::ExitCode;

fn main() -> ExitCode {
    match Cli::run() {
        Ok(code) => code,
        Err(e) => {
            print_error(&e.to_string());
            ExitCode::FAILURE
        }
    }
}
