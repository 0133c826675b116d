use std::process::ExitCode;

fn main() -> ExitCode {
    match cascade_merge::cli::run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}
