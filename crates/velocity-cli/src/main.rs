use std::process::ExitCode;

fn main() -> ExitCode {
    match velocity_core::run(std::env::args_os().collect()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("velocity: {err:#}");
            ExitCode::FAILURE
        }
    }
}
