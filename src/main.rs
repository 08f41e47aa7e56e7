//! Main entry point for the frametar CLI app

fn main() -> std::process::ExitCode {
    if let Err(e) = frametar::cli_runner::run_cli_app() {
        if let Some(usage) = e.downcast_ref::<clap::Error>() {
            let _ = usage.print();
            // --help and --version land here too and are not failures.
            return if usage.use_stderr() {
                std::process::ExitCode::FAILURE
            } else {
                std::process::ExitCode::SUCCESS
            };
        }
        eprintln!("Error: {}", e);
        return std::process::ExitCode::FAILURE;
    }
    std::process::ExitCode::SUCCESS
}
