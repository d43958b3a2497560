use std::process::ExitCode;

fn main() -> miette::Result<ExitCode> {
    scadcheck::cli::run()
}
