use std::process::ExitCode;

fn main() -> ExitCode {
    staffquote_cli::run()
}
