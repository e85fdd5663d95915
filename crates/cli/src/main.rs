use std::process::ExitCode;

fn main() -> ExitCode {
    giftwell_cli::run()
}
