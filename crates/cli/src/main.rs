use std::process::ExitCode;

fn main() -> ExitCode {
    expensebot_cli::run()
}
