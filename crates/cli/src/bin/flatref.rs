use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    flatref_cli::main_entry().await
}
