use anyhow::Result;
use gitkit::cli::AuthorsCli;
use std::process::ExitCode;

fn main() -> Result<ExitCode> {
    let cli = AuthorsCli::parse();
    cli.execute()
}
