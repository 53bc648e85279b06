use anyhow::Result;
use gitkit::cli::PkgCli;
use std::process::ExitCode;

fn main() -> Result<ExitCode> {
    let cli = PkgCli::parse();
    cli.execute()
}
