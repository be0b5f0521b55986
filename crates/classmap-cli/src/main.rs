//! Classmap CLI - Extract and watch class diagrams of TypeScript workspaces

mod cli;
mod source;

use clap::Parser;

fn main() {
    let cli_args = cli::Cli::parse();
    let mut app = cli::ClassmapApp::new();

    if let Err(e) = app.run(cli_args) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
