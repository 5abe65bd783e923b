//! # Component Operator
//!
//! Kubernetes operator for ODA Components.
//!
//! ```bash
//! # Run the operator (default)
//! component-operator
//!
//! # Print the CRD manifests
//! component-operator crds > crds.yaml
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use component_operator::crd::crds_yaml;
use component_operator::runtime::{initialization::initialize, watch_loop::run_controllers};

/// Component Operator
#[derive(Parser, Debug)]
#[command(name = "component-operator", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the operator (default)
    Run,
    /// Print every CRD as a multi-document YAML stream
    Crds,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command.unwrap_or(Command::Run) {
        Command::Crds => {
            print!("{}", crds_yaml()?);
            Ok(())
        }
        Command::Run => {
            let init = initialize().await?;
            run_controllers(init.watch_context()).await
        }
    }
}
