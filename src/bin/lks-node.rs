#![forbid(unsafe_code)]
//! LKS Chain node entry point.

use clap::Parser;
use lkschain::node::Node;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "lks-node", about = "Run an LKS Chain node")]
struct Args {
    /// Path to the node configuration file
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let node = Node::init(&args.config).await?;
    Arc::new(node).start().await
}
