use clap::Parser;
use polyglot_exec::ExecutionConfig;
use polyglot_exec_server::{create_app, run_server};
use std::{net::SocketAddr, path::PathBuf, time::Duration};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address to listen on
    #[arg(short, long, default_value = "0.0.0.0:3000")]
    addr: SocketAddr,

    /// TOML file with execution settings; flags below override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Maximum number of concurrent executions
    #[arg(short, long)]
    max_concurrent: Option<usize>,

    /// Run timeout in seconds
    #[arg(long)]
    run_timeout: Option<u64>,

    /// Compile timeout in seconds
    #[arg(long)]
    compile_timeout: Option<u64>,

    /// Directory for per-request workspaces
    #[arg(long)]
    workspace_root: Option<PathBuf>,

    /// CPU time limit in seconds
    #[arg(long)]
    cpu_time_limit: Option<u64>,

    /// File size limit in bytes
    #[arg(long)]
    file_size_limit: Option<u64>,

    /// Captured bytes per output stream
    #[arg(long)]
    max_output_bytes: Option<usize>,

    /// Largest accepted source, in bytes
    #[arg(long)]
    max_source_bytes: Option<usize>,
}

impl Args {
    fn execution_config(&self) -> anyhow::Result<ExecutionConfig> {
        let mut config = match &self.config {
            Some(path) => ExecutionConfig::from_file(path)?,
            None => ExecutionConfig::default(),
        };

        if let Some(n) = self.max_concurrent {
            config.max_concurrent_executions = n;
        }
        if let Some(secs) = self.run_timeout {
            config.run_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = self.compile_timeout {
            config.compile_timeout = Duration::from_secs(secs);
        }
        if let Some(root) = &self.workspace_root {
            config.workspace_root = root.clone();
        }
        if let Some(secs) = self.cpu_time_limit {
            config.limits.cpu_time = secs;
        }
        if let Some(bytes) = self.file_size_limit {
            config.limits.file_size = bytes;
        }
        if let Some(bytes) = self.max_output_bytes {
            config.limits.max_output_bytes = bytes;
        }
        if let Some(bytes) = self.max_source_bytes {
            config.max_source_bytes = bytes;
        }

        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let config = args.execution_config()?;
    info!(
        "Workspaces under {}, {} concurrent executions",
        config.workspace_root.display(),
        config.max_concurrent_executions
    );

    let app = create_app(config)?;
    run_server(app, args.addr).await?;

    Ok(())
}
