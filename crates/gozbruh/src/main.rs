//! gozbruh command-line tool
//!
//! Runs on the sculpting side, where the application can only reach the
//! network by shelling out:
//!
//!   gozbruh serve --exec zbrush-load        # receive from the modeling host
//!   gozbruh send Arm Body                   # send an exported subtool
//!   gozbruh probe                           # check both listeners
//!   gozbruh stop                            # stop a running listener
//!   gozbruh init-config                     # write ~/.zbrush/gozbruh/*

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use gozbruh::config::default_config_dir;
use gozbruh::{
    send_artifacts, Bridge, BridgeConfig, DurableId, LogPresenter, NetworkEndpoint, ObjectName,
    ShellSculptHost,
};

#[derive(Parser, Debug)]
#[command(name = "gozbruh")]
#[command(about = "Move meshes between a modeling host and a sculpting host")]
#[command(version)]
struct Args {
    /// Enable verbose debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Listen for batches from the modeling host
    Serve {
        /// Program run as `<exec> [--arg ...] <path> <target>` per import
        #[arg(long)]
        exec: PathBuf,

        /// Extra argument passed to the import program (repeatable)
        #[arg(long = "arg")]
        args: Vec<String>,

        /// Override the sculpt endpoint (host:port)
        #[arg(long)]
        endpoint: Option<String>,
    },

    /// Send an exported subtool to the modeling host
    Send {
        /// Subtool name; its artifact must already be in the shared directory
        tool: String,

        /// Parent tool name
        parent: String,

        /// Override the mesh endpoint (host:port)
        #[arg(long)]
        endpoint: Option<String>,
    },

    /// Probe listeners (both configured ones by default)
    Probe {
        #[arg(long)]
        endpoint: Option<String>,
    },

    /// Ask a listener to shut down (the sculpt endpoint by default)
    Stop {
        #[arg(long)]
        endpoint: Option<String>,
    },

    /// Write the resolved configuration to the config directory
    InitConfig {
        #[arg(long)]
        dir: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let default_level = if args.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();

    let config = BridgeConfig::resolve().context("failed to resolve configuration")?;

    match args.command {
        Command::Serve {
            exec,
            args,
            endpoint,
        } => {
            let mut config = config;
            if let Some(endpoint) = endpoint {
                config.sculpt_endpoint = parse_endpoint(&endpoint)?;
            }
            let bridge = Bridge::new(config);
            let host = Arc::new(ShellSculptHost::new(exec).with_args(args));
            let server = bridge
                .serve_sculpt(host)
                .await
                .with_context(|| format!("failed to listen on {}", bridge.config().sculpt_endpoint))?;
            info!(
                endpoint = %bridge.config().sculpt_endpoint,
                shared = %bridge.config().shared_dir.display(),
                "serving"
            );
            server.wait().await;
        }

        Command::Send {
            tool,
            parent,
            endpoint,
        } => {
            let mut config = config;
            if let Some(endpoint) = endpoint {
                config.mesh_endpoint = parse_endpoint(&endpoint)?;
            }
            let bridge = Bridge::new(config);
            let name = ObjectName::new(tool).context("invalid tool name")?;
            let parent = DurableId::new(parent);

            let conn = bridge.connect_to_mesh();
            let report = send_artifacts(
                &conn,
                &LogPresenter,
                &bridge.shared_dir(),
                &[(name, parent)],
            )
            .await
            .context("send failed")?;
            info!(objects = report.manifest.len(), "sent");
            conn.close().await;
        }

        Command::Probe { endpoint } => {
            let endpoints = match endpoint {
                Some(endpoint) => vec![parse_endpoint(&endpoint)?],
                None => vec![config.mesh_endpoint.clone(), config.sculpt_endpoint.clone()],
            };
            let bridge = Bridge::new(config);
            let mut down = 0;
            for endpoint in endpoints {
                let conn = gozbruh::Connection::new(endpoint.clone(), bridge.config().connection.clone());
                match conn.open().await {
                    Ok(()) => {
                        println!("{}: up", endpoint);
                        conn.close().await;
                    }
                    Err(e) => {
                        println!("{}: down ({})", endpoint, e);
                        down += 1;
                    }
                }
            }
            if down > 0 {
                bail!("{} listener(s) unreachable", down);
            }
        }

        Command::Stop { endpoint } => {
            let endpoint = match endpoint {
                Some(endpoint) => parse_endpoint(&endpoint)?,
                None => config.sculpt_endpoint.clone(),
            };
            let bridge = Bridge::new(config);
            if bridge.stop(&endpoint).await? {
                println!("{}: shutdown sent", endpoint);
            } else {
                println!("{}: nothing listening", endpoint);
            }
        }

        Command::InitConfig { dir } => {
            let dir = match dir.or_else(default_config_dir) {
                Some(dir) => dir,
                None => bail!("cannot locate the home directory; pass --dir"),
            };
            config
                .write_config_files(&dir)
                .with_context(|| format!("failed to write {}", dir.display()))?;
            println!("wrote {}", dir.display());
        }
    }

    Ok(())
}

fn parse_endpoint(s: &str) -> Result<NetworkEndpoint> {
    NetworkEndpoint::parse(s).with_context(|| format!("invalid endpoint {:?}", s))
}
