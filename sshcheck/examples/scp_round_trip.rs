//! Round trip example: push a random file to an app instance and pull it back
//!
//! Logs in with the platform CLI, enables SSH on the app, then copies a
//! fresh `binary.dat` into the app container over the SSH gateway and back
//! again, failing if the pulled tree differs from the pushed one.
//!
//! # Prerequisites
//!
//! - `cf`, `scp` and `sftp` on PATH
//! - A pushed app with at least one running instance
//! - A JSON run configuration named by `CONFIG`
//!
//! # Usage
//!
//! ```bash
//! CONFIG=./integration_config.json cargo run --example scp_round_trip -- --app catnip
//! ```

use std::env;

use sshcheck::platform::{CfCli, REMOTE_ACCESS_LOG, SSH_AUTHORIZED_EVENT, ssh_user};
use sshcheck::transport::ToolPaths;
use sshcheck::{HarnessConfig, ScpBuilder, TransferFixture};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging (set RUST_LOG=debug for drained scp output)
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = HarnessConfig::load()?;
    let tools = ToolPaths::discover()?;

    let cf = CfCli::default();
    cf.login(&config).await?;

    let guid = cf.app_guid(&args.app).await?;
    cf.enable_ssh(&guid).await?;
    let endpoint = cf.ssh_endpoint().await?;
    println!("SSH gateway: {}", endpoint);

    let scp = ScpBuilder::new(ssh_user(&guid, args.index))
        .port(endpoint.port)
        .password(cf.oauth_token().await?)
        .tools(&tools)
        .timeout(config.default_timeout())
        .build()?;

    let fixture = TransferFixture::new()?;
    scp.round_trip(
        fixture.source(),
        &endpoint.host,
        &args.remote_dir,
        fixture.target(),
    )
    .await?;

    println!(
        "{} survived the round trip through {}:{}",
        fixture.file_name(),
        endpoint.host,
        args.remote_dir
    );

    if !cf.recent_logs(&args.app).await?.contains(REMOTE_ACCESS_LOG) {
        eprintln!("warning: no '{}' line in recent logs", REMOTE_ACCESS_LOG);
    }
    if !cf.events(&args.app).await?.contains(SSH_AUTHORIZED_EVENT) {
        eprintln!("warning: no {} event recorded", SSH_AUTHORIZED_EVENT);
    }
    Ok(())
}

/// Simple argument parser (avoiding external dependencies)
struct Args {
    app: String,
    index: u32,
    remote_dir: String,
}

impl Args {
    fn parse() -> Self {
        let args: Vec<String> = env::args().collect();
        let mut app = None;
        let mut index = 0u32;
        let mut remote_dir = "/home/vcap".to_string();

        let mut i = 1;
        while i < args.len() {
            match args[i].as_str() {
                "--app" | "-a" => {
                    i += 1;
                    if i < args.len() {
                        app = Some(args[i].clone());
                    }
                }
                "--index" | "-i" => {
                    i += 1;
                    if i < args.len() {
                        index = args[i].parse().unwrap_or(0);
                    }
                }
                "--remote-dir" | "-r" => {
                    i += 1;
                    if i < args.len() {
                        remote_dir = args[i].clone();
                    }
                }
                "--help" => {
                    Self::print_help();
                    std::process::exit(0);
                }
                _ => {
                    eprintln!("Unknown argument: {}", args[i]);
                }
            }
            i += 1;
        }

        let Some(app) = app else {
            eprintln!("Error: --app is required");
            std::process::exit(1);
        };

        Self {
            app,
            index,
            remote_dir,
        }
    }

    fn print_help() {
        println!(
            r#"sshcheck scp_round_trip example

USAGE:
    CONFIG=<path> cargo run --example scp_round_trip -- [OPTIONS]

OPTIONS:
    -a, --app <NAME>           App to copy into (required)
    -i, --index <N>            Instance index [default: 0]
    -r, --remote-dir <PATH>    Remote directory [default: /home/vcap]
    --help                     Print this help message
"#
        );
    }
}
