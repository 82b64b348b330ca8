//! Copy example: a single password-authenticated scp transfer
//!
//! Runs scp behind a pty and answers its password prompt, for any host
//! reachable with a password.
//!
//! # Usage
//!
//! ```bash
//! cargo run --example scp_copy -- --user admin --password secret ./notes.txt host:/tmp/
//! ```

use std::env;
use std::time::Duration;

use sshcheck::{ScpBuilder, TransferEndpoint};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let scp = ScpBuilder::new(&args.user)
        .port(args.port)
        .password(&args.password)
        .timeout(Duration::from_secs(args.timeout))
        .build()?;

    let src = TransferEndpoint::parse(&args.src);
    let dest = TransferEndpoint::parse(&args.dest);
    println!("Copying {} -> {}", src, dest);

    let outcome = scp.copy(&src, &dest).await?;
    println!("{}", outcome);

    Ok(())
}

/// Simple argument parser (avoiding external dependencies)
struct Args {
    user: String,
    password: String,
    port: u16,
    timeout: u64,
    src: String,
    dest: String,
}

impl Args {
    fn parse() -> Self {
        let args: Vec<String> = env::args().collect();
        let mut user = env::var("USER").unwrap_or_else(|_| "root".to_string());
        let mut password = None;
        let mut port = 22u16;
        let mut timeout = 60u64;
        let mut operands = Vec::new();

        let mut i = 1;
        while i < args.len() {
            match args[i].as_str() {
                "--user" | "-u" => {
                    i += 1;
                    if i < args.len() {
                        user = args[i].clone();
                    }
                }
                "--password" | "-P" => {
                    i += 1;
                    if i < args.len() {
                        password = Some(args[i].clone());
                    }
                }
                "--port" | "-p" => {
                    i += 1;
                    if i < args.len() {
                        port = args[i].parse().unwrap_or(22);
                    }
                }
                "--timeout" | "-t" => {
                    i += 1;
                    if i < args.len() {
                        timeout = args[i].parse().unwrap_or(60);
                    }
                }
                "--help" => {
                    Self::print_help();
                    std::process::exit(0);
                }
                other => operands.push(other.to_string()),
            }
            i += 1;
        }

        let (Some(password), [src, dest]) = (password, operands.as_slice()) else {
            Self::print_help();
            std::process::exit(1);
        };

        Self {
            user,
            password,
            port,
            timeout,
            src: src.clone(),
            dest: dest.clone(),
        }
    }

    fn print_help() {
        println!(
            r#"sshcheck scp_copy example

USAGE:
    cargo run --example scp_copy -- [OPTIONS] <SRC> <DEST>

OPTIONS:
    -u, --user <USER>        Login user [default: $USER]
    -P, --password <PASS>    Password answered at the prompt (required)
    -p, --port <PORT>        SSH port [default: 22]
    -t, --timeout <SECS>     Transfer deadline [default: 60]
    --help                   Print this help message
"#
        );
    }
}
