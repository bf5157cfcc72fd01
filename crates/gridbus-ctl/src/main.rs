//! gridbus-ctl: command-line interface for the gridbus daemon.

use anyhow::{Context, Result};

use gridbus_core::config::{DEFAULT_ADDRESS, DEFAULT_API_PORT};

mod cmd;

use cmd::chunks::Target;

fn print_usage() {
    println!("Usage: gridbus-ctl [--port <port>] [--address <addr>] <command>");
    println!();
    println!("Commands:");
    println!("  status                                  Show daemon status and store totals");
    println!("  put-chunk <files_id> <n> <path>         Save one chunk from a file");
    println!("  get-chunk <files_id> <n> [--out <path>] Fetch one chunk");
    println!("  put-file <path> [--chunk-size <bytes>]  Split a file into chunks and store it");
    println!("  get-file <id> <out>                     Reassemble a stored file");
    println!();
    println!("Options:");
    println!("  --port <port>       API port (default: {})", DEFAULT_API_PORT);
    println!("  --address <addr>    Bus address (default: {})", DEFAULT_ADDRESS);
    println!("  --bucket <bucket>   Bucket (default: the daemon's default bucket)");
}

/// Options accepted anywhere on the command line.
#[derive(Debug, Default, PartialEq)]
struct Options {
    port: Option<u16>,
    address: Option<String>,
    bucket: Option<String>,
    out: Option<String>,
    chunk_size: Option<String>,
}

/// Split `args` into options and positional words.
fn parse_args(args: &[String]) -> Result<(Options, Vec<&str>)> {
    let mut opts = Options::default();
    let mut remaining: Vec<&str> = Vec::new();
    let mut i = 0;
    while i < args.len() {
        let flag = args[i].as_str();
        let slot = match flag {
            "--port" | "--address" | "--bucket" | "--out" | "--chunk-size" => {
                i += 1;
                Some(
                    args.get(i)
                        .with_context(|| format!("{} requires a value", flag))?
                        .clone(),
                )
            }
            _ => None,
        };
        match (flag, slot) {
            ("--port", Some(v)) => {
                opts.port = Some(v.parse().context("--port must be a number")?);
            }
            ("--address", v @ Some(_)) => opts.address = v,
            ("--bucket", v @ Some(_)) => opts.bucket = v,
            ("--out", v @ Some(_)) => opts.out = v,
            ("--chunk-size", v @ Some(_)) => opts.chunk_size = v,
            _ => remaining.push(&args[i]),
        }
        i += 1;
    }
    Ok((opts, remaining))
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let (opts, remaining) = parse_args(&args)?;

    let port = opts.port.unwrap_or(DEFAULT_API_PORT);
    let target = Target {
        port,
        address: opts.address.as_deref().unwrap_or(DEFAULT_ADDRESS),
        bucket: opts.bucket.as_deref(),
    };

    match remaining.as_slice() {
        ["status"] | []                     => cmd::status::cmd_status(port).await,
        ["put-chunk", files_id, n, path]    => cmd::chunks::cmd_put_chunk(target, files_id, n, path).await,
        ["get-chunk", files_id, n]          => cmd::chunks::cmd_get_chunk(target, files_id, n, opts.out.as_deref()).await,
        ["put-file", path]                  => cmd::files::cmd_put_file(target, path, opts.chunk_size.as_deref()).await,
        ["get-file", id, out]               => cmd::files::cmd_get_file(target, id, out).await,
        ["help"] | ["--help"] | ["-h"]      => { print_usage(); Ok(()) }
        other => {
            eprintln!("Unknown command: {}", other.join(" "));
            eprintln!();
            print_usage();
            std::process::exit(1);
        }
    }
}
