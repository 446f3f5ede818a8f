//! Cassette CLI

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

use anyhow::Context;

use cassette::har;
use cassette::matching::{PathAndQuery, RouteResolver};
use cassette::network::HyperTransport;
use cassette::replay;
use cassette::server::MockServer;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 3 {
        eprintln!("Cassette v{}", env!("CARGO_PKG_VERSION"));
        eprintln!();
        eprintln!("Usage: cassette <command> <file.har> [options]");
        eprintln!();
        eprintln!("Commands:");
        eprintln!("  serve <file.har> [port]   Serve recorded responses (404 on miss)");
        eprintln!("  replay <file.har>         Re-issue every recorded request");
        eprintln!("  verify <file.har>         Replay and compare against recordings");
        eprintln!("  stats <file.har>          Show archive statistics");
        process::exit(1);
    }

    let command = args[1].as_str();
    let file = PathBuf::from(&args[2]);

    let result = match command {
        "serve" => {
            let port = args
                .get(3)
                .and_then(|p| p.parse::<u16>().ok())
                .unwrap_or(8080);
            run_serve(&file, port)
        }
        "replay" => run_replay(&file),
        "verify" => run_verify(&file),
        "stats" => run_stats(&file),
        _ => {
            eprintln!("Unknown command: {command}");
            eprintln!("Run 'cassette' for usage information.");
            process::exit(1);
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

fn run_serve(file: &Path, port: u16) -> anyhow::Result<()> {
    let server = MockServer::load(file, Arc::new(PathAndQuery))
        .with_context(|| format!("load archive {}", file.display()))?;

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    runtime()?.block_on(server.serve(addr))?;
    Ok(())
}

fn run_replay(file: &Path) -> anyhow::Result<()> {
    let archive = load_archive(file)?;
    let transport = HyperTransport::new();

    let responses = runtime()?.block_on(replay::replay_all(&archive, &transport))?;
    for response in responses {
        println!("{}", String::from_utf8_lossy(&response.body));
    }
    Ok(())
}

fn run_verify(file: &Path) -> anyhow::Result<()> {
    let archive = load_archive(file)?;
    let transport = HyperTransport::new();

    let report = runtime()?.block_on(replay::verify_all(&archive, &transport))?;
    println!(
        "Verification of {} completed ({} / {} matching responses).",
        file.display(),
        report.total - report.failures.len(),
        report.total
    );

    for failure in &report.failures {
        eprintln!("  {} {}: {}", failure.method, failure.url, failure.reason);
    }

    if !report.passed() {
        process::exit(1);
    }
    Ok(())
}

fn run_stats(file: &Path) -> anyhow::Result<()> {
    let archive = load_archive(file)?;
    let resolver = RouteResolver::build(&archive, Arc::new(PathAndQuery));

    println!("Archive: {}", file.display());
    println!(
        "Creator: {} {}",
        archive.log.creator.name, archive.log.creator.version
    );
    println!("Entries: {}", archive.log.entries.len());
    println!("Routes:  {}", resolver.route_count());
    Ok(())
}

fn load_archive(file: &Path) -> anyhow::Result<har::HttpArchive> {
    har::load(file)
        .with_context(|| format!("load archive {}", file.display()))?
        .with_context(|| format!("archive not found: {}", file.display()))
}

fn runtime() -> anyhow::Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("build tokio runtime")
}
