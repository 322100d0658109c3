// Main CLI entry point for ChronosRedirect
// Uses clap for argument parsing

use anyhow::{Context, Result};
use chronos_redirect::engine::ScanEngine;
use chronos_redirect::fuzzer::load_targets;
use chronos_redirect::models::{Method, ScanConfig, DEFAULT_CONCURRENCY, DEFAULT_KEYWORD};
use chronos_redirect::payloads::load_payloads;
use chronos_redirect::reporting::{format_summary, print_banner};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use colored::Colorize;
use std::io;
use std::path::PathBuf;
use tokio::sync::Semaphore;
use tracing_subscriber::EnvFilter;

fn cli() -> Command {
    Command::new("chronos-redirect")
        .version(clap::crate_version!())
        .about("ChronosRedirect: A fast open redirect fuzzer")
        .after_help("EXAMPLES:\n  cat urls.txt | chronos-redirect\n  cat urls.txt | chronos-redirect -p payloads.txt -c 50 --stealth --output results.json\n  cat urls.txt | chronos-redirect --proxy http://127.0.0.1:8080 --method POST --silent")
        .arg(Arg::new("payloads")
            .short('p')
            .long("payloads")
            .num_args(1)
            .value_parser(value_parser!(PathBuf))
            .help("File with payloads (optional)"))
        .arg(Arg::new("keyword")
            .short('k')
            .long("keyword")
            .num_args(1)
            .default_value(DEFAULT_KEYWORD)
            .help("Keyword in URLs to replace with payload"))
        .arg(Arg::new("concurrency")
            .short('c')
            .long("concurrency")
            .num_args(1)
            .value_parser(value_parser!(u64).range(1..=Semaphore::MAX_PERMITS as u64))
            .help(format!("Concurrent requests [default: {}]", DEFAULT_CONCURRENCY)))
        .arg(Arg::new("proxy")
            .long("proxy")
            .num_args(1)
            .help("HTTP proxy (ex: http://127.0.0.1:8080)"))
        .arg(Arg::new("stealth")
            .long("stealth")
            .action(ArgAction::SetTrue)
            .help("Enable stealth mode with random delay"))
        .arg(Arg::new("method")
            .long("method")
            .num_args(1)
            .default_value("GET")
            .value_parser(["GET", "POST"])
            .ignore_case(true)
            .help("HTTP method to use"))
        .arg(Arg::new("filter_domain")
            .long("filter-domain")
            .num_args(1)
            .help("Only report redirects to this domain (e.g., evil.com)"))
        .arg(Arg::new("output")
            .long("output")
            .num_args(1)
            .value_parser(value_parser!(PathBuf))
            .help("Output JSON file (e.g., results.json)"))
        .arg(Arg::new("silent")
            .long("silent")
            .action(ArgAction::SetTrue)
            .help("Only show valid findings, suppress informational messages"))
}

fn config_from_matches(matches: &ArgMatches) -> Result<ScanConfig> {
    let method: Method = matches
        .get_one::<String>("method")
        .map(String::as_str)
        .unwrap_or("GET")
        .parse()?;

    Ok(ScanConfig {
        concurrency: matches
            .get_one::<u64>("concurrency")
            .map_or(DEFAULT_CONCURRENCY, |&c| c as usize),
        method,
        keyword: matches.get_one::<String>("keyword").cloned().unwrap_or_else(|| DEFAULT_KEYWORD.to_string()),
        stealth: matches.get_flag("stealth"),
        silent: matches.get_flag("silent"),
        output: matches.get_one::<PathBuf>("output").cloned(),
        proxy: matches.get_one::<String>("proxy").cloned(),
        filter_domain: matches.get_one::<String>("filter_domain").cloned(),
        ..ScanConfig::default()
    })
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

async fn run(matches: ArgMatches) -> Result<()> {
    let config = config_from_matches(&matches)?;
    anyhow::ensure!(!config.keyword.is_empty(), "keyword must not be empty");
    let payload_path = matches.get_one::<PathBuf>("payloads").cloned();

    // Polled first so the handler is installed before any input is read
    tokio::select! {
        biased;
        _ = tokio::signal::ctrl_c() => {
            println!("\nInterrupted by user. Exiting...");
            Ok(())
        }
        result = scan(config, payload_path) => result,
    }
}

async fn scan(config: ScanConfig, payload_path: Option<PathBuf>) -> Result<()> {
    if !config.silent {
        print_banner();
    }

    let payloads = tokio::task::spawn_blocking(move || load_payloads(payload_path.as_deref()))
        .await?
        .context("cannot start scan")?;
    let keyword = config.keyword.clone();
    let targets = tokio::task::spawn_blocking(move || load_targets(io::stdin().lock(), &keyword))
        .await?
        .context("cannot start scan")?;

    println!("[INFO] Processing {} URLs with {} payloads.", targets.len(), payloads.len());

    let silent = config.silent;
    let output = config.output.clone();
    let engine = ScanEngine::new(config).context("cannot start scan")?;
    let summary = engine.run(&targets, &payloads).await?;

    if !silent {
        println!("{}", format_summary(&summary));
        if let Some(path) = output {
            println!("[INFO] JSON report written to {}", path.display());
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    let matches = cli().get_matches();
    init_logging();

    let code = match run(matches).await {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("{} {:#}", "[FATAL]".red(), e);
            1
        }
    };
    // Exit directly: a stdin read cut short by Ctrl-C would otherwise hold up runtime shutdown
    std::process::exit(code);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_flags() {
        let matches = cli().try_get_matches_from(["chronos-redirect"]).unwrap();
        let config = config_from_matches(&matches).unwrap();
        assert_eq!(config.concurrency, DEFAULT_CONCURRENCY);
        assert_eq!(config.keyword, "FUZZ");
        assert_eq!(config.method, Method::GET);
        assert!(!config.stealth);
        assert!(config.output.is_none());
    }

    #[test]
    fn all_flags_parse() {
        let matches = cli()
            .try_get_matches_from([
                "chronos-redirect",
                "-p", "payloads.txt",
                "-k", "INJECT",
                "-c", "5",
                "--proxy", "http://127.0.0.1:8080",
                "--stealth",
                "--method", "post",
                "--filter-domain", "evil.com",
                "--output", "out.json",
                "--silent",
            ])
            .unwrap();
        let config = config_from_matches(&matches).unwrap();
        assert_eq!(config.concurrency, 5);
        assert_eq!(config.keyword, "INJECT");
        assert_eq!(config.method, Method::POST);
        assert_eq!(config.filter_domain.as_deref(), Some("evil.com"));
        assert_eq!(config.output, Some(PathBuf::from("out.json")));
        assert!(config.stealth && config.silent);
    }

    #[test]
    fn zero_concurrency_is_rejected() {
        assert!(cli().try_get_matches_from(["chronos-redirect", "-c", "0"]).is_err());
    }

    #[test]
    fn concurrency_above_semaphore_limit_is_rejected() {
        let too_many = (Semaphore::MAX_PERMITS as u64 + 1).to_string();
        assert!(cli().try_get_matches_from(["chronos-redirect", "-c", &too_many]).is_err());
        assert!(cli()
            .try_get_matches_from(["chronos-redirect", "-c", "18446744073709551615"])
            .is_err());
    }

    #[test]
    fn concurrency_help_shows_default() {
        let help = cli().render_help().to_string();
        assert!(help.contains(&format!("[default: {}]", DEFAULT_CONCURRENCY)));
    }

    #[test]
    fn unknown_method_is_rejected() {
        assert!(cli().try_get_matches_from(["chronos-redirect", "--method", "PUT"]).is_err());
    }
}
