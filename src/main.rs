use clap::{Arg, ArgAction, ArgMatches, Command};
use colored::*;
use std::path::PathBuf;
use std::process;

use httpscan::{
    config::ScanConfig,
    output::{OutputFormat, OutputWriter},
    scanner::{Completion, ScanEngine, ScanSummary},
    utils::{adjust_ulimit_size, parse_scan_args},
    ScanError,
};

const EXIT_FAILURE: i32 = 1;
const EXIT_USAGE: i32 = 2;
const EXIT_INTERRUPTED: i32 = 130;

const EXAMPLES: &str = "\
Address range
  Either a single string b1.b2.b3.b4/mask, e.g. `192.168.1.0/24`,
  or four byte tokens such as `10` or `1-254` or `100-150`.
  The special token `*` means 0-255, or 1-254 for the last byte.

Ports
  Any tokens after the range are ports. Defaults to 80.

Examples
  Scan a 192.168.1.0/24 network for ports 80 and 8080.
  All these forms are equivalent:
    httpscan 192.168.1.0/24 80 8080
    httpscan 192 168 1 1-254 80 8080
    httpscan 192 168 1 '*' 80 8080";

fn build_cli() -> Command {
    Command::new("httpscan")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Fast HTTP network scanner: sends a HEAD request to every address and port and prints the response headers")
        .after_help(EXAMPLES)
        .arg(
            Arg::new("targets")
                .value_name("RANGE [PORTS]")
                .help("Address range (CIDR or four byte tokens) followed by optional ports")
                .required(true)
                .num_args(1..)
                .index(1),
        )
        .arg(
            Arg::new("threads")
                .short('n')
                .long("threads")
                .value_name("N")
                .help("Number of parallel requests (default: 512)")
                .value_parser(clap::value_parser!(usize)),
        )
        .arg(
            Arg::new("timeout")
                .short('t')
                .long("timeout")
                .value_name("MS")
                .help("Connect and read timeout per request in milliseconds (default: 5000)")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_name("FORMAT")
                .help("Output format")
                .value_parser(["text", "json", "csv"]),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file (default: ~/.httpscan.toml)")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("ulimit")
                .short('u')
                .long("ulimit")
                .value_name("LIMIT")
                .help("Raise the open file limit to this value")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new("no-summary")
                .long("no-summary")
                .help("Do not print the scan summary to stderr")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Increase log verbosity (-v info, -vv debug)")
                .action(ArgAction::Count),
        )
}

fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_millis()
        .init();
}

fn load_config(matches: &ArgMatches) -> httpscan::Result<ScanConfig> {
    let mut config = ScanConfig::load(matches.get_one::<PathBuf>("config").map(PathBuf::as_path))?;

    if let Some(&threads) = matches.get_one::<usize>("threads") {
        config = config.with_threads(threads);
    }
    if let Some(&timeout) = matches.get_one::<u64>("timeout") {
        config = config.with_timeout(timeout);
    }
    if let Some(format) = matches.get_one::<String>("output") {
        let format: OutputFormat = format.parse().map_err(ScanError::ConfigError)?;
        config = config.with_output_format(format);
    }

    config.validate()?;
    Ok(config)
}

fn print_summary(summary: &ScanSummary) {
    let state = match summary.completion {
        Completion::Done => "done".bright_green(),
        Completion::Aborted => "aborted".bright_yellow(),
        Completion::Incomplete => "incomplete".bright_red(),
    };
    eprintln!(
        "{} {} {}/{} results ({} headers, {} failed) in {:.2}s [{:.0}/s]",
        "[~]".bright_blue(),
        state,
        summary.received,
        summary.expected,
        summary.successes.to_string().bright_cyan(),
        summary.failures,
        summary.duration.as_secs_f64(),
        summary.scan_rate()
    );
}

async fn run(matches: &ArgMatches) -> anyhow::Result<i32> {
    let config = load_config(matches)?;

    let tokens: Vec<&String> = matches
        .get_many::<String>("targets")
        .map(|values| values.collect())
        .unwrap_or_default();
    let spec = parse_scan_args(&tokens, config.threads)?;

    if let Some(soft) = adjust_ulimit_size(matches.get_one::<u64>("ulimit").copied()) {
        if soft < spec.concurrency() as u64 {
            log::warn!(
                "Open file limit {} is below the concurrency of {}; use --ulimit or lower --threads",
                soft,
                spec.concurrency()
            );
        }
    }

    let engine = ScanEngine::new(spec, &config)?;

    let cancel = engine.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("Interrupted, stopping scan");
            cancel.cancel();
        }
    });

    let (summary, _) = engine.run(OutputWriter::stdout(config.output_format)).await?;

    if !matches.get_flag("no-summary") {
        print_summary(&summary);
    }

    Ok(match summary.completion {
        Completion::Done => 0,
        Completion::Aborted => EXIT_INTERRUPTED,
        Completion::Incomplete => EXIT_FAILURE,
    })
}

#[tokio::main]
async fn main() {
    let matches = build_cli().get_matches();
    init_logging(matches.get_count("verbose"));

    let code = match run(&matches).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {}", "[!] ERROR:".bright_red(), e);
            match e.downcast_ref::<ScanError>() {
                Some(scan_error) if scan_error.is_validation() => {
                    eprintln!("Run `httpscan --help` for the accepted range and port forms.");
                    EXIT_USAGE
                }
                Some(ScanError::ConfigError(_)) => EXIT_USAGE,
                _ => EXIT_FAILURE,
            }
        }
    };

    process::exit(code);
}
