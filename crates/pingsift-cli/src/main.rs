use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use glob::glob;
use tracing::Level;

use pingsift_core::{
    DEFAULT_HEADER_OFFSET, DecodeSummary, DecoderConfig, SendTimeZone, SenderReport,
};

mod export;

use export::{ExportFormat, RecordWriter, partition_path};

const EXAMPLES: &str = "Examples:\n  pingsift pcap decode capture.pcap --out-dir parsed\n  pingsift pcap decode 'captures/*.pcap' --format jsonl --summary\n  pingsift pcap detect merged_output.pcap";

#[derive(Parser, Debug)]
#[command(name = "pingsift")]
#[command(version)]
#[command(long_version = concat!(
    env!("CARGO_PKG_VERSION"),
    " (commit ",
    env!("PINGSIFT_BUILD_COMMIT"),
    ", ",
    env!("PINGSIFT_BUILD_DATE"),
    ")"
))]
#[command(
    about = "Offline decoder for HiPerConTracer-style probe traffic in packet captures.",
    long_about = None,
    after_help = EXAMPLES
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Operations on PCAP/PCAPNG inputs (offline-first).
    Pcap {
        #[command(subcommand)]
        command: PcapCommands,
    },
}

#[derive(Subcommand, Debug)]
enum PcapCommands {
    /// Decode every IP frame into one table row per frame, one table per capture.
    #[command(after_help = EXAMPLES)]
    Decode {
        /// Paths or glob patterns of .pcap/.pcapng files
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Directory receiving one `<capture>_parsed_packets` file per input
        #[arg(short = 'o', long, default_value = ".")]
        out_dir: PathBuf,

        /// Output table format
        #[arg(long, value_enum, default_value_t = ExportFormat::Csv)]
        format: ExportFormat,

        /// Byte offset of the probe header from the start of the frame
        #[arg(long, default_value_t = DEFAULT_HEADER_OFFSET)]
        header_offset: usize,

        /// Render send times in UTC instead of the local time zone
        #[arg(long)]
        utc: bool,

        /// Print per-capture decode summaries as JSON to stdout
        #[arg(long)]
        summary: bool,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,

        #[command(flatten)]
        output: OutputArgs,
    },
    /// List hosts sending marked ICMP echo requests.
    Detect {
        /// Paths or glob patterns of .pcap/.pcapng files
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Print the sender report as JSON
        #[arg(long)]
        json: bool,

        /// Pretty-print JSON output
        #[arg(long, requires = "json")]
        pretty: bool,

        #[command(flatten)]
        output: OutputArgs,
    },
}

#[derive(Args, Debug, Clone, Copy)]
struct OutputArgs {
    /// Suppress non-error output
    #[arg(long, conflicts_with = "verbose")]
    quiet: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

struct DecodeOptions {
    out_dir: PathBuf,
    format: ExportFormat,
    config: DecoderConfig,
    summary: bool,
    pretty: bool,
    quiet: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Pcap { command } => match command {
            PcapCommands::Decode {
                inputs,
                out_dir,
                format,
                header_offset,
                utc,
                summary,
                pretty,
                output,
            } => {
                init_tracing(output);
                let time_zone = if utc {
                    SendTimeZone::UTC
                } else {
                    SendTimeZone::Local
                };
                cmd_pcap_decode(
                    &inputs,
                    DecodeOptions {
                        out_dir,
                        format,
                        config: DecoderConfig {
                            header_offset,
                            time_zone,
                        },
                        summary,
                        pretty,
                        quiet: output.quiet,
                    },
                )
            }
            PcapCommands::Detect {
                inputs,
                json,
                pretty,
                output,
            } => {
                init_tracing(output);
                cmd_pcap_detect(&inputs, json, pretty)
            }
        },
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {}", err.message);
            if let Some(hint) = err.hint {
                eprintln!("hint: {}", hint);
            }
            ExitCode::from(2)
        }
    }
}

fn init_tracing(output: OutputArgs) {
    let level = if output.verbose {
        Level::DEBUG
    } else if output.quiet {
        Level::ERROR
    } else {
        Level::INFO
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[derive(Debug)]
struct CliError {
    message: String,
    hint: Option<String>,
}

impl CliError {
    fn new(message: impl Into<String>, hint: Option<String>) -> Self {
        Self {
            message: message.into(),
            hint,
        }
    }
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

impl From<anyhow::Error> for CliError {
    fn from(err: anyhow::Error) -> Self {
        CliError::new(format!("{err:#}"), None)
    }
}

fn cmd_pcap_decode(inputs: &[PathBuf], options: DecodeOptions) -> Result<(), CliError> {
    let captures = resolve_inputs(inputs)?;
    check_partition_names(&captures)?;

    fs::create_dir_all(&options.out_dir).with_context(|| {
        format!(
            "Failed to create output directory: {}",
            options.out_dir.display()
        )
    })?;

    let mut summaries = Vec::with_capacity(captures.len());
    for capture in &captures {
        summaries.push(decode_capture(capture, &options)?);
    }

    if options.summary {
        let json = to_json(&summaries, options.pretty)?;
        println!("{}", json);
    }
    Ok(())
}

fn decode_capture(capture: &Path, options: &DecodeOptions) -> Result<DecodeSummary, CliError> {
    let mut stream = pingsift_core::open_pcap_stream(capture, &options.config)
        .with_context(|| format!("Failed to open capture: {}", capture.display()))?;
    let output = partition_path(
        &options.out_dir,
        &stream.summary().source_name,
        options.format,
    );
    ensure_distinct(capture, &output)?;

    let mut writer = RecordWriter::create(&output, options.format)?;
    for record in stream.by_ref() {
        let record = record
            .with_context(|| format!("PCAP/PCAPNG decode failed: {}", capture.display()))?;
        writer.write(&record)?;
    }
    let rows = writer.finish()?;
    let summary = stream.into_summary();

    if !options.quiet {
        eprintln!("OK: {} records written -> {}", rows, output.display());
        if !summary.skipped.is_empty() {
            eprintln!(
                "  {} frame(s) skipped (use --summary to inspect)",
                summary.skipped.len()
            );
        }
    }
    Ok(summary)
}

fn cmd_pcap_detect(inputs: &[PathBuf], json: bool, pretty: bool) -> Result<(), CliError> {
    let captures = resolve_inputs(inputs)?;
    let mut reports = Vec::with_capacity(captures.len());
    for capture in &captures {
        let report = pingsift_core::scan_pcap_file(capture)
            .with_context(|| format!("Probe sender scan failed: {}", capture.display()))?;
        reports.push((pingsift_core::source_name(capture), report));
    }

    if json {
        let map: BTreeMap<_, _> = reports.into_iter().collect();
        println!("{}", to_json(&map, pretty)?);
    } else {
        for (name, report) in &reports {
            print_sender_report(name, report);
        }
    }
    Ok(())
}

fn print_sender_report(name: &str, report: &SenderReport) {
    println!("== {}", name);
    for sighting in &report.sightings {
        println!(
            "Probe sender {} -> {} (IP ID 0x{:04x}, checksum 0x{:04x}, TTL {})",
            sighting.source_address,
            sighting.destination_address,
            sighting.ip_identification,
            sighting.icmp_checksum,
            sighting.ttl
        );
    }
    println!("Source IP Addresses:");
    println!("{}", join_addresses(&report.sources));
    println!("Destination IP Addresses:");
    println!("{}", join_addresses(&report.destinations));
}

fn join_addresses(addresses: &[std::net::IpAddr]) -> String {
    addresses
        .iter()
        .map(|addr| addr.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

fn to_json<T: serde::Serialize>(value: &T, pretty: bool) -> Result<String, CliError> {
    if pretty {
        serde_json::to_string_pretty(value)
            .context("JSON serialization failed")
            .map_err(Into::into)
    } else {
        serde_json::to_string(value)
            .context("JSON serialization failed")
            .map_err(Into::into)
    }
}

/// Two inputs sharing a file stem would write to the same partition.
fn check_partition_names(captures: &[PathBuf]) -> Result<(), CliError> {
    let mut seen: HashMap<String, &PathBuf> = HashMap::new();
    for capture in captures {
        let name = pingsift_core::source_name(capture);
        if let Some(first) = seen.insert(name.clone(), capture) {
            return Err(CliError::new(
                format!(
                    "inputs '{}' and '{}' share the output name '{}'",
                    first.display(),
                    capture.display(),
                    name
                ),
                Some("rename one capture or decode them into different --out-dir".to_string()),
            ));
        }
    }
    Ok(())
}

fn ensure_distinct(input: &Path, output: &Path) -> Result<(), CliError> {
    let input_abs = fs::canonicalize(input)
        .with_context(|| format!("Failed to resolve input path: {}", input.display()))?;
    let output_abs = output
        .parent()
        .map(|parent| {
            if parent.as_os_str().is_empty() {
                fs::canonicalize(".")
            } else {
                fs::canonicalize(parent)
            }
        })
        .transpose()
        .with_context(|| format!("Failed to resolve output path: {}", output.display()))?
        .zip(output.file_name())
        .map(|(dir, name)| dir.join(name));
    if output_abs.as_deref() == Some(input_abs.as_path()) {
        return Err(CliError::new(
            format!("output path must differ from input: {}", output.display()),
            Some("choose a different --out-dir".to_string()),
        ));
    }
    Ok(())
}

fn resolve_inputs(inputs: &[PathBuf]) -> Result<Vec<PathBuf>, CliError> {
    let mut resolved = Vec::new();
    for input in inputs {
        for path in resolve_input_path(input)? {
            validate_input_file(&path)?;
            if !resolved.contains(&path) {
                resolved.push(path);
            }
        }
    }
    Ok(resolved)
}

fn validate_input_file(input: &Path) -> Result<(), CliError> {
    if !input.exists() {
        return Err(CliError::new(
            format!("input file not found: {}", input.display()),
            Some("use a .pcap or .pcapng file".to_string()),
        ));
    }
    if !input.is_file() {
        return Err(CliError::new(
            format!("input is not a file: {}", input.display()),
            Some("use a .pcap or .pcapng file".to_string()),
        ));
    }
    let ext = input
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();
    if ext != "pcap" && ext != "pcapng" {
        return Err(CliError::new(
            format!("unsupported input format '{}'", input.display()),
            Some("expected a .pcap or .pcapng file".to_string()),
        ));
    }
    Ok(())
}

fn resolve_input_path(input: &Path) -> Result<Vec<PathBuf>, CliError> {
    let pattern = input.to_string_lossy();
    if !is_glob_pattern(&pattern) {
        return Ok(vec![input.to_path_buf()]);
    }

    let mut matches = Vec::new();
    let paths = glob(&pattern).map_err(|err| {
        CliError::new(
            format!("invalid input pattern '{}'", pattern),
            Some(format!("pattern error: {}", err.msg)),
        )
    })?;
    for entry in paths {
        let path = entry.map_err(|err| {
            CliError::new(
                format!("invalid input pattern '{}'", pattern),
                Some(format!("pattern error: {}", err)),
            )
        })?;
        if path.is_file() {
            matches.push(path);
        }
    }

    if matches.is_empty() {
        return Err(CliError::new(
            format!("no files match pattern '{}'", pattern),
            Some("check the path or quote the pattern; expected .pcap or .pcapng".to_string()),
        ));
    }
    Ok(matches)
}

fn is_glob_pattern(input: &str) -> bool {
    input.contains('*') || input.contains('?') || input.contains('[')
}

