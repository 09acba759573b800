//! CLI entry point for the Vectorbeam BIOS tracer binary.

use std::env;
use std::ffi::OsString;
use std::fs;
use std::path::PathBuf;

use tracer::session::{render_frame_table, trace_bios, StopReason, TraceConfig};
use vectorbeam_core::UnmappedPolicy;
#[cfg(test)]
use tempfile as _;

const USAGE_TEXT: &str = "\
Usage: vectorbeam-trace <bios.bin> [options]

Options:
  --limit <N>      Maximum instruction steps (default: 100000)
  --trace <N>      Disassemble the first N instructions (default: 0)
  --policy <P>     Unmapped-access policy: ignore, log-once, fatal
                   (default: log-once)
  -h, --help       Show this help message

Examples:
  vectorbeam-trace bios.bin
  vectorbeam-trace bios.bin --trace 20 --policy fatal
";

#[derive(Debug, PartialEq, Eq)]
struct Args {
    input: PathBuf,
    limit: u64,
    trace: u64,
    policy: UnmappedPolicy,
}

#[derive(Debug)]
enum ParseResult {
    Args(Args),
    Help,
}

fn parse_policy(value: &str) -> Result<UnmappedPolicy, String> {
    match value {
        "ignore" => Ok(UnmappedPolicy::Ignore),
        "log-once" => Ok(UnmappedPolicy::LogOnce),
        "fatal" => Ok(UnmappedPolicy::Fatal),
        other => Err(format!("unknown policy: {other}")),
    }
}

fn parse_number(option: &str, value: &OsString) -> Result<u64, String> {
    value
        .to_string_lossy()
        .parse()
        .map_err(|_| format!("invalid value for {option}: {}", value.to_string_lossy()))
}

#[allow(clippy::while_let_on_iterator)]
fn parse_args(mut args: impl Iterator<Item = OsString>) -> Result<ParseResult, String> {
    let mut input: Option<PathBuf> = None;
    let mut limit = 100_000u64;
    let mut trace = 0u64;
    let mut policy = UnmappedPolicy::LogOnce;

    while let Some(arg) = args.next() {
        if arg == "--help" || arg == "-h" {
            return Ok(ParseResult::Help);
        }

        if arg == "--limit" {
            let value = args
                .next()
                .ok_or_else(|| "missing value for --limit".to_string())?;
            limit = parse_number("--limit", &value)?;
            continue;
        }

        if arg == "--trace" {
            let value = args
                .next()
                .ok_or_else(|| "missing value for --trace".to_string())?;
            trace = parse_number("--trace", &value)?;
            continue;
        }

        if arg == "--policy" {
            let value = args
                .next()
                .ok_or_else(|| "missing value for --policy".to_string())?;
            policy = parse_policy(&value.to_string_lossy())?;
            continue;
        }

        if arg.to_string_lossy().starts_with('-') {
            return Err(format!("unknown option: {}", arg.to_string_lossy()));
        }

        if input.is_some() {
            return Err("multiple input paths provided".to_string());
        }
        input = Some(PathBuf::from(arg));
    }

    let input = input.ok_or_else(|| "missing BIOS image path".to_string())?;
    Ok(ParseResult::Args(Args {
        input,
        limit,
        trace,
        policy,
    }))
}

fn run(args: &Args) -> Result<(), i32> {
    let image = fs::read(&args.input).map_err(|e| {
        eprintln!("error: failed to read {}: {e}", args.input.display());
        1
    })?;

    let config = TraceConfig {
        step_limit: args.limit,
        trace_instructions: args.trace,
        policy: args.policy,
    };
    let report = trace_bios(&image, &config).map_err(|e| {
        eprintln!("error: {e}");
        3
    })?;

    for line in &report.instruction_trace {
        println!("{line}");
    }

    println!(
        "Traced {} steps ({} cycles) from {}",
        report.steps,
        report.cycles,
        args.input.display()
    );
    match &report.stop {
        StopReason::Drained => println!("Call stack drained."),
        StopReason::StepLimit => println!("Step limit reached."),
        StopReason::Fault(fault) => println!("Core fault: {fault}"),
    }

    if report.deepest_frames.is_empty() {
        println!("No calls captured.");
    } else {
        println!("Deepest call stack:");
        print!("{}", render_frame_table(&report.deepest_frames));
    }

    for addr in &report.unmapped_addresses {
        eprintln!("unmapped access: {addr:04X}");
    }

    // A fault during stepping is a reportable result, not a crash, but
    // it still fails the invocation.
    if matches!(report.stop, StopReason::Fault(_)) {
        return Err(3);
    }
    Ok(())
}

fn main() {
    let exit_code = match parse_args(env::args_os().skip(1)) {
        Ok(ParseResult::Help) => {
            print!("{USAGE_TEXT}");
            0
        }
        Ok(ParseResult::Args(args)) => match run(&args) {
            Ok(()) => 0,
            Err(code) => code,
        },
        Err(message) => {
            eprintln!("error: {message}");
            eprint!("{USAGE_TEXT}");
            2
        }
    };

    std::process::exit(exit_code);
}
