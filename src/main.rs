//! Loads a shared object from memory and calls one of its exports.
//!
//! Exit codes: 1 for usage or image-read errors, 2 when the module cannot be
//! loaded, 3 when the export cannot be resolved.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use memfd_loader::settings::{DEFAULT_EXPECTED, DEFAULT_SYMBOL};
use memfd_loader::{
    error_reporting, LoadReport, ModuleImage, Session, Settings, StrategyPreference,
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Shared object to read into memory and load
    module: PathBuf,

    /// Name for the backing memory resource. Defaults to a time-based name
    resource_name: Option<String>,

    /// Exported function to call. Must take no arguments and return an int
    #[arg(short, long, env = "MEMFD_LOADER_SYMBOL", default_value = DEFAULT_SYMBOL)]
    symbol: String,

    /// Value the export is expected to return
    #[arg(
        short,
        long,
        env = "MEMFD_LOADER_EXPECT",
        default_value_t = DEFAULT_EXPECTED,
        allow_negative_numbers = true
    )]
    expect: i32,

    /// Do not compare the returned value against --expect
    #[arg(long)]
    no_expect: bool,

    /// How to pick the memory-backed file primitive
    #[arg(long, value_enum, env = "MEMFD_LOADER_STRATEGY", default_value_t = StrategyPreference::Auto)]
    strategy: StrategyPreference,

    /// Print the result as a single JSON object
    #[arg(long)]
    json: bool,
}

impl Args {
    fn settings(&self) -> Settings {
        Settings {
            strategy: self.strategy,
            symbol: self.symbol.clone(),
            expected: (!self.no_expect).then_some(self.expect),
            resource_name: self.resource_name.clone(),
        }
    }
}

fn print_report(report: &LoadReport, json: bool) {
    if json {
        match serde_json::to_string(report) {
            Ok(line) => println!("{}", line),
            Err(e) => log::error!("failed to serialize report: {}", e),
        }
    } else {
        println!("{} returned {}", report.symbol, report.value);
    }

    if let Some(mismatch) = report.mismatch() {
        eprintln!("warning: {}", mismatch);
    }
}

fn main() -> ExitCode {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                ExitCode::from(1)
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let _guard = error_reporting::setup_sentry();

    let settings = args.settings();
    let result = ModuleImage::from_file(&args.module)
        .and_then(|image| Session::load(&image, &settings))
        .and_then(|session| {
            // Reported before resolving, so a missing export still shows the load succeeded.
            if !args.json {
                println!(
                    "Shared object loaded from memory via {}",
                    session.backing_path().display()
                );
            }
            session.invoke(&settings)
        });

    match result {
        Ok(report) => {
            print_report(&report, args.json);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{}", e);
            error_reporting::capture(&e);
            ExitCode::from(e.exit_code() as u8)
        }
    }
}
