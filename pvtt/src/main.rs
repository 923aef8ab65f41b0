#![doc = include_str!("../README.md")]
#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

mod args;
mod nist;
mod results;
mod x509test;

use std::path::Path;
use std::process::ExitCode;

use clap::Parser;
use log::{debug, error, LevelFilter};
use log4rs::append::console::ConsoleAppender;
use log4rs::config::{Appender, Config, Root};
use log4rs::encode::pattern::PatternEncoder;

use certpath::{read_restrictions, PkiEnvironment, Restrictions};

use crate::args::PvttArgs;
use crate::nist::run_nist;
use crate::results::{read_results, Stats};
use crate::x509test::run_x509test;

const DEFAULT_RESULTS_FILENAME: &str = "expected.txt";

fn configure_logging(args: &PvttArgs) {
    let mut logging_configured = false;

    if let Some(logging_config) = &args.logging_config {
        if let Err(e) = log4rs::init_file(logging_config, Default::default()) {
            println!(
                "ERROR: failed to configure logging using {} with {:?}. Continuing without logging.",
                logging_config, e
            );
        } else {
            logging_configured = true;
        }
    }

    if !logging_configured {
        // if there's no config, prepare one using stdout
        let stdout = ConsoleAppender::builder()
            .encoder(Box::new(PatternEncoder::new("{m}{n}")))
            .build();
        match Config::builder()
            .appender(Appender::builder().build("stdout", Box::new(stdout)))
            .build(Root::builder().appender("stdout").build(LevelFilter::Info))
        {
            Ok(config) => {
                let handle = log4rs::init_config(config);
                if let Err(e) = handle {
                    println!(
                        "ERROR: failed to configure logging for stdout with {:?}. Continuing without logging.",
                        e
                    );
                }
            }
            Err(e) => {
                println!(
                    "ERROR: failed to prepare default logging configuration with {:?}. Continuing without logging",
                    e
                );
            }
        }
    }
}

fn restrictions_from_args(args: &PvttArgs) -> certpath::Result<Restrictions> {
    let mut restrictions = read_restrictions(args.settings.as_deref())?;
    restrictions.time_of_interest = args.time_of_interest;
    Ok(restrictions)
}

/// Point of entry for PVTT application.
fn main() -> ExitCode {
    let args = PvttArgs::parse();
    configure_logging(&args);
    debug!("PVTT start");

    let restrictions = match restrictions_from_args(&args) {
        Ok(r) => r,
        Err(e) => {
            error!("Failed to read settings: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let mut pe = PkiEnvironment::default();
    pe.populate_default();

    let folder = match (&args.nist_folder, &args.x509test_folder) {
        (Some(f), _) | (None, Some(f)) => f.as_str(),
        (None, None) => {
            error!("Either --nist-folder or --x509test-folder must be provided");
            return ExitCode::FAILURE;
        }
    };
    let results_file = match &args.results {
        Some(r) => r.clone(),
        None => Path::new(folder)
            .join(DEFAULT_RESULTS_FILENAME)
            .to_string_lossy()
            .to_string(),
    };
    let expected = match read_results(&results_file) {
        Ok(expected) => expected,
        Err(e) => {
            error!("Failed to read results from {}: {}", results_file, e);
            return ExitCode::FAILURE;
        }
    };

    let mut stats = Stats::default();
    if args.nist_folder.is_some() {
        run_nist(&pe, &restrictions, folder, &expected, &mut stats);
    } else if let Err(e) = run_x509test(&pe, &restrictions, folder, &expected, &mut stats) {
        error!("Failed to run cases in {}: {}", folder, e);
        return ExitCode::FAILURE;
    }

    println!("{}", stats.summary());
    debug!("PVTT end");
    if stats.failed > 0 {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
