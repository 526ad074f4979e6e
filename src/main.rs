use clap::Parser;
use log::{error, info};
use std::panic::{self, PanicHookInfo};
use tokio::io::BufReader;

use ruuvitag_collector::LineSink;
use ruuvitag_collector::app::{Options, run_with_io};

/// Exit codes for the application
const EXIT_SUCCESS: i32 = 0;
const EXIT_ERROR: i32 = 1;
const EXIT_PANIC: i32 = 2;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Set up panic hook to ensure clean exit codes for process managers
    // (e.g., systemd, Telegraf execd) that monitor exit status
    panic::set_hook(Box::new(move |info: &PanicHookInfo| {
        eprintln!("Panic! {}", info);
        std::process::exit(EXIT_PANIC);
    }));

    let options = Options::parse();

    let level = if options.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();

    let formatter = options.formatter();
    let mut sink = LineSink::new(&formatter, std::io::stdout().lock());
    let input = BufReader::new(tokio::io::stdin());

    info!("Reading hcidump output from stdin");
    match run_with_io(&options, input, &mut sink).await {
        Ok(summary) if summary.healthy => {
            info!("Clean exit, {} readings saved", summary.saved);
            std::process::exit(EXIT_SUCCESS)
        }
        Ok(summary) => {
            info!("Unclean exit, {} readings saved", summary.saved);
            std::process::exit(EXIT_ERROR)
        }
        Err(why) => {
            error!("{}", why);
            std::process::exit(EXIT_ERROR);
        }
    }
}
