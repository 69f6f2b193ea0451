//! anew - append only new lines to a file
//!
//! Main entry point for the command-line application.

use clap::Parser;
use std::io::{self, BufReader};
use std::process;

use anew::cli::Args;
use anew::processor::{Processor, ProcessorConfig};
use anew::progress::{print_error, print_info};

fn main() {
    // Parse command-line arguments
    let args = Args::parse();

    // Set up logging; RUST_LOG still wins when set
    let level = if args.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    // Run the application
    if let Err(e) = run(args) {
        print_error(&format!("{}", e));

        // Print chain of errors
        let mut source = e.source();
        while let Some(err) = source {
            print_error(&format!("  Caused by: {}", err));
            source = err.source();
        }

        process::exit(1);
    }
}

fn run(args: Args) -> anyhow::Result<()> {
    let config = ProcessorConfig::from_args(&args)?;

    if args.verbose {
        print_config(&config);
    }

    let stdin = io::stdin();
    let input = BufReader::with_capacity(config.buffer_size, stdin.lock());

    let processor = Processor::new(config);
    let result = processor.process(input, io::stdout());

    if args.stats {
        processor.stats().print_summary();
    }

    result?;
    Ok(())
}

/// Print configuration summary
fn print_config(config: &ProcessorConfig) {
    match config.backing_file {
        Some(ref path) => print_info(&format!("File:         {:?}", path)),
        None => print_info("File:         (none)"),
    }
    print_info(&format!("Quiet:        {}", config.quiet));
    print_info(&format!("Dry run:      {}", config.dry_run));
    print_info(&format!("Trim:         {}", config.trim));
    print_info(&format!("Workers:      {}", config.workers.max(1)));
    print_info(&format!("Queue size:   {}", config.queue_size.max(1)));
    print_info(&format!("Buffer size:  {} KB", config.buffer_size / 1024));
    print_info(&format!("Max line:     {} KB", config.max_line_length / 1024));
}
