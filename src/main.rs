use anyhow::Result;
use aspectsort::aspectsort_core::{Cli, FileProber, SortSummary, Sorter, ffprobe_available};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use simplelog::{CombinedLogger, Config, LevelFilter, SharedLogger, TermLogger, WriteLogger};
use std::fs::File;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize loggers
    let mut loggers: Vec<Box<dyn SharedLogger>> = vec![TermLogger::new(
        LevelFilter::Warn,
        Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )];

    if cli.log {
        loggers.push(WriteLogger::new(
            cli.log_level,
            Config::default(),
            File::create("aspectsort.log")?,
        ));
    }

    CombinedLogger::init(loggers)?;

    if !ffprobe_available() {
        log::warn!("ffprobe not found on PATH, videos will be reported as unreadable");
    }

    let sorter = Sorter::new(&cli.source_dir, cli.sort_options())?;
    let prober = FileProber::new();
    let run = sorter.run(&prober)?;

    let bar = if cli.quiet {
        ProgressBar::hidden()
    } else {
        let bar_style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}")?;
        ProgressBar::new(run.total() as u64).with_style(bar_style)
    };
    bar.set_message("Sorting files");

    let mut summary = SortSummary::default();
    for outcome in run {
        summary.record(&outcome);
        if !cli.quiet {
            // A bar with no terminal to draw on swallows println.
            if bar.is_hidden() {
                println!("{}", outcome);
            } else {
                bar.println(outcome.to_string());
            }
        }
        bar.inc(1);
    }
    bar.finish_with_message("Sort complete");

    if cli.dry_run {
        println!("\n[DRY RUN] Would move {} files", summary.planned);
    } else {
        println!("\nSort complete!");
        println!("  {} portrait", summary.moved_portrait);
        println!("  {} landscape", summary.moved_landscape);
    }
    println!("  {} skipped", summary.skipped());
    if summary.failed > 0 {
        println!("  {} failed", summary.failed);
    }

    Ok(())
}
