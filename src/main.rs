//! Privacy Leak Analyzer command line entry point.

use log::error;
use privacy_leak_analyzer::{
    analyze_packages,
    cli::generate_cli,
    config::global_flag,
    initialize_config, initialize_logger, server,
    utils::print_error,
};
use std::process;

fn main() {
    let cli = generate_cli().get_matches();
    let verbose = global_flag(&cli, "verbose");
    initialize_logger(verbose, global_flag(&cli, "quiet"));

    let config = match initialize_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            print_error(&e, verbose);
            process::exit(1);
        }
    };

    match cli.subcommand_name() {
        Some("analyze") => {
            let failures = analyze_packages(&config);
            if failures > 0 {
                error!(
                    "{} of {} packages could not be analyzed",
                    failures,
                    config.packages().len()
                );
                process::exit(1);
            }
        }
        Some("serve") => {
            if let Err(e) = server::serve(config) {
                print_error(&e, verbose);
                process::exit(1);
            }
        }
        _ => unreachable!("the command line requires a subcommand"),
    }
}
