//! Command line interface definition.
//!
//! This module is also compiled by the build script to generate the shell completion scripts, so
//! it must only depend on `clap`.

use clap::{App, AppSettings, Arg, SubCommand};

/// Generates the command line interface.
pub fn generate_cli() -> App<'static, 'static> {
    App::new("Privacy Leak Analyzer")
        .version(clap::crate_version!())
        .about(
            "Flags dangerous permissions and insecure API usage in Android applications and \
             scores their privacy risk.",
        )
        .setting(AppSettings::SubcommandRequiredElseHelp)
        .setting(AppSettings::VersionlessSubcommands)
        .arg(
            Arg::with_name("verbose")
                .short("v")
                .long("verbose")
                .global(true)
                .conflicts_with("quiet")
                .help("If you'd like the analyzer to tell you every finding it makes"),
        )
        .arg(
            Arg::with_name("quiet")
                .short("q")
                .long("quiet")
                .global(true)
                .help("If you'd like the analyzer to only report warnings and errors"),
        )
        .arg(
            Arg::with_name("config")
                .short("c")
                .long("config")
                .value_name("FILE")
                .takes_value(true)
                .global(true)
                .help("Path to the configuration file to use instead of config.toml"),
        )
        .arg(
            Arg::with_name("reports")
                .long("reports")
                .value_name("FOLDER")
                .takes_value(true)
                .global(true)
                .help("Folder where the JSON reports will be stored"),
        )
        .subcommand(
            SubCommand::with_name("analyze")
                .about("Analyzes the given packages and writes their reports")
                .arg(
                    Arg::with_name("packages")
                        .value_name("APK")
                        .required(true)
                        .multiple(true)
                        .help("The packages to analyze"),
                )
                .arg(
                    Arg::with_name("open")
                        .long("open")
                        .help("Open the reports with the default application once generated"),
                ),
        )
        .subcommand(
            SubCommand::with_name("serve")
                .about("Starts the web form to upload packages and download their reports")
                .arg(
                    Arg::with_name("bind")
                        .long("bind")
                        .value_name("ADDRESS")
                        .takes_value(true)
                        .help("IP address the web server will listen on"),
                )
                .arg(
                    Arg::with_name("port")
                        .short("p")
                        .long("port")
                        .value_name("PORT")
                        .takes_value(true)
                        .help("Port the web server will listen on"),
                )
                .arg(
                    Arg::with_name("threads")
                        .short("t")
                        .long("threads")
                        .value_name("THREADS")
                        .takes_value(true)
                        .help("Number of worker threads for the web server"),
                )
                .arg(
                    Arg::with_name("open")
                        .long("open")
                        .help("Open the upload form in the default browser"),
                ),
        )
}
