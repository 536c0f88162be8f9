//! Configuration module.
//!
//! Handles and configures the initial settings and variables needed to run the program.
//!
//! The configuration is first created with its default values, then overridden by the
//! `config.toml` file and finally by the command line arguments.

use crate::{error::ErrorKind, utils::print_warning};
use anyhow::{Context, Result};
use clap::ArgMatches;
use std::{
    fs,
    net::{IpAddr, Ipv4Addr, SocketAddr},
    path::{Path, PathBuf},
    str::FromStr,
};
use toml::Value;

/// Largest number of worker threads of the web server.
const MAX_THREADS: i64 = u8::MAX as i64;
/// Default port of the web server.
const DEFAULT_PORT: u16 = 8501;
/// Default maximum size of an uploaded package, in bytes (200 MiB).
const DEFAULT_MAX_UPLOAD_SIZE: u64 = 200 * 1024 * 1024;

/// Config structure.
///
/// Contains configuration related fields. It is used for storing the configuration parameters and
/// checking their values. Implements the `Default` trait.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Folder where the uploaded packages are stored while analyzed.
    uploads_folder: PathBuf,
    /// Folder where the JSON reports are written.
    reports_folder: PathBuf,
    /// Folder with the handlebars templates of the web pages.
    templates_folder: PathBuf,
    /// Address the web server listens on.
    bind_address: IpAddr,
    /// Port the web server listens on.
    port: u16,
    /// Number of worker threads of the web server.
    threads: usize,
    /// Largest accepted upload, in bytes.
    max_upload_size: u64,
    /// Boolean to represent `--verbose` mode.
    verbose: bool,
    /// Boolean to represent `--quiet` mode.
    quiet: bool,
    /// Boolean to represent `--open` mode.
    open: bool,
    /// Packages to analyze from the command line.
    packages: Vec<PathBuf>,
    /// Configuration files that were loaded.
    loaded_files: Vec<PathBuf>,
}

/// Checks if a flag is present, either before or after the subcommand.
pub fn global_flag(cli: &ArgMatches<'_>, name: &str) -> bool {
    cli.is_present(name)
        || cli
            .subcommand()
            .1
            .map_or(false, |sub_cli| sub_cli.is_present(name))
}

/// Gets the value of an option, either given before or after the subcommand.
fn global_value<'a>(cli: &'a ArgMatches<'_>, name: &str) -> Option<&'a str> {
    cli.subcommand()
        .1
        .and_then(|sub_cli| sub_cli.value_of(name))
        .or_else(|| cli.value_of(name))
}

impl Config {
    /// Creates a new `Config` struct from the given configuration file.
    pub fn from_file<P: AsRef<Path>>(config_path: P) -> Result<Self> {
        let config_path = config_path.as_ref();
        let mut config = Self::default();
        config.load_from_file(config_path)?;
        config.loaded_files.push(config_path.to_path_buf());

        Ok(config)
    }

    /// Modifies the options from the CLI.
    pub fn decorate_with_cli(&mut self, cli: &ArgMatches<'_>) -> Result<()> {
        self.verbose = global_flag(cli, "verbose");
        self.quiet = global_flag(cli, "quiet");

        if let Some(reports) = global_value(cli, "reports") {
            self.reports_folder = PathBuf::from(reports);
        }

        match cli.subcommand() {
            ("analyze", Some(sub_cli)) => {
                self.open = sub_cli.is_present("open");
                self.packages = sub_cli
                    .values_of("packages")
                    .map(|packages| packages.map(PathBuf::from).collect())
                    .unwrap_or_default();
            }
            ("serve", Some(sub_cli)) => {
                self.open = sub_cli.is_present("open");

                if let Some(bind) = sub_cli.value_of("bind") {
                    self.bind_address = IpAddr::from_str(bind).map_err(|e| ErrorKind::Config {
                        message: format!("invalid bind address `{}`: {}", bind, e),
                    })?;
                }
                if let Some(port) = sub_cli.value_of("port") {
                    self.port = port.parse::<u16>().map_err(|e| ErrorKind::Config {
                        message: format!("invalid port `{}`: {}", port, e),
                    })?;
                }
                if let Some(threads) = sub_cli.value_of("threads") {
                    match threads.parse::<usize>() {
                        Ok(t) if t > 0 && t <= MAX_THREADS as usize => self.threads = t,
                        _ => {
                            return Err(ErrorKind::Config {
                                message: format!(
                                    "the number of threads must be between 1 and {}",
                                    MAX_THREADS
                                ),
                            }
                            .into());
                        }
                    }
                }
            }
            _ => {}
        }

        Ok(())
    }

    /// Returns the folder where the uploaded packages are stored.
    pub fn uploads_folder(&self) -> &Path {
        &self.uploads_folder
    }

    /// Returns the folder where the reports are stored.
    pub fn reports_folder(&self) -> &Path {
        &self.reports_folder
    }

    /// Returns the folder with the handlebars templates.
    pub fn templates_folder(&self) -> &Path {
        &self.templates_folder
    }

    /// Returns the address the web server listens on.
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_address, self.port)
    }

    /// Returns the `threads` field.
    pub fn threads(&self) -> usize {
        self.threads
    }

    /// Returns the largest accepted upload, in bytes.
    pub fn max_upload_size(&self) -> u64 {
        self.max_upload_size
    }

    /// Returns true if the application is running in `--verbose` mode, false otherwise.
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    /// Returns true if the application is running in `--quiet` mode, false otherwise.
    pub fn is_quiet(&self) -> bool {
        self.quiet
    }

    /// Returns true if the application has to open the results, false otherwise.
    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Returns the packages to analyze.
    pub fn packages(&self) -> &[PathBuf] {
        &self.packages
    }

    /// Returns the loaded configuration files.
    pub fn loaded_config_files(&self) -> impl Iterator<Item = &Path> {
        self.loaded_files.iter().map(PathBuf::as_path)
    }

    /// Loads a configuration file into the `Config` struct.
    fn load_from_file(&mut self, config_path: &Path) -> Result<()> {
        let cfg_str = fs::read_to_string(config_path)
            .with_context(|| format!("could not read {}", config_path.display()))?;
        let toml: Value = toml::from_str(&cfg_str).map_err(|e| ErrorKind::Config {
            message: format!("{} is not a valid TOML file: {}", config_path.display(), e),
        })?;

        let table = match toml {
            Value::Table(table) => table,
            _ => {
                print_warning(format!(
                    "{} does not contain a table of options. Using default configuration",
                    config_path.display()
                ));
                return Ok(());
            }
        };

        for (key, value) in table {
            match key.as_str() {
                "uploads_folder" => self.load_folder(&key, value),
                "reports_folder" => self.load_folder(&key, value),
                "templates_folder" => self.load_folder(&key, value),
                "bind_address" => self.load_bind_address(value),
                "port" => self.load_port(value),
                "threads" => self.load_threads(value),
                "max_upload_size" => self.load_max_upload_size(value),
                _ => print_warning(format!("unknown configuration option `{}`", key)),
            }
        }

        Ok(())
    }

    /// Loads one of the folder options.
    fn load_folder(&mut self, key: &str, value: Value) {
        let folder = match value {
            Value::String(s) => PathBuf::from(s),
            _ => {
                print_warning(format!(
                    "the `{}` option in config.toml should be a string. Using default",
                    key
                ));
                return;
            }
        };

        match key {
            "uploads_folder" => self.uploads_folder = folder,
            "reports_folder" => self.reports_folder = folder,
            "templates_folder" => self.templates_folder = folder,
            _ => unreachable!(),
        }
    }

    /// Loads the bind address option.
    fn load_bind_address(&mut self, value: Value) {
        match value.as_str().map(IpAddr::from_str) {
            Some(Ok(address)) => self.bind_address = address,
            _ => print_warning(
                "the `bind_address` option in config.toml should be an IP address. Using default",
            ),
        }
    }

    /// Loads the port option.
    fn load_port(&mut self, value: Value) {
        match value {
            Value::Integer(p) if p > 0 && p <= i64::from(u16::MAX) => self.port = p as u16,
            _ => print_warning(format!(
                "the `port` option in config.toml should be an integer between 1 and {}. Using \
                 default",
                u16::MAX
            )),
        }
    }

    /// Loads the threads option.
    fn load_threads(&mut self, value: Value) {
        match value {
            Value::Integer(t) if t > 0 && t <= MAX_THREADS => self.threads = t as usize,
            _ => print_warning(format!(
                "the `threads` option in config.toml should be an integer between 1 and {}. \
                 Using default",
                MAX_THREADS
            )),
        }
    }

    /// Loads the maximum upload size option.
    fn load_max_upload_size(&mut self, value: Value) {
        match value {
            Value::Integer(s) if s > 0 => self.max_upload_size = s as u64,
            _ => print_warning(
                "the `max_upload_size` option in config.toml should be a positive integer. \
                 Using default",
            ),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            uploads_folder: PathBuf::from("uploads"),
            reports_folder: PathBuf::from("reports"),
            templates_folder: PathBuf::from("templates"),
            bind_address: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: DEFAULT_PORT,
            threads: num_cpus::get().max(1).min(MAX_THREADS as usize),
            max_upload_size: DEFAULT_MAX_UPLOAD_SIZE,
            verbose: false,
            quiet: false,
            open: false,
            packages: Vec::new(),
            loaded_files: Vec::new(),
        }
    }
}
