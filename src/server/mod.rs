//! Web server module.
//!
//! Serves the upload form, analyzes the uploaded packages and offers their reports for download.

mod upload;

pub use self::upload::{has_apk_extension, Upload, UPLOAD_FIELD};

use crate::{
    analyze_package,
    config::Config,
    error::ErrorKind,
    results::{report::handlebars::Templates, report_path},
    utils::print_warning,
};
use anyhow::{Context, Result};
use log::{info, warn};
use std::{convert::Infallible, fs, sync::Arc};
use warp::{
    http::StatusCode,
    multipart::FormData,
    reply::{self, Response},
    Filter, Rejection, Reply,
};

/// State shared by every request.
pub struct State {
    config: Config,
    templates: Templates,
}

impl State {
    /// Creates the state of the server, loading the templates of the configuration.
    pub fn new(config: Config) -> Result<Self> {
        let templates = Templates::from_path(config.templates_folder()).with_context(|| {
            format!(
                "could not load the templates in {}",
                config.templates_folder().display()
            )
        })?;

        Ok(Self { config, templates })
    }

    /// Gets the configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }
}

/// Creates the routes of the web server.
pub fn routes(state: Arc<State>) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    let max_upload_size = state.config().max_upload_size();
    let state_filter = warp::any().map(move || Arc::clone(&state));

    let index = warp::path::end()
        .and(warp::get())
        .and(state_filter.clone())
        .and_then(index_handler);

    let analyze = warp::path!("analyze")
        .and(warp::post())
        .and(warp::multipart::form().max_length(max_upload_size))
        .and(state_filter.clone())
        .and_then(analyze_handler);

    let download = warp::path!("reports" / String)
        .and(warp::get())
        .and(state_filter)
        .and_then(download_handler);

    index
        .or(analyze)
        .or(download)
        .with(warp::log("privacy_leak_analyzer::server"))
}

/// Starts the web server with the given configuration, until `Ctrl+C` is pressed.
pub fn serve(config: Config) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(config.threads())
        .enable_all()
        .build()
        .context("could not start the server runtime")?;

    runtime.block_on(run(config))
}

async fn run(config: Config) -> Result<()> {
    for folder in &[config.uploads_folder(), config.reports_folder()] {
        fs::create_dir_all(folder)
            .with_context(|| format!("could not create the {} folder", folder.display()))?;
    }

    let open = config.is_open();
    let state = Arc::new(State::new(config)?);
    let (address, server) = warp::serve(routes(Arc::clone(&state)))
        .try_bind_with_graceful_shutdown(state.config().socket_addr(), async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                print_warning(format!("could not listen for the shutdown signal: {}", e));
            }
        })
        .with_context(|| format!("could not listen on {}", state.config().socket_addr()))?;

    let url = format!("http://{}/", address);
    info!("Upload form available at {}", url);
    if open {
        if let Err(e) = open::that(&url) {
            print_warning(format!("could not open {}: {}", url, e));
        }
    }

    server.await;
    info!("Server stopped");

    Ok(())
}

/// Renders the upload form with the given status and error message.
fn index_page(state: &State, status: StatusCode, error: Option<&str>) -> Response {
    match state.templates.render_index(error) {
        Ok(html) => reply::with_status(reply::html(html), status).into_response(),
        Err(e) => internal_error(&e),
    }
}

fn internal_error(error: &anyhow::Error) -> Response {
    warn!("{:#}", error);
    reply::with_status("Internal server error", StatusCode::INTERNAL_SERVER_ERROR).into_response()
}

async fn index_handler(state: Arc<State>) -> Result<Response, Infallible> {
    Ok(index_page(&state, StatusCode::OK, None))
}

async fn analyze_handler(form: FormData, state: Arc<State>) -> Result<Response, Infallible> {
    let upload = match Upload::receive(form, state.config().uploads_folder()).await {
        Ok(upload) => upload,
        Err(e) => {
            return Ok(match e.downcast_ref::<ErrorKind>() {
                Some(ErrorKind::InvalidUpload { .. }) => index_page(
                    &state,
                    StatusCode::BAD_REQUEST,
                    Some(&format!("Error analyzing APK: {}", e)),
                ),
                _ => internal_error(&e),
            });
        }
    };
    info!("Analyzing the uploaded {}", upload.file_name());

    let path = upload.path().to_path_buf();
    let worker_state = Arc::clone(&state);
    let analysis =
        tokio::task::spawn_blocking(move || analyze_package(&path, worker_state.config())).await;
    // The uploaded package is removed whatever the outcome.
    drop(upload);

    let response = match analysis {
        Ok(Ok((results, _))) => match state.templates.render_report(&results) {
            Ok(html) => reply::html(html).into_response(),
            Err(e) => internal_error(&e),
        },
        Ok(Err(e)) => {
            warn!("{:#}", e);
            index_page(
                &state,
                StatusCode::UNPROCESSABLE_ENTITY,
                Some(&format!("Error analyzing APK: {}", e.root_cause())),
            )
        }
        Err(e) => internal_error(&anyhow::Error::new(e).context("the analysis was interrupted")),
    };

    Ok(response)
}

async fn download_handler(file_name: String, state: Arc<State>) -> Result<Response, Infallible> {
    let not_found = || reply::with_status("Report not found", StatusCode::NOT_FOUND).into_response();

    let package = match file_name.strip_suffix(".json") {
        Some(package) => package,
        None => return Ok(not_found()),
    };
    let path = match report_path(state.config().reports_folder(), package) {
        Some(path) => path,
        None => return Ok(not_found()),
    };

    match tokio::fs::read(&path).await {
        Ok(json) => {
            let reply = reply::with_header(json, "content-type", "application/json");
            let reply = reply::with_header(
                reply,
                "content-disposition",
                format!("attachment; filename=\"{}_report.json\"", package),
            );
            Ok(reply.into_response())
        }
        Err(ref e) if e.kind() == std::io::ErrorKind::NotFound => Ok(not_found()),
        Err(e) => Ok(internal_error(
            &anyhow::Error::new(e).context(format!("could not read {}", path.display())),
        )),
    }
}
