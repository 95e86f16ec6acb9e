use std::net::TcpListener;
use std::sync::Arc;

use actix_web::{
    dev::Server,
    web::{self, Data},
    App, HttpServer,
};
use tracing::info;
use tracing_actix_web::TracingLogger;

use crate::{
    adapters::command_annotator::CommandAnnotator,
    configuration::Settings,
    ports::drawing_annotator::DrawingAnnotator,
    repositories::{
        job_registry::JobRegistry,
        results_storage::{ResultsStorage, ResultsStorageError},
    },
    routes::{
        download_results::download_results,
        health_check,
        index::{client_script, index},
        job_status::job_status,
        upload_drawing::upload_drawing,
    },
};

/// Holds the newly built server, and some useful properties
pub struct Application {
    server: Server,
    port: u16,

    // Used for integration tests
    job_registry: JobRegistry,
    results_storage: ResultsStorage,
}

#[derive(thiserror::Error, Debug)]
pub enum ApplicationBuildError {
    #[error(transparent)]
    StorageError(#[from] ResultsStorageError),
    #[error(transparent)]
    IOError(#[from] std::io::Error),
}

impl Application {
    /// # Parameters
    /// - nb_workers: number of actix-web workers
    ///   if `None`, the number of available physical CPUs is used as the worker count.
    #[tracing::instrument(name = "Building application")]
    pub async fn build(
        settings: Settings,
        nb_workers: Option<usize>,
    ) -> Result<Self, ApplicationBuildError> {
        let address = format!(
            "{}:{}",
            settings.application.host, settings.application.port
        );
        let listener = TcpListener::bind(address)?;
        let port = listener.local_addr()?.port();

        let results_storage = ResultsStorage::new(&settings.storage);
        results_storage.ensure_directories().await?;

        let job_registry = JobRegistry::new();

        let annotator: Arc<dyn DrawingAnnotator> =
            Arc::new(CommandAnnotator::new(&settings.annotator));

        let server = run(
            listener,
            settings,
            nb_workers,
            job_registry.clone(),
            results_storage.clone(),
            annotator,
        )?;

        Ok(Self {
            server,
            port,
            job_registry,
            results_storage,
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn job_registry(&self) -> JobRegistry {
        self.job_registry.clone()
    }

    pub fn results_storage(&self) -> ResultsStorage {
        self.results_storage.clone()
    }

    /// This function only returns when the application is stopped
    pub async fn run_until_stopped(self) -> Result<(), std::io::Error> {
        info!("Running server ...");
        self.server.await
    }
}

/// listener: the consumer binds their own port
///
/// TracingLogger middleware: helps collecting telemetry data.
/// It generates a unique identifier for each incoming request: `request_id`.
///
/// # Parameters
/// - nb_workers: number of actix-web workers
///   if `None`, the number of available physical CPUs is used as the worker count.
pub fn run(
    listener: TcpListener,
    settings: Settings,
    nb_workers: Option<usize>,
    job_registry: JobRegistry,
    results_storage: ResultsStorage,
    annotator: Arc<dyn DrawingAnnotator>,
) -> Result<Server, std::io::Error> {
    // Wraps the shared state in `actix_web::Data` (`Arc`) to be able to
    // register it and access it from handlers, shared among all workers
    let job_registry = Data::new(job_registry);
    let results_storage = Data::new(results_storage);
    let annotator: Data<dyn DrawingAnnotator> = Data::from(annotator);

    // The framework-level cap is looser than the validator's limit so an
    // oversized upload gets the validator's message, not a broken stream
    let multipart_config = actix_multipart::form::MultipartFormConfig::default()
        .total_limit((settings.storage.max_upload_size_bytes + 1024 * 1024) as usize)
        .memory_limit(2 * 1024 * 1024);

    // `move` to capture variables from the surrounding environment
    let server = HttpServer::new(move || {
        info!("Starting actix-web worker");

        App::new()
            .wrap(TracingLogger::default())
            .route("/health_check", web::get().to(health_check))
            .route("/", web::get().to(index))
            .route("/static/main.js", web::get().to(client_script))
            .route("/upload", web::post().to(upload_drawing))
            .route("/status/{job_id}", web::get().to(job_status))
            .route("/download/{job_id}", web::get().to(download_results))
            .app_data(multipart_config.clone())
            .app_data(job_registry.clone())
            .app_data(results_storage.clone())
            .app_data(annotator.clone())
    })
    .listen(listener)?;

    // If no workers were set, use the actix-web settings (number of workers = number of physical CPUs)
    if let Some(nb_workers) = nb_workers {
        return Ok(server.workers(nb_workers).run());
    }

    // No await
    Ok(server.run())
}
