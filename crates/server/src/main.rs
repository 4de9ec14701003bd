mod config;
mod error;
mod provision;
mod routes;

use std::process;
use std::sync::Arc;

use chrono::Utc;
use clap::Parser;
use facemood_core::access::domain::access_controller::AccessController;
use facemood_core::access::domain::trusted_origins::TrustedOrigins;
use facemood_core::access::infrastructure::sqlite_account_store::SqliteAccountStore;
use facemood_core::classification::infrastructure::onnx_emotion_classifier::OnnxEmotionClassifier;
use facemood_core::detection::infrastructure::onnx_blazeface_detector::OnnxBlazefaceDetector;
use facemood_core::pipeline::infer_emotions_use_case::InferEmotionsUseCase;
use facemood_core::shared::constants::{DETECTOR_MODEL_NAME, EMOTION_MODEL_NAME};
use facemood_core::shared::model_resolver;

use crate::config::{AddAccountArgs, Cli, Command, ServeArgs};
use crate::routes::{router, AppState};

#[tokio::main]
async fn main() {
    env_logger::init();

    if let Err(e) = run().await {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let ignored = cli.database.ignored_settings();
    if !ignored.is_empty() {
        log::warn!(
            "Ignoring {} (the SQLite account store only uses DB_NAME)",
            ignored.join(", ")
        );
    }
    let store = SqliteAccountStore::new(&cli.database.db_name);

    match cli.command {
        Some(Command::AddAccount(args)) => run_add_account(&store, &args),
        Some(Command::Serve) | None => serve(store, cli.serve).await,
    }
}

fn run_add_account(
    store: &SqliteAccountStore,
    args: &AddAccountArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let account = provision::add_account(store, args, Utc::now())?;
    match account.trial_metadata {
        Some(meta) => eprintln!(
            "Saved account {} (trial from {})",
            account.username, meta.purchase_timestamp
        ),
        None => eprintln!("Saved account {}", account.username),
    }
    Ok(())
}

async fn serve(store: SqliteAccountStore, args: ServeArgs) -> Result<(), Box<dyn std::error::Error>> {
    if let Err(e) = store.ensure_schema() {
        log::warn!("Account store not ready at {}: {e}", store.path().display());
    }

    let origins = TrustedOrigins::new(&args.trusted_origins);
    if origins.is_empty() {
        log::info!("No trusted origins configured");
    }
    let access = AccessController::new(origins, Arc::new(store));

    let pipeline = match build_pipeline(&args) {
        Ok(pipeline) => Some(Arc::new(pipeline)),
        Err(e) if args.strict_health_check => {
            log::error!("Inference pipeline unavailable: {e}");
            None
        }
        Err(e) => return Err(e),
    };

    let state = AppState {
        access: Arc::new(access),
        pipeline,
        strict_health_check: args.strict_health_check,
        auth_timeout: args.auth_timeout(),
        inference_timeout: args.inference_timeout(),
        body_limit: args.body_limit,
    };
    let app = router(Arc::new(state));

    let listener = tokio::net::TcpListener::bind(args.bind).await?;
    log::info!("Listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    log::info!("Server stopped");
    Ok(())
}

fn build_pipeline(args: &ServeArgs) -> Result<InferEmotionsUseCase, Box<dyn std::error::Error>> {
    let params = args.detection_params();
    params.validate()?;

    let detector_path = model_resolver::resolve(DETECTOR_MODEL_NAME, args.detector_model.as_deref())?;
    let emotion_path = model_resolver::resolve(EMOTION_MODEL_NAME, args.emotion_model.as_deref())?;
    log::info!("Face detector model: {}", detector_path.display());
    log::info!("Emotion model: {}", emotion_path.display());

    let detector = OnnxBlazefaceDetector::new(&detector_path, args.detector_confidence)?;
    let classifier = OnnxEmotionClassifier::new(&emotion_path)?;
    Ok(InferEmotionsUseCase::new(
        Arc::new(detector),
        Arc::new(classifier),
        params,
    ))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    log::info!("Shutdown requested");
}
