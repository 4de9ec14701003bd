use std::path::Path;

use ort::session::Session;

/// Return the preferred ONNX execution providers for the current platform.
///
/// Falls back to CPU if the platform-specific provider is unavailable.
pub fn preferred_execution_providers() -> Vec<ort::execution_providers::ExecutionProviderDispatch> {
    #[cfg(target_os = "macos")]
    {
        vec![ort::execution_providers::CoreMLExecutionProvider::default().build()]
    }
    #[cfg(target_os = "windows")]
    {
        vec![ort::execution_providers::DirectMLExecutionProvider::default().build()]
    }
    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    {
        vec![]
    }
}

/// Build an inference session for the model at `model_path`.
///
/// External weight files referenced by the model are resolved relative to
/// the model's directory by ONNX Runtime. Errors are flattened to strings so
/// each caller can wrap them in its own error type.
pub fn build_session(model_path: &Path) -> Result<Session, String> {
    Session::builder()
        .map_err(|e| e.to_string())?
        .with_execution_providers(preferred_execution_providers())
        .map_err(|e| e.to_string())?
        .commit_from_file(model_path)
        .map_err(|e| format!("{}: {e}", model_path.display()))
}
