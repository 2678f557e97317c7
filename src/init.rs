use crate::error::PipelineError;
use crate::logi;
use std::path::Path;
use tokio::fs;

pub async fn ensure_out_dir(dir: &Path) -> Result<(), PipelineError> {
    if !dir.exists() {
        fs::create_dir_all(dir)
            .await
            .map_err(|e| PipelineError::io(dir, e))?;
        logi(format!("Created directory: {}", dir.display()));
    }
    Ok(())
}

/// True when `program -version` runs and exits cleanly.
pub async fn check_tool(program: &Path) -> bool {
    match tokio::process::Command::new(program)
        .arg("-version")
        .output()
        .await
    {
        Ok(output) => output.status.success(),
        Err(_) => false,
    }
}
