// fbink display adapter
//
// Spools the frame as a PBM file and hands it to the fbink binary, which
// owns the actual framebuffer update on the device. Full refresh clears and
// flashes the panel to shed ghosting; partial refresh just paints over.
use std::path::PathBuf;

use async_trait::async_trait;
use tokio::process::Command;

use crate::application::display_port::{DisplayPort, DisplayPushError, RefreshMode};
use crate::infrastructure::renderer::Frame;

#[derive(Debug, Clone)]
pub struct FbinkDisplay {
    fbink_path: String,
    spool_dir: PathBuf,
}

impl FbinkDisplay {
    pub fn new(fbink_path: String, spool_dir: impl Into<PathBuf>) -> Self {
        Self {
            fbink_path,
            spool_dir: spool_dir.into(),
        }
    }

    fn refresh_args(mode: RefreshMode) -> &'static [&'static str] {
        match mode {
            RefreshMode::Full => &["-c", "-f"],
            RefreshMode::Partial => &[],
        }
    }
}

#[async_trait]
impl DisplayPort for FbinkDisplay {
    async fn push(&self, frame: &Frame, mode: RefreshMode) -> Result<(), DisplayPushError> {
        tokio::fs::create_dir_all(&self.spool_dir)
            .await
            .map_err(DisplayPushError::Spool)?;
        let path = self.spool_dir.join("frame.pbm");
        tokio::fs::write(&path, frame.to_pbm())
            .await
            .map_err(DisplayPushError::Spool)?;

        let image_arg = format!(
            "file={},w={},h={},halign=center,valign=center",
            path.display(),
            frame.width(),
            frame.height(),
        );

        tracing::debug!(?mode, image = %path.display(), "pushing frame");
        let output = Command::new(&self.fbink_path)
            .args(Self::refresh_args(mode))
            .arg("-g")
            .arg(&image_arg)
            .output()
            .await
            .map_err(DisplayPushError::Command)?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(DisplayPushError::Exit(format!(
                "{} ({})",
                output.status,
                stderr.trim()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_refresh_clears_and_flashes() {
        assert_eq!(FbinkDisplay::refresh_args(RefreshMode::Full), ["-c", "-f"]);
        assert!(FbinkDisplay::refresh_args(RefreshMode::Partial).is_empty());
    }
}
