//! tee — copy lines to a side file while passing them on.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};

use crate::stages::lines::{write_line, Flow, LineReader};
use crate::stages::{Stage, StageContext, StageError, StageInput, StageOutput};

/// Tee stage. With no path it passes lines through unchanged.
///
/// The file is created (truncating) when the run starts and is owned by that
/// run alone; it is flushed on every non-error exit and closed on all exits.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tee {
    pub path: Option<PathBuf>,
}

impl Tee {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    pub fn passthrough() -> Self {
        Self::default()
    }
}

fn tee_error(path: &Path, source: std::io::Error) -> StageError {
    StageError::Tee {
        path: path.to_path_buf(),
        source,
    }
}

#[async_trait]
impl Stage for Tee {
    fn name(&self) -> &str {
        "tee"
    }

    async fn process(
        &self,
        ctx: &StageContext,
        input: &mut StageInput<'_>,
        output: &mut StageOutput<'_>,
    ) -> Result<(), StageError> {
        let mut side = match &self.path {
            Some(path) => {
                let file = File::create(path).await.map_err(|e| tee_error(path, e))?;
                tracing::debug!(path = %path.display(), "tee file opened");
                Some((path.as_path(), BufWriter::new(file)))
            }
            None => None,
        };

        let mut lines = LineReader::new(input);
        loop {
            ctx.check()?;
            let Some(line) = lines.next_line().await? else {
                break;
            };
            if write_line(output, &line).await? == Flow::Closed {
                break;
            }
            if let Some((path, file)) = side.as_mut() {
                file.write_all(line.as_bytes())
                    .await
                    .map_err(|e| tee_error(path, e))?;
                file.write_all(b"\n").await.map_err(|e| tee_error(path, e))?;
            }
        }

        if let Some((path, mut file)) = side {
            file.flush().await.map_err(|e| tee_error(path, e))?;
        }
        Ok(())
    }
}
