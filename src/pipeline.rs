// src/pipeline.rs

//! Pipeline orchestration.
//!
//! Composes selection, eligibility, archival, engine invocation, and
//! demultiplexing into one run. Stages execute strictly in order and the
//! first classified error short-circuits the rest, so failures during
//! selection or checking guarantee zero filesystem mutation.

use crate::archive::{self, SelectedFile};
use crate::config::RunConfig;
use crate::demux;
use crate::eligibility;
use crate::engine::{CancelToken, Engine};
use crate::error::{Error, Result};
use crate::manifest;
use crate::select;
use std::io::Write;
use std::path::PathBuf;
use tracing::debug;

/// A single formatting run over one working root
#[derive(Debug)]
pub struct Pipeline {
    root: PathBuf,
    dry_run: bool,
    config: RunConfig,
}

impl Pipeline {
    /// Create a run rooted at `root`; every selected file must live under
    /// it. Relative roots are resolved against the current directory when
    /// the run starts.
    pub fn new(root: impl Into<PathBuf>, config: RunConfig) -> Self {
        Self {
            root: root.into(),
            dry_run: false,
            config,
        }
    }

    /// Report what would change without rewriting anything
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Select, check, archive, invoke, and demultiplex.
    ///
    /// Changed paths are reported line by line on `out`, followed by any
    /// engine diagnostics; engine progress streams to `diag`. A dry run
    /// that would have rewritten files fails with
    /// [`Error::UnformattedFiles`] so CI can gate on it.
    pub fn run(
        &self,
        cancel: &CancelToken,
        out: &mut dyn Write,
        diag: &mut (dyn Write + Send),
        candidates: &[PathBuf],
    ) -> Result<()> {
        // A missing engine is reported before any file is touched.
        let engine = Engine::locate(&self.config)?;
        let root = std::path::absolute(&self.root)?;

        let selection = select::select(&root, candidates)?;
        eligibility::check_all(&root, &selection.files, self.dry_run)?;

        // Only now, with the whole set vetted, are contents read.
        let mut files = Vec::with_capacity(selection.files.len());
        for path in &selection.files {
            files.push(SelectedFile::read(&root, path)?);
        }
        debug!(files = files.len(), dry_run = self.dry_run, "submitting build");

        let recipe = manifest::render(!selection.traversed);
        let input = archive::build_input(&recipe, &files)?;
        let output = engine.build(cancel, &input, &self.config.build_args, diag)?;

        let found_files = demux::demux(&root, &output, self.dry_run, out)?;

        if self.dry_run && found_files {
            return Err(Error::UnformattedFiles);
        }
        Ok(())
    }
}
