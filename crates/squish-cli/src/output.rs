//! Writing every new best to the output file.

use squish_ast::{render, RenderOptions, State};
use squish_core::{Error, Result};
use crate::cost::Target;
use squish_search::{commit_with, BestObserver, Finisher};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

/// Replaces the output file on every new best, so an interrupted run
/// leaves the best result so far behind.
pub struct BestWriter {
    path: PathBuf,
    print_best: bool,
    target: Target,
    sizes: Vec<u64>,
}

impl BestWriter {
    pub fn new(path: impl Into<PathBuf>, print_best: bool) -> Self {
        Self {
            path: path.into(),
            print_best,
            target: Target::default(),
            sizes: Vec::new(),
        }
    }

    /// Costs are checked against the file size relative to `target`.
    pub fn with_target(mut self, target: Target) -> Self {
        self.target = target;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Size of the first file written, the unmutated baseline
    pub fn baseline_size(&self) -> Option<u64> {
        self.sizes.first().copied()
    }

    /// Size of the file on disk
    pub fn final_size(&self) -> Option<u64> {
        self.sizes.last().copied()
    }
}

impl<F: Finisher> BestObserver<F> for BestWriter {
    fn on_new_best(&mut self, state: &State, cost: f64, finisher: F) -> Result<()> {
        let dir = match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        let mut file = NamedTempFile::new_in(dir)?;
        let target = self.target;
        let size = commit_with(finisher, cost, &mut file, |len| target.cost(len))?;
        file.persist(&self.path).map_err(|e| Error::Io(e.error))?;
        debug!(path = %self.path.display(), size, "best written");

        if self.print_best {
            let rule = "-".repeat(40);
            let pretty = render(&state.root, RenderOptions::pretty());
            println!("-- {cost} bytes:\n{rule}\n{}\n{rule}", pretty.trim());
        }
        self.sizes.push(size);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use squish_ast::parse;
    use squish_search::CommitBytes;

    #[test]
    fn test_each_best_replaces_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.lua");
        let mut writer = BestWriter::new(&path, false);
        let state = State::new(parse("x=1").unwrap());

        writer
            .on_new_best(&state, 5.0, CommitBytes(b"x=1+2".to_vec()))
            .unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"x=1+2");
        writer
            .on_new_best(&state, 3.0, CommitBytes(b"x=3".to_vec()))
            .unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"x=3");

        assert_eq!(writer.baseline_size(), Some(5));
        assert_eq!(writer.final_size(), Some(3));
        // no temporary files left behind
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_costs_relative_to_target() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.lua");
        let mut writer = BestWriter::new(&path, false).with_target(Target::new(4, false));
        let state = State::new(parse("x=1").unwrap());

        writer
            .on_new_best(&state, 1.0, CommitBytes(b"x=1+2".to_vec()))
            .unwrap();
        writer
            .on_new_best(&state, -1.0, CommitBytes(b"x=3".to_vec()))
            .unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"x=3");
        assert_eq!(writer.final_size(), Some(3));

        let err = writer
            .on_new_best(&state, 3.0, CommitBytes(b"x=3".to_vec()))
            .unwrap_err();
        assert!(matches!(err, Error::CommitMismatch { .. }));
    }

    #[test]
    fn test_size_mismatch_keeps_previous_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.bin");
        let mut writer = BestWriter::new(&path, false);
        let state = State::new(parse("x=1").unwrap());
        writer
            .on_new_best(&state, 3.0, CommitBytes(b"x=1".to_vec()))
            .unwrap();

        let err = writer
            .on_new_best(&state, 2.0, CommitBytes(b"x=1".to_vec()))
            .unwrap_err();
        assert!(matches!(err, Error::CommitMismatch { .. }));
        assert_eq!(std::fs::read(&path).unwrap(), b"x=1");
        assert_eq!(writer.final_size(), Some(3));
    }
}
