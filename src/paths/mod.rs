//! Output path derivation
//!
//! Every operation writes to a path chosen by fixed rules:
//!
//! - **resize** always writes to one configured file. Two resizes in flight
//!   race on that file and the last writer wins.
//! - **convert** writes wherever the caller asked (`jpeg_path`).
//! - **compress** writes `<compress_dir>/<prefix><base name of input>`.
//!
//! When a base directory is configured, caller-supplied paths go through a
//! [`PathSandbox`] first.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::config::PathsConfig;
use crate::error::Result;
use crate::operation::{OperationRequest, ResolvedPaths};

pub mod sandbox;

pub use sandbox::{normalize, PathSandbox};

/// Maps requests to input/output file locations
#[derive(Debug, Clone)]
pub struct PathResolver {
    resize_output: PathBuf,
    compress_dir: PathBuf,
    compress_prefix: String,
    sandbox: Option<PathSandbox>,
}

impl PathResolver {
    /// Build a resolver from the `[paths]` configuration section
    pub fn new(config: &PathsConfig) -> Result<Self> {
        let sandbox = config
            .base_dir
            .as_deref()
            .map(PathSandbox::new)
            .transpose()?;
        let anchor = |path: &Path| match &sandbox {
            Some(sandbox) => sandbox.anchor(path),
            None => path.to_path_buf(),
        };

        Ok(Self {
            resize_output: anchor(&config.resize_output),
            compress_dir: anchor(&config.compress_dir),
            compress_prefix: config.compress_prefix.clone(),
            sandbox,
        })
    }

    /// The single location every resize writes to
    pub fn resize(&self) -> &Path {
        &self.resize_output
    }

    /// Output for a compress of `input`: prefix added, base name preserved
    pub fn compress<P: AsRef<Path>>(&self, input: P) -> PathBuf {
        let mut name = OsString::from(&self.compress_prefix);
        name.push(base_name(input.as_ref()));
        self.compress_dir.join(name)
    }

    /// Caller-chosen convert output, checked against the sandbox
    pub fn convert<P: AsRef<Path>>(&self, requested: P) -> Result<PathBuf> {
        self.caller_path(requested.as_ref())
    }

    /// Caller-chosen input, checked against the sandbox
    pub fn input<P: AsRef<Path>>(&self, requested: P) -> Result<PathBuf> {
        self.caller_path(requested.as_ref())
    }

    /// Resolve both ends of a request
    pub fn resolve(&self, request: &OperationRequest) -> Result<ResolvedPaths> {
        let input = self.input(request.input_path())?;
        let output = match request {
            OperationRequest::Resize(_) => self.resize().to_path_buf(),
            OperationRequest::Convert(req) => self.convert(&req.jpeg_path)?,
            OperationRequest::Compress(req) => self.compress(&req.input_path),
        };

        Ok(ResolvedPaths { input, output })
    }

    fn caller_path(&self, requested: &Path) -> Result<PathBuf> {
        match &self.sandbox {
            Some(sandbox) => sandbox.resolve(requested),
            None => Ok(requested.to_path_buf()),
        }
    }
}

/// Last path component, `..` and `/` included; `"."` when the path has none
fn base_name(path: &Path) -> OsString {
    path.components()
        .next_back()
        .map(|component| component.as_os_str().to_os_string())
        .unwrap_or_else(|| OsString::from("."))
}
