//! Request and result types shared by the resolver, executor and HTTP layer

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Body of `POST /resize`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResizeRequest {
    pub input_path: PathBuf,
    /// Accepted for compatibility; resize always writes to the fixed output path
    #[serde(default)]
    pub output_path: Option<PathBuf>,
    pub width: u32,
    pub height: u32,
}

/// Body of `POST /convert`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConvertRequest {
    pub png_path: PathBuf,
    pub jpeg_path: PathBuf,
}

/// Body of `POST /compress`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompressRequest {
    pub input_path: PathBuf,
    pub quality: i64,
}

/// A decoded request for one of the three operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationRequest {
    Resize(ResizeRequest),
    Convert(ConvertRequest),
    Compress(CompressRequest),
}

impl OperationRequest {
    /// Path the caller wants read
    pub fn input_path(&self) -> &PathBuf {
        match self {
            Self::Resize(req) => &req.input_path,
            Self::Convert(req) => &req.png_path,
            Self::Compress(req) => &req.input_path,
        }
    }

    /// Executor parameters carried by this request
    pub fn operation(&self) -> Operation {
        match self {
            Self::Resize(req) => Operation::Resize {
                width: req.width,
                height: req.height,
            },
            Self::Convert(_) => Operation::Convert,
            Self::Compress(req) => Operation::Compress {
                quality: req.quality,
            },
        }
    }
}

impl From<ResizeRequest> for OperationRequest {
    fn from(req: ResizeRequest) -> Self {
        Self::Resize(req)
    }
}

impl From<ConvertRequest> for OperationRequest {
    fn from(req: ConvertRequest) -> Self {
        Self::Convert(req)
    }
}

impl From<CompressRequest> for OperationRequest {
    fn from(req: CompressRequest) -> Self {
        Self::Compress(req)
    }
}

/// What the executor should do, stripped of path information
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Resize { width: u32, height: u32 },
    Convert,
    Compress { quality: i64 },
}

impl Operation {
    /// Short name used in logs and error messages
    pub fn name(self) -> &'static str {
        match self {
            Self::Resize { .. } => "resize",
            Self::Convert => "convert",
            Self::Compress { .. } => "compress",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Resize { width, height } => write!(f, "resize to {}x{}", width, height),
            Self::Convert => f.write_str("convert to jpeg"),
            Self::Compress { quality } => write!(f, "compress at quality {}", quality),
        }
    }
}

/// Input and output locations after path resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPaths {
    pub input: PathBuf,
    pub output: PathBuf,
}
