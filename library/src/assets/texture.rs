//! Texture transcoding through an external processor.

use std::path::{Path, PathBuf};
use std::process::Command;

use log::{debug, info};

use crate::assets::{AssetJob, AssetReport};
use crate::error::ShadeportError;
use crate::host::HostAdapter;
use crate::model::node::NodeRef;

pub const REDSHIFT_DATA_VAR: &str = "REDSHIFT_COREDATAPATH";
pub const DEFAULT_OUTPUT_EXTENSION: &str = "rstexbin";

#[derive(Clone, Debug, PartialEq)]
pub struct TextureTranscoder {
    program: PathBuf,
    args: Vec<String>,
    output_extension: String,
}

impl TextureTranscoder {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            output_extension: DEFAULT_OUTPUT_EXTENSION.to_string(),
        }
    }

    /// `$REDSHIFT_COREDATAPATH/bin/redshiftTextureProcessor`.
    pub fn redshift() -> Result<Self, ShadeportError> {
        let root = std::env::var(REDSHIFT_DATA_VAR).map_err(|_| {
            ShadeportError::InvalidArgument(format!(
                "{} is not set; configure [assets] transcoder explicitly",
                REDSHIFT_DATA_VAR
            ))
        })?;
        Ok(Self::new(
            Path::new(&root).join("bin").join("redshiftTextureProcessor"),
        ))
    }

    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    pub fn with_output_extension(mut self, extension: &str) -> Self {
        self.output_extension = extension.trim_start_matches('.').to_string();
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn output_extension(&self) -> &str {
        &self.output_extension
    }

    pub fn job(&self, path: &str) -> TranscodeJob {
        TranscodeJob {
            transcoder: self.clone(),
            pattern: expand_tiles(&expand_vars(path)),
        }
    }

    pub fn output_path(&self, input: &Path) -> PathBuf {
        input.with_extension(&self.output_extension)
    }
}

/// Transcodes every file matched by one (tile-expanded) path.
#[derive(Clone, Debug, PartialEq)]
pub struct TranscodeJob {
    transcoder: TextureTranscoder,
    pattern: String,
}

impl TranscodeJob {
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn inputs(&self) -> Result<Vec<PathBuf>, ShadeportError> {
        let mut inputs = Vec::new();
        for entry in glob::glob(&self.pattern)? {
            match entry {
                Ok(path) => inputs.push(path),
                Err(err) => debug!("texture: skipping unreadable match: {}", err),
            }
        }
        Ok(inputs)
    }
}

impl AssetJob for TranscodeJob {
    fn describe(&self) -> String {
        format!("transcode '{}'", self.pattern)
    }

    fn run(&self) -> Result<AssetReport, ShadeportError> {
        let mut report = AssetReport::default();
        for input in self.inputs()? {
            let status = Command::new(&self.transcoder.program)
                .args(&self.transcoder.args)
                .arg(&input)
                .status()?;
            if status.success() {
                report.produced.push(self.transcoder.output_path(&input));
            } else {
                report
                    .failed
                    .push((input, format!("processor exited with {}", status)));
            }
        }
        info!(
            "texture: {} produced {} file(s)",
            self.pattern,
            report.produced.len()
        );
        Ok(report)
    }
}

/// Builds an asset-job factory that transcodes the path stored in `attr`.
///
/// Nodes with an empty path produce no job.
pub fn transcode_attribute(
    transcoder: TextureTranscoder,
    attr: &str,
) -> impl Fn(&dyn HostAdapter, NodeRef) -> Result<Option<Box<dyn AssetJob>>, ShadeportError>
+ Send
+ Sync
+ 'static {
    let attr = attr.to_string();
    move |host: &dyn HostAdapter, node: NodeRef| -> Result<Option<Box<dyn AssetJob>>, ShadeportError> {
        let path: String = host.get_static_attr(node, &attr)?.try_as()?;
        if path.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(Box::new(transcoder.job(&path)) as Box<dyn AssetJob>))
    }
}

/// Replaces UV tile tokens with a glob wildcard.
pub fn expand_tiles(path: &str) -> String {
    if !path.contains('<') {
        return path.to_string();
    }
    path.replace("<UDIM>", "*")
        .replace("<U>", "*")
        .replace("<V>", "*")
}

/// Expands `$VAR` and `${VAR}`; unknown variables are left untouched.
pub fn expand_vars(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    let mut rest = path;
    while let Some(pos) = rest.find('$') {
        out.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];
        let (name, consumed) = if let Some(braced) = after.strip_prefix('{') {
            match braced.find('}') {
                Some(end) => (&braced[..end], end + 2),
                None => ("", 0),
            }
        } else {
            let end = after
                .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
                .unwrap_or(after.len());
            (&after[..end], end)
        };
        match std::env::var(name) {
            Ok(value) if !name.is_empty() => out.push_str(&value),
            _ => out.push_str(&rest[pos..pos + 1 + consumed]),
        }
        rest = &rest[pos + 1 + consumed..];
    }
    out.push_str(rest);
    out
}
