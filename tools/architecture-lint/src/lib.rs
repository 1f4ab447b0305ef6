//! Repo-local lint enforcing the hexagonal boundaries of `txn-backfill`.
//!
//! Files under `src/domain`, `src/inbound` and `src/outbound` are parsed with
//! `syn` and every path they mention is checked against the rules of their
//! layer:
//!
//! - `domain` must not reach the adapter layers, storage crates (Diesel) or
//!   operator-surface crates (`clap`, `ortho_config`, `color_eyre`,
//!   `tracing_subscriber`)
//! - `inbound` must not reach `outbound` or storage crates
//! - `outbound` must not reach `inbound`, `clap` or `ortho_config`
//!
//! Files outside the three layers, such as the composition root, are not
//! checked. Run it with `cargo run -p architecture-lint`.

mod layer;
mod paths;

use std::collections::BTreeSet;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use layer::Layer;
use paths::Segments;

/// Library name under which the linted crate refers to itself.
const CRATE_NAME: &str = "txn_backfill";

/// A single boundary violation.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Violation {
    /// File path relative to the crate's `src/`.
    pub file: PathBuf,
    /// Rule that was broken.
    pub message: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.file.display(), self.message)
    }
}

/// Failure modes of the lint.
#[derive(Debug)]
pub enum ArchitectureLintError {
    /// Reading the source tree failed.
    Io(io::Error),
    /// A source file could not be parsed or placed in a layer.
    Parse {
        /// Offending file.
        file: PathBuf,
        /// Parser message.
        message: String,
    },
    /// Boundary violations were found.
    Violations(Vec<Violation>),
}

impl fmt::Display for ArchitectureLintError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(err) => write!(f, "failed to read sources: {err}"),
            Self::Parse { file, message } => {
                write!(f, "failed to parse {}: {message}", file.display())
            }
            Self::Violations(violations) => {
                writeln!(f, "{} boundary violation(s):", violations.len())?;
                violations
                    .iter()
                    .try_for_each(|violation| writeln!(f, "- {violation}"))
            }
        }
    }
}

impl std::error::Error for ArchitectureLintError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Parse { .. } | Self::Violations(_) => None,
        }
    }
}

impl From<io::Error> for ArchitectureLintError {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

/// A Rust source file to lint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LintSource {
    /// Path relative to the crate's `src/`.
    pub file: PathBuf,
    /// File contents.
    pub contents: String,
}

/// Lint the crate rooted at `crate_dir` (the directory holding `src/`).
pub fn lint_crate_sources(crate_dir: &Path) -> Result<(), ArchitectureLintError> {
    let src_dir = crate_dir.join("src");
    let mut sources = Vec::new();
    for layer in ["domain", "inbound", "outbound"] {
        let dir = src_dir.join(layer);
        if dir.is_dir() {
            read_sources(&src_dir, &dir, &mut sources)?;
        }
    }
    lint_sources(&sources)
}

/// Lint in-memory sources.
pub fn lint_sources(sources: &[LintSource]) -> Result<(), ArchitectureLintError> {
    let mut violations = BTreeSet::new();
    for source in sources {
        let layer = Layer::of(&source.file).ok_or_else(|| ArchitectureLintError::Parse {
            file: source.file.clone(),
            message: "file is not under domain/, inbound/ or outbound/".to_owned(),
        })?;
        let parsed =
            syn::parse_file(&source.contents).map_err(|err| ArchitectureLintError::Parse {
                file: source.file.clone(),
                message: err.to_string(),
            })?;
        for message in check(layer, &paths::mentioned_paths(&parsed)) {
            violations.insert(Violation {
                file: source.file.clone(),
                message,
            });
        }
    }

    if violations.is_empty() {
        Ok(())
    } else {
        Err(ArchitectureLintError::Violations(
            violations.into_iter().collect(),
        ))
    }
}

fn check(layer: Layer, mentioned: &BTreeSet<Segments>) -> BTreeSet<String> {
    let mut messages = BTreeSet::new();
    for segments in mentioned {
        match target(segments) {
            Some(Target::Layer(other)) if layer.forbids_layer(other) => {
                messages.insert(format!(
                    "{} module must not depend on crate::{}",
                    layer.name(),
                    other.name()
                ));
            }
            Some(Target::Crate(root)) if layer.forbids_crate(root) => {
                messages.insert(format!(
                    "{} module must not depend on external crate `{root}`",
                    layer.name()
                ));
            }
            _ => {}
        }
    }
    messages
}

enum Target<'a> {
    Layer(Layer),
    Crate(&'a str),
}

/// What a path points into: one of this crate's layers or an external crate.
fn target(segments: &[String]) -> Option<Target<'_>> {
    let first = segments.first()?.as_str();
    if let Some(layer) = Layer::named(first) {
        return Some(Target::Layer(layer));
    }
    if matches!(first, "crate" | "self" | "super") || first == CRATE_NAME {
        return segments
            .iter()
            .map(String::as_str)
            .find(|segment| !matches!(*segment, "crate" | "self" | "super" | CRATE_NAME))
            .and_then(Layer::named)
            .map(Target::Layer);
    }
    Some(Target::Crate(first))
}

fn read_sources(
    src_root: &Path,
    dir: &Path,
    sources: &mut Vec<LintSource>,
) -> Result<(), ArchitectureLintError> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            read_sources(src_root, &path, sources)?;
        } else if path.extension().is_some_and(|ext| ext == "rs") {
            let file = path
                .strip_prefix(src_root)
                .map_err(|err| ArchitectureLintError::Parse {
                    file: path.clone(),
                    message: err.to_string(),
                })?
                .to_path_buf();
            let contents = fs::read_to_string(&path)?;
            sources.push(LintSource { file, contents });
        }
    }
    Ok(())
}
