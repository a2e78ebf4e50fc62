//! Source snippets for parsed stack frames.
//!
//! Lookup is best effort: a frame whose source cannot be located or read
//! simply has no snippet.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Component, Path, PathBuf};

use crate::config::SourceConfig;
use crate::stack::StackFrame;

/// Resolves the source file of a frame.
pub trait SourceLocator: Send + Sync {
    fn locate(&self, frame: &StackFrame) -> Option<PathBuf>;
}

/// Never finds anything; installed when source lookup is disabled.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSourceLocator;

impl SourceLocator for NoopSourceLocator {
    fn locate(&self, _frame: &StackFrame) -> Option<PathBuf> {
        None
    }
}

/// Finds frame sources below `root`.
///
/// The file recorded in the frame is used when it lies below `root`.
/// Otherwise the module path of the frame is mapped to `<root>/a/b.<ext>` or
/// `<root>/a/b/mod.<ext>`, with and without its leading crate segment and with
/// trailing function segments dropped. Only files named like the recorded one
/// qualify.
#[derive(Debug, Clone)]
pub struct FsSourceLocator {
    root: PathBuf,
    extension: String,
}

impl FsSourceLocator {
    pub fn new(root: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            extension: extension.into(),
        }
    }

    /// Paths tried for `frame`, most specific first, whether or not they exist.
    #[must_use]
    pub fn candidates(&self, frame: &StackFrame) -> Vec<PathBuf> {
        let mut found: Vec<PathBuf> = self.recorded_path(&frame.file_name).into_iter().collect();
        let Some(segments) = module_segments(&frame.class_name) else {
            return found;
        };

        let file_name = Path::new(&frame.file_name).file_name();
        let module_file = format!("mod.{}", self.extension);
        // Literal path first, then without the crate name.
        for start in 0..segments.len().min(2) {
            for end in (start + 1..=segments.len()).rev() {
                let mut base = self.root.clone();
                base.extend(segments[start..end].iter().copied());
                let nested = base.join(&module_file);
                base.set_extension(&self.extension);
                for path in [base, nested] {
                    if path.file_name() == file_name && !found.contains(&path) {
                        found.push(path);
                    }
                }
            }
        }
        found
    }

    fn recorded_path(&self, file_name: &str) -> Option<PathBuf> {
        let recorded = without_cur_dir(Path::new(file_name));
        if recorded
            .components()
            .any(|c| matches!(c, Component::ParentDir))
        {
            return None;
        }
        recorded
            .starts_with(without_cur_dir(&self.root))
            .then_some(recorded)
    }
}

impl SourceLocator for FsSourceLocator {
    fn locate(&self, frame: &StackFrame) -> Option<PathBuf> {
        self.candidates(frame).into_iter().find(|path| path.is_file())
    }
}

fn without_cur_dir(path: &Path) -> PathBuf {
    path.components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}

/// Leading identifier segments of a qualifier; nested types share the source
/// file of their outermost type.
fn module_segments(class_name: &str) -> Option<Vec<&str>> {
    let outer = class_name.split('$').next().unwrap_or(class_name);
    let mut segments = Vec::new();
    for segment in outer.split('.') {
        if segment.is_empty() {
            return None;
        }
        if !segment.chars().all(|c| c.is_alphanumeric() || c == '_') {
            break;
        }
        segments.push(segment);
    }
    (!segments.is_empty()).then_some(segments)
}

/// Build the locator matching the configuration.
pub fn locator_from_config(config: &SourceConfig) -> Box<dyn SourceLocator> {
    if config.enabled {
        Box::new(FsSourceLocator::new(&config.root, &config.extension))
    } else {
        Box::new(NoopSourceLocator)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnippetLine {
    /// 1-based line number in the source file.
    pub number: usize,
    pub text: String,
    /// Set on the failing line only.
    pub highlighted: bool,
}

/// A window of source lines around the failing line of a frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeSnippet {
    pub class_name: String,
    pub file_name: String,
    pub line_number: u32,
    pub lines: Vec<SnippetLine>,
}

/// Extracts code snippets through a [`SourceLocator`].
pub struct SnippetExtractor {
    locator: Box<dyn SourceLocator>,
    context_lines: usize,
}

impl SnippetExtractor {
    pub fn new(locator: Box<dyn SourceLocator>, context_lines: usize) -> Self {
        Self {
            locator,
            context_lines,
        }
    }

    pub fn from_config(config: &SourceConfig) -> Self {
        Self::new(locator_from_config(config), config.context_lines)
    }

    /// Snippet for `frame`, or `None` when the source is unavailable.
    pub fn extract(&self, frame: &StackFrame) -> Option<CodeSnippet> {
        let path = self.locator.locate(frame)?;
        match read_window(&path, frame.line_number, self.context_lines) {
            Ok(lines) if !lines.is_empty() => Some(CodeSnippet {
                class_name: frame.class_name.clone(),
                file_name: frame.file_name.clone(),
                line_number: frame.line_number,
                lines,
            }),
            Ok(_) => {
                tracing::debug!(
                    path = %path.display(),
                    line = frame.line_number,
                    "failing line is outside the source file"
                );
                None
            }
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "source snippet unavailable");
                None
            }
        }
    }
}

/// Read lines `target - context ..= target + context` (1-based, clamped).
///
/// Reading stops at the end of the window; the file is closed when the reader
/// is dropped on every return path.
fn read_window(path: &Path, target: u32, context: usize) -> io::Result<Vec<SnippetLine>> {
    let target = usize::try_from(target).unwrap_or(usize::MAX);
    if target == 0 {
        return Ok(Vec::new());
    }
    let first = target.saturating_sub(context).max(1);
    let last = target.saturating_add(context);

    let reader = BufReader::new(File::open(path)?);
    let mut window = Vec::new();
    let mut reached_target = false;

    for (idx, line) in reader.lines().enumerate() {
        let number = idx + 1;
        if number < first {
            continue;
        }
        if number > last {
            break;
        }
        let text = line?;
        reached_target |= number == target;
        window.push(SnippetLine {
            number,
            text,
            highlighted: number == target,
        });
    }

    if reached_target {
        Ok(window)
    } else {
        Ok(Vec::new())
    }
}
