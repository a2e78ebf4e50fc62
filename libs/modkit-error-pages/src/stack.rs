//! Textual stack frames: parsing and filtering.

use crate::config::FilterConfig;

const FRAME_MARKER: &str = "at ";

/// One parsed stack-trace line.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StackFrame {
    pub class_name: String,
    pub file_name: String,
    pub line_number: u32,
}

impl StackFrame {
    /// Parse a trimmed line of the form `at pkg.Type.method(File.ext:42)`.
    ///
    /// Returns `None` for anything that is not a located frame.
    #[must_use]
    pub fn parse(line: &str) -> Option<Self> {
        let rest = line.strip_prefix(FRAME_MARKER)?;
        let open = rest.find('(')?;
        let close = open + rest[open..].find(')')?;

        let qualifier = &rest[..open];
        let (file_name, line_number) = rest[open + 1..close].rsplit_once(':')?;
        let line_number = line_number.trim().parse::<u32>().ok()?;

        let class_name = qualifier
            .rsplit_once('.')
            .map_or(qualifier, |(class, _method)| class);

        Some(Self {
            class_name: class_name.to_owned(),
            file_name: file_name.to_owned(),
            line_number,
        })
    }
}

/// Drops frames that belong to infrastructure or carry no source location.
#[derive(Debug, Clone)]
pub struct StackTraceFilter {
    needles: Vec<String>,
}

impl StackTraceFilter {
    pub fn new<I, S>(needles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            needles: needles
                .into_iter()
                .map(Into::into)
                .filter(|n: &String| !n.is_empty())
                .collect(),
        }
    }

    pub fn from_config(config: &FilterConfig) -> Self {
        Self::new([
            config.framework_prefix.as_str(),
            config.transport_prefix.as_str(),
            config.unknown_source.as_str(),
        ])
    }

    /// `true` when the frame text survives filtering.
    #[must_use]
    pub fn retains(&self, frame: &str) -> bool {
        !self.needles.iter().any(|n| frame.contains(n.as_str()))
    }

    /// Filtered copy of `frames`, order preserved.
    pub fn apply<'a, I>(&self, frames: I) -> Vec<String>
    where
        I: IntoIterator<Item = &'a str>,
    {
        frames
            .into_iter()
            .filter(|f| self.retains(f))
            .map(str::to_owned)
            .collect()
    }
}
