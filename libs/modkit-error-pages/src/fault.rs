//! Root causes attached to failed requests.
//!
//! A [`Throwable`] is anything that can describe itself the way a stack-traced
//! exception does: a type name, an optional message, a list of frame strings
//! and an optional underlying cause. [`Fault`] is the owned implementation used
//! by handlers; other implementations can plug in through the trait.

use std::backtrace::Backtrace;
use std::fmt;
use std::sync::{Arc, OnceLock};

/// Upper bound on cause-chain walks, independent of the visited set.
pub const MAX_CAUSE_DEPTH: usize = 64;

/// Frame text used when a backtrace frame carries no source location.
pub const UNKNOWN_SOURCE: &str = "Unknown Source";

pub trait Throwable: fmt::Debug + Send + Sync {
    /// Fully qualified type name, e.g. `demo.errors.StorageError`.
    fn type_name(&self) -> &str;

    fn message(&self) -> Option<&str>;

    /// Frames in `qualifier(file:line)` form, innermost first.
    fn stack_trace(&self) -> &[String];

    fn cause(&self) -> Option<&dyn Throwable>;
}

/// Summary of one link in a cause chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CauseSummary {
    pub type_name: String,
    pub message: Option<String>,
}

/// Walk the causes below `root`, stopping on a cycle or at [`MAX_CAUSE_DEPTH`].
///
/// The root itself is not part of the result.
#[must_use]
pub fn cause_chain(root: &dyn Throwable) -> Vec<CauseSummary> {
    let mut visited: Vec<*const ()> = vec![address_of(root)];
    let mut causes = Vec::new();
    let mut current = root.cause();

    while let Some(cause) = current {
        if causes.len() >= MAX_CAUSE_DEPTH {
            tracing::debug!(depth = MAX_CAUSE_DEPTH, "cause chain truncated");
            break;
        }
        let address = address_of(cause);
        if visited.contains(&address) {
            break;
        }
        visited.push(address);
        causes.push(CauseSummary {
            type_name: cause.type_name().to_owned(),
            message: cause.message().map(str::to_owned),
        });
        current = cause.cause();
    }
    causes
}

/// Print the throwable and its causes the way a stack-traced runtime does:
/// a `Type: message` header, one `\tat frame` line per frame, and a
/// `Caused by: ...` section per cause.
#[must_use]
pub fn printed_stack_trace(root: &dyn Throwable) -> String {
    let mut out = String::new();
    let mut visited: Vec<*const ()> = Vec::new();
    let mut current = Some(root);
    let mut depth = 0;

    while let Some(throwable) = current {
        let address = address_of(throwable);
        if visited.contains(&address) || depth > MAX_CAUSE_DEPTH {
            break;
        }
        visited.push(address);
        if depth > 0 {
            out.push_str("Caused by: ");
        }
        out.push_str(throwable.type_name());
        if let Some(message) = throwable.message() {
            out.push_str(": ");
            out.push_str(message);
        }
        out.push('\n');
        for frame in throwable.stack_trace() {
            out.push_str("\tat ");
            out.push_str(frame);
            out.push('\n');
        }
        current = throwable.cause();
        depth += 1;
    }
    out
}

fn address_of(throwable: &dyn Throwable) -> *const () {
    std::ptr::from_ref(throwable).cast::<()>()
}

/// Owned root cause captured by a handler.
#[derive(Debug, Clone, Default)]
#[must_use]
pub struct Fault {
    type_name: String,
    message: Option<String>,
    stack_trace: Vec<String>,
    captured: Option<Arc<CapturedTrace>>,
    cause: Option<Box<Fault>>,
}

/// Backtrace taken at the failure site, symbolized on first use.
struct CapturedTrace {
    backtrace: Backtrace,
    frames: OnceLock<Vec<String>>,
}

impl CapturedTrace {
    fn frames(&self) -> &[String] {
        self.frames
            .get_or_init(|| frames_from_backtrace(&self.backtrace.to_string()))
    }
}

impl fmt::Debug for CapturedTrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CapturedTrace")
            .field("resolved", &self.frames.get().is_some())
            .finish_non_exhaustive()
    }
}

impl Fault {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            ..Self::default()
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_frame(mut self, frame: impl Into<String>) -> Self {
        self.stack_trace.push(frame.into());
        self
    }

    pub fn with_frames<I, S>(mut self, frames: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.stack_trace.extend(frames.into_iter().map(Into::into));
        self
    }

    pub fn with_cause(mut self, cause: Fault) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }

    /// Record the caller's backtrace as the stack trace of this fault,
    /// replacing explicit frames.
    ///
    /// Only the raw stack walk happens here. Symbols are resolved the first
    /// time [`Throwable::stack_trace`] is called, which renderers only do when
    /// diagnostics are shown.
    pub fn with_captured_backtrace(mut self) -> Self {
        self.captured = Some(Arc::new(CapturedTrace {
            backtrace: Backtrace::force_capture(),
            frames: OnceLock::new(),
        }));
        self
    }

    #[cfg(test)]
    pub(crate) fn trace_resolved(&self) -> bool {
        self.captured
            .as_ref()
            .is_some_and(|c| c.frames.get().is_some())
    }

    /// Convert a `std::error::Error` and its `source()` chain into a fault.
    ///
    /// The outer type name comes from `E`; sources are only reachable as trait
    /// objects, so their type name is taken from their `Debug` output.
    pub fn from_error<E>(error: &E) -> Self
    where
        E: std::error::Error + 'static,
    {
        let mut fault = Self::new(qualified_type_name(std::any::type_name::<E>()))
            .with_message(error.to_string());

        let mut sources = Vec::new();
        let mut source = error.source();
        while let Some(err) = source {
            if sources.len() >= MAX_CAUSE_DEPTH {
                break;
            }
            sources.push(Self::new(debug_type_name(err)).with_message(err.to_string()));
            source = err.source();
        }
        if let Some(chain) = sources.into_iter().rev().reduce(|inner, outer| outer.with_cause(inner)) {
            fault = fault.with_cause(chain);
        }
        fault
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.message {
            Some(message) => write!(f, "{}: {message}", self.type_name),
            None => f.write_str(&self.type_name),
        }
    }
}

impl Throwable for Fault {
    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    fn stack_trace(&self) -> &[String] {
        match &self.captured {
            Some(captured) => captured.frames(),
            None => &self.stack_trace,
        }
    }

    fn cause(&self) -> Option<&dyn Throwable> {
        self.cause.as_deref().map(|c| c as &dyn Throwable)
    }
}

/// Rust paths use `::`; frame text uses `.` throughout so one grammar covers
/// every frame.
fn qualified_type_name(rust_path: &str) -> String {
    rust_path.replace("::", ".")
}

fn debug_type_name(error: &(dyn std::error::Error + 'static)) -> String {
    let debug = format!("{error:?}");
    let name: String = debug
        .chars()
        .take_while(|c| c.is_alphanumeric() || *c == '_')
        .collect();
    if name.is_empty() {
        "Error".to_owned()
    } else {
        name
    }
}

/// Convert the `Display` output of a `std::backtrace::Backtrace` into frame
/// strings.
///
/// Each frame is a numbered symbol line optionally followed by an
/// `at path:line:column` line. Frames without a location are rendered with
/// [`UNKNOWN_SOURCE`] so that stack filters can drop them. The leading frames
/// of the capture itself and of the error conversion that triggered it are
/// dropped.
#[must_use]
pub fn frames_from_backtrace(text: &str) -> Vec<String> {
    let mut frames = Vec::new();
    let mut pending: Option<String> = None;

    for line in text.lines().map(str::trim) {
        if let Some(location) = line.strip_prefix("at ") {
            if let Some(symbol) = pending.take() {
                frames.push(format!("{symbol}({})", file_and_line(location)));
            }
            continue;
        }
        let Some((index, symbol)) = line.split_once(": ") else {
            continue;
        };
        if index.is_empty() || !index.bytes().all(|b| b.is_ascii_digit()) {
            continue;
        }
        if let Some(previous) = pending.replace(qualified_type_name(symbol)) {
            frames.push(format!("{previous}({UNKNOWN_SOURCE})"));
        }
    }
    if let Some(previous) = pending {
        frames.push(format!("{previous}({UNKNOWN_SOURCE})"));
    }
    let capture = frames.iter().take_while(|f| is_capture_frame(f)).count();
    frames.drain(..capture);
    frames
}

fn is_capture_frame(frame: &str) -> bool {
    const OWN: &str = concat!(env!("CARGO_CRATE_NAME"), ".");
    const OWN_IMPL: &str = concat!("<", env!("CARGO_CRATE_NAME"), ".");
    frame.starts_with("std.backtrace")
        || frame.starts_with(OWN)
        || frame.starts_with(OWN_IMPL)
        || frame.starts_with("core.convert.")
        || frame.starts_with("<core.")
        || frame.starts_with("<T as core.convert.")
}

/// `path:line:column` -> `path:line`.
fn file_and_line(location: &str) -> String {
    let mut parts = location.rsplitn(3, ':');
    let column = parts.next();
    let line = parts.next();
    let path = parts.next();
    match (path, line, column) {
        (Some(path), Some(line), Some(_)) => format!("{path}:{line}"),
        _ => location.to_owned(),
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct SelfCaused;

    impl Throwable for SelfCaused {
        fn type_name(&self) -> &str {
            "demo.SelfCaused"
        }

        fn message(&self) -> Option<&str> {
            None
        }

        fn stack_trace(&self) -> &[String] {
            &[]
        }

        fn cause(&self) -> Option<&dyn Throwable> {
            Some(self)
        }
    }

    #[derive(Debug)]
    struct Link {
        name: &'static str,
        next: &'static Link,
    }

    static PING: Link = Link {
        name: "demo.Ping",
        next: &PONG,
    };
    static PONG: Link = Link {
        name: "demo.Pong",
        next: &PING,
    };

    impl Throwable for Link {
        fn type_name(&self) -> &str {
            self.name
        }

        fn message(&self) -> Option<&str> {
            None
        }

        fn stack_trace(&self) -> &[String] {
            &[]
        }

        fn cause(&self) -> Option<&dyn Throwable> {
            Some(self.next)
        }
    }

    #[test]
    fn cause_chain_lists_every_cause_in_order() {
        let fault = Fault::new("demo.Outer")
            .with_message("outer")
            .with_cause(Fault::new("demo.Middle").with_cause(Fault::new("demo.Inner").with_message("inner")));

        let chain = cause_chain(&fault);
        assert_eq!(
            chain,
            vec![
                CauseSummary {
                    type_name: "demo.Middle".to_owned(),
                    message: None
                },
                CauseSummary {
                    type_name: "demo.Inner".to_owned(),
                    message: Some("inner".to_owned())
                },
            ]
        );
    }

    #[test]
    fn self_referential_cause_terminates() {
        assert!(cause_chain(&SelfCaused).is_empty());
        let printed = printed_stack_trace(&SelfCaused);
        assert_eq!(printed, "demo.SelfCaused\n");
    }

    #[test]
    fn two_node_cycle_terminates() {
        let chain = cause_chain(&PING);
        assert_eq!(chain.len(), 1);
        assert_eq!(chain[0].type_name, "demo.Pong");
    }

    #[test]
    fn printed_trace_has_frames_and_causes() {
        let fault = Fault::new("demo.Outer")
            .with_message("boom")
            .with_frame("demo.handlers.get(handlers.rs:10)")
            .with_cause(Fault::new("demo.Io").with_frame("demo.io.read(io.rs:3)"));

        let printed = printed_stack_trace(&fault);
        assert_eq!(
            printed,
            "demo.Outer: boom\n\tat demo.handlers.get(handlers.rs:10)\nCaused by: demo.Io\n\tat demo.io.read(io.rs:3)\n"
        );
    }

    #[test]
    fn backtrace_text_becomes_frames() {
        let text = "   0: demo::handlers::raise\n             at ./src/handlers.rs:42:9\n   1: core::ops::function::FnOnce::call_once\n   2: main\n             at ./src/main.rs:7:5\n";

        let frames = frames_from_backtrace(text);
        assert_eq!(
            frames,
            vec![
                "demo.handlers.raise(./src/handlers.rs:42)".to_owned(),
                "core.ops.function.FnOnce.call_once(Unknown Source)".to_owned(),
                "main(./src/main.rs:7)".to_owned(),
            ]
        );
    }

    #[test]
    fn capture_machinery_frames_are_dropped() {
        let text = "   0: std::backtrace::Backtrace::force_capture\n             at /rustc/library/std/src/backtrace.rs:312:13\n   1: modkit_error_pages::fault::Fault::with_captured_backtrace\n             at ./src/fault.rs:160:24\n   2: <modkit_error_pages::middleware::HandlerError as core::convert::From<E>>::from\n             at ./src/middleware.rs:73:9\n   3: <T as core::convert::Into<U>>::into\n             at /rustc/library/core/src/convert/mod.rs:759:9\n   4: shop::routes::fail::{{closure}}\n             at ./src/routes.rs:45:9\n   5: modkit_error_pages::fault::helper\n             at ./src/fault.rs:1:1\n";

        let frames = frames_from_backtrace(text);
        assert_eq!(frames[0], "shop.routes.fail.{{closure}}(./src/routes.rs:45)");
        // Only the leading run is trimmed.
        assert_eq!(frames.len(), 2);
    }

    #[test]
    fn captured_backtrace_is_symbolized_on_demand() {
        let fault = Fault::new("demo.Lazy").with_frame("dropped(x.rs:1)").with_captured_backtrace();
        assert!(!fault.trace_resolved());

        let clone = fault.clone();
        let frames = fault.stack_trace();
        assert!(fault.trace_resolved());
        assert!(clone.trace_resolved());
        assert!(frames.iter().all(|f| !f.starts_with("std.backtrace")));
        assert!(!frames.iter().any(|f| f == "dropped(x.rs:1)"));
    }

    #[test]
    fn from_error_walks_sources() {
        #[derive(Debug, thiserror::Error)]
        #[error("storage failed")]
        struct StorageError {
            #[source]
            source: std::io::Error,
        }

        let err = StorageError {
            source: std::io::Error::other("disk gone"),
        };
        let fault = Fault::from_error(&err);

        assert!(fault.type_name().ends_with("StorageError"));
        assert_eq!(fault.message(), Some("storage failed"));
        let chain = cause_chain(&fault);
        assert_eq!(chain.len(), 1);
        assert_eq!(chain[0].message.as_deref(), Some("disk gone"));
    }
}
