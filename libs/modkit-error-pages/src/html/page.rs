//! Markup of the HTML error page.
//!
//! Pages are standalone: styles are inlined and nothing is fetched.

use std::fmt::Write;

use super::key::{Diagnostics, HtmlRenderKey};
use crate::sanitize::escape_html;
use crate::snippet::CodeSnippet;

pub(super) const CSS: &str = r#"
*, *::before, *::after { box-sizing: border-box; }
* { margin: 0; }
html { font-size: 16px; }
body {
  background: #2559a7;
  color: #fff;
  display: grid;
  font-family: -apple-system, "Helvetica Neue", Helvetica, sans-serif;
  font-size: clamp(1rem, 2.5vw, 2rem);
  -webkit-font-smoothing: antialiased;
  line-height: 1.4;
  min-height: 100vh;
  place-items: center;
  text-rendering: optimizeLegibility;
  -webkit-text-size-adjust: 100%;
}
a { color: inherit; font-weight: 700; text-decoration: underline; }
b, strong { font-weight: 700; }
main { display: grid; gap: 1em; padding: 2em; place-items: center; text-align: center; }
main header { width: min(100%, 18em); }
main header h2 { margin-top: -0.95em; font-size: 6em; opacity: .2; }
main article { margin-top: -0.95em; width: min(100%, 30em); }
main article p { font-size: 75%; }
"#;

/// Only emitted together with the diagnostic sections.
pub(super) const DIAGNOSTICS_CSS: &str = r#"
main section { width: min(100%, 60em); text-align: left; font-size: 50%; }
main section h3 { margin: 1em 0 .5em; }
main section table { border-collapse: collapse; width: 100%; }
main section td { border-top: 1px solid rgba(255,255,255,.2); padding: .2em .5em; vertical-align: top; word-break: break-all; }
main section pre { background: rgba(0,0,0,.25); padding: 1em; overflow-x: auto; white-space: pre; }
.snippet { margin-bottom: 1em; }
.snippet-header { font-family: monospace; opacity: .8; }
.snippet .line { display: block; }
.snippet .line-number { display: inline-block; width: 4em; opacity: .5; user-select: none; }
.snippet .line.highlight { background: rgba(255,80,80,.45); }
"#;

pub(super) fn write_document(
    out: &mut String,
    key: &HtmlRenderKey,
    title: &str,
    snippets: &[CodeSnippet],
) -> std::fmt::Result {
    write!(
        out,
        "<!doctype html><html lang=\"{lang}\"><head><title>{code} - {title}</title>\
         <meta charset=\"utf-8\">\
         <meta name=\"viewport\" content=\"initial-scale=1, width=device-width\">\
         <meta name=\"robots\" content=\"noindex, nofollow\">\
         <style>{CSS}</style>",
        lang = escape_html(&key.locale),
        code = key.status_code,
    )?;
    if key.diagnostics.is_some() {
        write!(out, "<style>{DIAGNOSTICS_CSS}</style>")?;
    }
    out.push_str("</head><body><main>");

    write!(
        out,
        "<header><h1>{title}</h1><h2>{code}</h2></header>",
        code = key.status_code
    )?;
    write_article(out, key);

    if let Some(diagnostics) = &key.diagnostics {
        write_request_info(out, diagnostics)?;
        write_stack_trace(out, &diagnostics.trace);
        write_snippets(out, snippets)?;
    }

    out.push_str("</main></body></html>");
    Ok(())
}

fn write_article(out: &mut String, key: &HtmlRenderKey) {
    out.push_str("<article>");
    for message in &key.messages {
        out.push_str(message);
        out.push_str("<br/>");
    }
    if key.error.is_some() || key.error_bold.is_some() {
        out.push_str("<p>");
        if let Some(bold) = &key.error_bold {
            out.push_str("<strong>");
            out.push_str(bold);
            out.push_str("</strong>. ");
        }
        if let Some(error) = &key.error {
            out.push_str(error);
            out.push('.');
        }
        out.push_str("</p>");
    }
    out.push_str("</article>");
}

fn write_request_info(out: &mut String, diagnostics: &Diagnostics) -> std::fmt::Result {
    write!(
        out,
        "<section class=\"request-info\"><h3>Request</h3><table>\
         <tr><td>Method</td><td>{}</td></tr><tr><td>URI</td><td>{}</td></tr>",
        escape_html(&diagnostics.method),
        escape_html(&diagnostics.uri),
    )?;
    for (name, value) in &diagnostics.headers {
        write!(
            out,
            "<tr><td>{}</td><td>{}</td></tr>",
            escape_html(name),
            escape_html(value)
        )?;
    }
    out.push_str("</table></section>");
    Ok(())
}

fn write_stack_trace(out: &mut String, trace: &[String]) {
    if trace.is_empty() {
        return;
    }
    out.push_str("<section class=\"stacktrace\"><h3>Stack trace</h3><pre>");
    for line in trace {
        out.push_str(&escape_html(line));
        out.push('\n');
    }
    out.push_str("</pre></section>");
}

fn write_snippets(out: &mut String, snippets: &[CodeSnippet]) -> std::fmt::Result {
    if snippets.is_empty() {
        return Ok(());
    }
    out.push_str("<section class=\"code-snippet\"><h3>Source</h3>");
    for snippet in snippets {
        write!(
            out,
            "<div class=\"snippet\"><div class=\"snippet-header\">{} ({}:{})</div><pre>",
            escape_html(&snippet.class_name),
            escape_html(&snippet.file_name),
            snippet.line_number,
        )?;
        for line in &snippet.lines {
            let class = if line.highlighted {
                "line highlight"
            } else {
                "line"
            };
            write!(
                out,
                "<span class=\"{class}\"><span class=\"line-number\">{}</span>{}</span>",
                line.number,
                escape_html(&line.text),
            )?;
        }
        out.push_str("</pre></div>");
    }
    out.push_str("</section>");
    Ok(())
}
