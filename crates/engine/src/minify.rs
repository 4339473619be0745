// ABOUTME: Minifiers for inline <style> and <script> content, backed by lightningcss and minify-js.
// ABOUTME: Anything that fails to parse is returned unchanged.

use lightningcss::stylesheet::{ParserOptions, PrinterOptions, StyleSheet};
use minify_js::{Session, TopLevelMode};

/// Returns true if an inline script with this `type` should be minified.
///
/// External scripts have no inline body worth touching, and unknown types
/// (templates, shaders, data islands) are left byte-for-byte.
pub fn should_minify_script(script_type: Option<&str>, has_src: bool) -> bool {
    if has_src {
        return false;
    }
    match script_type.map(|t| t.trim().to_ascii_lowercase()) {
        None => true,
        Some(t) => matches!(
            t.as_str(),
            "" | "text/javascript"
                | "application/javascript"
                | "module"
                | "application/json"
                | "application/ld+json"
        ),
    }
}

/// Minify a stylesheet.
pub fn minify_css(input: &str) -> String {
    let stylesheet = match StyleSheet::parse(input, ParserOptions::default()) {
        Ok(sheet) => sheet,
        Err(err) => {
            tracing::debug!(error = %err, "inline CSS did not parse, kept as is");
            return input.to_string();
        }
    };

    match stylesheet.to_css(PrinterOptions {
        minify: true,
        ..PrinterOptions::default()
    }) {
        Ok(result) => result.code,
        Err(err) => {
            tracing::debug!(error = %err, "inline CSS did not print, kept as is");
            input.to_string()
        }
    }
}

/// Minify an inline script body according to its `type`.
///
/// JSON data blocks are compacted; `module` scripts are minified with
/// module scoping, everything else as a classic script sharing the page's
/// global scope.
pub fn minify_script(input: &str, script_type: Option<&str>) -> String {
    let ty = script_type
        .map(|t| t.trim().to_ascii_lowercase())
        .unwrap_or_default();
    match ty.as_str() {
        "application/json" | "application/ld+json" => minify_json(input),
        "module" => minify_js(input, TopLevelMode::Module),
        _ => minify_js(input, TopLevelMode::Global),
    }
}

fn minify_js(input: &str, mode: TopLevelMode) -> String {
    if input.trim().is_empty() {
        return input.to_string();
    }

    let session = Session::new();
    let mut out = Vec::new();
    match minify_js::minify(&session, mode, input.as_bytes(), &mut out) {
        Ok(_) => match String::from_utf8(out) {
            // Never grow the page.
            Ok(minified) if minified.len() < input.len() => minified,
            _ => input.to_string(),
        },
        Err(err) => {
            tracing::debug!(error = ?err, "inline script did not parse, kept as is");
            input.to_string()
        }
    }
}

fn minify_json(input: &str) -> String {
    match serde_json::from_str::<serde_json::Value>(input) {
        Ok(value) => serde_json::to_string(&value).unwrap_or_else(|_| input.to_string()),
        Err(_) => input.to_string(),
    }
}
