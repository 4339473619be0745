// ABOUTME: Adds `defer` to external scripts that do not already load asynchronously.
// ABOUTME: Module scripts, excluded legacy libraries, and the facade runtime are never touched.

use dom_query::{Document, NodeRef};

use crate::dom::compiled::select_all;
use crate::dom::tree::attr;
use crate::error::OptimizeError;
use crate::pipeline::PassContext;
use crate::runtime::RUNTIME_ID;

fn should_defer(script: &NodeRef, exclusions: &[String]) -> bool {
    if script.has_attr("async") || script.has_attr("defer") {
        return false;
    }
    if attr(script, "id").as_deref() == Some(RUNTIME_ID) {
        return false;
    }
    if let Some(ty) = attr(script, "type") {
        let ty = ty.trim().to_ascii_lowercase();
        if !ty.is_empty() && ty != "text/javascript" && ty != "application/javascript" {
            return false;
        }
    }
    let Some(src) = attr(script, "src") else {
        return false;
    };
    let src = src.to_ascii_lowercase();
    !exclusions
        .iter()
        .any(|pattern| src.contains(&pattern.to_ascii_lowercase()))
}

pub fn run(doc: &Document, ctx: &mut PassContext) -> Result<(), OptimizeError> {
    let mut deferred = 0usize;
    for script in select_all(doc, "script[src]") {
        if ctx.in_preserved_link(&script) {
            continue;
        }
        if should_defer(&script, &ctx.config.defer_exclusions) {
            script.set_attr("defer", "");
            deferred += 1;
        }
    }
    if deferred > 0 {
        ctx.log(format!(
            "Deferred {} render-blocking external script(s).",
            deferred
        ));
    }
    Ok(())
}
