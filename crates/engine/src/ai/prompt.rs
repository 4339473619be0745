// ABOUTME: Prompt text for the Gemini collaborator and cleanup of what the model sends back.
// ABOUTME: Model output is often wrapped in markdown code fences; strip_code_fences removes them.

use crate::options::OptionKey;

pub(crate) fn semantic_rewrite(html: &str) -> String {
    format!(
        "You are an expert HTML developer. Rewrite the following HTML to use modern, semantic \
HTML5 tags. For example, convert <b> to <strong> and <i> to <em>. Keep the structure and \
content identical. Keep every <iframe>, <script>, <blockquote class=\"twitter-tweet\">, \
<blockquote class=\"instagram-media\">, <blockquote class=\"tiktok-embed\"> and \
<blockquote class=\"reddit-embed-bq\"> element exactly as it is. Return only the HTML, with \
no explanation or surrounding text.\n\nHTML:\n\n{}",
        html
    )
}

pub(crate) fn optimization_plan(report: &str) -> String {
    let keys = OptionKey::ALL
        .iter()
        .map(|k| k.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "You are a web performance engineer. Analyze this PageSpeed Insights report and \
produce an optimization plan for the page's HTML. Respond with a JSON array only. Each element \
is an object with \"title\", \"description\", \"priority\" (one of \"High\", \"Medium\", \
\"Low\") and \"optionKeys\", an array naming the cleaner options that address the issue, \
chosen from: {}.\n\nReport:\n\n{}",
        keys, report
    )
}

/// Remove a surrounding markdown code fence (```html … ```), if any.
pub fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // drop the info string (html, json, ...)
    let body = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => rest,
    };
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}
