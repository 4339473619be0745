// ABOUTME: The companion client-side script that restores facade placeholders in the browser.
// ABOUTME: Its lookup tables are generated from FacadeKind so the markup contract and the script cannot drift.

use dom_query::Document;
use once_cell::sync::Lazy;

use crate::dom::tree::fragment_root;
use crate::embeds::kinds::{FacadeKind, Trigger};

/// Element id of the injected runtime script.
pub const RUNTIME_ID: &str = "leanpost-facade-runtime";

/// Bumped whenever the placeholder contract changes.
pub const RUNTIME_VERSION: u32 = 2;

// Provider rescans, keyed by facade kind.
fn rescan_js(kind: FacadeKind) -> &'static str {
    match kind {
        FacadeKind::Tweet => {
            "function(p){if(window.twttr&&window.twttr.widgets){window.twttr.widgets.load(p);}}"
        }
        FacadeKind::Instagram => {
            "function(){if(window.instgrm&&window.instgrm.Embeds){window.instgrm.Embeds.process();}}"
        }
        _ => "null",
    }
}

fn tables() -> String {
    let payloads = FacadeKind::ALL
        .iter()
        .filter_map(|k| k.payload_attr().map(|a| format!("\"{}\":\"{}\"", k.as_str(), a)))
        .collect::<Vec<_>>()
        .join(",");
    let loaders = FacadeKind::ALL
        .iter()
        .filter_map(|k| {
            k.loader().map(|l| {
                format!(
                    "\"{}\":{{id:\"{}\",src:\"{}\",rescan:{}}}",
                    k.as_str(),
                    l.id,
                    l.src,
                    rescan_js(*k)
                )
            })
        })
        .collect::<Vec<_>>()
        .join(",");
    let selector = |trigger: Trigger| {
        FacadeKind::ALL
            .iter()
            .filter(|k| k.trigger() == trigger)
            .map(|k| format!(".{}", k.class_name()))
            .collect::<Vec<_>>()
            .join(",")
    };
    format!(
        "var PAYLOAD={{{}}};var LOADERS={{{}}};var CLICK=\"{}\";var VISIBLE=\"{}\";",
        payloads,
        loaders,
        selector(Trigger::Click),
        selector(Trigger::Visible)
    )
}

const RUNTIME_BODY: &str = r#"function decode(b){var s=atob(b),u=new Uint8Array(s.length);for(var i=0;i<s.length;i++){u[i]=s.charCodeAt(i);}return new TextDecoder("utf-8").decode(u);}
function load(l,parent){var done=function(){if(l.rescan){l.rescan(parent);}};if(document.getElementById(l.id)){done();return;}var s=document.createElement("script");s.id=l.id;s.src=l.src;s.async=true;s.onload=done;document.body.appendChild(s);}
function youtube(el){var src=el.getAttribute("data-original-src")||("https://www.youtube.com/embed/"+el.getAttribute("data-video-id"));var f=document.createElement("iframe");f.src=src+(src.indexOf("?")<0?"?":"&")+"autoplay=1";f.setAttribute("allow","accelerometer; autoplay; clipboard-write; encrypted-media; gyroscope; picture-in-picture");f.setAttribute("allowfullscreen","");f.setAttribute("frameborder","0");f.style.cssText="position:absolute;top:0;left:0;width:100%;height:100%;border:0;";el.innerHTML="";el.removeAttribute("role");el.removeAttribute("tabindex");el.removeAttribute("data-facade");el.appendChild(f);}
function background(el,a){el.style.backgroundImage=decode(el.getAttribute(a));el.removeAttribute(a);el.removeAttribute("data-facade");el.classList.remove("lazy-bg-image");}
function restore(el){var k=el.getAttribute("data-facade");if(!k){return;}try{if(k==="youtube"){youtube(el);return;}var a=PAYLOAD[k],p=a&&el.getAttribute(a);if(!p){return;}if(k==="background-image"){background(el,a);return;}var t=document.createElement("template");t.innerHTML=decode(p);var parent=el.parentNode;parent.replaceChild(t.content,el);if(LOADERS[k]){load(LOADERS[k],parent);}}catch(e){console.error("leanpost: could not restore "+k+" embed",e);}}
function activate(e){var el=e.target&&e.target.closest?e.target.closest(CLICK):null;if(el&&el.getAttribute("data-facade")){e.preventDefault();restore(el);}}
document.addEventListener("click",activate);
document.addEventListener("keydown",function(e){if(e.key==="Enter"||e.key===" "){activate(e);}});
function watch(){var els=document.querySelectorAll(VISIBLE);if(!("IntersectionObserver" in window)){for(var i=0;i<els.length;i++){restore(els[i]);}return;}var io=new IntersectionObserver(function(entries){entries.forEach(function(en){if(en.isIntersecting){io.unobserve(en.target);restore(en.target);}});},{rootMargin:"200px 0px"});for(var j=0;j<els.length;j++){io.observe(els[j]);}}
if(document.readyState==="loading"){document.addEventListener("DOMContentLoaded",watch);}else{watch();}"#;

static RUNTIME_SCRIPT: Lazy<String> = Lazy::new(|| {
    format!(
        r#"<script id="{id}" data-version="{version}">(function(){{"use strict";{tables}
{body}
}})();</script>"#,
        id = RUNTIME_ID,
        version = RUNTIME_VERSION,
        tables = tables(),
        body = RUNTIME_BODY,
    )
});

/// The complete `<script>` element appended to documents containing placeholders.
pub fn runtime_script() -> &'static str {
    RUNTIME_SCRIPT.as_str()
}

/// True if the fragment contains at least one placeholder.
pub fn needs_runtime(doc: &Document) -> bool {
    fragment_root(doc)
        .descendants()
        .iter()
        .any(|n| n.is_element() && FacadeKind::of(n).is_some())
}

/// Append the runtime once. Any earlier copy has already been removed by the guard.
pub fn inject(html: &mut String) {
    html.push_str(runtime_script());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::tree::parse_fragment;

    #[test]
    fn test_script_knows_every_contract_name() {
        let script = runtime_script();
        for kind in FacadeKind::ALL {
            assert!(script.contains(kind.class_name()), "{}", kind);
            if let Some(attr) = kind.payload_attr() {
                assert!(script.contains(attr), "{}", attr);
            }
            if let Some(loader) = kind.loader() {
                assert!(script.contains(loader.id), "{}", loader.id);
                assert!(script.contains(loader.src), "{}", loader.src);
            }
        }
        assert!(script.contains("data-original-src"));
        assert!(script.contains("data-video-id"));
    }

    #[test]
    fn test_script_element_shape() {
        let script = runtime_script();
        assert!(script.starts_with(r#"<script id="leanpost-facade-runtime" data-version="2">"#));
        assert!(script.ends_with("</script>"));
        assert_eq!(script.matches("</script>").count(), 1);
    }

    #[test]
    fn test_needs_runtime() {
        assert!(needs_runtime(&parse_fragment(
            r#"<p><span class="lazy-bg-image" data-facade="background-image">x</span></p>"#
        )));
        assert!(!needs_runtime(&parse_fragment("<p>plain</p>")));
    }

    #[test]
    fn test_injected_script_parses_back_as_one_element() {
        let mut html = "<p>x</p>".to_string();
        inject(&mut html);
        let doc = parse_fragment(&html);
        let scripts = crate::dom::compiled::select_all(&doc, "#leanpost-facade-runtime");
        assert_eq!(scripts.len(), 1);
    }
}
