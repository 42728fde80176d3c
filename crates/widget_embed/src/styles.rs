//! Widget stylesheet and selector scoping.
//!
//! Inside an isolation boundary the sheet is injected as-is. When the host
//! cannot provide a boundary the sheet goes into the document, so every
//! selector is first prefixed with the widget root selector to keep the
//! rules from reaching host elements.

/// Stylesheet for the launcher, panel, message list and typing indicator.
pub const WIDGET_STYLES: &str = r#"
/* launcher */
.chat-launcher {
  position: fixed;
  right: 24px;
  bottom: 24px;
  width: 64px;
  height: 64px;
  border-radius: 9999px;
  background: linear-gradient(135deg, #0f172a, #1e293b);
  color: #fff;
  z-index: 999999;
}
.chat-launcher:hover, .chat-launcher:focus-visible {
  transform: scale(1.05);
}

.chat-popup {
  position: fixed;
  right: 24px;
  bottom: 96px;
  width: 560px;
  max-width: 92vw;
  height: 720px;
  max-height: 86vh;
  display: flex;
  flex-direction: column;
  border-radius: 16px;
  border: 1px solid #e4e4e7;
  background: #fff;
  overflow: hidden;
  z-index: 999999;
  font-size: 14px;
}
.chat-header-title { font-weight: 600; color: #0f172a; }
.chat-messages { flex: 1; overflow-y: auto; padding: 16px; }
.chat-message[data-role="user"] { align-self: flex-end; background: #0f172a; color: #fff; }
.chat-message[data-role="bot"] { align-self: flex-start; background: #f1f5f9; color: #0f172a; }
.chat-input { height: 48px; border-radius: 9999px; background: #f1f5f9; }
.chat-send:disabled { opacity: 0.4; cursor: not-allowed; }

/* typing indicator */
.chat-typing span {
  display: inline-block;
  width: 6px;
  height: 6px;
  border-radius: 50%;
  background: #94a3b8;
  animation: chat-blink 1.4s infinite both;
}
.chat-typing span:nth-child(2) { animation-delay: 0.2s; }
.chat-typing span:nth-child(3) { animation-delay: 0.4s; }

@keyframes chat-blink {
  0%, 80%, 100% { opacity: 0.2; }
  40% { opacity: 1; }
}

@media (max-width: 640px) {
  .chat-popup { right: 0; bottom: 0; width: 100vw; height: 100vh; border-radius: 0; }
}
"#;

/// At-rules whose blocks hold ordinary style rules.
const NESTED_RULE_AT_RULES: &[&str] = &["media", "supports", "container", "layer", "document"];

/// Selectors that denote the document itself and map onto the root.
const DOCUMENT_SELECTORS: &[&str] = &["html", "body", ":root"];

/// Prefix every selector in `css` with `root_selector`.
///
/// Comments are dropped. `@media`/`@supports` blocks are scoped recursively;
/// `@keyframes`, `@font-face` and other at-rules are left untouched.
/// Scoping an already scoped sheet yields the same sheet.
pub fn scope_css(css: &str, root_selector: &str) -> String {
    let css = strip_comments(css);
    let mut rules = Vec::new();
    scope_block(&css, root_selector, &mut rules);
    rules.join("\n")
}

fn scope_block(css: &str, root: &str, out: &mut Vec<String>) {
    let mut rest = css;
    loop {
        rest = rest.trim_start();
        if rest.is_empty() {
            break;
        }

        let Some(open) = find_top_level(rest, |b| b == b'{' || b == b';') else {
            out.push(rest.trim_end().to_string());
            break;
        };

        // statement at-rules such as @import or @charset
        if rest.as_bytes()[open] == b';' {
            out.push(rest[..=open].trim().to_string());
            rest = &rest[open + 1..];
            continue;
        }

        let prelude = rest[..open].trim();
        let Some(close) = matching_brace(rest, open) else {
            log::warn!("Unbalanced block in widget stylesheet; keeping remainder verbatim");
            out.push(rest.trim_end().to_string());
            break;
        };
        let body = &rest[open + 1..close];

        if let Some(at_rule) = prelude.strip_prefix('@') {
            let name = at_rule
                .split(|c: char| c.is_whitespace() || c == '(')
                .next()
                .unwrap_or_default()
                .to_ascii_lowercase();
            if NESTED_RULE_AT_RULES.contains(&name.as_str()) {
                let mut inner = Vec::new();
                scope_block(body, root, &mut inner);
                out.push(format!("{} {{\n{}\n}}", prelude, inner.join("\n")));
            } else {
                out.push(format!("{} {{{}}}", prelude, body));
            }
        } else {
            out.push(format!("{} {{{}}}", scope_selector_list(prelude, root), body));
        }

        rest = &rest[close + 1..];
    }
}

fn scope_selector_list(list: &str, root: &str) -> String {
    let mut scoped: Vec<String> = Vec::new();
    for selector in split_top_level_commas(list) {
        let selector = selector.trim();
        if selector.is_empty() {
            continue;
        }
        let selector = scope_selector(selector, root);
        if !scoped.contains(&selector) {
            scoped.push(selector);
        }
    }
    scoped.join(", ")
}

fn scope_selector(selector: &str, root: &str) -> String {
    if is_scoped(selector, root) {
        return selector.to_string();
    }
    for document in DOCUMENT_SELECTORS {
        if selector == *document {
            return root.to_string();
        }
        if let Some(rest) = selector.strip_prefix(document) {
            if rest.starts_with(char::is_whitespace) || rest.starts_with('>') {
                return format!("{} {}", root, rest.trim_start());
            }
        }
    }
    format!("{} {}", root, selector)
}

fn is_scoped(selector: &str, root: &str) -> bool {
    match selector.strip_prefix(root) {
        Some(rest) => !rest.starts_with(|c: char| c.is_alphanumeric() || c == '-' || c == '_'),
        None => false,
    }
}

fn strip_comments(css: &str) -> String {
    let mut out = String::with_capacity(css.len());
    let mut rest = css;
    while let Some(start) = rest.find("/*") {
        out.push_str(&rest[..start]);
        match rest[start + 2..].find("*/") {
            Some(end) => rest = &rest[start + 2 + end + 2..],
            None => {
                rest = "";
                break;
            }
        }
    }
    out.push_str(rest);
    out
}

/// Byte index of the first byte matching `pred` outside strings and
/// parentheses.
fn find_top_level(text: &str, pred: impl Fn(u8) -> bool) -> Option<usize> {
    let mut quote: Option<u8> = None;
    let mut depth = 0usize;
    for (i, &b) in text.as_bytes().iter().enumerate() {
        match quote {
            Some(q) if b == q => quote = None,
            Some(_) => {}
            None => match b {
                b'"' | b'\'' => quote = Some(b),
                b'(' | b'[' => depth += 1,
                b')' | b']' => depth = depth.saturating_sub(1),
                _ if depth == 0 && pred(b) => return Some(i),
                _ => {}
            },
        }
    }
    None
}

fn matching_brace(text: &str, open: usize) -> Option<usize> {
    let mut quote: Option<u8> = None;
    let mut depth = 0usize;
    for (i, &b) in text.as_bytes().iter().enumerate().skip(open) {
        match quote {
            Some(q) if b == q => quote = None,
            Some(_) => {}
            None => match b {
                b'"' | b'\'' => quote = Some(b),
                b'{' => depth += 1,
                b'}' => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(i);
                    }
                }
                _ => {}
            },
        }
    }
    None
}

fn split_top_level_commas(list: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut rest = list;
    while let Some(comma) = find_top_level(rest, |b| b == b',') {
        parts.push(&rest[..comma]);
        rest = &rest[comma + 1..];
    }
    parts.push(rest);
    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROOT: &str = "#kalibry-chat-widget-root";

    #[test]
    fn prefixes_simple_rule() {
        assert_eq!(
            scope_css(".chat-popup { color: red; }", ROOT),
            "#kalibry-chat-widget-root .chat-popup { color: red; }"
        );
    }

    #[test]
    fn prefixes_each_selector_in_list() {
        assert_eq!(
            scope_css("a, .b > c { x: y }", ROOT),
            "#kalibry-chat-widget-root a, #kalibry-chat-widget-root .b > c { x: y }"
        );
    }

    #[test]
    fn commas_inside_functions_do_not_split() {
        assert_eq!(
            scope_css(":is(h1, h2) span { x: y }", "#r"),
            "#r :is(h1, h2) span { x: y }"
        );
    }

    #[test]
    fn document_selectors_map_to_root() {
        assert_eq!(scope_css("html, body { margin: 0 }", "#r"), "#r { margin: 0 }");
        assert_eq!(scope_css(":root { --x: 1 }", "#r"), "#r { --x: 1 }");
        assert_eq!(scope_css("body > div { a: b }", "#r"), "#r > div { a: b }");
    }

    #[test]
    fn media_blocks_are_scoped_recursively() {
        let scoped = scope_css("@media (max-width: 640px) { .a { b: c } }", "#r");
        assert_eq!(scoped, "@media (max-width: 640px) {\n#r .a { b: c }\n}");
    }

    #[test]
    fn keyframes_and_font_face_are_untouched() {
        let css = "@keyframes blink { 0%, 100% { opacity: 0 } 50% { opacity: 1 } }\n@font-face { font-family: X; src: url(x.woff); }";
        let scoped = scope_css(css, "#r");
        assert!(scoped.contains("@keyframes blink { 0%, 100% { opacity: 0 } 50% { opacity: 1 } }"));
        assert!(scoped.contains("@font-face { font-family: X; src: url(x.woff); }"));
        assert!(!scoped.contains("#r 0%"));
    }

    #[test]
    fn statement_at_rules_are_kept() {
        let scoped = scope_css("@charset \"utf-8\"; .a { b: c }", "#r");
        assert_eq!(scoped, "@charset \"utf-8\";\n#r .a { b: c }");
    }

    #[test]
    fn comments_are_removed() {
        assert_eq!(scope_css("/* x { } */ .a { b: c }", "#r"), "#r .a { b: c }");
    }

    #[test]
    fn braces_in_strings_do_not_confuse_blocks() {
        assert_eq!(
            scope_css(".a::after { content: \"}\" } .b { c: d }", "#r"),
            "#r .a::after { content: \"}\" }\n#r .b { c: d }"
        );
    }

    #[test]
    fn scoping_is_idempotent() {
        let once = scope_css(WIDGET_STYLES, ROOT);
        assert_eq!(scope_css(&once, ROOT), once);
    }

    #[test]
    fn similar_ids_are_not_treated_as_scoped() {
        assert_eq!(scope_css("#r2 { a: b }", "#r"), "#r #r2 { a: b }");
    }

    #[test]
    fn widget_styles_stay_under_root_when_scoped() {
        let scoped = scope_css(WIDGET_STYLES, ROOT);
        assert!(scoped.contains("#kalibry-chat-widget-root .chat-launcher {"));
        assert!(scoped.contains("#kalibry-chat-widget-root .chat-popup {"));
        assert!(scoped.contains("@keyframes chat-blink"));
        assert!(!scoped.contains("/* launcher */"));
    }
}
