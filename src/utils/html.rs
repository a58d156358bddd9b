//! Rendered-text approximation for parsed HTML.

use scraper::{ElementRef, Html, Node, Selector};

/// Elements whose contents never render.
const SKIPPED: &[&str] = &[
    "script", "style", "noscript", "template", "head", "title", "iframe",
];

/// Elements that start and end their own line.
const BLOCKS: &[&str] = &[
    "address", "article", "aside", "blockquote", "caption", "dd", "div", "dl", "dt",
    "fieldset", "figcaption", "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5",
    "h6", "header", "hr", "label", "legend", "li", "main", "nav", "ol", "p", "pre",
    "section", "table", "tbody", "tfoot", "thead", "tr", "ul",
];

/// Table cells are separated by a tab on the row's line.
const CELLS: &[&str] = &["td", "th"];

/// Text of an element roughly as a browser's `innerText` would render it.
///
/// Block elements break lines, table cells are tab-separated, whitespace is
/// collapsed and blank lines are dropped.
pub fn visible_text(element: ElementRef<'_>) -> String {
    let mut raw = String::new();
    collect(element, &mut raw);
    normalize(&raw)
}

/// Visible text of the document body (or the whole document when the parse
/// produced no body).
pub fn body_text(document: &Html) -> String {
    match Selector::parse("body") {
        Ok(selector) => match document.select(&selector).next() {
            Some(body) => visible_text(body),
            None => visible_text(document.root_element()),
        },
        Err(_) => visible_text(document.root_element()),
    }
}

fn collect(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        match child.value() {
            // Source line breaks collapse like any other whitespace.
            Node::Text(text) => out.extend(text.chars().map(|c| {
                if c.is_whitespace() {
                    ' '
                } else {
                    c
                }
            })),
            Node::Element(el) => {
                let name = el.name();
                if SKIPPED.contains(&name) || is_hidden(el) {
                    continue;
                }
                if name == "br" {
                    out.push('\n');
                    continue;
                }
                let Some(child_ref) = ElementRef::wrap(child) else {
                    continue;
                };

                let block = BLOCKS.contains(&name);
                if block {
                    out.push('\n');
                }
                collect(child_ref, out);
                if block {
                    out.push('\n');
                } else if CELLS.contains(&name) {
                    out.push('\t');
                }
            }
            _ => {}
        }
    }
}

fn is_hidden(el: &scraper::node::Element) -> bool {
    if el.attr("hidden").is_some() {
        return true;
    }
    el.attr("style")
        .map(|style| {
            let style: String = style
                .chars()
                .filter(|c| !c.is_whitespace())
                .collect::<String>()
                .to_lowercase();
            style.contains("display:none") || style.contains("visibility:hidden")
        })
        .unwrap_or(false)
}

fn normalize(raw: &str) -> String {
    raw.split('\n')
        .filter_map(|line| {
            let cells: Vec<String> = line
                .split('\t')
                .map(|cell| cell.split_whitespace().collect::<Vec<_>>().join(" "))
                .filter(|cell| !cell.is_empty())
                .collect();
            if cells.is_empty() {
                None
            } else {
                Some(cells.join("\t"))
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}
