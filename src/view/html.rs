use super::{Element, Node};

const VOID_TAGS: &[&str] = &["img", "input", "br", "meta", "link", "hr"];
const RAW_TEXT_TAGS: &[&str] = &["script", "style"];

pub fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

pub fn render_html(node: &Node) -> String {
    let mut out = String::new();
    write_node(node, &mut out, false);
    out
}

/// Wraps `body` in a standalone UTF-8 document.
pub fn render_document(title: &str, head_extra: &[Node], body: &Node) -> String {
    let mut out = String::from("<!DOCTYPE html>\n<html lang=\"ko\"><head><meta charset=\"utf-8\">");
    out.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">");
    out.push_str("<title>");
    out.push_str(&escape(title));
    out.push_str("</title>");
    for node in head_extra {
        out.push_str(&render_html(node));
    }
    out.push_str("</head><body>");
    out.push_str(&render_html(body));
    out.push_str("</body></html>\n");
    out
}

fn write_node(node: &Node, out: &mut String, raw: bool) {
    match node {
        Node::Text(value) if raw => out.push_str(value),
        Node::Text(value) => out.push_str(&escape(value)),
        Node::Element(element) => write_element(element, out),
    }
}

fn write_element(element: &Element, out: &mut String) {
    out.push('<');
    out.push_str(element.tag);
    for (name, value) in &element.attrs {
        out.push(' ');
        out.push_str(name);
        if !value.is_empty() {
            out.push_str("=\"");
            out.push_str(&escape(value));
            out.push('"');
        }
    }
    out.push('>');

    if VOID_TAGS.contains(&element.tag) {
        return;
    }

    let raw = RAW_TEXT_TAGS.contains(&element.tag);
    for child in &element.children {
        write_node(child, out, raw);
    }
    out.push_str("</");
    out.push_str(element.tag);
    out.push('>');
}
