use crate::model::{Creator, ExportItem};

/// Strips HTML markup down to plain text. Closing block tags and `<br>`
/// become line breaks, common entities are decoded, and blank-line runs are
/// collapsed. Good enough for the rich-text bodies the editor produces; not
/// a general HTML parser.
pub fn strip_html(input: &str) -> String {
    let mut text = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(start) = rest.find('<') {
        text.push_str(&rest[..start]);
        rest = &rest[start..];
        match rest.find('>') {
            Some(end) => {
                let tag = rest[1..end].trim().to_ascii_lowercase();
                if is_block_break(&tag) {
                    text.push('\n');
                }
                rest = &rest[end + 1..];
            }
            None => {
                // Unterminated angle bracket, keep it as literal text.
                break;
            }
        }
    }
    text.push_str(rest);
    normalize_whitespace(&decode_entities(&text))
}

fn is_block_break(tag: &str) -> bool {
    let name = tag
        .trim_start_matches('/')
        .split(|ch: char| ch.is_whitespace() || ch == '/')
        .next()
        .unwrap_or("");
    matches!(
        name,
        "p" | "br" | "div" | "li" | "ul" | "ol" | "blockquote" | "h1" | "h2" | "h3" | "h4"
    )
}

fn decode_entities(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(start) = rest.find('&') {
        out.push_str(&rest[..start]);
        rest = &rest[start..];
        let semicolon = rest.find(';').filter(|end| *end <= 9);
        match semicolon {
            Some(end) => {
                let entity = &rest[1..end];
                match entity {
                    "amp" => out.push('&'),
                    "lt" => out.push('<'),
                    "gt" => out.push('>'),
                    "quot" => out.push('"'),
                    "apos" | "#39" => out.push('\''),
                    "nbsp" => out.push(' '),
                    _ => out.push_str(&rest[..end + 1]),
                }
                rest = &rest[end + 1..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn normalize_whitespace(input: &str) -> String {
    let cleaned = input.replace('\r', "");
    let mut lines: Vec<&str> = Vec::new();
    let mut blank_run = 0usize;
    for line in cleaned.lines().map(str::trim) {
        if line.is_empty() {
            blank_run += 1;
            if blank_run > 1 {
                continue;
            }
        } else {
            blank_run = 0;
        }
        lines.push(line);
    }
    lines.join("\n").trim_matches('\n').to_string()
}

/// Canonical public URL of one submission.
pub fn canonical_url(base_url: &str, creator: &Creator, item_id: &str) -> String {
    format!(
        "{}/creators/{}/s/{}",
        base_url.trim_end_matches('/'),
        creator.handle(),
        item_id
    )
}

/// Plain-text caption for one exported item: title, stripped body,
/// attribution with the canonical URL, and the prompt words when the item
/// answered a full weekly prompt.
pub fn build_caption(item: &ExportItem, creator: &Creator, base_url: &str) -> String {
    let mut lines: Vec<String> = Vec::new();
    lines.push(item.title.clone().unwrap_or_else(|| "Untitled".to_string()));
    lines.push(String::new());
    if let Some(body) = item.body_html.as_deref() {
        let stripped = strip_html(body);
        if !stripped.is_empty() {
            lines.push(stripped);
            lines.push(String::new());
        }
    }
    lines.push(format!(
        "{} — View on Create Spot: {}",
        creator.name,
        canonical_url(base_url, creator, &item.id)
    ));
    lines.push(String::new());
    if let Some(words) = item.prompt_words.as_ref() {
        let [first, second, third] = &words.0;
        lines.push(format!("Prompt: {first}, {second}, {third}"));
    }
    lines.join("\n")
}
