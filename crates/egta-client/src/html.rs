//! Scraping helpers for the few site pages that only render HTML.

/// Id of the game page returned after creating a game (`<div id="game_12">`).
pub(crate) fn game_id(page: &str) -> Option<u64> {
    const MARKER: &str = "id=\"game_";
    let start = page.to_ascii_lowercase().find(MARKER)? + MARKER.len();
    let digits: String = page[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

/// Cell texts for every row of the page's first `<tbody>`.
pub(crate) fn table_rows(page: &str) -> Vec<Vec<String>> {
    let Some(body) = elements(page, "tbody").into_iter().next() else {
        return Vec::new();
    };
    elements(body, "tr")
        .into_iter()
        .map(|row| elements(row, "td").into_iter().map(text_content).collect())
        .collect()
}

/// `Key: value` paragraphs inside the `<div class="{class}">` block,
/// including any nested divs.
pub(crate) fn detail_fields(page: &str, class: &str) -> Vec<(String, String)> {
    let lower = page.to_ascii_lowercase();
    let opening = format!("<div class=\"{}\"", class.to_ascii_lowercase());
    let Some(start) = lower.find(&opening) else {
        return Vec::new();
    };
    let Some(gt) = lower[start..].find('>') else {
        return Vec::new();
    };
    let inner = start + gt + 1;
    let end = find_close(&lower, "div", inner).map_or(page.len(), |(end, _)| end);
    elements(&page[inner..end], "p")
        .into_iter()
        .filter_map(|paragraph| {
            let text = text_content(paragraph);
            let (key, value) = text.split_once(':')?;
            Some((key.trim().to_string(), value.trim().to_string()))
        })
        .collect()
}

/// Inner markup of each outermost `<tag ...>...</tag>` element. Tag names
/// match case-insensitively; a nested element of the same tag stays inside
/// its parent.
fn elements<'a>(html: &'a str, tag: &str) -> Vec<&'a str> {
    // ascii lowercasing keeps byte offsets valid for `html`
    let lower = html.to_ascii_lowercase();
    let tag = tag.to_ascii_lowercase();
    let mut found = Vec::new();
    let mut pos = 0;
    while let Some(start) = find_open(&lower, &tag, pos) {
        let Some(gt) = lower[start..].find('>') else { break };
        let inner = start + gt + 1;
        let Some((end, next)) = find_close(&lower, &tag, inner) else { break };
        found.push(&html[inner..end]);
        pos = next;
    }
    found
}

/// Offset of the next opening `<tag` at or after `from`. `<tr` does not
/// match `<track`.
fn find_open(lower: &str, tag: &str, from: usize) -> Option<usize> {
    let open = format!("<{tag}");
    let mut pos = from;
    while let Some(at) = lower[pos..].find(&open) {
        let at = pos + at;
        let after = &lower[at + open.len()..];
        if after.starts_with(|c: char| c == '>' || c.is_ascii_whitespace()) {
            return Some(at);
        }
        pos = at + open.len();
    }
    None
}

/// Start and end of the `</tag>` closing an element whose content begins at
/// `from`, skipping over nested elements of the same tag.
fn find_close(lower: &str, tag: &str, from: usize) -> Option<(usize, usize)> {
    let close = format!("</{tag}>");
    let mut depth = 0usize;
    let mut pos = from;
    loop {
        let close_at = pos + lower[pos..].find(&close)?;
        match find_open(lower, tag, pos) {
            Some(open_at) if open_at < close_at => {
                depth += 1;
                pos = open_at + 1;
            }
            _ if depth == 0 => return Some((close_at, close_at + close.len())),
            _ => {
                depth -= 1;
                pos = close_at + close.len();
            }
        }
    }
}

fn text_content(fragment: &str) -> String {
    let mut text = String::with_capacity(fragment.len());
    let mut in_tag = false;
    for c in fragment.chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            c if !in_tag => text.push(c),
            _ => {}
        }
    }
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
        .trim()
        .to_string()
}
