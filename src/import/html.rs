//! Best-effort HTML handling for imports: main content extraction, title
//! lookup and a regex based HTML to Markdown converter.

use lazy_static::lazy_static;
use regex::{Captures, Regex};

lazy_static! {
    /// Containers tried in order when looking for the main content
    static ref CONTENT_PATTERNS: Vec<Regex> = vec![
        Regex::new(r"(?is)<article[^>]*>(.*?)</article>").unwrap(),
        Regex::new(r#"(?is)<div[^>]*?class="[^"]*?(?:post-content|entry-content|article-content)[^"]*?"[^>]*>(.*?)</div>"#).unwrap(),
        Regex::new(r#"(?is)<div[^>]*?id="[^"]*?(?:post-content|entry-content|article-content)[^"]*?"[^>]*>(.*?)</div>"#).unwrap(),
        Regex::new(r#"(?is)<div[^>]*?class="[^"]*?(?:content|main)[^"]*?"[^>]*>(.*?)</div>"#).unwrap(),
    ];
    static ref BODY: Regex = Regex::new(r"(?is)<body[^>]*>(.*?)</body>").unwrap();
    static ref TITLE: Regex = Regex::new(r"(?is)<title[^>]*>(.*?)</title>").unwrap();

    static ref DROPPED: Regex =
        Regex::new(r"(?is)<!--.*?-->|<(script|style|head|noscript)(?:\s[^>]*)?>.*?</(script|style|head|noscript)>").unwrap();
    static ref PRE: Regex =
        Regex::new(r"(?is)<pre[^>]*>\s*(?:<code[^>]*>)?(.*?)(?:</code>)?\s*</pre>").unwrap();
    static ref HEADING: Regex = Regex::new(r"(?is)<h([1-6])[^>]*>(.*?)</h[1-6]>").unwrap();
    static ref STRONG: Regex = Regex::new(r"(?is)<(?:strong|b)(?:\s[^>]*)?>(.*?)</(?:strong|b)>").unwrap();
    static ref EM: Regex = Regex::new(r"(?is)<(?:em|i)(?:\s[^>]*)?>(.*?)</(?:em|i)>").unwrap();
    static ref CODE: Regex = Regex::new(r"(?is)<code[^>]*>(.*?)</code>").unwrap();
    static ref LINK: Regex = Regex::new(r#"(?is)<a\s[^>]*?href\s*=\s*["']([^"']*)["'][^>]*>(.*?)</a>"#).unwrap();
    static ref IMG: Regex = Regex::new(r"(?is)<img\s[^>]*>").unwrap();
    static ref SRC_ATTR: Regex = Regex::new(r#"(?is)\ssrc\s*=\s*["']([^"']*)["']"#).unwrap();
    static ref ALT_ATTR: Regex = Regex::new(r#"(?is)\salt\s*=\s*["']([^"']*)["']"#).unwrap();
    static ref BLOCKQUOTE: Regex = Regex::new(r"(?is)<blockquote[^>]*>(.*?)</blockquote>").unwrap();
    static ref ORDERED: Regex = Regex::new(r"(?is)<ol[^>]*>(.*?)</ol>").unwrap();
    static ref UNORDERED: Regex = Regex::new(r"(?is)<ul[^>]*>(.*?)</ul>").unwrap();
    static ref ITEM: Regex = Regex::new(r"(?is)<li[^>]*>(.*?)</li>").unwrap();
    static ref PARAGRAPH: Regex = Regex::new(r"(?is)<p(?:\s[^>]*)?>(.*?)</p>").unwrap();
    static ref BREAK: Regex = Regex::new(r"(?i)<br\s*/?>").unwrap();
    static ref RULE: Regex = Regex::new(r"(?i)<hr\s*/?>").unwrap();
    static ref TAG: Regex = Regex::new(r"(?s)<[^>]+>").unwrap();
    static ref ENTITY: Regex = Regex::new(r"&(#[0-9]+|#[xX][0-9a-fA-F]+|[a-zA-Z]+);").unwrap();
    static ref BLANK_LINES: Regex = Regex::new(r"\n{3,}").unwrap();
    static ref PLACEHOLDER: Regex = Regex::new(r"\x00(\d+)\x00").unwrap();
}

/// The most likely main content of a page, or the `<body>`, or everything
pub fn extract_main_content(html: &str) -> String {
    for pattern in CONTENT_PATTERNS.iter() {
        if let Some(m) = pattern.captures(html).and_then(|c| c.get(1)) {
            return m.as_str().to_string();
        }
    }

    BODY.captures(html)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| html.to_string())
}

/// Text of the `<title>` element
pub fn extract_title(html: &str) -> Option<String> {
    TITLE
        .captures(html)
        .and_then(|c| c.get(1))
        .map(|m| decode_entities(m.as_str().trim()))
        .filter(|t| !t.is_empty())
}

/// Whether text looks like HTML rather than Markdown
pub fn looks_like_html(content: &str) -> bool {
    ["<p>", "<div>", "<h1>", "<br>"]
        .iter()
        .any(|tag| content.contains(tag))
}

/// Convert HTML to Markdown.
///
/// Handles headings, paragraphs, emphasis, links, images, lists, block
/// quotes, rules and code. Unknown tags are dropped and their text kept.
pub fn html_to_markdown(html: &str) -> String {
    let html = DROPPED.replace_all(html, "");

    // code is set aside so later passes leave it alone
    let mut blocks: Vec<String> = Vec::new();
    let text = PRE.replace_all(&html, |caps: &Captures| {
        let code = decode_entities(&TAG.replace_all(&caps[1], ""));
        blocks.push(format!("```\n{}\n```", code.trim_matches('\n')));
        format!("\n\n\x00{}\x00\n\n", blocks.len() - 1)
    });

    let text = HEADING.replace_all(&text, |caps: &Captures| {
        let level: usize = caps[1].parse().unwrap_or(1);
        format!("\n\n{} {}\n\n", "#".repeat(level), inline_text(&caps[2]))
    });
    let text = STRONG.replace_all(&text, "**$1**");
    let text = EM.replace_all(&text, "*$1*");
    let text = CODE.replace_all(&text, |caps: &Captures| {
        let code = decode_entities(&TAG.replace_all(&caps[1], ""));
        blocks.push(format!("`{}`", code));
        format!("\x00{}\x00", blocks.len() - 1)
    });
    let text = IMG.replace_all(&text, |caps: &Captures| {
        let tag = &caps[0];
        let src = SRC_ATTR.captures(tag).map(|c| c[1].to_string()).unwrap_or_default();
        let alt = ALT_ATTR.captures(tag).map(|c| c[1].to_string()).unwrap_or_default();
        format!("![{}]({})", alt, src)
    });
    let text = LINK.replace_all(&text, |caps: &Captures| {
        format!("[{}]({})", inline_text(&caps[2]), &caps[1])
    });
    let text = ORDERED.replace_all(&text, |caps: &Captures| {
        let items: Vec<String> = ITEM
            .captures_iter(&caps[1])
            .enumerate()
            .map(|(i, item)| format!("{}. {}", i + 1, inline_text(&item[1])))
            .collect();
        format!("\n\n{}\n\n", items.join("\n"))
    });
    let text = UNORDERED.replace_all(&text, |caps: &Captures| {
        let items: Vec<String> = ITEM
            .captures_iter(&caps[1])
            .map(|item| format!("- {}", inline_text(&item[1])))
            .collect();
        format!("\n\n{}\n\n", items.join("\n"))
    });
    let text = BLOCKQUOTE.replace_all(&text, |caps: &Captures| {
        let inner = PARAGRAPH.replace_all(&caps[1], "$1\n\n");
        let quoted: Vec<String> = TAG
            .replace_all(&inner, "")
            .trim()
            .lines()
            .map(|line| format!("> {}", line.trim()).trim_end().to_string())
            .collect();
        format!("\n\n{}\n\n", quoted.join("\n"))
    });
    let text = PARAGRAPH.replace_all(&text, |caps: &Captures| {
        format!("\n\n{}\n\n", inline_text(&caps[1]))
    });
    let text = BREAK.replace_all(&text, "\n");
    let text = RULE.replace_all(&text, "\n\n---\n\n");
    let text = TAG.replace_all(&text, "");
    // decoded text must not turn back into markup
    let text = escape_markup(&decode_entities(&text));

    let text: String = text
        .lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n");
    let text = BLANK_LINES.replace_all(&text, "\n\n");
    let text = PLACEHOLDER.replace_all(&text, |caps: &Captures| {
        caps[1]
            .parse::<usize>()
            .ok()
            .and_then(|i| blocks.get(i).cloned())
            .unwrap_or_default()
    });

    text.trim().to_string()
}

/// Re-escape `&` and `<` so text cannot open a tag or entity in Markdown.
/// A lone `>` stays, blockquote markers rely on it.
fn escape_markup(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;")
}

/// Inline content with source line breaks folded into spaces
fn inline_text(html: &str) -> String {
    html.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Decode named and numeric character references
pub fn decode_entities(text: &str) -> String {
    ENTITY
        .replace_all(text, |caps: &Captures| {
            let name = &caps[1];
            let hex = name.strip_prefix("#x").or_else(|| name.strip_prefix("#X"));
            let decoded = if let Some(hex) = hex {
                u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
            } else if let Some(dec) = name.strip_prefix('#') {
                dec.parse::<u32>().ok().and_then(char::from_u32)
            } else {
                match name {
                    "amp" => Some('&'),
                    "lt" => Some('<'),
                    "gt" => Some('>'),
                    "quot" => Some('"'),
                    "apos" => Some('\''),
                    "nbsp" => Some(' '),
                    "hellip" => Some('…'),
                    "mdash" => Some('—'),
                    "ndash" => Some('–'),
                    "rsquo" => Some('’'),
                    "lsquo" => Some('‘'),
                    "rdquo" => Some('”'),
                    "ldquo" => Some('“'),
                    _ => None,
                }
            };
            decoded.map(String::from).unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_article() {
        let html = r#"<html><body><nav>menu</nav><article class="post"><p>Story</p></article></body></html>"#;
        assert_eq!(extract_main_content(html), "<p>Story</p>");
    }

    #[test]
    fn test_extract_content_div() {
        let html = r#"<body><div class="sidebar">x</div><div class="entry-content"><p>Main</p></div></body>"#;
        assert_eq!(extract_main_content(html), "<p>Main</p>");

        let html = r#"<body><div id="post-content"><p>By id</p></div></body>"#;
        assert_eq!(extract_main_content(html), "<p>By id</p>");
    }

    #[test]
    fn test_extract_falls_back_to_body() {
        let html = "<html><head><title>T</title></head><body><p>All</p></body></html>";
        assert_eq!(extract_main_content(html), "<p>All</p>");
        assert_eq!(extract_main_content("<p>bare</p>"), "<p>bare</p>");
    }

    #[test]
    fn test_extract_title() {
        assert_eq!(
            extract_title("<head><title> Fish &amp; Chips </title></head>").as_deref(),
            Some("Fish & Chips")
        );
        assert_eq!(extract_title("<p>none</p>"), None);
    }

    #[test]
    fn test_looks_like_html() {
        assert!(looks_like_html("<p>Hello</p>"));
        assert!(looks_like_html("a<br>b"));
        assert!(!looks_like_html("# Heading\n\nText"));
    }

    #[test]
    fn test_headings_and_paragraphs() {
        let md = html_to_markdown("<h1>Title</h1><p>First <strong>bold</strong> and <em>soft</em>.</p><h2>Sub</h2><p>Second</p>");
        assert_eq!(md, "# Title\n\nFirst **bold** and *soft*.\n\n## Sub\n\nSecond");
    }

    #[test]
    fn test_links_and_images() {
        let md = html_to_markdown(r#"<p>See <a href="https://example.com">the site</a> <img src="/a.png" alt="A"></p>"#);
        assert_eq!(md, "See [the site](https://example.com) ![A](/a.png)");
    }

    #[test]
    fn test_lists() {
        let md = html_to_markdown("<ul><li>one</li><li>two</li></ul><ol><li>first</li><li>second</li></ol>");
        assert_eq!(md, "- one\n- two\n\n1. first\n2. second");
    }

    #[test]
    fn test_code_blocks_are_preserved() {
        let md = html_to_markdown("<p>Run:</p><pre><code class=\"lang-sh\">echo &lt;hi&gt;\n  <b>x</b>\n</code></pre>");
        assert_eq!(md, "Run:\n\n```\necho <hi>\n  x\n```");
    }

    #[test]
    fn test_blockquote_rule_and_entities() {
        let md = html_to_markdown("<blockquote><p>Quoted</p></blockquote><hr><p>5 &lt; 6 &#38; 7 &#x3E; 2</p>");
        assert_eq!(md, "> Quoted\n\n---\n\n5 &lt; 6 &amp; 7 > 2");
    }

    #[test]
    fn test_escaped_markup_stays_text() {
        let md = html_to_markdown(
            "<p>Use &lt;script&gt;alert(1)&lt;/script&gt; and &lt;em&gt;x&lt;/em&gt;</p>",
        );
        assert_eq!(md, "Use &lt;script>alert(1)&lt;/script> and &lt;em>x&lt;/em>");

        let html = crate::content::MarkdownRenderer::new().render(&md);
        assert!(!html.contains("<script>"));
        assert!(!html.contains("<em>"));
        assert!(html.contains("&lt;script&gt;alert(1)&lt;/script&gt;"));
    }

    #[test]
    fn test_inline_code_keeps_literal_text() {
        let md = html_to_markdown("<p>Call <code>a &lt; b &amp;&amp; c</code> now</p>");
        assert_eq!(md, "Call `a < b && c` now");
    }

    #[test]
    fn test_scripts_and_comments_dropped() {
        let md = html_to_markdown("<script>alert(1)</script><!-- note --><p>Kept</p><style>p{}</style>");
        assert_eq!(md, "Kept");
    }

    #[test]
    fn test_decode_entities_leaves_unknown() {
        assert_eq!(decode_entities("&bogus; &amp;"), "&bogus; &");
    }
}
