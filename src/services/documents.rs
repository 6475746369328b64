//! Long documents to chapter lists
//!
//! Plain text is split on "Chapter N" headings, EPUB books are read document
//! by document in manifest order.

use log::{debug, info};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use crate::errors::{StudioError, StudioResult};
use crate::models::Chapter;
use crate::services::text::split_text;

const FALLBACK_CHUNK_CHARS: usize = 2000;
const MAX_TITLE_CHARS: usize = 80;
// Documents shorter than this are cover pages, separators and the like
const MIN_DOCUMENT_CHARS: usize = 20;

static CHAPTER_HEADING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?im)^chapter\s+\d+").expect("valid pattern"));
static SCRIPT_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<script\b.*?</script\s*>").expect("valid pattern"));
static STYLE_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<style\b.*?</style\s*>").expect("valid pattern"));
static HEAD_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<head\b.*?</head\s*>").expect("valid pattern"));
static COMMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<!--.*?-->").expect("valid pattern"));
static TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<[^>]*>").expect("valid pattern"));
static HEADING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<h([1-3])\b[^>]*>(.*?)</h[1-3]\s*>").expect("valid pattern"));
static ENTITY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"&(#[xX][0-9a-fA-F]+|#[0-9]+|[a-zA-Z]+);").expect("valid pattern"));
static BLANK_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").expect("valid pattern"));
static ROOTFILE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?s)<rootfile\b[^>]*\bfull-path\s*=\s*"([^"]+)""#).expect("valid pattern"));
static MANIFEST_ITEM: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<item\b[^>]*>").expect("valid pattern"));
static ATTRIBUTE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"([\w:-]+)\s*=\s*"([^"]*)""#).expect("valid pattern"));

/// Parse a book, dispatching on the file extension
pub fn parse_file(path: &Path) -> StudioResult<Vec<Chapter>> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    let chapters = match ext.as_str() {
        "epub" => parse_epub(path)?,
        "txt" | "text" => {
            let bytes = std::fs::read(path)?;
            parse_text(&String::from_utf8_lossy(&bytes))
        }
        other => {
            return Err(StudioError::UnsupportedFileType(if other.is_empty() {
                path.display().to_string()
            } else {
                format!(".{}", other)
            }));
        }
    };

    info!("Parsed {} chapters from {}", chapters.len(), path.display());
    Ok(chapters)
}

fn title_from(part: &str) -> String {
    part.lines().next().unwrap_or_default().chars().take(MAX_TITLE_CHARS).collect()
}

/// Split plain text on "Chapter N" lines, or into ~2000 character sections
/// when there are no such headings.
pub fn parse_text(text: &str) -> Vec<Chapter> {
    let mut cuts: Vec<usize> = CHAPTER_HEADING.find_iter(text).map(|m| m.start()).collect();
    if cuts.first() != Some(&0) {
        cuts.insert(0, 0);
    }
    cuts.push(text.len());

    let mut parts: Vec<String> = cuts
        .windows(2)
        .map(|w| text[w[0]..w[1]].trim())
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect();

    if parts.len() <= 1 {
        parts = split_text(text, FALLBACK_CHUNK_CHARS)
            .into_iter()
            .filter(|p| !p.trim().is_empty())
            .collect();
    }

    parts
        .into_iter()
        .enumerate()
        .map(|(order, part)| Chapter::new(title_from(&part), part, order))
        .collect()
}

fn decode_entities(text: &str) -> String {
    ENTITY
        .replace_all(text, |caps: &Captures| {
            let name = &caps[1];
            let decoded = if let Some(hex) = name.strip_prefix("#x").or_else(|| name.strip_prefix("#X")) {
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
                    "nbsp" => Some('\u{a0}'),
                    "mdash" => Some('\u{2014}'),
                    "ndash" => Some('\u{2013}'),
                    "hellip" => Some('\u{2026}'),
                    "lsquo" => Some('\u{2018}'),
                    "rsquo" => Some('\u{2019}'),
                    "ldquo" => Some('\u{201c}'),
                    "rdquo" => Some('\u{201d}'),
                    _ => None,
                }
            };
            decoded.map_or_else(|| caps[0].to_string(), |c| c.to_string())
        })
        .into_owned()
}

/// Visible text of an XHTML document, one text run per line
pub fn html_to_text(html: &str) -> String {
    let body = HEAD_BLOCK.replace_all(html, "");
    let body = SCRIPT_BLOCK.replace_all(&body, "");
    let body = STYLE_BLOCK.replace_all(&body, "");
    let body = COMMENT.replace_all(&body, "");
    let body = TAG.replace_all(&body, "\n");
    let body = decode_entities(&body);

    let joined = body
        .lines()
        .map(|line| line.trim())
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n");

    BLANK_RUNS.replace_all(&joined, "\n\n").trim().to_string()
}

fn first_heading(html: &str) -> Option<String> {
    let caps = HEADING.captures(html)?;
    let inner = TAG.replace_all(&caps[2], " ");
    let title = decode_entities(&inner)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    (!title.is_empty()).then_some(title)
}

fn attributes(tag: &str) -> Vec<(String, String)> {
    ATTRIBUTE
        .captures_iter(tag)
        .map(|c| (c[1].to_string(), c[2].to_string()))
        .collect()
}

fn read_entry<R: Read + std::io::Seek>(
    archive: &mut zip::ZipArchive<R>,
    name: &str,
) -> StudioResult<String> {
    let mut entry = archive.by_name(name)?;
    let mut bytes = Vec::new();
    entry.read_to_end(&mut bytes)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Join an href onto the directory holding the OPF file
fn resolve_href(opf_dir: &str, href: &str) -> String {
    let href = href.split('#').next().unwrap_or_default().replace("%20", " ");
    let mut parts: Vec<&str> = opf_dir.split('/').filter(|p| !p.is_empty()).collect();
    for segment in href.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            s => parts.push(s),
        }
    }
    parts.join("/")
}

/// Read an EPUB into chapters, one per XHTML document with enough text.
pub fn parse_epub(path: &Path) -> StudioResult<Vec<Chapter>> {
    let mut archive = zip::ZipArchive::new(BufReader::new(File::open(path)?))?;

    let container = read_entry(&mut archive, "META-INF/container.xml")?;
    let opf_path = ROOTFILE
        .captures(&container)
        .map(|c| c[1].to_string())
        .ok_or_else(|| StudioError::InvalidInput("EPUB container has no rootfile".to_string()))?;
    let opf_dir = opf_path.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("").to_string();
    let opf = read_entry(&mut archive, &opf_path)?;

    let documents: Vec<String> = MANIFEST_ITEM
        .find_iter(&opf)
        .map(|m| attributes(m.as_str()))
        .filter(|attrs| {
            attrs
                .iter()
                .any(|(k, v)| k == "media-type" && v == "application/xhtml+xml")
        })
        .filter_map(|attrs| {
            attrs
                .into_iter()
                .find(|(k, _)| k == "href")
                .map(|(_, href)| resolve_href(&opf_dir, &href))
        })
        .collect();

    let mut chapters = Vec::new();
    for name in documents {
        let html = match read_entry(&mut archive, &name) {
            Ok(html) => html,
            Err(e) => {
                debug!("Skipping missing EPUB document {}: {}", name, e);
                continue;
            }
        };

        let text = html_to_text(&html);
        if text.chars().count() < MIN_DOCUMENT_CHARS {
            continue;
        }

        let order = chapters.len();
        let title = first_heading(&html).unwrap_or_else(|| format!("Chapter {}", order + 1));
        chapters.push(Chapter::new(title, text, order));
    }

    Ok(chapters)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    #[test]
    fn test_text_split_on_chapter_headings() {
        let text = "Preface line.\n\nChapter 1\nIt begins.\n\nCHAPTER 2 The Storm\nIt ends.\n";
        let chapters = parse_text(text);

        assert_eq!(chapters.len(), 3);
        assert_eq!(chapters[0].title, "Preface line.");
        assert_eq!(chapters[1].title, "Chapter 1");
        assert_eq!(chapters[1].content, "Chapter 1\nIt begins.");
        assert_eq!(chapters[2].title, "CHAPTER 2 The Storm");
        assert_eq!(chapters[2].order, 2);
    }

    #[test]
    fn test_heading_mid_line_is_not_a_split() {
        let chapters = parse_text("See chapter 3 for details. Nothing else here.");
        assert_eq!(chapters.len(), 1);
        assert_eq!(chapters[0].order, 0);
    }

    #[test]
    fn test_text_without_headings_falls_back_to_sections() {
        let sentence = "This sentence is exactly fifty characters long!!. ";
        let text = sentence.repeat(100);
        let chapters = parse_text(&text);

        assert!(chapters.len() >= 3);
        for chapter in &chapters {
            assert!(chapter.content.chars().count() <= 2000);
            assert!(chapter.title.chars().count() <= 80);
        }
    }

    #[test]
    fn test_unsupported_extension() {
        let err = parse_file(Path::new("book.pdf")).unwrap_err();
        assert!(matches!(err, StudioError::UnsupportedFileType(ref ext) if ext == ".pdf"));
    }

    #[test]
    fn test_html_to_text() {
        let html = r#"<html><head><title>Ignored</title><style>p { color: red }</style></head>
            <body><h1>The &amp; Title</h1><p>First&nbsp;para.</p>
            <script>var x = 1;</script><p>Second &#8212; para &#x41;.</p></body></html>"#;
        let text = html_to_text(html);

        assert_eq!(text, "The & Title\nFirst\u{a0}para.\nSecond \u{2014} para A.");
        assert_eq!(first_heading(html).as_deref(), Some("The & Title"));
    }

    #[test]
    fn test_resolve_href() {
        assert_eq!(resolve_href("OEBPS", "text/ch1.xhtml"), "OEBPS/text/ch1.xhtml");
        assert_eq!(resolve_href("OEBPS/content", "../ch%202.xhtml#top"), "OEBPS/ch 2.xhtml");
        assert_eq!(resolve_href("", "ch1.xhtml"), "ch1.xhtml");
    }

    fn write_epub(path: &Path) {
        let mut zip = zip::ZipWriter::new(File::create(path).unwrap());
        let options = SimpleFileOptions::default();
        let mut add = |name: &str, body: &str| {
            zip.start_file(name, options).unwrap();
            zip.write_all(body.as_bytes()).unwrap();
        };

        add("mimetype", "application/epub+zip");
        add(
            "META-INF/container.xml",
            r#"<?xml version="1.0"?><container><rootfiles>
               <rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/>
               </rootfiles></container>"#,
        );
        add(
            "OEBPS/content.opf",
            r#"<package><manifest>
               <item id="cover" href="cover.xhtml" media-type="application/xhtml+xml"/>
               <item id="css" href="style.css" media-type="text/css"/>
               <item id="c1" href="text/one.xhtml" media-type="application/xhtml+xml"/>
               <item media-type="application/xhtml+xml" href="text/two.xhtml" id="c2"/>
               </manifest></package>"#,
        );
        add("OEBPS/cover.xhtml", "<html><body><p>Cover</p></body></html>");
        add("OEBPS/style.css", "body {}");
        add(
            "OEBPS/text/one.xhtml",
            "<html><body><h2>The Beginning</h2><p>Once upon a time there was a studio.</p></body></html>",
        );
        add(
            "OEBPS/text/two.xhtml",
            "<html><body><p>No heading here, but plenty of text to keep.</p></body></html>",
        );
        zip.finish().unwrap();
    }

    #[test]
    fn test_parse_epub() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("book.epub");
        write_epub(&path);

        let chapters = parse_file(&path).unwrap();
        assert_eq!(chapters.len(), 2);
        assert_eq!(chapters[0].title, "The Beginning");
        assert_eq!(chapters[0].order, 0);
        assert!(chapters[0].content.contains("Once upon a time"));
        assert_eq!(chapters[1].title, "Chapter 2");
        assert_eq!(chapters[1].order, 1);
    }
}
