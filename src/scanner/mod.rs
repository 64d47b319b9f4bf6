// Streaming tag scanner for the IdP pages and the SAML assertion
//
// Real ADFS pages are HTML, not XML: void elements are never closed, scripts
// contain stray markup characters, attributes are sometimes unquoted. The
// reader is configured leniently so that only structural breakage (an
// unterminated tag at end of input and similar) stops the scan.
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::borrow::Cow;
use thiserror::Error;

const RAW_TEXT_ELEMENTS: [&str; 2] = ["script", "style"];

/// How tag and attribute names are reported to the handler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseMode {
    /// Names are lowercased before dispatch and attribute lookups ignore case
    Insensitive,
    /// Names are reported verbatim
    Sensitive,
}

/// Whether the scan should keep going after a callback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Stop,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("markup error near byte {offset}: {message}")]
pub struct ScanError {
    pub offset: usize,
    pub message: String,
}

/// An opening (or self-closing) tag as seen by the scanner
#[derive(Debug, Clone)]
pub struct OpenTag<'d> {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    /// Byte offset just past the tag's closing `>`
    pub offset: usize,
    case: CaseMode,
    document: &'d str,
}

impl<'d> OpenTag<'d> {
    pub fn is(&self, name: &str) -> bool {
        match self.case {
            CaseMode::Insensitive => self.name.eq_ignore_ascii_case(name),
            CaseMode::Sensitive => self.name == name,
        }
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| match self.case {
                CaseMode::Insensitive => k.eq_ignore_ascii_case(key),
                CaseMode::Sensitive => k == key,
            })
            .map(|(_, v)| v.as_str())
    }

    /// Raw document text following this tag, at most `max_bytes` long.
    ///
    /// The window is shrunk to the nearest character boundary so multi-byte
    /// text is never split.
    pub fn following_text(&self, max_bytes: usize) -> &'d str {
        let start = self.offset.min(self.document.len());
        let mut end = start.saturating_add(max_bytes).min(self.document.len());
        while !self.document.is_char_boundary(end) {
            end -= 1;
        }
        &self.document[start..end]
    }
}

/// Callbacks driven by [`scan`]
pub trait TagHandler {
    type Output;

    fn open_tag(&mut self, _tag: &OpenTag<'_>) -> Flow {
        Flow::Continue
    }

    fn text(&mut self, _text: &str) -> Flow {
        Flow::Continue
    }

    fn error(&mut self, _cause: &ScanError) {}

    fn finish(self) -> Self::Output;
}

/// Scan a whole document, dispatching events to `handler` until the end of
/// input, a `Flow::Stop`, or the first fatal error.
///
/// In [`CaseMode::Insensitive`] the bodies of `<script>` and `<style>` are
/// skipped unseen, and downlevel conditional markers such as `<![if !IE]>`
/// are ignored.
pub fn scan<H: TagHandler>(
    document: &str,
    case: CaseMode,
    mut handler: H,
) -> Result<H::Output, ScanError> {
    let html = case == CaseMode::Insensitive;
    // quick-xml cannot seek, so skipping raw text restarts the reader at `base`
    let mut base = 0;
    let mut reader = lenient_reader(document);

    loop {
        let here = base + position(&reader);
        if html {
            if let Some(len) = document.get(here..).and_then(conditional_marker_len) {
                base = here + len;
                reader = lenient_reader(&document[base..]);
                continue;
            }
        }

        let event = match reader.read_event() {
            Ok(event) => event,
            Err(e) => {
                let cause = ScanError {
                    offset: base + position(&reader),
                    message: e.to_string(),
                };
                handler.error(&cause);
                return Err(cause);
            }
        };

        let flow = match event {
            Event::Start(e) if html && is_raw_text_element(&e) => {
                let after = base + position(&reader);
                let tag = open_tag(&e, after, case, document);
                let flow = handler.open_tag(&tag);

                base = raw_text_end(document, after, &tag.name);
                reader = lenient_reader(&document[base..]);
                flow
            }
            Event::Start(e) | Event::Empty(e) => {
                let tag = open_tag(&e, base + position(&reader), case, document);
                handler.open_tag(&tag)
            }
            Event::Text(e) => {
                let text = e
                    .unescape()
                    .unwrap_or_else(|_| String::from_utf8_lossy(&e).into_owned().into());
                handler.text(&text)
            }
            Event::CData(e) => handler.text(&String::from_utf8_lossy(&e)),
            Event::Eof => break,
            _ => Flow::Continue,
        };

        if flow == Flow::Stop {
            break;
        }
    }

    Ok(handler.finish())
}

/// Same as [`scan`] for raw response bytes; invalid UTF-8 is replaced.
pub fn scan_bytes<H: TagHandler>(
    document: &[u8],
    case: CaseMode,
    handler: H,
) -> Result<H::Output, ScanError> {
    scan(&String::from_utf8_lossy(document), case, handler)
}

fn lenient_reader(input: &str) -> Reader<&[u8]> {
    let mut reader = Reader::from_str(input);
    let config = reader.config_mut();
    config.check_end_names = false;
    config.allow_unmatched_ends = true;
    config.check_comments = false;
    config.trim_text(false);
    reader
}

fn position(reader: &Reader<&[u8]>) -> usize {
    usize::try_from(reader.buffer_position()).unwrap_or(usize::MAX)
}

fn is_raw_text_element(e: &BytesStart<'_>) -> bool {
    let name = e.name();
    RAW_TEXT_ELEMENTS
        .iter()
        .any(|raw| name.as_ref().eq_ignore_ascii_case(raw.as_bytes()))
}

/// Start of the `</name` that closes a raw text element opened before `from`,
/// or the end of the document when it is never closed
fn raw_text_end(document: &str, from: usize, name: &str) -> usize {
    let closing = format!("</{}", name);
    document.as_bytes()[from..]
        .windows(closing.len())
        .position(|w| w.eq_ignore_ascii_case(closing.as_bytes()))
        .map_or(document.len(), |i| from + i)
}

/// Length of a leading `<![if ...]>` / `<![endif]>` marker; CDATA is not one
fn conditional_marker_len(rest: &str) -> Option<usize> {
    if !rest.starts_with("<![") || rest.starts_with("<![CDATA[") {
        return None;
    }
    rest.find("]>").map(|i| i + 2)
}

fn open_tag<'d>(
    e: &BytesStart<'_>,
    offset: usize,
    case: CaseMode,
    document: &'d str,
) -> OpenTag<'d> {
    let mut attributes = Vec::new();
    let mut raw = e.html_attributes();
    raw.with_checks(false);
    for attr in raw.flatten() {
        let key = normalize(String::from_utf8_lossy(attr.key.as_ref()), case);
        let value = match attr.unescape_value() {
            Ok(value) => value.into_owned(),
            Err(_) => String::from_utf8_lossy(&attr.value).into_owned(),
        };
        attributes.push((key, value));
    }

    OpenTag {
        name: normalize(String::from_utf8_lossy(e.name().as_ref()), case),
        attributes,
        offset,
        case,
        document,
    }
}

fn normalize(name: Cow<'_, str>, case: CaseMode) -> String {
    match case {
        CaseMode::Insensitive => name.to_ascii_lowercase(),
        CaseMode::Sensitive => name.into_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default, Debug)]
    struct Recorder {
        tags: Vec<(String, usize)>,
        texts: Vec<String>,
        errors: usize,
        stop_at: Option<String>,
    }

    impl TagHandler for Recorder {
        type Output = Self;

        fn open_tag(&mut self, tag: &OpenTag<'_>) -> Flow {
            self.tags.push((tag.name.clone(), tag.offset));
            match &self.stop_at {
                Some(name) if tag.is(name) => Flow::Stop,
                _ => Flow::Continue,
            }
        }

        fn text(&mut self, text: &str) -> Flow {
            if !text.trim().is_empty() {
                self.texts.push(text.trim().to_string());
            }
            Flow::Continue
        }

        fn error(&mut self, _cause: &ScanError) {
            self.errors += 1;
        }

        fn finish(self) -> Self {
            self
        }
    }

    struct Capture(Option<(String, Vec<(String, String)>, String)>);

    impl TagHandler for Capture {
        type Output = Option<(String, Vec<(String, String)>, String)>;

        fn open_tag(&mut self, tag: &OpenTag<'_>) -> Flow {
            self.0 = Some((
                tag.name.clone(),
                tag.attributes.clone(),
                tag.following_text(5).to_string(),
            ));
            Flow::Stop
        }

        fn finish(self) -> Self::Output {
            self.0
        }
    }

    #[test]
    fn test_reports_tags_and_text_in_order() {
        let doc = "<html><body><p>hello</p><br><p>world</p></body></html>";
        let rec = scan(doc, CaseMode::Sensitive, Recorder::default()).unwrap();

        let names: Vec<&str> = rec.tags.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["html", "body", "p", "br", "p"]);
        assert_eq!(rec.texts, vec!["hello", "world"]);
        assert_eq!(rec.errors, 0);
    }

    #[test]
    fn test_offset_points_past_closing_bracket() {
        let doc = r#"<div><span id="x">msg</span></div>"#;
        let rec = scan(doc, CaseMode::Sensitive, Recorder::default()).unwrap();

        let (_, offset) = &rec.tags[1];
        assert_eq!(&doc[*offset..*offset + 3], "msg");
    }

    #[test]
    fn test_insensitive_mode_lowercases_names() {
        let doc = r#"<FORM ID="loginForm" Action="/login">"#;
        let (name, attributes, _) = scan(doc, CaseMode::Insensitive, Capture(None))
            .unwrap()
            .unwrap();

        assert_eq!(name, "form");
        assert_eq!(
            attributes,
            vec![
                ("id".to_string(), "loginForm".to_string()),
                ("action".to_string(), "/login".to_string()),
            ]
        );
    }

    #[test]
    fn test_sensitive_mode_keeps_names() {
        let doc = r#"<saml:AttributeValue Name="x">v</saml:AttributeValue>"#;
        let (name, attributes, following) = scan(doc, CaseMode::Sensitive, Capture(None))
            .unwrap()
            .unwrap();

        assert_eq!(name, "saml:AttributeValue");
        assert_eq!(attributes[0].0, "Name");
        assert_eq!(following, "v</sa");
    }

    #[test]
    fn test_html_attributes_are_tolerated() {
        let doc = r#"<input type=hidden disabled name="a" name="b" value="x&amp;y">"#;
        let (_, attributes, _) = scan(doc, CaseMode::Insensitive, Capture(None))
            .unwrap()
            .unwrap();

        assert!(attributes.contains(&("type".to_string(), "hidden".to_string())));
        assert!(attributes.contains(&("value".to_string(), "x&y".to_string())));
        assert_eq!(attributes.iter().filter(|(k, _)| k == "name").count(), 2);
    }

    #[test]
    fn test_malformed_nesting_does_not_abort() {
        let doc = "<html><div><span></div></p></html><form id=\"f\"></form>";
        let rec = scan(doc, CaseMode::Insensitive, Recorder::default()).unwrap();

        assert_eq!(rec.errors, 0);
        assert_eq!(rec.tags.last().unwrap().0, "form");
    }

    #[test]
    fn test_stop_halts_further_callbacks() {
        let rec = Recorder {
            stop_at: Some("b".to_string()),
            ..Default::default()
        };
        let rec = scan("<a></a><b></b><c></c>", CaseMode::Sensitive, rec).unwrap();

        let names: Vec<&str> = rec.tags.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn test_script_and_style_bodies_are_skipped() {
        let doc = "<head><script>if (i < n) { /* don't stop */ }</script>\
                   <STYLE>p > a { content: '<b>'; }</STYLE></head><body><p>after</p></body>";
        let rec = scan(doc, CaseMode::Insensitive, Recorder::default()).unwrap();

        let names: Vec<&str> = rec.tags.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["head", "script", "style", "body", "p"]);
        assert_eq!(rec.texts, vec!["after"]);
        assert_eq!(rec.errors, 0);

        let (_, offset) = &rec.tags[4];
        assert_eq!(&doc[*offset..*offset + 5], "after");
    }

    #[test]
    fn test_unclosed_script_swallows_the_rest() {
        let rec = scan("<script>var a = '<p>'", CaseMode::Insensitive, Recorder::default()).unwrap();
        assert_eq!(rec.tags.len(), 1);
        assert!(rec.texts.is_empty());
    }

    #[test]
    fn test_conditional_markers_are_ignored() {
        let doc = "<body><![if !IE]><p>x</p><![endif]><form id=\"f\"></form></body>";
        let rec = scan(doc, CaseMode::Insensitive, Recorder::default()).unwrap();

        let names: Vec<&str> = rec.tags.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["body", "p", "form"]);
        assert_eq!(rec.texts, vec!["x"]);
    }

    #[test]
    fn test_sensitive_mode_reports_script_content() {
        let doc = "<script><![CDATA[a < b]]></script>";
        let rec = scan(doc, CaseMode::Sensitive, Recorder::default()).unwrap();
        assert_eq!(rec.texts, vec!["a < b"]);
    }

    #[test]
    fn test_unterminated_tag_is_fatal() {
        let err = scan("<html><input name=\"x", CaseMode::Insensitive, Recorder::default())
            .unwrap_err();

        assert!(err.offset > 0);
        assert!(!err.message.is_empty());
    }

    #[test]
    fn test_empty_document_finishes() {
        assert_eq!(scan("", CaseMode::Sensitive, Capture(None)).unwrap(), None);
    }

    #[test]
    fn test_scan_bytes_replaces_invalid_utf8() {
        let rec = scan_bytes(b"<p>ok\xff</p>", CaseMode::Sensitive, Recorder::default()).unwrap();
        assert_eq!(rec.texts, vec!["ok\u{fffd}"]);
    }

    #[test]
    fn test_following_text_respects_char_boundaries() {
        let doc = "<p>aa\u{00e9}\u{00e9}</p>";
        let (_, _, following) = scan(doc, CaseMode::Sensitive, Capture(None))
            .unwrap()
            .unwrap();
        assert_eq!(following, "aa\u{00e9}");
    }
}
