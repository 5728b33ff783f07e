//! HTML fragment parsing and serialization helpers for [`SimpleDom`](super::SimpleDom)

use crate::error::DomError;

/// Elements that never have children or a closing tag.
pub(crate) const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source",
    "track", "wbr",
];

pub(crate) fn is_void(tag: &str) -> bool {
    VOID_ELEMENTS.contains(&tag)
}

/// Parsed fragment node, materialized by the caller.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum HtmlNode {
    Element {
        tag: String,
        attributes: Vec<(String, String)>,
        children: Vec<HtmlNode>,
    },
    Text(String),
    Comment(String),
}

/// Parse an HTML fragment.
///
/// Supports elements, quoted/unquoted/boolean attributes, void and
/// self-closing elements, comments, and the common character references.
pub(crate) fn parse_fragment(source: &str) -> Result<Vec<HtmlNode>, DomError> {
    let mut parser = Parser { src: source, pos: 0 };
    parser.nodes(None)
}

struct Parser<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn eof(&self) -> bool {
        self.pos >= self.src.len()
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn take_while(&mut self, pred: impl Fn(char) -> bool) -> &'a str {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if !pred(c) {
                break;
            }
            self.pos += c.len_utf8();
        }
        &self.src[start..self.pos]
    }

    fn skip_whitespace(&mut self) {
        self.take_while(char::is_whitespace);
    }

    fn error(&self, message: impl Into<String>) -> DomError {
        DomError::Html(format!("{} at byte {}", message.into(), self.pos))
    }

    fn at_tag_start(&self) -> bool {
        let mut chars = self.rest().chars();
        chars.next() == Some('<')
            && matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '/' || c == '!')
    }

    fn nodes(&mut self, closing: Option<&str>) -> Result<Vec<HtmlNode>, DomError> {
        let mut nodes = Vec::new();
        loop {
            if self.eof() {
                return match closing {
                    Some(tag) => Err(self.error(format!("unclosed <{}>", tag))),
                    None => Ok(nodes),
                };
            }

            if self.rest().starts_with("<!--") {
                self.pos += 4;
                let end = self
                    .rest()
                    .find("-->")
                    .ok_or_else(|| self.error("unterminated comment"))?;
                nodes.push(HtmlNode::Comment(self.rest()[..end].to_string()));
                self.pos += end + 3;
            } else if self.rest().starts_with("</") {
                self.pos += 2;
                let tag = self.take_while(|c| c != '>').trim().to_ascii_lowercase();
                if self.bump() != Some('>') {
                    return Err(self.error("unterminated closing tag"));
                }
                return match closing {
                    Some(expected) if expected == tag => Ok(nodes),
                    Some(expected) => Err(self.error(format!(
                        "expected </{}> but found </{}>",
                        expected, tag
                    ))),
                    None => Err(self.error(format!("unexpected </{}>", tag))),
                };
            } else if self.at_tag_start() {
                nodes.push(self.element()?);
            } else {
                let mut text = String::new();
                // A `<` that does not start a tag is plain text.
                if self.peek() == Some('<') {
                    self.bump();
                    text.push('<');
                }
                text.push_str(self.take_while(|c| c != '<'));
                nodes.push(HtmlNode::Text(decode_entities(&text)));
            }
        }
    }

    fn element(&mut self) -> Result<HtmlNode, DomError> {
        self.bump(); // <
        let tag = self
            .take_while(|c| c.is_ascii_alphanumeric() || c == '-')
            .to_ascii_lowercase();
        if tag.is_empty() {
            return Err(self.error("missing tag name"));
        }

        let mut attributes = Vec::new();
        let mut self_closing = false;
        loop {
            self.skip_whitespace();
            match self.peek() {
                None => return Err(self.error(format!("unterminated <{}>", tag))),
                Some('>') => {
                    self.bump();
                    break;
                }
                Some('/') => {
                    self.bump();
                    if self.bump() != Some('>') {
                        return Err(self.error("expected `>` after `/`"));
                    }
                    self_closing = true;
                    break;
                }
                Some(_) => attributes.push(self.attribute()?),
            }
        }

        let children = if self_closing || is_void(&tag) {
            Vec::new()
        } else {
            self.nodes(Some(&tag))?
        };

        Ok(HtmlNode::Element {
            tag,
            attributes,
            children,
        })
    }

    fn attribute(&mut self) -> Result<(String, String), DomError> {
        let name = self
            .take_while(|c| !c.is_whitespace() && c != '=' && c != '>' && c != '/')
            .to_ascii_lowercase();
        if name.is_empty() {
            return Err(self.error("missing attribute name"));
        }
        self.skip_whitespace();
        if self.peek() != Some('=') {
            return Ok((name, String::new()));
        }
        self.bump();
        self.skip_whitespace();

        let raw = match self.peek() {
            Some(quote @ ('"' | '\'')) => {
                self.bump();
                let value = self.take_while(|c| c != quote);
                if self.bump() != Some(quote) {
                    return Err(self.error("unterminated attribute value"));
                }
                value
            }
            _ => self.take_while(|c| !c.is_whitespace() && c != '>'),
        };
        Ok((name, decode_entities(raw)))
    }
}

/// Decode the character references templates commonly produce.
pub(crate) fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }

    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find('&') {
        out.push_str(&rest[..start]);
        rest = &rest[start..];
        let decoded = rest.find(';').and_then(|end| {
            let entity = &rest[1..end];
            let c = match entity {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" | "#39" => Some('\''),
                "nbsp" => Some('\u{a0}'),
                _ => entity
                    .strip_prefix("#x")
                    .or_else(|| entity.strip_prefix("#X"))
                    .and_then(|hex| u32::from_str_radix(hex, 16).ok())
                    .or_else(|| entity.strip_prefix('#').and_then(|dec| dec.parse().ok()))
                    .and_then(char::from_u32),
            };
            c.map(|c| (c, end))
        });
        match decoded {
            Some((c, end)) => {
                out.push(c);
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

pub(crate) fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

pub(crate) fn escape_attribute(value: &str) -> String {
    value.replace('&', "&amp;").replace('"', "&quot;")
}
