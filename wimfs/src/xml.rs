//! Minimal XML element tree for the WIM catalog.
//!
//! The catalog only ever contains elements, attributes (ignored), and
//! text. This parser is intentionally small and strict: any structural
//! surprise fails the whole document rather than guessing.

use alloc::string::String;
use alloc::vec::Vec;

use crate::error::{Result, WimError};

/// One element with its text content and child elements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlNode {
    /// Element name, as written.
    pub name: String,
    /// Concatenated immediate text content, trimmed.
    pub text: String,
    /// Child elements in document order.
    pub children: Vec<XmlNode>,
}

impl XmlNode {
    /// First child with the given name.
    pub fn child(&self, name: &str) -> Option<&XmlNode> {
        self.children.iter().find(|c| c.name == name)
    }

    /// All children with the given name.
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlNode> {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// Text of the first child with the given name.
    pub fn text_of(&self, name: &str) -> Option<&str> {
        self.child(name).map(|c| c.text.as_str())
    }
}

/// Parse a document into its root element. A leading `<?xml ...?>`
/// prolog is skipped.
pub fn parse_document(input: &str) -> Result<XmlNode> {
    let mut parser = Parser {
        bytes: input.as_bytes(),
        pos: 0,
    };
    parser.skip_whitespace();
    parser.skip_prolog()?;
    parser.skip_whitespace();
    let root = parser.parse_element()?;
    parser.skip_whitespace();
    if parser.pos != parser.bytes.len() {
        return Err(WimError::MalformedContainer);
    }
    Ok(root)
}

struct Parser<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn advance(&mut self) -> Result<u8> {
        let b = self.peek().ok_or(WimError::MalformedContainer)?;
        self.pos += 1;
        Ok(b)
    }

    fn expect(&mut self, b: u8) -> Result<()> {
        if self.advance()? != b {
            return Err(WimError::MalformedContainer);
        }
        Ok(())
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(b' ' | b'\t' | b'\r' | b'\n')) {
            self.pos += 1;
        }
    }

    fn skip_prolog(&mut self) -> Result<()> {
        if self.bytes[self.pos..].starts_with(b"<?") {
            while !self.bytes[self.pos..].starts_with(b"?>") {
                self.advance()?;
            }
            self.pos += 2;
        }
        Ok(())
    }

    fn parse_name(&mut self) -> Result<String> {
        let start = self.pos;
        while let Some(b) = self.peek() {
            if b == b'>' || b == b'/' || b == b' ' || b == b'\t' || b == b'\r' || b == b'\n' {
                break;
            }
            self.pos += 1;
        }
        if self.pos == start {
            return Err(WimError::MalformedContainer);
        }
        core::str::from_utf8(&self.bytes[start..self.pos])
            .map(String::from)
            .map_err(|_| WimError::MalformedContainer)
    }

    /// Skip attributes up to the closing '>' of an open tag. Returns true
    /// for a self-closing tag.
    fn skip_attributes(&mut self) -> Result<bool> {
        loop {
            match self.advance()? {
                b'>' => return Ok(false),
                b'/' => {
                    self.expect(b'>')?;
                    return Ok(true);
                }
                b'"' => {
                    // Quoted attribute value; '>' inside is legal
                    while self.advance()? != b'"' {}
                }
                _ => {}
            }
        }
    }

    fn parse_element(&mut self) -> Result<XmlNode> {
        self.expect(b'<')?;
        let name = self.parse_name()?;
        let self_closing = self.skip_attributes()?;

        let mut node = XmlNode {
            name,
            text: String::new(),
            children: Vec::new(),
        };
        if self_closing {
            return Ok(node);
        }

        loop {
            let text_start = self.pos;
            while self.peek().is_some_and(|b| b != b'<') {
                self.pos += 1;
            }
            if self.pos > text_start {
                let text = core::str::from_utf8(&self.bytes[text_start..self.pos])
                    .map_err(|_| WimError::MalformedContainer)?;
                node.text.push_str(text.trim());
            }

            if self.bytes[self.pos..].starts_with(b"</") {
                self.pos += 2;
                let close = self.parse_name()?;
                if close != node.name {
                    return Err(WimError::MalformedContainer);
                }
                self.skip_whitespace();
                self.expect(b'>')?;
                return Ok(node);
            }

            node.children.push(self.parse_element()?);
        }
    }
}
