//! Word (`.docx`) templates: a zip package whose `word/document.xml` is edited as an
//! element tree and written back, every other part copied untouched.

use super::{Paragraph, TextContainer};
use anyhow::{Context, Result, bail};
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use std::fs;
use std::collections::VecDeque;
use std::io::{Cursor, Read, Write};
use std::path::Path;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

const DOCUMENT_PART: &str = "word/document.xml";

#[derive(Debug, Clone)]
pub struct Docx {
    parts: Vec<Part>,
    document: Vec<Node>,
}

#[derive(Debug, Clone)]
struct Part {
    name: String,
    data: Vec<u8>,
    is_dir: bool,
}

impl Docx {
    pub fn open(path: &Path) -> Result<Self> {
        let bytes = fs::read(path)
            .with_context(|| format!("Failed to read template {}", path.display()))?;
        Self::from_bytes(&bytes)
            .with_context(|| format!("Failed to load template {}", path.display()))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut archive =
            ZipArchive::new(Cursor::new(bytes)).context("Template is not a zip package")?;
        let mut parts = Vec::with_capacity(archive.len());
        let mut document = None;
        for i in 0..archive.len() {
            let mut file = archive.by_index(i)?;
            let mut data = Vec::new();
            file.read_to_end(&mut data)?;
            let name = file.name().to_owned();
            if name == DOCUMENT_PART {
                let xml = std::str::from_utf8(&data).context("document.xml is not UTF-8")?;
                document = Some(parse(xml).context("Failed to parse document.xml")?);
            }
            parts.push(Part {
                name,
                data,
                is_dir: file.is_dir(),
            });
        }
        Ok(Docx {
            parts,
            document: document.context("Template has no word/document.xml")?,
        })
    }

    /// Applies `replacements` in order to the document body.
    pub fn fill(&mut self, replacements: &[(String, String)]) -> Result<()> {
        let body = self.body_mut()?;
        super::fill(&mut Container(body), replacements);
        Ok(())
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        for part in &self.parts {
            if part.is_dir {
                zip.add_directory(part.name.as_str(), options)?;
                continue;
            }
            zip.start_file(part.name.as_str(), options)?;
            if part.name == DOCUMENT_PART {
                zip.write_all(&serialize(&self.document)?)?;
            } else {
                zip.write_all(&part.data)?;
            }
        }
        Ok(zip.finish()?.into_inner())
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        fs::write(path, self.to_bytes()?)
            .with_context(|| format!("Failed to write {}", path.display()))
    }

    /// Plain text of the document, one line per paragraph.
    pub fn text(&self) -> String {
        let mut text = String::new();
        for node in &self.document {
            if let Node::Element(element) = node {
                collect_text(element, &mut text);
            }
        }
        text
    }

    fn body_mut(&mut self) -> Result<&mut Element> {
        let root = self
            .document
            .iter_mut()
            .find_map(|node| match node {
                Node::Element(element) => Some(element),
                _ => None,
            })
            .context("document.xml has no root element")?;
        if !root.is("document") {
            bail!("Unexpected root element <{}> in document.xml", root.name);
        }
        root.elements_mut("body")
            .next()
            .context("document.xml has no body")
    }
}

fn collect_text(element: &Element, text: &mut String) {
    for child in &element.children {
        match child {
            Node::Element(run) if run.is("r") => {
                for node in &run.children {
                    if let Node::Element(inline) = node {
                        text.push_str(&inline_text(inline).unwrap_or_default());
                    }
                }
            }
            Node::Element(child) => collect_text(child, text),
            _ => {}
        }
    }
    if element.is("p") {
        text.push('\n');
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Element(Element),
    Text(String),
    /// Declarations, comments, CDATA and the like, written back as read.
    Other(Event<'static>),
}

#[derive(Debug, Clone, PartialEq)]
struct Element {
    name: String,
    attributes: Vec<(String, String)>,
    children: Vec<Node>,
}

impl Element {
    fn new(name: String) -> Self {
        Element {
            name,
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    fn from_start(start: &BytesStart) -> Result<Self> {
        let name = String::from_utf8(start.name().as_ref().to_vec())?;
        let attributes = start
            .attributes()
            .map(|attribute| -> Result<(String, String)> {
                let attribute = attribute?;
                let key = String::from_utf8(attribute.key.as_ref().to_vec())?;
                let value = attribute.unescape_value()?.into_owned();
                Ok((key, value))
            })
            .collect::<Result<_>>()?;
        Ok(Element {
            name,
            attributes,
            children: Vec::new(),
        })
    }

    fn local_name(&self) -> &str {
        self.name
            .split_once(':')
            .map_or(self.name.as_str(), |(_, local)| local)
    }

    fn is(&self, local_name: &str) -> bool {
        self.local_name() == local_name
    }

    /// Name of a sibling element in the same namespace prefix, e.g. `w:t` for `w:r`.
    fn prefixed(&self, local_name: &str) -> String {
        match self.name.split_once(':') {
            Some((prefix, _)) => format!("{prefix}:{local_name}"),
            None => local_name.to_owned(),
        }
    }

    fn elements<'a>(&'a self, local_name: &'a str) -> impl Iterator<Item = &'a Element> {
        self.children.iter().filter_map(move |node| match node {
            Node::Element(element) if element.is(local_name) => Some(element),
            _ => None,
        })
    }

    fn elements_mut<'a>(&'a mut self, local_name: &'a str) -> impl Iterator<Item = &'a mut Element> {
        self.children.iter_mut().filter_map(move |node| match node {
            Node::Element(element) if element.is(local_name) => Some(element),
            _ => None,
        })
    }

    fn text(&self) -> String {
        self.children
            .iter()
            .filter_map(|node| match node {
                Node::Text(text) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }
}

/// A document body or a table cell.
struct Container<'a>(&'a mut Element);

impl TextContainer for Container<'_> {
    fn for_each_paragraph(&mut self, f: &mut dyn FnMut(&mut dyn Paragraph)) {
        for paragraph in self.0.elements_mut("p") {
            f(&mut DocxParagraph(paragraph));
        }
    }

    fn for_each_cell(&mut self, f: &mut dyn FnMut(&mut dyn TextContainer)) {
        for table in self.0.elements_mut("tbl") {
            for row in table.elements_mut("tr") {
                for cell in row.elements_mut("tc") {
                    f(&mut Container(cell));
                }
            }
        }
    }
}

/// A `w:p` element, its runs being the `w:r` children.
struct DocxParagraph<'a>(&'a mut Element);

impl Paragraph for DocxParagraph<'_> {
    fn run_count(&self) -> usize {
        self.0.elements("r").count()
    }

    fn run_text(&self, index: usize) -> String {
        self.0
            .elements("r")
            .nth(index)
            .map(|run| {
                run.children
                    .iter()
                    .filter_map(|node| match node {
                        Node::Element(element) => inline_text(element),
                        _ => None,
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Rebuilds the text of the run in place of its old `w:t`, `w:tab` and `w:br`
    /// children: tabs become `w:tab`, line breaks reuse the run's breaks in order.
    /// Run properties and anything else in the run stay where they are.
    fn set_run_text(&mut self, index: usize, text: &str) {
        let Some(run) = self.0.elements_mut("r").nth(index) else {
            return;
        };
        let position = run.children.iter().position(|node| {
            matches!(node, Node::Element(element) if inline_text(element).is_some())
        });
        let mut breaks = VecDeque::new();
        run.children.retain_mut(|node| match node {
            Node::Element(element) if inline_text(element).is_some() => {
                if element.is("br") || element.is("cr") {
                    breaks.push_back(std::mem::replace(
                        element,
                        Element::new(String::new()),
                    ));
                }
                false
            }
            _ => true,
        });

        let mut content = Vec::new();
        let mut pending = String::new();
        for c in text.chars() {
            match c {
                '\t' | '\n' => {
                    if !pending.is_empty() {
                        content.push(run_text_node(run, std::mem::take(&mut pending)));
                    }
                    let element = match c {
                        '\t' => Element::new(run.prefixed("tab")),
                        _ => breaks
                            .pop_front()
                            .unwrap_or_else(|| Element::new(run.prefixed("br"))),
                    };
                    content.push(Node::Element(element));
                }
                c => pending.push(c),
            }
        }
        if !pending.is_empty() {
            content.push(run_text_node(run, pending));
        }

        let at = position.unwrap_or(run.children.len());
        run.children.splice(at..at, content);
    }
}

/// Text an inline run child stands for, `None` for properties and other markup.
fn inline_text(element: &Element) -> Option<String> {
    match element.local_name() {
        "t" => Some(element.text()),
        "tab" => Some("\t".to_owned()),
        "br" | "cr" => Some("\n".to_owned()),
        _ => None,
    }
}

fn run_text_node(run: &Element, text: String) -> Node {
    Node::Element(Element {
        name: run.prefixed("t"),
        attributes: vec![("xml:space".to_owned(), "preserve".to_owned())],
        children: vec![Node::Text(text)],
    })
}

fn parse(xml: &str) -> Result<Vec<Node>> {
    let mut reader = Reader::from_str(xml);
    let mut open: Vec<Element> = Vec::new();
    let mut top = Vec::new();
    loop {
        let node = match reader.read_event()? {
            Event::Start(start) => {
                open.push(Element::from_start(&start)?);
                continue;
            }
            Event::End(end) => {
                let element = open.pop().context("Unexpected closing tag")?;
                if element.name.as_bytes() != end.name().as_ref() {
                    bail!("Mismatched closing tag for <{}>", element.name);
                }
                Node::Element(element)
            }
            Event::Empty(start) => Node::Element(Element::from_start(&start)?),
            Event::Text(text) => Node::Text(text.unescape()?.into_owned()),
            Event::Eof => break,
            other => Node::Other(other.into_owned()),
        };
        match open.last_mut() {
            Some(parent) => parent.children.push(node),
            None => top.push(node),
        }
    }
    if let Some(element) = open.last() {
        bail!("Unclosed element <{}>", element.name);
    }
    Ok(top)
}

fn serialize(nodes: &[Node]) -> Result<Vec<u8>> {
    let mut writer = Writer::new(Vec::new());
    for node in nodes {
        write_node(&mut writer, node)?;
    }
    Ok(writer.into_inner())
}

fn write_node(writer: &mut Writer<Vec<u8>>, node: &Node) -> Result<()> {
    match node {
        Node::Element(element) => {
            let start = BytesStart::new(element.name.as_str()).with_attributes(
                element
                    .attributes
                    .iter()
                    .map(|(key, value)| (key.as_str(), value.as_str())),
            );
            if element.children.is_empty() {
                writer.write_event(Event::Empty(start))?;
            } else {
                writer.write_event(Event::Start(start))?;
                for child in &element.children {
                    write_node(writer, child)?;
                }
                writer.write_event(Event::End(BytesEnd::new(element.name.as_str())))?;
            }
        }
        Node::Text(text) => writer.write_event(Event::Text(BytesText::new(text)))?,
        Node::Other(event) => writer.write_event(event.clone())?,
    }
    Ok(())
}
