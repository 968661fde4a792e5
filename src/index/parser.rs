// src/index/parser.rs

//! Index XML parser
//!
//! The document is first read into a small element tree, then handed to the
//! loader matching the `version` attribute of the root `<index>` element.
//! Every loader produces the same [`RemoteIndex`] model.
//!
//! Loading is all-or-nothing: the tree is assembled from owned values and only
//! returned once the whole document has been accepted.

use super::{Category, Link, LinkType, Package, Platform, RemoteIndex, Source, Version};
use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use tracing::{debug, warn};

/// Parse index data for the named remote
pub fn parse(name: &str, xml: &str) -> Result<RemoteIndex> {
    let root = read_tree(xml)?;

    if root.name != "index" {
        return Err(Error::Parse(format!(
            "root element must be <index>, found <{}>",
            root.name
        )));
    }

    let version = root
        .attr("version")
        .ok_or_else(|| Error::Parse("<index> has no version attribute".to_string()))?;

    match version.trim().parse::<u32>() {
        Ok(1) => load_v1(&root, name),
        _ => Err(Error::Parse(format!(
            "index version '{}' is not supported",
            version
        ))),
    }
}

/// Minimal DOM node
#[derive(Debug, Default)]
struct Element {
    name: String,
    attributes: Vec<(String, String)>,
    text: String,
    children: Vec<Element>,
}

impl Element {
    fn from_start(start: &BytesStart) -> Result<Self> {
        let name = String::from_utf8_lossy(start.name().as_ref()).to_string();
        let mut attributes = Vec::new();

        for attr in start.attributes() {
            let attr = attr
                .map_err(|e| Error::Parse(format!("invalid attribute in <{}>: {}", name, e)))?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).to_string();
            let value = attr
                .unescape_value()
                .map_err(|e| Error::Parse(format!("invalid value for {} in <{}>: {}", key, name, e)))?
                .to_string();
            attributes.push((key, value));
        }

        Ok(Self {
            name,
            attributes,
            ..Default::default()
        })
    }

    fn attr(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    fn children<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }

    fn first(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.name == name)
    }
}

fn read_tree(xml: &str) -> Result<Element> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => stack.push(Element::from_start(&e)?),
            Ok(Event::Empty(e)) => {
                let element = Element::from_start(&e)?;
                attach(&mut stack, &mut root, element)?;
            }
            Ok(Event::End(_)) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| Error::Parse("unbalanced closing tag".to_string()))?;
                attach(&mut stack, &mut root, element)?;
            }
            Ok(Event::Text(text)) => {
                if let Some(current) = stack.last_mut() {
                    let text = text
                        .unescape()
                        .map_err(|e| Error::Parse(format!("invalid text in <{}>: {}", current.name, e)))?;
                    current.text.push_str(&text);
                }
            }
            Ok(Event::CData(data)) => {
                if let Some(current) = stack.last_mut() {
                    current
                        .text
                        .push_str(&String::from_utf8_lossy(&data.into_inner()));
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(Error::Parse(format!(
                    "malformed XML at position {}: {}",
                    reader.buffer_position(),
                    e
                )));
            }
            _ => {}
        }
    }

    if let Some(open) = stack.last() {
        return Err(Error::Parse(format!("unclosed element <{}>", open.name)));
    }

    root.ok_or_else(|| Error::Parse("document has no root element".to_string()))
}

fn attach(stack: &mut [Element], root: &mut Option<Element>, element: Element) -> Result<()> {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(element);
    } else if root.is_none() {
        *root = Some(element);
    } else {
        return Err(Error::Parse("document has more than one root element".to_string()));
    }

    Ok(())
}

/// Wrap a construction failure into a parse error naming the element
fn invalid(element: &str, position: usize, err: Error) -> Error {
    let reason = match err {
        Error::Validation(msg) | Error::Parse(msg) => msg,
        other => other.to_string(),
    };

    Error::Parse(format!("<{}> #{}: {}", element, position + 1, reason))
}

fn load_v1(root: &Element, name: &str) -> Result<RemoteIndex> {
    let mut index = RemoteIndex::new(name)?;

    for (i, node) in root.children("category").enumerate() {
        index.add_category(load_category_v1(node).map_err(|e| invalid("category", i, e))?);
    }

    if let Some(node) = root.first("metadata") {
        load_metadata_v1(node, &mut index);
    }

    debug!(
        "Loaded index '{}': {} categories, {} packages",
        index.name(),
        index.categories().count(),
        index.packages().count()
    );

    Ok(index)
}

fn load_metadata_v1(node: &Element, index: &mut RemoteIndex) {
    let metadata = index.metadata_mut();

    if let Some(description) = node.first("description") {
        metadata.about = description.text.clone();
    }

    for link in node.children("link") {
        let rel = link.attr("rel").unwrap_or("");
        let href = link.attr("href").unwrap_or("");

        let (name, url) = match (link.text.as_str(), href) {
            ("", url) => (url, url),
            (name, "") => (name, name),
            (name, url) => (name, url),
        };

        metadata.links.push(Link {
            link_type: LinkType::from_rel(rel),
            name: name.to_string(),
            url: url.to_string(),
        });
    }
}

fn load_category_v1(node: &Element) -> Result<Category> {
    let mut category = Category::new(node.attr("name").unwrap_or(""))?;

    for (i, pkg_node) in node.children("reapack").enumerate() {
        let package = load_package_v1(pkg_node).map_err(|e| invalid("reapack", i, e))?;

        if !category.add_package(package) {
            warn!(
                "Duplicate package in category '{}', keeping the first one",
                category.name()
            );
        }
    }

    Ok(category)
}

fn load_package_v1(node: &Element) -> Result<Package> {
    let mut package = Package::with_type_name(
        node.attr("type").unwrap_or(""),
        node.attr("name").unwrap_or(""),
    )?;

    if let Some(desc) = node.attr("desc") {
        package.set_description(desc);
    }

    for (i, ver_node) in node.children("version").enumerate() {
        let version = load_version_v1(ver_node).map_err(|e| invalid("version", i, e))?;
        package.add_version(version);
    }

    Ok(package)
}

fn load_version_v1(node: &Element) -> Result<Version> {
    let mut version = Version::new(node.attr("name").unwrap_or(""))?;

    if let Some(author) = node.attr("author") {
        version.set_author(author);
    }

    if let Some(time) = node.attr("time") {
        match DateTime::parse_from_rfc3339(time) {
            Ok(time) => version.set_time(time.with_timezone(&Utc)),
            Err(e) => debug!("Ignoring invalid release time '{}': {}", time, e),
        }
    }

    for src_node in node.children("source") {
        let platform = Platform::from_index_name(src_node.attr("platform").unwrap_or("all"));
        let file = src_node.attr("file").unwrap_or("");

        version.add_source(Source::new(platform, file, src_node.text.trim()));
    }

    if let Some(changelog) = node.first("changelog") {
        version.set_changelog(changelog.text.clone());
    }

    Ok(version)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::PackageType;
    use crate::version::VersionName;

    const INDEX: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<index version="1">
  <category name="Category Name">
    <reapack name="Hello.lua" type="script" desc="Say hello">
      <version name="1.0" author="cfillion" time="2016-02-12T01:16:40Z">
        <source platform="all">https://example.com/hello.lua</source>
        <source file="hello.png">https://example.com/hello.png</source>
        <changelog><![CDATA[Initial release]]></changelog>
      </version>
      <version name="1.1-beta">
        <source platform="win64" file="helper.dll">https://example.com/helper.dll</source>
      </version>
      <version name="1.2">
      </version>
    </reapack>
    <reapack name="Mystery" type="hologram">
      <version name="0.1"><source>https://example.com/m</source></version>
    </reapack>
  </category>
  <metadata>
    <description><![CDATA[{\rtf1 About}]]></description>
    <link rel="website">https://example.com</link>
    <link rel="donation" href="https://example.com/donate">Donate</link>
    <link rel="screenshot" href="https://example.com/shot.png">Shot</link>
    <link rel="forum" href="https://forum.example.com">Forum</link>
    <link href="https://example.com/home">Home</link>
  </metadata>
</index>
"#;

    #[test]
    fn test_parse_v1() {
        let index = parse("Remote Name", INDEX).unwrap();
        assert_eq!(index.name(), "Remote Name");

        let package = index.find_package("Category Name", "Hello.lua").unwrap();
        assert_eq!(package.package_type(), PackageType::Script);
        assert_eq!(package.display_name(), "Say hello");

        // 1.2 has no sources and is dropped
        let names: Vec<String> = package.versions().map(|v| v.name().to_string()).collect();
        assert_eq!(names, vec!["1.0", "1.1-beta"]);

        let first = package.version(0).unwrap();
        assert_eq!(first.author(), "cfillion");
        assert_eq!(first.changelog(), "Initial release");
        assert!(first.time().is_some());

        let sources: Vec<_> = first.sources().collect();
        assert_eq!(sources.len(), 2);
        assert!(sources[0].is_main());
        assert_eq!(sources[0].platform(), Platform::All);
        assert_eq!(sources[0].url(), "https://example.com/hello.lua");
        assert_eq!(sources[1].file(), "hello.png");

        let beta = package.version(1).unwrap();
        assert_eq!(beta.author(), "");
        assert!(beta.time().is_none());
        assert_eq!(beta.sources().next().unwrap().platform(), Platform::Win64);
    }

    #[test]
    fn test_unknown_type_kept() {
        let index = parse("Remote", INDEX).unwrap();
        let package = index.find_package("Category Name", "Mystery").unwrap();
        assert_eq!(package.package_type(), PackageType::Unknown);
        assert_eq!(package.type_name(), "hologram");
    }

    #[test]
    fn test_metadata() {
        let index = parse("Remote", INDEX).unwrap();
        let metadata = index.metadata();
        assert_eq!(metadata.about, "{\\rtf1 About}");
        assert_eq!(metadata.links.len(), 5);
        assert_eq!(metadata.links[0].name, "https://example.com");
        assert_eq!(metadata.links[0].url, "https://example.com");
        assert_eq!(metadata.links[1].link_type, LinkType::Donation);
        assert_eq!(metadata.links[1].name, "Donate");
        assert_eq!(metadata.links[1].url, "https://example.com/donate");
        assert_eq!(metadata.links[2].link_type, LinkType::Screenshot);
        assert_eq!(metadata.links[2].name, "Shot");
        assert_eq!(metadata.links[3].link_type, LinkType::Other);
        assert_eq!(metadata.links[4].link_type, LinkType::Website);

        let websites: Vec<&str> = metadata
            .links(LinkType::Website)
            .map(|l| l.name.as_str())
            .collect();
        assert_eq!(websites, vec!["https://example.com", "Home"]);
        assert_eq!(metadata.links(LinkType::Screenshot).count(), 1);
    }

    #[test]
    fn test_missing_optional_attributes() {
        let xml = r#"<index version="1"><category name="C">
            <reapack name="P" type="script"><version name="1.0"><source /></version></reapack>
        </category></index>"#;

        let index = parse("Remote", xml).unwrap();
        let package = index.find_package("C", "P").unwrap();
        let source = package.version(0).unwrap().sources().next().unwrap();
        assert_eq!(source.platform(), Platform::All);
        assert!(source.is_main());
        assert_eq!(source.url(), "");
    }

    #[test]
    fn test_invalid_time_is_ignored() {
        let xml = r#"<index version="1"><category name="C">
            <reapack name="P" type="script"><version name="1.0" time="yesterday"><source>u</source></version></reapack>
        </category></index>"#;

        let index = parse("Remote", xml).unwrap();
        let package = index.find_package("C", "P").unwrap();
        assert!(package.version(0).unwrap().time().is_none());
    }

    #[test]
    fn test_structural_failures() {
        let cases = [
            ("<index version=\"1\"><category><reapack name=\"P\" /></category></index>", "<category> #1"),
            ("<index version=\"1\"><category name=\"C\"><reapack type=\"script\" /></category></index>", "<reapack> #1"),
            (
                "<index version=\"1\"><category name=\"C\"><reapack name=\"P\"><version name=\"1.0\"><source>u</source></version><version name=\"x\" /></reapack></category></index>",
                "<version> #2",
            ),
        ];

        for (xml, element) in cases {
            match parse("Remote", xml) {
                Err(Error::Parse(msg)) => assert!(msg.contains(element), "{}: {}", element, msg),
                other => panic!("expected parse error for {}, got {:?}", element, other.map(|i| i.name().to_string())),
            }
        }
    }

    #[test]
    fn test_document_errors() {
        for xml in [
            "",
            "<index version=\"1\">",
            "<index version=\"1\"></category>",
            "<index version=\"1\"/><index version=\"1\"/>",
            "<root version=\"1\"/>",
            "<index/>",
            "<index version=\"2\"/>",
        ] {
            assert!(
                matches!(parse("Remote", xml), Err(Error::Parse(_))),
                "'{}' should fail",
                xml
            );
        }
    }

    #[test]
    fn test_empty_index() {
        let index = parse("Remote", "<index version=\"1\"/>").unwrap();
        assert_eq!(index.packages().count(), 0);
        assert!(index.metadata().about.is_empty());
    }

    #[test]
    fn test_versions_sorted_after_parse() {
        let xml = r#"<index version="1"><category name="C"><reapack name="P" type="script">
            <version name="2.0"><source>u</source></version>
            <version name="1.0"><source>u</source></version>
            <version name="1.0"><source>dup</source></version>
        </reapack></category></index>"#;

        let index = parse("Remote", xml).unwrap();
        let package = index.find_package("C", "P").unwrap();
        let first = package.version(0).unwrap();
        assert_eq!(first.name(), &VersionName::parse("1.0").unwrap());
        assert_eq!(first.sources().next().unwrap().url(), "u");
        assert_eq!(package.versions().count(), 2);
    }
}
