// Descendant selector matching over an html5ever DOM, trimmed down from crabquery

use {
    html5ever::{
        driver::ParseOpts, parse_document, tendril::TendrilSink, tree_builder::TreeBuilderOpts,
    },
    markup5ever::{Attribute, QualName},
    markup5ever_arcdom::{ArcDom, Handle, NodeData},
    std::{cell::Ref, collections::HashMap, convert::TryFrom, sync::Arc},
};

pub struct Document {
    doc: ArcDom,
}

fn default_parse_opts() -> ParseOpts {
    ParseOpts {
        tree_builder: TreeBuilderOpts {
            drop_doctype: true,
            ..Default::default()
        },
        ..Default::default()
    }
}

impl TryFrom<&str> for Document {
    type Error = koohii_common::Report;

    fn try_from(input: &str) -> Result<Self, Self::Error> {
        let doc = parse_document(ArcDom::default(), default_parse_opts())
            .from_utf8()
            .read_from(&mut input.as_bytes())?;

        Ok(Self { doc })
    }
}

impl Document {
    pub fn select(&self, selector: impl Into<Selector>) -> Vec<Element> {
        let sel: Selector = selector.into();
        sel.find(self.doc.document.children.borrow())
    }

    /// Concatenated text of every element matching `selector`, empty when nothing matches
    pub fn text(&self, selector: impl Into<Selector>) -> String {
        joined_text(self.select(selector))
    }

    /// Raw `<title>` text, whitespace included
    pub fn title(&self) -> String {
        self.text("title")
    }
}

fn joined_text(elements: Vec<Element>) -> String {
    elements.iter().map(Element::text).collect()
}

#[derive(Debug, PartialEq, Clone)]
enum AttributeSpec {
    Present,
    Exact(String),
    Starts(String),
    Ends(String),
    Contains(String),
}

impl AttributeSpec {
    fn matches(&self, other: &str) -> bool {
        use AttributeSpec::*;

        match self {
            Present => true,
            Exact(v) => other == v,
            Starts(v) => other.starts_with(v.as_str()),
            Ends(v) => other.ends_with(v.as_str()),
            Contains(v) => other.contains(v.as_str()),
        }
    }
}

#[derive(Debug, PartialEq, Clone)]
struct Matcher {
    tag: Option<String>,
    class: Vec<String>,
    id: Vec<String>,
    attribute: HashMap<String, AttributeSpec>,
    direct_match: bool,
}

impl From<&str> for Matcher {
    fn from(input: &str) -> Self {
        let mut res = Self {
            tag: None,
            class: vec![],
            id: vec![],
            attribute: HashMap::new(),
            direct_match: false,
        };

        if input == ">" {
            res.direct_match = true;
            return res;
        }

        let mut segments = vec![];
        let mut buf = String::new();

        for c in input.chars() {
            match c {
                '#' | '.' | '[' => {
                    segments.push(std::mem::take(&mut buf));
                }
                ']' => {
                    segments.push(std::mem::take(&mut buf));
                    continue;
                }
                _ => {}
            };

            buf.push(c);
        }
        segments.push(buf);

        for segment in segments {
            match segment.chars().next() {
                Some('#') => res.id.push(segment[1..].to_string()),
                Some('.') => res.class.push(segment[1..].to_string()),
                Some('[') => res.add_attribute(&segment[1..]),
                None => {}
                _ => res.tag = Some(segment),
            }
        }

        res
    }
}

impl Matcher {
    fn add_attribute(&mut self, spec: &str) {
        use AttributeSpec::*;

        let (key, value) = match spec.split_once('=') {
            Some((key, value)) => (key, value.trim_matches('"')),
            None => {
                self.attribute.insert(spec.to_string(), Present);
                return;
            }
        };

        let (key, attr) = match key.chars().last() {
            Some('^') => (&key[..key.len() - 1], Starts(value.to_string())),
            Some('$') => (&key[..key.len() - 1], Ends(value.to_string())),
            Some('*') => (&key[..key.len() - 1], Contains(value.to_string())),
            _ => (key, Exact(value.to_string())),
        };

        self.attribute.insert(key.to_string(), attr);
    }

    fn matches(&self, name: &QualName, attrs: Ref<'_, Vec<Attribute>>) -> bool {
        let tag_match = self
            .tag
            .as_deref()
            .map_or(true, |tag| &*name.local == tag);
        if !tag_match {
            return false;
        }

        let id_match = self.id.is_empty()
            || get_attr(&attrs, "id").map_or(false, |el_id| {
                self.id.iter().all(|id| el_id.split_whitespace().any(|eid| eid == id))
            });

        let class_match = self.class.is_empty()
            || get_attr(&attrs, "class").map_or(false, |el_class| {
                self.class
                    .iter()
                    .all(|class| el_class.split_whitespace().any(|eclass| eclass == class))
            });

        let attr_match = self.attribute.iter().all(|(k, v)| {
            get_attr(&attrs, k.as_str()).map_or(false, |value| v.matches(&value))
        });

        id_match && class_match && attr_match
    }
}

#[derive(Debug, PartialEq)]
pub struct Selector {
    matchers: Vec<Matcher>,
}

impl From<&str> for Selector {
    fn from(input: &str) -> Self {
        let matchers: Vec<_> = input.split_whitespace().map(Matcher::from).collect();

        Selector { matchers }
    }
}

fn get_attr(attrs: &Ref<'_, Vec<Attribute>>, name: &str) -> Option<String> {
    attrs
        .iter()
        .find(|attr| &attr.name.local == name)
        .map(|attr| attr.value.to_string())
}

impl Selector {
    // Pre-order walk so results come back in document order.
    fn find_nodes(
        &self,
        matcher: &Matcher,
        elements: &[Handle],
        direct_match: bool,
        acc: &mut Vec<Handle>,
    ) {
        for el in elements {
            if let NodeData::Element {
                ref name,
                ref attrs,
                ..
            } = el.data
            {
                if matcher.matches(name, attrs.borrow())
                    && !acc.iter().any(|seen| Arc::ptr_eq(seen, el))
                {
                    acc.push(Arc::clone(el));
                }
            }

            if !direct_match {
                let children: Vec<_> = el.children.borrow().iter().map(Arc::clone).collect();
                self.find_nodes(matcher, &children, false, acc);
            }
        }
    }

    fn find(&self, elements: Ref<'_, Vec<Handle>>) -> Vec<Element> {
        let mut elements: Vec<_> = elements.iter().map(Arc::clone).collect();
        let mut direct_match = false;
        let mut first = true;

        for matcher in &self.matchers {
            if matcher.direct_match {
                direct_match = true;
                continue;
            }

            // Every matcher after the first looks below the previous matches.
            let scope: Vec<Handle> = if first {
                elements
            } else {
                elements
                    .iter()
                    .flat_map(|el| {
                        el.children
                            .borrow()
                            .iter()
                            .map(Arc::clone)
                            .collect::<Vec<_>>()
                    })
                    .collect()
            };

            let mut acc = vec![];
            self.find_nodes(matcher, &scope, direct_match, &mut acc);
            elements = acc;
            direct_match = false;
            first = false;
        }

        elements.iter().map(Element::from).collect()
    }
}

#[derive(Debug)]
pub struct Element {
    handle: Handle,
}

impl From<&Handle> for Element {
    fn from(e: &Handle) -> Self {
        Element {
            handle: Arc::clone(e),
        }
    }
}

impl Element {
    pub fn attr(&self, name: &str) -> Option<String> {
        match self.handle.data {
            NodeData::Element { ref attrs, .. } => get_attr(&attrs.borrow(), name),
            _ => None,
        }
    }

    pub fn tag(&self) -> Option<String> {
        match self.handle.data {
            NodeData::Element { ref name, .. } => Some(name.local.to_string()),
            _ => None,
        }
    }

    pub fn has_attr(&self, name: &str) -> bool {
        self.attr(name).is_some()
    }

    pub fn text(&self) -> String {
        let mut res = String::new();

        for child in self.handle.children.borrow().iter() {
            match child.data {
                NodeData::Text { ref contents } => res.push_str(&contents.borrow()),
                NodeData::Element { .. } => res.push_str(&Element::from(child).text()),
                _ => {}
            }
        }

        res
    }

    pub fn select(&self, selector: impl Into<Selector>) -> Vec<Element> {
        let sel: Selector = selector.into();
        sel.find(self.handle.children.borrow())
    }

    /// Concatenated text of every descendant matching `selector`
    pub fn select_text(&self, selector: impl Into<Selector>) -> String {
        joined_text(self.select(selector))
    }
}
