// Copyright 2025 Lablup Inc. and Jeongkyu Shin
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Markup decoder for control-CLI output.
//!
//! The payload is read with quick-xml's event reader and folded into a
//! nested [`StructuredValue`] tree:
//!
//! - an element holding only text becomes [`StructuredValue::Text`]
//! - an element with children or attributes becomes [`StructuredValue::Map`]
//! - repeated sibling elements collapse into [`StructuredValue::List`]
//! - attributes are stored under `@name`, text mixed with children under `#text`
//!
//! The root element is the result envelope; [`parse_structured`] returns its
//! contents, not the root itself.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::error::{FleetError, Result};

pub type StructuredMap = BTreeMap<String, StructuredValue>;

const TEXT_KEY: &str = "#text";

/// One node of a decoded payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum StructuredValue {
    Text(String),
    List(Vec<StructuredValue>),
    Map(StructuredMap),
}

impl StructuredValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&StructuredMap> {
        match self {
            Self::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Items of a list; a single value is treated as a one-element list.
    pub fn as_list(&self) -> Vec<&StructuredValue> {
        match self {
            Self::List(items) => items.iter().collect(),
            other => vec![other],
        }
    }

    pub fn get(&self, key: &str) -> Option<&StructuredValue> {
        self.as_map().and_then(|map| map.get(key))
    }

    /// Walk a dotted path of map keys, e.g. `"volInfo.volumes.count"`.
    pub fn get_path(&self, path: &str) -> Option<&StructuredValue> {
        path.split('.')
            .try_fold(self, |value, key| value.get(key))
    }
}

struct Frame {
    name: String,
    children: StructuredMap,
    text: String,
}

impl Frame {
    fn open(start: &BytesStart<'_>) -> Result<Self> {
        Ok(Self {
            name: element_name(start),
            children: attributes(start)?,
            text: String::new(),
        })
    }

    fn close(self) -> (String, StructuredValue) {
        let text = self.text.trim();
        let value = if self.children.is_empty() {
            StructuredValue::Text(text.to_string())
        } else {
            let mut children = self.children;
            if !text.is_empty() {
                children.insert(TEXT_KEY.to_string(), StructuredValue::Text(text.to_string()));
            }
            StructuredValue::Map(children)
        };
        (self.name, value)
    }
}

/// Decode a markup payload and return the contents of its root element.
pub fn parse_structured(raw: &str) -> Result<StructuredMap> {
    let raw = raw.trim_start_matches('\u{feff}');
    let mut reader = Reader::from_str(raw);

    let mut stack: Vec<Frame> = Vec::new();
    let mut root: Option<StructuredValue> = None;

    loop {
        let event = reader.read_event().map_err(|e| {
            FleetError::Parse(format!(
                "malformed markup at byte {}: {e}",
                reader.error_position()
            ))
        })?;

        match event {
            Event::Start(start) => {
                ensure_single_root(&root)?;
                stack.push(Frame::open(&start)?);
            }
            Event::Empty(start) => {
                ensure_single_root(&root)?;
                let (name, value) = Frame::open(&start)?.close();
                attach(&mut stack, &mut root, name, value);
            }
            Event::End(end) => {
                let frame = stack.pop().ok_or_else(|| {
                    FleetError::Parse(format!(
                        "unexpected closing tag '{}'",
                        String::from_utf8_lossy(end.name().as_ref())
                    ))
                })?;
                let closing = String::from_utf8_lossy(end.name().as_ref()).to_string();
                if closing != frame.name {
                    return Err(FleetError::Parse(format!(
                        "expected closing tag '{}', found '{closing}'",
                        frame.name
                    )));
                }
                let (name, value) = frame.close();
                attach(&mut stack, &mut root, name, value);
            }
            Event::Text(text) => push_text(&mut stack, &String::from_utf8_lossy(&text))?,
            Event::CData(data) => push_text(&mut stack, &String::from_utf8_lossy(&data))?,
            Event::GeneralRef(reference) => {
                let name = String::from_utf8_lossy(&reference).to_string();
                push_text(&mut stack, &resolve_entity(&name))?;
            }
            Event::Eof => break,
            // Declarations, comments, processing instructions and doctypes carry no data
            _ => {}
        }
    }

    if let Some(open) = stack.last() {
        return Err(FleetError::Parse(format!(
            "unexpected end of input, element '{}' is not closed",
            open.name
        )));
    }

    match root {
        Some(StructuredValue::Map(map)) => Ok(map),
        Some(StructuredValue::Text(text)) if text.is_empty() => Ok(StructuredMap::new()),
        Some(StructuredValue::Text(text)) => {
            Ok(StructuredMap::from([(TEXT_KEY.to_string(), StructuredValue::Text(text))]))
        }
        Some(StructuredValue::List(_)) | None => {
            Err(FleetError::Parse("no root element found".to_string()))
        }
    }
}

/// Split stdout into lines, removing only the line endings.
pub fn parse_lines(raw: &str) -> Vec<String> {
    raw.lines().map(str::to_string).collect()
}

fn ensure_single_root(root: &Option<StructuredValue>) -> Result<()> {
    if root.is_some() {
        return Err(FleetError::Parse(
            "multiple root elements in payload".to_string(),
        ));
    }
    Ok(())
}

fn attach(
    stack: &mut [Frame],
    root: &mut Option<StructuredValue>,
    name: String,
    value: StructuredValue,
) {
    match stack.last_mut() {
        Some(parent) => insert_child(&mut parent.children, name, value),
        None => *root = Some(value),
    }
}

fn insert_child(children: &mut StructuredMap, name: String, value: StructuredValue) {
    match children.remove(&name) {
        None => {
            children.insert(name, value);
        }
        Some(StructuredValue::List(mut items)) => {
            items.push(value);
            children.insert(name, StructuredValue::List(items));
        }
        Some(previous) => {
            children.insert(name, StructuredValue::List(vec![previous, value]));
        }
    }
}

fn push_text(stack: &mut [Frame], text: &str) -> Result<()> {
    match stack.last_mut() {
        Some(frame) => {
            frame.text.push_str(text);
            Ok(())
        }
        None if text.trim().is_empty() => Ok(()),
        None => Err(FleetError::Parse(format!(
            "text outside of the root element: '{}'",
            text.trim()
        ))),
    }
}

fn element_name(start: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(start.name().as_ref()).to_string()
}

fn attributes(start: &BytesStart<'_>) -> Result<StructuredMap> {
    let mut map = StructuredMap::new();
    for attr in start.attributes() {
        let attr = attr.map_err(|e| FleetError::Parse(format!("invalid attribute: {e}")))?;
        let key = format!("@{}", String::from_utf8_lossy(attr.key.as_ref()));
        let value = unescape(&String::from_utf8_lossy(&attr.value));
        map.insert(key, StructuredValue::Text(value));
    }
    Ok(map)
}

fn resolve_entity(name: &str) -> String {
    let resolved = match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        _ => name.strip_prefix('#').and_then(|code| {
            let parsed = match code.strip_prefix('x').or_else(|| code.strip_prefix('X')) {
                Some(hex) => u32::from_str_radix(hex, 16).ok(),
                None => code.parse::<u32>().ok(),
            };
            parsed.and_then(char::from_u32)
        }),
    };
    match resolved {
        Some(c) => c.to_string(),
        None => format!("&{name};"),
    }
}

fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp + 1..];
        match tail.find(';') {
            Some(semi) => {
                out.push_str(&resolve_entity(&tail[..semi]));
                rest = &tail[semi + 1..];
            }
            None => {
                out.push_str(&rest[amp..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}
