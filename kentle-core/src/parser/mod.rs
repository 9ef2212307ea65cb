use std::path::Path;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::ParseError;
use crate::types::{Connection, Definition, Hop, Parameter, Step};

const ROOT: &str = "transformation";

pub fn parse_definition_file(path: impl AsRef<Path>) -> Result<Definition, ParseError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|source| ParseError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_definition_str(&content)
}

pub fn parse_definition_str(input: &str) -> Result<Definition, ParseError> {
    if input.trim().is_empty() {
        return Err(ParseError::Empty);
    }

    let mut reader = Reader::from_str(input);
    reader.config_mut().trim_text(true);

    let mut state = ParseState::default();
    loop {
        let event = match reader.read_event() {
            Ok(e) => e,
            Err(source) => return Err(xml_error(&reader, source)),
        };
        match event {
            Event::Start(e) => state.open(element_name(&e))?,
            Event::Empty(e) => {
                state.open(element_name(&e))?;
                state.close()?;
            }
            Event::Text(e) => {
                let text = e.unescape().map_err(|source| xml_error(&reader, source))?;
                state.text.push_str(&text);
            }
            Event::CData(e) => state.text.push_str(&String::from_utf8_lossy(&e)),
            Event::End(_) => state.close()?,
            Event::Eof => break,
            _ => {}
        }
    }

    if !state.root_seen {
        return Err(ParseError::Empty);
    }
    Ok(state.definition)
}

fn xml_error(reader: &Reader<&[u8]>, source: quick_xml::Error) -> ParseError {
    ParseError::Xml {
        position: reader.buffer_position() as u64,
        source,
    }
}

fn element_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.local_name().as_ref()).into_owned()
}

/// A repeated element whose children are still being collected.
enum Pending {
    Step(PendingStep),
    Hop(PendingHop),
    Parameter(PendingParameter),
    Connection(PendingConnection),
}

#[derive(Default)]
struct PendingStep {
    name: Option<String>,
    step_type: Option<String>,
    description: Option<String>,
    copies: Option<u32>,
    distribute: Option<bool>,
}

#[derive(Default)]
struct PendingHop {
    from: Option<String>,
    to: Option<String>,
    enabled: Option<bool>,
}

#[derive(Default)]
struct PendingParameter {
    name: Option<String>,
    default_value: Option<String>,
    description: Option<String>,
}

#[derive(Default)]
struct PendingConnection {
    name: Option<String>,
    connection_type: Option<String>,
    server: Option<String>,
    database: Option<String>,
}

#[derive(Default)]
struct ParseState {
    path: Vec<String>,
    text: String,
    root_seen: bool,
    pending: Option<Pending>,
    definition: Definition,
}

impl ParseState {
    fn open(&mut self, name: String) -> Result<(), ParseError> {
        if self.path.is_empty() {
            if self.root_seen || name != ROOT {
                return Err(ParseError::NotATransformation { found: name });
            }
            self.root_seen = true;
        }
        self.path.push(name);
        self.text.clear();

        let pending = match self.segments().as_slice() {
            [ROOT, "step"] => Some(Pending::Step(PendingStep::default())),
            [ROOT, "order", "hop"] => Some(Pending::Hop(PendingHop::default())),
            [ROOT, "info", "parameters", "parameter"] => {
                Some(Pending::Parameter(PendingParameter::default()))
            }
            [ROOT, "connection"] => Some(Pending::Connection(PendingConnection::default())),
            _ => None,
        };
        if pending.is_some() {
            self.pending = pending;
        }
        Ok(())
    }

    fn close(&mut self) -> Result<(), ParseError> {
        let value = std::mem::take(&mut self.text).trim().to_string();
        self.assign(value)?;

        let finished = matches!(
            self.segments().as_slice(),
            [ROOT, "step"]
                | [ROOT, "order", "hop"]
                | [ROOT, "info", "parameters", "parameter"]
                | [ROOT, "connection"]
        );
        if finished {
            if let Some(pending) = self.pending.take() {
                self.finish(pending)?;
            }
        }
        self.path.pop();
        Ok(())
    }

    fn segments(&self) -> Vec<&str> {
        self.path.iter().map(String::as_str).collect()
    }

    fn location(&self) -> String {
        self.path.join("/")
    }

    fn assign(&mut self, value: String) -> Result<(), ParseError> {
        let location = self.location();
        let optional = |v: String| if v.is_empty() { None } else { Some(v) };

        let segments: Vec<String> = self.path.clone();
        let segments: Vec<&str> = segments.iter().map(String::as_str).collect();
        let info = &mut self.definition.info;

        match (segments.as_slice(), self.pending.as_mut()) {
            ([ROOT, "info", "name"], _) => info.name = value,
            ([ROOT, "info", "description"], _) => info.description = optional(value),
            ([ROOT, "info", "trans_version"], _) => info.version = optional(value),
            ([ROOT, "info", "directory"], _) => info.directory = optional(value),

            ([ROOT, "step", field], Some(Pending::Step(step))) => match *field {
                "name" => step.name = optional(value),
                "type" => step.step_type = optional(value),
                "description" => step.description = optional(value),
                "copies" => step.copies = parse_copies(&location, value)?,
                "distribute" => step.distribute = Some(parse_flag(&location, value)?),
                _ => {}
            },
            ([ROOT, "order", "hop", field], Some(Pending::Hop(hop))) => match *field {
                "from" => hop.from = optional(value),
                "to" => hop.to = optional(value),
                "enabled" => hop.enabled = Some(parse_flag(&location, value)?),
                _ => {}
            },
            ([ROOT, "info", "parameters", "parameter", field], Some(Pending::Parameter(p))) => {
                match *field {
                    "name" => p.name = optional(value),
                    "default_value" => p.default_value = optional(value),
                    "description" => p.description = optional(value),
                    _ => {}
                }
            }
            ([ROOT, "connection", field], Some(Pending::Connection(c))) => match *field {
                "name" => c.name = optional(value),
                "type" => c.connection_type = optional(value),
                "server" => c.server = optional(value),
                "database" => c.database = optional(value),
                _ => {}
            },
            _ => {}
        }
        Ok(())
    }

    fn finish(&mut self, pending: Pending) -> Result<(), ParseError> {
        let def = &mut self.definition;
        match pending {
            Pending::Step(s) => {
                let path = format!("{ROOT}/step[{}]", def.steps.len());
                let name = s.name.ok_or(ParseError::MissingElement {
                    element: "step",
                    missing: "name",
                    path: path.clone(),
                })?;
                let step_type = s.step_type.ok_or(ParseError::MissingElement {
                    element: "step",
                    missing: "type",
                    path,
                })?;
                def.steps.push(Step {
                    name,
                    step_type,
                    description: s.description,
                    copies: s.copies.unwrap_or(1),
                    distribute: s.distribute.unwrap_or(true),
                });
            }
            Pending::Hop(h) => {
                let path = format!("{ROOT}/order/hop[{}]", def.hops.len());
                let from = h.from.ok_or(ParseError::MissingElement {
                    element: "hop",
                    missing: "from",
                    path: path.clone(),
                })?;
                let to = h.to.ok_or(ParseError::MissingElement {
                    element: "hop",
                    missing: "to",
                    path,
                })?;
                def.hops.push(Hop {
                    from,
                    to,
                    enabled: h.enabled.unwrap_or(true),
                });
            }
            Pending::Parameter(p) => {
                let name = p.name.ok_or(ParseError::MissingElement {
                    element: "parameter",
                    missing: "name",
                    path: format!("{ROOT}/info/parameters/parameter[{}]", def.parameters.len()),
                })?;
                def.parameters.push(Parameter {
                    name,
                    default_value: p.default_value,
                    description: p.description,
                });
            }
            Pending::Connection(c) => {
                let name = c.name.ok_or(ParseError::MissingElement {
                    element: "connection",
                    missing: "name",
                    path: format!("{ROOT}/connection[{}]", def.connections.len()),
                })?;
                def.connections.push(Connection {
                    name,
                    connection_type: c.connection_type,
                    server: c.server,
                    database: c.database,
                });
            }
        }
        Ok(())
    }
}

fn parse_flag(path: &str, value: String) -> Result<bool, ParseError> {
    match value.to_ascii_uppercase().as_str() {
        "Y" | "YES" | "TRUE" => Ok(true),
        "N" | "NO" | "FALSE" | "" => Ok(false),
        _ => Err(ParseError::InvalidValue {
            path: path.to_string(),
            value,
            reason: "expected Y or N",
        }),
    }
}

fn parse_copies(path: &str, value: String) -> Result<Option<u32>, ParseError> {
    if value.is_empty() {
        return Ok(None);
    }
    // Variable expressions are resolved by the engine when it starts the step.
    if value.contains("${") || value.contains("%%") {
        return Ok(None);
    }
    value
        .parse::<u32>()
        .map(Some)
        .map_err(|_| ParseError::InvalidValue {
            path: path.to_string(),
            value,
            reason: "expected a non-negative integer",
        })
}
