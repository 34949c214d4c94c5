//! Single-socket console registry and its command language

use std::collections::BTreeSet;
use std::sync::{Mutex, MutexGuard};

use anyhow::{bail, Context, Result};
use castmesh_core::{EventData, LocalDelivery};

/// Local server with exactly one socket: the operator's terminal
pub struct Console {
    socket_id: String,
    rooms: Mutex<BTreeSet<String>>,
}

impl Console {
    pub fn new(socket_id: impl Into<String>) -> Self {
        Console {
            socket_id: socket_id.into(),
            rooms: Mutex::new(BTreeSet::new()),
        }
    }

    pub fn socket_id(&self) -> &str {
        &self.socket_id
    }

    /// Returns false if already a member
    pub fn join(&self, room: &str) -> bool {
        self.rooms().insert(room.to_string())
    }

    pub fn leave(&self, room: &str) -> bool {
        self.rooms().remove(room)
    }

    pub fn is_member(&self, room: &str) -> bool {
        self.rooms().contains(room)
    }

    fn rooms(&self) -> MutexGuard<'_, BTreeSet<String>> {
        self.rooms.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn emit(&self, via: &str, event: &str, data: &EventData) {
        let body = match data.as_text() {
            Some(text) if !data.binary => text.to_string(),
            _ => format!("<{} bytes>", data.len()),
        };
        println!("[{via}] {event}: {body}");
    }
}

impl LocalDelivery for Console {
    fn deliver_to_socket(&self, socket_id: &str, event: &str, data: &EventData) {
        if socket_id == self.socket_id {
            self.emit("socket", event, data);
        }
    }

    fn deliver_to_room(&self, room: &str, event: &str, data: &EventData) {
        if self.is_member(room) {
            self.emit(room, event, data);
        }
    }

    fn deliver_to_all(&self, event: &str, data: &EventData) {
        self.emit("all", event, data);
    }
}

/// How a cast command encodes its payload
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Encoding {
    Text,
    Binary,
    Json,
}

impl Encoding {
    fn encode(self, data: &str) -> Result<EventData> {
        Ok(match self {
            Encoding::Text => EventData::text(data),
            Encoding::Binary => EventData::binary(data.as_bytes().to_vec()),
            Encoding::Json => EventData::json(&serde_json::json!({ "message": data }))?,
        })
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum Command {
    Join(String),
    Leave(String),
    Broadcast { event: String, data: EventData },
    Roomcast { room: String, event: String, data: EventData },
    Socketcast { socket_id: String, event: String, data: EventData },
    Peers,
    Stats,
    Help,
    Quit,
}

pub const HELP: &str = "\
commands:
  join <room> | leave <room>
  broadcast[bin|json] <event> <data>
  roomcast[bin|json] <room> <event> <data>
  socketcast[bin|json] <socket> <event> <data>
  peers | stats | help | quit";

impl Command {
    /// Parse one input line. Blank lines yield `None`.
    pub fn parse(line: &str) -> Result<Option<Command>> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }
        let (verb, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
        let rest = rest.trim_start();

        let (cast, encoding) = match verb.strip_suffix("bin") {
            Some(cast) => (cast, Encoding::Binary),
            None => match verb.strip_suffix("json") {
                Some(cast) => (cast, Encoding::Json),
                None => (verb, Encoding::Text),
            },
        };

        let command = match (verb, cast) {
            ("join", _) => Command::Join(single(rest, "join <room>")?),
            ("leave", _) => Command::Leave(single(rest, "leave <room>")?),
            ("peers", _) => Command::Peers,
            ("stats", _) => Command::Stats,
            ("help", _) => Command::Help,
            ("quit" | "exit", _) => Command::Quit,
            (_, "broadcast") => {
                let [event, data] = split_args(rest, "broadcast <event> <data>")?;
                Command::Broadcast {
                    event,
                    data: encoding.encode(&data)?,
                }
            }
            (_, "roomcast") => {
                let [room, rest] = split_args(rest, "roomcast <room> <event> <data>")?;
                let [event, data] = split_args(&rest, "roomcast <room> <event> <data>")?;
                Command::Roomcast {
                    room,
                    event,
                    data: encoding.encode(&data)?,
                }
            }
            (_, "socketcast") => {
                let [socket_id, rest] = split_args(rest, "socketcast <socket> <event> <data>")?;
                let [event, data] = split_args(&rest, "socketcast <socket> <event> <data>")?;
                Command::Socketcast {
                    socket_id,
                    event,
                    data: encoding.encode(&data)?,
                }
            }
            _ => bail!("unknown command {verb:?}; try `help`"),
        };
        Ok(Some(command))
    }
}

fn single(rest: &str, usage: &str) -> Result<String> {
    match rest.split_whitespace().collect::<Vec<_>>().as_slice() {
        [one] => Ok(one.to_string()),
        _ => bail!("usage: {usage}"),
    }
}

/// Split off the first word; the remainder keeps its inner spacing.
fn split_args(rest: &str, usage: &str) -> Result<[String; 2]> {
    let (head, tail) = rest
        .split_once(char::is_whitespace)
        .with_context(|| format!("usage: {usage}"))?;
    let tail = tail.trim_start();
    if head.is_empty() || tail.is_empty() {
        bail!("usage: {usage}");
    }
    Ok([head.to_string(), tail.to_string()])
}
