//! AS-link graph formatter: ingest decoupled from aggregation through a
//! bounded channel and a single consumer thread.

use crate::error::ParserError;
use crate::format::{Formatter, RecordInfo};
use crate::models::RecordStack;
use crate::sink::SerialWriter;
use bytes::Bytes;
use crossbeam_channel::{bounded, Sender};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

/// Ingest capacity; producers block on backpressure beyond this.
const PATH_CHANNEL_CAPACITY: usize = 32;

#[derive(Debug, Default, Clone)]
pub struct AsNode {
    pub count: u64,
    pub next: BTreeSet<u32>,
    pub is_origin: bool,
}

/// Directed AS graph: edges point from the origin toward the collector.
#[derive(Debug, Default)]
pub struct AsGraph {
    nodes: BTreeMap<u32, AsNode>,
}

impl AsGraph {
    /// Fold one observed AS path (leftmost = nearest peer, rightmost =
    /// origin) into the graph. Each AS is counted once per path even if
    /// prepending repeats it.
    pub fn add_path(&mut self, path: &[u32]) {
        let mut counted: HashSet<u32> = HashSet::new();
        for i in (0..path.len()).rev() {
            let node = self.nodes.entry(path[i]).or_default();
            if counted.insert(path[i]) {
                node.count += 1;
            }
            if i == path.len() - 1 {
                node.is_origin = true;
            }
            if i != 0 {
                node.next.insert(path[i - 1]);
            }
        }
    }

    pub fn node(&self, asn: u32) -> Option<&AsNode> {
        self.nodes.get(&asn)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Render as directed-graph text. Node decoration encodes
    /// origin/single-occurrence status; colors were chosen to be light
    /// but noticeable.
    pub fn to_dot(&self) -> String {
        let mut nodes = String::new();
        let mut edges = String::new();
        for (asn, node) in &self.nodes {
            nodes.push_str(&format!(
                "{} {}; // appeared: {}\n",
                asn,
                node.dot_attributes(),
                node.count
            ));
            if !node.next.is_empty() {
                let successors = node
                    .next
                    .iter()
                    .map(|n| n.to_string())
                    .collect::<Vec<_>>()
                    .join(" ");
                edges.push_str(&format!("{} -> {{ {} }};\n", asn, successors));
            }
        }
        format!("digraph as_map {{\n{}\n{}}}\n", nodes, edges)
    }
}

impl AsNode {
    fn dot_attributes(&self) -> String {
        let color = if self.is_origin && self.count == 1 {
            "darkorchid1"
        } else if self.is_origin {
            "cornflowerblue"
        } else if self.count == 1 {
            "firebrick1"
        } else {
            return String::new();
        };
        format!("[style=\"filled\",fillcolor=\"{}\"]", color)
    }
}

/// `ml`: streams every record's AS path into the aggregator thread; the
/// summary joins the aggregator and writes the graph.
pub struct AsMapFormatter {
    sender: Mutex<Option<Sender<Vec<u32>>>>,
    aggregator: Mutex<Option<JoinHandle<AsGraph>>>,
    out: Arc<SerialWriter>,
}

impl AsMapFormatter {
    pub fn new(out: Arc<SerialWriter>) -> Self {
        let (sender, receiver) = bounded::<Vec<u32>>(PATH_CHANNEL_CAPACITY);
        let aggregator = std::thread::spawn(move || {
            let mut graph = AsGraph::default();
            while let Ok(path) = receiver.recv() {
                graph.add_path(&path);
            }
            graph
        });
        AsMapFormatter {
            sender: Mutex::new(Some(sender)),
            aggregator: Mutex::new(Some(aggregator)),
            out,
        }
    }
}

impl Formatter for AsMapFormatter {
    fn format(&self, record: &RecordStack, _info: &RecordInfo) -> Result<Option<Bytes>, ParserError> {
        let path = match record.as_path() {
            Some(path) if !path.is_empty() => path,
            _ => return Ok(None),
        };
        // clone the sender out of the lock so a blocked send does not
        // hold the mutex against other producers
        let sender = self.sender.lock().unwrap().clone();
        if let Some(sender) = sender {
            sender
                .send(path)
                .map_err(|_| ParserError::FormatError("AS path aggregator is gone".to_string()))?;
        }
        Ok(None)
    }

    fn summarize(&self) {
        // closing the channel ends the aggregator loop
        drop(self.sender.lock().unwrap().take());
        let graph = match self.aggregator.lock().unwrap().take() {
            Some(handle) => match handle.join() {
                Ok(graph) => graph,
                Err(_) => {
                    log::error!("AS path aggregator panicked");
                    return;
                }
            },
            None => return,
        };
        let _ = self.out.write_str(&graph.to_dot());
    }
}
