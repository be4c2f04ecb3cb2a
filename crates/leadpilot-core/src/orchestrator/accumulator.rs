//! Reassembly of streamed tool-call fragments.

use serde_json::Value;
use tracing::warn;

/// Indices beyond this are treated as malformed and ignored.
const MAX_TOOL_CALLS: usize = 64;

#[derive(Debug, Clone, Default)]
struct Fragment {
    id: Option<String>,
    name: Option<String>,
    arguments: String,
}

/// A fully received tool call.
#[derive(Debug, Clone, PartialEq)]
pub struct AccumulatedCall {
    pub index: usize,
    pub id: Option<String>,
    pub name: String,
    /// Concatenated argument text, exactly as streamed.
    pub raw_arguments: String,
}

impl AccumulatedCall {
    /// Parse the argument text. Empty or malformed text yields `{}`.
    pub fn arguments(&self) -> Value {
        parse_arguments(&self.name, &self.raw_arguments)
    }
}

/// Parse model-produced argument JSON, falling back to an empty object.
pub fn parse_arguments(tool: &str, raw: &str) -> Value {
    if raw.trim().is_empty() {
        return Value::Object(Default::default());
    }
    serde_json::from_str(raw).unwrap_or_else(|e| {
        warn!(tool, error = %e, "tool arguments are not valid JSON, using empty arguments");
        Value::Object(Default::default())
    })
}

/// Collects tool-call fragments keyed by index.
///
/// Slots grow to the highest index seen. `id` and `name` are overwritten
/// when a fragment carries them; argument text is appended. Calls are
/// released in the order their indices were first observed.
#[derive(Debug, Default)]
pub struct ToolCallAccumulator {
    slots: Vec<Fragment>,
    first_seen: Vec<usize>,
}

impl ToolCallAccumulator {
    pub fn push(
        &mut self,
        index: usize,
        id: Option<String>,
        name: Option<String>,
        arguments: Option<String>,
    ) {
        if index >= MAX_TOOL_CALLS {
            warn!(index, "ignoring tool-call fragment with out-of-range index");
            return;
        }
        if index >= self.slots.len() {
            self.slots.resize_with(index + 1, Fragment::default);
        }
        if !self.first_seen.contains(&index) {
            self.first_seen.push(index);
        }

        let slot = &mut self.slots[index];
        if let Some(id) = id.filter(|s| !s.is_empty()) {
            slot.id = Some(id);
        }
        if let Some(name) = name.filter(|s| !s.is_empty()) {
            slot.name = Some(name);
        }
        if let Some(arguments) = arguments {
            slot.arguments.push_str(&arguments);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.first_seen.is_empty()
    }

    /// Release the named calls. Fragments that never received a name are dropped.
    pub fn finish(mut self) -> Vec<AccumulatedCall> {
        let mut calls = Vec::with_capacity(self.first_seen.len());
        for index in self.first_seen {
            let fragment = std::mem::take(&mut self.slots[index]);
            match fragment.name {
                Some(name) => calls.push(AccumulatedCall {
                    index,
                    id: fragment.id,
                    name,
                    raw_arguments: fragment.arguments,
                }),
                None => warn!(index, "dropping tool call that never received a name"),
            }
        }
        calls
    }
}
