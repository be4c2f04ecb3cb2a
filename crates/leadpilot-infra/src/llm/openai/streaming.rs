//! Chat Completions stream chunk to [`StreamEvent`] mapping.
//!
//! Each chunk maps to its events in order: text, tool-call fragments, the
//! finish signal, then usage. Fragments keep their provider index and are
//! not accumulated here.

use async_openai::types::chat::{CreateChatCompletionStreamResponse, FinishReason as OaiFinish};

use leadpilot_types::llm::{FinishReason, StreamEvent, Usage};

pub fn map_finish_reason(reason: &OaiFinish) -> FinishReason {
    match reason {
        OaiFinish::Stop => FinishReason::Stop,
        OaiFinish::Length => FinishReason::Length,
        OaiFinish::ToolCalls | OaiFinish::FunctionCall => FinishReason::ToolCalls,
        OaiFinish::ContentFilter => FinishReason::ContentFilter,
    }
}

/// Map one streamed chunk to zero or more stream events.
pub fn map_chunk(chunk: &CreateChatCompletionStreamResponse) -> Vec<StreamEvent> {
    let mut events = Vec::new();

    for choice in &chunk.choices {
        if let Some(text) = choice.delta.content.as_ref().filter(|t| !t.is_empty()) {
            events.push(StreamEvent::TextDelta { text: text.clone() });
        }
        for tc in choice.delta.tool_calls.iter().flatten() {
            let function = tc.function.as_ref();
            events.push(StreamEvent::ToolCallDelta {
                index: tc.index as usize,
                id: tc.id.clone(),
                name: function.and_then(|f| f.name.clone()),
                arguments: function.and_then(|f| f.arguments.clone()),
            });
        }
        if let Some(reason) = &choice.finish_reason {
            events.push(StreamEvent::Finish {
                reason: map_finish_reason(reason),
            });
        }
    }

    // The final chunk carries usage with an empty choices array.
    if let Some(usage) = &chunk.usage {
        events.push(StreamEvent::Usage(Usage {
            input_tokens: usage.prompt_tokens,
            output_tokens: usage.completion_tokens,
        }));
    }

    events
}
