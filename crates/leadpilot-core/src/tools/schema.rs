//! JSON Schema definitions advertised to the model for each tool.

use serde_json::json;

use leadpilot_types::llm::ToolDefinition;
use leadpilot_types::tool::ToolName;

pub fn definition(name: ToolName) -> ToolDefinition {
    match name {
        ToolName::BookMeeting => ToolDefinition {
            name: name.to_string(),
            description: "Book a sales consultation on the team calendar once the prospect has \
                          agreed to a concrete time. Sends a confirmation email to the attendee."
                .to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "start_iso": {
                        "type": "string",
                        "description": "Meeting start as an ISO-8601 timestamp with offset, e.g. 2025-10-24T15:00:00+05:00"
                    },
                    "end_iso": {
                        "type": "string",
                        "description": "Meeting end as an ISO-8601 timestamp with offset"
                    },
                    "attendee_email": {"type": "string", "description": "Prospect's email address"},
                    "attendee_name": {"type": "string", "description": "Prospect's name"},
                    "notes": {"type": "string", "description": "Context for the sales team"}
                },
                "required": ["start_iso", "end_iso", "attendee_email"]
            }),
        },
        ToolName::SaveLead => ToolDefinition {
            name: name.to_string(),
            description: "Create or update the lead record for this prospect. Call as soon as an \
                          email is known and again whenever qualification details change."
                .to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "email": {"type": "string", "description": "Prospect's email address"},
                    "name": {"type": "string"},
                    "company": {"type": "string"},
                    "budget_min": {"type": "number", "description": "Lower budget bound in USD"},
                    "budget_max": {"type": "number", "description": "Upper budget bound in USD"},
                    "timeline": {"type": "string", "description": "Desired timeline, e.g. '2 months'"},
                    "authority": {
                        "type": "string",
                        "enum": ["dm", "influencer", "unknown", "no"],
                        "description": "dm = decision maker"
                    },
                    "project_summary": {"type": "string"},
                    "score": {"type": "number", "description": "Only if you have a better score than the default model"},
                    "status": {"type": "string", "enum": ["hot", "warm", "cold"]}
                },
                "required": ["email"]
            }),
        },
        ToolName::NotifyTeam => ToolDefinition {
            name: name.to_string(),
            description: "Alert the sales team, e.g. about a hot lead or a booked meeting.".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "message": {"type": "string"},
                    "priority": {"type": "string", "enum": ["low", "normal", "high"]}
                },
                "required": ["message"]
            }),
        },
    }
}
