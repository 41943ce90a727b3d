//! `dvagent ask` - Run one agent turn locally.

use dvagent_agent::AgentRequest;
use dvagent_core::credential::CredentialContext;
use dvagent_core::message::Message;
use dvagent_telemetry::Trace;
use std::path::Path;

pub async fn run(
    config_path: Option<&Path>,
    message: String,
    model: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config(config_path)?;
    let state = dvagent_gateway::build_state(&config)?;

    let credential = state.credentials.resolve(&CredentialContext::default())?;
    let request = AgentRequest {
        messages: vec![Message::user(message)],
        model: model.unwrap_or_else(|| state.defaults.model.clone()),
        temperature: state.defaults.temperature,
        max_tokens: state.defaults.max_tokens,
        credential,
    };

    let trace_id = state.agent.start_trace(&request);
    let result = state.agent.run(&trace_id, request).await;

    if let Some(trace) = state.traces().get_trace(&trace_id) {
        eprintln!("{}", format_outline(&trace));
    }

    let outcome = result?;
    println!("{}", outcome.response);
    Ok(())
}

/// Render a trace as an indented span tree, one span per line.
pub fn format_outline(trace: &Trace) -> String {
    let mut out = format!(
        "trace {} [{:?}] {}ms",
        trace.trace_id,
        trace.status,
        trace.execution_time_ms.unwrap_or_default()
    );
    for span in &trace.spans {
        let mut depth = 0;
        let mut parent = span.parent_id.as_deref();
        while let Some(id) = parent {
            depth += 1;
            parent = trace.span(id).and_then(|p| p.parent_id.as_deref());
        }
        out.push_str(&format!(
            "\n{}{} {} [{:?}] {}ms",
            "  ".repeat(depth + 1),
            span.span_type,
            span.name,
            span.status,
            span.duration_ms.unwrap_or_default()
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use dvagent_telemetry::{SpanKind, SpanStatus, TraceStatus, TraceStore};
    use serde_json::json;

    #[test]
    fn outline_indents_by_depth() {
        let store = TraceStore::default();
        let trace_id = store.create_trace(Some("t-1"), "list 2 tables");
        let agent = store.add_span(&trace_id, SpanKind::Agent, "Agent Chat", json!({}), None).unwrap();
        let llm = store
            .add_span(&trace_id, SpanKind::Llm, "llm/serving-endpoints/m/invocations", json!({}), Some(agent.as_str()))
            .unwrap();
        let tool = store
            .add_span(&trace_id, SpanKind::Tool, "list_tables", json!({}), Some(llm.as_str()))
            .unwrap();
        for id in [&tool, &llm, &agent] {
            store.complete_span(&trace_id, id, json!({}), SpanStatus::Ok);
        }
        store.complete_trace(&trace_id, TraceStatus::Ok);

        let outline = format_outline(&store.get_trace(&trace_id).unwrap());
        let lines: Vec<_> = outline.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("trace t-1 [Ok]"));
        assert!(lines[1].starts_with("  AGENT Agent Chat [Ok]"));
        assert!(lines[2].starts_with("    LLM llm/serving-endpoints/m/invocations"));
        assert!(lines[3].starts_with("      TOOL list_tables"));
    }
}
