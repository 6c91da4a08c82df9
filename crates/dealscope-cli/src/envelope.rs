//! Agent action-group envelope.
//!
//! An agent invokes a tool with `{actionGroup, function, parameters}` where
//! every parameter value is a string. The tool's JSON body is handed back as
//! text inside `functionResponse.responseBody.TEXT.body`.

use serde::{Deserialize, Serialize};

use dealscope_deals::failure_json;

use crate::tools::{Params, Tool, ToolContext};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AgentEvent {
    #[serde(default)]
    pub(crate) action_group: String,
    pub(crate) function: String,
    #[serde(default)]
    pub(crate) parameters: Vec<AgentParameter>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct AgentParameter {
    pub(crate) name: String,
    #[serde(rename = "type", default)]
    pub(crate) kind: String,
    pub(crate) value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AgentResponse {
    pub(crate) action_group: String,
    pub(crate) function: String,
    pub(crate) function_response: FunctionResponse,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct FunctionResponse {
    pub(crate) response_body: ResponseBody,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct ResponseBody {
    #[serde(rename = "TEXT")]
    pub(crate) text: TextBody,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct TextBody {
    pub(crate) body: String,
}

impl AgentResponse {
    fn wrap(event: &AgentEvent, body: String) -> Self {
        Self {
            action_group: event.action_group.clone(),
            function: event.function.clone(),
            function_response: FunctionResponse {
                response_body: ResponseBody {
                    text: TextBody { body },
                },
            },
        }
    }

    #[cfg(test)]
    pub(crate) fn body(&self) -> &str {
        &self.function_response.response_body.text.body
    }
}

/// Folds the parameter list into a name → value map. A repeated name keeps
/// its last value.
pub(crate) fn fold_parameters(parameters: &[AgentParameter]) -> Params {
    parameters
        .iter()
        .map(|p| {
            tracing::debug!(name = %p.name, kind = %p.kind, "agent parameter");
            (p.name.clone(), p.value.clone())
        })
        .collect()
}

/// Dispatches one agent event to its tool and wraps the result.
///
/// Never fails: unknown functions and tool errors are rendered as failure
/// bodies inside the envelope.
pub(crate) async fn handle_event(ctx: &ToolContext, event: &AgentEvent) -> AgentResponse {
    let function = event.function.as_str();
    tracing::info!(
        action_group = %event.action_group,
        function,
        parameters = event.parameters.len(),
        "agent event received"
    );

    let Some(tool) = Tool::from_name(function) else {
        tracing::warn!(function, "unknown function requested");
        let body = failure_json(&format!(
            "Unknown function: {function}. Available: {}",
            Tool::available()
        ));
        return AgentResponse::wrap(event, body);
    };

    let params = fold_parameters(&event.parameters);
    let body = match ctx.call(tool, &params).await {
        Ok(body) => body,
        Err(e) => {
            tracing::error!(function, error = %e, "tool failed unexpectedly");
            failure_json(&format!("Unhandled error in {function}: {e}"))
        }
    };

    AgentResponse::wrap(event, body)
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};

    use super::*;
    use crate::tools::tests::test_config;

    fn event(value: Value) -> AgentEvent {
        serde_json::from_value(value).unwrap()
    }

    fn context() -> ToolContext {
        ToolContext::from_config(test_config()).unwrap()
    }

    #[test]
    fn folds_parameters_by_name() {
        let ev = event(json!({
            "actionGroup": "deals",
            "function": "parse_deals",
            "parameters": [
                {"name": "retailer", "type": "string", "value": "rei"},
                {"name": "category", "type": "string", "value": "shoes"},
                {"name": "retailer", "type": "string", "value": "nike"}
            ]
        }));
        let params = fold_parameters(&ev.parameters);

        assert_eq!(params.len(), 2);
        assert_eq!(params["retailer"], "nike");
        assert_eq!(params["category"], "shoes");
        assert_eq!(ev.parameters[0].kind, "string");
    }

    #[test]
    fn missing_parameters_default_to_empty() {
        let ev = event(json!({"actionGroup": "deals", "function": "fetch_page"}));
        assert!(ev.parameters.is_empty());
    }

    #[tokio::test]
    async fn unknown_function_lists_available_tools() {
        let ev = event(json!({"actionGroup": "deals", "function": "buy_now", "parameters": []}));
        let response = handle_event(&context(), &ev).await;

        assert_eq!(response.action_group, "deals");
        assert_eq!(response.function, "buy_now");
        let body: Value = serde_json::from_str(response.body()).unwrap();
        assert_eq!(body["success"], false);
        assert_eq!(
            body["error"],
            "Unknown function: buy_now. Available: fetch_page, parse_deals, save_deals"
        );
    }

    #[tokio::test]
    async fn round_trips_parse_deals() {
        let products = json!([{"name": "Parka", "salePrice": 40, "originalPrice": 100}]);
        let ev = event(json!({
            "actionGroup": "deals",
            "function": "parse_deals",
            "parameters": [
                {"name": "content", "type": "string", "value": products.to_string()},
                {"name": "retailer", "type": "string", "value": "patagonia"},
                {"name": "category", "type": "string", "value": "jackets"}
            ]
        }));
        let response = handle_event(&context(), &ev).await;

        let wire = serde_json::to_value(&response).unwrap();
        assert_eq!(wire["actionGroup"], "deals");
        assert_eq!(wire["function"], "parse_deals");
        let text = wire["functionResponse"]["responseBody"]["TEXT"]["body"]
            .as_str()
            .unwrap();
        let body: Value = serde_json::from_str(text).unwrap();
        assert_eq!(body["success"], true);
        assert_eq!(body["dealsFound"], 1);
        assert_eq!(body["deals"][0]["discountPct"], 60.0);
    }

    #[tokio::test]
    async fn tool_errors_are_wrapped_as_unhandled() {
        let deals = json!([{
            "id": "d1", "name": "n", "category": "c", "retailer": "rei",
            "originalPrice": 100.0, "salePrice": 50.0, "discountPct": 50.0,
            "imageUrl": "", "productUrl": ""
        }])
        .to_string();
        let ev = event(json!({
            "actionGroup": "deals",
            "function": "save_deals",
            "parameters": [{"name": "deals", "type": "string", "value": deals}]
        }));
        let response = handle_event(&context(), &ev).await;

        let body: Value = serde_json::from_str(response.body()).unwrap();
        assert_eq!(body["success"], false);
        assert_eq!(
            body["error"],
            "Unhandled error in save_deals: DATABASE_URL is not set"
        );
    }
}
