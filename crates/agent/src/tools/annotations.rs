//! Canvas comments and blueprint variables.

use super::parse_args;
use crate::{AgentResult, ToolHandler, ToolResult};
use async_trait::async_trait;
use blueprint::{Comment, PinType, StateManager, Variable};
use serde::Deserialize;
use serde_json::{Value, json};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateCommentArgs {
    text: String,
    #[serde(default)]
    position_x: Option<f64>,
    #[serde(default)]
    position_y: Option<f64>,
    #[serde(default)]
    width: Option<f64>,
    #[serde(default)]
    height: Option<f64>,
    #[serde(default)]
    color: Option<String>,
}

pub struct CreateComment;

#[async_trait]
impl ToolHandler for CreateComment {
    fn name(&self) -> &'static str {
        "create_comment"
    }

    fn description(&self) -> &'static str {
        "Add a comment box to the blueprint canvas."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "text": { "type": "string", "description": "Comment text" },
                "positionX": { "type": "number" },
                "positionY": { "type": "number" },
                "width": { "type": "number" },
                "height": { "type": "number" },
                "color": { "type": "string", "description": "Hex color for the comment box" }
            },
            "required": ["text"]
        })
    }

    async fn execute(&self, args: &Value, state: &mut StateManager) -> AgentResult<ToolResult> {
        let args: CreateCommentArgs = match parse_args(args) {
            Ok(args) => args,
            Err(fail) => return Ok(fail),
        };

        let mut comment = Comment::new(args.text);
        if let Some(x) = args.position_x {
            comment.position_x = x;
        }
        if let Some(y) = args.position_y {
            comment.position_y = y;
        }
        if let Some(width) = args.width {
            comment.width = width;
        }
        if let Some(height) = args.height {
            comment.height = height;
        }
        if let Some(color) = args.color {
            comment.color = color;
        }

        let message = format!("Created comment '{}'", comment.text);
        let delta = state.add_comment(comment)?;
        Ok(ToolResult::ok_with(message, vec![delta]))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateVariableArgs {
    name: String,
    #[serde(rename = "type")]
    var_type: PinType,
    #[serde(default)]
    default_value: Option<String>,
    #[serde(default)]
    category: Option<String>,
}

pub struct CreateVariable;

#[async_trait]
impl ToolHandler for CreateVariable {
    fn name(&self) -> &'static str {
        "create_variable"
    }

    fn description(&self) -> &'static str {
        "Declare a blueprint variable that can be used with Get/Set nodes."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "name": { "type": "string", "description": "Variable name" },
                "type": { "type": "string", "enum": ["Bool", "Int", "Float", "String", "Vector", "Rotator", "Transform", "Object"], "description": "Variable type" },
                "defaultValue": { "type": "string", "description": "Default value" },
                "category": { "type": "string", "description": "Category for organization" }
            },
            "required": ["name", "type"]
        })
    }

    async fn execute(&self, args: &Value, state: &mut StateManager) -> AgentResult<ToolResult> {
        let args: CreateVariableArgs = match parse_args(args) {
            Ok(args) => args,
            Err(fail) => return Ok(fail),
        };

        let mut variable = Variable::new(args.name, args.var_type);
        variable.default_value = args.default_value;
        variable.category = args.category.unwrap_or_default();

        let message = format!(
            "Created variable '{}' of type {:?}",
            variable.name, variable.var_type
        );
        let delta = state.add_variable(variable)?;
        Ok(ToolResult::ok_with(message, vec![delta]))
    }
}
