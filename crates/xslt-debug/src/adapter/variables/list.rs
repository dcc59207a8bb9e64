//! Variables request + handle allocation helpers.
//! - handle_variables: resolve one reference into rows
//! - alloc_variable_handle: track producers for lazy expansion

use serde_json::Value;

use xslt_runtime::NodeHandle;

use crate::protocol::{Request, Variable, VariablesArguments, VariablesResponseBody};

use super::super::{DebugAdapter, DispatchOutcome, VariableHandle};

/// Longest value preview shown before truncation.
const VALUE_PREVIEW: usize = 120;

impl DebugAdapter {
    pub(in crate::adapter) fn handle_variables(
        &mut self,
        request: Request<Value>,
    ) -> DispatchOutcome {
        let Some(args) = request
            .arguments
            .clone()
            .and_then(|value| serde_json::from_value::<VariablesArguments>(value).ok())
        else {
            return DispatchOutcome {
                responses: vec![self.error_response(&request, "invalid variables args")],
                ..DispatchOutcome::default()
            };
        };

        let Some(handle) = self
            .variable_handles
            .get(&args.variables_reference)
            .cloned()
        else {
            // Stale reference from a previous stop: answer empty rather
            // than failing the request.
            return DispatchOutcome {
                responses: vec![self.ok_response(
                    &request,
                    Some(VariablesResponseBody {
                        variables: Vec::new(),
                    }),
                )],
                ..DispatchOutcome::default()
            };
        };

        let variables = match handle {
            VariableHandle::Context(node) => self.context_rows(&node),
            VariableHandle::Attributes(node) => node
                .attributes
                .iter()
                .map(|(name, value)| Variable {
                    name: name.to_string(),
                    value: preview(value),
                    r#type: Some("attribute".to_string()),
                    variables_reference: 0,
                })
                .collect(),
            VariableHandle::Children(node) => {
                let children = node.children.clone();
                children
                    .into_iter()
                    .filter(|child| child.kind != "text" || !child.value.trim().is_empty())
                    .map(|child| self.child_row(child))
                    .collect()
            }
            VariableHandle::Variables => self
                .session
                .variables()
                .iter()
                .map(|(name, value)| Variable {
                    name: name.to_string(),
                    value: preview(value),
                    r#type: None,
                    variables_reference: 0,
                })
                .collect(),
        };

        DispatchOutcome {
            responses: vec![self.ok_response(&request, Some(VariablesResponseBody { variables }))],
            ..DispatchOutcome::default()
        }
    }

    /// Structural fields of a context node plus expandable attribute and
    /// child groups.
    fn context_rows(&mut self, node: &NodeHandle) -> Vec<Variable> {
        let mut rows = vec![
            Variable {
                name: "name".to_string(),
                value: node
                    .name
                    .as_ref()
                    .map(ToString::to_string)
                    .unwrap_or_else(|| "#none".to_string()),
                r#type: None,
                variables_reference: 0,
            },
            Variable {
                name: "kind".to_string(),
                value: node.kind.to_string(),
                r#type: None,
                variables_reference: 0,
            },
            Variable {
                name: "value".to_string(),
                value: preview(&node.value),
                r#type: None,
                variables_reference: 0,
            },
        ];
        if let Some(path) = &node.path {
            rows.push(Variable {
                name: "position".to_string(),
                value: path.clone(),
                r#type: None,
                variables_reference: 0,
            });
        }
        if !node.attributes.is_empty() {
            let reference =
                self.alloc_variable_handle(VariableHandle::Attributes(node.clone()));
            rows.push(Variable {
                name: "attributes".to_string(),
                value: format!("({})", node.attributes.len()),
                r#type: None,
                variables_reference: reference,
            });
        }
        if !node.children.is_empty() {
            let reference = self.alloc_variable_handle(VariableHandle::Children(node.clone()));
            rows.push(Variable {
                name: "children".to_string(),
                value: format!("({})", node.children.len()),
                r#type: None,
                variables_reference: reference,
            });
        }
        rows
    }

    fn child_row(&mut self, child: NodeHandle) -> Variable {
        let name = child
            .name
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_else(|| format!("#{}", child.kind));
        let value = preview(&child.value);
        let expandable = !child.children.is_empty() || !child.attributes.is_empty();
        let reference = if expandable {
            self.alloc_variable_handle(VariableHandle::Context(child))
        } else {
            0
        };
        Variable {
            name,
            value,
            r#type: None,
            variables_reference: reference,
        }
    }

    pub(in crate::adapter) fn alloc_variable_handle(&mut self, handle: VariableHandle) -> u32 {
        let reference = self.next_variable_ref;
        self.next_variable_ref += 1;
        self.variable_handles.insert(reference, handle);
        reference
    }
}

fn preview(value: &str) -> String {
    let collapsed: String = value.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() > VALUE_PREVIEW {
        let truncated: String = collapsed.chars().take(VALUE_PREVIEW).collect();
        format!("{truncated}…")
    } else {
        collapsed
    }
}
