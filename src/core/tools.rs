use serde_json::{Value, json};
use std::fmt;
use std::str::FromStr;
use tracing::info;

use crate::core::catalog::{CatalogError, CatalogStore};
use crate::core::llm::{ToolDeclaration, ToolInvocation, ToolOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolName {
    ListTables,
    DescribeTable,
    ExecuteQuery,
}

impl ToolName {
    pub const ALL: [ToolName; 3] = [
        ToolName::ListTables,
        ToolName::DescribeTable,
        ToolName::ExecuteQuery,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ToolName::ListTables => "list_tables",
            ToolName::DescribeTable => "describe_table",
            ToolName::ExecuteQuery => "execute_query",
        }
    }

    /// The declaration handed to the model. Descriptions are given verbatim.
    pub fn declaration(&self) -> ToolDeclaration {
        match self {
            ToolName::ListTables => ToolDeclaration {
                name: self.as_str(),
                description: "Retrieve the names of all tables in the database.",
                parameters: None,
            },
            ToolName::DescribeTable => ToolDeclaration {
                name: self.as_str(),
                description: "Look up the table schema. Returns a list of columns, where each entry is a (column, type) pair.",
                parameters: Some(json!({
                    "type": "object",
                    "properties": {
                        "table_name": { "type": "string" }
                    },
                    "required": ["table_name"]
                })),
            },
            ToolName::ExecuteQuery => ToolDeclaration {
                name: self.as_str(),
                description: "Execute a SELECT statement, returning the results.",
                parameters: Some(json!({
                    "type": "object",
                    "properties": {
                        "sql": { "type": "string" }
                    },
                    "required": ["sql"]
                })),
            },
        }
    }
}

impl fmt::Display for ToolName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ToolName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ToolName::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("unknown tool '{}'", s))
    }
}

/// A model tool call with its arguments decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolRequest {
    ListTables,
    DescribeTable { table_name: String },
    ExecuteQuery { sql: String },
}

impl ToolRequest {
    /// Decode a call for a known tool. A missing or non-string argument is an
    /// `InvalidArgument`.
    pub fn decode(name: ToolName, args: &Value) -> Result<Self, CatalogError> {
        match name {
            ToolName::ListTables => Ok(ToolRequest::ListTables),
            ToolName::DescribeTable => Ok(ToolRequest::DescribeTable {
                table_name: string_arg(args, "table_name")?,
            }),
            ToolName::ExecuteQuery => Ok(ToolRequest::ExecuteQuery {
                sql: string_arg(args, "sql")?,
            }),
        }
    }
}

fn string_arg(args: &Value, key: &str) -> Result<String, CatalogError> {
    args.get(key)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| CatalogError::InvalidArgument(format!("'{}' must be a string", key)))
}

/// The fixed set of database tools exposed to the model.
pub struct ToolRegistry<'a> {
    store: &'a CatalogStore,
}

impl<'a> ToolRegistry<'a> {
    pub fn new(store: &'a CatalogStore) -> Self {
        Self { store }
    }

    pub fn manifest(&self) -> Vec<ToolDeclaration> {
        ToolName::ALL.iter().map(ToolName::declaration).collect()
    }

    /// Run a decoded request against the catalog.
    pub fn execute(&self, request: &ToolRequest) -> Result<Value, CatalogError> {
        match request {
            ToolRequest::ListTables => Ok(json!(self.store.list_tables())),
            ToolRequest::DescribeTable { table_name } => {
                let pairs: Vec<(String, String)> = self
                    .store
                    .describe_table(table_name)
                    .into_iter()
                    .map(|c| (c.name, c.declared_type))
                    .collect();
                Ok(json!(pairs))
            }
            ToolRequest::ExecuteQuery { sql } => Ok(json!(self.store.execute_query(sql)?)),
        }
    }

    /// Execute one model tool call and package the result for the model.
    ///
    /// An unknown tool name is answered with an error payload so the model can
    /// correct itself; bad arguments to a known tool propagate.
    pub fn dispatch(&self, call: &ToolInvocation) -> Result<ToolOutcome, CatalogError> {
        let response = match call.name.parse::<ToolName>() {
            Ok(name) => {
                info!("Invoking tool: {} with args {}", name, call.args);
                let request = ToolRequest::decode(name, &call.args)?;
                self.execute(&request)?
            }
            Err(e) => {
                info!("Model requested {}", e);
                json!({ "error": e })
            }
        };
        Ok(ToolOutcome {
            id: call.id.clone(),
            name: call.name.clone(),
            response,
        })
    }
}
