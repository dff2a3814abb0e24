//! Explicit tool registry: name -> declaration + handler.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::executor::ToolContext;
use crate::schema::{Arguments, ToolDeclaration};
use crate::{Error, Result, ToolError};

/// The code behind a tool.
///
/// Handlers receive arguments that already passed validation against the
/// tool's declaration.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn call(&self, args: Arguments, ctx: &ToolContext<'_>) -> std::result::Result<String, ToolError>;
}

/// A tool with its handler.
#[derive(Clone)]
pub struct RegisteredTool {
    pub declaration: ToolDeclaration,
    pub handler: Arc<dyn ToolHandler>,
}

impl std::fmt::Debug for RegisteredTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisteredTool")
            .field("declaration", &self.declaration)
            .finish_non_exhaustive()
    }
}

/// Tools in declaration order, indexed by name.
#[derive(Debug, Default)]
pub struct ToolRegistry {
    tools: Vec<RegisteredTool>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool. Names must be unique.
    pub fn register(
        &mut self,
        declaration: ToolDeclaration,
        handler: impl ToolHandler + 'static,
    ) -> Result<()> {
        if self.index.contains_key(&declaration.name) {
            return Err(Error::DuplicateTool(declaration.name));
        }
        self.index.insert(declaration.name.clone(), self.tools.len());
        self.tools.push(RegisteredTool {
            declaration,
            handler: Arc::new(handler),
        });
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&RegisteredTool> {
        self.index.get(name).map(|&i| &self.tools[i])
    }

    pub fn declarations(&self) -> impl Iterator<Item = &ToolDeclaration> {
        self.tools.iter().map(|t| &t.declaration)
    }

    /// The catalog as advertised by tools/list.
    pub fn tools(&self) -> Vec<mcp::Tool> {
        self.declarations().map(ToolDeclaration::to_tool).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
