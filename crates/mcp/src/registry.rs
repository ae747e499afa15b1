//! ToolRegistry: the ordered set of tools discovered from the server.

use std::collections::HashSet;

use tracing::{debug, info, warn};

use crate::{session::Session, types::ToolDescriptor};

#[derive(Debug, Clone, Default)]
pub struct ToolRegistry {
    tools: Vec<ToolDescriptor>,
}

impl ToolRegistry {
    /// Ask the server for its tools. Never fails: any transport or decode
    /// problem is logged and yields an empty registry.
    pub async fn discover(session: &Session) -> Self {
        match session.list_tools().await {
            Ok(tools) => {
                let registry = Self::from_descriptors(tools);
                info!(
                    transport = session.transport_kind(),
                    count = registry.len(),
                    "discovered tools"
                );
                registry
            },
            Err(e) => {
                warn!(transport = session.transport_kind(), error = %e, "tool discovery failed");
                Self::default()
            },
        }
    }

    /// Keep server order, dropping nameless entries and repeated names.
    pub fn from_descriptors(tools: Vec<ToolDescriptor>) -> Self {
        let mut seen = HashSet::new();
        let tools = tools
            .into_iter()
            .filter(|t| {
                if t.name.trim().is_empty() {
                    debug!("skipping tool without a name");
                    return false;
                }
                if !seen.insert(t.name.clone()) {
                    warn!(tool = %t.name, "duplicate tool name, keeping the first");
                    return false;
                }
                true
            })
            .collect();
        Self { tools }
    }

    pub fn get(&self, name: &str) -> Option<&ToolDescriptor> {
        self.tools.iter().find(|t| t.name == name)
    }

    pub fn descriptors(&self) -> &[ToolDescriptor] {
        &self.tools
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tools.iter().map(|t| t.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
