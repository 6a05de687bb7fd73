use tracing::{debug, info};

use super::models::{DeletionPlan, Disposition};
use super::walker::walk_parent_path;
use crate::core::config::{DeploymentMode, PurgeConfig};
use crate::core::error::{HostError, PurgeError, Result};
use crate::core::filter::{CategoryFilter, MEDIA_STORE_FILTER, PAGE_STORE_FILTER, REFERENCE_STORE_FILTER};
use crate::core::node::{Category, Node, NodeId};
use crate::db::host::NodeQuery;


/// Builds the delete/release sets for a removal request.
///
/// Pure with respect to the store: planning the same target twice over an
/// unchanged tree yields the same plan.
pub struct Planner<'a, Q: NodeQuery + ?Sized> {
    query: &'a Q,
    mode: DeploymentMode,
    collapse_empty_parents: bool,
}

impl<'a, Q: NodeQuery + ?Sized> Planner<'a, Q> {
    pub fn new(query: &'a Q, config: &PurgeConfig) -> Self {
        Self {
            query,
            mode: config.mode,
            collapse_empty_parents: config.collapse_empty_parents,
        }
    }

    pub fn with_mode(mut self, mode: DeploymentMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn plan(&self, target: NodeId) -> Result<DeletionPlan> {
        let node = self.fetch(target)?;
        let mut plan = DeletionPlan::new(target);

        match self.mode {
            DeploymentMode::Managed => self.plan_managed(&node, &mut plan),
            DeploymentMode::Interactive => self.plan_interactive(&node, &mut plan)?,
        }

        info!(
            "Planned removal of {}: {} to delete, {} to release",
            target,
            plan.to_delete().len(),
            plan.to_release().len()
        );
        Ok(plan)
    }

    fn plan_managed(&self, node: &Node, plan: &mut DeletionPlan) {
        plan.classify(node.id, Disposition::Delete);
        if node.category() != Category::Template {
            if let Some(parent) = node.parent {
                plan.classify(parent, Disposition::Release);
            }
        }
    }

    fn plan_interactive(&self, node: &Node, plan: &mut DeletionPlan) -> Result<()> {
        match node.category() {
            Category::PageReference => {
                if let Some(page) = node.kind.referenced_page() {
                    self.regard_page(page, plan)?;
                }
                self.delete_and_collapse(node.id, &REFERENCE_STORE_FILTER, plan)?;
            }
            Category::DocumentGroup => {
                self.delete_and_collapse(node.id, &REFERENCE_STORE_FILTER, plan)?;
            }
            Category::Media | Category::MediaFolder => {
                if self.collapse_empty_parents {
                    self.delete_and_collapse(node.id, &MEDIA_STORE_FILTER, plan)?;
                } else {
                    plan.classify(node.id, Disposition::Delete);
                }
            }
            other => {
                debug!("No interactive removal rule for category {}", other);
            }
        }
        Ok(())
    }

    /// The page goes only when this reference is its last user.
    fn regard_page(&self, page: NodeId, plan: &mut DeletionPlan) -> Result<()> {
        let page_node = self.fetch(page)?;
        if page_node.incoming_references == 1 {
            self.delete_and_collapse(page, &PAGE_STORE_FILTER, plan)?;
        } else {
            debug!("Page {} still referenced {} times - kept", page, page_node.incoming_references);
        }
        Ok(())
    }

    fn delete_and_collapse(&self, id: NodeId, filter: &CategoryFilter, plan: &mut DeletionPlan) -> Result<()> {
        plan.classify(id, Disposition::Delete);
        plan.apply(walk_parent_path(self.query, id, filter)?);
        Ok(())
    }

    fn fetch(&self, id: NodeId) -> Result<Node> {
        self.query.node(id).map_err(|e| match e {
            HostError::NotFound(id) => PurgeError::NodeNotFound(id),
            other => PurgeError::Host(other),
        })
    }
}
