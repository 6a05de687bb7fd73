use tracing::{debug, info};

use super::models::Classification;
use crate::core::error::HostError;
use crate::core::filter::CategoryFilter;
use crate::core::node::NodeId;
use crate::db::host::NodeQuery;


/// Walks upward from `start`, deleting ancestors that would be left empty
/// and unreferenced. The first ancestor that is referenced or still has
/// other children under `filter` is released and ends the walk.
pub fn walk_parent_path<Q>(
    query: &Q,
    start: NodeId,
    filter: &CategoryFilter,
) -> Result<Vec<Classification>, HostError>
where
    Q: NodeQuery + ?Sized,
{
    let mut decisions = Vec::new();
    let mut descendant = start;
    let mut next = query.parent(start)?;

    while let Some(current) = next {
        let node = query.node(current)?;

        if node.is_referenced() {
            info!("Element {} has incoming references - abort", current);
            decisions.push(Classification::release(current));
            break;
        }

        debug!("Checking parent element {} of child element {}", current, start);
        let has_siblings = query
            .children(current, filter, false)?
            .any(|child| child != descendant);

        if has_siblings {
            info!("Parent element {} has children - abort", current);
            decisions.push(Classification::release(current));
            break;
        }

        info!("Parent element {} has no children - add to delete objects", current);
        decisions.push(Classification::delete(current));
        descendant = current;
        next = node.parent;
    }

    Ok(decisions)
}
