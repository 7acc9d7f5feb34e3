use crewdesk_core::{PrincipalId, TenantId};
use serde::{Deserialize, Serialize};

use crate::{HierarchyDirectory, Principal};

/// One principal in the rendered organization chart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrgChartNode {
    /// Principal shown by this node.
    pub principal_id: PrincipalId,
    /// Display name.
    pub display_name: String,
    /// Optional job title.
    pub job_title: Option<String>,
    /// Direct reports, ordered by display name.
    pub children: Vec<OrgChartNode>,
}

impl OrgChartNode {
    /// Returns the number of nodes in this subtree, including itself.
    #[must_use]
    pub fn size(&self) -> usize {
        1 + self.children.iter().map(OrgChartNode::size).sum::<usize>()
    }
}

/// Builds the org chart forest of a tenant's active principals.
#[must_use]
pub fn build_forest(tenant_id: TenantId, principals: &[Principal]) -> Vec<OrgChartNode> {
    HierarchyDirectory::new(tenant_id, principals).forest()
}

impl HierarchyDirectory {
    /// Materializes the normalized hierarchy as display nodes.
    #[must_use]
    pub fn forest(&self) -> Vec<OrgChartNode> {
        self.root_positions()
            .iter()
            .map(|root| self.materialize(*root))
            .collect()
    }

    fn materialize(&self, position: usize) -> OrgChartNode {
        let (principal_id, display_name, job_title) = self.display_fields(position);

        OrgChartNode {
            principal_id,
            display_name: display_name.to_owned(),
            job_title: job_title.map(ToOwned::to_owned),
            children: self
                .child_positions(position)
                .iter()
                .map(|child| self.materialize(*child))
                .collect(),
        }
    }
}
