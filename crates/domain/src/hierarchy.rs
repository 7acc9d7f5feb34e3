//! Reporting hierarchy built from raw manager pointers.
//!
//! Raw `manager_id` values are not trusted: they may point at missing,
//! inactive or foreign-tenant principals, and they may form cycles. The
//! directory normalizes them once at construction so every consumer (scope
//! resolution, org chart) sees the same forest:
//!
//! - a manager that does not resolve to an active principal of the same
//!   tenant is dropped and the principal becomes a root;
//! - every principal on a manager cycle loses its edge and becomes a root.
//!   Principals hanging off a cycle keep their edge to it.

use std::collections::{BTreeSet, HashMap, HashSet};

use crewdesk_core::{PrincipalId, TenantId};

use crate::Principal;

#[derive(Debug, Clone)]
struct DirectoryEntry {
    id: PrincipalId,
    display_name: String,
    job_title: Option<String>,
    manager: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VisitState {
    Unvisited,
    OnPath,
    Done,
}

/// Read-only snapshot of one tenant's active reporting graph.
#[derive(Debug, Clone)]
pub struct HierarchyDirectory {
    tenant_id: TenantId,
    entries: Vec<DirectoryEntry>,
    index: HashMap<PrincipalId, usize>,
    children: Vec<Vec<usize>>,
    roots: Vec<usize>,
}

impl HierarchyDirectory {
    /// Builds the directory from the active principals of `tenant_id`.
    ///
    /// Principals of other tenants and inactive principals are ignored.
    #[must_use]
    pub fn new<'a>(tenant_id: TenantId, principals: impl IntoIterator<Item = &'a Principal>) -> Self {
        let members: Vec<&Principal> = principals
            .into_iter()
            .filter(|principal| principal.tenant_id() == tenant_id && principal.is_active())
            .collect();

        let mut index = HashMap::with_capacity(members.len());
        let mut kept: Vec<&Principal> = Vec::with_capacity(members.len());
        for principal in members {
            if index.contains_key(&principal.id()) {
                continue;
            }
            index.insert(principal.id(), kept.len());
            kept.push(principal);
        }

        let mut parents: Vec<Option<usize>> = kept
            .iter()
            .enumerate()
            .map(|(position, principal)| {
                principal
                    .manager_id()
                    .and_then(|manager_id| index.get(&manager_id).copied())
                    .filter(|manager| *manager != position)
            })
            .collect();
        detach_cycles(&mut parents);

        let entries: Vec<DirectoryEntry> = kept
            .iter()
            .zip(parents.iter())
            .map(|(principal, manager)| DirectoryEntry {
                id: principal.id(),
                display_name: principal.display_name().to_owned(),
                job_title: principal.job_title().map(ToOwned::to_owned),
                manager: *manager,
            })
            .collect();

        let mut children: Vec<Vec<usize>> = vec![Vec::new(); entries.len()];
        let mut roots = Vec::new();
        for (position, entry) in entries.iter().enumerate() {
            match entry.manager {
                Some(manager) => children[manager].push(position),
                None => roots.push(position),
            }
        }

        let order = |left: &usize, right: &usize| {
            let (left, right) = (&entries[*left], &entries[*right]);
            left.display_name
                .cmp(&right.display_name)
                .then_with(|| left.id.cmp(&right.id))
        };
        roots.sort_by(order);
        for siblings in &mut children {
            siblings.sort_by(order);
        }

        Self {
            tenant_id,
            entries,
            index,
            children,
            roots,
        }
    }

    /// Returns the tenant this directory describes.
    #[must_use]
    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    /// Returns the number of active principals.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns whether the directory has no active principals.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns whether the principal is an active member of the directory.
    #[must_use]
    pub fn contains(&self, principal_id: PrincipalId) -> bool {
        self.index.contains_key(&principal_id)
    }

    /// Returns the effective manager after orphan and cycle normalization.
    #[must_use]
    pub fn manager_of(&self, principal_id: PrincipalId) -> Option<PrincipalId> {
        let position = *self.index.get(&principal_id)?;
        self.entries[position]
            .manager
            .map(|manager| self.entries[manager].id)
    }

    /// Returns the principals whose effective manager is `principal_id`.
    #[must_use]
    pub fn direct_reports(&self, principal_id: PrincipalId) -> BTreeSet<PrincipalId> {
        self.index
            .get(&principal_id)
            .map(|position| {
                self.children[*position]
                    .iter()
                    .map(|child| self.entries[*child].id)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Returns the chain from `principal_id` up to its root, inclusive.
    ///
    /// Unknown principals yield an empty chain. The walk stops at the first
    /// revisited id.
    #[must_use]
    pub fn ancestors(&self, principal_id: PrincipalId) -> Vec<PrincipalId> {
        let mut chain = Vec::new();
        let mut visited = HashSet::new();
        let mut current = self.index.get(&principal_id).copied();

        while let Some(position) = current {
            if !visited.insert(position) {
                break;
            }
            chain.push(self.entries[position].id);
            current = self.entries[position].manager;
        }

        chain
    }

    /// Returns whether `candidate` reports to `root`, directly or transitively.
    ///
    /// A principal is not its own descendant.
    #[must_use]
    pub fn is_descendant(&self, candidate: PrincipalId, root: PrincipalId) -> bool {
        candidate != root && self.ancestors(candidate).iter().skip(1).any(|id| *id == root)
    }

    /// Returns `principal_id` plus everyone reporting to it transitively.
    ///
    /// Unknown principals yield an empty set.
    #[must_use]
    pub fn team_members(&self, principal_id: PrincipalId) -> BTreeSet<PrincipalId> {
        let Some(start) = self.index.get(&principal_id).copied() else {
            return BTreeSet::new();
        };

        let mut members = BTreeSet::new();
        let mut visited = HashSet::new();
        let mut pending = vec![start];
        while let Some(position) = pending.pop() {
            if !visited.insert(position) {
                continue;
            }
            members.insert(self.entries[position].id);
            pending.extend(self.children[position].iter().copied());
        }

        members
    }

    /// Returns the forest roots, ordered by display name.
    #[must_use]
    pub fn roots(&self) -> Vec<PrincipalId> {
        self.roots
            .iter()
            .map(|position| self.entries[*position].id)
            .collect()
    }

    pub(crate) fn root_positions(&self) -> &[usize] {
        self.roots.as_slice()
    }

    pub(crate) fn child_positions(&self, position: usize) -> &[usize] {
        self.children[position].as_slice()
    }

    pub(crate) fn display_fields(&self, position: usize) -> (PrincipalId, &str, Option<&str>) {
        let entry = &self.entries[position];
        (entry.id, entry.display_name.as_str(), entry.job_title.as_deref())
    }
}

/// Clears the parent of every node that lies on a cycle.
///
/// `parents` is a functional graph (at most one outgoing edge per node), so
/// each walk either reaches a root, a node finished by an earlier walk, or a
/// node already on the current path. Only the last case is a new cycle.
fn detach_cycles(parents: &mut [Option<usize>]) {
    let mut state = vec![VisitState::Unvisited; parents.len()];

    for start in 0..parents.len() {
        if state[start] != VisitState::Unvisited {
            continue;
        }

        let mut path = Vec::new();
        let mut current = Some(start);
        while let Some(position) = current {
            if state[position] != VisitState::Unvisited {
                break;
            }
            state[position] = VisitState::OnPath;
            path.push(position);
            current = parents[position];
        }

        if let Some(position) = current.filter(|position| state[*position] == VisitState::OnPath)
            && let Some(cycle_start) = path.iter().position(|node| *node == position)
        {
            for node in &path[cycle_start..] {
                parents[*node] = None;
            }
        }

        for node in path {
            state[node] = VisitState::Done;
        }
    }
}

/// Returns whether pointing `principal_id` at `new_manager_id` closes a cycle.
///
/// Uses the raw manager pointers of every principal in the snapshot,
/// including inactive ones, so a later reactivation cannot surface a cycle
/// that was accepted at write time.
#[must_use]
pub fn creates_manager_cycle(
    principals: &[Principal],
    principal_id: PrincipalId,
    new_manager_id: PrincipalId,
) -> bool {
    if principal_id == new_manager_id {
        return true;
    }

    let managers: HashMap<PrincipalId, Option<PrincipalId>> = principals
        .iter()
        .map(|principal| (principal.id(), principal.manager_id()))
        .collect();

    let mut visited = HashSet::new();
    let mut current = Some(new_manager_id);
    while let Some(id) = current {
        if id == principal_id {
            return true;
        }
        if !visited.insert(id) {
            return false;
        }
        current = managers.get(&id).copied().flatten();
    }

    false
}
