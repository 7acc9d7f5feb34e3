use std::str::FromStr;

use crewdesk_core::{AppError, AppResult, PrincipalId, TenantId};
use crewdesk_domain::{LegacyRole, Permission, Principal, Role, RoleBinding, RoleId};
use crewdesk_infrastructure::{InMemoryDirectoryRepository, InMemoryRoleRepository};
use tracing::info;

pub const DEV_SEED_TENANT_ID: &str = "11111111-1111-1111-1111-111111111111";

pub const DEV_SEED_OPERATOR_ID: &str = "0b6a3c1e-2f41-4c57-9d0e-5a7f3c2b1d90";
pub const DEV_SEED_CEO_ID: &str = "a2c8ea5f-4f39-4724-97f5-932f97f54f76";
pub const DEV_SEED_VP_ID: &str = "5d1f0c6e-8b0a-4e53-9c43-6c2a7b1e9f12";
pub const DEV_SEED_LEAD_ID: &str = "c4e7b2a9-3d6f-4f18-8a55-2e9d0b7c6a31";
pub const DEV_SEED_ENGINEER_ID: &str = "96d11e90-7403-4654-9727-cb1043f8bd31";
pub const DEV_SEED_SECOND_ENGINEER_ID: &str = "e8a3f5d2-1c9b-4a76-b0e4-7f2d5c8a9b63";
pub const DEV_SEED_PEOPLE_PARTNER_ID: &str = "3f9b7e1a-6d2c-4b85-a7f0-1e4c9d2b8a57";
pub const DEV_SEED_FORMER_ENGINEER_ID: &str = "7a2d9c4f-0e5b-4f63-8d1a-9b6e3f7c2d48";
pub const DEV_SEED_FELLOW_ID: &str = "d6c1e8b3-9a7f-4d20-b5e6-0c3a8f1d7e95";

const DEV_SEED_PEOPLE_OPS_ROLE_ID: &str = "2e5a8d1c-7b4f-4a69-9e03-6d1b8c5f2a74";
const DEV_SEED_TEAM_LEAD_ROLE_ID: &str = "8c3f6a9e-2d7b-4e15-a4c8-3b9e6d1f5a20";

const PEOPLE_OPS_GRANTS: &[&str] = &[
    "attendance.view_all",
    "leaves.view_all",
    "leaves.manage",
    "org_chart.view",
    "principals.manage",
    "principals.view",
    "training.view_all",
];

const TEAM_LEAD_GRANTS: &[&str] = &[
    "attendance.view_team",
    "leaves.view_team",
    "org_chart.view",
    "performance.view_team",
    "principals.view",
    "tasks.view_team",
];

/// Seeds a demo tenant with roles and a reporting tree.
pub async fn run(
    directory: &InMemoryDirectoryRepository,
    roles: &InMemoryRoleRepository,
) -> AppResult<()> {
    let tenant_id = parse_id::<TenantId>(DEV_SEED_TENANT_ID)?;
    let people_ops_id = parse_id::<RoleId>(DEV_SEED_PEOPLE_OPS_ROLE_ID)?;
    let team_lead_id = parse_id::<RoleId>(DEV_SEED_TEAM_LEAD_ROLE_ID)?;

    roles
        .insert_role(Role::new(
            people_ops_id,
            tenant_id,
            "people_ops",
            true,
            grants(PEOPLE_OPS_GRANTS)?,
        )?)
        .await?;
    roles
        .insert_role(Role::new(
            team_lead_id,
            tenant_id,
            "team_lead",
            false,
            grants(TEAM_LEAD_GRANTS)?,
        )?)
        .await?;

    let operator = seed_principal(tenant_id, DEV_SEED_OPERATOR_ID, "Platform Operator", None)?
        .with_role_binding(RoleBinding::SuperAdmin);
    let ceo = seed_principal(tenant_id, DEV_SEED_CEO_ID, "Ada Lovelace", None)?
        .with_job_title("Chief Executive Officer")
        .with_role_binding(RoleBinding::Legacy(LegacyRole::Admin));
    let vp = seed_principal(tenant_id, DEV_SEED_VP_ID, "Grace Hopper", Some(ceo.id()))?
        .with_job_title("VP Engineering")
        .with_role_binding(RoleBinding::Legacy(LegacyRole::Manager));
    let lead = seed_principal(tenant_id, DEV_SEED_LEAD_ID, "Margaret Hamilton", Some(vp.id()))?
        .with_job_title("Engineering Manager")
        .with_role_binding(RoleBinding::Assigned(team_lead_id));
    let engineer = seed_principal(tenant_id, DEV_SEED_ENGINEER_ID, "Ken Thompson", Some(lead.id()))?
        .with_job_title("Software Engineer")
        .with_role_binding(RoleBinding::Legacy(LegacyRole::Employee));
    let second_engineer = seed_principal(
        tenant_id,
        DEV_SEED_SECOND_ENGINEER_ID,
        "Linus Torvalds",
        Some(lead.id()),
    )?
    .with_job_title("Software Engineer")
    .with_role_binding(RoleBinding::Legacy(LegacyRole::Employee));
    let people_partner = seed_principal(
        tenant_id,
        DEV_SEED_PEOPLE_PARTNER_ID,
        "Barbara Liskov",
        Some(ceo.id()),
    )?
    .with_job_title("People Partner")
    .with_role_binding(RoleBinding::Assigned(people_ops_id))
    .with_permission_overrides(grants(&["budget.view_all"])?);
    let former_engineer = seed_principal(
        tenant_id,
        DEV_SEED_FORMER_ENGINEER_ID,
        "Dennis Ritchie",
        Some(vp.id()),
    )?
    .with_job_title("Software Engineer")
    .with_role_binding(RoleBinding::Legacy(LegacyRole::Employee))
    .with_active(false);
    let fellow = seed_principal(
        tenant_id,
        DEV_SEED_FELLOW_ID,
        "Alan Turing",
        Some(former_engineer.id()),
    )?
    .with_job_title("Research Fellow")
    .with_role_binding(RoleBinding::Legacy(LegacyRole::Employee));

    let principals = [
        operator,
        ceo,
        vp,
        lead,
        engineer,
        second_engineer,
        people_partner,
        former_engineer,
        fellow,
    ];
    let principal_count = principals.len();
    for principal in principals {
        directory.insert_principal(principal).await?;
    }

    info!(%tenant_id, principal_count, "dev seed applied");
    Ok(())
}

fn seed_principal(
    tenant_id: TenantId,
    id: &str,
    display_name: &str,
    manager_id: Option<PrincipalId>,
) -> AppResult<Principal> {
    Ok(Principal::new(parse_id::<PrincipalId>(id)?, tenant_id, display_name)?.with_manager(manager_id))
}

fn grants(values: &[&str]) -> AppResult<Vec<Permission>> {
    values.iter().map(|value| Permission::new(*value)).collect()
}

pub fn parse_id<T>(value: &str) -> AppResult<T>
where
    T: FromStr<Err = AppError>,
{
    T::from_str(value)
        .map_err(|error| AppError::Internal(format!("invalid dev seed id '{value}': {error}")))
}
