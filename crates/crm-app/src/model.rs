// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use time::{Date, OffsetDateTime};

use crate::ids::*;

time::serde::format_description!(calendar_date, Date, "[year]-[month]-[day]");

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DealStage {
    Prospecting,
    Qualification,
    #[serde(rename = "Needs Analysis")]
    NeedsAnalysis,
    Proposal,
    Negotiation,
    #[serde(rename = "Closed Won")]
    ClosedWon,
    #[serde(rename = "Closed Lost")]
    ClosedLost,
}

impl DealStage {
    pub const ALL: [Self; 7] = [
        Self::Prospecting,
        Self::Qualification,
        Self::NeedsAnalysis,
        Self::Proposal,
        Self::Negotiation,
        Self::ClosedWon,
        Self::ClosedLost,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Prospecting => "Prospecting",
            Self::Qualification => "Qualification",
            Self::NeedsAnalysis => "Needs Analysis",
            Self::Proposal => "Proposal",
            Self::Negotiation => "Negotiation",
            Self::ClosedWon => "Closed Won",
            Self::ClosedLost => "Closed Lost",
        }
    }

    pub const fn is_closed(self) -> bool {
        matches!(self, Self::ClosedWon | Self::ClosedLost)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskStatus {
    #[serde(rename = "To Do")]
    Todo,
    #[serde(rename = "In Progress")]
    InProgress,
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskPriority {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityKind {
    Note,
    Email,
    Call,
    Meeting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TicketStatus {
    Open,
    Resolved,
    Escalated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Permission {
    ViewDashboard,
    ViewContacts,
    ManageContacts,
    ViewDeals,
    ManageDeals,
    ViewTasks,
    ManageTasks,
    ViewReports,
    ViewSettings,
    ManageUsers,
    ManageRoles,
}

impl Permission {
    pub const ALL: [Self; 11] = [
        Self::ViewDashboard,
        Self::ViewContacts,
        Self::ManageContacts,
        Self::ViewDeals,
        Self::ManageDeals,
        Self::ViewTasks,
        Self::ManageTasks,
        Self::ViewReports,
        Self::ViewSettings,
        Self::ManageUsers,
        Self::ManageRoles,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ViewDashboard => "viewDashboard",
            Self::ViewContacts => "viewContacts",
            Self::ManageContacts => "manageContacts",
            Self::ViewDeals => "viewDeals",
            Self::ManageDeals => "manageDeals",
            Self::ViewTasks => "viewTasks",
            Self::ManageTasks => "manageTasks",
            Self::ViewReports => "viewReports",
            Self::ViewSettings => "viewSettings",
            Self::ManageUsers => "manageUsers",
            Self::ManageRoles => "manageRoles",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::ViewDashboard => "View Dashboard",
            Self::ViewContacts => "View Clients",
            Self::ManageContacts => "Manage Clients",
            Self::ViewDeals => "View Deals",
            Self::ManageDeals => "Manage Deals",
            Self::ViewTasks => "View Tasks",
            Self::ManageTasks => "Manage Tasks",
            Self::ViewReports => "View Reports",
            Self::ViewSettings => "View Settings",
            Self::ManageUsers => "Manage Users",
            Self::ManageRoles => "Manage Roles",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Role {
    pub id: RoleId,
    pub name: String,
    pub permissions: BTreeMap<Permission, bool>,
    #[serde(default)]
    pub is_default: bool,
}

impl Role {
    /// Builds a role whose permission map lists every permission, granting
    /// only the ones in `granted`.
    pub fn with_permissions(id: RoleId, name: &str, granted: &[Permission]) -> Self {
        let permissions = Permission::ALL
            .into_iter()
            .map(|permission| (permission, granted.contains(&permission)))
            .collect();
        Self {
            id,
            name: name.to_owned(),
            permissions,
            is_default: false,
        }
    }

    pub fn allows(&self, permission: Permission) -> bool {
        self.permissions.get(&permission).copied().unwrap_or(false)
    }
}

pub fn default_roles() -> Vec<Role> {
    use Permission::*;

    let mut admin = Role::with_permissions(RoleId::new("role-admin"), "Admin", &Permission::ALL);
    let mut manager = Role::with_permissions(
        RoleId::new("role-manager"),
        "Sales Manager",
        &[
            ViewDashboard,
            ViewContacts,
            ManageContacts,
            ViewDeals,
            ManageDeals,
            ViewTasks,
            ManageTasks,
            ViewReports,
            ViewSettings,
        ],
    );
    let mut rep = Role::with_permissions(
        RoleId::new("role-rep"),
        "Sales Rep",
        &[
            ViewDashboard,
            ViewContacts,
            ManageContacts,
            ViewDeals,
            ManageDeals,
            ViewTasks,
            ManageTasks,
            ViewSettings,
        ],
    );
    admin.is_default = true;
    manager.is_default = true;
    rep.is_default = true;
    vec![admin, manager, rep]
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub avatar: String,
    pub role_id: RoleId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    pub id: ClientId,
    pub name: String,
    pub website: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_date: OffsetDateTime,
    #[serde(
        default,
        deserialize_with = "blank_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub owner_id: Option<UserId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactPerson {
    pub id: ContactPersonId,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub designation: String,
    pub client_id: ClientId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
    pub client_id: ClientId,
    pub real_estate_segment: String,
    pub sector: String,
    #[serde(default)]
    pub member_ids: Vec<ContactPersonId>,
    #[serde(default)]
    pub team_member_ids: Vec<UserId>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_date: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deal {
    pub id: DealId,
    pub name: String,
    pub value: f64,
    pub stage: DealStage,
    pub project_id: ProjectId,
    #[serde(with = "calendar_date")]
    pub expected_close_date: Date,
    #[serde(
        default,
        deserialize_with = "blank_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    #[serde(
        default,
        deserialize_with = "blank_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub description: Option<String>,
    #[serde(with = "calendar_date")]
    pub due_date: Date,
    pub priority: TaskPriority,
    pub status: TaskStatus,
    #[serde(
        default,
        deserialize_with = "blank_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub project_id: Option<ProjectId>,
    #[serde(
        default,
        deserialize_with = "blank_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub deal_id: Option<DealId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    pub id: ActivityId,
    #[serde(rename = "type")]
    pub kind: ActivityKind,
    pub description: String,
    #[serde(with = "time::serde::rfc3339")]
    pub date: OffsetDateTime,
    pub project_id: ProjectId,
    pub user_id: UserId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupportTicket {
    pub id: SupportTicketId,
    pub subject: String,
    pub description: String,
    pub project_id: ProjectId,
    pub status: TicketStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub created_date: OffsetDateTime,
    pub user_id: UserId,
}

/// Full snapshot of every collection, the shape of the JSON backup file.
/// Every key is required on import.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrmData {
    pub clients: Vec<Client>,
    pub contact_persons: Vec<ContactPerson>,
    pub projects: Vec<Project>,
    pub deals: Vec<Deal>,
    pub tasks: Vec<Task>,
    pub activities: Vec<Activity>,
    pub support_tickets: Vec<SupportTicket>,
    pub roles: Vec<Role>,
    pub users: Vec<User>,
    pub current_user: User,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PipelineSummary {
    pub open_deals: usize,
    pub open_value: f64,
    pub won_deals: usize,
    pub won_value: f64,
    pub lost_deals: usize,
}

impl PipelineSummary {
    pub fn from_deals(deals: &[Deal]) -> Self {
        let mut summary = Self::default();
        for deal in deals {
            if !deal.stage.is_closed() {
                summary.open_deals += 1;
                summary.open_value += deal.value;
            } else if deal.stage == DealStage::ClosedWon {
                summary.won_deals += 1;
                summary.won_value += deal.value;
            } else {
                summary.lost_deals += 1;
            }
        }
        summary
    }
}

fn blank_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: From<String>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.filter(|value| !value.trim().is_empty()).map(T::from))
}
