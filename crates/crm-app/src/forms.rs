// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, bail};
use time::Date;

use crate::{
    ActivityKind, ClientId, ContactPersonId, DealId, DealStage, Permission, ProjectId, RoleId,
    TaskPriority, TaskStatus, TicketStatus, UserId,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewClient {
    pub name: String,
    pub website: String,
    pub owner_id: Option<UserId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewContactPerson {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub designation: String,
    pub client_id: ClientId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProject {
    pub name: String,
    pub client_id: ClientId,
    pub real_estate_segment: String,
    pub sector: String,
    pub member_ids: Vec<ContactPersonId>,
    pub team_member_ids: Vec<UserId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewDeal {
    pub name: String,
    pub value: f64,
    pub stage: DealStage,
    pub project_id: ProjectId,
    pub expected_close_date: Date,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    pub due_date: Date,
    pub priority: TaskPriority,
    pub status: TaskStatus,
    pub project_id: Option<ProjectId>,
    pub deal_id: Option<DealId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewActivity {
    pub kind: ActivityKind,
    pub description: String,
    pub project_id: ProjectId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSupportTicket {
    pub subject: String,
    pub description: String,
    pub project_id: ProjectId,
    pub status: TicketStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub avatar: String,
    pub role_id: RoleId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRole {
    pub name: String,
    pub granted: Vec<Permission>,
}

impl NewClient {
    pub fn validate(&self) -> Result<()> {
        require("client name", &self.name)
    }
}

impl NewContactPerson {
    pub fn validate(&self) -> Result<()> {
        require("contact name", &self.name)?;
        if !self.email.trim().is_empty() {
            validate_email(&self.email)?;
        }
        require("client", self.client_id.as_str())
    }
}

impl NewProject {
    pub fn validate(&self) -> Result<()> {
        require("project name", &self.name)?;
        require("client", self.client_id.as_str())
    }
}

impl NewDeal {
    pub fn validate(&self) -> Result<()> {
        require("deal name", &self.name)?;
        require("project", self.project_id.as_str())?;
        if !self.value.is_finite() {
            bail!("deal value must be a number, got {}", self.value);
        }
        if self.value < 0.0 {
            bail!("deal value must not be negative, got {}", self.value);
        }
        Ok(())
    }
}

impl NewTask {
    pub fn validate(&self) -> Result<()> {
        require("task title", &self.title)
    }
}

impl NewActivity {
    pub fn validate(&self) -> Result<()> {
        require("activity description", &self.description)?;
        require("project", self.project_id.as_str())
    }
}

impl NewSupportTicket {
    pub fn validate(&self) -> Result<()> {
        require("ticket subject", &self.subject)?;
        require("project", self.project_id.as_str())
    }
}

impl NewUser {
    pub fn validate(&self) -> Result<()> {
        require("user name", &self.name)?;
        validate_email(&self.email)?;
        require("role", self.role_id.as_str())
    }
}

impl NewRole {
    pub fn validate(&self) -> Result<()> {
        require("role name", &self.name)
    }
}

fn require(label: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        bail!("{label} is required");
    }
    Ok(())
}

fn validate_email(email: &str) -> Result<()> {
    let trimmed = email.trim();
    match trimmed.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(()),
        _ => bail!("email {trimmed:?} must look like name@domain"),
    }
}

#[cfg(test)]
mod tests {
    use super::{NewClient, NewContactPerson, NewDeal, NewUser};
    use crate::{ClientId, DealStage, ProjectId, RoleId};
    use time::macros::date;

    fn deal(value: f64) -> NewDeal {
        NewDeal {
            name: "Retainer".to_owned(),
            value,
            stage: DealStage::Prospecting,
            project_id: ProjectId::new("project-1"),
            expected_close_date: date!(2024 - 10 - 10),
            notes: None,
        }
    }

    #[test]
    fn client_validation_rejects_blank_name() {
        let client = NewClient {
            name: "   ".to_owned(),
            website: String::new(),
            owner_id: None,
        };
        let error = client.validate().expect_err("blank name should fail");
        assert!(error.to_string().contains("client name is required"));
    }

    #[test]
    fn deal_validation_rejects_negative_and_non_finite_values() {
        assert!(deal(0.0).validate().is_ok());
        assert!(deal(-1.0).validate().is_err());
        assert!(deal(f64::NAN).validate().is_err());
        assert!(deal(f64::INFINITY).validate().is_err());
    }

    #[test]
    fn contact_email_is_optional_but_checked_when_present() {
        let mut person = NewContactPerson {
            name: "John Doe".to_owned(),
            email: String::new(),
            phone: String::new(),
            designation: "CEO".to_owned(),
            client_id: ClientId::new("client-1"),
        };
        assert!(person.validate().is_ok());

        person.email = "not-an-email".to_owned();
        assert!(person.validate().is_err());
    }

    #[test]
    fn user_requires_email_and_role() {
        let user = NewUser {
            name: "Chen Lee".to_owned(),
            email: "chen@crm.ai".to_owned(),
            avatar: String::new(),
            role_id: RoleId::new(""),
        };
        let error = user.validate().expect_err("missing role should fail");
        assert!(error.to_string().contains("role is required"));
    }
}
