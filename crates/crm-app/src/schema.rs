// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};

use crate::codec::{FieldTypes, encode};

/// Collections that can be exchanged as comma-separated files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RecordKind {
    Clients,
    ContactPersons,
    Projects,
    Deals,
    Tasks,
}

impl RecordKind {
    pub const ALL: [Self; 5] = [
        Self::Clients,
        Self::ContactPersons,
        Self::Projects,
        Self::Deals,
        Self::Tasks,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Clients => "clients",
            Self::ContactPersons => "contactPersons",
            Self::Projects => "projects",
            Self::Deals => "deals",
            Self::Tasks => "tasks",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "clients" => Some(Self::Clients),
            "contactPersons" | "contacts" => Some(Self::ContactPersons),
            "projects" => Some(Self::Projects),
            "deals" => Some(Self::Deals),
            "tasks" => Some(Self::Tasks),
            _ => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Clients => "Clients",
            Self::ContactPersons => "Contacts",
            Self::Projects => "Projects",
            Self::Deals => "Deals",
            Self::Tasks => "Tasks",
        }
    }

    pub const fn fields(self) -> &'static [&'static str] {
        match self {
            Self::Clients => &["id", "name", "website", "createdDate", "ownerId"],
            Self::ContactPersons => &["id", "name", "email", "phone", "designation", "clientId"],
            Self::Projects => &[
                "id",
                "name",
                "clientId",
                "realEstateSegment",
                "sector",
                "memberIds",
                "teamMemberIds",
                "createdDate",
            ],
            Self::Deals => &[
                "id",
                "name",
                "value",
                "stage",
                "projectId",
                "expectedCloseDate",
                "notes",
            ],
            Self::Tasks => &[
                "id",
                "title",
                "description",
                "dueDate",
                "priority",
                "status",
                "projectId",
                "dealId",
            ],
        }
    }

    pub fn field_types(self) -> FieldTypes {
        match self {
            Self::Projects => FieldTypes::new()
                .with_list("memberIds")
                .with_list("teamMemberIds"),
            Self::Deals => FieldTypes::new().with_number("value"),
            Self::Clients | Self::ContactPersons | Self::Tasks => FieldTypes::new(),
        }
    }

    pub fn export_file_name(self) -> String {
        format!("{}.csv", self.as_str())
    }

    pub fn template_file_name(self) -> String {
        format!("{}_template.csv", self.as_str())
    }

    /// Header-only document for filling in by hand.
    pub fn template(self) -> String {
        encode(&[], self.fields())
    }
}
