// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use crm_app::{
    Client, ContactPerson, CrmData, Deal, Exchange, Permission, Project, RecordKind, Task,
    decode_entities, encode_entities,
};
use tracing::{info, warn};

use crate::{Keyed, Store};

/// Outcome of replacing one collection from a comma-separated file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportSummary {
    pub kind: RecordKind,
    pub imported: usize,
    /// 1-based line numbers dropped because their cell count did not match
    /// the header.
    pub skipped_lines: Vec<usize>,
    /// Rows that arrived with a blank id and were given a fresh one.
    pub assigned_ids: usize,
}

impl Store {
    pub fn export_csv(&self, kind: RecordKind) -> Result<String> {
        self.require(view_permission(kind))?;
        let text = match kind {
            RecordKind::Clients => encode_entities(&self.load_all::<Client>()?),
            RecordKind::ContactPersons => encode_entities(&self.load_all::<ContactPerson>()?),
            RecordKind::Projects => encode_entities(&self.load_all::<Project>()?),
            RecordKind::Deals => encode_entities(&self.load_all::<Deal>()?),
            RecordKind::Tasks => encode_entities(&self.load_all::<Task>()?),
        }?;
        info!(kind = kind.as_str(), "exported csv");
        Ok(text)
    }

    /// Replaces the whole collection with the decoded rows. Nothing is
    /// written when any surviving row fails to convert.
    pub fn import_csv(&self, kind: RecordKind, text: &str) -> Result<ImportSummary> {
        self.require(manage_permission(kind))?;
        match kind {
            RecordKind::Clients => self.replace_from_csv::<Client>(text),
            RecordKind::ContactPersons => self.replace_from_csv::<ContactPerson>(text),
            RecordKind::Projects => self.replace_from_csv::<Project>(text),
            RecordKind::Deals => self.replace_from_csv::<Deal>(text),
            RecordKind::Tasks => self.replace_from_csv::<Task>(text),
        }
        .with_context(|| format!("import {}", kind.label().to_lowercase()))
    }

    fn replace_from_csv<T: Keyed + Exchange>(&self, text: &str) -> Result<ImportSummary> {
        let decoded = decode_entities::<T>(text)?;
        let mut entities = decoded.entities;
        let mut assigned_ids = 0;
        for entity in &mut entities {
            if entity.id().as_ref().trim().is_empty() {
                *entity.id_mut() = self.next_id(T::ID_PREFIX);
                assigned_ids += 1;
            }
        }
        self.save_all(&entities)?;

        if !decoded.skipped_lines.is_empty() {
            warn!(
                kind = T::KIND.as_str(),
                lines = ?decoded.skipped_lines,
                "dropped rows whose cell count does not match the header"
            );
        }
        info!(
            kind = T::KIND.as_str(),
            imported = entities.len(),
            assigned_ids,
            "replaced collection from csv"
        );

        Ok(ImportSummary {
            kind: T::KIND,
            imported: entities.len(),
            skipped_lines: decoded.skipped_lines,
            assigned_ids,
        })
    }

    /// Pretty-printed backup of every collection plus the session user.
    pub fn export_json(&self) -> Result<String> {
        self.require(Permission::ViewSettings)?;
        let data = self.snapshot()?;
        serde_json::to_string_pretty(&data).context("serialize backup")
    }

    /// Restores a backup written by [`Store::export_json`]. Every collection
    /// key must be present.
    pub fn import_json(&self, text: &str) -> Result<CrmData> {
        self.require(Permission::ManageRoles)?;
        let data: CrmData = serde_json::from_str(text)
            .context("invalid data structure in JSON file -- expected a crm backup")?;
        self.replace_all(&data)?;
        info!(
            clients = data.clients.len(),
            users = data.users.len(),
            "restored backup"
        );
        Ok(data)
    }
}

pub fn view_permission(kind: RecordKind) -> Permission {
    match kind {
        RecordKind::Clients | RecordKind::ContactPersons | RecordKind::Projects => {
            Permission::ViewContacts
        }
        RecordKind::Deals => Permission::ViewDeals,
        RecordKind::Tasks => Permission::ViewTasks,
    }
}

pub fn manage_permission(kind: RecordKind) -> Permission {
    match kind {
        RecordKind::Clients | RecordKind::ContactPersons | RecordKind::Projects => {
            Permission::ManageContacts
        }
        RecordKind::Deals => Permission::ManageDeals,
        RecordKind::Tasks => Permission::ManageTasks,
    }
}
