// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod demo;
mod exchange;

pub use demo::{default_users, demo_data};
pub use exchange::ImportSummary;

use anyhow::{Context, Result, anyhow, bail};
use crm_app::{
    Activity, ActivityId, Client, ClientId, ContactPerson, ContactPersonId, CrmData, Deal, DealId,
    DealStage, NewActivity, NewClient, NewContactPerson, NewDeal, NewProject, NewRole,
    NewSupportTicket, NewTask, NewUser, Permission, PipelineSummary, Project, ProjectId, Role,
    RoleId, SupportTicket, SupportTicketId, Task, TaskId, User, UserId, default_roles,
};
use rusqlite::{Connection, OptionalExtension, params};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::cell::Cell;
use std::collections::BTreeSet;
use std::env;
use std::fmt::Display;
use std::fs;
use std::path::{Path, PathBuf};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::{debug, info};

pub const APP_NAME: &str = "crm";

const REQUIRED_SCHEMA: &[(&str, &[&str])] = &[("entries", &["key", "value", "updated_at"])];

/// Storage keys, one JSON document each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CollectionKey {
    Clients,
    ContactPersons,
    Projects,
    Deals,
    Tasks,
    Activities,
    SupportTickets,
    Roles,
    Users,
    CurrentUser,
}

impl CollectionKey {
    pub const ALL: [Self; 10] = [
        Self::Clients,
        Self::ContactPersons,
        Self::Projects,
        Self::Deals,
        Self::Tasks,
        Self::Activities,
        Self::SupportTickets,
        Self::Roles,
        Self::Users,
        Self::CurrentUser,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Clients => "crm-clients",
            Self::ContactPersons => "crm-contactPersons",
            Self::Projects => "crm-projects",
            Self::Deals => "crm-deals",
            Self::Tasks => "crm-tasks",
            Self::Activities => "crm-activities",
            Self::SupportTickets => "crm-supportTickets",
            Self::Roles => "crm-roles",
            Self::Users => "crm-users",
            Self::CurrentUser => "crm-currentUser",
        }
    }
}

/// A stored entity with a string id, living in one collection.
pub trait Keyed: Clone + Serialize + DeserializeOwned {
    type Id: PartialEq + Display + AsRef<str> + From<String>;
    const KEY: CollectionKey;
    const LABEL: &'static str;
    const ID_PREFIX: &'static str;

    fn id(&self) -> &Self::Id;
    fn id_mut(&mut self) -> &mut Self::Id;
}

macro_rules! keyed {
    ($entity:ty, $id:ty, $key:expr, $label:literal) => {
        impl Keyed for $entity {
            type Id = $id;
            const KEY: CollectionKey = $key;
            const LABEL: &'static str = $label;
            const ID_PREFIX: &'static str = <$id>::PREFIX;

            fn id(&self) -> &$id {
                &self.id
            }

            fn id_mut(&mut self) -> &mut $id {
                &mut self.id
            }
        }
    };
}

keyed!(Client, ClientId, CollectionKey::Clients, "client");
keyed!(
    ContactPerson,
    ContactPersonId,
    CollectionKey::ContactPersons,
    "contact"
);
keyed!(Project, ProjectId, CollectionKey::Projects, "project");
keyed!(Deal, DealId, CollectionKey::Deals, "deal");
keyed!(Task, TaskId, CollectionKey::Tasks, "task");
keyed!(Activity, ActivityId, CollectionKey::Activities, "activity");
keyed!(
    SupportTicket,
    SupportTicketId,
    CollectionKey::SupportTickets,
    "support ticket"
);
keyed!(User, UserId, CollectionKey::Users, "user");
keyed!(Role, RoleId, CollectionKey::Roles, "role");

pub struct Store {
    conn: Connection,
    last_id_millis: Cell<i128>,
}

impl Store {
    pub fn open(path: &Path) -> Result<Self> {
        let printable = path.to_string_lossy().to_string();
        validate_db_path(&printable)?;
        let conn = Connection::open(path)
            .with_context(|| format!("open database at {}", path.display()))?;
        configure_connection(&conn)?;
        Ok(Self::from_connection(conn))
    }

    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("open in-memory database")?;
        configure_connection(&conn)?;
        Ok(Self::from_connection(conn))
    }

    fn from_connection(conn: Connection) -> Self {
        Self {
            conn,
            last_id_millis: Cell::new(0),
        }
    }

    pub fn raw_connection(&self) -> &Connection {
        &self.conn
    }

    pub fn bootstrap(&self) -> Result<()> {
        if has_user_tables(&self.conn)? {
            validate_schema(&self.conn)?;
        } else {
            self.conn
                .execute_batch(include_str!("sql/schema.sql"))
                .context("create schema")?;
        }

        self.seed_defaults()
    }

    /// Fills in roles, users and the session user when they have never been
    /// written. Existing values are left alone.
    pub fn seed_defaults(&self) -> Result<()> {
        if self.get_raw(CollectionKey::Roles)?.is_none() {
            self.save(CollectionKey::Roles, &default_roles())?;
        }
        if self.get_raw(CollectionKey::Users)?.is_none() {
            self.save(CollectionKey::Users, &default_users())?;
        }
        if self.get_raw(CollectionKey::CurrentUser)?.is_none() {
            let users: Vec<User> = self.load_all()?;
            if let Some(first) = users.first() {
                self.put_json(CollectionKey::CurrentUser, first)?;
            }
        }
        Ok(())
    }

    /// Overwrites every collection with the demo data set.
    pub fn seed_demo_data(&self) -> Result<()> {
        let data = demo_data(now_utc()?);
        self.replace_all(&data)?;
        info!(
            clients = data.clients.len(),
            deals = data.deals.len(),
            "seeded demo data"
        );
        Ok(())
    }

    pub fn reset_data(&self) -> Result<()> {
        self.require(Permission::ManageRoles)?;
        self.seed_demo_data()
    }

    pub fn snapshot(&self) -> Result<CrmData> {
        Ok(CrmData {
            clients: self.load_all()?,
            contact_persons: self.load_all()?,
            projects: self.load_all()?,
            deals: self.load_all()?,
            tasks: self.load_all()?,
            activities: self.load_all()?,
            support_tickets: self.load_all()?,
            roles: self.load_all()?,
            users: self.load_all()?,
            current_user: self.current_user()?,
        })
    }

    fn replace_all(&self, data: &CrmData) -> Result<()> {
        let tx = self
            .conn
            .unchecked_transaction()
            .context("begin replace all")?;
        self.save_all(&data.clients)?;
        self.save_all(&data.contact_persons)?;
        self.save_all(&data.projects)?;
        self.save_all(&data.deals)?;
        self.save_all(&data.tasks)?;
        self.save_all(&data.activities)?;
        self.save_all(&data.support_tickets)?;
        self.save_all(&data.roles)?;
        self.save_all(&data.users)?;
        self.put_json(CollectionKey::CurrentUser, &data.current_user)?;
        tx.commit().context("commit replace all")
    }

    // --- session and permissions ---

    pub fn current_user(&self) -> Result<User> {
        let raw = self.get_raw(CollectionKey::CurrentUser)?.ok_or_else(|| {
            anyhow!("no current user is set -- run `crm use-user <id>` with an existing user")
        })?;
        serde_json::from_str(&raw).context("decode current user")
    }

    pub fn set_current_user(&self, user_id: &UserId) -> Result<User> {
        let users: Vec<User> = self.load_all()?;
        let user = users
            .into_iter()
            .find(|user| &user.id == user_id)
            .ok_or_else(|| anyhow!("user {user_id} not found -- choose an existing user id"))?;
        self.put_json(CollectionKey::CurrentUser, &user)?;
        info!(user = %user.id, "switched current user");
        Ok(user)
    }

    /// False when the session user's role no longer exists.
    pub fn has_permission(&self, permission: Permission) -> Result<bool> {
        let user = self.current_user()?;
        let roles: Vec<Role> = self.load_all()?;
        Ok(roles
            .iter()
            .find(|role| role.id == user.role_id)
            .is_some_and(|role| role.allows(permission)))
    }

    fn require(&self, permission: Permission) -> Result<()> {
        if self.has_permission(permission)? {
            return Ok(());
        }
        let user = self.current_user()?;
        bail!(
            "{} ({}) lacks the `{}` permission -- switch user or ask an admin to update the role",
            user.name,
            user.id,
            permission.as_str()
        );
    }

    // --- clients, contacts, projects ---

    pub fn list_clients(&self) -> Result<Vec<Client>> {
        self.load_all()
    }

    pub fn get_client(&self, id: &ClientId) -> Result<Client> {
        self.find_entity(id)
    }

    pub fn add_client(&self, input: &NewClient) -> Result<Client> {
        input.validate()?;
        self.require(Permission::ManageContacts)?;
        let client = Client {
            id: self.next_id(ClientId::PREFIX),
            name: input.name.trim().to_owned(),
            website: input.website.trim().to_owned(),
            created_date: now_utc()?,
            owner_id: input.owner_id.clone(),
        };
        self.insert_entity(client, Placement::Append)
    }

    pub fn update_client(&self, client: &Client) -> Result<()> {
        self.require(Permission::ManageContacts)?;
        self.update_entity(client)
    }

    /// Removes the client, its projects (with everything hanging off them)
    /// and its contacts.
    pub fn delete_client(&self, id: &ClientId) -> Result<()> {
        self.require(Permission::ManageContacts)?;
        let tx = self
            .conn
            .unchecked_transaction()
            .context("begin client delete")?;
        self.remove_entity::<Client>(id)?;

        let projects: Vec<Project> = self.load_all()?;
        let owned: Vec<ProjectId> = projects
            .into_iter()
            .filter(|project| &project.client_id == id)
            .map(|project| project.id)
            .collect();
        for project_id in &owned {
            self.delete_project_cascade(project_id)?;
        }

        let mut persons: Vec<ContactPerson> = self.load_all()?;
        let before = persons.len();
        persons.retain(|person| &person.client_id != id);
        self.save_all(&persons)?;

        tx.commit().context("commit client delete")?;
        debug!(
            client = %id,
            projects = owned.len(),
            contacts = before - persons.len(),
            "deleted client with dependents"
        );
        Ok(())
    }

    pub fn list_contact_persons(&self) -> Result<Vec<ContactPerson>> {
        self.load_all()
    }

    pub fn add_contact_person(&self, input: &NewContactPerson) -> Result<ContactPerson> {
        input.validate()?;
        self.require(Permission::ManageContacts)?;
        let person = ContactPerson {
            id: self.next_id(ContactPersonId::PREFIX),
            name: input.name.trim().to_owned(),
            email: input.email.trim().to_owned(),
            phone: input.phone.trim().to_owned(),
            designation: input.designation.trim().to_owned(),
            client_id: input.client_id.clone(),
        };
        self.insert_entity(person, Placement::Append)
    }

    pub fn update_contact_person(&self, person: &ContactPerson) -> Result<()> {
        self.require(Permission::ManageContacts)?;
        self.update_entity(person)
    }

    /// Removes the contact and drops it from every project's member list.
    pub fn delete_contact_person(&self, id: &ContactPersonId) -> Result<()> {
        self.require(Permission::ManageContacts)?;
        let tx = self
            .conn
            .unchecked_transaction()
            .context("begin contact delete")?;
        self.remove_entity::<ContactPerson>(id)?;
        let mut projects: Vec<Project> = self.load_all()?;
        for project in &mut projects {
            project.member_ids.retain(|member| member != id);
        }
        self.save_all(&projects)?;
        tx.commit().context("commit contact delete")
    }

    pub fn list_projects(&self) -> Result<Vec<Project>> {
        self.load_all()
    }

    pub fn get_project(&self, id: &ProjectId) -> Result<Project> {
        self.find_entity(id)
    }

    pub fn add_project(&self, input: &NewProject) -> Result<Project> {
        input.validate()?;
        self.require(Permission::ManageContacts)?;
        let project = Project {
            id: self.next_id(ProjectId::PREFIX),
            name: input.name.trim().to_owned(),
            client_id: input.client_id.clone(),
            real_estate_segment: input.real_estate_segment.trim().to_owned(),
            sector: input.sector.trim().to_owned(),
            member_ids: input.member_ids.clone(),
            team_member_ids: input.team_member_ids.clone(),
            created_date: now_utc()?,
        };
        self.insert_entity(project, Placement::Append)
    }

    pub fn update_project(&self, project: &Project) -> Result<()> {
        self.require(Permission::ManageContacts)?;
        self.update_entity(project)
    }

    /// Removes the project with its deals, tasks, activities and tickets.
    pub fn delete_project(&self, id: &ProjectId) -> Result<()> {
        self.require(Permission::ManageContacts)?;
        let tx = self
            .conn
            .unchecked_transaction()
            .context("begin project delete")?;
        self.delete_project_cascade(id)?;
        tx.commit().context("commit project delete")
    }

    fn delete_project_cascade(&self, id: &ProjectId) -> Result<()> {
        self.remove_entity::<Project>(id)?;

        let mut deals: Vec<Deal> = self.load_all()?;
        deals.retain(|deal| &deal.project_id != id);
        self.save_all(&deals)?;

        let mut tasks: Vec<Task> = self.load_all()?;
        tasks.retain(|task| task.project_id.as_ref() != Some(id));
        self.save_all(&tasks)?;

        let mut activities: Vec<Activity> = self.load_all()?;
        activities.retain(|activity| &activity.project_id != id);
        self.save_all(&activities)?;

        let mut tickets: Vec<SupportTicket> = self.load_all()?;
        tickets.retain(|ticket| &ticket.project_id != id);
        self.save_all(&tickets)?;

        debug!(project = %id, "deleted project with dependents");
        Ok(())
    }

    // --- deals and tasks ---

    pub fn list_deals(&self) -> Result<Vec<Deal>> {
        self.load_all()
    }

    pub fn add_deal(&self, input: &NewDeal) -> Result<Deal> {
        input.validate()?;
        self.require(Permission::ManageDeals)?;
        let deal = Deal {
            id: self.next_id(DealId::PREFIX),
            name: input.name.trim().to_owned(),
            value: input.value,
            stage: input.stage,
            project_id: input.project_id.clone(),
            expected_close_date: input.expected_close_date,
            notes: input.notes.clone(),
        };
        self.insert_entity(deal, Placement::Append)
    }

    pub fn update_deal(&self, deal: &Deal) -> Result<()> {
        self.require(Permission::ManageDeals)?;
        self.update_entity(deal)
    }

    /// Moves a deal to another pipeline column.
    pub fn update_deal_stage(&self, id: &DealId, stage: DealStage) -> Result<Deal> {
        self.require(Permission::ManageDeals)?;
        let mut deal: Deal = self.find_entity(id)?;
        deal.stage = stage;
        self.update_entity(&deal)?;
        debug!(deal = %deal.id, stage = stage.as_str(), "moved deal");
        Ok(deal)
    }

    pub fn delete_deal(&self, id: &DealId) -> Result<()> {
        self.require(Permission::ManageDeals)?;
        self.remove_entity::<Deal>(id).map(|_| ())
    }

    pub fn pipeline_summary(&self) -> Result<PipelineSummary> {
        self.require(Permission::ViewReports)?;
        let deals: Vec<Deal> = self.load_all()?;
        Ok(PipelineSummary::from_deals(&deals))
    }

    pub fn list_tasks(&self) -> Result<Vec<Task>> {
        self.load_all()
    }

    pub fn add_task(&self, input: &NewTask) -> Result<Task> {
        input.validate()?;
        self.require(Permission::ManageTasks)?;
        let task = Task {
            id: self.next_id(TaskId::PREFIX),
            title: input.title.trim().to_owned(),
            description: input.description.clone(),
            due_date: input.due_date,
            priority: input.priority,
            status: input.status,
            project_id: input.project_id.clone(),
            deal_id: input.deal_id.clone(),
        };
        self.insert_entity(task, Placement::Append)
    }

    pub fn update_task(&self, task: &Task) -> Result<()> {
        self.require(Permission::ManageTasks)?;
        self.update_entity(task)
    }

    pub fn delete_task(&self, id: &TaskId) -> Result<()> {
        self.require(Permission::ManageTasks)?;
        self.remove_entity::<Task>(id).map(|_| ())
    }

    // --- activities and tickets, newest first ---

    pub fn list_activities(&self) -> Result<Vec<Activity>> {
        self.load_all()
    }

    pub fn add_activity(&self, input: &NewActivity) -> Result<Activity> {
        input.validate()?;
        self.require(Permission::ManageContacts)?;
        let activity = Activity {
            id: self.next_id(ActivityId::PREFIX),
            kind: input.kind,
            description: input.description.trim().to_owned(),
            date: now_utc()?,
            project_id: input.project_id.clone(),
            user_id: self.current_user()?.id,
        };
        self.insert_entity(activity, Placement::Prepend)
    }

    pub fn update_activity(&self, activity: &Activity) -> Result<()> {
        self.require(Permission::ManageContacts)?;
        self.update_entity(activity)
    }

    pub fn list_support_tickets(&self) -> Result<Vec<SupportTicket>> {
        self.load_all()
    }

    pub fn add_support_ticket(&self, input: &NewSupportTicket) -> Result<SupportTicket> {
        input.validate()?;
        self.require(Permission::ManageContacts)?;
        let ticket = SupportTicket {
            id: self.next_id(SupportTicketId::PREFIX),
            subject: input.subject.trim().to_owned(),
            description: input.description.trim().to_owned(),
            project_id: input.project_id.clone(),
            status: input.status,
            created_date: now_utc()?,
            user_id: self.current_user()?.id,
        };
        self.insert_entity(ticket, Placement::Prepend)
    }

    pub fn update_support_ticket(&self, ticket: &SupportTicket) -> Result<()> {
        self.require(Permission::ManageContacts)?;
        self.update_entity(ticket)
    }

    // --- users and roles ---

    pub fn list_users(&self) -> Result<Vec<User>> {
        self.load_all()
    }

    pub fn add_user(&self, input: &NewUser) -> Result<User> {
        input.validate()?;
        self.require(Permission::ManageUsers)?;
        self.find_entity::<Role>(&input.role_id)?;
        let user = User {
            id: self.next_id(UserId::PREFIX),
            name: input.name.trim().to_owned(),
            email: input.email.trim().to_owned(),
            avatar: input.avatar.trim().to_owned(),
            role_id: input.role_id.clone(),
        };
        self.insert_entity(user, Placement::Append)
    }

    /// Also refreshes the session copy when the edited user is signed in.
    pub fn update_user(&self, user: &User) -> Result<()> {
        self.require(Permission::ManageUsers)?;
        self.update_entity(user)?;
        if self.current_user()?.id == user.id {
            self.put_json(CollectionKey::CurrentUser, user)?;
        }
        Ok(())
    }

    pub fn delete_user(&self, id: &UserId) -> Result<()> {
        self.require(Permission::ManageUsers)?;
        if &self.current_user()?.id == id {
            bail!("cannot delete the signed-in user {id} -- switch to another user first");
        }
        self.remove_entity::<User>(id).map(|_| ())
    }

    pub fn list_roles(&self) -> Result<Vec<Role>> {
        self.load_all()
    }

    pub fn add_role(&self, input: &NewRole) -> Result<Role> {
        input.validate()?;
        self.require(Permission::ManageRoles)?;
        let role = Role::with_permissions(
            self.next_id(RoleId::PREFIX),
            input.name.trim(),
            &input.granted,
        );
        self.insert_entity(role, Placement::Append)
    }

    pub fn update_role(&self, role: &Role) -> Result<()> {
        self.require(Permission::ManageRoles)?;
        self.update_entity(role)
    }

    pub fn delete_role(&self, id: &RoleId) -> Result<()> {
        self.require(Permission::ManageRoles)?;
        let users: Vec<User> = self.load_all()?;
        let assigned = users.iter().filter(|user| &user.role_id == id).count();
        if assigned > 0 {
            bail!(
                "role {id} is assigned to {assigned} user(s) -- reassign them before deleting it"
            );
        }
        self.remove_entity::<Role>(id).map(|_| ())
    }

    // --- key-value plumbing ---

    /// Ids are `<prefix>-<unix millis>`, bumped so one store never hands out
    /// the same value twice.
    fn next_id<I: From<String>>(&self, prefix: &str) -> I {
        let now_millis = OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000;
        let millis = now_millis.max(self.last_id_millis.get() + 1);
        self.last_id_millis.set(millis);
        I::from(format!("{prefix}-{millis}"))
    }

    fn find_entity<T: Keyed>(&self, id: &T::Id) -> Result<T> {
        let items: Vec<T> = self.load_all()?;
        items
            .into_iter()
            .find(|item| item.id() == id)
            .ok_or_else(|| not_found::<T>(id))
    }

    fn insert_entity<T: Keyed>(&self, entity: T, placement: Placement) -> Result<T> {
        let mut items: Vec<T> = self.load_all()?;
        match placement {
            Placement::Append => items.push(entity.clone()),
            Placement::Prepend => items.insert(0, entity.clone()),
        }
        self.save_all(&items)?;
        debug!(kind = T::LABEL, id = %entity.id(), "added");
        Ok(entity)
    }

    fn update_entity<T: Keyed>(&self, updated: &T) -> Result<()> {
        let mut items: Vec<T> = self.load_all()?;
        let slot = items
            .iter_mut()
            .find(|item| item.id() == updated.id())
            .ok_or_else(|| not_found::<T>(updated.id()))?;
        *slot = updated.clone();
        self.save_all(&items)
    }

    fn remove_entity<T: Keyed>(&self, id: &T::Id) -> Result<T> {
        let mut items: Vec<T> = self.load_all()?;
        let index = items
            .iter()
            .position(|item| item.id() == id)
            .ok_or_else(|| not_found::<T>(id))?;
        let removed = items.remove(index);
        self.save_all(&items)?;
        Ok(removed)
    }

    pub(crate) fn load_all<T: Keyed>(&self) -> Result<Vec<T>> {
        self.load(T::KEY)
    }

    pub(crate) fn save_all<T: Keyed>(&self, items: &[T]) -> Result<()> {
        self.save(T::KEY, items)
    }

    fn load<T: DeserializeOwned>(&self, key: CollectionKey) -> Result<Vec<T>> {
        match self.get_raw(key)? {
            None => Ok(Vec::new()),
            Some(raw) => serde_json::from_str(&raw).with_context(|| {
                format!(
                    "decode stored {} -- the value is corrupt; run `crm reset` or import a backup",
                    key.as_str()
                )
            }),
        }
    }

    fn save<T: Serialize>(&self, key: CollectionKey, items: &[T]) -> Result<()> {
        self.put_json(key, items)
    }

    fn put_json<T: Serialize + ?Sized>(&self, key: CollectionKey, value: &T) -> Result<()> {
        let raw = serde_json::to_string(value)
            .with_context(|| format!("serialize {}", key.as_str()))?;
        self.put_raw(key, &raw)
    }

    fn get_raw(&self, key: CollectionKey) -> Result<Option<String>> {
        self.conn
            .query_row(
                "SELECT value FROM entries WHERE key = ?",
                params![key.as_str()],
                |row| row.get(0),
            )
            .optional()
            .with_context(|| format!("read {}", key.as_str()))
    }

    fn put_raw(&self, key: CollectionKey, raw: &str) -> Result<()> {
        let updated_at = now_rfc3339()?;
        self.conn
            .execute(
                "
                INSERT INTO entries (key, value, updated_at)
                VALUES (?, ?, ?)
                ON CONFLICT(key) DO UPDATE SET
                  value = excluded.value,
                  updated_at = excluded.updated_at
                ",
                params![key.as_str(), raw, updated_at],
            )
            .with_context(|| format!("write {}", key.as_str()))?;
        Ok(())
    }

    /// Keys that currently hold a value, in storage order.
    pub fn stored_keys(&self) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT key FROM entries ORDER BY key ASC")
            .context("prepare stored keys query")?;
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .context("query stored keys")?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .context("collect stored keys")
    }
}

#[derive(Debug, Clone, Copy)]
enum Placement {
    Append,
    Prepend,
}

fn not_found<T: Keyed>(id: &T::Id) -> anyhow::Error {
    anyhow!("{} {id} not found -- it may have been deleted", T::LABEL)
}

pub fn default_db_path() -> Result<PathBuf> {
    if let Some(override_path) = env::var_os("CRM_DB_PATH") {
        return Ok(PathBuf::from(override_path));
    }

    let data_root = dirs::data_local_dir().ok_or_else(|| {
        anyhow!("cannot resolve data directory; set CRM_DB_PATH to a writable database path")
    })?;

    let app_dir = data_root.join(APP_NAME);
    fs::create_dir_all(&app_dir)
        .with_context(|| format!("create data directory {}", app_dir.display()))?;
    Ok(app_dir.join("crm.db"))
}

pub fn validate_db_path(path: &str) -> Result<()> {
    if path.is_empty() {
        bail!("database path must not be empty");
    }
    if path == ":memory:" {
        return Ok(());
    }

    if let Some(index) = path.find("://")
        && index > 0
    {
        let scheme = &path[..index];
        if scheme.chars().all(char::is_alphabetic) {
            bail!(
                "database path {path:?} looks like a URI ({scheme}://); pass a filesystem path instead"
            );
        }
    }

    if path.starts_with("file:") {
        bail!("database path {path:?} uses file: URI syntax; pass a plain filesystem path");
    }

    if path.contains('?') {
        bail!(
            "database path {path:?} contains '?'; remove query parameters and use a plain file path"
        );
    }

    Ok(())
}

fn has_user_tables(conn: &Connection) -> Result<bool> {
    let count: i64 = conn
        .query_row(
            "
            SELECT COUNT(*)
            FROM sqlite_master
            WHERE type = 'table'
              AND name NOT LIKE 'sqlite_%'
            ",
            [],
            |row| row.get(0),
        )
        .context("count user tables")?;
    Ok(count > 0)
}

fn validate_schema(conn: &Connection) -> Result<()> {
    for (table, required_columns) in REQUIRED_SCHEMA {
        if !table_exists(conn, table)? {
            bail!(
                "database is missing required table `{table}`; point CRM_DB_PATH at a crm database"
            );
        }

        let columns = table_columns(conn, table)?;
        let missing: Vec<&str> = required_columns
            .iter()
            .copied()
            .filter(|column| !columns.contains(*column))
            .collect();

        if !missing.is_empty() {
            bail!(
                "table `{table}` is missing required columns: {}; the file was not written by crm",
                missing.join(", ")
            );
        }
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> Result<bool> {
    let exists = conn
        .query_row(
            "
            SELECT EXISTS(
              SELECT 1
              FROM sqlite_master
              WHERE type = 'table' AND name = ?
            )
            ",
            params![table],
            |row| row.get::<_, i64>(0),
        )
        .with_context(|| format!("check table existence for {table}"))?;
    Ok(exists == 1)
}

fn table_columns(conn: &Connection, table: &str) -> Result<BTreeSet<String>> {
    let mut stmt = conn
        .prepare(&format!("PRAGMA table_info({table})"))
        .with_context(|| format!("inspect columns for {table}"))?;
    let rows = stmt
        .query_map([], |row| row.get::<_, String>(1))
        .with_context(|| format!("query column info for {table}"))?;

    let names = rows
        .collect::<rusqlite::Result<BTreeSet<_>>>()
        .with_context(|| format!("collect columns for {table}"))?;
    Ok(names)
}

fn configure_connection(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA busy_timeout = 5000;
        ",
    )
    .context("configure sqlite pragmas")
}

/// Current time truncated to milliseconds, the precision stored timestamps
/// carry.
fn now_utc() -> Result<OffsetDateTime> {
    let now = OffsetDateTime::now_utc();
    now.replace_millisecond(now.millisecond())
        .context("truncate current timestamp")
}

fn now_rfc3339() -> Result<String> {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .context("format current timestamp")
}
