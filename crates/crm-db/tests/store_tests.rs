// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::Result;
use crm_app::{
    ActivityKind, ClientId, ContactPersonId, DealId, DealStage, NewActivity, NewRole, Permission,
    ProjectId, RecordKind, RoleId, UserId,
};
use crm_db::{CollectionKey, Store, default_db_path, validate_db_path};
use crm_testkit::{CrmFaker, temp_db_path};
use std::env;
use std::sync::{Mutex, OnceLock};

fn demo_store() -> Result<Store> {
    let store = Store::open_memory()?;
    store.bootstrap()?;
    store.seed_demo_data()?;
    Ok(store)
}

fn env_lock() -> std::sync::MutexGuard<'static, ()> {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    match ENV_LOCK.get_or_init(|| Mutex::new(())).lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

#[test]
fn validate_db_path_rejects_uri_forms() {
    assert!(validate_db_path("file:test.db").is_err());
    assert!(validate_db_path("https://example.com/db.sqlite").is_err());
    assert!(validate_db_path("db.sqlite?mode=ro").is_err());
    assert!(validate_db_path("/tmp/crm.db").is_ok());
}

#[test]
fn default_db_path_honors_override() {
    let _guard = env_lock();
    unsafe {
        env::set_var("CRM_DB_PATH", "/tmp/override-crm.db");
    }
    let path = default_db_path();
    unsafe {
        env::remove_var("CRM_DB_PATH");
    }
    assert_eq!(
        path.expect("override path"),
        std::path::PathBuf::from("/tmp/override-crm.db")
    );
}

#[test]
fn bootstrap_seeds_roles_users_and_session() -> Result<()> {
    let store = Store::open_memory()?;
    store.bootstrap()?;

    assert_eq!(store.list_roles()?.len(), 3);
    assert_eq!(store.list_users()?.len(), 4);
    assert_eq!(store.current_user()?.name, "Alex Johnson");
    assert!(store.list_deals()?.is_empty());

    let keys = store.stored_keys()?;
    assert!(keys.contains(&CollectionKey::Roles.as_str().to_owned()));
    assert!(keys.contains(&CollectionKey::CurrentUser.as_str().to_owned()));
    Ok(())
}

#[test]
fn bootstrap_keeps_existing_values() -> Result<()> {
    let store = Store::open_memory()?;
    store.bootstrap()?;
    store.set_current_user(&UserId::new("user-3"))?;
    store.bootstrap()?;
    assert_eq!(store.current_user()?.id, UserId::new("user-3"));
    Ok(())
}

#[test]
fn bootstrap_rejects_schema_missing_required_column() -> Result<()> {
    let store = Store::open_memory()?;
    store.bootstrap()?;
    store.raw_connection().execute_batch(
        "
            DROP TABLE entries;
            CREATE TABLE entries (key TEXT PRIMARY KEY, value TEXT NOT NULL);
            ",
    )?;

    let error = store
        .bootstrap()
        .expect_err("missing column should fail bootstrap");
    assert!(error.to_string().contains("updated_at"));
    Ok(())
}

#[test]
fn bootstrap_rejects_foreign_database() -> Result<()> {
    let store = Store::open_memory()?;
    store
        .raw_connection()
        .execute_batch("CREATE TABLE notes (id INTEGER PRIMARY KEY, body TEXT);")?;
    let error = store.bootstrap().expect_err("foreign schema should fail");
    assert!(error.to_string().contains("entries"));
    Ok(())
}

#[test]
fn data_survives_reopen() -> Result<()> {
    let (_dir, path) = temp_db_path()?;
    {
        let store = Store::open(&path)?;
        store.bootstrap()?;
        store.seed_demo_data()?;
        store.delete_deal(&DealId::new("deal-6"))?;
    }

    let store = Store::open(&path)?;
    store.bootstrap()?;
    let deals = store.list_deals()?;
    assert_eq!(deals.len(), 5);
    assert!(deals.iter().all(|deal| deal.id.as_str() != "deal-6"));
    Ok(())
}

#[test]
fn deleting_client_cascades_to_projects_and_contacts() -> Result<()> {
    let store = demo_store()?;
    store.delete_client(&ClientId::new("client-1"))?;

    assert!(
        store
            .list_clients()?
            .iter()
            .all(|client| client.id.as_str() != "client-1")
    );
    let projects: Vec<String> = store
        .list_projects()?
        .into_iter()
        .map(|project| project.id.to_string())
        .collect();
    assert_eq!(projects, vec!["project-2", "project-4", "project-5"]);

    let persons: Vec<String> = store
        .list_contact_persons()?
        .into_iter()
        .map(|person| person.id.to_string())
        .collect();
    assert_eq!(persons, vec!["person-2", "person-4", "person-5"]);

    let deals: Vec<String> = store
        .list_deals()?
        .into_iter()
        .map(|deal| deal.id.to_string())
        .collect();
    assert_eq!(deals, vec!["deal-2", "deal-4", "deal-5", "deal-6"]);

    let tasks = store.list_tasks()?;
    assert!(tasks.iter().all(|task| {
        task.project_id.as_ref().map(ProjectId::as_str) != Some("project-1")
            && task.project_id.as_ref().map(ProjectId::as_str) != Some("project-3")
    }));
    assert_eq!(tasks.len(), 3);
    assert_eq!(store.list_activities()?.len(), 3);
    assert_eq!(store.list_support_tickets()?.len(), 2);
    Ok(())
}

#[test]
fn deleting_contact_removes_project_membership() -> Result<()> {
    let store = demo_store()?;
    store.delete_contact_person(&ContactPersonId::new("person-3"))?;

    let projects = store.list_projects()?;
    let phoenix = projects
        .iter()
        .find(|project| project.id.as_str() == "project-1")
        .expect("project-1 present");
    assert_eq!(phoenix.member_ids, vec![ContactPersonId::new("person-1")]);
    let migration = projects
        .iter()
        .find(|project| project.id.as_str() == "project-3")
        .expect("project-3 present");
    assert!(migration.member_ids.is_empty());
    Ok(())
}

#[test]
fn deleting_project_removes_its_pipeline() -> Result<()> {
    let store = demo_store()?;
    store.delete_project(&ProjectId::new("project-2"))?;

    assert_eq!(store.list_projects()?.len(), 4);
    assert!(
        store
            .list_deals()?
            .iter()
            .all(|deal| deal.project_id.as_str() != "project-2")
    );
    assert_eq!(store.list_deals()?.len(), 4);
    assert_eq!(store.list_tasks()?.len(), 4);
    assert_eq!(store.list_activities()?.len(), 3);
    assert_eq!(store.list_support_tickets()?.len(), 2);
    // The client stays.
    assert_eq!(store.list_clients()?.len(), 4);
    Ok(())
}

#[test]
fn deleting_missing_entity_reports_not_found() -> Result<()> {
    let store = demo_store()?;
    let error = store
        .delete_deal(&DealId::new("deal-404"))
        .expect_err("missing deal should fail");
    assert!(error.to_string().contains("deal deal-404 not found"));
    Ok(())
}

#[test]
fn sales_rep_cannot_manage_users_or_view_reports() -> Result<()> {
    let store = demo_store()?;
    store.set_current_user(&UserId::new("user-3"))?;

    assert!(store.has_permission(Permission::ManageDeals)?);
    assert!(!store.has_permission(Permission::ViewReports)?);

    let error = store
        .delete_user(&UserId::new("user-4"))
        .expect_err("rep should not manage users");
    assert!(error.to_string().contains("manageUsers"));
    assert!(store.pipeline_summary().is_err());
    assert!(store.export_json().is_ok());
    Ok(())
}

#[test]
fn missing_role_grants_nothing() -> Result<()> {
    let store = demo_store()?;
    let mut sam = store
        .list_users()?
        .into_iter()
        .find(|user| user.id.as_str() == "user-3")
        .expect("user-3 present");
    sam.role_id = RoleId::new("role-ghost");
    store.update_user(&sam)?;
    store.set_current_user(&sam.id)?;

    for permission in Permission::ALL {
        assert!(!store.has_permission(permission)?, "{}", permission.as_str());
    }
    assert!(store.export_csv(RecordKind::Clients).is_err());
    Ok(())
}

#[test]
fn update_user_refreshes_session_copy() -> Result<()> {
    let store = demo_store()?;
    let mut alex = store.current_user()?;
    alex.name = "Alexandra Johnson".to_owned();
    store.update_user(&alex)?;
    assert_eq!(store.current_user()?.name, "Alexandra Johnson");
    Ok(())
}

#[test]
fn users_cannot_delete_themselves() -> Result<()> {
    let store = demo_store()?;
    let error = store
        .delete_user(&UserId::new("user-1"))
        .expect_err("self delete should fail");
    assert!(error.to_string().contains("signed-in user"));

    store.delete_user(&UserId::new("user-4"))?;
    assert_eq!(store.list_users()?.len(), 3);
    Ok(())
}

#[test]
fn roles_in_use_cannot_be_deleted() -> Result<()> {
    let store = demo_store()?;
    let error = store
        .delete_role(&RoleId::new("role-rep"))
        .expect_err("assigned role should stay");
    assert!(error.to_string().contains("2 user(s)"));

    let auditor = store.add_role(&NewRole {
        name: "Auditor".to_owned(),
        granted: vec![Permission::ViewReports, Permission::ViewDeals],
    })?;
    assert!(auditor.id.as_str().starts_with("role-"));
    assert!(auditor.allows(Permission::ViewReports));
    assert!(!auditor.allows(Permission::ManageDeals));
    store.delete_role(&auditor.id)?;
    assert_eq!(store.list_roles()?.len(), 3);
    Ok(())
}

#[test]
fn new_activity_is_newest_and_stamped_with_current_user() -> Result<()> {
    let store = demo_store()?;
    store.set_current_user(&UserId::new("user-2"))?;
    let added = store.add_activity(&NewActivity {
        kind: ActivityKind::Call,
        description: "Checked in on renewal".to_owned(),
        project_id: ProjectId::new("project-5"),
    })?;

    let activities = store.list_activities()?;
    assert_eq!(activities[0], added);
    assert_eq!(added.user_id, UserId::new("user-2"));
    assert!(added.id.as_str().starts_with("activity-"));
    Ok(())
}

#[test]
fn deal_stage_moves_and_pipeline_totals() -> Result<()> {
    let store = demo_store()?;
    let summary = store.pipeline_summary()?;
    assert_eq!(summary.open_deals, 5);
    assert_eq!(summary.open_value, 290_000.0);
    assert_eq!(summary.won_deals, 1);
    assert_eq!(summary.won_value, 75_000.0);

    let moved = store.update_deal_stage(&DealId::new("deal-4"), DealStage::ClosedWon)?;
    assert_eq!(moved.stage, DealStage::ClosedWon);
    let summary = store.pipeline_summary()?;
    assert_eq!(summary.won_deals, 2);
    assert_eq!(summary.won_value, 195_000.0);
    Ok(())
}

#[test]
fn every_kind_survives_export_then_import() -> Result<()> {
    let store = demo_store()?;
    for kind in RecordKind::ALL {
        let before = store.export_csv(kind)?;
        let summary = store.import_csv(kind, &before)?;
        assert!(summary.skipped_lines.is_empty(), "kind {}", kind.as_str());
        assert_eq!(summary.assigned_ids, 0);
        assert_eq!(store.export_csv(kind)?, before, "kind {}", kind.as_str());
    }
    assert_eq!(store.list_deals()?.len(), 6);
    assert_eq!(
        store.list_projects()?[0].member_ids,
        vec![
            ContactPersonId::new("person-1"),
            ContactPersonId::new("person-3")
        ]
    );
    Ok(())
}

#[test]
fn faker_populated_store_round_trips() -> Result<()> {
    let store = Store::open_memory()?;
    store.bootstrap()?;
    let mut faker = CrmFaker::new(19);

    for _ in 0..6 {
        let client = store.add_client(&faker.client())?;
        let mut members = Vec::new();
        for _ in 0..2 {
            members.push(store.add_contact_person(&faker.contact_person(&client.id))?.id);
        }
        let project = store.add_project(&faker.project(&client.id, &members))?;
        let deal = store.add_deal(&faker.deal(&project.id))?;
        store.add_task(&faker.task(Some(&project.id), Some(&deal.id)))?;
    }

    let clients = store.list_clients()?;
    let projects = store.list_projects()?;
    let deals = store.list_deals()?;
    let tasks = store.list_tasks()?;

    for kind in RecordKind::ALL {
        let text = store.export_csv(kind)?;
        store.import_csv(kind, &text)?;
    }

    assert_eq!(store.list_clients()?, clients);
    assert_eq!(store.list_projects()?, projects);
    assert_eq!(store.list_deals()?, deals);
    assert_eq!(store.list_tasks()?, tasks);
    Ok(())
}

#[test]
fn import_reports_skipped_rows_and_fills_blank_ids() -> Result<()> {
    let store = demo_store()?;
    let text = "id,name,website,createdDate,ownerId\n\
                client-9,\"Acme, Inc.\",https://acme.example,2024-05-01T09:00:00Z,user-2\n\
                client-10,Broken\n\
                ,Fresh Co,https://fresh.example,2024-06-01T09:00:00Z,\n\
                \n";
    let summary = store.import_csv(RecordKind::Clients, text)?;
    assert_eq!(summary.imported, 2);
    assert_eq!(summary.skipped_lines, vec![3]);
    assert_eq!(summary.assigned_ids, 1);

    let clients = store.list_clients()?;
    assert_eq!(clients.len(), 2);
    assert_eq!(clients[0].name, "Acme, Inc.");
    assert!(clients[1].id.as_str().starts_with("client-"));
    assert_eq!(clients[1].owner_id, None);
    Ok(())
}

#[test]
fn failed_import_leaves_collection_untouched() -> Result<()> {
    let store = demo_store()?;
    let text = "id,name,value,stage,projectId,expectedCloseDate,notes\n\
                deal-1,Retainer,lots,Proposal,project-5,2024-10-10,";
    let error = store
        .import_csv(RecordKind::Deals, text)
        .expect_err("text value should fail");
    let message = format!("{error:#}");
    assert!(message.contains("deals row 1"), "unexpected message: {message}");
    assert!(message.contains("field `value`"), "unexpected message: {message}");
    assert_eq!(store.list_deals()?.len(), 6);
    Ok(())
}

#[test]
fn blank_deal_value_imports_as_zero() -> Result<()> {
    let store = demo_store()?;
    let text = "id,name,value,stage,projectId,expectedCloseDate,notes\n\
                deal-1,Retainer,,Proposal,project-5,2024-10-10,";
    let summary = store.import_csv(RecordKind::Deals, text)?;
    assert_eq!(summary.imported, 1);
    let deals = store.list_deals()?;
    assert_eq!(deals.len(), 1);
    assert_eq!(deals[0].value, 0.0);
    Ok(())
}

#[test]
fn csv_import_needs_manage_permission() -> Result<()> {
    let store = demo_store()?;
    let mut viewer = store.add_role(&NewRole {
        name: "Viewer".to_owned(),
        granted: vec![Permission::ViewDeals],
    })?;
    let mut chen = store
        .list_users()?
        .into_iter()
        .find(|user| user.id.as_str() == "user-4")
        .expect("user-4 present");
    chen.role_id = viewer.id.clone();
    store.update_user(&chen)?;
    store.set_current_user(&chen.id)?;

    let exported = store.export_csv(RecordKind::Deals)?;
    let error = store
        .import_csv(RecordKind::Deals, &exported)
        .expect_err("viewer cannot import");
    assert!(error.to_string().contains("manageDeals"));

    viewer.permissions.insert(Permission::ManageDeals, true);
    store.set_current_user(&UserId::new("user-1"))?;
    store.update_role(&viewer)?;
    store.set_current_user(&chen.id)?;
    assert_eq!(store.import_csv(RecordKind::Deals, &exported)?.imported, 6);
    Ok(())
}

#[test]
fn json_backup_restores_every_collection() -> Result<()> {
    let store = demo_store()?;
    let backup = store.export_json()?;
    assert!(backup.contains("\n  \"clients\": ["));

    store.delete_client(&ClientId::new("client-1"))?;
    store.set_current_user(&UserId::new("user-2"))?;
    store.set_current_user(&UserId::new("user-1"))?;
    let restored = store.import_json(&backup)?;

    assert_eq!(restored.clients.len(), 4);
    assert_eq!(store.list_clients()?.len(), 4);
    assert_eq!(store.list_projects()?.len(), 5);
    assert_eq!(store.export_json()?, backup);
    Ok(())
}

#[test]
fn json_backup_missing_a_key_is_rejected() -> Result<()> {
    let store = demo_store()?;
    let mut backup: serde_json::Value = serde_json::from_str(&store.export_json()?)?;
    backup
        .as_object_mut()
        .expect("backup is an object")
        .remove("supportTickets");

    let error = store
        .import_json(&backup.to_string())
        .expect_err("incomplete backup should fail");
    assert!(error.to_string().contains("invalid data structure"));
    assert_eq!(store.list_support_tickets()?.len(), 3);
    Ok(())
}

#[test]
fn reset_restores_demo_data() -> Result<()> {
    let store = demo_store()?;
    store.delete_client(&ClientId::new("client-2"))?;
    store.reset_data()?;
    assert_eq!(store.list_clients()?.len(), 4);
    assert_eq!(store.list_deals()?.len(), 6);
    assert_eq!(store.current_user()?.id, UserId::new("user-1"));

    store.set_current_user(&UserId::new("user-2"))?;
    assert!(store.reset_data().is_err());
    Ok(())
}
