// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crm_app::{
    Activity, ActivityId, ActivityKind, Client, ClientId, ContactPerson, ContactPersonId, CrmData,
    Deal, DealId, DealStage, Project, ProjectId, RoleId, SupportTicket, SupportTicketId, Task,
    TaskId, TaskPriority, TaskStatus, TicketStatus, User, UserId, default_roles,
};
use time::macros::{date, datetime};
use time::{Date, OffsetDateTime};

/// The four seeded accounts. The first is the session user on a fresh store.
pub fn default_users() -> Vec<User> {
    [
        ("user-1", "Alex Johnson", "alex@crm.ai", "role-admin"),
        ("user-2", "Maria Garcia", "maria@crm.ai", "role-manager"),
        ("user-3", "Sam Wilson", "sam@crm.ai", "role-rep"),
        ("user-4", "Chen Lee", "chen@crm.ai", "role-rep"),
    ]
    .into_iter()
    .map(|(id, name, email, role)| User {
        id: UserId::new(id),
        name: name.to_owned(),
        email: email.to_owned(),
        avatar: format!("https://i.pravatar.cc/150?u={id}"),
        role_id: RoleId::new(role),
    })
    .collect()
}

/// Demo data set. A few rows are dated relative to `now` so the dashboard
/// always has something due today.
pub fn demo_data(now: OffsetDateTime) -> CrmData {
    let users = default_users();
    let current_user = users[0].clone();
    CrmData {
        clients: demo_clients(),
        contact_persons: demo_contact_persons(),
        projects: demo_projects(),
        deals: demo_deals(),
        tasks: demo_tasks(now.date()),
        activities: demo_activities(),
        support_tickets: demo_support_tickets(now),
        roles: default_roles(),
        users,
        current_user,
    }
}

fn demo_clients() -> Vec<Client> {
    let client = |id: &str, name: &str, website: &str, created, owner: &str| Client {
        id: ClientId::new(id),
        name: name.to_owned(),
        website: website.to_owned(),
        created_date: created,
        owner_id: Some(UserId::new(owner)),
    };
    vec![
        client(
            "client-1",
            "Big Tech Inc.",
            "https://bigtech.com",
            datetime!(2023-10-01 10:00:00 UTC),
            "user-3",
        ),
        client(
            "client-2",
            "Startup Co.",
            "https://startup.co",
            datetime!(2023-10-15 14:30:00 UTC),
            "user-3",
        ),
        client(
            "client-3",
            "Innovate LLC",
            "https://innovate.io",
            datetime!(2024-01-20 09:00:00 UTC),
            "user-4",
        ),
        client(
            "client-4",
            "Global Solutions",
            "https://globalsolutions.com",
            datetime!(2024-03-10 11:00:00 UTC),
            "user-2",
        ),
    ]
}

fn demo_contact_persons() -> Vec<ContactPerson> {
    [
        ("person-1", "John Doe", "john.d@bigtech.com", "123-456-7890", "CEO", "client-1"),
        ("person-2", "Jane Smith", "jane.s@startup.co", "098-765-4321", "Founder", "client-2"),
        ("person-3", "Peter Jones", "peter.j@bigtech.com", "111-222-3333", "CTO", "client-1"),
        (
            "person-4",
            "David Chen",
            "david.c@innovate.io",
            "444-555-6666",
            "Lead Engineer",
            "client-3",
        ),
        (
            "person-5",
            "Sophia Loren",
            "sophia.l@globalsolutions.com",
            "777-888-9999",
            "Marketing Head",
            "client-4",
        ),
    ]
    .into_iter()
    .map(|(id, name, email, phone, designation, client)| ContactPerson {
        id: ContactPersonId::new(id),
        name: name.to_owned(),
        email: email.to_owned(),
        phone: phone.to_owned(),
        designation: designation.to_owned(),
        client_id: ClientId::new(client),
    })
    .collect()
}

fn demo_projects() -> Vec<Project> {
    let project = |id: &str,
                   name: &str,
                   client: &str,
                   segment: &str,
                   sector: &str,
                   members: &[&str],
                   team: &[&str],
                   created| Project {
        id: ProjectId::new(id),
        name: name.to_owned(),
        client_id: ClientId::new(client),
        real_estate_segment: segment.to_owned(),
        sector: sector.to_owned(),
        member_ids: members.iter().copied().map(ContactPersonId::new).collect(),
        team_member_ids: team.iter().copied().map(UserId::new).collect(),
        created_date: created,
    };
    vec![
        project(
            "project-1",
            "Project Phoenix",
            "client-1",
            "Commercial",
            "Cloud Services",
            &["person-1", "person-3"],
            &["user-1", "user-3"],
            datetime!(2024-07-15 10:00:00 UTC),
        ),
        project(
            "project-2",
            "Website Redesign",
            "client-2",
            "N/A",
            "Web Development",
            &["person-2"],
            &["user-2"],
            datetime!(2024-07-20 11:30:00 UTC),
        ),
        project(
            "project-3",
            "Cloud Migration",
            "client-1",
            "Commercial",
            "Data Infrastructure",
            &["person-3"],
            &["user-1"],
            datetime!(2024-06-10 09:00:00 UTC),
        ),
        project(
            "project-4",
            "AI Integration",
            "client-3",
            "Industrial",
            "Machine Learning",
            &["person-4"],
            &["user-4"],
            datetime!(2024-02-01 10:00:00 UTC),
        ),
        project(
            "project-5",
            "Global Branding Campaign",
            "client-4",
            "Retail",
            "Marketing",
            &["person-5"],
            &["user-2", "user-3"],
            datetime!(2024-04-01 14:00:00 UTC),
        ),
    ]
}

fn demo_deals() -> Vec<Deal> {
    let deal = |id: &str, name: &str, value, stage, project: &str, close, notes: Option<&str>| {
        Deal {
            id: DealId::new(id),
            name: name.to_owned(),
            value,
            stage,
            project_id: ProjectId::new(project),
            expected_close_date: close,
            notes: notes.map(str::to_owned),
        }
    };
    vec![
        deal(
            "deal-1",
            "Phoenix Phase 1",
            50_000.0,
            DealStage::Proposal,
            "project-1",
            date!(2024 - 08 - 30),
            Some("Initial proposal sent. Awaiting feedback."),
        ),
        deal(
            "deal-2",
            "New Landing Page",
            15_000.0,
            DealStage::Qualification,
            "project-2",
            date!(2024 - 09 - 15),
            None,
        ),
        deal(
            "deal-3",
            "Data Center Move",
            75_000.0,
            DealStage::ClosedWon,
            "project-3",
            date!(2024 - 06 - 20),
            None,
        ),
        deal(
            "deal-4",
            "AI Model License",
            120_000.0,
            DealStage::Negotiation,
            "project-4",
            date!(2024 - 09 - 25),
            None,
        ),
        deal(
            "deal-5",
            "Marketing Retainer",
            80_000.0,
            DealStage::Prospecting,
            "project-5",
            date!(2024 - 10 - 10),
            None,
        ),
        deal(
            "deal-6",
            "Phase 2 Website Dev",
            25_000.0,
            DealStage::NeedsAnalysis,
            "project-2",
            date!(2024 - 11 - 01),
            None,
        ),
    ]
}

fn demo_tasks(today: Date) -> Vec<Task> {
    let task = |id: &str, title: &str, due, priority, status, project: &str, deal: Option<&str>| {
        Task {
            id: TaskId::new(id),
            title: title.to_owned(),
            description: None,
            due_date: due,
            priority,
            status,
            project_id: Some(ProjectId::new(project)),
            deal_id: deal.map(DealId::new),
        }
    };
    vec![
        task(
            "task-1",
            "Follow up with Big Tech CTO",
            today,
            TaskPriority::High,
            TaskStatus::Todo,
            "project-1",
            None,
        ),
        task(
            "task-2",
            "Prepare presentation for Startup Co.",
            date!(2024 - 08 - 10),
            TaskPriority::Medium,
            TaskStatus::InProgress,
            "project-2",
            Some("deal-2"),
        ),
        task(
            "task-3",
            "Schedule demo with Innovate LLC",
            date!(2024 - 08 - 15),
            TaskPriority::High,
            TaskStatus::Todo,
            "project-4",
            Some("deal-4"),
        ),
        task(
            "task-4",
            "Finalize branding proposal",
            date!(2024 - 08 - 20),
            TaskPriority::Medium,
            TaskStatus::InProgress,
            "project-5",
            None,
        ),
        task(
            "task-5",
            "Review contract for Data Center Move",
            date!(2024 - 08 - 05),
            TaskPriority::Low,
            TaskStatus::Completed,
            "project-3",
            Some("deal-3"),
        ),
    ]
}

fn demo_activities() -> Vec<Activity> {
    let activity = |id: &str, kind, description: &str, date, project: &str, user: &str| Activity {
        id: ActivityId::new(id),
        kind,
        description: description.to_owned(),
        date,
        project_id: ProjectId::new(project),
        user_id: UserId::new(user),
    };
    vec![
        activity(
            "activity-1",
            ActivityKind::Note,
            "Had a great introductory call, they are very interested in Project Phoenix.",
            datetime!(2023-10-02 11:00:00 UTC),
            "project-1",
            "user-1",
        ),
        activity(
            "activity-2",
            ActivityKind::Email,
            "Sent follow-up email with pricing details.",
            datetime!(2023-10-16 09:00:00 UTC),
            "project-2",
            "user-1",
        ),
        activity(
            "activity-3",
            ActivityKind::Call,
            "Discussed technical requirements for AI integration with David Chen.",
            datetime!(2024-02-05 15:00:00 UTC),
            "project-4",
            "user-4",
        ),
        activity(
            "activity-4",
            ActivityKind::Meeting,
            "Kick-off meeting for the global branding campaign.",
            datetime!(2024-04-02 10:30:00 UTC),
            "project-5",
            "user-2",
        ),
    ]
}

fn demo_support_tickets(now: OffsetDateTime) -> Vec<SupportTicket> {
    let ticket = |id: &str, subject: &str, description: &str, project: &str, status, created, user: &str| {
        SupportTicket {
            id: SupportTicketId::new(id),
            subject: subject.to_owned(),
            description: description.to_owned(),
            project_id: ProjectId::new(project),
            status,
            created_date: created,
            user_id: UserId::new(user),
        }
    };
    vec![
        ticket(
            "ticket-1",
            "Login Issue for Project Phoenix",
            "User cannot log into the new dashboard.",
            "project-1",
            TicketStatus::Open,
            now,
            "user-1",
        ),
        ticket(
            "ticket-2",
            "Billing question for website",
            "Question about the last invoice.",
            "project-2",
            TicketStatus::Resolved,
            datetime!(2024-07-10 10:00:00 UTC),
            "user-2",
        ),
        ticket(
            "ticket-3",
            "API access for AI model",
            "Need credentials for accessing the sandbox API.",
            "project-4",
            TicketStatus::Open,
            now,
            "user-4",
        ),
    ]
}
