//! Record store behaviour against a real SQLite file.

mod support;

use std::sync::Arc;

use bytes::Bytes;
use leadflow_core::{
    CallTaskAdvance, CompanyNameUpdate, DeliveryHeaders, InboundDelivery, IngestError,
    IngestionPipeline, OpenTaskInsert, TaskStateMachine,
};
use leadflow_domain::constants::UNREACHABLE_TAG_NAME;
use leadflow_domain::{
    Communication, CommunicationType, Company, Direction, IngestionConfig, Lead, LeadFilter,
    LeadStatus, LeadType, LeadflowError, PageRequest, Task, TaskKind, TaskStatus,
};
use leadflow_infra::notifications::NotificationQueue;
use serde_json::json;
use support::TestDatabase;
use uuid::Uuid;

#[tokio::test]
async fn account_settings_round_trip() {
    let db = TestDatabase::new();
    let mut account = leadflow_domain::Account::new("Muster GmbH");
    account.owner_email = Some("owner@muster.test".into());
    account.email_settings.auto_reply_enabled = true;
    account.email_settings.auto_reply_subject = Some("Danke, {{firstName}}".into());
    db.store.accounts.insert_account(&account).await.unwrap();

    let stored = db.store.accounts.find_account(account.id).await.unwrap().unwrap();
    assert_eq!(stored.name, "Muster GmbH");
    assert_eq!(stored.owner_email.as_deref(), Some("owner@muster.test"));
    assert!(stored.email_settings.auto_reply_enabled);
    assert_eq!(stored.email_settings.auto_reply_subject.as_deref(), Some("Danke, {{firstName}}"));

    assert!(db.store.accounts.find_account(Uuid::now_v7()).await.unwrap().is_none());
}

#[tokio::test]
async fn lead_lookups_match_email_case_insensitively_and_prefer_oldest() {
    let db = TestDatabase::new();
    let account = db.seed_account("Muster GmbH").await;
    let other = db.seed_account("Andere AG").await;

    let first = db
        .seed_lead(&account, "Max Mustermann", |l| l.email = Some("Max@Example.test".into()))
        .await;
    db.seed_lead(&account, "Max Zwei", |l| l.email = Some("max@example.test".into())).await;
    db.seed_lead(&other, "Fremd", |l| l.phone = Some("0171 555".into())).await;

    let found = db.store.leads.find_lead_by_email(account.id, "MAX@example.TEST").await.unwrap();
    assert_eq!(found.map(|l| l.id), Some(first.id));

    assert!(db.store.leads.find_lead_by_phone(account.id, "0171 555").await.unwrap().is_none());
    assert!(db.store.leads.find_lead_by_phone(other.id, "0171 555").await.unwrap().is_some());
    assert!(db.store.leads.find_lead(other.id, first.id).await.unwrap().is_none());
}

#[tokio::test]
async fn status_update_is_scoped_to_the_account() {
    let db = TestDatabase::new();
    let account = db.seed_account("Muster GmbH").await;
    let other = db.seed_account("Andere AG").await;
    let lead = db.seed_lead(&account, "Max Mustermann", |_| {}).await;

    let err = db
        .store
        .leads
        .update_lead_status(other.id, lead.id, LeadStatus::Contacted)
        .await
        .unwrap_err();
    assert!(matches!(err, LeadflowError::NotFound(_)));

    db.store.leads.update_lead_status(account.id, lead.id, LeadStatus::Contacted).await.unwrap();
    let stored = db.store.leads.find_lead(account.id, lead.id).await.unwrap().unwrap();
    assert_eq!(stored.status, LeadStatus::Contacted);
}

#[tokio::test]
async fn list_filters_and_pages_newest_first() {
    let db = TestDatabase::new();
    let account = db.seed_account("Muster GmbH").await;

    for i in 0..5 {
        db.seed_lead(&account, &format!("Kontakt {i}"), |l| l.source = "Website".into()).await;
    }
    db.seed_lead(&account, "Erika 100%", |l| {
        l.source = "Messe".into();
        l.email = Some("erika@messe.test".into());
    })
    .await;
    db.seed_lead(&account, "Firma", |l| {
        l.lead_type = LeadType::Company;
        l.status = LeadStatus::Qualified;
    })
    .await;

    let all = db
        .store
        .leads
        .list_leads(account.id, &LeadFilter::default(), PageRequest { page: 1, per_page: 3 })
        .await
        .unwrap();
    assert_eq!(all.total, 7);
    assert_eq!(all.items.len(), 3);
    assert_eq!(all.items[0].name, "Firma");

    let last_page = db
        .store
        .leads
        .list_leads(account.id, &LeadFilter::default(), PageRequest { page: 3, per_page: 3 })
        .await
        .unwrap();
    assert_eq!(last_page.items.len(), 1);
    assert_eq!(last_page.items[0].name, "Kontakt 0");

    let by_source = LeadFilter { source: Some("Messe".into()), ..LeadFilter::default() };
    let page = db.store.leads.list_leads(account.id, &by_source, PageRequest::default()).await.unwrap();
    assert_eq!(page.total, 1);

    let by_type = LeadFilter {
        lead_type: Some(LeadType::Company),
        status: Some(LeadStatus::Qualified),
        ..LeadFilter::default()
    };
    let page = db.store.leads.list_leads(account.id, &by_type, PageRequest::default()).await.unwrap();
    assert_eq!(page.items.iter().map(|l| l.name.as_str()).collect::<Vec<_>>(), ["Firma"]);

    // Wildcards in the search term are matched literally.
    let search = LeadFilter { search: Some("100%".into()), ..LeadFilter::default() };
    let page = db.store.leads.list_leads(account.id, &search, PageRequest::default()).await.unwrap();
    assert_eq!(page.total, 1);

    let search = LeadFilter { search: Some("MESSE.test".into()), ..LeadFilter::default() };
    let page = db.store.leads.list_leads(account.id, &search, PageRequest::default()).await.unwrap();
    assert_eq!(page.items[0].name, "Erika 100%");
}

#[tokio::test]
async fn company_upsert_keeps_id_and_stored_fields() {
    let db = TestDatabase::new();
    let account = db.seed_account("Muster GmbH").await;

    let mut original = Company::new(account.id, "place-1", "Bäckerei Schmidt");
    original.phone = Some("030 1234".into());
    original.website = Some("https://baeckerei.test".into());
    original.refresh_completeness();
    let stored =
        db.store.companies.upsert_company(&original, CompanyNameUpdate::Replace).await.unwrap();
    assert_eq!(stored.id, original.id);

    let mut update = Company::new(account.id, "place-1", "Bäckerei Schmidt & Sohn");
    update.email = Some("info@baeckerei.test".into());
    update.refresh_completeness();
    let merged =
        db.store.companies.upsert_company(&update, CompanyNameUpdate::Replace).await.unwrap();

    assert_eq!(merged.id, original.id);
    assert_eq!(merged.name, "Bäckerei Schmidt & Sohn");
    assert_eq!(merged.phone.as_deref(), Some("030 1234"));
    assert_eq!(merged.email.as_deref(), Some("info@baeckerei.test"));
    assert!(merged.has_website && merged.has_phone && merged.has_email);

    let by_place =
        db.store.companies.find_company_by_place_id(account.id, "place-1").await.unwrap().unwrap();
    assert_eq!(by_place, merged);
}

#[tokio::test]
async fn company_upsert_can_keep_the_stored_name() {
    let db = TestDatabase::new();
    let account = db.seed_account("Muster GmbH").await;

    let original = Company::new(account.id, "place-1", "Bäckerei Schmidt");
    db.store.companies.upsert_company(&original, CompanyNameUpdate::Replace).await.unwrap();

    let mut stand_in = Company::new(account.id, "place-1", "Erika Musterfrau");
    stand_in.phone = Some("030 9876".into());
    stand_in.refresh_completeness();
    let merged =
        db.store.companies.upsert_company(&stand_in, CompanyNameUpdate::KeepStored).await.unwrap();

    assert_eq!(merged.id, original.id);
    assert_eq!(merged.name, "Bäckerei Schmidt");
    assert_eq!(merged.phone.as_deref(), Some("030 9876"));

    let fresh = Company::new(account.id, "place-2", "Erika Musterfrau");
    let inserted =
        db.store.companies.upsert_company(&fresh, CompanyNameUpdate::KeepStored).await.unwrap();
    assert_eq!(inserted.name, "Erika Musterfrau");
}

#[tokio::test]
async fn import_transaction_rolls_back_on_known_place() {
    let db = TestDatabase::new();
    let account = db.seed_account("Muster GmbH").await;

    let company = Company::new(account.id, "place-42", "Café Kranz");
    let mut lead = Lead::new(account.id, "Café Kranz", LeadType::Company, "Google Places");
    lead.company_id = Some(company.id);
    let note = Communication::new(
        account.id,
        lead.id,
        CommunicationType::Note,
        Direction::Inbound,
        "Unternehmen: Café Kranz",
    );
    db.store.leads.create_with_company(&company, &lead, &[note]).await.unwrap();
    assert_eq!(db.store.communications.communications_for_lead(lead.id).await.unwrap().len(), 1);

    let again = Company::new(account.id, "place-42", "Café Kranz");
    let mut second = Lead::new(account.id, "Café Kranz", LeadType::Company, "Google Places");
    second.company_id = Some(again.id);
    let err = db.store.leads.create_with_company(&again, &second, &[]).await.unwrap_err();

    assert!(err.is_conflict_on("external_place_id"), "unexpected error: {err}");
    assert!(db.store.leads.find_lead(account.id, second.id).await.unwrap().is_none());
}

#[tokio::test]
async fn one_open_task_per_kind_is_enforced_by_the_store() {
    let db = TestDatabase::new();
    let account = db.seed_account("Muster GmbH").await;
    let lead = db.seed_lead(&account, "Max Mustermann", |_| {}).await;

    let first = Task::contact(account.id, lead.id, &lead.name);
    let created = db.store.tasks.insert_open_task(&first).await.unwrap();
    assert_eq!(created, OpenTaskInsert::Created(first.clone()));

    let racing = Task::contact(account.id, lead.id, &lead.name);
    match db.store.tasks.insert_open_task(&racing).await.unwrap() {
        OpenTaskInsert::AlreadyOpen(task) => assert_eq!(task.id, first.id),
        other => panic!("expected AlreadyOpen, got {other:?}"),
    }

    // General tasks are not limited.
    for title in ["Angebot schicken", "Rückfrage klären"] {
        let general = Task::general(account.id, lead.id, title);
        assert!(matches!(
            db.store.tasks.insert_open_task(&general).await.unwrap(),
            OpenTaskInsert::Created(_)
        ));
    }

    assert!(db.store.tasks.complete_task(first.id).await.unwrap());
    assert!(!db.store.tasks.complete_task(first.id).await.unwrap());
    assert_eq!(db.store.tasks.count_tasks(lead.id, TaskKind::Contact).await.unwrap(), 1);

    let next = Task::contact(account.id, lead.id, &lead.name);
    assert!(matches!(
        db.store.tasks.insert_open_task(&next).await.unwrap(),
        OpenTaskInsert::Created(_)
    ));

    assert_eq!(db.store.tasks.complete_open_tasks(lead.id, Some(TaskKind::General)).await.unwrap(), 2);
    assert_eq!(db.store.tasks.complete_open_tasks(lead.id, None).await.unwrap(), 1);
    let tasks = db.store.tasks.tasks_for_lead(lead.id).await.unwrap();
    assert_eq!(tasks.len(), 4);
    assert!(tasks.iter().all(|t| t.status == TaskStatus::Completed && t.completed_at.is_some()));
}

#[tokio::test]
async fn legacy_rows_without_kind_are_classified_by_title() {
    let db = TestDatabase::new();
    let account = db.seed_account("Muster GmbH").await;
    let lead = db.seed_lead(&account, "Max Mustermann", |_| {}).await;

    db.execute_batch(&format!(
        "INSERT INTO tasks (id, account_id, lead_id, kind, title, status, created_at) VALUES
            ('{}', '{}', '{}', NULL, 'Lead anrufen', 'PENDING', 1),
            ('{}', '{}', '{}', NULL, 'Max kontaktieren', 'COMPLETED', 2),
            ('{}', '{}', '{}', NULL, 'Unterlagen prüfen', 'PENDING', 3);",
        Uuid::now_v7(),
        account.id,
        lead.id,
        Uuid::now_v7(),
        account.id,
        lead.id,
        Uuid::now_v7(),
        account.id,
        lead.id,
    ));

    assert_eq!(db.store.tasks.count_tasks(lead.id, TaskKind::Call).await.unwrap(), 1);
    assert_eq!(db.store.tasks.count_tasks(lead.id, TaskKind::Contact).await.unwrap(), 1);
    let open_call = db.store.tasks.find_open_task(lead.id, TaskKind::Call).await.unwrap().unwrap();
    assert_eq!(open_call.kind, TaskKind::Call);
    assert!(db.store.tasks.find_open_task(lead.id, TaskKind::Contact).await.unwrap().is_none());

    let kinds: Vec<_> =
        db.store.tasks.tasks_for_lead(lead.id).await.unwrap().into_iter().map(|t| t.kind).collect();
    assert_eq!(kinds, [TaskKind::General, TaskKind::Contact, TaskKind::Call]);

    assert_eq!(db.store.tasks.delete_tasks(lead.id, TaskKind::Call).await.unwrap(), 1);
    assert_eq!(db.store.tasks.count_tasks(lead.id, TaskKind::Call).await.unwrap(), 0);
}

#[tokio::test]
async fn tags_upsert_attach_and_detach() {
    let db = TestDatabase::new();
    let account = db.seed_account("Muster GmbH").await;
    let lead = db.seed_lead(&account, "Max Mustermann", |_| {}).await;

    let tag = db.store.tags.upsert_tag(account.id, "Messe 2026", "#10B981").await.unwrap();
    let same = db.store.tags.upsert_tag(account.id, "Messe 2026", "#000000").await.unwrap();
    assert_eq!(same.id, tag.id);
    assert_eq!(same.color, "#10B981");

    assert!(db.store.tags.attach_tag(lead.id, tag.id).await.unwrap());
    assert!(!db.store.tags.attach_tag(lead.id, tag.id).await.unwrap());
    assert_eq!(db.store.tags.tags_for_lead(lead.id).await.unwrap(), vec![tag]);

    assert!(db.store.tags.detach_tag_by_name(account.id, lead.id, "Messe 2026").await.unwrap());
    assert!(!db.store.tags.detach_tag_by_name(account.id, lead.id, "Messe 2026").await.unwrap());
    assert!(db.store.tags.tags_for_lead(lead.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn webhook_log_lifecycle() {
    let db = TestDatabase::new();
    let account = db.seed_account("Muster GmbH").await;
    let webhook = db.seed_webhook(&account).await;

    let found = db.store.webhooks.find_webhook(&webhook.webhook_id).await.unwrap().unwrap();
    assert_eq!(found.id, webhook.id);
    assert_eq!(found.account_id, account.id);
    assert_eq!(found.settings, webhook.settings);
    assert!(found.is_active);
    assert_eq!(found.created_at.timestamp_millis(), webhook.created_at.timestamp_millis());
    assert!(db.store.webhooks.find_webhook("unknown").await.unwrap().is_none());

    let first = leadflow_domain::WebhookLog::processing(&webhook, json!({ "email": "a@b.test" }));
    let second = leadflow_domain::WebhookLog::processing(&webhook, json!({ "email": "c@d.test" }));
    db.store.webhooks.insert_log(&first).await.unwrap();
    db.store.webhooks.insert_log(&second).await.unwrap();

    let stored = db.store.webhooks.find_log(first.id).await.unwrap().unwrap();
    assert!(!stored.is_terminal());

    db.store.webhooks.finish_log(first.id, false, Some("Duplicate lead: x"), None).await.unwrap();
    let finished = db.store.webhooks.find_log(first.id).await.unwrap().unwrap();
    assert!(finished.is_terminal());
    assert_eq!(finished.error.as_deref(), Some("Duplicate lead: x"));
    assert_eq!(finished.payload, json!({ "email": "a@b.test" }));

    let logs = db.store.webhooks.logs_for_webhook(webhook.id, 10).await.unwrap();
    assert_eq!(logs.iter().map(|l| l.id).collect::<Vec<_>>(), [second.id, first.id]);
    assert_eq!(db.store.webhooks.logs_for_webhook(webhook.id, 1).await.unwrap().len(), 1);

    let err = db.store.webhooks.finish_log(Uuid::now_v7(), true, None, None).await.unwrap_err();
    assert!(matches!(err, LeadflowError::NotFound(_)));
}

#[tokio::test]
async fn three_failed_calls_tag_the_lead_over_sqlite() {
    let db = TestDatabase::new();
    let account = db.seed_account("Muster GmbH").await;
    let lead = db.seed_lead(&account, "Max Mustermann", |_| {}).await;
    let machine = TaskStateMachine::new(Arc::clone(&db.store.tasks), Arc::clone(&db.store.tags));

    assert!(machine.on_lead_created(&lead).await.unwrap().is_some());

    let first = machine.on_call_attempt_failed(&lead).await.unwrap();
    let second = machine.on_call_attempt_failed(&lead).await.unwrap();
    let third = machine.on_call_attempt_failed(&lead).await.unwrap();
    assert_eq!(
        [first.attempt_count, second.attempt_count, third.attempt_count],
        [1, 2, 3]
    );
    assert!(third.is_final_attempt && third.task.is_none());

    let tags = db.store.tags.tags_for_lead(lead.id).await.unwrap();
    assert_eq!(tags.iter().map(|t| t.name.as_str()).collect::<Vec<_>>(), [UNREACHABLE_TAG_NAME]);
    let tasks = db.store.tasks.tasks_for_lead(lead.id).await.unwrap();
    assert!(tasks.iter().all(|t| !t.is_open()));

    let reset = machine.on_call_succeeded(&lead).await.unwrap();
    assert_eq!(reset.deleted_call_tasks, 2);
    assert!(reset.tag_removed);
    assert_eq!(machine.on_call_attempt_failed(&lead).await.unwrap().attempt_count, 1);
}

#[tokio::test]
async fn advancing_the_call_task_requires_an_unchanged_count() {
    let db = TestDatabase::new();
    let account = db.seed_account("Muster GmbH").await;
    let lead = db.seed_lead(&account, "Max Mustermann", |_| {}).await;

    let first = Task::call(account.id, lead.id, 1);
    assert_eq!(
        db.store.tasks.advance_call_task(&first, 0).await.unwrap(),
        CallTaskAdvance::Opened(first.clone())
    );

    let stale = Task::call(account.id, lead.id, 1);
    assert_eq!(db.store.tasks.advance_call_task(&stale, 0).await.unwrap(), CallTaskAdvance::Stale(1));

    let second = Task::call(account.id, lead.id, 2);
    assert!(matches!(
        db.store.tasks.advance_call_task(&second, 1).await.unwrap(),
        CallTaskAdvance::Opened(_)
    ));

    let calls: Vec<Task> = db
        .store
        .tasks
        .tasks_for_lead(lead.id)
        .await
        .unwrap()
        .into_iter()
        .filter(|t| t.kind == TaskKind::Call)
        .collect();
    assert_eq!(calls.len(), 2);
    let open: Vec<_> = calls.iter().filter(|t| t.is_open()).collect();
    assert_eq!(open.len(), 1);
    assert_eq!(open[0].id, second.id);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_failed_calls_are_each_counted_once() {
    let db = TestDatabase::new();
    let account = db.seed_account("Muster GmbH").await;
    let lead = db.seed_lead(&account, "Max Mustermann", |_| {}).await;
    let machine = TaskStateMachine::new(Arc::clone(&db.store.tasks), Arc::clone(&db.store.tags));

    assert_eq!(machine.on_call_attempt_failed(&lead).await.unwrap().attempt_count, 1);

    let handles: Vec<_> = (0..2)
        .map(|_| {
            let machine = machine.clone();
            let lead = lead.clone();
            tokio::spawn(async move { machine.on_call_attempt_failed(&lead).await })
        })
        .collect();
    let mut outcomes = Vec::new();
    for handle in handles {
        outcomes.push(handle.await.unwrap().unwrap());
    }
    outcomes.sort_by_key(|o| o.attempt_count);

    assert_eq!(outcomes.iter().map(|o| o.attempt_count).collect::<Vec<_>>(), [2, 3]);
    assert!(!outcomes[0].is_final_attempt);
    assert!(outcomes[1].is_final_attempt);

    assert_eq!(db.store.tasks.count_tasks(lead.id, TaskKind::Call).await.unwrap(), 2);
    assert!(db.store.tasks.find_open_task(lead.id, TaskKind::Call).await.unwrap().is_none());
    let tags = db.store.tags.tags_for_lead(lead.id).await.unwrap();
    assert_eq!(tags.iter().map(|t| t.name.as_str()).collect::<Vec<_>>(), [UNREACHABLE_TAG_NAME]);
}

#[tokio::test]
async fn webhook_delivery_persists_lead_and_rejects_the_duplicate() {
    let db = TestDatabase::new();
    let account = db.seed_account("Muster GmbH").await;
    let webhook = db.seed_webhook(&account).await;
    let (queue, mut jobs) = NotificationQueue::bounded(8);
    let pipeline =
        IngestionPipeline::new(db.store.clone(), Arc::new(queue), &IngestionConfig::default());

    let delivery = || InboundDelivery {
        webhook_id: webhook.webhook_id.clone(),
        body: Bytes::from(
            json!({ "vorname": "Erika", "nachname": "Musterfrau", "email": "erika@example.test" })
                .to_string(),
        ),
        content_type: Some("application/json".into()),
        headers: DeliveryHeaders::default(),
    };

    let receipt = pipeline.ingest(delivery()).await.unwrap();
    assert_eq!(receipt.lead.name, "Erika Musterfrau");
    assert_eq!(receipt.lead.company_id, Some(receipt.company.id));
    assert!(receipt.contact_task_id.is_some());
    assert_eq!(jobs.try_recv().unwrap().lead_id, receipt.lead.id);

    let log = db.store.webhooks.find_log(receipt.log_id).await.unwrap().unwrap();
    assert!(log.success);
    assert_eq!(log.lead_id, Some(receipt.lead.id));

    match pipeline.ingest(delivery()).await {
        Err(IngestError::DuplicateLead { existing }) => assert_eq!(existing.id, receipt.lead.id),
        other => panic!("expected duplicate, got {other:?}"),
    }
    let logs = db.store.webhooks.logs_for_webhook(webhook.id, 10).await.unwrap();
    assert_eq!(logs.len(), 2);
    assert_eq!(logs[0].error, Some(format!("Duplicate lead: {}", receipt.lead.id)));
    assert!(jobs.try_recv().is_err());
}
