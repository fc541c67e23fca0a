use chrono::{Duration, TimeZone, Utc};
use kvmodel::store::{DeleteItemRequest, PutItemRequest, UpdateItemRequest};
use kvmodel::{
    Condition, DeleteOutcome, EntityDescriptor, HookSignal, Item, ItemKey, KeySchema,
    LifecycleEvent, MemoryStore, Model, ModelError, StoreError, StoreRequest, TimestampConfig,
    Timestamps, Value,
};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

fn item(pairs: &[(&str, Value)]) -> Item {
    pairs
        .iter()
        .map(|(name, value)| (name.to_string(), value.clone()))
        .collect()
}

async fn store_with(table: &str, schema: KeySchema) -> MemoryStore {
    let store = MemoryStore::new();
    store.create_table(table, schema).await;
    store
}

fn users() -> Model {
    Model::new(EntityDescriptor::new("users", "id").unwrap()).unwrap()
}

#[tokio::test]
async fn insert_update_delete_scenario() {
    let store = store_with("users", KeySchema::new("id")).await;
    let mut user = users().new_entity([("id", "a1"), ("name", "x")]);
    assert!(!user.exists());

    assert!(user.save(&store).await.unwrap());
    assert!(user.exists());
    assert!(user.was_recently_created());
    assert!(user.dirty_names().is_empty());

    let requests = store.requests().await;
    assert_eq!(
        requests,
        vec![StoreRequest::Put(PutItemRequest {
            table_name: "users".into(),
            item: item(&[("id", "a1".into()), ("name", "x".into())]),
            conditions: vec![Condition::not_exists("id")],
        })]
    );

    user.set("name", "y");
    assert_eq!(
        user.dirty_names().into_iter().collect::<Vec<_>>(),
        vec!["name".to_string()]
    );

    store.clear_requests().await;
    assert!(user.save(&store).await.unwrap());
    assert!(user.dirty_names().is_empty());
    assert_eq!(
        store.requests().await,
        vec![StoreRequest::Update(UpdateItemRequest {
            table_name: "users".into(),
            key: item(&[("id", "a1".into())]),
            attributes: item(&[("name", "y".into())]),
            conditions: Vec::new(),
        })]
    );

    store.clear_requests().await;
    assert_eq!(user.delete(&store).await.unwrap(), DeleteOutcome::Deleted);
    assert!(!user.exists());
    assert_eq!(
        store.requests().await,
        vec![StoreRequest::Delete(DeleteItemRequest {
            table_name: "users".into(),
            key: item(&[("id", "a1".into())]),
            conditions: Vec::new(),
        })]
    );
    assert_eq!(store.item_count("users").await, 0);
}

#[tokio::test]
async fn insert_collision_reports_item_already_exists() {
    let store = store_with("users", KeySchema::new("id")).await;
    users()
        .create(&store, [("id", "a1"), ("name", "first")])
        .await
        .unwrap();

    let mut duplicate = users().new_entity([("id", "a1"), ("name", "second")]);
    let err = duplicate.save(&store).await.unwrap_err();

    assert!(err.is_item_already_exists());
    assert!(!duplicate.exists());
    assert!(!duplicate.was_recently_created());
    assert!(duplicate.dirty_names().contains("name"));

    let stored = users()
        .find(&store, item(&[("id", "a1".into())]))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.get("name"), Some(&Value::from("first")));
}

#[tokio::test]
async fn transport_failure_is_not_a_collision() {
    let store = store_with("users", KeySchema::new("id")).await;
    store
        .fail_next(StoreError::Throttled("slow down".into()))
        .await;

    let mut user = users().new_entity([("id", "a1")]);
    let err = user.save(&store).await.unwrap_err();

    assert!(matches!(err, ModelError::Store(StoreError::Throttled(_))));
    assert!(!err.is_item_already_exists());
    assert!(!user.exists());
}

#[tokio::test]
async fn composite_key_guards_both_attributes() {
    let store = store_with("events", KeySchema::new("stream").with_sort_key("seq")).await;
    let events = Model::new(
        EntityDescriptor::new("events", "stream")
            .unwrap()
            .with_sort_key("seq")
            .unwrap(),
    )
    .unwrap();

    let mut first = events.new_entity([("stream", Value::from("s1")), ("seq", Value::from(1))]);
    assert!(first.save(&store).await.unwrap());

    let mut second = events.new_entity([("stream", Value::from("s1")), ("seq", Value::from(2))]);
    assert!(second.save(&store).await.unwrap());
    assert_eq!(store.item_count("events").await, 2);

    match &store.requests().await[0] {
        StoreRequest::Put(put) => assert_eq!(
            put.conditions,
            vec![Condition::not_exists("seq"), Condition::not_exists("stream")]
        ),
        other => panic!("unexpected request: {:?}", other),
    }
}

#[tokio::test]
async fn composite_key_collision_needs_both_parts_equal() {
    let store = store_with("events", KeySchema::new("stream").with_sort_key("seq")).await;
    let events = Model::new(
        EntityDescriptor::new("events", "stream")
            .unwrap()
            .with_sort_key("seq")
            .unwrap(),
    )
    .unwrap();

    events
        .create(
            &store,
            [
                ("stream", Value::from("s1")),
                ("seq", Value::from(1)),
                ("body", Value::from("original")),
            ],
        )
        .await
        .unwrap();

    let mut duplicate = events.new_entity([
        ("stream", Value::from("s1")),
        ("seq", Value::from(1)),
        ("body", Value::from("overwrite")),
    ]);
    let err = duplicate.save(&store).await.unwrap_err();
    assert!(matches!(err, ModelError::ItemAlreadyExists { ref table, .. } if table == "events"));
    assert!(!duplicate.exists());
    assert!(!duplicate.was_recently_created());

    let mut same_number_as_float = events.new_entity([
        ("stream", Value::from("s1")),
        ("seq", Value::from(1.0)),
    ]);
    assert!(
        same_number_as_float
            .save(&store)
            .await
            .unwrap_err()
            .is_item_already_exists()
    );

    let mut next_in_stream = events.new_entity([
        ("stream", Value::from("s1")),
        ("seq", Value::from(2)),
        ("body", Value::from("second")),
    ]);
    assert!(next_in_stream.save(&store).await.unwrap());
    assert_eq!(store.item_count("events").await, 2);

    let key = ItemKey::from([
        ("stream".to_string(), Value::from("s1")),
        ("seq".to_string(), Value::from(1)),
    ]);
    let stored = events.find(&store, key).await.unwrap().unwrap();
    assert_eq!(stored.get("body"), Some(&Value::from("original")));
}

#[tokio::test]
async fn default_sort_key_is_persisted_on_insert() {
    let store = store_with("documents", KeySchema::new("id").with_sort_key("rev")).await;
    let documents = Model::new(
        EntityDescriptor::new("documents", "id")
            .unwrap()
            .with_sort_key("rev")
            .unwrap()
            .with_sort_key_default("v0")
            .unwrap(),
    )
    .unwrap();

    let mut document = documents.new_entity([("id", "d1"), ("title", "draft")]);
    assert!(!document.dirty_names().contains("rev"));
    assert!(document.save(&store).await.unwrap());

    let key = ItemKey::from([
        ("id".to_string(), Value::from("d1")),
        ("rev".to_string(), Value::from("v0")),
    ]);
    let stored = documents.find(&store, key).await.unwrap().unwrap();
    assert_eq!(stored.get("title"), Some(&Value::from("draft")));
}

#[tokio::test]
async fn saving_veto_leaves_state_untouched() {
    let store = store_with("users", KeySchema::new("id")).await;
    let model = Model::builder(EntityDescriptor::new("users", "id").unwrap())
        .on(LifecycleEvent::Saving, |_| Ok(HookSignal::Cancel))
        .build()
        .unwrap();

    let mut user = model.new_entity([("id", "a1"), ("name", "x")]);
    let dirty_before = user.dirty_names();

    assert!(!user.save(&store).await.unwrap());
    assert!(!user.exists());
    assert_eq!(user.dirty_names(), dirty_before);
    assert!(store.requests().await.is_empty());
}

#[tokio::test]
async fn updating_veto_skips_store_and_keeps_dirty() {
    let store = store_with("users", KeySchema::new("id")).await;
    let model = Model::builder(EntityDescriptor::new("users", "id").unwrap())
        .on(LifecycleEvent::Updating, |entity| {
            Ok(HookSignal::from(entity.get("name") != Some(&Value::from("blocked"))))
        })
        .build()
        .unwrap();

    let mut user = model.hydrate(item(&[("id", "a1".into()), ("name", "x".into())]));
    user.set("name", "blocked");

    assert!(!user.save(&store).await.unwrap());
    assert!(user.dirty_names().contains("name"));
    assert!(store.requests().await.is_empty());
}

#[tokio::test]
async fn hooks_fire_in_order_and_stop_at_first_cancel() {
    let store = store_with("users", KeySchema::new("id")).await;
    let log = Arc::new(Mutex::new(Vec::new()));

    let mut builder = Model::builder(EntityDescriptor::new("users", "id").unwrap());
    for event in LifecycleEvent::ALL {
        let log = log.clone();
        builder = builder.on(event, move |_| {
            log.lock().unwrap().push(event.name());
            Ok(HookSignal::Proceed)
        });
    }
    let deleting_log = log.clone();
    let model = builder
        .on(LifecycleEvent::Deleting, move |_| {
            deleting_log.lock().unwrap().push("deleting-veto");
            Ok(HookSignal::Cancel)
        })
        .on(LifecycleEvent::Deleting, |_| {
            panic!("observers after a cancel must not run")
        })
        .build()
        .unwrap();

    let mut user = model.new_entity([("id", "a1")]);
    user.save(&store).await.unwrap();
    user.set("name", "y");
    user.save(&store).await.unwrap();
    assert_eq!(user.delete(&store).await.unwrap(), DeleteOutcome::Vetoed);
    assert!(user.exists());

    assert_eq!(
        *log.lock().unwrap(),
        vec![
            "saving",
            "creating",
            "created",
            "saved",
            "saving",
            "updating",
            "updated",
            "saved",
            "deleting",
            "deleting-veto",
        ]
    );
}

#[tokio::test]
async fn cancel_on_informational_event_is_ignored() {
    let store = store_with("users", KeySchema::new("id")).await;
    let model = Model::builder(EntityDescriptor::new("users", "id").unwrap())
        .on(LifecycleEvent::Created, |_| Ok(HookSignal::Cancel))
        .build()
        .unwrap();

    let mut user = model.new_entity([("id", "a1")]);
    assert!(user.save(&store).await.unwrap());
    assert!(user.exists());
}

#[tokio::test]
async fn delete_with_empty_partition_key_fails_before_hooks() {
    let store = store_with("users", KeySchema::new("id")).await;
    let fired = Arc::new(Mutex::new(false));
    let flag = fired.clone();
    let model = Model::builder(EntityDescriptor::new("users", "id").unwrap())
        .on(LifecycleEvent::Deleting, move |_| {
            *flag.lock().unwrap() = true;
            Ok(HookSignal::Proceed)
        })
        .build()
        .unwrap();

    let mut user = model.hydrate(item(&[("id", "".into()), ("name", "x".into())]));
    match user.delete(&store).await {
        Err(ModelError::PreconditionViolation { attribute, table }) => {
            assert_eq!(attribute, "id");
            assert_eq!(table, "users");
        }
        other => panic!("unexpected result: {:?}", other),
    }

    assert!(!*fired.lock().unwrap());
    assert!(user.exists());
    assert!(store.requests().await.is_empty());
}

#[tokio::test]
async fn timestamps_travel_with_writes() {
    let store = store_with("users", KeySchema::new("id")).await;
    let ticks = Arc::new(AtomicI64::new(0));
    let clock_ticks = ticks.clone();
    let stamps = Timestamps::new(TimestampConfig::default()).with_clock(Arc::new(move || {
        let offset = clock_ticks.fetch_add(1, Ordering::SeqCst);
        Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap() + Duration::seconds(offset)
    }));
    let model = Model::builder(EntityDescriptor::new("users", "id").unwrap())
        .timestamp_policy(stamps)
        .build()
        .unwrap();

    let mut user = model.new_entity([("id", "a1")]);
    user.save(&store).await.unwrap();
    let stamp = Value::from("2024-01-02T03:04:05+00:00");
    assert_eq!(user.get("created_at"), Some(&stamp));

    user.set("name", "y");
    store.clear_requests().await;
    user.save(&store).await.unwrap();

    match &store.requests().await[0] {
        StoreRequest::Update(update) => {
            assert_eq!(
                update.attributes.keys().collect::<Vec<_>>(),
                vec!["name", "updated_at"]
            );
        }
        other => panic!("unexpected request: {:?}", other),
    }
    assert_eq!(user.get("created_at"), Some(&stamp));
    assert_eq!(
        user.get("updated_at"),
        Some(&Value::from("2024-01-02T03:04:06+00:00"))
    );
    assert_eq!(ticks.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn unset_attribute_is_removed_from_store() {
    let store = store_with("users", KeySchema::new("id")).await;
    let model = users();
    model
        .create(&store, [("id", "a1"), ("nick", "z")])
        .await
        .unwrap();

    let key = item(&[("id", "a1".into())]);
    let mut user = model.find(&store, key.clone()).await.unwrap().unwrap();
    user.unset("nick");
    assert!(user.save(&store).await.unwrap());

    let reloaded = model.find(&store, key).await.unwrap().unwrap();
    assert!(reloaded.get("nick").is_none());
}

#[tokio::test]
async fn update_helper_fills_and_saves() {
    let store = store_with("users", KeySchema::new("id")).await;
    let mut user = users().create(&store, [("id", "a1")]).await.unwrap();

    assert!(user.update(&store, [("name", "Bob")]).await.unwrap());
    assert!(!user.is_dirty());
    assert!(user.was_recently_created());
}
