mod common;

use bson::{doc, oid::ObjectId};
use chrono::{TimeZone, Utc};
use docmapper::prelude::*;

use common::{adapter, create, names};

async fn heffalumps(adapter: &Adapter<docmapper::memory::MemoryDriver>) {
    for (color, spots) in [("red", 2), ("blue", 3), ("red", 5)] {
        create(adapter, "Heffalump", &[("color", color.into()), ("num_spots", spots.into())]).await;
    }
}

#[tokio::test]
async fn conditions_on_one_property_are_conjunctive() {
    let adapter = adapter();
    heffalumps(&adapter).await;

    let found = adapter
        .read(
            "Heffalump",
            &Query::filtered([Filter::gt("num_spots", 2), Filter::ne("num_spots", 3)]),
        )
        .await
        .unwrap();

    assert_eq!(found.len(), 1);
    assert_eq!(found[0].get("num_spots").unwrap(), &Value::Integer(5));
}

#[tokio::test]
async fn repeated_operators_on_one_property_all_apply() {
    let adapter = adapter();
    heffalumps(&adapter).await;

    let found = adapter
        .read(
            "Heffalump",
            &Query::filtered([Filter::ne("num_spots", 2), Filter::ne("num_spots", 3)]),
        )
        .await
        .unwrap();

    assert_eq!(found.len(), 1);
    assert_eq!(found[0].get("num_spots").unwrap(), &Value::Integer(5));
}

#[tokio::test]
async fn empty_query_reads_everything() {
    let adapter = adapter();
    heffalumps(&adapter).await;

    assert_eq!(adapter.all("Heffalump").await.unwrap().len(), 3);
}

#[tokio::test]
async fn sort_is_stable_and_ordered_by_declaration() {
    let adapter = adapter();
    for (color, spots) in [("red", 1), ("blue", 1), ("red", 1), ("blue", 2)] {
        create(&adapter, "Heffalump", &[("color", color.into()), ("num_spots", spots.into())]).await;
    }

    let sorted = adapter
        .read(
            "Heffalump",
            &Query::builder()
                .sort("num_spots", SortDirection::Desc)
                .sort("color", SortDirection::Asc)
                .build(),
        )
        .await
        .unwrap();

    let keys = sorted
        .iter()
        .map(|r| {
            (
                r.get("num_spots").unwrap().as_i64().unwrap(),
                r.get("color").unwrap().as_str().unwrap().to_string(),
            )
        })
        .collect::<Vec<_>>();
    assert_eq!(
        keys,
        [
            (2, "blue".to_string()),
            (1, "blue".to_string()),
            (1, "red".to_string()),
            (1, "red".to_string()),
        ]
    );
}

#[tokio::test]
async fn equal_sort_keys_keep_insertion_order() {
    let adapter = adapter();
    let first = create(&adapter, "Heffalump", &[("color", "red".into())]).await;
    let second = create(&adapter, "Heffalump", &[("color", "red".into())]).await;
    let third = create(&adapter, "Heffalump", &[("color", "red".into())]).await;

    let sorted = adapter
        .read("Heffalump", &Query::builder().sort("color", SortDirection::Asc).build())
        .await
        .unwrap();

    let ids = sorted.iter().map(Resource::id).collect::<Vec<_>>();
    assert_eq!(ids, [first.id(), second.id(), third.id()]);
}

#[tokio::test]
async fn limit_and_offset_page_results() {
    let adapter = adapter();
    heffalumps(&adapter).await;

    let page = adapter
        .read(
            "Heffalump",
            &Query::builder()
                .sort("num_spots", SortDirection::Asc)
                .offset(1)
                .limit(1)
                .build(),
        )
        .await
        .unwrap();

    assert_eq!(page.len(), 1);
    assert_eq!(page[0].get("num_spots").unwrap(), &Value::Integer(3));

    let first = adapter
        .first("Heffalump", &Query::filtered([Filter::eq("color", "red")]))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(first.get("num_spots").unwrap(), &Value::Integer(2));
}

#[tokio::test]
async fn unknown_properties_fail_before_storage() {
    let adapter = adapter();

    let err = adapter
        .read("Heffalump", &Query::filtered([Filter::eq("size", 3)]))
        .await
        .unwrap_err();
    assert!(matches!(err, MapperError::Translation(_)));

    let err = adapter
        .read("Heffalump", &Query::builder().sort("size", SortDirection::Asc).build())
        .await
        .unwrap_err();
    assert!(matches!(err, MapperError::Translation(_)));

    assert!(adapter.driver().list_collections().await.unwrap().is_empty());
}

#[tokio::test]
async fn regex_selects_matching_strings() {
    let adapter = adapter();
    for name in ["John", "Jane", "Bob"] {
        create(&adapter, "User", &[("name", name.into())]).await;
    }

    let found = adapter
        .read("User", &Query::filtered([Filter::regex("name", "^J")]))
        .await
        .unwrap();
    assert_eq!(names(&found), ["John", "Jane"]);

    let found = adapter
        .read("User", &Query::filtered([Filter::regex_with_options("name", "^bo", "i")]))
        .await
        .unwrap();
    assert_eq!(names(&found), ["Bob"]);

    let err = adapter
        .read("Heffalump", &Query::filtered([Filter::regex("num_spots", "^2")]))
        .await
        .unwrap_err();
    assert!(matches!(err, MapperError::Translation(_)));
}

#[tokio::test]
async fn membership_filters() {
    let adapter = adapter();
    heffalumps(&adapter).await;

    let found = adapter
        .read("Heffalump", &Query::filtered([Filter::any_of("num_spots", [2, 5])]))
        .await
        .unwrap();
    assert_eq!(found.len(), 2);

    let found = adapter
        .read("Heffalump", &Query::filtered([Filter::none_of("color", ["red"])]))
        .await
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].get("color").unwrap(), &Value::from("blue"));
}

#[tokio::test]
async fn get_update_reload_and_delete() {
    let adapter = adapter();
    let born = Utc.with_ymd_and_hms(2020, 5, 17, 8, 30, 0).unwrap();
    let mut heffalump = create(
        &adapter,
        "Heffalump",
        &[("color", "red".into()), ("born", born.into())],
    )
    .await;
    let id = heffalump.id().unwrap();

    assert!(heffalump.is_persisted());
    assert!(!heffalump.is_dirty());

    adapter
        .update(&mut heffalump, [("color", Value::from("pink")), ("num_spots", Value::from(7))])
        .await
        .unwrap();
    assert!(!heffalump.is_dirty());

    let stored = adapter.get("Heffalump", id).await.unwrap();
    assert_eq!(stored, heffalump);
    assert_eq!(stored.get("born").unwrap(), &Value::from(born));

    let mut stale = stored.clone();
    heffalump.set("num_spots", 8).unwrap();
    adapter.save(&mut heffalump).await.unwrap();
    adapter.reload(&mut stale).await.unwrap();
    assert_eq!(stale.get("num_spots").unwrap(), &Value::Integer(8));

    assert!(adapter.delete(&mut heffalump).await.unwrap());
    assert!(heffalump.is_new());
    assert!(!adapter.delete(&mut heffalump).await.unwrap());

    let err = adapter.get("Heffalump", id).await.unwrap_err();
    assert!(matches!(err, MapperError::NotFound { .. }));
    let err = adapter.reload(&mut stale).await.unwrap_err();
    assert!(matches!(err, MapperError::NotFound { .. }));
}

#[tokio::test]
async fn updating_a_vanished_resource_is_not_found() {
    let adapter = adapter();
    let mut heffalump = create(&adapter, "Heffalump", &[("color", "red".into())]).await;
    let mut twin = adapter.get("Heffalump", heffalump.id().unwrap()).await.unwrap();

    adapter.delete(&mut twin).await.unwrap();
    heffalump.set("color", "blue").unwrap();

    let err = adapter.save(&mut heffalump).await.unwrap_err();
    assert!(matches!(err, MapperError::NotFound { .. }));
}

#[tokio::test]
async fn identifiers_from_hex_match_stored_identifiers() {
    let adapter = adapter();
    let oid = ObjectId::new();
    adapter
        .driver()
        .insert("heffalumps", doc! { "_id": oid, "color": "grey" })
        .await
        .unwrap();

    let id = Identifier::parse_str(oid.to_hex().to_uppercase()).unwrap();
    let found = adapter.get("Heffalump", id).await.unwrap();

    assert_eq!(found.id(), Some(id));
    assert_eq!(found.id().unwrap().as_object_id(), oid);

    let by_key = adapter
        .read("Heffalump", &Query::filtered([Filter::eq("id", oid.to_hex())]))
        .await
        .unwrap();
    assert_eq!(by_key.len(), 1);
}

#[tokio::test]
async fn created_identifiers_match_their_hex_form() {
    let adapter = adapter();
    create(&adapter, "Heffalump", &[("color", "grey".into())]).await;
    let teal = create(&adapter, "Heffalump", &[("color", "teal".into())]).await;
    let hex = teal.id().unwrap().to_hex();

    let by_key = adapter
        .read("Heffalump", &Query::filtered([Filter::eq("id", hex.to_uppercase())]))
        .await
        .unwrap();
    assert_eq!(by_key.len(), 1);
    assert_eq!(by_key[0].id(), teal.id());

    let found = adapter.get("Heffalump", Identifier::parse_str(&hex).unwrap()).await.unwrap();
    assert_eq!(found.get("color").unwrap(), &Value::from("teal"));
}

#[tokio::test]
async fn rejected_updates_leave_the_resource_untouched() {
    let adapter = adapter();
    let mut heffalump = create(&adapter, "Heffalump", &[("color", "red".into())]).await;
    let before = heffalump.clone();

    let err = adapter
        .update(&mut heffalump, [("color", Value::from("pink")), ("num_spots", Value::from("many"))])
        .await
        .unwrap_err();
    assert!(matches!(err, MapperError::Validation(_)));
    assert_eq!(heffalump, before);
    assert!(!heffalump.is_dirty());

    let mut draft = Resource::new(adapter.registry(), "Heffalump").unwrap();
    let err = adapter.update(&mut draft, [("color", "blue")]).await.unwrap_err();
    assert!(matches!(err, MapperError::Validation(_)));
    assert!(draft.get("color").unwrap().is_null());
    assert!(!draft.is_dirty());
}

#[tokio::test]
async fn preset_keys_are_kept_on_create() {
    let adapter = adapter();
    let id = Identifier::new();
    let mut heffalump = Resource::new(adapter.registry(), "Heffalump").unwrap().with("id", id).unwrap();

    assert_eq!(adapter.create(&mut heffalump).await.unwrap(), id);

    let err = adapter.create(&mut heffalump).await.unwrap_err();
    assert!(matches!(err, MapperError::Validation(_)));
}

#[tokio::test]
async fn resources_from_another_registry_are_rejected() {
    let adapter = adapter();
    let mut stranger = Resource::new(&common::registry(), "Heffalump").unwrap();

    let err = adapter.create(&mut stranger).await.unwrap_err();
    assert!(matches!(err, MapperError::Validation(_)));
}

#[tokio::test]
async fn drop_collection_removes_documents() {
    let adapter = adapter();
    heffalumps(&adapter).await;

    adapter.drop_collection("Heffalump").await.unwrap();
    assert!(adapter.all("Heffalump").await.unwrap().is_empty());
}
