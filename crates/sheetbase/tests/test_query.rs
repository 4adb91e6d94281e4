//! Query engine scenarios over an in-memory store.

mod common;

use common::{setup, PROD};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sheetbase::{
    BackendCall, CellValue, Mode, Operator, OrderDirection, Schema, SheetbaseError, ValueKind,
};

fn column<'a>(rows: &'a [sheetbase::RowRecord], name: &str) -> Vec<&'a str> {
    rows.iter()
        .map(|row| row.get_str(name).unwrap_or_default())
        .collect()
}

#[tokio::test]
async fn test_header_is_canonicalized() {
    let (_backend, client) = setup();
    let table = client.table("People").await.unwrap();

    assert_eq!(table.header(), &["first_name", "last_name", "age"]);
    let first = table.first().unwrap();
    assert_eq!(first.id(), Some(1));
    assert_eq!(first.get_str("first_name"), Some("Ann"));
    assert_eq!(first.get_str("last_name"), Some("Lee"));
}

#[tokio::test]
async fn test_equality_filter_returns_matching_rows_in_order() {
    let (_backend, client) = setup();
    let table = client
        .table("People")
        .await
        .unwrap()
        .where_clause("first_name", Operator::Eq, "Ann")
        .unwrap();

    assert_eq!(table.len(), 2);
    assert_eq!(column(table.all(), "last_name"), vec!["Lee", "Kim"]);
    assert_eq!(
        table.all().iter().map(|r| r.id()).collect::<Vec<_>>(),
        vec![Some(1), Some(3)]
    );
}

#[tokio::test]
async fn test_like_is_case_sensitive_containment() {
    let (_backend, client) = setup();
    let table = client.table("People").await.unwrap();

    let like = table.clone().filter("last_name", "LIKE", "e").unwrap();
    assert_eq!(column(like.all(), "last_name"), vec!["Lee"]);

    let upper = table.clone().filter("last_name", "like", "L").unwrap();
    assert_eq!(upper.len(), 1);

    let not_like = table.filter("last_name", "not   like", "e").unwrap();
    assert_eq!(column(not_like.all(), "first_name"), vec!["Bob", "Ann", "Dee"]);
}

#[tokio::test]
async fn test_like_on_typed_cell_is_type_mismatch() {
    let (_backend, client) = setup();
    let table = client
        .table_with_schema("People", Schema::new().column("Age", ValueKind::Number))
        .await
        .unwrap();

    let err = table.filter("age", "like", "3").unwrap_err();
    assert!(matches!(err, SheetbaseError::TypeMismatch(_)));
}

#[tokio::test]
async fn test_typed_column_compares_numerically() {
    let (_backend, client) = setup();
    let table = client
        .table_with_schema("People", Schema::new().column("Age", ValueKind::Number))
        .await
        .unwrap()
        .filter("age", ">=", 30)
        .unwrap();

    assert_eq!(column(table.all(), "first_name"), vec!["Ann", "Ann"]);
    assert_eq!(table.all()[1].get("age"), Some(&CellValue::Number(41.0)));
}

#[tokio::test]
async fn test_order_by_is_stable_and_desc_reverses() {
    let (_backend, client) = setup();
    let table = client.table("People").await.unwrap();

    let asc = table.clone().order_by("age", OrderDirection::Asc).unwrap();
    // Bob and Dee tie on 25 and keep their original order.
    assert_eq!(column(asc.all(), "first_name"), vec!["Bob", "Dee", "Ann", "Ann"]);

    let desc = table.order_by("age", "desc".parse().unwrap()).unwrap();
    let mut reversed = asc.get();
    reversed.reverse();
    assert_eq!(desc.get(), reversed);
}

#[tokio::test]
async fn test_empty_cells_sort_first() {
    let (_backend, client) = setup();
    let table = client
        .table("People")
        .await
        .unwrap()
        .order_by("last_name", OrderDirection::Asc)
        .unwrap();
    assert_eq!(column(table.all(), "first_name"), vec!["Dee", "Ann", "Ann", "Bob"]);
}

#[tokio::test]
async fn test_filter_then_reset() {
    let (_backend, client) = setup();
    let table = client
        .table("People")
        .await
        .unwrap()
        .filter("first_name", "=", "Ann")
        .unwrap()
        .filter("last_name", "=", "Kim")
        .unwrap();
    assert_eq!(table.len(), 1);

    let table = table.reset();
    assert_eq!(table.len(), 4);
    assert_eq!(table.all()[0].id(), Some(1));
}

#[tokio::test]
async fn test_unknown_table_is_not_found() {
    let (_backend, client) = setup();
    let err = client.table("Orders").await.unwrap_err();
    assert!(matches!(
        err,
        SheetbaseError::NotFound { ref table, ref known } if table == "Orders" && known == &["People"]
    ));
}

#[tokio::test]
async fn test_empty_table_is_reported() {
    let (backend, client) = setup();
    backend.put_table(common::DEV, "Blank", Vec::new());
    client.refresh_tables().await.unwrap();

    let err = client.table("Blank").await.unwrap_err();
    assert_eq!(err, SheetbaseError::EmptyTable("Blank".to_string()));
}

#[tokio::test]
async fn test_header_only_table() {
    let (backend, client) = setup();
    backend.put_table(common::DEV, "Fresh", common::grid(&[&["Name", "Email"]]));
    client.refresh_tables().await.unwrap();

    let table = client.table("Fresh").await.unwrap();
    assert!(table.is_empty());
    assert_eq!(table.header(), &["name", "email"]);
}

#[tokio::test]
async fn test_unsupported_operator_is_local() {
    let (backend, client) = setup();
    let table = client.table("People").await.unwrap();
    backend.clear_calls();

    let err = table.filter("age", "between", "1").unwrap_err();
    assert_eq!(err, SheetbaseError::UnsupportedOperator("between".to_string()));
    assert!(err.is_local());
    assert!(backend.calls().is_empty());
}

#[tokio::test]
async fn test_mode_switch_reads_other_store() {
    let (backend, client) = setup();
    backend.put_table(PROD, "People", common::grid(&[&["First Name"], &["Zed"]]));

    let prod = client.with_mode(Mode::Production);
    let table = prod.table("People").await.unwrap();
    assert_eq!(table.store_id(), PROD);
    assert_eq!(column(table.all(), "first_name"), vec!["Zed"]);

    let dev = client.table("People").await.unwrap();
    assert_eq!(dev.len(), 4);
    assert!(backend.calls().contains(&BackendCall::ListTables {
        store: PROD.to_string()
    }));
}

#[tokio::test]
async fn test_generated_tables_filter_like_a_scan() {
    const TAGS: &[&str] = &["a", "ab", "ba", "abc", "c", "Ab"];
    let (backend, client) = setup();
    let mut rng = StdRng::seed_from_u64(7);

    for round in 0..40 {
        let name = format!("Gen{round}");
        let len = rng.gen_range(0..30);
        let tags: Vec<&str> = (0..len).map(|_| TAGS[rng.gen_range(0..TAGS.len())]).collect();
        let mut rows = vec![vec!["Row".to_string(), "Tag".to_string()]];
        rows.extend(
            tags.iter()
                .enumerate()
                .map(|(i, tag)| vec![format!("r{i}"), tag.to_string()]),
        );
        backend.put_table(common::DEV, &name, rows);
        client.refresh_tables().await.unwrap();
        let table = client.table(&name).await.unwrap();

        let needle = TAGS[rng.gen_range(0..TAGS.len())];
        let ids = |t: &sheetbase::Table| t.all().iter().filter_map(|r| r.id()).collect::<Vec<_>>();
        let scan = |keep: &dyn Fn(&str) -> bool| {
            tags.iter()
                .enumerate()
                .filter(|(_, tag)| keep(tag))
                .map(|(i, _)| i + 1)
                .collect::<Vec<_>>()
        };

        let eq = table.clone().filter("tag", "=", needle).unwrap();
        assert_eq!(ids(&eq), scan(&|tag| tag == needle), "= {needle:?} in {tags:?}");

        let ne = table.clone().filter("tag", "!=", needle).unwrap();
        assert_eq!(ids(&ne), scan(&|tag| tag != needle));

        let like = table.clone().filter("tag", "like", needle).unwrap();
        assert_eq!(ids(&like), scan(&|tag| tag.contains(needle)), "like {needle:?} in {tags:?}");

        let not_like = table.clone().filter("tag", "not like", needle).unwrap();
        assert_eq!(ids(&not_like), scan(&|tag| !tag.contains(needle)));

        let sorted = table.order_by("tag", OrderDirection::Asc).unwrap();
        for pair in sorted.all().windows(2) {
            let (a, b) = (pair[0].get("tag").unwrap(), pair[1].get("tag").unwrap());
            assert!(a.compare(b).is_le());
            if a.compare(b).is_eq() {
                assert!(pair[0].id() < pair[1].id(), "sort is not stable");
            }
        }
        assert_eq!(sorted.len(), tags.len());
    }
}
