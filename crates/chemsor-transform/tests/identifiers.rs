//! Property tests for identifier assignment.

use chemsor_model::TableKind;
use chemsor_schema::TableSpec;
use chemsor_transform::assign_ids;
use polars::prelude::*;
use proptest::prelude::*;

fn reduction_table() -> TableSpec {
    TableSpec {
        kind: TableKind::Reduction,
        id: "reduction_id".to_string(),
        grouping: vec![
            "reduction_code".to_string(),
            "reduction_description".to_string(),
        ],
        columns: vec![
            "reduction_id".to_string(),
            "reduction_code".to_string(),
            "reduction_description".to_string(),
        ],
    }
}

fn frame(keys: &[(String, Option<String>)]) -> DataFrame {
    let codes: Vec<&str> = keys.iter().map(|(c, _)| c.as_str()).collect();
    let descriptions: Vec<Option<&str>> = keys.iter().map(|(_, d)| d.as_deref()).collect();
    DataFrame::new(vec![
        Series::new("reduction_code".into(), codes).into(),
        Series::new("reduction_description".into(), descriptions).into(),
    ])
    .unwrap()
}

fn ids(df: &DataFrame) -> Vec<i64> {
    df.column("reduction_id")
        .unwrap()
        .i64()
        .unwrap()
        .into_iter()
        .map(Option::unwrap)
        .collect()
}

fn key_strategy() -> impl Strategy<Value = (String, Option<String>)> {
    (
        prop::sample::select(vec!["T01", "T02", "T10", "t01"]),
        prop::option::of(prop::sample::select(vec!["Audit", "audit", "Vendor", ""])),
    )
        .prop_map(|(code, desc)| (code.to_string(), desc.map(str::to_string)))
}

proptest! {
    #[test]
    fn ids_are_dense_and_order_preserving(keys in prop::collection::vec(key_strategy(), 0..40)) {
        let mut df = frame(&keys);
        let groups = assign_ids(&mut df, &reduction_table()).unwrap();
        let assigned = ids(&df);

        let mut distinct = keys.clone();
        distinct.sort();
        distinct.dedup();
        prop_assert_eq!(groups, distinct.len());

        for (i, a) in keys.iter().enumerate() {
            // Ids are 1-based positions in the sorted distinct key list.
            let expected = distinct.iter().position(|k| k == a).unwrap() as i64 + 1;
            prop_assert_eq!(assigned[i], expected);
            for (j, b) in keys.iter().enumerate() {
                if a < b {
                    prop_assert!(assigned[i] < assigned[j]);
                }
            }
        }
    }

    #[test]
    fn assignment_is_repeatable(keys in prop::collection::vec(key_strategy(), 0..40)) {
        let mut first = frame(&keys);
        let mut second = frame(&keys);
        assign_ids(&mut first, &reduction_table()).unwrap();
        assign_ids(&mut second, &reduction_table()).unwrap();
        prop_assert_eq!(ids(&first), ids(&second));
    }
}
