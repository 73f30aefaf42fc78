use athlete_insights::{
    bucket::{BucketLabel, Bucketizer},
    correlation::{Coefficient, correlation_matrix},
    data::Value,
    dataset::Dataset,
    group::{Aggregate, aggregate_groups},
    schema::{ColumnMeta, ColumnType, Schema},
    stats::percentile,
};
use proptest::prelude::*;

fn optional_values(len: usize) -> impl Strategy<Value = Vec<Option<f64>>> {
    prop::collection::vec(prop::option::weighted(0.8, -1_000.0f64..1_000.0), len)
}

fn columns() -> impl Strategy<Value = Vec<Vec<Option<f64>>>> {
    (2usize..5, 0usize..25)
        .prop_flat_map(|(width, len)| prop::collection::vec(optional_values(len), width))
}

fn float_dataset(names: &[String], columns: &[Vec<Option<f64>>]) -> Dataset {
    let schema = Schema::new(
        names
            .iter()
            .map(|name| ColumnMeta::new(name.clone(), ColumnType::Float))
            .collect(),
    )
    .expect("schema");
    let len = columns.first().map_or(0, Vec::len);
    let rows = (0..len)
        .map(|row| {
            columns
                .iter()
                .map(|column| column[row].map(Value::Float))
                .collect()
        })
        .collect();
    Dataset::new(schema, rows).expect("dataset")
}

proptest! {
    #[test]
    fn matrix_is_symmetric_bounded_with_unit_diagonal(data in columns()) {
        let names = (0..data.len()).map(|i| format!("c{i}")).collect::<Vec<_>>();
        let dataset = float_dataset(&names, &data);
        let matrix = correlation_matrix(&dataset, &names).expect("numeric columns");
        for a in &names {
            prop_assert_eq!(matrix.get(a, a), Some(Coefficient::Defined(1.0)));
            for b in &names {
                let ab = matrix.get(a, b);
                prop_assert_eq!(ab, matrix.get(b, a));
                if let Some(Coefficient::Defined(r)) = ab {
                    prop_assert!((-1.0..=1.0).contains(&r));
                }
            }
        }
    }

    #[test]
    fn bucketing_is_monotonic(mut values in prop::collection::vec(-10.0f64..20.0, 1..40)) {
        let bucketizer = Bucketizer::sleep_duration();
        values.sort_by(f64::total_cmp);
        let mut last_index = None;
        for value in values {
            match bucketizer.classify(Some(value)) {
                BucketLabel::Assigned { index, .. } => {
                    prop_assert!((0.0..=12.0).contains(&value));
                    if let Some(previous) = last_index {
                        prop_assert!(index >= previous);
                    }
                    last_index = Some(index);
                }
                BucketLabel::Unassigned => {
                    prop_assert!(!(0.0..=12.0).contains(&value));
                }
            }
        }
    }

    #[test]
    fn top_n_keeps_min_of_n_and_groups(
        rows in prop::collection::vec((0u8..8, -50.0f64..50.0), 0..60),
        top in 0usize..10,
    ) {
        let keys = rows
            .iter()
            .map(|(key, _)| Some(format!("k{key}")))
            .collect::<Vec<_>>();
        let values = rows.iter().map(|(_, value)| Some(*value)).collect::<Vec<_>>();
        let all = aggregate_groups(&keys, &values, Aggregate::Mean, None);
        let truncated = aggregate_groups(&keys, &values, Aggregate::Mean, Some(top));
        prop_assert_eq!(truncated.len(), top.min(all.len()));
        prop_assert_eq!(&all[..truncated.len()], &truncated[..]);
        for pair in all.windows(2) {
            prop_assert!(pair[0].value >= pair[1].value);
        }
    }

    #[test]
    fn percentiles_stay_within_observed_range(
        mut values in prop::collection::vec(-1_000.0f64..1_000.0, 1..50),
        p in 0.0f64..=1.0,
    ) {
        values.sort_by(f64::total_cmp);
        let result = percentile(&values, p).expect("non-empty input");
        prop_assert!(result >= values[0] && result <= values[values.len() - 1]);
    }
}
