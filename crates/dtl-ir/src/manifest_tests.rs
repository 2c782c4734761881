use serde_json::json;
use uuid::Uuid;

use crate::manifest::{Column, Location, Manifest, Mapping, Snapshot};

#[test]
fn manifest_json_schema() {
    let a = Uuid::parse_str("00000000-0000-0000-0000-00000000000a").unwrap();
    let b = Uuid::parse_str("00000000-0000-0000-0000-00000000000b").unwrap();
    let idx = Uuid::parse_str("00000000-0000-0000-0000-00000000000c").unwrap();

    let manifest = Manifest {
        source: "WITH x AS IMPORT 'input';".to_owned(),
        snapshots: vec![Snapshot {
            start: Location {
                lineno: 1,
                column: 1,
            },
            end: Location {
                lineno: 1,
                column: 26,
            },
            columns: vec![Column {
                name: "old".to_owned(),
                array: a,
            }],
        }],
        mappings: vec![
            Mapping::Identity {
                src_array: a,
                tgt_array: b,
            },
            Mapping::ManyToMany {
                src_array: a,
                tgt_array: b,
                src_index_array: idx,
                tgt_index_array: idx,
            },
        ],
    };

    let value = serde_json::to_value(&manifest).unwrap();
    assert_eq!(
        value,
        json!({
            "source": "WITH x AS IMPORT 'input';",
            "snapshots": [{
                "start": {"lineno": 1, "column": 1},
                "end": {"lineno": 1, "column": 26},
                "columns": [{"name": "old", "array": "00000000-0000-0000-0000-00000000000a"}],
            }],
            "mappings": [
                {
                    "src_array": "00000000-0000-0000-0000-00000000000a",
                    "tgt_array": "00000000-0000-0000-0000-00000000000b",
                },
                {
                    "src_array": "00000000-0000-0000-0000-00000000000a",
                    "tgt_array": "00000000-0000-0000-0000-00000000000b",
                    "src_index_array": "00000000-0000-0000-0000-00000000000c",
                    "tgt_index_array": "00000000-0000-0000-0000-00000000000c",
                },
            ],
        })
    );
}

#[test]
fn one_sided_mappings_serialise_their_index_field() {
    let a = Uuid::new_v4();
    let b = Uuid::new_v4();
    let idx = Uuid::new_v4();

    let many_to_one = serde_json::to_value(Mapping::ManyToOne {
        src_array: a,
        tgt_array: b,
        tgt_index_array: idx,
    })
    .unwrap();
    assert_eq!(
        many_to_one,
        json!({
            "src_array": a.to_string(),
            "tgt_array": b.to_string(),
            "tgt_index_array": idx.to_string(),
        })
    );

    let one_to_many = serde_json::to_value(Mapping::OneToMany {
        src_array: a,
        tgt_array: b,
        src_index_array: idx,
    })
    .unwrap();
    assert_eq!(
        one_to_many,
        json!({
            "src_array": a.to_string(),
            "tgt_array": b.to_string(),
            "src_index_array": idx.to_string(),
        })
    );
}
