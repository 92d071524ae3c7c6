//! End-to-end pipeline runs over frames built from real CSV text.

use harmon_core::{
    MemoryChannel, MemoryStore, MetadataRepository, PipelineOptions, ProgressEvent, run_pipeline,
};
use harmon_ingest::{ProjectFrame, cell_string, read_form_frame};
use harmon_model::{Mapping, Schema};

fn demographics_project() -> ProjectFrame {
    let csv = "pid,visit,collect_date,age,gender\n\
               P01,week-4,2015-09-06,34,0\n\
               P02,week-4,2015-09-07,40,1\n";
    let data = read_form_frame("ucsd", "demographics", csv.as_bytes(), "test", None).unwrap();
    ProjectFrame {
        project: "ucsd".to_string(),
        data,
        forms: vec!["demographics".to_string()],
    }
}

fn metadata() -> MetadataRepository {
    let source: Schema = serde_json::from_str(
        r#"{"name": "demographics", "attributes": [
            {"name": "age", "type": "number"},
            {"name": "gender", "type": "choice", "choices": [
                {"name": "0", "title": "Female"},
                {"name": "1", "title": "Male"}
            ]}
        ]}"#,
    )
    .unwrap();
    let target: Schema = serde_json::from_str(
        r#"{"name": "Demographics", "attributes": [
            {"name": "age_doubled", "type": "number"},
            {"name": "sex", "type": "choice", "choices": [
                {"name": "1", "title": "Male"},
                {"name": "2", "title": "Female"}
            ]}
        ]}"#,
    )
    .unwrap();
    MetadataRepository::from_schemas([source, target])
}

fn mappings() -> Vec<Mapping> {
    serde_json::from_str(
        r#"[
            {
                "study": "ucsd",
                "type": "direct",
                "status": "approved",
                "logic": {
                    "source_schema": "demographics",
                    "source_variable": "gender",
                    "target_schema": "Demographics",
                    "target_variable": "sex",
                    "choices_mapping": [
                        {"source": "0", "target": "2"},
                        {"source": "1", "target": "1"}
                    ]
                }
            },
            {
                "study": "ucsd",
                "type": "imputation",
                "status": "approved",
                "logic": {
                    "target_schema": "Demographics",
                    "target_variable": "age_doubled",
                    "forms": [["demographics", "age"]],
                    "groups": [{
                        "conversions": [
                            {"byVariable": true,
                             "schema": {"name": "demographics"},
                             "attribute": {"name": "age"}},
                            {"byValue": true, "value": 2, "operator": "MUL"}
                        ]
                    }]
                }
            }
        ]"#,
    )
    .unwrap()
}

#[test]
fn approved_rules_produce_validated_records() {
    let mut frame = demographics_project();
    let metadata = metadata();
    let mut store = MemoryStore::new();
    let channel = MemoryChannel::new();
    let options = PipelineOptions::default();

    let report = run_pipeline(
        &mut frame,
        &mappings(),
        &metadata,
        &mut store,
        &channel,
        &options,
    )
    .unwrap();

    assert_eq!(report.total_rules, 2);
    assert_eq!(report.applied, 2);
    assert_eq!(report.skipped, 0);
    assert!(!report.has_diagnostics());
    assert_eq!(report.records_written, 2);

    let records = store.records();
    let p01 = records.iter().find(|r| r.pid == "P01").unwrap();
    assert_eq!(p01.schema, "Demographics");
    assert_eq!(p01.values.get("age_doubled").map(String::as_str), Some("68"));
    assert_eq!(p01.values.get("sex").map(String::as_str), Some("2"));
    assert_eq!(p01.collect_date.as_deref(), Some("2015-09-06"));

    let events = channel.events();
    assert_eq!(events.first(), Some(&ProgressEvent::Reset { total: 2 }));
    assert!(events.contains(&ProgressEvent::Progress { count: 2, total: 2 }));
}

#[test]
fn non_approved_rules_are_skipped() {
    let mut frame = demographics_project();
    let metadata = metadata();
    let mut store = MemoryStore::new();
    let channel = MemoryChannel::new();

    let mut rules = mappings();
    let direct: Mapping = {
        let mut value: serde_json::Value = serde_json::to_value(&rules[0]).unwrap();
        value["status"] = serde_json::json!("review");
        serde_json::from_value(value).unwrap()
    };
    rules[0] = direct;

    let report = run_pipeline(
        &mut frame,
        &rules,
        &metadata,
        &mut store,
        &channel,
        &PipelineOptions::default(),
    )
    .unwrap();

    assert_eq!(report.applied, 1);
    assert_eq!(report.skipped, 1);
    // The skipped rule never wrote its target column.
    assert!(frame.data.column("drsc_Demographics_sex").is_err());
    assert!(
        store
            .records()
            .iter()
            .all(|record| !record.values.contains_key("sex"))
    );
    // The skip was surfaced on the channel without becoming a diagnostic.
    assert!(!report.has_diagnostics());
    assert!(channel.events().iter().any(|event| matches!(
        event,
        ProgressEvent::Message(d) if d.message.contains("review")
    )));
}

#[test]
fn undeclared_target_attribute_is_a_lookup_failure() {
    let mut frame = demographics_project();
    let metadata = metadata();
    let mut store = MemoryStore::new();
    let channel = MemoryChannel::new();

    // Typo'd target variable: the codebook declares age_doubled, not this.
    let rules: Vec<Mapping> = serde_json::from_str(
        r#"[{
            "study": "ucsd",
            "type": "imputation",
            "status": "approved",
            "logic": {
                "target_schema": "Demographics",
                "target_variable": "age_dubbled",
                "target_choice": {"name": "003", "title": "Obese"},
                "condition": "ALL",
                "forms": [["demographics", "age"]],
                "groups": [{
                    "conversions": [
                        {"byVariable": true,
                         "schema": {"name": "demographics"},
                         "attribute": {"name": "age"}}
                    ],
                    "logic": {"operator": "ALL",
                              "imputations": [{"operator": "GT", "value": 10}]}
                }]
            }
        }]"#,
    )
    .unwrap();

    let report = run_pipeline(
        &mut frame,
        &rules,
        &metadata,
        &mut store,
        &channel,
        &PipelineOptions::default(),
    )
    .unwrap();

    // The rule never ran and the failure is operator-visible.
    assert_eq!(report.applied, 0);
    assert_eq!(report.skipped, 1);
    assert_eq!(report.diagnostics.len(), 1);
    assert!(report.diagnostics[0].message.contains("not declared"));
    assert!(frame.data.column("drsc_Demographics_age_dubbled").is_err());
    assert!(store.records().is_empty());
}

#[test]
fn undeclared_targets_pass_through_without_codebooks() {
    let mut frame = demographics_project();
    let empty = MetadataRepository::new();
    let mut store = MemoryStore::new();
    let channel = MemoryChannel::new();

    let report = run_pipeline(
        &mut frame,
        &mappings(),
        &empty,
        &mut store,
        &channel,
        &PipelineOptions::default(),
    )
    .unwrap();

    assert_eq!(report.applied, 2);
    assert!(!report.has_diagnostics());
    assert_eq!(report.records_written, 2);
}

#[test]
fn invalid_values_become_diagnostics_and_are_not_persisted() {
    // age is text in the data but the target attribute requires a number.
    let csv = "pid,visit,collect_date,age\nP01,week-4,2015-09-06,unknown\n";
    let data = read_form_frame("ucsd", "demographics", csv.as_bytes(), "test", None).unwrap();
    let mut frame = ProjectFrame {
        project: "ucsd".to_string(),
        data,
        forms: vec!["demographics".to_string()],
    };

    let rules: Vec<Mapping> = serde_json::from_str(
        r#"[{
            "study": "ucsd",
            "type": "direct",
            "status": "approved",
            "logic": {
                "source_schema": "demographics",
                "source_variable": "age",
                "target_schema": "Demographics",
                "target_variable": "age_doubled"
            }
        }]"#,
    )
    .unwrap();

    let metadata = metadata();
    let mut store = MemoryStore::new();
    let channel = MemoryChannel::new();
    let report = run_pipeline(
        &mut frame,
        &rules,
        &metadata,
        &mut store,
        &channel,
        &PipelineOptions::default(),
    )
    .unwrap();

    assert_eq!(report.applied, 1);
    assert_eq!(report.records_written, 0);
    assert_eq!(report.diagnostics.len(), 1);
    assert!(report.diagnostics[0].message.contains("not numeric"));
    assert!(store.records().is_empty());
}
