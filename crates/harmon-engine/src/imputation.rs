//! Imputation-rule compilation and application.
//!
//! A rule is compiled once per run against the target variable's metadata,
//! then applied row by row. The target type decides the evaluation shape:
//!
//! * choice target: every group runs and the results are reduced with the
//!   rule condition (default ALL); a truthy reduction selects the configured
//!   target choice code, a falsy one yields MISSING.
//! * non-choice target: the reduction is forced to ID and only the first
//!   group runs, so the computed scalar passes through unchanged.

use chrono::NaiveDate;
use polars::prelude::{DataFrame, NamedFrom, Series};
use tracing::debug;

use harmon_ingest::{cell_string, collect_date_column, qualified_column};
use harmon_model::{Condition, Group, ImputationRule};

use crate::error::Result;
use crate::group::evaluate_group;
use crate::operators::reduce_condition;
use crate::value::Value;

pub const COLLECT_DATE_FORMAT: &str = "%Y-%m-%d";

/// An imputation rule with its target-type policy already resolved.
#[derive(Debug)]
pub struct CompiledImputation<'a> {
    rule: &'a ImputationRule,
    condition: Condition,
    groups: &'a [Group],
}

/// Rows touched by one rule application.
#[derive(Debug, Default, Clone, Copy)]
pub struct ImputationOutcome {
    pub imputed_rows: usize,
    pub skipped_rows: usize,
}

impl<'a> CompiledImputation<'a> {
    /// Resolves the target-type policy for a rule.
    pub fn new(rule: &'a ImputationRule, target_is_choice: bool) -> Self {
        if target_is_choice {
            Self {
                rule,
                condition: rule.condition.unwrap_or_default(),
                groups: &rule.groups,
            }
        } else {
            Self {
                rule,
                condition: Condition::Id,
                groups: &rule.groups[..rule.groups.len().min(1)],
            }
        }
    }

    pub fn target_schema(&self) -> &str {
        &self.rule.target_schema
    }

    pub fn target_variable(&self) -> &str {
        &self.rule.target_variable
    }

    /// Computes the target value for one row, MISSING when any group fails
    /// to resolve or a truth reduction comes out falsy.
    pub fn evaluate_row(&self, frame: &DataFrame, row: usize, project: &str) -> Option<Value> {
        let mut results = Vec::with_capacity(self.groups.len());
        for group in self.groups {
            // One unresolvable group makes the whole row unresolvable.
            results.push(evaluate_group(group, frame, row, project)?);
        }
        let reduced = reduce_condition(self.condition, results)?;
        match self.condition {
            Condition::Id => Some(reduced),
            Condition::Any | Condition::All => {
                if reduced.is_truthy() {
                    self.rule
                        .target_choice_name()
                        .map(|name| Value::Text(name.to_string()))
                } else {
                    None
                }
            }
        }
    }

    /// Applies the rule to every row of the frame, writing the target column
    /// `{target_project}_{target_schema}_{target_variable}` and reconciling
    /// the target collect date afterwards.
    ///
    /// Rows that already carry a target value keep it untouched, so applying
    /// the same rule twice is a no-op.
    pub fn apply(
        &self,
        frame: &mut DataFrame,
        project: &str,
        target_project: &str,
    ) -> Result<ImputationOutcome> {
        let target_column = qualified_column(
            target_project,
            &self.rule.target_schema,
            &self.rule.target_variable,
        );
        let height = frame.height();
        let mut outcome = ImputationOutcome::default();
        let mut cells: Vec<Option<String>> = Vec::with_capacity(height);
        for row in 0..height {
            if let Some(existing) = cell_string(frame, &target_column, row) {
                outcome.skipped_rows += 1;
                cells.push(Some(existing));
                continue;
            }
            let value = self.evaluate_row(frame, row, project);
            if value.is_some() {
                outcome.imputed_rows += 1;
            }
            cells.push(value.map(|value| value.render()));
        }
        frame.with_column(Series::new(target_column.as_str().into(), cells))?;
        self.reconcile_collect_dates(frame, project, target_project)?;

        debug!(
            target = target_column,
            imputed = outcome.imputed_rows,
            skipped = outcome.skipped_rows,
            "applied imputation rule"
        );
        Ok(outcome)
    }

    /// Sets the target schema's collect date to the earliest date among the
    /// source forms the rule reads from, keeping an earlier pre-existing
    /// target date when there is one. Rows without a target value keep
    /// whatever date they already had.
    fn reconcile_collect_dates(
        &self,
        frame: &mut DataFrame,
        project: &str,
        target_project: &str,
    ) -> Result<()> {
        let target_column = qualified_column(
            target_project,
            &self.rule.target_schema,
            &self.rule.target_variable,
        );
        let date_column = collect_date_column(target_project, &self.rule.target_schema);

        let mut source_columns: Vec<String> = Vec::new();
        for (schema, _) in &self.rule.forms {
            let column = collect_date_column(project, schema);
            if !source_columns.contains(&column) {
                source_columns.push(column);
            }
        }

        let height = frame.height();
        let mut cells: Vec<Option<String>> = Vec::with_capacity(height);
        for row in 0..height {
            let existing = cell_string(frame, &date_column, row);
            if cell_string(frame, &target_column, row).is_none() {
                cells.push(existing);
                continue;
            }
            let mut earliest = existing.as_deref().and_then(parse_collect_date);
            for column in &source_columns {
                if let Some(date) = cell_string(frame, column, row)
                    .as_deref()
                    .and_then(parse_collect_date)
                {
                    earliest = Some(earliest.map_or(date, |best| best.min(date)));
                }
            }
            let formatted = earliest.map(|date| date.format(COLLECT_DATE_FORMAT).to_string());
            cells.push(formatted.or(existing));
        }
        frame.with_column(Series::new(date_column.as_str().into(), cells))?;
        Ok(())
    }
}

fn parse_collect_date(text: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(text.trim(), COLLECT_DATE_FORMAT).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use harmon_model::{BinaryOp, Conversion, Imputation, Logic, TargetChoice};
    use serde_json::json;

    fn frame() -> DataFrame {
        DataFrame::new(vec![
            Series::new("pid".into(), vec![Some("P01"), Some("P02")]).into(),
            Series::new("visit".into(), vec![Some("week-4"), Some("week-4")]).into(),
            Series::new(
                "ucsd_vitals_collect_date".into(),
                vec![Some("2015-09-06"), Some("2015-09-08")],
            )
            .into(),
            Series::new("ucsd_vitals_weight".into(), vec![Some("120"), Some("80")]).into(),
            Series::new("ucsd_vitals_height".into(), vec![Some("34"), None]).into(),
        ])
        .unwrap()
    }

    fn weight_conversion() -> Conversion {
        Conversion::ByVariable {
            schema: "vitals".to_string(),
            attribute: "weight".to_string(),
            operator: None,
        }
    }

    fn scalar_rule(groups: Vec<Group>) -> ImputationRule {
        ImputationRule {
            target_schema: "Labs".to_string(),
            target_variable: "score".to_string(),
            target_choice: None,
            condition: None,
            groups,
            forms: vec![("vitals".to_string(), "weight".to_string())],
        }
    }

    fn choice_rule(threshold_op: BinaryOp, threshold: i64) -> ImputationRule {
        ImputationRule {
            target_schema: "Labs".to_string(),
            target_variable: "bmi_class".to_string(),
            target_choice: Some(TargetChoice {
                name: Some("003".to_string()),
                title: Some("Obese".to_string()),
            }),
            condition: Some(Condition::All),
            groups: vec![Group {
                conversions: vec![weight_conversion()],
                logic: Some(Logic {
                    operator: None,
                    imputations: vec![Imputation {
                        operator: threshold_op,
                        value: json!(threshold),
                    }],
                }),
            }],
            forms: vec![("vitals".to_string(), "weight".to_string())],
        }
    }

    #[test]
    fn scalar_target_passes_raw_value_through() {
        let rule = scalar_rule(vec![Group {
            conversions: vec![
                weight_conversion(),
                Conversion::ByValue {
                    value: json!(2),
                    operator: Some(BinaryOp::Div),
                },
            ],
            logic: None,
        }]);
        let mut data = frame();
        let compiled = CompiledImputation::new(&rule, false);
        let outcome = compiled.apply(&mut data, "ucsd", "drsc").unwrap();
        assert_eq!(outcome.imputed_rows, 2);
        assert_eq!(cell_string(&data, "drsc_Labs_score", 0).as_deref(), Some("60"));
        assert_eq!(cell_string(&data, "drsc_Labs_score", 1).as_deref(), Some("40"));
    }

    #[test]
    fn scalar_target_uses_only_the_first_group() {
        let rule = scalar_rule(vec![
            Group {
                conversions: vec![weight_conversion()],
                logic: None,
            },
            Group {
                conversions: vec![Conversion::ByValue {
                    value: json!(999),
                    operator: None,
                }],
                logic: None,
            },
        ]);
        let mut data = frame();
        CompiledImputation::new(&rule, false)
            .apply(&mut data, "ucsd", "drsc")
            .unwrap();
        assert_eq!(cell_string(&data, "drsc_Labs_score", 0).as_deref(), Some("120"));
    }

    #[test]
    fn choice_target_writes_choice_code_when_truthy() {
        let rule = choice_rule(BinaryOp::Gt, 100);
        let mut data = frame();
        let outcome = CompiledImputation::new(&rule, true)
            .apply(&mut data, "ucsd", "drsc")
            .unwrap();
        // Only P01's weight exceeds the threshold.
        assert_eq!(outcome.imputed_rows, 1);
        assert_eq!(
            cell_string(&data, "drsc_Labs_bmi_class", 0).as_deref(),
            Some("003")
        );
        assert_eq!(cell_string(&data, "drsc_Labs_bmi_class", 1), None);
    }

    #[test]
    fn unresolvable_group_leaves_row_missing() {
        let rule = scalar_rule(vec![Group {
            conversions: vec![Conversion::ByVariable {
                schema: "vitals".to_string(),
                attribute: "height".to_string(),
                operator: None,
            }],
            logic: None,
        }]);
        let mut data = frame();
        CompiledImputation::new(&rule, false)
            .apply(&mut data, "ucsd", "drsc")
            .unwrap();
        assert_eq!(cell_string(&data, "drsc_Labs_score", 0).as_deref(), Some("34"));
        assert_eq!(cell_string(&data, "drsc_Labs_score", 1), None);
    }

    #[test]
    fn existing_target_values_are_never_recomputed() {
        let rule = scalar_rule(vec![Group {
            conversions: vec![
                weight_conversion(),
                Conversion::ByValue {
                    value: json!(2),
                    operator: Some(BinaryOp::Mul),
                },
            ],
            logic: None,
        }]);
        let mut data = frame();
        data.with_column(Series::new(
            "drsc_Labs_score".into(),
            vec![Some("420"), None::<&str>],
        ))
        .unwrap();
        let outcome = CompiledImputation::new(&rule, false)
            .apply(&mut data, "ucsd", "drsc")
            .unwrap();
        assert_eq!(outcome.skipped_rows, 1);
        assert_eq!(outcome.imputed_rows, 1);
        assert_eq!(cell_string(&data, "drsc_Labs_score", 0).as_deref(), Some("420"));
        assert_eq!(cell_string(&data, "drsc_Labs_score", 1).as_deref(), Some("160"));
    }

    #[test]
    fn collect_date_takes_the_earliest_source_date() {
        let rule = scalar_rule(vec![Group {
            conversions: vec![weight_conversion()],
            logic: None,
        }]);
        let mut data = frame();
        data.with_column(Series::new(
            "drsc_Labs_collect_date".into(),
            vec![Some("2015-09-07"), None::<&str>],
        ))
        .unwrap();
        CompiledImputation::new(&rule, false)
            .apply(&mut data, "ucsd", "drsc")
            .unwrap();
        // Earlier source date wins on row 0; row 1 takes the only date seen.
        assert_eq!(
            cell_string(&data, "drsc_Labs_collect_date", 0).as_deref(),
            Some("2015-09-06")
        );
        assert_eq!(
            cell_string(&data, "drsc_Labs_collect_date", 1).as_deref(),
            Some("2015-09-08")
        );
    }
}
