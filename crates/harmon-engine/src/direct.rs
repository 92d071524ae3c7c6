//! Direct-rule application: 1:1 variable copies with optional choice
//! translation.

use polars::prelude::{DataFrame, NamedFrom, Series};
use tracing::{debug, warn};

use harmon_ingest::{cell_string, qualified_column};
use harmon_model::{Attribute, ChoiceMap, Diagnostic, DirectRule};

use crate::error::Result;

/// What happens when the target column already holds a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverwritePolicy {
    /// Replace the target column wholesale; later rules win.
    #[default]
    Overwrite,
    /// Only fill rows whose target cell is empty.
    SkipExisting,
}

/// How source cells are rewritten into target cells, decided once per rule.
#[derive(Debug)]
enum Translation<'a> {
    /// Explicit source-code to target-code table from the rule itself.
    Explicit(&'a [ChoiceMap]),
    /// Source is a choice and target is not: codes flatten to their labels.
    Flatten(&'a Attribute),
    /// Plain value copy.
    Identity,
}

/// A direct rule bound to its source metadata and overwrite policy.
#[derive(Debug)]
pub struct CompiledDirect<'a> {
    rule: &'a DirectRule,
    translation: Translation<'a>,
    policy: OverwritePolicy,
}

/// Per-rule application counts plus translation diagnostics.
#[derive(Debug, Default)]
pub struct DirectOutcome {
    pub copied_rows: usize,
    pub skipped_rows: usize,
    pub diagnostics: Vec<Diagnostic>,
}

impl<'a> CompiledDirect<'a> {
    /// Picks the translation mode for a rule.
    ///
    /// An explicit `choices_mapping` always wins. Without one, a choice
    /// source feeding a non-choice target flattens codes to their display
    /// labels; everything else copies values verbatim.
    pub fn new(
        rule: &'a DirectRule,
        source_attribute: Option<&'a Attribute>,
        target_is_choice: bool,
        policy: OverwritePolicy,
    ) -> Self {
        let translation = match rule.choices_mapping.as_deref() {
            Some(table) if !table.is_empty() => Translation::Explicit(table),
            _ => match source_attribute {
                Some(attribute) if attribute.is_choice() && !target_is_choice => {
                    Translation::Flatten(attribute)
                }
                _ => Translation::Identity,
            },
        };
        Self {
            rule,
            translation,
            policy,
        }
    }

    /// Applies the rule to every row, writing the target value column and
    /// backfilling the target collect date from the source form.
    pub fn apply(
        &self,
        frame: &mut DataFrame,
        project: &str,
        target_project: &str,
    ) -> Result<DirectOutcome> {
        let source_column =
            qualified_column(project, &self.rule.source_schema, &self.rule.source_variable);
        let target_column = qualified_column(
            target_project,
            &self.rule.target_schema,
            &self.rule.target_variable,
        );
        if frame.column(&source_column).is_err() {
            warn!(
                source = source_column,
                target = target_column,
                "source column absent; target left empty"
            );
        }

        let height = frame.height();
        let mut outcome = DirectOutcome::default();
        let mut cells: Vec<Option<String>> = Vec::with_capacity(height);
        for row in 0..height {
            let existing = cell_string(frame, &target_column, row);
            if self.policy == OverwritePolicy::SkipExisting && existing.is_some() {
                outcome.skipped_rows += 1;
                cells.push(existing);
                continue;
            }
            let translated = cell_string(frame, &source_column, row)
                .and_then(|code| self.translate(&code, &mut outcome.diagnostics));
            if translated.is_some() {
                outcome.copied_rows += 1;
            }
            cells.push(translated);
        }
        frame.with_column(Series::new(target_column.as_str().into(), cells))?;
        self.backfill_collect_date(frame, project, target_project)?;

        debug!(
            target = target_column,
            copied = outcome.copied_rows,
            skipped = outcome.skipped_rows,
            diagnostics = outcome.diagnostics.len(),
            "applied direct rule"
        );
        Ok(outcome)
    }

    fn translate(&self, code: &str, diagnostics: &mut Vec<Diagnostic>) -> Option<String> {
        match &self.translation {
            Translation::Explicit(table) => {
                let hit = table
                    .iter()
                    .find(|entry| entry.source == code)
                    .map(|entry| entry.target.clone());
                if hit.is_none() {
                    diagnostics.push(Diagnostic::new(
                        &self.rule.source_schema,
                        &self.rule.source_variable,
                        format!("source code {code:?} has no mapped target code"),
                    ));
                }
                hit
            }
            Translation::Flatten(attribute) => {
                // Undeclared codes pass through untouched rather than
                // silently disappearing.
                Some(
                    attribute
                        .choice_title(code)
                        .map_or_else(|| code.to_string(), str::to_string),
                )
            }
            Translation::Identity => Some(code.to_string()),
        }
    }

    /// Copies the source form's collect date into the target schema's
    /// collect-date column for rows that do not have one yet.
    fn backfill_collect_date(
        &self,
        frame: &mut DataFrame,
        project: &str,
        target_project: &str,
    ) -> Result<()> {
        let source_column = qualified_column(
            project,
            &self.rule.source_schema,
            &self.rule.source_collect_date,
        );
        let target_column = qualified_column(
            target_project,
            &self.rule.target_schema,
            &self.rule.target_collect_date,
        );
        if frame.column(&source_column).is_err() {
            return Ok(());
        }

        let height = frame.height();
        let mut cells: Vec<Option<String>> = Vec::with_capacity(height);
        for row in 0..height {
            let existing = cell_string(frame, &target_column, row);
            cells.push(existing.or_else(|| cell_string(frame, &source_column, row)));
        }
        frame.with_column(Series::new(target_column.as_str().into(), cells))?;
        Ok(())
    }
}
