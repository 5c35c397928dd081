use std::collections::BTreeSet;

use crate::step::{Step, StepParams};

/// Indexes of steps superseded by a later step in `steps`.
///
/// A later step with the same step id replaces an earlier one, and a later
/// filter on the same sheet and column replaces an earlier filter. A formula
/// set on a column is replaced when the very next step sets that column's
/// formula again.
pub fn steps_to_skip(steps: &[Step]) -> BTreeSet<usize> {
    let mut skipped = BTreeSet::new();
    for (index, step) in steps.iter().enumerate() {
        let superseded = steps[index + 1..]
            .iter()
            .any(|later| later.step_id == step.step_id || same_filter_target(&step.params, &later.params))
            || steps
                .get(index + 1)
                .is_some_and(|next| same_formula_target(&step.params, &next.params));
        if superseded {
            skipped.insert(index);
        }
    }
    skipped
}

fn same_filter_target(earlier: &StepParams, later: &StepParams) -> bool {
    match (earlier, later) {
        (StepParams::FilterColumn(a), StepParams::FilterColumn(b)) => {
            a.sheet_index == b.sheet_index && a.column_id == b.column_id
        }
        _ => false,
    }
}

fn same_formula_target(earlier: &StepParams, next: &StepParams) -> bool {
    match (earlier, next) {
        (StepParams::SetColumnFormula(a), StepParams::SetColumnFormula(b)) => {
            a.sheet_index == b.sheet_index && a.column_id == b.column_id
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::steps::{FilterColumnParams, RenameColumnParams, SetColumnFormulaParams};
    use stepsheet_core::{ColumnId, FilterOperator};

    fn filter(sheet_index: usize, column: &str) -> Step {
        Step::new(StepParams::FilterColumn(FilterColumnParams {
            sheet_index,
            column_id: ColumnId::from(column),
            operator: FilterOperator::And,
            filters: Vec::new(),
        }))
    }

    #[test]
    fn later_filter_on_same_column_supersedes() {
        let steps = vec![filter(0, "c1"), filter(0, "c2"), filter(1, "c1"), filter(0, "c1")];
        assert_eq!(steps_to_skip(&steps), BTreeSet::from([0]));
    }

    #[test]
    fn same_step_id_supersedes() {
        let first = Step::new(StepParams::RenameColumn(RenameColumnParams {
            sheet_index: 0,
            column_id: ColumnId::from("c1"),
            new_column_header: "X".into(),
        }));
        let mut again = first.clone();
        if let StepParams::RenameColumn(p) = &mut again.params {
            p.new_column_header = "Y".into();
        }
        let steps = vec![first, filter(0, "c1"), again];
        assert_eq!(steps_to_skip(&steps), BTreeSet::from([0]));
    }

    fn formula(column: &str, new_formula: &str) -> Step {
        Step::new(StepParams::SetColumnFormula(SetColumnFormulaParams {
            sheet_index: 0,
            column_id: ColumnId::from(column),
            new_formula: new_formula.into(),
        }))
    }

    #[test]
    fn only_an_adjacent_formula_on_the_same_column_supersedes() {
        let steps = vec![
            formula("c1", "=1"),
            formula("c1", "=2"),
            formula("c2", "=3"),
            filter(0, "c3"),
            formula("c2", "=4"),
        ];
        assert_eq!(steps_to_skip(&steps), BTreeSet::from([0]));
    }
}
