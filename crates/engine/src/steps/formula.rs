use serde::{Deserialize, Serialize};
use stepsheet_core::{ColumnId, Expr, State, normalize_formula, parse_formula};
use stepsheet_script::Statement;

use super::{exec, header_of, require_column, sheet_name, var_name};
use crate::error::{EditError, ValidationError};
use crate::step::StepPerformer;

const SET_COLUMN_FORMULA: &str = "set_column_formula";

/// Recompute a column from a formula over the other columns of its sheet.
///
/// The formula is evaluated once, when the step runs. Columns that depend on
/// this one keep the values they had.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetColumnFormulaParams {
    pub sheet_index: usize,
    pub column_id: ColumnId,
    pub new_formula: String,
}

impl SetColumnFormulaParams {
    fn expr(&self, prior: &State) -> Result<Expr, ValidationError> {
        let header = require_column(prior, self.sheet_index, &self.column_id)?;
        let table = prior
            .table(self.sheet_index)
            .map_err(|_| ValidationError::NoSheet(self.sheet_index))?;
        let invalid = |reason: String| ValidationError::InvalidFormula {
            formula: self.new_formula.clone(),
            reason,
        };
        let expr = parse_formula(&self.new_formula, &table.headers()).map_err(|e| invalid(e.to_string()))?;
        if expr.columns().contains(&header) {
            return Err(invalid(format!("{header} cannot reference itself")));
        }
        Ok(expr)
    }
}

impl StepPerformer for SetColumnFormulaParams {
    fn step_kind_id(&self) -> &'static str {
        SET_COLUMN_FORMULA
    }

    fn step_display_name(&self) -> &'static str {
        "Set Column Formula"
    }

    fn validate(&self, prior: &State) -> Result<(), ValidationError> {
        self.expr(prior).map(|_| ())
    }

    fn execute(&self, prior: &State) -> Result<State, EditError> {
        let expr = self.expr(prior)?;
        let table = prior.table(self.sheet_index).map_err(exec(SET_COLUMN_FORMULA))?;
        let values = expr.evaluate(table).map_err(exec(SET_COLUMN_FORMULA))?;
        let mut post = prior.clone();
        post.set_column_values(self.sheet_index, &self.column_id, values)
            .map_err(exec(SET_COLUMN_FORMULA))?;
        post.set_formula(self.sheet_index, &self.column_id, normalize_formula(&self.new_formula))
            .map_err(exec(SET_COLUMN_FORMULA))?;
        Ok(post)
    }

    fn transpile(&self, prior: &State) -> Result<Vec<Statement>, EditError> {
        Ok(vec![Statement::SetColumn {
            var: var_name(prior, self.sheet_index, SET_COLUMN_FORMULA)?,
            header: header_of(prior, self.sheet_index, &self.column_id, SET_COLUMN_FORMULA)?,
            expr: self.expr(prior)?,
        }])
    }

    fn describe(&self, df_names: &[String]) -> String {
        format!(
            "Set {} in {} to {}",
            self.column_id,
            sheet_name(df_names, self.sheet_index),
            normalize_formula(&self.new_formula)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stepsheet_core::{AddTable, CellValue, ColumnType, Provenance, Table};

    fn prior() -> State {
        let table = Table::new(vec![
            ("A".into(), vec![CellValue::Integer(1), CellValue::Integer(2)]),
            ("B".into(), vec![CellValue::Integer(0), CellValue::Integer(0)]),
        ])
        .unwrap();
        let mut state = State::new();
        state.add_table(table, Provenance::Passed, AddTable::append()).unwrap();
        state
    }

    fn set_b(formula: &str) -> SetColumnFormulaParams {
        SetColumnFormulaParams {
            sheet_index: 0,
            column_id: ColumnId::from("c2"),
            new_formula: formula.into(),
        }
    }

    #[test]
    fn formula_recomputes_the_column() {
        let prior = prior();
        let params = set_b("=A / 2");
        params.validate(&prior).unwrap();
        let post = params.execute(&prior).unwrap();

        let b = &post.table(0).unwrap().columns()[1];
        assert_eq!(b.dtype(), ColumnType::Float);
        assert_eq!(b.values(), &[CellValue::Float(0.5), CellValue::Float(1.0)]);
        assert_eq!(post.column_formulas(0).unwrap()[&ColumnId::from("c2")], "=A / 2");
        assert_eq!(prior.table(0).unwrap().columns()[1].values()[0], CellValue::Integer(0));
        assert_eq!(params.describe(prior.names()), "Set c2 in df1 to =A / 2");
    }

    #[test]
    fn empty_formula_zeroes_the_column() {
        let post = set_b("").execute(&prior()).unwrap();
        assert_eq!(post.column_formulas(0).unwrap()[&ColumnId::from("c2")], "=0");
        assert_eq!(
            post.table(0).unwrap().columns()[1].values(),
            &[CellValue::Integer(0), CellValue::Integer(0)]
        );
    }

    #[test]
    fn formula_must_name_other_existing_columns() {
        let prior = prior();
        assert!(matches!(
            set_b("=B + 1").validate(&prior),
            Err(ValidationError::InvalidFormula { .. })
        ));
        assert!(matches!(
            set_b("=Z + 1").validate(&prior),
            Err(ValidationError::InvalidFormula { .. })
        ));
        let missing = SetColumnFormulaParams {
            column_id: ColumnId::from("c9"),
            ..set_b("=A")
        };
        assert!(matches!(missing.validate(&prior), Err(ValidationError::NoColumn { .. })));
    }
}
