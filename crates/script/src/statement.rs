use std::path::PathBuf;

use stepsheet_core::{
    Aggregation, BinaryOp, CellValue, ColumnHeader, Expr, FilterCondition, FilterOperator, FilterSpec, PivotSpec, Table,
};

use crate::literal::{header_literal, number_literal, path_literal, string_literal, value_literal};

/// The pandas import every non-empty script starts with.
pub const PRELUDE: &str = "import pandas as pd";

/// One generated statement, kept typed until it is rendered.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Construct {
        var: String,
        table: Table,
    },
    ReadCsv {
        var: String,
        path: PathBuf,
    },
    RenameColumns {
        var: String,
        renames: Vec<(ColumnHeader, ColumnHeader)>,
    },
    DropColumns {
        var: String,
        headers: Vec<ColumnHeader>,
    },
    InsertColumn {
        var: String,
        index: usize,
        header: ColumnHeader,
        fill: CellValue,
    },
    MoveColumn {
        var: String,
        header: ColumnHeader,
        index: usize,
    },
    FilterRows {
        var: String,
        header: ColumnHeader,
        spec: FilterSpec,
    },
    CastToFloat {
        var: String,
        header: ColumnHeader,
    },
    SetCell {
        var: String,
        row: usize,
        header: ColumnHeader,
        value: CellValue,
    },
    CopyTable {
        from: String,
        to: String,
    },
    DeleteTable {
        var: String,
    },
    RenameTable {
        from: String,
        to: String,
    },
    Pivot {
        source: String,
        target: String,
        spec: PivotSpec,
    },
    SetColumn {
        var: String,
        header: ColumnHeader,
        expr: Expr,
    },
}

fn condition_expr(var: &str, column: &str, condition: &FilterCondition) -> String {
    let series = format!("{var}[{column}]");
    match condition {
        FilterCondition::Greater(v) => format!("{series} > {}", number_literal(*v)),
        FilterCondition::GreaterThanOrEqual(v) => format!("{series} >= {}", number_literal(*v)),
        FilterCondition::Less(v) => format!("{series} < {}", number_literal(*v)),
        FilterCondition::LessThanOrEqual(v) => format!("{series} <= {}", number_literal(*v)),
        FilterCondition::NumberExactly(v) => format!("{series} == {}", number_literal(*v)),
        FilterCondition::NumberNotExactly(v) => format!("{series} != {}", number_literal(*v)),
        FilterCondition::Contains(s) => {
            format!("{series}.str.contains({}, na=False, regex=False)", string_literal(s))
        }
        FilterCondition::StringDoesNotContain(s) => {
            format!("~{series}.str.contains({}, na=False, regex=False)", string_literal(s))
        }
        FilterCondition::StringExactly(s) => format!("{series} == {}", string_literal(s)),
        FilterCondition::StringNotExactly(s) => format!("{series} != {}", string_literal(s)),
        FilterCondition::StartsWith(s) => {
            format!("{series}.str.startswith({}, na=False)", string_literal(s))
        }
        FilterCondition::EndsWith(s) => format!("{series}.str.endswith({}, na=False)", string_literal(s)),
        FilterCondition::BooleanIsTrue => format!("{series} == True"),
        FilterCondition::BooleanIsFalse => format!("{series} == False"),
        FilterCondition::Empty => format!("{series}.isna()"),
        FilterCondition::NotEmpty => format!("{series}.notnull()"),
    }
}

fn expr_code(var: &str, expr: &Expr, parent: u8) -> String {
    match expr {
        Expr::Literal(value) => value_literal(value),
        Expr::Column(header) => format!("{var}[{}]", header_literal(header)),
        Expr::Negate(inner) => match inner.as_ref() {
            Expr::Binary { .. } => format!("-({})", expr_code(var, inner, 0)),
            _ => format!("-{}", expr_code(var, inner, 50)),
        },
        Expr::Binary { op, left, right } => {
            let precedence = op.precedence();
            // The right operand of - and / binds tighter than its own level.
            let right_floor = match op {
                BinaryOp::Sub | BinaryOp::Div => precedence + 1,
                _ => precedence,
            };
            let code = format!(
                "{} {} {}",
                expr_code(var, left, precedence),
                op.symbol(),
                expr_code(var, right, right_floor)
            );
            if precedence < parent { format!("({code})") } else { code }
        }
    }
}

fn aggfunc_literal(agg: Aggregation) -> String {
    match agg {
        Aggregation::CountUnique => "pd.Series.nunique".to_string(),
        other => string_literal(other.name()),
    }
}

fn pivot_lines(source: &str, target: &str, spec: &PivotSpec) -> Vec<String> {
    if spec.is_empty() {
        return vec![format!("{target} = pd.DataFrame(data={{}})")];
    }
    let rows: Vec<String> = spec.rows.iter().map(header_literal).collect();
    let values: Vec<String> = spec.values.iter().map(|(header, _)| header_literal(header)).collect();
    let aggfunc: Vec<String> = spec
        .values
        .iter()
        .map(|(header, aggs)| {
            let aggs: Vec<String> = aggs.iter().map(|agg| aggfunc_literal(*agg)).collect();
            format!("{}: [{}]", header_literal(header), aggs.join(", "))
        })
        .collect();
    let mut lines = vec![
        format!(
            "unused_columns = {source}.columns.difference(set([{}]).union(set([{}])))",
            rows.join(", "),
            values.join(", ")
        ),
        format!("tmp_df = {source}.drop(unused_columns, axis=1)"),
        format!(
            "pivot_table = tmp_df.pivot_table(index=[{}], values=[{}], aggfunc={{{}}})",
            rows.join(", "),
            values.join(", "),
            aggfunc.join(", ")
        ),
        "pivot_table.columns = [' '.join(map(str, col)).strip() for col in pivot_table.columns.values]".to_string(),
    ];
    let nunique: Vec<String> = spec
        .values
        .iter()
        .filter(|(_, aggs)| aggs.contains(&Aggregation::CountUnique))
        .map(|(header, _)| {
            format!(
                "{}: {}",
                string_literal(&format!("{} nunique", header.flatten())),
                header_literal(&PivotSpec::output_header(header, Aggregation::CountUnique))
            )
        })
        .collect();
    if !nunique.is_empty() {
        lines.push(format!("pivot_table.rename(columns={{{}}}, inplace=True)", nunique.join(", ")));
    }
    lines.push(format!("{target} = pivot_table.reset_index()"));
    lines
}

fn table_literal(table: &Table) -> String {
    let columns: Vec<String> = table
        .columns()
        .iter()
        .map(|column| {
            let values: Vec<String> = column.values().iter().map(value_literal).collect();
            format!("{}: [{}]", header_literal(column.header()), values.join(", "))
        })
        .collect();
    format!("pd.DataFrame({{{}}})", columns.join(", "))
}

impl Statement {
    /// The variable this statement leaves bound, if any.
    pub fn target(&self) -> Option<&str> {
        match self {
            Statement::Construct { var, .. }
            | Statement::ReadCsv { var, .. }
            | Statement::RenameColumns { var, .. }
            | Statement::DropColumns { var, .. }
            | Statement::InsertColumn { var, .. }
            | Statement::MoveColumn { var, .. }
            | Statement::FilterRows { var, .. }
            | Statement::CastToFloat { var, .. }
            | Statement::SetCell { var, .. } => Some(var),
            Statement::SetColumn { var, .. } => Some(var),
            Statement::CopyTable { to, .. } | Statement::RenameTable { to, .. } => Some(to),
            Statement::Pivot { target, .. } => Some(target),
            Statement::DeleteTable { .. } => None,
        }
    }

    pub fn render(&self) -> Vec<String> {
        match self {
            Statement::Construct { var, table } => vec![format!("{var} = {}", table_literal(table))],
            Statement::ReadCsv { var, path } => {
                vec![format!("{var} = pd.read_csv({})", path_literal(path))]
            }
            Statement::RenameColumns { var, renames } => {
                if renames.is_empty() {
                    return Vec::new();
                }
                let pairs: Vec<String> = renames
                    .iter()
                    .map(|(from, to)| format!("{}: {}", header_literal(from), header_literal(to)))
                    .collect();
                vec![format!("{var}.rename(columns={{{}}}, inplace=True)", pairs.join(", "))]
            }
            Statement::DropColumns { var, headers } => {
                let headers: Vec<String> = headers.iter().map(header_literal).collect();
                vec![format!("{var}.drop([{}], axis=1, inplace=True)", headers.join(", "))]
            }
            Statement::InsertColumn { var, index, header, fill } => vec![format!(
                "{var}.insert({index}, {}, {})",
                header_literal(header),
                value_literal(fill)
            )],
            Statement::MoveColumn { var, header, index } => {
                let header = header_literal(header);
                vec![
                    format!("{var}_columns = [col for col in {var}.columns if col != {header}]"),
                    format!("{var}_columns.insert({index}, {header})"),
                    format!("{var} = {var}[{var}_columns]"),
                ]
            }
            Statement::FilterRows { var, header, spec } => {
                if spec.is_unrestricted() {
                    return Vec::new();
                }
                let column = header_literal(header);
                let mut exprs: Vec<String> = spec
                    .filters
                    .iter()
                    .map(|condition| condition_expr(var, &column, condition))
                    .collect();
                let mask = if exprs.len() == 1 {
                    exprs.remove(0)
                } else {
                    let joiner = match spec.operator {
                        FilterOperator::And => " & ",
                        FilterOperator::Or => " | ",
                    };
                    exprs
                        .iter()
                        .map(|expr| format!("({expr})"))
                        .collect::<Vec<_>>()
                        .join(joiner)
                };
                vec![format!("{var} = {var}[{mask}].reset_index(drop=True)")]
            }
            Statement::CastToFloat { var, header } => {
                let header = header_literal(header);
                vec![format!("{var}[{header}] = {var}[{header}].astype('float')")]
            }
            Statement::SetCell { var, row, header, value } => vec![format!(
                "{var}.at[{row}, {}] = {}",
                header_literal(header),
                value_literal(value)
            )],
            Statement::CopyTable { from, to } => vec![format!("{to} = {from}.copy(deep=True)")],
            Statement::DeleteTable { var } => vec![format!("del {var}")],
            Statement::RenameTable { from, to } => vec![format!("{to} = {from}"), format!("del {from}")],
            Statement::Pivot { source, target, spec } => pivot_lines(source, target, spec),
            Statement::SetColumn { var, header, expr } => vec![format!(
                "{var}[{}] = {}",
                header_literal(header),
                expr_code(var, expr, 0)
            )],
        }
    }
}

/// An ordered list of statements.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Script {
    statements: Vec<Statement>,
}

impl Script {
    pub fn new(statements: Vec<Statement>) -> Self {
        Self { statements }
    }

    pub fn statements(&self) -> &[Statement] {
        &self.statements
    }

    pub fn push(&mut self, statement: Statement) {
        self.statements.push(statement);
    }

    pub fn extend(&mut self, statements: impl IntoIterator<Item = Statement>) {
        self.statements.extend(statements);
    }

    /// Rendered lines, led by the pandas import unless nothing renders.
    pub fn lines(&self) -> Vec<String> {
        let body: Vec<String> = self.statements.iter().flat_map(Statement::render).collect();
        if body.is_empty() {
            return body;
        }
        std::iter::once(PRELUDE.to_string()).chain(body).collect()
    }

    pub fn to_code(&self) -> String {
        self.lines().join("\n")
    }
}
