//! End-to-end tests: tuple files in, SELECT pipeline, tuple lines out.

use pipedb_core::schema::{Column, Schema};
use pipedb_core::{DataType, Error, SpillConfig, Tuple};
use pipedb_query::ast::{parse_expr, AggregateSpec, JoinCondition, SortKey};
use pipedb_query::eval::Program;
use pipedb_query::executor::{select, PlanRunner, ProjectItem, QueryPlan, Relation};
use proptest::prelude::*;
use std::fs::File;
use std::io::{BufReader, Write};
use std::path::Path;

const EMPLOYEES: &str = "\
1|Alice|10|1200.50
2|Bob|20|800
3|Alfred|10|950
4|Carol|30|2000
5|Dave|20|700.25
";

const DEPARTMENTS: &str = "\
10|Engineering
20|Operations
30|Sales
";

fn write_file(dir: &Path, name: &str, contents: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    let mut file = File::create(&path).unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    path
}

fn load(path: &Path, alias: &str, columns: &[(&str, DataType)]) -> Relation {
    // Files carry bare column names; the alias qualifies them.
    let schema = Schema::new(
        columns
            .iter()
            .map(|(name, data_type)| Column::new(*name, *data_type))
            .collect(),
    )
    .requalify(alias);
    let reader = BufReader::new(File::open(path).unwrap());
    Relation::read_from(reader, alias, schema).unwrap()
}

fn inputs(dir: &Path) -> (Relation, Relation) {
    let emp = load(
        &write_file(dir, "emp.tbl", EMPLOYEES),
        "e",
        &[
            ("id", DataType::Integer),
            ("name", DataType::Varchar),
            ("dept_id", DataType::Integer),
            ("salary", DataType::Decimal),
        ],
    );
    let dept = load(
        &write_file(dir, "dept.tbl", DEPARTMENTS),
        "d",
        &[("id", DataType::Integer), ("title", DataType::Varchar)],
    );
    (emp, dept)
}

#[test]
fn test_join_filter_group_sort_project() {
    let dir = tempfile::tempdir().unwrap();
    let (emp, dept) = inputs(dir.path());

    let plan = QueryPlan::scan(emp)
        .join(dept, JoinCondition::parse("e.dept_id = d.id").unwrap())
        .filter(parse_expr("e.salary > 750 AND d.title <> 'Sales'").unwrap())
        .group_by(["d.title"])
        .aggregate(AggregateSpec::count_star().alias("headcount"))
        .aggregate(AggregateSpec::parse("sum(e.salary)").unwrap().alias("payroll"))
        .order_by(SortKey::desc("payroll"))
        .project(vec![
            ProjectItem::column("d.title").alias("department"),
            ProjectItem::column("payroll"),
            ProjectItem::column("headcount"),
        ]);

    let result = PlanRunner::new(SpillConfig::default()).run(plan).unwrap();
    let mut out = Vec::new();
    result.write_to(&mut out).unwrap();

    assert_eq!(result.schema().names(), vec!["department", "payroll", "headcount"]);
    assert_eq!(
        String::from_utf8(out).unwrap(),
        "Engineering|2150.5000000000|2\nOperations|800.0000000000|1\n"
    );
}

#[test]
fn test_pipeline_with_spilling_operators() {
    let dir = tempfile::tempdir().unwrap();
    let scratch = dir.path().join("scratch");
    let (emp, dept) = inputs(dir.path());

    let plan = || {
        QueryPlan::scan(emp.clone())
            .join(dept.clone(), JoinCondition::new("d.id", "e.dept_id"))
            .order_by(SortKey::asc("d.title"))
            .order_by(SortKey::desc("e.salary"))
            .project(vec![ProjectItem::column("e.name")])
    };

    let spilled = PlanRunner::new(SpillConfig::new(64).scratch_dir(&scratch))
        .run(plan())
        .unwrap();
    let memory = PlanRunner::default().run(plan()).unwrap();

    assert_eq!(spilled, memory);
    assert_eq!(
        memory.column("e.name").unwrap(),
        vec!["Alice", "Alfred", "Bob", "Dave", "Carol"]
    );
    assert_eq!(std::fs::read_dir(&scratch).unwrap().count(), 0);
}

#[test]
fn test_self_join_through_aliases() {
    let dir = tempfile::tempdir().unwrap();
    let (emp, _) = inputs(dir.path());
    let peer = emp.alias("p");

    let plan = QueryPlan::scan(emp)
        .join(peer, JoinCondition::new("e.dept_id", "p.dept_id"))
        .filter(parse_expr("e.id < p.id").unwrap())
        .order_by(SortKey::asc("e.id"))
        .project(vec![
            ProjectItem::column("e.name"),
            ProjectItem::column("p.name"),
        ]);
    let result = PlanRunner::default().run(plan).unwrap();

    let pairs: Vec<(String, String)> = result
        .iter()
        .map(|t| (t.fields()[0].clone(), t.fields()[1].clone()))
        .collect();
    assert_eq!(
        pairs,
        vec![
            ("Alice".to_string(), "Alfred".to_string()),
            ("Bob".to_string(), "Dave".to_string()),
        ]
    );
}

#[test]
fn test_global_aggregate_over_empty_selection() {
    let dir = tempfile::tempdir().unwrap();
    let (emp, _) = inputs(dir.path());

    let plan = QueryPlan::scan(emp)
        .filter(parse_expr("e.name LIKE 'Z%'").unwrap())
        .aggregate(AggregateSpec::count_star())
        .aggregate(AggregateSpec::parse("avg(e.salary)").unwrap());
    let result = PlanRunner::default().run(plan).unwrap();

    assert_eq!(result.len(), 1);
    assert_eq!(result.rows()[0].fields(), &["0", "0.0000000000"]);
}

#[test]
fn test_missing_column_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let (emp, _) = inputs(dir.path());
    let plan = QueryPlan::scan(emp).filter(parse_expr("e.bonus > 0").unwrap());
    let err = PlanRunner::default().run(plan).unwrap_err();
    assert!(matches!(err, Error::ColumnNotFound { .. }));
}

#[test]
fn test_disconnected_join_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let (emp, dept) = inputs(dir.path());
    let plan = QueryPlan {
        relations: vec![emp, dept],
        ..QueryPlan::default()
    };
    let err = PlanRunner::default().run(plan).unwrap_err();
    assert!(matches!(err, Error::InvalidPlan { .. }));
}

fn numbers(values: &[i64]) -> Relation {
    let schema = Schema::qualified("t", &[("x", DataType::Integer), ("y", DataType::Integer)]);
    let rows = values
        .iter()
        .enumerate()
        .map(|(i, v)| Tuple::new(vec![v.to_string(), (i as i64 - 10).to_string()]))
        .collect();
    Relation::from_rows("t", schema, rows).unwrap()
}

proptest! {
    #[test]
    fn selection_is_a_filter(
        values in prop::collection::vec(-50i64..50, 0..60),
        threshold in -50i64..50,
        op in prop::sample::select(vec!["<", "<=", "=", "<>", ">", ">="]),
    ) {
        let text = format!("t.x {op} {threshold} OR t.y + 1 = 0");
        let expr = parse_expr(&text).unwrap();
        let input = numbers(&values);

        let program = Program::from_expr(&expr).unwrap();
        let bound = program.bind(input.schema()).unwrap();
        let expected: Vec<Tuple> = input
            .iter()
            .filter(|t| bound.matches(t).unwrap())
            .cloned()
            .collect();

        let selected = select(input.clone(), Some(&expr)).unwrap();
        prop_assert_eq!(selected.schema(), input.schema());
        let actual: Vec<Tuple> = selected.iter().cloned().collect();
        prop_assert_eq!(actual, expected);
    }
}
