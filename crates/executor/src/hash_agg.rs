//! Hash-bucketed GROUP BY / aggregation operator.

use crate::filter::eval_resolved_expr;
use crate::{ExecutionContext, Executor};
use common::{DbError, DbResult, ExecutionStats, Row};
use expr::{eval_arith, AggFunc, ArithOp};
use planner::{ResolvedAggregate, ResolvedExpr};
use std::time::Instant;
use types::Value;

/// Running accumulator for one aggregate call on one group bucket.
#[derive(Clone)]
enum AggAccumulator {
    Count { count: i64 },
    CountStar { count: i64 },
    Sum { total: Option<Value> },
    Avg { total: Option<Value>, count: i64 },
    Min { current: Option<Value> },
    Max { current: Option<Value> },
}

impl AggAccumulator {
    fn new(func: AggFunc) -> Self {
        match func {
            AggFunc::Count => AggAccumulator::Count { count: 0 },
            AggFunc::CountStar => AggAccumulator::CountStar { count: 0 },
            AggFunc::Sum => AggAccumulator::Sum { total: None },
            AggFunc::Avg => AggAccumulator::Avg {
                total: None,
                count: 0,
            },
            AggFunc::Min => AggAccumulator::Min { current: None },
            AggFunc::Max => AggAccumulator::Max { current: None },
        }
    }

    /// Feed one input value (already evaluated from the aggregate's
    /// argument expression; `None` for `COUNT(*)`'s absent argument).
    fn update(&mut self, value: Option<Value>) -> DbResult<()> {
        match self {
            AggAccumulator::Count { count } => {
                if let Some(v) = &value {
                    if !v.is_null() {
                        *count += 1;
                    }
                }
            }
            AggAccumulator::CountStar { count } => {
                *count += 1;
            }
            AggAccumulator::Sum { total } => {
                if let Some(v) = value {
                    if !v.is_null() {
                        *total = Some(match total.take() {
                            None => v,
                            Some(t) => eval_arith(&t, ArithOp::Add, &v)?,
                        });
                    }
                }
            }
            AggAccumulator::Avg {
                total,
                count,
            } => {
                if let Some(v) = value {
                    if !v.is_null() {
                        *total = Some(match total.take() {
                            None => v,
                            Some(t) => eval_arith(&t, ArithOp::Add, &v)?,
                        });
                        *count += 1;
                    }
                }
            }
            AggAccumulator::Min { current } => {
                if let Some(v) = value {
                    if !v.is_null() {
                        let replace = match current {
                            None => true,
                            Some(c) => matches!(v.cmp_same_type(c), Some(std::cmp::Ordering::Less)),
                        };
                        if replace {
                            *current = Some(v);
                        }
                    }
                }
            }
            AggAccumulator::Max { current } => {
                if let Some(v) = value {
                    if !v.is_null() {
                        let replace = match current {
                            None => true,
                            Some(c) => {
                                matches!(v.cmp_same_type(c), Some(std::cmp::Ordering::Greater))
                            }
                        };
                        if replace {
                            *current = Some(v);
                        }
                    }
                }
            }
        }
        Ok(())
    }

    fn finish(self) -> DbResult<Value> {
        Ok(match self {
            AggAccumulator::Count { count } => Value::BigInt(count),
            AggAccumulator::CountStar { count } => Value::BigInt(count),
            AggAccumulator::Sum { total } => total.unwrap_or(Value::Null),
            AggAccumulator::Avg { total, count } => match total {
                None => Value::Null,
                Some(t) if count > 0 => eval_arith(&t, ArithOp::Divide, &Value::BigInt(count))?,
                Some(_) => Value::Null,
            },
            AggAccumulator::Min { current } => current.unwrap_or(Value::Null),
            AggAccumulator::Max { current } => current.unwrap_or(Value::Null),
        })
    }
}

/// Hash-bucketed GROUP BY / aggregation operator (spec.md §4.5).
///
/// Blocking: consumes the entire input on `open`, computing one bucket
/// per distinct `group_by` tuple keyed by `Value`'s `Eq`/`Hash` impl,
/// then emits one row per bucket (group-by values followed by the
/// finished aggregate values, in declaration order) on successive
/// `next` calls. A query with aggregates but no `GROUP BY` always
/// produces exactly one row, even over an empty input (the SQL
/// "grand aggregate" rule) — `COUNT(*)` over zero rows is `0`, every
/// other aggregate over zero rows is `NULL`.
pub struct HashedGroupAggregateExec {
    input: Box<dyn Executor>,
    group_by: Vec<ResolvedExpr>,
    aggregates: Vec<ResolvedAggregate>,
    schema: Vec<String>,
    output: Vec<Row>,
    cursor: usize,
    marked_cursor: Option<usize>,
    stats: ExecutionStats,
}

impl HashedGroupAggregateExec {
    pub fn new(
        input: Box<dyn Executor>,
        group_by: Vec<ResolvedExpr>,
        aggregates: Vec<ResolvedAggregate>,
        schema: Vec<String>,
    ) -> Self {
        Self {
            input,
            group_by,
            aggregates,
            schema,
            output: Vec::new(),
            cursor: 0,
            marked_cursor: None,
            stats: ExecutionStats::default(),
        }
    }

    fn group_key(&self, row: &Row) -> DbResult<Vec<Value>> {
        self.group_by
            .iter()
            .map(|expr| eval_resolved_expr(expr, row))
            .collect()
    }
}

impl Executor for HashedGroupAggregateExec {
    fn open(&mut self, ctx: &mut ExecutionContext) -> DbResult<()> {
        let start = Instant::now();
        self.stats = ExecutionStats::default();

        self.input.open(ctx)?;

        let mut buckets: Vec<(Vec<Value>, Vec<AggAccumulator>)> = Vec::new();

        while let Some(row) = self.input.next(ctx)? {
            let key = self.group_key(&row)?;
            let bucket = match buckets.iter_mut().find(|(k, _)| {
                k.len() == key.len()
                    && k.iter().zip(key.iter()).all(|(a, b)| a.eq_same_type(b).unwrap_or(a == b))
            }) {
                Some((_, accs)) => accs,
                None => {
                    let accs = self
                        .aggregates
                        .iter()
                        .map(|a| AggAccumulator::new(a.func))
                        .collect();
                    buckets.push((key.clone(), accs));
                    &mut buckets.last_mut().unwrap().1
                }
            };

            for (acc, agg) in bucket.iter_mut().zip(self.aggregates.iter()) {
                let value = match &agg.arg {
                    Some(expr) => Some(eval_resolved_expr(expr, &row)?),
                    None => None,
                };
                acc.update(value)?;
            }
        }

        if buckets.is_empty() && self.group_by.is_empty() && !self.aggregates.is_empty() {
            let accs = self
                .aggregates
                .iter()
                .map(|a| AggAccumulator::new(a.func))
                .collect();
            buckets.push((Vec::new(), accs));
        }

        self.output.clear();
        for (key, accs) in buckets {
            let mut values = key;
            for acc in accs {
                values.push(acc.finish()?);
            }
            self.output.push(Row::new(values));
        }
        self.cursor = 0;
        self.marked_cursor = None;

        self.stats.open_time = start.elapsed();
        Ok(())
    }

    fn next(&mut self, _ctx: &mut ExecutionContext) -> DbResult<Option<Row>> {
        let start = Instant::now();
        let row = if self.cursor < self.output.len() {
            let row = self.output[self.cursor].clone();
            self.cursor += 1;
            self.stats.rows_produced += 1;
            Some(row)
        } else {
            None
        };
        self.stats.total_next_time += start.elapsed();
        Ok(row)
    }

    fn close(&mut self, ctx: &mut ExecutionContext) -> DbResult<()> {
        let start = Instant::now();
        self.output.clear();
        self.marked_cursor = None;
        self.input.close(ctx)?;
        self.stats.close_time = start.elapsed();
        Ok(())
    }

    fn schema(&self) -> &[String] {
        &self.schema
    }

    fn stats(&self) -> Option<&ExecutionStats> {
        Some(&self.stats)
    }

    fn mark_current_position(&mut self, _ctx: &mut ExecutionContext) -> DbResult<()> {
        self.marked_cursor = Some(self.cursor);
        Ok(())
    }

    fn reset_to_last_mark(&mut self, _ctx: &mut ExecutionContext) -> DbResult<()> {
        self.cursor = self.marked_cursor.ok_or_else(|| {
            DbError::Executor("no mark set for hashed group aggregate".into())
        })?;
        Ok(())
    }
}
