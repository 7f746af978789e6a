//! Cost-based join ordering.
//!
//! `Planner` joins FROM-clause tables left-to-right in the order they were
//! written, which is correct but can pick a bad order for large multi-way
//! joins. `CostBasedPlanner` instead enumerates every left-deep join order
//! bottom-up with dynamic programming (the classic System R style: build
//! the best plan for every subset of joined tables from the best plans of
//! its smaller subsets) and binds whichever shape has the lowest estimated
//! cost.
//!
//! The enumeration only reorders the *join graph* of a single SELECT's FROM
//! clause; it reuses `Planner`'s `lower_to_logical`/`optimize`/`bind` for
//! everything else (filters, projection, GROUP BY, ORDER BY, LIMIT), so a
//! cost-planned query goes through the same binding and index-selection
//! logic the row-order planner does.

use crate::{LogicalPlan, OrderByExpr, Planner, PlanningContext, PhysicalPlan};
use common::DbResult;
use expr::{BinaryOp, Expr};
use parser::{JoinType, Statement};

/// Average tuples packed per page, used to turn a row count into a page
/// count for `num_block_ios`. Matches `FileScan`'s own costing (spec.md
/// §4.5): a sequential scan touches roughly one block per `ROWS_PER_PAGE`
/// rows.
pub const ROWS_PER_PAGE: f64 = 100.0;

/// Approximate B+Tree leaf fanout, used for the IndexScan cost formula
/// (SPEC_FULL.md §9 resolution #3): `num_block_ios ≈
/// ceil(num_tuples / tuples_per_leaf) + tree_height`.
pub const TUPLES_PER_LEAF: f64 = 100.0;

/// Default per-tuple byte estimate used when no sharper figure is
/// available; only affects `tuple_size`, which nothing here currently
/// costs by byte volume (kept for spec.md §3's full cost-estimate shape).
pub const DEFAULT_TUPLE_SIZE: f64 = 64.0;

/// A plan node's cost estimate, per spec.md §3: `{numTuples, tupleSize,
/// cpuCost, numBlockIOs, numLargeSeeks}`. `total` is the quantity
/// `CostBasedPlanner`/`Planner::bind`'s access-method choice minimizes,
/// spec.md §4.6's `cpuCost + c·numBlockIOs`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Cost {
    pub num_tuples: f64,
    pub tuple_size: f64,
    pub cpu_cost: f64,
    pub num_block_ios: f64,
    pub num_large_seeks: f64,
}

impl Cost {
    /// `cpuCost + c * numBlockIOs`, spec.md §4.6's cost-selection formula.
    /// `c` is `PlanningContext::cost_constant`.
    pub fn total(&self, c: f64) -> f64 {
        self.cpu_cost + c * self.num_block_ios
    }
}

/// Cost of a full sequential scan over `row_count` rows (`FileScan`,
/// spec.md §4.5).
pub fn seq_scan_cost(row_count: u64) -> Cost {
    let n = (row_count.max(1)) as f64;
    Cost {
        num_tuples: n,
        tuple_size: DEFAULT_TUPLE_SIZE,
        cpu_cost: n,
        num_block_ios: (n / ROWS_PER_PAGE).ceil().max(1.0),
        num_large_seeks: 0.0,
    }
}

/// Cost of an index scan returning an estimated `selectivity` fraction of
/// `row_count` rows (`IndexScan`, SPEC_FULL.md §9 resolution #3).
pub fn index_scan_cost(row_count: u64, selectivity: f64) -> Cost {
    let base = (row_count.max(1)) as f64;
    let selectivity = selectivity.clamp(0.0, 1.0);
    let n = (base * selectivity).max(1.0);
    let tree_height = base.max(TUPLES_PER_LEAF).log(TUPLES_PER_LEAF).ceil().max(1.0);
    Cost {
        num_tuples: n,
        tuple_size: DEFAULT_TUPLE_SIZE,
        cpu_cost: n,
        num_block_ios: (n / TUPLES_PER_LEAF).ceil() + tree_height,
        num_large_seeks: 1.0,
    }
}

/// Cost of a nested-loop join of `left` and `right`, filtered by a
/// predicate of estimated `selectivity` (spec.md §4.5: `numTuples ≈
/// |L|·|R|·sel(p)`, `cpu ≈ |L| + |L|·|R|`, `block-I/O ≈
/// cost(L).ioBlocks + cost(R).ioBlocks`).
pub fn nested_loop_join_cost(left: &Cost, right: &Cost, selectivity: f64) -> Cost {
    let selectivity = selectivity.clamp(0.0, 1.0);
    Cost {
        num_tuples: left.num_tuples * right.num_tuples * selectivity,
        tuple_size: left.tuple_size + right.tuple_size,
        cpu_cost: left.num_tuples + left.num_tuples * right.num_tuples,
        num_block_ios: left.num_block_ios + right.num_block_ios,
        num_large_seeks: left.num_large_seeks + right.num_large_seeks,
    }
}

/// Equality selectivity: `1 / distinct_or_10` (SPEC_FULL.md §9
/// resolution #2).
pub fn eq_selectivity(distinct_count: u64) -> f64 {
    1.0 / (distinct_count.max(1)) as f64
}

/// Selectivity for a single comparison kind, per SPEC_FULL.md §9
/// resolution #2: `Eq → 1/distinct_or_10`, range (`<`,`<=`,`>`,`>=`) →
/// `1/3`, `!=` → `1 - eq_selectivity`.
pub fn comparison_selectivity(op: BinaryOp, distinct_count: u64) -> f64 {
    match op {
        BinaryOp::Eq => eq_selectivity(distinct_count),
        BinaryOp::Ne => 1.0 - eq_selectivity(distinct_count),
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => 1.0 / 3.0,
        BinaryOp::And | BinaryOp::Or => 1.0,
    }
}

/// Bitset over join-graph leaves (base tables in a FROM clause). Leaf `i`
/// sets bit `i`. A join-graph of up to 63 tables fits in one `u64`; v1
/// queries never approach that, so no overflow handling is needed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JoinSet(pub u64);

impl JoinSet {
    fn singleton(i: usize) -> Self {
        JoinSet(1u64 << i)
    }

    fn contains(self, other: JoinSet) -> bool {
        self.0 & other.0 == other.0
    }

    fn popcount(self) -> u32 {
        self.0.count_ones()
    }
}

/// One base table leaf of the join graph, plus the join-type/condition
/// that connects it to whatever preceded it in the written FROM clause.
/// `kind`/`on` describe how the ORIGINAL query joined this leaf in; the DP
/// enumerator only reorders INNER-joinable leaves (the common, reorderable
/// case) and leaves any non-INNER leaf anchored at its written position, a
/// scope cut documented in DESIGN.md.
struct JoinLeaf {
    table: String,
    binding_name: String,
    kind: JoinType,
    on: Expr,
}

/// Best known plan for a given subset of join leaves.
struct Best {
    cost: Cost,
    plan: LogicalPlan,
    /// Effective name used when joins above this one qualify columns.
    name: String,
}

/// Estimate `sel(p)` for a join condition `on` joining in `right_table`
/// (spec.md §4.5's `NestedLoopJoin` cost estimate). When `on` is a simple
/// equi-join against a column of `right_table`, use that column's
/// `ANALYZE`d distinct count (SPEC_FULL.md §9 resolution #2's
/// `eq_selectivity`); otherwise fall back to the generic range
/// selectivity, since most other join predicates (inequalities, compound
/// conditions) have no single column to look up.
fn join_selectivity(ctx: &PlanningContext, right_table: &str, on: &Expr) -> f64 {
    if let Expr::Binary {
        left,
        op: BinaryOp::Eq,
        right,
    } = on
    {
        for side in [left.as_ref(), right.as_ref()] {
            if let Expr::Column { name, .. } = side
                && let Ok(meta) = ctx.table(right_table)
                && let Some(col) = meta.schema.column_index(name)
            {
                return eq_selectivity(meta.distinct_count(col));
            }
        }
    }
    1.0 / 3.0
}

/// Cost-based alternative to [`Planner`] that reorders FROM-clause joins.
pub struct CostBasedPlanner;

impl CostBasedPlanner {
    /// Plan a statement, choosing a join order by estimated cost for
    /// multi-table SELECTs. Falls back to [`Planner::plan`]'s behavior for
    /// every other statement shape (DML, single-table SELECT, DDL).
    pub fn plan(stmt: Statement, ctx: &mut PlanningContext) -> DbResult<PhysicalPlan> {
        if let Statement::Select { ref joins, .. } = stmt {
            if !joins.is_empty() && joins.iter().all(|j| j.kind == JoinType::Inner) {
                return Self::plan_with_reordering(stmt, ctx);
            }
        }
        Planner::plan(stmt, ctx)
    }

    fn plan_with_reordering(stmt: Statement, ctx: &mut PlanningContext) -> DbResult<PhysicalPlan> {
        let Statement::Select {
            columns,
            from,
            joins,
            selection,
            group_by,
            having,
            order_by,
            limit,
            offset,
        } = stmt
        else {
            unreachable!("caller already matched Statement::Select")
        };

        let mut leaves = vec![JoinLeaf {
            table: from.name.clone(),
            binding_name: from.binding_name().to_string(),
            kind: JoinType::Inner,
            on: Expr::Literal(types::Value::Bool(true)),
        }];
        for j in joins {
            leaves.push(JoinLeaf {
                table: j.right.name.clone(),
                binding_name: j.right.binding_name().to_string(),
                kind: j.kind,
                on: j.on,
            });
        }

        let best = Self::enumerate_joins(&leaves, ctx)?;

        let with_filter = if let Some(pred) = selection {
            LogicalPlan::Filter {
                input: Box::new(best.plan),
                predicate: pred,
            }
        } else {
            best.plan
        };

        let with_agg = Planner::lower_group_by(with_filter, group_by, &columns, having)?;
        let with_project = Planner::lower_select_items(with_agg, columns)?;

        let with_sort = if !order_by.is_empty() {
            let order_exprs = order_by
                .into_iter()
                .map(|o| OrderByExpr {
                    column: o.column,
                    direction: o.direction,
                })
                .collect();
            LogicalPlan::Sort {
                input: Box::new(with_project),
                order_by: order_exprs,
            }
        } else {
            with_project
        };

        let with_limit = if limit.is_some() || offset.is_some() {
            LogicalPlan::Limit {
                input: Box::new(with_sort),
                limit,
                offset,
            }
        } else {
            with_sort
        };

        let optimized = Planner::optimize(with_limit, ctx)?;
        Planner::bind(optimized, ctx)
    }

    /// Bottom-up DP over every subset of `leaves` that includes the base
    /// table (leaf 0). `dp[S]` holds the cheapest known way to join
    /// exactly the leaves in `S`, built by adding one not-yet-joined leaf
    /// at a time to a smaller, already-solved set.
    fn enumerate_joins(leaves: &[JoinLeaf], ctx: &PlanningContext) -> DbResult<Best> {
        use std::collections::HashMap;

        let n = leaves.len();
        let mut dp: HashMap<JoinSet, Best> = HashMap::new();

        // Base case: each singleton leaf is just its table scan, costed by
        // the catalog's row-count estimate (the one statistic this engine
        // tracks; ANALYZE refreshes it, DDL defaults it).
        for (i, leaf) in leaves.iter().enumerate() {
            let set = JoinSet::singleton(i);
            let row_count = ctx.table(&leaf.table).map(|t| t.row_count_estimate).unwrap_or(1000);
            dp.insert(
                set,
                Best {
                    cost: seq_scan_cost(row_count),
                    plan: LogicalPlan::TableScan {
                        table: leaf.table.clone(),
                    },
                    name: leaf.binding_name.clone(),
                },
            );
        }

        let full = JoinSet((1u64 << n) - 1);

        // Every leaf past the base table (index 0) carries the single
        // pairwise join condition that connected it to the query as
        // written; there's no multi-table condition to recover by
        // splitting a set in two arbitrary halves. So rather than
        // enumerating every subset/complement split, grow each set by
        // adding one not-yet-joined leaf at a time, using that leaf's own
        // `on` condition. This still reorders all n! ways leaves 1..n can
        // be joined onto the base table — it just never considers bushy
        // trees, which a single pairwise condition per leaf can't express
        // anyway.
        //
        // Process sets in increasing popcount order so every set's
        // dependencies (sets one leaf smaller) are already in `dp`.
        let mut all_sets: Vec<JoinSet> = (1u64..=full.0).map(JoinSet).collect();
        all_sets.sort_by_key(|s| s.popcount());

        for &set in &all_sets {
            if set.popcount() < 2 || !set.contains(JoinSet::singleton(0)) {
                continue;
            }
            for i in 1..n {
                let leaf_set = JoinSet::singleton(i);
                if !set.contains(leaf_set) {
                    continue;
                }
                let sub = JoinSet(set.0 & !leaf_set.0);
                let Some(left_best) = dp.get(&sub) else {
                    continue;
                };
                let leaf = &leaves[i];
                let row_count = ctx.table(&leaf.table).map(|t| t.row_count_estimate).unwrap_or(1000);
                let right_cost = seq_scan_cost(row_count);
                let selectivity = join_selectivity(ctx, &leaf.table, &leaf.on);
                let join_cost = nested_loop_join_cost(&left_best.cost, &right_cost, selectivity);

                let candidate = Best {
                    cost: join_cost,
                    name: format!("{}_{}", left_best.name, leaf.binding_name),
                    plan: LogicalPlan::Join {
                        left: Box::new(left_best.plan.clone()),
                        right: Box::new(LogicalPlan::TableScan {
                            table: leaf.table.clone(),
                        }),
                        join_type: leaf.kind,
                        condition: leaf.on.clone(),
                        left_name: left_best.name.clone(),
                        right_name: leaf.binding_name.clone(),
                    },
                };

                let better = match dp.get(&set) {
                    Some(existing) => {
                        candidate.cost.total(ctx.cost_constant) < existing.cost.total(ctx.cost_constant)
                    }
                    None => true,
                };
                if better {
                    dp.insert(set, candidate);
                }
            }
        }

        dp.remove(&full)
            .ok_or_else(|| common::DbError::Planner("join enumeration produced no plan".into()))
    }
}
