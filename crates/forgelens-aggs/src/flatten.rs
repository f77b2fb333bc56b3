use forgelens_core::{CellValue, ColumnLayout, Row, Table};
use serde::{Deserialize, Serialize};

use crate::AggError;
use crate::tree::{Bucket, BucketTree};

/// How the leaf value of each row is obtained: from a named metric
/// sub-aggregation, or from the leaf bucket's own occurrence count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueMode {
    Metric(String),
    DocCount,
}

/// One nesting level of the declared shape: the sub-aggregation field to
/// descend into and the output column its keys land in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelSpec {
    pub field: String,
    pub column: String,
}

impl LevelSpec {
    pub fn new(field: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            column: column.into(),
        }
    }
}

/// The declared shape of a flattening run. Depth is fixed per call (the
/// supported query shapes nest one to three bucket levels) but is data here,
/// not hardcoded per dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlattenSpec {
    pub levels: Vec<LevelSpec>,
    pub value_column: String,
    pub value_mode: ValueMode,
}

/// Lazy, finite, non-restartable row sequence over a bucket tree.
///
/// Traversal is depth-first and preserves the tree's child ordering at every
/// level, so flattening the same tree twice yields identical sequences. A
/// shape violation surfaces as an `Err` item and ends the sequence.
#[derive(Debug)]
pub struct FlattenRows<'a> {
    layout: ColumnLayout,
    value_mode: ValueMode,
    /// Field names for levels 1 and deeper; level 0 is consumed up front.
    child_fields: Vec<String>,
    stack: Vec<Frame<'a>>,
    done: bool,
}

#[derive(Debug)]
struct Frame<'a> {
    depth: usize,
    labels: Vec<CellValue>,
    buckets: std::slice::Iter<'a, Bucket>,
}

/// Starts a flattening run over `tree` with the given shape. `columns` names
/// the output order and must cover exactly the level columns plus the value
/// column.
pub fn flatten<'a>(
    tree: &'a BucketTree,
    spec: &FlattenSpec,
    columns: &[&str],
) -> Result<FlattenRows<'a>, AggError> {
    let Some(first) = spec.levels.first() else {
        return Err(AggError::Malformed(
            "flatten spec declares no levels".to_owned(),
        ));
    };

    let roots = tree
        .buckets(&first.field)
        .ok_or_else(|| AggError::ShapeMismatch {
            level: 0,
            field: first.field.clone(),
        })?;

    let mut producers: Vec<&str> = spec.levels.iter().map(|level| level.column.as_str()).collect();
    producers.push(spec.value_column.as_str());
    let layout = ColumnLayout::new(&producers, columns)?;

    Ok(FlattenRows {
        layout,
        value_mode: spec.value_mode.clone(),
        child_fields: spec
            .levels
            .iter()
            .skip(1)
            .map(|level| level.field.clone())
            .collect(),
        stack: vec![Frame {
            depth: 0,
            labels: Vec::new(),
            buckets: roots.iter(),
        }],
        done: false,
    })
}

/// Eager variant of [`flatten`] collecting the whole row set into a table.
pub fn flatten_table(
    tree: &BucketTree,
    spec: &FlattenSpec,
    columns: &[&str],
) -> Result<Table, AggError> {
    let rows = flatten(tree, spec, columns)?;
    let mut table = Table::new(columns.iter().map(|column| (*column).to_owned()).collect());
    for row in rows {
        table.push(row?);
    }
    Ok(table)
}

impl Iterator for FlattenRows<'_> {
    type Item = Result<Row, AggError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        loop {
            let (bucket, depth, labels) = {
                let frame = match self.stack.last_mut() {
                    Some(frame) => frame,
                    None => {
                        self.done = true;
                        return None;
                    }
                };
                match frame.buckets.next() {
                    Some(bucket) => (bucket, frame.depth, frame.labels.clone()),
                    None => {
                        self.stack.pop();
                        continue;
                    }
                }
            };

            if depth == self.child_fields.len() {
                let mut cells = labels;
                cells.push(CellValue::from(bucket.label()));
                return match leaf_value(bucket, &self.value_mode) {
                    Ok(value) => {
                        cells.push(value);
                        Some(Ok(self.layout.arrange(cells)))
                    }
                    Err(err) => {
                        self.done = true;
                        Some(Err(err))
                    }
                };
            }

            let field = &self.child_fields[depth];
            match bucket.buckets(field) {
                Some(children) => {
                    let mut labels = labels;
                    labels.push(CellValue::from(bucket.label()));
                    self.stack.push(Frame {
                        depth: depth + 1,
                        labels,
                        buckets: children.iter(),
                    });
                }
                None => {
                    self.done = true;
                    return Some(Err(AggError::ShapeMismatch {
                        level: depth + 1,
                        field: field.clone(),
                    }));
                }
            }
        }
    }
}

pub(crate) fn leaf_value(bucket: &Bucket, mode: &ValueMode) -> Result<CellValue, AggError> {
    match mode {
        ValueMode::Metric(name) => bucket
            .metric(name)
            .map(CellValue::Number)
            .ok_or_else(|| AggError::MissingMetric {
                bucket: bucket.key.clone(),
                metric: name.clone(),
            }),
        ValueMode::DocCount => Ok(CellValue::Count(bucket.doc_count)),
    }
}
