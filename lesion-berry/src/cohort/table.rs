use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::Serialize;

use crate::{EvalError, EvalResult};

/// 结果表中的单元格.
#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
pub enum Cell {
    /// 计数.
    Int(u64),

    /// 分数或体素级指标.
    Float(f64),

    /// 指标无定义 (如两侧都没有病灶时的 F1).
    NotApplicable,
}

impl Cell {
    /// 数值. `NotApplicable` 返回 `None`.
    #[inline]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(v) => Some(*v as f64),
            Self::Float(v) => Some(*v),
            Self::NotApplicable => None,
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v:.4}"),
            Self::NotApplicable => f.write_str("N/A"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
struct Row {
    case_id: String,
    cells: Vec<Option<Cell>>,
}

/// 按病例编号组织的有序结果表. 每个病例一行.
///
/// 单元格为 `None` 代表该病例没有对应数据 (例如体素级指标中缺少某个类别),
/// 与 `Cell::NotApplicable` (有数据但指标无定义) 不同.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct CohortTable {
    columns: Vec<String>,
    rows: Vec<Row>,
    #[serde(skip)]
    index: HashMap<String, usize>,
}

/// 结果表中一行的只读视图.
#[derive(Copy, Clone, Debug)]
pub struct RowView<'a> {
    table: &'a CohortTable,
    row: &'a Row,
}

impl<'a> RowView<'a> {
    /// 病例编号.
    #[inline]
    pub fn case_id(&self) -> &'a str {
        &self.row.case_id
    }

    /// 按列名取单元格. 列不存在或单元格缺失时返回 `None`.
    pub fn get(&self, column: &str) -> Option<Cell> {
        let idx = self.table.column_index(column)?;
        self.row.cells[idx]
    }

    /// 按列序迭代所有单元格.
    #[inline]
    pub fn cells(&self) -> impl ExactSizeIterator<Item = &'a Option<Cell>> {
        self.row.cells.iter()
    }
}

/// 单列的描述性统计, 只统计有数值的单元格.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ColumnSummary {
    /// 列名.
    pub column: String,
    /// 有数值的单元格个数.
    pub count: usize,
    /// 均值.
    pub mean: Option<f64>,
    /// 样本标准差 (n - 1). 少于两个数值时为 `None`.
    pub std: Option<f64>,
    /// 最小值.
    pub min: Option<f64>,
    /// 最大值.
    pub max: Option<f64>,
}

impl CohortTable {
    /// 创建只有列名的空表.
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// 追加一行. `cells` 与列一一对应.
    ///
    /// # 注意
    ///
    /// 1. `cells` 长度与列数不一致时返回 `EvalError::CellCountMismatch`.
    /// 2. 病例编号重复时返回 `EvalError::DuplicateCase`.
    ///
    /// 出错时表保持不变.
    pub fn push_row(
        &mut self,
        case_id: impl Into<String>,
        cells: Vec<Option<Cell>>,
    ) -> EvalResult<()> {
        if cells.len() != self.columns.len() {
            return Err(EvalError::CellCountMismatch(self.columns.len(), cells.len()));
        }
        let case_id = case_id.into();
        if self.index.contains_key(&case_id) {
            return Err(EvalError::DuplicateCase(case_id));
        }
        self.index.insert(case_id.clone(), self.rows.len());
        self.rows.push(Row { case_id, cells });
        Ok(())
    }

    /// 行数.
    #[inline]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// 是否没有任何行.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// 全部列名 (不含病例编号).
    #[inline]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// 列名对应的列序.
    #[inline]
    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    /// 是否含有病例 `case_id`.
    #[inline]
    pub fn contains_case(&self, case_id: &str) -> bool {
        self.index.contains_key(case_id)
    }

    /// 按插入顺序迭代病例编号.
    pub fn case_ids(&self) -> impl ExactSizeIterator<Item = &str> {
        self.rows.iter().map(|r| r.case_id.as_str())
    }

    /// 按插入顺序迭代所有行.
    pub fn rows(&self) -> impl ExactSizeIterator<Item = RowView<'_>> {
        self.rows.iter().map(move |row| RowView { table: self, row })
    }

    /// 获取病例 `case_id` 对应的行.
    pub fn row(&self, case_id: &str) -> Option<RowView<'_>> {
        let &i = self.index.get(case_id)?;
        Some(RowView {
            table: self,
            row: &self.rows[i],
        })
    }

    /// 获取病例 `case_id` 在 `column` 列上的单元格.
    #[inline]
    pub fn get(&self, case_id: &str, column: &str) -> Option<Cell> {
        self.row(case_id)?.get(column)
    }

    /// 按病例编号严格合并两张表. 结果行序与 `self` 相同, 列为 `self` 的列后接
    /// `other` 的列.
    ///
    /// # 错误
    ///
    /// 1. 任一病例编号只出现在一侧时, 返回 `EvalError::MergeKeyMismatch`.
    ///   优先报告 `self` 中 (按行序) 第一个缺失于 `other` 的编号.
    /// 2. 两侧存在同名列时, 返回 `EvalError::DuplicateColumn`.
    pub fn merge(&self, other: &CohortTable) -> EvalResult<CohortTable> {
        if let Some(c) = self.columns.iter().find(|c| other.column_index(c).is_some()) {
            return Err(EvalError::DuplicateColumn(c.clone()));
        }
        if let Some(id) = self.case_ids().find(|id| !other.contains_case(id)) {
            return Err(EvalError::MergeKeyMismatch(id.to_string()));
        }
        if let Some(id) = other.case_ids().find(|id| !self.contains_case(id)) {
            return Err(EvalError::MergeKeyMismatch(id.to_string()));
        }

        let mut ans = CohortTable::new(self.columns.iter().chain(other.columns.iter()).cloned());
        for row in self.rows.iter() {
            let other_row = &other.rows[other.index[&row.case_id]];
            let cells = row
                .cells
                .iter()
                .chain(other_row.cells.iter())
                .copied()
                .collect();
            ans.push_row(row.case_id.clone(), cells)?;
        }
        Ok(ans)
    }

    /// 依次合并多张表. `tables` 为空时返回空表.
    pub fn merge_all<'a, I>(tables: I) -> EvalResult<CohortTable>
    where
        I: IntoIterator<Item = &'a CohortTable>,
    {
        let mut it = tables.into_iter();
        let Some(first) = it.next() else {
            return Ok(CohortTable::default());
        };
        it.try_fold(first.clone(), |acc, t| acc.merge(t))
    }

    /// 保留满足谓词 `pred` 的行.
    pub fn filter<F>(&self, mut pred: F) -> CohortTable
    where
        F: FnMut(&RowView) -> bool,
    {
        let mut ans = CohortTable::new(self.columns.iter().cloned());
        for view in self.rows() {
            if pred(&view) {
                ans.index.insert(view.row.case_id.clone(), ans.rows.len());
                ans.rows.push(view.row.clone());
            }
        }
        ans
    }

    /// 删除病例编号在 `case_ids` 中的行.
    pub fn without_cases<'a, I>(&self, case_ids: I) -> CohortTable
    where
        I: IntoIterator<Item = &'a str>,
    {
        let drop: HashSet<&str> = case_ids.into_iter().collect();
        self.filter(|r| !drop.contains(r.case_id()))
    }

    /// 保留病例编号包含 `fragment` 的行.
    #[inline]
    pub fn filter_case_id(&self, fragment: &str) -> CohortTable {
        self.filter(|r| r.case_id().contains(fragment))
    }

    /// 只保留列名满足谓词 `pred` 的列. 病例编号总是保留.
    pub fn select<F>(&self, mut pred: F) -> CohortTable
    where
        F: FnMut(&str) -> bool,
    {
        let keep: Vec<usize> = (0..self.columns.len())
            .filter(|i| pred(&self.columns[*i]))
            .collect();
        let mut ans = CohortTable::new(keep.iter().map(|i| self.columns[*i].clone()));
        ans.index = self.index.clone();
        ans.rows = self
            .rows
            .iter()
            .map(|r| Row {
                case_id: r.case_id.clone(),
                cells: keep.iter().map(|i| r.cells[*i]).collect(),
            })
            .collect();
        ans
    }

    /// 只保留列名包含 `fragment` 的列.
    #[inline]
    pub fn select_containing(&self, fragment: &str) -> CohortTable {
        self.select(|c| c.contains(fragment))
    }

    /// 按 `column` 列是否为 0 将表拆分为两部分:
    /// (该列为 0 的行, 该列大于 0 的行). 单元格缺失或无定义的行两边都不包含.
    ///
    /// 列不存在时返回 `None`.
    pub fn split_by_zero(&self, column: &str) -> Option<(CohortTable, CohortTable)> {
        let idx = self.column_index(column)?;
        let value = |r: &RowView| r.row.cells[idx].and_then(|c| c.as_f64());
        let zero = self.filter(|r| value(r).is_some_and(|v| v == 0.0));
        let positive = self.filter(|r| value(r).is_some_and(|v| v > 0.0));
        Some((zero, positive))
    }

    /// 对每一列计算描述性统计.
    pub fn describe(&self) -> Vec<ColumnSummary> {
        (0..self.columns.len())
            .map(|i| {
                let values: Vec<f64> = self
                    .rows
                    .iter()
                    .filter_map(|r| r.cells[i].and_then(|c| c.as_f64()))
                    .filter(|v| v.is_finite())
                    .collect();
                summarize(&self.columns[i], &values)
            })
            .collect()
    }
}

fn summarize(column: &str, values: &[f64]) -> ColumnSummary {
    let count = values.len();
    let mean = (count > 0).then(|| values.iter().sum::<f64>() / count as f64);
    let std = mean.filter(|_| count > 1).map(|m| {
        let ss: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
        (ss / (count - 1) as f64).sqrt()
    });
    ColumnSummary {
        column: column.to_string(),
        count,
        mean,
        std,
        min: values.iter().copied().reduce(f64::min),
        max: values.iter().copied().reduce(f64::max),
    }
}
