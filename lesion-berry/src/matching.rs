//! 基于体素重叠的真值/预测实例匹配.
//!
//! 匹配策略是宽松的多对多策略: 只要与对侧任意实例共享至少一个体素,
//! 实例即被命中. 因此一个大的预测实例覆盖三个真值病灶时 TP = 3;
//! 一个真值病灶被分裂为两个预测碎片时 TP = 1, 但两个碎片都计入 `tp_pred`.

use std::collections::HashSet;

use ndarray::Zip;

use crate::metrics::LesionCounts;
use crate::{EvalError, EvalResult, InstanceId, InstanceMap};

/// 一次匹配得到的四个实例编号集合.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchSets {
    /// 与任意预测实例重叠的真值实例.
    pub tp_truth: HashSet<InstanceId>,

    /// 与任意真值实例重叠的预测实例.
    pub tp_pred: HashSet<InstanceId>,

    /// 落在真值背景上, 且不在 `tp_pred` 中的预测实例.
    pub false_positive: HashSet<InstanceId>,

    /// 落在预测背景上, 且不在 `tp_truth` 中的真值实例.
    pub false_negative: HashSet<InstanceId>,
}

impl MatchSets {
    /// 报告的 TP 数, 按真值侧计.
    #[inline]
    pub fn true_positive(&self) -> usize {
        self.tp_truth.len()
    }

    /// 转换为计数. `n_truth` 和 `n_pred` 为两侧实例总数.
    pub fn counts(&self, n_truth: InstanceId, n_pred: InstanceId) -> LesionCounts {
        LesionCounts {
            n_truth,
            n_pred,
            true_positive: self.tp_truth.len() as u32,
            false_positive: self.false_positive.len() as u32,
            false_negative: self.false_negative.len() as u32,
        }
    }

    /// 检查计数守恒:
    /// `|tp_pred| + |FP| == n_pred` 且 `|tp_truth| + |FN| == n_truth`.
    pub fn check(&self, n_truth: InstanceId, n_pred: InstanceId) -> EvalResult<()> {
        let sides = [
            ("prediction", &self.tp_pred, &self.false_positive, n_pred),
            ("ground truth", &self.tp_truth, &self.false_negative, n_truth),
        ];
        for (side, matched, unmatched, instances) in sides {
            if matched.len() + unmatched.len() != instances as usize {
                return Err(EvalError::InvariantViolation {
                    side,
                    matched: matched.len(),
                    unmatched: unmatched.len(),
                    instances,
                });
            }
        }
        Ok(())
    }
}

/// 匹配真值实例图 `truth` 与已隔离编号的预测实例图 `pred`.
///
/// # 注意
///
/// 1. `pred` 应当已经过 [`InstanceMap::reconciled`] 处理, 使两侧编号不相交.
///   这只是 debug 模式下的断言: 四个集合按侧分别记录编号,
///   因此即使编号重叠, release 模式下的计数依然正确.
/// 2. 两张图形状不一致时返回 `EvalError::ShapeMismatch`.
/// 3. 计数守恒被破坏时返回 `EvalError::InvariantViolation`.
pub fn match_instances(truth: &InstanceMap, pred: &InstanceMap) -> EvalResult<MatchSets> {
    if truth.shape() != pred.shape() {
        return Err(EvalError::ShapeMismatch(truth.shape(), pred.shape()));
    }
    debug_assert!(truth.is_disjoint_from(pred));

    let (n_truth, n_pred) = (truth.count(), pred.count());
    let mut sets = MatchSets {
        tp_truth: HashSet::with_capacity(n_truth as usize),
        tp_pred: HashSet::with_capacity(n_pred as usize),
        false_positive: HashSet::with_capacity(n_pred as usize),
        false_negative: HashSet::with_capacity(n_truth as usize),
    };

    Zip::from(truth.data())
        .and(pred.data())
        .for_each(|&t, &p| match (t, p) {
            (0, 0) => {}
            (0, p) => {
                sets.false_positive.insert(p);
            }
            (t, 0) => {
                sets.false_negative.insert(t);
            }
            (t, p) => {
                sets.tp_truth.insert(t);
                sets.tp_pred.insert(p);
            }
        });

    // 部分重叠的实例同时出现在命中集与候选集中, 以命中为准.
    sets.false_positive.retain(|id| !sets.tp_pred.contains(id));
    sets.false_negative.retain(|id| !sets.tp_truth.contains(id));

    sets.check(n_truth, n_pred)?;
    Ok(sets)
}
