//! 病灶实例提取 (26-邻域三维连通分量) 与实例编号空间隔离.

use std::collections::VecDeque;
use std::ops::{Index, RangeInclusive};

use itertools::iproduct;
use ndarray::{Array3, ArrayView, ArrayView3, Ix3};

use crate::consts::LesionClass;
use crate::{Idx3d, InstanceId, LabelVolume};

/// 获取 `pos` 的 26-邻域 (共面, 共棱, 共顶点) 坐标, 不含 `pos` 自身.
///
/// 坐标分量为 0 时, 其 "减一" 结果会回绕为 `usize::MAX`, 由调用方按形状过滤.
#[inline]
pub fn neighbour26((z, h, w): Idx3d) -> impl Iterator<Item = Idx3d> {
    iproduct!(0..3usize, 0..3usize, 0..3usize)
        .filter(|&d| d != (1, 1, 1))
        .map(move |(dz, dh, dw)| {
            (
                (z + dz).wrapping_sub(1),
                (h + dh).wrapping_sub(1),
                (w + dw).wrapping_sub(1),
            )
        })
}

/// 三维实例图. 与源掩码形状相同, 0 为背景, 每个正整数对应一个连通分量.
///
/// 新提取的实例编号为 `[1, count]`. 经过 [`InstanceMap::reconciled`] 偏移后,
/// 编号为 `[offset + 1, offset + count]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceMap {
    data: Array3<InstanceId>,
    count: InstanceId,
    offset: InstanceId,
}

impl Index<Idx3d> for InstanceMap {
    type Output = InstanceId;

    #[inline]
    fn index(&self, index: Idx3d) -> &Self::Output {
        &self.data[index]
    }
}

impl InstanceMap {
    /// 按 26-邻域提取二值掩码 `mask` 的所有连通分量.
    #[inline]
    pub fn from_mask(mask: ArrayView3<bool>) -> Self {
        Self::label_components(mask, |b| *b)
    }

    /// 按 26-邻域提取 `volume` 中 `class` 类病灶的所有连通分量.
    #[inline]
    pub fn from_volume(volume: &LabelVolume, class: LesionClass) -> Self {
        let target = class.label();
        Self::label_components(volume.data(), |p| *p == target)
    }

    /// 两个体素 `p1` 和 `p2` 属于同一个实例, 当且仅当存在一条从 `p1` 到 `p2`
    /// 的 26-相邻路径, 且路径上的所有体素 (包括 `p1` 和 `p2`) 都满足谓词
    /// `is_foreground`.
    ///
    /// 实例编号按行优先序下各分量首个体素出现的先后, 从 1 开始分配.
    /// 因此对同一输入多次运行的结果完全一致.
    pub fn label_components<T, F>(source: ArrayView3<T>, is_foreground: F) -> Self
    where
        F: Fn(&T) -> bool,
    {
        let (zs, hs, ws) = source.dim();
        let mut data = Array3::<InstanceId>::zeros((zs, hs, ws));
        let mut count: InstanceId = 0;
        let mut bfs_q: VecDeque<Idx3d> = VecDeque::with_capacity(64);

        for (pos, voxel) in source.indexed_iter() {
            // 实例图本身兼作 visited 集合.
            if data[pos] != 0 || !is_foreground(voxel) {
                continue;
            }
            count += 1;
            data[pos] = count;
            bfs_q.push_back(pos);

            while let Some(cur) = bfs_q.pop_front() {
                for neigh in neighbour26(cur).filter(|&(z, h, w)| z < zs && h < hs && w < ws) {
                    if data[neigh] == 0 && is_foreground(&source[neigh]) {
                        data[neigh] = count;
                        bfs_q.push_back(neigh);
                    }
                }
            }
        }

        Self {
            data,
            count,
            offset: 0,
        }
    }

    /// 将所有非零编号整体偏移 `n_truth` (一般为真值实例个数),
    /// 使预测实例编号落在 `[n_truth + 1, n_truth + count]`,
    /// 与真值编号 `[1, n_truth]` 不相交. 背景仍为 0.
    ///
    /// 编号超出 `InstanceId` 范围时, 程序行为与整数溢出一致.
    pub fn reconciled(mut self, n_truth: InstanceId) -> Self {
        if n_truth != 0 && self.count != 0 {
            self.data
                .mapv_inplace(|id| if id == 0 { 0 } else { id + n_truth });
        }
        self.offset += n_truth;
        self
    }

    /// 实例个数.
    #[inline]
    pub fn count(&self) -> InstanceId {
        self.count
    }

    /// 是否没有任何实例.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// 编号偏移量. 新提取的实例图为 0.
    #[inline]
    pub fn offset(&self) -> InstanceId {
        self.offset
    }

    /// 全部实例编号. 实例个数为 0 时为空区间.
    #[inline]
    pub fn id_range(&self) -> RangeInclusive<InstanceId> {
        (self.offset + 1)..=(self.offset + self.count)
    }

    /// 判断两张实例图的编号区间是否不相交.
    pub fn is_disjoint_from(&self, other: &InstanceMap) -> bool {
        let (a, b) = (self.id_range(), other.id_range());
        a.is_empty() || b.is_empty() || a.end() < b.start() || b.end() < a.start()
    }

    /// 获取数据形状大小.
    #[inline]
    pub fn shape(&self) -> Idx3d {
        self.data.dim()
    }

    /// 获得数据的一份不可变 shallow copy.
    #[inline]
    pub fn data(&self) -> ArrayView<'_, InstanceId, Ix3> {
        self.data.view()
    }
}
