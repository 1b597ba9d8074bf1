//! 通用常量.

/// 标签体数据中的体素取值.
pub mod label {
    /// 背景的体素值.
    pub const BACKGROUND: u8 = 0;

    /// 基线 (已存在) 病灶的体素值.
    pub const BASAL: u8 = 1;

    /// 新发或演变病灶的体素值.
    pub const NEW: u8 = 2;

    /// 体素值是否在标签字母表 {0, 1, 2} 内?
    #[inline]
    pub const fn is_valid(p: u8) -> bool {
        p <= NEW
    }
}

/// 标签字母表大小, 即 {背景, 基线病灶, 新发病灶}.
pub const LABEL_ALPHABET_LEN: usize = 3;

/// nifti 压缩文件后缀.
pub const NII_GZ: &str = ".nii.gz";

/// nnU-Net 原始图像的第 0 通道后缀.
pub const CHANNEL_0000: &str = "_0000";

/// nnU-Net 评估结果文件名.
pub const SUMMARY_JSON: &str = "summary.json";

/// 病灶类别.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub enum LesionClass {
    /// 基线病灶, 对应 `label::BASAL`.
    Basal,

    /// 新发或演变病灶, 对应 `label::NEW`.
    New,
}

impl LesionClass {
    /// 全部病灶类别, 按标签值升序.
    pub const ALL: [LesionClass; 2] = [LesionClass::Basal, LesionClass::New];

    /// 类别对应的体素值.
    #[inline]
    pub const fn label(&self) -> u8 {
        match self {
            Self::Basal => label::BASAL,
            Self::New => label::NEW,
        }
    }

    /// 病灶级结果表中的类别名.
    #[inline]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Basal => "basal",
            Self::New => "new",
        }
    }

    /// 体素级指标列名的前缀.
    #[inline]
    pub const fn voxel_prefix(&self) -> &'static str {
        match self {
            Self::Basal => "b_",
            Self::New => "new_",
        }
    }
}

impl std::fmt::Display for LesionClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
