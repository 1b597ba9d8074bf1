//! 🍇欢迎光临🍓
//!
//! 涵盖了本 crate 一系列常用的功能.

pub use crate::{Idx3d, InstanceId};

pub use crate::data::{CaseVolumes, LabelVolume};
pub use crate::error::{EvalError, EvalResult};

pub use crate::consts::label::{BACKGROUND, BASAL, NEW};
pub use crate::consts::LesionClass;

pub use crate::instance::InstanceMap;
pub use crate::matching::{match_instances, MatchSets};
pub use crate::metrics::{f1_score, lesion_counts, lesion_counts_of, LesionCounts};

pub use crate::cohort::{
    CaseFailure, Cell, CohortEvaluator, CohortReport, CohortTable, ColumnSummary,
};
pub use crate::confusion::ConfusionMatrix;

pub use crate::dataset::home_dataset_dir_with;
pub use crate::dataset::{
    list_case_ids, voxel_table, CaseIdParser, Dataset, DatasetPaths, NiftiProvider,
    ProviderConfig, SummaryJson, VolumeProvider, VoxelMetricSource,
};
