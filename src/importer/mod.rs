// ==========================================
// 解耦点策略引擎 - 导入层
// ==========================================
// 职责: 读取外部分析作业产出的综合评分
// ==========================================

pub mod error;
pub mod score_importer;

pub use error::{ImportError, ImportResult};
pub use score_importer::ScoreImporter;
