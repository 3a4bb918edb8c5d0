// ==========================================
// 解耦点策略引擎 - 综合评分 CSV 导入
// ==========================================
// 格式: product_id,location_id,score（首行为表头）
// 红线: 不修正非法评分，整文件拒绝并指明行号
// ==========================================

use crate::domain::designation::{ProductLocationKey, ScoredPair};
use crate::importer::error::{ImportError, ImportResult};
use csv::{ReaderBuilder, Trim};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

const SCORE_MIN: f64 = 0.0;
const SCORE_MAX: f64 = 100.0;

#[derive(Debug, Deserialize)]
struct ScoreRow {
    product_id: String,
    location_id: String,
    score: f64,
}

// ==========================================
// ScoreImporter - 综合评分导入器
// ==========================================
pub struct ScoreImporter;

impl ScoreImporter {
    /// 从 CSV 文件读取评分三元组
    ///
    /// # 错误
    /// - `FileNotFound` / `UnsupportedFormat`: 文件检查失败
    /// - 其余错误均携带行号
    pub fn import_file(path: &Path) -> ImportResult<Vec<ScoredPair>> {
        if !path.exists() {
            return Err(ImportError::FileNotFound(path.display().to_string()));
        }

        match path.extension() {
            Some(ext) if ext.eq_ignore_ascii_case("csv") => {}
            Some(ext) => {
                return Err(ImportError::UnsupportedFormat(
                    ext.to_string_lossy().to_string(),
                ))
            }
            None => return Err(ImportError::UnsupportedFormat(path.display().to_string())),
        }

        let file = File::open(path)?;
        let pairs = Self::import_reader(file)?;

        tracing::info!(
            path = %path.display(),
            rows = pairs.len(),
            "评分文件导入完成"
        );
        Ok(pairs)
    }

    /// 从任意读取器解析评分三元组（保持文件中的行顺序）
    pub fn import_reader<R: Read>(reader: R) -> ImportResult<Vec<ScoredPair>> {
        let mut csv_reader = ReaderBuilder::new()
            .has_headers(true)
            .trim(Trim::All)
            .from_reader(reader);

        let mut pairs = Vec::new();
        let mut first_seen: HashMap<ProductLocationKey, usize> = HashMap::new();

        for (idx, result) in csv_reader.deserialize::<ScoreRow>().enumerate() {
            // 表头占第 1 行
            let row = idx + 2;
            let record = result.map_err(|e| ImportError::CsvParseError {
                row,
                message: e.to_string(),
            })?;

            if record.product_id.is_empty() {
                return Err(ImportError::PrimaryKeyMissing {
                    row,
                    field: "product_id".to_string(),
                });
            }
            if record.location_id.is_empty() {
                return Err(ImportError::PrimaryKeyMissing {
                    row,
                    field: "location_id".to_string(),
                });
            }
            if !record.score.is_finite() || record.score < SCORE_MIN || record.score > SCORE_MAX {
                return Err(ImportError::ValueRangeError {
                    row,
                    field: "score".to_string(),
                    value: record.score,
                    min: SCORE_MIN,
                    max: SCORE_MAX,
                });
            }

            let key = ProductLocationKey::new(&record.product_id, &record.location_id);
            if let Some(&first_row) = first_seen.get(&key) {
                return Err(ImportError::DuplicatePair {
                    row,
                    pair: key.to_string(),
                    first_row,
                });
            }
            first_seen.insert(key, row);

            pairs.push(ScoredPair::new(
                record.product_id,
                record.location_id,
                record.score,
            ));
        }

        Ok(pairs)
    }
}
