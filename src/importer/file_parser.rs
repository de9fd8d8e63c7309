// ==========================================
// 线索管理后端 - CSV 解析器
// ==========================================
// 职责: UTF-8 解码（剥离 BOM）、表头检查、逐行流式读取
// 约定: 表头大小写不敏感；值去首尾空白；表头所在行为第 1 行
// ==========================================

use crate::domain::upload::HEADER_ROW_NUMBER;
use crate::importer::error::{ImportError, ImportResult};
use csv::{Reader, ReaderBuilder, StringRecord};
use std::collections::HashMap;

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// 解码为 UTF-8 文本（剥离 BOM）
pub fn decode_utf8(bytes: &[u8]) -> ImportResult<&str> {
    let body = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    std::str::from_utf8(body).map_err(|_| ImportError::InvalidEncoding)
}

// ==========================================
// RawRow - 单行原始数据
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRow {
    pub row_number: i64,
    fields: HashMap<String, String>, // key: 小写表头
}

impl RawRow {
    pub fn new(row_number: i64, fields: HashMap<String, String>) -> Self {
        Self { row_number, fields }
    }

    /// 从 (表头, 值) 对构造（测试与手工构造用）
    pub fn from_pairs(row_number: i64, pairs: &[(&str, &str)]) -> Self {
        let fields = pairs
            .iter()
            .map(|(k, v)| (header_key(k), v.trim().to_string()))
            .collect();
        Self { row_number, fields }
    }

    /// 按列名取值（大小写不敏感）；列不存在返回 None
    pub fn get(&self, column: &str) -> Option<&str> {
        self.fields.get(&header_key(column)).map(String::as_str)
    }

    /// 取非空值
    pub fn non_empty(&self, column: &str) -> Option<&str> {
        self.get(column).filter(|v| !v.is_empty())
    }
}

/// 一条 CSV 记录的读取结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CsvRecord {
    Row(RawRow),
    /// 记录本身损坏（不中断导入，记为一条整行错误）
    Malformed { row_number: i64, message: String },
}

fn header_key(header: &str) -> String {
    header.trim().to_lowercase()
}

// ==========================================
// CsvParser
// ==========================================
pub struct CsvParser;

impl CsvParser {
    /// 打开 CSV 文本，读取表头并校验必填列
    ///
    /// # 返回
    /// - `Err(MissingColumns)`: 缺少任一必填列（列出全部缺失列）
    pub fn open<'a>(&self, text: &'a str, required: &[&str]) -> ImportResult<CsvRows<'a>> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true) // 行长度不一致时由逐行逻辑处理
            .from_reader(text.as_bytes());

        let headers: Vec<String> = reader.headers()?.iter().map(header_key).collect();

        let missing = missing_columns(&headers, required);
        if !missing.is_empty() {
            return Err(ImportError::MissingColumns(missing));
        }

        Ok(CsvRows {
            reader,
            headers,
            last_row_number: HEADER_ROW_NUMBER,
        })
    }
}

/// 计算缺失的必填列（保留必填列原始写法）
pub fn missing_columns(headers: &[String], required: &[&str]) -> Vec<String> {
    required
        .iter()
        .filter(|r| !headers.iter().any(|h| *h == header_key(r)))
        .map(|r| r.to_string())
        .collect()
}

// ==========================================
// CsvRows - 逐行迭代器
// ==========================================
pub struct CsvRows<'a> {
    reader: Reader<&'a [u8]>,
    headers: Vec<String>,
    last_row_number: i64,
}

impl<'a> CsvRows<'a> {
    fn row_number_of(&mut self, line: Option<u64>) -> i64 {
        let n = line
            .map(|l| l as i64)
            .filter(|l| *l > self.last_row_number)
            .unwrap_or(self.last_row_number + 1);
        self.last_row_number = n;
        n
    }

    fn to_row(&self, row_number: i64, record: &StringRecord) -> CsvRecord {
        if record.len() > self.headers.len() {
            return CsvRecord::Malformed {
                row_number,
                message: format!(
                    "Expected {} columns, found {}",
                    self.headers.len(),
                    record.len()
                ),
            };
        }

        let fields = self
            .headers
            .iter()
            .enumerate()
            .map(|(idx, h)| {
                let value = record.get(idx).map(str::trim).unwrap_or("");
                (h.clone(), value.to_string())
            })
            .collect();
        CsvRecord::Row(RawRow::new(row_number, fields))
    }
}

impl<'a> Iterator for CsvRows<'a> {
    type Item = CsvRecord;

    fn next(&mut self) -> Option<CsvRecord> {
        // 空行由 csv reader 跳过；只有分隔符的行（如 ",,"）照常交给校验
        let mut record = StringRecord::new();
        match self.reader.read_record(&mut record) {
            Ok(false) => None,
            Ok(true) => {
                let line = record.position().map(|p| p.line());
                let row_number = self.row_number_of(line);
                Some(self.to_row(row_number, &record))
            }
            Err(e) => {
                let line = e.position().map(|p| p.line());
                let row_number = self.row_number_of(line);
                Some(CsvRecord::Malformed {
                    row_number,
                    message: format!("Malformed row: {}", e),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const COMPANY_REQUIRED: &[&str] = &["Company Name", "Segment Name"];

    fn rows(text: &str) -> Vec<CsvRecord> {
        CsvParser.open(text, COMPANY_REQUIRED).unwrap().collect()
    }

    #[test]
    fn test_decode_strips_bom_and_rejects_invalid_utf8() {
        let with_bom = b"\xEF\xBB\xBFCompany Name,Segment Name\n";
        assert_eq!(decode_utf8(with_bom).unwrap(), "Company Name,Segment Name\n");
        assert!(matches!(
            decode_utf8(&[0x43, 0xFF, 0xFE]),
            Err(ImportError::InvalidEncoding)
        ));
    }

    #[test]
    fn test_headers_case_insensitive_and_missing_listed() {
        assert!(CsvParser
            .open("company name , SEGMENT NAME\n", COMPANY_REQUIRED)
            .is_ok());

        let err = CsvParser
            .open("First Name,Email\n", &["First Name", "Last Name", "Company Name", "Email"])
            .err()
            .unwrap();
        match err {
            ImportError::MissingColumns(cols) => {
                assert_eq!(cols, vec!["Last Name".to_string(), "Company Name".to_string()])
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_rows_numbered_from_two_and_trimmed() {
        let records = rows("Company Name,Segment Name\n  Acme , Fintech\nGlobex,Health\n");
        assert_eq!(records.len(), 2);

        match &records[0] {
            CsvRecord::Row(r) => {
                assert_eq!(r.row_number, 2);
                assert_eq!(r.get("COMPANY NAME"), Some("Acme"));
                assert_eq!(r.get("Segment Name"), Some("Fintech"));
                assert_eq!(r.get("Company Website"), None);
            }
            other => panic!("unexpected record: {other:?}"),
        }
        assert!(matches!(&records[1], CsvRecord::Row(r) if r.row_number == 3));
    }

    #[test]
    fn test_extra_fields_are_malformed_short_rows_padded() {
        let records = rows("Company Name,Segment Name\nAcme,Fintech,oops\nGlobex\n");
        assert!(matches!(
            &records[0],
            CsvRecord::Malformed { row_number: 2, .. }
        ));
        match &records[1] {
            CsvRecord::Row(r) => {
                assert_eq!(r.row_number, 3);
                assert_eq!(r.get("Segment Name"), Some(""));
                assert_eq!(r.non_empty("Segment Name"), None);
            }
            other => panic!("unexpected record: {other:?}"),
        }
    }

    #[test]
    fn test_delimiter_only_rows_are_kept_and_empty_lines_skipped() {
        let records = rows("Company Name,Segment Name\n,\n\nAcme,Fintech\n");
        assert_eq!(records.len(), 2);
        assert!(matches!(&records[0], CsvRecord::Row(r) if r.row_number == 2 && r.non_empty("Company Name").is_none()));
        assert!(matches!(&records[1], CsvRecord::Row(r) if r.row_number == 4));
    }
}
