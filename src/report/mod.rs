//! Report Module
//!
//! 照合済みの行を2シート構成のXLSXレポートとして出力するモジュール。
//! ドキュメントはメモリ上で構築し、一時ファイル経由で一度に保存します。

mod styles;

use chrono::NaiveDateTime;
use log::{debug, info};
use rust_xlsxwriter::{Workbook, Worksheet, XlsxError};
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::builder::ReconcileConfig;
use crate::error::{FioMatchError, WriteError};
use crate::types::{TabularRow, TABULAR_FIELD_COUNT};

pub(crate) use styles::{CellStyle, ReportStyles};

/// レポートの列数（文書番号 + 16列）
pub const REPORT_COLUMN_COUNT: usize = TABULAR_FIELD_COUNT + 1;

/// レポートのヘッダー
pub const REPORT_HEADERS: [&str; REPORT_COLUMN_COUNT] = [
    "№ документа",
    "Фамилия",
    "Имя",
    "Отчество",
    "Год рождения",
    "Месяц рождения",
    "День рождения",
    "Результат",
    "Розыск лиц",
    "ОСК регион",
    "ОСК ГИАЦ",
    "Адмпрактика регион",
    "Адмпрактика ФИС-М",
    "ЗАГС рег.смерти",
    "Запретники",
    "Паспорт РФ",
    "Реж.высылки",
];

/// 強調対象のフラグ列（Розыск лиц, ОСК регион, ОСК ГИАЦ）の列インデックス
const FLAG_COLUMNS: [usize; 3] = [8, 9, 10];

/// ファイル名のタイムスタンプ形式
const TIMESTAMP_FORMAT: &str = "%d.%m.%Y_%H-%M-%S";

/// 出力先シートの種類
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SheetKind {
    /// すべての行
    Main,
    /// 陽性の行のみ
    Positive,
}

/// レポート出力の結果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportOutcome {
    /// 実際に書き込んだファイルのパス
    pub path: PathBuf,
    /// メインシートのデータ行数
    pub rows_written: usize,
    /// 陽性シートのデータ行数
    pub positive_rows: usize,
}

/// セルの書式を決定
///
/// メインシートの陽性行は行全体をハイライトし、陽性マーカーを持つフラグセルは
/// さらに強調します。陽性シートではフラグセルの強調のみ行います。
pub(crate) fn cell_style(
    kind: SheetKind,
    col: usize,
    value: &str,
    row_positive: bool,
    marker: &str,
) -> CellStyle {
    if FLAG_COLUMNS.contains(&col) && value == marker {
        return CellStyle::Flag;
    }
    match kind {
        SheetKind::Main if row_positive => CellStyle::Highlight,
        _ => CellStyle::Grid,
    }
}

/// 要求されたパスのディレクトリに、タイムスタンプ付きの出力パスを生成
///
/// 同名のファイルが既に存在する場合は`_1`、`_2`...を付けます。
pub(crate) fn output_path(requested: &Path, prefix: &str, timestamp: NaiveDateTime) -> PathBuf {
    let dir = match requested.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let stem = format!("{}{}", prefix, timestamp.format(TIMESTAMP_FORMAT));

    let mut candidate = dir.join(format!("{}.xlsx", stem));
    let mut counter = 1;
    while candidate.exists() {
        candidate = dir.join(format!("{}_{}.xlsx", stem, counter));
        counter += 1;
    }
    candidate
}

/// レポートの書き出し
pub(crate) struct ReportWriter<'a> {
    config: &'a ReconcileConfig,
    styles: ReportStyles,
}

impl<'a> ReportWriter<'a> {
    pub fn new(config: &'a ReconcileConfig) -> Self {
        Self {
            config,
            styles: ReportStyles::new(),
        }
    }

    /// ヘッダー行と列幅を設定したシートを作成
    fn new_sheet(&self, name: &str) -> Result<Worksheet, XlsxError> {
        let mut worksheet = Worksheet::new();
        worksheet.set_name(name)?;

        let header = self.styles.format(CellStyle::Header);
        for (col, title) in REPORT_HEADERS.iter().enumerate() {
            worksheet.write_string_with_format(0, col as u16, *title, header)?;
            worksheet.set_column_width(col as u16, self.config.column_width)?;
        }
        worksheet.set_freeze_panes(1, 0)?;

        Ok(worksheet)
    }

    /// 1行分のセルを書き込む
    fn write_row(
        &self,
        worksheet: &mut Worksheet,
        kind: SheetKind,
        row_idx: u32,
        row: &TabularRow,
        positive: bool,
    ) -> Result<(), XlsxError> {
        for (col, value) in row.report_cells().iter().enumerate() {
            let style = cell_style(kind, col, value, positive, &self.config.positive_marker);
            let format = self.styles.format(style);
            if value.is_empty() {
                worksheet.write_blank(row_idx, col as u16, format)?;
            } else {
                worksheet.write_string_with_format(row_idx, col as u16, *value, format)?;
            }
        }
        Ok(())
    }

    /// ワークブックをメモリ上で構築
    ///
    /// # 戻り値
    ///
    /// * `Ok((Workbook, usize))` - ワークブックと陽性行の数
    pub fn build_workbook(&self, rows: &[TabularRow]) -> Result<(Workbook, usize), XlsxError> {
        let mut main = self.new_sheet(&self.config.main_sheet_name)?;
        let mut positive = self.new_sheet(&self.config.positive_sheet_name)?;

        let mut main_row = 1u32;
        let mut positive_row = 1u32;

        for row in rows {
            let is_positive = row.is_positive(&self.config.positive_marker);

            self.write_row(&mut main, SheetKind::Main, main_row, row, is_positive)?;
            main_row += 1;

            if is_positive {
                self.write_row(&mut positive, SheetKind::Positive, positive_row, row, true)?;
                positive_row += 1;
            }
        }

        let mut workbook = Workbook::new();
        workbook.push_worksheet(main);
        workbook.push_worksheet(positive);

        Ok((workbook, (positive_row - 1) as usize))
    }

    /// レポートを書き出す
    ///
    /// # 引数
    ///
    /// * `requested` - 元の表形式ファイルのパス（出力先ディレクトリの決定に使用）
    /// * `rows` - 照合済みの行
    /// * `timestamp` - ファイル名に埋め込む日時
    ///
    /// # 戻り値
    ///
    /// * `Ok(ReportOutcome)` - 書き込んだファイルのパスと行数
    /// * `Err(FioMatchError::WriteFailure)` - ドキュメントの構築、またはファイルの作成・保存に
    ///   失敗した場合（出力先パスと原因を含む）
    ///
    /// # 注意
    ///
    /// 失敗した場合、出力パスにファイルは残りません。
    pub fn write(
        &self,
        requested: &Path,
        rows: &[TabularRow],
        timestamp: NaiveDateTime,
    ) -> Result<ReportOutcome, FioMatchError> {
        let path = output_path(requested, &self.config.output_prefix, timestamp);
        let write_failure = |source: WriteError| FioMatchError::WriteFailure {
            path: path.clone(),
            source,
        };
        let persist_error = |source: std::io::Error| write_failure(source.into());

        let (mut workbook, positive_rows) = self
            .build_workbook(rows)
            .map_err(|e| write_failure(e.into()))?;
        let buffer = workbook
            .save_to_buffer()
            .map_err(|e| write_failure(e.into()))?;
        debug!("Built report workbook: {} bytes", buffer.len());

        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let mut temp = tempfile::Builder::new()
            .prefix(".fiomatch-")
            .suffix(".xlsx.tmp")
            .tempfile_in(&dir)
            .map_err(persist_error)?;
        temp.write_all(&buffer).map_err(persist_error)?;
        temp.as_file().sync_all().map_err(persist_error)?;
        temp.persist_noclobber(&path)
            .map_err(|e| persist_error(e.error))?;

        info!(
            "Report written to {} ({} rows, {} positive)",
            path.display(),
            rows.len(),
            positive_rows
        );

        Ok(ReportOutcome {
            path,
            rows_written: rows.len(),
            positive_rows,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn timestamp() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 5)
            .unwrap()
            .and_hms_opt(14, 7, 9)
            .unwrap()
    }

    #[test]
    fn test_headers() {
        assert_eq!(REPORT_HEADERS.len(), 17);
        assert_eq!(REPORT_HEADERS[0], "№ документа");
        for col in FLAG_COLUMNS {
            assert!(["Розыск лиц", "ОСК регион", "ОСК ГИАЦ"].contains(&REPORT_HEADERS[col]));
        }
    }

    #[test]
    fn test_flag_columns_match_row_layout() {
        let mut row = TabularRow::default();
        row.wanted_persons = "w".to_string();
        row.osk_region = "r".to_string();
        row.osk_registry = "g".to_string();
        let cells = row.report_cells();
        assert_eq!(
            FLAG_COLUMNS.map(|c| cells[c]),
            ["w", "r", "g"]
        );
    }

    #[test]
    fn test_cell_style_main_sheet() {
        assert_eq!(cell_style(SheetKind::Main, 1, "Ivanov", false, "ДА"), CellStyle::Grid);
        assert_eq!(cell_style(SheetKind::Main, 1, "Ivanov", true, "ДА"), CellStyle::Highlight);
        assert_eq!(cell_style(SheetKind::Main, 8, "ДА", true, "ДА"), CellStyle::Flag);
        assert_eq!(cell_style(SheetKind::Main, 9, "НЕТ", true, "ДА"), CellStyle::Highlight);
        // フラグ列以外の「ДА」は強調しない
        assert_eq!(cell_style(SheetKind::Main, 15, "ДА", true, "ДА"), CellStyle::Highlight);
    }

    #[test]
    fn test_cell_style_positive_sheet() {
        assert_eq!(cell_style(SheetKind::Positive, 1, "Ivanov", true, "ДА"), CellStyle::Grid);
        assert_eq!(cell_style(SheetKind::Positive, 10, "ДА", true, "ДА"), CellStyle::Flag);
    }

    #[test]
    fn test_output_path() {
        let dir = tempfile::tempdir().unwrap();
        let requested = dir.path().join("report.xls");

        let path = output_path(&requested, "goususlugi_", timestamp());
        assert_eq!(path, dir.path().join("goususlugi_05.03.2024_14-07-09.xlsx"));
    }

    #[test]
    fn test_output_path_avoids_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let requested = dir.path().join("report.xls");
        std::fs::write(dir.path().join("goususlugi_05.03.2024_14-07-09.xlsx"), b"x").unwrap();

        let path = output_path(&requested, "goususlugi_", timestamp());
        assert_eq!(path, dir.path().join("goususlugi_05.03.2024_14-07-09_1.xlsx"));
    }

    #[test]
    fn test_output_path_bare_file_name() {
        let path = output_path(Path::new("report.xls"), "p_", timestamp());
        assert_eq!(path.parent(), Some(Path::new(".")));
    }
}
