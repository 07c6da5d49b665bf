//! Ingest Module
//!
//! Strategy Patternによる表形式ファイル読み込みの抽象化を提供するモジュール。
//! スプレッドシートコンテナとHTMLテーブルのどちらからでも、同じ`TabularRow`の列を得られます。

mod html;
mod spreadsheet;

use calamine::{open_workbook_auto_from_rs, Sheets};
use log::{debug, info, warn};
use serde::Serialize;
use std::io::Cursor;

use crate::api::{IngestMode, IngestStrategy};
use crate::error::FioMatchError;
use crate::types::TabularRow;

pub(crate) use html::HtmlTableScanner;

/// 読み込み結果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoadedTable {
    /// 実際に使用された読み込み戦略
    pub strategy: IngestStrategy,
    /// ヘッダー行を除いたデータ行（ソースの順序を保持）
    pub rows: Vec<TabularRow>,
}

impl LoadedTable {
    /// 整形済みJSON文字列に変換する
    ///
    /// # 戻り値
    ///
    /// * `Ok(String)` - JSON文字列
    /// * `Err(FioMatchError::Json)` - シリアライズに失敗した場合
    pub fn to_json_pretty(&self) -> Result<String, FioMatchError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// 読み込み元（Strategy Pattern）
///
/// 入力バイト列を判定した結果を表します。
pub(crate) enum TableSource<'a> {
    /// スプレッドシートとして開けた入力（セル書式の読み出し用に元のバイト列も保持）
    Spreadsheet {
        workbook: Sheets<Cursor<&'a [u8]>>,
        data: &'a [u8],
    },
    /// テキストとして走査する入力
    Html(&'a [u8]),
}

impl<'a> TableSource<'a> {
    /// 読み込みモードに従って入力を判定する
    ///
    /// `IngestMode::Auto`ではスプレッドシートとして開くことを試み、
    /// 開けなければHTMLテーブルとして扱います。
    ///
    /// # 戻り値
    ///
    /// * `Ok(TableSource)` - 判定結果
    /// * `Err(FioMatchError::Spreadsheet)` - `SpreadsheetOnly`で開けなかった場合
    pub fn probe(data: &'a [u8], mode: IngestMode) -> Result<Self, FioMatchError> {
        match mode {
            IngestMode::HtmlOnly => Ok(TableSource::Html(data)),
            IngestMode::SpreadsheetOnly => {
                let workbook = open_workbook_auto_from_rs(Cursor::new(data))?;
                Ok(TableSource::Spreadsheet { workbook, data })
            }
            IngestMode::Auto => match open_workbook_auto_from_rs(Cursor::new(data)) {
                Ok(workbook) => Ok(TableSource::Spreadsheet { workbook, data }),
                Err(e) => {
                    warn!("Cannot open input as a spreadsheet, scanning as HTML: {}", e);
                    Ok(TableSource::Html(data))
                }
            },
        }
    }

    /// 判定された戦略
    pub fn strategy(&self) -> IngestStrategy {
        match self {
            TableSource::Spreadsheet { .. } => IngestStrategy::StructuredSpreadsheet,
            TableSource::Html(_) => IngestStrategy::EmbeddedHtmlTable,
        }
    }

    /// セル文字列の行列を読み出す（ヘッダー行を含む）
    ///
    /// # 引数
    ///
    /// * `preferred_sheet` - スプレッドシートの場合に優先するシート名
    pub fn read_cells(self, preferred_sheet: &str) -> Result<Vec<Vec<String>>, FioMatchError> {
        match self {
            TableSource::Spreadsheet { mut workbook, data } => {
                spreadsheet::read_sheet_cells(&mut workbook, data, preferred_sheet)
            }
            TableSource::Html(data) => {
                let text = html::decode_text(data);
                HtmlTableScanner::new().scan(&text)
            }
        }
    }
}

/// 入力バイト列から`TabularRow`の列を読み込む
///
/// # 引数
///
/// * `data` - 入力ファイルの内容
/// * `mode` - 読み込みモード
/// * `preferred_sheet` - スプレッドシートの場合に優先するシート名
pub(crate) fn load_table(
    data: &[u8],
    mode: IngestMode,
    preferred_sheet: &str,
) -> Result<LoadedTable, FioMatchError> {
    let source = TableSource::probe(data, mode)?;
    let strategy = source.strategy();
    info!("Reading tabular input as {}", strategy);

    let cells = source.read_cells(preferred_sheet)?;
    let rows = cells_to_rows(cells);

    Ok(LoadedTable { strategy, rows })
}

/// セル文字列の行列を`TabularRow`に変換する
///
/// 先頭行はヘッダーとして無条件にスキップします。
pub(crate) fn cells_to_rows(cells: Vec<Vec<String>>) -> Vec<TabularRow> {
    debug!("Found {} rows in table", cells.len());

    let mut iter = cells.into_iter();
    if let Some(header) = iter.next() {
        debug!("Header: {:?}", header);
    }

    let rows: Vec<TabularRow> = iter.map(|cells| TabularRow::from_cells(&cells)).collect();
    debug!("Converted {} data rows", rows.len());
    rows
}
