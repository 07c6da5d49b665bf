//! Spreadsheet Strategy
//!
//! calamineを使用して、スプレッドシートコンテナからセル文字列を読み出す。
//! XLSXではセルの表示書式も読み、スプレッドシート上の表示と同じ文字列にそろえます。

use calamine::{Data, ExcelDateTime, Reader, Sheets};
use log::{debug, warn};
use std::io::{Read, Seek};

use crate::error::FioMatchError;
use crate::format::{general_number, NumberFormat};
use crate::parser::CellFormats;

/// 書式の無い日付セルの表示形式
const DEFAULT_DATE_FORMAT: &str = "%d.%m.%Y";
const DEFAULT_DATETIME_FORMAT: &str = "%d.%m.%Y %H:%M:%S";

/// 読み込むシートを選択
///
/// 優先シート名が存在すればそれを、無ければ最初のシートを返します。
fn select_sheet(sheet_names: &[String], preferred: &str) -> Option<String> {
    if sheet_names.iter().any(|name| name == preferred) {
        return Some(preferred.to_string());
    }
    sheet_names.first().cloned()
}

/// セル値を表示用の文字列に変換
///
/// 表示書式があれば適用します（`2` + `"00"` → `02`）。書式が無い数値は
/// 整数値なら小数部なしで出力します（`1990.0` → `1990`）。
fn cell_to_string(cell: &Data, format: Option<&NumberFormat>, is_1904: bool) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Float(f) => match format {
            Some(format) => format.format_number(*f, is_1904),
            None => general_number(*f),
        },
        Data::Int(i) => match format {
            Some(format) => format.format_number(*i as f64, is_1904),
            None => i.to_string(),
        },
        Data::DateTime(dt) => datetime_to_string(dt, format),
        other => other.to_string(),
    }
}

/// 日付セルを表示用の文字列に変換
///
/// 日付書式が分かればそれを使い、分からなければ`dd.mm.yyyy`（時刻があれば
/// `dd.mm.yyyy HH:MM:SS`）で出力します。
fn datetime_to_string(dt: &ExcelDateTime, format: Option<&NumberFormat>) -> String {
    let Some(datetime) = dt.as_datetime() else {
        return general_number(dt.as_f64());
    };
    match format {
        Some(format) if format.is_datetime() => format.format_datetime(datetime, dt.as_f64()),
        _ if dt.as_f64().fract() == 0.0 => datetime.format(DEFAULT_DATE_FORMAT).to_string(),
        _ => datetime.format(DEFAULT_DATETIME_FORMAT).to_string(),
    }
}

/// XLSXの場合はセル書式を読み込む
///
/// 書式を読めなくてもセルの値は読めるため、失敗は警告にとどめます。
fn load_cell_formats<RS: Read + Seek>(
    workbook: &Sheets<RS>,
    data: &[u8],
    sheet_name: &str,
) -> CellFormats {
    if !matches!(workbook, Sheets::Xlsx(_)) {
        return CellFormats::default();
    }
    match CellFormats::load(data, sheet_name) {
        Ok(formats) => {
            debug!("Loaded {} formatted cells", formats.formatted_cells());
            formats
        }
        Err(e) => {
            warn!("Cannot read cell formats, using raw cell values: {}", e);
            CellFormats::default()
        }
    }
}

/// ワークブックからセル文字列の行列を読み出す
///
/// # 引数
///
/// * `workbook` - calamineのワークブック
/// * `data` - ワークブックの元のバイト列（セル書式の読み出しに使用）
/// * `preferred_sheet` - 優先するシート名
///
/// # 戻り値
///
/// * `Ok(Vec<Vec<String>>)` - A1起点の行列（使用範囲の前にある空行・空列は空文字列で埋める）
/// * `Err(FioMatchError::NoSheetsAvailable)` - シートが1つも無い場合
/// * `Err(FioMatchError::Spreadsheet)` - シートの読み込みに失敗した場合
pub(super) fn read_sheet_cells<RS: Read + Seek>(
    workbook: &mut Sheets<RS>,
    data: &[u8],
    preferred_sheet: &str,
) -> Result<Vec<Vec<String>>, FioMatchError> {
    let sheet_names = workbook.sheet_names().to_vec();
    let sheet_name =
        select_sheet(&sheet_names, preferred_sheet).ok_or(FioMatchError::NoSheetsAvailable)?;
    debug!("Reading sheet '{}'", sheet_name);

    let range = workbook.worksheet_range(&sheet_name)?;
    let formats = load_cell_formats(workbook, data, &sheet_name);

    // 使用範囲がA1から始まらない場合、先頭の空行・空列を補う
    let (row_offset, col_offset) = range.start().unwrap_or((0, 0));

    let mut cells: Vec<Vec<String>> = vec![Vec::new(); row_offset as usize];
    for (row_idx, row) in (row_offset..).zip(range.rows()) {
        let mut values = vec![String::new(); col_offset as usize];
        values.extend(row.iter().zip(col_offset..).map(|(cell, col_idx)| {
            cell_to_string(cell, formats.get(row_idx, col_idx), formats.is_1904())
        }));
        cells.push(values);
    }

    Ok(cells)
}
