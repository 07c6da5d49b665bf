//! Cell Format Metadata
//!
//! XLSXコンテナから、シート上の各セルに設定された表示書式を読み出す。
//! calamineはセルの値だけを返すため、`xl/styles.xml`と対象シートのXMLを
//! ZIPから直接読み、セル位置ごとの`NumberFormat`を対応付けます。

use log::debug;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::HashMap;
use std::io::{Cursor, Read, Seek};
use zip::ZipArchive;

use crate::error::FioMatchError;
use crate::format::NumberFormat;

/// ユーザー定義書式の最小ID
const FIRST_CUSTOM_FORMAT_ID: u32 = 164;

/// シート上のセル書式
#[derive(Debug, Default)]
pub(crate) struct CellFormats {
    /// `cellXfs`のインデックスごとの書式（"General"は`None`）
    styles: Vec<Option<NumberFormat>>,
    /// 0始まりの(行, 列) → `cellXfs`のインデックス
    cells: HashMap<(u32, u32), usize>,
    /// 1904年基準の日付か
    is_1904: bool,
}

impl CellFormats {
    /// XLSXのバイト列から、指定したシートのセル書式を読み込む
    ///
    /// # 引数
    ///
    /// * `data` - XLSXファイルの内容
    /// * `sheet_name` - 対象シート名
    ///
    /// # 戻り値
    ///
    /// * `Ok(CellFormats)` - 書式が設定されたセルの対応表
    /// * `Err(FioMatchError::Zip)` - コンテナや必要なパーツを開けない場合
    /// * `Err(FioMatchError::MalformedXml)` - パーツのXMLが不正な場合
    pub fn load(data: &[u8], sheet_name: &str) -> Result<Self, FioMatchError> {
        let mut archive =
            ZipArchive::new(Cursor::new(data)).map_err(|e| FioMatchError::Zip(e.to_string()))?;

        let (sheets, is_1904) = parse_workbook(&read_entry(&mut archive, "xl/workbook.xml")?)?;
        let relationship_id = sheets
            .into_iter()
            .find(|(name, _)| name == sheet_name)
            .map(|(_, id)| id)
            .ok_or_else(|| {
                FioMatchError::Zip(format!("sheet '{}' is not listed in workbook.xml", sheet_name))
            })?;

        let targets =
            parse_relationships(&read_entry(&mut archive, "xl/_rels/workbook.xml.rels")?)?;
        let sheet_path = targets
            .get(&relationship_id)
            .map(|target| resolve_target(target))
            .ok_or_else(|| {
                FioMatchError::Zip(format!("relationship '{}' not found", relationship_id))
            })?;

        // styles.xmlを持たないワークブックもある
        let has_styles = archive.file_names().any(|name| name == "xl/styles.xml");
        let styles = if has_styles {
            parse_styles(&read_entry(&mut archive, "xl/styles.xml")?)?
        } else {
            Vec::new()
        };
        let styles: Vec<Option<NumberFormat>> = styles
            .iter()
            .map(|code| code.as_deref().and_then(NumberFormat::parse))
            .collect();

        let cells = parse_sheet_styles(&read_entry(&mut archive, &sheet_path)?, &styles)?;
        debug!(
            "Read {} formatted cells from {} (date1904: {})",
            cells.len(),
            sheet_path,
            is_1904
        );

        Ok(Self {
            styles,
            cells,
            is_1904,
        })
    }

    /// セルの表示書式（0始まりの行・列）
    pub fn get(&self, row: u32, col: u32) -> Option<&NumberFormat> {
        let style = *self.cells.get(&(row, col))?;
        self.styles.get(style)?.as_ref()
    }

    /// 1904年基準の日付か
    pub fn is_1904(&self) -> bool {
        self.is_1904
    }

    /// 書式が設定されたセルの数
    pub fn formatted_cells(&self) -> usize {
        self.cells.len()
    }
}

/// ZIPエントリの内容を読み出す
fn read_entry<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    name: &str,
) -> Result<Vec<u8>, FioMatchError> {
    let mut file = archive
        .by_name(name)
        .map_err(|e| FioMatchError::Zip(format!("{}: {}", name, e)))?;
    let mut buf = Vec::new();
    file.read_to_end(&mut buf)?;
    Ok(buf)
}

/// 属性値をローカル名で取得（`r:id`は`id`で引く）
fn attr_value(e: &BytesStart, name: &[u8]) -> Result<Option<String>, FioMatchError> {
    for attr in e.attributes() {
        let attr = attr.map_err(|err| FioMatchError::MalformedXml(err.to_string()))?;
        if attr.key.local_name().as_ref() == name {
            let value = std::str::from_utf8(&attr.value).map_err(quick_xml::Error::from)?;
            let value = quick_xml::escape::unescape(value).map_err(quick_xml::Error::from)?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

/// `xl/workbook.xml`からシート名とリレーションIDの対、1904年基準フラグを読む
fn parse_workbook(xml: &[u8]) -> Result<(Vec<(String, String)>, bool), FioMatchError> {
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut sheets = Vec::new();
    let mut is_1904 = false;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) | Event::Empty(e) => match e.local_name().as_ref() {
                b"workbookPr" => {
                    is_1904 = matches!(
                        attr_value(&e, b"date1904")?.as_deref(),
                        Some("1" | "true")
                    );
                }
                b"sheet" => {
                    if let (Some(name), Some(id)) =
                        (attr_value(&e, b"name")?, attr_value(&e, b"id")?)
                    {
                        sheets.push((name, id));
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok((sheets, is_1904))
}

/// `xl/_rels/workbook.xml.rels`からリレーションID → ターゲットの対応を読む
fn parse_relationships(xml: &[u8]) -> Result<HashMap<String, String>, FioMatchError> {
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut targets = HashMap::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"Relationship" => {
                if let (Some(id), Some(target)) =
                    (attr_value(&e, b"Id")?, attr_value(&e, b"Target")?)
                {
                    targets.insert(id, target);
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(targets)
}

/// リレーションのターゲットをZIP内のパスに変換
fn resolve_target(target: &str) -> String {
    match target.strip_prefix('/') {
        Some(absolute) => absolute.to_string(),
        None => format!("xl/{}", target),
    }
}

/// `xl/styles.xml`から`cellXfs`のインデックスごとの書式文字列を読む
///
/// `numFmts`のユーザー定義書式（ID 164以上）と組み込み書式の両方を解決します。
fn parse_styles(xml: &[u8]) -> Result<Vec<Option<String>>, FioMatchError> {
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut custom: HashMap<u32, String> = HashMap::new();
    let mut xf_format_ids: Vec<u32> = Vec::new();
    let mut in_cell_xfs = false;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) if e.local_name().as_ref() == b"cellXfs" => in_cell_xfs = true,
            Event::End(e) if e.local_name().as_ref() == b"cellXfs" => in_cell_xfs = false,
            Event::Start(e) | Event::Empty(e) => match e.local_name().as_ref() {
                b"numFmt" => {
                    let id = attr_value(&e, b"numFmtId")?.and_then(|v| v.parse::<u32>().ok());
                    if let (Some(id), Some(code)) = (id, attr_value(&e, b"formatCode")?) {
                        custom.insert(id, code);
                    }
                }
                b"xf" if in_cell_xfs => {
                    let id = attr_value(&e, b"numFmtId")?
                        .and_then(|v| v.parse::<u32>().ok())
                        .unwrap_or(0);
                    xf_format_ids.push(id);
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(xf_format_ids
        .into_iter()
        .map(|id| format_code(id, &custom))
        .collect())
}

/// 書式IDから書式文字列を取得
fn format_code(id: u32, custom: &HashMap<u32, String>) -> Option<String> {
    if let Some(code) = custom.get(&id) {
        return Some(code.clone());
    }
    if id >= FIRST_CUSTOM_FORMAT_ID {
        return None;
    }
    builtin_format(id).map(str::to_string)
}

/// 組み込み書式（ECMA-376 Part 1, 18.8.30）
///
/// 分数・指数表記の書式は素の値で表示するため含めません。
fn builtin_format(id: u32) -> Option<&'static str> {
    match id {
        1 => Some("0"),
        2 => Some("0.00"),
        3 => Some("#,##0"),
        4 => Some("#,##0.00"),
        9 => Some("0%"),
        10 => Some("0.00%"),
        14 => Some("mm-dd-yy"),
        15 => Some("d-mmm-yy"),
        16 => Some("d-mmm"),
        17 => Some("mmm-yy"),
        18 => Some("h:mm AM/PM"),
        19 => Some("h:mm:ss AM/PM"),
        20 => Some("h:mm"),
        21 => Some("h:mm:ss"),
        22 => Some("m/d/yy h:mm"),
        37 => Some("#,##0 ;(#,##0)"),
        38 => Some("#,##0 ;[Red](#,##0)"),
        39 => Some("#,##0.00;(#,##0.00)"),
        40 => Some("#,##0.00;[Red](#,##0.00)"),
        45 => Some("mm:ss"),
        46 => Some("[h]:mm:ss"),
        47 => Some("mm:ss.0"),
        49 => Some("@"),
        _ => None,
    }
}

/// セル参照（"B2"）を0始まりの(行, 列)に変換
fn parse_cell_ref(reference: &str) -> Option<(u32, u32)> {
    let split = reference.find(|c: char| c.is_ascii_digit())?;
    let (letters, digits) = reference.split_at(split);
    if letters.is_empty() {
        return None;
    }

    let mut col: u32 = 0;
    for ch in letters.chars() {
        if !ch.is_ascii_alphabetic() {
            return None;
        }
        let value = ch.to_ascii_uppercase() as u32 - 'A' as u32 + 1;
        col = col.checked_mul(26)?.checked_add(value)?;
    }
    let row: u32 = digits.parse().ok()?;

    Some((row.checked_sub(1)?, col - 1))
}

/// シートXMLから、書式を持つセルの位置と`cellXfs`インデックスを読む
///
/// `r`属性を持たない行・セルは直前の位置から数えます。
fn parse_sheet_styles(
    xml: &[u8],
    styles: &[Option<NumberFormat>],
) -> Result<HashMap<(u32, u32), usize>, FioMatchError> {
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut cells = HashMap::new();
    let mut row: Option<u32> = None;
    let mut next_col: u32 = 0;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) | Event::Empty(e) => match e.local_name().as_ref() {
                b"row" => {
                    let explicit = attr_value(&e, b"r")?
                        .and_then(|v| v.parse::<u32>().ok())
                        .and_then(|r| r.checked_sub(1));
                    row = Some(explicit.unwrap_or_else(|| row.map_or(0, |r| r + 1)));
                    next_col = 0;
                }
                b"c" => {
                    let position = attr_value(&e, b"r")?
                        .as_deref()
                        .and_then(parse_cell_ref)
                        .unwrap_or((row.unwrap_or(0), next_col));
                    next_col = position.1 + 1;

                    let style = attr_value(&e, b"s")?.and_then(|v| v.parse::<usize>().ok());
                    if let Some(style) = style {
                        if matches!(styles.get(style), Some(Some(_))) {
                            cells.insert(position, style);
                        }
                    }
                }
                _ => {}
            },
            Event::End(e) if e.local_name().as_ref() == b"sheetData" => break,
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(cells)
}
