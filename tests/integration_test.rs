//! Integration Tests for fiomatch
//!
//! XMLの正規化、表形式ファイルの読み込み、照合、レポート出力を
//! ファイルを介して通しで検証します。

use calamine::{open_workbook_auto, Data, Reader};
use fiomatch::{
    FioMatchError, IngestMode, IngestStrategy, ReconcilerBuilder, TabularRow, REPORT_HEADERS,
};
use regex::Regex;
use rust_xlsxwriter::*;
use std::collections::HashMap;
use std::io::Read;
use std::path::{Path, PathBuf};

// Helper module for generating test fixtures
mod fixtures {
    use super::*;

    pub const HEADER: [&str; 16] = [
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

    /// Ivanov (former surname Petrov), DOC-1; Sidorova without former surname, DOC-2
    pub const XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<List>
  <Document>
    <RequestInfo>
      <ConvictionPerson>
        <CPSurname>Ivanov</CPSurname>
        <CPName>Ivan</CPName>
        <CPPatronymic>Ivanovich</CPPatronymic>
        <CPBirthday>01.02.2000</CPBirthday>
        <CPLastFIO>
          <CPLSurname>Petrov</CPLSurname>
        </CPLastFIO>
      </ConvictionPerson>
    </RequestInfo>
    <DocumentID>DOC-1</DocumentID>
  </Document>
  <Document>
    <RequestInfo>
      <ConvictionPerson>
        <CPSurname>Sidorova</CPSurname>
        <CPName>Anna</CPName>
        <CPPatronymic>Petrovna</CPPatronymic>
        <CPBirthday>15.07.1990</CPBirthday>
      </ConvictionPerson>
    </RequestInfo>
    <DocumentID>DOC-2</DocumentID>
  </Document>
</List>"#;

    /// Data rows: a former-surname hit with a positive flag, a plain hit, and a miss
    pub fn data_rows() -> Vec<Vec<&'static str>> {
        vec![
            vec![
                "Petrov", "Ivan", "Ivanovich", "2000", "02", "01", "найден", "ДА", "НЕТ", "НЕТ",
            ],
            vec![
                "Sidorova", "Anna", "Petrovna", "1990", "07", "15", "найден", "НЕТ", "НЕТ", "НЕТ",
            ],
            vec![
                "Smirnov", "Oleg", "Olegovich", "1985", "11", "30", "не найден", "НЕТ", "НЕТ",
                "ДА",
            ],
        ]
    }

    pub fn write_xml(dir: &Path) -> PathBuf {
        let path = dir.join("export.xml");
        std::fs::write(&path, XML).unwrap();
        path
    }

    /// Generate an XLSX report with the given sheet name
    pub fn write_xlsx(
        dir: &Path,
        file_name: &str,
        sheet_name: &str,
        rows: &[Vec<&str>],
    ) -> Result<PathBuf, XlsxError> {
        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(sheet_name)?;

        for (col, title) in HEADER.iter().enumerate() {
            worksheet.write_string(0, col as u16, *title)?;
        }
        for (row_idx, row) in rows.iter().enumerate() {
            for (col, value) in row.iter().enumerate() {
                worksheet.write_string(row_idx as u32 + 1, col as u16, *value)?;
            }
        }

        let path = dir.join(file_name);
        workbook.save(&path)?;
        Ok(path)
    }

    /// Generate an HTML table export (as produced by web reporting tools, saved as .xls)
    pub fn write_html(dir: &Path, file_name: &str, rows: &[Vec<&str>]) -> PathBuf {
        let mut html = String::from(
            "<html><head><meta charset=\"utf-8\"></head><body>\n<table border=\"1\">\n<tr>",
        );
        for title in HEADER {
            html.push_str(&format!("<th>{}</th>", title));
        }
        html.push_str("</tr>\n");
        for row in rows {
            html.push_str("<TR class=\"row\">\n");
            for value in row {
                html.push_str(&format!("  <TD><span>&nbsp;{}</span></TD>\n", value));
            }
            html.push_str("</TR>\n");
        }
        html.push_str("</table></body></html>");

        let path = dir.join(file_name);
        std::fs::write(&path, html).unwrap();
        path
    }
}

/// レポートのシートを文字列の行列として読み戻す
fn read_sheet(path: &Path, sheet: &str) -> Vec<Vec<String>> {
    let mut workbook = open_workbook_auto(path).unwrap();
    let range = workbook.worksheet_range(sheet).unwrap();
    range
        .rows()
        .map(|row| {
            row.iter()
                .map(|cell| match cell {
                    Data::Empty => String::new(),
                    other => other.to_string(),
                })
                .collect()
        })
        .collect()
}

fn sheet_names(path: &Path) -> Vec<String> {
    let workbook = open_workbook_auto(path).unwrap();
    workbook.sheet_names().to_vec()
}

/// XLSXのパーツを文字列として読み出す
fn read_part(path: &Path, name: &str) -> String {
    let file = std::fs::File::open(path).unwrap();
    let mut archive = zip::ZipArchive::new(file).unwrap();
    let mut part = archive.by_name(name).unwrap();
    let mut xml = String::new();
    part.read_to_string(&mut xml).unwrap();
    xml
}

/// `cellXfs`のインデックスから解決したセル書式
#[derive(Debug, Clone, PartialEq)]
struct ResolvedStyle {
    /// 塗りつぶし色（`RRGGBB`）
    fill: Option<String>,
    bold: bool,
    thin_border: bool,
}

/// styles.xmlのフォント・塗りつぶし・罫線を`cellXfs`の順に解決
fn resolve_styles(styles_xml: &str) -> Vec<ResolvedStyle> {
    let section = |tag: &str| -> String {
        let re = Regex::new(&format!(r"(?s)<{tag}[ >].*?</{tag}>")).unwrap();
        re.find(styles_xml).map(|m| m.as_str().to_string()).unwrap_or_default()
    };
    let items = |xml: &str, tag: &str| -> Vec<String> {
        let re = Regex::new(&format!(r"(?s)<{tag}>.*?</{tag}>|<{tag}/>")).unwrap();
        re.find_iter(xml).map(|m| m.as_str().to_string()).collect()
    };

    let fg_color = Regex::new(r#"<fgColor rgb="FF([0-9A-F]{6})""#).unwrap();
    let fonts: Vec<bool> = items(&section("fonts"), "font")
        .iter()
        .map(|font| font.contains("<b/>"))
        .collect();
    let fills: Vec<Option<String>> = items(&section("fills"), "fill")
        .iter()
        .map(|fill| fg_color.captures(fill).map(|c| c[1].to_string()))
        .collect();
    let borders: Vec<bool> = items(&section("borders"), "border")
        .iter()
        .map(|border| border.contains(r#"style="thin""#))
        .collect();

    let xf = Regex::new(r"<xf ([^>]*?)/?>").unwrap();
    let attr = Regex::new(r#"(\w+)="([^"]*)""#).unwrap();
    xf.captures_iter(&section("cellXfs"))
        .map(|xf| {
            let attrs: HashMap<String, usize> = attr
                .captures_iter(&xf[1])
                .filter_map(|a| a[2].parse().ok().map(|v| (a[1].to_string(), v)))
                .collect();
            ResolvedStyle {
                fill: fills[attrs["fillId"]].clone(),
                bold: fonts[attrs["fontId"]],
                thin_border: borders[attrs["borderId"]],
            }
        })
        .collect()
}

/// シートXMLのセル参照から`s`属性（無ければ0）への対応表
fn cell_style_ids(sheet_xml: &str) -> HashMap<String, usize> {
    let cell = Regex::new(r#"<c r="([A-Z]+[0-9]+)"(?: s="([0-9]+)")?"#).unwrap();
    cell.captures_iter(sheet_xml)
        .map(|c| {
            let style = c.get(2).map_or(0, |s| s.as_str().parse().unwrap());
            (c[1].to_string(), style)
        })
        .collect()
}

// TC-I-001: Delimited text output
#[test]
fn test_parse_to_delimited_text() {
    let dir = tempfile::tempdir().unwrap();
    let xml_path = fixtures::write_xml(dir.path());

    let text = fiomatch::parse_to_delimited_text(&xml_path).unwrap();
    assert_eq!(
        text,
        "Ivanov;Ivan;Ivanovich;2000;02;01\n\
         Petrov;Ivan;Ivanovich;2000;02;01\n\
         Sidorova;Anna;Petrovna;1990;07;15\n"
    );
}

// TC-I-002: Spreadsheet ingestion
#[test]
fn test_load_xlsx() {
    let dir = tempfile::tempdir().unwrap();
    let path =
        fixtures::write_xlsx(dir.path(), "report.xlsx", "Sheet1", &fixtures::data_rows()).unwrap();

    let reconciler = ReconcilerBuilder::new().build().unwrap();
    let table = reconciler.load_table(&path).unwrap();

    assert_eq!(table.strategy, IngestStrategy::StructuredSpreadsheet);
    assert_eq!(table.rows.len(), 3);
    assert_eq!(table.rows[0].surname, "Petrov");
    assert_eq!(table.rows[0].wanted_persons, "ДА");
    assert_eq!(table.rows[2].osk_registry, "ДА");
    assert_eq!(table.rows[2].admin_practice_region, "");
    assert!(table.rows.iter().all(|r| r.document_number.is_empty()));
}

// TC-I-003: HTML fallback for a file with a spreadsheet extension
#[test]
fn test_load_html_saved_as_xls() {
    let dir = tempfile::tempdir().unwrap();
    let path = fixtures::write_html(dir.path(), "report.xls", &fixtures::data_rows());

    let reconciler = ReconcilerBuilder::new().build().unwrap();
    let table = reconciler.load_table(&path).unwrap();

    assert_eq!(table.strategy, IngestStrategy::EmbeddedHtmlTable);
    assert_eq!(table.rows.len(), 3);
    assert_eq!(table.rows[1].surname, "Sidorova");
    assert_eq!(table.rows[1].birth_month, "07");
}

// TC-I-004: Format-agnostic ingestion
#[test]
fn test_spreadsheet_and_html_ingest_identically() {
    let dir = tempfile::tempdir().unwrap();
    let rows = fixtures::data_rows()[..2].to_vec();
    let xlsx = fixtures::write_xlsx(dir.path(), "report.xlsx", "Sheet1", &rows).unwrap();
    let html = fixtures::write_html(dir.path(), "report.xls", &rows);

    let from_xlsx = fiomatch::load_tabular_file(&xlsx).unwrap();
    let from_html = fiomatch::load_tabular_file(&html).unwrap();

    assert_eq!(from_xlsx.len(), 2);
    assert_eq!(from_xlsx, from_html);
}

// TC-I-005: Sheet selection falls back to the first sheet
#[test]
fn test_sheet_fallback_to_first() {
    let dir = tempfile::tempdir().unwrap();
    let path =
        fixtures::write_xlsx(dir.path(), "report.xlsx", "Отчет", &fixtures::data_rows()).unwrap();

    let rows = fiomatch::load_tabular_file(&path).unwrap();
    assert_eq!(rows.len(), 3);
}

// TC-I-006: Preferred sheet wins over the first sheet
#[test]
fn test_preferred_sheet() {
    let dir = tempfile::tempdir().unwrap();
    let mut workbook = Workbook::new();
    workbook
        .add_worksheet()
        .set_name("Cover")
        .unwrap()
        .write_string(0, 0, "cover page")
        .unwrap();
    let data = workbook.add_worksheet();
    data.set_name("Sheet1").unwrap();
    data.write_string(0, 0, "Фамилия").unwrap();
    data.write_string(1, 0, "Petrov").unwrap();
    let path = dir.path().join("multi.xlsx");
    workbook.save(&path).unwrap();

    let rows = fiomatch::load_tabular_file(&path).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].surname, "Petrov");
}

// TC-I-007: Matching against current and former surnames
#[test]
fn test_match_against_xml() {
    let rows: Vec<TabularRow> = fixtures::data_rows()
        .iter()
        .map(|cells| TabularRow::from_cells(cells))
        .collect();

    let matched = fiomatch::match_against_xml(fixtures::XML.as_bytes(), rows).unwrap();

    assert_eq!(matched[0].document_number, "DOC-1");
    assert_eq!(matched[1].document_number, "DOC-2");
    assert_eq!(matched[2].document_number, "");
    assert_eq!(matched[2].surname, "Smirnov");
}

// TC-I-008: Report layout
#[test]
fn test_write_report_layout() {
    let dir = tempfile::tempdir().unwrap();
    let requested = dir.path().join("report.xls");
    let rows: Vec<TabularRow> = fixtures::data_rows()
        .iter()
        .map(|cells| TabularRow::from_cells(cells))
        .collect();
    let rows = fiomatch::match_against_xml(fixtures::XML.as_bytes(), rows).unwrap();

    let output = fiomatch::write_report(&requested, &rows).unwrap();

    assert_eq!(output.parent(), Some(dir.path()));
    let file_name = output.file_name().unwrap().to_string_lossy().to_string();
    assert!(file_name.starts_with("goususlugi_"));
    assert!(file_name.ends_with(".xlsx"));

    assert_eq!(
        sheet_names(&output),
        vec!["Sheet1".to_string(), "Положительный результат".to_string()]
    );

    let main = read_sheet(&output, "Sheet1");
    assert_eq!(main.len(), 4);
    assert_eq!(main[0], REPORT_HEADERS.to_vec());
    assert_eq!(main[1][0], "DOC-1");
    assert_eq!(main[1][1], "Petrov");
    assert_eq!(main[2][0], "DOC-2");
    assert_eq!(main[3][0], "");
    assert_eq!(main[3][1], "Smirnov");

    // 陽性シートには旧姓で一致した行とОСК ГИАЦが陽性の行だけが同じ順序で並ぶ
    let positive = read_sheet(&output, "Положительный результат");
    assert_eq!(positive.len(), 3);
    assert_eq!(positive[0], REPORT_HEADERS.to_vec());
    assert_eq!(positive[1][1], "Petrov");
    assert_eq!(positive[2][1], "Smirnov");
}

// TC-I-009: Timestamped file name
#[test]
fn test_write_report_at_timestamp() {
    let dir = tempfile::tempdir().unwrap();
    let requested = dir.path().join("input.xls");
    let timestamp = chrono::NaiveDate::from_ymd_opt(2025, 1, 31)
        .unwrap()
        .and_hms_opt(9, 5, 0)
        .unwrap();

    let reconciler = ReconcilerBuilder::new()
        .with_output_prefix("check_")
        .build()
        .unwrap();
    let first = reconciler
        .write_report_at(&requested, &[], timestamp)
        .unwrap();
    let second = reconciler
        .write_report_at(&requested, &[], timestamp)
        .unwrap();

    assert_eq!(first.path, dir.path().join("check_31.01.2025_09-05-00.xlsx"));
    assert_eq!(second.path, dir.path().join("check_31.01.2025_09-05-00_1.xlsx"));
    assert_eq!(first.rows_written, 0);
    assert_eq!(first.positive_rows, 0);

    // ヘッダーのみのシートが2つ
    assert_eq!(read_sheet(&first.path, "Sheet1").len(), 1);
    assert_eq!(read_sheet(&first.path, "Положительный результат").len(), 1);
}

// TC-I-010: End-to-end scenario
#[test]
fn test_run_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let xml_path = fixtures::write_xml(dir.path());
    let table_path = fixtures::write_html(
        dir.path(),
        "ibd-f.xls",
        &[vec![
            "Petrov", "Ivan", "Ivanovich", "2000", "02", "01", "найден", "ДА",
        ]],
    );

    let reconciler = ReconcilerBuilder::new().build().unwrap();
    let summary = reconciler.run(&xml_path, &table_path).unwrap();

    assert_eq!(summary.documents, 2);
    assert_eq!(summary.strategy, IngestStrategy::EmbeddedHtmlTable);
    assert_eq!(summary.rows, 1);
    assert_eq!(summary.matched, 1);
    assert_eq!(summary.positive, 1);
    assert_eq!(summary.output_path.parent(), Some(dir.path()));

    let main = read_sheet(&summary.output_path, "Sheet1");
    assert_eq!(main[1][0], "DOC-1");
    assert_eq!(main[1][8], "ДА");

    let positive = read_sheet(&summary.output_path, "Положительный результат");
    assert_eq!(positive.len(), 2);
    assert_eq!(positive[1], main[1]);
}

// TC-I-011: Custom marker and sheet names
#[test]
fn test_custom_marker_and_sheet_names() {
    let dir = tempfile::tempdir().unwrap();
    let requested = dir.path().join("input.xls");
    let mut yes = TabularRow::from_cells(&["A"]);
    yes.osk_region = "YES".to_string();
    let mut da = TabularRow::from_cells(&["B"]);
    da.osk_region = "ДА".to_string();

    let reconciler = ReconcilerBuilder::new()
        .with_positive_marker("YES")
        .with_sheet_names("All", "Hits")
        .build()
        .unwrap();
    let outcome = reconciler
        .write_report_at(&requested, &[yes, da], chrono::Local::now().naive_local())
        .unwrap();

    assert_eq!(outcome.positive_rows, 1);
    let hits = read_sheet(&outcome.path, "Hits");
    assert_eq!(hits.len(), 2);
    assert_eq!(hits[1][1], "A");
}

// TC-I-012: Malformed XML leaves no output
#[test]
fn test_run_with_malformed_xml() {
    let dir = tempfile::tempdir().unwrap();
    let xml_path = dir.path().join("broken.xml");
    std::fs::write(&xml_path, &fixtures::XML[..fixtures::XML.len() / 2]).unwrap();
    let table_path = fixtures::write_html(dir.path(), "ibd-f.xls", &fixtures::data_rows());

    let reconciler = ReconcilerBuilder::new().build().unwrap();
    let result = reconciler.run(&xml_path, &table_path);
    assert!(matches!(result, Err(FioMatchError::MalformedXml(_))));

    assert!(matches!(
        fiomatch::parse_to_delimited_text(&xml_path),
        Err(FioMatchError::MalformedXml(_))
    ));

    // 入力以外のファイルは作られない
    let files: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
    assert_eq!(files.len(), 2);
}

// TC-I-013: Forced ingest modes
#[test]
fn test_ingest_modes() {
    let dir = tempfile::tempdir().unwrap();
    let html = fixtures::write_html(dir.path(), "report.xls", &fixtures::data_rows());
    let xlsx =
        fixtures::write_xlsx(dir.path(), "report.xlsx", "Sheet1", &fixtures::data_rows()).unwrap();

    let spreadsheet_only = ReconcilerBuilder::new()
        .with_ingest_mode(IngestMode::SpreadsheetOnly)
        .build()
        .unwrap();
    assert!(matches!(
        spreadsheet_only.load_tabular_file(&html),
        Err(FioMatchError::Spreadsheet(_))
    ));
    assert_eq!(spreadsheet_only.load_tabular_file(&xlsx).unwrap().len(), 3);

    let html_only = ReconcilerBuilder::new()
        .with_ingest_mode(IngestMode::HtmlOnly)
        .build()
        .unwrap();
    assert_eq!(html_only.load_tabular_file(&html).unwrap().len(), 3);
}

// TC-I-014: Report styling on disk
#[test]
fn test_report_styles_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let requested = dir.path().join("report.xls");
    let rows: Vec<TabularRow> = fixtures::data_rows()
        .iter()
        .map(|cells| TabularRow::from_cells(cells))
        .collect();
    let rows = fiomatch::match_against_xml(fixtures::XML.as_bytes(), rows).unwrap();
    let output = fiomatch::write_report(&requested, &rows).unwrap();

    let styles = resolve_styles(&read_part(&output, "xl/styles.xml"));
    let main = cell_style_ids(&read_part(&output, "xl/worksheets/sheet1.xml"));
    let positive = cell_style_ids(&read_part(&output, "xl/worksheets/sheet2.xml"));
    let style_of = |sheet: &HashMap<String, usize>, cell: &str| -> ResolvedStyle {
        let id = *sheet
            .get(cell)
            .unwrap_or_else(|| panic!("cell {cell} not written"));
        styles[id].clone()
    };

    let style = |fill: Option<&str>, bold: bool| ResolvedStyle {
        fill: fill.map(str::to_string),
        bold,
        thin_border: true,
    };
    let header = style(Some("D9E1F2"), true);
    let highlight = style(Some("FFFF00"), false);
    let flag = style(Some("FF6600"), true);
    let grid = style(None, false);

    for sheet in [&main, &positive] {
        assert_eq!(style_of(sheet, "A1"), header);
        assert_eq!(style_of(sheet, "Q1"), header);
    }

    // メインシート: 2行目（Petrov）と4行目（Smirnov）が陽性
    assert_eq!(style_of(&main, "A2"), highlight);
    assert_eq!(style_of(&main, "B2"), highlight);
    assert_eq!(style_of(&main, "I2"), flag);
    assert_eq!(style_of(&main, "K2"), highlight);
    assert_eq!(style_of(&main, "Q2"), highlight);
    assert_eq!(style_of(&main, "A3"), grid);
    assert_eq!(style_of(&main, "I3"), grid);
    assert_eq!(style_of(&main, "A4"), highlight);
    assert_eq!(style_of(&main, "I4"), highlight);
    assert_eq!(style_of(&main, "K4"), flag);

    // 陽性シート: フラグセルのみ強調
    assert_eq!(style_of(&positive, "B2"), grid);
    assert_eq!(style_of(&positive, "I2"), flag);
    assert_eq!(style_of(&positive, "K2"), grid);
    assert_eq!(style_of(&positive, "I3"), grid);
    assert_eq!(style_of(&positive, "K3"), flag);
    assert!(!positive.contains_key("A4"));

    // 全17列に同じ列幅、ヘッダー行で固定
    let col = Regex::new(r#"<col min="1" max="17" width="([0-9.]+)" customWidth="1"/>"#).unwrap();
    for part in ["xl/worksheets/sheet1.xml", "xl/worksheets/sheet2.xml"] {
        let xml = read_part(&output, part);
        let width: f64 = col.captures(&xml).unwrap()[1].parse().unwrap();
        assert!((15.0..16.0).contains(&width), "{part}: width {width}");
        let pane = r#"<pane ySplit="1" topLeftCell="A2" activePane="bottomLeft" state="frozen"/>"#;
        assert!(xml.contains(pane), "{part}: header row not frozen");
    }
}
