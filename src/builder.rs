//! Builder Module
//!
//! Fluent Builder APIを提供し、`Reconciler`インスタンスを段階的に構築する。

use chrono::{Local, NaiveDateTime};
use log::info;
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::api::{IngestMode, IngestStrategy};
use crate::error::FioMatchError;
use crate::ingest::{self, LoadedTable};
use crate::matcher::MatchIndex;
use crate::parser::ConvictionList;
use crate::report::{ReportOutcome, ReportWriter};
use crate::security::{read_input_file, SecurityConfig};
use crate::types::{PersonRecord, TabularRow};

/// シート名に使用できない文字
const INVALID_SHEET_CHARS: [char; 7] = ['[', ']', ':', '*', '?', '/', '\\'];

/// シート名の最大文字数
const MAX_SHEET_NAME_CHARS: usize = 31;

/// 列幅の上限（Excelの制限）
const MAX_COLUMN_WIDTH: f64 = 255.0;

/// 照合処理の設定を保持する内部構造体
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ReconcileConfig {
    /// 表形式ファイルの読み込みモード
    pub ingest_mode: IngestMode,

    /// スプレッドシートで優先するシート名
    pub preferred_sheet: String,

    /// フラグ列の陽性マーカー
    pub positive_marker: String,

    /// 出力ファイル名の接頭辞
    pub output_prefix: String,

    /// 全列共通の列幅
    pub column_width: f64,

    /// メインシート名
    pub main_sheet_name: String,

    /// 陽性シート名
    pub positive_sheet_name: String,

    /// セキュリティ設定
    pub security: SecurityConfig,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            ingest_mode: IngestMode::Auto,
            preferred_sheet: "Sheet1".to_string(),
            positive_marker: "ДА".to_string(),
            output_prefix: "goususlugi_".to_string(),
            column_width: 15.0,
            main_sheet_name: "Sheet1".to_string(),
            positive_sheet_name: "Положительный результат".to_string(),
            security: SecurityConfig::default(),
        }
    }
}

/// シート名の検証
fn validate_sheet_name(label: &str, name: &str) -> Result<(), FioMatchError> {
    let chars = name.chars().count();
    if chars == 0 || chars > MAX_SHEET_NAME_CHARS {
        return Err(FioMatchError::Config(format!(
            "Invalid {} sheet name '{}': must be 1 to {} characters",
            label, name, MAX_SHEET_NAME_CHARS
        )));
    }
    if name.contains(INVALID_SHEET_CHARS) {
        return Err(FioMatchError::Config(format!(
            "Invalid {} sheet name '{}': contains one of []:*?/\\",
            label, name
        )));
    }
    Ok(())
}

/// Fluent Builder APIを提供する構造体
///
/// `Reconciler`インスタンスを段階的に構築するためのビルダーです。
/// すべての設定項目にデフォルト値が設定されており、必要な設定のみをオーバーライドできます。
///
/// # 使用例
///
/// ```rust,no_run
/// use fiomatch::{IngestMode, ReconcilerBuilder};
///
/// # fn main() -> Result<(), fiomatch::FioMatchError> {
/// let reconciler = ReconcilerBuilder::new()
///     .with_ingest_mode(IngestMode::HtmlOnly)
///     .with_positive_marker("YES")
///     .build()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ReconcilerBuilder {
    /// 内部設定（構築中）
    config: ReconcileConfig,
}

impl Default for ReconcilerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ReconcilerBuilder {
    /// デフォルト設定を持つビルダーインスタンスを生成する
    ///
    /// # デフォルト設定
    ///
    /// - 読み込みモード: 自動判定（スプレッドシート → HTML）
    /// - 優先シート: `Sheet1`
    /// - 陽性マーカー: `ДА`
    /// - 出力接頭辞: `goususlugi_`
    /// - 列幅: 15
    /// - シート名: `Sheet1` / `Положительный результат`
    /// - 入力ファイルの最大サイズ: 2GB
    pub fn new() -> Self {
        Self {
            config: ReconcileConfig::default(),
        }
    }

    /// 表形式ファイルの読み込みモードを指定する
    pub fn with_ingest_mode(mut self, mode: IngestMode) -> Self {
        self.config.ingest_mode = mode;
        self
    }

    /// スプレッドシートで優先して読むシート名を指定する
    ///
    /// 指定したシートが存在しない場合は最初のシートを読みます。
    pub fn with_preferred_sheet(mut self, name: impl Into<String>) -> Self {
        self.config.preferred_sheet = name.into();
        self
    }

    /// フラグ列の陽性マーカーを指定する
    ///
    /// # 使用例
    ///
    /// ```rust,no_run
    /// use fiomatch::ReconcilerBuilder;
    ///
    /// let builder = ReconcilerBuilder::new().with_positive_marker("YES");
    /// ```
    pub fn with_positive_marker(mut self, marker: impl Into<String>) -> Self {
        self.config.positive_marker = marker.into();
        self
    }

    /// 出力ファイル名の接頭辞を指定する
    pub fn with_output_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.output_prefix = prefix.into();
        self
    }

    /// 全列共通の列幅を指定する
    pub fn with_column_width(mut self, width: f64) -> Self {
        self.config.column_width = width;
        self
    }

    /// メインシートと陽性シートの名前を指定する
    pub fn with_sheet_names(
        mut self,
        main: impl Into<String>,
        positive: impl Into<String>,
    ) -> Self {
        self.config.main_sheet_name = main.into();
        self.config.positive_sheet_name = positive.into();
        self
    }

    /// 入力ファイルの最大サイズ（バイト）を指定する
    pub fn with_max_input_file_size(mut self, bytes: u64) -> Self {
        self.config.security.max_input_file_size = bytes;
        self
    }

    /// 設定を検証し、`Reconciler`インスタンスを生成する
    ///
    /// # 戻り値
    ///
    /// * `Ok(Reconciler)` - 設定が有効な場合
    /// * `Err(FioMatchError::Config)` - 設定が無効な場合
    ///
    /// # 発生し得るエラー
    ///
    /// * 優先シート名、陽性マーカー、出力接頭辞が空
    /// * 出力接頭辞にパス区切り文字が含まれる
    /// * 列幅が0以下、または255を超える
    /// * シート名がExcelの制約を満たさない、または2つのシート名が同じ
    /// * 入力ファイルの最大サイズが0
    pub fn build(self) -> Result<Reconciler, FioMatchError> {
        let config = &self.config;

        // 1. 文字列設定の検証
        if config.preferred_sheet.is_empty() {
            return Err(FioMatchError::Config(
                "Preferred sheet name must not be empty".to_string(),
            ));
        }
        if config.positive_marker.is_empty() {
            return Err(FioMatchError::Config(
                "Positive marker must not be empty".to_string(),
            ));
        }
        if config.output_prefix.is_empty() {
            return Err(FioMatchError::Config(
                "Output prefix must not be empty".to_string(),
            ));
        }
        if config.output_prefix.contains(['/', '\\']) {
            return Err(FioMatchError::Config(format!(
                "Output prefix must not contain path separators: '{}'",
                config.output_prefix
            )));
        }

        // 2. 列幅の検証
        if !(config.column_width > 0.0 && config.column_width <= MAX_COLUMN_WIDTH) {
            return Err(FioMatchError::Config(format!(
                "Invalid column width: {} (must be in (0, {}])",
                config.column_width, MAX_COLUMN_WIDTH
            )));
        }

        // 3. シート名の検証
        validate_sheet_name("main", &config.main_sheet_name)?;
        validate_sheet_name("positive", &config.positive_sheet_name)?;
        if config.main_sheet_name.to_lowercase() == config.positive_sheet_name.to_lowercase() {
            return Err(FioMatchError::Config(format!(
                "Main and positive sheet names must differ: '{}'",
                config.main_sheet_name
            )));
        }

        // 4. セキュリティ設定の検証
        if config.security.max_input_file_size == 0 {
            return Err(FioMatchError::Config(
                "Maximum input file size must be greater than zero".to_string(),
            ));
        }

        Ok(Reconciler::new(self.config))
    }
}

/// パイプライン1回分の実行結果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// XMLの`Document`要素数
    pub documents: usize,
    /// 表形式ファイルの読み込み戦略
    pub strategy: IngestStrategy,
    /// 表形式ファイルのデータ行数
    pub rows: usize,
    /// 文書番号が付与された行数
    pub matched: usize,
    /// 陽性の行数
    pub positive: usize,
    /// 出力ファイルのパス
    pub output_path: PathBuf,
}

/// 照合パイプラインのファサード
///
/// XMLの正規化、表形式ファイルの読み込み、照合、レポート出力を提供します。
/// 各呼び出しは独立しており、実行間で状態を共有しません。
///
/// # 使用例
///
/// ```rust,no_run
/// use fiomatch::ReconcilerBuilder;
///
/// # fn main() -> Result<(), fiomatch::FioMatchError> {
/// let reconciler = ReconcilerBuilder::new().build()?;
/// let summary = reconciler.run("export.xml", "ibd-f.xls")?;
/// println!("{} of {} rows matched", summary.matched, summary.rows);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Reconciler {
    /// 照合設定
    config: ReconcileConfig,
}

impl Reconciler {
    pub(crate) fn new(config: ReconcileConfig) -> Self {
        Self { config }
    }

    /// 入力ファイルをサイズ制限付きで読み込む
    pub fn read_file(&self, path: impl AsRef<Path>) -> Result<Vec<u8>, FioMatchError> {
        read_input_file(path.as_ref(), &self.config.security)
    }

    /// XMLファイルを区切り文字付きテキストに変換
    ///
    /// 各行は`surname;name;patronymic;year;month;day`で、改行で終わります。
    /// 旧姓がある人物は2行になります。
    pub fn parse_to_delimited_text(&self, path: impl AsRef<Path>) -> Result<String, FioMatchError> {
        let data = self.read_file(path)?;
        let lines = ConvictionList::parse(&data)?.lines();

        let mut text = String::new();
        for line in &lines {
            text.push_str(line);
            text.push('\n');
        }
        Ok(text)
    }

    /// 表形式ファイルを読み込み、使用した戦略とともに返す
    pub fn load_table(&self, path: impl AsRef<Path>) -> Result<LoadedTable, FioMatchError> {
        let data = self.read_file(path)?;
        ingest::load_table(&data, self.config.ingest_mode, &self.config.preferred_sheet)
    }

    /// 表形式ファイルを読み込む（先頭行はヘッダーとしてスキップ）
    pub fn load_tabular_file(
        &self,
        path: impl AsRef<Path>,
    ) -> Result<Vec<TabularRow>, FioMatchError> {
        Ok(self.load_table(path)?.rows)
    }

    /// XMLバイト列と照合し、一致した行に文書番号を付与して返す
    ///
    /// XMLの解析に失敗した場合は行を返さずにエラーを返します。
    pub fn match_against_xml(
        &self,
        xml: &[u8],
        mut rows: Vec<TabularRow>,
    ) -> Result<Vec<TabularRow>, FioMatchError> {
        let list = ConvictionList::parse(xml)?;
        MatchIndex::build(list.records()).apply(&mut rows);
        Ok(rows)
    }

    /// 2シート構成のレポートを書き出し、そのパスを返す
    ///
    /// 出力先は`path`と同じディレクトリの`<接頭辞><DD.MM.YYYY_HH-MM-SS>.xlsx`です。
    pub fn write_report(
        &self,
        path: impl AsRef<Path>,
        rows: &[TabularRow],
    ) -> Result<PathBuf, FioMatchError> {
        Ok(self
            .write_report_at(path, rows, Local::now().naive_local())?
            .path)
    }

    /// 日時を指定してレポートを書き出す
    pub fn write_report_at(
        &self,
        path: impl AsRef<Path>,
        rows: &[TabularRow],
        timestamp: NaiveDateTime,
    ) -> Result<ReportOutcome, FioMatchError> {
        ReportWriter::new(&self.config).write(path.as_ref(), rows, timestamp)
    }

    /// パイプライン全体を実行する
    ///
    /// # 処理フロー
    ///
    /// 1. XMLファイルの読み込みと解析
    /// 2. 表形式ファイルの読み込み
    /// 3. 照合
    /// 4. 表形式ファイルと同じディレクトリへのレポート出力
    pub fn run(
        &self,
        xml_path: impl AsRef<Path>,
        tabular_path: impl AsRef<Path>,
    ) -> Result<RunSummary, FioMatchError> {
        let tabular_path = tabular_path.as_ref();

        let xml = self.read_file(xml_path)?;
        let list = ConvictionList::parse(&xml)?;

        let LoadedTable { strategy, mut rows } = self.load_table(tabular_path)?;

        let matched = MatchIndex::build(list.records()).apply(&mut rows);
        info!("Matched {} of {} rows", matched, rows.len());

        let outcome = self.write_report_at(tabular_path, &rows, Local::now().naive_local())?;

        Ok(RunSummary {
            documents: list.records().len(),
            strategy,
            rows: rows.len(),
            matched,
            positive: outcome.positive_rows,
            output_path: outcome.path,
        })
    }
}

/// XMLバイト列を人物レコードの列に解析する
pub fn parse_person_records(xml: &[u8]) -> Result<Vec<PersonRecord>, FioMatchError> {
    Ok(ConvictionList::parse(xml)?.into_records())
}

/// XMLバイト列を区切り文字付きのテキスト行に変換する
pub fn parse_xml_to_lines(xml: &[u8]) -> Result<Vec<String>, FioMatchError> {
    Ok(ConvictionList::parse(xml)?.lines())
}
