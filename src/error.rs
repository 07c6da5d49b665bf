//! Error Types Module
//!
//! クレート全体で使用する構造化エラー型を定義するモジュール。
//! `thiserror`を使用して、エラーの自動変換とメッセージフォーマットを実現する。

use std::path::PathBuf;
use thiserror::Error;

/// fiomatchクレート全体で使用するエラー型
///
/// XMLの解析、表形式ファイルの読み込み、照合、レポート出力の各段階で
/// 発生するエラーを統一的に扱うために使用されます。
///
/// # エラーの種類
///
/// - 構造的な失敗（XMLが不正、テーブルが無い、シートが無い）はすべてエラーとして返されます。
/// - 任意要素の欠落（旧姓なし、短い行、分解できない生年月日）はエラーではなく空欄として扱われます。
///
/// # 使用例
///
/// ```rust,no_run
/// use fiomatch::FioMatchError;
///
/// match fiomatch::load_tabular_file("report.xls") {
///     Ok(rows) => println!("{} rows", rows.len()),
///     Err(FioMatchError::NoTableFound) => eprintln!("no <tr> blocks"),
///     Err(e) => eprintln!("{}", e),
/// }
/// ```
#[derive(Error, Debug)]
pub enum FioMatchError {
    /// XMLとして解析できない入力
    ///
    /// 整形式でないバイト列、ルート要素が`List`でない文書、
    /// 閉じられていない要素を含む途中で切れた文書などで発生します。
    #[error("Malformed XML: {0}")]
    MalformedXml(String),

    /// 入力ファイルを開けない、または読み込めない
    #[error("Cannot read file '{}': {source}", path.display())]
    UnreadableFile {
        /// 読み込もうとしたファイルのパス
        path: PathBuf,
        /// 元のI/Oエラー
        #[source]
        source: std::io::Error,
    },

    /// パスを伴わないI/Oエラー
    ///
    /// `#[from]`属性により、`std::io::Error`から自動的に変換されます。
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// スプレッドシートとして開けたが、シートが1つも無い
    #[error("No sheets available in the workbook")]
    NoSheetsAvailable,

    /// HTMLフォールバックで`<tr>...</tr>`ブロックが見つからない
    #[error("No <tr>...</tr> table rows found in HTML")]
    NoTableFound,

    /// HTMLフォールバックで行は見つかったが、セルが1つも抽出できない
    #[error("No <td>/<th> cells found in the HTML table")]
    NoCellsFound,

    /// スプレッドシートのシート読み込みエラー
    ///
    /// コンテナは開けたが、選択したシートの読み込みに失敗した場合に発生します。
    #[error("Failed to read spreadsheet: {0}")]
    Spreadsheet(#[from] calamine::Error),

    /// スプレッドシートのZIPコンテナ内部を読めないエラー
    ///
    /// セルの表示書式（`xl/styles.xml`など）を読み出す際に発生します。
    #[error("ZIP error: {0}")]
    Zip(String),

    /// レポートファイルの生成・保存エラー
    ///
    /// ドキュメントの構築に失敗した場合も、一時ファイルの作成や最終パスへの
    /// 移動に失敗した場合も、出力先のパスとともにこのエラーになります。
    #[error("Failed to write report '{}': {source}", path.display())]
    WriteFailure {
        /// 出力先パス
        path: PathBuf,
        /// 失敗の原因
        #[source]
        source: WriteError,
    },

    /// 読み込んだ行をJSONに変換できないエラー
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// 設定の検証に失敗したエラー
    ///
    /// `ReconcilerBuilder::build()`時に設定を検証し、無効な設定が検出された
    /// 場合に発生します。
    ///
    /// # 例
    ///
    /// ```rust,no_run
    /// use fiomatch::{ReconcilerBuilder, FioMatchError};
    ///
    /// let result = ReconcilerBuilder::new()
    ///     .with_column_width(0.0)
    ///     .build();
    ///
    /// match result {
    ///     Err(FioMatchError::Config(msg)) => {
    ///         println!("設定エラー: {}", msg);
    ///     }
    ///     _ => {}
    /// }
    /// ```
    #[error("Configuration error: {0}")]
    Config(String),

    /// セキュリティ制限に違反したエラー
    ///
    /// 入力ファイルが設定された最大サイズを超えた場合に発生します。
    #[error("Security violation: {0}")]
    SecurityViolation(String),
}

/// レポート書き出しに失敗した原因
#[derive(Error, Debug)]
pub enum WriteError {
    /// ワークブックの構築またはシリアライズに失敗
    #[error(transparent)]
    Document(#[from] rust_xlsxwriter::XlsxError),

    /// 一時ファイルの作成・書き込み・移動に失敗
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl FioMatchError {
    /// パス付きの`UnreadableFile`エラーを生成するヘルパー
    pub(crate) fn unreadable(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        FioMatchError::UnreadableFile {
            path: path.into(),
            source,
        }
    }
}

impl From<quick_xml::Error> for FioMatchError {
    fn from(err: quick_xml::Error) -> Self {
        FioMatchError::MalformedXml(err.to_string())
    }
}
