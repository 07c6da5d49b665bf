//! Public API Types
//!
//! 公開APIで使用する列挙型を定義するモジュール。

use serde::Serialize;
use std::fmt;

/// 表形式ファイルの読み込み方式
///
/// 読み込み戦略の選択方法を指定します。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[non_exhaustive]
pub enum IngestMode {
    /// スプレッドシートとして開くことを試み、開けなければHTMLテーブルとして読む（デフォルト）
    #[default]
    Auto,

    /// スプレッドシートとしてのみ読み込む
    ///
    /// 開けない場合は`FioMatchError::Spreadsheet`を返します。
    SpreadsheetOnly,

    /// HTMLテーブルとしてのみ読み込む
    ///
    /// `.xls`拡張子で保存されたHTMLエクスポートなど、形式が分かっている場合に使用します。
    HtmlOnly,
}

/// 実際に使用された読み込み戦略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum IngestStrategy {
    /// スプレッドシートコンテナ（XLSX/XLS/ODS）
    StructuredSpreadsheet,

    /// テキスト中に埋め込まれたHTMLの`<table>`
    ///
    /// # 入力例
    ///
    /// ```html
    /// <table>
    ///   <tr><th>Фамилия</th><th>Имя</th></tr>
    ///   <tr><td>Иванов</td><td>Иван</td></tr>
    /// </table>
    /// ```
    EmbeddedHtmlTable,
}

impl fmt::Display for IngestStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IngestStrategy::StructuredSpreadsheet => write!(f, "spreadsheet"),
            IngestStrategy::EmbeddedHtmlTable => write!(f, "html-table"),
        }
    }
}
