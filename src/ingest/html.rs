//! HTML Table Strategy
//!
//! テキスト中の`<tr>`/`<td>`/`<th>`ブロックを走査してセル文字列を抽出する。
//! 整形式のHTMLであることは要求しません。

use log::debug;
use regex::Regex;

use crate::error::FioMatchError;

/// UTF-8のBOM
const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// 入力バイト列をテキストとしてデコード
///
/// UTF-8として有効であればそのまま（BOMは除去）、そうでなければ
/// Windows-1251としてデコードします。
pub(super) fn decode_text(data: &[u8]) -> String {
    let data = data.strip_prefix(UTF8_BOM).unwrap_or(data);
    match std::str::from_utf8(data) {
        Ok(text) => text.to_string(),
        Err(_) => {
            debug!("Input is not valid UTF-8, decoding as windows-1251");
            let (text, _) = encoding_rs::WINDOWS_1251.decode_without_bom_handling(data);
            text.into_owned()
        }
    }
}

/// HTMLテーブル走査器
///
/// 正規表現は走査器ごとにコンパイルされ、実行間で共有されません。
pub(crate) struct HtmlTableScanner {
    /// `<tr ...>...</tr>`（大文字小文字無視、改行をまたぐ）
    row: Regex,
    /// `<td ...>...</td>`または`<th ...>...</th>`
    cell: Regex,
    /// 任意のタグ
    tag: Regex,
}

impl Default for HtmlTableScanner {
    fn default() -> Self {
        Self::new()
    }
}

impl HtmlTableScanner {
    pub fn new() -> Self {
        Self {
            row: Regex::new(r"(?is)<tr[^>]*>(.*?)</tr>").expect("row pattern is valid"),
            cell: Regex::new(r"(?is)<t[dh][^>]*>(.*?)</t[dh]>").expect("cell pattern is valid"),
            tag: Regex::new(r"(?s)<.*?>").expect("tag pattern is valid"),
        }
    }

    /// セルのテキストを整形
    ///
    /// タグを除去し、`&nbsp;`を空白に置き換え、基本的な文字実体参照を戻してから
    /// 前後の空白を取り除きます。
    pub fn cell_text(&self, inner_html: &str) -> String {
        let text = self.tag.replace_all(inner_html, "");
        let text = text
            .replace("&nbsp;", " ")
            .replace("&#160;", " ")
            .replace("&lt;", "<")
            .replace("&gt;", ">")
            .replace("&quot;", "\"")
            .replace("&#39;", "'")
            .replace("&amp;", "&");
        text.trim().to_string()
    }

    /// テキストからテーブルの行列を抽出
    ///
    /// # 戻り値
    ///
    /// * `Ok(Vec<Vec<String>>)` - セルを1つ以上含む行のみ（ヘッダー行を含む）
    /// * `Err(FioMatchError::NoTableFound)` - `<tr>`ブロックが1つも無い場合
    /// * `Err(FioMatchError::NoCellsFound)` - どの行からもセルを抽出できない場合
    pub fn scan(&self, text: &str) -> Result<Vec<Vec<String>>, FioMatchError> {
        let mut found_row = false;
        let mut rows = Vec::new();

        for row_caps in self.row.captures_iter(text) {
            found_row = true;
            let row_html = row_caps.get(1).map_or("", |m| m.as_str());

            let cells: Vec<String> = self
                .cell
                .captures_iter(row_html)
                .map(|cell_caps| self.cell_text(cell_caps.get(1).map_or("", |m| m.as_str())))
                .collect();

            if !cells.is_empty() {
                rows.push(cells);
            }
        }

        if !found_row {
            return Err(FioMatchError::NoTableFound);
        }
        if rows.is_empty() {
            return Err(FioMatchError::NoCellsFound);
        }

        Ok(rows)
    }
}
