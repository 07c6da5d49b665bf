//! Parser Module
//!
//! quick-xmlを使用したXMLの解析。
//!
//! - 有罪者リストXMLをイベント単位で読み、`PersonRecord`の列に正規化します。
//! - XLSXコンテナ内のスタイル情報から、セルごとの表示書式を読み出します。

mod cell_formats;
mod conviction;

pub(crate) use cell_formats::CellFormats;
pub(crate) use conviction::ConvictionList;
