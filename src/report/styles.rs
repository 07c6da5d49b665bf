//! Report Styles
//!
//! レポートのセル書式を定義するモジュール。

use rust_xlsxwriter::{Color, Format, FormatBorder};

/// ヘッダー背景（淡い青）
const HEADER_FILL: u32 = 0xD9E1F2;
/// 陽性行のハイライト（黄）
const HIGHLIGHT_FILL: u32 = 0xFFFF00;
/// 陽性マーカーを持つフラグセル（濃いオレンジ）
const FLAG_FILL: u32 = 0xFF6600;

/// 全辺に細い黒の罫線を付ける
fn bordered(format: Format) -> Format {
    format
        .set_border(FormatBorder::Thin)
        .set_border_color(Color::Black)
}

/// セルの種類
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CellStyle {
    /// ヘッダー行
    Header,
    /// 通常のデータセル
    Grid,
    /// メインシートの陽性行
    Highlight,
    /// 陽性マーカーを持つフラグセル
    Flag,
}

/// レポートで使用する書式のセット
pub(crate) struct ReportStyles {
    header: Format,
    grid: Format,
    highlight: Format,
    flag: Format,
}

impl Default for ReportStyles {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportStyles {
    pub fn new() -> Self {
        Self {
            header: bordered(
                Format::new()
                    .set_bold()
                    .set_background_color(Color::RGB(HEADER_FILL)),
            ),
            grid: bordered(Format::new()),
            highlight: bordered(Format::new().set_background_color(Color::RGB(HIGHLIGHT_FILL))),
            flag: bordered(
                Format::new()
                    .set_bold()
                    .set_background_color(Color::RGB(FLAG_FILL)),
            ),
        }
    }

    /// セルの種類に対応する書式
    pub fn format(&self, style: CellStyle) -> &Format {
        match style {
            CellStyle::Header => &self.header,
            CellStyle::Grid => &self.grid,
            CellStyle::Highlight => &self.highlight,
            CellStyle::Flag => &self.flag,
        }
    }
}
