//! Format Module
//!
//! セルに設定されたExcel Number Format Stringを解析し、
//! スプレッドシート上で表示される文字列と同じ形に数値を整形します。

mod parser;
mod tokens;

pub(crate) use parser::{general_number, NumberFormat};
