//! FormatToken Module
//!
//! Excel Number Format Stringのトークン定義。

/// フォーマットトークン
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum FormatToken {
    /// 年（"yy" -> 2桁, "yyyy" -> 4桁）
    Year(usize),

    /// 月（"m" -> 1桁, "mm" -> 2桁, "mmm" -> 略称, "mmmm" -> 名称, "mmmmm" -> 頭文字）
    Month(usize),

    /// 日（"d" -> 1桁, "dd" -> 2桁, "ddd" -> 曜日略称, "dddd" -> 曜日名称）
    Day(usize),

    /// 時
    Hour(usize),

    /// 分
    ///
    /// 書式文字列では月と同じ"m"で表され、直前の時または直後の秒から判定されます。
    Minute(usize),

    /// 秒
    Second(usize),

    /// 経過時間（"[h]"）
    ElapsedHours(usize),

    /// 午前・午後（"AM/PM"、"A/P"）
    AmPm { short: bool },

    /// 整数部のゼロパディング（"00" -> 2桁）
    IntegerZero(usize),

    /// 整数部の任意桁（"#"、"?"）
    IntegerHash,

    /// 小数点
    DecimalPoint,

    /// 小数部の必須桁（"00" -> 2桁）
    DecimalZero(usize),

    /// 小数部の任意桁（"#"、"?"）
    DecimalHash,

    /// 千の位区切り
    ThousandSeparator,

    /// パーセント記号
    Percent,

    /// リテラル文字列
    Literal(String),

    /// テキストプレースホルダー（"@"）
    TextPlaceholder,

    /// "General"
    General,
}

impl FormatToken {
    /// 日付・時刻関連のトークンか
    pub fn is_datetime(&self) -> bool {
        matches!(
            self,
            FormatToken::Year(_)
                | FormatToken::Month(_)
                | FormatToken::Day(_)
                | FormatToken::Hour(_)
                | FormatToken::Minute(_)
                | FormatToken::Second(_)
                | FormatToken::ElapsedHours(_)
        )
    }

    /// 数値の桁に関するトークンか
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            FormatToken::IntegerZero(_)
                | FormatToken::IntegerHash
                | FormatToken::DecimalPoint
                | FormatToken::DecimalZero(_)
                | FormatToken::DecimalHash
                | FormatToken::ThousandSeparator
                | FormatToken::Percent
        )
    }
}
