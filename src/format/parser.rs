//! Number Format Parser Module
//!
//! Excel Number Format Stringを解析し、セル値を表示用の文字列に変換します。

use calamine::{ExcelDateTime, ExcelDateTimeType};
use chrono::{Datelike, Duration, NaiveDateTime, Timelike};

use super::tokens::FormatToken;

/// 解析済みの表示書式
///
/// 最大4つのセクション（正数;負数;ゼロ;テキスト）を保持します。
/// 条件付きセクション（`[>100]`など）は無視されます。
///
/// # 使用例
///
/// ```rust,ignore
/// let format = NumberFormat::parse("00").unwrap();
/// assert_eq!(format.format_number(2.0, false), "02");
///
/// let format = NumberFormat::parse("dd.mm.yyyy").unwrap();
/// assert_eq!(format.format_number(36557.0, false), "01.02.2000");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct NumberFormat {
    sections: Vec<Vec<FormatToken>>,
}

impl NumberFormat {
    /// 書式文字列を解析する
    ///
    /// # 戻り値
    ///
    /// * `Some(NumberFormat)` - 解析結果
    /// * `None` - 空文字列または"General"（素の値をそのまま表示する書式）
    pub fn parse(code: &str) -> Option<Self> {
        let code = code.trim();
        if code.is_empty() || code.eq_ignore_ascii_case("general") {
            return None;
        }

        let sections: Vec<Vec<FormatToken>> = split_sections(code)
            .iter()
            .map(|section| parse_section(section))
            .collect();
        Some(Self { sections })
    }

    /// 日付・時刻の書式か（先頭セクションで判定）
    pub fn is_datetime(&self) -> bool {
        self.sections
            .first()
            .is_some_and(|tokens| tokens.iter().any(FormatToken::is_datetime))
    }

    /// 数値をこの書式で表示用文字列に変換する
    ///
    /// # 引数
    ///
    /// * `value` - セルの数値（日付書式の場合はシリアル値）
    /// * `is_1904` - ワークブックが1904年基準の日付を使うか
    pub fn format_number(&self, value: f64, is_1904: bool) -> String {
        if self.is_datetime() {
            let serial = ExcelDateTime::new(value, ExcelDateTimeType::DateTime, is_1904);
            return match serial.as_datetime() {
                Some(datetime) => self.format_datetime(datetime, value),
                None => general_number(value),
            };
        }

        let (tokens, sign) = self.select_section(value);
        let body = format_numeric(tokens, value.abs());
        if sign {
            format!("-{}", body)
        } else {
            body
        }
    }

    /// 値の符号に応じたセクションを選択
    ///
    /// 負数用のセクションが無い場合は先頭セクションに符号を付けて使います。
    fn select_section(&self, value: f64) -> (&[FormatToken], bool) {
        let numeric = &self.sections[..self.sections.len().min(3)];
        match numeric {
            [_, negative, ..] if value < 0.0 => (negative.as_slice(), false),
            [_, _, zero, ..] if value == 0.0 => (zero.as_slice(), false),
            [first, ..] => (first.as_slice(), value < 0.0),
            [] => (&[], value < 0.0),
        }
    }

    /// 日時をこの書式で表示用文字列に変換する
    ///
    /// # 引数
    ///
    /// * `datetime` - 変換済みの日時
    /// * `serial` - 元のシリアル値（経過時間`[h]`の計算に使用）
    pub fn format_datetime(&self, datetime: NaiveDateTime, serial: f64) -> String {
        let Some(tokens) = self.sections.first() else {
            return general_number(serial);
        };
        let datetime = round_to_second(datetime);
        let twelve_hour = tokens
            .iter()
            .any(|t| matches!(t, FormatToken::AmPm { .. }));

        let mut result = String::new();
        for token in tokens {
            match token {
                FormatToken::Year(count) => {
                    if *count <= 2 {
                        result.push_str(&format!("{:02}", datetime.year().rem_euclid(100)));
                    } else {
                        result.push_str(&format!("{:04}", datetime.year()));
                    }
                }
                FormatToken::Month(count) => match *count {
                    1 | 2 => result.push_str(&pad(datetime.month(), *count)),
                    3 => result.push_str(&datetime.format("%b").to_string()),
                    5 => result.extend(datetime.format("%B").to_string().chars().take(1)),
                    _ => result.push_str(&datetime.format("%B").to_string()),
                },
                FormatToken::Day(count) => match *count {
                    1 | 2 => result.push_str(&pad(datetime.day(), *count)),
                    3 => result.push_str(&datetime.format("%a").to_string()),
                    _ => result.push_str(&datetime.format("%A").to_string()),
                },
                FormatToken::Hour(count) => {
                    let hour = if twelve_hour {
                        match datetime.hour() % 12 {
                            0 => 12,
                            h => h,
                        }
                    } else {
                        datetime.hour()
                    };
                    result.push_str(&pad(hour, *count));
                }
                FormatToken::Minute(count) => result.push_str(&pad(datetime.minute(), *count)),
                FormatToken::Second(count) => result.push_str(&pad(datetime.second(), *count)),
                FormatToken::ElapsedHours(count) => {
                    let hours = (serial * 24.0).floor() as i64;
                    result.push_str(&format!("{:0width$}", hours, width = *count));
                }
                FormatToken::AmPm { short } => {
                    let label = match (datetime.hour() < 12, *short) {
                        (true, false) => "AM",
                        (true, true) => "A",
                        (false, false) => "PM",
                        (false, true) => "P",
                    };
                    result.push_str(label);
                }
                FormatToken::Literal(s) => result.push_str(s),
                FormatToken::General | FormatToken::TextPlaceholder => {
                    result.push_str(&general_number(serial));
                }
                // 秒の小数部などの数値トークンは表示しない
                _ => {}
            }
        }
        result
    }
}

/// 書式が無い（"General"）数値の表示
///
/// 整数値の浮動小数点数は小数部なしで出力します（`1990.0` → `1990`）。
pub(crate) fn general_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

fn pad(value: u32, count: usize) -> String {
    if count >= 2 {
        format!("{:02}", value)
    } else {
        value.to_string()
    }
}

/// ミリ秒単位の誤差を丸めて秒単位にそろえる
fn round_to_second(datetime: NaiveDateTime) -> NaiveDateTime {
    datetime
        .checked_add_signed(Duration::milliseconds(500))
        .and_then(|d| d.with_nanosecond(0))
        .unwrap_or(datetime)
}

/// 桁トークンか（小数点・区切り・パーセントを除く）
fn is_digit(token: &FormatToken) -> bool {
    matches!(
        token,
        FormatToken::IntegerZero(_)
            | FormatToken::IntegerHash
            | FormatToken::DecimalZero(_)
            | FormatToken::DecimalHash
    )
}

/// 数値セクションを適用
///
/// 数値は最初の桁トークンの位置に出力し、前後のリテラルはそのまま残します。
fn format_numeric(tokens: &[FormatToken], value: f64) -> String {
    let mut integer_min = 0;
    let mut grouped = false;
    let mut decimal_min = 0;
    let mut decimal_max = 0;
    let mut percent = false;

    for token in tokens {
        match token {
            FormatToken::IntegerZero(count) => integer_min += count,
            FormatToken::ThousandSeparator => grouped = true,
            FormatToken::DecimalZero(count) => {
                decimal_min += count;
                decimal_max += count;
            }
            FormatToken::DecimalHash => decimal_max += 1,
            FormatToken::Percent => percent = true,
            _ => {}
        }
    }

    let scaled = if percent { value * 100.0 } else { value };
    let number = render_digits(scaled, integer_min, grouped, decimal_min, decimal_max);

    let mut result = String::new();
    let mut placed = false;
    for token in tokens {
        match token {
            FormatToken::Literal(s) => result.push_str(s),
            FormatToken::Percent => result.push('%'),
            FormatToken::General | FormatToken::TextPlaceholder => {
                result.push_str(&general_number(value));
            }
            t if is_digit(t) && !placed => {
                result.push_str(&number);
                placed = true;
            }
            _ => {}
        }
    }
    result
}

/// 桁数の指定に従って非負の数値を文字列化
fn render_digits(
    value: f64,
    integer_min: usize,
    grouped: bool,
    decimal_min: usize,
    decimal_max: usize,
) -> String {
    let fixed = format!("{:.*}", decimal_max, value);
    let (integer, fraction) = match fixed.split_once('.') {
        Some((i, f)) => (i.to_string(), f.to_string()),
        None => (fixed, String::new()),
    };

    let mut fraction = fraction;
    while fraction.len() > decimal_min && fraction.ends_with('0') {
        fraction.pop();
    }

    let mut integer = if integer == "0" && integer_min == 0 {
        String::new()
    } else {
        integer
    };
    while integer.len() < integer_min {
        integer.insert(0, '0');
    }
    if grouped {
        integer = add_thousand_separators(&integer);
    }

    if fraction.is_empty() {
        integer
    } else {
        format!("{}.{}", integer, fraction)
    }
}

fn add_thousand_separators(digits: &str) -> String {
    let len = digits.len();
    let mut result = String::with_capacity(len + len / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            result.push(',');
        }
        result.push(ch);
    }
    result
}

/// 引用符・エスケープ・角括弧の外にある`;`でセクションに分割
fn split_sections(code: &str) -> Vec<String> {
    let mut sections = Vec::new();
    let mut current = String::new();
    let mut in_quote = false;
    let mut in_bracket = false;
    let mut escaped = false;

    for ch in code.chars() {
        if escaped {
            current.push(ch);
            escaped = false;
            continue;
        }
        match ch {
            '\\' if !in_quote => {
                current.push(ch);
                escaped = true;
            }
            '"' => {
                current.push(ch);
                in_quote = !in_quote;
            }
            '[' if !in_quote => {
                current.push(ch);
                in_bracket = true;
            }
            ']' if !in_quote => {
                current.push(ch);
                in_bracket = false;
            }
            ';' if !in_quote && !in_bracket => sections.push(std::mem::take(&mut current)),
            _ => current.push(ch),
        }
    }
    sections.push(current);
    sections
}

/// 同じ文字（大文字小文字を区別しない）の連続数
fn run_length(chars: &[char], start: usize, target: char) -> usize {
    chars[start..]
        .iter()
        .take_while(|c| c.eq_ignore_ascii_case(&target))
        .count()
}

/// `chars[start..]`が`word`で始まるか（大文字小文字を区別しない）
fn starts_with_ci(chars: &[char], start: usize, word: &str) -> bool {
    let mut idx = start;
    for expected in word.chars() {
        match chars.get(idx) {
            Some(c) if c.eq_ignore_ascii_case(&expected) => idx += 1,
            _ => return false,
        }
    }
    true
}

/// 角括弧の中身を解釈
///
/// 経過時間（`[h]`、`[mm]`、`[ss]`）と通貨記号（`[$€-407]`）以外は無視します。
fn bracket_token(inner: &str) -> Option<FormatToken> {
    let lower = inner.to_ascii_lowercase();
    if !lower.is_empty() && lower.chars().all(|c| c == 'h') {
        return Some(FormatToken::ElapsedHours(lower.len()));
    }
    if !lower.is_empty() && lower.chars().all(|c| c == 'm') {
        return Some(FormatToken::Minute(lower.len()));
    }
    if !lower.is_empty() && lower.chars().all(|c| c == 's') {
        return Some(FormatToken::Second(lower.len()));
    }
    let symbol = inner.strip_prefix('$')?.split('-').next()?;
    (!symbol.is_empty()).then(|| FormatToken::Literal(symbol.to_string()))
}

/// 1セクションをトークン列に変換
fn parse_section(section: &str) -> Vec<FormatToken> {
    let chars: Vec<char> = section.chars().collect();
    let mut tokens: Vec<FormatToken> = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let ch = chars[i];
        let decimal_seen = tokens.contains(&FormatToken::DecimalPoint);
        match ch {
            '"' => {
                let end = chars[i + 1..]
                    .iter()
                    .position(|&c| c == '"')
                    .map_or(chars.len(), |p| i + 1 + p);
                tokens.push(FormatToken::Literal(chars[i + 1..end].iter().collect()));
                i = end + 1;
            }
            '\\' => {
                if let Some(&next) = chars.get(i + 1) {
                    tokens.push(FormatToken::Literal(next.to_string()));
                }
                i += 2;
            }
            '_' => {
                tokens.push(FormatToken::Literal(" ".to_string()));
                i += 2;
            }
            '*' => i += 2,
            '[' => {
                let end = chars[i..]
                    .iter()
                    .position(|&c| c == ']')
                    .map_or(chars.len(), |p| i + p);
                let inner: String = chars[i + 1..end].iter().collect();
                tokens.extend(bracket_token(&inner));
                i = end + 1;
            }
            '0' => {
                let count = run_length(&chars, i, '0');
                tokens.push(if decimal_seen {
                    FormatToken::DecimalZero(count)
                } else {
                    FormatToken::IntegerZero(count)
                });
                i += count;
            }
            '#' | '?' => {
                tokens.push(if decimal_seen {
                    FormatToken::DecimalHash
                } else {
                    FormatToken::IntegerHash
                });
                i += 1;
            }
            '.' => {
                let next_is_digit = matches!(chars.get(i + 1), Some('0' | '#' | '?'));
                let after_digit = tokens.last().is_some_and(is_digit);
                if !decimal_seen && (next_is_digit || after_digit) {
                    tokens.push(FormatToken::DecimalPoint);
                } else {
                    tokens.push(FormatToken::Literal(".".to_string()));
                }
                i += 1;
            }
            ',' => {
                let after_digit = tokens.last().is_some_and(is_digit);
                let next_is_digit = matches!(chars.get(i + 1), Some('0' | '#' | '?'));
                if after_digit && next_is_digit {
                    tokens.push(FormatToken::ThousandSeparator);
                } else if !after_digit {
                    tokens.push(FormatToken::Literal(",".to_string()));
                }
                i += 1;
            }
            '%' => {
                tokens.push(FormatToken::Percent);
                i += 1;
            }
            '@' => {
                tokens.push(FormatToken::TextPlaceholder);
                i += 1;
            }
            'y' | 'Y' => {
                let count = run_length(&chars, i, 'y');
                tokens.push(FormatToken::Year(count));
                i += count;
            }
            'm' | 'M' => {
                let count = run_length(&chars, i, 'm');
                tokens.push(FormatToken::Month(count));
                i += count;
            }
            'd' | 'D' => {
                let count = run_length(&chars, i, 'd');
                tokens.push(FormatToken::Day(count));
                i += count;
            }
            'h' | 'H' => {
                let count = run_length(&chars, i, 'h');
                tokens.push(FormatToken::Hour(count));
                i += count;
            }
            's' | 'S' => {
                let count = run_length(&chars, i, 's');
                tokens.push(FormatToken::Second(count));
                i += count;
            }
            'a' | 'A' if starts_with_ci(&chars, i, "am/pm") => {
                tokens.push(FormatToken::AmPm { short: false });
                i += 5;
            }
            'a' | 'A' if starts_with_ci(&chars, i, "a/p") => {
                tokens.push(FormatToken::AmPm { short: true });
                i += 3;
            }
            'g' | 'G' if starts_with_ci(&chars, i, "general") => {
                tokens.push(FormatToken::General);
                i += 7;
            }
            _ => {
                tokens.push(FormatToken::Literal(ch.to_string()));
                i += 1;
            }
        }
    }

    resolve_minutes(&mut tokens);
    tokens
}

/// 時の直後、または秒の直前にある"m"/"mm"を分として扱う
fn resolve_minutes(tokens: &mut [FormatToken]) {
    for idx in 0..tokens.len() {
        let FormatToken::Month(count) = tokens[idx] else {
            continue;
        };
        if count > 2 {
            continue;
        }
        let after_hour = matches!(
            tokens[..idx].iter().rev().find(|t| t.is_datetime()),
            Some(FormatToken::Hour(_) | FormatToken::ElapsedHours(_))
        );
        let before_second = matches!(
            tokens[idx + 1..].iter().find(|t| t.is_datetime()),
            Some(FormatToken::Second(_))
        );
        if after_hour || before_second {
            tokens[idx] = FormatToken::Minute(count);
        }
    }
}
