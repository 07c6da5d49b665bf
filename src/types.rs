//! Types Module
//!
//! クレート全体で使用する共通データ型を定義するモジュール。

use serde::{Deserialize, Serialize};

/// 表形式ファイルの意味のある列数（文書番号を除く）
pub const TABULAR_FIELD_COUNT: usize = 16;

/// 生年月日（XMLの`DD.MM.YYYY`をドットで分解した各要素）
///
/// 各要素はソースの文字列をそのまま保持します（ゼロ埋めや数値化は行いません）。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BirthDate {
    pub day: String,
    pub month: String,
    pub year: String,
}

impl BirthDate {
    /// `day.month.year`形式の文字列を分解する
    ///
    /// ドット区切りの要素がちょうど3つでない場合は`None`を返します。
    ///
    /// # 使用例
    ///
    /// ```rust
    /// use fiomatch::BirthDate;
    ///
    /// let date = BirthDate::parse("15.07.1990").unwrap();
    /// assert_eq!(date.year, "1990");
    /// assert!(BirthDate::parse("1990-07-15").is_none());
    /// ```
    pub fn parse(raw: &str) -> Option<Self> {
        let mut parts = raw.split('.');
        let day = parts.next()?;
        let month = parts.next()?;
        let year = parts.next()?;
        if parts.next().is_some() {
            return None;
        }
        Some(Self {
            day: day.to_string(),
            month: month.to_string(),
            year: year.to_string(),
        })
    }

    /// `year;month;day`形式に整形する
    pub fn to_delimited(&self) -> String {
        format!("{};{};{}", self.year, self.month, self.day)
    }
}

/// XMLの`Document`要素から得られる人物レコード
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonRecord {
    pub surname: String,
    pub name: String,
    pub patronymic: String,
    /// `CPBirthday`の生の値
    pub birthday: String,
    /// 旧姓（`CPLastFIO/CPLSurname`）。要素が無い場合と空の場合はどちらも`None`
    pub former_surname: Option<String>,
    /// `DocumentID`の値
    pub document_id: String,
}

impl PersonRecord {
    /// 分解済みの生年月日
    pub fn birth_date(&self) -> Option<BirthDate> {
        BirthDate::parse(&self.birthday)
    }

    /// この人物が現れ得る姓のバリエーション（現在の姓、旧姓があればそれも）
    pub fn surname_variants(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.surname.as_str()).chain(self.former_surname.as_deref())
    }

    /// 区切り文字付きのテキスト行（バリエーションごとに1行）
    ///
    /// 形式は`surname;name;patronymic;year;month;day`。生年月日を分解できない
    /// 場合、日付部分は空文字列になります。
    pub fn delimited_lines(&self) -> Vec<String> {
        let date = self
            .birth_date()
            .map(|d| d.to_delimited())
            .unwrap_or_default();
        self.surname_variants()
            .map(|surname| format!("{};{};{};{}", surname, self.name, self.patronymic, date))
            .collect()
    }

    /// 照合用キー（バリエーションごと）
    ///
    /// 生年月日を分解できない場合は空のベクターを返します。
    pub fn identity_keys(&self) -> Vec<IdentityKey> {
        let Some(date) = self.birth_date() else {
            return Vec::new();
        };
        self.surname_variants()
            .map(|surname| IdentityKey {
                surname: surname.to_string(),
                name: self.name.clone(),
                patronymic: self.patronymic.clone(),
                birth_year: date.year.clone(),
                birth_month: date.month.clone(),
                birth_day: date.day.clone(),
            })
            .collect()
    }
}

/// 完全一致で比較する照合キー
///
/// 大文字小文字や前後の空白は正規化せず、ソースの値をそのまま使用します。
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IdentityKey {
    pub surname: String,
    pub name: String,
    pub patronymic: String,
    pub birth_year: String,
    pub birth_month: String,
    pub birth_day: String,
}

/// 表形式ファイルの1行
///
/// 先頭16列を位置で割り当てます。足りない列は空文字列のままです。
/// `document_number`は照合後にのみ設定されます。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TabularRow {
    pub surname: String,
    pub name: String,
    pub patronymic: String,
    pub birth_year: String,
    pub birth_month: String,
    pub birth_day: String,
    pub result: String,
    /// 「Розыск лиц」
    pub wanted_persons: String,
    /// 「ОСК регион」
    pub osk_region: String,
    /// 「ОСК ГИАЦ」
    pub osk_registry: String,
    pub admin_practice_region: String,
    pub admin_practice_federal: String,
    /// 「ЗАГС рег.смерти」
    pub registry_death: String,
    pub restricted: String,
    pub passport: String,
    pub deportation_mode: String,
    /// XML由来の文書番号
    pub document_number: String,
}

impl TabularRow {
    /// セル値の並びから位置で行を構築する
    ///
    /// 17列目以降は無視されます。
    pub fn from_cells<S: AsRef<str>>(cells: &[S]) -> Self {
        let cell = |idx: usize| {
            cells
                .get(idx)
                .map(|c| c.as_ref().to_string())
                .unwrap_or_default()
        };
        Self {
            surname: cell(0),
            name: cell(1),
            patronymic: cell(2),
            birth_year: cell(3),
            birth_month: cell(4),
            birth_day: cell(5),
            result: cell(6),
            wanted_persons: cell(7),
            osk_region: cell(8),
            osk_registry: cell(9),
            admin_practice_region: cell(10),
            admin_practice_federal: cell(11),
            registry_death: cell(12),
            restricted: cell(13),
            passport: cell(14),
            deportation_mode: cell(15),
            document_number: String::new(),
        }
    }

    /// この行の照合キー
    pub fn identity_key(&self) -> IdentityKey {
        IdentityKey {
            surname: self.surname.clone(),
            name: self.name.clone(),
            patronymic: self.patronymic.clone(),
            birth_year: self.birth_year.clone(),
            birth_month: self.birth_month.clone(),
            birth_day: self.birth_day.clone(),
        }
    }

    /// 3つのフラグ列（Розыск лиц, ОСК регион, ОСК ГИАЦ）
    pub fn flag_values(&self) -> [&str; 3] {
        [
            self.wanted_persons.as_str(),
            self.osk_region.as_str(),
            self.osk_registry.as_str(),
        ]
    }

    /// いずれかのフラグ列が陽性マーカーと一致するか
    pub fn is_positive(&self, marker: &str) -> bool {
        self.flag_values().iter().any(|v| *v == marker)
    }

    /// レポートの列順（文書番号が先頭）でセル値を返す
    pub fn report_cells(&self) -> [&str; TABULAR_FIELD_COUNT + 1] {
        [
            self.document_number.as_str(),
            self.surname.as_str(),
            self.name.as_str(),
            self.patronymic.as_str(),
            self.birth_year.as_str(),
            self.birth_month.as_str(),
            self.birth_day.as_str(),
            self.result.as_str(),
            self.wanted_persons.as_str(),
            self.osk_region.as_str(),
            self.osk_registry.as_str(),
            self.admin_practice_region.as_str(),
            self.admin_practice_federal.as_str(),
            self.registry_death.as_str(),
            self.restricted.as_str(),
            self.passport.as_str(),
            self.deportation_mode.as_str(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn person(former: Option<&str>) -> PersonRecord {
        PersonRecord {
            surname: "Ivanov".to_string(),
            name: "Ivan".to_string(),
            patronymic: "Ivanovich".to_string(),
            birthday: "01.02.2000".to_string(),
            former_surname: former.map(str::to_string),
            document_id: "DOC-1".to_string(),
        }
    }

    #[test]
    fn test_birth_date_parse() {
        let date = BirthDate::parse("15.07.1990").unwrap();
        assert_eq!(date.day, "15");
        assert_eq!(date.month, "07");
        assert_eq!(date.year, "1990");
        assert_eq!(date.to_delimited(), "1990;07;15");
    }

    #[test]
    fn test_birth_date_wrong_shape() {
        assert!(BirthDate::parse("").is_none());
        assert!(BirthDate::parse("1990").is_none());
        assert!(BirthDate::parse("15.07").is_none());
        assert!(BirthDate::parse("15.07.1990.1").is_none());
        // 空の要素でも3つあれば分解できる
        assert_eq!(
            BirthDate::parse("..").map(|d| d.to_delimited()),
            Some(";;".to_string())
        );
    }

    #[test]
    fn test_delimited_lines_with_former_surname() {
        let lines = person(Some("Petrov")).delimited_lines();
        assert_eq!(
            lines,
            vec![
                "Ivanov;Ivan;Ivanovich;2000;02;01".to_string(),
                "Petrov;Ivan;Ivanovich;2000;02;01".to_string(),
            ]
        );
    }

    #[test]
    fn test_delimited_lines_bad_date() {
        let mut p = person(None);
        p.birthday = "2000-02-01".to_string();
        assert_eq!(p.delimited_lines(), vec!["Ivanov;Ivan;Ivanovich;".to_string()]);
        assert!(p.identity_keys().is_empty());
    }

    #[test]
    fn test_identity_keys_share_everything_but_surname() {
        let keys = person(Some("Petrov")).identity_keys();
        assert_eq!(keys.len(), 2);
        assert_eq!(keys[0].surname, "Ivanov");
        assert_eq!(keys[1].surname, "Petrov");
        assert_eq!(keys[0].birth_year, keys[1].birth_year);
        assert_eq!(keys[0].name, keys[1].name);
    }

    #[test]
    fn test_tabular_row_short_cells() {
        let row = TabularRow::from_cells(&["Ivanov", "Ivan"]);
        assert_eq!(row.surname, "Ivanov");
        assert_eq!(row.name, "Ivan");
        assert_eq!(row.patronymic, "");
        assert_eq!(row.deportation_mode, "");
        assert_eq!(row.document_number, "");
    }

    #[test]
    fn test_tabular_row_extra_cells_ignored() {
        let cells: Vec<String> = (0..20).map(|i| format!("c{}", i)).collect();
        let row = TabularRow::from_cells(&cells);
        assert_eq!(row.deportation_mode, "c15");
        assert_eq!(row.report_cells()[16], "c15");
        assert_eq!(row.report_cells()[0], "");
    }

    #[test]
    fn test_is_positive() {
        let mut row = TabularRow::default();
        assert!(!row.is_positive("ДА"));
        row.osk_registry = "ДА".to_string();
        assert!(row.is_positive("ДА"));
        assert!(!row.is_positive("YES"));

        // フラグ列以外の「ДА」は陽性扱いしない
        let mut other = TabularRow::default();
        other.passport = "ДА".to_string();
        assert!(!other.is_positive("ДА"));
    }
}
