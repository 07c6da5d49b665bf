//! Conviction List Parser Module
//!
//! `List/Document/RequestInfo/ConvictionPerson`形式のXMLを解析し、
//! 人物レコードの列に正規化するモジュール。

use log::debug;
use quick_xml::events::Event;
use quick_xml::Reader;

use crate::error::FioMatchError;
use crate::types::PersonRecord;

const ROOT: &[u8] = b"List";
const DOCUMENT: &[u8] = b"Document";

/// 値を取り出す葉要素
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LeafField {
    Surname,
    Name,
    Patronymic,
    Birthday,
    FormerSurname,
    DocumentId,
}

impl LeafField {
    /// ルートからの要素パスに対応する葉要素を判定
    ///
    /// パスは`List`を含む完全なものを受け取ります。
    fn from_path(path: &[Vec<u8>]) -> Option<Self> {
        let path: Vec<&[u8]> = path.iter().map(Vec::as_slice).collect();
        match path.as_slice() {
            [ROOT, DOCUMENT, b"DocumentID"] => Some(LeafField::DocumentId),
            [ROOT, DOCUMENT, b"RequestInfo", b"ConvictionPerson", leaf] => match *leaf {
                b"CPSurname" => Some(LeafField::Surname),
                b"CPName" => Some(LeafField::Name),
                b"CPPatronymic" => Some(LeafField::Patronymic),
                b"CPBirthday" => Some(LeafField::Birthday),
                _ => None,
            },
            [ROOT, DOCUMENT, b"RequestInfo", b"ConvictionPerson", b"CPLastFIO", b"CPLSurname"] => {
                Some(LeafField::FormerSurname)
            }
            _ => None,
        }
    }
}

/// 解析中の`Document`要素
#[derive(Debug, Default)]
struct DocumentBuilder {
    record: PersonRecord,
    former_surname: String,
}

impl DocumentBuilder {
    fn field_mut(&mut self, field: LeafField) -> &mut String {
        match field {
            LeafField::Surname => &mut self.record.surname,
            LeafField::Name => &mut self.record.name,
            LeafField::Patronymic => &mut self.record.patronymic,
            LeafField::Birthday => &mut self.record.birthday,
            LeafField::FormerSurname => &mut self.former_surname,
            LeafField::DocumentId => &mut self.record.document_id,
        }
    }

    fn finish(self) -> PersonRecord {
        let mut record = self.record;
        // 空の旧姓は旧姓なしと同じ扱い
        if !self.former_surname.is_empty() {
            record.former_surname = Some(self.former_surname);
        }
        record
    }
}

/// 解析済みの有罪者リスト
///
/// XML文書全体を一度に解析し、`Document`要素ごとの`PersonRecord`を
/// 文書内の順序で保持します。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct ConvictionList {
    records: Vec<PersonRecord>,
}

impl ConvictionList {
    /// XMLバイト列を解析
    ///
    /// # 引数
    ///
    /// * `xml` - UTF-8のXMLバイト列
    ///
    /// # 戻り値
    ///
    /// * `Ok(ConvictionList)` - 解析に成功した場合
    /// * `Err(FioMatchError::MalformedXml)` - 整形式でない、ルート要素が`List`でない、
    ///   または文書が途中で終わっている場合
    ///
    /// # 注意
    ///
    /// 任意要素（`CPLastFIO`など）が無い場合はエラーではなく空欄として扱います。
    /// 同じ葉要素が繰り返された場合は最後の値が採用されます。
    pub fn parse(xml: &[u8]) -> Result<Self, FioMatchError> {
        let mut reader = Reader::from_reader(xml);

        let mut buf = Vec::new();
        let mut path: Vec<Vec<u8>> = Vec::new();
        let mut seen_root = false;
        let mut current: Option<DocumentBuilder> = None;
        let mut active_field: Option<LeafField> = None;
        let mut records = Vec::new();

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(e) => {
                    let name = e.local_name().as_ref().to_vec();
                    if path.is_empty() {
                        Self::check_root(&name, &mut seen_root)?;
                    }
                    path.push(name);

                    if path.len() == 2 && path[1] == DOCUMENT {
                        current = Some(DocumentBuilder::default());
                    }

                    active_field = LeafField::from_path(&path);
                    if let (Some(field), Some(doc)) = (active_field, current.as_mut()) {
                        doc.field_mut(field).clear();
                    }
                }
                Event::Empty(e) => {
                    // 自己終了タグ（<CPLastFIO/> など）は空の要素として扱う
                    let name = e.local_name().as_ref().to_vec();
                    if path.is_empty() {
                        Self::check_root(&name, &mut seen_root)?;
                        break;
                    }
                    path.push(name);

                    if path.len() == 2 && path[1] == DOCUMENT {
                        records.push(PersonRecord::default());
                    } else if let (Some(field), Some(doc)) =
                        (LeafField::from_path(&path), current.as_mut())
                    {
                        doc.field_mut(field).clear();
                    }

                    path.pop();
                }
                Event::Text(e) => {
                    if let (Some(field), Some(doc)) = (active_field, current.as_mut()) {
                        let text = e.unescape()?;
                        doc.field_mut(field).push_str(&text);
                    }
                }
                Event::CData(e) => {
                    if let (Some(field), Some(doc)) = (active_field, current.as_mut()) {
                        let text = std::str::from_utf8(&e)
                            .map_err(|err| FioMatchError::MalformedXml(err.to_string()))?;
                        doc.field_mut(field).push_str(text);
                    }
                }
                Event::End(_) => {
                    let closed_document = path.len() == 2 && path[1] == DOCUMENT;
                    path.pop();
                    // 葉要素の中の子要素が閉じた場合は、葉要素の本文の続きを読む
                    active_field = LeafField::from_path(&path);

                    if closed_document {
                        if let Some(doc) = current.take() {
                            records.push(doc.finish());
                        }
                    }

                    // ルート要素の後ろは読まない
                    if path.is_empty() {
                        break;
                    }
                }
                Event::Eof => {
                    if !seen_root {
                        return Err(FioMatchError::MalformedXml(
                            "missing root element <List>".to_string(),
                        ));
                    }
                    if !path.is_empty() {
                        return Err(FioMatchError::MalformedXml(format!(
                            "unexpected end of document inside <{}>",
                            String::from_utf8_lossy(&path[path.len() - 1])
                        )));
                    }
                    break;
                }
                _ => {}
            }
            buf.clear();
        }

        debug!("Parsed {} Document elements from XML", records.len());
        Ok(Self { records })
    }

    /// ルート要素が`List`であることを確認
    fn check_root(name: &[u8], seen_root: &mut bool) -> Result<(), FioMatchError> {
        if name != ROOT {
            return Err(FioMatchError::MalformedXml(format!(
                "expected root element <List>, found <{}>",
                String::from_utf8_lossy(name)
            )));
        }
        *seen_root = true;
        Ok(())
    }

    /// 解析済みのレコード
    pub fn records(&self) -> &[PersonRecord] {
        &self.records
    }

    /// レコードの所有権を取り出す
    pub fn into_records(self) -> Vec<PersonRecord> {
        self.records
    }

    /// 区切り文字付きのテキスト行（旧姓がある場合は2行）
    pub fn lines(&self) -> Vec<String> {
        self.records
            .iter()
            .flat_map(PersonRecord::delimited_lines)
            .collect()
    }
}
