use similar::TextDiff;

/// 類似度がこの値を超えた場合に同一の活動名とみなす。
const SIMILARITY_THRESHOLD: f32 = 0.9;

/// イベント名を正規化する。
///
/// 前後の空白を除去して小文字に変換した候補を、既に出現した活動名と順に比較し、
/// 類似度が閾値を超えた最初の活動名に置き換える。
/// 完全一致(類似度1.0)は既に同じキーとして扱われるため置き換えの対象外とする。
///
/// # Arguments
///
/// * `raw_label` - カレンダーイベントの生のタイトル
/// * `known_names` - 出現済みの正規化された活動名(挿入順)
///
/// # Examples
///
/// ```
/// let name = normalize_name(" Reponding ", ["responding"].into_iter());
/// assert_eq!(name, "responding");
/// ```
pub fn normalize_name<'a, I>(raw_label: &str, known_names: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let candidate = raw_label.trim().to_lowercase();

    for name in known_names {
        let ratio = TextDiff::from_chars(candidate.as_str(), name).ratio();
        if ratio != 1.0 && ratio > SIMILARITY_THRESHOLD {
            return name.to_string();
        }
    }

    candidate
}
