use std::io::Write;

use anyhow::{Context, Result};

use crate::aggregate::TotalDurations;

/// Consoleに集計結果を表示するためのtrait。
pub trait ConsolePresenter {
    /// 全期間の活動ごとの合計時間を表示する。
    ///
    /// # Arguments
    ///
    /// * `totals` - 活動名ごとの合計時間(分)
    fn show_totals(&mut self, totals: &TotalDurations) -> Result<()>;
}

/// 集計結果をMarkdownのlist形式で表示する。
pub struct ConsoleMarkdownList<'a, W: Write> {
    writer: &'a mut W,
}

impl<'a, W: Write> ConsoleMarkdownList<'a, W> {
    /// 新しい`ConsoleMarkdownList`を返す。
    pub fn new(writer: &'a mut W) -> Self {
        Self { writer }
    }
}

impl<'a, W: Write> ConsolePresenter for ConsoleMarkdownList<'a, W> {
    // 活動ごとの合計時間をlist形式で表示する。
    fn show_totals(&mut self, totals: &TotalDurations) -> Result<()> {
        for (name, minutes) in totals {
            writeln!(self.writer, "- {}: {:.1} min", name, minutes)
                .with_context(|| format!("Failed to write total for: {}", name))?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::ConsoleMarkdownList;
    use super::ConsolePresenter;
    use crate::aggregate::TotalDurations;

    /// 正常系のテスト。
    #[rstest]
    #[case::no_totals(&[], "")]
    #[case::single(&[("test case", 90.0)], "- test case: 90.0 min\n")]
    #[case::double(
        &[("test case", 90.0), ("reading", 45.5)],
        "- test case: 90.0 min\n- reading: 45.5 min\n",
    )]
    fn test_show_totals(#[case] input: &[(&str, f64)], #[case] expected: &str) {
        let totals: TotalDurations = input
            .iter()
            .map(|(name, minutes)| (name.to_string(), *minutes))
            .collect();
        let mut writer = Vec::new();
        let mut presenter = ConsoleMarkdownList::new(&mut writer);

        presenter.show_totals(&totals).unwrap();

        assert_eq!(String::from_utf8(writer).unwrap(), expected);
    }
}
