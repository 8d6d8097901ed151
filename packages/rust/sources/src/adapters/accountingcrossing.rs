//! accountingcrossing.com adapter.

use super::BoardAdapter;

pub struct AccountingCrossingAdapter;

impl BoardAdapter for AccountingCrossingAdapter {
    fn matches(&self, board_name: &str) -> bool {
        board_name.contains("accountingcrossing")
    }

    fn card_selector(&self) -> &'static str {
        r#".job-listing, .job-item, [class*="job"], tr[class*="job"]"#
    }

    fn name(&self) -> &str {
        "accountingcrossing"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::Html;

    #[test]
    fn reads_table_rows() {
        let html = r#"<html><body><table>
            <tr class="job-row"><td><a href="/job/1">A/P Clerk</a></td><td>Hooli</td><td>San Jose, CA</td></tr>
            <tr class="job-row"><td><a href="/job/2">Staff Accountant</a></td><td>Vandelay</td><td>New York, NY</td></tr>
        </table></body></html>"#;
        let cards = AccountingCrossingAdapter.extract_cards(&Html::parse_document(html));
        assert_eq!(cards.len(), 2);
        assert_eq!(cards[1].lines, vec!["Staff Accountant", "Vandelay", "New York, NY"]);
        assert_eq!(cards[1].href.as_deref(), Some("/job/2"));
    }
}
