//! monster.com adapter.

use super::BoardAdapter;

pub struct MonsterAdapter;

impl BoardAdapter for MonsterAdapter {
    fn matches(&self, board_name: &str) -> bool {
        board_name.contains("monster")
    }

    fn card_selector(&self) -> &'static str {
        r#"[data-testid="svx-job-card"], .job-cardstyle, [class*="JobCard"]"#
    }

    fn name(&self) -> &str {
        "monster"
    }
}
