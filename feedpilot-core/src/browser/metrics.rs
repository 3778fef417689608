use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutomationMetrics {
    pub scroll_rounds: u64,
    pub posts_extracted: u64,
    pub extraction_failures: u64,
    pub likes: u64,
    pub like_failures: u64,
    pub comments: u64,
    pub comment_failures: u64,
}

impl AutomationMetrics {
    pub fn record_scroll_round(&mut self) {
        self.scroll_rounds = self.scroll_rounds.saturating_add(1);
    }

    pub fn record_extraction(&mut self, success: bool) {
        if success {
            self.posts_extracted = self.posts_extracted.saturating_add(1);
        } else {
            self.extraction_failures = self.extraction_failures.saturating_add(1);
        }
    }

    pub fn record_like(&mut self, success: bool) {
        if success {
            self.likes = self.likes.saturating_add(1);
        } else {
            self.like_failures = self.like_failures.saturating_add(1);
        }
    }

    pub fn record_comment(&mut self, success: bool) {
        if success {
            self.comments = self.comments.saturating_add(1);
        } else {
            self.comment_failures = self.comment_failures.saturating_add(1);
        }
    }
}
