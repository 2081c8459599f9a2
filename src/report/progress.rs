//! Terminal progress display for the analysis stage.

use crate::analysis::ProgressReporter;
use crate::error::CallbackError;
use async_trait::async_trait;
use indicatif::{ProgressBar, ProgressStyle};

/// Progress bar over analyzed chunks.
pub struct BarProgress {
    bar: ProgressBar,
}

impl BarProgress {
    /// A bar for `total` chunks; hidden when `visible` is false.
    pub fn new(total: usize, visible: bool) -> Self {
        let bar = if visible {
            ProgressBar::new(total as u64)
        } else {
            ProgressBar::hidden()
        };

        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} chunks ({eta})")
        {
            bar.set_style(style.progress_chars("#>-"));
        }

        Self { bar }
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

#[async_trait]
impl ProgressReporter for BarProgress {
    async fn report(&self, done: usize, total: usize) -> Result<(), CallbackError> {
        if self.bar.is_finished() {
            return Err(CallbackError(format!(
                "progress bar closed at {}/{}",
                done, total
            )));
        }
        self.bar.set_length(total as u64);
        // Reports from concurrent tasks may arrive out of order.
        self.bar.set_position((done as u64).max(self.bar.position()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_bar_tracks_position() {
        let progress = BarProgress::new(4, false);
        progress.report(1, 4).await.unwrap();
        progress.report(3, 4).await.unwrap();

        assert_eq!(progress.bar.position(), 3);
        assert_eq!(progress.bar.length(), Some(4));
    }

    #[tokio::test]
    async fn test_out_of_order_reports_never_move_back() {
        let progress = BarProgress::new(5, false);
        progress.report(3, 5).await.unwrap();
        progress.report(2, 5).await.unwrap();
        assert_eq!(progress.bar.position(), 3);

        progress.report(5, 5).await.unwrap();
        assert_eq!(progress.bar.position(), 5);
    }

    #[tokio::test]
    async fn test_report_after_finish_fails() {
        let progress = BarProgress::new(2, false);
        progress.finish();
        assert!(progress.report(2, 2).await.is_err());
    }
}
