//! Render windowing over ranked buckets.
//!
//! Small buckets are exposed whole; large ones through a fixed-row-height virtual window
//! that materializes only the visible rows plus overscan. This is a read-side decoration of
//! the partitioner output: ranking, metrics and transitions always see the full bucket.

use serde::Serialize;

use crate::models::Lead;
use crate::pipeline::config::WindowingConfig;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum WindowMode {
    Full,
    Virtual,
}

/// Rows to materialize for one frame.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VisibleSlice<'b, 'a> {
    /// Index of the first materialized row in the bucket.
    pub start: usize,
    /// One past the last materialized row.
    pub end: usize,
    pub rows: &'b [&'a Lead],
    /// Space above the first materialized row.
    pub offset_top_px: u64,
    /// Height of the whole list, so scrollbars reflect the full bucket.
    pub total_height_px: u64,
}

impl VisibleSlice<'_, '_> {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

#[derive(Debug, Clone)]
pub struct RenderWindow<'b, 'a> {
    bucket: &'b [&'a Lead],
    mode: WindowMode,
    config: WindowingConfig,
}

impl<'b, 'a> RenderWindow<'b, 'a> {
    pub fn mode(&self) -> WindowMode {
        self.mode
    }

    pub fn bucket_len(&self) -> usize {
        self.bucket.len()
    }

    pub fn total_height_px(&self) -> u64 {
        self.bucket.len() as u64 * u64::from(self.config.row_height_px)
    }

    /// Rows `offset..offset + count`, widened by overscan in virtual mode. Full mode always
    /// yields the entire bucket.
    pub fn visible_slice(&self, offset: usize, count: usize) -> VisibleSlice<'b, 'a> {
        let len = self.bucket.len();
        let (start, end) = match self.mode {
            WindowMode::Full => (0, len),
            WindowMode::Virtual => {
                let first = offset.min(len);
                let start = first.saturating_sub(self.config.overscan_rows);
                let end = first
                    .saturating_add(count)
                    .saturating_add(self.config.overscan_rows)
                    .min(len);
                (start, end)
            }
        };

        VisibleSlice {
            start,
            end,
            rows: &self.bucket[start..end],
            offset_top_px: start as u64 * u64::from(self.config.row_height_px),
            total_height_px: self.total_height_px(),
        }
    }

    /// Slice for a viewport scrolled to `scroll_top_px`.
    pub fn visible_for_scroll(
        &self,
        scroll_top_px: u64,
        viewport_height_px: u64,
    ) -> VisibleSlice<'b, 'a> {
        let row_height = u64::from(self.config.row_height_px.max(1));
        let offset = (scroll_top_px / row_height) as usize;
        // Partially visible rows at either edge count.
        let count = viewport_height_px.div_ceil(row_height) as usize + 1;
        self.visible_slice(offset, count)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct WindowingStrategy {
    config: WindowingConfig,
}

impl WindowingStrategy {
    pub fn new(config: WindowingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &WindowingConfig {
        &self.config
    }

    pub fn window_for<'b, 'a>(&self, bucket: &'b [&'a Lead]) -> RenderWindow<'b, 'a> {
        let mode = if bucket.len() <= self.config.full_threshold {
            WindowMode::Full
        } else {
            WindowMode::Virtual
        };
        RenderWindow {
            bucket,
            mode,
            config: self.config,
        }
    }
}

/// Window a bucket with the default configuration.
pub fn window_for<'b, 'a>(bucket: &'b [&'a Lead]) -> RenderWindow<'b, 'a> {
    WindowingStrategy::default().window_for(bucket)
}
