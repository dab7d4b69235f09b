//! Coordinate transform for the weekly time grid.
//!
//! Maps a vertical offset inside a day column to minutes since local midnight
//! and back. Offsets are measured from the top of the first displayed hour.

use crate::models::grid_config::TimeGridConfig;

/// Rounds `minutes` to the nearest multiple of `resolution`, halves away from zero.
pub fn snap_to(minutes: f64, resolution: i64) -> i64 {
    let resolution = resolution.max(1) as f64;
    ((minutes / resolution).round() * resolution) as i64
}

#[derive(Debug, Clone, PartialEq)]
pub struct TimeGrid {
    config: TimeGridConfig,
}

impl TimeGrid {
    pub fn new(config: TimeGridConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TimeGridConfig {
        &self.config
    }

    pub fn start_minutes(&self) -> i64 {
        self.config.start_minutes()
    }

    pub fn end_minutes(&self) -> i64 {
        self.config.end_minutes()
    }

    pub fn snap_resolution(&self) -> i64 {
        self.config.snap_minutes
    }

    fn pixels_per_minute(&self) -> f64 {
        self.config.pixels_per_minute() as f64
    }

    fn raw_minutes(&self, offset: f32) -> f64 {
        self.start_minutes() as f64 + offset as f64 / self.pixels_per_minute()
    }

    /// Snapped wall-clock minutes for an offset within a day column.
    pub fn position_to_minutes(&self, offset: f32) -> i64 {
        snap_to(self.raw_minutes(offset), self.config.snap_minutes)
    }

    /// The minute actually under the pointer, without snapping. Used for hit tests.
    pub fn pointer_minute(&self, offset: f32) -> i64 {
        self.raw_minutes(offset).floor() as i64
    }

    /// Whether a `min_duration` span fits inside the display window at all.
    pub fn fits(&self, min_duration: i64) -> bool {
        self.end_minutes() - self.start_minutes() >= min_duration
    }

    /// Exact (unsnapped) offset of a wall-clock minute.
    pub fn minutes_to_position(&self, minutes: i64) -> f32 {
        ((minutes - self.start_minutes()) as f64 * self.pixels_per_minute()) as f32
    }

    /// Converts a vertical pointer displacement into a snapped minute delta.
    pub fn delta_to_minutes(&self, pixel_delta: f32) -> i64 {
        snap_to(pixel_delta as f64 / self.pixels_per_minute(), self.config.snap_minutes)
    }

    /// Screen distance covering `minutes`.
    pub fn minutes_to_distance(&self, minutes: i64) -> f32 {
        (minutes as f64 * self.pixels_per_minute()) as f32
    }

    pub fn snap(&self, minutes: i64) -> i64 {
        snap_to(minutes as f64, self.config.snap_minutes)
    }

    pub fn clamp_minutes(&self, minutes: i64) -> i64 {
        minutes.clamp(self.start_minutes(), self.end_minutes())
    }

    pub fn contains_minute(&self, minutes: i64) -> bool {
        (self.start_minutes()..=self.end_minutes()).contains(&minutes)
    }

    /// Total column height for the display window.
    pub fn column_height(&self) -> f32 {
        self.minutes_to_distance(self.config.display_minutes())
    }

    /// Hour labels with their vertical offsets, for drawing the gutter.
    pub fn hour_marks(&self) -> Vec<(String, f32)> {
        (self.config.display_start_hour..=self.config.display_end_hour)
            .map(|hour| {
                let label = format!("{:02}:00", hour);
                (label, self.minutes_to_position(hour as i64 * 60))
            })
            .collect()
    }
}

impl Default for TimeGrid {
    fn default() -> Self {
        Self::new(TimeGridConfig::default())
    }
}
