// Time grid configuration
// Display window, snapping and minimum durations for the weekly grid

use serde::{Deserialize, Serialize};

/// Process-wide settings for the weekly time grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeGridConfig {
    /// First hour shown on the grid (inclusive)
    pub display_start_hour: u32,
    /// Last hour shown on the grid (exclusive bound of the last slot)
    pub display_end_hour: u32,
    /// Quantization applied to every committed time
    pub snap_minutes: i64,
    /// Minimum length of a newly drafted event
    pub min_create_minutes: i64,
    /// Minimum length an event may be resized down to
    pub min_resize_minutes: i64,
    /// Screen distance covered by one hour
    pub pixels_per_hour: f32,
}

impl Default for TimeGridConfig {
    fn default() -> Self {
        Self {
            display_start_hour: 8,
            display_end_hour: 22,
            snap_minutes: 10,
            min_create_minutes: 30,
            min_resize_minutes: 10,
            pixels_per_hour: 60.0,
        }
    }
}

impl TimeGridConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.display_end_hour > 24 {
            return Err("Display end hour must be at most 24".to_string());
        }

        if self.display_start_hour >= self.display_end_hour {
            return Err("Display start hour must be before display end hour".to_string());
        }

        if self.snap_minutes <= 0 || 60 % self.snap_minutes != 0 {
            return Err("Snap resolution must evenly divide an hour".to_string());
        }

        if self.min_resize_minutes < self.snap_minutes {
            return Err("Minimum resize duration cannot be below the snap resolution".to_string());
        }

        if self.min_create_minutes < self.min_resize_minutes {
            return Err("Minimum create duration cannot be below the minimum resize duration".to_string());
        }

        if self.min_create_minutes > self.display_minutes() {
            return Err("Minimum create duration does not fit in the display window".to_string());
        }

        if !(self.pixels_per_hour.is_finite() && self.pixels_per_hour > 0.0) {
            return Err("Pixels per hour must be a positive number".to_string());
        }

        Ok(())
    }

    pub fn start_minutes(&self) -> i64 {
        self.display_start_hour as i64 * 60
    }

    pub fn end_minutes(&self) -> i64 {
        self.display_end_hour as i64 * 60
    }

    pub fn display_minutes(&self) -> i64 {
        self.end_minutes() - self.start_minutes()
    }

    pub fn pixels_per_minute(&self) -> f32 {
        self.pixels_per_hour / 60.0
    }
}
