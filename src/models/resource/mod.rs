// Resource module
// A staff member owning one column of the weekly grid

use serde::{Deserialize, Serialize};

/// Staff member whose column holds appointments and blocked time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    pub id: i64,
    pub display_name: String,
    /// Whether the column is shown under the current filter
    pub included: bool,
}

impl Resource {
    pub fn new(id: i64, display_name: impl Into<String>) -> Self {
        Self {
            id,
            display_name: display_name.into(),
            included: true,
        }
    }
}
